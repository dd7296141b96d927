/// Running heading context for one page.
///
/// Four slots hold the most recent heading text seen at each depth. The
/// state is page-scoped: created fresh per page and discarded afterwards,
/// never shared across pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    pub lvl0: String,
    pub lvl1: String,
    pub lvl2: String,
    pub lvl3: String,
}

impl Hierarchy {
    /// Record a heading at `depth` (0-based). Entering a new branch
    /// invalidates everything deeper, so all slots below `depth` are cleared.
    pub fn descend(&mut self, depth: usize, text: &str) {
        match depth {
            0 => {
                self.lvl0 = text.to_string();
                self.lvl1.clear();
                self.lvl2.clear();
                self.lvl3.clear();
            }
            1 => {
                self.lvl1 = text.to_string();
                self.lvl2.clear();
                self.lvl3.clear();
            }
            2 => {
                self.lvl2 = text.to_string();
                self.lvl3.clear();
            }
            _ => self.lvl3 = text.to_string(),
        }
    }
}

// ── Tests ──
