pub mod hierarchy;
pub mod record;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use hierarchy::Hierarchy;
use record::{Segment, SegmentKind};

// h5/h6 are deliberately absent: the collection tracks four heading depths,
// and deeper headings contribute neither records nor hierarchy context.
static CONTENT_NODES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, p, li").expect("valid content selector"));
static ANCHOR_TAGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid anchor selector"));
static SECTION_LABELS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span[id]").expect("valid label selector"));

/// Extract heading and body-text segments from one HTML page.
///
/// The content root is the first node matched by any selector in
/// `content_selectors`, tried in order. Pages where nothing matches yield an
/// empty list: chrome-only pages (redirect stubs, search pages) are normal,
/// not an error.
pub fn extract_segments(html: &str, content_selectors: &[String]) -> Vec<Segment> {
    let document = Html::parse_document(html);
    let Some(root) = find_content_root(&document, content_selectors) else {
        return Vec::new();
    };

    let mut state = Hierarchy::default();
    let mut segments = Vec::new();

    for element in root.select(&CONTENT_NODES) {
        let text = element_text(element);
        if text.is_empty() {
            // Whitespace-only elements are noise: no record, no state change.
            continue;
        }

        match heading_depth(element.value().name()) {
            Some(depth) => {
                state.descend(depth, &text);
                segments.push(Segment {
                    kind: SegmentKind::from_heading_depth(depth),
                    hierarchy: state.clone(),
                    text: String::new(),
                    anchor: resolve_anchor(element),
                });
            }
            None => segments.push(Segment {
                kind: SegmentKind::Content,
                hierarchy: state.clone(),
                text,
                anchor: resolve_anchor(element),
            }),
        }
    }

    segments
}

fn find_content_root<'a>(document: &'a Html, selectors: &[String]) -> Option<ElementRef<'a>> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            warn!("Skipping invalid content selector: {}", raw);
            continue;
        };
        if let Some(node) = document.select(&selector).next() {
            return Some(node);
        }
    }
    None
}

fn heading_depth(tag: &str) -> Option<usize> {
    match tag {
        "h1" => Some(0),
        "h2" => Some(1),
        "h3" => Some(2),
        "h4" => Some(3),
        _ => None,
    }
}

/// Concatenated text of the element with runs of whitespace collapsed,
/// trimmed at both ends.
fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    let mut last_was_space = false;
    for chunk in element.text() {
        for ch in chunk.chars() {
            if ch.is_whitespace() {
                if !last_was_space {
                    out.push(' ');
                    last_was_space = true;
                }
            } else {
                out.push(ch);
                last_was_space = false;
            }
        }
    }
    out.trim().to_string()
}

/// Anchor for a segment: the element's own id, a permalink target inside or
/// immediately before it, or the enclosing section's label.
fn resolve_anchor(element: ElementRef<'_>) -> String {
    if let Some(id) = element.value().id() {
        return id.to_string();
    }

    // Permalink targets nested in the element: <a id> first, then the
    // legacy <a name> form.
    for a in element.select(&ANCHOR_TAGS) {
        if let Some(id) = a.value().id() {
            return id.to_string();
        }
    }
    for a in element.select(&ANCHOR_TAGS) {
        if let Some(name) = a.value().attr("name") {
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }

    // Target element placed just before this one.
    if let Some(prev) = element.prev_siblings().find_map(ElementRef::wrap) {
        if prev.value().name() == "a" {
            if let Some(id) = prev.value().id() {
                return id.to_string();
            }
        }
    }

    // Nearest enclosing <section>: an explicit <span id> label wins over the
    // section's own id.
    for ancestor in element.ancestors() {
        let Some(section) = ElementRef::wrap(ancestor) else {
            continue;
        };
        if section.value().name() != "section" {
            continue;
        }
        if let Some(label) = section.select(&SECTION_LABELS).next() {
            if let Some(id) = label.value().id() {
                return id.to_string();
            }
        }
        if let Some(id) = section.value().id() {
            return id.to_string();
        }
        break;
    }

    String::new()
}

// ── Tests ──
