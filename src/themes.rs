use std::collections::HashMap;
use std::sync::LazyLock;

/// Selector sets for one documentation theme, in priority order
/// (first match wins).
#[derive(Debug, Clone, Copy)]
pub struct ThemeProfile {
    pub content_selectors: &'static [&'static str],
    pub placement_selectors: &'static [&'static str],
}

static THEMES: LazyLock<HashMap<&'static str, ThemeProfile>> = LazyLock::new(|| {
    HashMap::from([
        (
            "sphinx_rtd_theme",
            ThemeProfile {
                content_selectors: &[".wy-nav-content-wrap", ".wy-nav-content", "[role=main]"],
                placement_selectors: &[".wy-side-nav-search"],
            },
        ),
        (
            "furo",
            ThemeProfile {
                content_selectors: &["article[role=main]", ".content"],
                placement_selectors: &[".sidebar-search-container"],
            },
        ),
        (
            "alabaster",
            ThemeProfile {
                content_selectors: &[".body", ".document"],
                placement_selectors: &[".searchbox"],
            },
        ),
        (
            "pydata_sphinx_theme",
            ThemeProfile {
                content_selectors: &["article.bd-article", "main.bd-main", "main.bd-content"],
                placement_selectors: &["nav.bd-search", ".bd-search"],
            },
        ),
        (
            "sphinx_book_theme",
            ThemeProfile {
                content_selectors: &["main#main-content", "article", "article.bd-article"],
                placement_selectors: &[".search-button-field"],
            },
        ),
        (
            "shibuya",
            ThemeProfile {
                content_selectors: &["article.yue[role=main]", "article[role=main]", "main.sy-main"],
                placement_selectors: &[".searchbox"],
            },
        ),
    ])
});

/// Fallbacks when the theme is unrecognized and no override is given.
pub const DEFAULT_CONTENT_SELECTORS: &[&str] = &[
    "article[role=main]",
    "main",
    ".body",
    ".document",
    "[role=main]",
];

pub const DEFAULT_PLACEMENT_SELECTORS: &[&str] = &["#docsearch-container", ".search", ".searchbox"];

/// Resolve the content-root and search-placement selector lists for a theme.
///
/// A non-empty `overrides` list is returned verbatim as the content list:
/// explicit user intent beats theme inference. Unknown themes get the fixed
/// defaults.
pub fn resolve(theme: Option<&str>, overrides: &[String]) -> (Vec<String>, Vec<String>) {
    let profile = theme.and_then(|name| THEMES.get(name));

    let content: Vec<String> = if overrides.is_empty() {
        profile
            .map(|p| p.content_selectors)
            .unwrap_or(DEFAULT_CONTENT_SELECTORS)
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    } else {
        overrides.to_vec()
    };

    let placement: Vec<String> = profile
        .map(|p| p.placement_selectors)
        .unwrap_or(DEFAULT_PLACEMENT_SELECTORS)
        .iter()
        .map(|s| (*s).to_string())
        .collect();

    (content, placement)
}

// ── Tests ──
