use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::hierarchy::Hierarchy;

/// How many leading characters of content participate in the document id.
const ID_CONTENT_PREFIX: usize = 100;
/// Hex length the digest is truncated to.
const ID_HEX_LEN: usize = 32;

/// What a segment represents: one of the four tracked heading depths, or
/// body text. The set is closed; the collection schema knows nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Lvl0,
    Lvl1,
    Lvl2,
    Lvl3,
    Content,
}

impl SegmentKind {
    pub fn from_heading_depth(depth: usize) -> Self {
        match depth {
            0 => Self::Lvl0,
            1 => Self::Lvl1,
            2 => Self::Lvl2,
            _ => Self::Lvl3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lvl0 => "lvl0",
            Self::Lvl1 => "lvl1",
            Self::Lvl2 => "lvl2",
            Self::Lvl3 => "lvl3",
            Self::Content => "content",
        }
    }

    /// Search ranking weight: shallower headings outrank deeper ones, any
    /// heading outranks body text.
    pub fn weight(self) -> i32 {
        match self {
            Self::Lvl0 => 100,
            Self::Lvl1 => 90,
            Self::Lvl2 => 80,
            Self::Lvl3 => 70,
            Self::Content => 50,
        }
    }

    /// Default sort key of the collection (sorted descending).
    pub fn priority(self) -> i64 {
        match self {
            Self::Lvl0 => 100,
            Self::Lvl1 => 90,
            Self::Lvl2 => 80,
            Self::Lvl3 => 70,
            Self::Content => 50,
        }
    }
}

/// One extracted unit, before URL and id assignment: the hierarchy snapshot
/// at emission time, the body text (empty for headings), and the anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub hierarchy: Hierarchy,
    pub text: String,
    pub anchor: String,
}

/// Corpus-wide metadata stamped onto every record.
#[derive(Debug, Clone, Default)]
pub struct CorpusMeta {
    pub version: String,
    pub language: String,
}

/// Wire document for the search collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(rename = "hierarchy.lvl0")]
    pub lvl0: String,
    #[serde(rename = "hierarchy.lvl1")]
    pub lvl1: String,
    #[serde(rename = "hierarchy.lvl2")]
    pub lvl2: String,
    #[serde(rename = "hierarchy.lvl3")]
    pub lvl3: String,
    pub content: String,
    pub url: String,
    pub url_without_anchor: String,
    pub anchor: String,
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub version: String,
    pub language: String,
    pub weight: i32,
    pub item_priority: i64,
}

/// Assemble the final record for one segment of the page at `url_base`.
///
/// The id hashes the full URL plus the first 100 characters of content, so
/// re-indexing an unchanged page upserts the same document instead of
/// creating a duplicate.
pub fn build_record(segment: Segment, url_base: &str, meta: &CorpusMeta) -> Record {
    let url = if segment.anchor.is_empty() {
        url_base.to_string()
    } else {
        format!("{}#{}", url_base, segment.anchor)
    };
    let id = stable_id(&url, &segment.text);
    let Hierarchy { lvl0, lvl1, lvl2, lvl3 } = segment.hierarchy;

    Record {
        id,
        lvl0,
        lvl1,
        lvl2,
        lvl3,
        content: segment.text,
        url,
        url_without_anchor: url_base.to_string(),
        anchor: segment.anchor,
        kind: segment.kind,
        version: meta.version.clone(),
        language: meta.language.clone(),
        weight: segment.kind.weight(),
        item_priority: segment.kind.priority(),
    }
}

fn stable_id(url: &str, content: &str) -> String {
    let prefix: String = content.chars().take(ID_CONTENT_PREFIX).collect();
    let digest = Sha256::digest(format!("{}:{}", url, prefix).as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(ID_HEX_LEN);
    hash
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(kind: SegmentKind, text: &str, anchor: &str) -> Segment {
        Segment {
            kind,
            hierarchy: Hierarchy::default(),
            text: text.to_string(),
            anchor: anchor.to_string(),
        }
    }

    #[test]
    fn weights_rank_shallow_headings_above_deep_above_content() {
        let order = [
            SegmentKind::Lvl0,
            SegmentKind::Lvl1,
            SegmentKind::Lvl2,
            SegmentKind::Lvl3,
            SegmentKind::Content,
        ];
        for pair in order.windows(2) {
            assert!(
                pair[0].weight() > pair[1].weight(),
                "{:?} must outrank {:?}",
                pair[0],
                pair[1]
            );
            assert!(pair[0].priority() > pair[1].priority());
        }
    }

    #[test]
    fn id_is_deterministic_for_same_inputs() {
        let meta = CorpusMeta::default();
        let a = build_record(segment(SegmentKind::Content, "some text", "sec"), "a.html", &meta);
        let b = build_record(segment(SegmentKind::Content, "some text", "sec"), "a.html", &meta);
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 32);
    }

    #[test]
    fn id_changes_when_url_or_content_changes() {
        let meta = CorpusMeta::default();
        let base = build_record(segment(SegmentKind::Content, "some text", ""), "a.html", &meta);
        let other_page =
            build_record(segment(SegmentKind::Content, "some text", ""), "b.html", &meta);
        let other_text =
            build_record(segment(SegmentKind::Content, "other text", ""), "a.html", &meta);
        assert_ne!(base.id, other_page.id);
        assert_ne!(base.id, other_text.id);
    }

    #[test]
    fn id_ignores_content_past_the_first_100_chars() {
        let meta = CorpusMeta::default();
        let head: String = "x".repeat(100);
        let a = build_record(
            segment(SegmentKind::Content, &format!("{}tail-one", head), ""),
            "a.html",
            &meta,
        );
        let b = build_record(
            segment(SegmentKind::Content, &format!("{}tail-two", head), ""),
            "a.html",
            &meta,
        );
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn url_carries_anchor_only_when_present() {
        let meta = CorpusMeta::default();
        let anchored = build_record(segment(SegmentKind::Lvl0, "", "intro"), "guide.html", &meta);
        assert_eq!(anchored.url, "guide.html#intro");
        assert_eq!(anchored.url_without_anchor, "guide.html");
        assert_eq!(anchored.anchor, "intro");

        let bare = build_record(segment(SegmentKind::Lvl0, "", ""), "guide.html", &meta);
        assert_eq!(bare.url, "guide.html");
        assert_eq!(bare.url_without_anchor, "guide.html");
        assert_eq!(bare.anchor, "");
    }

    #[test]
    fn wire_field_names_match_the_collection_schema() {
        let mut seg = segment(SegmentKind::Lvl1, "", "setup");
        seg.hierarchy.descend(0, "Guide");
        seg.hierarchy.descend(1, "Setup");
        let record = build_record(seg, "guide.html", &CorpusMeta {
            version: "1.2".into(),
            language: "en".into(),
        });

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["hierarchy.lvl0"], "Guide");
        assert_eq!(value["hierarchy.lvl1"], "Setup");
        assert_eq!(value["hierarchy.lvl2"], "");
        assert_eq!(value["type"], "lvl1");
        assert_eq!(value["weight"], 90);
        assert_eq!(value["item_priority"], 90);
        assert_eq!(value["version"], "1.2");
        assert_eq!(value["language"], "en");
    }

    #[test]
    fn kind_serializes_to_lowercase_names() {
        for kind in [
            SegmentKind::Lvl0,
            SegmentKind::Lvl1,
            SegmentKind::Lvl2,
            SegmentKind::Lvl3,
            SegmentKind::Content,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
