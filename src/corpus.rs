use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::IndexError;
use crate::extract::extract_segments;
use crate::extract::record::{build_record, CorpusMeta, Record};

/// Pages processed per rayon batch.
const CHUNK_SIZE: usize = 64;

/// Outcome of one assembly pass over the output tree.
#[derive(Debug, Default)]
pub struct Corpus {
    pub records: Vec<Record>,
    pub pages: usize,
    pub pages_skipped: usize,
    pub id_collisions: usize,
}

/// Walk `out_dir` and build the full indexable batch.
///
/// Enumeration is sorted, so re-runs over an unchanged tree produce
/// byte-identical batches. When `indexing_enabled` is false an empty corpus
/// is returned without touching the filesystem at all.
pub fn assemble(
    out_dir: &Path,
    content_selectors: &[String],
    meta: &CorpusMeta,
    indexing_enabled: bool,
) -> Result<Corpus, IndexError> {
    if !indexing_enabled {
        debug!("Indexing disabled, skipping extraction");
        return Ok(Corpus::default());
    }

    let files = collect_html_files(out_dir)?;
    debug!("Found {} HTML pages under {}", files.len(), out_dir.display());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("=> "),
    );

    let mut records: Vec<Record> = Vec::new();
    let mut pages_skipped = 0usize;

    for chunk in files.chunks(CHUNK_SIZE) {
        // Per-page work is pure and file-local: each page gets its own
        // hierarchy state, so pages can be extracted in parallel freely.
        let results: Vec<Option<Vec<Record>>> = chunk
            .par_iter()
            .map(|path| {
                let html = match fs::read_to_string(path) {
                    Ok(html) => html,
                    Err(e) => {
                        warn!("Skipping unreadable page {}: {}", path.display(), e);
                        return None;
                    }
                };
                let url_base = relative_url(out_dir, path);
                let page_records = extract_segments(&html, content_selectors)
                    .into_iter()
                    .map(|segment| build_record(segment, &url_base, meta))
                    .collect();
                Some(page_records)
            })
            .collect();

        for result in results {
            match result {
                Some(page_records) => records.extend(page_records),
                None => pages_skipped += 1,
            }
        }
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();

    let id_collisions = enforce_unique_ids(&mut records);

    Ok(Corpus {
        records,
        pages: files.len(),
        pages_skipped,
        id_collisions,
    })
}

fn collect_html_files(out_dir: &Path) -> Result<Vec<PathBuf>, IndexError> {
    if !out_dir.is_dir() {
        return Err(IndexError::Config(format!(
            "output directory not found: {}",
            out_dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(out_dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) if e.file_type().is_file() => Some(e.into_path()),
            Ok(_) => None,
            Err(e) => {
                warn!("Skipping unreadable directory entry: {}", e);
                None
            }
        })
        .filter(|path| path.extension().is_some_and(|ext| ext == "html"))
        .collect();
    files.sort();
    Ok(files)
}

/// Path relative to the output root, forward-slash separated on every host.
fn relative_url(out_dir: &Path, path: &Path) -> String {
    path.strip_prefix(out_dir)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Enforce corpus-wide id uniqueness.
///
/// A duplicate id replaces the earlier record in place (last write wins, and
/// batch order stays deterministic). Collisions between records that are not
/// identical are counted and logged so they stay detectable.
fn enforce_unique_ids(records: &mut Vec<Record>) -> usize {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Record> = Vec::with_capacity(records.len());
    let mut collisions = 0usize;

    for record in records.drain(..) {
        match seen.get(&record.id) {
            Some(&slot) => {
                if kept[slot] != record {
                    collisions += 1;
                    warn!(
                        "Document id collision: {} replaces {} (id {})",
                        record.url, kept[slot].url, record.id
                    );
                }
                kept[slot] = record;
            }
            None => {
                seen.insert(record.id.clone(), kept.len());
                kept.push(record);
            }
        }
    }

    *records = kept;
    collisions
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::record::SegmentKind;
    use std::fs;
    use tempfile::TempDir;

    fn meta() -> CorpusMeta {
        CorpusMeta {
            version: "1.0".into(),
            language: "en".into(),
        }
    }

    fn write(dir: &TempDir, rel: &str, html: &str) {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, html).unwrap();
    }

    #[test]
    fn end_to_end_three_records_from_one_page() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "install.html",
            "<div class='body'><h1>Installation</h1><h2>Prerequisites</h2>\
             <p>You need Python 3.9+</p></div>",
        );

        let corpus =
            assemble(dir.path(), &[".body".to_string()], &meta(), true).unwrap();
        assert_eq!(corpus.records.len(), 3);
        assert_eq!(corpus.pages, 1);

        let lvl0 = &corpus.records[0];
        assert_eq!(lvl0.kind, SegmentKind::Lvl0);
        assert_eq!(lvl0.lvl0, "Installation");
        assert_eq!(lvl0.content, "");

        let lvl1 = &corpus.records[1];
        assert_eq!(lvl1.kind, SegmentKind::Lvl1);
        assert_eq!(lvl1.lvl0, "Installation");
        assert_eq!(lvl1.lvl1, "Prerequisites");

        let content = &corpus.records[2];
        assert_eq!(content.kind, SegmentKind::Content);
        assert_eq!(content.content, "You need Python 3.9+");
        assert_eq!(content.lvl0, "Installation");
        assert_eq!(content.lvl1, "Prerequisites");
        assert_eq!(content.url, "install.html");
    }

    #[test]
    fn assembly_is_deterministic_across_runs() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.html", "<main><h1>B</h1><p>beta</p></main>");
        write(&dir, "a.html", "<main><h1>A</h1><p>alpha</p></main>");
        write(&dir, "sub/c.html", "<main><h1>C</h1><p>gamma</p></main>");

        let selectors = vec!["main".to_string()];
        let first = assemble(dir.path(), &selectors, &meta(), true).unwrap();
        let second = assemble(dir.path(), &selectors, &meta(), true).unwrap();
        assert_eq!(first.records, second.records);

        // Lexicographic path order, and relative forward-slash urls.
        let urls: Vec<&str> = first
            .records
            .iter()
            .map(|r| r.url_without_anchor.as_str())
            .collect();
        assert_eq!(
            urls,
            vec!["a.html", "a.html", "b.html", "b.html", "sub/c.html", "sub/c.html"]
        );
    }

    #[test]
    fn disabled_indexing_returns_an_empty_batch() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.html", "<main><p>alpha</p></main>");

        let corpus = assemble(dir.path(), &["main".to_string()], &meta(), false).unwrap();
        assert!(corpus.records.is_empty());
        assert_eq!(corpus.pages, 0);
    }

    #[test]
    fn non_html_files_are_not_indexed() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.html", "<main><p>alpha</p></main>");
        write(&dir, "style.css", "body {}");
        write(&dir, "notes.txt", "<main><p>not html</p></main>");

        let corpus = assemble(dir.path(), &["main".to_string()], &meta(), true).unwrap();
        assert_eq!(corpus.pages, 1);
        assert_eq!(corpus.records.len(), 1);
    }

    #[test]
    fn missing_output_dir_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no-such-dir");
        let err = assemble(&missing, &["main".to_string()], &meta(), true).unwrap_err();
        assert_eq!(err.category(), "configuration");
    }

    #[test]
    fn chromeless_pages_contribute_nothing_but_do_not_fail_the_run() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.html", "<main><h1>A</h1></main>");
        write(&dir, "redirect.html", "<div class='stub'>moved</div>");

        let corpus = assemble(dir.path(), &["main".to_string()], &meta(), true).unwrap();
        assert_eq!(corpus.pages, 2);
        assert_eq!(corpus.records.len(), 1);
        assert_eq!(corpus.pages_skipped, 0);
    }

    #[test]
    fn distinct_records_sharing_an_id_collapse_to_the_later_one() {
        // Same url, same first 100 characters, different tails: the ids
        // collide while the records differ.
        let dir = TempDir::new().unwrap();
        let head = "z".repeat(100);
        write(
            &dir,
            "a.html",
            &format!(
                "<main><p>{head} ending one</p><p>{head} ending two</p></main>"
            ),
        );

        let corpus = assemble(dir.path(), &["main".to_string()], &meta(), true).unwrap();
        assert_eq!(corpus.records.len(), 1);
        assert_eq!(corpus.id_collisions, 1);
        assert!(corpus.records[0].content.ends_with("ending two"));
    }

    #[test]
    fn identical_duplicates_dedupe_silently() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.html", "<main><p>repeated</p><p>repeated</p></main>");

        let corpus = assemble(dir.path(), &["main".to_string()], &meta(), true).unwrap();
        assert_eq!(corpus.records.len(), 1);
        assert_eq!(corpus.id_collisions, 0);
    }
}
