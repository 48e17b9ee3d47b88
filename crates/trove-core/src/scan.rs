//! Directory importer
//!
//! Adds every PDF directly inside a directory whose name follows
//! `"Title - Author[ - Tag1, Tag2].pdf"`. Files whose names don't parse
//! are skipped and reported.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::ingest::{IngestRequest, Ingestor};
use crate::models::{parse_tag_list, Book};
use crate::store::Store;

/// Title, author and tags recovered from a file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub title: String,
    pub author: String,
    pub tags: Vec<String>,
}

/// Parse `"Title - Author[ - Tag1, Tag2].pdf"`
///
/// Everything after the second separator is the tag list, so tags may
/// themselves contain `" - "`. Returns `None` when title or author is
/// missing.
pub fn parse_file_name(name: &str) -> Option<ParsedName> {
    let stem = match name.len().checked_sub(4) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".pdf") => {
            &name[..cut]
        }
        _ => name,
    };

    let mut parts = stem.splitn(3, " - ");
    let title = parts.next()?.trim();
    let author = parts.next()?.trim();
    if title.is_empty() || author.is_empty() {
        return None;
    }
    let tags = parts.next().map(parse_tag_list).unwrap_or_default();

    Some(ParsedName {
        title: title.to_string(),
        author: author.to_string(),
        tags,
    })
}

/// A file that was not imported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a directory scan
#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub imported: Vec<Book>,
    /// Names that didn't parse
    pub skipped: Vec<SkippedFile>,
    /// Parsed names that failed to ingest
    pub failed: Vec<SkippedFile>,
}

/// Import every parseable PDF directly inside `dir`
///
/// Files are processed in name order. Subdirectories are not visited.
pub fn scan_directory(ingestor: &Ingestor, store: &mut Store, dir: &Path) -> Result<ScanReport> {
    if !dir.is_dir() {
        bail!("'{}' is not a directory", dir.display());
    }

    let mut pdfs: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdfs.sort();

    info!(dir = %dir.display(), files = pdfs.len(), "Scanning directory");
    let mut report = ScanReport::default();

    for path in pdfs {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(parsed) = parse_file_name(&name) else {
            warn!(file = %name, "Could not parse title/author from file name, skipping");
            report.skipped.push(SkippedFile {
                path,
                reason: "expected \"Title - Author[ - Tags].pdf\"".to_string(),
            });
            continue;
        };

        let request =
            IngestRequest::new(&path, parsed.title, parsed.author).with_tags(parsed.tags);
        match ingestor.ingest(store, request) {
            Ok(book) => report.imported.push(book),
            Err(e) => {
                warn!(file = %name, error = %e, "Failed to import");
                report.failed.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    #[test]
    fn test_parse_title_author() {
        let parsed = parse_file_name("The Old Man and the Sea - Ernest Hemingway.pdf").unwrap();
        assert_eq!(parsed.title, "The Old Man and the Sea");
        assert_eq!(parsed.author, "Ernest Hemingway");
        assert!(parsed.tags.is_empty());
    }

    #[test]
    fn test_parse_with_tags() {
        let parsed =
            parse_file_name("The Great Gatsby - F. Scott Fitzgerald - Classic, Literature.PDF")
                .unwrap();
        assert_eq!(parsed.author, "F. Scott Fitzgerald");
        assert_eq!(
            parsed.tags,
            vec!["Classic".to_string(), "Literature".to_string()]
        );
    }

    #[test]
    fn test_parse_tags_keep_separator() {
        let parsed = parse_file_name("T - A - Post - Umanesimo, Etica.pdf").unwrap();
        assert_eq!(
            parsed.tags,
            vec!["Post - Umanesimo".to_string(), "Etica".to_string()]
        );
    }

    #[test]
    fn test_parse_rejects_missing_author() {
        assert!(parse_file_name("JustATitle.pdf").is_none());
        assert!(parse_file_name(" - Author.pdf").is_none());
        assert!(parse_file_name("Title - .pdf").is_none());
    }

    #[test]
    fn test_scan_directory() {
        let temp = TempDir::new().unwrap();
        let library = temp.path().join("library");
        let incoming = temp.path().join("incoming");
        fs::create_dir_all(incoming.join("nested")).unwrap();
        fs::write(incoming.join("Confessioni - Agostino - Filosofia.pdf"), b"x").unwrap();
        fs::write(incoming.join("unparseable.pdf"), b"x").unwrap();
        fs::write(incoming.join("Not a pdf - Someone.txt"), b"x").unwrap();
        fs::write(incoming.join("nested").join("Deep - Author.pdf"), b"x").unwrap();

        let config = Config::with_library(&library);
        let mut store = Store::open_with_config(config.clone()).unwrap();
        let ingestor = Ingestor::with_writer(&library, None);

        let report = scan_directory(&ingestor, &mut store, &incoming).unwrap();
        assert_eq!(report.imported.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.failed.is_empty());

        let book = &report.imported[0];
        assert_eq!(book.tags, vec!["Filosofia".to_string()]);
        assert!(library.join(&book.file_path).is_file());
        assert_eq!(store.book_count(), 1);
    }

    #[test]
    fn test_scan_rejects_missing_dir() {
        let temp = TempDir::new().unwrap();
        let mut store = Store::open_with_config(Config::with_library(temp.path())).unwrap();
        let ingestor = Ingestor::with_writer(temp.path(), None);

        assert!(scan_directory(&ingestor, &mut store, &temp.path().join("nope")).is_err());
    }
}
