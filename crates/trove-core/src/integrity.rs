//! Library integrity check
//!
//! Cross-checks every record against the filesystem and reports books
//! whose file is gone. The check is read-only.

use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use crate::document::DocId;
use crate::models::Book;
use crate::naming::sanitize_author;
use crate::store::Store;

/// A record whose file is not on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingFile {
    pub doc_id: DocId,
    pub uuid: Uuid,
    pub title: String,
    /// The absolute path that was checked
    pub path: PathBuf,
}

/// A record whose file location can't be worked out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unreconstructable {
    pub doc_id: DocId,
    pub uuid: Uuid,
    pub title: String,
    pub reason: String,
}

/// Result of an integrity check, in store order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub checked: usize,
    pub missing: Vec<MissingFile>,
    pub unreconstructable: Vec<Unreconstructable>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unreconstructable.is_empty()
    }

    pub fn problem_count(&self) -> usize {
        self.missing.len() + self.unreconstructable.len()
    }
}

/// Where a book's file should be
///
/// - absolute `file_path`: used as-is
/// - relative path with a directory: under the library root
/// - bare file name (older records): under the author's directory,
///   which needs an author
pub fn expected_path(book: &Book, library_root: &Path) -> Result<PathBuf, String> {
    let path = &book.file_path;
    if path.as_os_str().is_empty() {
        return Err("record has no file path".to_string());
    }
    if path.is_absolute() {
        return Ok(path.clone());
    }

    let has_dir = path
        .parent()
        .is_some_and(|parent| !parent.as_os_str().is_empty());
    if has_dir {
        return Ok(library_root.join(path));
    }

    if book.author.trim().is_empty() {
        return Err("bare file name and no author to locate its directory".to_string());
    }
    Ok(library_root.join(sanitize_author(&book.author)).join(path))
}

/// Check every record against the filesystem
pub fn check<'a, I>(books: I, library_root: &Path) -> IntegrityReport
where
    I: IntoIterator<Item = (DocId, &'a Book)>,
{
    let mut report = IntegrityReport::default();

    for (doc_id, book) in books {
        report.checked += 1;
        match expected_path(book, library_root) {
            Ok(path) if path.is_file() => {}
            Ok(path) => report.missing.push(MissingFile {
                doc_id,
                uuid: book.uuid,
                title: book.title.clone(),
                path,
            }),
            Err(reason) => report.unreconstructable.push(Unreconstructable {
                doc_id,
                uuid: book.uuid,
                title: book.title.clone(),
                reason,
            }),
        }
    }

    report
}

/// Check every record of a store against its library root
pub fn check_store(store: &Store) -> IntegrityReport {
    let entries = store.book_entries();
    check(entries.iter().map(|(id, b)| (*id, b)), store.library_root())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ingest::{IngestRequest, Ingestor};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_expected_path_rules() {
        let root = Path::new("/lib");

        let absolute = Book::new("T", "A", "/elsewhere/t.pdf");
        assert_eq!(
            expected_path(&absolute, root).unwrap(),
            PathBuf::from("/elsewhere/t.pdf")
        );

        let relative = Book::new("T", "A", "Some Dir/t.pdf");
        assert_eq!(
            expected_path(&relative, root).unwrap(),
            PathBuf::from("/lib/Some Dir/t.pdf")
        );

        let bare = Book::new("T", "J.R.R. Tolkien", "t.pdf");
        assert_eq!(
            expected_path(&bare, root).unwrap(),
            PathBuf::from("/lib/J R R Tolkien/t.pdf")
        );

        let no_author = Book::new("T", " ", "t.pdf");
        assert!(expected_path(&no_author, root).is_err());

        let empty = Book::new("T", "A", "");
        assert!(expected_path(&empty, root).is_err());
    }

    #[test]
    fn test_reports_exactly_the_deleted_file() {
        let temp = TempDir::new().unwrap();
        let library = temp.path().join("library");
        let incoming = temp.path().join("incoming");
        fs::create_dir_all(&incoming).unwrap();

        let mut store = Store::open_with_config(Config::with_library(&library)).unwrap();
        let ingestor = Ingestor::with_writer(&library, None);

        let mut books = Vec::new();
        for title in ["Uno", "Due", "Tre"] {
            let src = incoming.join(format!("{title}.pdf"));
            fs::write(&src, title).unwrap();
            books.push(
                ingestor
                    .ingest(&mut store, IngestRequest::new(&src, title, "Autore"))
                    .unwrap(),
            );
        }
        assert!(check_store(&store).is_clean());

        fs::remove_file(library.join(&books[1].file_path)).unwrap();

        let report = check_store(&store);
        assert_eq!(report.checked, 3);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].uuid, books[1].uuid);
        assert_eq!(report.missing[0].path, library.join(&books[1].file_path));
        assert!(report.unreconstructable.is_empty());

        // Read-only and deterministic
        assert_eq!(check_store(&store), report);
        assert_eq!(store.book_count(), 3);
    }

    #[test]
    fn test_legacy_and_unreconstructable_records() {
        let temp = TempDir::new().unwrap();
        let library = temp.path().to_path_buf();
        let mut store = Store::open_with_config(Config::with_library(&library)).unwrap();

        fs::create_dir_all(library.join("Umberto Eco")).unwrap();
        fs::write(library.join("Umberto Eco").join("rosa.pdf"), b"x").unwrap();

        store
            .add_book(&Book::new("Rosa", "Umberto Eco", "rosa.pdf"))
            .unwrap();
        store
            .add_book(&Book::new("Lost", "Umberto Eco", "lost.pdf"))
            .unwrap();
        store.add_book(&Book::new("Empty", "X", "")).unwrap();

        let report = check_store(&store);
        assert_eq!(report.checked, 3);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].title, "Lost");
        assert_eq!(report.unreconstructable.len(), 1);
        assert_eq!(report.unreconstructable[0].title, "Empty");
        assert_eq!(report.problem_count(), 2);
    }
}
