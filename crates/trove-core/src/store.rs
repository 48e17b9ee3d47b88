//! Unified storage interface
//!
//! The `Store` wraps the library document and its JSON file. Every
//! mutation reloads the file, applies the change and rewrites the file
//! atomically, so edits made by another `trove` invocation since this
//! store was opened are never clobbered. Queries are answered from the
//! copy loaded by the most recent open, reload or mutation.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open_with_config(config)?;
//!
//! store.add_book(&book)?;
//! let books = store.search_books("eco");
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{Config, ConfigError};
use crate::document::{DocId, DocumentError, LibraryDocument};
use crate::integrity::expected_path;
use crate::models::{Book, ReadStatus, SortField, Tag};
use crate::storage::{JsonPersistence, StorageError, StorageStats};

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("A book is already stored at '{0}'")]
    DuplicatePath(std::path::PathBuf),

    #[error("Book not found: {0}")]
    NotFound(Uuid),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<DocumentError> for StoreError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::DuplicatePath(path) => StoreError::DuplicatePath(path),
            DocumentError::BookNotFound(uuid) => StoreError::NotFound(uuid),
            DocumentError::TagNotFound(name) => StoreError::TagNotFound(name),
            other => StoreError::Invalid(other.to_string()),
        }
    }
}

impl StoreError {
    /// A hint for the user, for failures of the library file itself
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::Storage(e) => e.recovery_suggestion(),
            _ => None,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Unified storage interface for Trove
pub struct Store {
    /// The library document as last read or written
    doc: LibraryDocument,
    /// JSON file persistence handler
    persistence: JsonPersistence,
    /// Configuration
    config: Config,
}

impl Store {
    /// Open the store using the discovered configuration
    pub fn open() -> StoreResult<Self> {
        let config = Config::load()?;
        Self::open_with_config(config)
    }

    /// Open the store with a specific configuration
    ///
    /// Creates an empty library file on first run.
    pub fn open_with_config(config: Config) -> StoreResult<Self> {
        let persistence = JsonPersistence::new(&config);
        let doc = persistence.load_or_create()?;
        debug!(
            path = %persistence.path().display(),
            books = doc.book_count(),
            "Opened library"
        );

        Ok(Self {
            doc,
            persistence,
            config,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Root directory of the library
    pub fn library_root(&self) -> &Path {
        &self.config.library_path
    }

    /// Path of the library file
    pub fn path(&self) -> &Path {
        self.persistence.path()
    }

    /// Re-read the library file
    pub fn reload(&mut self) -> StoreResult<()> {
        self.doc = self.persistence.load_or_create()?;
        Ok(())
    }

    /// Reload, apply `change`, then persist
    fn mutate<T, F>(&mut self, change: F) -> StoreResult<T>
    where
        F: FnOnce(&mut LibraryDocument) -> Result<T, DocumentError>,
    {
        let mut doc = self.persistence.load_or_create()?;
        let result = change(&mut doc)?;
        self.persistence.save(&doc)?;
        self.doc = doc;
        Ok(result)
    }

    // ==================== Book Operations ====================

    /// Add a new book
    ///
    /// Fails with [`StoreError::DuplicatePath`] if another record already
    /// points at the same file.
    pub fn add_book(&mut self, book: &Book) -> StoreResult<DocId> {
        if book.title.trim().is_empty() || book.author.trim().is_empty() {
            return Err(StoreError::Invalid(
                "title and author cannot be empty".to_string(),
            ));
        }
        let book = book.clone();
        self.mutate(move |doc| doc.add_book(book))
    }

    /// Update an existing book
    pub fn update_book(&mut self, book: &Book) -> StoreResult<()> {
        self.mutate(|doc| doc.update_book(book))
    }

    /// Delete a book record, returning it
    ///
    /// The file on disk is not touched.
    pub fn delete_book(&mut self, uuid: Uuid) -> StoreResult<Book> {
        self.mutate(|doc| doc.delete_book(uuid))
    }

    /// Delete a book record and then its files
    ///
    /// Returns the removed record and the files that were deleted. A
    /// file that is already gone is skipped with a warning.
    pub fn delete_book_with_files(&mut self, uuid: Uuid) -> StoreResult<(Book, Vec<PathBuf>)> {
        let book = self.delete_book(uuid)?;
        let root = self.library_root().to_path_buf();

        let mut candidates = Vec::new();
        match expected_path(&book, &root) {
            Ok(path) => candidates.push(path),
            Err(reason) => warn!(uuid = %book.uuid, %reason, "Can't locate primary file"),
        }
        candidates.extend(book.other_formats.iter().map(|p| root.join(p)));

        let mut removed = Vec::new();
        for path in candidates {
            match fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove book file"),
            }
        }
        info!(uuid = %book.uuid, files = removed.len(), "Deleted book");
        Ok((book, removed))
    }

    /// Get a book by uuid
    pub fn get_book(&self, uuid: Uuid) -> Option<Book> {
        self.doc.get_book(uuid).cloned()
    }

    /// Find a book by uuid or by an unambiguous uuid prefix
    pub fn find_book(&self, id: &str) -> Option<Book> {
        if let Ok(uuid) = Uuid::parse_str(id) {
            return self.get_book(uuid);
        }

        let id = id.to_lowercase();
        let mut matches = self
            .doc
            .books()
            .filter(|b| b.uuid.to_string().starts_with(&id));
        match (matches.next(), matches.next()) {
            (Some(book), None) => Some(book.clone()),
            _ => None,
        }
    }

    /// Get the book stored at `path` (relative to the library root)
    pub fn find_by_path(&self, path: &Path) -> Option<Book> {
        self.doc.find_by_path(path).cloned()
    }

    /// Get all books in store order
    pub fn get_all_books(&self) -> Vec<Book> {
        self.doc.books().cloned().collect()
    }

    /// All books with their document ids, in store order
    pub fn book_entries(&self) -> Vec<(DocId, Book)> {
        self.doc
            .book_entries()
            .map(|(id, b)| (id, b.clone()))
            .collect()
    }

    /// Case-insensitive substring search on title or author
    ///
    /// An empty query returns every book.
    pub fn search_books(&self, query: &str) -> Vec<Book> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.get_all_books();
        }
        self.doc
            .books()
            .filter(|b| {
                b.title.to_lowercase().contains(&query) || b.author.to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }

    /// Get books carrying a tag
    pub fn get_books_by_tag(&self, tag: &str) -> Vec<Book> {
        self.doc
            .books()
            .filter(|b| b.tags.iter().any(|t| t == tag))
            .cloned()
            .collect()
    }

    /// Get books by an exact author name
    pub fn get_books_by_author(&self, author: &str) -> Vec<Book> {
        self.doc
            .books()
            .filter(|b| b.author == author)
            .cloned()
            .collect()
    }

    /// Get the books of a series, ordered by series index
    ///
    /// Books without an index come last, in store order.
    pub fn get_books_by_series(&self, series: &str) -> Vec<Book> {
        let mut books: Vec<Book> = self
            .doc
            .books()
            .filter(|b| b.series.as_ref().is_some_and(|s| s.name == series))
            .cloned()
            .collect();
        books.sort_by(|a, b| {
            let ai = a.series.as_ref().and_then(|s| s.index);
            let bi = b.series.as_ref().and_then(|s| s.index);
            match (ai, bi) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
        books
    }

    /// Get books with a given reading status
    pub fn get_books_by_status(&self, status: ReadStatus) -> Vec<Book> {
        self.doc
            .books()
            .filter(|b| b.read_status == status)
            .cloned()
            .collect()
    }

    /// All books sorted by `field`
    ///
    /// `added` sorts newest first; the other fields sort ascending.
    /// `reverse` flips either direction.
    pub fn sorted_books(&self, field: SortField, reverse: bool) -> Vec<Book> {
        let mut books = self.get_all_books();
        sort_books(&mut books, field, reverse);
        books
    }

    /// Distinct author names, sorted
    pub fn author_names(&self) -> Vec<String> {
        self.doc
            .books()
            .map(|b| b.author.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct series names, sorted
    pub fn series_names(&self) -> Vec<String> {
        self.doc
            .books()
            .filter_map(|b| b.series.as_ref().map(|s| s.name.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Get count of books
    pub fn book_count(&self) -> usize {
        self.doc.book_count()
    }

    // ==================== Tag Operations ====================

    /// Insert a tag definition or update its icon
    ///
    /// Returns `true` if the tag was new.
    pub fn upsert_tag(&mut self, tag: &Tag) -> StoreResult<bool> {
        let tag = tag.clone();
        self.mutate(move |doc| doc.upsert_tag(tag))
    }

    /// Insert or update several tags with a single write
    ///
    /// Returns how many were new.
    pub fn upsert_tags(&mut self, tags: &[Tag]) -> StoreResult<usize> {
        self.mutate(|doc| {
            let mut inserted = 0;
            for tag in tags {
                if doc.upsert_tag(tag.clone())? {
                    inserted += 1;
                }
            }
            Ok(inserted)
        })
    }

    /// Remove a tag definition
    ///
    /// Books keep the tag name in their `tags` list.
    pub fn remove_tag(&mut self, name: &str) -> StoreResult<Tag> {
        self.mutate(|doc| doc.remove_tag(name))
    }

    /// Get a tag definition by name
    pub fn get_tag(&self, name: &str) -> Option<Tag> {
        self.doc.get_tag(name).cloned()
    }

    /// All tag definitions in store order
    pub fn get_all_tags(&self) -> Vec<Tag> {
        self.doc.tags().cloned().collect()
    }

    /// Every tag name in use: definitions plus names only found on books
    pub fn tag_names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.doc.tags().map(|t| t.name.clone()).collect();
        for book in self.doc.books() {
            names.extend(book.tags.iter().cloned());
        }
        names.into_iter().collect()
    }

    /// Tag names with the number of books carrying each
    pub fn tags_with_counts(&self) -> Vec<(String, usize)> {
        self.tag_names()
            .into_iter()
            .map(|name| {
                let count = self
                    .doc
                    .books()
                    .filter(|b| b.tags.contains(&name))
                    .count();
                (name, count)
            })
            .collect()
    }

    // ==================== Stats ====================

    /// Library file and record statistics
    pub fn stats(&self) -> StorageStats {
        let count_status = |status| {
            self.doc
                .books()
                .filter(|b| b.read_status == status)
                .count()
        };

        StorageStats {
            file_size: self.persistence.file_size(),
            book_count: self.doc.book_count(),
            tag_count: self.doc.tag_count(),
            author_count: self.author_names().len(),
            series_count: self.series_names().len(),
            unread_count: count_status(ReadStatus::Unread),
            reading_count: count_status(ReadStatus::Reading),
            read_count: count_status(ReadStatus::Read),
        }
    }
}

/// Sort books in place
///
/// `added` sorts newest first; the other fields sort ascending and
/// case-insensitively. Ties keep their existing order.
pub fn sort_books(books: &mut [Book], field: SortField, reverse: bool) {
    match field {
        SortField::Added => books.sort_by(|a, b| b.added.cmp(&a.added)),
        SortField::Author => books.sort_by_cached_key(|b| b.author.to_lowercase()),
        SortField::Title => books.sort_by_cached_key(|b| b.title.to_lowercase()),
        SortField::Read => books.sort_by_key(|b| (status_rank(b.read_status), b.read_at)),
    }
    if reverse {
        books.reverse();
    }
}

fn status_rank(status: ReadStatus) -> u8 {
    match status {
        ReadStatus::Unread => 0,
        ReadStatus::Reading => 1,
        ReadStatus::Read => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Series;
    use chrono::{Duration, Utc};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        Config::with_library(temp_dir.path())
    }

    fn book(title: &str, author: &str) -> Book {
        Book::new(title, author, format!("{author}/{title} - {author}.pdf"))
    }

    #[test]
    fn test_open_creates_library_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let store = Store::open_with_config(config.clone()).unwrap();
        assert_eq!(store.book_count(), 0);
        assert!(config.store_path().exists());
    }

    #[test]
    fn test_open_loads_existing_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        {
            let mut store = Store::open_with_config(config.clone()).unwrap();
            store.add_book(&book("Baudolino", "Umberto Eco")).unwrap();
        }

        let store = Store::open_with_config(config).unwrap();
        assert_eq!(store.book_count(), 1);
    }

    #[test]
    fn test_corrupt_library_file_has_suggestion() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        std::fs::write(config.store_path(), "not json").unwrap();

        let err = Store::open_with_config(config).err().unwrap();
        assert!(matches!(
            err,
            StoreError::Storage(StorageError::CorruptDocument { .. })
        ));
        assert!(err.recovery_suggestion().is_some());
        assert!(StoreError::TagNotFound("x".to_string())
            .recovery_suggestion()
            .is_none());
    }

    #[test]
    fn test_add_and_get_book() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        let mut b = book("Summa", "Tommaso dAquino");
        b.add_tag("Teologia");
        store.add_book(&b).unwrap();

        let retrieved = store.get_book(b.uuid).unwrap();
        assert_eq!(retrieved, b);
        assert_eq!(store.find_by_path(&b.file_path).unwrap().uuid, b.uuid);
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        let first = book("Same", "Author");
        store.add_book(&first).unwrap();

        let second = Book::new("Other", "Author", first.file_path.clone());
        let err = store.add_book(&second).unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePath(_)));
        assert_eq!(store.book_count(), 1);
    }

    #[test]
    fn test_empty_title_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        let err = store.add_book(&Book::new("  ", "A", "A/x.pdf")).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn test_update_and_delete_book() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        let mut b = book("Draft", "A");
        store.add_book(&b).unwrap();

        b.set_title("Final");
        store.update_book(&b).unwrap();
        assert_eq!(store.get_book(b.uuid).unwrap().title, "Final");

        let removed = store.delete_book(b.uuid).unwrap();
        assert_eq!(removed.uuid, b.uuid);
        assert_eq!(store.book_count(), 0);

        let err = store.delete_book(b.uuid).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_mutation_sees_other_writers() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let mut first = Store::open_with_config(config.clone()).unwrap();
        let mut second = Store::open_with_config(config.clone()).unwrap();

        first.add_book(&book("One", "A")).unwrap();
        second.add_book(&book("Two", "A")).unwrap();

        let reopened = Store::open_with_config(config).unwrap();
        assert_eq!(reopened.book_count(), 2);
    }

    #[test]
    fn test_find_book_by_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        let b = book("T", "A");
        store.add_book(&b).unwrap();

        let prefix = &b.uuid.to_string()[..8];
        assert_eq!(store.find_book(prefix).unwrap().uuid, b.uuid);
        assert_eq!(store.find_book(&b.uuid.to_string()).unwrap().uuid, b.uuid);
        assert!(store.find_book("zzzz").is_none());
    }

    #[test]
    fn test_search_books() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        store.add_book(&book("Il nome della rosa", "Umberto Eco")).unwrap();
        store.add_book(&book("Confessioni", "Agostino")).unwrap();

        assert_eq!(store.search_books("ROSA").len(), 1);
        assert_eq!(store.search_books("eco").len(), 1);
        assert_eq!(store.search_books("").len(), 2);
        assert!(store.search_books("kant").is_empty());
    }

    #[test]
    fn test_books_by_tag_author_series() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        let mut second = book("Second", "A");
        second.series = Some(Series::new("Saga", Some(2.0)));
        second.add_tag("Storia");
        let mut first = book("First", "A");
        first.series = Some(Series::new("Saga", Some(1.0)));
        let mut loose = book("Loose", "B");
        loose.series = Some(Series::new("Saga", None));

        store.add_book(&second).unwrap();
        store.add_book(&loose).unwrap();
        store.add_book(&first).unwrap();

        let titles: Vec<_> = store
            .get_books_by_series("Saga")
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second", "Loose"]);

        assert_eq!(store.get_books_by_tag("Storia").len(), 1);
        assert_eq!(store.get_books_by_author("A").len(), 2);
        assert_eq!(store.author_names(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(store.series_names(), vec!["Saga".to_string()]);
    }

    #[test]
    fn test_sorted_books() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        let mut old = book("beta", "Zeno");
        old.added = Utc::now() - Duration::days(10);
        let new = book("Alpha", "abelard");
        store.add_book(&old).unwrap();
        store.add_book(&new).unwrap();

        let titles = |books: Vec<Book>| books.into_iter().map(|b| b.title).collect::<Vec<_>>();

        assert_eq!(titles(store.sorted_books(SortField::Added, false)), vec!["Alpha", "beta"]);
        assert_eq!(titles(store.sorted_books(SortField::Added, true)), vec!["beta", "Alpha"]);
        assert_eq!(titles(store.sorted_books(SortField::Title, false)), vec!["Alpha", "beta"]);
        assert_eq!(titles(store.sorted_books(SortField::Author, false)), vec!["Alpha", "beta"]);
    }

    #[test]
    fn test_tags() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        let mut b = book("T", "A");
        b.add_tag("Logica");
        b.add_tag("Loose");
        store.add_book(&b).unwrap();

        assert!(store.upsert_tag(&Tag::new("Logica", "🧠")).unwrap());
        assert!(!store.upsert_tag(&Tag::new("Logica", "💡")).unwrap());
        assert_eq!(store.get_tag("Logica").unwrap().icon, "💡");

        assert_eq!(
            store.tag_names(),
            vec!["Logica".to_string(), "Loose".to_string()]
        );
        assert_eq!(
            store.tags_with_counts(),
            vec![("Logica".to_string(), 1), ("Loose".to_string(), 1)]
        );

        store.remove_tag("Logica").unwrap();
        assert!(store.get_tag("Logica").is_none());
        // Books keep the name
        assert_eq!(store.get_book(b.uuid).unwrap().tags.len(), 2);

        let err = store.remove_tag("Logica").unwrap_err();
        assert!(matches!(err, StoreError::TagNotFound(_)));
    }

    #[test]
    fn test_stats() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        let mut read = book("Read", "A");
        read.set_read_status(ReadStatus::Read);
        store.add_book(&read).unwrap();
        store.add_book(&book("Unread", "B")).unwrap();

        let stats = store.stats();
        assert_eq!(stats.book_count, 2);
        assert_eq!(stats.author_count, 2);
        assert_eq!(stats.read_count, 1);
        assert_eq!(stats.unread_count, 1);
        assert!(stats.file_size > 0);
    }

    #[test]
    fn test_store_path_under_library() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open_with_config(test_config(&temp_dir)).unwrap();
        assert_eq!(store.path(), temp_dir.path().join(PathBuf::from("library.json")));
    }

    #[test]
    fn test_delete_book_with_files() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        let dir = temp_dir.path().join("Eco");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Rosa - Eco.pdf"), b"pdf").unwrap();
        std::fs::write(dir.join("Rosa - Eco.epub"), b"epub").unwrap();

        let mut rosa = Book::new("Rosa", "Eco", "Eco/Rosa - Eco.pdf");
        rosa.other_formats.push(PathBuf::from("Eco/Rosa - Eco.epub"));
        rosa.other_formats.push(PathBuf::from("Eco/gone.docx"));
        store.add_book(&rosa).unwrap();

        let (deleted, removed) = store.delete_book_with_files(rosa.uuid).unwrap();
        assert_eq!(deleted.uuid, rosa.uuid);
        assert_eq!(removed.len(), 2);
        assert!(!dir.join("Rosa - Eco.pdf").exists());
        assert!(!dir.join("Rosa - Eco.epub").exists());
        assert_eq!(store.book_count(), 0);

        let err = store.delete_book_with_files(rosa.uuid).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
