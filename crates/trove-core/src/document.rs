//! In-memory library document
//!
//! The library file holds two tables keyed by a numeric document id:
//!
//! ```json
//! { "books": { "1": { ... } }, "tags": { "1": { "name": "...", "icon": "..." } } }
//! ```
//!
//! A new record gets the table's highest id plus one, so iterating a
//! table yields records in the order they were added. Gaps left by
//! deletions are never filled, but deleting the highest id frees it for
//! the next insert. `LibraryDocument` owns both tables and enforces the
//! per-table invariants (unique `file_path`, unique tag name).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Book, Tag};

/// Errors that can occur during document operations
#[derive(Error, Debug, PartialEq)]
pub enum DocumentError {
    #[error("A book already uses the file path '{0}'")]
    DuplicatePath(PathBuf),

    #[error("A book with id {0} already exists")]
    DuplicateId(Uuid),

    #[error("Book not found: {0}")]
    BookNotFound(Uuid),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Tag name cannot be empty")]
    EmptyTagName,
}

/// Numeric document id of a record within its table
pub type DocId = u64;

/// The two tables of the library file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryDocument {
    #[serde(default)]
    books: BTreeMap<DocId, Book>,
    #[serde(default)]
    tags: BTreeMap<DocId, Tag>,
}

fn next_id<T>(table: &BTreeMap<DocId, T>) -> DocId {
    table.keys().next_back().map_or(1, |last| last + 1)
}

impl LibraryDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from its JSON text
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Serialize the document as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    // ==================== Books ====================

    /// Insert a book, returning its document id
    ///
    /// Fails if another book already has the same `file_path` or uuid.
    pub fn add_book(&mut self, book: Book) -> Result<DocId, DocumentError> {
        if self.find_by_path(&book.file_path).is_some() {
            return Err(DocumentError::DuplicatePath(book.file_path));
        }
        if self.get_book(book.uuid).is_some() {
            return Err(DocumentError::DuplicateId(book.uuid));
        }

        let id = next_id(&self.books);
        self.books.insert(id, book);
        Ok(id)
    }

    /// Replace the stored book that has the same uuid
    pub fn update_book(&mut self, book: &Book) -> Result<(), DocumentError> {
        if let Some(other) = self.find_by_path(&book.file_path) {
            if other.uuid != book.uuid {
                return Err(DocumentError::DuplicatePath(book.file_path.clone()));
            }
        }

        let slot = self
            .books
            .values_mut()
            .find(|b| b.uuid == book.uuid)
            .ok_or(DocumentError::BookNotFound(book.uuid))?;
        *slot = book.clone();
        Ok(())
    }

    /// Remove a book, returning the removed record
    pub fn delete_book(&mut self, uuid: Uuid) -> Result<Book, DocumentError> {
        let id = self
            .books
            .iter()
            .find(|(_, b)| b.uuid == uuid)
            .map(|(id, _)| *id)
            .ok_or(DocumentError::BookNotFound(uuid))?;
        self.books
            .remove(&id)
            .ok_or(DocumentError::BookNotFound(uuid))
    }

    /// Get a book by uuid
    pub fn get_book(&self, uuid: Uuid) -> Option<&Book> {
        self.books.values().find(|b| b.uuid == uuid)
    }

    /// Get the book stored at `path` (relative to the library root)
    pub fn find_by_path(&self, path: &Path) -> Option<&Book> {
        self.books.values().find(|b| b.file_path == path)
    }

    /// All books in store order
    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    /// All books with their document ids, in store order
    pub fn book_entries(&self) -> impl Iterator<Item = (DocId, &Book)> {
        self.books.iter().map(|(id, b)| (*id, b))
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    // ==================== Tags ====================

    /// Insert a tag or update the icon of an existing one
    ///
    /// Returns `true` if a new tag was inserted.
    pub fn upsert_tag(&mut self, tag: Tag) -> Result<bool, DocumentError> {
        if tag.name.trim().is_empty() {
            return Err(DocumentError::EmptyTagName);
        }

        if let Some(existing) = self.tags.values_mut().find(|t| t.name == tag.name) {
            existing.icon = tag.icon;
            return Ok(false);
        }

        let id = next_id(&self.tags);
        self.tags.insert(id, tag);
        Ok(true)
    }

    /// Remove a tag definition
    ///
    /// Books keep referencing the name.
    pub fn remove_tag(&mut self, name: &str) -> Result<Tag, DocumentError> {
        let id = self
            .tags
            .iter()
            .find(|(_, t)| t.name == name)
            .map(|(id, _)| *id)
            .ok_or_else(|| DocumentError::TagNotFound(name.to_string()))?;
        self.tags
            .remove(&id)
            .ok_or_else(|| DocumentError::TagNotFound(name.to_string()))
    }

    /// Get a tag by name
    pub fn get_tag(&self, name: &str) -> Option<&Tag> {
        self.tags.values().find(|t| t.name == name)
    }

    /// All tag definitions in store order
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }
}
