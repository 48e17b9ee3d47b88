//! Storage layer
//!
//! The library is a single JSON file rewritten in full on every change.
//! `persistence` owns reading and atomically writing that file; `error`
//! classifies what can go wrong.

pub mod error;
pub mod persistence;

pub use error::{Access, StorageError, StorageResult};
pub use persistence::JsonPersistence;

use serde::Serialize;

/// Summary numbers about the library file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Size of the library file in bytes
    pub file_size: u64,
    pub book_count: usize,
    pub tag_count: usize,
    /// Distinct authors across all books
    pub author_count: usize,
    /// Distinct series across all books
    pub series_count: usize,
    pub unread_count: usize,
    pub reading_count: usize,
    pub read_count: usize,
}
