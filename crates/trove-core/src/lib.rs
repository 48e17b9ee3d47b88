//! Trove Core Library
//!
//! This crate provides the core functionality for Trove, a catalogue for
//! a personal collection of PDF, EPUB and DOCX files.
//!
//! # Architecture
//!
//! - **Library root**: a directory with one subdirectory per author and
//!   two fallback buckets for files that can't be filed normally
//! - **Library file**: a JSON document with a `books` and a `tags` table,
//!   rewritten atomically on every change
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut store = Store::open_with_config(config.clone())?;
//!
//! // Add a file
//! let ingestor = Ingestor::new(&config);
//! let book = ingestor.ingest(&mut store, IngestRequest::new(path, "Title", "Author"))?;
//!
//! // Query books
//! let books = store.search_books("author");
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `models`: Books, tags and their small enums
//! - `naming`: Canonical file and directory names
//! - `ingest`: Copying files into the library
//! - `metadata`: Writing embedded metadata with exiftool
//! - `calibre`: Calibre export importer
//! - `scan`: Importing a directory of named PDFs
//! - `tags`: Tag seeding
//! - `integrity`: Cross-checking records against the filesystem
//! - `document`, `storage`: The library file and its persistence
//! - `config`: Application configuration

pub mod calibre;
pub mod config;
pub mod document;
pub mod ingest;
pub mod integrity;
pub mod metadata;
pub mod models;
pub mod naming;
pub mod scan;
pub mod storage;
pub mod store;
pub mod tags;

pub use calibre::{CalibreImporter, ImportReport};
pub use config::{Config, ConfigError, ConfigFile};
pub use document::{DocumentError, LibraryDocument};
pub use ingest::{FallbackBucket, IngestError, IngestRequest, Ingestor, Placement};
pub use integrity::IntegrityReport;
pub use metadata::{ExifTool, MetadataError, MetadataWriter};
pub use models::{Book, MetadataStatus, ReadStatus, Series, SortField, Tag};
pub use storage::{JsonPersistence, StorageError, StorageStats};
pub use store::{Store, StoreError};
