//! Adding files to the library
//!
//! Ingestion copies a source file into the library under a canonical
//! name, optionally writes embedded metadata, and inserts the record.
//!
//! Order of side effects:
//! 1. create the destination directory
//! 2. copy the source (the original is never moved)
//! 3. write metadata (failure is recorded, never rolled back)
//! 4. insert the record (on failure the copy is removed)
//!
//! The source is validated before step 1, so a bad source leaves both
//! the filesystem and the store untouched.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::metadata::{self, ExifTool, MetadataFields, MetadataWriter};
use crate::models::{Book, MetadataStatus, ReadStatus, Series};
use crate::naming;
use crate::store::{Store, StoreError};

/// Errors that can occur while ingesting a file
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("Source file not found: '{0}'")]
    SourceMissing(PathBuf),

    #[error("No usable file: {0}")]
    NoUsableFile(String),

    #[error("Source is not a regular file: '{0}'")]
    SourceNotFile(PathBuf),

    #[error("Cannot read source file '{path}': {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to copy '{from}' to '{to}': {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            IngestError::Store(e) => e.recovery_suggestion(),
            _ => None,
        }
    }
}

/// Fixed directories for files that can't go in an author directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackBucket {
    /// Entries with no file in the primary (PDF) format
    NoPrimaryFormat,
    /// Files whose metadata could not be rewritten
    MetadataUpdateFailed,
}

impl FallbackBucket {
    pub fn dir_name(&self) -> &'static str {
        match self {
            FallbackBucket::NoPrimaryFormat => "01 - no-primary-format",
            FallbackBucket::MetadataUpdateFailed => "02 - metadata-update-failed",
        }
    }
}

/// Where a copied file lands inside the library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// `<author dir>/<title> - <author>.<ext>`
    AuthorDir,
    /// `<bucket>/<author>-<original file name>`
    Bucket(FallbackBucket),
}

/// Everything needed to add one file
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRequest {
    pub source: PathBuf,
    pub title: String,
    pub author: String,
    pub tags: Vec<String>,
    pub series: Option<String>,
    pub series_index: Option<f64>,
    pub description: Option<String>,
    pub read_status: ReadStatus,
    pub read_at: Option<DateTime<Utc>>,
    /// Overrides the added date (defaults to now)
    pub added: Option<DateTime<Utc>>,
}

impl IngestRequest {
    pub fn new(
        source: impl Into<PathBuf>,
        title: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            author: author.into(),
            tags: Vec::new(),
            series: None,
            series_index: None,
            description: None,
            read_status: ReadStatus::Unread,
            read_at: None,
            added: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Fields written into the file's embedded metadata
    pub fn metadata_fields(&self) -> MetadataFields {
        MetadataFields {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            keywords: self.tags.clone(),
            description: self.description.clone(),
        }
    }

    /// Build the record for a file already placed at `file_path`
    pub fn into_book(self, file_path: PathBuf, metadata: MetadataStatus) -> Book {
        let mut book = Book::new(self.title.trim(), self.author.trim(), file_path);
        if let Some(added) = self.added {
            book.added = added;
        }
        book.set_tags(self.tags);
        book.set_description(self.description);
        book.set_series(self.series.map(|name| Series::new(name.trim(), self.series_index)));
        book.set_read_status(self.read_status);
        if self.read_at.is_some() {
            book.read_at = self.read_at;
        }
        book.metadata = metadata;
        book
    }
}

/// Copies files into the library and records them
pub struct Ingestor {
    library_root: PathBuf,
    writer: Option<Box<dyn MetadataWriter>>,
}

impl Ingestor {
    /// Create an ingestor using the configured library and metadata tool
    pub fn new(config: &Config) -> Self {
        let writer = ExifTool::from_config(config).map(|tool| Box::new(tool) as Box<dyn MetadataWriter>);
        Self::with_writer(&config.library_path, writer)
    }

    /// Create an ingestor with an explicit metadata writer
    pub fn with_writer(
        library_root: impl Into<PathBuf>,
        writer: Option<Box<dyn MetadataWriter>>,
    ) -> Self {
        Self {
            library_root: library_root.into(),
            writer,
        }
    }

    pub fn library_root(&self) -> &Path {
        &self.library_root
    }

    /// Add one file to the library
    ///
    /// On success the returned book's `file_path`, joined onto the
    /// library root, exists and equals the stored path.
    pub fn ingest(&self, store: &mut Store, request: IngestRequest) -> Result<Book, IngestError> {
        validate_fields(&request.title, &request.author)?;
        check_source(&request.source)?;

        let relative = self.place(
            store,
            &request.source,
            &request.author,
            &request.title,
            Placement::AuthorDir,
        )?;
        let status = self.write_metadata(&relative, &request.metadata_fields());

        let book = request.into_book(relative, status);
        self.insert(store, book)
    }

    /// Copy `source` into the library, returning the path relative to the root
    ///
    /// The destination directory is created if needed. If the canonical
    /// destination is taken on disk or by a record, a `" (n)"` counter
    /// is appended.
    pub fn place(
        &self,
        store: &Store,
        source: &Path,
        author: &str,
        title: &str,
        placement: Placement,
    ) -> Result<PathBuf, IngestError> {
        check_source(source)?;

        let wanted = match placement {
            Placement::AuthorDir => {
                naming::book_relative_path(title, author, &naming::extension_of(source))
            }
            Placement::Bucket(bucket) => {
                let original = source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                PathBuf::from(bucket.dir_name())
                    .join(format!("{}-{}", naming::sanitize_author(author), original))
            }
        };

        let relative = naming::first_free(&wanted, |candidate| {
            self.library_root.join(candidate).exists() || store.find_by_path(candidate).is_some()
        });
        let destination = self.library_root.join(&relative);

        if let Some(dir) = destination.parent() {
            fs::create_dir_all(dir).map_err(|source| IngestError::CreateDirectory {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        if let Err(e) = fs::copy(source, &destination) {
            // A failed copy can leave a truncated file behind
            let _ = fs::remove_file(&destination);
            return Err(IngestError::Copy {
                from: source.to_path_buf(),
                to: destination,
                source: e,
            });
        }

        info!(
            from = %source.display(),
            to = %relative.display(),
            "Copied file into library"
        );
        Ok(relative)
    }

    /// Write embedded metadata into a placed file
    pub fn write_metadata(&self, relative: &Path, fields: &MetadataFields) -> MetadataStatus {
        metadata::apply(
            self.writer.as_deref(),
            &self.library_root.join(relative),
            fields,
        )
    }

    /// Insert the record for a placed file
    ///
    /// If the store rejects the record, the placed file and any other
    /// formats are removed before the error is returned. A primary file
    /// that another record already points at is left alone.
    pub fn insert(&self, store: &mut Store, book: Book) -> Result<Book, IngestError> {
        match store.add_book(&book) {
            Ok(_) => {
                info!(
                    uuid = %book.uuid,
                    title = %book.title,
                    path = %book.file_path.display(),
                    "Added book"
                );
                Ok(book)
            }
            Err(e) => {
                let _ = store.reload();
                if store.find_by_path(&book.file_path).is_none() {
                    self.discard(&book.file_path);
                }
                for other in &book.other_formats {
                    self.discard(other);
                }
                Err(e.into())
            }
        }
    }

    /// Best-effort removal of a placed file
    pub fn discard(&self, relative: &Path) {
        let path = self.library_root.join(relative);
        if let Err(e) = fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "Failed to remove copied file");
        }
    }
}

/// Title and author must be non-empty after trimming
pub fn validate_fields(title: &str, author: &str) -> Result<(), IngestError> {
    if title.trim().is_empty() {
        return Err(IngestError::EmptyField("title"));
    }
    if author.trim().is_empty() {
        return Err(IngestError::EmptyField("author"));
    }
    Ok(())
}

/// The source must be an existing, readable regular file
pub fn check_source(source: &Path) -> Result<(), IngestError> {
    let meta = fs::metadata(source).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => IngestError::SourceMissing(source.to_path_buf()),
        _ => IngestError::SourceUnreadable {
            path: source.to_path_buf(),
            source: e,
        },
    })?;
    if !meta.is_file() {
        return Err(IngestError::SourceNotFile(source.to_path_buf()));
    }
    File::open(source).map_err(|e| IngestError::SourceUnreadable {
        path: source.to_path_buf(),
        source: e,
    })?;
    Ok(())
}
