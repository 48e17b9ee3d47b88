//! Library file persistence
//!
//! Handles saving and loading the library document to/from the
//! filesystem. Uses atomic writes (write to temp file, then rename) to
//! prevent corruption.
//!
//! Location: `<library_path>/<tinydb_file>` (see [`Config::store_path`]).

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::error::Category;
use tracing::{debug, warn};

use crate::config::Config;
use crate::document::LibraryDocument;

use super::error::{Access, StorageError, StorageResult};

/// Persistence layer for the library document
///
/// Provides atomic file operations for saving/loading the JSON file.
#[derive(Debug, Clone)]
pub struct JsonPersistence {
    path: PathBuf,
}

impl JsonPersistence {
    /// Create a persistence handler for the configured store file
    pub fn new(config: &Config) -> Self {
        Self::at(config.store_path())
    }

    /// Create a persistence handler for an explicit file
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the library file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the library file exists on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Save a document to disk using atomic write
    pub fn save(&self, doc: &LibraryDocument) -> StorageResult<()> {
        let json = doc.to_json()?;
        atomic_write(&self.path, json.as_bytes())?;
        debug!(path = %self.path.display(), "Saved library");
        Ok(())
    }

    /// Load the document from disk
    ///
    /// Returns `None` if the file doesn't exist. A file that isn't valid
    /// JSON is copied to `<file>.corrupt.backup` before the error is
    /// returned; a file whose records are malformed is left alone.
    pub fn load(&self) -> StorageResult<Option<LibraryDocument>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| StorageError::from_io(Access::Read, &self.path, e))?;

        // An empty file is treated as an empty library
        if content.trim().is_empty() {
            return Ok(Some(LibraryDocument::new()));
        }

        match LibraryDocument::from_json(&content) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) if e.classify() == Category::Data => Err(StorageError::InvalidFormat {
                path: self.path.clone(),
                details: e.to_string(),
            }),
            Err(e) => {
                let backup_path = self.backup_path();
                fs::copy(&self.path, &backup_path)
                    .map_err(|e| StorageError::from_io(Access::Backup, &backup_path, e))?;
                warn!(
                    path = %self.path.display(),
                    backup = %backup_path.display(),
                    "Library file is corrupted, backup created"
                );
                Err(StorageError::CorruptDocument {
                    path: self.path.clone(),
                    backup_path,
                    details: e.to_string(),
                })
            }
        }
    }

    /// Load an existing document or create a new one
    pub fn load_or_create(&self) -> StorageResult<LibraryDocument> {
        if let Some(doc) = self.load()? {
            return Ok(doc);
        }

        let doc = LibraryDocument::new();
        self.save(&doc)?;
        Ok(doc)
    }

    /// Size of the library file in bytes (0 if it doesn't exist)
    pub fn file_size(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt.backup");
        PathBuf::from(name)
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// The target file is never left in a partially-written state.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| StorageError::from_io(Access::CreateDirectory, parent, e))?;
    }

    // Same directory, so the rename stays on one filesystem
    let temp_path = path.with_extension("tmp");

    let write_err = |e| StorageError::from_io(Access::Write, &temp_path, e);
    let mut file = File::create(&temp_path).map_err(write_err)?;
    file.write_all(data).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(StorageError::from_io(Access::Replace, path, e));
    }

    Ok(())
}
