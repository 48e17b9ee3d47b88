//! Storage error handling
//!
//! Every I/O failure on the library file is classified by what was being
//! done ([`Access`]) and by the OS error kind, so the CLI can print a
//! message and a hint that match the situation.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// What was being done to the library file when I/O failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    CreateDirectory,
    Backup,
    /// Renaming the temp file over the library file
    Replace,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Access::Read => "read",
            Access::Write => "write",
            Access::CreateDirectory => "create directory",
            Access::Backup => "back up",
            Access::Replace => "replace",
        })
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Cannot {access} '{path}': permission denied")]
    PermissionDenied {
        access: Access,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot {access} '{path}': no space left on device")]
    DiskFull {
        access: Access,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot {access} '{path}': it does not exist")]
    NotFound { access: Access, path: PathBuf },

    #[error("Cannot {access} '{path}': {source}")]
    Io {
        access: Access,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Not JSON at all; the file was copied aside before failing
    #[error("Library file '{path}' is not valid JSON ({details}); a copy was saved as '{backup_path}'")]
    CorruptDocument {
        path: PathBuf,
        backup_path: PathBuf,
        details: String,
    },

    /// JSON, but a record doesn't have the expected shape
    #[error("Invalid record in '{path}': {details}")]
    InvalidFormat { path: PathBuf, details: String },

    #[error("Failed to serialize library: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StorageError {
    /// Classify an I/O error on `path`
    pub fn from_io(access: Access, path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                access,
                path,
                source,
            },
            io::ErrorKind::NotFound => StorageError::NotFound { access, path },
            _ if is_disk_full(&source) => StorageError::DiskFull {
                access,
                path,
                source,
            },
            _ => StorageError::Io {
                access,
                path,
                source,
            },
        }
    }

    /// A hint for the user on how to get past this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::PermissionDenied { .. } => Some(
                "Make sure your user can read and write the library directory, \
                 or point library_path somewhere writable with `trove config set`.",
            ),
            StorageError::DiskFull { .. } => {
                Some("Free some space on the library's disk and run the command again.")
            }
            StorageError::NotFound {
                access: Access::CreateDirectory | Access::Write | Access::Replace,
                ..
            } => Some("Check that library_path points at an existing, mounted location."),
            StorageError::CorruptDocument { .. } => Some(
                "Restore the library file from a backup, or move it away to start \
                 an empty library. The saved copy holds the unreadable content.",
            ),
            StorageError::InvalidFormat { .. } => Some(
                "Every book needs uuid, title, author, added and file_path. \
                 Fix the record by hand and try again.",
            ),
            _ => None,
        }
    }
}

// StorageFull isn't reported consistently across platforms
fn is_disk_full(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    ["no space left", "disk full", "quota exceeded", "not enough space"]
        .iter()
        .any(|needle| msg.contains(needle))
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(kind: io::ErrorKind, msg: &str) -> StorageError {
        StorageError::from_io(
            Access::Write,
            "/books/library.json",
            io::Error::new(kind, msg.to_string()),
        )
    }

    #[test]
    fn test_classification() {
        assert!(matches!(
            classify(io::ErrorKind::PermissionDenied, "denied"),
            StorageError::PermissionDenied { access: Access::Write, .. }
        ));
        assert!(matches!(
            classify(io::ErrorKind::NotFound, "gone"),
            StorageError::NotFound { .. }
        ));
        assert!(matches!(
            classify(io::ErrorKind::Other, "No space left on device"),
            StorageError::DiskFull { .. }
        ));
        assert!(matches!(
            classify(io::ErrorKind::Other, "weird"),
            StorageError::Io { .. }
        ));
    }

    #[test]
    fn test_message_names_access_and_path() {
        let err = StorageError::from_io(
            Access::CreateDirectory,
            "/books",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "Cannot create directory '/books': permission denied"
        );
    }

    #[test]
    fn test_suggestions() {
        assert!(classify(io::ErrorKind::PermissionDenied, "denied")
            .recovery_suggestion()
            .is_some());
        assert!(classify(io::ErrorKind::Other, "weird")
            .recovery_suggestion()
            .is_none());

        let missing_on_read = StorageError::NotFound {
            access: Access::Read,
            path: PathBuf::from("/books/library.json"),
        };
        assert!(missing_on_read.recovery_suggestion().is_none());

        let invalid = StorageError::InvalidFormat {
            path: PathBuf::from("/books/library.json"),
            details: "missing field `title`".to_string(),
        };
        assert!(invalid.to_string().contains("/books/library.json"));
        assert!(invalid.recovery_suggestion().unwrap().contains("title"));
    }
}
