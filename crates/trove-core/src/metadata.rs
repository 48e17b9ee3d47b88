//! Embedded metadata writing
//!
//! After a file is copied into the library its title, author, keywords
//! and description are written into the file itself with exiftool.
//! The tool is optional: without one configured the step is skipped.
//! A failure never aborts an import; it is logged and recorded on the
//! book as [`MetadataStatus::Failed`].

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::MetadataStatus;

/// File extensions the metadata tool knows how to rewrite
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "epub", "docx"];

/// Errors raised by a metadata writer
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Metadata tool '{program}' not found")]
    ToolNotFound { program: PathBuf },

    #[error("Failed to run metadata tool '{program}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Metadata tool exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
}

/// Values written into a document's embedded metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFields {
    pub title: String,
    pub author: String,
    pub keywords: Vec<String>,
    pub description: Option<String>,
}

/// Something that can rewrite a file's embedded metadata
pub trait MetadataWriter {
    fn write(&self, path: &Path, fields: &MetadataFields) -> Result<(), MetadataError>;
}

/// exiftool invoked as a subprocess
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build from configuration; `None` when no tool is configured
    pub fn from_config(config: &Config) -> Option<Self> {
        config.exiftool_path.clone().map(Self::new)
    }

    /// Arguments passed to exiftool, file path last
    pub fn args(path: &Path, fields: &MetadataFields) -> Vec<String> {
        let mut args = vec![
            "-overwrite_original".to_string(),
            format!("-Title={}", fields.title),
            format!("-Author={}", fields.author),
        ];
        if !fields.keywords.is_empty() {
            args.push(format!("-Keywords={}", fields.keywords.join(", ")));
        }
        if let Some(description) = fields.description.as_ref().filter(|d| !d.trim().is_empty()) {
            args.push(format!("-Description={}", description));
        }
        args.push(path.to_string_lossy().into_owned());
        args
    }
}

impl MetadataWriter for ExifTool {
    fn write(&self, path: &Path, fields: &MetadataFields) -> Result<(), MetadataError> {
        let output = Command::new(&self.program)
            .args(Self::args(path, fields))
            .output()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => MetadataError::ToolNotFound {
                    program: self.program.clone(),
                },
                _ => MetadataError::Spawn {
                    program: self.program.clone(),
                    source,
                },
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(MetadataError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Whether the metadata tool handles files with this extension
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Write metadata if possible and report what happened
///
/// Never fails: tool errors are logged at WARN and turned into
/// [`MetadataStatus::Failed`].
pub fn apply(
    writer: Option<&dyn MetadataWriter>,
    path: &Path,
    fields: &MetadataFields,
) -> MetadataStatus {
    let Some(writer) = writer else {
        return MetadataStatus::NotAttempted;
    };
    if !is_supported(path) {
        debug!(path = %path.display(), "Metadata tool does not handle this file type");
        return MetadataStatus::Unsupported;
    }

    match writer.write(path, fields) {
        Ok(()) => {
            debug!(path = %path.display(), "Metadata updated");
            MetadataStatus::Updated
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Metadata update failed");
            MetadataStatus::Failed {
                reason: e.to_string(),
            }
        }
    }
}
