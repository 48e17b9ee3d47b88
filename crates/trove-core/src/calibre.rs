//! Calibre export importer
//!
//! Reads the JSON array produced by `calibredb list --for-machine` (or
//! a catalog export) and adds every entry to the library.
//!
//! - The first PDF among an entry's formats is the primary file. It is
//!   ingested into the author directory; if its metadata can't be
//!   rewritten the copy moves to the `02 - metadata-update-failed`
//!   bucket instead.
//! - Other formats of a successfully ingested PDF entry go to the
//!   `01 - no-primary-format` bucket and are listed in `other_formats`.
//! - Entries without a PDF are copied straight into
//!   `01 - no-primary-format`.
//!
//! Per-entry failures are logged and counted; the import carries on.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::ingest::{
    validate_fields, FallbackBucket, IngestError, IngestRequest, Ingestor, Placement,
};
use crate::models::{MetadataStatus, ReadStatus};
use crate::store::Store;

/// Author used when an entry lists none
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Title used when an entry has none
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// A field Calibre writes either as a string or as a list of strings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

/// One book of a Calibre export
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CalibreEntry {
    #[serde(default)]
    pub authors: Option<StringOrList>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub formats: Option<Vec<PathBuf>>,
    #[serde(default)]
    pub tags: Option<StringOrList>,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub series_index: Option<f64>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
}

impl CalibreEntry {
    /// First listed author, or [`UNKNOWN_AUTHOR`]
    pub fn first_author(&self) -> String {
        let first = match &self.authors {
            Some(StringOrList::One(s)) => Some(s.trim().to_string()),
            Some(StringOrList::Many(list)) => list
                .iter()
                .map(|a| a.trim())
                .find(|a| !a.is_empty())
                .map(str::to_string),
            None => None,
        };
        first
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
    }

    pub fn display_title(&self) -> String {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_TITLE)
            .to_string()
    }

    /// Tags as a list; a single string is split on commas
    pub fn tag_list(&self) -> Vec<String> {
        match &self.tags {
            Some(StringOrList::One(s)) => crate::models::parse_tag_list(s),
            Some(StringOrList::Many(list)) => list
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }

    /// `last_modified` as a UTC timestamp, if it parses as RFC 3339
    pub fn added(&self) -> Option<DateTime<Utc>> {
        self.last_modified
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn request(&self, source: &Path) -> IngestRequest {
        IngestRequest {
            source: source.to_path_buf(),
            title: self.display_title(),
            author: self.first_author(),
            tags: self.tag_list(),
            series: self.series.clone().filter(|s| !s.trim().is_empty()),
            series_index: self.series_index,
            description: self.comments.clone(),
            read_status: ReadStatus::Unread,
            read_at: None,
            added: self.added(),
        }
    }
}

/// A single entry that could not be imported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportFailure {
    pub title: String,
    pub reason: String,
}

/// Outcome of an import run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// Entries read from the export
    pub processed: usize,
    /// Entries that produced a record
    pub imported: usize,
    /// Imported entries whose primary file sits in a fallback bucket
    pub bucketed: usize,
    /// Entries that produced no record
    pub failed: usize,
    pub failures: Vec<ImportFailure>,
}

impl ImportReport {
    fn fail(&mut self, title: String, reason: String) {
        error!(title = %title, reason = %reason, "Failed to import entry");
        self.failed += 1;
        self.failures.push(ImportFailure { title, reason });
    }
}

/// What happened to one successfully imported entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    AuthorDir,
    Bucket,
}

/// Decode an export file
///
/// UTF-8 (with or without BOM) first, Windows-1252 otherwise. Calibre
/// on Windows sometimes writes the latter.
pub fn decode_export(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

/// Imports Calibre exports through an [`Ingestor`]
pub struct CalibreImporter {
    ingestor: Ingestor,
}

impl CalibreImporter {
    pub fn new(config: &Config) -> Self {
        Self::with_ingestor(Ingestor::new(config))
    }

    pub fn with_ingestor(ingestor: Ingestor) -> Self {
        Self { ingestor }
    }

    /// Import every entry of an export file
    ///
    /// Fails only if the file can't be read or isn't a JSON array.
    pub fn import_file(&self, store: &mut Store, path: &Path) -> Result<ImportReport> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read Calibre export {:?}", path))?;
        let text = decode_export(&bytes);
        let entries: Vec<serde_json::Value> = serde_json::from_str(&text)
            .with_context(|| format!("Calibre export {:?} is not a JSON array", path))?;

        info!(path = %path.display(), entries = entries.len(), "Starting Calibre import");
        let report = self.import_values(store, entries);
        info!(
            processed = report.processed,
            imported = report.imported,
            bucketed = report.bucketed,
            failed = report.failed,
            "Calibre import finished"
        );
        Ok(report)
    }

    /// Import raw JSON entries, decoding each one separately
    pub fn import_values(&self, store: &mut Store, entries: Vec<serde_json::Value>) -> ImportReport {
        let mut report = ImportReport::default();

        for value in entries {
            report.processed += 1;

            let entry: CalibreEntry = match serde_json::from_value(value.clone()) {
                Ok(entry) => entry,
                Err(e) => {
                    let title = value
                        .get("title")
                        .and_then(|t| t.as_str())
                        .unwrap_or(UNKNOWN_TITLE)
                        .to_string();
                    report.fail(title, format!("malformed entry: {}", e));
                    continue;
                }
            };

            match self.import_entry(store, &entry) {
                Ok(outcome) => {
                    report.imported += 1;
                    if outcome == Outcome::Bucket {
                        report.bucketed += 1;
                    }
                }
                Err(e) => report.fail(entry.display_title(), e.to_string()),
            }
        }

        report
    }

    fn import_entry(&self, store: &mut Store, entry: &CalibreEntry) -> Result<Outcome, IngestError> {
        let formats = entry.formats.clone().unwrap_or_default();
        if formats.is_empty() {
            return Err(IngestError::NoUsableFile("no formats listed".to_string()));
        }

        let title = entry.display_title();
        let author = entry.first_author();
        validate_fields(&title, &author)?;

        // A listed PDF that isn't on disk doesn't count as the primary format
        let pdf = formats.iter().find(|p| is_pdf(p) && p.is_file());
        match pdf {
            Some(pdf) => self.import_pdf(store, entry, pdf, &formats),
            None => self.import_without_pdf(store, entry, &formats),
        }
    }

    fn import_pdf(
        &self,
        store: &mut Store,
        entry: &CalibreEntry,
        pdf: &Path,
        formats: &[PathBuf],
    ) -> Result<Outcome, IngestError> {
        let request = entry.request(pdf);

        let mut relative = self.ingestor.place(
            store,
            pdf,
            &request.author,
            &request.title,
            Placement::AuthorDir,
        )?;
        let status = self
            .ingestor
            .write_metadata(&relative, &request.metadata_fields());

        let mut outcome = Outcome::AuthorDir;
        let mut other_formats = Vec::new();

        if status.is_failed() {
            self.ingestor.discard(&relative);
            relative = self.ingestor.place(
                store,
                pdf,
                &request.author,
                &request.title,
                Placement::Bucket(FallbackBucket::MetadataUpdateFailed),
            )?;
            warn!(
                title = %request.title,
                path = %relative.display(),
                "Metadata update failed, PDF placed in fallback bucket"
            );
            outcome = Outcome::Bucket;
        } else {
            for other in formats.iter().filter(|p| !is_pdf(p)) {
                match self.ingestor.place(
                    store,
                    other,
                    &request.author,
                    &request.title,
                    Placement::Bucket(FallbackBucket::NoPrimaryFormat),
                ) {
                    Ok(placed) => other_formats.push(placed),
                    Err(e) => warn!(file = %other.display(), error = %e, "Skipping extra format"),
                }
            }
        }

        let mut book = request.into_book(relative, status);
        book.other_formats = other_formats;
        self.ingestor.insert(store, book)?;
        Ok(outcome)
    }

    fn import_without_pdf(
        &self,
        store: &mut Store,
        entry: &CalibreEntry,
        formats: &[PathBuf],
    ) -> Result<Outcome, IngestError> {
        let Some(primary) = formats.iter().find(|p| p.is_file()) else {
            return Err(IngestError::NoUsableFile(
                "none of the listed formats exist".to_string(),
            ));
        };
        warn!(
            title = %entry.display_title(),
            formats = ?formats,
            "No usable PDF found, copying to fallback bucket"
        );

        let request = entry.request(primary);
        let bucket = Placement::Bucket(FallbackBucket::NoPrimaryFormat);
        let relative = self
            .ingestor
            .place(store, primary, &request.author, &request.title, bucket)?;

        let mut other_formats = Vec::new();
        for other in formats.iter().filter(|p| *p != primary) {
            match self
                .ingestor
                .place(store, other, &request.author, &request.title, bucket)
            {
                Ok(placed) => other_formats.push(placed),
                Err(e) => warn!(file = %other.display(), error = %e, "Skipping extra format"),
            }
        }

        let mut book = request.into_book(relative, MetadataStatus::NotAttempted);
        book.other_formats = other_formats;
        self.ingestor.insert(store, book)?;
        Ok(Outcome::Bucket)
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case("pdf"))
}
