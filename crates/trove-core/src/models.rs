//! Data models for Trove
//!
//! Defines the core data structures: Book and Tag, plus the small enums
//! hanging off a book (reading status, series, metadata outcome).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a reader is with a book
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStatus {
    #[default]
    Unread,
    Reading,
    Read,
}

impl ReadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadStatus::Unread => "unread",
            ReadStatus::Reading => "reading",
            ReadStatus::Read => "read",
        }
    }
}

impl fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unread" | "" => Ok(ReadStatus::Unread),
            "reading" => Ok(ReadStatus::Reading),
            "read" => Ok(ReadStatus::Read),
            other => Err(format!(
                "Unknown read status '{}'. Use unread, reading or read.",
                other
            )),
        }
    }
}

/// Outcome of writing embedded metadata into the library copy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetadataStatus {
    /// No metadata tool configured, or the step was skipped
    #[default]
    NotAttempted,
    /// The file type isn't handled by the tool
    Unsupported,
    /// The tool rewrote the file successfully
    Updated,
    /// The tool ran and failed
    Failed { reason: String },
}

impl MetadataStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, MetadataStatus::Failed { .. })
    }
}

impl fmt::Display for MetadataStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataStatus::NotAttempted => f.write_str("not attempted"),
            MetadataStatus::Unsupported => f.write_str("unsupported format"),
            MetadataStatus::Updated => f.write_str("updated"),
            MetadataStatus::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Series membership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    /// Position within the series; fractional values are allowed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, index: Option<f64>) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{} #{}", self.name, format_series_index(index)),
            None => f.write_str(&self.name),
        }
    }
}

/// Render a series index without a trailing `.0`
pub fn format_series_index(index: f64) -> String {
    if index.fract() == 0.0 {
        format!("{}", index as i64)
    } else {
        format!("{}", index)
    }
}

/// A catalogued document file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Unique identifier
    pub uuid: Uuid,
    pub title: String,
    pub author: String,
    /// When the book entered the library
    pub added: DateTime<Utc>,
    /// When this record was last changed
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    /// Path of the primary file, relative to the library root
    pub file_path: PathBuf,
    /// Extra formats copied next to the primary file
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_formats: Vec<PathBuf>,
    /// Tag names, in insertion order
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Series>,
    #[serde(default)]
    pub read_status: ReadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: MetadataStatus,
}

impl Book {
    /// Create a new book record pointing at `file_path`
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        file_path: impl Into<PathBuf>,
    ) -> Self {
        let now = Utc::now();
        Self {
            uuid: Uuid::new_v4(),
            title: title.into(),
            author: author.into(),
            added: now,
            updated_at: now,
            file_path: file_path.into(),
            other_formats: Vec::new(),
            tags: Vec::new(),
            series: None,
            read_status: ReadStatus::Unread,
            read_at: None,
            description: None,
            metadata: MetadataStatus::NotAttempted,
        }
    }

    /// Update the title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = Utc::now();
    }

    /// Update the author
    pub fn set_author(&mut self, author: impl Into<String>) {
        self.author = author.into();
        self.updated_at = Utc::now();
    }

    /// Update the description
    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description.filter(|d| !d.trim().is_empty());
        self.updated_at = Utc::now();
    }

    /// Set or clear the series
    pub fn set_series(&mut self, series: Option<Series>) {
        self.series = series.filter(|s| !s.name.trim().is_empty());
        self.updated_at = Utc::now();
    }

    /// Change the reading status
    ///
    /// Marking a book read stamps `read_at`; moving it back to unread
    /// clears it.
    pub fn set_read_status(&mut self, status: ReadStatus) {
        let now = Utc::now();
        match status {
            ReadStatus::Read => {
                if self.read_status != ReadStatus::Read || self.read_at.is_none() {
                    self.read_at = Some(now);
                }
            }
            ReadStatus::Unread => self.read_at = None,
            ReadStatus::Reading => {}
        }
        self.read_status = status;
        self.updated_at = now;
    }

    /// Add a tag
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !tag.is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
            self.updated_at = Utc::now();
        }
    }

    /// Remove a tag
    pub fn remove_tag(&mut self, tag: &str) {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
            self.updated_at = Utc::now();
        }
    }

    /// Set all tags (replacing existing)
    ///
    /// Duplicates and empty names are dropped, first occurrence wins.
    pub fn set_tags(&mut self, tags: Vec<String>) {
        let mut unique = Vec::with_capacity(tags.len());
        for tag in tags {
            let tag = tag.trim().to_string();
            if !tag.is_empty() && !unique.contains(&tag) {
                unique.push(tag);
            }
        }
        self.tags = unique;
        self.updated_at = Utc::now();
    }

    /// Lower-cased file extension of the primary file
    pub fn extension(&self) -> Option<String> {
        self.file_path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }
}

/// A tag definition with its display icon
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub icon: String,
}

impl Tag {
    /// Create a new tag
    pub fn new(name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
        }
    }

    /// Display form: `"<icon> <name>"`, or the bare name without an icon
    pub fn label(&self) -> String {
        if self.icon.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.icon, self.name)
        }
    }
}

/// Render tag names with their icons, joined by `", "`
///
/// Names without a tag definition are shown bare.
pub fn format_tags(names: &[String], tags: &[Tag]) -> String {
    names
        .iter()
        .map(|name| match tags.iter().find(|t| &t.name == name) {
            Some(tag) => tag.label(),
            None => name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split a comma-separated tag list
pub fn parse_tag_list(input: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Fields a book list can be sorted by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortField {
    /// Date added; newest first by default
    #[default]
    Added,
    Author,
    Title,
    /// Reading status, then read date
    Read,
}

impl SortField {
    pub const ALL: [SortField; 4] = [
        SortField::Added,
        SortField::Author,
        SortField::Title,
        SortField::Read,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Added => "added",
            SortField::Author => "author",
            SortField::Title => "title",
            SortField::Read => "read",
        }
    }

    /// The next field in cycling order
    pub fn next(&self) -> Self {
        match self {
            SortField::Added => SortField::Author,
            SortField::Author => SortField::Title,
            SortField::Title => SortField::Read,
            SortField::Read => SortField::Added,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortField::ALL
            .into_iter()
            .find(|f| f.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("Unknown sort field '{}'. Use added, author, title or read.", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_book_defaults() {
        let book = Book::new("Summa", "Tommaso d'Aquino", "Tommaso dAquino/Summa.pdf");
        assert_eq!(book.read_status, ReadStatus::Unread);
        assert_eq!(book.metadata, MetadataStatus::NotAttempted);
        assert!(book.tags.is_empty());
        assert_eq!(book.added, book.updated_at);
    }

    #[test]
    fn test_add_tag_is_idempotent() {
        let mut book = Book::new("T", "A", "A/T.pdf");
        book.add_tag("Filosofia");
        book.add_tag("Filosofia");
        book.add_tag("");
        assert_eq!(book.tags, vec!["Filosofia".to_string()]);
    }

    #[test]
    fn test_set_tags_dedups() {
        let mut book = Book::new("T", "A", "A/T.pdf");
        book.set_tags(vec![
            "b".to_string(),
            " a ".to_string(),
            "b".to_string(),
            "".to_string(),
        ]);
        assert_eq!(book.tags, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_read_status_transitions() {
        let mut book = Book::new("T", "A", "A/T.pdf");
        book.set_read_status(ReadStatus::Read);
        assert!(book.read_at.is_some());

        let stamped = book.read_at;
        book.set_read_status(ReadStatus::Read);
        assert_eq!(book.read_at, stamped);

        book.set_read_status(ReadStatus::Unread);
        assert!(book.read_at.is_none());
    }

    #[test]
    fn test_missing_required_field_fails() {
        let json = r#"{"uuid": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
                       "author": "A", "added": "2024-01-01T00:00:00Z",
                       "file_path": "A/T.pdf"}"#;
        let err = serde_json::from_str::<Book>(json).unwrap_err();
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{"uuid": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
                       "title": "T", "author": "A",
                       "added": "2024-01-01T00:00:00Z", "file_path": "A/T.pdf"}"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert!(book.tags.is_empty());
        assert!(book.series.is_none());
        assert_eq!(book.read_status, ReadStatus::Unread);
        assert_eq!(book.metadata, MetadataStatus::NotAttempted);
    }

    #[test]
    fn test_metadata_status_serialization() {
        let failed = MetadataStatus::Failed {
            reason: "exit code 1".to_string(),
        };
        let json = serde_json::to_string(&failed).unwrap();
        assert_eq!(json, r#"{"status":"failed","reason":"exit code 1"}"#);

        let json = serde_json::to_string(&MetadataStatus::NotAttempted).unwrap();
        assert_eq!(json, r#"{"status":"not_attempted"}"#);
    }

    #[test]
    fn test_format_tags() {
        let tags = vec![Tag::new("Filosofia", "🤔"), Tag::new("Plain", "")];
        let names = vec![
            "Filosofia".to_string(),
            "Unknown".to_string(),
            "Plain".to_string(),
        ];
        assert_eq!(format_tags(&names, &tags), "🤔 Filosofia, Unknown, Plain");
    }

    #[test]
    fn test_parse_tag_list() {
        assert_eq!(
            parse_tag_list(" a, b ,, a,c "),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(parse_tag_list("  ").is_empty());
    }

    #[test]
    fn test_series_display() {
        assert_eq!(Series::new("Opere", Some(3.0)).to_string(), "Opere #3");
        assert_eq!(Series::new("Opere", Some(2.5)).to_string(), "Opere #2.5");
        assert_eq!(Series::new("Opere", None).to_string(), "Opere");
    }

    #[test]
    fn test_sort_field_cycle() {
        let mut field = SortField::default();
        for _ in 0..SortField::ALL.len() {
            field = field.next();
        }
        assert_eq!(field, SortField::Added);
        assert_eq!("Title".parse::<SortField>().unwrap(), SortField::Title);
        assert!("size".parse::<SortField>().is_err());
    }
}
