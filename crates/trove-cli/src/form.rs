//! Editor-backed forms
//!
//! A form is a plain `key: value` text rendered into a temp file and
//! parsed back after the editor exits. Lines starting with `#` are
//! ignored.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use trove_core::models::{format_series_index, parse_tag_list, Book, ReadStatus, Series};
use trove_core::scan::parse_file_name;
use trove_core::{ConfigFile, IngestRequest};

/// Editable fields of a book
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub tags: Vec<String>,
    pub series: Option<String>,
    pub series_index: Option<f64>,
    pub description: Option<String>,
    pub read_status: ReadStatus,
}

impl BookForm {
    /// Prefill from a file name following `"Title - Author[ - Tags]"`
    ///
    /// Names that don't follow the pattern become the title.
    pub fn from_file_name(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(parsed) = parse_file_name(&name) {
            return Self {
                title: parsed.title,
                author: parsed.author,
                tags: parsed.tags,
                ..Self::default()
            };
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            title: stem.trim().to_string(),
            ..Self::default()
        }
    }

    pub fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            tags: book.tags.clone(),
            series: book.series.as_ref().map(|s| s.name.clone()),
            series_index: book.series.as_ref().and_then(|s| s.index),
            description: book.description.clone(),
            read_status: book.read_status,
        }
    }

    /// Render the form text shown in the editor
    pub fn render(&self, heading: &str) -> String {
        format!(
            "# {heading}\n\
             # Lines starting with # are ignored. Title and author are required.\n\
             # status is one of: unread, reading, read\n\n\
             title: {}\n\
             author: {}\n\
             tags: {}\n\
             series: {}\n\
             series_index: {}\n\
             status: {}\n\
             description: {}\n",
            self.title,
            self.author,
            self.tags.join(", "),
            self.series.as_deref().unwrap_or(""),
            self.series_index.map(format_series_index).unwrap_or_default(),
            self.read_status,
            self.description.as_deref().unwrap_or(""),
        )
    }

    /// Parse an edited form
    pub fn parse(content: &str) -> Result<Self> {
        let mut form = Self::default();

        for (key, value) in form_fields(content) {
            match key {
                "title" => form.title = value.to_string(),
                "author" => form.author = value.to_string(),
                "tags" => form.tags = parse_tag_list(value),
                "series" => form.series = non_empty(value),
                "series_index" => {
                    form.series_index = match value {
                        "" => None,
                        v => Some(
                            v.parse::<f64>()
                                .map_err(|_| anyhow!("Invalid series index: {}", v))?,
                        ),
                    }
                }
                "status" => {
                    form.read_status = value.parse().map_err(|e: String| anyhow!(e))?;
                }
                "description" => form.description = non_empty(value),
                other => bail!("Unknown field: {}", other),
            }
        }

        if form.title.is_empty() {
            bail!("Title is required");
        }
        if form.author.is_empty() {
            bail!("Author is required");
        }
        Ok(form)
    }

    /// Copy the form onto `book`, returning whether anything changed
    pub fn apply_to(&self, book: &mut Book) -> bool {
        let before = book.clone();

        if self.title != book.title {
            book.set_title(self.title.clone());
        }
        if self.author != book.author {
            book.set_author(self.author.clone());
        }
        if self.tags != book.tags {
            book.set_tags(self.tags.clone());
        }
        let series = self
            .series
            .as_ref()
            .map(|name| Series::new(name.clone(), self.series_index));
        if series != book.series {
            book.set_series(series);
        }
        if self.description != book.description {
            book.set_description(self.description.clone());
        }
        if self.read_status != book.read_status {
            book.set_read_status(self.read_status);
        }

        let changed = before != *book;
        if !changed {
            book.updated_at = before.updated_at;
        }
        changed
    }

    /// Turn the form into an ingestion request for `source`
    pub fn into_request(self, source: PathBuf) -> IngestRequest {
        let mut request = IngestRequest::new(source, self.title, self.author).with_tags(self.tags);
        request.series = self.series;
        request.series_index = self.series_index;
        request.description = self.description;
        request.read_status = self.read_status;
        request
    }
}

/// Config keys shown in the settings form, in display order
const SETTINGS_KEYS: [&str; 5] = [
    "library_path",
    "tinydb_file",
    "upload_dir_path",
    "exiftool_path",
    "log_dir",
];

/// Render the settings form for a raw config file
pub fn render_settings(file: &ConfigFile) -> String {
    let paths = &file.paths;
    let show = |p: &Option<PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    };

    let mut text = String::from(
        "# Settings\n\
         # Lines starting with # are ignored. Leave a value empty to use the default.\n\
         # Changes take effect the next time trove starts.\n\n",
    );
    for key in SETTINGS_KEYS {
        let value = match key {
            "library_path" => show(&paths.library_path),
            "tinydb_file" => show(&paths.tinydb_file),
            "upload_dir_path" => show(&paths.upload_dir_path),
            "exiftool_path" => show(&paths.exiftool_path),
            _ => show(&paths.log_dir),
        };
        text.push_str(&format!("{}: {}\n", key, value));
    }
    text
}

/// Apply an edited settings form to `file`
///
/// Returns whether anything changed.
pub fn apply_settings(content: &str, file: &mut ConfigFile) -> Result<bool> {
    let before = file.clone();
    for (key, value) in form_fields(content) {
        file.set(key, value)?;
    }
    Ok(before != *file)
}

/// `key: value` pairs of a form, skipping comments and blank lines
fn form_fields(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            line.split_once(':')
                .map(|(key, value)| (key.trim(), value.trim()))
        })
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefill_from_file_name() {
        let form = BookForm::from_file_name(Path::new("/in/Confessioni - Agostino - Filosofia.pdf"));
        assert_eq!(form.title, "Confessioni");
        assert_eq!(form.author, "Agostino");
        assert_eq!(form.tags, vec!["Filosofia".to_string()]);

        let form = BookForm::from_file_name(Path::new("/in/scan_0042.pdf"));
        assert_eq!(form.title, "scan_0042");
        assert!(form.author.is_empty());
    }

    #[test]
    fn test_render_then_parse() {
        let form = BookForm {
            title: "Il nome della rosa".to_string(),
            author: "Umberto Eco".to_string(),
            tags: vec!["Letteratura".to_string(), "Storia".to_string()],
            series: Some("Romanzi".to_string()),
            series_index: Some(1.0),
            description: Some("Un giallo medievale".to_string()),
            read_status: ReadStatus::Reading,
        };

        let text = form.render("Edit Book");
        assert!(text.contains("series_index: 1\n"));
        assert_eq!(BookForm::parse(&text).unwrap(), form);
    }

    #[test]
    fn test_parse_keeps_colons_in_values() {
        let form = BookForm::parse("title: Summa: Prima pars\nauthor: Tommaso\n").unwrap();
        assert_eq!(form.title, "Summa: Prima pars");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(BookForm::parse("title: T\n").is_err());
        assert!(BookForm::parse("author: A\n").is_err());
        assert!(BookForm::parse("title: T\nauthor: A\nstatus: finished\n").is_err());
        assert!(BookForm::parse("title: T\nauthor: A\nseries_index: two\n").is_err());
        assert!(BookForm::parse("title: T\nauthor: A\npublisher: X\n").is_err());
    }

    #[test]
    fn test_apply_to_reports_changes() {
        let mut book = Book::new("T", "A", "A/T - A.pdf");
        let stamp = book.updated_at;

        let same = BookForm::from_book(&book);
        assert!(!same.apply_to(&mut book));
        assert_eq!(book.updated_at, stamp);

        let mut edited = same.clone();
        edited.read_status = ReadStatus::Read;
        edited.series = Some("Saga".to_string());
        assert!(edited.apply_to(&mut book));
        assert_eq!(book.read_status, ReadStatus::Read);
        assert!(book.read_at.is_some());
        assert_eq!(book.series, Some(Series::new("Saga", None)));
    }

    #[test]
    fn test_into_request() {
        let form = BookForm {
            title: "T".to_string(),
            author: "A".to_string(),
            tags: vec!["x".to_string()],
            series_index: Some(2.5),
            series: Some("S".to_string()),
            ..BookForm::default()
        };
        let request = form.into_request(PathBuf::from("/in/t.pdf"));
        assert_eq!(request.source, PathBuf::from("/in/t.pdf"));
        assert_eq!(request.tags, vec!["x".to_string()]);
        assert_eq!(request.series_index, Some(2.5));
    }

    #[test]
    fn test_settings_form() {
        let mut file = ConfigFile::default();
        file.set("library_path", "/books").unwrap();

        let text = render_settings(&file);
        assert!(text.contains("library_path: /books\n"));
        assert!(text.contains("exiftool_path: \n"));

        assert!(!apply_settings(&text, &mut file).unwrap());

        let edited = text.replace("exiftool_path: ", "exiftool_path: /usr/bin/exiftool");
        assert!(apply_settings(&edited, &mut file).unwrap());
        assert_eq!(
            file.paths.exiftool_path,
            Some(PathBuf::from("/usr/bin/exiftool"))
        );

        assert!(apply_settings("colour: blue\n", &mut file).is_err());
    }
}
