//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;
use trove_core::calibre::ImportReport;
use trove_core::models::{format_tags, Book, Tag};
use trove_core::scan::ScanReport;
use trove_core::tags::SeedReport;
use trove_core::IntegrityReport;
use uuid::Uuid;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single book with all of its fields
    pub fn print_book(&self, book: &Book, tags: &[Tag]) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", book.uuid);
                println!("Title:       {}", book.title);
                println!("Author:      {}", book.author);
                println!("File:        {}", book.file_path.display());
                for other in &book.other_formats {
                    println!("             {}", other.display());
                }
                if let Some(ref series) = book.series {
                    println!("Series:      {}", series);
                }
                if !book.tags.is_empty() {
                    println!("Tags:        {}", format_tags(&book.tags, tags));
                }
                match book.read_at {
                    Some(at) => println!(
                        "Status:      {} ({})",
                        book.read_status,
                        at.format("%Y-%m-%d")
                    ),
                    None => println!("Status:      {}", book.read_status),
                }
                if let Some(ref desc) = book.description {
                    println!("Description: {}", desc);
                }
                println!("Metadata:    {}", book.metadata);
                println!("Added:       {}", book.added.format("%Y-%m-%d %H:%M"));
                println!("Updated:     {}", book.updated_at.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => print_json(book),
            OutputFormat::Quiet => {
                println!("{}", book.uuid);
            }
        }
    }

    /// Print a list of books
    pub fn print_books(&self, books: &[Book]) {
        match self.format {
            OutputFormat::Human => {
                if books.is_empty() {
                    println!("No books found.");
                    return;
                }
                for book in books {
                    println!(
                        "{} | {:<7} | {} | {}",
                        short_id(&book.uuid),
                        book.read_status.as_str(),
                        truncate(&book.title, 40),
                        truncate(&book.author, 25)
                    );
                }
                println!("\n{} book(s)", books.len());
            }
            OutputFormat::Json => print_json(books),
            OutputFormat::Quiet => {
                for book in books {
                    println!("{}", book.uuid);
                }
            }
        }
    }

    /// Print tags with their usage counts
    pub fn print_tags(&self, counts: &[(String, usize)], defined: &[Tag]) {
        match self.format {
            OutputFormat::Human => {
                if counts.is_empty() {
                    println!("No tags found.");
                    return;
                }
                for (name, count) in counts {
                    let label = defined
                        .iter()
                        .find(|t| &t.name == name)
                        .map(Tag::label)
                        .unwrap_or_else(|| name.clone());
                    println!("{} ({})", label, count);
                }
                println!("\n{} tag(s)", counts.len());
            }
            OutputFormat::Json => {
                let json_tags: Vec<_> = counts
                    .iter()
                    .map(|(name, count)| {
                        let icon = defined
                            .iter()
                            .find(|t| &t.name == name)
                            .map(|t| t.icon.as_str())
                            .unwrap_or("");
                        serde_json::json!({"name": name, "icon": icon, "count": count})
                    })
                    .collect();
                print_json(&json_tags);
            }
            OutputFormat::Quiet => {
                for (name, _) in counts {
                    println!("{}", name);
                }
            }
        }
    }

    /// Print series names with their book counts
    pub fn print_series(&self, series: &[(String, usize)]) {
        match self.format {
            OutputFormat::Human => {
                if series.is_empty() {
                    println!("No series found.");
                    return;
                }
                for (name, count) in series {
                    println!("{} ({})", name, count);
                }
                println!("\n{} series", series.len());
            }
            OutputFormat::Json => {
                let json_series: Vec<_> = series
                    .iter()
                    .map(|(name, count)| serde_json::json!({"name": name, "count": count}))
                    .collect();
                print_json(&json_series);
            }
            OutputFormat::Quiet => {
                for (name, _) in series {
                    println!("{}", name);
                }
            }
        }
    }

    /// Print the outcome of a Calibre import
    pub fn print_import_report(&self, report: &ImportReport) {
        match self.format {
            OutputFormat::Human => {
                println!("Processed: {}", report.processed);
                println!("Imported:  {}", report.imported);
                println!("Bucketed:  {}", report.bucketed);
                println!("Failed:    {}", report.failed);
                if !report.failures.is_empty() {
                    println!();
                    for failure in &report.failures {
                        println!("  ✗ {}: {}", failure.title, failure.reason);
                    }
                }
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {
                println!("{} {}", report.imported + report.bucketed, report.failed);
            }
        }
    }

    /// Print the outcome of a directory scan
    pub fn print_scan_report(&self, report: &ScanReport) {
        match self.format {
            OutputFormat::Human => {
                for book in &report.imported {
                    println!("✓ {} - {}", book.title, book.author);
                }
                for skipped in &report.skipped {
                    println!("- {} ({})", skipped.path.display(), skipped.reason);
                }
                for failed in &report.failed {
                    println!("✗ {} ({})", failed.path.display(), failed.reason);
                }
                println!(
                    "\n{} imported, {} skipped, {} failed",
                    report.imported.len(),
                    report.skipped.len(),
                    report.failed.len()
                );
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {
                for book in &report.imported {
                    println!("{}", book.uuid);
                }
            }
        }
    }

    /// Print the outcome of an integrity check
    pub fn print_integrity_report(&self, report: &IntegrityReport) {
        match self.format {
            OutputFormat::Human => {
                for missing in &report.missing {
                    println!(
                        "MISSING  [{}] {} -> {}",
                        missing.doc_id,
                        missing.title,
                        missing.path.display()
                    );
                }
                for broken in &report.unreconstructable {
                    println!(
                        "UNKNOWN  [{}] {}: {}",
                        broken.doc_id, broken.title, broken.reason
                    );
                }
                if report.is_clean() {
                    println!("✓ All {} book files present", report.checked);
                } else {
                    println!(
                        "\n{} of {} record(s) have problems",
                        report.problem_count(),
                        report.checked
                    );
                }
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {
                for missing in &report.missing {
                    println!("{}", missing.path.display());
                }
            }
        }
    }

    pub fn print_seed_report(&self, report: &SeedReport) {
        match self.format {
            OutputFormat::Human => println!(
                "✓ Tags seeded: {} new, {} updated, {} unchanged",
                report.inserted, report.updated, report.unchanged
            ),
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// First eight characters of a UUID
pub fn short_id(uuid: &Uuid) -> String {
    uuid.to_string()[..8].to_string()
}

/// Truncate a string to max characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
