//! Status command handler

use anyhow::Result;

use trove_core::Store;

use crate::output::{print_json, Output, OutputFormat};

/// Show library statistics
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let stats = store.stats();
    let config = store.config();

    match output.format {
        OutputFormat::Json => {
            print_json(&serde_json::json!({
                "library_path": config.library_path,
                "store_path": store.path(),
                "exiftool_path": config.exiftool_path,
                "stats": stats,
            }));
        }
        OutputFormat::Quiet => {
            println!("{}", stats.book_count);
        }
        OutputFormat::Human => {
            println!("Trove Status");
            println!("============");
            println!();
            println!("Library:");
            println!("  Location: {}", config.library_path.display());
            println!("  Store:    {}", store.path().display());
            println!("  Size:     {}", human_size(stats.file_size));
            println!(
                "  exiftool: {}",
                config
                    .exiftool_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set, metadata is not written)".to_string())
            );
            println!();
            println!("Contents:");
            println!("  Books:   {}", stats.book_count);
            println!("  Authors: {}", stats.author_count);
            println!("  Series:  {}", stats.series_count);
            println!("  Tags:    {}", stats.tag_count);
            println!();
            println!("Reading:");
            println!("  Unread:  {}", stats.unread_count);
            println!("  Reading: {}", stats.reading_count);
            println!("  Read:    {}", stats.read_count);
        }
    }

    Ok(())
}

fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(3 * 1024 * 1024 / 2), "1.5 MB");
    }
}
