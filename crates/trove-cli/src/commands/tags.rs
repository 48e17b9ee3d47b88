//! Tag command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use trove_core::models::Tag;
use trove_core::tags::{default_tags, load_seed_file, seed_tags};
use trove_core::Store;

use crate::output::Output;

/// List all tags with usage counts
pub fn list(store: &Store, output: &Output) -> Result<()> {
    let counts = store.tags_with_counts();
    output.print_tags(&counts, &store.get_all_tags());
    Ok(())
}

/// Create a tag or change its icon
pub fn set(store: &mut Store, name: String, icon: Option<String>, output: &Output) -> Result<()> {
    let tag = Tag::new(name.trim(), icon.unwrap_or_default());
    let inserted = store.upsert_tag(&tag).context("Failed to save tag")?;

    if inserted {
        output.success(&format!("Created tag: {}", tag.label()));
    } else {
        output.success(&format!("Updated tag: {}", tag.label()));
    }
    Ok(())
}

/// Remove a tag definition
///
/// Books keep the tag name; only its icon goes away.
pub fn remove(store: &mut Store, name: String, output: &Output) -> Result<()> {
    let tag = store.remove_tag(&name).context("Failed to remove tag")?;
    output.success(&format!("Removed tag: {}", tag.name));
    Ok(())
}

/// Seed tag definitions from a file or the built-in set
pub fn seed(store: &mut Store, file: Option<PathBuf>, output: &Output) -> Result<()> {
    let tags = match file {
        Some(ref path) => load_seed_file(path)?,
        None => default_tags(),
    };
    let report = seed_tags(store, &tags).context("Failed to seed tags")?;

    output.print_seed_report(&report);
    Ok(())
}
