//! Bulk import command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use trove_core::scan::scan_directory;
use trove_core::{CalibreImporter, Ingestor, Store};

use crate::output::Output;

/// Import a Calibre JSON export
pub fn calibre(store: &mut Store, file: PathBuf, output: &Output) -> Result<()> {
    let importer = CalibreImporter::new(store.config());
    let report = importer
        .import_file(store, &file)
        .context("Calibre import failed")?;

    output.print_import_report(&report);
    Ok(())
}

/// Import every `"Title - Author[ - Tags].pdf"` in a directory
pub fn scan(store: &mut Store, dir: PathBuf, output: &Output) -> Result<()> {
    let ingestor = Ingestor::new(store.config());
    let report = scan_directory(&ingestor, store, &dir).context("Directory scan failed")?;

    output.print_scan_report(&report);
    Ok(())
}
