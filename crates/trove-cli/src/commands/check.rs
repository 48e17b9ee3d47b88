//! Integrity check command

use anyhow::{bail, Result};

use trove_core::integrity::check_store;
use trove_core::{IntegrityReport, Store};

use crate::output::Output;

/// Cross-check every record against the library directory
///
/// Fails when any record's file is missing or can't be located, so the
/// exit status can be used from scripts.
pub fn run(store: &Store, output: &Output) -> Result<()> {
    let report = check_store(store);
    output.print_integrity_report(&report);

    if !report.is_clean() {
        bail!(failure_message(&report));
    }
    Ok(())
}

fn failure_message(report: &IntegrityReport) -> String {
    format!(
        "{} of {} record(s) have problems: {} missing, {} unreconstructable",
        report.problem_count(),
        report.checked,
        report.missing.len(),
        report.unreconstructable.len()
    )
}
