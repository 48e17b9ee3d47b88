//! Config command handlers
//!
//! These work on the raw config file, so they run before a library
//! path has ever been set.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use trove_core::{Config, ConfigFile};

use crate::output::{print_json, Output, OutputFormat};

/// The config file these commands read and write
pub fn effective_path(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path)
}

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let path = effective_path(config_path);
    let file = ConfigFile::load(&path).context("Failed to load configuration")?;
    let effective = file.clone().into_config(&path);

    match output.format {
        OutputFormat::Json => {
            print_json(&serde_json::json!({
                "config_file": path,
                "paths": file.paths,
                "effective": effective.as_ref().ok().map(|c| c.to_file().paths),
            }));
        }
        OutputFormat::Quiet => {
            if let Ok(ref config) = effective {
                println!("{}", config.library_path.display());
            }
        }
        OutputFormat::Human => {
            let paths = &file.paths;
            println!("Configuration:");
            println!("  library_path:    {}", show_path(paths.library_path.as_deref()));
            println!("  tinydb_file:     {}", show_path(paths.tinydb_file.as_deref()));
            println!("  upload_dir_path: {}", show_path(paths.upload_dir_path.as_deref()));
            println!("  exiftool_path:   {}", show_path(paths.exiftool_path.as_deref()));
            println!("  log_dir:         {}", show_path(paths.log_dir.as_deref()));
            println!();
            match effective {
                Ok(config) => {
                    println!("Store file: {}", config.store_path().display());
                    println!("Log dir:    {}", config.log_dir_path().display());
                }
                Err(e) => println!("Warning: {}", e),
            }
            println!("Config file: {}", path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
///
/// An empty value or `none` resets the key to its default.
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let path = effective_path(config_path);
    let mut file = ConfigFile::load(&path).context("Failed to load configuration")?;

    file.set(&key, &value)
        .context("Valid keys: library_path, tinydb_file, upload_dir_path, exiftool_path, log_dir")?;
    file.save(&path).context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn show_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(default)".to_string())
}
