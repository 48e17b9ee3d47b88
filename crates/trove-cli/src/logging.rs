//! Per-run log files
//!
//! Most runs write `trove_<YYYYmmdd_HHMMSS>.log` into the configured
//! log directory. Script-style commands also print warnings to stderr;
//! the TUI owns the terminal and logs to the file only. `trove check`
//! leaves the library tree untouched and logs to stderr only.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use trove_core::Config;

/// Environment variable holding the log level
const LOG_ENV: &str = "TROVE_LOG";

/// Where log output goes besides the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    /// File only
    None,
    /// File, plus warnings and errors on stderr
    Stderr,
    /// Warnings and errors on stderr, no file
    StderrOnly,
}

impl Echo {
    /// Whether this run creates a log file
    pub fn writes_file(self) -> bool {
        self != Echo::StderrOnly
    }
}

/// Name of the log file for a run started at `started`
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("trove_{}.log", started.format("%Y%m%d_%H%M%S"))
}

/// Initialize logging for this run
///
/// Returns the log file path, or `None` when the file couldn't be
/// created (a warning is printed and the run continues without it).
pub fn init(config: &Config, echo: Echo) -> Option<PathBuf> {
    let level = std::env::var(LOG_ENV)
        .ok()
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| "info".to_string());
    let env_filter = EnvFilter::new(format!("trove_core={},trove_cli={}", level, level));

    if !echo.writes_file() {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer())
            .try_init();
        return None;
    }

    let dir = config.log_dir_path();
    let log_path = dir.join(log_file_name(Local::now()));
    let log_file = match create_log_file(&dir, &log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let file_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file);

    let echo_layer = (echo == Echo::Stderr).then(stderr_layer);

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(echo_layer)
        .try_init();

    info!(version = env!("CARGO_PKG_VERSION"), "Logging to {:?}", log_path);
    Some(log_path)
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .with_filter(LevelFilter::WARN)
}

fn create_log_file(dir: &Path, path: &Path) -> io::Result<File> {
    fs::create_dir_all(dir)?;
    File::create(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_name() {
        let started = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(log_file_name(started), "trove_20240309_070501.log");
    }

    #[test]
    fn test_create_log_file_makes_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("logs").join("nested");
        let path = dir.join("trove_test.log");

        create_log_file(&dir, &path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_stderr_only_leaves_no_log_file() {
        let temp = TempDir::new().unwrap();
        let config = Config::with_library(temp.path().join("books"));

        assert!(!Echo::StderrOnly.writes_file());
        assert!(Echo::Stderr.writes_file());
        assert_eq!(init(&config, Echo::StderrOnly), None);
        assert!(!config.log_dir_path().exists());
        assert!(!temp.path().join("books").exists());
    }
}
