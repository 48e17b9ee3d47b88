//! Trove CLI
//!
//! Command-line and terminal interface for Trove, a catalogue for a
//! personal collection of document files.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use trove_core::models::ReadStatus;
use trove_core::{Config, IngestError, StorageError, Store, StoreError};

mod commands;
mod editor;
mod form;
mod logging;
mod output;
mod tui;

use commands::book::{BookFields, ListArgs};
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "trove")]
#[command(about = "Trove - Catalogue your PDF, EPUB and DOCX collection")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the TUI interface
    Tui,
    /// Copy a file into the library and catalogue it
    Add {
        /// File to add
        path: PathBuf,
        #[command(flatten)]
        fields: BookFields,
        /// Review the fields in the editor before adding
        #[arg(short, long)]
        edit: bool,
    },
    /// List books
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        args: ListArgs,
    },
    /// Show book details
    Show {
        /// Book ID (full UUID or prefix)
        id: String,
    },
    /// Search books by title or author
    Search {
        /// Search query
        query: String,
    },
    /// Edit a book (opens the editor when no fields are given)
    Edit {
        /// Book ID (full UUID or prefix)
        id: String,
        #[command(flatten)]
        fields: BookFields,
    },
    /// Delete a book and its files
    #[command(alias = "rm")]
    Delete {
        /// Book ID (full UUID or prefix)
        id: String,
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Open a book with the default application
    Open {
        /// Book ID (full UUID or prefix)
        id: String,
    },
    /// Set a book's reading status
    Read {
        /// Book ID (full UUID or prefix)
        id: String,
        /// unread, reading or read
        #[arg(default_value = "read")]
        status: ReadStatus,
    },
    /// Manage tags
    Tags {
        #[command(subcommand)]
        command: Option<TagCommands>,
    },
    /// List series, or the books of one series
    Series {
        /// Series name
        name: Option<String>,
    },
    /// Import a Calibre JSON export
    ImportCalibre {
        /// Export file
        file: PathBuf,
    },
    /// Import "Title - Author[ - Tags].pdf" files from a directory
    Scan {
        /// Directory to scan
        dir: PathBuf,
    },
    /// Report books whose files are missing
    Check,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show library statistics
    Status,
}

#[derive(Subcommand)]
enum TagCommands {
    /// List tags with usage counts
    #[command(alias = "ls")]
    List,
    /// Create a tag or change its icon
    Set {
        /// Tag name
        name: String,
        /// Icon shown next to the name
        icon: Option<String>,
    },
    /// Remove a tag definition
    #[command(alias = "rm")]
    Remove {
        /// Tag name
        name: String,
    },
    /// Load tag definitions
    Seed {
        /// JSON object of name: icon (defaults to the built-in set)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// library_path, tinydb_file, upload_dir_path, exiftool_path or log_dir
        key: String,
        /// Configuration value (empty or "none" resets to the default)
        value: String,
    },
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            if let Some(hint) = recovery_hint(&e) {
                eprintln!();
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

/// A hint to print under an error, when the failure has a known fix
fn recovery_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<StorageError>() {
            return e.recovery_suggestion();
        }
        if let Some(e) = cause.downcast_ref::<StoreError>() {
            return e.recovery_suggestion();
        }
        cause
            .downcast_ref::<IngestError>()
            .and_then(IngestError::recovery_suggestion)
    })
}

fn run(cli: Cli) -> Result<()> {
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands work without a valid configuration
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;

    // Handle TUI (default when no command given)
    if matches!(&cli.command, Some(Commands::Tui) | None) {
        logging::init(&config, logging::Echo::None);
        return tui::run(config, cli.config);
    }

    if let Some(command) = &cli.command {
        logging::init(&config, log_echo(command));
    }
    let mut store = Store::open_with_config(config).context("Failed to open library")?;

    let Some(command) = cli.command else {
        return Ok(());
    };

    match command {
        Commands::Tui | Commands::Config { .. } => Ok(()), // Handled above
        Commands::Add { path, fields, edit } => {
            commands::book::add(&mut store, path, fields, edit, &output)
        }
        Commands::List { args } => commands::book::list(&store, args, &output),
        Commands::Show { id } => commands::book::show(&store, id, &output),
        Commands::Search { query } => commands::book::search(&store, query, &output),
        Commands::Edit { id, fields } => commands::book::edit(&mut store, id, fields, &output),
        Commands::Delete { id, yes } => commands::book::delete(&mut store, id, yes, &output),
        Commands::Open { id } => commands::book::open(&store, id, &output),
        Commands::Read { id, status } => commands::book::read(&mut store, id, status, &output),
        Commands::Tags { command } => handle_tag_command(command, &mut store, &output),
        Commands::Series { name } => commands::series::run(&store, name, &output),
        Commands::ImportCalibre { file } => commands::import::calibre(&mut store, file, &output),
        Commands::Scan { dir } => commands::import::scan(&mut store, dir, &output),
        Commands::Check => commands::check::run(&store, &output),
        Commands::Status => commands::status::show(&store, &output),
    }
}

/// Logging for a script-style command; `check` leaves the library tree untouched
fn log_echo(command: &Commands) -> logging::Echo {
    match command {
        Commands::Check => logging::Echo::StderrOnly,
        _ => logging::Echo::Stderr,
    }
}

fn handle_tag_command(
    command: Option<TagCommands>,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        Some(TagCommands::List) | None => commands::tags::list(store, output),
        Some(TagCommands::Set { name, icon }) => commands::tags::set(store, name, icon, output),
        Some(TagCommands::Remove { name }) => commands::tags::remove(store, name, output),
        Some(TagCommands::Seed { file }) => commands::tags::seed(store, file, output),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_read_default_status() {
        let cli = Cli::parse_from(["trove", "read", "abc123"]);
        match cli.command {
            Some(Commands::Read { id, status }) => {
                assert_eq!(id, "abc123");
                assert_eq!(status, ReadStatus::Read);
            }
            _ => panic!("expected read command"),
        }
    }

    #[test]
    fn test_parse_add_with_fields() {
        let cli = Cli::parse_from([
            "trove",
            "--json",
            "add",
            "/in/file.pdf",
            "--title",
            "Summa",
            "-a",
            "Tommaso",
            "--tags",
            "Teologia, Filosofia",
            "--series-index",
            "2",
        ]);
        assert!(cli.json);
        match cli.command {
            Some(Commands::Add { path, fields, edit }) => {
                assert_eq!(path, PathBuf::from("/in/file.pdf"));
                assert_eq!(fields.title.as_deref(), Some("Summa"));
                assert_eq!(fields.author.as_deref(), Some("Tommaso"));
                assert_eq!(fields.series_index, Some(2.0));
                assert!(!edit);
            }
            _ => panic!("expected add command"),
        }
    }

    #[test]
    fn test_recovery_hint_found_through_context() {
        let storage = StorageError::NotFound {
            access: trove_core::storage::Access::CreateDirectory,
            path: PathBuf::from("/mnt/books"),
        };
        let err = Err::<(), _>(StoreError::from(storage))
            .context("Failed to open library")
            .unwrap_err();
        assert!(recovery_hint(&err).unwrap().contains("library_path"));

        let err = Err::<(), _>(IngestError::Store(StoreError::Storage(
            StorageError::InvalidFormat {
                path: PathBuf::from("/books/library.json"),
                details: "missing field `title`".to_string(),
            },
        )))
        .context("Failed to add book")
        .unwrap_err();
        assert!(recovery_hint(&err).is_some());

        let err = anyhow::anyhow!("No book found matching: zzzz");
        assert!(recovery_hint(&err).is_none());
    }

    #[test]
    fn test_check_writes_no_log_file() {
        let cli = Cli::parse_from(["trove", "check"]);
        let command = cli.command.unwrap();
        assert_eq!(log_echo(&command), logging::Echo::StderrOnly);
        assert!(!log_echo(&command).writes_file());

        let cli = Cli::parse_from(["trove", "list"]);
        assert_eq!(log_echo(&cli.command.unwrap()), logging::Echo::Stderr);
    }

    #[test]
    fn test_no_command_means_tui() {
        let cli = Cli::parse_from(["trove", "--config", "/tmp/trove.json"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/trove.json")));
    }
}
