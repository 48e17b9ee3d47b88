//! Application configuration
//!
//! Configuration is a JSON file with a single `paths` section:
//!
//! ```json
//! {
//!   "paths": {
//!     "tinydb_file": "library.json",
//!     "library_path": "/home/me/Books",
//!     "upload_dir_path": "/home/me/Downloads",
//!     "exiftool_path": "/usr/bin/exiftool",
//!     "log_dir": "logs"
//!   }
//! }
//! ```
//!
//! The file is located by, in order:
//! 1. An explicit path (`--config`)
//! 2. The `TROVE_CONFIG` environment variable
//! 3. `./config.json` if it exists
//! 4. `~/.config/trove/config.json`
//!
//! `TROVE_LIBRARY_PATH` and `TROVE_EXIFTOOL` override the file values.
//! Everything except `library_path` has a default; a missing library
//! path is fatal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable prefix
const ENV_PREFIX: &str = "TROVE";

/// Name of the configuration file
const CONFIG_FILE_NAME: &str = "config.json";

/// Errors raised while loading or saving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "No library path configured. Set `paths.library_path` in '{path}' \
         or run `trove config set library_path <dir>`."
    )]
    MissingLibraryPath { path: PathBuf },

    #[error("Failed to create library directory '{path}': {source}")]
    CreateLibrary {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unknown configuration key: '{0}'. Valid keys: tinydb_file, library_path, upload_dir_path, exiftool_path, log_dir")]
    UnknownKey(String),
}

/// The `paths` section exactly as it appears on disk
///
/// Every key is optional here; [`ConfigFile::into_config`] applies
/// defaults and rejects a missing library path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathsSection {
    /// Store file name, relative to the library root unless absolute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tinydb_file: Option<PathBuf>,

    /// Root directory of the managed library
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_path: Option<PathBuf>,

    /// Directory the add dialog starts browsing from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_dir_path: Option<PathBuf>,

    /// Path to the exiftool binary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exiftool_path: Option<PathBuf>,

    /// Directory for per-run log files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

/// Raw, unvalidated configuration file
///
/// Used by the `config` commands and the settings form, which must work
/// before a library path has ever been set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsSection,
}

impl ConfigFile {
    /// Read a config file, returning an empty one if it doesn't exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a config file from a JSON string
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Write the whole file, replacing any previous content
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| write_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        fs::write(path, content).map_err(write_err)
    }

    /// Set a single key of the `paths` section
    ///
    /// An empty value or `none` clears the key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = if value.is_empty() || value == "none" {
            None
        } else {
            Some(PathBuf::from(value))
        };

        let slot = match key {
            "tinydb_file" => &mut self.paths.tinydb_file,
            "library_path" => &mut self.paths.library_path,
            "upload_dir_path" => &mut self.paths.upload_dir_path,
            "exiftool_path" => &mut self.paths.exiftool_path,
            "log_dir" => &mut self.paths.log_dir,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        *slot = value;
        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // TROVE_LIBRARY_PATH
        if let Ok(val) = std::env::var(format!("{}_LIBRARY_PATH", ENV_PREFIX)) {
            self.paths.library_path = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        // TROVE_EXIFTOOL
        if let Ok(val) = std::env::var(format!("{}_EXIFTOOL", ENV_PREFIX)) {
            self.paths.exiftool_path = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    /// Validate and fill in defaults
    ///
    /// `source` is only used for the error message.
    pub fn into_config(self, source: &Path) -> Result<Config, ConfigError> {
        let paths = self.paths;

        let library_path = paths
            .library_path
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| ConfigError::MissingLibraryPath {
                path: source.to_path_buf(),
            })?;

        Ok(Config {
            library_path,
            tinydb_file: paths.tinydb_file.unwrap_or_else(default_tinydb_file),
            upload_dir_path: paths.upload_dir_path.unwrap_or_else(default_upload_dir),
            exiftool_path: paths.exiftool_path.filter(|p| !p.as_os_str().is_empty()),
            log_dir: paths.log_dir.unwrap_or_else(default_log_dir),
        })
    }
}

/// Validated application configuration
///
/// Loaded once at startup and handed to every component that needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root directory of the managed library
    pub library_path: PathBuf,
    /// Store file (relative to the library root unless absolute)
    pub tinydb_file: PathBuf,
    /// Starting directory for picking files to add
    pub upload_dir_path: PathBuf,
    /// exiftool binary; `None` disables metadata writing
    pub exiftool_path: Option<PathBuf>,
    /// Directory for per-run log files
    pub log_dir: PathBuf,
}

impl Config {
    /// Build a configuration rooted at `library_path` with defaults elsewhere
    pub fn with_library(library_path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: library_path.into(),
            tinydb_file: default_tinydb_file(),
            upload_dir_path: default_upload_dir(),
            exiftool_path: None,
            log_dir: default_log_dir(),
        }
    }

    /// Load configuration from the discovered location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_cli_override(None)
    }

    /// Load configuration, preferring an explicit path when given
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self, ConfigError> {
        let path = path.cloned().unwrap_or_else(Self::config_file_path);
        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path
    ///
    /// Environment overrides still apply. The library root is created
    /// if it doesn't exist yet.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let mut file = ConfigFile::load(path)?;
        file.apply_env_overrides();

        let config = file.into_config(path)?;
        config.ensure_library_dir()?;
        Ok(config)
    }

    /// Load configuration from a JSON string (useful for testing)
    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        let source = PathBuf::from("<string>");
        let mut file = ConfigFile::from_json(content).map_err(|e| ConfigError::Parse {
            path: source.clone(),
            source: e,
        })?;
        file.apply_env_overrides();
        file.into_config(&source)
    }

    /// Convert back into the on-disk representation
    pub fn to_file(&self) -> ConfigFile {
        ConfigFile {
            paths: PathsSection {
                tinydb_file: Some(self.tinydb_file.clone()),
                library_path: Some(self.library_path.clone()),
                upload_dir_path: Some(self.upload_dir_path.clone()),
                exiftool_path: self.exiftool_path.clone(),
                log_dir: Some(self.log_dir.clone()),
            },
        }
    }

    /// Save configuration, replacing the whole file
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        self.to_file().save(path)
    }

    /// Ensure the library root exists
    fn ensure_library_dir(&self) -> Result<(), ConfigError> {
        if !self.library_path.exists() {
            fs::create_dir_all(&self.library_path).map_err(|source| {
                ConfigError::CreateLibrary {
                    path: self.library_path.clone(),
                    source,
                }
            })?;
        }
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with TROVE_CONFIG environment variable. A
    /// `config.json` in the working directory wins over the user config
    /// directory.
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return local;
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trove")
            .join(CONFIG_FILE_NAME)
    }

    /// Get the path to the JSON store file
    pub fn store_path(&self) -> PathBuf {
        // join() keeps an absolute tinydb_file as-is
        self.library_path.join(&self.tinydb_file)
    }

    /// Get the directory for log files
    ///
    /// A relative `log_dir` lives under the library root, like the store.
    pub fn log_dir_path(&self) -> PathBuf {
        self.library_path.join(&self.log_dir)
    }
}

fn default_tinydb_file() -> PathBuf {
    PathBuf::from("library.json")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    pub(crate) struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        pub(crate) fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    pub(crate) const ENV_VARS: &[&str] = &["TROVE_CONFIG", "TROVE_LIBRARY_PATH", "TROVE_EXIFTOOL"];

    #[test]
    fn test_defaults_applied() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::load_from_str(r#"{"paths": {"library_path": "/books"}}"#).unwrap();
        assert_eq!(config.library_path, PathBuf::from("/books"));
        assert_eq!(config.tinydb_file, PathBuf::from("library.json"));
        assert_eq!(config.upload_dir_path, PathBuf::from("."));
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert!(config.exiftool_path.is_none());
    }

    #[test]
    fn test_missing_library_path_is_fatal() {
        let _guard = EnvGuard::new(ENV_VARS);

        let err = Config::load_from_str(r#"{"paths": {"tinydb_file": "db.json"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingLibraryPath { .. }));
        assert!(err.to_string().contains("library_path"));
    }

    #[test]
    fn test_empty_library_path_is_fatal() {
        let _guard = EnvGuard::new(ENV_VARS);

        let err = Config::load_from_str(r#"{"paths": {"library_path": ""}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingLibraryPath { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let _guard = EnvGuard::new(ENV_VARS);

        let err = Config::load_from_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_store_path() {
        let mut config = Config::with_library("/books");
        assert_eq!(config.store_path(), PathBuf::from("/books/library.json"));

        config.tinydb_file = PathBuf::from("/elsewhere/db.json");
        assert_eq!(config.store_path(), PathBuf::from("/elsewhere/db.json"));

        assert_eq!(config.log_dir_path(), PathBuf::from("/books/logs"));
        config.log_dir = PathBuf::from("/var/log/trove");
        assert_eq!(config.log_dir_path(), PathBuf::from("/var/log/trove"));
    }

    #[test]
    fn test_env_override_library_path() {
        let _guard = EnvGuard::new(ENV_VARS);

        env::set_var("TROVE_LIBRARY_PATH", "/env/books");
        let config = Config::load_from_str(r#"{"paths": {"library_path": "/books"}}"#).unwrap();
        assert_eq!(config.library_path, PathBuf::from("/env/books"));
    }

    #[test]
    fn test_env_override_exiftool() {
        let _guard = EnvGuard::new(ENV_VARS);

        env::set_var("TROVE_EXIFTOOL", "/opt/exiftool");
        let config = Config::load_from_str(r#"{"paths": {"library_path": "/books"}}"#).unwrap();
        assert_eq!(config.exiftool_path, Some(PathBuf::from("/opt/exiftool")));

        // Empty string disables the tool
        env::set_var("TROVE_EXIFTOOL", "");
        let config = Config::load_from_str(
            r#"{"paths": {"library_path": "/books", "exiftool_path": "exiftool"}}"#,
        )
        .unwrap();
        assert!(config.exiftool_path.is_none());
    }

    #[test]
    fn test_load_from_path_creates_library() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let library = temp_dir.path().join("library");
        let config_path = temp_dir.path().join("config.json");

        let mut file = ConfigFile::default();
        file.set("library_path", library.to_str().unwrap()).unwrap();
        file.save(&config_path).unwrap();

        let config = Config::load_from_path(&config_path).unwrap();
        assert_eq!(config.library_path, library);
        assert!(library.is_dir());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let err = Config::load_from_path(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingLibraryPath { .. }));
    }

    #[test]
    fn test_config_file_set_and_clear() {
        let mut file = ConfigFile::default();
        file.set("exiftool_path", "/usr/bin/exiftool").unwrap();
        assert_eq!(
            file.paths.exiftool_path,
            Some(PathBuf::from("/usr/bin/exiftool"))
        );

        file.set("exiftool_path", "none").unwrap();
        assert!(file.paths.exiftool_path.is_none());

        let err = file.set("sync_url", "x").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn test_save_round_trip_is_whole_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");

        let mut config = Config::with_library(temp_dir.path());
        config.exiftool_path = Some(PathBuf::from("exiftool"));
        config.save_to_path(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"paths\""));
        assert!(content.contains("\"library_path\""));

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_file_path_env_override() {
        let _guard = EnvGuard::new(ENV_VARS);

        env::set_var("TROVE_CONFIG", "/custom/config.json");
        assert_eq!(
            Config::config_file_path(),
            PathBuf::from("/custom/config.json")
        );
    }
}
