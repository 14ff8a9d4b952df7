//! Application configuration management.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML config file (platform config dir, or `--config`)
//! 3. Environment variables prefixed with `CHECKR_`
//! 4. Command-line flags
//!
//! ```toml
//! paths = ["/srv/archive"]
//! algorithm = "blake2b"
//! recursive = true
//! backend = "csv"
//! csv_file = "/srv/archive/checksums.csv"
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::checksum::{Algorithm, ChecksumError};
use crate::cli::{Cli, LedgerArgs, ListArgs, RunArgs};
use crate::ledger::LedgerLocation;
use crate::output::OutputFormat;
use crate::scanner::WalkerConfig;

/// Environment variable prefix for configuration keys.
pub const ENV_PREFIX: &str = "CHECKR_";

/// Errors in the merged configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The CSV backend was selected without a file to use.
    #[error("The csv backend needs a ledger file: set csv_file or pass --csv-file")]
    MissingCsvFile,

    /// No platform data directory to place the default database in.
    #[error("Could not determine a data directory for the default database; pass --db")]
    NoDataDir,

    /// The configured algorithm is not supported.
    #[error(transparent)]
    Algorithm(#[from] ChecksumError),
}

/// Storage backend for the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SQLite database
    #[default]
    Database,
    /// CSV flat file
    Csv,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories to process when none are given on the command line.
    pub paths: Vec<PathBuf>,
    /// Checksum algorithm name.
    pub algorithm: String,
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Which ledger backend to use.
    pub backend: Backend,
    /// CSV ledger file, required by the csv backend.
    pub csv_file: Option<PathBuf>,
    /// SQLite location; defaults to `checkr.sqlite` in the data directory.
    pub database: Option<String>,
    /// Log file; logs go to stderr when unset.
    pub log_file: Option<PathBuf>,
    /// Follow symbolic links.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Files checksummed in parallel.
    pub jobs: usize,
    /// Report format.
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            algorithm: Algorithm::default().as_str().to_string(),
            recursive: false,
            backend: Backend::Database,
            csv_file: None,
            database: None,
            log_file: None,
            follow_symlinks: false,
            skip_hidden: false,
            jobs: 1,
            output: OutputFormat::Text,
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults if the merged configuration
    /// is invalid. A missing file is not an error.
    #[must_use]
    pub fn load_from_path(path: PathBuf) -> Self {
        match Self::try_load_from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!(
                    "Invalid configuration in {}, using defaults: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Load from `path` and the environment.
    ///
    /// # Errors
    ///
    /// Returns the figment error if the file or an environment variable does
    /// not fit the configuration schema.
    pub fn try_load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        Self::figment(path).extract().map_err(Box::new)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Default config file location.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Default SQLite ledger location.
    #[must_use]
    pub fn default_database_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.data_dir().join("checkr.sqlite"))
    }

    /// Apply global CLI options.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(ref path) = cli.log_file {
            self.log_file = Some(path.clone());
        }
    }

    /// Apply ledger selection flags. `--csv-file` selects the csv backend,
    /// `--db` the database backend.
    pub fn merge_ledger_args(&mut self, args: &LedgerArgs) {
        if let Some(ref file) = args.csv_file {
            self.backend = Backend::Csv;
            self.csv_file = Some(file.clone());
        }
        if let Some(ref db) = args.db {
            self.backend = Backend::Database;
            self.database = Some(db.clone());
        }
        if let Some(ref algorithm) = args.algorithm {
            self.algorithm = algorithm.clone();
        }
    }

    /// Apply `scan`/`check` flags.
    pub fn merge_run_args(&mut self, args: &RunArgs) {
        if !args.paths.is_empty() {
            self.paths = args.paths.clone();
        }
        self.merge_ledger_args(&args.ledger);
        if let Some(recursive) = args.recursive_override() {
            self.recursive = recursive;
        }
        if let Some(follow) = args.follow_symlinks_override() {
            self.follow_symlinks = follow;
        }
        if let Some(skip) = args.skip_hidden_override() {
            self.skip_hidden = skip;
        }
        if let Some(jobs) = args.jobs {
            self.jobs = usize::from(jobs);
        }
        if let Some(output) = args.output {
            self.output = output;
        }
    }

    /// Apply `list` flags. The algorithm is a filter there, not a setting.
    pub fn merge_list_args(&mut self, args: &ListArgs) {
        let ledger = LedgerArgs {
            algorithm: None,
            ..args.ledger.clone()
        };
        self.merge_ledger_args(&ledger);
        if let Some(output) = args.output {
            self.output = output;
        }
    }

    /// The configured algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Algorithm`] for an unsupported name.
    pub fn algorithm(&self) -> Result<Algorithm, ConfigError> {
        Ok(self.algorithm.parse::<Algorithm>()?)
    }

    /// Where the ledger lives.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCsvFile`] for the csv backend without a
    /// file, and [`ConfigError::NoDataDir`] when the default database
    /// location cannot be determined.
    pub fn ledger_location(&self) -> Result<LedgerLocation, ConfigError> {
        match self.backend {
            Backend::Csv => self
                .csv_file
                .clone()
                .map(LedgerLocation::Csv)
                .ok_or(ConfigError::MissingCsvFile),
            Backend::Database => match self.database {
                Some(ref location) => Ok(LedgerLocation::Database(location.clone())),
                None => Self::default_database_path()
                    .map(|path| LedgerLocation::Database(path.to_string_lossy().into_owned()))
                    .ok_or(ConfigError::NoDataDir),
            },
        }
    }

    /// Input directories, defaulting to the current directory.
    #[must_use]
    pub fn input_paths(&self) -> Vec<PathBuf> {
        if self.paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.paths.clone()
        }
    }

    /// Traversal settings.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::new(self.recursive, self.follow_symlinks, self.skip_hidden)
    }

    /// Serialize to TOML, as logged for the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "checkr", "checkr")
}
