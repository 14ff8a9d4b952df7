//! Command-line interface definitions for checkr.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, logging, configuration) come before the subcommand.
//!
//! # Example
//!
//! ```bash
//! # Record checksums for every file under ~/Photos into the default database
//! checkr scan -r ~/Photos
//!
//! # Verify them later, using a CSV ledger instead
//! checkr check -r ~/Photos --csv-file ~/photos.csv --algorithm md5
//!
//! # Machine-readable report
//! checkr check ~/Photos --output json
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// File integrity checker.
///
/// checkr records a checksum for every file it scans and later recomputes
/// them to detect files whose content has changed.
#[derive(Debug, Parser)]
#[command(name = "checkr")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (default: platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write log records to this file instead of stderr
    #[arg(long = "log", global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute checksums and store them in the ledger
    Scan(RunArgs),
    /// Recompute checksums and compare them with the ledger
    Check(RunArgs),
    /// Print the records stored in the ledger
    List(ListArgs),
}

/// Which ledger to use.
#[derive(Debug, Clone, Default, Args)]
pub struct LedgerArgs {
    /// Store checksums in this CSV file
    #[arg(long, value_name = "FILE", conflicts_with = "db")]
    pub csv_file: Option<PathBuf>,

    /// Store checksums in this SQLite database
    #[arg(long, value_name = "LOCATION")]
    pub db: Option<String>,

    /// Checksum algorithm (blake2b, md5, sha256, blake3)
    #[arg(short, long, value_name = "NAME")]
    pub algorithm: Option<String>,
}

/// Arguments shared by `scan` and `check`.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Directories whose files are processed (default: current directory)
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Descend into subdirectories
    #[arg(short, long, overrides_with = "no_recursive")]
    pub recursive: bool,

    /// Only process files directly inside each path
    #[arg(long, overrides_with = "recursive")]
    pub no_recursive: bool,

    /// Follow symbolic links
    #[arg(long, overrides_with = "no_follow_symlinks")]
    pub follow_symlinks: bool,

    /// Do not follow symbolic links
    #[arg(long, overrides_with = "follow_symlinks")]
    pub no_follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long, overrides_with = "no_skip_hidden")]
    pub skip_hidden: bool,

    /// Include hidden files and directories
    #[arg(long, overrides_with = "skip_hidden")]
    pub no_skip_hidden: bool,

    /// Number of files checksummed in parallel
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,
}

/// Arguments for the `list` subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,
}

impl RunArgs {
    /// `--recursive` / `--no-recursive`, if either was given.
    #[must_use]
    pub fn recursive_override(&self) -> Option<bool> {
        flag_pair(self.recursive, self.no_recursive)
    }

    /// `--follow-symlinks` / `--no-follow-symlinks`, if either was given.
    #[must_use]
    pub fn follow_symlinks_override(&self) -> Option<bool> {
        flag_pair(self.follow_symlinks, self.no_follow_symlinks)
    }

    /// `--skip-hidden` / `--no-skip-hidden`, if either was given.
    #[must_use]
    pub fn skip_hidden_override(&self) -> Option<bool> {
        flag_pair(self.skip_hidden, self.no_skip_hidden)
    }
}

fn flag_pair(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}
