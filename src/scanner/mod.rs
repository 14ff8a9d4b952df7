//! Scanner module for resolving input paths into files to checksum.
//!
//! This module turns the directories given on the command line into the
//! ordered list of absolute file paths the workflow consumes:
//! - Directory traversal with walkdir, sorted by file name
//! - Optional recursion, hidden-file skipping and symlink following
//! - Graceful shutdown between entries
//!
//! # Example
//!
//! ```no_run
//! use checkr::scanner::{collect_files, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let config = WalkerConfig {
//!     recursive: true,
//!     ..Default::default()
//! };
//!
//! let list = collect_files(&[PathBuf::from(".")], &config, None);
//! for path in &list.files {
//!     println!("{}", path.display());
//! }
//! ```

pub mod walker;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub use walker::Walker;

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Descend into subdirectories instead of listing only direct children.
    pub recursive: bool,

    /// Follow symbolic links during traversal.
    /// Loops are detected by walkdir and reported as errors.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,
}

impl WalkerConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(recursive: bool, follow_symlinks: bool, skip_hidden: bool) -> Self {
        Self {
            recursive,
            follow_symlinks,
            skip_hidden,
        }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Whether the error concerns one of the configured input paths rather
    /// than an entry found beneath it.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NotADirectory(_))
    }
}

/// Files resolved from the input paths, plus everything that was skipped.
#[derive(Debug, Default)]
pub struct FileList {
    /// Absolute file paths, in traversal order. Not deduplicated.
    pub files: Vec<PathBuf>,
    /// Input paths and entries that could not be read.
    pub errors: Vec<ScanError>,
}

/// Resolve every input path into files.
///
/// Input paths that do not exist or are not directories are logged and
/// skipped; the remaining paths are still walked.
#[must_use]
pub fn collect_files(
    paths: &[PathBuf],
    config: &WalkerConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
) -> FileList {
    let mut list = FileList::default();

    for path in paths {
        let mut walker = Walker::new(path, config.clone());
        if let Some(flag) = &shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        for entry in walker.walk() {
            match entry {
                Ok(file) => list.files.push(file),
                Err(e) => {
                    if e.is_input_error() {
                        log::error!("{e}");
                    }
                    list.errors.push(e);
                }
            }
        }
    }

    log::debug!(
        "Resolved {} files from {} input paths ({} errors)",
        list.files.len(),
        paths.len(),
        list.errors.len()
    );
    list
}
