//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! [`Walker`] lists the regular files in one input directory, either its
//! direct children or (with `recursive`) every descendant. Entries are
//! sorted by file name within each directory so that repeated runs visit
//! files in the same order.
//!
//! Paths are yielded absolute: the root is canonicalised once and every
//! entry is joined beneath it.
//!
//! # Example
//!
//! ```no_run
//! use checkr::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Documents"), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::{DirEntry, WalkDir};

use super::{ScanError, WalkerConfig};

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk, as given
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops before the next entry.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Check the root and return its canonical absolute form.
    fn resolve_root(&self) -> Result<PathBuf, ScanError> {
        let metadata = fs::metadata(&self.root).map_err(|e| io_to_scan_error(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }
        fs::canonicalize(&self.root).map_err(|e| io_to_scan_error(&self.root, e))
    }

    /// Walk the directory, yielding absolute file paths.
    ///
    /// An unusable root yields a single error and nothing else. Errors on
    /// entries beneath the root are yielded in place and iteration continues.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + '_ {
        let (root, root_error) = match self.resolve_root() {
            Ok(root) => (Some(root), None),
            Err(e) => (None, Some(e)),
        };

        let skip_hidden = self.config.skip_hidden;
        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        let entries = root
            .map(|root| {
                WalkDir::new(root)
                    .min_depth(1)
                    .max_depth(max_depth)
                    .follow_links(self.config.follow_symlinks)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(move |entry| !(skip_hidden && is_hidden(entry)))
            })
            .into_iter()
            .flatten();

        root_error.map(Err::<PathBuf, ScanError>).into_iter().chain(
            entries
                .take_while(move |_| {
                    if self.is_shutdown_requested() {
                        log::debug!("Walker: Shutdown requested, stopping iteration");
                        return false;
                    }
                    true
                })
                .filter_map(move |entry| self.process_entry(entry)),
        )
    }

    fn process_entry(
        &self,
        entry: walkdir::Result<DirEntry>,
    ) -> Option<Result<PathBuf, ScanError>> {
        match entry {
            Ok(entry) => {
                let file_type = entry.file_type();
                if file_type.is_file() {
                    Some(Ok(entry.into_path()))
                } else {
                    if file_type.is_symlink() {
                        log::trace!("Skipping symlink: {}", entry.path().display());
                    }
                    None
                }
            }
            Err(e) => {
                let path = e.path().map_or_else(|| self.root.clone(), Path::to_path_buf);
                if e.loop_ancestor().is_some() {
                    log::warn!("Symlink loop at {}", path.display());
                }
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
                Some(Err(self.handle_io_error(path, source)))
            }
        }
    }

    /// Handle I/O errors on entries beneath the root.
    fn handle_io_error(&self, path: PathBuf, error: std::io::Error) -> ScanError {
        match error.kind() {
            ErrorKind::PermissionDenied => log::warn!("Permission denied: {}", path.display()),
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
            }
            _ => log::warn!("I/O error for {}: {}", path.display(), error),
        }
        io_to_scan_error(&path, error)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn io_to_scan_error(path: &Path, error: std::io::Error) -> ScanError {
    match error.kind() {
        ErrorKind::PermissionDenied => ScanError::PermissionDenied(path.to_path_buf()),
        ErrorKind::NotFound => ScanError::NotFound(path.to_path_buf()),
        _ => ScanError::Io {
            path: path.to_path_buf(),
            source: error,
        },
    }
}
