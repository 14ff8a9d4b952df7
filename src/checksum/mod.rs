//! Checksum module for algorithm selection and streaming file digests.
//!
//! This module provides functionality for:
//! - Naming the supported digest algorithms ([`Algorithm`])
//! - Streaming a file through the selected digest ([`hasher`])
//!
//! # Example
//!
//! ```no_run
//! use checkr::checksum::{compute_checksum, Algorithm};
//! use std::path::Path;
//!
//! let algorithm: Algorithm = "md5".parse().unwrap();
//! let digest = compute_checksum(Path::new("/etc/hostname"), algorithm).unwrap();
//! println!("{digest}");
//! ```

pub mod hasher;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use hasher::{compute_checksum, Hasher, DEFAULT_CHUNK_SIZE};

/// Digest algorithms a checksum can be recorded with.
///
/// The string form of each variant is what the ledgers store, so renaming a
/// variant's name would orphan every existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// BLAKE2b with a 512-bit digest (128 hex characters).
    #[default]
    Blake2b,
    /// MD5 (32 hex characters).
    Md5,
    /// SHA-256 (64 hex characters).
    Sha256,
    /// BLAKE3 (64 hex characters).
    Blake3,
}

impl Algorithm {
    /// Every supported algorithm, in the order they are listed to users.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Blake2b,
        Algorithm::Md5,
        Algorithm::Sha256,
        Algorithm::Blake3,
    ];

    /// The name stored in the ledger for this algorithm.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blake2b => "blake2b",
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }

    /// Length of the hex-encoded digest this algorithm produces.
    #[must_use]
    pub fn hex_len(self) -> usize {
        match self {
            Self::Blake2b => 128,
            Self::Md5 => 32,
            Self::Sha256 | Self::Blake3 => 64,
        }
    }

    /// Closest supported name to `name`, if any is reasonably close.
    fn suggest(name: &str) -> Option<&'static str> {
        let lowered = name.to_ascii_lowercase();
        Self::ALL
            .iter()
            .map(|a| (a.as_str(), strsim::jaro_winkler(&lowered, a.as_str())))
            .filter(|(_, score)| *score > 0.8)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, _)| candidate)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ChecksumError::UnsupportedAlgorithm {
                name: trimmed.to_string(),
                suggestion: Self::suggest(trimmed),
            })
    }
}

/// Errors that can occur while computing a checksum.
#[derive(thiserror::Error, Debug)]
pub enum ChecksumError {
    /// The algorithm name is not one of the supported algorithms.
    #[error("Unsupported checksum algorithm '{name}'{}", suggestion.map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
    UnsupportedAlgorithm {
        /// The name that was requested
        name: String,
        /// A supported name that looks similar
        suggestion: Option<&'static str>,
    },

    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ChecksumError {
    /// Wrap an I/O error, keeping not-found and permission failures distinct.
    pub(crate) fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io { path, source },
        }
    }
}
