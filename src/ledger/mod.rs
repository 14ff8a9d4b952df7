//! Checksum ledger module.
//!
//! The ledger is the persistent store of `(path, algorithm) -> checksum`
//! records. Two interchangeable backends implement the [`Ledger`] trait:
//!
//! * [`flatfile`]: a CSV file with a `filename,algorithm,checksum` header.
//!   Updates rewrite the whole file into a temporary sibling and atomically
//!   rename it over the original.
//! * [`database`]: a SQLite database with an `algorithms` table and a `files`
//!   table, unique on `(path, algorithm_id)`.
//!
//! # Key invariant
//!
//! At most one record exists per `(path, algorithm)` key. [`Ledger::upsert`]
//! replaces the checksum of an existing record and inserts otherwise; callers
//! never choose between the two.

pub mod database;
pub mod flatfile;
pub mod record;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::checksum::Algorithm;

pub use database::SqliteLedger;
pub use flatfile::FlatFileLedger;
pub use record::{path_key, ChecksumRecord, Timestamps};

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur while reading or writing a ledger.
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    /// An I/O error occurred on the ledger file.
    #[error("Ledger I/O error for {path}: {source}")]
    Io {
        /// Ledger file involved
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A CSV error occurred that is not attributable to a malformed row.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Ledger file involved
        path: PathBuf,
        /// The underlying CSV error
        #[source]
        source: csv::Error,
    },

    /// A flat-file row could not be read as a record.
    #[error("Corrupt ledger {path} at line {line}: {reason}")]
    Corrupt {
        /// Ledger file involved
        path: PathBuf,
        /// 1-based line number of the offending row (0 if unknown)
        line: u64,
        /// What was wrong with it
        reason: String,
    },

    /// The relational store violates the one-record-per-key invariant.
    #[error("Inconsistent ledger: {count} records for ({path}, {algorithm})")]
    Inconsistent {
        /// Path of the duplicated key
        path: String,
        /// Algorithm of the duplicated key
        algorithm: String,
        /// Number of records found
        count: usize,
    },

    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A lock guarding the ledger was poisoned by a panicking writer.
    #[error("Ledger lock poisoned")]
    LockPoisoned,
}

impl LedgerError {
    /// Whether this error means stored data can no longer be trusted.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corrupt { .. } | Self::Inconsistent { .. })
    }
}

/// What an upsert did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record existed for the key; one was created.
    Inserted,
    /// A record existed for the key; its checksum was replaced.
    Updated,
}

/// Capability set shared by every ledger backend.
///
/// Implementations are `Send + Sync` and serialize their own writes, so a
/// ledger can be shared behind an `Arc` across the workflow and any threads
/// computing checksums.
pub trait Ledger: Send + Sync {
    /// Short backend name used in log messages.
    fn backend_name(&self) -> &'static str;

    /// Fetch the record stored for `(path, algorithm)`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or is corrupt.
    fn lookup(&self, path: &Path, algorithm: Algorithm) -> LedgerResult<Option<ChecksumRecord>>;

    /// Store `checksum` for `(path, algorithm)`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written or is corrupt. On error
    /// the ledger is left as it was before the call.
    fn upsert(&self, path: &Path, algorithm: Algorithm, checksum: &str)
        -> LedgerResult<UpsertOutcome>;

    /// Every stored record, in storage order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or is corrupt.
    fn records(&self) -> LedgerResult<Vec<ChecksumRecord>>;
}

/// Which backend a ledger lives in and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerLocation {
    /// CSV flat file at the given path.
    Csv(PathBuf),
    /// SQLite database; the location string is handed to SQLite as-is.
    Database(String),
}

impl LedgerLocation {
    /// Open the ledger at this location, creating its storage if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or its schema
    /// cannot be created. Flat files are created lazily on first write.
    pub fn open(&self) -> LedgerResult<Box<dyn Ledger>> {
        match self {
            Self::Csv(path) => Ok(Box::new(FlatFileLedger::new(path))),
            Self::Database(location) => Ok(Box::new(SqliteLedger::open(location)?)),
        }
    }
}

impl fmt::Display for LedgerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv(path) => write!(f, "csv:{}", path.display()),
            Self::Database(location) => write!(f, "database:{location}"),
        }
    }
}
