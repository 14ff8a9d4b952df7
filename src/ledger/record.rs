//! Checksum record definitions.

use std::borrow::Cow;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored checksum, keyed by `(path, algorithm)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumRecord {
    /// Absolute path of the checked file, as recorded.
    pub path: String,
    /// Name of the digest algorithm the checksum was computed with.
    pub algorithm: String,
    /// Hex-encoded digest.
    pub checksum: String,
    /// Backend-managed timestamps; the flat-file ledger does not keep them.
    #[serde(flatten)]
    pub timestamps: Option<Timestamps>,
}

impl ChecksumRecord {
    /// Create a record without timestamps.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        algorithm: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            algorithm: algorithm.into(),
            checksum: checksum.into(),
            timestamps: None,
        }
    }

    /// Attach creation and update timestamps.
    #[must_use]
    pub fn with_timestamps(mut self, timestamps: Timestamps) -> Self {
        self.timestamps = Some(timestamps);
        self
    }

    /// Whether this record belongs to the `(path, algorithm)` key.
    #[must_use]
    pub fn matches(&self, path: &str, algorithm: &str) -> bool {
        self.path == path && self.algorithm == algorithm
    }
}

/// Creation and last-update times of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// When the key was first recorded.
    pub created_at: DateTime<Utc>,
    /// When the checksum was last written.
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    /// Timestamps for a record created now.
    #[must_use]
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the record as updated now. `created_at` is never moved.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.created_at);
    }
}

/// The string key a path is stored under.
///
/// Ledgers store paths as text; paths that are not valid UTF-8 are stored
/// lossily.
#[must_use]
pub fn path_key(path: &Path) -> Cow<'_, str> {
    path.to_string_lossy()
}
