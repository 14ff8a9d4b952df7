//! Scan and check results.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Serialize, Serializer};

/// Classification of one file during a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The recomputed checksum equals the stored one.
    Pass,
    /// The recomputed checksum differs from the stored one.
    Fail,
    /// Nothing is stored for the file under this algorithm.
    Unverifiable,
}

impl Outcome {
    /// Lowercase name used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Unverifiable => "unverifiable",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare a freshly computed checksum against the stored baseline.
///
/// Hex digits are compared without regard to case.
#[must_use]
pub fn classify(expected: Option<&str>, actual: &str) -> Outcome {
    match expected {
        None => Outcome::Unverifiable,
        Some(expected) if expected.eq_ignore_ascii_case(actual) => Outcome::Pass,
        Some(_) => Outcome::Fail,
    }
}

/// Result of checking one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    /// File that was checked
    pub path: PathBuf,
    /// How it was classified
    pub outcome: Outcome,
    /// Stored checksum, if any
    pub expected: Option<String>,
    /// Checksum computed now
    pub actual: String,
}

/// A file that could not be read and was left out of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    /// File that was skipped
    pub path: PathBuf,
    /// Why it was skipped
    pub error: String,
}

impl SkippedFile {
    /// Record `path` as skipped because of `error`.
    pub fn new(path: &Path, error: &impl fmt::Display) -> Self {
        Self {
            path: path.to_path_buf(),
            error: error.to_string(),
        }
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Summary of a scan run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    /// Files considered before the run ended
    pub total: usize,
    /// Keys recorded for the first time
    pub inserted: usize,
    /// Keys whose checksum was replaced
    pub updated: usize,
    /// Files that could not be read
    pub skipped: Vec<SkippedFile>,
    /// Whether the run stopped early on a shutdown request
    pub interrupted: bool,
    /// Wall-clock time of the run
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
}

impl ScanSummary {
    /// Number of checksums written to the ledger.
    #[must_use]
    pub fn stored(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Summary of a check run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckSummary {
    /// Files whose checksum matched
    pub pass: usize,
    /// Files whose checksum differed
    pub fail: usize,
    /// Files with no stored baseline
    pub unverifiable: usize,
    /// Files classified (`pass + fail + unverifiable`)
    pub total: usize,
    /// Per-file results, in input order
    pub outcomes: Vec<FileOutcome>,
    /// Files that could not be read
    pub skipped: Vec<SkippedFile>,
    /// Whether the run stopped early on a shutdown request
    pub interrupted: bool,
    /// Wall-clock time of the run
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
}

impl CheckSummary {
    /// Add one classified file to the summary.
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome.outcome {
            Outcome::Pass => self.pass += 1,
            Outcome::Fail => self.fail += 1,
            Outcome::Unverifiable => self.unverifiable += 1,
        }
        self.total += 1;
        self.outcomes.push(outcome);
    }

    /// Whether any file drifted from its baseline.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.fail > 0
    }

    /// Outcomes with the given classification.
    pub fn with_outcome(&self, outcome: Outcome) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(move |o| o.outcome == outcome)
    }
}
