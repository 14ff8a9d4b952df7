//! JSON output formatter.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "command": "check",
//!   "summary": {
//!     "pass": 9,
//!     "fail": 1,
//!     "unverifiable": 0,
//!     "total": 10,
//!     "outcomes": [
//!       {"path": "/data/a.bin", "outcome": "fail", "expected": "...", "actual": "..."}
//!     ],
//!     "skipped": [],
//!     "interrupted": false,
//!     "duration_secs": 0.42
//!   },
//!   "algorithm": "blake2b",
//!   "ledger": "database:/home/user/.local/share/checkr/checkr.sqlite",
//!   "exit_code": 2,
//!   "code": "CK002"
//! }
//! ```
//!
//! `scan` documents carry a scan summary instead, and `list` documents carry
//! a `records` array.

use std::io::Write;

use serde::Serialize;

use crate::error::ExitCode;
use crate::ledger::ChecksumRecord;
use crate::workflow::{CheckSummary, ScanSummary};

/// Command-specific part of the document.
#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum JsonBody<'a> {
    /// Result of `scan`
    Scan {
        /// Scan totals
        summary: &'a ScanSummary,
    },
    /// Result of `check`
    Check {
        /// Check totals and per-file outcomes
        summary: &'a CheckSummary,
    },
    /// Result of `list`
    List {
        /// Stored records
        records: &'a [ChecksumRecord],
    },
}

/// Complete JSON output document.
#[derive(Debug, Serialize)]
pub struct JsonOutput<'a> {
    #[serde(flatten)]
    body: JsonBody<'a>,
    /// Algorithm the run used, if it was restricted to one
    #[serde(skip_serializing_if = "Option::is_none")]
    algorithm: Option<String>,
    /// Ledger the run used
    ledger: String,
    /// Process exit code
    exit_code: i32,
    /// Machine-readable exit code prefix
    code: &'static str,
}

impl<'a> JsonOutput<'a> {
    /// Create a document for `body`.
    #[must_use]
    pub fn new(body: JsonBody<'a>, ledger: impl ToString, exit_code: ExitCode) -> Self {
        Self {
            body,
            algorithm: None,
            ledger: ledger.to_string(),
            exit_code: exit_code.as_i32(),
            code: exit_code.code_prefix(),
        }
    }

    /// Record the algorithm the run used.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: impl ToString) -> Self {
        self.algorithm = Some(algorithm.to_string());
        self
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)
    }
}
