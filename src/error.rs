//! Structured error handling and exit codes.

use serde::Serialize;

use crate::workflow::{CheckSummary, ScanSummary};

/// Exit codes for the checkr application.
///
/// - 0: Success (every file stored, or every file passed)
/// - 1: General error (bad configuration, unusable or corrupt ledger)
/// - 2: Check failed (at least one file no longer matches its checksum)
/// - 3: Partial success (files skipped, or files with no stored checksum)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed without problems.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Check failed: at least one file drifted from its stored checksum.
    CheckFailed = 2,
    /// Partial success: the run completed but some files were not verified.
    PartialSuccess = 3,
    /// Interrupted: the run was interrupted by the user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "CK000",
            Self::GeneralError => "CK001",
            Self::CheckFailed => "CK002",
            Self::PartialSuccess => "CK003",
            Self::Interrupted => "CK130",
        }
    }

    /// Exit code for a finished scan. `input_errors` counts input paths and
    /// directory entries the scanner could not read.
    #[must_use]
    pub fn for_scan(summary: &ScanSummary, input_errors: usize) -> Self {
        if summary.interrupted {
            Self::Interrupted
        } else if !summary.skipped.is_empty() || input_errors > 0 {
            Self::PartialSuccess
        } else {
            Self::Success
        }
    }

    /// Exit code for a finished check. Drift outranks everything except an
    /// interruption.
    #[must_use]
    pub fn for_check(summary: &CheckSummary, input_errors: usize) -> Self {
        if summary.interrupted {
            Self::Interrupted
        } else if summary.has_failures() {
            Self::CheckFailed
        } else if !summary.skipped.is_empty() || summary.unverifiable > 0 || input_errors > 0 {
            Self::PartialSuccess
        } else {
            Self::Success
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "CK001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    ///
    /// The message includes the whole context chain.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
