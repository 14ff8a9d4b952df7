//! Output formatters for scan, check and list results.
//!
//! - [`text`]: human-readable report for the terminal
//! - [`json`]: one JSON document for automation and scripting
//! - [`csv`]: one row per file for spreadsheet import
//!
//! # Example
//!
//! ```no_run
//! use checkr::checksum::Algorithm;
//! use checkr::ledger::SqliteLedger;
//! use checkr::output::text::TextOutput;
//! use checkr::workflow::Workflow;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! let ledger = Arc::new(SqliteLedger::open("checkr.sqlite").unwrap());
//! let summary = Workflow::new(ledger, Algorithm::Md5)
//!     .check(&[PathBuf::from("/data/file.bin")])
//!     .unwrap();
//!
//! TextOutput::new(false).write_check(&summary, std::io::stdout()).unwrap();
//! ```

pub mod csv;
pub mod json;
pub mod text;

pub use csv::CsvOutput;
pub use json::JsonOutput;
pub use text::TextOutput;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// JSON document for scripting
    Json,
    /// CSV rows for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Render a path for reports. Non-UTF-8 paths are rendered lossily.
pub(crate) fn display_path(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}
