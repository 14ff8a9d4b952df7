//! CSV output formatter.
//!
//! # Columns
//!
//! Check reports, one row per file:
//! `path,outcome,expected,actual` where `outcome` is `pass`, `fail`,
//! `unverifiable` or `skipped`.
//!
//! Ledger listings, one row per record:
//! `path,algorithm,checksum,created_at,updated_at` (timestamps are empty for
//! flat-file ledgers).
//!
//! Scan reports are a single summary row.

use std::io;

use serde::Serialize;
use thiserror::Error;

use super::display_path;
use crate::ledger::ChecksumRecord;
use crate::workflow::{CheckSummary, ScanSummary};

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CheckRow<'a> {
    path: String,
    outcome: &'a str,
    expected: Option<&'a str>,
    actual: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RecordRow<'a> {
    path: &'a str,
    algorithm: &'a str,
    checksum: &'a str,
    created_at: Option<String>,
    updated_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct ScanRow {
    total: usize,
    inserted: usize,
    updated: usize,
    skipped: usize,
    interrupted: bool,
    duration_secs: f64,
}

/// CSV output formatter.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvOutput;

impl CsvOutput {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Write one row per checked or skipped file.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_check<W: io::Write>(
        &self,
        summary: &CheckSummary,
        writer: W,
    ) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for outcome in &summary.outcomes {
            csv_writer.serialize(CheckRow {
                path: display_path(&outcome.path),
                outcome: outcome.outcome.as_str(),
                expected: outcome.expected.as_deref(),
                actual: Some(&outcome.actual),
            })?;
        }
        for skipped in &summary.skipped {
            csv_writer.serialize(CheckRow {
                path: display_path(&skipped.path),
                outcome: "skipped",
                expected: None,
                actual: None,
            })?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Write one row per stored record.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_records<W: io::Write>(
        &self,
        records: &[ChecksumRecord],
        writer: W,
    ) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for record in records {
            csv_writer.serialize(RecordRow {
                path: &record.path,
                algorithm: &record.algorithm,
                checksum: &record.checksum,
                created_at: record.timestamps.map(|t| t.created_at.to_rfc3339()),
                updated_at: record.timestamps.map(|t| t.updated_at.to_rfc3339()),
            })?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Write the scan totals as a single row.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_scan<W: io::Write>(
        &self,
        summary: &ScanSummary,
        writer: W,
    ) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.serialize(ScanRow {
            total: summary.total,
            inserted: summary.inserted,
            updated: summary.updated,
            skipped: summary.skipped.len(),
            interrupted: summary.interrupted,
            duration_secs: summary.duration.as_secs_f64(),
        })?;
        csv_writer.flush()?;
        Ok(())
    }
}
