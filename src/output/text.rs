//! Human-readable terminal output.
//!
//! Check reports group files by outcome: failures first, then files without
//! a baseline, then passes (verbose mode only), then skipped files and the
//! totals.

use std::io::{self, Write};

use yansi::Paint;

use super::display_path;
use crate::ledger::ChecksumRecord;
use crate::workflow::{CheckSummary, Outcome, ScanSummary};

/// Text report writer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextOutput {
    verbose: bool,
}

impl TextOutput {
    /// Create a text writer. `verbose` also lists files that passed.
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Write a scan report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_scan<W: Write>(&self, summary: &ScanSummary, mut writer: W) -> io::Result<()> {
        for skipped in &summary.skipped {
            writeln!(
                writer,
                "{} {} ({})",
                "SKIP".yellow().bold(),
                display_path(&skipped.path),
                skipped.error
            )?;
        }

        writeln!(
            writer,
            "Scan completed. {} checksums stored ({} new, {} updated) out of {} files in {:.2}s.",
            summary.stored().bold(),
            summary.inserted,
            summary.updated,
            summary.total,
            summary.duration.as_secs_f64()
        )?;
        if !summary.skipped.is_empty() {
            writeln!(writer, "{} files skipped.", summary.skipped.len().yellow())?;
        }
        if summary.interrupted {
            writeln!(writer, "{}", "Scan interrupted before all files were processed.".red())?;
        }
        Ok(())
    }

    /// Write a check report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_check<W: Write>(&self, summary: &CheckSummary, mut writer: W) -> io::Result<()> {
        for outcome in summary.with_outcome(Outcome::Fail) {
            writeln!(writer, "{} {}", "FAIL".red().bold(), display_path(&outcome.path))?;
            if self.verbose {
                writeln!(
                    writer,
                    "     expected {}\n     actual   {}",
                    outcome.expected.as_deref().unwrap_or("-"),
                    outcome.actual
                )?;
            }
        }
        for outcome in summary.with_outcome(Outcome::Unverifiable) {
            writeln!(writer, "{} {}", "NONE".yellow(), display_path(&outcome.path))?;
        }
        if self.verbose {
            for outcome in summary.with_outcome(Outcome::Pass) {
                writeln!(writer, "{} {}", "PASS".green(), display_path(&outcome.path))?;
            }
        }
        for skipped in &summary.skipped {
            writeln!(
                writer,
                "{} {} ({})",
                "SKIP".yellow().bold(),
                display_path(&skipped.path),
                skipped.error
            )?;
        }

        let failed = if summary.fail > 0 {
            summary.fail.red().bold().to_string()
        } else {
            summary.fail.green().to_string()
        };
        writeln!(
            writer,
            "Check completed. {} files failed out of {} total files checked.",
            failed, summary.total
        )?;
        writeln!(
            writer,
            "{} passed, {} without a stored checksum, {} skipped ({:.2}s).",
            summary.pass,
            summary.unverifiable,
            summary.skipped.len(),
            summary.duration.as_secs_f64()
        )?;
        if summary.interrupted {
            writeln!(writer, "{}", "Check interrupted before all files were processed.".red())?;
        }
        Ok(())
    }

    /// Write stored records, one per line: `checksum  algorithm  path`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_records<W: Write>(&self, records: &[ChecksumRecord], mut writer: W) -> io::Result<()> {
        for record in records {
            write!(
                writer,
                "{}  {:<7}  {}",
                record.checksum,
                record.algorithm.cyan(),
                record.path
            )?;
            match (self.verbose, record.timestamps) {
                (true, Some(ts)) => writeln!(writer, "  (updated {})", ts.updated_at.to_rfc3339())?,
                _ => writeln!(writer)?,
            }
        }
        writeln!(writer, "{} records.", records.len())
    }
}
