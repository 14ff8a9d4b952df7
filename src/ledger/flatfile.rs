//! CSV flat-file ledger.
//!
//! # Format
//!
//! ```text
//! filename,algorithm,checksum
//! /home/user/docs/report.pdf,blake2b,4f1c...
//! /home/user/docs/report.pdf,md5,9e10...
//! ```
//!
//! Lookups scan every row; the first exact `(filename, algorithm)` match wins.
//! Inserting a new key appends one row (writing the header first when the
//! file is new). Updating an existing key streams every row into a temporary
//! file in the same directory, replaces the matching checksum, and renames
//! the temporary file over the ledger, so the ledger is never observed empty
//! or half-written.
//!
//! One `RwLock` guards the whole file: lookups share it, upserts hold it
//! exclusively from the existence check through the final rename.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::{path_key, ChecksumRecord, Ledger, LedgerError, LedgerResult, UpsertOutcome};
use crate::checksum::Algorithm;

/// Column names, in the order they are written.
pub const HEADER: [&str; 3] = ["filename", "algorithm", "checksum"];

/// One row of the ledger file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CsvRow {
    filename: String,
    algorithm: String,
    checksum: String,
}

impl From<CsvRow> for ChecksumRecord {
    fn from(row: CsvRow) -> Self {
        ChecksumRecord::new(row.filename, row.algorithm, row.checksum)
    }
}

/// Ledger stored as a CSV file.
#[derive(Debug)]
pub struct FlatFileLedger {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FlatFileLedger {
    /// Create a ledger backed by the CSV file at `path`.
    ///
    /// The file is not touched until the first write; a missing file reads as
    /// an empty ledger.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            lock: RwLock::new(()),
        }
    }

    /// Path of the ledger file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Map a CSV error to a ledger error, treating malformed rows as corruption.
    fn csv_error(&self, err: csv::Error) -> LedgerError {
        let corrupt = |line: Option<u64>, reason: String| LedgerError::Corrupt {
            path: self.path.clone(),
            line: line.unwrap_or(0),
            reason,
        };

        match err.kind() {
            csv::ErrorKind::Deserialize { pos, err: de } => {
                return corrupt(pos.as_ref().map(csv::Position::line), de.to_string());
            }
            csv::ErrorKind::UnequalLengths {
                pos,
                expected_len,
                len,
            } => {
                return corrupt(
                    pos.as_ref().map(csv::Position::line),
                    format!("expected {expected_len} fields, found {len}"),
                );
            }
            csv::ErrorKind::Utf8 { pos, err: utf8 } => {
                return corrupt(pos.as_ref().map(csv::Position::line), utf8.to_string());
            }
            _ => {}
        }

        if err.is_io_error() {
            return self.io_error(io::Error::from(err));
        }

        LedgerError::Csv {
            path: self.path.clone(),
            source: err,
        }
    }

    /// Open a reader over the ledger, or `None` if the file does not exist.
    ///
    /// The header row is validated before any row is returned.
    fn open_reader(&self) -> LedgerResult<Option<csv::Reader<File>>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(file);
        let headers = reader.headers().map_err(|e| self.csv_error(e))?.clone();

        // An empty file has no header yet; there are no rows to validate.
        if headers.is_empty() {
            return Ok(Some(reader));
        }

        // Appends and rewrites always emit `HEADER` order, so anything else
        // would be misread afterwards.
        if !headers.iter().eq(HEADER) {
            return Err(LedgerError::Corrupt {
                path: self.path.clone(),
                line: 1,
                reason: format!(
                    "expected header '{}', found '{}'",
                    HEADER.join(","),
                    headers.iter().collect::<Vec<_>>().join(",")
                ),
            });
        }

        Ok(Some(reader))
    }

    fn lookup_unlocked(&self, path: &str, algorithm: &str) -> LedgerResult<Option<ChecksumRecord>> {
        let Some(mut reader) = self.open_reader()? else {
            return Ok(None);
        };

        for result in reader.deserialize::<CsvRow>() {
            let record = ChecksumRecord::from(result.map_err(|e| self.csv_error(e))?);
            if record.matches(path, algorithm) {
                return Ok(Some(record));
            }
        }

        Ok(None)
    }

    /// Append one row, creating the file and header if needed.
    fn append(&self, row: &CsvRow) -> LedgerResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        let len = file.metadata().map_err(|e| self.io_error(e))?.len();
        if len == 0 {
            log::info!("Ledger file {} doesn't exist. Creating.", self.path.display());
        } else if !ends_with_newline(&mut file).map_err(|e| self.io_error(e))? {
            // A hand-edited file may lack the final terminator.
            file.write_all(b"\n").map_err(|e| self.io_error(e))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut file);
        if len == 0 {
            writer.write_record(HEADER).map_err(|e| self.csv_error(e))?;
        }
        writer.serialize(row).map_err(|e| self.csv_error(e))?;
        writer.flush().map_err(|e| self.io_error(e))?;
        drop(writer);

        file.sync_data().map_err(|e| self.io_error(e))
    }

    /// Rewrite the ledger with the checksum of every row matching the key
    /// replaced, then atomically swap it into place.
    ///
    /// Returns the number of rows that were replaced.
    fn rewrite(&self, path: &str, algorithm: &str, checksum: &str) -> LedgerResult<usize> {
        let Some(mut reader) = self.open_reader()? else {
            return Ok(0);
        };

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;

        let mut replaced = 0;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(temp.as_file_mut());
            writer.write_record(HEADER).map_err(|e| self.csv_error(e))?;

            for result in reader.deserialize::<CsvRow>() {
                // A malformed row aborts the rewrite; the temp file is
                // discarded on drop and the ledger is left untouched.
                let mut row = result.map_err(|e| self.csv_error(e))?;
                if row.filename.trim() == path.trim() && row.algorithm.trim() == algorithm.trim() {
                    log::info!("Updating stored record for file {path}.");
                    row.checksum = checksum.to_string();
                    replaced += 1;
                }
                writer.serialize(&row).map_err(|e| self.csv_error(e))?;
            }
            writer.flush().map_err(|e| self.io_error(e))?;
        }

        temp.as_file().sync_all().map_err(|e| self.io_error(e))?;

        if let Ok(metadata) = fs::metadata(&self.path) {
            if let Err(e) = fs::set_permissions(temp.path(), metadata.permissions()) {
                log::debug!(
                    "Could not carry permissions over to rewritten ledger {}: {}",
                    self.path.display(),
                    e
                );
            }
        }

        temp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        sync_dir(dir);

        Ok(replaced)
    }
}

/// Flush the directory entry so the rename survives a crash.
fn sync_dir(dir: &Path) {
    if !cfg!(unix) {
        return;
    }
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        log::debug!("Could not sync directory {}: {}", dir.display(), e);
    }
}

/// Whether a non-empty file ends with `\n`.
fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

impl Ledger for FlatFileLedger {
    fn backend_name(&self) -> &'static str {
        "csv"
    }

    fn lookup(&self, path: &Path, algorithm: Algorithm) -> LedgerResult<Option<ChecksumRecord>> {
        let _guard = self.lock.read().map_err(|_| LedgerError::LockPoisoned)?;
        self.lookup_unlocked(&path_key(path), algorithm.as_str())
    }

    fn upsert(
        &self,
        path: &Path,
        algorithm: Algorithm,
        checksum: &str,
    ) -> LedgerResult<UpsertOutcome> {
        let _guard = self.lock.write().map_err(|_| LedgerError::LockPoisoned)?;
        let key = path_key(path);

        if self.lookup_unlocked(&key, algorithm.as_str())?.is_some() {
            let replaced = self.rewrite(&key, algorithm.as_str(), checksum)?;
            log::debug!("Rewrote {} ({replaced} row(s) replaced)", self.path.display());
            Ok(UpsertOutcome::Updated)
        } else {
            self.append(&CsvRow {
                filename: key.into_owned(),
                algorithm: algorithm.as_str().to_string(),
                checksum: checksum.to_string(),
            })?;
            Ok(UpsertOutcome::Inserted)
        }
    }

    fn records(&self) -> LedgerResult<Vec<ChecksumRecord>> {
        let _guard = self.lock.read().map_err(|_| LedgerError::LockPoisoned)?;
        let Some(mut reader) = self.open_reader()? else {
            return Ok(Vec::new());
        };

        reader
            .deserialize::<CsvRow>()
            .map(|result| result.map(ChecksumRecord::from).map_err(|e| self.csv_error(e)))
            .collect()
    }
}
