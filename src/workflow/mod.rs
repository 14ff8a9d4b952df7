//! Scan and check orchestration.
//!
//! # Overview
//!
//! A [`Workflow`] makes one pass over an ordered list of files:
//!
//! - **scan**: checksum each file and upsert it into the ledger.
//! - **check**: checksum each file, look up the stored baseline and classify
//!   the file as [`Outcome::Pass`], [`Outcome::Fail`] or
//!   [`Outcome::Unverifiable`].
//!
//! A file that cannot be read is logged, recorded as skipped, and the pass
//! continues. Any ledger error ends the run, since later rows can no longer
//! be trusted.
//!
//! # Concurrency
//!
//! With `jobs > 1`, checksums for a window of `jobs` files are computed in
//! parallel on a rayon pool. Ledger operations for the window are then
//! applied one at a time, in input order, on the calling thread, so the
//! workflow is the only writer and no key ever has two writes in flight.
//!
//! Shutdown requests are honoured between files, never in the middle of a
//! ledger write.

pub mod summary;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::checksum::{Algorithm, ChecksumError, Hasher};
use crate::ledger::{Ledger, LedgerError, UpsertOutcome};
use crate::progress::ProgressCallback;

pub use summary::{classify, CheckSummary, FileOutcome, Outcome, ScanSummary, SkippedFile};

/// Errors that end a scan or check run.
#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    /// The ledger could not be read or written.
    #[error("Ledger error while processing {path}: {source}")]
    Ledger {
        /// File being processed when the ledger failed
        path: PathBuf,
        /// The underlying ledger error
        #[source]
        source: LedgerError,
    },
}

impl WorkflowError {
    /// Whether the run ended because stored data is corrupt.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::Ledger { source, .. } => source.is_corruption(),
        }
    }
}

/// Drives the checksum engine and a ledger over a list of files.
pub struct Workflow {
    ledger: Arc<dyn Ledger>,
    algorithm: Algorithm,
    hasher: Hasher,
    jobs: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("ledger", &self.ledger.backend_name())
            .field("algorithm", &self.algorithm)
            .field("hasher", &self.hasher)
            .field("jobs", &self.jobs)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Workflow {
    /// Create a sequential workflow over `ledger` using `algorithm`.
    #[must_use]
    pub fn new(ledger: Arc<dyn Ledger>, algorithm: Algorithm) -> Self {
        Self {
            ledger,
            algorithm,
            hasher: Hasher::new(),
            jobs: 1,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set how many files are checksummed in parallel. Clamped to at least 1.
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Replace the hasher, e.g. to change the read chunk size.
    ///
    /// A shutdown flag set with [`Workflow::with_shutdown_flag`] is kept.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Hasher) -> Self {
        self.hasher = match &self.shutdown_flag {
            Some(flag) => hasher.with_shutdown_flag(Arc::clone(flag)),
            None => hasher,
        };
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.hasher = self.hasher.with_shutdown_flag(Arc::clone(&flag));
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// The algorithm checksums are computed with.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Record a checksum for every file.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Ledger`] if the ledger fails. Files written
    /// before the failure stay recorded.
    pub fn scan(&self, files: &[PathBuf]) -> Result<ScanSummary, WorkflowError> {
        let start = Instant::now();
        let mut summary = ScanSummary::default();
        log::info!(
            "Scanning {} files with {} into {} ledger",
            files.len(),
            self.algorithm,
            self.ledger.backend_name()
        );

        let interrupted = self.for_each_checksum("scan", files, |path, result| {
            summary.total += 1;
            let checksum = match result {
                Ok(checksum) => checksum,
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    summary.skipped.push(SkippedFile::new(path, &e));
                    return Ok(());
                }
            };

            let written = self
                .ledger
                .upsert(path, self.algorithm, &checksum)
                .map_err(|source| WorkflowError::Ledger {
                    path: path.to_path_buf(),
                    source,
                })?;
            match written {
                UpsertOutcome::Inserted => {
                    summary.inserted += 1;
                    log::debug!("Recorded {} {}", checksum, path.display());
                }
                UpsertOutcome::Updated => {
                    summary.updated += 1;
                    log::debug!("Updated {} {}", checksum, path.display());
                }
            }
            Ok(())
        })?;

        summary.interrupted = interrupted;
        summary.duration = start.elapsed();
        log::info!(
            "Scan completed. {} checksums stored ({} new, {} updated), {} files skipped.",
            summary.stored(),
            summary.inserted,
            summary.updated,
            summary.skipped.len()
        );
        Ok(summary)
    }

    /// Compare every file against its stored checksum.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Ledger`] if the ledger cannot be read or is
    /// corrupt.
    pub fn check(&self, files: &[PathBuf]) -> Result<CheckSummary, WorkflowError> {
        let start = Instant::now();
        let mut summary = CheckSummary::default();
        log::info!(
            "Checking {} files with {} against {} ledger",
            files.len(),
            self.algorithm,
            self.ledger.backend_name()
        );

        let interrupted = self.for_each_checksum("check", files, |path, result| {
            let actual = match result {
                Ok(checksum) => checksum,
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    summary.skipped.push(SkippedFile::new(path, &e));
                    return Ok(());
                }
            };

            let stored = self
                .ledger
                .lookup(path, self.algorithm)
                .map_err(|source| WorkflowError::Ledger {
                    path: path.to_path_buf(),
                    source,
                })?;
            let expected = stored.map(|record| record.checksum);
            let outcome = classify(expected.as_deref(), &actual);
            match outcome {
                Outcome::Pass => log::debug!("File ({}) passed the check.", path.display()),
                Outcome::Fail => log::warn!("File ({}) FAILED the check.", path.display()),
                Outcome::Unverifiable => log::warn!(
                    "File ({}) has no stored {} checksum.",
                    path.display(),
                    self.algorithm
                ),
            }

            summary.record(FileOutcome {
                path: path.to_path_buf(),
                outcome,
                expected,
                actual,
            });
            Ok(())
        })?;

        summary.interrupted = interrupted;
        summary.duration = start.elapsed();
        log::info!(
            "Check completed. {} files failed out of {} total files checked.",
            summary.fail,
            summary.total
        );
        Ok(summary)
    }

    /// Checksum `files` window by window and hand each result to `handle`
    /// in input order. Returns whether the pass stopped on a shutdown request.
    fn for_each_checksum(
        &self,
        phase: &str,
        files: &[PathBuf],
        handle: impl FnMut(&Path, Result<String, ChecksumError>) -> Result<(), WorkflowError>,
    ) -> Result<bool, WorkflowError> {
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(phase, files.len());
        }

        let result = self.run_windows(files, handle);

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(phase);
        }
        result
    }

    fn run_windows(
        &self,
        files: &[PathBuf],
        mut handle: impl FnMut(&Path, Result<String, ChecksumError>) -> Result<(), WorkflowError>,
    ) -> Result<bool, WorkflowError> {
        let pool = self.build_pool();
        let mut processed = 0;

        for window in files.chunks(self.jobs) {
            let results = self.checksum_window(pool.as_ref(), window);

            for (path, result) in window.iter().zip(results) {
                if self.is_shutdown_requested() {
                    log::warn!(
                        "Interrupted after {} of {} files",
                        processed,
                        files.len()
                    );
                    return Ok(true);
                }

                processed += 1;
                if let Some(ref callback) = self.progress_callback {
                    callback.on_progress(processed, path.to_string_lossy().as_ref());
                }
                handle(path, result)?;
            }
        }

        Ok(false)
    }

    fn checksum_window(
        &self,
        pool: Option<&ThreadPool>,
        window: &[PathBuf],
    ) -> Vec<Result<String, ChecksumError>> {
        match pool {
            Some(pool) => pool.install(|| {
                window
                    .par_iter()
                    .map(|path| self.hasher.checksum_file(path, self.algorithm))
                    .collect()
            }),
            None => window
                .iter()
                .map(|path| self.hasher.checksum_file(path, self.algorithm))
                .collect(),
        }
    }

    /// A dedicated pool sized to `jobs`, or `None` for sequential hashing.
    fn build_pool(&self) -> Option<ThreadPool> {
        if self.jobs <= 1 {
            return None;
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!("Failed to create thread pool, hashing sequentially: {}", e);
                None
            }
        }
    }
}
