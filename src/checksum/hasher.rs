//! Streaming file hasher.
//!
//! # Overview
//! Files are read in fixed-size chunks and fed into the digest selected by
//! [`Algorithm`], so memory use does not grow with file size. A read error
//! anywhere in the file fails the whole computation; no partial digest is
//! ever returned.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use blake2::Blake2b512;
use md5::Md5;
use sha2::{Digest, Sha256};

use super::{Algorithm, ChecksumError};

/// Default read size for streaming digests (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Running digest state for one file.
enum DigestState {
    Blake2b(Blake2b512),
    Md5(Md5),
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Blake2b => Self::Blake2b(Blake2b512::new()),
            Algorithm::Md5 => Self::Md5(Md5::new()),
            Algorithm::Sha256 => Self::Sha256(Sha256::new()),
            Algorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            Self::Blake2b(h) => h.update(chunk),
            Self::Md5(h) => h.update(chunk),
            Self::Sha256(h) => h.update(chunk),
            Self::Blake3(h) => {
                h.update(chunk);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Blake2b(h) => format!("{:x}", h.finalize()),
            Self::Md5(h) => format!("{:x}", h.finalize()),
            Self::Sha256(h) => format!("{:x}", h.finalize()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Streaming file hasher.
///
/// The hasher itself is stateless between files and can be shared across
/// threads; each call to [`Hasher::checksum_file`] owns its own digest state.
#[derive(Debug, Clone)]
pub struct Hasher {
    chunk_size: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default chunk size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            shutdown_flag: None,
        }
    }

    /// Set the read chunk size. Values below 1 byte are clamped to 1.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the shutdown flag.
    ///
    /// When set, a long file stops being read as soon as the flag is raised
    /// and the computation fails with an `Interrupted` I/O error.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// The configured chunk size in bytes.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Compute the hex digest of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError::NotFound`] or [`ChecksumError::PermissionDenied`]
    /// when the file cannot be opened, and [`ChecksumError::Io`] when a read
    /// fails partway through.
    pub fn checksum_file(&self, path: &Path, algorithm: Algorithm) -> Result<String, ChecksumError> {
        let mut file =
            File::open(path).map_err(|e| ChecksumError::from_io(path.to_path_buf(), e))?;
        self.checksum_reader(&mut file, algorithm)
            .map_err(|e| ChecksumError::from_io(path.to_path_buf(), e))
    }

    /// Compute the hex digest of everything `reader` yields.
    ///
    /// # Errors
    ///
    /// Propagates any read error other than `Interrupted` retries.
    pub fn checksum_reader<R: Read>(
        &self,
        reader: &mut R,
        algorithm: Algorithm,
    ) -> std::io::Result<String> {
        let mut state = DigestState::new(algorithm);
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            if self.is_shutdown_requested() {
                return Err(std::io::Error::new(
                    ErrorKind::Interrupted,
                    "checksum interrupted by shutdown",
                ));
            }
            let count = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            state.update(&buffer[..count]);
        }

        Ok(state.finalize_hex())
    }
}

/// Compute the hex digest of a file with the default [`Hasher`].
///
/// # Errors
///
/// See [`Hasher::checksum_file`].
pub fn compute_checksum(path: &Path, algorithm: Algorithm) -> Result<String, ChecksumError> {
    Hasher::new().checksum_file(path, algorithm)
}
