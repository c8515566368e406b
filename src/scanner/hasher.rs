//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! This module provides the [`Hasher`] struct for computing BLAKE3 hashes
//! of file contents. Files are streamed through a fixed-size buffer, so
//! memory use does not depend on file size.
//!
//! Transient read errors (`Interrupted`, `WouldBlock`, `TimedOut`) are
//! retried a bounded number of times; each retry reopens the file and
//! restarts the digest from the first byte.
//!
//! # Example
//!
//! ```no_run
//! use dupestage::scanner::{hash_to_hex, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let digest = hasher.full_hash(Path::new("photo.jpg")).unwrap();
//! println!("{}", hash_to_hex(&digest));
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::HashError;

/// A 256-bit BLAKE3 digest.
pub type Hash = [u8; 32];

/// Size of the read buffer used while hashing (64 KiB).
pub const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Default number of retries for transient read errors.
pub const DEFAULT_READ_RETRIES: u32 = 3;

/// Streaming BLAKE3 hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
    read_retries: u32,
    retry_backoff: Duration,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default buffer size and retry budget.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: HASH_BUFFER_SIZE,
            read_retries: DEFAULT_READ_RETRIES,
            retry_backoff: Duration::from_millis(10),
            shutdown_flag: None,
        }
    }

    /// Set how many times a transient read error is retried.
    #[must_use]
    pub fn with_read_retries(mut self, retries: u32) -> Self {
        self.read_retries = retries;
        self
    }

    /// Set the read buffer size. Values below 1 KiB are raised to 1 KiB.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1024);
        self
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// The flag is checked before opening a file and between chunks.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Configured retry budget.
    #[must_use]
    pub fn read_retries(&self) -> u32 {
        self.read_retries
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Compute the BLAKE3 digest of a file's full content.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file is gone
    /// - `PermissionDenied` if it cannot be opened or read
    /// - `Interrupted` if shutdown was requested mid-hash
    /// - `Io` for any other failure, including exhausted retries
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let mut attempt = 0u32;
        loop {
            match self.hash_once(path) {
                Ok(hash) => return Ok(hash),
                Err(HashAttemptError::Shutdown) => {
                    return Err(HashError::Interrupted(path.to_path_buf()));
                }
                Err(HashAttemptError::Io(e)) if is_transient(&e) && attempt < self.read_retries => {
                    attempt += 1;
                    log::debug!(
                        "Transient read error on {} (attempt {}/{}): {}",
                        path.display(),
                        attempt,
                        self.read_retries,
                        e
                    );
                    std::thread::sleep(self.retry_backoff * attempt);
                }
                Err(HashAttemptError::Io(e)) => return Err(map_io_error(path, e)),
            }
        }
    }

    fn hash_once(&self, path: &Path) -> Result<Hash, HashAttemptError> {
        if self.is_shutdown_requested() {
            return Err(HashAttemptError::Shutdown);
        }
        let file = File::open(path).map_err(HashAttemptError::Io)?;
        self.hash_stream(file)
    }

    /// Stream `reader` through the buffer, checking for shutdown between
    /// chunks.
    fn hash_stream<R: Read>(&self, mut reader: R) -> Result<Hash, HashAttemptError> {
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            if self.is_shutdown_requested() {
                return Err(HashAttemptError::Shutdown);
            }
            let read = reader.read(&mut buffer).map_err(HashAttemptError::Io)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(*hasher.finalize().as_bytes())
    }
}

enum HashAttemptError {
    Shutdown,
    Io(io::Error),
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn map_io_error(path: &Path, error: io::Error) -> HashError {
    match error.kind() {
        io::ErrorKind::NotFound => HashError::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => HashError::PermissionDenied(path.to_path_buf()),
        _ => HashError::Io {
            path: path.to_path_buf(),
            source: Arc::new(error),
        },
    }
}

/// Encode a digest as lowercase hexadecimal (64 characters).
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from(*hash).to_hex().to_string()
}
