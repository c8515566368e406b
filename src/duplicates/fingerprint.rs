//! Content fingerprinting of same-size files.
//!
//! Every record in a shared-size group is hashed over its full content with
//! BLAKE3 on a bounded rayon pool. Records whose size no other file shares
//! never reach this phase and are never opened.
//!
//! Results are collected in input order, so the output does not depend on
//! thread scheduling.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::progress::ProgressCallback;
use crate::scanner::{FileRecord, HashError, Hasher};

/// Default number of hashing threads.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Files above this size get a debug line when hashing starts.
const LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Configuration for the fingerprint phase.
#[derive(Clone)]
pub struct FingerprintConfig {
    /// Number of I/O threads for parallel hashing.
    pub io_threads: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FingerprintConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintConfig")
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FingerprintConfig {
    /// Set the number of hashing threads (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Statistics from the fingerprint phase.
#[derive(Debug, Clone, Default)]
pub struct FingerprintStats {
    /// Number of files handed to the phase
    pub input_files: usize,
    /// Number of files hashed successfully
    pub hashed_files: usize,
    /// Number of files that could not be hashed
    pub failed_files: usize,
    /// Total bytes read while hashing
    pub bytes_hashed: u64,
    /// Whether the phase stopped early on shutdown
    pub interrupted: bool,
    /// Hashing failures, in input order
    pub errors: Vec<HashError>,
}

enum Outcome {
    Hashed(FileRecord),
    Failed(HashError),
    Skipped,
}

/// Hash every record of every size group.
///
/// Returns the records that were hashed, each carrying its digest, in size
/// order and then input order. Unhashable records are left out and their
/// errors collected in the stats.
#[must_use]
pub fn fingerprint_size_groups(
    size_groups: BTreeMap<u64, Vec<FileRecord>>,
    hasher: &Hasher,
    config: &FingerprintConfig,
) -> (Vec<FileRecord>, FingerprintStats) {
    let files: Vec<FileRecord> = size_groups.into_values().flatten().collect();
    let mut stats = FingerprintStats {
        input_files: files.len(),
        ..Default::default()
    };

    if files.is_empty() {
        log::debug!("Fingerprint: no files share a size, nothing to hash");
        return (Vec::new(), stats);
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start("fingerprint", files.len());
    }
    log::info!(
        "Fingerprint: hashing {} files on {} threads",
        files.len(),
        config.io_threads
    );

    let counter = AtomicUsize::new(0);
    let hash_one = |file: FileRecord| -> Outcome {
        if config.is_shutdown_requested() {
            return Outcome::Skipped;
        }
        if file.size > LARGE_FILE_THRESHOLD {
            log::debug!(
                "Hashing large file ({} MB): {}",
                file.size / (1024 * 1024),
                file.path.display()
            );
        }
        if let Some(ref callback) = config.progress_callback {
            let current = counter.fetch_add(1, Ordering::Relaxed) + 1;
            callback.on_progress(current, file.path.to_string_lossy().as_ref());
        }

        match hasher.full_hash(&file.path) {
            Ok(digest) => {
                log::trace!("Hashed {}", file.path.display());
                if let Some(ref callback) = config.progress_callback {
                    callback.on_item_completed(file.size);
                }
                Outcome::Hashed(file.with_digest(digest))
            }
            Err(HashError::Interrupted(_)) => Outcome::Skipped,
            Err(e) => {
                log::warn!("Failed to hash {}: {}", file.path.display(), e);
                Outcome::Failed(e)
            }
        }
    };

    let outcomes: Vec<Outcome> = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.io_threads)
        .build()
    {
        Ok(pool) => pool.install(|| files.into_par_iter().map(hash_one).collect()),
        Err(e) => {
            log::warn!(
                "Failed to create hashing thread pool ({}), using global pool with {} threads",
                e,
                rayon::current_num_threads()
            );
            files.into_par_iter().map(hash_one).collect()
        }
    };

    let mut hashed = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Outcome::Hashed(file) => {
                stats.hashed_files += 1;
                stats.bytes_hashed += file.size;
                hashed.push(file);
            }
            Outcome::Failed(e) => {
                stats.failed_files += 1;
                stats.errors.push(e);
            }
            Outcome::Skipped => {}
        }
    }

    if config.is_shutdown_requested() {
        stats.interrupted = true;
        log::info!("Fingerprint: interrupted by shutdown signal");
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end("fingerprint");
    }

    log::info!(
        "Fingerprint complete: {} hashed, {} failed, {} bytes read",
        stats.hashed_files,
        stats.failed_files,
        stats.bytes_hashed
    );

    (hashed, stats)
}
