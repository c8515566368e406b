//! Duplicate finder orchestrating the detection pipeline.
//!
//! # Overview
//!
//! [`DuplicateFinder::find_duplicates`] runs, in order:
//! 1. **Walk** - collect regular files under the root, skipping the
//!    quarantine directory (see [`crate::scanner::walker`])
//! 2. **Size grouping** - drop files whose size is unique
//!    (see [`crate::duplicates::groups`])
//! 3. **Fingerprint** - hash the remaining files with BLAKE3
//!    (see [`crate::duplicates::fingerprint`])
//! 4. **Index** - partition by fingerprint into duplicate classes
//!
//! The result is a [`Detection`], which owns the index and resolves it into
//! [`DuplicateGroup`]s on demand.
//!
//! # Example
//!
//! ```no_run
//! use dupestage::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(4));
//! let detection = finder.find_duplicates(Path::new("/some/path")).unwrap();
//!
//! for group in detection.groups() {
//!     println!("keep {}", group.keeper.path.display());
//! }
//! println!("Reclaimable: {}", detection.summary().reclaimable_display());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;

use super::fingerprint::{fingerprint_size_groups, FingerprintConfig, DEFAULT_IO_THREADS};
use super::groups::{group_by_size, DuplicateGroup, DuplicateIndex};
use super::policy::resolve_all;
use crate::progress::ProgressCallback;
use crate::scanner::hasher::DEFAULT_READ_RETRIES;
use crate::scanner::{
    Hasher, ScanError, ScanEvent, Walker, WalkerConfig, DEFAULT_QUARANTINE_DIR,
};

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of I/O threads for parallel hashing.
    pub io_threads: usize,
    /// Retries for transient read errors while hashing.
    pub read_retries: u32,
    /// Quarantine directory, relative to the scan root unless absolute.
    /// Never scanned.
    pub quarantine_dir: PathBuf,
    /// Walker filters.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("io_threads", &self.io_threads)
            .field("read_retries", &self.read_retries)
            .field("quarantine_dir", &self.quarantine_dir)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            read_retries: DEFAULT_READ_RETRIES,
            quarantine_dir: PathBuf::from(DEFAULT_QUARANTINE_DIR),
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the number of hashing threads (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the retry budget for transient read errors.
    #[must_use]
    pub fn with_read_retries(mut self, retries: u32) -> Self {
        self.read_retries = retries;
        self
    }

    /// Set the quarantine directory excluded from the scan.
    #[must_use]
    pub fn with_quarantine_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.quarantine_dir = dir.into();
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
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

/// Summary statistics from a detection run.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Total number of regular files recorded by the walk
    pub total_files: usize,
    /// Total size of those files in bytes
    pub total_size: u64,
    /// Entries the walk passed over (symlinks, filters, special files)
    pub skipped_entries: usize,
    /// Files eliminated because no other file has their size
    pub eliminated_by_size: usize,
    /// Files hashed successfully
    pub hashed_files: usize,
    /// Files that could not be hashed
    pub unhashable_files: usize,
    /// Bytes read while hashing
    pub bytes_hashed: u64,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Number of relocation candidates (files minus one keeper per group)
    pub duplicate_files: usize,
    /// Bytes freed if every candidate is relocated
    pub reclaimable_space: u64,
    /// Wall-clock time of the detection run
    pub scan_duration: Duration,
    /// Recoverable errors, in the order they occurred
    pub scan_errors: Vec<ScanError>,
}

impl ScanSummary {
    /// Percentage of scanned bytes held by redundant copies.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Reclaimable space as a human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize(self.reclaimable_space).to_string()
    }

    /// Total size as a human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize(self.total_size).to_string()
    }
}

/// Errors that abort a detection run.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The root does not exist, is not a directory, or cannot be resolved.
    #[error("Invalid root {path}: {reason}")]
    InvalidRoot {
        /// Root as given by the caller
        path: PathBuf,
        /// What is wrong with it
        reason: String,
    },

    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,
}

/// Outcome of a detection run.
///
/// Owns the [`DuplicateIndex`]; groups borrow from it.
#[derive(Debug, Clone)]
pub struct Detection {
    root: PathBuf,
    quarantine_dir: PathBuf,
    index: DuplicateIndex,
    summary: ScanSummary,
}

impl Detection {
    /// Canonical scan root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Quarantine directory the scan excluded, as configured.
    #[must_use]
    pub fn quarantine_dir(&self) -> &Path {
        &self.quarantine_dir
    }

    /// The duplicate index.
    #[must_use]
    pub fn index(&self) -> &DuplicateIndex {
        &self.index
    }

    /// Scan statistics.
    #[must_use]
    pub fn summary(&self) -> &ScanSummary {
        &self.summary
    }

    /// Resolve every class into a keeper and candidates.
    #[must_use]
    pub fn groups(&self) -> Vec<DuplicateGroup<'_>> {
        resolve_all(&self.index, &self.root)
    }

    /// Whether any duplicates were found.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.index.is_empty()
    }
}

/// Duplicate finder that runs the detection pipeline.
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let mut hasher = Hasher::new().with_read_retries(config.read_retries);
        if let Some(ref flag) = config.shutdown_flag {
            hasher = hasher.with_shutdown_flag(flag.clone());
        }
        Self { config, hasher }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The configuration this finder runs with.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Find all duplicate files under `root`.
    ///
    /// The root is canonicalized first, so every recorded path is absolute.
    /// Recoverable problems (unreadable directories, unhashable files) are
    /// collected in the summary and do not stop the run.
    ///
    /// # Errors
    ///
    /// - [`FinderError::InvalidRoot`] if the root is missing, not a
    ///   directory, or cannot be canonicalized. No other I/O happens first.
    /// - [`FinderError::Interrupted`] if the shutdown flag is raised.
    pub fn find_duplicates(&self, root: &Path) -> Result<Detection, FinderError> {
        let start_time = Instant::now();
        let root = validate_root(root)?;
        let mut summary = ScanSummary::default();

        log::info!("Starting duplicate scan of {}", root.display());

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        // Walk
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("walking", 0);
            callback.on_message(&format!("Walking {}", root.display()));
        }

        let quarantine = if self.config.quarantine_dir.is_absolute() {
            self.config.quarantine_dir.clone()
        } else {
            root.join(&self.config.quarantine_dir)
        };
        let walker_config = self
            .config
            .walker_config
            .clone()
            .with_excluded_dir(quarantine);
        let mut walker = Walker::new(&root, walker_config);
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }

        let mut files = Vec::new();
        for event in walker.walk() {
            match event {
                Ok(ScanEvent::File(file)) => {
                    if let Some(ref callback) = self.config.progress_callback {
                        callback.on_progress(files.len() + 1, &file.path.to_string_lossy());
                    }
                    files.push(file);
                }
                Ok(ScanEvent::Skipped { path, reason }) => {
                    log::debug!("Skipped {} ({})", path.display(), reason);
                    summary.skipped_entries += 1;
                }
                Err(e) => summary.scan_errors.push(e),
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("walking");
        }
        if self.config.is_shutdown_requested() {
            log::info!("Scan interrupted during walk");
            return Err(FinderError::Interrupted);
        }

        log::info!(
            "Walk complete: {} files, {} skipped, {} errors",
            files.len(),
            summary.skipped_entries,
            summary.scan_errors.len()
        );

        // Size grouping
        let (size_groups, grouping) = group_by_size(files);
        summary.total_files = grouping.total_files;
        summary.total_size = grouping.total_size;
        summary.eliminated_by_size = grouping.unique_sizes;

        // Fingerprint
        let mut fp_config = FingerprintConfig::default().with_io_threads(self.config.io_threads);
        if let Some(ref flag) = self.config.shutdown_flag {
            fp_config = fp_config.with_shutdown_flag(flag.clone());
        }
        if let Some(ref callback) = self.config.progress_callback {
            fp_config = fp_config.with_progress_callback(callback.clone());
        }
        let (hashed, fp_stats) = fingerprint_size_groups(size_groups, &self.hasher, &fp_config);

        if fp_stats.interrupted {
            return Err(FinderError::Interrupted);
        }
        summary.hashed_files = fp_stats.hashed_files;
        summary.unhashable_files = fp_stats.failed_files;
        summary.bytes_hashed = fp_stats.bytes_hashed;
        summary
            .scan_errors
            .extend(fp_stats.errors.into_iter().map(ScanError::from));

        // Index
        let index = DuplicateIndex::build(hashed);
        summary.duplicate_groups = index.len();
        summary.duplicate_files = index.candidate_count();
        summary.reclaimable_space = index.reclaimable_bytes();
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} groups, {} duplicates, {} reclaimable in {:.2}s",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display(),
            summary.scan_duration.as_secs_f64()
        );

        Ok(Detection {
            root,
            quarantine_dir: self.config.quarantine_dir.clone(),
            index,
            summary,
        })
    }
}

/// Check that `root` is an existing directory and canonicalize it.
fn validate_root(root: &Path) -> Result<PathBuf, FinderError> {
    let invalid = |reason: String| FinderError::InvalidRoot {
        path: root.to_path_buf(),
        reason,
    };

    let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => invalid("path does not exist".to_string()),
        _ => invalid(e.to_string()),
    })?;
    if !metadata.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }

    root.canonicalize().map_err(|e| invalid(e.to_string()))
}
