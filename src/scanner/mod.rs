//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Iterative, deterministic directory walking
//! - Content hashing with BLAKE3
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: BLAKE3 file hashing (streaming)
//!
//! # Example
//!
//! ```no_run
//! use dupestage::scanner::{ScanEvent, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! for event in walker.walk() {
//!     match event {
//!         Ok(ScanEvent::File(file)) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Ok(ScanEvent::Skipped { path, reason }) => println!("skipped {} ({})", path.display(), reason),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

// Re-export main types
pub use hasher::{hash_to_hex, Hash, Hasher, HASH_BUFFER_SIZE};
pub use walker::Walker;

/// Name of the quarantine directory created under the scan root by default.
pub const DEFAULT_QUARANTINE_DIR: &str = "to_delete";

/// A regular file discovered during the scan.
///
/// `size` is read once from metadata. `digest` stays `None` until the
/// fingerprinting phase hashes the file, which only happens when at least
/// one other file shares its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// BLAKE3 digest of the full content, if computed
    pub digest: Option<Hash>,
}

impl FileRecord {
    /// Create a new record without a digest.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the file
    /// * `size` - File size in bytes
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            digest: None,
        }
    }

    /// Return a copy of this record carrying the given digest.
    #[must_use]
    pub fn with_digest(mut self, digest: Hash) -> Self {
        self.digest = Some(digest);
        self
    }

    /// Whether the record has been hashed.
    #[must_use]
    pub fn is_hashed(&self) -> bool {
        self.digest.is_some()
    }
}

/// Why the walker passed over an entry without recording it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Symbolic link (never followed)
    Symlink,
    /// Zero-byte file (excluded unless `include_empty` is set)
    Empty,
    /// Matched an ignore pattern
    Ignored,
    /// Hidden entry while `skip_hidden` is set
    Hidden,
    /// Smaller than the configured minimum size
    BelowMinSize,
    /// Socket, FIFO, device or other non-regular entry
    NotRegular,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Symlink => "symbolic link",
            Self::Empty => "empty file",
            Self::Ignored => "ignore pattern",
            Self::Hidden => "hidden",
            Self::BelowMinSize => "below minimum size",
            Self::NotRegular => "not a regular file",
        };
        f.write_str(text)
    }
}

/// Item produced by [`Walker::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A regular file that takes part in duplicate detection.
    File(FileRecord),
    /// An entry that was seen but deliberately left out.
    Skipped {
        /// Path of the skipped entry
        path: PathBuf,
        /// Why it was skipped
        reason: SkipReason,
    },
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Include zero-byte files. They are skipped by default.
    pub include_empty: bool,

    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,

    /// Glob patterns to ignore (gitignore-style).
    pub ignore_patterns: Vec<String>,

    /// Directories never descended into. Paths are compared after joining
    /// relative entries onto the scan root.
    pub excluded_dirs: Vec<PathBuf>,
}

impl WalkerConfig {
    /// Set whether hidden entries are skipped.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Set whether empty files are recorded.
    #[must_use]
    pub fn with_include_empty(mut self, include: bool) -> Self {
        self.include_empty = include;
        self
    }

    /// Set the minimum file size.
    #[must_use]
    pub fn with_min_size(mut self, min_size: Option<u64>) -> Self {
        self.min_size = min_size;
        self
    }

    /// Set the ignore patterns.
    #[must_use]
    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Add a directory that must never be walked.
    #[must_use]
    pub fn with_excluded_dir(mut self, dir: PathBuf) -> Self {
        self.excluded_dirs.push(dir);
        self
    }
}

/// Errors that can occur during directory scanning.
///
/// None of these abort a scan; they are collected into the summary.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ScanError {
    /// A directory could not be listed; its subtree was skipped.
    #[error("Cannot read directory {path}: {source}")]
    SubtreeUnreadable {
        /// Directory that could not be read
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Metadata for a single entry could not be read.
    #[error("Cannot read metadata for {path}: {source}")]
    Metadata {
        /// Entry whose metadata failed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A file could not be hashed and was left out of its size class.
    #[error(transparent)]
    UnhashableFile(#[from] HashError),
}

impl ScanError {
    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::SubtreeUnreadable { path, .. } | Self::Metadata { path, .. } => path,
            Self::UnhashableFile(e) => e.path(),
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug, Clone)]
pub enum HashError {
    /// The file disappeared before or while it was read.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Hashing was abandoned because shutdown was requested.
    #[error("Hashing interrupted: {0}")]
    Interrupted(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl HashError {
    /// Path of the file that failed to hash.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Interrupted(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}
