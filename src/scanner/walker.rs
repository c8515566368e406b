//! Directory walker for file discovery.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory tree
//! and yielding a [`ScanEvent`] for every entry it considers. The traversal:
//!
//! - Is iterative over an explicit stack of pending directories
//! - Sorts each directory's children by file name for deterministic output
//! - Never follows symbolic links (they are reported as skipped)
//! - Never descends into excluded directories such as the quarantine folder
//! - Supports gitignore-style pattern matching via the `ignore` crate
//!
//! Unreadable directories produce [`ScanError::SubtreeUnreadable`] and the
//! walk carries on with the rest of the stack.
//!
//! # Example
//!
//! ```no_run
//! use dupestage::scanner::{ScanEvent, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! let files: Vec<_> = walker
//!     .walk()
//!     .filter_map(|event| match event {
//!         Ok(ScanEvent::File(file)) => Some(file),
//!         _ => None,
//!     })
//!     .collect();
//! println!("Found {} files", files.len());
//! ```

use std::fs::{self, FileType};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use super::{FileRecord, ScanError, ScanEvent, SkipReason, WalkerConfig};

/// Directory walker yielding scan events in a stable order.
#[derive(Debug)]
pub struct Walker {
    /// Root directory to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Directories never descended into, made absolute against the root
    excluded: Vec<PathBuf>,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// # Arguments
    ///
    /// * `path` - Root directory to scan
    /// * `config` - Walker configuration options
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        let root = path.to_path_buf();
        let excluded = config
            .excluded_dirs
            .iter()
            .map(|dir| {
                if dir.is_absolute() {
                    dir.clone()
                } else {
                    root.join(dir)
                }
            })
            .collect();

        Self {
            root,
            config,
            excluded,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walk ends before the next entry.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root directory of this walker.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build the ignore matcher from configured patterns.
    fn build_gitignore(&self) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Start the walk.
    ///
    /// The returned iterator is lazy: each directory is read only when the
    /// iterator reaches it. Files of a directory are yielded before the
    /// contents of its subdirectories.
    #[must_use]
    pub fn walk(&self) -> WalkIter<'_> {
        WalkIter {
            walker: self,
            gitignore: self.build_gitignore(),
            stack: vec![self.root.clone()],
            current: Vec::new().into_iter(),
            subdirs: Vec::new(),
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded.iter().any(|dir| dir == path)
    }

    fn is_ignored(&self, path: &Path, is_dir: bool, gitignore: Option<&Gitignore>) -> bool {
        let Some(gi) = gitignore else {
            return false;
        };
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        gi.matched_path_or_any_parents(relative, is_dir).is_ignore()
    }

    fn is_hidden(&self, name: &std::ffi::OsStr) -> bool {
        self.config.skip_hidden && name.to_string_lossy().starts_with('.')
    }

    fn size_skip_reason(&self, size: u64) -> Option<SkipReason> {
        if size == 0 && !self.config.include_empty {
            return Some(SkipReason::Empty);
        }
        match self.config.min_size {
            Some(min) if size < min => Some(SkipReason::BelowMinSize),
            _ => None,
        }
    }
}

/// Iterator returned by [`Walker::walk`].
pub struct WalkIter<'a> {
    walker: &'a Walker,
    gitignore: Option<Gitignore>,
    /// Directories waiting to be read
    stack: Vec<PathBuf>,
    /// Sorted children of the directory currently being emitted
    current: std::vec::IntoIter<(PathBuf, Option<FileType>)>,
    /// Subdirectories of the current directory, pushed once it is drained
    subdirs: Vec<PathBuf>,
}

impl WalkIter<'_> {
    /// Read and sort the children of `dir`.
    fn read_children(&self, dir: &Path) -> Result<Vec<(PathBuf, Option<FileType>)>, ScanError> {
        let reader = fs::read_dir(dir).map_err(|e| {
            log::warn!("Cannot read directory {}: {}", dir.display(), e);
            ScanError::SubtreeUnreadable {
                path: dir.to_path_buf(),
                source: Arc::new(e),
            }
        })?;

        let mut children = Vec::new();
        for entry in reader {
            match entry {
                Ok(entry) => children.push((entry.path(), entry.file_type().ok())),
                Err(e) => {
                    log::warn!("Error listing {}: {}", dir.display(), e);
                    return Err(ScanError::SubtreeUnreadable {
                        path: dir.to_path_buf(),
                        source: Arc::new(e),
                    });
                }
            }
        }
        children.sort_by(|(a, _), (b, _)| a.file_name().cmp(&b.file_name()));
        Ok(children)
    }

    /// Classify one child entry. Returns `None` for entries that produce no
    /// event (directories queued for descent, excluded directories).
    fn visit(
        &mut self,
        path: PathBuf,
        file_type: Option<FileType>,
    ) -> Option<Result<ScanEvent, ScanError>> {
        let walker = self.walker;
        let name = path.file_name().map(std::ffi::OsStr::to_os_string);

        // DirEntry::file_type does not follow links, but may be unavailable.
        let file_type = match file_type {
            Some(ft) => ft,
            None => match fs::symlink_metadata(&path) {
                Ok(meta) => meta.file_type(),
                Err(e) => return Some(Err(metadata_error(path, e))),
            },
        };

        if file_type.is_symlink() {
            log::trace!("Skipping symlink: {}", path.display());
            return Some(Ok(ScanEvent::Skipped {
                path,
                reason: SkipReason::Symlink,
            }));
        }

        if name.as_deref().is_some_and(|n| walker.is_hidden(n)) {
            log::trace!("Skipping hidden entry: {}", path.display());
            return Some(Ok(ScanEvent::Skipped {
                path,
                reason: SkipReason::Hidden,
            }));
        }

        if file_type.is_dir() {
            if walker.is_excluded(&path) {
                log::debug!("Not descending into excluded directory {}", path.display());
                return None;
            }
            if walker.is_ignored(&path, true, self.gitignore.as_ref()) {
                log::trace!("Ignoring directory: {}", path.display());
                return Some(Ok(ScanEvent::Skipped {
                    path,
                    reason: SkipReason::Ignored,
                }));
            }
            self.subdirs.push(path);
            return None;
        }

        if walker.is_ignored(&path, false, self.gitignore.as_ref()) {
            log::trace!("Ignoring file: {}", path.display());
            return Some(Ok(ScanEvent::Skipped {
                path,
                reason: SkipReason::Ignored,
            }));
        }

        if !file_type.is_file() {
            return Some(Ok(ScanEvent::Skipped {
                path,
                reason: SkipReason::NotRegular,
            }));
        }

        let metadata = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => return Some(Err(metadata_error(path, e))),
        };
        let size = metadata.len();

        if let Some(reason) = walker.size_skip_reason(size) {
            log::trace!("Skipping {} ({}): {}", size, reason, path.display());
            return Some(Ok(ScanEvent::Skipped { path, reason }));
        }

        log::trace!("Found file ({} bytes): {}", size, path.display());
        Some(Ok(ScanEvent::File(FileRecord::new(path, size))))
    }
}

impl Iterator for WalkIter<'_> {
    type Item = Result<ScanEvent, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.walker.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return None;
            }

            if let Some((path, file_type)) = self.current.next() {
                if let Some(event) = self.visit(path, file_type) {
                    return Some(event);
                }
                continue;
            }

            // Current directory drained: queue its subdirectories so the first
            // one by name is visited next.
            while let Some(dir) = self.subdirs.pop() {
                self.stack.push(dir);
            }

            let dir = self.stack.pop()?;
            match self.read_children(&dir) {
                Ok(children) => self.current = children.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn metadata_error(path: PathBuf, error: std::io::Error) -> ScanError {
    log::warn!("Cannot read metadata for {}: {}", path.display(), error);
    ScanError::Metadata {
        path,
        source: Arc::new(error),
    }
}
