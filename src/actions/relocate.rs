//! Quarantine relocation of duplicate candidates.
//!
//! # Overview
//!
//! Candidates are moved into `<root>/<quarantine_dir>/<relative path>`,
//! mirroring where they came from. Nothing is ever deleted or overwritten:
//! - An occupied destination gets a `~N` suffix before the extension
//!   (`report~1.pdf`, `report~2.pdf`, ...)
//! - A plain `rename` is tried first
//! - Across filesystems, or with `force_copy`, the file is copied into a
//!   freshly created destination, the copy is checked against the recorded
//!   size and BLAKE3 digest, and only then is the source removed
//!
//! Before every move the candidate is checked again; a file that vanished
//! or changed size since the scan is reported and left alone.
//!
//! # Example
//!
//! ```no_run
//! use dupestage::actions::relocate::{RelocateConfig, Relocator};
//! use dupestage::duplicates::DuplicateFinder;
//! use std::path::Path;
//!
//! let detection = DuplicateFinder::with_defaults()
//!     .find_duplicates(Path::new("/data"))
//!     .unwrap();
//! let relocator = Relocator::new(detection.root(), RelocateConfig::default());
//! let report = relocator.relocate_groups(&detection.groups());
//! println!("{}", report.summary());
//! ```

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::duplicates::DuplicateGroup;
use crate::progress::ProgressCallback;
use crate::scanner::{
    FileRecord, Hash, Hasher, ScanEvent, Walker, WalkerConfig, DEFAULT_QUARANTINE_DIR,
};

/// Error type for relocation and restore operations.
///
/// Both variants are per-file; a batch always continues past them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelocateError {
    /// The file could not be moved and was left where it was.
    #[error("cannot relocate {path}: {reason}")]
    RelocationFailed {
        /// File that was not moved
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// A cross-volume copy did not match the original. The copy was
    /// discarded and the source kept.
    #[error("copy of {path} failed verification: {reason}")]
    VerificationFailed {
        /// File whose copy was discarded
        path: PathBuf,
        /// Which check failed
        reason: String,
    },
}

impl RelocateError {
    /// Path of the file the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::RelocationFailed { path, .. } | Self::VerificationFailed { path, .. } => path,
        }
    }

    fn failed(path: &Path, reason: impl Into<String>) -> Self {
        Self::RelocationFailed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn verification(path: &Path, reason: impl Into<String>) -> Self {
        Self::VerificationFailed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// How a file reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelocationMethod {
    /// Same-filesystem rename
    Rename,
    /// Copy, verify, then remove the source
    CopyVerified,
}

/// Lifecycle of one candidate.
///
/// `Detected -> Relocated` for a rename,
/// `Detected -> VerifyingCopy -> Relocated` for a cross-volume copy, or
/// `Detected | VerifyingCopy -> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelocationState {
    /// Planned, not yet moved
    Detected,
    /// Copy written, being checked
    VerifyingCopy,
    /// At its destination
    Relocated,
    /// Left in place
    Failed,
}

impl RelocationState {
    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Detected, Self::VerifyingCopy | Self::Relocated | Self::Failed)
                | (Self::VerifyingCopy, Self::Relocated | Self::Failed)
        )
    }
}

/// One candidate's relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocationRecord {
    /// Where the file was
    pub source: PathBuf,
    /// Where it went (or would go, in a dry run)
    pub destination: Option<PathBuf>,
    /// Size recorded at scan time
    pub size: u64,
    /// How it was moved, once moved
    pub method: Option<RelocationMethod>,
    /// Current state
    pub state: RelocationState,
}

impl RelocationRecord {
    fn detected(source: &Path, size: u64) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: None,
            size,
            method: None,
            state: RelocationState::Detected,
        }
    }

    fn advance(&mut self, next: RelocationState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal relocation transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }
}

/// Results of relocating a batch of groups.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelocationReport {
    /// Every candidate attempted (or planned), in group order
    pub records: Vec<RelocationRecord>,
    /// Per-file failures
    #[serde(serialize_with = "serialize_errors")]
    pub failures: Vec<RelocateError>,
    /// Bytes now sitting in quarantine
    pub bytes_moved: u64,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Whether the batch stopped early on shutdown
    pub interrupted: bool,
}

impl RelocationReport {
    /// Number of files moved.
    #[must_use]
    pub fn relocated_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.state == RelocationState::Relocated)
            .count()
    }

    /// Number of files left in place because of an error.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Number of copies discarded by verification.
    #[must_use]
    pub fn verification_failures(&self) -> usize {
        self.failures
            .iter()
            .filter(|e| matches!(e, RelocateError::VerificationFailed { .. }))
            .count()
    }

    /// Whether every attempted move succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty() && !self.interrupted
    }

    /// One-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.dry_run {
            let planned = self
                .records
                .iter()
                .filter(|r| r.state == RelocationState::Detected);
            let (count, bytes) = planned.fold((0usize, 0u64), |(n, b), r| (n + 1, b + r.size));
            return format!(
                "Would relocate {} files ({})",
                count,
                bytesize::ByteSize(bytes)
            );
        }
        let mut text = format!(
            "Relocated {} files ({})",
            self.relocated_count(),
            bytesize::ByteSize(self.bytes_moved)
        );
        if !self.failures.is_empty() {
            text.push_str(&format!(", {} failed", self.failures.len()));
        }
        if self.interrupted {
            text.push_str(", interrupted");
        }
        text
    }
}

/// Results of moving quarantined files back.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreReport {
    /// Files returned, with `source` in quarantine and `destination` the
    /// original location
    pub restored: Vec<RelocationRecord>,
    /// Quarantined files whose original location is occupied
    pub conflicts: Vec<PathBuf>,
    /// Per-file failures
    #[serde(serialize_with = "serialize_errors")]
    pub failures: Vec<RelocateError>,
    /// Empty quarantine directories removed afterwards
    pub pruned_dirs: usize,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Whether the restore stopped early on shutdown
    pub interrupted: bool,
}

impl RestoreReport {
    /// One-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let verb = if self.dry_run { "Would restore" } else { "Restored" };
        let mut text = format!(
            "{} {} files, {} conflicts, {} failed",
            verb,
            self.restored.len(),
            self.conflicts.len(),
            self.failures.len()
        );
        if self.interrupted {
            text.push_str(", interrupted");
        }
        text
    }
}

fn serialize_errors<S>(errors: &[RelocateError], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}

/// Configuration for the relocator.
#[derive(Clone)]
pub struct RelocateConfig {
    /// Quarantine directory, relative to the root unless absolute.
    pub quarantine_dir: PathBuf,
    /// Always copy-verify-delete instead of renaming.
    pub force_copy: bool,
    /// Compute destinations without touching the filesystem.
    pub dry_run: bool,
    /// Retries for transient read errors while verifying copies.
    pub read_retries: u32,
    /// Optional shutdown flag, checked between files.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for RelocateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelocateConfig")
            .field("quarantine_dir", &self.quarantine_dir)
            .field("force_copy", &self.force_copy)
            .field("dry_run", &self.dry_run)
            .field("read_retries", &self.read_retries)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for RelocateConfig {
    fn default() -> Self {
        Self {
            quarantine_dir: PathBuf::from(DEFAULT_QUARANTINE_DIR),
            force_copy: false,
            dry_run: false,
            read_retries: crate::scanner::hasher::DEFAULT_READ_RETRIES,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl RelocateConfig {
    /// Set the quarantine directory.
    #[must_use]
    pub fn with_quarantine_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.quarantine_dir = dir.into();
        self
    }

    /// Always use copy-verify-delete.
    #[must_use]
    pub fn with_force_copy(mut self, force: bool) -> Self {
        self.force_copy = force;
        self
    }

    /// Plan only.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the retry budget used when hashing copies.
    #[must_use]
    pub fn with_read_retries(mut self, retries: u32) -> Self {
        self.read_retries = retries;
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
}

/// Moves candidates into quarantine, and back.
#[derive(Debug)]
pub struct Relocator {
    root: PathBuf,
    quarantine_root: PathBuf,
    config: RelocateConfig,
    hasher: Hasher,
}

impl Relocator {
    /// Create a relocator for a scan root.
    ///
    /// `root` should be the canonical root the detection ran on, so that
    /// candidate paths strip cleanly against it.
    #[must_use]
    pub fn new(root: &Path, config: RelocateConfig) -> Self {
        let quarantine_root = if config.quarantine_dir.is_absolute() {
            config.quarantine_dir.clone()
        } else {
            root.join(&config.quarantine_dir)
        };
        let hasher = Hasher::new().with_read_retries(config.read_retries);
        Self {
            root: root.to_path_buf(),
            quarantine_root,
            config,
            hasher,
        }
    }

    /// Absolute path of the quarantine directory.
    #[must_use]
    pub fn quarantine_root(&self) -> &Path {
        &self.quarantine_root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.config
            .shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Mirrored quarantine location of `source`, before collision handling.
    ///
    /// # Errors
    ///
    /// `RelocationFailed` if `source` is not under the root or is the root.
    pub fn quarantine_path_for(&self, source: &Path) -> Result<PathBuf, RelocateError> {
        let relative = source
            .strip_prefix(&self.root)
            .map_err(|_| RelocateError::failed(source, "not under the scan root"))?;
        if relative.as_os_str().is_empty() {
            return Err(RelocateError::failed(source, "is the scan root"));
        }
        if source.starts_with(&self.quarantine_root) {
            return Err(RelocateError::failed(source, "already in quarantine"));
        }
        Ok(self.quarantine_root.join(relative))
    }

    /// Existing components of `dir` below the root must be real directories,
    /// since `create_dir_all` and `rename` follow symlinks.
    fn check_real_dirs(&self, dir: &Path) -> Result<(), String> {
        let mut current = dir;
        loop {
            match fs::symlink_metadata(current) {
                Ok(m) if m.file_type().is_symlink() => {
                    return Err(format!("quarantine path {} is a symlink", current.display()));
                }
                Ok(m) if !m.is_dir() => {
                    return Err(format!(
                        "quarantine path {} is not a directory",
                        current.display()
                    ));
                }
                _ => {}
            }
            match current.parent() {
                Some(parent) if parent.starts_with(&self.root) && parent != self.root => {
                    current = parent;
                }
                _ => return Ok(()),
            }
        }
    }

    /// First free name for `mirrored`: itself, then `stem~1.ext`,
    /// `stem~2.ext`, and so on. Paths in `reserved` count as taken.
    fn free_destination(&self, mirrored: &Path, reserved: &HashSet<PathBuf>) -> PathBuf {
        let taken = |p: &Path| reserved.contains(p) || fs::symlink_metadata(p).is_ok();
        if !taken(mirrored) {
            return mirrored.to_path_buf();
        }
        (1u64..)
            .map(|n| suffixed(mirrored, n))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| mirrored.to_path_buf())
    }

    /// Relocate one candidate.
    ///
    /// In dry-run mode only the destination is computed.
    ///
    /// # Errors
    ///
    /// - `RelocationFailed` if the file is gone, changed size, or cannot be
    ///   moved
    /// - `VerificationFailed` if a cross-volume copy does not match
    pub fn relocate(&self, candidate: &FileRecord) -> Result<RelocationRecord, RelocateError> {
        self.relocate_reserving(candidate, &mut HashSet::new())
    }

    fn relocate_reserving(
        &self,
        candidate: &FileRecord,
        reserved: &mut HashSet<PathBuf>,
    ) -> Result<RelocationRecord, RelocateError> {
        let mut record = RelocationRecord::detected(&candidate.path, candidate.size);
        let mirrored = self.quarantine_path_for(&candidate.path)?;
        if let Some(parent) = mirrored.parent() {
            self.check_real_dirs(parent)
                .map_err(|reason| RelocateError::failed(&candidate.path, reason))?;
        }

        recheck(candidate)?;

        let destination = self.free_destination(&mirrored, reserved);
        reserved.insert(destination.clone());
        record.destination = Some(destination);

        if self.config.dry_run {
            log::debug!("Would relocate {}", candidate.path.display());
            return Ok(record);
        }

        self.move_file(&mut record, candidate.digest)?;
        Ok(record)
    }

    /// Relocate every candidate of every group, in order.
    ///
    /// Keepers are never touched. A failure is recorded and the batch moves
    /// on; a raised shutdown flag stops it before the next file.
    #[must_use]
    pub fn relocate_groups(&self, groups: &[DuplicateGroup<'_>]) -> RelocationReport {
        let total: usize = groups.iter().map(|g| g.candidates.len()).sum();
        let mut report = RelocationReport {
            dry_run: self.config.dry_run,
            ..Default::default()
        };
        let mut reserved = HashSet::new();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("relocate", total);
        }
        log::info!(
            "{} {} candidates into {}",
            if self.config.dry_run { "Planning" } else { "Relocating" },
            total,
            self.quarantine_root.display()
        );

        let mut current = 0;
        'groups: for group in groups {
            log::debug!(
                "Group {}: keeping {}",
                group.fingerprint.digest_hex(),
                group.keeper.path.display()
            );
            for candidate in &group.candidates {
                if self.is_shutdown_requested() {
                    log::info!("Relocation interrupted by shutdown signal");
                    report.interrupted = true;
                    break 'groups;
                }
                debug_assert_ne!(candidate.path, group.keeper.path);

                current += 1;
                if let Some(ref callback) = self.config.progress_callback {
                    callback.on_progress(current, &candidate.path.to_string_lossy());
                }

                match self.relocate_reserving(candidate, &mut reserved) {
                    Ok(record) => {
                        if record.state == RelocationState::Relocated {
                            report.bytes_moved += record.size;
                            if let Some(ref callback) = self.config.progress_callback {
                                callback.on_item_completed(record.size);
                            }
                        }
                        report.records.push(record);
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        let mut record = RelocationRecord::detected(&candidate.path, candidate.size);
                        record.advance(RelocationState::Failed);
                        report.records.push(record);
                        report.failures.push(e);
                    }
                }
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("relocate");
        }
        log::info!("{}", report.summary());
        report
    }

    /// Move `record.source` to `record.destination`, renaming when possible.
    fn move_file(
        &self,
        record: &mut RelocationRecord,
        digest: Option<Hash>,
    ) -> Result<(), RelocateError> {
        let destination = record
            .destination
            .clone()
            .ok_or_else(|| RelocateError::failed(&record.source, "no destination"))?;

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RelocateError::failed(
                    &record.source,
                    format!("cannot create {}: {}", parent.display(), e),
                )
            })?;
        }

        if !self.config.force_copy {
            match fs::rename(&record.source, &destination) {
                Ok(()) => {
                    log::trace!(
                        "Renamed {} -> {}",
                        record.source.display(),
                        destination.display()
                    );
                    record.method = Some(RelocationMethod::Rename);
                    record.advance(RelocationState::Relocated);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                    log::debug!(
                        "{} is on another filesystem, copying instead",
                        record.source.display()
                    );
                }
                Err(e) => return Err(RelocateError::failed(&record.source, e.to_string())),
            }
        }

        self.copy_verified(record, &destination, digest)
    }

    /// Copy into a new file, verify it, then remove the source.
    ///
    /// When `digest` is `None` the source is hashed before copying.
    fn copy_verified(
        &self,
        record: &mut RelocationRecord,
        destination: &Path,
        digest: Option<Hash>,
    ) -> Result<(), RelocateError> {
        let source = record.source.clone();
        let expected = match digest {
            Some(d) => d,
            None => self
                .hasher
                .full_hash(&source)
                .map_err(|e| RelocateError::failed(&source, e.to_string()))?,
        };

        copy_into_new(&source, destination)
            .map_err(|e| RelocateError::failed(&source, format!("copy failed: {e}")))?;
        record.advance(RelocationState::VerifyingCopy);

        if let Err(e) = self.verify_copy(destination, record.size, &expected) {
            discard(destination);
            record.advance(RelocationState::Failed);
            return Err(RelocateError::verification(&source, e));
        }

        if let Err(e) = fs::remove_file(&source) {
            discard(destination);
            record.advance(RelocationState::Failed);
            return Err(RelocateError::failed(
                &source,
                format!("cannot remove source after copy: {e}"),
            ));
        }

        record.method = Some(RelocationMethod::CopyVerified);
        record.advance(RelocationState::Relocated);
        log::trace!("Copied and verified {} -> {}", source.display(), destination.display());
        Ok(())
    }

    fn verify_copy(&self, copy: &Path, size: u64, expected: &Hash) -> Result<(), String> {
        let copied = fs::metadata(copy).map_err(|e| e.to_string())?.len();
        if copied != size {
            return Err(format!("size mismatch: expected {size}, copied {copied}"));
        }
        let actual = self.hasher.full_hash(copy).map_err(|e| e.to_string())?;
        if &actual != expected {
            return Err("digest mismatch".to_string());
        }
        Ok(())
    }

    /// Move every quarantined file back to its mirrored original location.
    ///
    /// Files whose original location is occupied stay in quarantine and are
    /// listed as conflicts. Empty quarantine directories are removed
    /// afterwards.
    #[must_use]
    pub fn restore(&self) -> RestoreReport {
        let mut report = RestoreReport {
            dry_run: self.config.dry_run,
            ..Default::default()
        };
        if fs::symlink_metadata(&self.quarantine_root).is_err() {
            log::info!("Nothing to restore: {} does not exist", self.quarantine_root.display());
            return report;
        }
        if let Err(reason) = self.check_real_dirs(&self.quarantine_root) {
            log::warn!("Not restoring: {}", reason);
            report
                .failures
                .push(RelocateError::failed(&self.quarantine_root, reason));
            return report;
        }

        let walker = Walker::new(
            &self.quarantine_root,
            WalkerConfig::default().with_include_empty(true),
        );
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("restore", 0);
        }
        let mut current = 0;
        for event in walker.walk() {
            if self.is_shutdown_requested() {
                log::info!("Restore interrupted by shutdown signal");
                report.interrupted = true;
                break;
            }
            let file = match event {
                Ok(ScanEvent::File(file)) => file,
                Ok(ScanEvent::Skipped { path, reason }) => {
                    log::warn!("Leaving {} in quarantine ({})", path.display(), reason);
                    continue;
                }
                Err(e) => {
                    report
                        .failures
                        .push(RelocateError::failed(e.path(), e.to_string()));
                    continue;
                }
            };

            let Ok(relative) = file.path.strip_prefix(&self.quarantine_root) else {
                continue;
            };
            let target = self.root.join(relative);
            if fs::symlink_metadata(&target).is_ok() {
                log::warn!(
                    "Not restoring {}: {} already exists",
                    file.path.display(),
                    target.display()
                );
                report.conflicts.push(file.path);
                continue;
            }

            current += 1;
            if let Some(ref callback) = self.config.progress_callback {
                callback.on_progress(current, &file.path.to_string_lossy());
            }

            let mut record = RelocationRecord::detected(&file.path, file.size);
            record.destination = Some(target);
            if !self.config.dry_run {
                if let Err(e) = self.move_file(&mut record, None) {
                    log::warn!("{}", e);
                    report.failures.push(e);
                    continue;
                }
                if let Some(ref callback) = self.config.progress_callback {
                    callback.on_item_completed(record.size);
                }
            }
            report.restored.push(record);
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("restore");
        }

        if !self.config.dry_run {
            report.pruned_dirs = prune_empty_dirs(&self.quarantine_root);
        }
        log::info!("{}", report.summary());
        report
    }
}

/// Confirm a candidate still looks the way the scan saw it.
fn recheck(candidate: &FileRecord) -> Result<(), RelocateError> {
    let metadata = match fs::symlink_metadata(&candidate.path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RelocateError::failed(&candidate.path, "file no longer exists"));
        }
        Err(e) => return Err(RelocateError::failed(&candidate.path, e.to_string())),
    };
    if !metadata.is_file() {
        return Err(RelocateError::failed(
            &candidate.path,
            "no longer a regular file",
        ));
    }
    if metadata.len() != candidate.size {
        return Err(RelocateError::failed(
            &candidate.path,
            format!(
                "modified since scan (size {} -> {})",
                candidate.size,
                metadata.len()
            ),
        ));
    }
    Ok(())
}

/// `dir/stem~n.ext`
fn suffixed(path: &Path, n: u64) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default();
    let mut name = OsString::from(stem);
    name.push(format!("~{n}"));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

/// Copy `source` into a file that must not exist yet. A partial copy is
/// removed on error.
fn copy_into_new(source: &Path, destination: &Path) -> io::Result<()> {
    let mut reader = File::open(source)?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)?;

    let written = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all());
    drop(writer);
    if let Err(e) = written {
        discard(destination);
        return Err(e);
    }

    // Permissions are best effort.
    if let Ok(metadata) = reader.metadata() {
        let _ = fs::set_permissions(destination, metadata.permissions());
    }
    Ok(())
}

fn discard(copy: &Path) {
    if let Err(e) = fs::remove_file(copy) {
        log::warn!("Failed to remove rejected copy {}: {}", copy.display(), e);
    }
}

/// Remove empty directories under and including `top`, deepest first.
///
/// Returns how many were removed.
fn prune_empty_dirs(top: &Path) -> usize {
    let mut dirs = Vec::new();
    let mut stack = vec![top.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                stack.push(entry.path());
            }
        }
        dirs.push(dir);
    }

    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
    dirs.iter().filter(|d| fs::remove_dir(d).is_ok()).count()
}
