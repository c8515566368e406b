//! JSON output formatter.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2026-01-01T12:00:00Z",
//!   "root": "/data",
//!   "quarantine_dir": "/data/to_delete",
//!   "exit_code": 0,
//!   "exit_code_name": "DS000",
//!   "groups": [
//!     {
//!       "fingerprint": "af1349b9...",
//!       "size": 1024,
//!       "keeper": "/data/a/1.txt",
//!       "candidates": ["/data/b/1.txt"]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 100,
//!     "duplicate_groups": 1,
//!     "reclaimable_space": 1024,
//!     ...
//!   },
//!   "relocation": { "records": [...], "failures": [], "bytes_moved": 1024, ... }
//! }
//! ```
//!
//! `summary` is absent for restore runs, `relocation` is present for
//! `scan` (as a dry-run plan) and `quarantine`, and `restore` only for
//! restore runs.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::actions::{RelocationReport, RestoreReport};
use crate::duplicates::{Detection, DuplicateGroup, ScanSummary};
use crate::error::ExitCode;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonGroup {
    /// BLAKE3 digest as hexadecimal string (64 characters)
    pub fingerprint: String,
    /// File size in bytes
    pub size: u64,
    /// The file that stays in place
    pub keeper: String,
    /// Files to relocate
    pub candidates: Vec<String>,
}

impl JsonGroup {
    /// Create a JSON group from a resolved duplicate group.
    #[must_use]
    pub fn from_group(group: &DuplicateGroup<'_>) -> Self {
        Self {
            fingerprint: group.fingerprint.digest_hex(),
            size: group.size(),
            keeper: path_string(&group.keeper.path),
            candidates: group
                .candidates
                .iter()
                .map(|c| path_string(&c.path))
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Total number of files scanned
    pub total_files: usize,
    /// Total size of all scanned files in bytes
    pub total_size: u64,
    /// Entries skipped by filters or because they are symlinks
    pub skipped_entries: usize,
    /// Files with a unique size, never hashed
    pub eliminated_by_size: usize,
    /// Files fully hashed
    pub hashed_files: usize,
    /// Files that could not be read
    pub unhashable_files: usize,
    /// Bytes read while hashing
    pub bytes_hashed: u64,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Total number of candidates (excluding keepers)
    pub duplicate_files: usize,
    /// Space freed by removing every candidate (bytes)
    pub reclaimable_space: u64,
    /// Duration of detection in milliseconds
    pub scan_duration_ms: u64,
    /// Recoverable errors, as messages
    pub errors: Vec<String>,
}

impl From<&ScanSummary> for JsonSummary {
    fn from(summary: &ScanSummary) -> Self {
        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            skipped_entries: summary.skipped_entries,
            eliminated_by_size: summary.eliminated_by_size,
            hashed_files: summary.hashed_files,
            unhashable_files: summary.unhashable_files,
            bytes_hashed: summary.bytes_hashed,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            errors: summary.scan_errors.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Complete JSON report for one run.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
    /// Scan root
    pub root: String,
    /// Absolute quarantine directory
    pub quarantine_dir: String,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DS000")
    pub exit_code_name: &'static str,
    /// Duplicate groups in report order
    pub groups: Vec<JsonGroup>,
    /// Detection statistics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<JsonSummary>,
    /// Relocation outcome or plan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relocation: Option<&'a RelocationReport>,
    /// Restore outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore: Option<&'a RestoreReport>,
}

impl<'a> JsonReport<'a> {
    /// Report for a detection run.
    #[must_use]
    pub fn detection(
        detection: &Detection,
        groups: &[DuplicateGroup<'_>],
        exit_code: ExitCode,
    ) -> Self {
        let root = detection.root();
        Self {
            generated_at: Utc::now(),
            root: path_string(root),
            quarantine_dir: path_string(&root.join(detection.quarantine_dir())),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
            groups: groups.iter().map(JsonGroup::from_group).collect(),
            summary: Some(JsonSummary::from(detection.summary())),
            relocation: None,
            restore: None,
        }
    }

    /// Report for a restore run.
    #[must_use]
    pub fn restore(
        root: &Path,
        quarantine_root: &Path,
        report: &'a RestoreReport,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            root: path_string(root),
            quarantine_dir: path_string(quarantine_root),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
            groups: Vec::new(),
            summary: None,
            relocation: None,
            restore: Some(report),
        }
    }

    /// Attach a relocation report (or dry-run plan).
    #[must_use]
    pub fn with_relocation(mut self, report: &'a RelocationReport) -> Self {
        self.relocation = Some(report);
        self
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Arguments
    ///
    /// * `writer` - The writer to output to (e.g., stdout)
    /// * `pretty` - Whether to pretty-print the output
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
