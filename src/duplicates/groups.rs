//! Size grouping and the duplicate index.
//!
//! # Overview
//!
//! Size grouping is the first phase of duplicate detection. Files with
//! different sizes cannot be duplicates, so only sizes shared by two or more
//! files move on to hashing.
//!
//! After hashing, [`DuplicateIndex::build`] partitions the hashed records by
//! [`Fingerprint`] and keeps only classes with at least two members. The
//! index owns every record; [`DuplicateGroup`] borrows from it.
//!
//! # Example
//!
//! ```
//! use dupestage::scanner::FileRecord;
//! use dupestage::duplicates::group_by_size;
//! use std::path::PathBuf;
//!
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/file1.txt"), 1024),
//!     FileRecord::new(PathBuf::from("/file2.txt"), 1024),
//!     FileRecord::new(PathBuf::from("/file3.txt"), 2048),
//! ];
//!
//! let (groups, stats) = group_by_size(files);
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//! assert_eq!(groups.len(), 1);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use super::policy::path_order;
use crate::scanner::{hash_to_hex, FileRecord, Hash};

/// Equivalence key for duplicate detection: size plus full-content digest.
///
/// Ordered by size first, then digest, which fixes the order in which groups
/// are reported and relocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint {
    /// File size in bytes
    pub size: u64,
    /// BLAKE3 digest of the full content
    pub digest: Hash,
}

impl Fingerprint {
    /// Create a fingerprint from its parts.
    #[must_use]
    pub fn new(size: u64, digest: Hash) -> Self {
        Self { size, digest }
    }

    /// Fingerprint of a record, if it has been hashed.
    #[must_use]
    pub fn of(record: &FileRecord) -> Option<Self> {
        record.digest.map(|digest| Self::new(record.size, digest))
    }

    /// Digest as lowercase hex.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hash_to_hex(&self.digest)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.size, self.digest_hex())
    }
}

/// Statistics from size-based grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files processed
    pub total_files: usize,
    /// Total size of all files processed
    pub total_size: u64,
    /// Number of files with a size no other file shares
    pub unique_sizes: usize,
    /// Number of size groups with 2+ files
    pub size_groups: usize,
    /// Number of files that still need hashing
    pub potential_duplicates: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated without being opened.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.unique_sizes as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Group files by size, dropping sizes held by a single file.
///
/// The returned map is keyed by size and only holds groups of two or more
/// records, each in the order they were received.
#[must_use]
pub fn group_by_size(files: Vec<FileRecord>) -> (BTreeMap<u64, Vec<FileRecord>>, GroupingStats) {
    let mut stats = GroupingStats {
        total_files: files.len(),
        ..Default::default()
    };

    let mut by_size: BTreeMap<u64, Vec<FileRecord>> = BTreeMap::new();
    for file in files {
        stats.total_size += file.size;
        by_size.entry(file.size).or_default().push(file);
    }

    by_size.retain(|size, group| {
        if group.len() > 1 {
            true
        } else {
            log::trace!("Unique size {}: {}", size, group[0].path.display());
            stats.unique_sizes += 1;
            false
        }
    });

    stats.size_groups = by_size.len();
    stats.potential_duplicates = by_size.values().map(Vec::len).sum();

    log::debug!(
        "Size grouping: {} files, {} size groups, {} candidates ({:.1}% eliminated)",
        stats.total_files,
        stats.size_groups,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (by_size, stats)
}

/// Authoritative mapping from fingerprint to the files that share it.
///
/// Only classes with two or more members are stored. Members of each class
/// are sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateIndex {
    classes: BTreeMap<Fingerprint, Vec<FileRecord>>,
}

impl DuplicateIndex {
    /// Partition hashed records into duplicate classes.
    ///
    /// Records without a digest are ignored.
    #[must_use]
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = FileRecord>,
    {
        let mut classes: BTreeMap<Fingerprint, Vec<FileRecord>> = BTreeMap::new();
        for record in records {
            match Fingerprint::of(&record) {
                Some(fp) => classes.entry(fp).or_default().push(record),
                None => log::trace!("Not indexing unhashed file {}", record.path.display()),
            }
        }

        classes.retain(|_, members| members.len() > 1);
        for (fp, members) in &mut classes {
            members.sort_by(|a, b| path_order(&a.path, &b.path));
            log::debug!(
                "Duplicate class {}: {} files, {} bytes each",
                fp.digest_hex(),
                members.len(),
                fp.size
            );
        }

        Self { classes }
    }

    /// Number of duplicate classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no duplicates were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterate classes in fingerprint order.
    pub fn classes(&self) -> impl Iterator<Item = (&Fingerprint, &[FileRecord])> {
        self.classes.iter().map(|(fp, members)| (fp, members.as_slice()))
    }

    /// Members of one class.
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&[FileRecord]> {
        self.classes.get(fingerprint).map(Vec::as_slice)
    }

    /// Total number of files across all classes.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }

    /// Number of files that would be relocated (all members minus one keeper
    /// per class).
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.file_count() - self.len()
    }

    /// Bytes freed if every candidate were removed.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.classes
            .iter()
            .map(|(fp, members)| fp.size * (members.len() as u64 - 1))
            .sum()
    }
}

/// A resolved duplicate class: one keeper and the candidates to relocate.
///
/// Borrows its records from a [`DuplicateIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup<'a> {
    /// Shared fingerprint of every member
    pub fingerprint: Fingerprint,
    /// The file that stays in place
    pub keeper: &'a FileRecord,
    /// Files to relocate, in ascending path order
    pub candidates: Vec<&'a FileRecord>,
}

impl<'a> DuplicateGroup<'a> {
    /// Number of files in the group, keeper included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len() + 1
    }

    /// A group always has its keeper, so it is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// File size shared by all members.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.fingerprint.size
    }

    /// Bytes freed by relocating every candidate.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.fingerprint.size * self.candidates.len() as u64
    }

    /// Keeper followed by candidates.
    pub fn members(&self) -> impl Iterator<Item = &'a FileRecord> + '_ {
        std::iter::once(self.keeper).chain(self.candidates.iter().copied())
    }
}
