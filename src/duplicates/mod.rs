//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based file grouping
//! - Full-content BLAKE3 fingerprinting of same-size files
//! - Partitioning into duplicate classes
//! - Keeper selection
//!
//! [`DuplicateFinder`] runs the whole pipeline; each stage is also exposed
//! on its own.

pub mod fingerprint;
pub mod finder;
pub mod groups;
pub mod policy;

pub use fingerprint::{fingerprint_size_groups, FingerprintConfig, FingerprintStats};
pub use finder::{Detection, DuplicateFinder, FinderConfig, FinderError, ScanSummary};
pub use groups::{group_by_size, DuplicateGroup, DuplicateIndex, Fingerprint, GroupingStats};
pub use policy::{keeper_order, path_depth, path_order, resolve, resolve_all, select_keeper};
