//! File actions module.
//!
//! This module provides functionality for:
//! - Moving duplicate candidates into a quarantine directory
//! - Verified copy fallback across filesystems
//! - Restoring quarantined files to their original locations
//!
//! Nothing here deletes user data: candidates are staged for a human (or a
//! separate step) to remove.
//!
//! ```no_run
//! use dupestage::actions::{RelocateConfig, Relocator};
//! use std::path::Path;
//!
//! let relocator = Relocator::new(Path::new("/data"), RelocateConfig::default());
//! let report = relocator.restore();
//! println!("{}", report.summary());
//! ```

pub mod relocate;

// Re-export commonly used types
pub use relocate::{
    RelocateConfig, RelocateError, RelocationMethod, RelocationRecord, RelocationReport,
    RelocationState, Relocator, RestoreReport,
};
