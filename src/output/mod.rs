//! Output formatters for detection, relocation and restore results.
//!
//! This module provides two output formats:
//! - Colored text for terminals
//! - JSON for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use dupestage::duplicates::DuplicateFinder;
//! use dupestage::error::ExitCode;
//! use dupestage::output::json::JsonReport;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let detection = finder.find_duplicates(Path::new(".")).unwrap();
//! let groups = detection.groups();
//!
//! let report = JsonReport::detection(&detection, &groups, ExitCode::Success);
//! println!("{}", report.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

use std::path::Path;

// Re-export main types
pub use json::{JsonOutputError, JsonReport};
pub use text::TextOutput;

/// Display `path` relative to `root` when it lies inside it.
pub(crate) fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
