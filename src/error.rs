//! Structured error handling and exit codes.

use serde::Serialize;

use crate::config::ConfigError;
use crate::duplicates::FinderError;

/// Exit codes for the dupestage application.
///
/// - 0: Success (completed normally, duplicates found or handled)
/// - 1: General error (unexpected failure)
/// - 2: No duplicates found (completed normally, nothing to do)
/// - 3: Partial success (completed with some per-file errors)
/// - 4: Invalid input (bad root directory or configuration)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: Completed and duplicates were found or handled.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No duplicates: Scan completed but no duplicates were found.
    NoDuplicates = 2,
    /// Partial success: Completed but some files could not be read or moved.
    PartialSuccess = 3,
    /// Invalid input: The root or configuration was rejected.
    InvalidInput = 4,
    /// Interrupted: Run was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DS000",
            Self::GeneralError => "DS001",
            Self::NoDuplicates => "DS002",
            Self::PartialSuccess => "DS003",
            Self::InvalidInput => "DS004",
            Self::Interrupted => "DS130",
        }
    }

    /// Pick the exit code for an error that ended the run.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<FinderError>() {
            Some(FinderError::Interrupted) => Self::Interrupted,
            Some(FinderError::InvalidRoot { .. }) => Self::InvalidInput,
            None if err.downcast_ref::<ConfigError>().is_some() => Self::InvalidInput,
            None => Self::GeneralError,
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
