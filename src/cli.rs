//! Command-line interface definitions for dupestage.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, color, config file) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates without touching anything
//! dupestage scan ~/Downloads
//!
//! # Move duplicates into ~/Downloads/to_delete
//! dupestage quarantine ~/Downloads
//!
//! # JSON report for scripting
//! dupestage scan ~/Downloads --output json
//!
//! # Put everything back
//! dupestage restore ~/Downloads
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;

/// Find duplicate files and stage them for deletion.
///
/// dupestage groups files by size, confirms duplicates with BLAKE3 content
/// hashes, keeps one file per group and moves the rest into a quarantine
/// directory under the scanned root. Nothing is ever deleted.
#[derive(Debug, Parser)]
#[command(name = "dupestage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (TOML)
    ///
    /// If not specified, `config.toml` in the platform config directory is
    /// used when present.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for dupestage.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report duplicates and the relocation plan without moving anything
    Scan(DetectArgs),
    /// Move duplicate candidates into the quarantine directory
    Quarantine(QuarantineArgs),
    /// Move quarantined files back to their original locations
    Restore(RestoreArgs),
}

/// Detection options shared by `scan` and `quarantine`.
#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Root directory to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Quarantine directory, relative to PATH (default: to_delete)
    #[arg(long, value_name = "NAME")]
    pub quarantine_dir: Option<PathBuf>,

    /// Number of I/O threads for hashing (default: 4)
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Gitignore-style patterns to ignore (can be specified multiple times)
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Treat empty files as duplicates of each other
    #[arg(long)]
    pub include_empty: bool,

    /// Minimum file size to consider (e.g., 1KB, 1MB, 1GB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl DetectArgs {
    /// Apply the flags that were given on top of a loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ref dir) = self.quarantine_dir {
            config.quarantine_dir = dir.clone();
        }
        if let Some(threads) = self.io_threads {
            config.io_threads = threads;
        }
        if !self.ignore_patterns.is_empty() {
            config
                .ignore_patterns
                .extend(self.ignore_patterns.iter().cloned());
        }
        if self.skip_hidden {
            config.skip_hidden = true;
        }
        if self.include_empty {
            config.include_empty = true;
        }
        if self.min_size.is_some() {
            config.min_size = self.min_size;
        }
    }
}

/// Arguments for the quarantine subcommand.
#[derive(Debug, Args)]
pub struct QuarantineArgs {
    #[command(flatten)]
    pub detect: DetectArgs,

    /// Always copy, verify and delete the source instead of renaming
    #[arg(long = "copy")]
    pub force_copy: bool,
}

impl QuarantineArgs {
    /// Apply the flags that were given on top of a loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        self.detect.apply_to(config);
        if self.force_copy {
            config.force_copy = true;
        }
    }
}

/// Arguments for the restore subcommand.
#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Root directory whose quarantine should be restored
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Quarantine directory, relative to PATH (default: to_delete)
    #[arg(long, value_name = "NAME")]
    pub quarantine_dir: Option<PathBuf>,

    /// List what would be restored without moving anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl RestoreArgs {
    /// Apply the flags that were given on top of a loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ref dir) = self.quarantine_dir {
            config.quarantine_dir = dir.clone();
        }
    }
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored text
    Text,
    /// JSON output for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use dupestage::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    // Find where the number ends and the suffix begins
    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    if num < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
