//! dupestage - duplicate detection and quarantine staging
//!
//! Walks a directory tree, confirms duplicate files by size and BLAKE3
//! content hash, keeps one file per group and moves the rest into a
//! quarantine directory under the root, mirroring their relative paths.
//! Nothing is ever deleted.
//!
//! The pipeline stages are public and can be used on their own:
//!
//! 1. [`scanner::Walker::walk`]: deterministic, symlink-free traversal
//! 2. [`duplicates::group_by_size`]: size-first pruning
//! 3. [`duplicates::fingerprint_size_groups`]: parallel full-content hashing
//! 4. [`duplicates::DuplicateIndex::build`]: partition into classes
//! 5. [`duplicates::resolve_all`]: keeper selection
//! 6. [`actions::Relocator::relocate_groups`]: verified relocation
//!
//! [`duplicates::DuplicateFinder`] runs steps 1 to 5.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::actions::{RelocationReport, Relocator, RestoreReport};
use crate::cli::{Cli, Commands, DetectArgs, OutputFormat, RestoreArgs};
use crate::config::Config;
use crate::duplicates::{Detection, DuplicateFinder, FinderError};
use crate::error::ExitCode;
use crate::output::{text, JsonReport, TextOutput};
use crate::progress::{Progress, ProgressCallback};
use crate::signal::ShutdownHandler;

/// Run the application for parsed CLI arguments.
///
/// Recoverable per-file problems are reported and reflected in the exit
/// code. Errors are returned only for an invalid root or configuration, an
/// interruption during detection, or a failure to write the report.
///
/// # Errors
///
/// Returns an error that [`ExitCode::for_error`] maps to an exit code.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let handler = signal::install_handler()?;
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    log::debug!("Loaded configuration: {:?}", config);

    match cli.command {
        Commands::Scan(args) => {
            args.apply_to(&mut config);
            config.validate().context("validating configuration")?;
            run_detect(&args, &config, &handler, cli.quiet, false)
        }
        Commands::Quarantine(args) => {
            args.apply_to(&mut config);
            config.validate().context("validating configuration")?;
            run_detect(&args.detect, &config, &handler, cli.quiet, true)
        }
        Commands::Restore(args) => {
            args.apply_to(&mut config);
            config.validate().context("validating configuration")?;
            run_restore(&args, &config, &handler, cli.quiet)
        }
    }
}

/// Detect duplicates, then relocate them or plan the relocation.
fn run_detect(
    args: &DetectArgs,
    config: &Config,
    handler: &ShutdownHandler,
    quiet: bool,
    relocate: bool,
) -> anyhow::Result<ExitCode> {
    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(args.no_progress || quiet));

    let finder = DuplicateFinder::new(
        config
            .finder_config()
            .with_shutdown_flag(handler.get_flag())
            .with_progress_callback(Arc::clone(&progress)),
    );
    let detection = finder.find_duplicates(&args.path)?;
    let groups = detection.groups();

    let relocator = Relocator::new(
        detection.root(),
        config
            .relocate_config()
            .with_dry_run(!relocate)
            .with_shutdown_flag(handler.get_flag())
            .with_progress_callback(progress),
    );
    let report = relocator.relocate_groups(&groups);
    let exit_code = detection_exit_code(&detection, &report);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => {
            TextOutput::new(detection.root(), &groups, detection.summary())
                .with_relocation(&report)
                .write_to(&mut out)?;
        }
        OutputFormat::Json => {
            JsonReport::detection(&detection, &groups, exit_code)
                .with_relocation(&report)
                .write_to(&mut out, true)?;
        }
    }
    out.flush()?;

    Ok(exit_code)
}

/// Move quarantined files back under the root.
fn run_restore(
    args: &RestoreArgs,
    config: &Config,
    handler: &ShutdownHandler,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    let root = canonical_root(&args.path)?;
    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(args.no_progress || quiet));
    let relocator = Relocator::new(
        &root,
        config
            .relocate_config()
            .with_dry_run(args.dry_run)
            .with_shutdown_flag(handler.get_flag())
            .with_progress_callback(progress),
    );
    let report = relocator.restore();
    let exit_code = restore_exit_code(&report);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => text::write_restore(&mut out, &root, &report)?,
        OutputFormat::Json => {
            JsonReport::restore(&root, relocator.quarantine_root(), &report, exit_code)
                .write_to(&mut out, true)?;
        }
    }
    out.flush()?;

    Ok(exit_code)
}

fn canonical_root(path: &Path) -> Result<std::path::PathBuf, FinderError> {
    let invalid = |reason: String| FinderError::InvalidRoot {
        path: path.to_path_buf(),
        reason,
    };
    let root = path.canonicalize().map_err(|e| invalid(e.to_string()))?;
    if !root.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }
    Ok(root)
}

/// Exit code for a detection run. Interruption wins over per-file errors,
/// which win over an empty result.
#[must_use]
pub fn detection_exit_code(detection: &Detection, report: &RelocationReport) -> ExitCode {
    if report.interrupted {
        ExitCode::Interrupted
    } else if !detection.summary().scan_errors.is_empty() || !report.failures.is_empty() {
        ExitCode::PartialSuccess
    } else if !detection.has_duplicates() {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    }
}

/// Exit code for a restore run.
#[must_use]
pub fn restore_exit_code(report: &RestoreReport) -> ExitCode {
    if report.interrupted {
        ExitCode::Interrupted
    } else if !report.failures.is_empty() || !report.conflicts.is_empty() {
        ExitCode::PartialSuccess
    } else if report.restored.is_empty() {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    }
}
