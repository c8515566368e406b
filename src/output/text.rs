//! Human-readable text output with colors.
//!
//! Colors come from `yansi` and are dropped globally with
//! `yansi::disable()` (the CLI does this for `--no-color`).

use std::io::{self, Write};
use std::path::Path;

use bytesize::ByteSize;
use yansi::Paint;

use super::display_relative;
use crate::actions::{RelocationReport, RelocationState, RestoreReport};
use crate::duplicates::{DuplicateGroup, ScanSummary};

/// Text renderer for a detection run, optionally with its relocation.
pub struct TextOutput<'a> {
    root: &'a Path,
    groups: &'a [DuplicateGroup<'a>],
    summary: &'a ScanSummary,
    relocation: Option<&'a RelocationReport>,
}

impl<'a> TextOutput<'a> {
    /// Create a renderer. Paths are shown relative to `root`.
    #[must_use]
    pub fn new(root: &'a Path, groups: &'a [DuplicateGroup<'a>], summary: &'a ScanSummary) -> Self {
        Self {
            root,
            groups,
            summary,
            relocation: None,
        }
    }

    /// Attach a relocation report (or dry-run plan).
    #[must_use]
    pub fn with_relocation(mut self, report: &'a RelocationReport) -> Self {
        self.relocation = Some(report);
        self
    }

    /// Write the full report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (i, group) in self.groups.iter().enumerate() {
            self.write_group(writer, i + 1, group)?;
        }
        if !self.groups.is_empty() {
            writeln!(writer)?;
        }

        self.write_summary(writer)?;

        if let Some(report) = self.relocation {
            writeln!(writer)?;
            write_relocation(writer, self.root, report)?;
        }
        Ok(())
    }

    fn write_group<W: Write>(
        &self,
        writer: &mut W,
        number: usize,
        group: &DuplicateGroup<'_>,
    ) -> io::Result<()> {
        let digest = group.fingerprint.digest_hex();
        writeln!(
            writer,
            "{} {} files, {} each ({})",
            format!("Group {number}:").bold(),
            group.len(),
            ByteSize(group.size()),
            digest.get(..12).unwrap_or(digest.as_str()).dim()
        )?;
        writeln!(
            writer,
            "  {} {}",
            "keep".green(),
            display_relative(&group.keeper.path, self.root)
        )?;
        for candidate in &group.candidates {
            writeln!(
                writer,
                "  {} {}",
                "dupe".yellow(),
                display_relative(&candidate.path, self.root)
            )?;
        }
        Ok(())
    }

    fn write_summary<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let s = self.summary;
        writeln!(
            writer,
            "Scanned {} files ({}) in {:.2}s, {} skipped",
            s.total_files,
            s.total_size_display(),
            s.scan_duration.as_secs_f64(),
            s.skipped_entries
        )?;
        writeln!(
            writer,
            "Hashed {} files ({}), {} ruled out by size",
            s.hashed_files,
            ByteSize(s.bytes_hashed),
            s.eliminated_by_size
        )?;
        if s.duplicate_groups == 0 {
            writeln!(writer, "{}", "No duplicates found.".green())?;
        } else {
            writeln!(
                writer,
                "{} duplicate groups, {} redundant files, {} reclaimable ({:.1}%)",
                s.duplicate_groups.bold(),
                s.duplicate_files.bold(),
                s.reclaimable_display().bold(),
                s.wasted_percentage()
            )?;
        }
        for error in &s.scan_errors {
            writeln!(writer, "{} {}", "warning:".yellow().bold(), error)?;
        }
        Ok(())
    }
}

/// Write a relocation report (or dry-run plan).
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_relocation<W: Write>(
    writer: &mut W,
    root: &Path,
    report: &RelocationReport,
) -> io::Result<()> {
    if report.dry_run {
        for record in &report.records {
            if record.state != RelocationState::Detected {
                continue;
            }
            if let Some(ref dest) = record.destination {
                writeln!(
                    writer,
                    "  {} {} -> {}",
                    "would move".cyan(),
                    display_relative(&record.source, root),
                    display_relative(dest, root)
                )?;
            }
        }
    }
    for failure in &report.failures {
        writeln!(writer, "{} {}", "error:".red().bold(), failure)?;
    }
    writeln!(writer, "{}", report.summary().bold())?;
    Ok(())
}

/// Write a restore report.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_restore<W: Write>(writer: &mut W, root: &Path, report: &RestoreReport) -> io::Result<()> {
    for record in &report.restored {
        if let Some(ref dest) = record.destination {
            writeln!(
                writer,
                "  {} {}",
                if report.dry_run {
                    "would restore".cyan()
                } else {
                    "restored".green()
                },
                display_relative(dest, root)
            )?;
        }
    }
    for conflict in &report.conflicts {
        writeln!(
            writer,
            "{} {} is occupied, left in quarantine",
            "conflict:".yellow().bold(),
            display_relative(conflict, root)
        )?;
    }
    for failure in &report.failures {
        writeln!(writer, "{} {}", "error:".red().bold(), failure)?;
    }
    writeln!(writer, "{}", report.summary().bold())?;
    Ok(())
}
