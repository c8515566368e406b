//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements
//! [`ProgressCallback`] to display progress bars on stderr while the finder
//! and the relocator run.
//!
//! Phases reported by the library:
//! - `walking`: spinner, total unknown
//! - `fingerprint`: bar over the files that share a size
//! - `relocate`: bar over the candidates

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress callback for long-running phases.
///
/// Implement this trait to receive progress updates during detection and
/// relocation. Callbacks may arrive from several hashing threads at once.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (`walking`, `fingerprint`, `relocate`, `restore`)
    /// * `total` - Total number of items to process, 0 if unknown
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
///
/// Only one phase runs at a time, so a single bar is kept.
pub struct Progress {
    bar: Mutex<Option<(String, ProgressBar)>>,
    hidden: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `hidden` - If true, nothing is drawn.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupestage::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(hidden: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            hidden,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<(String, ProgressBar)>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn label(phase: &str) -> &str {
        match phase {
            "walking" => "Walking directory",
            "fingerprint" => "Hashing",
            "relocate" => "Relocating",
            "restore" => "Restoring",
            other => other,
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.hidden {
            return;
        }

        let pb = if phase == "walking" || total == 0 {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(Self::bar_style());
            pb
        };
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.set_message(Self::label(phase).to_string());

        if let Some((_, previous)) = self.slot().replace((phase.to_string(), pb)) {
            previous.finish_and_clear();
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.hidden {
            return;
        }
        if let Some((phase, pb)) = self.slot().as_ref() {
            pb.set_position(current as u64);
            pb.set_message(format!("{}: {}", Self::label(phase), truncate_path(path, 30)));
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.hidden {
            return;
        }
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|(active, _)| active == phase) {
            if let Some((_, pb)) = slot.take() {
                pb.finish_with_message(format!("{} complete", Self::label(phase)));
            }
        }
    }

    fn on_message(&self, message: &str) {
        if self.hidden {
            return;
        }
        if let Some((_, pb)) = self.slot().as_ref() {
            pb.set_message(message.to_string());
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
