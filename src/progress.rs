//! Terminal progress display using indicatif.
//!
//! [`ScanProgress`] is a [`ScanObserver`] that renders engine notifications:
//! a spinner while files are being discovered, then a percentage bar while
//! they are processed.

use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::engine::{Progress, ScanObserver, ScanState};

/// Progress bar driven by scan notifications.
pub struct ScanProgress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl ScanProgress {
    /// Create a progress display.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, nothing is drawn.
    ///
    /// # Examples
    ///
    /// ```
    /// use dude::progress::ScanProgress;
    ///
    /// let progress = ScanProgress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn discovery_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn processing_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    /// Clear the bar from the terminal.
    pub fn clear(&self) {
        if let Some(bar) = self.bar.lock().unwrap_or_else(PoisonError::into_inner).take() {
            bar.finish_and_clear();
        }
    }
}

impl ScanObserver for ScanProgress {
    fn on_progress(&self, progress: Progress, status: &str) {
        if self.quiet {
            return;
        }

        let mut slot = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        match progress {
            Progress::Indeterminate => {
                let bar = slot.get_or_insert_with(|| {
                    let bar = ProgressBar::new_spinner();
                    bar.set_style(Self::discovery_style());
                    bar.enable_steady_tick(Duration::from_millis(100));
                    bar
                });
                bar.set_message(status.to_string());
            }
            Progress::Percent(percent) => {
                let bar = slot.get_or_insert_with(|| ProgressBar::new(100));
                if bar.length() != Some(100) {
                    bar.disable_steady_tick();
                    bar.set_length(100);
                    bar.set_style(Self::processing_style());
                }
                bar.set_position(u64::from(percent));
                bar.set_message(status.to_string());
            }
        }
    }

    fn on_state_changed(&self, state: ScanState) {
        if self.quiet {
            return;
        }
        let mut slot = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        match state {
            ScanState::Finished => {
                if let Some(bar) = slot.take() {
                    bar.finish_and_clear();
                }
            }
            ScanState::Paused => {
                if let Some(bar) = slot.as_ref() {
                    bar.set_message("Paused");
                }
            }
            ScanState::NotStarted | ScanState::Scanning => {}
        }
    }

    fn on_file_skipped(&self, path: &Path, reason: &str) {
        if self.quiet {
            return;
        }
        if let Some(bar) = self.bar.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            bar.println(format!("skipped {}: {}", truncate_path(path, 60), reason));
        }
    }
}

/// Truncate a path for display next to the progress bar.
fn truncate_path(path: &Path, max_len: usize) -> String {
    let full = path.display().to_string();
    if full.chars().count() <= max_len {
        return full;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let count = file_name.chars().count();
    if count + 4 > max_len {
        let tail: String = file_name.chars().skip(count + 3 - max_len).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
