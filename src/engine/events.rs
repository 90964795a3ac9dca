//! Notifications emitted by the scan worker.
//!
//! Consumers either implement [`ScanObserver`] and register it with
//! [`ScanController::add_observer`](super::ScanController::add_observer), or
//! call [`ScanController::subscribe`](super::ScanController::subscribe) and
//! drain [`ScanEvent`]s from a channel on their own schedule.
//!
//! Events from the worker arrive in processing order. Observers are called
//! on the emitting thread and must return quickly; they must not call back
//! into the controller.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use serde::Serialize;

use super::state::ScanState;
use crate::duplicates::GroupId;

/// Completion indicator of a progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Progress {
    /// The total is not known yet (files are still being discovered).
    Indeterminate,
    /// Percent of discovered files processed, 0 to 100.
    Percent(u8),
}

impl Progress {
    /// `processed / total` as a whole percentage, rounded down.
    ///
    /// An empty run counts as complete.
    #[must_use]
    pub fn of(processed: usize, total: usize) -> Self {
        if total == 0 {
            return Self::Percent(100);
        }
        let percent = (processed.min(total) as u128 * 100 / total as u128) as u8;
        Self::Percent(percent)
    }

    /// Integer form: `-1` when indeterminate, otherwise the percentage.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Indeterminate => -1,
            Self::Percent(percent) => i32::from(percent),
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indeterminate => f.write_str("..."),
            Self::Percent(percent) => write!(f, "{percent}%"),
        }
    }
}

/// One notification from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// Periodic progress with a human-readable status line.
    Progress {
        /// Completion indicator
        progress: Progress,
        /// Status text, e.g. `120 files found`
        status: String,
    },
    /// A group was created or its membership or moved flags changed.
    GroupUpdated(GroupId),
    /// The controller entered a new state.
    StateChanged(ScanState),
    /// A file or folder could not be read and was left out.
    FileSkipped {
        /// Offending path
        path: PathBuf,
        /// Why it was skipped
        reason: String,
    },
}

/// Receiver of engine notifications.
///
/// Only [`on_progress`](Self::on_progress) is required; the other hooks
/// default to doing nothing.
pub trait ScanObserver: Send + Sync {
    /// Progress update.
    fn on_progress(&self, progress: Progress, status: &str);

    /// A group changed; its members can be queried now.
    fn on_group_updated(&self, _group: GroupId) {}

    /// The scan state changed.
    fn on_state_changed(&self, _state: ScanState) {}

    /// A path was skipped because it could not be read.
    fn on_file_skipped(&self, _path: &Path, _reason: &str) {}
}

/// Deliver an event to the matching observer hook.
pub(crate) fn dispatch(observer: &dyn ScanObserver, event: &ScanEvent) {
    match event {
        ScanEvent::Progress { progress, status } => observer.on_progress(*progress, status),
        ScanEvent::GroupUpdated(group) => observer.on_group_updated(*group),
        ScanEvent::StateChanged(state) => observer.on_state_changed(*state),
        ScanEvent::FileSkipped { path, reason } => observer.on_file_skipped(path, reason),
    }
}

/// Observer that forwards every event into an mpsc channel.
#[derive(Debug)]
pub struct ChannelObserver {
    tx: Sender<ScanEvent>,
}

impl ChannelObserver {
    /// Create the observer and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, Receiver<ScanEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ScanEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

impl ScanObserver for ChannelObserver {
    fn on_progress(&self, progress: Progress, status: &str) {
        self.send(ScanEvent::Progress {
            progress,
            status: status.to_string(),
        });
    }

    fn on_group_updated(&self, group: GroupId) {
        self.send(ScanEvent::GroupUpdated(group));
    }

    fn on_state_changed(&self, state: ScanState) {
        self.send(ScanEvent::StateChanged(state));
    }

    fn on_file_skipped(&self, path: &Path, reason: &str) {
        self.send(ScanEvent::FileSkipped {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        });
    }
}
