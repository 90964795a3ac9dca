//! Scan lifecycle states and the commands that move between them.

use std::fmt;

use serde::Serialize;

/// Lifecycle of a [`ScanController`](super::ScanController).
///
/// ```text
/// NotStarted --start--> Scanning --pause--> Paused --start--> Scanning
/// Scanning --(traversal exhausted)--> Finished --rescan--> Scanning
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// Constructed, nothing walked yet.
    #[default]
    NotStarted,
    /// The worker is discovering or processing files.
    Scanning,
    /// The worker is parked between two files.
    Paused,
    /// Every discovered file has been processed.
    Finished,
}

impl ScanState {
    /// True while the worker is running.
    #[must_use]
    pub fn is_scanning(self) -> bool {
        self == Self::Scanning
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not started",
            Self::Scanning => "scanning",
            Self::Paused => "paused",
            Self::Finished => "finished",
        })
    }
}

/// Operator commands that change the scan state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Begin a scan, or resume a paused one.
    Start,
    /// Park the worker at the next file boundary.
    Pause,
    /// Discard all results and scan again.
    Rescan,
}

impl Command {
    /// State reached by issuing this command in `from`, or `None` if the
    /// command is not legal there.
    #[must_use]
    pub fn target(self, from: ScanState) -> Option<ScanState> {
        match (self, from) {
            (Self::Start, ScanState::NotStarted | ScanState::Paused) => Some(ScanState::Scanning),
            (Self::Pause, ScanState::Scanning) => Some(ScanState::Paused),
            (Self::Rescan, ScanState::Finished) => Some(ScanState::Scanning),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Rescan => "rescan",
        })
    }
}
