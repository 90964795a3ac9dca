//! Scan controller: a pausable background scan with typed queries and
//! change notifications.
//!
//! [`ScanController`] owns the file registry, checksum cache and duplicate
//! grouper. A single worker thread walks the configured folders and
//! classifies files one at a time; the owning thread issues commands
//! (`start`, `pause`, `rescan`, moved flags) and queries at any moment.
//! Each file's registration and classification is atomic with respect to
//! queries.

mod controller;
pub mod events;
pub mod state;
mod worker;

pub use controller::{ScanController, ScanStats};
pub use events::{ChannelObserver, Progress, ScanEvent, ScanObserver};
pub use state::{Command, ScanState};
