//! Duplicate detection.
//!
//! This module provides:
//! - Size-first, checksum-second grouping with stable group indices ([`groups`])
//! - Group summaries, view filters and the folder comparison table ([`report`])

pub mod groups;
pub mod report;

pub use groups::{Classification, DuplicateGrouper, Group, GroupId, GroupingStats};
pub use report::{
    folder_files, summaries, FolderCell, FolderRow, FolderTable, GroupFilter, GroupSummary,
};
