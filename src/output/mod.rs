//! Reports of a finished or paused scan.
//!
//! [`ScanReport::collect`] takes a consistent snapshot of a controller's
//! groups; the formatters render it:
//! - [`json`] for automation and scripting
//! - [`csv`] for spreadsheet import (one row per file)
//! - [`text`] for humans
//!
//! # Example
//!
//! ```no_run
//! use dude::config::ProjectSettings;
//! use dude::duplicates::GroupFilter;
//! use dude::engine::ScanController;
//! use dude::error::ExitCode;
//! use dude::output::{json::JsonOutput, ScanReport};
//!
//! let controller = ScanController::new(ProjectSettings::new(".").validate().unwrap());
//! controller.start().unwrap();
//! controller.wait();
//!
//! let report = ScanReport::collect(&controller, GroupFilter::Duplicates).unwrap();
//! let output = JsonOutput::new(&report, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod text;

use std::path::PathBuf;

use serde::Serialize;

use crate::duplicates::{GroupFilter, GroupSummary};
use crate::engine::{ScanController, ScanStats};
use crate::error::EngineResult;
use crate::moves;
use crate::registry::{FileId, FileOrigin};

pub use self::csv::CsvOutput;
pub use self::json::JsonOutput;
pub use self::text::TextOutput;

/// One file inside a reported group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportFile {
    /// File id
    pub id: FileId,
    /// Full path
    pub path: PathBuf,
    /// Folder the file was discovered under
    pub origin: FileOrigin,
    /// Moved flag
    pub moved: bool,
    /// Destination inside the known-duplicates folder, if one is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relocation_target: Option<PathBuf>,
}

/// One reported group with its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportGroup {
    /// Group summary
    #[serde(flatten)]
    pub summary: GroupSummary,
    /// Members, ascending by id
    pub files: Vec<ReportFile>,
}

/// Snapshot of a scan for output.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Scanned root
    pub root: PathBuf,
    /// Known-duplicates folder, if any
    pub duplicates_folder: Option<PathBuf>,
    /// Filter the groups were selected with
    pub filter: GroupFilter,
    /// Run counters
    pub stats: ScanStats,
    /// Selected groups, ascending by index
    pub groups: Vec<ReportGroup>,
}

impl ScanReport {
    /// Snapshot the groups of `controller` passing `filter`.
    ///
    /// # Errors
    ///
    /// Fails only if the catalogue is internally inconsistent.
    pub fn collect(controller: &ScanController, filter: GroupFilter) -> EngineResult<Self> {
        let settings = controller.settings();
        let stats = controller.stats();
        let groups = controller.inspect(|registry, grouper| {
            let mut groups = Vec::new();
            for summary in crate::duplicates::summaries(registry, grouper, filter)? {
                let mut files = Vec::new();
                for id in grouper.members_of(summary.group)? {
                    let record = registry.get(id)?;
                    files.push(ReportFile {
                        id,
                        path: record.path(),
                        origin: record.origin,
                        moved: record.moved,
                        relocation_target: moves::relocation_target(settings, record),
                    });
                }
                groups.push(ReportGroup { summary, files });
            }
            EngineResult::Ok(groups)
        })?;

        Ok(Self {
            root: settings.root.clone(),
            duplicates_folder: settings.duplicates_folder.clone(),
            filter,
            stats,
            groups,
        })
    }

    /// True if no group passed the filter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
