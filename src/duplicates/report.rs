//! Read-only views over the grouping: per-group summaries, view filters and
//! the folder comparison table.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use super::groups::{DuplicateGrouper, Group, GroupId};
use crate::error::EngineResult;
use crate::registry::{FileId, FileRegistry};
use crate::scanner::Checksum;

/// Presentation-ready facts about one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    /// Group index
    pub group: GroupId,
    /// Size shared by every member
    pub size: u64,
    /// Shared checksum (absent for a never-compared singleton)
    pub checksum: Option<Checksum>,
    /// Number of members
    pub file_count: usize,
    /// Members flagged as moved
    pub moved_count: usize,
    /// Members not flagged as moved
    pub remaining_count: usize,
    /// Lowest member id
    pub first_file: FileId,
    /// Sorted, de-duplicated member file names
    pub names: Vec<String>,
}

impl GroupSummary {
    /// Summarize a group against the registry's current moved flags.
    ///
    /// # Errors
    ///
    /// Fails if a member id is unknown to the registry, which means the two
    /// structures are out of sync.
    pub fn of(group: &Group, registry: &FileRegistry) -> EngineResult<Self> {
        let mut names = BTreeSet::new();
        let mut moved_count = 0;
        for id in group.members() {
            let record = registry.get(id)?;
            names.insert(record.name.clone());
            if record.moved {
                moved_count += 1;
            }
        }

        Ok(Self {
            group: group.id,
            size: group.size,
            checksum: group.checksum,
            file_count: group.len(),
            moved_count,
            remaining_count: group.len() - moved_count,
            first_file: group.first(),
            names: names.into_iter().collect(),
        })
    }

    /// Comma-joined member names, e.g. `a.jpg,b.jpg`.
    #[must_use]
    pub fn label(&self) -> String {
        self.names.join(",")
    }

    /// Status line in the form `3 (2 left, 1 moved)`.
    #[must_use]
    pub fn status(&self) -> String {
        format!(
            "{} ({} left, {} moved)",
            self.file_count, self.remaining_count, self.moved_count
        )
    }
}

/// Which groups a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupFilter {
    /// Every group, singletons included.
    All,
    /// Groups with at least two members.
    #[default]
    Duplicates,
    /// Duplicate groups where at least two copies are still unmoved.
    Unresolved,
}

impl GroupFilter {
    /// Whether a summary passes the filter.
    #[must_use]
    pub fn matches(self, summary: &GroupSummary) -> bool {
        match self {
            Self::All => true,
            Self::Duplicates => summary.file_count > 1,
            Self::Unresolved => summary.file_count > 1 && summary.remaining_count > 1,
        }
    }
}

impl fmt::Display for GroupFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Duplicates => "duplicates",
            Self::Unresolved => "unresolved",
        })
    }
}

impl FromStr for GroupFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "duplicates" => Ok(Self::Duplicates),
            "unresolved" => Ok(Self::Unresolved),
            other => Err(format!("unknown group filter '{other}'")),
        }
    }
}

/// Summaries of every group passing `filter`, ascending by group index.
///
/// # Errors
///
/// Fails only if registry and grouper are out of sync.
pub fn summaries(
    registry: &FileRegistry,
    grouper: &DuplicateGrouper,
    filter: GroupFilter,
) -> EngineResult<Vec<GroupSummary>> {
    let mut out = Vec::new();
    for group in grouper.groups() {
        let summary = GroupSummary::of(group, registry)?;
        if filter.matches(&summary) {
            out.push(summary);
        }
    }
    Ok(out)
}

/// Every registered file sharing a folder with any of `files`, ascending.
///
/// # Errors
///
/// [`EngineError::FileNotFound`](crate::error::EngineError::FileNotFound)
/// if one of `files` is unknown.
pub fn folder_files(registry: &FileRegistry, files: &[FileId]) -> EngineResult<Vec<FileId>> {
    let mut folders = HashSet::new();
    for &id in files {
        folders.insert(registry.get(id)?.folder.clone());
    }
    let mut ids: Vec<FileId> = folders
        .iter()
        .flat_map(|folder| registry.in_folder(folder))
        .collect();
    ids.sort_unstable();
    Ok(ids)
}

/// One cell of a [`FolderTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderCell {
    /// The file shown in this cell
    pub file: FileId,
    /// Its file name
    pub name: String,
    /// Its moved flag
    pub moved: bool,
}

/// One duplicate group laid out across the table's folder columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderRow {
    /// The group this row shows
    pub group: GroupId,
    /// Group checksum, used as the row header
    pub checksum: Option<Checksum>,
    /// One slot per column; `None` where the group has no file
    pub cells: Vec<Option<FolderCell>>,
}

/// Side-by-side comparison of the folders holding a set of files.
///
/// Rows are the duplicate groups touching any file in those folders, in
/// ascending group order. Columns are folders in the order first seen while
/// filling rows. A member goes in its folder's first column; if that cell is
/// taken in the row, a new column is appended for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderTable {
    /// Column headers; a folder may repeat
    pub columns: Vec<PathBuf>,
    /// Table rows
    pub rows: Vec<FolderRow>,
}

impl FolderTable {
    /// Build the table for the folders containing `files`.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`](crate::error::EngineError::FileNotFound)
    /// if one of `files` is unknown.
    pub fn build(
        registry: &FileRegistry,
        grouper: &DuplicateGrouper,
        files: &[FileId],
    ) -> EngineResult<Self> {
        let neighbours = folder_files(registry, files)?;
        let mut table = Self::default();

        for gid in grouper.groups_touching(neighbours) {
            let group = grouper.group(gid)?;
            if !group.is_duplicate() {
                continue;
            }

            let mut cells: Vec<Option<FolderCell>> = vec![None; table.columns.len()];
            for id in group.members() {
                let record = registry.get(id)?;
                // Only the folder's first column is reused; a taken cell opens a new one.
                let first = table.columns.iter().position(|folder| *folder == record.folder);
                let col = match first {
                    Some(col) if cells[col].is_none() => col,
                    _ => {
                        table.columns.push(record.folder.clone());
                        cells.push(None);
                        table.columns.len() - 1
                    }
                };
                cells[col] = Some(FolderCell {
                    file: id,
                    name: record.name.clone(),
                    moved: record.moved,
                });
            }

            table.rows.push(FolderRow {
                group: gid,
                checksum: group.checksum,
                cells,
            });
        }

        let width = table.columns.len();
        for row in &mut table.rows {
            row.cells.resize(width, None);
        }
        Ok(table)
    }

    /// True when no duplicate group touches the folders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
