//! Move-state tracking.
//!
//! The engine only records which copies the operator intends to relocate;
//! acting on that intent belongs to whoever consumes the flags.

use std::path::PathBuf;

use crate::config::ProjectSettings;
use crate::error::EngineResult;
use crate::registry::{FileId, FileOrigin, FileRecord, FileRegistry};

/// Per-file "moved" flag.
pub trait MoveTracker {
    /// Set the flag.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`](crate::error::EngineError::FileNotFound)
    /// for an unknown id.
    fn set_moved(&mut self, id: FileId, moved: bool) -> EngineResult<()>;

    /// Read the flag.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`](crate::error::EngineError::FileNotFound)
    /// for an unknown id.
    fn is_moved(&self, id: FileId) -> EngineResult<bool>;

    /// Flip the flag and return its new value.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`](crate::error::EngineError::FileNotFound)
    /// for an unknown id.
    fn toggle(&mut self, id: FileId) -> EngineResult<bool> {
        let moved = !self.is_moved(id)?;
        self.set_moved(id, moved)?;
        Ok(moved)
    }
}

impl MoveTracker for FileRegistry {
    fn set_moved(&mut self, id: FileId, moved: bool) -> EngineResult<()> {
        FileRegistry::set_moved(self, id, moved)?;
        log::debug!("{} moved = {}", id, moved);
        Ok(())
    }

    fn is_moved(&self, id: FileId) -> EngineResult<bool> {
        FileRegistry::is_moved(self, id)
    }
}

/// Where a root file would land inside the known-duplicates folder.
///
/// The path relative to the root is preserved. Returns `None` when no
/// duplicates folder is configured, when the file already lives in it, or
/// when the file is not under the root.
#[must_use]
pub fn relocation_target(settings: &ProjectSettings, record: &FileRecord) -> Option<PathBuf> {
    if record.origin == FileOrigin::KnownDuplicates {
        return None;
    }
    let target = settings.duplicates_folder.as_ref()?;
    let relative = record.folder.strip_prefix(&settings.root).ok()?;
    Some(target.join(relative).join(&record.file_name))
}
