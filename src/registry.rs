//! File registry: the flat store of every file discovered during a run.
//!
//! Each file gets a [`FileId`] at registration time. Ids start at 0, grow
//! monotonically and are never reused within a run; every other component
//! refers to files by id only. The registry owns the mutable per-file state
//! (lazily computed checksum and moved flag) and contains no duplicate
//! detection logic.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::scanner::{normalize_name, Checksum};

/// Stable index of a registered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FileId(pub usize);

impl FileId {
    /// The raw index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which configured folder a file was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOrigin {
    /// The root folder being scanned.
    #[default]
    Root,
    /// The known-duplicates (reference) folder.
    KnownDuplicates,
}

/// Everything the engine knows about one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Registry index.
    pub id: FileId,
    /// Folder containing the file.
    pub folder: PathBuf,
    /// File name exactly as stored on disk.
    #[serde(skip)]
    pub file_name: OsString,
    /// Display form of the name: lossy UTF-8, NFC-normalized.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Content checksum, absent until computed.
    pub checksum: Option<Checksum>,
    /// Operator intent to relocate this copy.
    pub moved: bool,
    /// Folder the file was discovered under.
    pub origin: FileOrigin,
}

impl FileRecord {
    /// Full on-disk path of the file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.file_name)
    }
}

/// Append-only store of [`FileRecord`]s indexed by [`FileId`].
#[derive(Debug, Default, Clone)]
pub struct FileRegistry {
    records: Vec<FileRecord>,
}

impl FileRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id. Always succeeds.
    ///
    /// `file_name` is kept byte for byte so the file can be reopened; the
    /// display name is derived from it.
    pub fn register(
        &mut self,
        folder: impl Into<PathBuf>,
        file_name: impl Into<OsString>,
        size: u64,
        origin: FileOrigin,
    ) -> FileId {
        let id = FileId(self.records.len());
        let file_name = file_name.into();
        let name = normalize_name(&file_name.to_string_lossy());
        self.records.push(FileRecord {
            id,
            folder: folder.into(),
            file_name,
            name,
            size,
            checksum: None,
            moved: false,
            origin,
        });
        log::trace!("Registered {} as {}", self.records[id.0].path().display(), id);
        id
    }

    /// Look up a record.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] if the id was never issued.
    pub fn get(&self, id: FileId) -> EngineResult<&FileRecord> {
        self.records.get(id.0).ok_or(EngineError::FileNotFound(id))
    }

    fn get_mut(&mut self, id: FileId) -> EngineResult<&mut FileRecord> {
        self.records
            .get_mut(id.0)
            .ok_or(EngineError::FileNotFound(id))
    }

    /// Store a computed checksum.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] if the id was never issued.
    pub fn set_checksum(&mut self, id: FileId, checksum: Checksum) -> EngineResult<()> {
        self.get_mut(id)?.checksum = Some(checksum);
        Ok(())
    }

    /// Set the moved flag.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] if the id was never issued.
    pub fn set_moved(&mut self, id: FileId, moved: bool) -> EngineResult<()> {
        self.get_mut(id)?.moved = moved;
        Ok(())
    }

    /// Read the moved flag.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] if the id was never issued.
    pub fn is_moved(&self, id: FileId) -> EngineResult<bool> {
        self.get(id).map(|record| record.moved)
    }

    /// Number of registered files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter()
    }

    /// Ids of every file whose folder equals `folder`, ascending.
    pub fn in_folder<'a>(&'a self, folder: &'a Path) -> impl Iterator<Item = FileId> + 'a {
        self.records
            .iter()
            .filter(move |record| record.folder == folder)
            .map(|record| record.id)
    }

    /// Drop every record. Ids restart at 0.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
