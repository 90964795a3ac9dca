//! Checksum cache.
//!
//! Computes a file's content checksum on first request and memoizes it on
//! the file's [`FileRecord`](crate::registry::FileRecord), so repeated
//! requests never touch the disk again.
//!
//! The scan worker also uses [`ChecksumCache::compute`] to hash files
//! without holding the catalogue lock and stores the result afterwards;
//! [`ChecksumCache::checksum_of`] then resolves from the record.
//!
//! # Failure
//!
//! An unreadable file yields [`EngineError::Hash`]. Callers on the scan
//! path translate that into "skip this file, continue".

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::EngineResult;
use crate::registry::{FileId, FileRegistry};
use crate::scanner::{Checksum, HashError, Hasher};

/// Hit/miss counters of a [`ChecksumCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from a stored checksum.
    pub hits: usize,
    /// Requests that had to read the file.
    pub misses: usize,
}

/// Memoizing front end to the [`Hasher`].
#[derive(Debug, Default)]
pub struct ChecksumCache {
    hasher: Hasher,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ChecksumCache {
    /// Create a cache around a hasher.
    #[must_use]
    pub fn new(hasher: Hasher) -> Self {
        Self {
            hasher,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// The underlying hasher.
    #[must_use]
    pub fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    /// Checksum of a registered file, computed and stored on first request.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`](crate::error::EngineError::FileNotFound)
    /// for an unknown id, [`EngineError::Hash`](crate::error::EngineError::Hash)
    /// if the file cannot be read.
    pub fn checksum_of(&self, registry: &mut FileRegistry, id: FileId) -> EngineResult<Checksum> {
        let record = registry.get(id)?;
        if let Some(checksum) = record.checksum {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(checksum);
        }

        let checksum = self.compute(&record.path())?;
        registry.set_checksum(id, checksum)?;
        Ok(checksum)
    }

    /// Hash a file without touching any registry.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be read.
    pub fn compute(&self, path: &Path) -> Result<Checksum, HashError> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        let checksum = self.hasher.full_hash(path)?;
        log::trace!("Checksum {} for {}", checksum, path.display());
        Ok(checksum)
    }

    /// Current hit/miss counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
