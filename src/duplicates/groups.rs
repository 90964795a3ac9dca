//! Duplicate grouping keyed by (size, checksum).
//!
//! # Overview
//!
//! [`DuplicateGrouper`] classifies registered files one at a time. Sizes are
//! compared first; a file whose size has not been seen yet becomes a
//! singleton group without its content ever being read. Only when a second
//! file of the same size shows up are checksums computed: the earlier
//! singleton is *promoted* to a checksum-keyed group in place, keeping its
//! [`GroupId`], and the new file either joins it or opens a group of its own.
//!
//! Group ids are handed out in classification order and never reordered,
//! compacted or reused during a run. Membership only grows. Member listings
//! are ascending by [`FileId`].
//!
//! With content verification enabled, a checksum match is confirmed byte
//! for byte against the group's first member; a mismatch (a digest
//! collision) opens a separate group for the same key.
//!
//! # Example
//!
//! ```no_run
//! use dude::cache::ChecksumCache;
//! use dude::duplicates::DuplicateGrouper;
//! use dude::registry::{FileOrigin, FileRegistry};
//!
//! let mut registry = FileRegistry::new();
//! let cache = ChecksumCache::default();
//! let mut grouper = DuplicateGrouper::new();
//!
//! let a = registry.register("/photos", "a.jpg", 1024, FileOrigin::Root);
//! let b = registry.register("/photos", "b.jpg", 1024, FileOrigin::Root);
//! grouper.classify(&mut registry, &cache, a).unwrap();
//! let placed = grouper.classify(&mut registry, &cache, b).unwrap();
//!
//! println!("{} now has {} members", placed.group, placed.member_count);
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::cache::ChecksumCache;
use crate::error::{EngineError, EngineResult};
use crate::registry::{FileId, FileRegistry};
use crate::scanner::Checksum;

/// Stable index of a group within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupId(pub usize);

impl GroupId {
    /// The raw index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.0)
    }
}

/// A set of files sharing size and checksum.
///
/// A singleton whose size is still unique has no checksum yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// Group index.
    pub id: GroupId,
    /// Size in bytes shared by every member.
    pub size: u64,
    /// Checksum shared by every member, absent before promotion.
    pub checksum: Option<Checksum>,
    members: BTreeSet<FileId>,
}

impl Group {
    fn new(id: GroupId, size: u64, checksum: Option<Checksum>, first: FileId) -> Self {
        Self {
            id,
            size,
            checksum,
            members: BTreeSet::from([first]),
        }
    }

    /// Members in ascending id order.
    pub fn members(&self) -> impl Iterator<Item = FileId> + '_ {
        self.members.iter().copied()
    }

    /// Lowest member id. Groups are never empty.
    #[must_use]
    pub fn first(&self) -> FileId {
        self.members.first().copied().unwrap_or(FileId(0))
    }

    /// Whether `id` is a member.
    #[must_use]
    pub fn contains(&self, id: FileId) -> bool {
        self.members.contains(&id)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// True for groups with two or more members.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.members.len() > 1
    }

    /// Space held by all copies but one.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * (self.members.len() as u64).saturating_sub(1)
    }
}

/// Outcome of classifying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Group the file belongs to.
    pub group: GroupId,
    /// The group was created by this classification.
    pub created: bool,
    /// Membership changed (false only when the file was already classified).
    pub changed: bool,
    /// Member count after classification.
    pub member_count: usize,
    /// Earlier files found unreadable while comparing against this one.
    pub unreadable: Vec<FileId>,
}

/// Aggregate numbers over the current grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupingStats {
    /// Files placed in a group
    pub classified_files: usize,
    /// Number of groups, singletons included
    pub groups: usize,
    /// Number of groups with 2+ members
    pub duplicate_groups: usize,
    /// Files that belong to a duplicate group
    pub duplicate_files: usize,
    /// Bytes held by all copies but one, summed over duplicate groups
    pub wasted_space: u64,
    /// Distinct sizes seen
    pub unique_sizes: usize,
    /// Files whose deferred checksum could not be computed
    pub unreadable_files: usize,
}

/// Partitions registered files into (size, checksum) groups.
#[derive(Debug, Default, Clone)]
pub struct DuplicateGrouper {
    groups: Vec<Group>,
    by_size: HashMap<u64, Vec<GroupId>>,
    file_groups: HashMap<FileId, GroupId>,
    unreadable: HashSet<FileId>,
    verify_content: bool,
}

impl DuplicateGrouper {
    /// Create an empty grouper that trusts checksum equality.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirm checksum matches with a byte comparison before grouping.
    #[must_use]
    pub fn with_verify_content(mut self, verify: bool) -> Self {
        self.verify_content = verify;
        self
    }

    /// True if a file of `size` will need its checksum to be classified.
    #[must_use]
    pub fn needs_checksum(&self, size: u64) -> bool {
        self.by_size.get(&size).is_some_and(|ids| !ids.is_empty())
    }

    /// Earlier files of `size` whose checksum has not been computed yet.
    ///
    /// These are the first members of still-unpromoted singleton groups.
    /// Files already known to be unreadable are left out.
    #[must_use]
    pub fn pending_checksums(&self, registry: &FileRegistry, size: u64) -> Vec<FileId> {
        self.by_size
            .get(&size)
            .into_iter()
            .flatten()
            .map(|gid| &self.groups[gid.0])
            .filter(|group| group.checksum.is_none())
            .map(Group::first)
            .filter(|id| !self.unreadable.contains(id))
            .filter(|id| registry.get(*id).is_ok_and(|r| r.checksum.is_none()))
            .collect()
    }

    /// Record that a file's content could not be read; it will never be
    /// matched against again.
    pub fn mark_unreadable(&mut self, id: FileId) {
        self.unreadable.insert(id);
    }

    /// Place a registered file into its group.
    ///
    /// Classifying the same file twice returns its existing group with
    /// `changed == false`.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] for an unknown id, or
    /// [`EngineError::Hash`] if the file itself must be hashed and cannot be
    /// read. In the latter case nothing is modified.
    pub fn classify(
        &mut self,
        registry: &mut FileRegistry,
        cache: &ChecksumCache,
        id: FileId,
    ) -> EngineResult<Classification> {
        let record = registry.get(id)?;
        if let Some(&group) = self.file_groups.get(&id) {
            return Ok(Classification {
                group,
                created: false,
                changed: false,
                member_count: self.groups[group.0].len(),
                unreadable: Vec::new(),
            });
        }

        let size = record.size;
        let candidates = self.by_size.get(&size).cloned().unwrap_or_default();
        if candidates.is_empty() {
            // Unique size so far: no need to read the content.
            let checksum = record.checksum;
            return Ok(self.create_group(size, checksum, id));
        }

        let checksum = cache.checksum_of(registry, id)?;
        let mut unreadable = Vec::new();
        for gid in candidates {
            let group_checksum = match self.groups[gid.0].checksum {
                Some(existing) => existing,
                None => match self.promote(registry, cache, gid, &mut unreadable) {
                    Some(promoted) => promoted,
                    None => continue,
                },
            };
            if group_checksum != checksum {
                continue;
            }
            if self.verify_content && !self.confirm(registry, cache, gid, id) {
                log::warn!(
                    "Checksum collision: {} matches {} by digest but not by content",
                    id,
                    gid
                );
                continue;
            }

            let group = &mut self.groups[gid.0];
            group.members.insert(id);
            self.file_groups.insert(id, gid);
            log::trace!("{} joined {} ({} members)", id, gid, group.len());
            return Ok(Classification {
                group: gid,
                created: false,
                changed: true,
                member_count: group.len(),
                unreadable,
            });
        }

        let mut placed = self.create_group(size, Some(checksum), id);
        placed.unreadable = unreadable;
        Ok(placed)
    }

    fn create_group(&mut self, size: u64, checksum: Option<Checksum>, id: FileId) -> Classification {
        let gid = GroupId(self.groups.len());
        self.groups.push(Group::new(gid, size, checksum, id));
        self.by_size.entry(size).or_default().push(gid);
        self.file_groups.insert(id, gid);
        log::trace!("{} created for {} ({} bytes)", gid, id, size);
        Classification {
            group: gid,
            created: true,
            changed: true,
            member_count: 1,
            unreadable: Vec::new(),
        }
    }

    /// Turn a size-only singleton into a checksum-keyed group.
    fn promote(
        &mut self,
        registry: &mut FileRegistry,
        cache: &ChecksumCache,
        gid: GroupId,
        unreadable: &mut Vec<FileId>,
    ) -> Option<Checksum> {
        let first = self.groups[gid.0].first();
        if self.unreadable.contains(&first) {
            return None;
        }
        match cache.checksum_of(registry, first) {
            Ok(checksum) => {
                self.groups[gid.0].checksum = Some(checksum);
                log::debug!("Promoted {} to checksum {}", gid, checksum);
                Some(checksum)
            }
            Err(e) => {
                log::warn!("Cannot checksum {} for comparison: {}", first, e);
                self.unreadable.insert(first);
                unreadable.push(first);
                None
            }
        }
    }

    /// Key a size-only singleton by the checksum of its first member,
    /// computed elsewhere. Returns the group if it changed.
    pub fn fill_checksum(&mut self, id: FileId, checksum: Checksum) -> Option<GroupId> {
        let gid = self.group_of(id)?;
        let group = &mut self.groups[gid.0];
        if group.checksum.is_some() || group.first() != id {
            return None;
        }
        group.checksum = Some(checksum);
        Some(gid)
    }

    /// Byte comparison of `id` against the first member of `gid`.
    fn confirm(
        &self,
        registry: &FileRegistry,
        cache: &ChecksumCache,
        gid: GroupId,
        id: FileId,
    ) -> bool {
        let first = self.groups[gid.0].first();
        let (Ok(a), Ok(b)) = (registry.get(first), registry.get(id)) else {
            return false;
        };
        match cache.hasher().contents_equal(&a.path(), &b.path()) {
            Ok(equal) => equal,
            Err(e) => {
                log::warn!("Content verification failed for {}: {}", id, e);
                false
            }
        }
    }

    /// Number of groups, singletons included.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Look up a group.
    ///
    /// # Errors
    ///
    /// [`EngineError::GroupNotFound`] for an index never issued in this run.
    pub fn group(&self, gid: GroupId) -> EngineResult<&Group> {
        self.groups.get(gid.0).ok_or(EngineError::GroupNotFound(gid))
    }

    /// Members of a group, ascending by file id.
    ///
    /// # Errors
    ///
    /// [`EngineError::GroupNotFound`] for an index never issued in this run.
    pub fn members_of(&self, gid: GroupId) -> EngineResult<Vec<FileId>> {
        self.group(gid).map(|group| group.members().collect())
    }

    /// Group a file was placed in, if it has been classified.
    #[must_use]
    pub fn group_of(&self, id: FileId) -> Option<GroupId> {
        self.file_groups.get(&id).copied()
    }

    /// Groups containing any of the given files, ascending.
    ///
    /// Files that were never classified contribute nothing.
    pub fn groups_touching(&self, files: impl IntoIterator<Item = FileId>) -> BTreeSet<GroupId> {
        files
            .into_iter()
            .filter_map(|id| self.group_of(id))
            .collect()
    }

    /// All groups in index order.
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Aggregate statistics.
    #[must_use]
    pub fn stats(&self) -> GroupingStats {
        let duplicates = self.groups.iter().filter(|g| g.is_duplicate());
        GroupingStats {
            classified_files: self.file_groups.len(),
            groups: self.groups.len(),
            duplicate_groups: duplicates.clone().count(),
            duplicate_files: duplicates.clone().map(Group::len).sum(),
            wasted_space: duplicates.map(Group::wasted_space).sum(),
            unique_sizes: self.by_size.len(),
            unreadable_files: self.unreadable.len(),
        }
    }

    /// Forget every group. Indices restart at 0.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.by_size.clear();
        self.file_groups.clear();
        self.unreadable.clear();
    }
}
