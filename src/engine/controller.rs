//! The scan controller: commands, queries and the shared state behind them.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{
    Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::thread::{self, JoinHandle};

use serde::Serialize;

use super::events::{dispatch, ChannelObserver, ScanEvent, ScanObserver};
use super::state::{Command, ScanState};
use super::worker;
use crate::cache::{CacheStats, ChecksumCache};
use crate::config::ProjectSettings;
use crate::duplicates::{
    self, DuplicateGrouper, FolderTable, GroupFilter, GroupId, GroupSummary,
};
use crate::error::{EngineError, EngineResult};
use crate::moves::{self, MoveTracker};
use crate::registry::{FileId, FileRecord, FileRegistry};
use crate::scanner::{Checksum, Hasher};

/// Registry and grouper, always locked together so a query never sees a
/// file that is registered but not yet classified.
#[derive(Debug, Default)]
pub(crate) struct Catalog {
    pub(crate) registry: FileRegistry,
    pub(crate) grouper: DuplicateGrouper,
}

/// Scheduling state shared between the controller and its worker.
#[derive(Debug, Default)]
pub(crate) struct Control {
    pub(crate) state: ScanState,
    pub(crate) pause_requested: bool,
    pub(crate) shutdown: bool,
}

/// Everything the worker thread needs, behind one `Arc`.
pub(crate) struct Shared {
    pub(crate) settings: ProjectSettings,
    pub(crate) cache: ChecksumCache,
    pub(crate) catalog: RwLock<Catalog>,
    pub(crate) control: Mutex<Control>,
    pub(crate) wakeup: Condvar,
    observers: RwLock<Vec<Arc<dyn ScanObserver>>>,
    pub(crate) skipped: AtomicUsize,
}

impl Shared {
    pub(crate) fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn wait<'a>(&self, guard: MutexGuard<'a, Control>) -> MutexGuard<'a, Control> {
        self.wakeup.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn read_catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_catalog(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn emit(&self, event: &ScanEvent) {
        let observers = self.observers.read().unwrap_or_else(PoisonError::into_inner);
        for observer in observers.iter() {
            dispatch(observer.as_ref(), event);
        }
    }

    /// Change state and announce it. Caller holds the control lock.
    pub(crate) fn enter(&self, control: &mut Control, state: ScanState) {
        log::debug!("Scan state {} -> {}", control.state, state);
        control.state = state;
        self.emit(&ScanEvent::StateChanged(state));
        self.wakeup.notify_all();
    }
}

/// Counters describing the current run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Current state
    pub state: ScanState,
    /// Registered files
    pub files: usize,
    /// Groups, singletons included
    pub groups: usize,
    /// Groups with 2+ members
    pub duplicate_groups: usize,
    /// Files in duplicate groups
    pub duplicate_files: usize,
    /// Bytes held by all copies but one
    pub wasted_space: u64,
    /// Files flagged as moved
    pub moved_files: usize,
    /// Files and folders skipped as unreadable
    pub skipped: usize,
    /// Checksums answered from memory
    pub checksum_hits: usize,
    /// Checksums computed from disk
    pub checksum_misses: usize,
}

/// Drives a duplicate scan on a background thread and answers queries
/// about its results.
///
/// All methods take `&self`, so a controller can be shared between threads
/// (for example a UI thread and a Ctrl+C handler) behind an `Arc`.
///
/// # Example
///
/// ```no_run
/// use dude::config::ProjectSettings;
/// use dude::duplicates::GroupFilter;
/// use dude::engine::ScanController;
///
/// let settings = ProjectSettings::new("/photos").validate()?;
/// let controller = ScanController::new(settings);
/// let events = controller.subscribe();
///
/// controller.start()?;
/// controller.wait();
///
/// for summary in controller.groups(GroupFilter::Duplicates)? {
///     println!("{} {}", summary.group, summary.label());
/// }
/// # drop(events);
/// # Ok::<(), dude::error::EngineError>(())
/// ```
pub struct ScanController {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ScanController {
    /// Create a controller in [`ScanState::NotStarted`].
    ///
    /// `settings` should already be [validated](ProjectSettings::validate).
    #[must_use]
    pub fn new(settings: ProjectSettings) -> Self {
        Self::with_hasher(settings, Hasher::new())
    }

    /// Create a controller with a custom hasher.
    #[must_use]
    pub fn with_hasher(settings: ProjectSettings, hasher: Hasher) -> Self {
        let grouper = DuplicateGrouper::new().with_verify_content(settings.verify_content);
        Self {
            shared: Arc::new(Shared {
                settings,
                cache: ChecksumCache::new(hasher),
                catalog: RwLock::new(Catalog {
                    registry: FileRegistry::new(),
                    grouper,
                }),
                control: Mutex::new(Control::default()),
                wakeup: Condvar::new(),
                observers: RwLock::new(Vec::new()),
                skipped: AtomicUsize::new(0),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Register an observer. It receives every event emitted afterwards.
    pub fn add_observer(&self, observer: Arc<dyn ScanObserver>) {
        self.shared
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Receive every future event through a channel.
    #[must_use]
    pub fn subscribe(&self) -> std::sync::mpsc::Receiver<ScanEvent> {
        let (observer, rx) = ChannelObserver::new();
        self.add_observer(Arc::new(observer));
        rx
    }

    /// Start a scan, or resume a paused one from where it stopped.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidStateTransition`] unless the scan is
    /// [`NotStarted`](ScanState::NotStarted) or [`Paused`](ScanState::Paused);
    /// [`EngineError::Io`] if the worker thread cannot be spawned.
    pub fn start(&self) -> EngineResult<()> {
        let mut control = self.shared.control();
        let from = control.state;
        let to = transition(Command::Start, from)?;

        control.pause_requested = false;
        self.shared.enter(&mut control, to);
        drop(control);

        if from == ScanState::NotStarted {
            log::info!("Starting scan of {}", self.shared.settings.root.display());
            self.spawn_worker()?;
        } else {
            log::info!("Resuming scan");
        }
        Ok(())
    }

    /// Park the worker after the file it is working on.
    ///
    /// Blocks until the worker has parked and returns the resulting state:
    /// normally [`Paused`](ScanState::Paused), or
    /// [`Finished`](ScanState::Finished) if the last file completed first.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidStateTransition`] unless the scan is
    /// [`Scanning`](ScanState::Scanning).
    pub fn pause(&self) -> EngineResult<ScanState> {
        let mut control = self.shared.control();
        transition(Command::Pause, control.state)?;

        control.pause_requested = true;
        self.shared.wakeup.notify_all();
        while control.state.is_scanning() && !control.shutdown {
            control = self.shared.wait(control);
        }
        log::info!("Scan {}", control.state);
        Ok(control.state)
    }

    /// Discard all files and groups and scan again from the configured
    /// folders. File and group indices restart at 0.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidStateTransition`] unless the scan is
    /// [`Finished`](ScanState::Finished); [`EngineError::Io`] if the worker
    /// thread cannot be spawned.
    pub fn rescan(&self) -> EngineResult<()> {
        let mut control = self.shared.control();
        let to = transition(Command::Rescan, control.state)?;

        // A finished worker never takes the control lock again.
        self.join_worker();
        {
            let mut catalog = self.shared.write_catalog();
            catalog.registry.clear();
            catalog.grouper.clear();
        }
        self.shared.skipped.store(0, Ordering::Relaxed);

        control.pause_requested = false;
        self.shared.enter(&mut control, to);
        drop(control);

        log::info!("Rescanning {}", self.shared.settings.root.display());
        self.spawn_worker()
    }

    /// Block until the scan is no longer running and return the state.
    pub fn wait(&self) -> ScanState {
        let mut control = self.shared.control();
        while control.state.is_scanning() && !control.shutdown {
            control = self.shared.wait(control);
        }
        control.state
    }

    fn spawn_worker(&self) -> EngineResult<()> {
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("dude-scan".to_string())
            .spawn(move || worker::run(&shared));

        match spawned {
            Ok(handle) => {
                *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                Ok(())
            }
            Err(source) => {
                let mut control = self.shared.control();
                self.shared.enter(&mut control, ScanState::NotStarted);
                Err(EngineError::Io {
                    path: PathBuf::from("dude-scan"),
                    source,
                })
            }
        }
    }

    fn join_worker(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                log::error!("Scan worker panicked");
            }
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ScanState {
        self.shared.control().state
    }

    /// Settings this controller was built with.
    #[must_use]
    pub fn settings(&self) -> &ProjectSettings {
        &self.shared.settings
    }

    /// Snapshot of one file's record.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] for an id not issued in this run.
    pub fn file(&self, id: FileId) -> EngineResult<FileRecord> {
        self.shared.read_catalog().registry.get(id).cloned()
    }

    /// Content checksum of a file, computing it on demand.
    ///
    /// Files whose size was unique when they were classified are never
    /// hashed by the scan. The first call for such a file reads it outside
    /// the catalogue lock, stores the result and keys its singleton group
    /// by it.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] for an id not issued in this run, or
    /// [`EngineError::Hash`] if the file cannot be read.
    pub fn checksum_of(&self, id: FileId) -> EngineResult<Checksum> {
        let path = {
            let catalog = self.shared.read_catalog();
            let record = catalog.registry.get(id)?;
            if let Some(checksum) = record.checksum {
                return Ok(checksum);
            }
            record.path()
        };

        let checksum = self.shared.cache.compute(&path)?;

        let filled = {
            let mut catalog = self.shared.write_catalog();
            let Catalog { registry, grouper } = &mut *catalog;
            let record = registry.get(id)?;
            if record.path() != path {
                // The catalogue was rebuilt by a rescan meanwhile.
                return Err(EngineError::FileNotFound(id));
            }
            if let Some(existing) = record.checksum {
                return Ok(existing);
            }
            registry.set_checksum(id, checksum)?;
            grouper.fill_checksum(id, checksum)
        };
        if let Some(group) = filled {
            self.shared.emit(&ScanEvent::GroupUpdated(group));
        }
        Ok(checksum)
    }

    /// Number of registered files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.shared.read_catalog().registry.len()
    }

    /// Number of groups, singletons included.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.shared.read_catalog().grouper.group_count()
    }

    /// The group a file belongs to.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] for an id not issued in this run.
    pub fn group_of(&self, id: FileId) -> EngineResult<Option<GroupId>> {
        let catalog = self.shared.read_catalog();
        catalog.registry.get(id)?;
        Ok(catalog.grouper.group_of(id))
    }

    /// Members of a group, ascending by file id.
    ///
    /// # Errors
    ///
    /// [`EngineError::GroupNotFound`] for an index not issued in this run.
    pub fn members_of(&self, group: GroupId) -> EngineResult<Vec<FileId>> {
        self.shared.read_catalog().grouper.members_of(group)
    }

    /// Groups containing any of `files`, ascending.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] if one of `files` is unknown.
    pub fn groups_touching(&self, files: &[FileId]) -> EngineResult<BTreeSet<GroupId>> {
        let catalog = self.shared.read_catalog();
        for &id in files {
            catalog.registry.get(id)?;
        }
        Ok(catalog.grouper.groups_touching(files.iter().copied()))
    }

    /// Summary of one group.
    ///
    /// # Errors
    ///
    /// [`EngineError::GroupNotFound`] for an index not issued in this run.
    pub fn group_summary(&self, group: GroupId) -> EngineResult<GroupSummary> {
        let catalog = self.shared.read_catalog();
        GroupSummary::of(catalog.grouper.group(group)?, &catalog.registry)
    }

    /// Summaries of all groups passing `filter`, ascending by index.
    ///
    /// # Errors
    ///
    /// Fails only if the catalogue is internally inconsistent.
    pub fn groups(&self, filter: GroupFilter) -> EngineResult<Vec<GroupSummary>> {
        let catalog = self.shared.read_catalog();
        duplicates::summaries(&catalog.registry, &catalog.grouper, filter)
    }

    /// Every file sharing a folder with any of `files`, ascending.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] if one of `files` is unknown.
    pub fn folder_files(&self, files: &[FileId]) -> EngineResult<Vec<FileId>> {
        duplicates::folder_files(&self.shared.read_catalog().registry, files)
    }

    /// Folder comparison table for the folders holding `files`.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] if one of `files` is unknown.
    pub fn folder_table(&self, files: &[FileId]) -> EngineResult<FolderTable> {
        let catalog = self.shared.read_catalog();
        FolderTable::build(&catalog.registry, &catalog.grouper, files)
    }

    /// Moved flag of a file.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] for an id not issued in this run.
    pub fn is_moved(&self, id: FileId) -> EngineResult<bool> {
        MoveTracker::is_moved(&self.shared.read_catalog().registry, id)
    }

    /// Set a file's moved flag.
    ///
    /// Emits a group update for the file's group when the flag changes.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] for an id not issued in this run.
    pub fn set_moved(&self, id: FileId, moved: bool) -> EngineResult<()> {
        let changed_group = {
            let mut catalog = self.shared.write_catalog();
            let before = MoveTracker::is_moved(&catalog.registry, id)?;
            MoveTracker::set_moved(&mut catalog.registry, id, moved)?;
            (before != moved).then(|| catalog.grouper.group_of(id)).flatten()
        };
        if let Some(group) = changed_group {
            self.shared.emit(&ScanEvent::GroupUpdated(group));
        }
        Ok(())
    }

    /// Flip a file's moved flag and return the new value.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] for an id not issued in this run.
    pub fn toggle_moved(&self, id: FileId) -> EngineResult<bool> {
        let (moved, group) = {
            let mut catalog = self.shared.write_catalog();
            let moved = catalog.registry.toggle(id)?;
            (moved, catalog.grouper.group_of(id))
        };
        if let Some(group) = group {
            self.shared.emit(&ScanEvent::GroupUpdated(group));
        }
        Ok(moved)
    }

    /// Where a file would be relocated inside the known-duplicates folder.
    ///
    /// # Errors
    ///
    /// [`EngineError::FileNotFound`] for an id not issued in this run.
    pub fn relocation_target(&self, id: FileId) -> EngineResult<Option<PathBuf>> {
        let catalog = self.shared.read_catalog();
        let record = catalog.registry.get(id)?;
        Ok(moves::relocation_target(&self.shared.settings, record))
    }

    /// Run `f` against a consistent view of the registry and grouper.
    ///
    /// The worker cannot classify files while `f` runs, so keep it short.
    pub fn inspect<R>(&self, f: impl FnOnce(&FileRegistry, &DuplicateGrouper) -> R) -> R {
        let catalog = self.shared.read_catalog();
        f(&catalog.registry, &catalog.grouper)
    }

    /// Counters for the current run.
    #[must_use]
    pub fn stats(&self) -> ScanStats {
        let state = self.state();
        let catalog = self.shared.read_catalog();
        let grouping = catalog.grouper.stats();
        let CacheStats { hits, misses } = self.shared.cache.stats();
        ScanStats {
            state,
            files: catalog.registry.len(),
            groups: grouping.groups,
            duplicate_groups: grouping.duplicate_groups,
            duplicate_files: grouping.duplicate_files,
            wasted_space: grouping.wasted_space,
            moved_files: catalog.registry.iter().filter(|r| r.moved).count(),
            skipped: self.shared.skipped.load(Ordering::Relaxed),
            checksum_hits: hits,
            checksum_misses: misses,
        }
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        {
            let mut control = self.shared.control();
            control.shutdown = true;
            self.shared.wakeup.notify_all();
        }
        self.join_worker();
    }
}

fn transition(command: Command, state: ScanState) -> EngineResult<ScanState> {
    command.target(state).ok_or_else(|| {
        log::debug!("Rejected {} while {}", command, state);
        EngineError::InvalidStateTransition { command, state }
    })
}
