//! The background scan loop.
//!
//! A run has two phases. Discovery walks the root and then the
//! known-duplicates folder into a FIFO frontier while reporting
//! indeterminate progress. Processing then takes one file at a time:
//! checksums it if a same-size file was already seen, and registers and
//! classifies it under a single catalogue write lock.
//!
//! Pause requests are honoured at [`checkpoint`]s, which sit between
//! discovered entries and between processed files. The walker iterator and
//! the frontier live on this thread's stack, so a parked worker resumes at
//! exactly the same place.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use super::controller::{Catalog, Shared};
use super::events::{Progress, ScanEvent};
use super::state::ScanState;
use crate::registry::{FileId, FileOrigin};
use crate::scanner::{Checksum, FileEntry, HashError, Walker};

/// Whether the worker should keep going after a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// A discovered file waiting to be processed.
#[derive(Debug)]
struct Pending {
    entry: FileEntry,
    origin: FileOrigin,
}

/// Checksums gathered outside the catalogue lock for one file.
#[derive(Debug, Default)]
struct Prepared {
    own: Option<Checksum>,
    peers: Vec<(FileId, PathBuf, Result<Checksum, HashError>)>,
}

pub(crate) fn run(shared: &Shared) {
    let Some(frontier) = discover(shared) else {
        log::debug!("Scan worker stopped during discovery");
        return;
    };
    if process(shared, frontier) == Flow::Stop {
        log::debug!("Scan worker stopped during processing");
    }
}

/// Park while paused. Returns [`Flow::Stop`] once the controller is dropped.
fn checkpoint(shared: &Shared) -> Flow {
    let mut control = shared.control();
    loop {
        if control.shutdown {
            return Flow::Stop;
        }
        if control.pause_requested {
            control.pause_requested = false;
            shared.enter(&mut control, ScanState::Paused);
        }
        if control.state != ScanState::Paused {
            return Flow::Continue;
        }
        control = shared.wait(control);
    }
}

fn discover(shared: &Shared) -> Option<VecDeque<Pending>> {
    let settings = &shared.settings;
    let interval = settings.progress_interval.max(1);
    let mut sources = vec![(settings.root.clone(), settings.walker_config(), FileOrigin::Root)];
    if let Some(folder) = &settings.duplicates_folder {
        sources.push((
            folder.clone(),
            settings.duplicates_walker_config(),
            FileOrigin::KnownDuplicates,
        ));
    }

    let mut frontier = VecDeque::new();
    report_discovery(shared, 0);
    for (folder, config, origin) in sources {
        log::debug!("Discovering files under {}", folder.display());
        let walker = Walker::new(&folder, config);
        for item in walker.walk() {
            if checkpoint(shared) == Flow::Stop {
                return None;
            }
            match item {
                Ok(entry) => {
                    frontier.push_back(Pending { entry, origin });
                    if frontier.len() % interval == 0 {
                        report_discovery(shared, frontier.len());
                    }
                }
                Err(e) => skip(shared, e.path(), &e.to_string()),
            }
        }
    }

    report_discovery(shared, frontier.len());
    log::info!("Discovered {} files", frontier.len());
    Some(frontier)
}

fn report_discovery(shared: &Shared, found: usize) {
    shared.emit(&ScanEvent::Progress {
        progress: Progress::Indeterminate,
        status: format!("{found} files found"),
    });
}

fn process(shared: &Shared, mut frontier: VecDeque<Pending>) -> Flow {
    let interval = shared.settings.progress_interval.max(1);
    let total = frontier.len();
    let mut processed = 0;

    if total > 0 {
        report_processing(shared, processed, total);
    }
    while let Some(pending) = frontier.pop_front() {
        if checkpoint(shared) == Flow::Stop {
            return Flow::Stop;
        }
        process_one(shared, pending);
        processed += 1;
        // 100% is reserved for the transition to Finished.
        if processed % interval == 0 && processed < total {
            report_processing(shared, processed, total);
        }
    }

    finish(shared, total)
}

fn report_processing(shared: &Shared, processed: usize, total: usize) {
    shared.emit(&ScanEvent::Progress {
        progress: Progress::of(processed, total),
        status: format!("Processed {processed} of {total} files"),
    });
}

fn finish(shared: &Shared, total: usize) -> Flow {
    let stats = shared.read_catalog().grouper.stats();
    let mut control = shared.control();
    if control.shutdown {
        return Flow::Stop;
    }
    control.pause_requested = false;
    shared.emit(&ScanEvent::Progress {
        progress: Progress::Percent(100),
        status: format!(
            "Finished: {} files, {} duplicate groups",
            total, stats.duplicate_groups
        ),
    });
    shared.enter(&mut control, ScanState::Finished);
    log::info!(
        "Scan finished: {} files, {} duplicate groups, {} skipped",
        total,
        stats.duplicate_groups,
        shared.skipped.load(Ordering::Relaxed)
    );
    Flow::Continue
}

/// Register and classify one file.
fn process_one(shared: &Shared, pending: Pending) {
    let Pending { entry, origin } = pending;
    let size = entry.size;

    let Some(prepared) = prepare(shared, &entry) else {
        return;
    };

    let (folder, name) = entry.split();
    let mut lost: Vec<(PathBuf, String)> = Vec::new();
    let classified = {
        let mut catalog = shared.write_catalog();
        let Catalog { registry, grouper } = &mut *catalog;

        for (peer, path, result) in prepared.peers {
            match result {
                Ok(checksum) => {
                    if let Err(e) = registry.set_checksum(peer, checksum) {
                        log::error!("Lost track of {}: {}", peer, e);
                    }
                }
                Err(e) => {
                    grouper.mark_unreadable(peer);
                    lost.push((path, e.to_string()));
                }
            }
        }

        let id = registry.register(folder, name, size, origin);
        if let Some(checksum) = prepared.own {
            if let Err(e) = registry.set_checksum(id, checksum) {
                log::error!("Lost track of {}: {}", id, e);
            }
        }
        let classified = grouper.classify(registry, &shared.cache, id);
        if let Ok(placed) = &classified {
            // Peers that only failed once the lock was held.
            for &peer in &placed.unreadable {
                if let Ok(record) = registry.get(peer) {
                    lost.push((record.path(), "unreadable during comparison".to_string()));
                }
            }
        }
        classified.map(|placed| (id, placed))
    };

    for (path, reason) in &lost {
        skip(shared, path, reason);
    }

    match classified {
        Ok((id, placed)) => {
            log::trace!(
                "{} {} -> {} ({} members)",
                id,
                entry.path.display(),
                placed.group,
                placed.member_count
            );
            if placed.changed {
                shared.emit(&ScanEvent::GroupUpdated(placed.group));
            }
        }
        Err(e) => skip(shared, &entry.path, &e.to_string()),
    }
}

/// Compute the checksums classification will need, without holding the
/// catalogue lock. Returns `None` if the file itself cannot be read.
fn prepare(shared: &Shared, entry: &FileEntry) -> Option<Prepared> {
    let peers: Vec<(FileId, PathBuf)> = {
        let catalog = shared.read_catalog();
        if !catalog.grouper.needs_checksum(entry.size) {
            return Some(Prepared::default());
        }
        catalog
            .grouper
            .pending_checksums(&catalog.registry, entry.size)
            .into_iter()
            .filter_map(|id| catalog.registry.get(id).ok().map(|r| (id, r.path())))
            .collect()
    };

    let own = match shared.cache.compute(&entry.path) {
        Ok(checksum) => checksum,
        Err(e) => {
            skip(shared, &entry.path, &e.to_string());
            return None;
        }
    };
    let peers = peers
        .into_iter()
        .map(|(id, path)| {
            let result = shared.cache.compute(&path);
            (id, path, result)
        })
        .collect();

    Some(Prepared {
        own: Some(own),
        peers,
    })
}

fn skip(shared: &Shared, path: &Path, reason: &str) {
    log::warn!("Skipping {}: {}", path.display(), reason);
    shared.skipped.fetch_add(1, Ordering::Relaxed);
    shared.emit(&ScanEvent::FileSkipped {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    });
}
