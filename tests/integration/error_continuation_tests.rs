//! Unreadable files and folders must be skipped without stopping the scan.

use dude::config::ProjectSettings;
use dude::duplicates::{GroupFilter, GroupId};
use dude::engine::{Progress, ScanController, ScanEvent, ScanObserver, ScanState};
use dude::registry::FileId;
use std::fs::{self, File};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[test]
#[cfg(unix)]
fn test_unreadable_directory_is_skipped() {
    let dir = tempdir().unwrap();
    let root = dir.path();

    File::create(root.join("a.txt"))
        .unwrap()
        .write_all(b"duplicate")
        .unwrap();
    File::create(root.join("b.txt"))
        .unwrap()
        .write_all(b"duplicate")
        .unwrap();

    let locked = root.join("locked");
    fs::create_dir(&locked).unwrap();
    File::create(locked.join("c.txt"))
        .unwrap()
        .write_all(b"duplicate")
        .unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let controller = ScanController::new(ProjectSettings::new(root).validate().unwrap());
    let events = controller.subscribe();
    controller.start().unwrap();
    let state = controller.wait();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(state, ScanState::Finished);
    let groups = controller.groups(GroupFilter::Duplicates).unwrap();
    assert_eq!(groups.len(), 1);

    // Root can read anything; otherwise the folder shows up as skipped.
    let skipped: Vec<_> = events
        .try_iter()
        .filter(|event| matches!(event, ScanEvent::FileSkipped { .. }))
        .collect();
    if groups[0].file_count == 2 {
        assert!(!skipped.is_empty());
        assert!(controller.stats().skipped >= 1);
    } else {
        assert_eq!(groups[0].file_count, 3);
    }
}

#[test]
#[cfg(unix)]
fn test_unreadable_file_is_not_registered() {
    let dir = tempdir().unwrap();
    let root = dir.path();

    fs::write(root.join("a.bin"), b"same bytes").unwrap();
    fs::write(root.join("b.bin"), b"same bytes").unwrap();
    let secret = root.join("secret.bin");
    fs::write(&secret, b"same bytes").unwrap();
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();

    let controller = ScanController::new(ProjectSettings::new(root).validate().unwrap());
    controller.start().unwrap();
    let state = controller.wait();

    fs::set_permissions(&secret, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(state, ScanState::Finished);
    let stats = controller.stats();
    assert_eq!(stats.duplicate_groups, 1);
    if stats.skipped > 0 {
        assert_eq!(stats.files, 2);
        assert_eq!(stats.duplicate_files, 2);
    } else {
        assert_eq!(stats.files, 3);
        assert_eq!(stats.duplicate_files, 3);
    }
}

/// Blocks the worker in its first group notification until released.
struct HoldFirstGroup {
    held: AtomicBool,
    reached: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl ScanObserver for HoldFirstGroup {
    fn on_progress(&self, _progress: Progress, _status: &str) {}

    fn on_group_updated(&self, _group: GroupId) {
        if !self.held.swap(true, Ordering::SeqCst) {
            self.reached.lock().unwrap().send(()).unwrap();
            let _ = self.release.lock().unwrap().recv();
        }
    }
}

#[test]
fn test_file_deleted_after_discovery_is_skipped() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    for name in ["one", "two", "three", "four"] {
        fs::write(root.join(name), b"payload").unwrap();
    }

    let (reached_tx, reached_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let controller = ScanController::new(ProjectSettings::new(root).validate().unwrap());
    controller.add_observer(Arc::new(HoldFirstGroup {
        held: AtomicBool::new(false),
        reached: Mutex::new(reached_tx),
        release: Mutex::new(release_rx),
    }));
    let events = controller.subscribe();
    controller.start().unwrap();

    // Discovery is complete and exactly one file has been processed.
    reached_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    let first = controller.file(FileId(0)).unwrap().name;
    let victim = ["one", "two", "three", "four"]
        .into_iter()
        .find(|name| *name != first)
        .unwrap();
    fs::remove_file(root.join(victim)).unwrap();
    release_tx.send(()).unwrap();

    assert_eq!(controller.wait(), ScanState::Finished);
    let stats = controller.stats();
    assert_eq!(stats.files, 3);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.duplicate_files, 3);

    let skipped: Vec<_> = events
        .try_iter()
        .filter_map(|event| match event {
            ScanEvent::FileSkipped { path, .. } => Some(path),
            _ => None,
        })
        .collect();
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].ends_with(victim));
}

#[test]
fn test_first_of_size_deleted_before_peer_is_skipped() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    for name in ["one", "two", "three", "four"] {
        fs::write(root.join(name), b"payload").unwrap();
    }

    let (reached_tx, reached_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let controller = ScanController::new(ProjectSettings::new(root).validate().unwrap());
    controller.add_observer(Arc::new(HoldFirstGroup {
        held: AtomicBool::new(false),
        reached: Mutex::new(reached_tx),
        release: Mutex::new(release_rx),
    }));
    let events = controller.subscribe();
    controller.start().unwrap();

    // The first file sits alone in its group and has never been hashed.
    reached_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    let first = controller.file(FileId(0)).unwrap();
    assert_eq!(first.checksum, None);
    fs::remove_file(first.path()).unwrap();
    release_tx.send(()).unwrap();

    assert_eq!(controller.wait(), ScanState::Finished);
    let stats = controller.stats();
    assert_eq!(stats.files, 4);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.duplicate_groups, 1);
    assert_eq!(stats.duplicate_files, 3);

    let skipped: Vec<_> = events
        .try_iter()
        .filter_map(|event| match event {
            ScanEvent::FileSkipped { path, .. } => Some(path),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec![first.path()]);
}
