use dude::config::ProjectSettings;
use dude::duplicates::{GroupFilter, GroupId};
use dude::engine::{Command, Progress, ScanController, ScanObserver, ScanState};
use dude::error::EngineError;
use dude::registry::FileId;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

/// Holds the worker inside the first group notification until released.
struct Gate {
    armed: AtomicBool,
    reached: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl Gate {
    fn new() -> (Arc<Self>, Receiver<()>, Sender<()>) {
        let (reached_tx, reached_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let gate = Arc::new(Self {
            armed: AtomicBool::new(true),
            reached: Mutex::new(reached_tx),
            release: Mutex::new(release_rx),
        });
        (gate, reached_rx, release_tx)
    }
}

impl ScanObserver for Gate {
    fn on_progress(&self, _progress: Progress, _status: &str) {}

    fn on_group_updated(&self, _group: GroupId) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.lock().unwrap().send(()).unwrap();
            let _ = self.release.lock().unwrap().recv();
        }
    }
}

fn populate(root: &Path, count: usize) {
    for i in 0..count {
        let content = format!("content {}", i % 7);
        fs::write(root.join(format!("file_{i:03}.txt")), content).unwrap();
    }
}

/// Groups as sets of file names, independent of index assignment.
fn grouping(controller: &ScanController) -> BTreeSet<Vec<String>> {
    controller
        .groups(GroupFilter::All)
        .unwrap()
        .into_iter()
        .map(|summary| summary.names)
        .collect()
}

fn settings(root: &Path) -> ProjectSettings {
    ProjectSettings::new(root).validate().unwrap()
}

#[test]
fn test_pause_stops_between_files() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 60);

    let controller = Arc::new(ScanController::new(settings(dir.path())));
    let (gate, reached, release) = Gate::new();
    controller.add_observer(gate);
    controller.start().unwrap();

    reached.recv_timeout(Duration::from_secs(10)).unwrap();
    let pauser = {
        let controller = Arc::clone(&controller);
        thread::spawn(move || controller.pause())
    };
    // Let the pause request land while the worker is still held.
    thread::sleep(Duration::from_millis(200));
    release.send(()).unwrap();

    let state = pauser.join().unwrap().unwrap();
    assert_eq!(state, ScanState::Paused);
    assert_eq!(controller.state(), ScanState::Paused);

    let registered = controller.file_count();
    assert!(registered >= 1);
    assert!(registered < 60);

    // Everything registered so far is fully classified.
    for id in 0..registered {
        assert!(controller.group_of(FileId(id)).unwrap().is_some());
    }

    thread::sleep(Duration::from_millis(100));
    assert_eq!(controller.file_count(), registered);

    controller.start().unwrap();
    assert_eq!(controller.wait(), ScanState::Finished);
    assert_eq!(controller.file_count(), 60);
}

#[test]
fn test_pause_resume_matches_uninterrupted_run() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 40);

    let reference = ScanController::new(settings(dir.path()));
    reference.start().unwrap();
    reference.wait();

    let controller = Arc::new(ScanController::new(settings(dir.path())));
    let (gate, reached, release) = Gate::new();
    controller.add_observer(gate);
    controller.start().unwrap();

    reached.recv_timeout(Duration::from_secs(10)).unwrap();
    let pauser = {
        let controller = Arc::clone(&controller);
        thread::spawn(move || controller.pause())
    };
    thread::sleep(Duration::from_millis(100));
    release.send(()).unwrap();
    let _ = pauser.join().unwrap().unwrap();

    // Several pause/resume cycles must not change the outcome.
    for _ in 0..3 {
        if controller.state() == ScanState::Paused {
            controller.start().unwrap();
        }
        if controller.state() == ScanState::Scanning {
            let _ = controller.pause();
        }
    }
    if controller.state() == ScanState::Paused {
        controller.start().unwrap();
    }
    assert_eq!(controller.wait(), ScanState::Finished);

    assert_eq!(controller.file_count(), reference.file_count());
    assert_eq!(grouping(&controller), grouping(&reference));
    assert_eq!(
        controller.stats().duplicate_groups,
        reference.stats().duplicate_groups
    );
}

#[test]
fn test_invalid_transitions_are_rejected() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 3);
    let controller = ScanController::new(settings(dir.path()));

    assert!(matches!(
        controller.pause(),
        Err(EngineError::InvalidStateTransition {
            command: Command::Pause,
            state: ScanState::NotStarted
        })
    ));
    assert!(matches!(
        controller.rescan(),
        Err(EngineError::InvalidStateTransition {
            command: Command::Rescan,
            ..
        })
    ));

    controller.start().unwrap();
    assert_eq!(controller.wait(), ScanState::Finished);

    assert!(matches!(
        controller.start(),
        Err(EngineError::InvalidStateTransition {
            command: Command::Start,
            state: ScanState::Finished
        })
    ));
    assert!(matches!(
        controller.pause(),
        Err(EngineError::InvalidStateTransition { .. })
    ));
    assert_eq!(controller.state(), ScanState::Finished);
}

#[test]
fn test_start_while_scanning_is_rejected() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 20);

    let controller = Arc::new(ScanController::new(settings(dir.path())));
    let (gate, reached, release) = Gate::new();
    controller.add_observer(gate);
    controller.start().unwrap();
    reached.recv_timeout(Duration::from_secs(10)).unwrap();

    assert_eq!(controller.state(), ScanState::Scanning);
    assert!(matches!(
        controller.start(),
        Err(EngineError::InvalidStateTransition {
            command: Command::Start,
            state: ScanState::Scanning
        })
    ));

    release.send(()).unwrap();
    assert_eq!(controller.wait(), ScanState::Finished);
}
