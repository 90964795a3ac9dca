use dude::config::ProjectSettings;
use dude::duplicates::{GroupFilter, GroupId};
use dude::engine::{ScanController, ScanEvent, ScanState};
use dude::error::EngineError;
use dude::registry::FileId;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_rescan_picks_up_changes() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"same").unwrap();
    fs::write(dir.path().join("b.txt"), b"same").unwrap();
    fs::write(dir.path().join("c.txt"), b"unique content").unwrap();

    let controller = ScanController::new(ProjectSettings::new(dir.path()).validate().unwrap());
    controller.start().unwrap();
    assert_eq!(controller.wait(), ScanState::Finished);
    assert_eq!(controller.file_count(), 3);
    assert_eq!(controller.groups(GroupFilter::Duplicates).unwrap().len(), 1);

    fs::remove_file(dir.path().join("b.txt")).unwrap();
    fs::write(dir.path().join("d.txt"), b"unique content").unwrap();
    fs::write(dir.path().join("e.txt"), b"unique content").unwrap();

    controller.rescan().unwrap();
    assert_eq!(controller.wait(), ScanState::Finished);

    assert_eq!(controller.file_count(), 4);
    let duplicates = controller.groups(GroupFilter::Duplicates).unwrap();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].names, vec!["c.txt", "d.txt", "e.txt"]);
}

#[test]
fn test_rescan_restarts_indices() {
    let dir = tempdir().unwrap();
    for i in 0..4 {
        fs::write(dir.path().join(format!("f{i}")), format!("{i}")).unwrap();
    }

    let controller = ScanController::new(ProjectSettings::new(dir.path()).validate().unwrap());
    controller.start().unwrap();
    controller.wait();
    assert_eq!(controller.group_count(), 4);

    for i in 1..4 {
        fs::remove_file(dir.path().join(format!("f{i}"))).unwrap();
    }
    controller.rescan().unwrap();
    controller.wait();

    assert_eq!(controller.file_count(), 1);
    assert_eq!(controller.group_count(), 1);
    assert_eq!(controller.members_of(GroupId(0)).unwrap(), vec![FileId(0)]);
    assert!(matches!(
        controller.members_of(GroupId(3)),
        Err(EngineError::GroupNotFound(GroupId(3)))
    ));
    assert!(matches!(
        controller.file(FileId(2)),
        Err(EngineError::FileNotFound(FileId(2)))
    ));
}

#[test]
fn test_rescan_clears_moved_flags() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"x").unwrap();
    fs::write(dir.path().join("b"), b"x").unwrap();

    let controller = ScanController::new(ProjectSettings::new(dir.path()).validate().unwrap());
    controller.start().unwrap();
    controller.wait();
    controller.set_moved(FileId(0), true).unwrap();
    assert_eq!(controller.stats().moved_files, 1);

    controller.rescan().unwrap();
    controller.wait();

    assert_eq!(controller.stats().moved_files, 0);
    assert!(!controller.is_moved(FileId(0)).unwrap());
}

#[test]
fn test_rescan_notifies_state_changes() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"x").unwrap();

    let controller = ScanController::new(ProjectSettings::new(dir.path()).validate().unwrap());
    controller.start().unwrap();
    controller.wait();

    let events = controller.subscribe();
    controller.rescan().unwrap();
    controller.wait();

    let states: Vec<ScanState> = events
        .try_iter()
        .filter_map(|event| match event {
            ScanEvent::StateChanged(state) => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec![ScanState::Scanning, ScanState::Finished]);
}
