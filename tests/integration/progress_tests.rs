use dude::config::ProjectSettings;
use dude::engine::{Progress, ScanController, ScanEvent, ScanState};
use std::fs;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::time::Duration;
use tempfile::tempdir;

fn populate(root: &Path, count: usize) {
    for i in 0..count {
        fs::write(root.join(format!("f{i:03}")), format!("body {}", i % 5)).unwrap();
    }
}

fn collect_until_finished(events: &Receiver<ScanEvent>) -> Vec<ScanEvent> {
    let mut seen = Vec::new();
    loop {
        let event = events
            .recv_timeout(Duration::from_secs(30))
            .expect("scan did not finish");
        let done = event == ScanEvent::StateChanged(ScanState::Finished);
        seen.push(event);
        if done {
            return seen;
        }
    }
}

#[test]
fn test_progress_is_monotonic_and_ends_at_100() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 50);

    let settings = ProjectSettings::new(dir.path())
        .with_progress_interval(3)
        .validate()
        .unwrap();
    let controller = ScanController::new(settings);
    let events = controller.subscribe();
    controller.start().unwrap();
    let seen = collect_until_finished(&events);

    let progress: Vec<(Progress, String)> = seen
        .iter()
        .filter_map(|event| match event {
            ScanEvent::Progress { progress, status } => Some((*progress, status.clone())),
            _ => None,
        })
        .collect();

    let first_percent = progress
        .iter()
        .position(|(p, _)| matches!(p, Progress::Percent(_)))
        .unwrap();
    assert!(first_percent > 0);
    assert!(progress[..first_percent]
        .iter()
        .all(|(p, status)| *p == Progress::Indeterminate && status.ends_with("files found")));
    assert_eq!(progress[first_percent - 1].1, "50 files found");

    let percents: Vec<i32> = progress[first_percent..]
        .iter()
        .map(|(p, _)| p.as_i32())
        .collect();
    assert!(percents.iter().all(|&p| p >= 0));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.iter().filter(|&&p| p == 100).count(), 1);
    assert_eq!(*percents.last().unwrap(), 100);

    // The 100% notification comes right before the Finished transition.
    let n = seen.len();
    assert!(matches!(
        seen[n - 2],
        ScanEvent::Progress {
            progress: Progress::Percent(100),
            ..
        }
    ));
    assert_eq!(seen[n - 1], ScanEvent::StateChanged(ScanState::Finished));
}

#[test]
fn test_state_changes_are_announced() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 2);

    let controller = ScanController::new(ProjectSettings::new(dir.path()).validate().unwrap());
    let events = controller.subscribe();
    controller.start().unwrap();
    let seen = collect_until_finished(&events);

    let states: Vec<ScanState> = seen
        .iter()
        .filter_map(|event| match event {
            ScanEvent::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec![ScanState::Scanning, ScanState::Finished]);
}

#[test]
fn test_empty_root_reports_complete() {
    let dir = tempdir().unwrap();
    let controller = ScanController::new(ProjectSettings::new(dir.path()).validate().unwrap());
    let events = controller.subscribe();
    controller.start().unwrap();
    let seen = collect_until_finished(&events);

    assert!(seen.contains(&ScanEvent::Progress {
        progress: Progress::Percent(100),
        status: "Finished: 0 files, 0 duplicate groups".to_string(),
    }));
}

#[test]
fn test_group_updates_are_queryable_while_scanning() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 80);

    let controller = ScanController::new(ProjectSettings::new(dir.path()).validate().unwrap());
    let events = controller.subscribe();
    controller.start().unwrap();

    let mut updates = 0;
    loop {
        match events.recv_timeout(Duration::from_secs(30)).unwrap() {
            ScanEvent::GroupUpdated(group) => {
                updates += 1;
                let members = controller.members_of(group).unwrap();
                assert!(!members.is_empty());
                for member in members {
                    assert_eq!(controller.group_of(member).unwrap(), Some(group));
                }
            }
            ScanEvent::StateChanged(ScanState::Finished) => break,
            _ => {}
        }
    }

    // Each file either created a group or joined one.
    assert_eq!(updates, 80);
    assert_eq!(controller.group_count(), 5);
}

#[test]
fn test_moved_flag_changes_notify_group() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"copy").unwrap();
    fs::write(dir.path().join("b"), b"copy").unwrap();

    let controller = ScanController::new(ProjectSettings::new(dir.path()).validate().unwrap());
    controller.start().unwrap();
    controller.wait();

    let events = controller.subscribe();
    let file = dude::registry::FileId(1);
    let group = controller.group_of(file).unwrap().unwrap();

    controller.set_moved(file, true).unwrap();
    controller.set_moved(file, true).unwrap();
    controller.toggle_moved(file).unwrap();

    let updates: Vec<ScanEvent> = events.try_iter().collect();
    assert_eq!(
        updates,
        vec![ScanEvent::GroupUpdated(group), ScanEvent::GroupUpdated(group)]
    );
}
