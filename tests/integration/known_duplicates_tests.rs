use dude::config::ProjectSettings;
use dude::duplicates::GroupFilter;
use dude::engine::{ScanController, ScanState};
use dude::registry::{FileId, FileOrigin};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn run(settings: ProjectSettings) -> ScanController {
    let controller = ScanController::new(settings.validate().unwrap());
    controller.start().unwrap();
    assert_eq!(controller.wait(), ScanState::Finished);
    controller
}

fn find(controller: &ScanController, name: &str, origin: FileOrigin) -> FileId {
    controller.inspect(|registry, _| {
        registry
            .iter()
            .find(|record| record.name == name && record.origin == origin)
            .map(|record| record.id)
            .unwrap()
    })
}

#[test]
fn test_known_duplicates_are_grouped_with_root_files() {
    let photos = tempdir().unwrap();
    let filed = tempdir().unwrap();
    fs::create_dir_all(photos.path().join("2023")).unwrap();
    fs::write(photos.path().join("2023").join("beach.jpg"), b"sand and sea").unwrap();
    fs::write(photos.path().join("cat.jpg"), b"meow").unwrap();
    fs::write(filed.path().join("beach-copy.jpg"), b"sand and sea").unwrap();

    let controller = run(
        ProjectSettings::new(photos.path()).with_duplicates_folder(filed.path()),
    );

    assert_eq!(controller.file_count(), 3);
    let beach = find(&controller, "beach.jpg", FileOrigin::Root);
    let copy = find(&controller, "beach-copy.jpg", FileOrigin::KnownDuplicates);
    assert_eq!(
        controller.group_of(beach).unwrap(),
        controller.group_of(copy).unwrap()
    );

    // Root files are processed before the duplicates folder.
    assert!(beach < copy);
    assert_eq!(controller.groups(GroupFilter::Duplicates).unwrap().len(), 1);
}

#[test]
fn test_relocation_target_keeps_relative_path() {
    let photos = tempdir().unwrap();
    let filed = tempdir().unwrap();
    let nested = photos.path().join("2023").join("summer");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("beach.jpg"), b"sand").unwrap();
    fs::write(filed.path().join("old.jpg"), b"sand").unwrap();

    let controller = run(
        ProjectSettings::new(photos.path()).with_duplicates_folder(filed.path()),
    );
    let filed_root = fs::canonicalize(filed.path()).unwrap();

    let beach = find(&controller, "beach.jpg", FileOrigin::Root);
    assert_eq!(
        controller.relocation_target(beach).unwrap(),
        Some(filed_root.join("2023").join("summer").join("beach.jpg"))
    );

    let old = find(&controller, "old.jpg", FileOrigin::KnownDuplicates);
    assert_eq!(controller.relocation_target(old).unwrap(), None);
}

#[test]
fn test_no_duplicates_folder_means_no_relocation() {
    let photos = tempdir().unwrap();
    fs::write(photos.path().join("a.jpg"), b"a").unwrap();

    let controller = run(ProjectSettings::new(photos.path()));
    assert_eq!(controller.relocation_target(FileId(0)).unwrap(), None);
}

#[test]
fn test_nested_duplicates_folder_is_scanned_once() {
    let photos = tempdir().unwrap();
    let filed = photos.path().join("_dupes");
    fs::create_dir_all(&filed).unwrap();
    fs::write(photos.path().join("a.jpg"), b"same").unwrap();
    fs::write(filed.join("a.jpg"), b"same").unwrap();

    let controller = run(ProjectSettings::new(photos.path()).with_duplicates_folder(&filed));

    assert_eq!(controller.file_count(), 2);
    let root_copy = find(&controller, "a.jpg", FileOrigin::Root);
    let filed_copy = find(&controller, "a.jpg", FileOrigin::KnownDuplicates);
    assert_ne!(root_copy, filed_copy);
    assert_eq!(
        controller.group_of(root_copy).unwrap(),
        controller.group_of(filed_copy).unwrap()
    );
}

#[test]
fn test_duplicates_folder_equal_to_root_is_ignored() {
    let photos = tempdir().unwrap();
    fs::write(photos.path().join("a.jpg"), b"same").unwrap();
    fs::write(photos.path().join("b.jpg"), b"same").unwrap();

    let settings = ProjectSettings::new(photos.path())
        .with_duplicates_folder(photos.path())
        .validate()
        .unwrap();
    assert_eq!(settings.duplicates_folder, None);

    let controller = run(settings);
    assert_eq!(controller.file_count(), 2);
}

#[test]
fn test_missing_duplicates_folder_is_an_error() {
    let photos = tempdir().unwrap();
    let result = ProjectSettings::new(photos.path())
        .with_duplicates_folder(Path::new("/definitely/not/here"))
        .validate();
    assert!(matches!(
        result,
        Err(dude::error::EngineError::RootNotFound(_))
    ));
}

#[test]
fn test_unresolved_filter_tracks_moves() {
    let photos = tempdir().unwrap();
    let filed = tempdir().unwrap();
    fs::write(photos.path().join("a.jpg"), b"same").unwrap();
    fs::write(photos.path().join("b.jpg"), b"same").unwrap();

    let controller = run(
        ProjectSettings::new(photos.path()).with_duplicates_folder(filed.path()),
    );
    assert_eq!(controller.groups(GroupFilter::Unresolved).unwrap().len(), 1);

    let b = find(&controller, "b.jpg", FileOrigin::Root);
    controller.set_moved(b, true).unwrap();

    assert!(controller.groups(GroupFilter::Unresolved).unwrap().is_empty());
    let summary = &controller.groups(GroupFilter::Duplicates).unwrap()[0];
    assert_eq!(summary.moved_count, 1);
    assert_eq!(summary.remaining_count, 1);
    assert_eq!(summary.status(), "2 (1 left, 1 moved)");
}
