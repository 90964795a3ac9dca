use dude::config::{ProjectSettings, DEFAULT_PROGRESS_INTERVAL};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_load_from_explicit_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dude.toml");
    fs::write(
        &path,
        r#"
root = "/photos"
duplicates_folder = "/photos-filed"
verify_content = true
min_size = 1024
ignore_patterns = ["*.tmp", "thumbs"]
"#,
    )
    .unwrap();

    let settings = ProjectSettings::load(Some(&path)).unwrap();

    assert_eq!(settings.root, std::path::PathBuf::from("/photos"));
    assert_eq!(settings.duplicates_folder, Some("/photos-filed".into()));
    assert!(settings.verify_content);
    assert_eq!(settings.min_size, Some(1024));
    assert_eq!(settings.max_size, None);
    assert_eq!(settings.ignore_patterns, vec!["*.tmp", "thumbs"]);
    assert_eq!(settings.progress_interval, DEFAULT_PROGRESS_INTERVAL);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "verify_content = \"sometimes\"").unwrap();

    assert!(ProjectSettings::load(Some(&path)).is_err());
}

#[test]
fn test_environment_overrides_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dude.toml");
    fs::write(&path, "follow_symlinks = false\nskip_hidden = true\n").unwrap();

    std::env::set_var("DUDE_FOLLOW_SYMLINKS", "true");
    let settings = ProjectSettings::load(Some(&path));
    std::env::remove_var("DUDE_FOLLOW_SYMLINKS");

    let settings = settings.unwrap();
    assert!(settings.follow_symlinks);
    assert!(settings.skip_hidden);
}

#[test]
fn test_toml_rendering_loads_back() {
    let dir = tempdir().unwrap();
    let original = ProjectSettings::new("/data")
        .with_duplicates_folder("/data-dupes")
        .with_ignore_pattern("*.bak")
        .with_progress_interval(32);

    let path = dir.path().join("rendered.toml");
    fs::write(&path, original.to_toml().unwrap()).unwrap();
    let loaded = ProjectSettings::load(Some(&path)).unwrap();

    // Compared field by field: the environment test may flip
    // `follow_symlinks` concurrently.
    assert_eq!(loaded.root, original.root);
    assert_eq!(loaded.duplicates_folder, original.duplicates_folder);
    assert_eq!(loaded.ignore_patterns, original.ignore_patterns);
    assert_eq!(loaded.progress_interval, 32);
    assert_eq!(loaded.verify_content, original.verify_content);
}

#[test]
fn test_validate_rejects_file_as_root() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    fs::write(&file, b"x").unwrap();

    assert!(matches!(
        ProjectSettings::new(&file).validate(),
        Err(dude::error::EngineError::NotADirectory(_))
    ));
}

#[test]
fn test_validate_clamps_progress_interval() {
    let dir = tempdir().unwrap();
    let settings = ProjectSettings::new(dir.path())
        .with_progress_interval(0)
        .validate()
        .unwrap();
    assert_eq!(settings.progress_interval, 1);
    assert_eq!(settings.root, fs::canonicalize(dir.path()).unwrap());
}
