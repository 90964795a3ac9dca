use clap::Parser;
use dude::cli::Cli;
use dude::error::ExitCode;
use std::fs;
use tempfile::tempdir;

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["dude", "--quiet"];
    argv.extend_from_slice(args);
    dude::run_app(Cli::try_parse_from(argv).unwrap())
}

#[test]
fn test_exit_code_success_with_duplicates() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"twin").unwrap();
    fs::write(dir.path().join("b"), b"twin").unwrap();
    let root = dir.path().to_str().unwrap();

    assert_eq!(run(&["scan", root]).unwrap(), ExitCode::Success);
}

#[test]
fn test_exit_code_no_duplicates() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"one").unwrap();
    fs::write(dir.path().join("b"), b"two").unwrap();
    let root = dir.path().to_str().unwrap();

    assert_eq!(run(&["scan", root]).unwrap(), ExitCode::NoDuplicates);
}

#[test]
fn test_missing_root_is_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("not-there");

    let err = run(&["scan", missing.to_str().unwrap()]).unwrap_err();
    assert!(format!("{err:#}").contains("Path not found"));
}

#[test]
fn test_machine_readable_outputs() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"twin").unwrap();
    fs::write(dir.path().join("b"), b"twin").unwrap();
    let root = dir.path().to_str().unwrap();

    for format in ["json", "csv", "text"] {
        assert_eq!(
            run(&["scan", root, "--output", format, "--filter", "all"]).unwrap(),
            ExitCode::Success
        );
    }
}

#[test]
fn test_scan_with_config_file_and_duplicates_folder() {
    let photos = tempdir().unwrap();
    let filed = tempdir().unwrap();
    fs::write(photos.path().join("a.jpg"), b"picture").unwrap();
    fs::write(filed.path().join("a-old.jpg"), b"picture").unwrap();

    let config = photos.path().join("settings.toml");
    fs::write(&config, "verify_content = true\nignore_patterns = [\"*.toml\"]\n").unwrap();

    let code = run(&[
        "scan",
        photos.path().to_str().unwrap(),
        "-d",
        filed.path().to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_config_subcommand() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("settings.toml");
    fs::write(&config, "skip_hidden = true\n").unwrap();

    let code = run(&["config", "--config", config.to_str().unwrap()]).unwrap();
    assert_eq!(code, ExitCode::Success);

    assert!(run(&["config", "--config", "/no/such/file.toml"]).is_err());
}
