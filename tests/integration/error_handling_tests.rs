//! Fatal errors, partial runs and structured error reporting.

use checkr::cli::Cli;
use checkr::error::{ExitCode, StructuredError};
use clap::Parser;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn cli(args: &[&str], work: &Path) -> Cli {
    let config = work.join("no-config.toml");
    let mut argv = vec!["checkr", "-q", "--config", config.to_str().unwrap()];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

#[test]
fn test_unknown_algorithm_is_fatal() {
    let data = tempdir().unwrap();
    fs::write(data.path().join("a.txt"), b"abc").unwrap();
    let work = tempdir().unwrap();
    let ledger = work.path().join("ledger.csv");

    let err = checkr::run_app(cli(
        &[
            "scan",
            data.path().to_str().unwrap(),
            "--csv-file",
            ledger.to_str().unwrap(),
            "--algorithm",
            "md6",
        ],
        work.path(),
    ))
    .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("md6"));
    assert!(message.contains("did you mean 'md5'"));
    assert!(!ledger.exists());
}

#[test]
fn test_unknown_algorithm_creates_no_database() {
    let data = tempdir().unwrap();
    fs::write(data.path().join("a.txt"), b"abc").unwrap();
    let work = tempdir().unwrap();
    let db_dir = work.path().join("sub");
    let db = db_dir.join("ledger.sqlite");

    for command in ["scan", "check"] {
        let result = checkr::run_app(cli(
            &[
                command,
                data.path().to_str().unwrap(),
                "--db",
                db.to_str().unwrap(),
                "-a",
                "md6",
            ],
            work.path(),
        ));
        assert!(result.is_err(), "{command} should fail");
    }
    let result = checkr::run_app(cli(
        &["list", "--db", db.to_str().unwrap(), "-a", "md6"],
        work.path(),
    ));
    assert!(result.is_err());

    assert!(!db.exists());
    assert!(!db_dir.exists());
}

#[test]
fn test_corrupt_flat_file_is_fatal() {
    let data = tempdir().unwrap();
    fs::write(data.path().join("a.txt"), b"abc").unwrap();
    let work = tempdir().unwrap();
    let ledger = work.path().join("ledger.csv");
    let corrupt = "filename,algorithm,checksum\n/somewhere,md5\n";
    fs::write(&ledger, corrupt).unwrap();

    for command in ["scan", "check"] {
        let result = checkr::run_app(cli(
            &[
                command,
                data.path().to_str().unwrap(),
                "--csv-file",
                ledger.to_str().unwrap(),
            ],
            work.path(),
        ));
        assert!(result.is_err(), "{command} should fail on a corrupt ledger");
    }

    assert_eq!(fs::read_to_string(&ledger).unwrap(), corrupt);
}

#[test]
fn test_garbage_database_is_fatal() {
    let work = tempdir().unwrap();
    let db = work.path().join("ledger.sqlite");
    fs::write(&db, b"this is not a sqlite database, just some bytes").unwrap();

    let result = checkr::run_app(cli(&["list", "--db", db.to_str().unwrap()], work.path()));

    assert!(result.is_err());
}

#[test]
fn test_missing_input_directory_is_partial() {
    let data = tempdir().unwrap();
    fs::write(data.path().join("a.txt"), b"abc").unwrap();
    let work = tempdir().unwrap();
    let ledger = work.path().join("ledger.csv");
    let missing = work.path().join("does-not-exist");

    let code = checkr::run_app(cli(
        &[
            "scan",
            missing.to_str().unwrap(),
            data.path().to_str().unwrap(),
            "--csv-file",
            ledger.to_str().unwrap(),
        ],
        work.path(),
    ))
    .unwrap();

    assert_eq!(code, ExitCode::PartialSuccess);
    assert!(fs::read_to_string(&ledger).unwrap().contains("a.txt"));
}

#[test]
fn test_file_given_as_input_is_partial() {
    let data = tempdir().unwrap();
    let file = data.path().join("a.txt");
    fs::write(&file, b"abc").unwrap();
    let work = tempdir().unwrap();
    let ledger = work.path().join("ledger.csv");

    let code = checkr::run_app(cli(
        &["scan", file.to_str().unwrap(), "--csv-file", ledger.to_str().unwrap()],
        work.path(),
    ))
    .unwrap();

    assert_eq!(code, ExitCode::PartialSuccess);
}

#[test]
fn test_csv_backend_without_file_is_fatal() {
    let work = tempdir().unwrap();
    let config = work.path().join("config.toml");
    fs::write(&config, "backend = \"csv\"\n").unwrap();

    let cli = Cli::try_parse_from(["checkr", "-q", "--config", config.to_str().unwrap(), "list"])
        .unwrap();
    let err = checkr::run_app(cli).unwrap_err();

    assert!(err.to_string().contains("csv_file"));
}

#[test]
fn test_structured_error_carries_context_chain() {
    let work = tempdir().unwrap();
    let db = work.path().join("ledger.sqlite");
    fs::write(&db, b"not a database").unwrap();

    let err = checkr::run_app(cli(&["list", "--db", db.to_str().unwrap()], work.path()))
        .unwrap_err();
    let structured = StructuredError::new(&err, ExitCode::GeneralError);
    let json: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&structured).unwrap()).unwrap();

    assert_eq!(json["code"], "CK001");
    assert_eq!(json["exit_code"], 1);
    assert_eq!(json["interrupted"], false);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to open ledger"));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped_not_failed() {
    use std::os::unix::fs::PermissionsExt;

    let data = tempdir().unwrap();
    fs::write(data.path().join("a.txt"), b"abc").unwrap();
    let locked = data.path().join("locked.txt");
    fs::write(&locked, b"secret").unwrap();
    let work = tempdir().unwrap();
    let ledger = work.path().join("ledger.csv");
    let (d, l) = (data.path().to_str().unwrap(), ledger.to_str().unwrap());

    checkr::run_app(cli(&["scan", d, "--csv-file", l], work.path())).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can still read the file.
    if fs::read(&locked).is_ok() {
        return;
    }

    let code = checkr::run_app(cli(&["check", d, "--csv-file", l], work.path())).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(code, ExitCode::PartialSuccess);
}
