use checkr::cli::Cli;
use checkr::error::ExitCode;
use checkr::ledger::{FlatFileLedger, Ledger, SqliteLedger};
use checkr::checksum::Algorithm;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Directory with two top-level files and one nested file.
fn setup_tree() -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"abc").unwrap();
    fs::write(dir.path().join("b.txt"), b"second file").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested").join("c.txt"), b"nested file").unwrap();
    dir
}

fn run(args: &[&str], work: &Path) -> ExitCode {
    let config = work.join("no-config.toml");
    let mut argv = vec!["checkr", "-q", "--config", config.to_str().unwrap()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    checkr::run_app(cli).unwrap()
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap()
}

#[test]
fn test_scan_then_check_passes() {
    let data = setup_tree();
    let work = tempdir().unwrap();
    let ledger = work.path().join("ledger.csv");
    let (d, l) = (data.path().to_str().unwrap(), ledger.to_str().unwrap());

    assert_eq!(run(&["scan", d, "-r", "--csv-file", l], work.path()), ExitCode::Success);
    assert_eq!(run(&["check", d, "-r", "--csv-file", l], work.path()), ExitCode::Success);

    let records = FlatFileLedger::new(&ledger).records().unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.algorithm == "blake2b"));
}

#[test]
fn test_drift_is_detected() {
    let data = setup_tree();
    let work = tempdir().unwrap();
    let ledger = work.path().join("ledger.csv");
    let (d, l) = (data.path().to_str().unwrap(), ledger.to_str().unwrap());

    assert_eq!(
        run(&["scan", d, "--csv-file", l, "--algorithm", "md5"], work.path()),
        ExitCode::Success
    );

    let stored = FlatFileLedger::new(&ledger)
        .lookup(&canonical(&data.path().join("a.txt")), Algorithm::Md5)
        .unwrap()
        .unwrap();
    assert_eq!(stored.checksum, "900150983cd24fb0d6963f7d28e17f72");

    fs::write(data.path().join("a.txt"), b"abd").unwrap();
    assert_eq!(
        run(&["check", d, "--csv-file", l, "--algorithm", "md5"], work.path()),
        ExitCode::CheckFailed
    );
}

#[test]
fn test_non_recursive_scan_skips_subdirectories() {
    let data = setup_tree();
    let work = tempdir().unwrap();
    let ledger = work.path().join("ledger.csv");

    run(
        &["scan", data.path().to_str().unwrap(), "--csv-file", ledger.to_str().unwrap()],
        work.path(),
    );

    let records = FlatFileLedger::new(&ledger).records().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| !r.path.contains("nested")));
}

#[test]
fn test_check_without_records_is_partial() {
    let data = setup_tree();
    let work = tempdir().unwrap();
    let ledger = work.path().join("missing.csv");

    let code = run(
        &["check", data.path().to_str().unwrap(), "--csv-file", ledger.to_str().unwrap()],
        work.path(),
    );

    assert_eq!(code, ExitCode::PartialSuccess);
    assert!(!ledger.exists(), "check must not create the ledger");
}

#[test]
fn test_algorithms_are_isolated() {
    let data = setup_tree();
    let work = tempdir().unwrap();
    let ledger = work.path().join("ledger.csv");
    let (d, l) = (data.path().to_str().unwrap(), ledger.to_str().unwrap());

    run(&["scan", d, "--csv-file", l, "-a", "md5"], work.path());

    assert_eq!(
        run(&["check", d, "--csv-file", l, "-a", "sha256"], work.path()),
        ExitCode::PartialSuccess
    );
    assert_eq!(
        run(&["check", d, "--csv-file", l, "-a", "md5"], work.path()),
        ExitCode::Success
    );
}

#[test]
fn test_rescan_updates_without_duplicates_in_database() {
    let data = setup_tree();
    let work = tempdir().unwrap();
    let db = work.path().join("ledger.sqlite");
    let (d, l) = (data.path().to_str().unwrap(), db.to_str().unwrap());

    run(&["scan", d, "-r", "--db", l], work.path());
    fs::write(data.path().join("b.txt"), b"changed").unwrap();
    run(&["scan", d, "-r", "--db", l], work.path());

    let ledger = SqliteLedger::open(l).unwrap();
    let records = ledger.records().unwrap();
    assert_eq!(records.len(), 3);

    let b = ledger
        .lookup(&canonical(&data.path().join("b.txt")), Algorithm::Blake2b)
        .unwrap()
        .unwrap();
    let ts = b.timestamps.unwrap();
    assert!(ts.updated_at >= ts.created_at);

    assert_eq!(run(&["check", d, "-r", "--db", l], work.path()), ExitCode::Success);
}

#[test]
fn test_database_directory_is_created() {
    let data = setup_tree();
    let work = tempdir().unwrap();
    let db = work.path().join("deep").join("dir").join("ledger.sqlite");

    let code = run(
        &["scan", data.path().to_str().unwrap(), "--db", db.to_str().unwrap()],
        work.path(),
    );

    assert_eq!(code, ExitCode::Success);
    assert!(db.exists());
}

#[test]
fn test_parallel_jobs_store_the_same_checksums() {
    let data = setup_tree();
    for i in 0..20 {
        fs::write(data.path().join(format!("extra_{i}.bin")), vec![i as u8; 1000 + i]).unwrap();
    }
    let work = tempdir().unwrap();
    let serial = work.path().join("serial.csv");
    let parallel = work.path().join("parallel.csv");
    let d = data.path().to_str().unwrap();

    run(&["scan", d, "-r", "--csv-file", serial.to_str().unwrap()], work.path());
    run(
        &["scan", d, "-r", "--csv-file", parallel.to_str().unwrap(), "--jobs", "4"],
        work.path(),
    );

    assert_eq!(
        FlatFileLedger::new(&serial).records().unwrap(),
        FlatFileLedger::new(&parallel).records().unwrap()
    );
}

#[test]
fn test_skip_hidden() {
    let data = setup_tree();
    fs::write(data.path().join(".secret"), b"hidden").unwrap();
    let work = tempdir().unwrap();
    let ledger = work.path().join("ledger.csv");
    let (d, l) = (data.path().to_str().unwrap(), ledger.to_str().unwrap());

    run(&["scan", d, "--csv-file", l, "--skip-hidden"], work.path());
    assert_eq!(FlatFileLedger::new(&ledger).records().unwrap().len(), 2);

    run(&["scan", d, "--csv-file", l, "--no-skip-hidden"], work.path());
    assert_eq!(FlatFileLedger::new(&ledger).records().unwrap().len(), 3);
}

#[test]
fn test_empty_file_is_recorded() {
    let data = tempdir().unwrap();
    fs::write(data.path().join("empty"), b"").unwrap();
    let work = tempdir().unwrap();
    let ledger = work.path().join("ledger.csv");

    let code = run(
        &["scan", data.path().to_str().unwrap(), "--csv-file", ledger.to_str().unwrap(), "-a", "md5"],
        work.path(),
    );

    assert_eq!(code, ExitCode::Success);
    let records = FlatFileLedger::new(&ledger).records().unwrap();
    assert_eq!(records[0].checksum, "d41d8cd98f00b204e9800998ecf8427e");
}

#[test]
fn test_list_succeeds_for_each_format() {
    let data = setup_tree();
    let work = tempdir().unwrap();
    let db = work.path().join("ledger.sqlite");
    let (d, l) = (data.path().to_str().unwrap(), db.to_str().unwrap());
    run(&["scan", d, "--db", l], work.path());

    for format in ["text", "json", "csv"] {
        assert_eq!(
            run(&["list", "--db", l, "--output", format], work.path()),
            ExitCode::Success
        );
    }
    assert_eq!(run(&["list", "--db", l, "-a", "md5"], work.path()), ExitCode::Success);
}

#[test]
fn test_json_and_csv_reports_keep_exit_codes() {
    let data = setup_tree();
    let work = tempdir().unwrap();
    let ledger = work.path().join("ledger.csv");
    let (d, l) = (data.path().to_str().unwrap(), ledger.to_str().unwrap());
    run(&["scan", d, "--csv-file", l, "--output", "json"], work.path());
    fs::write(data.path().join("a.txt"), b"drifted").unwrap();

    assert_eq!(
        run(&["check", d, "--csv-file", l, "--output", "json"], work.path()),
        ExitCode::CheckFailed
    );
    assert_eq!(
        run(&["check", d, "--csv-file", l, "--output", "csv"], work.path()),
        ExitCode::CheckFailed
    );
}

#[test]
fn test_multiple_input_directories() {
    let first = setup_tree();
    let second = setup_tree();
    let work = tempdir().unwrap();
    let ledger = work.path().join("ledger.csv");

    run(
        &[
            "scan",
            first.path().to_str().unwrap(),
            second.path().to_str().unwrap(),
            "--csv-file",
            ledger.to_str().unwrap(),
        ],
        work.path(),
    );

    assert_eq!(FlatFileLedger::new(&ledger).records().unwrap().len(), 4);
}
