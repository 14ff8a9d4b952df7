use checkr::cli::Cli;
use checkr::config::{Backend, Config};
use checkr::error::ExitCode;
use checkr::ledger::{FlatFileLedger, Ledger, LedgerLocation};
use checkr::output::OutputFormat;
use clap::Parser;
use figment::providers::Serialized;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = figment::Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config.algorithm, "blake2b");
    assert_eq!(config.backend, Backend::Database);
    assert_eq!(config.output, OutputFormat::Text);
    assert_eq!(config.jobs, 1);
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
paths = ["/srv/archive", "/srv/photos"]
algorithm = "md5"
recursive = true
backend = "csv"
csv_file = "/srv/checksums.csv"
skip_hidden = true
output = "json"
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load_from_path(config_path);
    assert_eq!(
        config.paths,
        vec![PathBuf::from("/srv/archive"), PathBuf::from("/srv/photos")]
    );
    assert_eq!(config.algorithm, "md5");
    assert!(config.recursive);
    assert!(config.skip_hidden);
    assert_eq!(config.output, OutputFormat::Json);
    assert_eq!(
        config.ledger_location().unwrap(),
        LedgerLocation::Csv(PathBuf::from("/srv/checksums.csv"))
    );
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let temp_dir = tempdir().unwrap();
    let config = Config::load_from_path(temp_dir.path().join("absent.toml"));
    assert_eq!(config.algorithm, "blake2b");
    assert_eq!(config.backend, Backend::Database);
}

#[test]
fn test_invalid_config_falls_back_to_defaults() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "recursive = \"sometimes\"\nalgorithm = \"md5\"\n").unwrap();

    assert!(Config::try_load_from_path(&config_path).is_err());
    let config = Config::load_from_path(config_path);
    assert_eq!(config.algorithm, "blake2b");
    assert!(!config.recursive);
}

#[test]
fn test_unknown_backend_is_invalid() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "backend = \"postgres\"\n").unwrap();

    assert!(Config::try_load_from_path(&config_path).is_err());
}

#[test]
fn test_config_file_drives_a_run() {
    let data = tempdir().unwrap();
    fs::create_dir(data.path().join("sub")).unwrap();
    fs::write(data.path().join("sub").join("deep.txt"), b"deep").unwrap();
    fs::write(data.path().join("top.txt"), b"top").unwrap();

    let work = tempdir().unwrap();
    let ledger = work.path().join("from-config.csv");
    let config_path = work.path().join("config.toml");
    let toml_content = format!(
        "paths = [{:?}]\nalgorithm = \"sha256\"\nrecursive = true\nbackend = \"csv\"\ncsv_file = {:?}\n",
        data.path().to_str().unwrap(),
        ledger.to_str().unwrap()
    );
    fs::write(&config_path, toml_content).unwrap();

    let cli = Cli::try_parse_from(["checkr", "-q", "--config", config_path.to_str().unwrap(), "scan"])
        .unwrap();
    assert_eq!(checkr::run_app(cli).unwrap(), ExitCode::Success);

    let records = FlatFileLedger::new(&ledger).records().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.algorithm == "sha256" && r.checksum.len() == 64));
}

#[test]
fn test_log_file_from_cli() {
    let work = tempdir().unwrap();
    let log_path = work.path().join("logs").join("checkr.log");
    let cli = Cli::try_parse_from(["checkr", "--log", log_path.to_str().unwrap(), "list"]).unwrap();

    let mut config = Config::default();
    config.merge_cli(&cli);
    assert_eq!(config.log_file, Some(log_path));
}
