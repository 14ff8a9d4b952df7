use checkr::cli::{Cli, Commands};
use checkr::config::{Backend, Config};
use checkr::output::OutputFormat;
use clap::Parser;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_hierarchy_defaults_config_env_cli() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    // 1. Defaults: jobs=1, output=text, recursive=false
    let mut config = Config::default();
    assert_eq!(config.jobs, 1);
    assert_eq!(config.output, OutputFormat::Text);
    assert!(!config.recursive);

    // 2. Config file overrides defaults
    let toml_content = r#"
jobs = 2
output = "csv"
"#;
    fs::write(&config_path, toml_content).unwrap();

    config = Config::load_from_path(config_path.clone());
    assert_eq!(config.jobs, 2);
    assert_eq!(config.output, OutputFormat::Csv);
    assert!(!config.recursive);

    // 3. Environment variables override the config file
    std::env::set_var("CHECKR_JOBS", "3");
    config = Config::load_from_path(config_path.clone());
    assert_eq!(config.jobs, 3);
    assert_eq!(config.output, OutputFormat::Csv);

    // 4. CLI flags override environment variables
    let cli = Cli::try_parse_from(["checkr", "scan", ".", "--jobs", "8", "-r"]).unwrap();
    config.merge_cli(&cli);
    if let Commands::Scan(args) = &cli.command {
        config.merge_run_args(args);
    }
    assert_eq!(config.jobs, 8);
    assert!(config.recursive);
    assert_eq!(config.output, OutputFormat::Csv);

    std::env::remove_var("CHECKR_JOBS");
}

#[test]
fn test_boolean_overrides() {
    let mut config = Config {
        recursive: true,
        follow_symlinks: true,
        skip_hidden: true,
        ..Default::default()
    };

    // No flags keep the configured values
    let cli = Cli::try_parse_from(["checkr", "check"]).unwrap();
    if let Commands::Check(args) = &cli.command {
        config.merge_run_args(args);
    }
    assert!(config.recursive);
    assert!(config.follow_symlinks);
    assert!(config.skip_hidden);

    // --no-* flags turn them off
    let cli = Cli::try_parse_from([
        "checkr",
        "check",
        "--no-recursive",
        "--no-follow-symlinks",
        "--no-skip-hidden",
    ])
    .unwrap();
    if let Commands::Check(args) = &cli.command {
        config.merge_run_args(args);
    }
    assert!(!config.recursive);
    assert!(!config.follow_symlinks);
    assert!(!config.skip_hidden);
}

#[test]
fn test_ledger_flags_override_configured_backend() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "backend = \"csv\"\ncsv_file = \"/srv/a.csv\"\n").unwrap();

    let mut config = Config::load_from_path(config_path);
    assert_eq!(config.backend, Backend::Csv);

    let cli = Cli::try_parse_from(["checkr", "scan", "--db", ":memory:"]).unwrap();
    if let Commands::Scan(args) = &cli.command {
        config.merge_run_args(args);
    }
    assert_eq!(config.backend, Backend::Database);
    assert_eq!(config.database.as_deref(), Some(":memory:"));
}

#[test]
fn test_cli_paths_replace_configured_paths() {
    let mut config = Config {
        paths: vec!["/configured".into()],
        ..Default::default()
    };

    let cli = Cli::try_parse_from(["checkr", "scan"]).unwrap();
    if let Commands::Scan(args) = &cli.command {
        config.merge_run_args(args);
    }
    assert_eq!(config.input_paths(), vec![std::path::PathBuf::from("/configured")]);

    let cli = Cli::try_parse_from(["checkr", "scan", "/given"]).unwrap();
    if let Commands::Scan(args) = &cli.command {
        config.merge_run_args(args);
    }
    assert_eq!(config.input_paths(), vec![std::path::PathBuf::from("/given")]);
}
