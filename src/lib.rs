//! checkr - File Integrity Checker
//!
//! Records a checksum for every file under a set of directories and later
//! recomputes them to find files whose content has drifted. Checksums live in
//! a ledger: either a CSV flat file or a SQLite database.

pub mod checksum;
pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod workflow;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::checksum::Algorithm;
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::error::ExitCode;
use crate::ledger::{ChecksumRecord, Ledger, LedgerLocation};
use crate::output::json::JsonBody;
use crate::output::{CsvOutput, JsonOutput, OutputFormat, TextOutput};
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::{collect_files, FileList};
use crate::workflow::Workflow;

/// Run the application for parsed command-line arguments.
///
/// Returns the process exit code for completed runs. Errors are fatal
/// conditions: an invalid configuration, an unsupported algorithm, or a
/// ledger that cannot be opened, read or written.
///
/// # Errors
///
/// Returns an error if the run cannot complete.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let (mut config, config_warning) = load_config(cli.config.as_deref());
    config.merge_cli(&cli);
    match cli.command {
        Commands::Scan(ref args) | Commands::Check(ref args) => config.merge_run_args(args),
        Commands::List(ref args) => config.merge_list_args(args),
    }

    logging::init_logging(cli.verbose, cli.quiet, config.log_file.as_deref())
        .context("Failed to open log file")?;
    if let Some(warning) = config_warning {
        log::warn!("{warning}");
    }
    if cli.no_color {
        yansi::disable();
    }
    if log::log_enabled!(log::Level::Debug) {
        match config.to_toml() {
            Ok(toml) => log::debug!("Effective configuration:\n{}", toml.trim_end()),
            Err(e) => log::debug!("Effective configuration: {:?} ({})", config, e),
        }
    }

    // Reject a bad algorithm before anything is created on disk.
    let filter = match cli.command {
        Commands::Scan(_) | Commands::Check(_) => {
            config.algorithm()?;
            None
        }
        Commands::List(ref args) => args
            .ledger
            .algorithm
            .as_deref()
            .map(str::parse::<Algorithm>)
            .transpose()?,
    };

    let location = config.ledger_location()?;
    prepare_location(&location)?;
    let ledger: Arc<dyn Ledger> = Arc::from(
        location
            .open()
            .with_context(|| format!("Failed to open ledger {location}"))?,
    );
    log::info!("Using {} ledger at {}", ledger.backend_name(), location);

    match cli.command {
        Commands::Scan(_) => run_scan(&cli, &config, ledger, &location),
        Commands::Check(_) => run_check(&cli, &config, ledger, &location),
        Commands::List(_) => run_list(&cli, &config, ledger.as_ref(), &location, filter),
    }
}

fn run_scan(
    cli: &Cli,
    config: &Config,
    ledger: Arc<dyn Ledger>,
    location: &LedgerLocation,
) -> anyhow::Result<ExitCode> {
    let algorithm = config.algorithm()?;
    let (workflow, files) = prepare_run(cli, config, ledger, algorithm)?;

    let summary = workflow.scan(&files.files)?;
    let exit_code = ExitCode::for_scan(&summary, files.errors.len());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match config.output {
        OutputFormat::Text => TextOutput::new(cli.verbose > 0).write_scan(&summary, &mut out)?,
        OutputFormat::Json => {
            JsonOutput::new(JsonBody::Scan { summary: &summary }, location, exit_code)
                .with_algorithm(algorithm)
                .write_to(&mut out)?;
        }
        OutputFormat::Csv => CsvOutput::new().write_scan(&summary, &mut out)?,
    }
    out.flush()?;

    Ok(exit_code)
}

fn run_check(
    cli: &Cli,
    config: &Config,
    ledger: Arc<dyn Ledger>,
    location: &LedgerLocation,
) -> anyhow::Result<ExitCode> {
    let algorithm = config.algorithm()?;
    let (workflow, files) = prepare_run(cli, config, ledger, algorithm)?;

    let summary = workflow.check(&files.files)?;
    let exit_code = ExitCode::for_check(&summary, files.errors.len());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match config.output {
        OutputFormat::Text => TextOutput::new(cli.verbose > 0).write_check(&summary, &mut out)?,
        OutputFormat::Json => {
            JsonOutput::new(JsonBody::Check { summary: &summary }, location, exit_code)
                .with_algorithm(algorithm)
                .write_to(&mut out)?;
        }
        OutputFormat::Csv => CsvOutput::new().write_check(&summary, &mut out)?,
    }
    out.flush()?;

    Ok(exit_code)
}

fn run_list(
    cli: &Cli,
    config: &Config,
    ledger: &dyn Ledger,
    location: &LedgerLocation,
    filter: Option<Algorithm>,
) -> anyhow::Result<ExitCode> {
    let records: Vec<ChecksumRecord> = ledger
        .records()
        .with_context(|| format!("Failed to read ledger {location}"))?
        .into_iter()
        .filter(|r| filter.map_or(true, |a| r.algorithm == a.as_str()))
        .collect();
    log::debug!("Listing {} records", records.len());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match config.output {
        OutputFormat::Text => TextOutput::new(cli.verbose > 0).write_records(&records, &mut out)?,
        OutputFormat::Json => {
            let mut doc =
                JsonOutput::new(JsonBody::List { records: &records }, location, ExitCode::Success);
            if let Some(algorithm) = filter {
                doc = doc.with_algorithm(algorithm);
            }
            doc.write_to(&mut out)?;
        }
        OutputFormat::Csv => CsvOutput::new().write_records(&records, &mut out)?,
    }
    out.flush()?;

    Ok(ExitCode::Success)
}

/// Load the config file, or defaults if it is invalid. The warning is
/// returned so it can be logged once logging is set up.
fn load_config(path: Option<&Path>) -> (Config, Option<String>) {
    let Some(path) = path.map(Path::to_path_buf).or_else(Config::default_config_path) else {
        return (Config::default(), None);
    };
    match Config::try_load_from_path(&path) {
        Ok(config) => (config, None),
        Err(e) => (
            Config::default(),
            Some(format!(
                "Invalid configuration in {}, using defaults: {}",
                path.display(),
                e
            )),
        ),
    }
}

/// Resolve the input files and build a workflow wired to Ctrl+C and the
/// progress bars.
fn prepare_run(
    cli: &Cli,
    config: &Config,
    ledger: Arc<dyn Ledger>,
    algorithm: Algorithm,
) -> anyhow::Result<(Workflow, FileList)> {
    let shutdown = signal::install_handler().context("Failed to install signal handler")?;
    let progress = Arc::new(Progress::new(cli.quiet || config.output != OutputFormat::Text));

    let paths = config.input_paths();
    progress.on_phase_start("walking", 0);
    let files = collect_files(&paths, &config.walker_config(), Some(shutdown.get_flag()));
    progress.on_phase_end("walking");

    let workflow = Workflow::new(ledger, algorithm)
        .with_jobs(config.jobs)
        .with_shutdown_flag(shutdown.get_flag())
        .with_progress_callback(progress);

    Ok((workflow, files))
}

/// Make sure the directory holding a database file exists.
fn prepare_location(location: &LedgerLocation) -> anyhow::Result<()> {
    let LedgerLocation::Database(db) = location else {
        return Ok(());
    };
    if db == ":memory:" || db.starts_with("file:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(db).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}
