//! dude - incremental duplicate file detector
//!
//! The library is built around [`engine::ScanController`]: a pausable
//! background scan that registers files ([`registry`]), checksums them on
//! demand ([`cache`]), groups them by size and content ([`duplicates`]) and
//! tracks which copies the operator intends to relocate ([`moves`]).
//! The `dude` binary is a thin command line around it.

pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod logging;
pub mod moves;
pub mod output;
pub mod progress;
pub mod registry;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, ConfigArgs, OutputFormat, ScanArgs};
use crate::config::ProjectSettings;
use crate::engine::{ScanController, ScanEvent, ScanState};
use crate::error::ExitCode;
use crate::output::{CsvOutput, JsonOutput, ScanReport, TextOutput};
use crate::progress::ScanProgress;

/// How often the CLI loop checks for Ctrl+C while waiting for events.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run the command line application.
///
/// # Errors
///
/// Returns an error for bad settings, unreadable roots or output failures.
/// Problems with individual files never fail the run; they lead to
/// [`ExitCode::PartialSuccess`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    match cli.command {
        Commands::Scan(args) => handle_scan(args, cli.quiet),
        Commands::Config(args) => handle_config(&args),
    }
}

fn handle_config(args: &ConfigArgs) -> Result<ExitCode> {
    let settings = ProjectSettings::load(args.config.as_deref())?;
    print!("{}", settings.to_toml()?);
    Ok(ExitCode::Success)
}

/// Layer command line flags over the loaded settings.
fn apply_args(mut settings: ProjectSettings, args: &ScanArgs) -> ProjectSettings {
    settings.root.clone_from(&args.path);
    if let Some(folder) = &args.duplicates_folder {
        settings.duplicates_folder = Some(folder.clone());
    }
    if args.min_size.is_some() {
        settings.min_size = args.min_size;
    }
    if args.max_size.is_some() {
        settings.max_size = args.max_size;
    }
    settings.ignore_patterns.extend(args.ignore_patterns.iter().cloned());
    settings.verify_content |= args.verify;
    settings.skip_hidden |= args.skip_hidden;
    settings.skip_empty |= args.skip_empty;
    settings.follow_symlinks |= args.follow_symlinks;
    settings
}

fn handle_scan(args: ScanArgs, quiet: bool) -> Result<ExitCode> {
    let settings = apply_args(ProjectSettings::load(args.config.as_deref())?, &args);
    let settings = settings
        .validate()
        .with_context(|| format!("Cannot scan {}", args.path.display()))?;

    let controller = ScanController::new(settings);
    let progress = Arc::new(ScanProgress::new(quiet || args.output.is_machine_readable()));
    controller.add_observer(progress.clone());
    let events = controller.subscribe();
    let interrupt = signal::install_handler()?;

    controller.start()?;
    let mut interrupted = false;
    loop {
        if interrupt.is_interrupted() {
            // The scan may have finished on its own in the meantime.
            interrupted = matches!(controller.pause(), Ok(ScanState::Paused));
            break;
        }
        match events.recv_timeout(POLL_INTERVAL) {
            Ok(ScanEvent::StateChanged(ScanState::Finished)) => break,
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => {
                if controller.state() == ScanState::Finished {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                controller.wait();
                break;
            }
        }
    }
    progress.clear();

    let report = ScanReport::collect(&controller, args.filter.into())?;
    let exit_code = if interrupted {
        ExitCode::Interrupted
    } else if report.stats.duplicate_groups == 0 {
        ExitCode::NoDuplicates
    } else if report.stats.skipped > 0 {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    };
    log::debug!("Scan stats: {:?}", report.stats);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => TextOutput::new(&report).write_to(&mut out)?,
        OutputFormat::Json => JsonOutput::new(&report, exit_code).write_to(&mut out, true)?,
        OutputFormat::Csv => CsvOutput::new(&report).write_to(&mut out)?,
    }
    out.flush().context("Failed to write report")?;

    Ok(exit_code)
}
