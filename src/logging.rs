//! Logging setup using the `log` facade and `env_logger` backend.
//!
//! Level priority:
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only) or `-v`/`-vv` (debug/trace)
//! 3. Default: info
//!
//! The engine logs run boundaries at info, state transitions and group
//! creation at debug, per-file decisions at trace, and every skipped path
//! at warn. Lines from the scan worker carry its thread name (`dude-scan`)
//! in debug builds.
//!
//! # Example
//!
//! ```rust,no_run
//! use dude::logging::init_logging;
//!
//! init_logging(1, false); // debug
//! log::debug!("Logging ready");
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Dependencies that are chatty at debug level.
const QUIET_MODULES: &[&str] = &["ignore", "globset"];

/// Initialize logging from CLI verbosity flags.
///
/// Later calls are ignored, since `env_logger` can only be installed once
/// per process.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=info, 1=debug, 2+=trace)
/// * `quiet` - If true, only show errors (overridden by `RUST_LOG`)
pub fn init_logging(verbose: u8, quiet: bool) {
    let from_env = env::var("RUST_LOG").is_ok();
    let level = determine_level(verbose, quiet);

    let mut builder = Builder::new();
    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
        for module in QUIET_MODULES {
            builder.filter_module(module, level.min(LevelFilter::Info));
        }
    }
    configure_format(&mut builder);

    if builder.try_init().is_err() {
        return;
    }
    if from_env {
        log::debug!("Logging initialized from RUST_LOG");
    } else {
        log::debug!("Logging initialized at level {:?}", level);
    }
}

/// Map CLI flags to a level filter. `quiet` wins over `verbose`.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Debug builds: timestamp, level, thread and module. Release builds:
/// level and message.
fn configure_format(builder: &mut Builder) {
    #[cfg(debug_assertions)]
    builder.format(|buf, record| {
        let level_style = buf.default_level_style(record.level());
        let thread = std::thread::current();
        writeln!(
            buf,
            "{} {level_style}{:<5}{level_style:#} ({}) [{}] {}",
            buf.timestamp_seconds(),
            record.level(),
            thread.name().unwrap_or("-"),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });

    #[cfg(not(debug_assertions))]
    builder.format(|buf, record| {
        let level_style = buf.default_level_style(record.level());
        writeln!(
            buf,
            "{level_style}{:<5}{level_style:#} {}",
            record.level(),
            record.args()
        )
    });
}
