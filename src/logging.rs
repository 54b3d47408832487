//! Logging setup for the command-line tool
//!
//! Console output plus daily-rotating files in the platform data directory
//! (or a directory given on the command line). The library itself only
//! emits `tracing` events; installing a subscriber is the binary's job.
//!
//! ```no_run
//! use prices_predictor::logging;
//!
//! logging::init(None).expect("Failed to initialize logging");
//! tracing::info!("Pipeline starting");
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

const APP_DIR: &str = "prices-predictor";
const LOG_PREFIX: &str = "pipeline";
const ERROR_LOG_PREFIX: &str = "error";
const MAX_LOG_FILES: usize = 10;

/// Gets the log directory path based on platform conventions
///
/// Returns:
/// - Windows: `%APPDATA%/prices-predictor/logs`
/// - macOS: `~/Library/Application Support/prices-predictor/logs`
/// - Linux: `~/.local/share/prices-predictor/logs`
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    Ok(base_dir.join(APP_DIR).join("logs"))
}

fn ensure_dir(log_dir: &Path) -> Result<()> {
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }
    Ok(())
}

fn appender(log_dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("Failed to create {prefix} log file appender"))
}

/// Initializes console and file logging
///
/// Creates two daily-rotated files in the log directory:
/// - `pipeline.<date>.log`: everything passing the filter
/// - `error.<date>.log`: warnings and errors only
///
/// The filter defaults to `info` and can be overridden with `RUST_LOG`.
///
/// # Errors
///
/// Returns error if the log directory cannot be created, an appender fails,
/// or a global subscriber is already installed.
pub fn init(log_dir: Option<PathBuf>) -> Result<PathBuf> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => get_log_dir()?,
    };
    ensure_dir(&log_dir)?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(appender(&log_dir, LOG_PREFIX)?);

    let error_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(appender(&log_dir, ERROR_LOG_PREFIX)?)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!("Logging initialized, log directory: {}", log_dir.display());
    Ok(log_dir)
}

/// Path of today's main log file in `log_dir`
pub fn current_log_path(log_dir: &Path) -> PathBuf {
    let today = chrono::Local::now().format("%Y-%m-%d");
    log_dir.join(format!("{LOG_PREFIX}.{today}.log"))
}
