//! Logging setup: console output plus a daily log file

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// `Log_<YYYYMMDD>.txt`
pub fn log_file_name(date: NaiveDate) -> String {
    format!("Log_{}.txt", date.format("%Y%m%d"))
}

/// `<data-local dir>/projects-manager/logs`
pub fn log_directory() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("projects-manager").join("logs"))
}

fn open_log_file(dir: &Path, date: NaiveDate) -> Result<(File, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let path = dir.join(log_file_name(date));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    Ok((file, path))
}

/// Console logging filtered by `RUST_LOG` (default `info`, `debug` when
/// verbose) and a debug-level daily file. Without a usable log file only the
/// console layer is installed. Returns the log file path.
pub fn init_logging(verbose: bool) -> Option<PathBuf> {
    let console_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let opened = log_directory()
        .context("No local data directory for log files")
        .and_then(|dir| open_log_file(&dir, Local::now().date_naive()));

    let (file_layer, log_path, file_error) = match opened {
        Ok((file, path)) => {
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(EnvFilter::new(format!("{}=debug", env!("CARGO_CRATE_NAME"))));
            (Some(layer), Some(path), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(console_filter))
        .with(file_layer)
        .init();

    match (&log_path, file_error) {
        (Some(path), _) => debug!("Logging to {}", path.display()),
        (None, Some(e)) => warn!("File logging disabled: {:#}", e),
        (None, None) => {}
    }

    log_path
}
