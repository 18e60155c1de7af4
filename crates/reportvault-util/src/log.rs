//! Logging setup using tracing.
//!
//! The archive engine logs through `tracing` macros; binaries call [`init`]
//! once at startup to install a subscriber.

use crate::{Error, Result};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Default filter directive for the reportvault crates at `level`.
fn directive(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    ["reportvault", "reportvault_archive", "reportvault_util"]
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Logging configuration.
#[derive(Debug)]
pub struct LogConfig {
    /// Log level used when `RUST_LOG` is not set.
    pub level: Level,
    /// Whether to include file/line info in logs.
    pub include_location: bool,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            include_location: false,
            file: None,
        }
    }
}

/// Initialize logging with the given configuration.
///
/// Returns the log file path when logging to a file. Calling this twice
/// returns an error instead of panicking.
pub fn init(config: LogConfig) -> Result<Option<PathBuf>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(config.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    match config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::from(e).at(parent))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| Error::from(e).at(&path))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
                .map_err(|e| Error::logging(e.to_string()))?;
            Ok(Some(path))
        }
        None => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| Error::logging(e.to_string()))?;
            Ok(None)
        }
    }
}

/// Get the default log file path.
///
/// macOS: `~/Library/Logs/reportvault`, Linux: `~/.local/state/reportvault/logs`,
/// Windows: `%LOCALAPPDATA%/reportvault/logs`.
pub fn default_log_path() -> PathBuf {
    log_dir().join("reportvault.log")
}

fn log_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = dirs::home_dir() {
            return home.join("Library/Logs/reportvault");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(state_dir) = dirs::state_dir() {
            return state_dir.join("reportvault/logs");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(local_app) = dirs::data_local_dir() {
            return local_app.join("reportvault/logs");
        }
    }

    PathBuf::from(".reportvault/logs")
}
