//! Logging initialization for the CLI.

use reportvault_util::log::{self, LogConfig};
use reportvault_util::ErrorKind;
use std::path::PathBuf;
use tracing::Level;

/// Initialize logging. Logs go to stderr unless `to_file` is set, in which
/// case they are appended to the platform log file.
///
/// Returns the log file path if logging to file.
pub fn init_logging(verbose: bool, to_file: bool) -> Option<PathBuf> {
    let config = LogConfig {
        level: if verbose {
            Level::DEBUG
        } else if to_file {
            Level::INFO
        } else {
            Level::WARN
        },
        include_location: verbose,
        file: to_file.then(log::default_log_path),
    };

    match log::init(config) {
        Ok(path) => path,
        Err(e) if e.kind() == ErrorKind::Logging => {
            eprintln!("Warning: Could not initialize logging: {e}");
            None
        }
        Err(e) => {
            eprintln!("Warning: Could not open log file, logging disabled: {e}");
            None
        }
    }
}
