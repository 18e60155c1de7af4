//! Command handlers for the reportvault CLI.

pub mod archive;
pub mod config;
pub mod inspect;
pub mod logging;

pub use archive::*;
pub use config::*;
pub use inspect::*;
pub use logging::*;
