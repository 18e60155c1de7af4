//! Shared utilities for reportvault.
//!
//! This crate provides common utilities used across the reportvault workspace:
//! - Error handling patterns
//! - Logging setup with tracing
//! - Path utilities (report key derivation, filename sanitization)
//! - RAII-based timing for archive operations

pub mod error;
pub mod log;
pub mod path;
pub mod timing;

pub use error::{Error, ErrorKind, Result};
pub use timing::TimingGuard;
