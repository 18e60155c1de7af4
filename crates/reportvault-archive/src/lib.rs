//! Versioned report archive engine.
//!
//! Every archive run stores the pre-change and post-change report side by
//! side with a binary difference summary, packages the version as a zip and
//! records the event in a per-report changelog. A revert reinstates the
//! original snapshot of the most recent version.
//!
//! # Example
//!
//! ```no_run
//! use reportvault_archive::{ArchiveConfig, ArchiveStore};
//! use std::path::Path;
//!
//! # async fn example() -> reportvault_archive::ArchiveResult<()> {
//! let store = ArchiveStore::new(ArchiveConfig::default());
//! let version = store
//!     .archive(Path::new("Invoice.rpt"), Path::new("Invoice-edited.rpt"), None, "Fix totals")
//!     .await?;
//! println!("{}", version.summary());
//!
//! store.revert(Path::new("Invoice.rpt"), None).await?;
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod changelog;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod html;
pub mod lock;
pub mod metadata;
pub mod package;
pub mod resolver;
pub mod restore;
pub mod store;
pub mod version;

pub use analyzer::{
    Analysis, AnalysisRequest, AnalysisVia, AnalyzerChain, HelperAnalyzer, ReportAnalyzer,
};
pub use changelog::{Changelog, LedgerEntry};
pub use config::{ArchiveConfig, HelperConfig};
pub use error::{ArchiveError, ArchiveResult};
pub use fingerprint::DiffSummary;
pub use metadata::VersionMetadata;
pub use package::{Compression, Packager, ZipPackager};
pub use resolver::{find_latest, list_versions, VersionCandidate};
pub use restore::RevertOutcome;
pub use store::{ArchiveStore, Replacement, VersionResult};
pub use version::{ArtifactRef, ReportArchive, VersionToken};
