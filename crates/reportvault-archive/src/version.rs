//! Version identifiers and on-disk layout.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use reportvault_util::path::sanitize_file_name;
use std::path::{Path, PathBuf};

/// Timestamp format embedded in version directory and package names.
pub const TOKEN_FORMAT: &str = "%Y%m%d-%H%M%S";

/// File name of the rendered version summary.
pub const CHANGES_FILE: &str = "changes.html";

/// File name of the version metadata record.
pub const METADATA_FILE: &str = "metadata.json";

/// File name of the optional structured analysis written by a helper.
pub const ANALYSIS_FILE: &str = "analysis.json";

/// Snapshot subfolder holding the pre-change file.
pub const ORIGINAL_DIR: &str = "original";

/// Snapshot subfolder holding the post-change file.
pub const CHANGED_DIR: &str = "changed";

/// Extension of packaged versions.
pub const PACKAGE_EXTENSION: &str = "zip";

/// A version identifier: a UTC timestamp with second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionToken(DateTime<Utc>);

impl VersionToken {
    /// Token for the current second.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Token for the given instant, truncated to the second.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.with_nanosecond(0).unwrap_or(at))
    }

    /// Parse a `yyyyMMdd-HHmmss` token.
    pub fn parse(s: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(s, TOKEN_FORMAT)
            .ok()
            .map(|naive| Self(naive.and_utc()))
    }

    /// The instant this token stands for.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(TOKEN_FORMAT))
    }
}

/// The on-disk representation of one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRef {
    /// A compressed package.
    Package(PathBuf),
    /// An uncompressed version directory, kept when packaging failed.
    Directory(PathBuf),
}

impl ArtifactRef {
    pub fn path(&self) -> &Path {
        match self {
            ArtifactRef::Package(p) | ArtifactRef::Directory(p) => p,
        }
    }

    pub fn is_package(&self) -> bool {
        matches!(self, ArtifactRef::Package(_))
    }

    /// Link text used in the changelog, relative to the report root.
    pub fn link_name(&self) -> String {
        reportvault_util::path::file_name_string(self.path())
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// All versions of one report, grouped under `archive_root/<sanitized key>`.
#[derive(Debug, Clone)]
pub struct ReportArchive {
    key: String,
    sanitized_key: String,
    root: PathBuf,
}

impl ReportArchive {
    pub fn new(archive_root: &Path, key: impl Into<String>) -> Self {
        let key = key.into();
        let sanitized_key = sanitize_file_name(&key);
        let root = archive_root.join(&sanitized_key);
        Self {
            key,
            sanitized_key,
            root,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn sanitized_key(&self) -> &str {
        &self.sanitized_key
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/v<token>`
    pub fn version_dir(&self, token: &VersionToken) -> PathBuf {
        self.root.join(format!("v{token}"))
    }

    /// `<root>/<key>-<token>.zip`
    pub fn package_path(&self, token: &VersionToken) -> PathBuf {
        self.root
            .join(format!("{}-{token}.{PACKAGE_EXTENSION}", self.sanitized_key))
    }
}
