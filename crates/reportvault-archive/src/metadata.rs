//! The `metadata.json` record stored in every version.

use crate::analyzer::AnalysisVia;
use crate::fingerprint::DiffSummary;
use crate::version::METADATA_FILE;
use crate::ArchiveResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::path::Path;
use tokio::fs;

/// Metadata persisted alongside each version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionMetadata {
    pub report: String,
    pub created_utc: DateTime<Utc>,
    pub message: String,
    pub original: FileRecord,
    pub changed: FileRecord,
    pub diff: DiffStats,
    /// Which analysis path produced the optional report.
    pub crystal: AnalysisRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File name inside the snapshot folder.
    pub path: String,
    pub sha256: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffStats {
    pub different_bytes: u64,
    #[serde(serialize_with = "two_decimals")]
    pub difference_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub via: AnalysisVia,
}

fn two_decimals<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((value * 100.0).round() / 100.0)
}

impl VersionMetadata {
    pub fn new(
        report: &str,
        message: &str,
        original_name: &str,
        changed_name: &str,
        diff: &DiffSummary,
        via: AnalysisVia,
    ) -> Self {
        Self {
            report: report.to_string(),
            created_utc: Utc::now(),
            message: message.to_string(),
            original: FileRecord {
                path: original_name.to_string(),
                sha256: diff.original_sha256.clone(),
                size: diff.original_size,
            },
            changed: FileRecord {
                path: changed_name.to_string(),
                sha256: diff.changed_sha256.clone(),
                size: diff.changed_size,
            },
            diff: DiffStats {
                different_bytes: diff.different_bytes,
                difference_percent: diff.difference_percent,
            },
            crystal: AnalysisRecord { via },
        }
    }

    /// Write `metadata.json` into a version directory.
    ///
    /// The record is the last file written for a version and lands via
    /// rename, so its presence marks the version content as complete.
    pub async fn write(&self, version_dir: &Path) -> ArchiveResult<()> {
        let path = version_dir.join(METADATA_FILE);
        let content = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    pub async fn read(version_dir: &Path) -> ArchiveResult<Self> {
        let content = fs::read_to_string(version_dir.join(METADATA_FILE)).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_diff() -> DiffSummary {
        DiffSummary {
            original_sha256: "AAAA".into(),
            changed_sha256: "BBBB".into(),
            original_size: 3,
            changed_size: 3,
            different_bytes: 1,
            difference_percent: 100.0 / 3.0,
        }
    }

    #[test]
    fn test_field_names() {
        let meta = VersionMetadata::new(
            "Invoice",
            "Fix totals",
            "Invoice.rpt",
            "Invoice v2.rpt",
            &sample_diff(),
            AnalysisVia::Helper,
        );
        let value = serde_json::to_value(&meta).unwrap();

        assert_eq!(value["report"], "Invoice");
        assert!(value["createdUtc"].is_string());
        assert_eq!(value["original"]["path"], "Invoice.rpt");
        assert_eq!(value["changed"]["sha256"], "BBBB");
        assert_eq!(value["changed"]["size"], 3);
        assert_eq!(value["diff"]["differentBytes"], 1);
        assert_eq!(value["diff"]["differencePercent"], 33.33);
        assert_eq!(value["crystal"]["via"], "helper");
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let dir = TempDir::new().unwrap();
        let meta = VersionMetadata::new("r", "", "a", "b", &sample_diff(), AnalysisVia::None);
        meta.write(dir.path()).await.unwrap();

        assert!(!dir.path().join("metadata.json.tmp").exists());
        let loaded = VersionMetadata::read(dir.path()).await.unwrap();
        assert_eq!(loaded.report, "r");
        assert_eq!(loaded.crystal.via, AnalysisVia::None);
        assert_eq!(loaded.diff.difference_percent, 33.33);
    }
}
