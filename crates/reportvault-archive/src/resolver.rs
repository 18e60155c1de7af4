//! Finding version artifacts under a report root.
//!
//! Version identity is encoded in names (`v<token>` directories and
//! `<key>-<token>.zip` packages). All knowledge of that encoding stays in
//! this module.

use crate::version::{ArtifactRef, VersionToken, PACKAGE_EXTENSION};
use crate::ArchiveResult;
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Length of a `yyyyMMdd-HHmmss` token.
const TOKEN_LEN: usize = 15;

/// A version artifact with its ranking key.
#[derive(Debug, Clone)]
pub struct VersionCandidate {
    pub artifact: ArtifactRef,
    /// Token parsed from the name, if the name follows the convention.
    pub token: Option<VersionToken>,
    /// Token instant, or the modification time when no token parsed.
    pub rank: DateTime<Utc>,
}

/// Return the most recent version artifact under `report_root`.
pub async fn find_latest(report_root: &Path) -> ArchiveResult<Option<ArtifactRef>> {
    let candidates = list_versions(report_root).await?;
    Ok(candidates.into_iter().next().map(|c| c.artifact))
}

/// All version artifacts under `report_root`, newest first.
///
/// A missing report root has no versions.
pub async fn list_versions(report_root: &Path) -> ArchiveResult<Vec<VersionCandidate>> {
    let mut entries = match fs::read_dir(report_root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        let (artifact, token) = if file_type.is_file() && is_package_name(&name) {
            let token = package_token(&name);
            (ArtifactRef::Package(path), token)
        } else if file_type.is_dir() && is_version_dir_name(&name) {
            let token = VersionToken::parse(&name[1..]);
            (ArtifactRef::Directory(path), token)
        } else {
            continue;
        };

        let rank = match token {
            Some(token) => token.as_datetime(),
            None => {
                let modified = entry.metadata().await?.modified()?;
                DateTime::<Utc>::from(modified)
            }
        };

        debug!(artifact = %artifact, %rank, "Found version candidate");
        candidates.push(VersionCandidate {
            artifact,
            token,
            rank,
        });
    }

    candidates.sort_by(|a, b| b.rank.cmp(&a.rank));
    Ok(candidates)
}

fn is_package_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PACKAGE_EXTENSION))
}

fn is_version_dir_name(name: &str) -> bool {
    name.starts_with('v') || name.starts_with('V')
}

/// The token trailing a package stem: `<key>-<yyyyMMdd-HHmmss>.zip`.
fn package_token(name: &str) -> Option<VersionToken> {
    let stem = Path::new(name).file_stem()?.to_str()?;
    let start = stem.len().checked_sub(TOKEN_LEN)?;
    if !stem.is_char_boundary(start) {
        return None;
    }
    VersionToken::parse(&stem[start..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_package_token() {
        let token = package_token("Invoice-20240102-030405.zip").unwrap();
        assert_eq!(token.to_string(), "20240102-030405");
        assert!(package_token("Invoice.zip").is_none());
        assert!(package_token("Invoice-latest.zip").is_none());
    }

    #[test]
    fn test_package_token_with_dashed_key() {
        let token = package_token("Q1-Sales-report-20240102-030405.ZIP").unwrap();
        assert_eq!(token.to_string(), "20240102-030405");
    }

    #[tokio::test]
    async fn test_missing_root_has_no_versions() {
        let dir = TempDir::new().unwrap();
        let latest = find_latest(&dir.path().join("nope")).await.unwrap();
        assert!(latest.is_none());
    }

    #[tokio::test]
    async fn test_latest_by_token_across_kinds() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::write(root.join("Invoice-20240101-000000.zip"), b"zip").unwrap();
        std::fs::create_dir(root.join("v20240301-000000")).unwrap();
        std::fs::write(root.join("Invoice-20240201-000000.zip"), b"zip").unwrap();
        std::fs::write(root.join("ChangeLog-Invoice.html"), b"<html>").unwrap();
        std::fs::create_dir(root.join(".restore-20240401000000000")).unwrap();

        let latest = find_latest(root).await.unwrap().unwrap();
        assert_eq!(
            latest,
            ArtifactRef::Directory(root.join("v20240301-000000"))
        );

        let all = list_versions(root).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].rank > all[1].rank && all[1].rank > all[2].rank);
    }

    #[tokio::test]
    async fn test_unparseable_name_falls_back_to_mtime() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::write(root.join("Invoice-20200101-000000.zip"), b"zip").unwrap();
        std::fs::create_dir(root.join("vnext")).unwrap();

        // "vnext" ranks by its modification time, which is after 2020.
        let latest = find_latest(root).await.unwrap().unwrap();
        assert_eq!(latest, ArtifactRef::Directory(root.join("vnext")));

        let all = list_versions(root).await.unwrap();
        assert!(all[0].token.is_none());
        assert!(all[1].token.is_some());
    }
}
