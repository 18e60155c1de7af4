//! Reinstating the most recent archived original.

use crate::changelog::{Changelog, LedgerEntry};
use crate::resolver;
use crate::store::{ensure_file, ArchiveStore};
use crate::version::{ArtifactRef, ReportArchive, ORIGINAL_DIR};
use crate::{ArchiveError, ArchiveResult};
use chrono::Utc;
use reportvault_util::path::file_name_string;
use reportvault_util::TimingGuard;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

const REVERT_MESSAGE: &str = "Reverted to previous version";

const REVERT_DIFF_HTML: &str =
    "<p class='muted'>Reversion operation. See previous entries for diff details.</p>";

/// Result of a successful revert.
#[derive(Debug, Clone)]
pub struct RevertOutcome {
    pub report_key: String,
    /// Artifact the snapshot was taken from.
    pub restored_from: ArtifactRef,
    /// Backup of the replaced working file, when one was made.
    pub backup: Option<PathBuf>,
    pub target: PathBuf,
}

impl RevertOutcome {
    pub fn summary(&self) -> String {
        let mut line = format!(
            "Restored {} from {}",
            self.target.display(),
            self.restored_from
        );
        if let Some(backup) = &self.backup {
            line.push_str(&format!(" (backup: {})", backup.display()));
        }
        line
    }
}

/// Extraction directory removed on drop, whichever step failed.
struct ScratchDir(PathBuf);

impl ScratchDir {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.0) {
            Ok(()) => debug!(path = %self.0.display(), "Removed restore scratch directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Could not remove restore scratch directory {}: {}",
                self.0.display(),
                e
            ),
        }
    }
}

impl ArchiveStore {
    /// Replace `original` with the original snapshot of the latest version.
    pub async fn revert(
        &self,
        original: &Path,
        archive_root: Option<&Path>,
    ) -> ArchiveResult<RevertOutcome> {
        ensure_file(original, "Original")?;

        let report = self.report_archive(original, archive_root);
        if !report.root().is_dir() {
            return Err(ArchiveError::not_found(format!(
                "Report archive folder not found: {}",
                report.root().display()
            )));
        }

        let _guard = self.locks.acquire(report.sanitized_key()).await;
        let _timing = TimingGuard::revert(report.key());

        let artifact = resolver::find_latest(report.root()).await?.ok_or_else(|| {
            ArchiveError::not_found(format!(
                "No archived versions found in {}",
                report.root().display()
            ))
        })?;
        info!(report = report.key(), artifact = %artifact, "Reverting");

        let file_name = file_name_string(original);
        let (_scratch, snapshot) = match &artifact {
            ArtifactRef::Package(package) => {
                let scratch = self.extract(&report, package).await?;
                let snapshot = scratch.path().join(ORIGINAL_DIR).join(&file_name);
                (Some(scratch), snapshot)
            }
            ArtifactRef::Directory(dir) => (None, dir.join(ORIGINAL_DIR).join(&file_name)),
        };

        if !snapshot.is_file() {
            return Err(ArchiveError::restore_integrity(format!(
                "Archived original not found in {}",
                artifact
            )));
        }

        let backup = if self.config.backup_on_revert() {
            self.backup(original).await
        } else {
            None
        };

        fs::copy(&snapshot, original)
            .await
            .map_err(|e| ArchiveError::io_at(original, e))?;
        info!(target = %original.display(), "Reverted from {}", artifact);

        let token = Utc::now().format(crate::version::TOKEN_FORMAT).to_string();
        let link = artifact.link_name();
        Changelog::append(
            report.root(),
            report.key(),
            &LedgerEntry {
                token: &token,
                message: REVERT_MESSAGE,
                original_name: &file_name,
                changed_name: &file_name,
                diff_html: REVERT_DIFF_HTML,
                analysis_html: None,
                artifact_link: Some(&link),
            },
        )
        .await;

        Ok(RevertOutcome {
            report_key: report.key().to_string(),
            restored_from: artifact,
            backup,
            target: original.to_path_buf(),
        })
    }

    async fn extract(&self, report: &ReportArchive, package: &Path) -> ArchiveResult<ScratchDir> {
        let name = format!(".restore-{}", Utc::now().format("%Y%m%d%H%M%S%3f"));
        let scratch = ScratchDir(report.root().join(name));
        fs::create_dir_all(scratch.path())
            .await
            .map_err(|e| ArchiveError::io_at(scratch.path(), e))?;

        let packager = Arc::clone(&self.packager);
        let source = package.to_path_buf();
        let dest = scratch.path().to_path_buf();
        tokio::task::spawn_blocking(move || packager.unpack(&source, &dest)).await??;
        debug!(scratch = %scratch.path().display(), "Extracted package");
        Ok(scratch)
    }

    /// Copy the working file to `<file>.bak`. Failure is logged only.
    async fn backup(&self, original: &Path) -> Option<PathBuf> {
        let mut backup = original.as_os_str().to_owned();
        backup.push(".bak");
        let backup = PathBuf::from(backup);
        match fs::copy(original, &backup).await {
            Ok(_) => {
                debug!(backup = %backup.display(), "Backed up working file");
                Some(backup)
            }
            Err(e) => {
                warn!("Could not back up {}: {}", original.display(), e);
                None
            }
        }
    }
}
