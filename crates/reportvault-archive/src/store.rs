//! Archive store: creates versions and owns the on-disk layout.

use crate::analyzer::{Analysis, AnalysisRequest, AnalysisVia, AnalyzerChain, ReportAnalyzer};
use crate::changelog::{Changelog, LedgerEntry};
use crate::config::ArchiveConfig;
use crate::fingerprint::{self, DiffSummary};
use crate::html::{FileFacts, SummaryDocument};
use crate::lock::ReportLocks;
use crate::metadata::VersionMetadata;
use crate::package::{Packager, ZipPackager};
use crate::resolver::{self, VersionCandidate};
use crate::version::{
    ArtifactRef, ReportArchive, VersionToken, ANALYSIS_FILE, CHANGED_DIR, CHANGES_FILE,
    ORIGINAL_DIR,
};
use crate::{ArchiveError, ArchiveResult};
use chrono::Utc;
use reportvault_util::path::{default_archive_root, file_name_string, report_key, same_file};
use reportvault_util::TimingGuard;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

/// What happened to the working original at the end of an archive run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    /// The changed file now is the working original.
    Replaced,
    /// Original and changed were the same file.
    SkippedSamePath,
}

/// Result of a successful archive run.
#[derive(Debug, Clone)]
pub struct VersionResult {
    pub report_key: String,
    pub report_root: PathBuf,
    pub token: VersionToken,
    pub artifact: ArtifactRef,
    /// Folder a caller should open to see the new version.
    pub open_target: PathBuf,
    pub diff: DiffSummary,
    pub analysis_via: AnalysisVia,
    pub replacement: Replacement,
}

impl VersionResult {
    /// Human-readable one-line outcome.
    pub fn summary(&self) -> String {
        let replaced = match self.replacement {
            Replacement::Replaced => "original replaced with changed report",
            Replacement::SkippedSamePath => "original and changed are the same file; replacement skipped",
        };
        format!(
            "Archived {} as v{} ({} bytes differ, {:.2}%): {}; {}",
            self.report_key,
            self.token,
            self.diff.different_bytes,
            self.diff.difference_percent,
            self.artifact,
            replaced
        )
    }
}

/// The versioned archive engine.
///
/// ```text
/// archive_root/
///   <report key>/
///     <report key>-<yyyyMMdd-HHmmss>.zip   # packaged version
///     v<yyyyMMdd-HHmmss>/                  # only when packaging failed
///       original/<file>
///       changed/<file>
///       changes.html
///       metadata.json
///     ChangeLog-<report key>.html
/// ```
pub struct ArchiveStore {
    pub(crate) config: ArchiveConfig,
    analyzers: AnalyzerChain,
    pub(crate) packager: Arc<dyn Packager>,
    pub(crate) locks: ReportLocks,
}

impl ArchiveStore {
    /// Create a store from configuration. A configured helper becomes the
    /// external analyzer.
    pub fn new(config: ArchiveConfig) -> Self {
        let mut analyzers = AnalyzerChain::new();
        if let Some(helper) = &config.helper {
            analyzers.push(Arc::new(helper.to_analyzer()));
        }
        let packager = Arc::new(ZipPackager::new(config.compression()));
        Self {
            config,
            analyzers,
            packager,
            locks: ReportLocks::new(),
        }
    }

    /// Add an analyzer to the chain.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn ReportAnalyzer>) -> Self {
        self.analyzers.push(analyzer);
        self
    }

    /// Replace the packager.
    pub fn with_packager(mut self, packager: Arc<dyn Packager>) -> Self {
        self.packager = packager;
        self
    }

    /// Pick the archive root: explicit argument, then config, then
    /// `<dir of original>/archive`.
    pub fn resolve_archive_root(&self, original: &Path, archive_root: Option<&Path>) -> PathBuf {
        archive_root
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(|| self.config.archive_root.clone())
            .unwrap_or_else(|| default_archive_root(original))
    }

    /// The report archive `original` belongs to.
    pub fn report_archive(&self, original: &Path, archive_root: Option<&Path>) -> ReportArchive {
        let root = self.resolve_archive_root(original, archive_root);
        ReportArchive::new(&root, report_key(original))
    }

    /// Most recent version artifact of the report.
    pub async fn latest(
        &self,
        original: &Path,
        archive_root: Option<&Path>,
    ) -> ArchiveResult<Option<ArtifactRef>> {
        let report = self.report_archive(original, archive_root);
        resolver::find_latest(report.root()).await
    }

    /// All version artifacts of the report, newest first.
    pub async fn history(
        &self,
        original: &Path,
        archive_root: Option<&Path>,
    ) -> ArchiveResult<Vec<VersionCandidate>> {
        let report = self.report_archive(original, archive_root);
        resolver::list_versions(report.root()).await
    }

    /// Archive `original` and `changed` as a new version, then make `changed`
    /// the working original.
    pub async fn archive(
        &self,
        original: &Path,
        changed: &Path,
        archive_root: Option<&Path>,
        message: &str,
    ) -> ArchiveResult<VersionResult> {
        ensure_file(original, "Original")?;
        ensure_file(changed, "Changed")?;

        let report = self.report_archive(original, archive_root);
        let _guard = self.locks.acquire(report.sanitized_key()).await;
        let _timing = TimingGuard::archive(report.key());
        info!(report = report.key(), root = %report.root().display(), "Starting archive");

        fs::create_dir_all(report.root())
            .await
            .map_err(|e| ArchiveError::io_at(report.root(), e))?;

        let token = self.allocate_token(&report).await;
        let version_dir = report.version_dir(&token);

        let built = match self
            .build_version(&report, &version_dir, original, changed, message)
            .await
        {
            Ok(built) => built,
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&version_dir).await {
                    debug!("Could not remove incomplete version {}: {}", version_dir.display(), cleanup);
                }
                return Err(e);
            }
        };

        let (artifact, open_target) = self.package_version(&report, &token, &version_dir).await;

        let link = artifact.link_name();
        Changelog::append(
            report.root(),
            report.key(),
            &LedgerEntry {
                token: &token.to_string(),
                message,
                original_name: &built.original_name,
                changed_name: &built.changed_name,
                diff_html: &built.diff.to_html(),
                analysis_html: built.analysis_html.as_deref(),
                artifact_link: Some(&link),
            },
        )
        .await;

        let replacement = if same_file(original, changed) {
            info!("Original and changed paths are identical; replacement skipped.");
            Replacement::SkippedSamePath
        } else {
            fs::copy(changed, original)
                .await
                .map_err(|e| ArchiveError::io_at(original, e))?;
            info!("Replaced original report with changed report.");
            Replacement::Replaced
        };

        info!(artifact = %artifact, "Archive complete");
        Ok(VersionResult {
            report_key: report.key().to_string(),
            report_root: report.root().to_path_buf(),
            token,
            artifact,
            open_target,
            diff: built.diff,
            analysis_via: built.via,
            replacement,
        })
    }

    /// Allocate a token whose directory and package do not exist yet.
    ///
    /// Callers hold the report lock, so waiting for the next second is enough
    /// to get a fresh token.
    async fn allocate_token(&self, report: &ReportArchive) -> VersionToken {
        loop {
            let token = VersionToken::now();
            if !report.version_dir(&token).exists() && !report.package_path(&token).exists() {
                return token;
            }
            let wait_ms = 1000 - u64::from(Utc::now().timestamp_subsec_millis().min(999));
            debug!(token = %token, "Version token taken, waiting {}ms", wait_ms);
            tokio::time::sleep(Duration::from_millis(wait_ms + 1)).await;
        }
    }

    /// Steps that populate the version directory: copy, fingerprint, analyze,
    /// summary, metadata (last).
    async fn build_version(
        &self,
        report: &ReportArchive,
        version_dir: &Path,
        original: &Path,
        changed: &Path,
        message: &str,
    ) -> ArchiveResult<BuiltVersion> {
        let original_dir = version_dir.join(ORIGINAL_DIR);
        let changed_dir = version_dir.join(CHANGED_DIR);
        fs::create_dir_all(&original_dir)
            .await
            .map_err(|e| ArchiveError::io_at(&original_dir, e))?;
        fs::create_dir_all(&changed_dir)
            .await
            .map_err(|e| ArchiveError::io_at(&changed_dir, e))?;

        // Facts come from the live inputs; copies carry the copy instant as mtime.
        let original_facts = FileFacts::read(original)
            .await
            .map_err(|e| ArchiveError::io_at(original, e))?;
        let changed_facts = FileFacts::read(changed)
            .await
            .map_err(|e| ArchiveError::io_at(changed, e))?;

        let original_name = file_name_string(original);
        let changed_name = file_name_string(changed);
        let original_copy = original_dir.join(&original_name);
        let changed_copy = changed_dir.join(&changed_name);
        fs::copy(original, &original_copy)
            .await
            .map_err(|e| ArchiveError::io_at(original, e))?;
        fs::copy(changed, &changed_copy)
            .await
            .map_err(|e| ArchiveError::io_at(changed, e))?;
        debug!("Files copied.");

        let diff = fingerprint::compute(&original_copy, &changed_copy).await?;
        debug!(
            different_bytes = diff.different_bytes,
            percent = diff.difference_percent,
            "Fingerprint computed"
        );

        let (analysis, via) = if self.analyzers.is_empty() {
            debug!("No analyzer configured; binary details only.");
            (Analysis::empty(), AnalysisVia::None)
        } else {
            self.analyzers
                .run(&AnalysisRequest {
                    original: original_copy.clone(),
                    changed: changed_copy.clone(),
                    version_dir: version_dir.to_path_buf(),
                })
                .await
        };
        if let Some(json) = &analysis.json {
            fs::write(version_dir.join(ANALYSIS_FILE), json).await?;
        }

        let diff_html = diff.to_html();
        let summary = SummaryDocument {
            report_key: report.key(),
            message,
            generated: Utc::now(),
            original: &original_facts,
            changed: &changed_facts,
            diff_html: &diff_html,
            analysis_html: analysis.html.as_deref(),
        }
        .render();
        fs::write(version_dir.join(CHANGES_FILE), summary).await?;

        VersionMetadata::new(report.key(), message, &original_name, &changed_name, &diff, via)
            .write(version_dir)
            .await?;

        Ok(BuiltVersion {
            original_name,
            changed_name,
            diff,
            analysis_html: analysis.html,
            via,
        })
    }

    /// Compress the version directory. Falls back to the directory itself
    /// when packaging fails.
    async fn package_version(
        &self,
        report: &ReportArchive,
        token: &VersionToken,
        version_dir: &Path,
    ) -> (ArtifactRef, PathBuf) {
        let package = report.package_path(token);
        let packager = Arc::clone(&self.packager);
        let source = version_dir.to_path_buf();
        let dest = package.clone();

        let packed = match tokio::task::spawn_blocking(move || packager.pack(&source, &dest)).await
        {
            Ok(result) => result,
            Err(e) => Err(e.into()),
        };

        match packed {
            Ok(()) => {
                info!(package = %package.display(), "Created archive package");
                match fs::remove_dir_all(version_dir).await {
                    Ok(()) => debug!("Removed uncompressed version folder."),
                    Err(e) => warn!(
                        "Could not delete uncompressed version {}: {}",
                        version_dir.display(),
                        e
                    ),
                }
                (ArtifactRef::Package(package), report.root().to_path_buf())
            }
            Err(e) => {
                warn!("Packaging failed, keeping uncompressed version: {}", e);
                (
                    ArtifactRef::Directory(version_dir.to_path_buf()),
                    version_dir.to_path_buf(),
                )
            }
        }
    }
}

struct BuiltVersion {
    original_name: String,
    changed_name: String,
    diff: DiffSummary,
    analysis_html: Option<String>,
    via: AnalysisVia,
}

pub(crate) fn ensure_file(path: &Path, label: &str) -> ArchiveResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ArchiveError::not_found(format!(
            "{label} file not found: {}",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FailingPackager;

    impl Packager for FailingPackager {
        fn pack(&self, _source_dir: &Path, _package: &Path) -> ArchiveResult<()> {
            Err(ArchiveError::operation_failed("disk full"))
        }

        fn unpack(&self, _package: &Path, _dest_dir: &Path) -> ArchiveResult<()> {
            Err(ArchiveError::operation_failed("disk full"))
        }
    }

    struct StaticAnalyzer;

    #[async_trait]
    impl ReportAnalyzer for StaticAnalyzer {
        fn via(&self) -> AnalysisVia {
            AnalysisVia::Inproc
        }

        async fn try_analyze(&self, request: &AnalysisRequest) -> Analysis {
            assert!(request.original.starts_with(&request.version_dir));
            Analysis {
                html: Some("<h3>FormulaFields</h3>".into()),
                json: Some("{\"formulas\":1}".into()),
                log: vec!["analyzed".into()],
            }
        }
    }

    /// Blocks the summary path with a directory so step 6 fails.
    struct SummaryBlocker;

    #[async_trait]
    impl ReportAnalyzer for SummaryBlocker {
        fn via(&self) -> AnalysisVia {
            AnalysisVia::Inproc
        }

        async fn try_analyze(&self, request: &AnalysisRequest) -> Analysis {
            std::fs::create_dir(request.version_dir.join(CHANGES_FILE)).unwrap();
            Analysis::empty()
        }
    }

    async fn setup() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("A.rpt");
        let changed = dir.path().join("B.rpt");
        fs::write(&original, [0x00, 0x01, 0x02]).await.unwrap();
        fs::write(&changed, [0x00, 0xFF, 0x02]).await.unwrap();
        (dir, original, changed)
    }

    #[tokio::test]
    async fn test_archive_scenario() {
        let (dir, original, changed) = setup().await;
        let store = ArchiveStore::new(ArchiveConfig::default());

        let result = store
            .archive(&original, &changed, None, "Fix totals")
            .await
            .unwrap();

        assert_eq!(result.report_key, "A");
        assert_eq!(result.report_root, dir.path().join("archive").join("A"));
        assert_eq!(result.diff.different_bytes, 1);
        assert!((result.diff.difference_percent - 33.33).abs() < 0.01);
        assert_eq!(result.analysis_via, AnalysisVia::None);
        assert_eq!(result.replacement, Replacement::Replaced);
        assert!(result.artifact.is_package());
        assert_eq!(result.open_target, result.report_root);
        assert!(!result.report_root.join(format!("v{}", result.token)).exists());

        let working = fs::read(&original).await.unwrap();
        assert_eq!(working, vec![0x00, 0xFF, 0x02]);

        let ledger = fs::read_to_string(result.report_root.join("ChangeLog-A.html"))
            .await
            .unwrap();
        assert_eq!(ledger.matches("<div class='entry'>").count(), 1);
        assert!(ledger.contains("Fix totals"));
    }

    #[tokio::test]
    async fn test_missing_input_has_no_side_effects() {
        let (dir, original, _) = setup().await;
        let store = ArchiveStore::new(ArchiveConfig::default());

        let err = store
            .archive(&original, &dir.path().join("missing.rpt"), None, "")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(!dir.path().join("archive").exists());
    }

    #[tokio::test]
    async fn test_same_path_skips_replacement() {
        let (_dir, original, _) = setup().await;
        let store = ArchiveStore::new(ArchiveConfig::default());

        let result = store.archive(&original, &original, None, "").await.unwrap();
        assert_eq!(result.replacement, Replacement::SkippedSamePath);
        assert_eq!(result.diff.different_bytes, 0);
        assert_eq!(fs::read(&original).await.unwrap(), vec![0x00, 0x01, 0x02]);
    }

    #[tokio::test]
    async fn test_packaging_failure_keeps_directory() {
        let (_dir, original, changed) = setup().await;
        let store =
            ArchiveStore::new(ArchiveConfig::default()).with_packager(Arc::new(FailingPackager));

        let result = store.archive(&original, &changed, None, "").await.unwrap();
        let version_dir = result.report_root.join(format!("v{}", result.token));

        assert_eq!(result.artifact, ArtifactRef::Directory(version_dir.clone()));
        assert_eq!(result.open_target, version_dir);
        assert!(version_dir.join("original/A.rpt").is_file());
        assert!(version_dir.join("changed/B.rpt").is_file());
        assert!(version_dir.join("changes.html").is_file());
        assert!(version_dir.join("metadata.json").is_file());

        let latest = store.latest(&original, None).await.unwrap();
        assert_eq!(latest, Some(result.artifact));
    }

    #[tokio::test]
    async fn test_analyzer_output_is_recorded() {
        let (_dir, original, changed) = setup().await;
        let store = ArchiveStore::new(ArchiveConfig::default())
            .with_packager(Arc::new(FailingPackager))
            .with_analyzer(Arc::new(StaticAnalyzer));

        let result = store.archive(&original, &changed, None, "").await.unwrap();
        assert_eq!(result.analysis_via, AnalysisVia::Inproc);

        let version_dir = result.artifact.path();
        let meta = VersionMetadata::read(version_dir).await.unwrap();
        assert_eq!(meta.crystal.via, AnalysisVia::Inproc);
        let summary = fs::read_to_string(version_dir.join("changes.html")).await.unwrap();
        assert!(summary.contains("<h3>FormulaFields</h3>"));
        assert!(version_dir.join("analysis.json").is_file());
    }

    #[tokio::test]
    async fn test_explicit_and_configured_roots() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("Invoice.rpt");

        let store = ArchiveStore::new(ArchiveConfig {
            archive_root: Some(dir.path().join("configured")),
            ..Default::default()
        });
        assert_eq!(
            store.resolve_archive_root(&original, None),
            dir.path().join("configured")
        );
        assert_eq!(
            store.resolve_archive_root(&original, Some(Path::new(""))),
            dir.path().join("configured")
        );
        assert_eq!(
            store.resolve_archive_root(&original, Some(&dir.path().join("explicit"))),
            dir.path().join("explicit")
        );
    }

    #[tokio::test]
    async fn test_back_to_back_archives_get_distinct_tokens() {
        let (_dir, original, changed) = setup().await;
        let store = ArchiveStore::new(ArchiveConfig::default());

        let first = store.archive(&original, &changed, None, "one").await.unwrap();
        let second = store.archive(&original, &changed, None, "two").await.unwrap();

        assert!(second.token > first.token);
        assert_ne!(first.artifact, second.artifact);
        assert!(first.artifact.path().is_file());
        assert!(second.artifact.path().is_file());
    }

    #[tokio::test]
    async fn test_summary_shows_input_modification_time() {
        let (_dir, original, changed) = setup().await;
        let old = std::time::UNIX_EPOCH + Duration::from_secs(978_307_200);
        std::fs::File::options()
            .write(true)
            .open(&original)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let store =
            ArchiveStore::new(ArchiveConfig::default()).with_packager(Arc::new(FailingPackager));
        let result = store.archive(&original, &changed, None, "").await.unwrap();

        let summary = fs::read_to_string(result.artifact.path().join(CHANGES_FILE))
            .await
            .unwrap();
        assert!(summary.contains("Modified: 2001-01-01 00:00:00Z UTC"));
    }

    #[tokio::test]
    async fn test_failed_build_leaves_no_trace() {
        let (_dir, original, changed) = setup().await;
        let store = ArchiveStore::new(ArchiveConfig::default()).with_analyzer(Arc::new(SummaryBlocker));

        let err = store.archive(&original, &changed, None, "").await.unwrap_err();
        assert!(matches!(err, ArchiveError::Io(_)));

        let report = store.report_archive(&original, None);
        assert_eq!(fs::read(&original).await.unwrap(), vec![0x00, 0x01, 0x02]);
        assert!(resolver::find_latest(report.root()).await.unwrap().is_none());
        assert!(!Changelog::path(report.root(), report.key()).exists());
        assert_eq!(std::fs::read_dir(report.root()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_dot_only_report_name_stays_under_archive_root() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("..rpt");
        let changed = dir.path().join("B.rpt");
        fs::write(&original, b"one").await.unwrap();
        fs::write(&changed, b"two").await.unwrap();

        let store = ArchiveStore::new(ArchiveConfig::default());
        let result = store.archive(&original, &changed, None, "").await.unwrap();

        assert_eq!(result.report_root, dir.path().join("archive").join("_"));
        assert!(result.artifact.path().starts_with(dir.path().join("archive").join("_")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hard_link_counts_as_same_file() {
        let (dir, original, _) = setup().await;
        let link = dir.path().join("A-link.rpt");
        std::fs::hard_link(&original, &link).unwrap();

        let store = ArchiveStore::new(ArchiveConfig::default());
        let result = store.archive(&original, &link, None, "").await.unwrap();

        assert_eq!(result.replacement, Replacement::SkippedSamePath);
        assert_eq!(fs::read(&original).await.unwrap(), vec![0x00, 0x01, 0x02]);
    }
}
