//! Archive and revert commands.

use anyhow::Context;
use reportvault_archive::ArchiveStore;
use std::path::Path;

/// Run the archive command.
pub async fn run_archive(
    store: &ArchiveStore,
    original: &Path,
    changed: &Path,
    archive_root: Option<&Path>,
    message: &str,
) -> anyhow::Result<()> {
    let result = store
        .archive(original, changed, archive_root, message)
        .await
        .with_context(|| format!("Archive failed for {}", original.display()))?;

    println!("{}", result.summary());
    if !result.artifact.is_package() {
        println!("Packaging failed; the version was kept as a folder.");
    }
    println!("Open: {}", result.open_target.display());
    Ok(())
}

/// Run the revert command.
pub async fn run_revert(
    store: &ArchiveStore,
    original: &Path,
    archive_root: Option<&Path>,
) -> anyhow::Result<()> {
    let outcome = store
        .revert(original, archive_root)
        .await
        .with_context(|| format!("Revert failed for {}", original.display()))?;

    println!("{}", outcome.summary());
    Ok(())
}
