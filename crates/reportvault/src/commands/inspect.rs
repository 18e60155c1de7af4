//! Read-only commands: latest, history and diff.

use anyhow::Context;
use reportvault_archive::{fingerprint, ArchiveStore};
use std::path::Path;

/// Print the most recent version artifact.
pub async fn run_latest(
    store: &ArchiveStore,
    original: &Path,
    archive_root: Option<&Path>,
) -> anyhow::Result<()> {
    let latest = store
        .latest(original, archive_root)
        .await
        .context("Failed to resolve latest version")?;

    match latest {
        Some(artifact) => {
            println!("{artifact}");
            Ok(())
        }
        None => anyhow::bail!(
            "No archived versions found for {}",
            original.display()
        ),
    }
}

/// Print all versions, newest first.
pub async fn run_history(
    store: &ArchiveStore,
    original: &Path,
    archive_root: Option<&Path>,
) -> anyhow::Result<()> {
    let versions = store
        .history(original, archive_root)
        .await
        .context("Failed to list versions")?;

    if versions.is_empty() {
        println!("No archived versions.");
        return Ok(());
    }

    for version in versions {
        let kind = if version.artifact.is_package() {
            "package"
        } else {
            "folder"
        };
        let label = match version.token {
            Some(token) => format!("v{token}"),
            None => format!("({})", version.rank.format("%Y-%m-%d %H:%M:%S")),
        };
        println!("{label:<20} {kind:<8} {}", version.artifact);
    }
    Ok(())
}

/// Print the difference summary of two files.
pub async fn run_diff(a: &Path, b: &Path, json: bool) -> anyhow::Result<()> {
    let diff = fingerprint::compute(a, b)
        .await
        .context("Failed to compare files")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
        return Ok(());
    }

    println!("{:<16} {}", "Original SHA-256", diff.original_sha256);
    println!("{:<16} {}", "Changed SHA-256", diff.changed_sha256);
    println!("{:<16} {} / {} bytes", "Size", diff.original_size, diff.changed_size);
    println!(
        "{:<16} {} ({:.2}%)",
        "Different bytes", diff.different_bytes, diff.difference_percent
    );
    if diff.is_identical() {
        println!("Files are identical.");
    }
    Ok(())
}
