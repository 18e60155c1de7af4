//! Config command.

use reportvault_archive::ArchiveConfig;
use std::path::PathBuf;

/// Print the effective configuration and where it came from.
pub fn run_config(config: &ArchiveConfig, sources: &[PathBuf]) -> anyhow::Result<()> {
    if sources.is_empty() {
        println!("Config sources: (defaults)");
    } else {
        println!("Config sources:");
        for source in sources {
            println!("  {}", source.display());
        }
    }
    println!();
    println!("Compression: {:?}", config.compression());
    println!("Backup on revert: {}", config.backup_on_revert());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
