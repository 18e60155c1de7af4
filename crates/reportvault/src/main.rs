//! reportvault - versioned archive and revert for report files.
//!
//! This is the main entry point for the reportvault CLI.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{
    init_logging, run_archive, run_config, run_diff, run_history, run_latest, run_revert,
};
use reportvault_archive::{ArchiveConfig, ArchiveStore};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reportvault")]
#[command(author, version, about = "Versioned archive and revert for report files", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Append logs to the platform log file instead of stderr
    #[arg(long, global = true)]
    log_file: bool,

    /// Archive root (default: <report folder>/archive)
    #[arg(long, global = true, value_name = "DIR")]
    archive_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive the original and changed report as a new version, then
    /// replace the original with the changed report
    Archive {
        /// The working report
        original: PathBuf,
        /// The edited report
        changed: PathBuf,
        /// Message recorded with the version
        #[arg(short, long, default_value = "")]
        message: String,
    },
    /// Restore the working report from its most recent version
    Revert {
        /// The working report
        original: PathBuf,
    },
    /// Show the most recent version of a report
    Latest {
        /// The working report
        original: PathBuf,
    },
    /// List all versions of a report, newest first
    History {
        /// The working report
        original: PathBuf,
    },
    /// Compare two files byte by byte
    Diff {
        /// First file
        a: PathBuf,
        /// Second file
        b: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Config,
    /// Print version information
    Version,
}

/// Load configuration for the current working directory.
async fn load_config() -> anyhow::Result<(ArchiveConfig, Vec<PathBuf>)> {
    let cwd = std::env::current_dir().ok();
    ArchiveConfig::load(cwd.as_deref())
        .await
        .context("Failed to load configuration")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(path) = init_logging(cli.verbose, cli.log_file) {
        tracing::debug!(path = %path.display(), "Logging to file");
    }

    match cli.command {
        Commands::Archive {
            original,
            changed,
            message,
        } => {
            let (config, _) = load_config().await?;
            let store = ArchiveStore::new(config);
            run_archive(&store, &original, &changed, cli.archive_root.as_deref(), &message).await
        }
        Commands::Revert { original } => {
            let (config, _) = load_config().await?;
            let store = ArchiveStore::new(config);
            run_revert(&store, &original, cli.archive_root.as_deref()).await
        }
        Commands::Latest { original } => {
            let (config, _) = load_config().await?;
            let store = ArchiveStore::new(config);
            run_latest(&store, &original, cli.archive_root.as_deref()).await
        }
        Commands::History { original } => {
            let (config, _) = load_config().await?;
            let store = ArchiveStore::new(config);
            run_history(&store, &original, cli.archive_root.as_deref()).await
        }
        Commands::Diff { a, b, json } => run_diff(&a, &b, json).await,
        Commands::Config => {
            let (config, sources) = load_config().await?;
            run_config(&config, &sources)
        }
        Commands::Version => {
            println!("reportvault {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
