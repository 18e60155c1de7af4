//! Configuration for the archive engine.
//!
//! Configuration is loaded from multiple sources and merged:
//! 1. Global config: `~/.config/reportvault/config.json`
//! 2. Environment variable: `REPORTVAULT_CONFIG_CONTENT`
//! 3. Project config: `reportvault.jsonc` or `reportvault.json` in the working directory
//! 4. Environment overrides: `REPORTVAULT_ARCHIVE_ROOT`
//!
//! Files may contain `//` and `/* */` comments.

use crate::analyzer::HelperAnalyzer;
use crate::package::Compression;
use crate::{ArchiveError, ArchiveResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_HELPER_TIMEOUT_SECS: u64 = 120;

/// Archive engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Archive root used when a call does not name one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_root: Option<PathBuf>,

    /// Compression for version packages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<Compression>,

    /// Copy the working file to `<file>.bak` before reverting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_on_revert: Option<bool>,

    /// External analysis helper.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper: Option<HelperConfig>,
}

/// External analysis helper command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl HelperConfig {
    pub fn to_analyzer(&self) -> HelperAnalyzer {
        HelperAnalyzer::new(
            self.command.clone(),
            self.args.clone(),
            Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_HELPER_TIMEOUT_SECS)),
        )
    }
}

impl ArchiveConfig {
    pub fn compression(&self) -> Compression {
        self.compression.unwrap_or_default()
    }

    pub fn backup_on_revert(&self) -> bool {
        self.backup_on_revert.unwrap_or(true)
    }

    /// Load configuration from all sources.
    ///
    /// Returns the merged config and the files it was read from.
    pub async fn load(project_dir: Option<&Path>) -> ArchiveResult<(Self, Vec<PathBuf>)> {
        let mut config = ArchiveConfig::default();
        let mut sources = Vec::new();

        if let Some(global_dir) = reportvault_util::path::config_dir() {
            let path = global_dir.join("config.json");
            if path.exists() {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        if let Ok(content) = std::env::var("REPORTVAULT_CONFIG_CONTENT") {
            config = config.merge(Self::parse_jsonc(&content, "<env>")?);
        }

        if let Some(dir) = project_dir {
            for name in &["reportvault.jsonc", "reportvault.json"] {
                let path = dir.join(name);
                if path.exists() {
                    config = config.merge(Self::load_file(&path).await?);
                    sources.push(path);
                    break;
                }
            }
        }

        config.apply_env_overrides();
        Ok((config, sources))
    }

    /// Load configuration from a single file.
    pub async fn load_file(path: &Path) -> ArchiveResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse_jsonc(&content, &path.display().to_string())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("REPORTVAULT_ARCHIVE_ROOT") {
            if !root.trim().is_empty() {
                self.archive_root = Some(PathBuf::from(root));
            }
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(mut self, other: Self) -> Self {
        if other.archive_root.is_some() {
            self.archive_root = other.archive_root;
        }
        if other.compression.is_some() {
            self.compression = other.compression;
        }
        if other.backup_on_revert.is_some() {
            self.backup_on_revert = other.backup_on_revert;
        }
        if other.helper.is_some() {
            self.helper = other.helper;
        }
        self
    }

    /// Parse JSONC (JSON with comments).
    fn parse_jsonc(content: &str, source: &str) -> ArchiveResult<Self> {
        let stripped = strip_comments(content);
        serde_json::from_str(&stripped).map_err(|e| ArchiveError::Config {
            path: source.to_string(),
            message: e.to_string(),
        })
    }
}

/// Strip `//` and `/* */` comments outside of string literals.
fn strip_comments(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(c) = chars.next() {
        if escape_next {
            result.push(c);
            escape_next = false;
            continue;
        }

        if in_string {
            if c == '\\' {
                escape_next = true;
            } else if c == '"' {
                in_string = false;
            }
            result.push(c);
            continue;
        }

        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                result.push(c);
            }
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = ' ';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    // Preserve newlines for error positions
                    if c == '\n' {
                        result.push('\n');
                    }
                    prev = c;
                }
            }
            _ => result.push(c),
        }
    }

    result
}
