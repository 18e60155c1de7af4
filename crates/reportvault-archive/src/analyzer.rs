//! Optional structural analysis of the archived report pair.
//!
//! Analysis is a capability, not a requirement: an analyzer that is absent,
//! returns nothing or fails leaves the version with binary-level details only.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Which analysis path produced the version's analysis fragment.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisVia {
    #[default]
    None,
    /// An analyzer running inside this process.
    Inproc,
    /// An external helper program.
    Helper,
}

impl std::fmt::Display for AnalysisVia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnalysisVia::None => "none",
            AnalysisVia::Inproc => "inproc",
            AnalysisVia::Helper => "helper",
        };
        f.write_str(s)
    }
}

/// Inputs handed to an analyzer: the archived copies, not the live files.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub original: PathBuf,
    pub changed: PathBuf,
    pub version_dir: PathBuf,
}

/// What an analyzer produced.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    /// HTML fragment describing structural differences.
    pub html: Option<String>,
    /// Optional structured form of the same analysis.
    pub json: Option<String>,
    /// Diagnostic lines, re-emitted through tracing.
    pub log: Vec<String>,
}

impl Analysis {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_log(mut self, line: impl Into<String>) -> Self {
        self.log.push(line.into());
        self
    }

    fn has_html(&self) -> bool {
        self.html.as_deref().is_some_and(|h| !h.trim().is_empty())
    }
}

/// A structural analyzer for report files.
///
/// Implementations must not fail past this boundary; problems are reported
/// as log lines with no HTML.
#[async_trait]
pub trait ReportAnalyzer: Send + Sync {
    /// The analysis path this analyzer represents.
    fn via(&self) -> AnalysisVia;

    async fn try_analyze(&self, request: &AnalysisRequest) -> Analysis;
}

/// Ordered set of analyzers; in-process analyzers run before helpers and the
/// first one producing HTML wins.
#[derive(Clone, Default)]
pub struct AnalyzerChain {
    analyzers: Vec<Arc<dyn ReportAnalyzer>>,
}

impl AnalyzerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, analyzer: Arc<dyn ReportAnalyzer>) {
        self.analyzers.push(analyzer);
        self.analyzers.sort_by_key(|a| a.via());
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Run analyzers until one yields HTML.
    ///
    /// Each analyzer runs in its own task so a panic is contained and
    /// downgraded to a log line.
    pub async fn run(&self, request: &AnalysisRequest) -> (Analysis, AnalysisVia) {
        for analyzer in &self.analyzers {
            let via = analyzer.via();
            let task_analyzer = Arc::clone(analyzer);
            let task_request = request.clone();
            let handle =
                tokio::spawn(async move { task_analyzer.try_analyze(&task_request).await });

            let analysis = match handle.await {
                Ok(analysis) => analysis,
                Err(e) => Analysis::empty().with_log(format!("Analyzer ({via}) failed: {e}")),
            };

            for line in &analysis.log {
                info!(via = %via, "{}", line);
            }

            if analysis.has_html() {
                debug!(via = %via, "Analyzer produced a report");
                return (analysis, via);
            }
        }

        (Analysis::empty(), AnalysisVia::None)
    }
}

/// Runs an external helper program as `<command> <args..> <original> <changed> <version_dir>`.
///
/// Standard output is the HTML fragment. A line starting with `JSON:` carries
/// the structured analysis instead.
pub struct HelperAnalyzer {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl HelperAnalyzer {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    fn parse_output(stdout: &str) -> Analysis {
        let mut html = String::new();
        let mut json = None;
        for line in stdout.lines() {
            match line.strip_prefix("JSON:") {
                Some(rest) => json = Some(rest.trim().to_string()),
                None => {
                    html.push_str(line);
                    html.push('\n');
                }
            }
        }
        let html = html.trim().to_string();
        Analysis {
            html: (!html.is_empty()).then_some(html),
            json,
            log: Vec::new(),
        }
    }
}

#[async_trait]
impl ReportAnalyzer for HelperAnalyzer {
    fn via(&self) -> AnalysisVia {
        AnalysisVia::Helper
    }

    async fn try_analyze(&self, request: &AnalysisRequest) -> Analysis {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .arg(&request.original)
            .arg(&request.changed)
            .arg(&request.version_dir)
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Analysis::empty()
                    .with_log(format!("Helper {} could not start: {e}", self.command))
            }
            Err(_) => {
                warn!(command = %self.command, "Analysis helper timed out");
                return Analysis::empty().with_log(format!(
                    "Helper {} timed out after {}s",
                    self.command,
                    self.timeout.as_secs()
                ));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Analysis::empty().with_log(format!(
                "Helper {} failed ({}): {}",
                self.command,
                output.status,
                stderr.trim()
            ));
        }

        let mut analysis = Self::parse_output(&String::from_utf8_lossy(&output.stdout));
        analysis.log.push("Analysis helper completed.".to_string());
        analysis
    }
}
