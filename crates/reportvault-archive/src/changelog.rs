//! Per-report append-only changelog document.
//!
//! The ledger is observability only. Every failure in here is logged and
//! swallowed so it can never block an archive or revert.

use crate::html::{escape, format_utc, BASE_STYLE};
use crate::ArchiveResult;
use chrono::Utc;
use reportvault_util::path::sanitize_file_name;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const BODY_END: &str = "</body>";

const ENTRY_STYLE: &str = ".entry{border:1px solid #1f3a46;border-radius:6px;margin:16px 0;padding:12px}";

/// One archive or revert event.
#[derive(Debug, Clone)]
pub struct LedgerEntry<'a> {
    pub token: &'a str,
    pub message: &'a str,
    pub original_name: &'a str,
    pub changed_name: &'a str,
    pub diff_html: &'a str,
    pub analysis_html: Option<&'a str>,
    pub artifact_link: Option<&'a str>,
}

impl LedgerEntry<'_> {
    fn render(&self) -> String {
        let mut html = String::new();
        html.push_str("<div class='entry'>");
        html.push_str(&format!("<h2>Version v{}</h2>", escape(self.token)));
        if !self.message.trim().is_empty() {
            html.push_str(&format!(
                "<p><strong>Message:</strong> {}</p>",
                escape(self.message)
            ));
        }
        html.push_str(&format!(
            "<p class='muted'>Created UTC: {}</p>",
            format_utc(Utc::now())
        ));
        html.push_str(&format!(
            "<p>Original: <code>{}</code> &nbsp; Changed: <code>{}</code></p>",
            escape(self.original_name),
            escape(self.changed_name)
        ));
        if let Some(link) = self.artifact_link.filter(|l| !l.is_empty()) {
            let link = escape(link);
            html.push_str(&format!("<p>Package: <a href='{link}'>{link}</a></p>"));
        }
        html.push_str("<div><h3>Binary diff</h3>");
        html.push_str(self.diff_html);
        html.push_str("</div>");
        if let Some(analysis) = self.analysis_html.filter(|h| !h.trim().is_empty()) {
            html.push_str("<div><h3>Report analysis</h3>");
            html.push_str(analysis);
            html.push_str("</div>");
        }
        html.push_str("</div>");
        html
    }
}

/// The changelog of one report.
pub struct Changelog;

impl Changelog {
    /// `<report_root>/ChangeLog-<sanitized key>.html`
    pub fn path(report_root: &Path, report_key: &str) -> PathBuf {
        report_root.join(format!("ChangeLog-{}.html", sanitize_file_name(report_key)))
    }

    /// Append an entry. Never fails.
    pub async fn append(report_root: &Path, report_key: &str, entry: &LedgerEntry<'_>) {
        match Self::try_append(report_root, report_key, entry).await {
            Ok(path) => debug!(path = %path.display(), token = entry.token, "Changelog updated"),
            Err(e) => warn!(report = report_key, "Changelog update failed: {}", e),
        }
    }

    async fn try_append(
        report_root: &Path,
        report_key: &str,
        entry: &LedgerEntry<'_>,
    ) -> ArchiveResult<PathBuf> {
        let path = Self::path(report_root, report_key);
        let section = entry.render();

        let document = match fs::read_to_string(&path).await {
            Ok(existing) => insert_before_body_end(&existing, &section),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => shell(report_key, &section),
            Err(e) => return Err(e.into()),
        };

        fs::write(&path, document).await?;
        Ok(path)
    }
}

fn shell(report_key: &str, first_section: &str) -> String {
    let key = escape(report_key);
    format!(
        "<!DOCTYPE html><html><head><meta charset='utf-8'/><title>ChangeLog - {key}</title><style>{BASE_STYLE} {ENTRY_STYLE}</style></head><body><h1>Change Log - {key}</h1>{first_section}</body></html>"
    )
}

/// Insert `section` before the last closing body tag, or append it with a
/// fresh closing tag when there is none.
fn insert_before_body_end(existing: &str, section: &str) -> String {
    // ASCII lowercasing keeps byte offsets identical.
    match existing.to_ascii_lowercase().rfind(BODY_END) {
        Some(idx) => {
            let mut updated = String::with_capacity(existing.len() + section.len());
            updated.push_str(&existing[..idx]);
            updated.push_str(section);
            updated.push_str(&existing[idx..]);
            updated
        }
        None => format!("{existing}{section}\n</body></html>"),
    }
}
