//! HTML rendering for version summaries.

use chrono::{DateTime, Utc};

/// Shared dark stylesheet for the summary and changelog documents.
pub(crate) const BASE_STYLE: &str = "body{font-family:Segoe UI,Arial,sans-serif;margin:24px;background:#0d1b22;color:#e6f9ff} h1,h2{font-weight:600} a{color:#7fdbff} code,pre{background:#0e1a21;color:#e6f9ff;padding:2px 4px;border-radius:4px} table{border-collapse:collapse} td,th{border:1px solid #1f3a46;padding:6px 8px} .muted{color:#a5c7d1}";

const SUMMARY_STYLE: &str = ".grid{display:grid;grid-template-columns:1fr 1fr;gap:16px} .section{margin-top:24px}";

/// Escape text for inclusion in HTML content or attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Format an integer with `,` thousands separators.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `2024-01-31 09:15:00Z`
pub(crate) fn format_utc(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%SZ").to_string()
}

/// Name, size and modification time of one archived file.
#[derive(Debug, Clone)]
pub struct FileFacts {
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl FileFacts {
    pub async fn read(path: &std::path::Path) -> std::io::Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(Self {
            name: reportvault_util::path::file_name_string(path),
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    fn to_html(&self, heading: &str) -> String {
        let modified = self
            .modified
            .map(format_utc)
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "<div><h3>{heading}</h3><ul><li>File: <code>{}</code></li><li>Size: {} bytes</li><li>Modified: {} UTC</li></ul></div>",
            escape(&self.name),
            group_thousands(self.size),
            escape(&modified)
        )
    }
}

/// Everything that goes into a version's `changes.html`.
pub struct SummaryDocument<'a> {
    pub report_key: &'a str,
    pub message: &'a str,
    pub generated: DateTime<Utc>,
    pub original: &'a FileFacts,
    pub changed: &'a FileFacts,
    pub diff_html: &'a str,
    pub analysis_html: Option<&'a str>,
}

impl SummaryDocument<'_> {
    pub fn render(&self) -> String {
        let key = escape(self.report_key);
        let mut html = String::new();
        html.push_str("<!DOCTYPE html><html><head><meta charset='utf-8'/><title>");
        html.push_str(&key);
        html.push_str(" - Version</title><style>");
        html.push_str(BASE_STYLE);
        html.push(' ');
        html.push_str(SUMMARY_STYLE);
        html.push_str("</style></head><body>");
        html.push_str(&format!("<h1>{key} - Version</h1>"));

        if !self.message.trim().is_empty() {
            html.push_str(&format!(
                "<p><strong>Message:</strong> {}</p>",
                escape(self.message)
            ));
        }
        html.push_str(&format!(
            "<p class='muted'>Generated {} (UTC)</p>",
            format_utc(self.generated)
        ));

        html.push_str("<div class='section'><h2>Inputs</h2><div class='grid'>");
        html.push_str(&self.original.to_html("Original"));
        html.push_str(&self.changed.to_html("Changed"));
        html.push_str("</div></div>");

        html.push_str("<div class='section'><h2>Binary diff summary</h2>");
        html.push_str(self.diff_html);
        html.push_str("</div>");

        html.push_str("<div class='section'><h2>Report analysis</h2>");
        match self.analysis_html.filter(|h| !h.trim().is_empty()) {
            Some(fragment) => html.push_str(fragment),
            None => html.push_str(
                "<p class='muted'>Structural analysis was not available. Only binary-level details are shown.</p>",
            ),
        }
        html.push_str("</div>");

        html.push_str("</body></html>");
        html
    }
}
