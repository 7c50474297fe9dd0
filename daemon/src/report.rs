use chrono::NaiveDate;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{info, warn};

use crate::tagger::Label;

pub const MARKDOWN_NAME: &str = "daily_log.md";
pub const PDF_NAME: &str = "daily_log.pdf";
pub const TAGS_NAME: &str = "tags.json";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to create log directory {0}: {1}")]
    CreateDir(String, std::io::Error),
    #[error("failed to write {0}: {1}")]
    Write(String, std::io::Error),
    #[error("failed to serialize tags: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Log directory for `date`, e.g. `logs/2026-10-19`. Created if missing.
pub fn daily_log_dir(base: &Path, date: NaiveDate) -> Result<PathBuf, ReportError> {
    let dir = base.join(date.format("%Y-%m-%d").to_string());
    std::fs::create_dir_all(&dir)
        .map_err(|e| ReportError::CreateDir(dir.display().to_string(), e))?;
    Ok(dir)
}

/// Daily log body. Schedule warnings, if any, follow the item list under
/// their own heading.
pub fn markdown(date: NaiveDate, items: &[Label], warnings: &[String]) -> String {
    let mut out = format!("# Daily Log - {}\n\n", date.format("%Y-%m-%d"));
    for item in items {
        let _ = writeln!(out, "- **{}** | {} | {}", item.file, item.trade, item.completion);
    }
    if !warnings.is_empty() {
        out.push_str("\n## Schedule\n\n");
        for warning in warnings {
            let _ = writeln!(out, "- {warning}");
        }
    }
    out
}

pub fn render_markdown(
    date: NaiveDate,
    items: &[Label],
    warnings: &[String],
    out_dir: &Path,
) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| ReportError::CreateDir(out_dir.display().to_string(), e))?;
    let path = out_dir.join(MARKDOWN_NAME);
    std::fs::write(&path, markdown(date, items, warnings))
        .map_err(|e| ReportError::Write(path.display().to_string(), e))?;
    info!(
        path = %path.display(),
        items = items.len(),
        warnings = warnings.len(),
        "wrote daily log"
    );
    Ok(path)
}

/// Raw labels next to the log so it can be re-rendered later.
pub fn write_tags(items: &[Label], out_dir: &Path) -> Result<PathBuf, ReportError> {
    let path = out_dir.join(TAGS_NAME);
    let json = serde_json::to_vec_pretty(items)?;
    std::fs::write(&path, json).map_err(|e| ReportError::Write(path.display().to_string(), e))?;
    Ok(path)
}

/// Best-effort PDF conversion through `wkhtmltopdf`. Failures are logged and
/// the target path is returned regardless.
pub fn render_pdf(markdown_path: &Path) -> PathBuf {
    let pdf_path = markdown_path.with_file_name(PDF_NAME);
    match Command::new("wkhtmltopdf")
        .arg("--quiet")
        .arg(markdown_path)
        .arg(&pdf_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => {
            info!(path = %pdf_path.display(), "wrote daily log PDF");
        }
        Ok(status) => {
            warn!(status = %status, "wkhtmltopdf failed, no PDF written");
        }
        Err(e) => {
            warn!(error = %e, "wkhtmltopdf not available, no PDF written");
        }
    }
    pdf_path
}
