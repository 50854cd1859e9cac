//! Plain-text export of the canonical (English) result.

use crate::session::CanonicalResult;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::info;

/// File name for an export made on `date`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("page-digest-{}.txt", date.format("%Y%m%d"))
}

/// Title, blank line, body. Key-point results list their points as `- ` lines.
pub fn export_text(result: &CanonicalResult) -> String {
    let body = match &result.key_points {
        Some(points) => points
            .iter()
            .map(|point| format!("- {}", point))
            .collect::<Vec<_>>()
            .join("\n"),
        None => result.english_body.clone(),
    };

    let mut text = String::new();
    if !result.title.is_empty() {
        text.push_str(&result.title);
        text.push_str("\n\n");
    }
    text.push_str(&body);
    text.push('\n');
    text
}

/// Write the result to `dir`, named after `date`. Overwrites an export made
/// earlier the same day.
pub fn export_to(result: &CanonicalResult, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    let path = dir.join(export_file_name(date));
    std::fs::write(&path, export_text(result))
        .with_context(|| format!("Failed to write export file {}", path.display()))?;
    info!("Exported {} result to {}", result.produced_by.as_str(), path.display());
    Ok(path)
}

/// Write the result to `dir` using today's local date.
pub fn export(result: &CanonicalResult, dir: &Path) -> Result<PathBuf> {
    export_to(result, dir, Local::now().date_naive())
}
