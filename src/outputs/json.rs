//! JSON report files.
//!
//! Reports are grouped by the UTC date they were generated on, and named
//! after the search term plus the generation time so repeated runs on one
//! day do not overwrite each other.

use crate::models::SearchReport;
use crate::utils::{ensure_writable_dir, slugify_title};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Path a report is written to: `{output_dir}/{date}/{slug}_{HHMMSS}.json`.
pub fn report_path(report: &SearchReport, output_dir: &Path) -> PathBuf {
    let mut slug = slugify_title(&report.search_key);
    if slug.is_empty() {
        slug = "search".to_string();
    }
    output_dir
        .join(report.generated_at.date_naive().to_string())
        .join(format!("{slug}_{}.json", report.generated_at.format("%H%M%S")))
}

/// Write a [`SearchReport`] as pretty-printed JSON.
///
/// Creates the date directory as needed and returns the written path.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_report(
    report: &SearchReport,
    output_dir: &Path,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;
    let path = report_path(report, output_dir);

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to prepare JSON dir");
            return Err(e);
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), articles = report.result.len(), "Wrote JSON report");
    Ok(path)
}
