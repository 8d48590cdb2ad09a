//! JSON output for a run.
//!
//! One file per run, named from the export settings' filename template:
//! `{site_name}_{timestamp}.{format}` by default, where the timestamp is the
//! local run start time formatted as `%Y%m%d_%H%M%S`.

use crate::error::{Result, ScrapeError};
use crate::models::ExportSettings;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Render the output file name for a run.
///
/// Path separators in the site name are replaced so the name always lands
/// directly in the export directory.
pub fn output_filename(
    export: &ExportSettings,
    site_name: &str,
    run_at: &DateTime<Local>,
) -> String {
    let safe_site = site_name.replace(['/', '\\'], "_");
    export
        .filename_template
        .replace("{site_name}", &safe_site)
        .replace("{timestamp}", &run_at.format(TIMESTAMP_FORMAT).to_string())
        .replace("{format}", &export.format.to_ascii_lowercase())
}

/// Full path of the output file: `{output_dir}/{export.directory}/{filename}`.
pub fn output_path(
    output_dir: &Path,
    export: &ExportSettings,
    site_name: &str,
    run_at: &DateTime<Local>,
) -> PathBuf {
    let dir = if export.directory.trim().is_empty() {
        output_dir.to_path_buf()
    } else {
        output_dir.join(export.directory.trim())
    };
    dir.join(output_filename(export, site_name, run_at))
}

/// Serialize `records` as pretty JSON and write them to `path`, creating
/// parent directories as needed.
///
/// # Errors
///
/// Any failure to create the directory or write the file is reported as
/// [`ScrapeError::OutputWrite`].
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_records<T: Serialize + ?Sized>(records: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;

    let write_err = |source: std::io::Error| ScrapeError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    fs::write(path, json).await.map_err(write_err)?;
    info!("Wrote JSON output file");
    Ok(())
}
