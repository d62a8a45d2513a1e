// src/core/export.rs

use crate::core::models::Report;
use crate::logging::get_data_dir;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// `<data dir>/reports`.
pub fn default_export_dir() -> PathBuf {
    get_data_dir().join("reports")
}

/// File name for `report`: the target (made filesystem-safe) and its scan time.
pub fn export_file_name(report: &Report) -> String {
    let target: String = report
        .target
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("{target}-{}.json", report.scan_time.format("%Y%m%dT%H%M%SZ"))
}

/// Writes `report` as pretty JSON into `dir`, creating it if needed.
pub fn write_report(report: &Report, dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(report));
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json)?;
    info!(target = %report.target, path = %path.display(), "Report exported.");
    Ok(path)
}
