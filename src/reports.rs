//! Saving PDF reports returned by the analysis service

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::UploadResult;

/// `report_Ana_Maria_20250101_120000.pdf`
pub fn default_report_name(candidate_name: &str) -> String {
    format!(
        "report_{}_{}.pdf",
        sanitize(candidate_name),
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Strip anything that could escape the report directory.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "candidate".to_string()
    } else {
        cleaned
    }
}

/// Write `bytes` into `dir`, preferring the server-suggested file name.
pub fn save_report(
    dir: &Path,
    suggested: Option<&str>,
    candidate_name: &str,
    bytes: &[u8],
) -> UploadResult<PathBuf> {
    let file_name = suggested
        .and_then(|s| Path::new(s).file_name())
        .map(|n| sanitize(&n.to_string_lossy()))
        .unwrap_or_else(|| default_report_name(candidate_name));

    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    fs::write(&path, bytes)?;
    log::info!("report saved to {}", path.display());
    Ok(path)
}
