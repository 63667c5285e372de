//! Rendering of sync results: unified diffs, summaries and JSON reports

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use similar::TextDiff;

use crate::Result;
use crate::engine::{FileResult, SyncResult};
use crate::graph::FileRole;

const DEFAULT_REPORT_NAME: &str = "reqsync-report.json";

/// Unified diff over every file whose text changed.
///
/// Returns `None` when nothing changed.
pub fn make_diff(files: &[FileResult]) -> Option<String> {
    let chunks: Vec<String> = files
        .iter()
        .filter(|file| file.changed())
        .map(|file| {
            let old_header = format!("{} (old)", file.file.display());
            let new_header = format!("{} (new)", file.file.display());
            TextDiff::from_lines(&file.original_text, &file.new_text)
                .unified_diff()
                .header(&old_header, &new_header)
                .to_string()
        })
        .filter(|chunk| !chunk.is_empty())
        .collect();

    if chunks.is_empty() {
        None
    } else {
        Some(chunks.join("\n"))
    }
}

/// One line per change, or `No changes.`
pub fn summarize(result: &SyncResult) -> String {
    let rows: Vec<String> = result
        .changes()
        .map(|change| {
            let file_name = change
                .file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!(
                "{}: -> >= {} [{}]",
                change.package, change.installed_version, file_name
            )
        })
        .collect();

    if rows.is_empty() {
        "No changes.".to_string()
    } else {
        rows.join("\n")
    }
}

/// Machine-readable form of a [`SyncResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonReport {
    pub changed: bool,
    pub files: Vec<JsonFileResult>,
    pub changes: Vec<JsonChange>,
    pub backup_paths: Vec<String>,
    pub diff: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonFileResult {
    pub file: String,
    pub role: FileRole,
    pub changed: bool,
    pub change_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonChange {
    pub file: String,
    pub package: String,
    pub installed_version: String,
    pub old_line: String,
    pub new_line: String,
}

/// Build the JSON report; line terminators are stripped from change lines.
pub fn to_json(result: &SyncResult) -> JsonReport {
    let files = result
        .files
        .iter()
        .map(|file| JsonFileResult {
            file: file.file.display().to_string(),
            role: file.role,
            changed: file.changed(),
            change_count: file.changes.len(),
        })
        .collect();

    let changes = result
        .changes()
        .map(|change| JsonChange {
            file: change.file.display().to_string(),
            package: change.package.clone(),
            installed_version: change.installed_version.clone(),
            old_line: strip_eol(&change.old_line).to_string(),
            new_line: strip_eol(&change.new_line).to_string(),
        })
        .collect();

    JsonReport {
        changed: result.changed,
        files,
        changes,
        backup_paths: result
            .backup_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
        diff: result.diff.clone(),
    }
}

fn strip_eol(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// Write `report` as pretty JSON and return where it landed.
///
/// A directory target (or an empty / `.` path) receives
/// `reqsync-report.json`. Missing parent directories are created.
pub fn write_json_report(report: &JsonReport, path: &Path) -> Result<PathBuf> {
    let target = if path.is_dir() {
        path.join(DEFAULT_REPORT_NAME)
    } else if matches!(path.to_str().map(str::trim), Some("" | ".")) {
        PathBuf::from(DEFAULT_REPORT_NAME)
    } else {
        path.to_path_buf()
    };

    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(report)?;
    fs::write(&target, json)?;
    tracing::debug!("Wrote JSON report to {}", target.display());
    Ok(target)
}
