//! Sibling backups for declaration files
//!
//! A backup lives next to its source file. Timestamped backups are named
//! `{file}{suffix}.{YYYYmmdd-HHMMSS-micros}` with a `-NN` counter appended on
//! collision, and are pruned to a retention count after each new one.
//! Untimestamped backups use a single `{file}{suffix}` name that is
//! overwritten every run.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;

use crate::{Error, Result, io};

/// Upper bound on collision retries for one timestamp
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// How backups are named and retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPolicy {
    /// Appended to the source file name (e.g. `.bak`)
    pub suffix: String,
    /// Embed a timestamp in each backup name
    pub timestamped: bool,
    /// Timestamped backups to keep per source file; 0 disables pruning
    pub keep_last: usize,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self {
            suffix: ".bak".to_string(),
            timestamped: true,
            keep_last: 5,
        }
    }
}

/// Copy the current on-disk content of `path` to a new backup.
///
/// Returns the backup path.
pub fn create_backup(path: &Path, policy: &BackupPolicy) -> Result<PathBuf> {
    if !path.is_file() {
        return Err(Error::BackupMissing {
            path: path.to_path_buf(),
        });
    }

    let backup = if policy.timestamped {
        let stamp = Local::now().format("%Y%m%d-%H%M%S-%6f").to_string();
        timestamped_backup_path(path, &policy.suffix, &stamp)?
    } else {
        path.with_file_name(format!("{}{}", file_name(path), policy.suffix))
    };

    fs::copy(path, &backup).map_err(|e| Error::io(&backup, e))?;

    if policy.timestamped {
        prune_backups(path, &policy.suffix, policy.keep_last);
    }

    tracing::info!("Backed up to: {}", backup.display());
    Ok(backup)
}

/// First free `{file}{suffix}.{stamp}` name, falling back to `-01`, `-02`, ...
pub(crate) fn timestamped_backup_path(path: &Path, suffix: &str, stamp: &str) -> Result<PathBuf> {
    let base_name = format!("{}{}.{}", file_name(path), suffix, stamp);
    let mut candidate = path.with_file_name(&base_name);

    let mut counter = 1;
    while candidate.exists() {
        if counter > MAX_NAME_ATTEMPTS {
            return Err(Error::BackupCollision {
                path: path.to_path_buf(),
            });
        }
        candidate = path.with_file_name(format!("{base_name}-{counter:02}"));
        counter += 1;
    }

    Ok(candidate)
}

/// Delete timestamped backups of `path` beyond the newest `keep_last`.
///
/// Newest is decided by modification time, then by name (the embedded
/// timestamp and counter sort lexically). Failures to delete are logged and
/// skipped. Returns the backups that were removed.
pub fn prune_backups(path: &Path, suffix: &str, keep_last: usize) -> Vec<PathBuf> {
    if keep_last == 0 {
        return Vec::new();
    }

    let prefix = format!("{}{}.", file_name(path), suffix);
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir,
        None => Path::new("."),
    };
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Unable to list backups in {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut backups: Vec<(SystemTime, String, PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&prefix) {
                return None;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, name, entry.path()))
        })
        .collect();

    backups.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

    let mut removed = Vec::new();
    for (_, _, stale) in backups.into_iter().skip(keep_last) {
        match fs::remove_file(&stale) {
            Ok(()) => removed.push(stale),
            Err(e) => tracing::warn!("Unable to prune old backup {}: {}", stale.display(), e),
        }
    }
    removed
}

/// Put a backup's bytes back in place of `target`, atomically.
pub fn restore_backup(backup: &Path, target: &Path) -> Result<()> {
    let content = fs::read(backup).map_err(|e| Error::io(backup, e))?;
    io::write_atomic(target, &content)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
