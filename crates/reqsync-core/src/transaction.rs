//! Transactional commit of rewritten files
//!
//! Files are committed one at a time in processing order. Each file is
//! backed up before it is replaced. If any replacement fails, every file
//! touched so far is restored from its backup and the run reports
//! [`Error::WriteRolledBack`]. Backups are kept in every outcome.

use std::path::{Path, PathBuf};

use reqsync_fs::{BackupPolicy, TextEncoding, create_backup, restore_backup, write_text_preserve};

use crate::{Error, Result};

/// Replaces a file's content. Swappable so failure paths can be exercised.
pub trait FileWriter {
    fn write(&self, path: &Path, text: &str, encoding: TextEncoding) -> reqsync_fs::Result<()>;
}

/// Atomic temp-file-then-rename writer preserving BOM and newline style.
#[derive(Debug, Default, Clone, Copy)]
pub struct AtomicWriter;

impl FileWriter for AtomicWriter {
    fn write(&self, path: &Path, text: &str, encoding: TextEncoding) -> reqsync_fs::Result<()> {
        write_text_preserve(path, text, encoding)
    }
}

/// New content destined for one file.
#[derive(Debug, Clone, Copy)]
pub struct PendingWrite<'a> {
    pub path: &'a Path,
    pub text: &'a str,
    pub encoding: TextEncoding,
}

/// Back up and write every pending file, rolling back on failure.
///
/// Returns the backups created, in write order.
///
/// # Errors
///
/// - The plain backup error if the very first backup fails (nothing has
///   been written yet).
/// - [`Error::WriteRolledBack`] if a later backup or any write fails, after
///   restoring every file written so far.
pub fn commit(
    writes: &[PendingWrite<'_>],
    policy: &BackupPolicy,
    writer: &dyn FileWriter,
) -> Result<Vec<PathBuf>> {
    let mut backups: Vec<PathBuf> = Vec::with_capacity(writes.len());
    let mut written: Vec<(&Path, usize)> = Vec::with_capacity(writes.len());

    for pending in writes {
        let backup = match create_backup(pending.path, policy) {
            Ok(backup) => backup,
            Err(e) if written.is_empty() => return Err(e.into()),
            Err(e) => {
                rollback(&written, &backups);
                return Err(Error::WriteRolledBack {
                    path: pending.path.to_path_buf(),
                    source: e,
                });
            }
        };
        backups.push(backup);
        let backup_index = backups.len() - 1;

        if let Err(e) = writer.write(pending.path, pending.text, pending.encoding) {
            tracing::warn!("Write to {} failed: {}. Rolling back.", pending.path.display(), e);
            written.push((pending.path, backup_index));
            rollback(&written, &backups);
            return Err(Error::WriteRolledBack {
                path: pending.path.to_path_buf(),
                source: e,
            });
        }

        tracing::info!("Wrote {}", pending.path.display());
        written.push((pending.path, backup_index));
    }

    Ok(backups)
}

/// Restore each touched file from its backup, newest first. Failures are
/// logged only.
fn rollback(written: &[(&Path, usize)], backups: &[PathBuf]) {
    for (target, index) in written.iter().rev() {
        let backup = &backups[*index];
        match restore_backup(backup, target) {
            Ok(()) => tracing::info!("Restored {} from {}", target.display(), backup.display()),
            Err(e) => tracing::warn!("Failed to restore {}: {}", target.display(), e),
        }
    }
}
