//! Cross-process advisory lock for a sync run
//!
//! The lock file sits next to the root declaration file as
//! `.{root name}.reqsync.lock`. Acquisition retries with exponential backoff
//! until the timeout elapses. If the platform cannot lock at all the run
//! proceeds unlocked with a warning.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;

use crate::{Error, Result};

const INITIAL_RETRY: Duration = Duration::from_millis(20);
const MAX_RETRY: Duration = Duration::from_millis(250);

/// Lock file path guarding runs against `root`.
pub fn lock_path_for(root: &Path) -> PathBuf {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    root.with_file_name(format!(".{name}.reqsync.lock"))
}

/// Exclusive lock held for the lifetime of the value.
#[derive(Debug)]
pub struct AdvisoryLock {
    path: PathBuf,
    file: Option<File>,
}

impl AdvisoryLock {
    /// Take the lock guarding `root`, waiting at most `timeout`.
    ///
    /// Returns [`Error::LockTimeout`] if another process still holds it when
    /// the timeout elapses.
    pub fn acquire(root: &Path, timeout: Duration) -> Result<Self> {
        let path = lock_path_for(root);

        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(
                    "Unable to open lock file {}: {}. Proceeding without a lock.",
                    path.display(),
                    e
                );
                return Ok(Self { path, file: None });
            }
        };

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(INITIAL_RETRY)
            .with_max_interval(MAX_RETRY)
            .with_max_elapsed_time(Some(timeout))
            .build();

        let attempt = || {
            file.try_lock_exclusive().map_err(|e| {
                if is_contended(&e) {
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        };

        match backoff::retry(policy, attempt) {
            Ok(()) => {
                tracing::debug!("Acquired lock {}", path.display());
                Ok(Self {
                    path,
                    file: Some(file),
                })
            }
            Err(backoff::Error::Transient { .. }) => Err(Error::LockTimeout { path, timeout }),
            Err(backoff::Error::Permanent(e)) => {
                tracing::warn!(
                    "File locking unavailable for {}: {}. Proceeding without a lock.",
                    path.display(),
                    e
                );
                Ok(Self { path, file: None })
            }
        }
    }

    /// Whether an OS lock is actually held (false when running unlocked).
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AdvisoryLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take()
            && let Err(e) = FileExt::unlock(&file)
        {
            tracing::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
