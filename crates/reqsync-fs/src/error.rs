//! Error types for reqsync-fs

use std::path::PathBuf;
use std::time::Duration;

/// Result type for reqsync-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in reqsync-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8 text")]
    InvalidEncoding { path: PathBuf },

    #[error("Cannot back up missing file: {path}")]
    BackupMissing { path: PathBuf },

    #[error("No free backup name left for {path}")]
    BackupCollision { path: PathBuf },

    #[error("Unable to acquire lock at {path} within {}s", timeout.as_secs())]
    LockTimeout { path: PathBuf, timeout: Duration },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
