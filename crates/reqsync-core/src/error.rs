//! Error types for reqsync-core

use std::path::PathBuf;

/// Result type for reqsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stable process exit codes, one per error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitCode {
    Ok = 0,
    Generic = 1,
    MissingFile = 2,
    HashesPresent = 3,
    UpgradeFailed = 4,
    ParseError = 5,
    SystemPythonBlocked = 7,
    DirtyRepoBlocked = 8,
    LockTimeout = 9,
    WriteFailedRolledBack = 10,
    ChangesWouldBeMade = 11,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Category of a filesystem error surfacing outside the commit step.
    pub fn for_fs(error: &reqsync_fs::Error) -> Self {
        match error {
            reqsync_fs::Error::LockTimeout { .. } => Self::LockTimeout,
            reqsync_fs::Error::InvalidEncoding { .. } => Self::ParseError,
            _ => Self::Generic,
        }
    }
}

/// Errors that can occur in reqsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Root declaration file does not exist
    #[error("Requirements file not found: {path}")]
    MissingFile { path: PathBuf },

    /// A hash-pinned line was found and hashes were not explicitly allowed
    #[error("{path} contains --hash pins. Re-run with --allow-hashes to skip hashed lines.")]
    HashPinsPresent { path: PathBuf },

    /// Upgrade step exited non-zero
    #[error("Upgrade step failed with exit code {code}. See logs.")]
    UpgradeFailed { code: i32, output: String },

    /// Upgrade step exceeded its time budget
    #[error("Upgrade step did not finish within {seconds}s")]
    UpgradeTimedOut { seconds: u64 },

    /// A resolved file could not be decoded as text
    #[error("Unable to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// No isolated environment is active
    #[error(
        "Refusing to run outside a virtualenv. Re-run with --system-ok if you really know what you're doing."
    )]
    SystemPythonBlocked,

    /// Working tree has uncommitted changes
    #[error("Repository at {path} has uncommitted changes. Re-run with --allow-dirty to override.")]
    DirtyRepoBlocked { path: PathBuf },

    /// Another run holds the lock for this root
    #[error("Unable to acquire reqsync lock at {path} within {seconds}s")]
    LockTimeout { path: PathBuf, seconds: u64 },

    /// A write failed and every written file was restored from its backup
    #[error("Write failed and backups restored: {source}")]
    WriteRolledBack {
        path: PathBuf,
        #[source]
        source: reqsync_fs::Error,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from reqsync-fs
    #[error(transparent)]
    Fs(#[from] reqsync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Exit code the caller should terminate with for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::MissingFile { .. } => ExitCode::MissingFile,
            Self::HashPinsPresent { .. } => ExitCode::HashesPresent,
            Self::UpgradeFailed { .. } | Self::UpgradeTimedOut { .. } => ExitCode::UpgradeFailed,
            Self::Parse { .. } => ExitCode::ParseError,
            Self::SystemPythonBlocked => ExitCode::SystemPythonBlocked,
            Self::DirtyRepoBlocked { .. } => ExitCode::DirtyRepoBlocked,
            Self::LockTimeout { .. } => ExitCode::LockTimeout,
            Self::WriteRolledBack { .. } => ExitCode::WriteFailedRolledBack,
            Self::Fs(e) => ExitCode::for_fs(e),
            Self::Config { .. } | Self::Io(_) | Self::Json(_) => ExitCode::Generic,
        }
    }
}
