//! Error types for reqsync-cli

use reqsync_core::ExitCode;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from reqsync-core
    #[error(transparent)]
    Core(#[from] reqsync_core::Error),

    /// Error from reqsync-fs
    #[error(transparent)]
    Fs(#[from] reqsync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON rendering error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Core(e) => e.exit_code(),
            Self::Fs(e) => ExitCode::for_fs(e),
            Self::Io(_) | Self::Json(_) | Self::User { .. } => ExitCode::Generic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn user_error_displays_message() {
        let error = CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
        assert_eq!(error.exit_code(), ExitCode::Generic);
    }

    #[test]
    fn core_errors_keep_their_codes() {
        let error = CliError::from(reqsync_core::Error::SystemPythonBlocked);
        assert_eq!(error.exit_code().code(), 7);
    }

    #[test]
    fn fs_lock_timeout_maps_to_lock_code() {
        let error = CliError::from(reqsync_fs::Error::LockTimeout {
            path: PathBuf::from("requirements.txt"),
            timeout: Duration::from_secs(1),
        });
        assert_eq!(error.exit_code(), ExitCode::LockTimeout);
    }
}
