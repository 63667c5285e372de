use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::{CliError, Result};

/// Console level directive for the given flags.
///
/// `--quiet` wins over `-v`; `-vv` and above means debug.
pub fn console_level(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) | (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    }
}

/// Install the global subscriber.
///
/// Logs go to stderr so stdout stays clean for `--output json`. `RUST_LOG`
/// replaces the computed console level when set. With `log_file`, a second
/// plain-text layer appends every DEBUG-and-above event to that file.
pub fn init(verbose: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(console_level(verbose, quiet)))
        .map_err(|e| CliError::user(format!("Invalid log filter: {e}")))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(console_filter);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::user(format!("Failed to set tracing subscriber: {e}")))?;

    tracing::debug!("Logging initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, false, "warn")]
    #[case(1, false, "info")]
    #[case(2, false, "debug")]
    #[case(5, false, "debug")]
    #[case(2, true, "warn")]
    fn levels(#[case] verbose: u8, #[case] quiet: bool, #[case] expected: &str) {
        assert_eq!(console_level(verbose, quiet), expected);
    }
}
