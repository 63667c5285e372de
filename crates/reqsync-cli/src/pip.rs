//! pip-backed [`Environment`]
//!
//! Installed versions come from `python -m pip list --format=json`; the
//! upgrade step is `python -m pip install -U -r <root>` plus any extra
//! arguments that survive the allowlist.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use reqsync_core::{Environment, Error, Result, UpgradeOutput, canonicalize_name};
use serde::Deserialize;

use crate::gate;

/// Options accepted by the upgrade step, and whether each takes a value.
const ALLOWED_PIP_FLAGS: &[(&str, bool)] = &[
    ("--index-url", true),
    ("--extra-index-url", true),
    ("--trusted-host", true),
    ("--find-links", true),
    ("--proxy", true),
    ("--retries", true),
    ("--timeout", true),
    ("--constraint", true),
    ("-c", true),
    ("--requirement", true),
    ("-r", true),
    ("--no-deps", false),
];

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Deserialize)]
struct PipListEntry {
    name: String,
    version: String,
}

/// The Python interpreter of the active virtualenv, or the one on `PATH`.
pub fn default_python() -> PathBuf {
    match std::env::var_os("VIRTUAL_ENV").filter(|v| !v.is_empty()) {
        Some(venv) => venv_python(Path::new(&venv)),
        None if cfg!(windows) => PathBuf::from("python"),
        None => PathBuf::from("python3"),
    }
}

fn venv_python(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join("python.exe")
    } else {
        venv.join("bin").join("python")
    }
}

/// Runs pip through a specific interpreter.
#[derive(Debug, Clone)]
pub struct PipEnvironment {
    python: PathBuf,
}

impl Default for PipEnvironment {
    fn default() -> Self {
        Self::new(default_python())
    }
}

impl PipEnvironment {
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
        }
    }

    fn pip(&self) -> Command {
        let mut cmd = Command::new(&self.python);
        cmd.arg("-m").arg("pip");
        cmd
    }
}

impl Environment for PipEnvironment {
    fn installed_versions(&self) -> Result<HashMap<String, String>> {
        let output = self
            .pip()
            .args(["list", "--format=json", "--disable-pip-version-check"])
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Io(std::io::Error::other(format!(
                "pip list failed with {}: {}",
                output.status,
                stderr.trim()
            ))));
        }

        parse_pip_list(&output.stdout)
    }

    fn run_upgrade(&self, root: &Path, timeout: Duration, extra_args: &str) -> Result<UpgradeOutput> {
        let extras = allowlisted_pip_args(extra_args)?;

        let mut cmd = self.pip();
        cmd.args(["install", "-U", "-r"]).arg(root).args(&extras);
        tracing::info!("Running: {:?}", cmd);

        // One file for both streams keeps the interleaving pip produced.
        let mut log = tempfile::tempfile()?;
        let child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log.try_clone()?))
            .spawn()?;

        let code = wait_with_timeout(child, timeout)?;

        let mut raw = Vec::new();
        log.seek(SeekFrom::Start(0))?;
        log.read_to_end(&mut raw)?;
        let output = String::from_utf8_lossy(&raw).into_owned();
        tracing::info!("pip output:\n{}", output);

        Ok(UpgradeOutput { code, output })
    }

    fn ensure_isolated(&self, allow_system: bool) -> Result<()> {
        if allow_system || gate::virtualenv_active() {
            Ok(())
        } else {
            Err(Error::SystemPythonBlocked)
        }
    }

    fn ensure_repo_clean(&self, repo_root: &Path, allow_dirty: bool) -> Result<()> {
        if !allow_dirty && gate::is_git_dirty(repo_root) {
            Err(Error::DirtyRepoBlocked {
                path: repo_root.to_path_buf(),
            })
        } else {
            Ok(())
        }
    }
}

/// Poll the child until it exits or `timeout` elapses, killing it on timeout.
fn wait_with_timeout(mut child: std::process::Child, timeout: Duration) -> Result<i32> {
    let deadline = Instant::now().checked_add(timeout);

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status.code().unwrap_or(1));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::UpgradeTimedOut {
                seconds: timeout.as_secs(),
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Canonical name to version map from `pip list --format=json` output.
fn parse_pip_list(stdout: &[u8]) -> Result<HashMap<String, String>> {
    let entries: Vec<PipListEntry> = serde_json::from_slice(stdout)?;
    Ok(entries
        .into_iter()
        .filter(|e| !e.name.is_empty() && !e.version.is_empty())
        .map(|e| (canonicalize_name(&e.name), e.version))
        .collect())
}

/// Split `extra_args` shell-style and keep only allowlisted pip options.
///
/// An allowed option that takes a value keeps the following token unless it
/// is itself an option or the value was attached with `=`. An unknown option
/// is dropped together with such a following value.
pub fn allowlisted_pip_args(extra_args: &str) -> Result<Vec<String>> {
    let tokens = split_shell_words(extra_args)?;
    let mut out = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        let (option, attached) = match token.split_once('=') {
            Some((option, _)) => (option, true),
            None => (token.as_str(), false),
        };
        let next_is_value = !attached
            && tokens
                .get(i + 1)
                .is_some_and(|next| !next.starts_with('-'));

        match ALLOWED_PIP_FLAGS.iter().find(|(flag, _)| *flag == option) {
            Some((_, takes_value)) => {
                out.push(token.clone());
                if *takes_value && next_is_value {
                    out.push(tokens[i + 1].clone());
                    i += 1;
                }
            }
            None => {
                tracing::warn!("Dropping pip argument not on the allowlist: {}", token);
                if option.starts_with('-') && next_is_value {
                    i += 1;
                }
            }
        }
        i += 1;
    }

    Ok(out)
}

/// Shell-style word splitting of the extra pip arguments.
pub fn split_shell_words(input: &str) -> Result<Vec<String>> {
    shell_words::split(input).map_err(|e| Error::config(format!("invalid pip arguments: {e}")))
}
