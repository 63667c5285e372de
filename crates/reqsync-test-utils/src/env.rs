//! [`ScriptedEnvironment`]: an in-memory stand-in for a Python environment.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqsync_core::{Environment, Error, Result, UpgradeOutput};

/// Scripted answers for every collaborator call, with call counters.
///
/// # Example
///
/// ```rust,no_run
/// use reqsync_test_utils::ScriptedEnvironment;
///
/// let env = ScriptedEnvironment::new()
///     .with_version("pandas", "2.2.2")
///     .with_upgrade_exit(0);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedEnvironment {
    versions: RefCell<HashMap<String, String>>,
    versions_after_upgrade: Option<HashMap<String, String>>,
    upgrade_code: i32,
    upgrade_output: String,
    upgrade_times_out: bool,
    isolated: bool,
    dirty: bool,
    /// Number of `installed_versions` calls
    pub version_queries: Cell<usize>,
    /// Number of `run_upgrade` calls
    pub upgrades: Cell<usize>,
    /// Arguments of the last upgrade call
    pub last_upgrade: RefCell<Option<(PathBuf, Duration, String)>>,
}

impl ScriptedEnvironment {
    /// Isolated, clean environment with nothing installed.
    pub fn new() -> Self {
        Self {
            isolated: true,
            ..Self::default()
        }
    }

    pub fn with_version(self, name: &str, version: &str) -> Self {
        self.versions
            .borrow_mut()
            .insert(name.to_string(), version.to_string());
        self
    }

    pub fn with_versions(self, pairs: &[(&str, &str)]) -> Self {
        pairs
            .iter()
            .fold(self, |env, (name, version)| env.with_version(name, version))
    }

    /// Versions reported once an upgrade has run.
    pub fn with_versions_after_upgrade(mut self, pairs: &[(&str, &str)]) -> Self {
        self.versions_after_upgrade = Some(
            pairs
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn with_upgrade_exit(mut self, code: i32) -> Self {
        self.upgrade_code = code;
        self
    }

    pub fn with_upgrade_output(mut self, output: &str) -> Self {
        self.upgrade_output = output.to_string();
        self
    }

    pub fn with_upgrade_timeout(mut self) -> Self {
        self.upgrade_times_out = true;
        self
    }

    /// Behave as if no virtualenv were active.
    pub fn system_python(mut self) -> Self {
        self.isolated = false;
        self
    }

    /// Behave as if the working tree had uncommitted changes.
    pub fn dirty(mut self) -> Self {
        self.dirty = true;
        self
    }
}

impl Environment for ScriptedEnvironment {
    fn installed_versions(&self) -> Result<HashMap<String, String>> {
        self.version_queries.set(self.version_queries.get() + 1);
        Ok(self.versions.borrow().clone())
    }

    fn run_upgrade(&self, root: &Path, timeout: Duration, extra_args: &str) -> Result<UpgradeOutput> {
        self.upgrades.set(self.upgrades.get() + 1);
        *self.last_upgrade.borrow_mut() =
            Some((root.to_path_buf(), timeout, extra_args.to_string()));

        if self.upgrade_times_out {
            return Err(Error::UpgradeTimedOut {
                seconds: timeout.as_secs(),
            });
        }
        if self.upgrade_code == 0
            && let Some(after) = &self.versions_after_upgrade
        {
            *self.versions.borrow_mut() = after.clone();
        }
        Ok(UpgradeOutput {
            code: self.upgrade_code,
            output: self.upgrade_output.clone(),
        })
    }

    fn ensure_isolated(&self, allow_system: bool) -> Result<()> {
        if self.isolated || allow_system {
            Ok(())
        } else {
            Err(Error::SystemPythonBlocked)
        }
    }

    fn ensure_repo_clean(&self, repo_root: &Path, allow_dirty: bool) -> Result<()> {
        if self.dirty && !allow_dirty {
            Err(Error::DirtyRepoBlocked {
                path: repo_root.to_path_buf(),
            })
        } else {
            Ok(())
        }
    }
}
