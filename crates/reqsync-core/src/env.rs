//! Environment collaborators
//!
//! The engine never spawns processes or inspects the host itself. It asks an
//! [`Environment`] for installed versions, for an upgrade run, and for the
//! two safety gates. The installed-version map is memoized in a
//! [`VersionCache`] owned by the caller.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::Result;
use crate::name::canonicalize_name;

/// Exit status and combined stdout/stderr of an upgrade run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeOutput {
    pub code: i32,
    pub output: String,
}

impl UpgradeOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// The host the requirements are synchronized against.
pub trait Environment {
    /// Installed distributions, name to version string.
    fn installed_versions(&self) -> Result<HashMap<String, String>>;

    /// Upgrade everything declared by `root`.
    ///
    /// Returns [`crate::Error::UpgradeTimedOut`] if `timeout` elapses.
    fn run_upgrade(&self, root: &Path, timeout: Duration, extra_args: &str) -> Result<UpgradeOutput>;

    /// Fail with [`crate::Error::SystemPythonBlocked`] outside an isolated
    /// environment unless `allow_system`.
    fn ensure_isolated(&self, allow_system: bool) -> Result<()>;

    /// Fail with [`crate::Error::DirtyRepoBlocked`] when `repo_root` has
    /// uncommitted changes unless `allow_dirty`.
    fn ensure_repo_clean(&self, repo_root: &Path, allow_dirty: bool) -> Result<()>;
}

/// Memoized installed-version map with canonicalized keys.
#[derive(Debug, Default)]
pub struct VersionCache {
    versions: Option<HashMap<String, String>>,
}

impl VersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached map, querying `env` on first use or after [`invalidate`].
    ///
    /// [`invalidate`]: VersionCache::invalidate
    pub fn get(&mut self, env: &dyn Environment) -> Result<&HashMap<String, String>> {
        let versions = match self.versions.take() {
            Some(versions) => versions,
            None => {
                let raw = env.installed_versions()?;
                tracing::debug!("Loaded {} installed distributions", raw.len());
                raw.into_iter()
                    .map(|(name, version)| (canonicalize_name(&name), version))
                    .collect()
            }
        };
        Ok(self.versions.insert(versions))
    }

    /// Drop the cached map; the next [`get`](VersionCache::get) re-queries.
    pub fn invalidate(&mut self) {
        self.versions = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.versions.is_some()
    }
}
