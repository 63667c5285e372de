//! Environment safety gates: virtualenv detection and git working-tree state

use std::ffi::OsString;
use std::path::Path;

use git2::{Repository, StatusOptions};

/// Whether an isolated Python environment is active.
///
/// A virtualenv sets `VIRTUAL_ENV`; conda sets `CONDA_PREFIX`.
pub fn virtualenv_active() -> bool {
    venv_from_vars(std::env::var_os("VIRTUAL_ENV"), std::env::var_os("CONDA_PREFIX"))
}

fn venv_from_vars(virtual_env: Option<OsString>, conda_prefix: Option<OsString>) -> bool {
    [virtual_env, conda_prefix]
        .into_iter()
        .flatten()
        .any(|value| !value.is_empty())
}

/// Whether the repository containing `dir` has tracked or untracked changes.
///
/// Directories outside any repository are clean. A repository whose status
/// cannot be read is logged and treated as clean.
pub fn is_git_dirty(dir: &Path) -> bool {
    let Ok(repo) = Repository::discover(dir) else {
        tracing::debug!("No git repository above {}", dir.display());
        return false;
    };
    if repo.is_bare() {
        return false;
    }

    let mut options = StatusOptions::new();
    options
        .include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);

    match repo.statuses(Some(&mut options)) {
        Ok(statuses) => statuses
            .iter()
            .any(|entry| !entry.status().is_ignored() && entry.status() != git2::Status::CURRENT),
        Err(e) => {
            tracing::warn!("Unable to read git status ({}); assuming clean", e.message());
            false
        }
    }
}
