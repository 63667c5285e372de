//! Run configuration and project config loading
//!
//! A run is configured in three layers: built-in defaults, project files
//! (`reqsync.toml`, `[tool.reqsync]` in `pyproject.toml`, `reqsync.json`,
//! later files winning), then explicit command-line values. Every layer
//! above the defaults is a [`ConfigOverrides`] whose unset fields leave the
//! lower layer alone.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqsync_fs::BackupPolicy;
use serde::Deserialize;

use crate::policy::{CapRule, CapStrategy, Policy};

pub const DEFAULT_REQUIREMENTS: &str = "requirements.txt";

/// Everything one sync invocation needs, fixed for its duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Root declaration file
    pub path: PathBuf,
    pub follow_includes: bool,
    /// Rewrite files reached only through `-c`
    pub update_constraints: bool,
    pub policy: Policy,
    pub cap: CapStrategy,
    pub allow_prerelease: bool,
    pub keep_local: bool,
    /// Skip the upgrade step
    pub no_upgrade: bool,
    pub upgrade_timeout: Duration,
    /// Extra installer arguments, filtered by the environment adapter
    pub upgrade_args: String,
    /// Glob patterns over canonical names; empty means all
    pub only: Vec<String>,
    pub exclude: Vec<String>,
    pub check: bool,
    pub dry_run: bool,
    pub show_diff: bool,
    pub backup: BackupPolicy,
    pub lock_timeout: Duration,
    /// Allow running without an active virtualenv
    pub system_ok: bool,
    /// Keep hash-pinned lines instead of failing
    pub allow_hashes: bool,
    pub allow_dirty: bool,
    /// Rewrite only the last occurrence of each package
    pub last_wins: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_REQUIREMENTS),
            follow_includes: true,
            update_constraints: false,
            policy: Policy::LowerBound,
            cap: CapStrategy::default(),
            allow_prerelease: false,
            keep_local: false,
            no_upgrade: false,
            upgrade_timeout: Duration::from_secs(900),
            upgrade_args: String::new(),
            only: Vec::new(),
            exclude: Vec::new(),
            check: false,
            dry_run: false,
            show_diff: false,
            backup: BackupPolicy::default(),
            lock_timeout: Duration::from_secs(15),
            system_ok: false,
            allow_hashes: false,
            allow_dirty: true,
            last_wins: false,
        }
    }
}

impl RunConfig {
    /// Whether this run may touch files on disk.
    pub fn writes(&self) -> bool {
        !self.check && !self.dry_run
    }

    /// Layer `overrides` on top of this configuration.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(path) = overrides.path.as_ref().filter(|p| !is_blank_path(p)) {
            self.path = path.clone();
        }
        set(&mut self.follow_includes, overrides.follow_includes);
        set(&mut self.update_constraints, overrides.update_constraints);
        if let Some(policy) = &overrides.policy {
            match policy.parse::<Policy>() {
                Ok(policy) => self.policy = policy,
                Err(e) => tracing::warn!("{}; keeping {}", e, self.policy),
            }
        }
        set(&mut self.allow_prerelease, overrides.allow_prerelease);
        set(&mut self.keep_local, overrides.keep_local);
        set(&mut self.no_upgrade, overrides.no_upgrade);
        if let Some(secs) = overrides.pip_timeout_sec {
            self.upgrade_timeout = Duration::from_secs(secs);
        }
        if let Some(args) = &overrides.pip_args {
            self.upgrade_args = args.clone();
        }
        if let Some(only) = overrides.only.as_ref().map(NameList::to_vec)
            && !only.is_empty()
        {
            self.only = only;
        }
        if let Some(exclude) = overrides.exclude.as_ref().map(NameList::to_vec)
            && !exclude.is_empty()
        {
            self.exclude = exclude;
        }
        set(&mut self.check, overrides.check);
        set(&mut self.dry_run, overrides.dry_run);
        set(&mut self.show_diff, overrides.show_diff);
        if let Some(suffix) = &overrides.backup_suffix {
            self.backup.suffix = suffix.clone();
        }
        set(&mut self.backup.timestamped, overrides.timestamped_backups);
        set(&mut self.backup.keep_last, overrides.backup_keep_last);
        if let Some(secs) = overrides.lock_timeout_sec {
            self.lock_timeout = Duration::from_secs(secs);
        }
        set(&mut self.system_ok, overrides.system_ok);
        set(&mut self.allow_hashes, overrides.allow_hashes);
        set(&mut self.allow_dirty, overrides.allow_dirty);
        set(&mut self.last_wins, overrides.last_wins);
        set(&mut self.cap.default, overrides.cap_default);
        if let Some(caps) = &overrides.cap_overrides {
            for (name, rule) in caps {
                self.cap = std::mem::take(&mut self.cap).with_override(name, *rule);
            }
        }
    }
}

fn set<T: Copy>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn is_blank_path(path: &Path) -> bool {
    matches!(path.to_str().map(str::trim), Some("" | "."))
}

/// A list given either as an array or as one comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NameList {
    List(Vec<String>),
    Csv(String),
}

impl NameList {
    pub fn to_vec(&self) -> Vec<String> {
        let items: Vec<&str> = match self {
            Self::List(items) => items.iter().map(String::as_str).collect(),
            Self::Csv(csv) => csv.split(',').collect(),
        };
        items
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// One configuration layer. Unset fields defer to the layer below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub path: Option<PathBuf>,
    pub follow_includes: Option<bool>,
    pub update_constraints: Option<bool>,
    /// Kept as text so an unknown name only loses this key
    pub policy: Option<String>,
    pub allow_prerelease: Option<bool>,
    pub keep_local: Option<bool>,
    pub no_upgrade: Option<bool>,
    pub pip_timeout_sec: Option<u64>,
    pub pip_args: Option<String>,
    pub only: Option<NameList>,
    pub exclude: Option<NameList>,
    pub check: Option<bool>,
    pub dry_run: Option<bool>,
    pub show_diff: Option<bool>,
    pub json_report: Option<PathBuf>,
    pub backup_suffix: Option<String>,
    pub timestamped_backups: Option<bool>,
    pub backup_keep_last: Option<usize>,
    pub lock_timeout_sec: Option<u64>,
    pub system_ok: Option<bool>,
    pub allow_hashes: Option<bool>,
    pub allow_dirty: Option<bool>,
    pub last_wins: Option<bool>,
    pub cap_default: Option<CapRule>,
    pub cap_overrides: Option<HashMap<String, CapRule>>,
}

impl ConfigOverrides {
    /// Combine two layers, `other` taking precedence key by key.
    pub fn merge(self, other: ConfigOverrides) -> ConfigOverrides {
        let cap_overrides = match (self.cap_overrides, other.cap_overrides) {
            (Some(mut base), Some(top)) => {
                base.extend(top);
                Some(base)
            }
            (base, top) => top.or(base),
        };

        ConfigOverrides {
            path: other.path.or(self.path),
            follow_includes: other.follow_includes.or(self.follow_includes),
            update_constraints: other.update_constraints.or(self.update_constraints),
            policy: other.policy.or(self.policy),
            allow_prerelease: other.allow_prerelease.or(self.allow_prerelease),
            keep_local: other.keep_local.or(self.keep_local),
            no_upgrade: other.no_upgrade.or(self.no_upgrade),
            pip_timeout_sec: other.pip_timeout_sec.or(self.pip_timeout_sec),
            pip_args: other.pip_args.or(self.pip_args),
            only: other.only.or(self.only),
            exclude: other.exclude.or(self.exclude),
            check: other.check.or(self.check),
            dry_run: other.dry_run.or(self.dry_run),
            show_diff: other.show_diff.or(self.show_diff),
            json_report: other.json_report.or(self.json_report),
            backup_suffix: other.backup_suffix.or(self.backup_suffix),
            timestamped_backups: other.timestamped_backups.or(self.timestamped_backups),
            backup_keep_last: other.backup_keep_last.or(self.backup_keep_last),
            lock_timeout_sec: other.lock_timeout_sec.or(self.lock_timeout_sec),
            system_ok: other.system_ok.or(self.system_ok),
            allow_hashes: other.allow_hashes.or(self.allow_hashes),
            allow_dirty: other.allow_dirty.or(self.allow_dirty),
            last_wins: other.last_wins.or(self.last_wins),
            cap_default: other.cap_default.or(self.cap_default),
            cap_overrides,
        }
    }
}

/// Load and merge the project config files found in `dir`.
///
/// Missing files are skipped. A file that cannot be read or parsed is
/// logged and contributes nothing.
pub fn load_project_config(dir: &Path) -> ConfigOverrides {
    let mut merged = ConfigOverrides::default();

    let reqsync_toml = dir.join("reqsync.toml");
    if let Some(layer) = read_layer(&reqsync_toml, |text| {
        toml::from_str::<ConfigOverrides>(text).map_err(|e| e.to_string())
    }) {
        merged = merged.merge(layer);
    }

    let pyproject = dir.join("pyproject.toml");
    if let Some(layer) = read_layer(&pyproject, parse_pyproject_section) {
        merged = merged.merge(layer);
    }

    let reqsync_json = dir.join("reqsync.json");
    if let Some(layer) = read_layer(&reqsync_json, |text| {
        serde_json::from_str::<ConfigOverrides>(text).map_err(|e| e.to_string())
    }) {
        merged = merged.merge(layer);
    }

    merged
}

fn read_layer<F>(path: &Path, parse: F) -> Option<ConfigOverrides>
where
    F: FnOnce(&str) -> std::result::Result<ConfigOverrides, String>,
{
    if !path.is_file() {
        return None;
    }
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };
    match parse(&text) {
        Ok(layer) => {
            tracing::debug!("Loaded config from {}", path.display());
            Some(layer)
        }
        Err(e) => {
            tracing::warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

/// `[tool.reqsync]` from a pyproject file; absent section means no layer.
fn parse_pyproject_section(text: &str) -> std::result::Result<ConfigOverrides, String> {
    let document: toml::Value = toml::from_str(text).map_err(|e| e.to_string())?;
    match document.get("tool").and_then(|tool| tool.get("reqsync")) {
        Some(section) => section
            .clone()
            .try_into::<ConfigOverrides>()
            .map_err(|e| e.to_string()),
        None => Ok(ConfigOverrides::default()),
    }
}
