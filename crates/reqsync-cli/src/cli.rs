//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use reqsync_core::{CapRule, ConfigOverrides, NameList, Policy};

/// reqsync - Keep requirements files synced to installed versions
#[derive(Parser, Debug)]
#[command(name = "reqsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upgrade the environment and rewrite requirement constraints
    ///
    /// Examples:
    ///   reqsync run --show-diff
    ///   reqsync run --no-upgrade --dry-run --show-diff
    ///   reqsync run --check --no-upgrade
    ///   reqsync run --output json --no-upgrade --dry-run
    Run(Box<RunArgs>),

    /// Print the reqsync version
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Stdout rendering of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    #[default]
    Human,
    Json,
    Both,
}

impl OutputMode {
    pub fn human(self) -> bool {
        matches!(self, Self::Human | Self::Both)
    }

    pub fn json(self) -> bool {
        matches!(self, Self::Json | Self::Both)
    }
}

/// Policy names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    LowerBound,
    FloorOnly,
    FloorAndCap,
    UpdateInPlace,
}

impl From<PolicyArg> for Policy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::LowerBound => Policy::LowerBound,
            PolicyArg::FloorOnly => Policy::FloorOnly,
            PolicyArg::FloorAndCap => Policy::FloorAndCap,
            PolicyArg::UpdateInPlace => Policy::UpdateInPlace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CapArg {
    NextMajor,
    NextMinor,
}

impl From<CapArg> for CapRule {
    fn from(arg: CapArg) -> Self {
        match arg {
            CapArg::NextMajor => CapRule::NextMajor,
            CapArg::NextMinor => CapRule::NextMinor,
        }
    }
}

/// Options of `reqsync run`.
///
/// Every value that can also come from a project config file is optional
/// here, so "not given" can be told apart from "given as the default".
#[derive(Args, Debug, Default, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// Path to the root requirements file [default: requirements.txt]
    #[arg(long, help_heading = "Target")]
    pub path: Option<PathBuf>,

    /// Follow -r includes recursively [default]
    #[arg(long, overrides_with = "no_follow_includes", help_heading = "Target")]
    pub follow_includes: bool,
    #[arg(long, overrides_with = "follow_includes", hide = true)]
    pub no_follow_includes: bool,

    /// Allow updating files reached through -c/--constraint
    #[arg(long, help_heading = "Target")]
    pub update_constraints: bool,

    /// Version rewrite policy [default: lower-bound]
    #[arg(long, value_enum, help_heading = "Policy")]
    pub policy: Option<PolicyArg>,

    /// Upper-bound rule for floor-and-cap [default: next-major]
    #[arg(long, value_enum, help_heading = "Policy")]
    pub cap: Option<CapArg>,

    /// Adopt pre/dev installed versions
    #[arg(long, help_heading = "Policy")]
    pub allow_prerelease: bool,

    /// Keep local version suffixes like +cpu
    #[arg(long, help_heading = "Policy")]
    pub keep_local: bool,

    /// Skip the pip upgrade and rewrite from the current environment only
    #[arg(long, help_heading = "Execution")]
    pub no_upgrade: bool,

    /// Timeout for the pip upgrade in seconds [default: 900]
    #[arg(long, help_heading = "Execution")]
    pub pip_timeout_sec: Option<u64>,

    /// Allowlisted pip args passed to the upgrade command
    #[arg(long, allow_hyphen_values = true, help_heading = "Execution")]
    pub pip_args: Option<String>,

    /// Exit with code 11 when changes would be made; never writes
    #[arg(long, help_heading = "Execution")]
    pub check: bool,

    /// Preview changes without writing files
    #[arg(long, help_heading = "Execution")]
    pub dry_run: bool,

    /// Comma-separated package globs to include
    #[arg(long, help_heading = "Filtering")]
    pub only: Option<String>,

    /// Comma-separated package globs to exclude
    #[arg(long, help_heading = "Filtering")]
    pub exclude: Option<String>,

    /// Show a unified diff of changed files
    #[arg(long, help_heading = "Output")]
    pub show_diff: bool,

    /// Stdout output mode
    #[arg(short, long, value_enum, default_value_t, help_heading = "Output")]
    pub output: OutputMode,

    /// Write a machine-readable JSON report to this file or directory
    #[arg(long, help_heading = "Output")]
    pub json_report: Option<PathBuf>,

    /// Backup file suffix [default: .bak]
    #[arg(long, allow_hyphen_values = true, help_heading = "Write Safety")]
    pub backup_suffix: Option<String>,

    /// Use timestamped backup filenames [default]
    #[arg(long, overrides_with = "no_timestamped_backups", help_heading = "Write Safety")]
    pub timestamped_backups: bool,
    #[arg(long, overrides_with = "timestamped_backups", hide = true)]
    pub no_timestamped_backups: bool,

    /// Keep only the newest N timestamped backups per file, 0 disables pruning [default: 5]
    #[arg(long, help_heading = "Write Safety")]
    pub backup_keep_last: Option<usize>,

    /// Lock acquisition timeout in seconds [default: 15]
    #[arg(long, help_heading = "Write Safety")]
    pub lock_timeout_sec: Option<u64>,

    /// Allow running outside a virtualenv
    #[arg(long, help_heading = "Safety")]
    pub system_ok: bool,

    /// Keep hash-pinned lines instead of refusing
    #[arg(long, help_heading = "Safety")]
    pub allow_hashes: bool,

    /// Allow running in a dirty git repository [default]
    #[arg(long, overrides_with = "no_allow_dirty", help_heading = "Safety")]
    pub allow_dirty: bool,
    #[arg(long, overrides_with = "allow_dirty", hide = true)]
    pub no_allow_dirty: bool,

    /// For duplicate packages, rewrite only the final occurrence
    #[arg(long, help_heading = "Safety")]
    pub last_wins: bool,

    /// Also write DEBUG logs to this file
    #[arg(long, help_heading = "Logging")]
    pub log_file: Option<PathBuf>,

    /// Increase logging verbosity (-vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, help_heading = "Logging")]
    pub verbose: u8,

    /// Reduce logging output
    #[arg(short, long, help_heading = "Logging")]
    pub quiet: bool,

    /// Skip reqsync.toml, [tool.reqsync] and reqsync.json
    #[arg(long, help_heading = "Config")]
    pub no_config: bool,
}

/// Resolve a `--flag` / `--no-flag` pair to an explicit value, if either was given.
fn paired(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

fn flag(on: bool) -> Option<bool> {
    on.then_some(true)
}

impl RunArgs {
    /// The explicitly given options as the top configuration layer.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            path: self.path.clone(),
            follow_includes: paired(self.follow_includes, self.no_follow_includes),
            update_constraints: flag(self.update_constraints),
            policy: self.policy.map(|p| Policy::from(p).to_string()),
            allow_prerelease: flag(self.allow_prerelease),
            keep_local: flag(self.keep_local),
            no_upgrade: flag(self.no_upgrade),
            pip_timeout_sec: self.pip_timeout_sec,
            pip_args: self.pip_args.clone(),
            only: self.only.clone().map(NameList::Csv),
            exclude: self.exclude.clone().map(NameList::Csv),
            check: flag(self.check),
            dry_run: flag(self.dry_run),
            show_diff: flag(self.show_diff),
            json_report: self.json_report.clone(),
            backup_suffix: self.backup_suffix.clone(),
            timestamped_backups: paired(self.timestamped_backups, self.no_timestamped_backups),
            backup_keep_last: self.backup_keep_last,
            lock_timeout_sec: self.lock_timeout_sec,
            system_ok: flag(self.system_ok),
            allow_hashes: flag(self.allow_hashes),
            allow_dirty: paired(self.allow_dirty, self.no_allow_dirty),
            last_wins: flag(self.last_wins),
            cap_default: self.cap.map(CapRule::from),
            cap_overrides: None,
        }
    }
}
