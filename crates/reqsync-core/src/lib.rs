//! Synchronization engine for reqsync
//!
//! Rewrites requirements files so their version constraints reflect what is
//! installed, without ever leaving a file half-written:
//!
//! - **Parsing**: every line is classified; only package lines are rewritten
//!   and everything else is kept byte for byte
//! - **Include graph**: `-r` / `-c` references are followed breadth-first
//!   with role precedence `root > requirement > constraint`
//! - **Policies**: `lower-bound`, `floor-only`, `floor-and-cap` and
//!   `update-in-place`
//! - **Commit**: backup, atomic replace and whole-batch rollback, under a
//!   cross-process lock
//!
//! # Architecture
//!
//! ```text
//!              reqsync-cli
//!                   |
//!             reqsync-core  <-- Environment (installed versions, upgrade, gates)
//!                   |
//!              reqsync-fs
//! ```
//!
//! # Example
//!
//! ```ignore
//! use reqsync_core::{RunConfig, SyncEngine, VersionCache};
//!
//! fn example(env: &dyn reqsync_core::Environment) -> reqsync_core::Result<()> {
//!     let config = RunConfig {
//!         dry_run: true,
//!         ..RunConfig::default()
//!     };
//!     let result = SyncEngine::new(config).run(env, &mut VersionCache::new())?;
//!     println!("{}", reqsync_core::report::summarize(&result));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dedupe;
pub mod engine;
pub mod env;
pub mod error;
pub mod graph;
pub mod name;
pub mod parse;
pub mod policy;
pub mod report;
pub mod transaction;
pub mod version;

pub use config::{ConfigOverrides, NameList, RunConfig, load_project_config};
pub use engine::{Change, FileResult, SyncEngine, SyncResult, sync};
pub use env::{Environment, UpgradeOutput, VersionCache};
pub use error::{Error, ExitCode, Result};
pub use graph::{FileRole, ResolvedFile, resolve_files};
pub use name::{NameFilter, canonicalize_name};
pub use parse::{LineKind, ParsedLine, Requirement, parse_line};
pub use policy::{CapRule, CapStrategy, Policy, apply_policy};
pub use reqsync_fs::BackupPolicy;
pub use report::{JsonReport, summarize, to_json, write_json_report};
pub use transaction::{AtomicWriter, FileWriter};
pub use version::Version;
