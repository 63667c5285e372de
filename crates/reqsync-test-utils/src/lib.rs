//! Shared test utilities for the reqsync workspace.
//!
//! Dev-dependency only, never published. Because it depends on
//! `reqsync-core`, it can only be used from integration tests under a crate's
//! `tests/` directory, not from `#[cfg(test)]` modules inside `reqsync-core`.
//!
//! # Modules
//!
//! - [`env`]: [`ScriptedEnvironment`], an in-memory `Environment`
//! - [`git`]: git repository fixtures at three realism levels
//! - [`tree`]: [`RequirementsTree`] builder for temporary requirement files

pub mod env;
pub mod git;
pub mod tree;

pub use env::ScriptedEnvironment;
pub use tree::RequirementsTree;
