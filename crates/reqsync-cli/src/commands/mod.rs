//! Command implementations for reqsync-cli

pub mod completions;
pub mod run;

pub use completions::run_completions;
pub use run::run_sync;
