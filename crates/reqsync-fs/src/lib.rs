//! Filesystem layer for reqsync
//!
//! Provides the byte-preserving text I/O, atomic replacement, backup
//! handling and cross-process locking the sync engine commits through.
//! Nothing in this crate knows about requirement syntax.

pub mod backup;
pub mod error;
pub mod io;
pub mod lock;

pub use backup::{BackupPolicy, create_backup, prune_backups, restore_backup};
pub use error::{Error, Result};
pub use io::{Newline, TextEncoding, TextFile, read_text_preserve, write_atomic, write_text_preserve};
pub use lock::{AdvisoryLock, lock_path_for};
