//! The synchronization engine
//!
//! One [`SyncEngine::run`] resolves the include graph, classifies every line,
//! rewrites eligible package lines against the installed versions, and
//! either reports the outcome (check / dry-run) or commits it under the
//! cross-process lock.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use reqsync_fs::{AdvisoryLock, TextEncoding};

use crate::config::RunConfig;
use crate::dedupe::{LinePosition, last_occurrences};
use crate::env::{Environment, VersionCache};
use crate::graph::{FileRole, ResolvedFile, resolve_files};
use crate::name::{NameFilter, canonicalize_name};
use crate::parse::{ParsedLine, has_hash_pins, parse_line, split_lines};
use crate::policy::apply_policy;
use crate::report::make_diff;
use crate::transaction::{AtomicWriter, FileWriter, PendingWrite, commit};
use crate::{Error, Result};

/// One rewritten line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Package name as written in the file
    pub package: String,
    pub installed_version: String,
    /// Full lines including terminators
    pub old_line: String,
    pub new_line: String,
    pub file: PathBuf,
}

/// Outcome for one resolved file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResult {
    pub file: PathBuf,
    pub role: FileRole,
    pub changes: Vec<Change>,
    pub original_text: String,
    pub new_text: String,
    /// How the file was encoded on disk, reused when it is written
    pub encoding: TextEncoding,
}

impl FileResult {
    pub fn changed(&self) -> bool {
        self.original_text != self.new_text
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub changed: bool,
    /// In processing order
    pub files: Vec<FileResult>,
    pub diff: Option<String>,
    /// Backups created by this run, in write order
    pub backup_paths: Vec<PathBuf>,
}

impl SyncResult {
    /// Every change across all files, in processing order.
    pub fn changes(&self) -> impl Iterator<Item = &Change> {
        self.files.iter().flat_map(|file| file.changes.iter())
    }

    pub fn change_count(&self) -> usize {
        self.files.iter().map(|file| file.changes.len()).sum()
    }

    pub fn changed_file_count(&self) -> usize {
        self.files.iter().filter(|file| file.changed()).count()
    }
}

/// Synchronizes a requirements tree with an [`Environment`].
pub struct SyncEngine {
    config: RunConfig,
    writer: Box<dyn FileWriter>,
}

impl SyncEngine {
    /// Create an engine that commits through [`AtomicWriter`].
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            writer: Box::new(AtomicWriter),
        }
    }

    /// Replace the writer used at commit time.
    pub fn with_writer(mut self, writer: Box<dyn FileWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run one synchronization.
    ///
    /// Safety gates run before the lock is taken; the upgrade step, version
    /// lookup, rewrite and commit all happen while it is held.
    ///
    /// # Errors
    ///
    /// Any of the [`Error`] categories; nothing is written unless the run
    /// reaches the commit step, and a failed commit is rolled back.
    pub fn run(&self, env: &dyn Environment, cache: &mut VersionCache) -> Result<SyncResult> {
        let config = &self.config;

        if !config.path.is_file() {
            return Err(Error::MissingFile {
                path: config.path.clone(),
            });
        }
        let root = dunce::canonicalize(&config.path)
            .map_err(|e| reqsync_fs::Error::io(&config.path, e))?;
        let repo_root = root.parent().unwrap_or_else(|| Path::new("."));

        env.ensure_isolated(config.system_ok)?;
        env.ensure_repo_clean(repo_root, config.allow_dirty)?;

        let filter = NameFilter::new(&config.only, &config.exclude)?;

        let lock = AdvisoryLock::acquire(&root, config.lock_timeout).map_err(|e| match e {
            reqsync_fs::Error::LockTimeout { path, timeout } => Error::LockTimeout {
                path,
                seconds: timeout.as_secs(),
            },
            other => Error::Fs(other),
        })?;

        let result = self.run_locked(&root, &filter, env, cache);
        drop(lock);
        result
    }

    fn run_locked(
        &self,
        root: &Path,
        filter: &NameFilter,
        env: &dyn Environment,
        cache: &mut VersionCache,
    ) -> Result<SyncResult> {
        let config = &self.config;

        if !config.no_upgrade {
            tracing::info!("Upgrading environment (may take a while)...");
            let outcome = env.run_upgrade(root, config.upgrade_timeout, &config.upgrade_args)?;
            if !outcome.success() {
                tracing::debug!("Upgrade output:\n{}", outcome.output);
                return Err(Error::UpgradeFailed {
                    code: outcome.code,
                    output: outcome.output,
                });
            }
            cache.invalidate();
        }

        let resolved = resolve_files(root, config.follow_includes)?;

        let mut sources = Vec::with_capacity(resolved.len());
        for file in &resolved {
            if !config.allow_hashes && has_hash_pins(&file.content.text) {
                return Err(Error::HashPinsPresent {
                    path: file.path.clone(),
                });
            }
            let lines: Vec<ParsedLine> = split_lines(&file.content.text)
                .into_iter()
                .map(parse_line)
                .collect();
            sources.push(lines);
        }

        let installed = cache.get(env)?;

        let writable = config
            .last_wins
            .then(|| last_occurrences(sources.iter().map(Vec::as_slice)));

        let mut files = Vec::with_capacity(resolved.len());
        for (index, (file, lines)) in resolved.iter().zip(&sources).enumerate() {
            let frozen = file.role == FileRole::Constraint && !config.update_constraints;
            let (new_text, changes) = if frozen {
                (file.content.text.clone(), Vec::new())
            } else {
                let rewrite = Rewrite {
                    config,
                    filter,
                    installed,
                    writable: writable.as_ref(),
                };
                rewrite.file(index, file, lines)
            };

            files.push(FileResult {
                file: file.path.clone(),
                role: file.role,
                changes,
                original_text: file.content.text.clone(),
                new_text,
                encoding: file.content.encoding,
            });
        }

        let changed = files.iter().any(FileResult::changed);
        let diff = if changed && (config.show_diff || config.dry_run) {
            make_diff(&files)
        } else {
            None
        };

        if !config.writes() {
            return Ok(SyncResult {
                changed,
                files,
                diff,
                backup_paths: Vec::new(),
            });
        }

        let pending: Vec<PendingWrite<'_>> = files
            .iter()
            .filter(|file| file.changed())
            .map(|file| PendingWrite {
                path: &file.file,
                text: &file.new_text,
                encoding: file.encoding,
            })
            .collect();
        let backup_paths = commit(&pending, &config.backup, self.writer.as_ref())?;

        Ok(SyncResult {
            changed,
            files,
            diff,
            backup_paths,
        })
    }
}

/// Per-run rewrite context.
struct Rewrite<'a> {
    config: &'a RunConfig,
    filter: &'a NameFilter,
    installed: &'a HashMap<String, String>,
    writable: Option<&'a HashSet<LinePosition>>,
}

impl Rewrite<'_> {
    fn file(
        &self,
        index: usize,
        file: &ResolvedFile,
        lines: &[ParsedLine],
    ) -> (String, Vec<Change>) {
        let mut out = String::new();
        let mut changes = Vec::new();

        for (line_index, parsed) in lines.iter().enumerate() {
            let position = LinePosition {
                file: index,
                line: line_index,
            };
            match self.line(position, parsed) {
                Some((new_line, installed)) if new_line != parsed.raw => {
                    let package = parsed
                        .requirement()
                        .map(|req| req.name.clone())
                        .unwrap_or_default();
                    tracing::debug!(
                        "{}: {} -> {}",
                        file.path.display(),
                        parsed.raw.trim_end(),
                        new_line.trim_end()
                    );
                    out.push_str(&new_line);
                    changes.push(Change {
                        package,
                        installed_version: installed.to_string(),
                        old_line: parsed.raw.clone(),
                        new_line,
                        file: file.path.clone(),
                    });
                }
                _ => out.push_str(&parsed.raw),
            }
        }

        (out, changes)
    }

    /// New line text and the installed version it was built from, or `None`
    /// to keep the line.
    fn line(&self, position: LinePosition, parsed: &ParsedLine) -> Option<(String, &str)> {
        let req = parsed.requirement()?;

        if let Some(writable) = self.writable
            && !writable.contains(&position)
        {
            return None;
        }

        let canonical = canonicalize_name(&req.name);
        if !self.filter.allows(&canonical) {
            return None;
        }

        let Some(installed) = self.installed.get(&canonical) else {
            tracing::warn!("Not installed: {} (kept)", req.name);
            return None;
        };

        let config = self.config;
        match apply_policy(
            req,
            installed,
            config.policy,
            config.allow_prerelease,
            config.keep_local,
            &config.cap,
        ) {
            Ok(Some(content)) => Some((parsed.with_content(&content), installed.as_str())),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("{} for {} (kept)", e, req.name);
                None
            }
        }
    }
}

/// Run one synchronization with a fresh version cache and the atomic writer.
pub fn sync(config: RunConfig, env: &dyn Environment) -> Result<SyncResult> {
    SyncEngine::new(config).run(env, &mut VersionCache::new())
}
