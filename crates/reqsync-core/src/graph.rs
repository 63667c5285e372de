//! Include graph resolution
//!
//! Starting from the root file, `-r` and `-c` references are followed
//! breadth-first. Each file appears once in the result, in first-discovery
//! order, with the strongest role it was reached by.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};

use reqsync_fs::TextFile;
use serde::{Deserialize, Serialize};

use crate::parse::{IncludeKind, find_file_links};
use crate::{Error, Result};

/// Why a file takes part in a run.
///
/// Ordered by precedence: `Constraint < Requirement < Root`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Constraint,
    Requirement,
    Root,
}

impl FileRole {
    /// Keep the stronger of two roles; a root is never demoted.
    pub fn merge(self, other: FileRole) -> FileRole {
        self.max(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Constraint => "constraint",
            Self::Requirement => "requirement",
            Self::Root => "root",
        }
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<IncludeKind> for FileRole {
    fn from(kind: IncludeKind) -> Self {
        match kind {
            IncludeKind::Requirement => Self::Requirement,
            IncludeKind::Constraint => Self::Constraint,
        }
    }
}

/// A file in processing order with its merged role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub role: FileRole,
    /// Content as read while resolving; the engine works from this copy
    pub content: TextFile,
}

/// Read a declaration file, mapping undecodable content to [`Error::Parse`].
fn read_declaration(path: &Path) -> Result<TextFile> {
    reqsync_fs::read_text_preserve(path).map_err(|e| match e {
        reqsync_fs::Error::InvalidEncoding { path } => Error::Parse {
            message: "file is not valid UTF-8 text".to_string(),
            path,
        },
        other => Error::Fs(other),
    })
}

/// Resolve the ordered file list for `root`.
///
/// With `follow` unset only the root is returned. References are resolved
/// relative to the referencing file; references to missing files are logged
/// and skipped.
///
/// # Errors
///
/// Returns an error if the root cannot be canonicalized or a visited file
/// cannot be read. Every file is read exactly once.
pub fn resolve_files(root: &Path, follow: bool) -> Result<Vec<ResolvedFile>> {
    let root = dunce::canonicalize(root).map_err(|e| reqsync_fs::Error::io(root, e))?;

    if !follow {
        let content = read_declaration(&root)?;
        return Ok(vec![ResolvedFile {
            path: root,
            role: FileRole::Root,
            content,
        }]);
    }

    let mut roles: HashMap<PathBuf, FileRole> = HashMap::from([(root.clone(), FileRole::Root)]);
    let mut contents: HashMap<PathBuf, TextFile> = HashMap::new();
    let mut order = vec![root.clone()];
    let mut queue = VecDeque::from([root]);

    while let Some(current) = queue.pop_front() {
        let content = read_declaration(&current)?;
        let base = current.parent().unwrap_or_else(|| Path::new("."));

        for link in find_file_links(&content.text) {
            let joined = base.join(&link.path);
            let candidate = match dunce::canonicalize(&joined) {
                Ok(path) if path.is_file() => path,
                _ => {
                    tracing::warn!(
                        "Linked requirements file not found (kept directive): {}",
                        joined.display()
                    );
                    continue;
                }
            };

            let discovered = FileRole::from(link.kind);
            match roles.get_mut(&candidate) {
                Some(role) => {
                    let merged = role.merge(discovered);
                    if merged != *role {
                        tracing::debug!(
                            "Role of {} raised from {} to {}",
                            candidate.display(),
                            role,
                            merged
                        );
                        *role = merged;
                    }
                }
                None => {
                    tracing::debug!("Discovered {} ({})", candidate.display(), discovered);
                    roles.insert(candidate.clone(), discovered);
                    order.push(candidate.clone());
                    queue.push_back(candidate);
                }
            }
        }
        contents.insert(current, content);
    }

    Ok(order
        .into_iter()
        .filter_map(|path| {
            let role = roles[&path];
            let content = contents.remove(&path)?;
            Some(ResolvedFile {
                path,
                role,
                content,
            })
        })
        .collect())
}
