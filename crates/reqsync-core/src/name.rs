//! Package name canonicalization and glob filters

use std::sync::LazyLock;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::{Error, Result};

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("Invalid separator regex"));

/// Normalize a package name for equality comparison.
///
/// Case is folded and every run of `-`, `_` and `.` collapses to one `-`,
/// so `Foo.Bar`, `foo__bar` and `FOO-bar` all compare equal.
pub fn canonicalize_name(name: &str) -> String {
    SEPARATOR_RUN
        .replace_all(&name.to_ascii_lowercase(), "-")
        .into_owned()
}

/// Include/exclude filter over canonical package names.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    only: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl NameFilter {
    /// Build a filter from glob patterns.
    ///
    /// An empty `only` list admits every name. Patterns match
    /// case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a pattern is not a valid glob.
    pub fn new(only: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            only: compile_globset(only)?,
            exclude: compile_globset(exclude)?,
        })
    }

    /// Whether a package with this canonical name may be rewritten.
    pub fn allows(&self, canonical: &str) -> bool {
        if let Some(only) = &self.only
            && !only.is_match(canonical)
        {
            return false;
        }
        match &self.exclude {
            Some(exclude) => !exclude.is_match(canonical),
            None => true,
        }
    }
}

fn compile_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::config(format!("invalid package pattern {pattern:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| Error::config(format!("invalid package patterns: {e}")))
}
