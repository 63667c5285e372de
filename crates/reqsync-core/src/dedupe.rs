//! Duplicate resolution across the include graph
//!
//! When a package is declared more than once, only its last occurrence in
//! processing order (file order, then line order) is eligible for rewrite.

use std::collections::{HashMap, HashSet};

use crate::name::canonicalize_name;
use crate::parse::ParsedLine;

/// Position of a line: index into the resolved file list, then line index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinePosition {
    pub file: usize,
    pub line: usize,
}

/// Positions holding the last occurrence of each canonical package name.
///
/// `files` must be in processing order.
pub fn last_occurrences<'a, I>(files: I) -> HashSet<LinePosition>
where
    I: IntoIterator<Item = &'a [ParsedLine]>,
{
    let mut last: HashMap<String, LinePosition> = HashMap::new();

    for (file, lines) in files.into_iter().enumerate() {
        for (line, parsed) in lines.iter().enumerate() {
            if let Some(req) = parsed.requirement() {
                last.insert(canonicalize_name(&req.name), LinePosition { file, line });
            }
        }
    }

    last.into_values().collect()
}
