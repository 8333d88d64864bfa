//! Path syntax for field sources
//!
//! A path is a dot-separated list of property segments, optionally prefixed
//! with `$` or `$.`. Each segment may carry bracket suffixes: `[*]` visits
//! every element of an array and `[<digits>]` addresses a single element.
//!
//! While the path tree is built, wildcards are replaced by concrete indexes
//! one at a time, left to right, so the helpers here operate on plain path
//! strings rather than on parsed steps.

use crate::error::PathError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

/// Marker for "every element of this array"
pub const WILDCARD: &str = "[*]";

static SEGMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>[^.\[\]]*)(?P<brackets>(?:\[(?:\*|\d+)\])*)$").unwrap()
});

static BRACKET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\*|\d+)\]").unwrap()
});

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Object property lookup
    Key(String),
    /// Concrete array element
    Index(usize),
    /// Unresolved array traversal
    Wildcard,
}

/// Parse a path string into lookup steps.
///
/// `$` alone (or `$.` with nothing after it) addresses the whole document.
/// A nameless segment is only allowed at the start, for documents whose root
/// is an array (`[*].id`).
pub fn parse_steps(path: &str) -> Result<Vec<Step>, PathError> {
    let body = strip_root(path);
    if body.is_empty() {
        return if path.starts_with('$') {
            Ok(Vec::new())
        } else {
            Err(PathError::Empty)
        };
    }

    let mut steps = Vec::new();
    for (position, segment) in body.split('.').enumerate() {
        let captures = SEGMENT_REGEX
            .captures(segment)
            .ok_or_else(|| PathError::InvalidSegment(segment.to_string()))?;
        let name = &captures["name"];
        let brackets = &captures["brackets"];

        if name.is_empty() && (position > 0 || brackets.is_empty()) {
            return Err(PathError::InvalidSegment(segment.to_string()));
        }
        if !name.is_empty() {
            steps.push(Step::Key(name.to_string()));
        }

        for bracket in BRACKET_REGEX.captures_iter(brackets) {
            let inner = &bracket[1];
            if inner == "*" {
                steps.push(Step::Wildcard);
            } else {
                let index = inner
                    .parse::<usize>()
                    .map_err(|_| PathError::IndexOutOfRange(inner.to_string()))?;
                steps.push(Step::Index(index));
            }
        }
    }

    Ok(steps)
}

fn strip_root(path: &str) -> &str {
    match path.strip_prefix('$') {
        Some(rest) => rest.strip_prefix('.').unwrap_or(rest),
        None => path,
    }
}

/// Number of unresolved wildcards left in a path
pub fn count_wildcards(path: &str) -> usize {
    path.matches(WILDCARD).count()
}

/// Portion of the path before its first wildcard (the array to measure next)
pub fn array_prefix(path: &str) -> &str {
    path.find(WILDCARD).map_or(path, |pos| &path[..pos])
}

/// Portion of the path before its `depth`-th wildcard (zero based), if it has one
pub fn wildcard_prefix(path: &str, depth: usize) -> Option<&str> {
    path.match_indices(WILDCARD)
        .nth(depth)
        .map(|(pos, _)| &path[..pos])
}

/// Structural parent of a path: everything before its last wildcard.
///
/// `tenants[*].organizations[*].id` has parent `tenants[*].organizations`,
/// which in turn has parent `tenants`. Paths without wildcards hang off the root.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rfind(WILDCARD).map(|pos| &path[..pos])
}

/// Replace the first remaining wildcard with a concrete index
pub fn fill_first_wildcard(path: &str, index: usize) -> String {
    path.replacen(WILDCARD, &format!("[{}]", index), 1)
}

/// Replace wildcards left to right with the given indexes.
///
/// Wildcards beyond the supplied indexes are left untouched.
pub fn fill_wildcards(path: &str, indexes: &[usize]) -> String {
    let mut filled = String::with_capacity(path.len() + indexes.len() * 2);
    let mut rest = path;

    for index in indexes {
        let Some(pos) = rest.find(WILDCARD) else {
            break;
        };
        filled.push_str(&rest[..pos]);
        let _ = write!(filled, "[{}]", index);
        rest = &rest[pos + WILDCARD.len()..];
    }

    filled.push_str(rest);
    filled
}
