//! Slash-separated tree paths.
//!
//! Paths never start or end with `/`; the root is the empty string.

use crate::error::TypeError;

pub const SEPARATOR: char = '/';

/// Join a parent path and a child name.
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// Split a path into its segments. The root yields no segments.
pub fn segments(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split(SEPARATOR).collect()
    }
}

/// The parent of `path` (`""` for top-level names).
pub fn parent(path: &str) -> &str {
    path.rfind(SEPARATOR).map_or("", |i| &path[..i])
}

/// Last segment of `path`.
pub fn name(path: &str) -> &str {
    path.rfind(SEPARATOR).map_or(path, |i| &path[i + 1..])
}

pub fn depth(path: &str) -> usize {
    segments(path).len()
}

/// True when `path` equals `ancestor` or lies below it.
pub fn is_same_or_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor.is_empty() {
        return true;
    }
    path == ancestor
        || (path.len() > ancestor.len()
            && path.starts_with(ancestor)
            && path[ancestor.len()..].starts_with(SEPARATOR))
}

/// True when `ancestor` is a strict ancestor of `path`.
pub fn is_ancestor(ancestor: &str, path: &str) -> bool {
    ancestor != path && is_same_or_descendant(path, ancestor)
}

/// Reject empty segments, leading or trailing separators.
pub fn validate(path: &str) -> Result<(), TypeError> {
    if path.is_empty() {
        return Ok(());
    }
    if path.split(SEPARATOR).any(str::is_empty) {
        return Err(TypeError::InvalidPath {
            path: path.to_string(),
            reason: "empty path segment".into(),
        });
    }
    Ok(())
}
