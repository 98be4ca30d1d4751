//! Path filters for partial writes.

use arbor_types::path;

use crate::error::{DiffError, DiffResult};

/// How a path relates to a [`PathFilter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coverage {
    /// Equal to or below a filter path: take the staged state wholesale.
    Covered,
    /// A strict ancestor of a filter path: recurse into it.
    Partial,
    /// Unrelated to every filter path: keep the committed state.
    Outside,
}

/// A set of `a/b/c` paths. The empty filter covers everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathFilter {
    paths: Vec<String>,
}

impl PathFilter {
    /// Matches every path.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a filter. Empty or malformed entries are rejected; entries that
    /// match nothing in the trees are harmless.
    pub fn new<I, S>(paths: I) -> DiffResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Vec::new();
        for p in paths {
            let p = p.into();
            if p.is_empty() {
                return Err(DiffError::InvalidArgument("empty path filter".into()));
            }
            path::validate(&p).map_err(|e| DiffError::InvalidArgument(e.to_string()))?;
            out.push(p);
        }
        out.sort();
        out.dedup();
        Ok(Self { paths: out })
    }

    pub fn is_all(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn classify(&self, node_path: &str) -> Coverage {
        if self.paths.is_empty()
            || self
                .paths
                .iter()
                .any(|f| path::is_same_or_descendant(node_path, f))
        {
            Coverage::Covered
        } else if self.paths.iter().any(|f| path::is_ancestor(node_path, f)) {
            Coverage::Partial
        } else {
            Coverage::Outside
        }
    }
}
