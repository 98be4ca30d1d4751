//! Error types for commit graph traversal.

use arbor_store::StoreError;
use arbor_types::ObjectId;

#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// A commit id (given or reached through a parent link) is not stored.
    #[error("commit not found: {0}")]
    CommitNotFound(ObjectId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl DagError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DagError::CommitNotFound(_) | DagError::Store(StoreError::NotFound(_)))
    }
}

/// Convenience alias for DAG results.
pub type DagResult<T> = Result<T, DagError>;
