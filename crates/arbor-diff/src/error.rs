//! Error types for the diff crate.

use arbor_store::StoreError;
use arbor_tree::TreeError;
use arbor_types::{ObjectId, TypeError};

/// Errors that can occur during diff, write and merge operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A caller broke an argument contract, e.g. an empty filter path.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An object needed for migration is in neither store.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl DiffError {
    pub fn is_not_found(&self) -> bool {
        match self {
            DiffError::NotFound(_) => true,
            DiffError::Store(e) => e.is_not_found(),
            DiffError::Tree(e) => e.is_not_found(),
            _ => false,
        }
    }
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
