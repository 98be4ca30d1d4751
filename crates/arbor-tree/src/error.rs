use arbor_store::StoreError;
use arbor_types::{ObjectId, TypeError};

/// Errors from building, reading and walking trees.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("node name must not be empty")]
    EmptyName,

    #[error("tree not found: {0}")]
    NotFound(ObjectId),

    /// A tree breaks a structural rule (size, shape, ordering). These point
    /// at a hashing bug or a corrupt store and are never recovered from.
    #[error("tree invariant violated: {0}")]
    InvariantViolation(String),

    #[error("not a tree: {0}")]
    NotATree(String),

    #[error("tree encoding error: {0}")]
    Encoding(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl TreeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TreeError::NotFound(_) | TreeError::Store(StoreError::NotFound(_)))
    }
}

pub type TreeResult<T> = Result<T, TreeError>;
