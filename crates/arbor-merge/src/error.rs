//! Error types for commit merges.

use arbor_dag::DagError;
use arbor_diff::DiffError;
use arbor_refs::RefError;
use arbor_store::StoreError;
use arbor_types::ObjectId;

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// No commits were given, or one of them is the null id.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("commit not found: {0}")]
    NotFound(ObjectId),

    /// The merge would not change the tip's tree.
    #[error("nothing to commit")]
    NothingToCommit,

    /// A merge commit needs an author; none was configured.
    #[error("no identity configured for the merge commit")]
    MissingIdentity,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    #[error("dag error: {0}")]
    Dag(#[from] DagError),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),
}

impl MergeError {
    pub fn is_not_found(&self) -> bool {
        match self {
            MergeError::NotFound(_) => true,
            MergeError::Store(e) => e.is_not_found(),
            MergeError::Diff(e) => e.is_not_found(),
            MergeError::Dag(e) => e.is_not_found(),
            MergeError::Ref(e) => e.is_not_found(),
            _ => false,
        }
    }
}

pub type MergeResult<T> = Result<T, MergeError>;
