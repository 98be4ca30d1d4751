use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("branch already exists: {0}")]
    BranchExists(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The staged tree matches the commit HEAD points to.
    #[error("nothing to commit")]
    NothingToCommit,

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] arbor_store::StoreError),

    #[error("tree error: {0}")]
    Tree(#[from] arbor_tree::TreeError),

    #[error("ref error: {0}")]
    Ref(#[from] arbor_refs::RefError),

    #[error("diff error: {0}")]
    Diff(#[from] arbor_diff::DiffError),

    #[error("dag error: {0}")]
    Dag(#[from] arbor_dag::DagError),

    #[error("merge error: {0}")]
    Merge(arbor_merge::MergeError),

    #[error(transparent)]
    Type(#[from] arbor_types::TypeError),
}

impl From<arbor_merge::MergeError> for SdkError {
    fn from(e: arbor_merge::MergeError) -> Self {
        match e {
            arbor_merge::MergeError::NothingToCommit => SdkError::NothingToCommit,
            other => SdkError::Merge(other),
        }
    }
}

impl SdkError {
    pub fn is_not_found(&self) -> bool {
        match self {
            SdkError::BranchNotFound(_) => true,
            SdkError::Store(e) => e.is_not_found(),
            SdkError::Tree(e) => e.is_not_found(),
            SdkError::Ref(e) => e.is_not_found(),
            SdkError::Diff(e) => e.is_not_found(),
            SdkError::Dag(e) => e.is_not_found(),
            SdkError::Merge(e) => e.is_not_found(),
            _ => false,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
