//! Error types for reference operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference was not found, or a symbolic chain ends at a missing ref.
    #[error("ref not found: {name}")]
    NotFound { name: String },

    #[error("invalid ref name: {name}: {reason}")]
    InvalidRefName { name: String, reason: String },

    /// Following symbolic refs did not reach a direct ref.
    #[error("symbolic ref loop at {name}")]
    SymbolicLoop { name: String },

    /// Serialization failure, or a poisoned lock in the in-memory store.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RefError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RefError::NotFound { .. })
    }
}

/// Convenience type alias for ref operations.
pub type RefResult<T> = std::result::Result<T, RefError>;
