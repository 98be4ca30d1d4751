//! High-level SDK for Arbor.
//!
//! [`Repository`] ties the object stores, refs and configuration together
//! into the usual workflow: insert features into the staging area, commit
//! them (all or a subset of paths), branch, check out and merge.

pub mod config;
pub mod error;
pub mod repository;

pub use config::{RepoConfig, UserConfig};
pub use error::{SdkError, SdkResult};
pub use repository::{Repository, DEFAULT_BRANCH};

// Re-export key types
pub use arbor_diff::PathFilter;
pub use arbor_merge::{Identity, MergeOutcome};
pub use arbor_store::{BoundsProvider, RevCommit, RevFeature, RevFeatureType};
pub use arbor_tree::{RevTree, WalkStrategy};
pub use arbor_types::{Envelope, Node, NodeRef, ObjectId};
