//! Reference management for Arbor.
//!
//! References are named pointers into the commit graph (and, for
//! `STAGE_HEAD`, to the staged root tree). A ref is either direct, holding an
//! [`ObjectId`](arbor_types::ObjectId), or symbolic, naming another ref.
//!
//! # Layout
//!
//! - `refs/heads/*` for branches
//! - `HEAD`, symbolic to the current branch, or direct when detached
//! - `STAGE_HEAD`, the root tree of the staging area
//!
//! # Modules
//!
//! - [`error`] -- Error types for ref operations
//! - [`types`] -- [`Ref`]
//! - [`traits`] -- The [`RefStore`] trait, with resolution and update helpers
//! - [`names`] -- Well-known names and branch name validation
//! - [`memory`] -- In-memory [`InMemoryRefStore`]

pub mod error;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, RefResult};
pub use memory::InMemoryRefStore;
pub use names::{
    branch_ref, validate_branch_name, validate_ref_name, HEAD, HEADS_PREFIX, STAGE_HEAD,
};
pub use traits::RefStore;
pub use types::Ref;
