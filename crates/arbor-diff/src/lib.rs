//! Tree diff and reconciliation for Arbor.
//!
//! Everything here is built on one primitive: a merge-join of two trees'
//! children in [`NodeStorageOrder`](arbor_tree::NodeStorageOrder), pairing
//! buckets by index so identical subtrees and buckets are skipped by id.
//!
//! # Key Types
//!
//! - [`EntryChange`] -- one differing child between two tree levels
//! - [`TreeDiff`] / [`DiffEntry`] -- recursive, path-level diff of two trees
//! - [`PathFilter`] -- restricts a write to some subtrees
//! - [`WriteTree`] -- applies staged changes onto a committed tree and moves
//!   the objects they need from the staging store to the permanent store
//! - [`merge_trees`] / [`TreeMerge`] -- three-way tree merge

pub mod error;
pub mod filter;
pub mod join;
pub mod merge;
pub mod tree_diff;
pub mod write_tree;

pub use error::{DiffError, DiffResult};
pub use filter::{Coverage, PathFilter};
pub use join::{join_children, EntryChange};
pub use merge::{merge_trees, TreeMerge};
pub use tree_diff::{diff_trees, ChangeType, DiffEntry, TreeDiff};
pub use write_tree::WriteTree;
