//! Revision trees for Arbor.
//!
//! A [`RevTree`] is an immutable, content-addressed tree of [`Node`]s. Small
//! trees are stored flat; once a level holds more than
//! [`NORMALIZED_SIZE_LIMIT`] entries it is sharded into at most
//! [`MAX_BUCKETS`] buckets, each itself a `RevTree`. The shape is a pure
//! function of the entries, so the same contents always hash the same no
//! matter how they were edited.
//!
//! # Modules
//!
//! - [`order`] -- [`NodeStorageOrder`], the canonical node order and bucket function
//! - [`tree`] -- [`RevTree`], [`Bucket`], canonical encoding and persistence
//! - [`builder`] -- [`RevTreeBuilder`], incremental edits with re-normalization
//! - [`lookup`] -- child and path lookups through bucket levels
//! - [`walk`] -- [`TreeWalker`], ls-tree style traversal
//! - [`mutable`] -- [`MutableTree`], path-keyed edits built bottom-up
//!
//! [`Node`]: arbor_types::Node

pub mod builder;
pub mod error;
pub mod lookup;
pub mod mutable;
pub mod order;
pub mod tree;
pub mod walk;

pub use builder::RevTreeBuilder;
pub use error::{TreeError, TreeResult};
pub use lookup::{all_children, find_child, find_path};
pub use mutable::MutableTree;
pub use order::{NodeStorageOrder, MAX_BUCKETS, NORMALIZED_SIZE_LIMIT};
pub use tree::{empty_tree_id, read_tree, write_tree, Bucket, RevTree, TreeShape};
pub use walk::{TreeWalker, WalkStrategy};
