//! Commit graph queries for Arbor.
//!
//! Commits live in the object store and link to their parents by id. The
//! graph is never materialized: [`CommitGraph`] reads commits on demand
//! while walking.

pub mod error;
pub mod graph;

pub use error::{DagError, DagResult};
pub use graph::{CommitGraph, Log};
