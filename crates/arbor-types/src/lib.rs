//! Foundation types for Arbor.
//!
//! Arbor is a version-control engine for hierarchical, attributed records.
//! This crate provides the value types every other Arbor crate builds on.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (BLAKE3 hash)
//! - [`Node`] / [`NodeKind`] -- An entry inside a revision tree
//! - [`NodeRef`] -- A node together with the path of the tree holding it
//! - [`Envelope`] -- Axis-aligned bounds propagated through trees
//! - [`Person`] -- Author/committer identity with a timestamp

pub mod envelope;
pub mod error;
pub mod node;
pub mod object;
pub mod path;
pub mod person;

pub use envelope::Envelope;
pub use error::TypeError;
pub use node::{same_entry, Node, NodeKind, NodeRef};
pub use object::ObjectId;
pub use person::Person;
