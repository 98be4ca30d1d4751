//! Content-addressed object storage for Arbor.
//!
//! Every Arbor object (tree, commit, feature, feature type) is stored as an
//! immutable [`StoredObject`] keyed by its [`ObjectId`](arbor_types::ObjectId).
//! The store never interprets payloads; typed encode/decode lives next to
//! each object type.
//!
//! # Object Types
//!
//! - [`RevCommit`] -- a tree snapshot plus parents, author, committer and message
//! - [`RevFeature`] -- an opaque, ordered list of attribute values
//! - [`RevFeatureType`] -- the schema a feature conforms to (metadata objects)
//! - trees are encoded by `arbor-tree`, which owns their canonical form
//!
//! # Storage Backends
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`LayeredObjectStore`] -- reads an upper store, falls back to a lower one
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written.
//! 2. Writes are idempotent: writing an existing id is a no-op.
//! 3. Reads of missing objects return `Ok(None)`; typed getters turn that into
//!    [`StoreError::NotFound`].
//! 4. Store failures are propagated, never retried here.

pub mod bounds;
pub mod error;
pub mod layered;
pub mod memory;
pub mod object;
pub mod traits;

pub use bounds::{BoundsProvider, NoBounds};
pub use error::{StoreError, StoreResult};
pub use layered::LayeredObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{ObjectKind, RevCommit, RevFeature, RevFeatureType, StoredObject};
pub use traits::ObjectStore;
