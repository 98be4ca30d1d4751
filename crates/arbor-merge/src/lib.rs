//! Merging commits into a branch.
//!
//! [`MergeOp`] folds one or more foreign commits into the commit a ref
//! points to. A single commit that already descends from the tip is a
//! fast-forward: the ref moves and nothing is written. Otherwise each
//! foreign tree is three-way merged into the running result and one merge
//! commit is written with the tip and every foreign commit as parents.

pub mod error;
pub mod op;

pub use error::{MergeError, MergeResult};
pub use op::{Identity, MergeOp, MergeOutcome};
