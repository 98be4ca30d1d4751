//! Canonical node order and bucket assignment.
//!
//! Both are pure functions of a node's name (and kind, for the order). Each
//! name is hashed once with BLAKE3; byte `d` of that hash, modulo
//! [`MAX_BUCKETS`], picks the bucket at depth `d`. The order compares the
//! sequence of bucket indices first, so nodes of bucket `i` sort before
//! nodes of bucket `j > i` at every depth. A depth-first walk over a
//! bucketed tree therefore yields nodes in the same order as the equivalent
//! flat tree.

use std::cmp::Ordering;

use arbor_crypto::ContentHasher;
use arbor_types::{Node, NodeKind};

use crate::error::{TreeError, TreeResult};

/// Maximum number of buckets a tree level is split into.
pub const MAX_BUCKETS: usize = 32;

/// Largest number of direct entries a flat tree may hold.
pub const NORMALIZED_SIZE_LIMIT: usize = 512;

/// Bucket depth is bounded by the number of name-hash bytes.
pub const MAX_DEPTH: usize = 32;

/// Sort key derived from a node's name and kind.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OrderKey {
    buckets: [u8; MAX_DEPTH],
    hash: [u8; 32],
    name: String,
    kind: NodeKind,
}

impl OrderKey {
    fn new(name: &str, kind: NodeKind) -> Self {
        let hash = NodeStorageOrder::name_hash(name);
        let mut buckets = [0u8; MAX_DEPTH];
        for (slot, byte) in buckets.iter_mut().zip(hash.iter()) {
            *slot = byte % MAX_BUCKETS as u8;
        }
        Self {
            buckets,
            hash,
            name: name.to_string(),
            kind,
        }
    }
}

/// The canonical total order over tree nodes.
#[derive(Clone, Copy, Debug, Default)]
pub struct NodeStorageOrder;

impl NodeStorageOrder {
    pub fn name_hash(name: &str) -> [u8; 32] {
        ContentHasher::raw_hash(name.as_bytes())
    }

    /// Bucket index of `name` at `depth`.
    pub fn bucket(name: &str, depth: usize) -> TreeResult<u8> {
        if depth >= MAX_DEPTH {
            return Err(TreeError::InvariantViolation(format!(
                "bucket depth {depth} exceeds the name hash width"
            )));
        }
        Ok(Self::name_hash(name)[depth] % MAX_BUCKETS as u8)
    }

    pub fn compare_names(a: &str, b: &str) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let ka = OrderKey::new(a, NodeKind::Tree);
        let kb = OrderKey::new(b, NodeKind::Tree);
        (&ka.buckets, &ka.hash, &ka.name).cmp(&(&kb.buckets, &kb.hash, &kb.name))
    }

    pub fn compare(a: &Node, b: &Node) -> Ordering {
        Self::compare_names(&a.name, &b.name).then(a.kind.cmp(&b.kind))
    }

    pub fn sort(nodes: &mut [Node]) {
        nodes.sort_by_cached_key(|n| OrderKey::new(&n.name, n.kind));
    }

    pub fn is_sorted(nodes: &[Node]) -> bool {
        nodes
            .windows(2)
            .all(|w| Self::compare(&w[0], &w[1]) == Ordering::Less)
    }
}
