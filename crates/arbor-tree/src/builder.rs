//! Incremental tree construction.
//!
//! [`RevTreeBuilder`] records `put`/`remove` edits against a base tree and
//! applies them in one pass on [`RevTreeBuilder::build`]:
//!
//! 1. Edits on a flat base are merged into its node list.
//! 2. Edits on a bucketed base are grouped by bucket index and applied
//!    recursively to the affected bucket trees only, loaded lazily from the
//!    store. Untouched buckets are carried over by id.
//! 3. Each level is then normalized: at most [`NORMALIZED_SIZE_LIMIT`]
//!    direct entries stay flat, more are split into buckets, and a bucketed
//!    level that shrank back under the limit collapses to a flat tree.
//!
//! New trees are collected while building and written only once the root is
//! known, children before parents, so intermediate bucket trees thrown away
//! by a collapse never reach the store.

use std::collections::BTreeMap;

use tracing::debug;

use arbor_store::ObjectStore;
use arbor_types::Node;

use crate::error::{TreeError, TreeResult};
use crate::order::{NodeStorageOrder, NORMALIZED_SIZE_LIMIT};
use crate::tree::{read_tree, write_tree, Bucket, RevTree, TreeShape};

type Changes = BTreeMap<String, Option<Node>>;

/// A built tree plus the new descendant trees it references, in write order.
struct Built {
    tree: RevTree,
    fresh: Vec<RevTree>,
}

impl Built {
    fn unchanged(tree: RevTree) -> Self {
        Self {
            tree,
            fresh: Vec::new(),
        }
    }
}

/// Applies edits to a base tree and produces the normalized result.
///
/// ```ignore
/// let mut builder = RevTreeBuilder::from_tree(&store, base);
/// builder.put(Node::feature("a1", feature_id, ObjectId::null())?)?;
/// builder.remove("a2");
/// let tree = builder.build()?;
/// ```
pub struct RevTreeBuilder<'a> {
    store: &'a dyn ObjectStore,
    base: RevTree,
    changes: Changes,
}

impl<'a> RevTreeBuilder<'a> {
    /// Start from the empty tree.
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self::from_tree(store, RevTree::empty())
    }

    /// Start from an existing tree. Bucket trees of `base` are read from
    /// `store` when edits reach them.
    pub fn from_tree(store: &'a dyn ObjectStore, base: RevTree) -> Self {
        Self {
            store,
            base,
            changes: BTreeMap::new(),
        }
    }

    /// Insert or replace the node with this name.
    pub fn put(&mut self, node: Node) -> TreeResult<()> {
        if node.name.is_empty() {
            return Err(TreeError::EmptyName);
        }
        self.changes.insert(node.name.clone(), Some(node));
        Ok(())
    }

    /// Remove the node with this name. Missing names are ignored.
    pub fn remove(&mut self, name: &str) {
        self.changes.insert(name.to_string(), None);
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn base(&self) -> &RevTree {
        &self.base
    }

    /// Apply the edits and persist every new tree. If the result equals the
    /// base tree nothing is written.
    pub fn build(self) -> TreeResult<RevTree> {
        let store = self.store;
        let base_id = self.base.id();
        let built = self.build_in_memory()?;
        if built.tree.id() == base_id {
            return Ok(built.tree);
        }
        for tree in &built.fresh {
            write_tree(store, tree)?;
        }
        write_tree(store, &built.tree)?;
        debug!(
            tree = %built.tree.id().short_hex(),
            size = built.tree.size(),
            new_subtrees = built.fresh.len(),
            "built tree"
        );
        Ok(built.tree)
    }

    /// Apply the edits without writing anything. Subtrees referenced by tree
    /// nodes must still be readable, since their sizes feed this tree's size.
    pub fn build_unpersisted(self) -> TreeResult<RevTree> {
        Ok(self.build_in_memory()?.tree)
    }

    fn build_in_memory(self) -> TreeResult<Built> {
        apply(self.store, 0, &self.base, self.changes)
    }
}

fn bucket_index(name: &str, depth: usize) -> TreeResult<u8> {
    NodeStorageOrder::bucket(name, depth)
}

fn apply(
    store: &dyn ObjectStore,
    depth: usize,
    base: &RevTree,
    changes: Changes,
) -> TreeResult<Built> {
    if changes.is_empty() {
        return Ok(Built::unchanged(base.clone()));
    }
    match base.shape() {
        TreeShape::Leaf { trees, features } => {
            let mut nodes: BTreeMap<String, Node> = trees
                .iter()
                .chain(features)
                .map(|n| (n.name.clone(), n.clone()))
                .collect();
            for (name, change) in changes {
                match change {
                    Some(node) => nodes.insert(name, node),
                    None => nodes.remove(&name),
                };
            }
            normalize(store, depth, nodes.into_values().collect())
        }
        TreeShape::Buckets(buckets) => apply_to_buckets(store, depth, buckets, changes),
    }
}

fn apply_to_buckets(
    store: &dyn ObjectStore,
    depth: usize,
    buckets: &BTreeMap<u8, Bucket>,
    changes: Changes,
) -> TreeResult<Built> {
    let mut grouped: BTreeMap<u8, Changes> = BTreeMap::new();
    for (name, change) in changes {
        grouped
            .entry(bucket_index(&name, depth)?)
            .or_default()
            .insert(name, change);
    }

    let mut result = buckets.clone();
    let mut rebuilt: BTreeMap<u8, Built> = BTreeMap::new();
    for (idx, sub_changes) in grouped {
        let child_base = match buckets.get(&idx) {
            Some(bucket) => read_tree(store, &bucket.id)?,
            None => RevTree::empty(),
        };
        let child = apply(store, depth + 1, &child_base, sub_changes)?;
        if child.tree.is_empty() {
            result.remove(&idx);
        } else if child.tree.id() != child_base.id() {
            result.insert(idx, Bucket::of(&child.tree));
            rebuilt.insert(idx, child);
        }
    }

    let entries: u64 = result.values().map(|b| b.entries).sum();
    if entries as usize <= NORMALIZED_SIZE_LIMIT {
        let mut nodes = Vec::with_capacity(entries as usize);
        for (idx, bucket) in &result {
            match rebuilt.get(idx) {
                Some(child) => collect_leaf(&child.tree, &mut nodes)?,
                None => collect_leaf(&read_tree(store, &bucket.id)?, &mut nodes)?,
            }
        }
        debug!(depth, entries, "collapsing buckets into a flat tree");
        return normalize(store, depth, nodes);
    }

    let mut fresh = Vec::new();
    for child in rebuilt.into_values() {
        fresh.extend(child.fresh);
        fresh.push(child.tree);
    }
    Ok(Built {
        tree: RevTree::bucketed(result),
        fresh,
    })
}

/// Append the nodes of a flat bucket tree. Under the size limit every bucket
/// is flat; anything else means the store holds a malformed tree.
fn collect_leaf(tree: &RevTree, out: &mut Vec<Node>) -> TreeResult<()> {
    if !tree.is_leaf() {
        return Err(TreeError::InvariantViolation(format!(
            "bucket {} is bucketed below the size limit",
            tree.id().short_hex()
        )));
    }
    out.extend(tree.children().cloned());
    Ok(())
}

fn normalize(store: &dyn ObjectStore, depth: usize, nodes: Vec<Node>) -> TreeResult<Built> {
    if nodes.len() <= NORMALIZED_SIZE_LIMIT {
        let (mut trees, mut features): (Vec<Node>, Vec<Node>) =
            nodes.into_iter().partition(Node::is_tree);
        NodeStorageOrder::sort(&mut trees);
        NodeStorageOrder::sort(&mut features);
        let mut size = features.len() as u64;
        for node in &trees {
            size += read_tree(store, &node.object_id)?.size();
        }
        return Ok(Built::unchanged(RevTree::leaf(trees, features, size)));
    }

    let total = nodes.len();
    let mut partitions: BTreeMap<u8, Vec<Node>> = BTreeMap::new();
    for node in nodes {
        partitions
            .entry(bucket_index(&node.name, depth)?)
            .or_default()
            .push(node);
    }
    let mut buckets = BTreeMap::new();
    let mut fresh = Vec::new();
    for (idx, part) in partitions {
        let child = normalize(store, depth + 1, part)?;
        buckets.insert(idx, Bucket::of(&child.tree));
        fresh.extend(child.fresh);
        fresh.push(child.tree);
    }
    debug!(depth, entries = total, buckets = buckets.len(), "split tree into buckets");
    Ok(Built {
        tree: RevTree::bucketed(buckets),
        fresh,
    })
}
