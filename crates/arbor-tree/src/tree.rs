//! The immutable revision tree value.
//!
//! # Encoding
//!
//! A tree id is `ContentHasher::TREE` over the canonical bytes:
//!
//! - flat: `0x00`, then per node (trees first, then features, each in
//!   [`NodeStorageOrder`]): name length as u32 LE, name bytes, kind tag,
//!   object id, metadata id (zeros when absent)
//! - bucketed: `0x01`, then per bucket in index order: index byte, bucket id
//!
//! Sizes, counts and bounds are derived data: they are stored in the
//! bincode payload but never hashed.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tracing::trace;

use arbor_crypto::ContentHasher;
use arbor_store::{ObjectKind, ObjectStore, StoredObject};
use arbor_types::{Envelope, Node, ObjectId};

use crate::error::{TreeError, TreeResult};
use crate::order::{NodeStorageOrder, MAX_BUCKETS, NORMALIZED_SIZE_LIMIT};

const LEAF_TAG: u8 = 0x00;
const BUCKETS_TAG: u8 = 0x01;

static EMPTY_TREE_ID: LazyLock<ObjectId> =
    LazyLock::new(|| ContentHasher::TREE.hash(&canonical_bytes(&TreeShape::empty())));

/// Id of the tree with no entries.
pub fn empty_tree_id() -> ObjectId {
    *EMPTY_TREE_ID
}

/// Reference from a bucketed tree to one of its shards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub id: ObjectId,
    /// Direct entries reachable through this bucket.
    pub entries: u64,
    /// Features below this bucket, recursively.
    pub size: u64,
    pub num_trees: u64,
    pub bounds: Option<Envelope>,
}

impl Bucket {
    pub fn of(tree: &RevTree) -> Self {
        Self {
            id: tree.id,
            entries: tree.entries,
            size: tree.size,
            num_trees: tree.num_trees,
            bounds: tree.bounds(),
        }
    }
}

/// The two exclusive representations of a tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TreeShape {
    Leaf { trees: Vec<Node>, features: Vec<Node> },
    Buckets(BTreeMap<u8, Bucket>),
}

impl TreeShape {
    fn empty() -> Self {
        TreeShape::Leaf {
            trees: Vec::new(),
            features: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TreeRecord {
    size: u64,
    shape: TreeShape,
}

/// An immutable, content-addressed tree.
#[derive(Clone, Debug, PartialEq)]
pub struct RevTree {
    id: ObjectId,
    size: u64,
    num_trees: u64,
    entries: u64,
    shape: TreeShape,
}

impl RevTree {
    pub fn empty() -> Self {
        Self {
            id: empty_tree_id(),
            size: 0,
            num_trees: 0,
            entries: 0,
            shape: TreeShape::empty(),
        }
    }

    pub fn empty_id() -> ObjectId {
        empty_tree_id()
    }

    /// A flat tree. Both lists must already be in [`NodeStorageOrder`];
    /// `size` counts features in this tree and all subtrees.
    pub(crate) fn leaf(trees: Vec<Node>, features: Vec<Node>, size: u64) -> Self {
        let num_trees = trees.len() as u64;
        let entries = (trees.len() + features.len()) as u64;
        let shape = TreeShape::Leaf { trees, features };
        Self::from_shape(shape, size, num_trees, entries)
    }

    pub(crate) fn bucketed(buckets: BTreeMap<u8, Bucket>) -> Self {
        let size = buckets.values().map(|b| b.size).sum();
        let num_trees = buckets.values().map(|b| b.num_trees).sum();
        let entries = buckets.values().map(|b| b.entries).sum();
        Self::from_shape(TreeShape::Buckets(buckets), size, num_trees, entries)
    }

    fn from_shape(shape: TreeShape, size: u64, num_trees: u64, entries: u64) -> Self {
        let id = ContentHasher::TREE.hash(&canonical_bytes(&shape));
        Self {
            id,
            size,
            num_trees,
            entries,
            shape,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Number of features in this tree and all its subtrees.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of direct tree-kind children, through bucket levels.
    pub fn num_trees(&self) -> u64 {
        self.num_trees
    }

    /// Number of direct children, through bucket levels.
    pub fn entry_count(&self) -> u64 {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn shape(&self) -> &TreeShape {
        &self.shape
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.shape, TreeShape::Leaf { .. })
    }

    pub fn trees(&self) -> &[Node] {
        match &self.shape {
            TreeShape::Leaf { trees, .. } => trees,
            TreeShape::Buckets(_) => &[],
        }
    }

    pub fn features(&self) -> &[Node] {
        match &self.shape {
            TreeShape::Leaf { features, .. } => features,
            TreeShape::Buckets(_) => &[],
        }
    }

    pub fn buckets(&self) -> Option<&BTreeMap<u8, Bucket>> {
        match &self.shape {
            TreeShape::Buckets(b) => Some(b),
            TreeShape::Leaf { .. } => None,
        }
    }

    /// Direct nodes of a flat tree in [`NodeStorageOrder`]. Bucketed trees
    /// yield nothing here; use [`crate::all_children`] to see through them.
    pub fn children(&self) -> Children<'_> {
        Children {
            trees: self.trees(),
            features: self.features(),
        }
    }

    /// Union of the children's bounds.
    pub fn bounds(&self) -> Option<Envelope> {
        match &self.shape {
            TreeShape::Leaf { trees, features } => {
                Envelope::union_all(trees.iter().chain(features).map(|n| n.bounds.as_ref()))
            }
            TreeShape::Buckets(b) => Envelope::union_all(b.values().map(|b| b.bounds.as_ref())),
        }
    }

    /// Check the structural rules that the hash relies on.
    pub fn validate(&self) -> TreeResult<()> {
        let fail = |reason: String| -> TreeResult<()> {
            Err(TreeError::InvariantViolation(format!(
                "{}: {reason}",
                self.id.short_hex()
            )))
        };
        match &self.shape {
            TreeShape::Leaf { trees, features } => {
                if self.entries as usize > NORMALIZED_SIZE_LIMIT {
                    return fail(format!("flat tree holds {} entries", self.entries));
                }
                if trees.iter().any(|n| !n.is_tree()) || features.iter().any(|n| !n.is_feature()) {
                    return fail("node listed under the wrong kind".into());
                }
                if !NodeStorageOrder::is_sorted(trees) || !NodeStorageOrder::is_sorted(features) {
                    return fail("nodes out of canonical order".into());
                }
                if self.size < features.len() as u64 {
                    return fail(format!(
                        "size {} below {} direct features",
                        self.size,
                        features.len()
                    ));
                }
            }
            TreeShape::Buckets(buckets) => {
                if (self.entries as usize) <= NORMALIZED_SIZE_LIMIT {
                    return fail(format!("bucketed tree holds only {} entries", self.entries));
                }
                if let Some(idx) = buckets.keys().find(|i| **i as usize >= MAX_BUCKETS) {
                    return fail(format!("bucket index {idx} out of range"));
                }
                if buckets.values().any(|b| b.entries == 0) {
                    return fail("empty bucket".into());
                }
                let bucket_size: u64 = buckets.values().map(|b| b.size).sum();
                if self.size != bucket_size {
                    return fail(format!(
                        "size {} does not match bucket total {bucket_size}",
                        self.size
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn to_stored_object(&self) -> TreeResult<StoredObject> {
        let record = TreeRecord {
            size: self.size,
            shape: self.shape.clone(),
        };
        let data = bincode::serialize(&record).map_err(|e| TreeError::Encoding(e.to_string()))?;
        Ok(StoredObject::with_id(self.id, ObjectKind::Tree, data))
    }

    pub fn from_stored_object(obj: &StoredObject) -> TreeResult<Self> {
        if obj.kind != ObjectKind::Tree {
            return Err(TreeError::NotATree(obj.id.to_hex()));
        }
        let record: TreeRecord =
            bincode::deserialize(&obj.data).map_err(|e| TreeError::Encoding(e.to_string()))?;
        let (num_trees, entries) = match &record.shape {
            TreeShape::Leaf { trees, features } => {
                (trees.len() as u64, (trees.len() + features.len()) as u64)
            }
            TreeShape::Buckets(b) => (
                b.values().map(|b| b.num_trees).sum(),
                b.values().map(|b| b.entries).sum(),
            ),
        };
        let tree = Self {
            id: obj.id,
            size: record.size,
            num_trees,
            entries,
            shape: record.shape,
        };
        tree.validate()?;
        Ok(tree)
    }
}

impl Default for RevTree {
    fn default() -> Self {
        Self::empty()
    }
}

/// Merging iterator over a flat tree's trees and features.
pub struct Children<'a> {
    trees: &'a [Node],
    features: &'a [Node],
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let take_tree = match (self.trees.first(), self.features.first()) {
            (Some(t), Some(f)) => NodeStorageOrder::compare(t, f).is_lt(),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return None,
        };
        let list = if take_tree {
            &mut self.trees
        } else {
            &mut self.features
        };
        let current: &'a [Node] = *list;
        let (first, rest) = current.split_first()?;
        *list = rest;
        Some(first)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.trees.len() + self.features.len();
        (n, Some(n))
    }
}

fn canonical_bytes(shape: &TreeShape) -> Vec<u8> {
    let mut out = Vec::new();
    match shape {
        TreeShape::Leaf { trees, features } => {
            out.push(LEAF_TAG);
            for node in trees.iter().chain(features) {
                out.extend_from_slice(&(node.name.len() as u32).to_le_bytes());
                out.extend_from_slice(node.name.as_bytes());
                out.push(node.kind.tag());
                out.extend_from_slice(node.object_id.as_bytes());
                out.extend_from_slice(node.metadata_id.as_bytes());
            }
        }
        TreeShape::Buckets(buckets) => {
            out.push(BUCKETS_TAG);
            for (idx, bucket) in buckets {
                out.push(*idx);
                out.extend_from_slice(bucket.id.as_bytes());
            }
        }
    }
    out
}

/// Load a tree. The empty tree never touches the store.
pub fn read_tree(store: &dyn ObjectStore, id: &ObjectId) -> TreeResult<RevTree> {
    if *id == empty_tree_id() {
        return Ok(RevTree::empty());
    }
    let obj = store.read(id)?.ok_or(TreeError::NotFound(*id))?;
    RevTree::from_stored_object(&obj)
}

/// Persist a single tree (not its children).
pub fn write_tree(store: &dyn ObjectStore, tree: &RevTree) -> TreeResult<ObjectId> {
    let id = store.write(&tree.to_stored_object()?)?;
    trace!(tree = %id.short_hex(), entries = tree.entries, size = tree.size, "wrote tree");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_store::InMemoryObjectStore;

    fn feature(name: &str) -> Node {
        Node::feature(name, ObjectId::from_bytes(name.as_bytes()), ObjectId::null()).unwrap()
    }

    fn sorted(mut nodes: Vec<Node>) -> Vec<Node> {
        NodeStorageOrder::sort(&mut nodes);
        nodes
    }

    #[test]
    fn empty_tree_is_a_fixed_singleton() {
        let store = InMemoryObjectStore::new();
        assert_eq!(RevTree::empty().id(), RevTree::empty_id());
        assert_eq!(RevTree::leaf(vec![], vec![], 0).id(), empty_tree_id());
        let loaded = read_tree(&store, &empty_tree_id()).unwrap();
        assert!(loaded.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn hash_ignores_bounds() {
        let plain = RevTree::leaf(vec![], vec![feature("a")], 1);
        let bounded = RevTree::leaf(
            vec![],
            vec![feature("a").with_bounds(Some(Envelope::point(1.0, 2.0)))],
            1,
        );
        assert_eq!(plain.id(), bounded.id());
        assert_eq!(bounded.bounds(), Some(Envelope::point(1.0, 2.0)));
        assert_eq!(plain.bounds(), None);
    }

    #[test]
    fn hash_covers_metadata() {
        let a = RevTree::leaf(vec![], vec![feature("a")], 1);
        let mut with_md = feature("a");
        with_md.metadata_id = ObjectId::from_bytes(b"type");
        let b = RevTree::leaf(vec![], vec![with_md], 1);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn store_round_trip_keeps_derived_fields() {
        let store = InMemoryObjectStore::new();
        let sub = Node::tree("sub", ObjectId::from_bytes(b"sub"), ObjectId::null())
            .unwrap()
            .with_bounds(Some(Envelope::point(0.0, 0.0)));
        let tree = RevTree::leaf(vec![sub], sorted(vec![feature("x"), feature("y")]), 7);
        let id = write_tree(&store, &tree).unwrap();
        let loaded = read_tree(&store, &id).unwrap();
        assert_eq!(loaded, tree);
        assert_eq!(loaded.size(), 7);
        assert_eq!(loaded.num_trees(), 1);
        assert_eq!(loaded.entry_count(), 3);
    }

    #[test]
    fn children_merge_trees_and_features() {
        let trees = sorted(vec![
            Node::tree("t1", ObjectId::null(), ObjectId::null()).unwrap(),
            Node::tree("t2", ObjectId::null(), ObjectId::null()).unwrap(),
        ]);
        let features = sorted((0..10).map(|i| feature(&format!("f{i}"))).collect());
        let tree = RevTree::leaf(trees, features, 10);
        let names: Vec<&Node> = tree.children().collect();
        assert_eq!(names.len(), 12);
        assert!(names
            .windows(2)
            .all(|w| NodeStorageOrder::compare(w[0], w[1]).is_lt()));
        // restartable
        assert_eq!(tree.children().count(), 12);
    }

    #[test]
    fn validate_rejects_oversized_leaf() {
        let features = sorted(
            (0..=NORMALIZED_SIZE_LIMIT)
                .map(|i| feature(&format!("f{i}")))
                .collect(),
        );
        let tree = RevTree::leaf(vec![], features, 513);
        assert!(matches!(
            tree.validate(),
            Err(TreeError::InvariantViolation(_))
        ));
    }

    #[test]
    fn validate_rejects_small_bucketed_tree() {
        let mut buckets = BTreeMap::new();
        buckets.insert(
            3,
            Bucket {
                id: ObjectId::from_bytes(b"b"),
                entries: 10,
                size: 10,
                num_trees: 0,
                bounds: None,
            },
        );
        let tree = RevTree::bucketed(buckets);
        assert!(tree.validate().is_err());
    }

    #[test]
    fn decoding_validates() {
        let store = InMemoryObjectStore::new();
        let mut reversed = sorted(vec![feature("a"), feature("b"), feature("c")]);
        reversed.reverse();
        let unsorted = RevTree::leaf(vec![], reversed, 3);
        write_tree(&store, &unsorted).unwrap();
        assert!(matches!(
            read_tree(&store, &unsorted.id()),
            Err(TreeError::InvariantViolation(_))
        ));
    }

    #[test]
    fn decoding_rejects_size_that_disagrees_with_buckets() {
        let store = InMemoryObjectStore::new();
        let bucket = |name: &[u8]| Bucket {
            id: ObjectId::from_bytes(name),
            entries: 300,
            size: 300,
            num_trees: 0,
            bounds: None,
        };
        let mut buckets = BTreeMap::new();
        buckets.insert(1, bucket(b"one"));
        buckets.insert(2, bucket(b"two"));
        let mut tree = RevTree::bucketed(buckets);
        assert_eq!(tree.size(), 600);
        tree.validate().unwrap();

        tree.size = 7;
        write_tree(&store, &tree).unwrap();
        assert!(matches!(
            read_tree(&store, &tree.id()),
            Err(TreeError::InvariantViolation(_))
        ));
    }

    #[test]
    fn missing_tree_is_not_found() {
        let store = InMemoryObjectStore::new();
        let err = read_tree(&store, &ObjectId::from_bytes(b"nope")).unwrap_err();
        assert!(err.is_not_found());
    }
}
