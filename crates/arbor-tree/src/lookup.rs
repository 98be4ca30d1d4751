//! Name and path lookups that see through bucket levels.

use arbor_store::ObjectStore;
use arbor_types::{path, Node, NodeRef, ObjectId};

use crate::error::TreeResult;
use crate::order::NodeStorageOrder;
use crate::tree::{read_tree, RevTree, TreeShape};

/// Find the direct child called `name`.
pub fn find_child(store: &dyn ObjectStore, tree: &RevTree, name: &str) -> TreeResult<Option<Node>> {
    find_child_at(store, tree, name, 0)
}

fn find_child_at(
    store: &dyn ObjectStore,
    tree: &RevTree,
    name: &str,
    depth: usize,
) -> TreeResult<Option<Node>> {
    match tree.shape() {
        TreeShape::Leaf { trees, features } => Ok(trees
            .iter()
            .chain(features)
            .find(|n| n.name == name)
            .cloned()),
        TreeShape::Buckets(buckets) => {
            let idx = NodeStorageOrder::bucket(name, depth)?;
            match buckets.get(&idx) {
                Some(bucket) => {
                    let child = read_tree(store, &bucket.id)?;
                    find_child_at(store, &child, name, depth + 1)
                }
                None => Ok(None),
            }
        }
    }
}

/// Resolve a slash-separated path below `root`. Returns `None` when any
/// segment is missing or a non-final segment is a feature.
pub fn find_path(
    store: &dyn ObjectStore,
    root: &RevTree,
    path: &str,
) -> TreeResult<Option<NodeRef>> {
    path::validate(path)?;
    let segments = path::segments(path);
    let Some((last, parents)) = segments.split_last() else {
        return Ok(None);
    };

    let mut tree = root.clone();
    let mut parent_path = String::new();
    let mut parent_metadata = ObjectId::null();
    for segment in parents {
        match find_child(store, &tree, segment)? {
            Some(node) if node.is_tree() => {
                tree = read_tree(store, &node.object_id)?;
                parent_metadata = node.metadata_id;
                parent_path = path::child_path(&parent_path, segment);
            }
            _ => return Ok(None),
        }
    }
    Ok(find_child(store, &tree, last)?.map(|node| NodeRef::new(parent_path, parent_metadata, node)))
}

/// All direct children of `tree` in [`NodeStorageOrder`], loading bucket
/// trees as needed.
pub fn all_children(store: &dyn ObjectStore, tree: &RevTree) -> TreeResult<Vec<Node>> {
    let mut out = Vec::with_capacity(tree.entry_count() as usize);
    collect(store, tree, &mut out)?;
    Ok(out)
}

fn collect(store: &dyn ObjectStore, tree: &RevTree, out: &mut Vec<Node>) -> TreeResult<()> {
    match tree.buckets() {
        None => out.extend(tree.children().cloned()),
        Some(buckets) => {
            for bucket in buckets.values() {
                collect(store, &read_tree(store, &bucket.id)?, out)?;
            }
        }
    }
    Ok(())
}
