//! Recursive, path-level diff of two trees.
//!
//! Built on [`join_children`]: every differing child is reported with its
//! full path, and subtrees present on either side of a change are descended
//! into. Renames show up as a removal plus an addition.

use arbor_store::ObjectStore;
use arbor_tree::{read_tree, RevTree};
use arbor_types::{path, Node, NodeRef, ObjectId};

use crate::error::DiffResult;
use crate::join::join_children;

/// The result of comparing two trees.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TreeDiff {
    /// Changes in depth-first order; a tree's entry precedes its contents.
    pub entries: Vec<DiffEntry>,
}

impl TreeDiff {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Changes to features only.
    pub fn features(&self) -> impl Iterator<Item = &DiffEntry> {
        self.entries.iter().filter(|e| !e.is_tree())
    }

    pub fn paths(&self) -> Vec<String> {
        self.entries.iter().map(DiffEntry::path).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

/// One changed path. At least one side is present.
#[derive(Clone, Debug, PartialEq)]
pub struct DiffEntry {
    pub old: Option<NodeRef>,
    pub new: Option<NodeRef>,
}

impl DiffEntry {
    pub fn change_type(&self) -> ChangeType {
        match (&self.old, &self.new) {
            (None, _) => ChangeType::Added,
            (_, None) => ChangeType::Removed,
            _ => ChangeType::Modified,
        }
    }

    pub fn path(&self) -> String {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .map(NodeRef::path)
            .unwrap_or_default()
    }

    /// True when either side is a tree.
    pub fn is_tree(&self) -> bool {
        [&self.old, &self.new]
            .into_iter()
            .flatten()
            .any(|r| r.node.is_tree())
    }
}

/// Diff the trees `old` and `new`, both read from `store`.
pub fn diff_trees(store: &dyn ObjectStore, old: &ObjectId, new: &ObjectId) -> DiffResult<TreeDiff> {
    let old = read_tree(store, old)?;
    let new = read_tree(store, new)?;
    let mut diff = TreeDiff::default();
    let root = Side {
        path: String::new(),
        metadata_id: ObjectId::null(),
    };
    diff_level(store, &root, &root, &old, &new, &mut diff.entries)?;
    Ok(diff)
}

/// Where a tree level sits on one side of the diff.
#[derive(Clone)]
struct Side {
    path: String,
    metadata_id: ObjectId,
}

impl Side {
    fn child(&self, node: &Node) -> Self {
        Self {
            path: path::child_path(&self.path, &node.name),
            metadata_id: node.metadata_id,
        }
    }

    fn node_ref(&self, node: Node) -> NodeRef {
        NodeRef::new(self.path.clone(), self.metadata_id, node)
    }
}

fn diff_level(
    store: &dyn ObjectStore,
    old_side: &Side,
    new_side: &Side,
    old: &RevTree,
    new: &RevTree,
    out: &mut Vec<DiffEntry>,
) -> DiffResult<()> {
    for change in join_children(store, old, new)? {
        let old_tree = subtree(store, change.old.as_ref())?;
        let new_tree = subtree(store, change.new.as_ref())?;
        let child_old = change.old.as_ref().map(|n| old_side.child(n));
        let child_new = change.new.as_ref().map(|n| new_side.child(n));

        out.push(DiffEntry {
            old: change.old.map(|n| old_side.node_ref(n)),
            new: change.new.map(|n| new_side.node_ref(n)),
        });

        if old_tree.is_some() || new_tree.is_some() {
            let empty = RevTree::empty();
            // a side without a tree descends with the other side's position
            let (child_old, child_new) = match (child_old, child_new) {
                (Some(o), Some(n)) => (o, n),
                (Some(o), None) => (o.clone(), o),
                (None, Some(n)) => (n.clone(), n),
                (None, None) => continue,
            };
            diff_level(
                store,
                &child_old,
                &child_new,
                old_tree.as_ref().unwrap_or(&empty),
                new_tree.as_ref().unwrap_or(&empty),
                out,
            )?;
        }
    }
    Ok(())
}

fn subtree(store: &dyn ObjectStore, node: Option<&Node>) -> DiffResult<Option<RevTree>> {
    match node {
        Some(n) if n.is_tree() => Ok(Some(read_tree(store, &n.object_id)?)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_store::InMemoryObjectStore;
    use arbor_tree::MutableTree;

    fn feature(name: &str, version: &str) -> Node {
        Node::feature(
            name,
            ObjectId::from_bytes(format!("{name}:{version}").as_bytes()),
            ObjectId::null(),
        )
        .unwrap()
    }

    fn build(
        store: &dyn ObjectStore,
        base: RevTree,
        puts: &[(&str, Node)],
        removes: &[&str],
    ) -> RevTree {
        let mut tree = MutableTree::from_root(base);
        for (parent, node) in puts {
            tree.put_feature(store, parent, node.clone()).unwrap();
        }
        for p in removes {
            tree.remove(store, p).unwrap();
        }
        tree.build(store).unwrap()
    }

    #[test]
    fn nested_changes_with_full_paths() {
        let store = InMemoryObjectStore::new();
        let old = build(
            &store,
            RevTree::empty(),
            &[
                ("roads", feature("r1", "v1")),
                ("roads", feature("r2", "v1")),
                ("rivers", feature("v1", "v1")),
            ],
            &[],
        );
        let new = build(
            &store,
            old.clone(),
            &[("roads", feature("r1", "v2")), ("lakes", feature("l1", "v1"))],
            &["roads/r2"],
        );

        let diff = diff_trees(&store, &old.id(), &new.id()).unwrap();
        let mut features: Vec<(String, ChangeType)> = diff
            .features()
            .map(|e| (e.path(), e.change_type()))
            .collect();
        features.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            features,
            vec![
                ("lakes/l1".to_string(), ChangeType::Added),
                ("roads/r1".to_string(), ChangeType::Modified),
                ("roads/r2".to_string(), ChangeType::Removed),
            ]
        );

        let mut trees: Vec<String> = diff
            .entries
            .iter()
            .filter(|e| e.is_tree())
            .map(DiffEntry::path)
            .collect();
        trees.sort();
        assert_eq!(trees, vec!["lakes", "roads"]);

        // a tree entry comes before its contents
        let paths = diff.paths();
        let pos = |p: &str| paths.iter().position(|x| x == p).unwrap();
        assert!(pos("lakes") < pos("lakes/l1"));
        assert!(pos("roads") < pos("roads/r1"));
    }

    #[test]
    fn rename_is_remove_plus_add() {
        let store = InMemoryObjectStore::new();
        let old = build(&store, RevTree::empty(), &[("roads", feature("r1", "v1"))], &[]);
        let roads = arbor_tree::find_path(&store, &old, "roads").unwrap().unwrap();
        let mut renamed = MutableTree::from_root(old.clone());
        renamed.set_tree(&store, "roadsRenamed", roads.node).unwrap();
        renamed.remove(&store, "roads").unwrap();
        let new = renamed.build(&store).unwrap();

        let diff = diff_trees(&store, &old.id(), &new.id()).unwrap();
        let mut changes: Vec<(String, ChangeType)> =
            diff.entries.iter().map(|e| (e.path(), e.change_type())).collect();
        changes.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            changes,
            vec![
                ("roads".to_string(), ChangeType::Removed),
                ("roads/r1".to_string(), ChangeType::Removed),
                ("roadsRenamed".to_string(), ChangeType::Added),
                ("roadsRenamed/r1".to_string(), ChangeType::Added),
            ]
        );
    }

    #[test]
    fn parent_metadata_is_carried() {
        let store = InMemoryObjectStore::new();
        let md = ObjectId::from_bytes(b"road type");
        let mut tree = MutableTree::from_root(RevTree::empty());
        tree.set_tree(&store, "roads", Node::tree("roads", RevTree::empty_id(), md).unwrap())
            .unwrap();
        tree.put_feature(&store, "roads", feature("r1", "v1")).unwrap();
        let new = tree.build(&store).unwrap();

        let diff = diff_trees(&store, &RevTree::empty_id(), &new.id()).unwrap();
        let r1 = diff
            .entries
            .iter()
            .find(|e| e.path() == "roads/r1")
            .and_then(|e| e.new.clone())
            .unwrap();
        assert_eq!(r1.parent_metadata_id, md);
        assert_eq!(r1.default_metadata_id(), md);
    }

    #[test]
    fn same_tree_is_empty_diff() {
        let store = InMemoryObjectStore::new();
        let tree = build(&store, RevTree::empty(), &[("a", feature("x", "v1"))], &[]);
        assert!(diff_trees(&store, &tree.id(), &tree.id()).unwrap().is_empty());
    }
}
