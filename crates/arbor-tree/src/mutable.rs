//! Path-keyed edits over a tree hierarchy.
//!
//! [`RevTreeBuilder`] works on a single level. [`MutableTree`] keeps one
//! pending level per touched subtree, loaded lazily from the store, and
//! builds them bottom-up so every parent sees its children's final ids.

use std::collections::BTreeMap;

use arbor_store::ObjectStore;
use arbor_types::{path, Node, NodeRef, ObjectId, TypeError};

use crate::builder::RevTreeBuilder;
use crate::error::{TreeError, TreeResult};
use crate::lookup::find_child;
use crate::tree::{read_tree, RevTree};

#[derive(Clone, Debug, Default)]
pub struct MutableTree {
    base: RevTree,
    metadata_id: ObjectId,
    children: BTreeMap<String, MutableTree>,
    /// Pending feature puts (`Some`) and removals (`None`) at this level.
    edits: BTreeMap<String, Option<Node>>,
}

impl MutableTree {
    pub fn from_root(root: RevTree) -> Self {
        Self {
            base: root,
            ..Self::default()
        }
    }

    /// Start from `root` and overlay `refs`, shallowest first. Tree refs
    /// replace the subtree at their path; feature refs are put.
    pub fn from_refs(store: &dyn ObjectStore, root: RevTree, refs: &[NodeRef]) -> TreeResult<Self> {
        let mut tree = Self::from_root(root);
        let mut ordered: Vec<&NodeRef> = refs.iter().collect();
        ordered.sort_by_key(|r| path::depth(&r.parent_path));
        for r in ordered {
            if r.node.is_tree() {
                tree.set_tree(store, &r.path(), r.node.clone())?;
            } else {
                tree.put_feature(store, &r.parent_path, r.node.clone())?;
            }
        }
        Ok(tree)
    }

    fn load(store: &dyn ObjectStore, node: &Node) -> TreeResult<Self> {
        Ok(Self {
            base: read_tree(store, &node.object_id)?,
            metadata_id: node.metadata_id,
            ..Self::default()
        })
    }

    pub fn metadata_id(&self) -> ObjectId {
        self.metadata_id
    }

    /// Replace the subtree at `path` with the tree `node` points to, creating
    /// missing parents. The node's name is taken from the path.
    pub fn set_tree(
        &mut self,
        store: &dyn ObjectStore,
        tree_path: &str,
        node: Node,
    ) -> TreeResult<()> {
        path::validate(tree_path)?;
        if tree_path.is_empty() {
            return Err(TypeError::InvalidPath {
                path: tree_path.to_string(),
                reason: "the root cannot be replaced".into(),
            }
            .into());
        }
        if !node.is_tree() {
            return Err(TreeError::NotATree(tree_path.to_string()));
        }
        let name = path::name(tree_path).to_string();
        let parent = self.descend_or_create(store, path::parent(tree_path))?;
        parent.edits.remove(&name);
        parent.children.insert(name, Self::load(store, &node)?);
        Ok(())
    }

    /// Put a feature node into the tree at `parent_path`, creating missing
    /// trees along the way.
    pub fn put_feature(
        &mut self,
        store: &dyn ObjectStore,
        parent_path: &str,
        node: Node,
    ) -> TreeResult<()> {
        path::validate(parent_path)?;
        if node.name.is_empty() {
            return Err(TreeError::EmptyName);
        }
        let parent = self.descend_or_create(store, parent_path)?;
        parent.children.remove(&node.name);
        parent.edits.insert(node.name.clone(), Some(node));
        Ok(())
    }

    /// Remove the node at `path`. Returns whether anything was there.
    pub fn remove(&mut self, store: &dyn ObjectStore, node_path: &str) -> TreeResult<bool> {
        path::validate(node_path)?;
        if node_path.is_empty() {
            return Ok(false);
        }
        let name = path::name(node_path);
        let segments = path::segments(path::parent(node_path));
        let Some(parent) = self.descend_mut(store, &segments, false)? else {
            return Ok(false);
        };
        let loaded = parent.children.remove(name).is_some();
        let existed = match parent.edits.get(name) {
            Some(edit) => edit.is_some(),
            None => loaded || find_child(store, &parent.base, name)?.is_some(),
        };
        parent.edits.insert(name.to_string(), None);
        Ok(existed)
    }

    /// Build every touched subtree, then this level. New trees are written
    /// to `store`.
    pub fn build(self, store: &dyn ObjectStore) -> TreeResult<RevTree> {
        let mut builder = RevTreeBuilder::from_tree(store, self.base);
        for (name, edit) in self.edits {
            match edit {
                Some(node) => builder.put(node)?,
                None => builder.remove(&name),
            }
        }
        for (name, child) in self.children {
            let metadata_id = child.metadata_id;
            let tree = child.build(store)?;
            builder.put(Node::tree(name, tree.id(), metadata_id)?.with_bounds(tree.bounds()))?;
        }
        builder.build()
    }

    fn descend_or_create(
        &mut self,
        store: &dyn ObjectStore,
        tree_path: &str,
    ) -> TreeResult<&mut Self> {
        let segments = path::segments(tree_path);
        match self.descend_mut(store, &segments, true)? {
            Some(tree) => Ok(tree),
            None => Err(TreeError::NotATree(tree_path.to_string())),
        }
    }

    fn descend_mut(
        &mut self,
        store: &dyn ObjectStore,
        segments: &[&str],
        create: bool,
    ) -> TreeResult<Option<&mut Self>> {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(Some(self));
        };
        match self.child_mut(store, first, create)? {
            Some(child) => child.descend_mut(store, rest, create),
            None => Ok(None),
        }
    }

    /// The pending child tree `name`, loading it on first access. A feature
    /// in the way is an error when `create` is set.
    fn child_mut(
        &mut self,
        store: &dyn ObjectStore,
        name: &str,
        create: bool,
    ) -> TreeResult<Option<&mut Self>> {
        if !self.children.contains_key(name) {
            let existing = match self.edits.get(name) {
                Some(edit) => edit.clone(),
                None => find_child(store, &self.base, name)?,
            };
            let child = match existing {
                Some(node) if node.is_tree() => Self::load(store, &node)?,
                Some(_) if create => return Err(TreeError::NotATree(name.to_string())),
                None if create => Self::default(),
                _ => return Ok(None),
            };
            self.edits.remove(name);
            self.children.insert(name.to_string(), child);
        }
        Ok(self.children.get_mut(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::find_path;
    use crate::walk::{TreeWalker, WalkStrategy};
    use arbor_store::InMemoryObjectStore;
    use arbor_types::Envelope;

    fn feature(name: &str) -> Node {
        Node::feature(name, ObjectId::from_bytes(name.as_bytes()), ObjectId::null()).unwrap()
    }

    fn paths(store: &dyn ObjectStore, root: &RevTree) -> Vec<String> {
        let mut out: Vec<String> = TreeWalker::new(store, root, WalkStrategy::DepthFirst)
            .unwrap()
            .map(|r| r.unwrap().path())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn puts_create_intermediate_trees() {
        let store = InMemoryObjectStore::new();
        let mut tree = MutableTree::from_root(RevTree::empty());
        tree.put_feature(&store, "roads/highways", feature("a1")).unwrap();
        tree.put_feature(&store, "roads", feature("r1")).unwrap();
        let root = tree.build(&store).unwrap();

        assert_eq!(root.size(), 2);
        assert_eq!(
            paths(&store, &root),
            vec!["roads", "roads/highways", "roads/highways/a1", "roads/r1"]
        );
    }

    #[test]
    fn edits_keep_untouched_siblings() {
        let store = InMemoryObjectStore::new();
        let mut tree = MutableTree::from_root(RevTree::empty());
        tree.put_feature(&store, "roads", feature("r1")).unwrap();
        tree.put_feature(&store, "rivers", feature("v1")).unwrap();
        let first = tree.build(&store).unwrap();
        let rivers = find_path(&store, &first, "rivers").unwrap().unwrap();

        let mut tree = MutableTree::from_root(first);
        tree.put_feature(&store, "roads", feature("r2")).unwrap();
        let second = tree.build(&store).unwrap();

        assert_eq!(second.size(), 3);
        let rivers_after = find_path(&store, &second, "rivers").unwrap().unwrap();
        assert_eq!(rivers.node.object_id, rivers_after.node.object_id);
    }

    #[test]
    fn remove_reports_presence() {
        let store = InMemoryObjectStore::new();
        let mut tree = MutableTree::from_root(RevTree::empty());
        tree.put_feature(&store, "roads", feature("r1")).unwrap();
        let root = tree.build(&store).unwrap();

        let mut tree = MutableTree::from_root(root);
        assert!(tree.remove(&store, "roads/r1").unwrap());
        assert!(!tree.remove(&store, "roads/r1").unwrap());
        assert!(!tree.remove(&store, "nowhere/r1").unwrap());
        let root = tree.build(&store).unwrap();

        assert_eq!(root.size(), 0);
        // the emptied tree stays
        assert_eq!(paths(&store, &root), vec!["roads"]);

        let mut tree = MutableTree::from_root(root);
        assert!(tree.remove(&store, "roads").unwrap());
        assert!(tree.build(&store).unwrap().is_empty());
    }

    #[test]
    fn set_tree_replaces_and_renames() {
        let store = InMemoryObjectStore::new();
        let mut tree = MutableTree::from_root(RevTree::empty());
        tree.put_feature(&store, "roads", feature("r1")).unwrap();
        let root = tree.build(&store).unwrap();
        let roads = find_path(&store, &root, "roads").unwrap().unwrap();

        let mut tree = MutableTree::from_root(root);
        tree.set_tree(&store, "roadsRenamed", roads.node.clone()).unwrap();
        tree.remove(&store, "roads").unwrap();
        let renamed = tree.build(&store).unwrap();

        assert_eq!(paths(&store, &renamed), vec!["roadsRenamed", "roadsRenamed/r1"]);
        let moved = find_path(&store, &renamed, "roadsRenamed").unwrap().unwrap();
        assert_eq!(moved.node.object_id, roads.node.object_id);
    }

    #[test]
    fn tree_metadata_and_bounds_propagate() {
        let store = InMemoryObjectStore::new();
        let md = ObjectId::from_bytes(b"road type");
        let mut tree = MutableTree::from_root(RevTree::empty());
        tree.set_tree(&store, "roads", Node::tree("x", RevTree::empty_id(), md).unwrap())
            .unwrap();
        tree.put_feature(
            &store,
            "roads",
            feature("r1").with_bounds(Some(Envelope::new(0.0, 0.0, 1.0, 1.0))),
        )
        .unwrap();
        let root = tree.build(&store).unwrap();

        let roads = find_path(&store, &root, "roads").unwrap().unwrap();
        assert_eq!(roads.node.metadata_id, md);
        assert_eq!(roads.node.bounds, Some(Envelope::new(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(root.bounds(), Some(Envelope::new(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn from_refs_overlays_shallowest_first() {
        let store = InMemoryObjectStore::new();
        let mut tree = MutableTree::from_root(RevTree::empty());
        tree.put_feature(&store, "a", feature("x")).unwrap();
        let donor = tree.build(&store).unwrap();
        let a = find_path(&store, &donor, "a").unwrap().unwrap();

        let refs = vec![
            NodeRef::new("b/c", ObjectId::null(), feature("deep")),
            NodeRef::new(
                "",
                ObjectId::null(),
                Node::tree("b", a.node.object_id, ObjectId::null()).unwrap(),
            ),
        ];
        let root = MutableTree::from_refs(&store, RevTree::empty(), &refs)
            .unwrap()
            .build(&store)
            .unwrap();
        assert_eq!(paths(&store, &root), vec!["b", "b/c", "b/c/deep", "b/x"]);
    }

    #[test]
    fn features_block_tree_creation() {
        let store = InMemoryObjectStore::new();
        let mut tree = MutableTree::from_root(RevTree::empty());
        tree.put_feature(&store, "", feature("solo")).unwrap();
        assert!(matches!(
            tree.put_feature(&store, "solo", feature("child")),
            Err(TreeError::NotATree(_))
        ));
        let root_node = Node::tree("r", RevTree::empty_id(), ObjectId::null()).unwrap();
        assert!(tree.set_tree(&store, "", root_node).is_err());
    }
}
