//! ls-tree style traversal.
//!
//! [`TreeWalker`] yields [`NodeRef`]s in pre-order: a tree node comes right
//! before its contents. Bucket levels are invisible to callers.

use arbor_store::ObjectStore;
use arbor_types::{path, Node, NodeRef, ObjectId};

use crate::error::TreeResult;
use crate::lookup::all_children;
use crate::tree::{read_tree, RevTree};

/// Which nodes a walk visits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkStrategy {
    /// Direct children of the root only.
    Children,
    /// Direct feature children only.
    Features,
    /// Direct tree children only.
    Trees,
    /// Every node, recursively.
    DepthFirst,
    DepthFirstOnlyTrees,
    DepthFirstOnlyFeatures,
}

impl WalkStrategy {
    fn recursive(self) -> bool {
        matches!(
            self,
            WalkStrategy::DepthFirst
                | WalkStrategy::DepthFirstOnlyTrees
                | WalkStrategy::DepthFirstOnlyFeatures
        )
    }

    fn accepts(self, node: &Node) -> bool {
        match self {
            WalkStrategy::Children | WalkStrategy::DepthFirst => true,
            WalkStrategy::Features | WalkStrategy::DepthFirstOnlyFeatures => node.is_feature(),
            WalkStrategy::Trees | WalkStrategy::DepthFirstOnlyTrees => node.is_tree(),
        }
    }
}

struct Frame {
    parent_path: String,
    parent_metadata_id: ObjectId,
    nodes: std::vec::IntoIter<Node>,
}

/// Lazy iterator over the nodes of a tree.
pub struct TreeWalker<'a> {
    store: &'a dyn ObjectStore,
    strategy: WalkStrategy,
    stack: Vec<Frame>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        root: &RevTree,
        strategy: WalkStrategy,
    ) -> TreeResult<Self> {
        let nodes = all_children(store, root)?;
        Ok(Self {
            store,
            strategy,
            stack: vec![Frame {
                parent_path: String::new(),
                parent_metadata_id: ObjectId::null(),
                nodes: nodes.into_iter(),
            }],
        })
    }

    fn descend(&mut self, parent_path: &str, node: &Node) -> TreeResult<()> {
        let tree = read_tree(self.store, &node.object_id)?;
        let nodes = all_children(self.store, &tree)?;
        self.stack.push(Frame {
            parent_path: path::child_path(parent_path, &node.name),
            parent_metadata_id: node.metadata_id,
            nodes: nodes.into_iter(),
        });
        Ok(())
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = TreeResult<NodeRef>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(node) = frame.nodes.next() else {
                self.stack.pop();
                continue;
            };
            let parent_path = frame.parent_path.clone();
            let parent_metadata_id = frame.parent_metadata_id;

            if node.is_tree() && self.strategy.recursive() {
                if let Err(e) = self.descend(&parent_path, &node) {
                    self.stack.clear();
                    return Some(Err(e));
                }
            }
            if self.strategy.accepts(&node) {
                return Some(Ok(NodeRef::new(parent_path, parent_metadata_id, node)));
            }
        }
    }
}
