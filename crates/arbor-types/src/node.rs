//! Tree entries.
//!
//! A [`Node`] names either a feature (leaf record) or a child tree. Nodes do
//! not own what they point to: many trees may share the same child id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::TypeError;
use crate::object::ObjectId;
use crate::path;

/// What a node points to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Tree,
    Feature,
}

impl NodeKind {
    /// Tag byte used in canonical tree encoding.
    pub fn tag(&self) -> u8 {
        match self {
            NodeKind::Tree => 0,
            NodeKind::Feature => 1,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Tree => write!(f, "tree"),
            NodeKind::Feature => write!(f, "feature"),
        }
    }
}

/// An entry inside a revision tree.
///
/// `metadata_id` is [`ObjectId::null`] when the node has no metadata (feature
/// type) reference of its own. `bounds` does not participate in tree hashes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub object_id: ObjectId,
    pub metadata_id: ObjectId,
    pub kind: NodeKind,
    pub bounds: Option<Envelope>,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        object_id: ObjectId,
        metadata_id: ObjectId,
        kind: NodeKind,
    ) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::EmptyName);
        }
        Ok(Self {
            name,
            object_id,
            metadata_id,
            kind,
            bounds: None,
        })
    }

    /// A node pointing at a child tree.
    pub fn tree(
        name: impl Into<String>,
        object_id: ObjectId,
        metadata_id: ObjectId,
    ) -> Result<Self, TypeError> {
        Self::new(name, object_id, metadata_id, NodeKind::Tree)
    }

    /// A node pointing at a feature.
    pub fn feature(
        name: impl Into<String>,
        object_id: ObjectId,
        metadata_id: ObjectId,
    ) -> Result<Self, TypeError> {
        Self::new(name, object_id, metadata_id, NodeKind::Feature)
    }

    pub fn with_bounds(mut self, bounds: Option<Envelope>) -> Self {
        self.bounds = bounds;
        self
    }

    /// The metadata id, or `None` when absent.
    pub fn metadata_id(&self) -> Option<ObjectId> {
        (!self.metadata_id.is_null()).then_some(self.metadata_id)
    }

    pub fn is_tree(&self) -> bool {
        self.kind == NodeKind::Tree
    }

    pub fn is_feature(&self) -> bool {
        self.kind == NodeKind::Feature
    }

    /// Equal name, kind, object id and metadata id. Bounds are ignored.
    pub fn same_entry(&self, other: &Node) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.object_id == other.object_id
            && self.metadata_id == other.metadata_id
    }
}

/// Compare two optional nodes with [`Node::same_entry`]; two `None`s match.
pub fn same_entry(a: Option<&Node>, b: Option<&Node>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.same_entry(b),
        (None, None) => true,
        _ => false,
    }
}

/// A node located inside a tree hierarchy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRef {
    /// Path of the tree that holds the node; `""` is the root.
    pub parent_path: String,
    /// Metadata id of the holding tree (null when it has none).
    pub parent_metadata_id: ObjectId,
    pub node: Node,
}

impl NodeRef {
    pub fn new(parent_path: impl Into<String>, parent_metadata_id: ObjectId, node: Node) -> Self {
        Self {
            parent_path: parent_path.into(),
            parent_metadata_id,
            node,
        }
    }

    /// Full path of the node, e.g. `roads/highways/a1`.
    pub fn path(&self) -> String {
        path::child_path(&self.parent_path, &self.node.name)
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn object_id(&self) -> ObjectId {
        self.node.object_id
    }

    /// The node's own metadata id, falling back to the holding tree's.
    pub fn default_metadata_id(&self) -> ObjectId {
        if self.node.metadata_id.is_null() {
            self.parent_metadata_id
        } else {
            self.node.metadata_id
        }
    }
}
