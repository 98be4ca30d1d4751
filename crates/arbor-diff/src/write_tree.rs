//! Write staged changes onto a committed tree.
//!
//! [`WriteTree`] reconciles two trees: the committed `base`, whose objects
//! live in the permanent store, and the `staged` tree, whose new objects live
//! in the staging store. The result is `base` with the staged differences
//! applied (all of them, or those a [`PathFilter`] selects), persisted in the
//! permanent store.
//!
//! Per level, the children of both trees are merge-joined. For each change
//! the child's path is classified against the filter:
//!
//! - covered: the staged entry replaces the committed one (or removes it),
//!   and every object it reaches that the permanent store lacks is copied
//!   over from staging, children before parents
//! - partial: both sides' subtrees are reconciled recursively
//! - outside: the committed entry is kept
//!
//! Untouched subtrees and buckets are carried over by id and never re-read.

use tracing::{debug, info};

use arbor_store::{LayeredObjectStore, ObjectStore};
use arbor_tree::{empty_tree_id, read_tree, RevTree, RevTreeBuilder, TreeShape};
use arbor_types::{path, Node, ObjectId};

use crate::error::{DiffError, DiffResult};
use crate::filter::{Coverage, PathFilter};
use crate::join::join_children;

/// Applies a staged tree onto a committed one.
///
/// ```ignore
/// let root = WriteTree::new(&objects, &staging)
///     .base(head_tree)
///     .staged(stage_tree)
///     .filter(PathFilter::new(["roads"])?)
///     .call()?;
/// ```
pub struct WriteTree<'a> {
    objects: &'a dyn ObjectStore,
    staging: &'a dyn ObjectStore,
    base: ObjectId,
    staged: ObjectId,
    filter: PathFilter,
}

impl<'a> WriteTree<'a> {
    /// Both trees default to the empty tree and the filter to everything.
    pub fn new(objects: &'a dyn ObjectStore, staging: &'a dyn ObjectStore) -> Self {
        Self {
            objects,
            staging,
            base: empty_tree_id(),
            staged: empty_tree_id(),
            filter: PathFilter::all(),
        }
    }

    /// The committed root tree. Must be readable from the permanent store.
    pub fn base(mut self, id: ObjectId) -> Self {
        self.base = id;
        self
    }

    /// The staged root tree, read from staging with fallback to the
    /// permanent store.
    pub fn staged(mut self, id: ObjectId) -> Self {
        self.staged = id;
        self
    }

    pub fn filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Write the reconciled tree and return its id.
    pub fn call(&self) -> DiffResult<ObjectId> {
        let reader = LayeredObjectStore::new(self.staging, self.objects);
        let mut writer = Writer {
            objects: self.objects,
            reader: &reader,
            filter: &self.filter,
            applied: 0,
            migrated: 0,
        };
        let base = read_tree(self.objects, &self.base)?;
        let staged = read_tree(&reader, &self.staged)?;
        let result = writer.write_level("", &base, &staged)?;
        info!(
            root = %result.id().short_hex(),
            changes = writer.applied,
            migrated = writer.migrated,
            filtered = !self.filter.is_all(),
            "wrote tree"
        );
        Ok(result.id())
    }
}

struct Writer<'s> {
    objects: &'s dyn ObjectStore,
    reader: &'s dyn ObjectStore,
    filter: &'s PathFilter,
    applied: usize,
    migrated: usize,
}

impl Writer<'_> {
    fn write_level(
        &mut self,
        parent: &str,
        base: &RevTree,
        staged: &RevTree,
    ) -> DiffResult<RevTree> {
        let changes = join_children(self.reader, base, staged)?;
        let mut builder = RevTreeBuilder::from_tree(self.objects, base.clone());

        for change in changes {
            let name = change.name().to_string();
            let child_path = path::child_path(parent, &name);
            match self.filter.classify(&child_path) {
                Coverage::Outside => {}
                Coverage::Covered => {
                    match change.new {
                        Some(node) => {
                            self.migrate_node(&node)?;
                            builder.put(node)?;
                        }
                        None => builder.remove(&name),
                    }
                    self.applied += 1;
                }
                Coverage::Partial => {
                    let old = change.old.filter(Node::is_tree);
                    let new = change.new.filter(Node::is_tree);
                    if old.is_none() && new.is_none() {
                        continue;
                    }
                    let base_sub = self.subtree(old.as_ref())?;
                    let staged_sub = self.subtree(new.as_ref())?;
                    let result = self.write_level(&child_path, &base_sub, &staged_sub)?;
                    match &old {
                        Some(o) if o.object_id == result.id() => continue,
                        None if result.is_empty() => continue,
                        _ => {}
                    }
                    let metadata_id = new
                        .as_ref()
                        .or(old.as_ref())
                        .map_or(ObjectId::null(), |n| n.metadata_id);
                    self.migrate_metadata(&metadata_id)?;
                    builder.put(
                        Node::tree(name, result.id(), metadata_id)?.with_bounds(result.bounds()),
                    )?;
                }
            }
        }
        Ok(builder.build()?)
    }

    fn subtree(&self, node: Option<&Node>) -> DiffResult<RevTree> {
        Ok(match node {
            Some(n) => read_tree(self.reader, &n.object_id)?,
            None => RevTree::empty(),
        })
    }

    fn migrate_node(&mut self, node: &Node) -> DiffResult<()> {
        self.migrate_metadata(&node.metadata_id)?;
        if node.is_tree() {
            self.migrate_tree(&node.object_id)
        } else {
            self.copy_object(&node.object_id)
        }
    }

    fn migrate_metadata(&mut self, id: &ObjectId) -> DiffResult<()> {
        if id.is_null() {
            return Ok(());
        }
        self.copy_object(id)
    }

    /// Copy a tree and everything below it. A tree already in the permanent
    /// store is complete, since trees are always written after their
    /// children.
    fn migrate_tree(&mut self, id: &ObjectId) -> DiffResult<()> {
        if *id == empty_tree_id() || self.objects.exists(id)? {
            return Ok(());
        }
        let tree = read_tree(self.reader, id)?;
        match tree.shape() {
            TreeShape::Leaf { .. } => {
                for child in tree.children() {
                    self.migrate_node(child)?;
                }
            }
            TreeShape::Buckets(buckets) => {
                for bucket in buckets.values() {
                    self.migrate_tree(&bucket.id)?;
                }
            }
        }
        self.copy_object(id)
    }

    fn copy_object(&mut self, id: &ObjectId) -> DiffResult<()> {
        if self.objects.exists(id)? {
            return Ok(());
        }
        let obj = self.reader.read(id)?.ok_or(DiffError::NotFound(*id))?;
        self.objects.write(&obj)?;
        self.migrated += 1;
        debug!(object = %id.short_hex(), kind = %obj.kind, "migrated object");
        Ok(())
    }
}
