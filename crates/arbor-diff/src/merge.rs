//! Three-way tree merge.
//!
//! The changes between `ancestor` and `theirs` are replayed onto `ours`.
//! An entry `ours` left as it was in the ancestor takes the incoming change;
//! an entry both sides changed the same way is kept. Subtrees changed on both
//! sides are merged recursively. Anything else is a conflict: the incoming
//! change wins and the path is reported.

use tracing::{debug, warn};

use arbor_store::ObjectStore;
use arbor_tree::{find_child, read_tree, RevTree, RevTreeBuilder};
use arbor_types::{path, same_entry, Node, ObjectId};

use crate::error::DiffResult;
use crate::join::join_children;

/// Outcome of [`merge_trees`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeMerge {
    pub tree_id: ObjectId,
    /// Paths changed differently on both sides, resolved in favor of
    /// `theirs`.
    pub conflicts: Vec<String>,
}

impl TreeMerge {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Merge `theirs` into `ours` relative to `ancestor`. All three trees and
/// everything they reference must be in `store`; new trees are written
/// there.
pub fn merge_trees(
    store: &dyn ObjectStore,
    ancestor: &ObjectId,
    ours: &ObjectId,
    theirs: &ObjectId,
) -> DiffResult<TreeMerge> {
    let mut conflicts = Vec::new();
    let tree_id = if theirs == ancestor || ours == theirs {
        *ours
    } else if ours == ancestor {
        *theirs
    } else {
        let merged = merge_level(
            store,
            "",
            &read_tree(store, ancestor)?,
            &read_tree(store, ours)?,
            &read_tree(store, theirs)?,
            &mut conflicts,
        )?;
        merged.id()
    };
    debug!(
        tree = %tree_id.short_hex(),
        conflicts = conflicts.len(),
        "merged trees"
    );
    Ok(TreeMerge { tree_id, conflicts })
}

fn merge_level(
    store: &dyn ObjectStore,
    parent: &str,
    ancestor: &RevTree,
    ours: &RevTree,
    theirs: &RevTree,
    conflicts: &mut Vec<String>,
) -> DiffResult<RevTree> {
    if theirs.id() == ancestor.id() || ours.id() == theirs.id() {
        return Ok(ours.clone());
    }
    if ours.id() == ancestor.id() {
        return Ok(theirs.clone());
    }

    let mut builder = RevTreeBuilder::from_tree(store, ours.clone());
    for change in join_children(store, ancestor, theirs)? {
        let name = change.name().to_string();
        let ours_node = find_child(store, ours, &name)?;
        let (base, incoming) = (change.old, change.new);

        if same_entry(ours_node.as_ref(), base.as_ref()) {
            apply(&mut builder, &name, incoming)?;
            continue;
        }
        if same_entry(ours_node.as_ref(), incoming.as_ref()) {
            continue;
        }

        let child_path = path::child_path(parent, &name);
        match (ours_node, incoming) {
            (Some(o), Some(t)) if o.is_tree() && t.is_tree() => {
                let base_tree = match &base {
                    Some(b) if b.is_tree() => read_tree(store, &b.object_id)?,
                    _ => RevTree::empty(),
                };
                let merged = merge_level(
                    store,
                    &child_path,
                    &base_tree,
                    &read_tree(store, &o.object_id)?,
                    &read_tree(store, &t.object_id)?,
                    conflicts,
                )?;
                let theirs_changed_metadata = base
                    .as_ref()
                    .map_or(true, |b| b.metadata_id != t.metadata_id);
                let metadata_id = if theirs_changed_metadata {
                    t.metadata_id
                } else {
                    o.metadata_id
                };
                builder.put(
                    Node::tree(name, merged.id(), metadata_id)?.with_bounds(merged.bounds()),
                )?;
            }
            (_, incoming) => {
                warn!(path = %child_path, "merge conflict, taking incoming change");
                conflicts.push(child_path);
                apply(&mut builder, &name, incoming)?;
            }
        }
    }
    Ok(builder.build()?)
}

fn apply(builder: &mut RevTreeBuilder<'_>, name: &str, node: Option<Node>) -> DiffResult<()> {
    match node {
        Some(n) => builder.put(n)?,
        None => builder.remove(name),
    }
    Ok(())
}
