//! Single-level merge-join of two trees.
//!
//! Children are compared in [`NodeStorageOrder`]. When both sides are
//! bucketed, buckets with the same index and id are skipped without being
//! read; differing buckets are joined recursively one depth down. When only
//! one side is bucketed, the flat side is partitioned with the same bucket
//! function and each partition is joined against the matching bucket's
//! contents.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use arbor_store::ObjectStore;
use arbor_tree::{all_children, read_tree, Bucket, NodeStorageOrder, RevTree};
use arbor_types::{same_entry, Node};

use crate::error::DiffResult;

/// A child whose entry differs between the old and new tree. `old` is
/// `None` for additions, `new` is `None` for removals.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryChange {
    pub old: Option<Node>,
    pub new: Option<Node>,
}

impl EntryChange {
    pub fn name(&self) -> &str {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .map_or("", |n| n.name.as_str())
    }

    pub fn is_addition(&self) -> bool {
        self.old.is_none()
    }

    pub fn is_removal(&self) -> bool {
        self.new.is_none()
    }

    fn is_unchanged(&self) -> bool {
        same_entry(self.old.as_ref(), self.new.as_ref())
    }
}

/// Direct children that differ between `old` and `new`, in
/// [`NodeStorageOrder`]. Nodes are paired by name; a change of kind is a
/// single modification. Bounds-only differences are not reported.
pub fn join_children(
    store: &dyn ObjectStore,
    old: &RevTree,
    new: &RevTree,
) -> DiffResult<Vec<EntryChange>> {
    let mut out = Vec::new();
    join_at(store, 0, old, new, &mut out)?;
    Ok(out)
}

fn join_at(
    store: &dyn ObjectStore,
    depth: usize,
    old: &RevTree,
    new: &RevTree,
    out: &mut Vec<EntryChange>,
) -> DiffResult<()> {
    if old.id() == new.id() {
        return Ok(());
    }
    match (old.buckets(), new.buckets()) {
        (None, None) => {
            merge_join(
                old.children().cloned().collect(),
                new.children().cloned().collect(),
                out,
            );
        }
        (Some(ob), Some(nb)) => {
            let indices: BTreeSet<u8> = ob.keys().chain(nb.keys()).copied().collect();
            for idx in indices {
                let (o, n) = (ob.get(&idx), nb.get(&idx));
                if let (Some(o), Some(n)) = (o, n) {
                    if o.id == n.id {
                        continue;
                    }
                }
                join_at(store, depth + 1, &load(store, o)?, &load(store, n)?, out)?;
            }
        }
        (Some(ob), None) => {
            let flat = partition(new, depth)?;
            join_mixed(store, ob, flat, true, out)?;
        }
        (None, Some(nb)) => {
            let flat = partition(old, depth)?;
            join_mixed(store, nb, flat, false, out)?;
        }
    }
    Ok(())
}

/// Join a bucketed level against a flat one split into the same buckets.
fn join_mixed(
    store: &dyn ObjectStore,
    buckets: &BTreeMap<u8, Bucket>,
    mut flat: BTreeMap<u8, Vec<Node>>,
    bucketed_is_old: bool,
    out: &mut Vec<EntryChange>,
) -> DiffResult<()> {
    let indices: BTreeSet<u8> = buckets.keys().chain(flat.keys()).copied().collect();
    for idx in indices {
        let bucketed = match buckets.get(&idx) {
            Some(bucket) => all_children(store, &read_tree(store, &bucket.id)?)?,
            None => Vec::new(),
        };
        let flat_part = flat.remove(&idx).unwrap_or_default();
        if bucketed_is_old {
            merge_join(bucketed, flat_part, out);
        } else {
            merge_join(flat_part, bucketed, out);
        }
    }
    Ok(())
}

fn partition(tree: &RevTree, depth: usize) -> DiffResult<BTreeMap<u8, Vec<Node>>> {
    let mut parts: BTreeMap<u8, Vec<Node>> = BTreeMap::new();
    for node in tree.children() {
        parts
            .entry(NodeStorageOrder::bucket(&node.name, depth)?)
            .or_default()
            .push(node.clone());
    }
    Ok(parts)
}

fn load(store: &dyn ObjectStore, bucket: Option<&Bucket>) -> DiffResult<RevTree> {
    Ok(match bucket {
        Some(b) => read_tree(store, &b.id)?,
        None => RevTree::empty(),
    })
}

/// Both inputs must be in [`NodeStorageOrder`].
fn merge_join(old: Vec<Node>, new: Vec<Node>, out: &mut Vec<EntryChange>) {
    let mut old = old.into_iter().peekable();
    let mut new = new.into_iter().peekable();
    loop {
        let ord = match (old.peek(), new.peek()) {
            (Some(a), Some(b)) => NodeStorageOrder::compare_names(&a.name, &b.name),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        let change = match ord {
            Ordering::Less => EntryChange {
                old: old.next(),
                new: None,
            },
            Ordering::Greater => EntryChange {
                old: None,
                new: new.next(),
            },
            Ordering::Equal => EntryChange {
                old: old.next(),
                new: new.next(),
            },
        };
        if !change.is_unchanged() {
            out.push(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_store::InMemoryObjectStore;
    use arbor_tree::{RevTreeBuilder, NORMALIZED_SIZE_LIMIT};
    use arbor_types::{Envelope, ObjectId};

    fn feature(name: &str, version: &str) -> Node {
        Node::feature(
            name,
            ObjectId::from_bytes(format!("{name}:{version}").as_bytes()),
            ObjectId::null(),
        )
        .unwrap()
    }

    fn build(store: &dyn ObjectStore, nodes: impl IntoIterator<Item = Node>) -> RevTree {
        let mut b = RevTreeBuilder::new(store);
        for n in nodes {
            b.put(n).unwrap();
        }
        b.build().unwrap()
    }

    fn edit(store: &dyn ObjectStore, base: &RevTree, put: Vec<Node>, remove: &[&str]) -> RevTree {
        let mut b = RevTreeBuilder::from_tree(store, base.clone());
        for n in put {
            b.put(n).unwrap();
        }
        for name in remove {
            b.remove(name);
        }
        b.build().unwrap()
    }

    fn summary(changes: &[EntryChange]) -> Vec<(String, &'static str)> {
        let mut out: Vec<(String, &'static str)> = changes
            .iter()
            .map(|c| {
                let kind = match (&c.old, &c.new) {
                    (None, Some(_)) => "added",
                    (Some(_), None) => "removed",
                    _ => "modified",
                };
                (c.name().to_string(), kind)
            })
            .collect();
        out.sort();
        out
    }

    fn many(n: usize) -> Vec<Node> {
        (0..n).map(|i| feature(&format!("f{i}"), "v1")).collect()
    }

    #[test]
    fn identical_trees_have_no_changes() {
        let store = InMemoryObjectStore::new();
        let tree = build(&store, many(20));
        assert!(join_children(&store, &tree, &tree).unwrap().is_empty());
    }

    #[test]
    fn flat_changes() {
        let store = InMemoryObjectStore::new();
        let old = build(&store, many(10));
        let new = edit(&store, &old, vec![feature("f1", "v2"), feature("new", "v1")], &["f2"]);
        let changes = join_children(&store, &old, &new).unwrap();
        assert_eq!(
            summary(&changes),
            vec![
                ("f1".to_string(), "modified"),
                ("f2".to_string(), "removed"),
                ("new".to_string(), "added"),
            ]
        );
        let names: Vec<&str> = changes.iter().map(EntryChange::name).collect();
        let mut sorted = names.clone();
        sorted.sort_by(|a, b| NodeStorageOrder::compare_names(a, b));
        assert_eq!(names, sorted);
    }

    #[test]
    fn metadata_changes_count_bounds_do_not() {
        let store = InMemoryObjectStore::new();
        let old = build(&store, many(3));
        let mut with_md = feature("f0", "v1");
        with_md.metadata_id = ObjectId::from_bytes(b"other type");
        let bounded = feature("f1", "v1").with_bounds(Some(Envelope::point(1.0, 1.0)));
        let new = edit(&store, &old, vec![with_md, bounded], &[]);
        assert_eq!(
            summary(&join_children(&store, &old, &new).unwrap()),
            vec![("f0".to_string(), "modified")]
        );
    }

    #[test]
    fn kind_change_is_one_modification() {
        let store = InMemoryObjectStore::new();
        let old = build(&store, vec![feature("x", "v1")]);
        let new = build(
            &store,
            vec![Node::tree("x", RevTree::empty_id(), ObjectId::null()).unwrap()],
        );
        let changes = join_children(&store, &old, &new).unwrap();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].old.as_ref().unwrap().is_feature());
        assert!(changes[0].new.as_ref().unwrap().is_tree());
    }

    #[test]
    fn bucketed_sides_skip_equal_buckets() {
        let store = InMemoryObjectStore::new();
        let old = build(&store, many(3000));
        let new = edit(&store, &old, vec![feature("f42", "v2")], &["f7"]);
        let changes = join_children(&store, &old, &new).unwrap();
        assert_eq!(
            summary(&changes),
            vec![("f42".to_string(), "modified"), ("f7".to_string(), "removed")]
        );
    }

    #[test]
    fn mixed_shapes_are_joined_per_bucket() {
        let store = InMemoryObjectStore::new();
        let flat = build(&store, many(NORMALIZED_SIZE_LIMIT));
        let bucketed = edit(
            &store,
            &flat,
            vec![feature("extra", "v1"), feature("f3", "v2")],
            &[],
        );
        assert!(flat.is_leaf());
        assert!(!bucketed.is_leaf());

        let forward = join_children(&store, &flat, &bucketed).unwrap();
        assert_eq!(
            summary(&forward),
            vec![("extra".to_string(), "added"), ("f3".to_string(), "modified")]
        );
        let backward = join_children(&store, &bucketed, &flat).unwrap();
        assert_eq!(
            summary(&backward),
            vec![("extra".to_string(), "removed"), ("f3".to_string(), "modified")]
        );
    }

    #[test]
    fn against_the_empty_tree_everything_is_added() {
        let store = InMemoryObjectStore::new();
        let big = build(&store, many(1200));
        let changes = join_children(&store, &RevTree::empty(), &big).unwrap();
        assert_eq!(changes.len(), 1200);
        assert!(changes.iter().all(EntryChange::is_addition));
        let changes = join_children(&store, &big, &RevTree::empty()).unwrap();
        assert!(changes.iter().all(EntryChange::is_removal));
    }
}
