//! Ancestry queries over stored commits.
//!
//! All walks are breadth-first from the starting commit and visit each
//! commit once, so shared history in merge-heavy graphs is read once.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use arbor_store::{ObjectStore, RevCommit};
use arbor_types::ObjectId;

use crate::error::{DagError, DagResult};

/// Read-only view of the commit graph in an object store.
#[derive(Clone, Copy)]
pub struct CommitGraph<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> CommitGraph<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    pub fn read_commit(&self, id: &ObjectId) -> DagResult<RevCommit> {
        let obj = self.store.read(id)?.ok_or(DagError::CommitNotFound(*id))?;
        Ok(RevCommit::from_stored_object(&obj)?)
    }

    pub fn contains(&self, id: &ObjectId) -> DagResult<bool> {
        Ok(self.store.exists(id)?)
    }

    /// `id` and all its ancestors in breadth-first order.
    pub fn ancestors(&self, id: &ObjectId) -> DagResult<Vec<ObjectId>> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        self.walk(
            id,
            |current| {
                order.push(current);
                false
            },
            &mut visited,
        )?;
        Ok(order)
    }

    /// True when `ancestor` is `descendant` itself or reachable from it
    /// through parent links.
    pub fn is_ancestor(&self, ancestor: &ObjectId, descendant: &ObjectId) -> DagResult<bool> {
        if ancestor == descendant {
            return Ok(true);
        }
        let mut found = false;
        self.walk(
            descendant,
            |current| {
                found = current == *ancestor;
                found
            },
            &mut HashSet::new(),
        )?;
        Ok(found)
    }

    /// The closest commit reachable from both `a` and `b`: the first commit
    /// in a breadth-first walk from `b` that is also an ancestor of `a`.
    pub fn common_ancestor(&self, a: &ObjectId, b: &ObjectId) -> DagResult<Option<ObjectId>> {
        self.common_ancestor_of(std::slice::from_ref(a), b)
    }

    /// Like [`CommitGraph::common_ancestor`], with the history of several
    /// `heads` taken together as one side. Null heads are ignored.
    pub fn common_ancestor_of(
        &self,
        heads: &[ObjectId],
        b: &ObjectId,
    ) -> DagResult<Option<ObjectId>> {
        if heads.contains(b) {
            return Ok(Some(*b));
        }
        let mut reachable = HashSet::new();
        for head in heads.iter().filter(|h| !h.is_null()) {
            if !reachable.contains(head) {
                reachable.extend(self.ancestors(head)?);
            }
        }
        let mut common = None;
        self.walk(
            b,
            |current| {
                if reachable.contains(&current) {
                    common = Some(current);
                }
                common.is_some()
            },
            &mut HashSet::new(),
        )?;
        debug!(
            heads = heads.len(),
            b = %b.short_hex(),
            ancestor = ?common.map(|id| id.short_hex()),
            "common ancestor"
        );
        Ok(common)
    }

    /// First-parent history from `id`, newest first.
    pub fn log(&self, id: &ObjectId) -> Log<'a> {
        Log {
            graph: *self,
            next: (!id.is_null()).then_some(*id),
        }
    }

    /// Breadth-first walk calling `visit` once per commit; stops early when
    /// `visit` returns true.
    fn walk(
        &self,
        start: &ObjectId,
        mut visit: impl FnMut(ObjectId) -> bool,
        visited: &mut HashSet<ObjectId>,
    ) -> DagResult<()> {
        let mut queue = VecDeque::from([*start]);
        visited.insert(*start);
        while let Some(current) = queue.pop_front() {
            if visit(current) {
                return Ok(());
            }
            for parent in self.read_commit(&current)?.parent_ids {
                if visited.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
        Ok(())
    }
}

/// Iterator over first-parent history. See [`CommitGraph::log`].
pub struct Log<'a> {
    graph: CommitGraph<'a>,
    next: Option<ObjectId>,
}

impl Iterator for Log<'_> {
    type Item = DagResult<(ObjectId, RevCommit)>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        match self.graph.read_commit(&id) {
            Ok(commit) => {
                self.next = commit.first_parent();
                Some(Ok((id, commit)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
