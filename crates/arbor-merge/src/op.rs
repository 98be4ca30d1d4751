//! The merge operation.

use serde::{Deserialize, Serialize};
use tracing::info;

use arbor_dag::{CommitGraph, DagError};
use arbor_diff::merge_trees;
use arbor_refs::{RefStore, HEAD};
use arbor_store::{ObjectStore, RevCommit};
use arbor_tree::RevTree;
use arbor_types::{ObjectId, Person};

use crate::error::{MergeError, MergeResult};

/// Who a merge commit is attributed to. Used as both author and committer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// This identity stamped with the current time.
    pub fn person(&self) -> Person {
        Person::now(self.name.clone(), self.email.clone())
    }
}

/// What a successful merge did to the ref.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The ref was moved to an existing commit.
    FastForward { commit: ObjectId },
    /// A merge commit was written. `conflicts` lists the paths where the
    /// incoming side overrode a local change.
    Merged {
        commit: ObjectId,
        conflicts: Vec<String>,
    },
}

impl MergeOutcome {
    /// The commit the ref points to after the merge.
    pub fn commit(&self) -> ObjectId {
        match self {
            MergeOutcome::FastForward { commit } | MergeOutcome::Merged { commit, .. } => *commit,
        }
    }

    pub fn is_fast_forward(&self) -> bool {
        matches!(self, MergeOutcome::FastForward { .. })
    }
}

/// Merge one or more commits into the commit `ref_name` points to.
///
/// ```text
/// MergeOp::new(&objects, &refs)
///     .add_commit(branch1)
///     .add_commit(branch2)
///     .identity(Identity::new("groldan", "groldan@example.org"))
///     .call()?;
/// ```
pub struct MergeOp<'a> {
    objects: &'a dyn ObjectStore,
    refs: &'a dyn RefStore,
    commits: Vec<ObjectId>,
    message: Option<String>,
    identity: Option<Identity>,
    ref_name: String,
}

impl<'a> MergeOp<'a> {
    pub fn new(objects: &'a dyn ObjectStore, refs: &'a dyn RefStore) -> Self {
        Self {
            objects,
            refs,
            commits: Vec::new(),
            message: None,
            identity: None,
            ref_name: HEAD.to_string(),
        }
    }

    pub fn add_commit(mut self, id: ObjectId) -> Self {
        self.commits.push(id);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// The ref to merge into. Defaults to `HEAD`, which moves the checked
    /// out branch.
    pub fn ref_name(mut self, name: impl Into<String>) -> Self {
        self.ref_name = name.into();
        self
    }

    pub fn call(self) -> MergeResult<MergeOutcome> {
        if self.commits.is_empty() {
            return Err(MergeError::InvalidArgument("no commits to merge".into()));
        }
        if self.commits.iter().any(ObjectId::is_null) {
            return Err(MergeError::InvalidArgument("cannot merge the null commit".into()));
        }

        let graph = CommitGraph::new(self.objects);
        let mut foreign = Vec::with_capacity(self.commits.len());
        for id in &self.commits {
            let commit = graph.read_commit(id).map_err(|e| match e {
                DagError::CommitNotFound(missing) => MergeError::NotFound(missing),
                other => other.into(),
            })?;
            foreign.push((*id, commit));
        }

        let tip = self.refs.try_resolve(&self.ref_name)?.unwrap_or_else(ObjectId::null);

        if let [(id, _)] = foreign.as_slice() {
            if *id == tip {
                return Err(MergeError::NothingToCommit);
            }
            if tip.is_null() || graph.is_ancestor(&tip, id)? {
                let target = self.refs.update(&self.ref_name, *id)?;
                info!(
                    target = %target,
                    from = %tip.short_hex(),
                    to = %id.short_hex(),
                    "fast-forward"
                );
                return Ok(MergeOutcome::FastForward { commit: *id });
            }
        }

        let identity = self.identity.as_ref().ok_or(MergeError::MissingIdentity)?;

        let tip_tree = if tip.is_null() {
            RevTree::empty_id()
        } else {
            graph.read_commit(&tip)?.tree_id
        };

        let mut merged_tree = tip_tree;
        let mut heads = Vec::with_capacity(foreign.len() + 1);
        if !tip.is_null() {
            heads.push(tip);
        }
        let mut conflicts = Vec::new();
        for (id, commit) in &foreign {
            if heads.contains(id) {
                continue;
            }
            let ancestor_tree = match graph.common_ancestor_of(&heads, id)? {
                Some(ancestor) => graph.read_commit(&ancestor)?.tree_id,
                None => RevTree::empty_id(),
            };
            let merge = merge_trees(self.objects, &ancestor_tree, &merged_tree, &commit.tree_id)?;
            merged_tree = merge.tree_id;
            conflicts.extend(merge.conflicts);
            heads.push(*id);
        }

        if merged_tree == tip_tree {
            return Err(MergeError::NothingToCommit);
        }

        let message = self
            .message
            .clone()
            .unwrap_or_else(|| default_message(&self.commits));
        let person = identity.person();
        let commit = RevCommit {
            tree_id: merged_tree,
            parent_ids: heads,
            author: person.clone(),
            committer: person,
            message,
        };
        let commit_id = self.objects.put_commit(&commit)?;
        let target = self.refs.update(&self.ref_name, commit_id)?;
        info!(
            target = %target,
            commit = %commit_id.short_hex(),
            parents = commit.parent_ids.len(),
            conflicts = conflicts.len(),
            "merge commit"
        );
        Ok(MergeOutcome::Merged {
            commit: commit_id,
            conflicts,
        })
    }
}

fn default_message(commits: &[ObjectId]) -> String {
    let ids: Vec<String> = commits.iter().map(ObjectId::to_hex).collect();
    match ids.as_slice() {
        [one] => format!("Merge commit {one}"),
        _ => format!("Merge commits {}", ids.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_refs::{branch_ref, InMemoryRefStore};
    use arbor_store::InMemoryObjectStore;
    use arbor_tree::{find_path, read_tree, MutableTree};
    use arbor_types::Node;

    const MASTER: &str = "refs/heads/master";

    struct Repo {
        objects: InMemoryObjectStore,
        refs: InMemoryRefStore,
    }

    impl Repo {
        fn new() -> Self {
            let refs = InMemoryRefStore::new();
            refs.set_symbolic(HEAD, MASTER).unwrap();
            Self {
                objects: InMemoryObjectStore::new(),
                refs,
            }
        }

        fn tree_of(&self, commit: &ObjectId) -> ObjectId {
            if commit.is_null() {
                return RevTree::empty_id();
            }
            self.objects.get_commit(commit).unwrap().tree_id
        }

        /// Commit `features` (as `parent/name`) on top of `parent`.
        fn commit(&self, parent: ObjectId, features: &[&str], message: &str) -> ObjectId {
            let base = read_tree(&self.objects, &self.tree_of(&parent)).unwrap();
            let mut tree = MutableTree::from_root(base);
            for f in features {
                let (dir, name) = f.split_once('/').unwrap();
                let node =
                    Node::feature(name, ObjectId::from_bytes(f.as_bytes()), ObjectId::null())
                        .unwrap();
                tree.put_feature(&self.objects, dir, node).unwrap();
            }
            let tree_id = tree.build(&self.objects).unwrap().id();
            let person = Person::new("tester", "tester@example.org", 0, 0);
            let commit = RevCommit {
                tree_id,
                parent_ids: if parent.is_null() { vec![] } else { vec![parent] },
                author: person.clone(),
                committer: person,
                message: message.into(),
            };
            self.objects.put_commit(&commit).unwrap()
        }

        fn set_branch(&self, name: &str, id: ObjectId) {
            self.refs.update(&branch_ref(name), id).unwrap();
        }

        fn head(&self) -> ObjectId {
            self.refs.resolve(HEAD).unwrap()
        }

        fn has(&self, commit: &ObjectId, path: &str) -> bool {
            let root = read_tree(&self.objects, &self.tree_of(commit)).unwrap();
            find_path(&self.objects, &root, path).unwrap().is_some()
        }

        fn merge(&self) -> MergeOp<'_> {
            MergeOp::new(&self.objects, &self.refs)
                .identity(Identity::new("groldan", "groldan@example.org"))
        }
    }

    #[test]
    fn merge_multiple_branches() {
        let repo = Repo::new();
        let c1 = repo.commit(ObjectId::null(), &["points/p1"], "c1");
        let c2 = repo.commit(c1, &["points/p2"], "c2");
        let c3 = repo.commit(c1, &["points/p3"], "c3");
        let c4 = repo.commit(c3, &["lines/l1"], "c4");
        let c5 = repo.commit(c3, &["lines/l2"], "c5");
        repo.set_branch("branch1", c2);
        repo.set_branch("branch2", c4);
        repo.set_branch("master", c5);

        let outcome = repo
            .merge()
            .add_commit(c2)
            .add_commit(c4)
            .message("My merge message.")
            .call()
            .unwrap();
        assert!(!outcome.is_fast_forward());
        let merge = outcome.commit();
        assert_eq!(repo.head(), merge);

        let commit = repo.objects.get_commit(&merge).unwrap();
        assert_eq!(commit.parent_ids, vec![c5, c2, c4]);
        assert_eq!(commit.message, "My merge message.");
        assert_eq!(commit.author.name, "groldan");
        for path in ["points/p1", "points/p2", "points/p3", "lines/l1", "lines/l2"] {
            assert!(repo.has(&merge, path), "{path} missing");
        }

        let log: Vec<ObjectId> = CommitGraph::new(&repo.objects)
            .log(&merge)
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(log, vec![merge, c5, c3, c1]);
    }

    #[test]
    fn fast_forward_writes_nothing() {
        let repo = Repo::new();
        let c1 = repo.commit(ObjectId::null(), &["points/p1"], "c1");
        let c2 = repo.commit(c1, &["points/p2"], "c2");
        repo.set_branch("master", c1);
        let before = repo.objects.len();

        let outcome = repo.merge().add_commit(c2).call().unwrap();
        assert_eq!(outcome, MergeOutcome::FastForward { commit: c2 });
        assert_eq!(repo.head(), c2);
        assert_eq!(repo.refs.resolve(MASTER).unwrap(), c2);
        assert_eq!(repo.objects.len(), before);
    }

    #[test]
    fn fast_forward_onto_unborn_branch() {
        let repo = Repo::new();
        let c1 = repo.commit(ObjectId::null(), &["points/p1"], "c1");
        assert!(repo.refs.try_resolve(HEAD).unwrap().is_none());

        // no identity needed when nothing is written
        let outcome = MergeOp::new(&repo.objects, &repo.refs).add_commit(c1).call().unwrap();
        assert!(outcome.is_fast_forward());
        assert_eq!(repo.head(), c1);
    }

    #[test]
    fn merging_twice_is_nothing_to_commit() {
        let repo = Repo::new();
        let c1 = repo.commit(ObjectId::null(), &["points/p1"], "c1");
        let c2 = repo.commit(c1, &["points/p2"], "c2");
        let c3 = repo.commit(c1, &["points/p3"], "c3");
        repo.set_branch("master", c3);

        let merge = repo.merge().add_commit(c2).call().unwrap().commit();
        assert_eq!(repo.head(), merge);

        let again = repo.merge().add_commit(c2).call();
        assert!(matches!(again, Err(MergeError::NothingToCommit)));
        assert_eq!(repo.head(), merge);

        assert!(matches!(
            repo.merge().add_commit(merge).call(),
            Err(MergeError::NothingToCommit)
        ));
    }

    #[test]
    fn repeated_commits_are_single_parents() {
        let repo = Repo::new();
        let c1 = repo.commit(ObjectId::null(), &["points/p1"], "c1");
        let c2 = repo.commit(c1, &["points/p2"], "c2");
        let c3 = repo.commit(c1, &["points/p3"], "c3");
        repo.set_branch("master", c3);

        let merge = repo
            .merge()
            .add_commit(c2)
            .add_commit(c3)
            .add_commit(c2)
            .call()
            .unwrap()
            .commit();
        let commit = repo.objects.get_commit(&merge).unwrap();
        assert_eq!(commit.parent_ids, vec![c3, c2]);
        assert!(repo.has(&merge, "points/p2"));
        assert!(repo.has(&merge, "points/p3"));
    }

    #[test]
    fn default_message_lists_commits() {
        let repo = Repo::new();
        let c1 = repo.commit(ObjectId::null(), &["points/p1"], "c1");
        let c2 = repo.commit(c1, &["points/p2"], "c2");
        let c3 = repo.commit(c1, &["points/p3"], "c3");
        let c4 = repo.commit(c1, &["points/p4"], "c4");
        repo.set_branch("master", c3);

        let one = repo.merge().add_commit(c2).call().unwrap().commit();
        let message = repo.objects.get_commit(&one).unwrap().message;
        assert_eq!(message, format!("Merge commit {}", c2.to_hex()));
        assert!(message.contains(&c2.to_string()));

        repo.set_branch("master", c3);
        let two = repo.merge().add_commit(c2).add_commit(c4).call().unwrap().commit();
        assert_eq!(
            repo.objects.get_commit(&two).unwrap().message,
            format!("Merge commits {}, {}", c2.to_hex(), c4.to_hex())
        );
    }

    #[test]
    fn conflicts_take_the_incoming_side() {
        let repo = Repo::new();
        let c1 = repo.commit(ObjectId::null(), &["points/p1"], "c1");
        let ours = repo.commit(c1, &["points/p2"], "ours");
        repo.set_branch("master", ours);

        // same path, different content on the other side
        let base = read_tree(&repo.objects, &repo.tree_of(&c1)).unwrap();
        let mut tree = MutableTree::from_root(base);
        let theirs_p2 =
            Node::feature("p2", ObjectId::from_bytes(b"theirs"), ObjectId::null()).unwrap();
        tree.put_feature(&repo.objects, "points", theirs_p2.clone()).unwrap();
        let person = Person::new("other", "other@example.org", 0, 0);
        let theirs = repo
            .objects
            .put_commit(&RevCommit {
                tree_id: tree.build(&repo.objects).unwrap().id(),
                parent_ids: vec![c1],
                author: person.clone(),
                committer: person,
                message: "theirs".into(),
            })
            .unwrap();

        let outcome = repo.merge().add_commit(theirs).call().unwrap();
        match &outcome {
            MergeOutcome::Merged { conflicts, .. } => {
                assert_eq!(conflicts, &vec!["points/p2".to_string()])
            }
            other => panic!("expected a merge commit, got {other:?}"),
        }
        let root = read_tree(&repo.objects, &repo.tree_of(&outcome.commit())).unwrap();
        let p2 = find_path(&repo.objects, &root, "points/p2").unwrap().unwrap();
        assert_eq!(p2.node.object_id, theirs_p2.object_id);
    }

    #[test]
    fn detached_head_moves_itself() {
        let repo = Repo::new();
        let c1 = repo.commit(ObjectId::null(), &["points/p1"], "c1");
        let c2 = repo.commit(c1, &["points/p2"], "c2");
        let c3 = repo.commit(c1, &["points/p3"], "c3");
        repo.set_branch("master", c3);
        repo.refs.write_ref(HEAD, &arbor_refs::Ref::Direct(c3)).unwrap();

        let merge = repo.merge().add_commit(c2).call().unwrap().commit();
        assert_eq!(repo.refs.resolve(HEAD).unwrap(), merge);
        assert_eq!(repo.refs.resolve(MASTER).unwrap(), c3);
    }

    #[test]
    fn argument_errors() {
        let repo = Repo::new();
        assert!(matches!(repo.merge().call(), Err(MergeError::InvalidArgument(_))));
        assert!(matches!(
            repo.merge().add_commit(ObjectId::null()).call(),
            Err(MergeError::InvalidArgument(_))
        ));

        let ghost = ObjectId::from_bytes(b"ghost");
        let err = repo.merge().add_commit(ghost).call().unwrap_err();
        assert!(matches!(err, MergeError::NotFound(id) if id == ghost));
        assert!(err.is_not_found());
    }

    #[test]
    fn diverged_merge_needs_identity() {
        let repo = Repo::new();
        let c1 = repo.commit(ObjectId::null(), &["points/p1"], "c1");
        let c2 = repo.commit(c1, &["points/p2"], "c2");
        let c3 = repo.commit(c1, &["points/p3"], "c3");
        repo.set_branch("master", c3);

        let err = MergeOp::new(&repo.objects, &repo.refs).add_commit(c2).call();
        assert!(matches!(err, Err(MergeError::MissingIdentity)));
        assert_eq!(repo.head(), c3);
    }

    #[test]
    fn identity_is_serializable() {
        let id = Identity::new("groldan", "groldan@example.org");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(serde_json::from_str::<Identity>(&json).unwrap(), id);
    }
}
