use tracing::info;

use arbor_dag::CommitGraph;
use arbor_diff::{diff_trees, PathFilter, TreeDiff, WriteTree};
use arbor_merge::{MergeOp, MergeOutcome};
use arbor_refs::{
    branch_ref, validate_branch_name, InMemoryRefStore, Ref, RefError, RefStore, HEAD, STAGE_HEAD,
};
use arbor_store::{
    BoundsProvider, InMemoryObjectStore, LayeredObjectStore, NoBounds, ObjectStore, RevCommit,
    RevFeature, RevFeatureType,
};
use arbor_tree::{find_path, read_tree, MutableTree, RevTree, TreeWalker, WalkStrategy};
use arbor_types::{path, Node, NodeRef, ObjectId};

use crate::config::RepoConfig;
use crate::error::{SdkError, SdkResult};

/// The default branch created by [`Repository::init`].
pub const DEFAULT_BRANCH: &str = "master";

/// An in-memory Arbor repository.
///
/// Committed objects live in the permanent store. Inserts and removals are
/// written to a separate staging store and recorded as the root tree in
/// `STAGE_HEAD`; committing migrates what the new commit needs.
pub struct Repository {
    objects: InMemoryObjectStore,
    staging: InMemoryObjectStore,
    refs: InMemoryRefStore,
    config: RepoConfig,
    bounds: Box<dyn BoundsProvider>,
}

impl Repository {
    /// Create a repository with an unborn `master` branch checked out.
    pub fn init() -> SdkResult<Self> {
        Self::init_with_config(RepoConfig::default())
    }

    pub fn init_with_config(config: RepoConfig) -> SdkResult<Self> {
        let refs = InMemoryRefStore::new();
        refs.set_symbolic(HEAD, &branch_ref(DEFAULT_BRANCH))?;
        refs.write_ref(STAGE_HEAD, &Ref::Direct(RevTree::empty_id()))?;
        Ok(Self {
            objects: InMemoryObjectStore::new(),
            staging: InMemoryObjectStore::new(),
            refs,
            config,
            bounds: Box::new(NoBounds),
        })
    }

    /// Compute feature bounds with `provider` on insert.
    pub fn with_bounds_provider(mut self, provider: impl BoundsProvider + 'static) -> Self {
        self.bounds = Box::new(provider);
        self
    }

    // ---- Configuration ----

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn set_config(&mut self, key: &str, value: impl Into<String>) -> SdkResult<()> {
        self.config.set(key, value)
    }

    // ---- Staging ----

    /// Staging first, then the permanent store. Writes go to staging.
    fn stage_view(&self) -> LayeredObjectStore<'_> {
        LayeredObjectStore::new(&self.staging, &self.objects)
    }

    pub fn staged_tree(&self) -> SdkResult<RevTree> {
        let id = self.refs.resolve(STAGE_HEAD)?;
        Ok(read_tree(&self.stage_view(), &id)?)
    }

    fn set_staged(&self, tree: MutableTree) -> SdkResult<ObjectId> {
        let root = tree.build(&self.stage_view())?;
        self.refs.update(STAGE_HEAD, root.id())?;
        Ok(root.id())
    }

    /// Stage `feature` as `parent_path/name`. A tree created for it takes
    /// `feature_type` as its default metadata; the feature node records its
    /// type only when it differs from the tree's.
    pub fn insert(
        &self,
        parent_path: &str,
        name: &str,
        feature: &RevFeature,
        feature_type: &RevFeatureType,
    ) -> SdkResult<NodeRef> {
        let view = self.stage_view();
        let type_id = view.put_feature_type(feature_type)?;
        let feature_id = view.put_feature(feature)?;

        let root = self.staged_tree()?;
        let mut tree = MutableTree::from_root(root.clone());
        let parent_metadata = parent_metadata(&view, &root, &mut tree, parent_path, type_id)?;

        let metadata_id = if parent_metadata == type_id {
            ObjectId::null()
        } else {
            type_id
        };
        let node = Node::feature(name, feature_id, metadata_id)?
            .with_bounds(self.bounds.bounds(feature));
        tree.put_feature(&view, parent_path, node.clone())?;
        self.set_staged(tree)?;
        Ok(NodeRef::new(parent_path, parent_metadata, node))
    }

    /// Unstage the node at `node_path`. Returns whether it was there.
    pub fn remove(&self, node_path: &str) -> SdkResult<bool> {
        let mut tree = MutableTree::from_root(self.staged_tree()?);
        if !tree.remove(&self.stage_view(), node_path)? {
            return Ok(false);
        }
        self.set_staged(tree)?;
        Ok(true)
    }

    /// Move the node at `from` to `to` in the staging area.
    pub fn rename(&self, from: &str, to: &str) -> SdkResult<()> {
        let view = self.stage_view();
        let root = self.staged_tree()?;
        let Some(found) = find_path(&view, &root, from)? else {
            return Err(SdkError::InvalidOperation(format!("nothing staged at {from}")));
        };
        let mut tree = MutableTree::from_root(root.clone());
        let feature_type = found.default_metadata_id();
        let mut node = found.node;
        node.name = path::name(to).to_string();
        if node.is_tree() {
            tree.set_tree(&view, to, node)?;
        } else {
            let parent_path = path::parent(to);
            let parent_metadata =
                parent_metadata(&view, &root, &mut tree, parent_path, feature_type)?;
            node.metadata_id = if feature_type == parent_metadata {
                ObjectId::null()
            } else {
                feature_type
            };
            tree.put_feature(&view, parent_path, node)?;
        }
        tree.remove(&view, from)?;
        self.set_staged(tree)?;
        Ok(())
    }

    // ---- Commits ----

    /// Commit everything staged.
    pub fn commit(&self, message: &str) -> SdkResult<ObjectId> {
        self.commit_filtered(message, PathFilter::all())
    }

    /// Commit only the staged changes at or below `paths`. Other staged
    /// changes stay staged.
    pub fn commit_paths(&self, message: &str, paths: &[&str]) -> SdkResult<ObjectId> {
        let filter = PathFilter::new(paths.iter().copied())?;
        self.commit_filtered(message, filter)
    }

    fn commit_filtered(&self, message: &str, filter: PathFilter) -> SdkResult<ObjectId> {
        let identity = self.config.identity().ok_or_else(|| {
            SdkError::Config("user.name and user.email must be set to commit".into())
        })?;
        let head = self.refs.try_resolve(HEAD)?;
        let head_tree = self.commit_tree(head)?;
        let staged = self.refs.resolve(STAGE_HEAD)?;

        let tree_id = WriteTree::new(&self.objects, &self.staging)
            .base(head_tree)
            .staged(staged)
            .filter(filter)
            .call()?;
        if tree_id == head_tree {
            return Err(SdkError::NothingToCommit);
        }

        let person = identity.person();
        let commit = RevCommit {
            tree_id,
            parent_ids: head.into_iter().collect(),
            author: person.clone(),
            committer: person,
            message: message.to_string(),
        };
        let id = self.objects.put_commit(&commit)?;
        let target = self.refs.update(HEAD, id)?;
        info!(commit = %id.short_hex(), tree = %tree_id.short_hex(), target = %target, "committed");
        Ok(id)
    }

    fn commit_tree(&self, commit: Option<ObjectId>) -> SdkResult<ObjectId> {
        Ok(match commit {
            Some(id) => self.objects.get_commit(&id)?.tree_id,
            None => RevTree::empty_id(),
        })
    }

    /// The commit HEAD points to, or `None` on an unborn branch.
    pub fn head_commit(&self) -> SdkResult<Option<(ObjectId, RevCommit)>> {
        match self.refs.try_resolve(HEAD)? {
            Some(id) => Ok(Some((id, self.objects.get_commit(&id)?))),
            None => Ok(None),
        }
    }

    /// First-parent history of HEAD, newest first.
    pub fn log(&self) -> SdkResult<Vec<(ObjectId, RevCommit)>> {
        let head = self.refs.try_resolve(HEAD)?.unwrap_or_else(ObjectId::null);
        Ok(CommitGraph::new(&self.objects).log(&head).collect::<Result<Vec<_>, _>>()?)
    }

    // ---- Branches ----

    /// Create a branch at the current HEAD commit.
    pub fn create_branch(&self, name: &str) -> SdkResult<ObjectId> {
        validate_branch_name(name)?;
        let full = branch_ref(name);
        if self.refs.read_ref(&full)?.is_some() {
            return Err(SdkError::BranchExists(name.to_string()));
        }
        let head = self
            .refs
            .try_resolve(HEAD)?
            .ok_or_else(|| {
                SdkError::InvalidOperation("cannot branch before the first commit".into())
            })?;
        self.refs.write_ref(&full, &Ref::Direct(head))?;
        info!(branch = name, at = %head.short_hex(), "created branch");
        Ok(head)
    }

    /// Point HEAD at `name` and reset the staging area to its tree.
    /// Uncommitted staged changes are discarded.
    pub fn checkout(&self, name: &str) -> SdkResult<ObjectId> {
        let full = branch_ref(name);
        let id = self
            .refs
            .try_resolve(&full)?
            .ok_or_else(|| SdkError::BranchNotFound(name.to_string()))?;
        self.refs.set_symbolic(HEAD, &full)?;
        self.refs.update(STAGE_HEAD, self.commit_tree(Some(id))?)?;
        info!(branch = name, at = %id.short_hex(), "checked out");
        Ok(id)
    }

    /// Merge `commits` into HEAD and reset the staging area to the result.
    pub fn merge(&self, commits: &[ObjectId], message: Option<&str>) -> SdkResult<MergeOutcome> {
        let mut op = commits
            .iter()
            .fold(MergeOp::new(&self.objects, &self.refs), |op, id| op.add_commit(*id));
        if let Some(message) = message {
            op = op.message(message);
        }
        if let Some(identity) = self.config.identity() {
            op = op.identity(identity);
        }
        let outcome = op.call()?;
        self.refs.update(STAGE_HEAD, self.commit_tree(Some(outcome.commit()))?)?;
        Ok(outcome)
    }

    /// Resolve a ref name, a branch name or a full commit id.
    pub fn resolve(&self, name: &str) -> SdkResult<ObjectId> {
        if let Some(id) = self.refs.try_resolve(name)? {
            return Ok(id);
        }
        if validate_branch_name(name).is_ok() {
            if let Some(id) = self.refs.try_resolve(&branch_ref(name))? {
                return Ok(id);
            }
        }
        if let Ok(id) = ObjectId::from_hex(name) {
            if self.objects.exists(&id)? {
                return Ok(id);
            }
        }
        Err(RefError::NotFound {
            name: name.to_string(),
        }
        .into())
    }

    // ---- Trees ----

    pub fn read_tree(&self, id: &ObjectId) -> SdkResult<RevTree> {
        Ok(read_tree(&self.objects, id)?)
    }

    pub fn find(&self, tree: &ObjectId, node_path: &str) -> SdkResult<Option<NodeRef>> {
        Ok(find_path(&self.objects, &self.read_tree(tree)?, node_path)?)
    }

    pub fn ls_tree(&self, tree: &ObjectId, strategy: WalkStrategy) -> SdkResult<Vec<NodeRef>> {
        let root = self.read_tree(tree)?;
        Ok(TreeWalker::new(&self.objects, &root, strategy)?.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn diff(&self, old: &ObjectId, new: &ObjectId) -> SdkResult<TreeDiff> {
        Ok(diff_trees(&self.objects, old, new)?)
    }

    // ---- Accessors ----

    pub fn objects(&self) -> &InMemoryObjectStore {
        &self.objects
    }

    pub fn staging(&self) -> &InMemoryObjectStore {
        &self.staging
    }

    pub fn refs(&self) -> &InMemoryRefStore {
        &self.refs
    }
}

/// Default metadata of the tree at `parent_path`. A missing tree is created
/// in `tree` with `feature_type` as its default.
fn parent_metadata(
    store: &dyn ObjectStore,
    root: &RevTree,
    tree: &mut MutableTree,
    parent_path: &str,
    feature_type: ObjectId,
) -> SdkResult<ObjectId> {
    if parent_path.is_empty() {
        return Ok(ObjectId::null());
    }
    match find_path(store, root, parent_path)? {
        Some(existing) if existing.node.is_tree() => Ok(existing.node.metadata_id),
        Some(_) => Err(arbor_tree::TreeError::NotATree(parent_path.to_string()).into()),
        None => {
            let node = Node::tree(path::name(parent_path), RevTree::empty_id(), feature_type)?;
            tree.set_tree(store, parent_path, node)?;
            Ok(feature_type)
        }
    }
}
