use arbor_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{RevCommit, RevFeature, RevFeatureType, StoredObject};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written.
/// - `write` is idempotent: writing an id that already exists is a no-op,
///   never an error, so concurrent writers racing on identical content are safe.
/// - Store failures are returned to the caller; nothing above retries them.
pub trait ObjectStore: Send + Sync {
    /// Read an object by id. `Ok(None)` if it does not exist.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object under `object.id` and return that id.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Delete an object. Returns `true` if it existed. Garbage collection only.
    fn delete(&self, id: &ObjectId) -> StoreResult<bool>;

    fn read_batch(&self, ids: &[ObjectId]) -> StoreResult<Vec<Option<StoredObject>>> {
        ids.iter().map(|id| self.read(id)).collect()
    }

    fn write_batch(&self, objects: &[StoredObject]) -> StoreResult<Vec<ObjectId>> {
        objects.iter().map(|obj| self.write(obj)).collect()
    }

    // ---- typed access ----

    /// Read an object that must exist.
    fn get(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        self.read(id)?.ok_or(StoreError::NotFound(*id))
    }

    fn get_commit(&self, id: &ObjectId) -> StoreResult<RevCommit> {
        RevCommit::from_stored_object(&self.get(id)?)
    }

    fn get_feature(&self, id: &ObjectId) -> StoreResult<RevFeature> {
        RevFeature::from_stored_object(&self.get(id)?)
    }

    fn get_feature_type(&self, id: &ObjectId) -> StoreResult<RevFeatureType> {
        RevFeatureType::from_stored_object(&self.get(id)?)
    }

    fn put_commit(&self, commit: &RevCommit) -> StoreResult<ObjectId> {
        self.write(&commit.to_stored_object()?)
    }

    fn put_feature(&self, feature: &RevFeature) -> StoreResult<ObjectId> {
        self.write(&feature.to_stored_object()?)
    }

    fn put_feature_type(&self, feature_type: &RevFeatureType) -> StoreResult<ObjectId> {
        self.write(&feature_type.to_stored_object()?)
    }
}
