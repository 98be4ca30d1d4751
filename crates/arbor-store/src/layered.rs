//! A read-through overlay of two stores.
//!
//! The working copy keeps staged objects in a staging store that sits on top
//! of the permanent store: staged trees reference both freshly staged
//! objects and already committed ones.

use arbor_types::ObjectId;

use crate::error::StoreResult;
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// Reads from `upper` first, then `lower`. Writes and deletes go to `upper`.
pub struct LayeredObjectStore<'a> {
    upper: &'a dyn ObjectStore,
    lower: &'a dyn ObjectStore,
}

impl<'a> LayeredObjectStore<'a> {
    pub fn new(upper: &'a dyn ObjectStore, lower: &'a dyn ObjectStore) -> Self {
        Self { upper, lower }
    }

    pub fn upper(&self) -> &'a dyn ObjectStore {
        self.upper
    }

    pub fn lower(&self) -> &'a dyn ObjectStore {
        self.lower
    }
}

impl ObjectStore for LayeredObjectStore<'_> {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        match self.upper.read(id)? {
            Some(obj) => Ok(Some(obj)),
            None => self.lower.read(id),
        }
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        self.upper.write(object)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.upper.exists(id)? || self.lower.exists(id)?)
    }

    fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        self.upper.delete(id)
    }
}
