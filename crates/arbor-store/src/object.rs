use serde::{Deserialize, Serialize};
use serde_json::Value;

use arbor_crypto::ContentHasher;
use arbor_types::{ObjectId, Person};

use crate::error::{StoreError, StoreResult};

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Tree,
    Commit,
    Feature,
    FeatureType,
}

impl ObjectKind {
    /// Hasher whose domain tag is used for ids of this kind.
    pub fn hasher(&self) -> ContentHasher {
        match self {
            ObjectKind::Tree => ContentHasher::TREE,
            ObjectKind::Commit => ContentHasher::COMMIT,
            ObjectKind::Feature => ContentHasher::FEATURE,
            ObjectKind::FeatureType => ContentHasher::FEATURE_TYPE,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree => write!(f, "tree"),
            Self::Commit => write!(f, "commit"),
            Self::Feature => write!(f, "feature"),
            Self::FeatureType => write!(f, "featuretype"),
        }
    }
}

/// The unit of storage: id, kind tag and serialized payload.
///
/// For commits, features and feature types the id is the hash of `data`.
/// Trees hash a canonical encoding that leaves out derived fields (sizes,
/// bounds), so their payload is filed under an id computed by the tree code
/// and passed to [`StoredObject::with_id`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub data: Vec<u8>,
    pub size: u64,
}

impl StoredObject {
    /// Create an object whose id is the domain-separated hash of `data`.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let id = kind.hasher().hash(&data);
        Self::with_id(id, kind, data)
    }

    /// Create an object filed under a caller-computed id.
    pub fn with_id(id: ObjectId, kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self {
            id,
            kind,
            data,
            size,
        }
    }

    /// Check that `data` hashes to `id`. Trees are skipped: their id covers
    /// a canonical form, not the payload bytes.
    pub fn verify(&self) -> StoreResult<()> {
        if self.kind == ObjectKind::Tree {
            return Ok(());
        }
        let computed = self.kind.hasher().hash(&self.data);
        if computed != self.id {
            return Err(StoreError::HashMismatch {
                id: self.id,
                computed,
            });
        }
        Ok(())
    }

    pub(crate) fn expect_kind(&self, kind: ObjectKind) -> StoreResult<()> {
        if self.kind != kind {
            return Err(StoreError::CorruptObject {
                id: self.id,
                reason: format!("expected {kind}, got {}", self.kind),
            });
        }
        Ok(())
    }
}

fn encode_json<T: Serialize>(kind: ObjectKind, value: &T) -> StoreResult<StoredObject> {
    let data = serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(StoredObject::new(kind, data))
}

fn decode_json<T: for<'de> Deserialize<'de>>(
    obj: &StoredObject,
    kind: ObjectKind,
) -> StoreResult<T> {
    obj.expect_kind(kind)?;
    serde_json::from_slice(&obj.data).map_err(|e| StoreError::CorruptObject {
        id: obj.id,
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// RevCommit
// ---------------------------------------------------------------------------

/// A snapshot of a root tree plus its history links.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevCommit {
    pub tree_id: ObjectId,
    /// First parent is the branch tip the commit was made on.
    pub parent_ids: Vec<ObjectId>,
    pub author: Person,
    pub committer: Person,
    pub message: String,
}

impl RevCommit {
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        encode_json(ObjectKind::Commit, self)
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        decode_json(obj, ObjectKind::Commit)
    }

    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.id)
    }

    pub fn first_parent(&self) -> Option<ObjectId> {
        self.parent_ids.first().copied()
    }

    pub fn is_merge(&self) -> bool {
        self.parent_ids.len() > 1
    }
}

// ---------------------------------------------------------------------------
// RevFeature
// ---------------------------------------------------------------------------

/// A record: attribute values in feature-type order. Opaque to the tree code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevFeature {
    pub values: Vec<Value>,
}

impl RevFeature {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        encode_json(ObjectKind::Feature, self)
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        decode_json(obj, ObjectKind::Feature)
    }

    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.id)
    }
}

// ---------------------------------------------------------------------------
// RevFeatureType
// ---------------------------------------------------------------------------

/// The schema of a feature collection, referenced through node metadata ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevFeatureType {
    pub name: String,
    pub attributes: Vec<String>,
}

impl RevFeatureType {
    pub fn new(name: impl Into<String>, attributes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        encode_json(ObjectKind::FeatureType, self)
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        decode_json(obj, ObjectKind::FeatureType)
    }

    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.id)
    }
}
