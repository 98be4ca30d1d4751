use arbor_types::ObjectId;

/// Domain-separated BLAKE3 content hasher.
///
/// The domain tag is hashed ahead of the payload, so a tree and a feature
/// with identical bytes never share an id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    pub const TREE: Self = Self {
        domain: "arbor-tree-v1",
    };
    pub const COMMIT: Self = Self {
        domain: "arbor-commit-v1",
    };
    pub const FEATURE: Self = Self {
        domain: "arbor-feature-v1",
    };
    pub const FEATURE_TYPE: Self = Self {
        domain: "arbor-featuretype-v1",
    };

    /// `BLAKE3(domain ":" data)`.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Plain BLAKE3 without a domain tag. Used for name hashing, where the
    /// digest never becomes an object id.
    pub fn raw_hash(data: &[u8]) -> [u8; 32] {
        *blake3::hash(data).as_bytes()
    }
}
