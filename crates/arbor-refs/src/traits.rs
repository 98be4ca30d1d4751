//! The [`RefStore`] trait defining the reference storage interface.

use tracing::debug;

use arbor_types::ObjectId;

use crate::error::{RefError, RefResult};
use crate::types::Ref;

/// Longest chain of symbolic refs followed before giving up.
pub const MAX_SYMBOLIC_DEPTH: usize = 8;

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`) and provide atomic
/// read/write/delete operations on single refs. Resolution and symbolic
/// updates are provided on top of those four operations.
pub trait RefStore: Send + Sync {
    /// Read a ref by its canonical name. Returns `Ok(None)` if it does not
    /// exist.
    fn read_ref(&self, name: &str) -> RefResult<Option<Ref>>;

    /// Create or replace a ref.
    fn write_ref(&self, name: &str, reference: &Ref) -> RefResult<()>;

    /// Returns `Ok(true)` if the ref existed and was deleted.
    fn delete_ref(&self, name: &str) -> RefResult<bool>;

    /// All refs whose canonical name starts with `prefix`, sorted by name.
    fn list_refs(&self, prefix: &str) -> RefResult<Vec<(String, Ref)>>;

    /// Follow symbolic refs from `name` to the name of the direct ref at the
    /// end of the chain. That ref need not exist yet (an unborn branch).
    fn target_name(&self, name: &str) -> RefResult<String> {
        let mut current = name.to_string();
        for _ in 0..MAX_SYMBOLIC_DEPTH {
            match self.read_ref(&current)? {
                Some(Ref::Symbolic(next)) => current = next,
                _ => return Ok(current),
            }
        }
        Err(RefError::SymbolicLoop {
            name: name.to_string(),
        })
    }

    /// The object id `name` points to, following symbolic refs.
    fn resolve(&self, name: &str) -> RefResult<ObjectId> {
        let target = self.target_name(name)?;
        match self.read_ref(&target)? {
            Some(Ref::Direct(id)) => Ok(id),
            _ => Err(RefError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Like [`RefStore::resolve`], but a missing ref is `Ok(None)`.
    fn try_resolve(&self, name: &str) -> RefResult<Option<ObjectId>> {
        match self.resolve(name) {
            Ok(id) => Ok(Some(id)),
            Err(RefError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Point `name` at `id`. Symbolic refs are written through: updating
    /// `HEAD` on a branch moves the branch. Returns the ref actually written.
    fn update(&self, name: &str, id: ObjectId) -> RefResult<String> {
        let target = self.target_name(name)?;
        self.write_ref(&target, &Ref::Direct(id))?;
        debug!(name, target = %target, id = %id.short_hex(), "updated ref");
        Ok(target)
    }

    /// Make `name` a symbolic ref to `target`.
    fn set_symbolic(&self, name: &str, target: &str) -> RefResult<()> {
        self.write_ref(name, &Ref::Symbolic(target.to_string()))
    }
}
