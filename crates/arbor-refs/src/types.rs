//! The reference value.

use std::fmt;

use serde::{Deserialize, Serialize};

use arbor_types::ObjectId;

/// A named reference: either an object id or the name of another ref.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ref {
    Direct(ObjectId),
    /// Points at another ref by canonical name, e.g. `HEAD -> refs/heads/master`.
    Symbolic(String),
}

impl Ref {
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Ref::Symbolic(_))
    }

    /// The object id of a direct ref.
    pub fn target_id(&self) -> Option<ObjectId> {
        match self {
            Ref::Direct(id) => Some(*id),
            Ref::Symbolic(_) => None,
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ref::Direct(id) => write!(f, "{}", id.to_hex()),
            Ref::Symbolic(target) => write!(f, "ref: {target}"),
        }
    }
}
