//! Content hashing for Arbor.
//!
//! Every object id is a domain-separated BLAKE3 digest. The domain tags and
//! the canonical encodings hashed under them are part of the storage format:
//! changing either invalidates every existing id.

pub mod hasher;

pub use hasher::ContentHasher;
