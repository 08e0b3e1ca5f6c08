//! Object model definitions for Git blobs, trees, commits, and tags, plus the
//! common trait that lets the content pipeline create strongly typed values
//! from raw bytes and compute their object hash.

pub mod blob;
pub mod commit;
pub mod signature;
pub mod tag;
pub mod tree;
pub mod types;

use std::fmt::Display;

use crate::{errors::GitError, hash::ObjectHash};

pub use types::ObjectType;

/// **The Object Trait**
/// Defines the common interface for all Git object types: blobs, trees, commits, and tags.
pub trait ObjectTrait: Send + Sync + Display {
    /// Creates a new object from a byte slice and its already-known hash.
    fn from_bytes(data: &[u8], hash: ObjectHash) -> Result<Self, GitError>
    where
        Self: Sized;

    /// Returns the type of the object.
    fn get_type(&self) -> ObjectType;

    /// Serializes the object to the exact bytes Git hashes and stores (without the
    /// `"<type> <len>\0"` header, which [`object_hash`](Self::object_hash) adds).
    fn to_data(&self) -> Result<Vec<u8>, GitError>;

    /// Computes the object hash from serialized data.
    ///
    /// Default implementation serializes the object and computes the hash from that data.
    /// Override only if you need custom hash computation or caching.
    fn object_hash(&self) -> Result<ObjectHash, GitError> {
        let data = self.to_data()?;
        Ok(ObjectHash::from_type_and_data(self.get_type(), &data))
    }
}
