//! The `Blob` object stores the raw byte contents of a single file at a single revision.
//! Git blobs carry no name, mode, or path — that information lives in the tree entry
//! that references the blob by hash.

use std::fmt::Display;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::errors::GitError;
use crate::hash::ObjectHash;
use crate::internal::object::ObjectTrait;
use crate::internal::object::types::ObjectType;

#[derive(Eq, Debug, Clone, Serialize, Deserialize, Decode, Encode)]
pub struct Blob {
    pub id: ObjectHash,
    pub data: Vec<u8>,
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Display for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Blob: {} ({} bytes)", self.id, self.data.len())
    }
}

impl Blob {
    /// Builds a blob from file content and computes its object hash.
    pub fn from_content(data: Vec<u8>) -> Blob {
        let id = ObjectHash::from_type_and_data(ObjectType::Blob, &data);
        Blob { id, data }
    }
}

impl ObjectTrait for Blob {
    fn from_bytes(data: &[u8], hash: ObjectHash) -> Result<Self, GitError>
    where
        Self: Sized,
    {
        Ok(Blob {
            id: hash,
            data: data.to_vec(),
        })
    }

    fn get_type(&self) -> ObjectType {
        ObjectType::Blob
    }

    fn to_data(&self) -> Result<Vec<u8>, GitError> {
        Ok(self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_content_computes_hash() {
        let blob = Blob::from_content(b"hello world".to_vec());
        assert_eq!(blob.data, b"hello world");
        assert_eq!(blob.object_hash().unwrap(), blob.id);
    }

    #[test]
    fn from_bytes_round_trips_to_data() {
        let hash = ObjectHash::from_type_and_data(ObjectType::Blob, b"content");
        let blob = Blob::from_bytes(b"content", hash).unwrap();
        assert_eq!(blob.to_data().unwrap(), b"content");
    }

    #[test]
    fn empty_blob_is_valid() {
        let blob = Blob::from_content(Vec::new());
        assert!(blob.data.is_empty());
    }
}
