//! External Git collaborators: the on-disk object writer and ref
//! store are "treated as a command-line subprocess producing object
//! identifiers", so this module names them only by interface, backed by a
//! real `git` subprocess implementation plus an in-memory fake for tests.

pub mod subprocess;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::GitError;
use crate::hash::ObjectHash;
use crate::internal::object::ObjectType;

pub use subprocess::GitSubprocess;

/// Writes content-addressed objects into the target repository. Every
/// implementation must return the same id the in-process hasher would
/// compute for identical `(object_type, data)` (determinism
/// invariant).
pub trait ObjectWriter: Send + Sync {
    fn write_object(&self, object_type: ObjectType, data: &[u8]) -> Result<ObjectHash, GitError>;
}

/// Writes and enumerates refs in the target repository.
pub trait RefWriter: Send + Sync {
    fn update_ref(&self, refname: &str, target: ObjectHash) -> Result<(), GitError>;
    fn delete_ref(&self, refname: &str) -> Result<(), GitError>;
    /// Every existing ref whose name starts with `prefix`.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, ObjectHash)>, GitError>;
}

/// An in-memory stand-in for a target repository, used by unit and
/// integration tests so the engine can be exercised without a real `git`
/// binary (external-collaborator framing, made testable).
#[derive(Default)]
pub struct InMemoryRepo {
    objects: Mutex<HashMap<ObjectHash, Vec<u8>>>,
    refs: Mutex<HashMap<String, ObjectHash>>,
}

impl InMemoryRepo {
    pub fn new() -> InMemoryRepo {
        InMemoryRepo::default()
    }

    pub fn object(&self, hash: &ObjectHash) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(hash).cloned()
    }

    pub fn ref_target(&self, refname: &str) -> Option<ObjectHash> {
        self.refs.lock().unwrap().get(refname).copied()
    }
}

impl ObjectWriter for InMemoryRepo {
    fn write_object(&self, object_type: ObjectType, data: &[u8]) -> Result<ObjectHash, GitError> {
        let hash = ObjectHash::from_type_and_data(object_type, data);
        self.objects.lock().unwrap().insert(hash, data.to_vec());
        Ok(hash)
    }
}

impl RefWriter for InMemoryRepo {
    fn update_ref(&self, refname: &str, target: ObjectHash) -> Result<(), GitError> {
        self.refs.lock().unwrap().insert(refname.to_owned(), target);
        Ok(())
    }

    fn delete_ref(&self, refname: &str) -> Result<(), GitError> {
        self.refs.lock().unwrap().remove(refname);
        Ok(())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, ObjectHash)>, GitError> {
        let refs = self.refs.lock().unwrap();
        Ok(refs
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, hash)| (name.clone(), *hash))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{set_hash_kind_for_test, HashKind};

    #[test]
    fn write_then_read_back_object() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let repo = InMemoryRepo::new();
        let hash = repo.write_object(ObjectType::Blob, b"hello").unwrap();
        assert_eq!(repo.object(&hash), Some(b"hello".to_vec()));
    }

    #[test]
    fn update_then_list_refs_by_prefix() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let repo = InMemoryRepo::new();
        let hash = repo.write_object(ObjectType::Commit, b"c").unwrap();
        repo.update_ref("refs/heads/main", hash).unwrap();
        repo.update_ref("refs/tags/v1", hash).unwrap();
        let heads = repo.list_refs("refs/heads/").unwrap();
        assert_eq!(heads, vec![("refs/heads/main".to_owned(), hash)]);
    }

    #[test]
    fn delete_ref_removes_it() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let repo = InMemoryRepo::new();
        let hash = repo.write_object(ObjectType::Commit, b"c").unwrap();
        repo.update_ref("refs/heads/main", hash).unwrap();
        repo.delete_ref("refs/heads/main").unwrap();
        assert_eq!(repo.ref_target("refs/heads/main"), None);
    }
}
