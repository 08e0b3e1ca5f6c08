//! Ref writer and prune pass: writes branch/tag/revision refs
//! to the target repository, reparents rootless first commits onto an
//! `--append-to-refs` namespace, and prunes refs this run no longer produces.

use crate::errors::GitError;
use crate::gitio::{ObjectWriter, RefWriter};
use crate::hash::ObjectHash;
use crate::internal::object::commit::Commit;
use crate::internal::object::ObjectType;

/// What namespace a produced ref belongs to, for prune-rule matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Branch,
    Tag,
    Revision,
}

#[derive(Debug, Clone)]
pub struct ProducedRef {
    pub refname: String,
    pub target: ObjectHash,
    pub kind: RefKind,
}

pub struct RefWriterPass<'a> {
    object_writer: &'a dyn ObjectWriter,
    ref_writer: &'a dyn RefWriter,
}

impl<'a> RefWriterPass<'a> {
    pub fn new(object_writer: &'a dyn ObjectWriter, ref_writer: &'a dyn RefWriter) -> RefWriterPass<'a> {
        RefWriterPass { object_writer, ref_writer }
    }

    /// Looks up `refs/<ns>/<refname stripped of "refs/">` in the target
    /// repository.
    pub fn find_append_parent(&self, ns: &str, refname: &str) -> Result<Option<ObjectHash>, GitError> {
        let suffix = refname.strip_prefix("refs/").unwrap_or(refname);
        let lookup = format!("refs/{ns}/{suffix}");
        Ok(self.ref_writer.list_refs(&lookup)?.into_iter().find(|(name, _)| name == &lookup).map(|(_, hash)| hash))
    }

    /// Rewrites `commit` to add `new_parent` as an additional first parent,
    /// re-serializing and writing the resulting commit object.
    pub fn reparent_commit(&self, commit: &Commit, new_parent: ObjectHash) -> Result<(Commit, ObjectHash), GitError> {
        let mut parents = vec![new_parent];
        parents.extend(commit.parent_commit_ids.iter().copied());
        let reparented = Commit::new(
            commit.author.clone(),
            commit.committer.clone(),
            commit.tree_id,
            parents,
            &commit.message,
        );
        let data = reparented.to_data()?;
        let id = self.object_writer.write_object(ObjectType::Commit, &data)?;
        Ok((reparented, id))
    }

    /// Writes every produced ref to the target repository.
    pub fn write_all(&self, produced: &[ProducedRef]) -> Result<(), GitError> {
        for entry in produced {
            self.ref_writer.update_ref(&entry.refname, entry.target)?;
        }
        Ok(())
    }

    /// Deletes every ref under `namespaces` that exists in the target but was
    /// not produced by this run. Returns the deleted refnames.
    pub fn prune(&self, namespaces: &[String], produced: &[ProducedRef]) -> Result<Vec<String>, GitError> {
        let produced_names: std::collections::HashSet<&str> =
            produced.iter().map(|r| r.refname.as_str()).collect();
        let mut deleted = Vec::new();
        for ns in namespaces {
            for (name, _) in self.ref_writer.list_refs(ns)? {
                if !produced_names.contains(name.as_str()) {
                    self.ref_writer.delete_ref(&name)?;
                    deleted.push(name);
                }
            }
        }
        Ok(deleted)
    }

    /// Moves every ref still under `refs/<ns>/` to its canonical namespace,
    /// after reparenting has consumed the ones it needed.
    pub fn transfer_leftovers(&self, ns: &str) -> Result<Vec<String>, GitError> {
        let prefix = format!("refs/{ns}/");
        let mut moved = Vec::new();
        for (name, hash) in self.ref_writer.list_refs(&prefix)? {
            let suffix = name.strip_prefix(&prefix).unwrap_or(&name);
            let canonical = format!("refs/{suffix}");
            self.ref_writer.update_ref(&canonical, hash)?;
            self.ref_writer.delete_ref(&name)?;
            moved.push(canonical);
        }
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitio::InMemoryRepo;
    use crate::hash::{set_hash_kind_for_test, HashKind};
    use crate::internal::object::signature::{Signature, SignatureType};

    fn sig() -> Signature {
        Signature::new(SignatureType::Author, "a".to_owned(), "a@x.com".to_owned())
    }

    #[test]
    fn write_all_updates_every_produced_ref() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let repo = InMemoryRepo::new();
        let pass = RefWriterPass::new(&repo, &repo);
        let hash = repo.write_object(ObjectType::Commit, b"c").unwrap();
        let produced = vec![ProducedRef {
            refname: "refs/heads/main".to_owned(),
            target: hash,
            kind: RefKind::Branch,
        }];
        pass.write_all(&produced).unwrap();
        assert_eq!(repo.ref_target("refs/heads/main"), Some(hash));
    }

    #[test]
    fn prune_removes_refs_not_in_produced_set() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let repo = InMemoryRepo::new();
        let pass = RefWriterPass::new(&repo, &repo);
        let hash = repo.write_object(ObjectType::Commit, b"c").unwrap();
        repo.update_ref("refs/heads/stale", hash).unwrap();
        let produced = Vec::new();
        let deleted = pass.prune(&["refs/heads/".to_owned()], &produced).unwrap();
        assert_eq!(deleted, vec!["refs/heads/stale".to_owned()]);
        assert_eq!(repo.ref_target("refs/heads/stale"), None);
    }

    #[test]
    fn find_append_parent_locates_namespaced_ref() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let repo = InMemoryRepo::new();
        let pass = RefWriterPass::new(&repo, &repo);
        let hash = repo.write_object(ObjectType::Commit, b"c").unwrap();
        repo.update_ref("refs/old/heads/main", hash).unwrap();
        let found = pass.find_append_parent("old", "refs/heads/main").unwrap();
        assert_eq!(found, Some(hash));
    }

    #[test]
    fn reparent_commit_prepends_new_parent() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let repo = InMemoryRepo::new();
        let pass = RefWriterPass::new(&repo, &repo);
        let tree = ObjectHash::from_type_and_data(ObjectType::Tree, b"t");
        let old_parent = ObjectHash::from_type_and_data(ObjectType::Commit, b"old-parent");
        let commit = Commit::new(sig(), sig(), tree, vec![old_parent], "msg");
        let new_parent = ObjectHash::from_type_and_data(ObjectType::Commit, b"new-parent");
        let (reparented, _id) = pass.reparent_commit(&commit, new_parent).unwrap();
        assert_eq!(reparented.parent_commit_ids, vec![new_parent, old_parent]);
    }

    #[test]
    fn transfer_leftovers_moves_to_canonical_namespace() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let repo = InMemoryRepo::new();
        let pass = RefWriterPass::new(&repo, &repo);
        let hash = repo.write_object(ObjectType::Commit, b"c").unwrap();
        repo.update_ref("refs/staging/heads/feature", hash).unwrap();
        let moved = pass.transfer_leftovers("staging").unwrap();
        assert_eq!(moved, vec!["refs/heads/feature".to_owned()]);
        assert_eq!(repo.ref_target("refs/heads/feature"), Some(hash));
        assert_eq!(repo.ref_target("refs/staging/heads/feature"), None);
    }
}
