//! The per-ref branch state machine: lifecycle tracking,
//! pending worktree changes, and the commit descriptors a branch accumulates.

use std::collections::HashMap;

use crate::hash::ObjectHash;
use crate::internal::object::commit::Commit;

/// A branch's lifecycle. `Deleted` is terminal for a given
/// [`Branch`] record; re-creating the same ref later allocates a *new*
/// record (invariant on deleted-then-readded nodes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchState {
    Active,
    Deleted,
}

/// One commit produced on a branch ("Commit descriptor").
#[derive(Debug, Clone)]
pub struct CommitDescriptor {
    pub revision: u64,
    pub tree_id: ObjectHash,
    pub parents: Vec<ObjectHash>,
    pub commit_id: ObjectHash,
    pub message: String,
    pub labels: Vec<String>,
    /// The full object, kept only for freshly authored (non-fast-forwarded)
    /// commits, so a still-rootless first commit can be reparented in place
    /// by `--append-to-refs` without re-deriving its
    /// signatures. `None` for commits adopted verbatim from another branch's
    /// history via fast-forward.
    pub commit: Option<Commit>,
}

/// One Git ref's lifecycle and commit history ("Branch").
pub struct Branch {
    pub refname: String,
    pub vss_dir: String,
    pub state: BranchState,
    pub creation_revision: u64,
    pub deletion_revision: Option<u64>,
    pub parent_branch: Option<String>,
    pub fork_point: Option<ObjectHash>,
    pub head: Option<ObjectHash>,
    pub delete_if_merged: bool,
    pub commits: Vec<CommitDescriptor>,
    /// Carry-over message text from `<SkipCommit>`-elided revisions, prepended
    /// to the next retained commit.
    pub carry_over: String,
}

impl Branch {
    fn new(refname: String, vss_dir: String, rev: u64) -> Branch {
        Branch {
            refname,
            vss_dir,
            state: BranchState::Active,
            creation_revision: rev,
            deletion_revision: None,
            parent_branch: None,
            fork_point: None,
            head: None,
            delete_if_merged: false,
            commits: Vec::new(),
            carry_over: String::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == BranchState::Active
    }

    /// The ref a deleted-and-unmerged branch is tagged with instead of its
    /// normal name (concrete scenario 6).
    pub fn deleted_tag_ref(&self) -> String {
        let rev = self.deletion_revision.unwrap_or(self.creation_revision);
        format!("{}_deleted@r{}", self.refname, rev)
    }

    /// Records a new commit, enforcing the ascending-revision-number
    /// invariant.
    pub fn push_commit(&mut self, descriptor: CommitDescriptor) {
        debug_assert!(
            self.commits.last().map(|c| c.revision < descriptor.revision).unwrap_or(true),
            "commits on a branch must be emitted in ascending revision order"
        );
        self.head = Some(descriptor.commit_id);
        self.commits.push(descriptor);
        self.carry_over.clear();
    }
}

/// All branch records ever allocated, keyed by refname; each refname can have
/// more than one record if the directory was deleted and later re-created
/// (boundary case).
#[derive(Default)]
pub struct BranchTable {
    records: HashMap<String, Vec<Branch>>,
}

impl BranchTable {
    pub fn new() -> BranchTable {
        BranchTable::default()
    }

    /// Allocates a fresh, active branch record for `refname`, even if an
    /// earlier (now-`Deleted`) record with the same name exists.
    pub fn create(&mut self, refname: &str, vss_dir: &str, rev: u64) -> &mut Branch {
        let list = self.records.entry(refname.to_owned()).or_default();
        list.push(Branch::new(refname.to_owned(), vss_dir.to_owned(), rev));
        list.last_mut().unwrap()
    }

    /// The current (most-recently-created) record for `refname`, if any.
    pub fn current(&self, refname: &str) -> Option<&Branch> {
        self.records.get(refname).and_then(|list| list.last())
    }

    pub fn current_mut(&mut self, refname: &str) -> Option<&mut Branch> {
        self.records.get_mut(refname).and_then(|list| list.last_mut())
    }

    /// Whether `refname` currently names an active branch.
    pub fn is_active(&self, refname: &str) -> bool {
        self.current(refname).map(|b| b.is_active()).unwrap_or(false)
    }

    pub fn mark_deleted(&mut self, refname: &str, rev: u64) {
        if let Some(branch) = self.current_mut(refname) {
            branch.state = BranchState::Deleted;
            branch.deletion_revision = Some(rev);
        }
    }

    /// Every currently active branch record.
    pub fn active_branches(&self) -> impl Iterator<Item = &Branch> {
        self.records.values().filter_map(|list| list.last()).filter(|b| b.is_active())
    }

    /// All records ever created (active or deleted), for the final ref-write
    /// pass.
    pub fn all_records(&self) -> impl Iterator<Item = &Branch> {
        self.records.values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_recreate_yields_two_records() {
        let mut table = BranchTable::new();
        table.create("refs/heads/exp", "/branches/exp", 1);
        table.mark_deleted("refs/heads/exp", 5);
        assert!(!table.is_active("refs/heads/exp"));
        table.create("refs/heads/exp", "/branches/exp", 10);
        assert!(table.is_active("refs/heads/exp"));
        assert_eq!(table.all_records().count(), 2);
    }

    #[test]
    fn deleted_tag_ref_includes_deletion_revision() {
        let mut table = BranchTable::new();
        table.create("refs/heads/exp", "/branches/exp", 1);
        table.mark_deleted("refs/heads/exp", 20);
        let branch = table.current("refs/heads/exp").unwrap();
        assert_eq!(branch.deleted_tag_ref(), "refs/heads/exp_deleted@r20");
    }

    #[test]
    fn push_commit_updates_head() {
        let mut table = BranchTable::new();
        table.create("refs/heads/main", "/trunk", 1);
        let branch = table.current_mut("refs/heads/main").unwrap();
        let id = ObjectHash::from_type_and_data(
            crate::internal::object::ObjectType::Commit,
            b"fake",
        );
        branch.push_commit(CommitDescriptor {
            revision: 1,
            tree_id: id,
            parents: Vec::new(),
            commit_id: id,
            message: "init".to_owned(),
            labels: Vec::new(),
            commit: None,
        });
        assert_eq!(branch.head, Some(id));
    }
}
