//! The merge/branch detector: picks a fork-point parent for a
//! newly created branch by file-identity overlap, and recognizes
//! fast-forward opportunities between active branches.

use crate::hash::ObjectHash;
use crate::revision::ContentId;

/// The overlap ratio a candidate parent must clear for automatic detection
/// to adopt it (open question — resolved in DESIGN.md as
/// "at least 50% of the new directory's files by count, and at least one
/// shared file").
pub const OVERLAP_THRESHOLD: f64 = 0.5;

/// One active branch's current worktree content, as seen by the detector.
pub struct ParentCandidate<'a> {
    pub refname: &'a str,
    pub head: ObjectHash,
    /// Revision number of the branch's most recent commit, used to break
    /// ties by recency.
    pub last_revision: u64,
    pub files: &'a [(String, ContentId)],
}

/// Finds the best fork-point parent for a new directory's file set among
/// `candidates`, or `None` if the new branch should be rootless. Ties are
/// broken by most-recent head commit, then lexicographic ref name.
pub fn find_parent<'a>(
    new_files: &[(String, ContentId)],
    candidates: &[ParentCandidate<'a>],
) -> Option<ObjectHash> {
    if new_files.is_empty() {
        return None;
    }
    let mut best: Option<(&ParentCandidate, usize)> = None;
    for candidate in candidates {
        let shared = count_overlap(new_files, candidate.files);
        if shared == 0 {
            continue;
        }
        let ratio = shared as f64 / new_files.len() as f64;
        if ratio < OVERLAP_THRESHOLD {
            continue;
        }
        match best {
            None => best = Some((candidate, shared)),
            Some((current, current_shared)) => {
                if shared > current_shared || (shared == current_shared && ranks_higher(candidate, current)) {
                    best = Some((candidate, shared));
                }
            }
        }
    }
    best.map(|(candidate, _)| candidate.head)
}

fn ranks_higher(a: &ParentCandidate, b: &ParentCandidate) -> bool {
    if a.last_revision != b.last_revision {
        return a.last_revision > b.last_revision;
    }
    a.refname < b.refname
}

/// Counts how many of `new_files`' content-ids also appear in `existing`,
/// treating both sides as multisets (a content-id shared by two files in the
/// same directory counts twice, matched independently).
fn count_overlap(new_files: &[(String, ContentId)], existing: &[(String, ContentId)]) -> usize {
    let mut remaining: Vec<&ContentId> = existing.iter().map(|(_, id)| id).collect();
    let mut shared = 0usize;
    for (_, id) in new_files {
        if let Some(pos) = remaining.iter().position(|existing_id| *existing_id == id) {
            remaining.remove(pos);
            shared += 1;
        }
    }
    shared
}

/// Whether a branch's next commit should fast-forward another active
/// branch's ref instead of producing a new commit: their trees are identical
///.
pub fn is_fast_forward(next_tree: &ObjectHash, other_head_tree: &ObjectHash) -> bool {
    next_tree == other_head_tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{HashKind, set_hash_kind_for_test};
    use crate::internal::object::ObjectType;

    fn id(s: &str) -> ContentId {
        ContentId(s.to_owned())
    }

    fn commit_hash(bytes: &[u8]) -> ObjectHash {
        ObjectHash::from_type_and_data(ObjectType::Commit, bytes)
    }

    #[test]
    fn full_overlap_picks_that_branch() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let new_files = vec![("a.txt".to_owned(), id("c1"))];
        let main_head = commit_hash(b"main");
        let candidates = vec![ParentCandidate {
            refname: "refs/heads/main",
            head: main_head,
            last_revision: 1,
            files: &[("a.txt".to_owned(), id("c1"))],
        }];
        assert_eq!(find_parent(&new_files, &candidates), Some(main_head));
    }

    #[test]
    fn below_threshold_is_rootless() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let new_files = vec![
            ("a.txt".to_owned(), id("c1")),
            ("b.txt".to_owned(), id("c2")),
            ("c.txt".to_owned(), id("c3")),
        ];
        let candidates = vec![ParentCandidate {
            refname: "refs/heads/main",
            head: commit_hash(b"main"),
            last_revision: 1,
            files: &[("a.txt".to_owned(), id("c1"))],
        }];
        assert_eq!(find_parent(&new_files, &candidates), None);
    }

    #[test]
    fn ties_break_by_most_recent_head_then_refname() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let new_files = vec![("a.txt".to_owned(), id("c1"))];
        let older = commit_hash(b"older");
        let newer = commit_hash(b"newer");
        let candidates = vec![
            ParentCandidate {
                refname: "refs/heads/a",
                head: older,
                last_revision: 5,
                files: &[("a.txt".to_owned(), id("c1"))],
            },
            ParentCandidate {
                refname: "refs/heads/b",
                head: newer,
                last_revision: 10,
                files: &[("a.txt".to_owned(), id("c1"))],
            },
        ];
        assert_eq!(find_parent(&new_files, &candidates), Some(newer));
    }

    #[test]
    fn identical_trees_fast_forward() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let tree = ObjectHash::from_type_and_data(ObjectType::Tree, b"same");
        assert!(is_fast_forward(&tree, &tree));
    }
}
