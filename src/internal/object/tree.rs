//! The `Tree` object represents one directory snapshot: an ordered list of entries, each
//! naming a file mode, a path component, and the object (`Blob` or nested `Tree`) it points
//! to. Trees are the structural backbone the content pipeline rebuilds on every revision
//! that touches a mapped branch's worktree.

use std::fmt::Display;
use std::str::FromStr;

use bincode::{Decode, Encode};
use bstr::ByteSlice;
use serde::{Deserialize, Serialize};

use crate::errors::GitError;
use crate::hash::ObjectHash;
use crate::internal::object::ObjectTrait;
use crate::internal::object::types::ObjectType;

/// Standard Git file modes. VSS has no concept of symlinks or submodules, so the content
/// pipeline only ever emits `Blob` and `Tree`, but the type round-trips all modes it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Decode, Encode)]
pub enum TreeEntryMode {
    Blob,
    BlobExecutable,
    Tree,
    Link,
    Commit,
}

impl TreeEntryMode {
    pub fn to_bytes(self) -> &'static [u8] {
        match self {
            TreeEntryMode::Blob => b"100644",
            TreeEntryMode::BlobExecutable => b"100755",
            TreeEntryMode::Tree => b"40000",
            TreeEntryMode::Link => b"120000",
            TreeEntryMode::Commit => b"160000",
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, GitError> {
        match data {
            b"100644" | b"644" => Ok(TreeEntryMode::Blob),
            b"100755" | b"755" => Ok(TreeEntryMode::BlobExecutable),
            b"40000" | b"040000" => Ok(TreeEntryMode::Tree),
            b"120000" => Ok(TreeEntryMode::Link),
            b"160000" => Ok(TreeEntryMode::Commit),
            _ => Err(GitError::InvalidTreeItem(format!(
                "unrecognized mode: {:?}",
                data.as_bstr()
            ))),
        }
    }
}

/// One entry in a [`Tree`]: the mode, the path component's name, and the hash of the object
/// it points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Decode, Encode)]
pub struct TreeEntry {
    pub mode: TreeEntryMode,
    pub name: String,
    pub id: ObjectHash,
}

#[derive(Eq, Debug, Clone, Serialize, Deserialize, Decode, Encode)]
pub struct Tree {
    pub id: ObjectHash,
    pub tree_items: Vec<TreeEntry>,
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for item in &self.tree_items {
            writeln!(
                f,
                "{:o} {} {}\t{}",
                match item.mode {
                    TreeEntryMode::Blob => 100644,
                    TreeEntryMode::BlobExecutable => 100755,
                    TreeEntryMode::Tree => 40000,
                    TreeEntryMode::Link => 120000,
                    TreeEntryMode::Commit => 160000,
                },
                if item.mode == TreeEntryMode::Tree {
                    "tree"
                } else {
                    "blob"
                },
                item.id,
                item.name
            )?;
        }
        Ok(())
    }
}

impl Tree {
    /// Builds a tree from entries already sorted the way the caller wants them serialized.
    /// Git requires entries sorted by name (directories as if suffixed with `/`); the path→ref
    /// mapper's worktree builder is responsible for handing entries to this constructor already
    /// in that order.
    pub fn from_entries(mut tree_items: Vec<TreeEntry>) -> Result<Tree, GitError> {
        if tree_items.is_empty() {
            return Err(GitError::EmptyTreeItems(
                "cannot build a tree with no entries".to_owned(),
            ));
        }
        tree_items.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        let mut tree = Tree {
            id: ObjectHash::default(),
            tree_items,
        };
        let hash = ObjectHash::from_type_and_data(ObjectType::Tree, &tree.to_data()?);
        tree.id = hash;
        Ok(tree)
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.tree_items.iter().find(|item| item.name == name)
    }
}

/// Git sorts tree entries as if directory names had a trailing `/`, so `"foo"` (a file) sorts
/// before `"foo.txt"` but after `"foo/"` would if `foo` were a directory containing more path.
fn sort_key(entry: &TreeEntry) -> Vec<u8> {
    let mut key = entry.name.clone().into_bytes();
    if entry.mode == TreeEntryMode::Tree {
        key.push(b'/');
    }
    key
}

impl ObjectTrait for Tree {
    fn from_bytes(data: &[u8], hash: ObjectHash) -> Result<Self, GitError>
    where
        Self: Sized,
    {
        let mut tree_items = Vec::new();
        let mut rest = data;
        while !rest.is_empty() {
            let space = rest
                .find_byte(b' ')
                .ok_or_else(|| GitError::InvalidTreeObject)?;
            let mode = TreeEntryMode::from_bytes(&rest[..space])?;
            let nul = rest
                .find_byte(0x00)
                .ok_or_else(|| GitError::InvalidTreeObject)?;
            let name = rest[space + 1..nul]
                .to_str()
                .map_err(|e| GitError::InvalidTreeItem(e.to_string()))?
                .to_owned();
            let hash_len = hash.kind().size();
            if rest.len() < nul + 1 + hash_len {
                return Err(GitError::InvalidTreeObject);
            }
            let id = ObjectHash::from_bytes(&rest[nul + 1..nul + 1 + hash_len])
                .map_err(GitError::InvalidHashValue)?;
            tree_items.push(TreeEntry { mode, name, id });
            rest = &rest[nul + 1 + hash_len..];
        }
        Ok(Tree {
            id: hash,
            tree_items,
        })
    }

    fn get_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn to_data(&self) -> Result<Vec<u8>, GitError> {
        let mut data = Vec::new();
        for item in &self.tree_items {
            data.extend(item.mode.to_bytes());
            data.push(b' ');
            data.extend(item.name.as_bytes());
            data.push(0x00);
            data.extend(item.id.as_ref());
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{HashKind, set_hash_kind_for_test};

    fn entry(mode: TreeEntryMode, name: &str) -> TreeEntry {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        TreeEntry {
            mode,
            name: name.to_owned(),
            id: ObjectHash::from_type_and_data(ObjectType::Blob, name.as_bytes()),
        }
    }

    #[test]
    fn sorts_entries_git_style() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let tree = Tree::from_entries(vec![
            entry(TreeEntryMode::Blob, "foo.txt"),
            entry(TreeEntryMode::Tree, "foo"),
        ])
        .unwrap();
        assert_eq!(tree.tree_items[0].name, "foo");
        assert_eq!(tree.tree_items[1].name, "foo.txt");
    }

    #[test]
    fn round_trips_through_bytes() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let tree = Tree::from_entries(vec![
            entry(TreeEntryMode::Blob, "a.txt"),
            entry(TreeEntryMode::Tree, "subdir"),
        ])
        .unwrap();
        let data = tree.to_data().unwrap();
        let parsed = Tree::from_bytes(&data, tree.id).unwrap();
        assert_eq!(parsed.tree_items, tree.tree_items);
    }

    #[test]
    fn rejects_empty_tree() {
        assert!(Tree::from_entries(Vec::new()).is_err());
    }

    #[test]
    fn get_looks_up_entry_by_name() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let tree = Tree::from_entries(vec![entry(TreeEntryMode::Blob, "a.txt")]).unwrap();
        assert!(tree.get("a.txt").is_some());
        assert!(tree.get("missing").is_none());
    }
}
