//! The virtual `ProjectTree`: the VSS directory tree as of the
//! last applied revision. Owned exclusively by the single revision stream
//! consumer thread — never shared across threads.

use std::collections::BTreeMap;

use crate::revision::ContentId;

/// One node in the [`ProjectTree`]: a directory or a file. A node deleted
/// then re-added is a *new* node with the same path but a new
/// `creation_revision` (invariant).
#[derive(Debug, Clone)]
pub struct ProjectNode {
    pub path: String,
    pub creation_revision: u64,
    pub deletion_revision: Option<u64>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Dir { children: BTreeMap<String, ProjectNode> },
    File { content_id: ContentId },
}

impl ProjectNode {
    fn new_dir(path: String, rev: u64) -> ProjectNode {
        ProjectNode {
            path,
            creation_revision: rev,
            deletion_revision: None,
            kind: NodeKind::Dir { children: BTreeMap::new() },
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Dir { .. })
    }

    pub fn is_deleted(&self) -> bool {
        self.deletion_revision.is_some()
    }

    /// All file content-ids reachable under this node (itself, if a file; its
    /// descendants, if a directory). Used by the merge detector to compute a
    /// branch's worktree content multiset.
    pub fn file_content_ids(&self) -> Vec<(String, ContentId)> {
        let mut out = Vec::new();
        self.collect_file_content_ids(&mut out);
        out
    }

    fn collect_file_content_ids(&self, out: &mut Vec<(String, ContentId)>) {
        match &self.kind {
            NodeKind::File { content_id } => out.push((self.path.clone(), content_id.clone())),
            NodeKind::Dir { children } => {
                for child in children.values() {
                    if !child.is_deleted() {
                        child.collect_file_content_ids(out);
                    }
                }
            }
        }
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect()
}

/// The virtual directory tree, rooted at `/`. Reconstructs the union of
/// surviving additions minus deletions up to the last-applied revision
/// (invariant).
pub struct ProjectTree {
    root: ProjectNode,
}

impl ProjectTree {
    pub fn new() -> ProjectTree {
        ProjectTree { root: ProjectNode::new_dir("/".to_owned(), 0) }
    }

    pub fn get(&self, path: &str) -> Option<&ProjectNode> {
        let mut node = &self.root;
        for component in split_path(path) {
            match &node.kind {
                NodeKind::Dir { children } => node = children.get(component)?,
                NodeKind::File { .. } => return None,
            }
        }
        Some(node)
    }

    fn get_mut(&mut self, path: &str) -> Option<&mut ProjectNode> {
        let mut node = &mut self.root;
        for component in split_path(path) {
            match &mut node.kind {
                NodeKind::Dir { children } => node = children.get_mut(component)?,
                NodeKind::File { .. } => return None,
            }
        }
        Some(node)
    }

    fn parent_mut(&mut self, path: &str) -> Option<&mut BTreeMap<String, ProjectNode>> {
        let components = split_path(path);
        let Some((_, parents)) = components.split_last() else {
            return None;
        };
        let mut node = &mut self.root;
        for component in parents {
            match &mut node.kind {
                NodeKind::Dir { children } => node = children.get_mut(*component)?,
                NodeKind::File { .. } => return None,
            }
        }
        match &mut node.kind {
            NodeKind::Dir { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    fn basename(path: &str) -> String {
        split_path(path).last().map(|s| s.to_string()).unwrap_or_default()
    }

    /// Adds a directory node at `path`, creating a fresh record even if an
    /// older, now-deleted node shares the same path.
    pub fn add_dir(&mut self, path: &str, rev: u64) {
        let name = Self::basename(path);
        if let Some(children) = self.parent_mut(path) {
            children.insert(name, ProjectNode::new_dir(path.to_owned(), rev));
        }
    }

    pub fn delete_dir(&mut self, path: &str, rev: u64) {
        if let Some(node) = self.get_mut(path) {
            node.deletion_revision = Some(rev);
        }
    }

    pub fn add_file(&mut self, path: &str, content_id: ContentId, rev: u64) {
        let name = Self::basename(path);
        if let Some(children) = self.parent_mut(path) {
            children.insert(
                name,
                ProjectNode {
                    path: path.to_owned(),
                    creation_revision: rev,
                    deletion_revision: None,
                    kind: NodeKind::File { content_id },
                },
            );
        }
    }

    pub fn modify_file(&mut self, path: &str, content_id: ContentId) {
        if let Some(node) = self.get_mut(path) {
            if let NodeKind::File { content_id: existing } = &mut node.kind {
                *existing = content_id;
            }
        }
    }

    pub fn delete_file(&mut self, path: &str, rev: u64) {
        if let Some(node) = self.get_mut(path) {
            node.deletion_revision = Some(rev);
        }
    }

    /// Renames a node in place: removes it from its old parent and reinserts
    /// an identical node (content-id/children preserved) under the new path.
    pub fn rename(&mut self, old: &str, new: &str) {
        let old_name = Self::basename(old);
        let Some(mut node) = self.parent_mut(old).and_then(|c| c.remove(&old_name)) else {
            return;
        };
        node.path = new.to_owned();
        let new_name = Self::basename(new);
        if let Some(children) = self.parent_mut(new) {
            children.insert(new_name, node);
        }
    }

    /// Shares an existing file at a new destination path: a new node
    /// pointing at the same content-id (VSS's `ShareFile`).
    pub fn share_file(&mut self, source: &str, dest: &str, rev: u64) {
        let Some(content_id) = self.get(source).and_then(|n| match &n.kind {
            NodeKind::File { content_id } => Some(content_id.clone()),
            NodeKind::Dir { .. } => None,
        }) else {
            return;
        };
        self.add_file(dest, content_id, rev);
    }

    pub fn root(&self) -> &ProjectNode {
        &self.root
    }

    /// Every live (non-deleted) file path under `dir`, relative to the tree
    /// root, for glob-based `<DeletePath>` matching.
    pub fn all_file_paths(&self, dir: &str) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(node) = self.get(dir) {
            collect_file_paths(node, &mut out);
        }
        out
    }
}

fn collect_file_paths(node: &ProjectNode, out: &mut Vec<String>) {
    match &node.kind {
        NodeKind::File { .. } => out.push(node.path.clone()),
        NodeKind::Dir { children } => {
            for child in children.values() {
                if !child.is_deleted() {
                    collect_file_paths(child, out);
                }
            }
        }
    }
}

impl Default for ProjectTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get_file() {
        let mut tree = ProjectTree::new();
        tree.add_dir("/trunk", 1);
        tree.add_file("/trunk/a.txt", ContentId("c1".to_owned()), 1);
        let node = tree.get("/trunk/a.txt").unwrap();
        assert!(!node.is_dir());
    }

    #[test]
    fn delete_then_readd_is_a_new_node() {
        let mut tree = ProjectTree::new();
        tree.add_dir("/branches/x", 1);
        tree.delete_dir("/branches/x", 5);
        assert!(tree.get("/branches/x").unwrap().is_deleted());
        tree.add_dir("/branches/x", 10);
        let node = tree.get("/branches/x").unwrap();
        assert!(!node.is_deleted());
        assert_eq!(node.creation_revision, 10);
    }

    #[test]
    fn rename_preserves_content_id() {
        let mut tree = ProjectTree::new();
        tree.add_dir("/trunk", 1);
        tree.add_file("/trunk/old.txt", ContentId("c1".to_owned()), 1);
        tree.rename("/trunk/old.txt", "/trunk/new.txt");
        assert!(tree.get("/trunk/old.txt").is_none());
        assert!(tree.get("/trunk/new.txt").is_some());
    }

    #[test]
    fn file_content_ids_skips_deleted_descendants() {
        let mut tree = ProjectTree::new();
        tree.add_dir("/trunk", 1);
        tree.add_file("/trunk/a.txt", ContentId("c1".to_owned()), 1);
        tree.add_file("/trunk/b.txt", ContentId("c2".to_owned()), 1);
        tree.delete_file("/trunk/b.txt", 2);
        let ids = tree.get("/trunk").unwrap().file_content_ids();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].1, ContentId("c1".to_owned()));
    }

    #[test]
    fn all_file_paths_skips_deleted_entries() {
        let mut tree = ProjectTree::new();
        tree.add_dir("/trunk", 1);
        tree.add_file("/trunk/a.txt", ContentId("c1".to_owned()), 1);
        tree.add_file("/trunk/b.txt", ContentId("c2".to_owned()), 1);
        tree.delete_file("/trunk/b.txt", 2);
        assert_eq!(tree.all_file_paths("/trunk"), vec!["/trunk/a.txt".to_owned()]);
    }

    #[test]
    fn share_file_points_at_same_content_id() {
        let mut tree = ProjectTree::new();
        tree.add_dir("/trunk", 1);
        tree.add_file("/trunk/a.txt", ContentId("c1".to_owned()), 1);
        tree.add_dir("/branches", 1);
        tree.share_file("/trunk/a.txt", "/branches/a.txt", 2);
        let shared = tree.get("/branches/a.txt").unwrap();
        match &shared.kind {
            NodeKind::File { content_id } => assert_eq!(content_id, &ContentId("c1".to_owned())),
            _ => panic!("expected file"),
        }
    }
}
