//! The top-level orchestrator: wires the path→ref mapper, the
//! virtual project tree, the branch state machine, the merge detector, the
//! content pipeline, and the ref writer into one revision-stream consumer.
//!
//! Scheduling follows a single producer, multi-worker model: this type is
//! the single producer, owns [`ProjectTree`] and [`BranchTable`]
//! exclusively, and never shares them across threads. The content pipeline's
//! own worker pool provides the bounded parallelism for hashing; branches
//! that could commit in parallel are processed sequentially here, which is a
//! deliberate simplification recorded in `DESIGN.md`.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use sha1::{Digest, Sha1};

use crate::authors::AuthorsMap;
use crate::branch::{BranchState, BranchTable, CommitDescriptor};
use crate::config::ConfigModel;
use crate::content::{format::FormattingSpec, BlobKey, ContentPipeline};
use crate::context::{DecorateCommitMessage, RunContext};
use crate::diagnostics::Diagnostics;
use crate::errors::GitError;
use crate::gitio::{ObjectWriter, RefWriter};
use crate::hash::ObjectHash;
use crate::internal::object::commit::Commit;
use crate::internal::object::signature::{Signature, SignatureType};
use crate::internal::object::tag::Tag;
use crate::internal::object::tree::{Tree, TreeEntry, TreeEntryMode};
use crate::internal::object::ObjectType;
use crate::mapper::{MapOutcome, Mapper, RefClaims};
use crate::merge::{self, ParentCandidate};
use crate::refs::{ProducedRef, RefKind, RefWriterPass};
use crate::revision::{ChangeOp, ContentId, Revision, VssSource};
use crate::tree::{NodeKind, ProjectNode, ProjectTree};

/// What the engine accomplished, for `main` to report and for
/// `--make-authors-map` to act on.
pub struct EngineSummary {
    pub commits_written: usize,
    pub tags_written: usize,
    pub refs_pruned: usize,
    pub distinct_authors: BTreeSet<String>,
}

pub struct Engine<'a> {
    config: &'a ConfigModel,
    ctx: &'a RunContext,
    authors: &'a AuthorsMap,
    mapper: Mapper<'a>,
    claims: RefClaims,
    diagnostics: Diagnostics,
    content: ContentPipeline,
    object_writer: Arc<dyn ObjectWriter>,
    tree: ProjectTree,
    branches: BranchTable,
    /// VSS directory path (with leading `/`) → the ref name the mapper
    /// assigned it, populated as `AddDir` operations are observed.
    dir_branch: HashMap<String, String>,
    /// Explicit fork-point overrides from `<CopyPath>`/`<MergePath>`, keyed by
    /// destination VSS directory (leading `/`, same form as `Branch::vss_dir`).
    explicit_parents: HashMap<String, ObjectHash>,
    /// Bytes for files introduced by `<InjectFile>`/`<AddFile>` rather than
    /// fetched from the revision source, keyed by the synthetic content id
    /// `intern_literal` mints for them.
    literal_content: HashMap<ContentId, Vec<u8>>,
    /// Refnames of branches whose head was adopted by another branch via
    /// fast-forward ("merged branch"); consulted at
    /// [`Self::finish`] to suppress `DeleteIfMerged="Yes"` refs.
    merged_away: HashSet<String>,
    produced: Vec<ProducedRef>,
    seen_authors: BTreeSet<String>,
}

impl<'a> Engine<'a> {
    pub fn new(
        config: &'a ConfigModel,
        ctx: &'a RunContext,
        authors: &'a AuthorsMap,
        object_writer: Arc<dyn ObjectWriter>,
        content_workers: usize,
        sha1_map: Option<crate::sha1map::Sha1Map>,
    ) -> Engine<'a> {
        let hasher = Arc::new(crate::content::WriterHasher::new(Arc::clone(&object_writer)));
        Engine {
            config,
            ctx,
            authors,
            mapper: Mapper::new(config, ctx),
            claims: RefClaims::new(),
            diagnostics: Diagnostics::new(),
            content: ContentPipeline::with_hasher(content_workers, sha1_map, hasher),
            object_writer,
            tree: ProjectTree::new(),
            branches: BranchTable::new(),
            dir_branch: HashMap::new(),
            explicit_parents: HashMap::new(),
            literal_content: HashMap::new(),
            merged_away: HashSet::new(),
            produced: Vec::new(),
            seen_authors: BTreeSet::new(),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Consumes every revision `source` yields, in order, up to
    /// `--end-revision` if set.
    pub fn run(&mut self, source: &mut dyn VssSource) -> Result<EngineSummary, GitError> {
        while let Some(revision) = source.next_revision()? {
            if let Some(end) = self.ctx.end_revision {
                if revision.number > end {
                    break;
                }
            }
            self.apply_revision(&revision, source)?;
        }
        Ok(EngineSummary {
            commits_written: self.branches.all_records().map(|b| b.commits.len()).sum(),
            tags_written: self.produced.iter().filter(|r| r.kind == RefKind::Tag).count(),
            refs_pruned: 0,
            distinct_authors: self.seen_authors.clone(),
        })
    }

    /// Writes every produced ref, applies `--append-to-refs` reparenting and
    /// namespace transfer, and prunes stale refs. Consumes
    /// `self` because nothing more can be committed after ref writing.
    pub fn finish(mut self, ref_writer: &dyn RefWriter) -> Result<EngineSummary, GitError> {
        if let Some(ns) = self.ctx.append_to_refs.clone() {
            let refnames: Vec<String> = self.branches.all_records().map(|b| b.refname.clone()).collect();
            for refname in refnames {
                if self.merged_away.contains(&refname) {
                    continue;
                }
                let pass = RefWriterPass::new(self.object_writer.as_ref(), ref_writer);
                if let Some(parent) = pass.find_append_parent(&ns, &refname)? {
                    self.reparent_branch_onto(&refname, parent)?;
                }
            }
        }

        // A deleted-and-unmerged branch's head is tagged with `_deleted@r<n>`
        // instead of its normal name; a branch whose content was folded into
        // another via fast-forward and is
        // configured `DeleteIfMerged="Yes"` loses its ref entirely.
        self.produced.retain(|entry| entry.kind != RefKind::Branch || !self.merged_away.contains(&entry.refname));
        for branch in self.branches.all_records() {
            if branch.state != BranchState::Deleted || self.merged_away.contains(&branch.refname) {
                continue;
            }
            // Skip records superseded by a later re-creation of the same ref
            // ("deleted then re-added is a new node" boundary
            // case); the current record owns the live ref name.
            if !matches!(self.branches.current(&branch.refname).map(|b| b.state), Some(BranchState::Deleted)) {
                continue;
            }
            let tag_ref = branch.deleted_tag_ref();
            for entry in &mut self.produced {
                if entry.kind == RefKind::Branch && entry.refname == branch.refname {
                    entry.refname = tag_ref.clone();
                }
            }
        }

        let pass = RefWriterPass::new(self.object_writer.as_ref(), ref_writer);
        pass.write_all(&self.produced)?;

        let mut pruned = 0usize;
        if !self.ctx.prune_refs.is_empty() {
            pruned += pass.prune(&self.ctx.prune_refs, &self.produced)?.len();
        }

        if let Some(ns) = &self.ctx.append_to_refs {
            pass.transfer_leftovers(ns)?;
        }

        // Persisted atomically (write-to-temp, rename) only on clean
        // shutdown; a crash mid-run leaves no sha1-map update,
        // which is safe since the cache is purely an optimization.
        self.content.persist_sha1_map()?;
        self.diagnostics.flush();

        Ok(EngineSummary {
            commits_written: self.branches.all_records().map(|b| b.commits.len()).sum(),
            tags_written: self.produced.iter().filter(|r| r.kind == RefKind::Tag).count(),
            refs_pruned: pruned,
            distinct_authors: self.seen_authors,
        })
    }

    /// Reparents `refname`'s rootless first commit onto `new_parent` and
    /// rewrites every descendant commit authored by this run that still
    /// chains through the old id. Commits adopted
    /// verbatim from another branch via fast-forward (`commit: None`) are
    /// left alone: the chain rewrite stops there since they are not this
    /// branch's own history to rewrite.
    fn reparent_branch_onto(&mut self, refname: &str, new_parent: ObjectHash) -> Result<(), GitError> {
        let Some(branch) = self.branches.current_mut(refname) else { return Ok(()) };
        let Some(first) = branch.commits.first() else { return Ok(()) };
        if !first.parents.is_empty() {
            return Ok(()); // already has a parent; not the rootless case this step targets
        }
        let Some(root_commit) = first.commit.clone() else { return Ok(()) };

        let mut old_id = first.commit_id;
        let reparented = Commit::new(
            root_commit.author.clone(),
            root_commit.committer.clone(),
            root_commit.tree_id,
            vec![new_parent],
            &root_commit.message,
        );
        let mut new_id = self.object_writer.write_object(ObjectType::Commit, &reparented.to_data()?)?;
        branch.commits[0].parents = vec![new_parent];
        branch.commits[0].commit_id = new_id;
        branch.commits[0].commit = Some(reparented);

        let mut rewritten = vec![(old_id, new_id)];
        for descriptor in branch.commits.iter_mut().skip(1) {
            if !descriptor.parents.iter().any(|p| *p == old_id) {
                break;
            }
            let Some(commit) = descriptor.commit.clone() else { break };
            let new_parents: Vec<ObjectHash> =
                descriptor.parents.iter().map(|p| if *p == old_id { new_id } else { *p }).collect();
            let rebuilt = Commit::new(commit.author, commit.committer, commit.tree_id, new_parents.clone(), &commit.message);
            let rebuilt_id = self.object_writer.write_object(ObjectType::Commit, &rebuilt.to_data()?)?;
            old_id = descriptor.commit_id;
            new_id = rebuilt_id;
            descriptor.parents = new_parents;
            descriptor.commit_id = rebuilt_id;
            descriptor.commit = Some(rebuilt);
            rewritten.push((old_id, new_id));
        }

        for entry in &mut self.produced {
            if entry.refname != refname {
                continue;
            }
            if let Some((_, replacement)) = rewritten.iter().rev().find(|(old, _)| *old == entry.target) {
                entry.target = *replacement;
            }
        }
        Ok(())
    }

    fn apply_revision(&mut self, revision: &Revision, source: &dyn VssSource) -> Result<(), GitError> {
        self.seen_authors.insert(revision.author.clone());

        let mut touched: HashMap<String, Vec<ChangeOp>> = HashMap::new();
        let mut pending_labels: HashMap<String, Vec<String>> = HashMap::new();

        for refname in self.apply_revision_rules(revision)? {
            touched.entry(refname).or_default();
        }

        for op in &revision.operations {
            self.apply_op_to_tree(op, revision.number);

            match op {
                ChangeOp::AddDir { path } => {
                    self.maybe_register_branch(path, revision.number)?;
                    continue;
                }
                ChangeOp::DeleteDir { path } => {
                    if let Some(refname) = self.dir_branch.get(path).cloned() {
                        self.branches.mark_deleted(&refname, revision.number);
                    }
                    continue;
                }
                ChangeOp::LabelPath { path, label } => {
                    match self.owning_branch(path) {
                        Some(refname) => pending_labels.entry(refname).or_default().push(label.clone()),
                        None => self.diagnostics.mapping(format!("label on unmapped path {path}")),
                    }
                    continue;
                }
                _ => {}
            }

            match self.owning_branch(op.primary_path()) {
                Some(refname) => touched.entry(refname).or_default().push(op.clone()),
                None => self.diagnostics.mapping(format!("unmapped path: {}", op.primary_path())),
            }
        }

        for (refname, ops) in touched {
            let labels = pending_labels.remove(&refname).unwrap_or_default();
            self.commit_branch(&refname, revision, &ops, labels, source)?;
        }
        for (refname, labels) in pending_labels {
            self.tag_branch_head(&refname, &labels, revision)?;
        }

        Ok(())
    }

    fn apply_op_to_tree(&mut self, op: &ChangeOp, rev: u64) {
        match op {
            ChangeOp::AddFile { path, content_id } => self.tree.add_file(path, content_id.clone(), rev),
            ChangeOp::ModifyFile { path, content_id } => self.tree.modify_file(path, content_id.clone()),
            ChangeOp::DeleteFile { path } => self.tree.delete_file(path, rev),
            ChangeOp::RenameFile { old, new } => self.tree.rename(old, new),
            ChangeOp::AddDir { path } => self.tree.add_dir(path, rev),
            ChangeOp::DeleteDir { path } => self.tree.delete_dir(path, rev),
            ChangeOp::ShareFile { source, dest } => self.tree.share_file(source, dest, rev),
            ChangeOp::LabelPath { .. } => {}
        }
    }

    fn maybe_register_branch(&mut self, path: &str, rev: u64) -> Result<(), GitError> {
        let trimmed = path.trim_start_matches('/');
        if !self.ctx.path_filter.is_empty() && !self.ctx.path_filter.allows(trimmed) {
            return Ok(());
        }
        match self.mapper.map(trimmed, &mut self.claims)? {
            MapOutcome::Mapped { refname } => {
                self.branches.create(&refname, path, rev);
                self.dir_branch.insert(path.to_owned(), refname);
                self.apply_inject_files(path, trimmed, rev)?;
            }
            MapOutcome::Blocked | MapOutcome::Unmapped => {}
        }
        Ok(())
    }

    /// Adds every `<InjectFile>` rule active for a newly registered
    /// directory's project scope into the tree at its creation revision, so
    /// the file is present in this branch's first and every later commit
    /// unless later deleted/overwritten by VSS operations.
    fn apply_inject_files(&mut self, vss_dir: &str, trimmed_dir: &str, rev: u64) -> Result<(), GitError> {
        let rules: Vec<(String, String)> = self
            .config
            .inject_file_rules(trimmed_dir, self.ctx)
            .into_iter()
            .map(|r| (r.path.clone(), r.source.clone()))
            .collect();
        for (path, source) in rules {
            let content_id = self.intern_literal(&source)?;
            let full_path = format!("{}/{}", vss_dir.trim_end_matches('/'), path.trim_start_matches('/'));
            self.tree.add_file(&full_path, content_id, rev);
        }
        Ok(())
    }

    /// Applies `<DeletePath>`/`<AddFile>` rules whose `Rev` matches `revision`
    /// against every currently registered directory, and resolves
    /// `<CopyPath>`/`<MergePath>` overrides for this revision into
    /// `explicit_parents`. Returns the refnames whose tree changed so they're
    /// included in this revision's commit pass even without a matching VSS
    /// operation.
    fn apply_revision_rules(&mut self, revision: &Revision) -> Result<Vec<String>, GitError> {
        let mut touched = Vec::new();
        let dirs: Vec<(String, String)> = self.dir_branch.iter().map(|(d, r)| (d.clone(), r.clone())).collect();

        for (vss_dir, refname) in &dirs {
            let trimmed_dir = vss_dir.trim_start_matches('/');

            let matching: Vec<String> = self
                .config
                .delete_path_rules(trimmed_dir, self.ctx)
                .into_iter()
                .filter(|r| r.rev == Some(revision.number))
                .flat_map(|r| {
                    self.tree
                        .all_file_paths(vss_dir)
                        .into_iter()
                        .filter(|p| {
                            let rel = p.trim_start_matches(vss_dir.as_str()).trim_start_matches('/');
                            r.path_pattern.is_match(rel)
                        })
                        .collect::<Vec<_>>()
                })
                .collect();
            for path in matching {
                self.tree.delete_file(&path, revision.number);
                touched.push(refname.clone());
            }

            let add_files: Vec<(String, String)> = self
                .config
                .add_file_rules(trimmed_dir, self.ctx)
                .into_iter()
                .filter(|r| r.rev == Some(revision.number))
                .map(|r| (r.path.clone(), r.source.clone()))
                .collect();
            for (path, source) in add_files {
                let content_id = self.intern_literal(&source)?;
                let full_path = format!("{}/{}", vss_dir.trim_end_matches('/'), path.trim_start_matches('/'));
                self.tree.add_file(&full_path, content_id, revision.number);
                touched.push(refname.clone());
            }
        }

        let copy_moves: Vec<(String, String)> = self
            .config
            .all_copy_path_rules()
            .filter(|r| r.rev == Some(revision.number))
            .map(|r| (r.source.clone(), r.dest.clone()))
            .collect();
        let merge_moves: Vec<(String, String)> = self
            .config
            .all_merge_path_rules()
            .filter(|r| r.rev == Some(revision.number))
            .map(|r| (r.source.clone(), r.dest.clone()))
            .collect();
        for (source, dest) in copy_moves.into_iter().chain(merge_moves) {
            self.apply_explicit_parent(&source, &dest);
        }

        touched.sort();
        touched.dedup();
        Ok(touched)
    }

    /// Resolves `source`'s owning branch's current head and records it as
    /// `dest`'s explicit fork-point override, consulted by
    /// [`Self::find_fork_point`] ahead of overlap-based detection.
    fn apply_explicit_parent(&mut self, source: &str, dest: &str) {
        let source_dir = format!("/{}", source.trim_start_matches('/'));
        let dest_dir = format!("/{}", dest.trim_start_matches('/'));
        let Some(source_refname) = self.dir_branch.get(&source_dir).cloned() else { return };
        let Some(head) = self.branches.current(&source_refname).and_then(|b| b.head) else { return };
        self.explicit_parents.insert(dest_dir, head);
    }

    /// Reads `source` from disk and mints a stable synthetic content id for
    /// it, caching the bytes so [`Self::resolve_blob`] can serve them without
    /// going through the revision source.
    fn intern_literal(&mut self, source: &str) -> Result<ContentId, GitError> {
        let id = ContentId(format!("literal:{source}"));
        if !self.literal_content.contains_key(&id) {
            let bytes = std::fs::read(source)?;
            self.literal_content.insert(id.clone(), bytes);
        }
        Ok(id)
    }

    /// Finds the nearest registered ancestor directory of `path`: the mapper
    /// decides per-directory, and files inherit their nearest mapped ancestor.
    fn owning_branch(&self, path: &str) -> Option<String> {
        let mut current = path.trim_end_matches('/');
        loop {
            if let Some(refname) = self.dir_branch.get(current) {
                return Some(refname.clone());
            }
            match current.rfind('/') {
                None | Some(0) => return None,
                Some(idx) => current = &current[..idx],
            }
        }
    }

    fn should_skip_commit(&self, vss_dir: &str, revision: &Revision) -> bool {
        if revision.is_label() {
            return false; // boundary case: SkipCommit on a labeled revision is ignored.
        }
        self.config.skip_commit_rules(vss_dir, self.ctx).iter().any(|rule| {
            rule.revs.as_ref().is_some_and(|set| set.contains(revision.number))
                || rule.rev_id.as_deref().is_some_and(|id| revision.symbolic_id.as_deref() == Some(id))
        })
    }

    fn commit_branch(
        &mut self,
        refname: &str,
        revision: &Revision,
        ops: &[ChangeOp],
        labels: Vec<String>,
        source: &dyn VssSource,
    ) -> Result<(), GitError> {
        let (vss_dir, carry_over, prior_head) = {
            let branch = self.branches.current(refname).expect("branch registered before commit");
            (branch.vss_dir.clone(), branch.carry_over.clone(), branch.head)
        };
        let trimmed_dir = vss_dir.trim_start_matches('/');

        if self.should_skip_commit(trimmed_dir, revision) {
            if let Some(branch) = self.branches.current_mut(refname) {
                branch.carry_over = if branch.carry_over.is_empty() {
                    revision.message.clone()
                } else {
                    format!("{}\n{}", branch.carry_over, revision.message)
                };
            }
            self.diagnostics
                .mapping(format!("SkipCommit matched r{} on {refname}: commit elided", revision.number));
            return Ok(());
        }

        let Some(node) = self.tree.get(&vss_dir) else { return Ok(()) };
        let Some(tree_hash) = self.build_tree(node, trimmed_dir, "", source)? else {
            self.diagnostics
                .mapping(format!("{refname}: empty tree at r{}, commit skipped", revision.number));
            return Ok(());
        };

        if let Some((ff_commit, ff_tree)) = self.find_fast_forward(refname, &tree_hash) {
            if let Some(branch) = self.branches.current_mut(refname) {
                branch.push_commit(CommitDescriptor {
                    revision: revision.number,
                    tree_id: ff_tree,
                    parents: Vec::new(),
                    commit_id: ff_commit,
                    message: String::new(),
                    labels: labels.clone(),
                    commit: None,
                });
            }
            self.produced.push(ProducedRef { refname: refname.to_owned(), target: ff_commit, kind: RefKind::Branch });
            if self.mapper.delete_if_merged(trimmed_dir) {
                self.merged_away.insert(refname.to_owned());
            }
            for label in &labels {
                self.tag_commit(refname, ff_commit, label, revision)?;
            }
            return Ok(());
        }

        let parents = match prior_head {
            Some(head) => vec![head],
            None => self.find_fork_point(refname, &vss_dir),
        };

        let message = self.assemble_message(&revision.message, trimmed_dir, ops, &carry_over, revision, &parents);
        let (name, email) = self.authors.resolve(&revision.author);
        let mut author = Signature::new(SignatureType::Author, name.clone(), email.clone());
        author.timestamp = revision.timestamp;
        let mut committer = Signature::new(SignatureType::Committer, name, email);
        committer.timestamp = revision.timestamp;

        let commit = Commit::new(author, committer, tree_hash, parents.clone(), &message);
        let commit_id = self.object_writer.write_object(ObjectType::Commit, &commit.to_data()?)?;

        if let Some(branch) = self.branches.current_mut(refname) {
            branch.push_commit(CommitDescriptor {
                revision: revision.number,
                tree_id: tree_hash,
                parents,
                commit_id,
                message,
                labels: labels.clone(),
                commit: Some(commit),
            });
        }

        self.produced.push(ProducedRef { refname: refname.to_owned(), target: commit_id, kind: RefKind::Branch });

        if self.ctx.create_revision_refs {
            let slug = refname.trim_start_matches("refs/").replace('/', "-");
            self.produced.push(ProducedRef {
                refname: format!("refs/revisions/{}/{}", revision.number, slug),
                target: commit_id,
                kind: RefKind::Revision,
            });
        }

        for label in &labels {
            self.tag_commit(refname, commit_id, label, revision)?;
        }

        Ok(())
    }

    /// Parent-finding for a brand-new branch: content-id
    /// overlap against every other active branch's current head.
    fn find_fork_point(&self, refname: &str, vss_dir: &str) -> Vec<ObjectHash> {
        if let Some(parent) = self.explicit_parents.get(vss_dir) {
            return vec![*parent];
        }

        let new_files = self.tree.get(vss_dir).map(|n| n.file_content_ids()).unwrap_or_default();

        let mut candidate_data: Vec<(String, ObjectHash, u64, Vec<(String, ContentId)>)> = Vec::new();
        for branch in self.branches.active_branches() {
            if branch.refname == refname {
                continue;
            }
            let Some(head) = branch.head else { continue };
            let files = self.tree.get(&branch.vss_dir).map(|n| n.file_content_ids()).unwrap_or_default();
            let last_revision = branch.commits.last().map(|c| c.revision).unwrap_or(branch.creation_revision);
            candidate_data.push((branch.refname.clone(), head, last_revision, files));
        }
        let candidates: Vec<ParentCandidate> = candidate_data
            .iter()
            .map(|(name, head, last_revision, files)| ParentCandidate {
                refname: name,
                head: *head,
                last_revision: *last_revision,
                files,
            })
            .collect();

        merge::find_parent(&new_files, &candidates).into_iter().collect()
    }

    /// Whether `tree_hash` matches another active branch's current head tree
    /// (fast-forward case).
    fn find_fast_forward(&self, refname: &str, tree_hash: &ObjectHash) -> Option<(ObjectHash, ObjectHash)> {
        for branch in self.branches.active_branches() {
            if branch.refname == refname {
                continue;
            }
            if let Some(last) = branch.commits.last() {
                if merge::is_fast_forward(tree_hash, &last.tree_id) {
                    return Some((last.commit_id, last.tree_id));
                }
            }
        }
        None
    }

    /// Recursively composes a [`Tree`] object for `node` (a directory),
    /// resolving file content through the content pipeline.
    /// Returns `None` for a directory with no surviving entries and no
    /// configured placeholder.
    fn build_tree(
        &self,
        node: &ProjectNode,
        vss_dir: &str,
        rel_prefix: &str,
        source: &dyn VssSource,
    ) -> Result<Option<ObjectHash>, GitError> {
        let NodeKind::Dir { children } = &node.kind else { return Ok(None) };
        let mut entries = Vec::new();
        for (name, child) in children {
            if child.is_deleted() {
                continue;
            }
            let rel_path = if rel_prefix.is_empty() { name.clone() } else { format!("{rel_prefix}/{name}") };
            match &child.kind {
                NodeKind::Dir { .. } => {
                    if let Some(hash) = self.build_tree(child, vss_dir, &rel_path, source)? {
                        entries.push(TreeEntry { mode: TreeEntryMode::Tree, name: name.clone(), id: hash });
                    }
                }
                NodeKind::File { content_id } => {
                    if self.is_ignored(vss_dir, &rel_path) {
                        continue;
                    }
                    let hash = self.resolve_blob(vss_dir, content_id, &rel_path, source)?;
                    let mode = if self.is_executable(vss_dir, &rel_path) {
                        TreeEntryMode::BlobExecutable
                    } else {
                        TreeEntryMode::Blob
                    };
                    entries.push(TreeEntry { mode, name: name.clone(), id: hash });
                }
            }
        }

        if entries.is_empty() {
            match self.empty_dir_placeholder(vss_dir) {
                Some(placeholder) => {
                    let id = self.object_writer.write_object(ObjectType::Blob, b"")?;
                    entries.push(TreeEntry { mode: TreeEntryMode::Blob, name: placeholder, id });
                }
                None => return Ok(None),
            }
        }

        let tree = Tree::from_entries(entries)?;
        let id = self.object_writer.write_object(ObjectType::Tree, &tree.to_data()?)?;
        Ok(Some(id))
    }

    fn is_ignored(&self, vss_dir: &str, rel_path: &str) -> bool {
        self.config.ignore_files_rules(vss_dir, self.ctx).iter().any(|r| r.pattern.is_match(rel_path))
    }

    fn is_executable(&self, vss_dir: &str, rel_path: &str) -> bool {
        crate::content::resolve_mode(self.config, self.ctx, vss_dir, rel_path) == crate::content::EXECUTABLE_MODE
    }

    fn empty_dir_placeholder(&self, vss_dir: &str) -> Option<String> {
        self.config
            .active_projects(vss_dir, self.ctx)
            .into_iter()
            .find_map(|p| p.empty_dir_placeholder.clone())
    }

    /// Resolves the formatting spec for `rel_path` (same active-project chain
    /// as [`Self::is_executable`]) and feeds bytes through the content
    /// pipeline.
    fn resolve_blob(
        &self,
        vss_dir: &str,
        content_id: &ContentId,
        rel_path: &str,
        source: &dyn VssSource,
    ) -> Result<ObjectHash, GitError> {
        let spec: FormattingSpec = crate::content::resolve_formatting_spec(self.config, self.ctx, vss_dir, rel_path);
        let key = BlobKey {
            content_id: content_id.clone(),
            format_spec_hash: spec.spec_hash(),
            worktree_path: rel_path.to_owned(),
            gitattributes_hash: String::new(),
        };
        let raw = match self.literal_content.get(content_id) {
            Some(bytes) => bytes.clone(),
            None => source.fetch(content_id)?,
        };
        self.content.resolve(key, &raw, &spec, &self.diagnostics)
    }

    fn tag_commit(&mut self, refname: &str, commit_id: ObjectHash, label: &str, revision: &Revision) -> Result<(), GitError> {
        let vss_dir = self.branches.current(refname).map(|b| b.vss_dir.clone()).unwrap_or_default();
        let trimmed_dir = vss_dir.trim_start_matches('/');
        let tag_ref = self.mapper.format_label_ref(trimmed_dir, label)?;
        let (name, email) = self.authors.resolve(&revision.author);
        let mut tagger = Signature::new(SignatureType::Tagger, name, email);
        tagger.timestamp = revision.timestamp;

        let tag = Tag::new(commit_id, ObjectType::Commit, label.to_owned(), tagger, String::new());
        let tag_id = self.object_writer.write_object(ObjectType::Tag, &tag.to_data()?)?;
        self.produced.push(ProducedRef { refname: tag_ref, target: tag_id, kind: RefKind::Tag });
        Ok(())
    }

    fn tag_branch_head(&mut self, refname: &str, labels: &[String], revision: &Revision) -> Result<(), GitError> {
        let Some(head) = self.branches.current(refname).and_then(|b| b.head) else {
            self.diagnostics.mapping(format!("label on {refname} before any commit exists; ignored"));
            return Ok(());
        };
        for label in labels {
            self.tag_commit(refname, head, label, revision)?;
        }
        Ok(())
    }

    /// Commit message assembly: `EditMsg` chain, synthesized
    /// summary fallback, carry-over, then taglines.
    fn assemble_message(
        &self,
        raw: &str,
        vss_dir: &str,
        ops: &[ChangeOp],
        carry_over: &str,
        revision: &Revision,
        parents: &[ObjectHash],
    ) -> String {
        let map_path_scope: &[crate::config::rules::EditMsgRule] = self
            .config
            .map_path_rules(vss_dir, self.ctx)
            .into_iter()
            .find(|m| m.path_pattern.is_match(vss_dir))
            .map(|m| m.edit_msg.as_slice())
            .unwrap_or(&[]);

        let mut message = raw.to_owned();
        for rule in self.config.edit_msg_chain(map_path_scope, vss_dir, self.ctx) {
            let (next, changed) = rule.apply(&message);
            message = next;
            if changed && rule.is_final {
                break;
            }
        }

        if message.starts_with("\n\n") {
            message = format!("{}\n{message}", synthesize_summary(ops));
        }
        if message.trim().is_empty() {
            message = synthesize_summary(ops);
        }
        if !carry_over.is_empty() {
            message = format!("{carry_over}\n{message}");
        }

        match self.ctx.decorate_commit_message {
            DecorateCommitMessage::None => {}
            DecorateCommitMessage::RevisionId => {
                message = format!("{message}\n\nVSS-revision: {}", revision.number);
            }
            DecorateCommitMessage::ChangeId => {
                let change_id = compute_change_id(parents, &revision.author, revision.timestamp, &message);
                message = format!("{message}\n\nChange-Id: {change_id}");
            }
        }

        message
    }
}

/// Builds the synthesized added/changed/deleted/renamed summary used as a
/// fallback subject line.
fn synthesize_summary(ops: &[ChangeOp]) -> String {
    let mut added = Vec::new();
    let mut modified = Vec::new();
    let mut deleted = Vec::new();
    let mut renamed = Vec::new();
    let mut shared = Vec::new();

    for op in ops {
        match op {
            ChangeOp::AddFile { path, .. } => added.push(path.clone()),
            ChangeOp::ModifyFile { path, .. } => modified.push(path.clone()),
            ChangeOp::DeleteFile { path } => deleted.push(path.clone()),
            ChangeOp::RenameFile { old, new } => renamed.push(format!("{old} -> {new}")),
            ChangeOp::ShareFile { source, dest } => shared.push(format!("{source} -> {dest}")),
            ChangeOp::AddDir { .. } | ChangeOp::DeleteDir { .. } | ChangeOp::LabelPath { .. } => {}
        }
    }

    let mut lines = Vec::new();
    if !added.is_empty() {
        lines.push(format!("Added: {}", added.join(", ")));
    }
    if !modified.is_empty() {
        lines.push(format!("Modified: {}", modified.join(", ")));
    }
    if !deleted.is_empty() {
        lines.push(format!("Deleted: {}", deleted.join(", ")));
    }
    if !renamed.is_empty() {
        lines.push(format!("Renamed: {}", renamed.join(", ")));
    }
    if !shared.is_empty() {
        lines.push(format!("Shared: {}", shared.join(", ")));
    }
    if lines.is_empty() {
        lines.push("(no changes)".to_owned());
    }
    lines.join("\n")
}

/// SHA-1 over parent-ids, author, email, timestamp, and message, used for
/// the `Change-Id:` tagline.
fn compute_change_id(parents: &[ObjectHash], author: &str, timestamp: i64, message: &str) -> String {
    let mut hasher = Sha1::new();
    for parent in parents {
        hasher.update(parent.to_string().as_bytes());
    }
    hasher.update(author.as_bytes());
    hasher.update(timestamp.to_string().as_bytes());
    hasher.update(message.as_bytes());
    hex::encode(hasher.finalize())
}
