//! The content pipeline: resolves each file's effective mode
//! and formatting spec, deduplicates by [`BlobKey`], and hashes new content
//! through a bounded worker pool.

pub mod format;

use std::sync::mpsc;
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::ConfigModel;
use crate::context::RunContext;
use crate::diagnostics::Diagnostics;
use crate::errors::GitError;
use crate::hash::ObjectHash;
use crate::internal::object::ObjectType;
use crate::revision::ContentId;
use crate::sha1map::Sha1Map;
use format::FormattingSpec;

/// Default Git file mode for a regular, non-executable blob.
pub const DEFAULT_MODE: u32 = 0o100644;
/// Mode for a file matched by an executable `<Chmod>` rule.
pub const EXECUTABLE_MODE: u32 = 0o100755;

/// The dedup key for content hashing: identical bytes reformatted
/// identically at the same path under the same gitattributes produce the same
/// blob, so caching on this tuple avoids re-hashing unchanged content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobKey {
    pub content_id: ContentId,
    pub format_spec_hash: u64,
    pub worktree_path: String,
    pub gitattributes_hash: String,
}

impl BlobKey {
    /// A stable hex string usable as the left column of a `sha1-map` line.
    pub fn to_cache_key(&self) -> String {
        format!(
            "{}:{:016x}:{}:{}",
            self.content_id.0, self.format_spec_hash, self.worktree_path, self.gitattributes_hash
        )
    }
}

/// Resolves the effective Git file mode for `rel_path`: the first `<Chmod>`
/// rule active for `vss_dir` (project scope first, then Default) whose
/// pattern matches `rel_path`, else [`DEFAULT_MODE`].
pub fn resolve_mode(config: &ConfigModel, ctx: &RunContext, vss_dir: &str, rel_path: &str) -> u32 {
    for rule in config.chmod_rules(vss_dir, ctx) {
        if rule.path_pattern.is_match(rel_path) {
            return if rule.executable { EXECUTABLE_MODE } else { DEFAULT_MODE };
        }
    }
    DEFAULT_MODE
}

/// Resolves the effective formatting spec for `rel_path`, applying the
/// CLI-wide `--retab-only`/`--no-indent-reformat` overrides on top of the
/// per-rule resolution.
pub fn resolve_formatting_spec(config: &ConfigModel, ctx: &RunContext, vss_dir: &str, rel_path: &str) -> FormattingSpec {
    let rules = config.formatting_rules(vss_dir, ctx);
    let mut spec = format::resolve_spec(&rules, rel_path);
    if ctx.no_indent_reformat {
        spec.retab = false;
    }
    if ctx.retab_only {
        spec = FormattingSpec { retab: spec.retab, ..FormattingSpec::none() };
    }
    spec
}

/// Computes a Git blob object id directly from bytes, standing in for the
/// external hasher subprocess contract while keeping hashing
/// in-process and deterministic for tests.
pub trait ObjectHasher: Send + Sync {
    fn hash_blob(&self, data: &[u8]) -> Result<ObjectHash, GitError>;
}

#[derive(Default)]
pub struct InProcessHasher;

impl ObjectHasher for InProcessHasher {
    fn hash_blob(&self, data: &[u8]) -> Result<ObjectHash, GitError> {
        Ok(ObjectHash::from_type_and_data(ObjectType::Blob, data))
    }
}

/// Hashes by writing straight through the target repository's
/// [`crate::gitio::ObjectWriter`], so the same subprocess call both computes
/// and persists a blob's id instead of doing the two separately.
pub struct WriterHasher {
    writer: Arc<dyn crate::gitio::ObjectWriter>,
}

impl WriterHasher {
    pub fn new(writer: Arc<dyn crate::gitio::ObjectWriter>) -> WriterHasher {
        WriterHasher { writer }
    }
}

impl ObjectHasher for WriterHasher {
    fn hash_blob(&self, data: &[u8]) -> Result<ObjectHash, GitError> {
        self.writer.write_object(ObjectType::Blob, data)
    }
}

/// Deduplicates and hashes file content across the whole run. The in-memory
/// cache and the bounded hash worker pool are the only
/// structures this pipeline shares across threads; both are internally
/// synchronized so callers on different branches can hash concurrently.
pub struct ContentPipeline {
    cache: DashMap<BlobKey, ObjectHash>,
    sha1_map: Option<Sha1Map>,
    pool: threadpool::ThreadPool,
    hasher: Arc<dyn ObjectHasher>,
}

impl ContentPipeline {
    pub fn new(workers: usize, sha1_map: Option<Sha1Map>) -> ContentPipeline {
        ContentPipeline::with_hasher(workers, sha1_map, Arc::new(InProcessHasher))
    }

    pub fn with_hasher(
        workers: usize,
        sha1_map: Option<Sha1Map>,
        hasher: Arc<dyn ObjectHasher>,
    ) -> ContentPipeline {
        ContentPipeline {
            cache: DashMap::new(),
            sha1_map,
            pool: threadpool::ThreadPool::new(workers.max(1)),
            hasher,
        }
    }

    /// Resolves `key`'s blob id: the in-memory cache, then the persisted
    /// `sha1-map`, else formats+hashes `raw` via the bounded worker pool and
    /// records the result in both.
    pub fn resolve(
        &self,
        key: BlobKey,
        raw: &[u8],
        spec: &FormattingSpec,
        diagnostics: &Diagnostics,
    ) -> Result<ObjectHash, GitError> {
        if let Some(hash) = self.cache.get(&key) {
            return Ok(*hash);
        }
        if let Some(map) = &self.sha1_map {
            if let Some(hash) = map.lookup(&key.to_cache_key()) {
                self.cache.insert(key, hash);
                return Ok(hash);
            }
        }

        let formatted = format::apply(spec, raw, &key.worktree_path, diagnostics);
        let hasher = Arc::clone(&self.hasher);
        let (tx, rx) = mpsc::channel();
        self.pool.execute(move || {
            let result = hasher.hash_blob(&formatted);
            let _ = tx.send(result);
        });
        let hash = rx
            .recv()
            .map_err(|_| GitError::HasherError("hash worker disconnected before replying".to_owned()))??;

        self.cache.insert(key.clone(), hash);
        if let Some(map) = &self.sha1_map {
            map.record(key.to_cache_key(), hash);
        }
        Ok(hash)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Flushes newly recorded entries to the backing `sha1-map` file, if one
    /// is configured (persisted atomically at end of run).
    pub fn persist_sha1_map(&self) -> Result<(), GitError> {
        match &self.sha1_map {
            Some(map) => map.persist(),
            None => Ok(()),
        }
    }
}
