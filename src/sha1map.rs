//! The `sha1-map` persisted content-hash cache: append-only
//! lines of `blobkey-hex<TAB>git-blob-hex`, eagerly validated on load and
//! persisted atomically (write-to-temp, rename) at end of run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::errors::GitError;
use crate::hash::ObjectHash;

#[derive(Default)]
struct Table {
    entries: HashMap<String, ObjectHash>,
    /// New entries recorded this run, appended verbatim on [`Sha1Map::persist`].
    pending: Vec<(String, ObjectHash)>,
}

/// An in-memory view of a `sha1-map` file, safe to share across hash worker
/// threads ("append-only during the run").
pub struct Sha1Map {
    path: PathBuf,
    table: Mutex<Table>,
}

impl Sha1Map {
    /// Loads `path` if it exists, eagerly rejecting malformed lines as a
    /// `ConfigError`.
    pub fn load(path: &Path) -> Result<Sha1Map, GitError> {
        let mut entries = HashMap::new();
        if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| GitError::ConfigError(format!("cannot read sha1-map {path:?}: {e}")))?;
            for (lineno, line) in text.lines().enumerate() {
                if line.is_empty() {
                    continue;
                }
                let (key, hash_hex) = line.split_once('\t').ok_or_else(|| {
                    GitError::ConfigError(format!(
                        "sha1-map {path:?}:{}: missing tab separator",
                        lineno + 1
                    ))
                })?;
                let hash: ObjectHash = hash_hex.parse().map_err(|_| {
                    GitError::ConfigError(format!(
                        "sha1-map {path:?}:{}: invalid object id `{hash_hex}`",
                        lineno + 1
                    ))
                })?;
                entries.insert(key.to_owned(), hash);
            }
        }
        Ok(Sha1Map {
            path: path.to_owned(),
            table: Mutex::new(Table { entries, pending: Vec::new() }),
        })
    }

    pub fn lookup(&self, key: &str) -> Option<ObjectHash> {
        self.table.lock().unwrap().entries.get(key).copied()
    }

    /// Records a new mapping, visible to subsequent [`Self::lookup`] calls in
    /// this run and queued for persistence.
    pub fn record(&self, key: String, hash: ObjectHash) {
        let mut table = self.table.lock().unwrap();
        table.entries.insert(key.clone(), hash);
        table.pending.push((key, hash));
    }

    /// Appends every entry recorded this run to the backing file, via a
    /// temp-file-then-rename to tolerate a crash mid-write.
    pub fn persist(&self) -> Result<(), GitError> {
        let table = self.table.lock().unwrap();
        if table.pending.is_empty() {
            return Ok(());
        }
        let mut text = if self.path.exists() {
            std::fs::read_to_string(&self.path)
                .map_err(|e| GitError::GitWriteError(format!("cannot read sha1-map {:?}: {e}", self.path)))?
        } else {
            String::new()
        };
        for (key, hash) in &table.pending {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(key);
            text.push('\t');
            text.push_str(&hash.to_string());
            text.push('\n');
        }
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| GitError::GitWriteError(format!("cannot create temp sha1-map: {e}")))?;
        std::fs::write(tmp.path(), text.as_bytes())
            .map_err(|e| GitError::GitWriteError(format!("cannot write temp sha1-map: {e}")))?;
        tmp.persist(&self.path)
            .map_err(|e| GitError::GitWriteError(format!("cannot rename sha1-map into place: {e}")))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.table.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
