//! A concrete, on-disk [`VssSource`] reading a pre-extracted revision dump
//! (the binary VSS database parser itself is an external
//! collaborator named only by interface). `main` reads this layout rather
//! than a live VSS database so the rest of the engine has something real to
//! run against end to end.
//!
//! Layout of `dump_directory`:
//! - `revisions.jsonl`: one JSON-encoded [`Revision`] per line, in ascending
//!   `number` order.
//! - `content/<content-id>`: the raw bytes for that content id.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Deserialize;

use crate::errors::GitError;
use crate::revision::{ChangeOp, ContentId, Revision, VssSource};

#[derive(Debug, Deserialize)]
struct RawChangeOp {
    op: String,
    path: Option<String>,
    content_id: Option<String>,
    old: Option<String>,
    new: Option<String>,
    source: Option<String>,
    dest: Option<String>,
    label: Option<String>,
}

impl RawChangeOp {
    fn into_change_op(self) -> Result<ChangeOp, GitError> {
        let missing = |field: &str| GitError::ParserError(format!("`{}` op missing `{field}`", self.op));
        match self.op.as_str() {
            "AddFile" => Ok(ChangeOp::AddFile {
                path: self.path.ok_or_else(|| missing("path"))?,
                content_id: ContentId(self.content_id.ok_or_else(|| missing("content_id"))?),
            }),
            "ModifyFile" => Ok(ChangeOp::ModifyFile {
                path: self.path.ok_or_else(|| missing("path"))?,
                content_id: ContentId(self.content_id.ok_or_else(|| missing("content_id"))?),
            }),
            "DeleteFile" => Ok(ChangeOp::DeleteFile { path: self.path.ok_or_else(|| missing("path"))? }),
            "RenameFile" => Ok(ChangeOp::RenameFile {
                old: self.old.ok_or_else(|| missing("old"))?,
                new: self.new.ok_or_else(|| missing("new"))?,
            }),
            "AddDir" => Ok(ChangeOp::AddDir { path: self.path.ok_or_else(|| missing("path"))? }),
            "DeleteDir" => Ok(ChangeOp::DeleteDir { path: self.path.ok_or_else(|| missing("path"))? }),
            "ShareFile" => Ok(ChangeOp::ShareFile {
                source: self.source.ok_or_else(|| missing("source"))?,
                dest: self.dest.ok_or_else(|| missing("dest"))?,
            }),
            "LabelPath" => Ok(ChangeOp::LabelPath {
                path: self.path.ok_or_else(|| missing("path"))?,
                label: self.label.ok_or_else(|| missing("label"))?,
            }),
            other => Err(GitError::ParserError(format!("unknown change op `{other}`"))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRevision {
    number: u64,
    symbolic_id: Option<String>,
    author: String,
    timestamp: i64,
    message: String,
    operations: Vec<RawChangeOp>,
}

/// Reads `revisions.jsonl` fully into memory up front; fetches content bytes
/// lazily from `content/<id>` on demand.
pub struct DumpDirectorySource {
    pending: std::collections::VecDeque<Revision>,
    content_dir: PathBuf,
    cache: Mutex<HashMap<ContentId, Vec<u8>>>,
}

impl DumpDirectorySource {
    pub fn open(dump_directory: &Path) -> Result<DumpDirectorySource, GitError> {
        let revisions_path = dump_directory.join("revisions.jsonl");
        let file = fs::File::open(&revisions_path)
            .map_err(|e| GitError::ParserError(format!("cannot open {revisions_path:?}: {e}")))?;
        let reader = BufReader::new(file);

        let mut pending = std::collections::VecDeque::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| GitError::ParserError(format!("{revisions_path:?}:{}: {e}", lineno + 1)))?;
            if line.trim().is_empty() {
                continue;
            }
            let raw: RawRevision = serde_json::from_str(&line)
                .map_err(|e| GitError::ParserError(format!("{revisions_path:?}:{}: {e}", lineno + 1)))?;
            let operations = raw
                .operations
                .into_iter()
                .map(RawChangeOp::into_change_op)
                .collect::<Result<Vec<_>, _>>()?;
            pending.push_back(Revision {
                number: raw.number,
                symbolic_id: raw.symbolic_id,
                author: raw.author,
                timestamp: raw.timestamp,
                message: raw.message,
                operations,
            });
        }

        Ok(DumpDirectorySource {
            pending,
            content_dir: dump_directory.join("content"),
            cache: Mutex::new(HashMap::new()),
        })
    }
}

impl VssSource for DumpDirectorySource {
    fn next_revision(&mut self) -> Result<Option<Revision>, GitError> {
        Ok(self.pending.pop_front())
    }

    fn fetch(&self, content_id: &ContentId) -> Result<Vec<u8>, GitError> {
        if let Some(bytes) = self.cache.lock().unwrap().get(content_id) {
            return Ok(bytes.clone());
        }
        let path = self.content_dir.join(&content_id.0);
        let bytes = fs::read(&path).map_err(|e| GitError::ParserError(format!("cannot read content {path:?}: {e}")))?;
        self.cache.lock().unwrap().insert(content_id.clone(), bytes.clone());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_revisions_and_content_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();
        fs::write(dir.path().join("content").join("c1"), b"hello\n").unwrap();
        fs::write(
            dir.path().join("revisions.jsonl"),
            concat!(
                r#"{"number":1,"symbolic_id":null,"author":"alice","timestamp":1,"message":"init","operations":[{"op":"AddDir","path":"/trunk"}]}"#,
                "\n",
                r#"{"number":2,"symbolic_id":null,"author":"alice","timestamp":2,"message":"add","operations":[{"op":"AddFile","path":"/trunk/a.txt","content_id":"c1"}]}"#,
                "\n",
            ),
        )
        .unwrap();

        let mut source = DumpDirectorySource::open(dir.path()).unwrap();
        let r1 = source.next_revision().unwrap().unwrap();
        assert_eq!(r1.number, 1);
        let r2 = source.next_revision().unwrap().unwrap();
        assert_eq!(r2.number, 2);
        assert!(source.next_revision().unwrap().is_none());
        assert_eq!(source.fetch(&ContentId("c1".to_owned())).unwrap(), b"hello\n");
    }

    #[test]
    fn unknown_op_is_a_parser_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();
        fs::write(
            dir.path().join("revisions.jsonl"),
            r#"{"number":1,"symbolic_id":null,"author":"a","timestamp":1,"message":"m","operations":[{"op":"Bogus"}]}"#,
        )
        .unwrap();
        assert!(DumpDirectorySource::open(dir.path()).is_err());
    }
}
