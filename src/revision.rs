//! The revision stream data model: the record shape the external
//! VSS parser delivers, and the trait the engine consumes it through.
//!
//! `VssSource` is named only by its interface contract: a lazy,
//! finite, ordered sequence of [`Revision`]s with a `fetch` call for content
//! bytes. The binary VSS database parser that produces it is out of scope.

use crate::errors::GitError;

/// An opaque, parser-supplied identifier that is stable across identical file
/// bytes. Two files with the same content-id are guaranteed to have identical
/// bytes; two files with different content-ids may still happen to coincide
/// byte-for-byte (content addressing downstream is what catches that case).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentId(pub String);

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One change operation inside a [`Revision`]. Modeled as a
/// tagged variant's design note rather than a class hierarchy:
/// each variant carries only the fields it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOp {
    AddFile { path: String, content_id: ContentId },
    ModifyFile { path: String, content_id: ContentId },
    DeleteFile { path: String },
    RenameFile { old: String, new: String },
    AddDir { path: String },
    DeleteDir { path: String },
    ShareFile { source: String, dest: String },
    LabelPath { path: String, label: String },
}

impl ChangeOp {
    /// The VSS path this operation is primarily about, for `--path-filter`
    /// and logging purposes. Rename/share report their destination.
    pub fn primary_path(&self) -> &str {
        match self {
            ChangeOp::AddFile { path, .. } => path,
            ChangeOp::ModifyFile { path, .. } => path,
            ChangeOp::DeleteFile { path } => path,
            ChangeOp::RenameFile { new, .. } => new,
            ChangeOp::AddDir { path } => path,
            ChangeOp::DeleteDir { path } => path,
            ChangeOp::ShareFile { dest, .. } => dest,
            ChangeOp::LabelPath { path, .. } => path,
        }
    }
}

/// A single VSS revision delivered in ascending `number` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub number: u64,
    pub symbolic_id: Option<String>,
    pub author: String,
    /// Unix timestamp, seconds.
    pub timestamp: i64,
    pub message: String,
    pub operations: Vec<ChangeOp>,
}

impl Revision {
    pub fn is_label(&self) -> bool {
        self.operations.iter().any(|op| matches!(op, ChangeOp::LabelPath { .. }))
    }
}

/// The external collaborator that yields the revision stream and resolves
/// file content by id. Implementations are free to stream
/// lazily; the engine only ever asks for the next revision in order.
pub trait VssSource {
    /// Returns the next revision in ascending order, or `None` at end of
    /// stream. A malformed stream is a [`GitError::ParserError`].
    fn next_revision(&mut self) -> Result<Option<Revision>, GitError>;

    /// Fetches the bytes for a content-id, as they existed at the point the
    /// id was issued.
    fn fetch(&self, content_id: &ContentId) -> Result<Vec<u8>, GitError>;
}

#[cfg(test)]
pub mod fixtures {
    //! An in-memory [`VssSource`] for unit and scenario tests: revisions and
    //! content bytes are supplied up front, no VSS database required.

    use super::*;
    use std::collections::HashMap;

    pub struct FakeVssSource {
        pending: std::collections::VecDeque<Revision>,
        content: HashMap<ContentId, Vec<u8>>,
    }

    impl FakeVssSource {
        pub fn new() -> Self {
            FakeVssSource {
                pending: std::collections::VecDeque::new(),
                content: HashMap::new(),
            }
        }

        pub fn with_content(mut self, id: &str, bytes: &[u8]) -> Self {
            self.content.insert(ContentId(id.to_owned()), bytes.to_vec());
            self
        }

        pub fn push(mut self, revision: Revision) -> Self {
            self.pending.push_back(revision);
            self
        }
    }

    impl Default for FakeVssSource {
        fn default() -> Self {
            Self::new()
        }
    }

    impl VssSource for FakeVssSource {
        fn next_revision(&mut self) -> Result<Option<Revision>, GitError> {
            Ok(self.pending.pop_front())
        }

        fn fetch(&self, content_id: &ContentId) -> Result<Vec<u8>, GitError> {
            self.content
                .get(content_id)
                .cloned()
                .ok_or_else(|| GitError::ParserError(format!("unknown content-id {content_id}")))
        }
    }

    #[test]
    fn fake_source_yields_pushed_revisions_in_order() {
        let mut source = FakeVssSource::new()
            .with_content("c1", b"hi\n")
            .push(Revision {
                number: 1,
                symbolic_id: None,
                author: "alice".to_owned(),
                timestamp: 0,
                message: "add a.txt".to_owned(),
                operations: vec![ChangeOp::AddFile {
                    path: "/trunk/a.txt".to_owned(),
                    content_id: ContentId("c1".to_owned()),
                }],
            });
        let rev = source.next_revision().unwrap().unwrap();
        assert_eq!(rev.number, 1);
        assert!(source.next_revision().unwrap().is_none());
    }
}
