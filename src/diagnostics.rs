//! The non-fatal diagnostics sink: `MappingWarning` and
//! `ContentWarning` are collected here instead of propagated with `?`, then
//! flushed to the log with counts at end of run.

use std::sync::Mutex;

use tracing::warn;

/// One collected non-fatal diagnostic.
#[derive(Debug, Clone)]
pub enum Diagnostic {
    Mapping(String),
    Content(String),
}

/// A `Vec` behind a mutex: interior mutability for state multiple call sites
/// need to append to without threading `&mut` everywhere.
#[derive(Default)]
pub struct Diagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn mapping(&self, message: impl Into<String>) {
        self.entries.lock().unwrap().push(Diagnostic::Mapping(message.into()));
    }

    pub fn content(&self, message: impl Into<String>) {
        self.entries.lock().unwrap().push(Diagnostic::Content(message.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().unwrap().clone()
    }

    /// Logs every collected diagnostic at `warn` level and a summary count.
    pub fn flush(&self) {
        let entries = self.entries.lock().unwrap();
        let (mapping_count, content_count) = entries.iter().fold((0, 0), |(m, c), d| match d {
            Diagnostic::Mapping(_) => (m + 1, c),
            Diagnostic::Content(_) => (m, c + 1),
        });
        for entry in entries.iter() {
            match entry {
                Diagnostic::Mapping(msg) => warn!(target: "vss2git::mapping", "{msg}"),
                Diagnostic::Content(msg) => warn!(target: "vss2git::content", "{msg}"),
            }
        }
        if !entries.is_empty() {
            warn!(
                "{} mapping warning(s), {} content warning(s)",
                mapping_count, content_count
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_both_kinds() {
        let diagnostics = Diagnostics::new();
        diagnostics.mapping("unmapped: /foo");
        diagnostics.content("lone CR in /bar");
        assert_eq!(diagnostics.len(), 2);
    }
}
