//! File-content formatting rules: the small set of
//! byte-level transforms the engine itself applies. Re-indentation is the
//! embedded reformatter, an external collaborator — `retab`
//! here only covers tab/space conversion, not structural re-indentation.

use std::hash::{Hash, Hasher};

use ahash::AHasher;

use crate::config::rules::FormattingRule;
use crate::diagnostics::Diagnostics;

/// The resolved set of byte-level transforms that apply to one file, plus
/// the opaque hash identifying that set for [`super::BlobKey`] purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FormattingSpec {
    pub fix_eol: bool,
    pub fix_last_eol: bool,
    pub trim_whitespace: bool,
    pub trim_backslash: bool,
    pub retab: bool,
}

impl FormattingSpec {
    pub fn none() -> FormattingSpec {
        FormattingSpec::default()
    }

    pub fn is_noop(&self) -> bool {
        *self == FormattingSpec::default()
    }

    /// An opaque, stable hash of this spec for use in a [`super::BlobKey`].
    pub fn spec_hash(&self) -> u64 {
        let mut hasher = AHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Picks the first `<Formatting>` rule (already ordered MapPath, Project,
/// Default by the config loader) whose path matches and whose `NoReindent`
/// does not suppress it, step 2.
pub fn resolve_spec(rules: &[&FormattingRule], path: &str) -> FormattingSpec {
    for rule in rules {
        if rule.path_pattern.is_match(path) {
            return FormattingSpec {
                fix_eol: rule.fix_eol,
                fix_last_eol: rule.fix_last_eol,
                trim_whitespace: rule.trim_whitespace,
                trim_backslash: rule.trim_backslash,
                retab: rule.retab && !rule.no_reindent,
            };
        }
    }
    FormattingSpec::none()
}

/// Applies `spec` to `data`, emitting `ContentWarning` diagnostics for lone
/// CR and missing-final-EOL only while formatting is engaged.
pub fn apply(spec: &FormattingSpec, data: &[u8], path: &str, diagnostics: &Diagnostics) -> Vec<u8> {
    if spec.is_noop() {
        return data.to_vec();
    }
    let mut bytes = data.to_vec();

    if spec.fix_eol {
        bytes = fix_eol(&bytes, path, diagnostics);
    }
    if spec.trim_whitespace {
        bytes = trim_trailing_whitespace(&bytes);
    }
    if spec.trim_backslash {
        bytes = trim_trailing_backslash(&bytes);
    }
    if spec.fix_last_eol {
        bytes = fix_last_eol(&bytes, path, diagnostics);
    }
    if spec.retab {
        bytes = retab(&bytes);
    }
    bytes
}

fn fix_eol(data: &[u8], path: &str, diagnostics: &Diagnostics) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'\r' if data.get(i + 1) == Some(&b'\n') => {
                out.push(b'\n');
                i += 2;
            }
            b'\r' => {
                diagnostics.content(format!("{path}: lone CR at byte {i}"));
                out.push(b'\n');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

fn fix_last_eol(data: &[u8], path: &str, diagnostics: &Diagnostics) -> Vec<u8> {
    if data.is_empty() || data.last() == Some(&b'\n') {
        return data.to_vec();
    }
    diagnostics.content(format!("{path}: missing final EOL"));
    let mut out = data.to_vec();
    out.push(b'\n');
    out
}

fn trim_trailing_whitespace(data: &[u8]) -> Vec<u8> {
    data.split(|&b| b == b'\n')
        .map(|line| {
            let trimmed_len = line.iter().rposition(|&b| b != b' ' && b != b'\t').map(|p| p + 1).unwrap_or(0);
            &line[..trimmed_len]
        })
        .collect::<Vec<_>>()
        .join(&b'\n')
}

fn trim_trailing_backslash(data: &[u8]) -> Vec<u8> {
    data.split(|&b| b == b'\n')
        .map(|line| {
            if line.last() == Some(&b'\\') { &line[..line.len() - 1] } else { line }
        })
        .collect::<Vec<_>>()
        .join(&b'\n')
}

fn retab(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for line in data.split(|&b| b == b'\n') {
        let mut col = 0usize;
        let mut rest_start = 0usize;
        for (i, &b) in line.iter().enumerate() {
            if b == b'\t' {
                col += 8 - (col % 8);
                rest_start = i + 1;
            } else if b == b' ' {
                col += 1;
                rest_start = i + 1;
            } else {
                break;
            }
        }
        out.extend(std::iter::repeat_n(b'\t', col / 8));
        out.extend(std::iter::repeat_n(b' ', col % 8));
        out.extend_from_slice(&line[rest_start..]);
        out.push(b'\n');
    }
    out.pop();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_spec_passes_through() {
        let diagnostics = Diagnostics::new();
        let spec = FormattingSpec::none();
        assert_eq!(apply(&spec, b"a\r\nb", "f.txt", &diagnostics), b"a\r\nb");
    }

    #[test]
    fn fix_eol_normalizes_crlf_and_lone_cr() {
        let diagnostics = Diagnostics::new();
        let spec = FormattingSpec { fix_eol: true, ..Default::default() };
        assert_eq!(apply(&spec, b"a\r\nb\rc", "f.txt", &diagnostics), b"a\nb\nc");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn fix_last_eol_appends_missing_newline() {
        let diagnostics = Diagnostics::new();
        let spec = FormattingSpec { fix_last_eol: true, ..Default::default() };
        assert_eq!(apply(&spec, b"a\nb", "f.txt", &diagnostics), b"a\nb\n");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn fix_last_eol_leaves_terminated_file_alone() {
        let diagnostics = Diagnostics::new();
        let spec = FormattingSpec { fix_last_eol: true, ..Default::default() };
        assert_eq!(apply(&spec, b"a\nb\n", "f.txt", &diagnostics), b"a\nb\n");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn trim_whitespace_strips_trailing_spaces_and_tabs() {
        let diagnostics = Diagnostics::new();
        let spec = FormattingSpec { trim_whitespace: true, ..Default::default() };
        assert_eq!(apply(&spec, b"a  \nb\t\n", "f.txt", &diagnostics), b"a\nb\n");
    }

    #[test]
    fn trim_backslash_strips_trailing_backslash_per_line() {
        let diagnostics = Diagnostics::new();
        let spec = FormattingSpec { trim_backslash: true, ..Default::default() };
        assert_eq!(apply(&spec, b"a\\\nb", "f.txt", &diagnostics), b"a\nb");
    }

    #[test]
    fn retab_converts_leading_spaces_to_tabs() {
        let diagnostics = Diagnostics::new();
        let spec = FormattingSpec { retab: true, ..Default::default() };
        assert_eq!(apply(&spec, b"        x", "f.txt", &diagnostics), b"\tx");
    }

    #[test]
    fn distinct_specs_hash_differently() {
        let a = FormattingSpec { fix_eol: true, ..Default::default() };
        let b = FormattingSpec { trim_whitespace: true, ..Default::default() };
        assert_ne!(a.spec_hash(), b.spec_hash());
    }
}
