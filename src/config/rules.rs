//! Resolved rule types consulted by the mapper, branch state machine, and content
//! pipeline. These are lowered from [`super::xml`] structs once paths are compiled
//! to [`Pattern`]s, `Yes`/`No` attributes are parsed to `bool`, and templates are
//! left unexpanded (expansion happens per-match, against that match's captures).

use regex::RegexBuilder;

use crate::errors::GitError;
use crate::pattern::Pattern;

pub fn parse_yes_no(value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => true,
        "no" | "false" | "0" => false,
        _ => default,
    }
}

/// A set of revision numbers, parsed from a comma-separated list of single
/// numbers and `N-M` ranges, e.g. `"5,7-9,20"`.
#[derive(Debug, Clone, Default)]
pub struct RevSet {
    ranges: Vec<(u64, u64)>,
}

impl RevSet {
    pub fn parse(s: &str) -> Result<RevSet, GitError> {
        let mut ranges = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Some((lo, hi)) = part.split_once('-') {
                let lo: u64 = lo
                    .trim()
                    .parse()
                    .map_err(|_| GitError::ConfigError(format!("bad revision range `{part}`")))?;
                let hi: u64 = hi
                    .trim()
                    .parse()
                    .map_err(|_| GitError::ConfigError(format!("bad revision range `{part}`")))?;
                ranges.push((lo, hi));
            } else {
                let n: u64 = part
                    .parse()
                    .map_err(|_| GitError::ConfigError(format!("bad revision number `{part}`")))?;
                ranges.push((n, n));
            }
        }
        Ok(RevSet { ranges })
    }

    pub fn contains(&self, rev: u64) -> bool {
        self.ranges.iter().any(|(lo, hi)| rev >= *lo && rev <= *hi)
    }
}

pub struct EditMsgRule {
    pub regex: regex::Regex,
    pub replace: String,
    pub max: Option<usize>,
    pub is_final: bool,
}

impl EditMsgRule {
    pub fn compile(
        pattern: &str,
        replace: &str,
        max: Option<usize>,
        is_final: bool,
    ) -> Result<EditMsgRule, GitError> {
        let regex = RegexBuilder::new(pattern)
            .multi_line(true)
            .dot_matches_new_line(false)
            .build()
            .map_err(|e| GitError::ConfigError(format!("bad EditMsg regex `{pattern}`: {e}")))?;
        Ok(EditMsgRule {
            regex,
            replace: replace.to_owned(),
            max,
            is_final,
        })
    }

    /// Applies this rule to `message`, returning the rewritten message and
    /// whether a substitution actually occurred.
    pub fn apply(&self, message: &str) -> (String, bool) {
        let limit = self.max.unwrap_or(usize::MAX);
        let mut count = 0usize;
        let result = self.regex.replacen(message, limit, |caps: &regex::Captures| {
            count += 1;
            let mut expanded = String::new();
            caps.expand(&self.replace, &mut expanded);
            expanded
        });
        (result.into_owned(), count > 0)
    }
}

pub struct MapPathRule {
    pub path_pattern: Pattern,
    pub refname_template: Option<String>,
    pub block_parent: bool,
    pub label_ref_root: Option<String>,
    pub delete_if_merged: bool,
    pub edit_msg: Vec<EditMsgRule>,
}

pub struct UnmapPathRule {
    pub path_pattern: Pattern,
    pub block_parent: bool,
}

pub struct MapRefRule {
    pub old_ref_pattern: Pattern,
    pub new_ref_template: Option<String>,
}

pub struct SkipCommitRule {
    pub revs: Option<RevSet>,
    pub rev_id: Option<String>,
}

pub struct InjectFileRule {
    pub path: String,
    pub source: String,
}

pub struct AddFileRule {
    pub path: String,
    pub source: String,
    pub rev: Option<u64>,
}

pub struct DeletePathRule {
    pub path_pattern: Pattern,
    pub rev: Option<u64>,
}

pub struct CopyPathRule {
    pub source: String,
    pub dest: String,
    pub rev: Option<u64>,
}

pub struct MergePathRule {
    pub source: String,
    pub dest: String,
    pub rev: Option<u64>,
}

pub struct ChmodRule {
    pub path_pattern: Pattern,
    pub executable: bool,
}

pub struct IgnoreFilesRule {
    pub pattern: Pattern,
}

pub struct FormattingRule {
    pub path_pattern: Pattern,
    pub no_reindent: bool,
    pub fix_eol: bool,
    pub fix_last_eol: bool,
    pub trim_whitespace: bool,
    pub trim_backslash: bool,
    pub retab: bool,
}
