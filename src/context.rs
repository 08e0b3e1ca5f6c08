//! `RunContext` collects every CLI-derived binding the config loader and engine
//! need, built once in `main` and threaded through by reference instead of
//! living in ambient globals.

use std::path::PathBuf;

/// How `--verbose` output should be scoped; multiple values may be combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerboseFlags {
    pub dump: bool,
    pub revs: bool,
    pub commits: bool,
    pub format: bool,
    pub format_verbose: bool,
}

impl VerboseFlags {
    pub fn parse(values: &[String]) -> VerboseFlags {
        let mut flags = VerboseFlags::default();
        for v in values {
            match v.as_str() {
                "dump" => flags.dump = true,
                "revs" => flags.revs = true,
                "commits" => flags.commits = true,
                "format" => flags.format = true,
                "format-verbose" => {
                    flags.format = true;
                    flags.format_verbose = true;
                }
                "dump_all" => {
                    flags.dump = true;
                    flags.revs = true;
                    flags.commits = true;
                }
                "all" => {
                    flags.dump = true;
                    flags.revs = true;
                    flags.commits = true;
                    flags.format = true;
                }
                _ => {}
            }
        }
        flags
    }

    pub fn any(&self) -> bool {
        self.dump || self.revs || self.commits || self.format || self.format_verbose
    }
}

/// A repeatable, comma-separated, `!`-negatable name filter used by both
/// `--path-filter` and `--project`.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl NameFilter {
    pub fn parse(values: &[String]) -> NameFilter {
        let mut filter = NameFilter::default();
        for value in values {
            for entry in value.split(',') {
                let entry = entry.trim();
                if entry.is_empty() {
                    continue;
                }
                if let Some(rest) = entry.strip_prefix('!') {
                    filter.negative.push(rest.to_owned());
                } else {
                    filter.positive.push(entry.to_owned());
                }
            }
        }
        filter
    }

    /// An empty filter allows everything not explicitly negated.
    pub fn allows(&self, name: &str) -> bool {
        if self.negative.iter().any(|n| n == name) {
            return false;
        }
        self.positive.is_empty() || self.positive.iter().any(|p| p == name)
    }

    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }

    pub fn positive_names(&self) -> &[String] {
        &self.positive
    }
}

/// How `Change-Id`/`VSS-revision` taglines are decorated onto commit messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecorateCommitMessage {
    #[default]
    None,
    RevisionId,
    ChangeId,
}

/// Every CLI-derived binding the config loader and engine consult. Built once
/// in `main` from parsed [`crate::cli::Cli`] arguments.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub dump_directory: PathBuf,
    pub config_path: Option<PathBuf>,
    pub log: Option<PathBuf>,
    pub no_default_config: bool,
    pub end_revision: Option<u64>,
    pub quiet: bool,
    pub progress_interval_secs: Option<u64>,
    pub verbose: VerboseFlags,

    pub trunk: String,
    pub branches: String,
    pub user_branches: String,
    pub map_trunk_to: String,

    pub path_filter: NameFilter,
    pub project_filter: NameFilter,

    pub target_repository: PathBuf,
    pub label_ref_root: String,
    pub decorate_commit_message: DecorateCommitMessage,
    pub create_revision_refs: bool,
    pub retab_only: bool,
    pub no_indent_reformat: bool,
    pub append_to_refs: Option<String>,
    pub authors_map: Option<PathBuf>,
    pub make_authors_map: Option<PathBuf>,
    pub sha1_map: Option<PathBuf>,
    pub prune_refs: Vec<String>,
    pub extract_file: Option<(String, u64, PathBuf)>,
}

impl RunContext {
    /// The implicit variable bindings `$Trunk`/`$Branches`/`$UserBranches`/`$MapTrunkTo`
    /// every scope inherits regardless of `InheritDefault`.
    pub fn cli_vars(&self) -> Vec<(String, String)> {
        vec![
            ("Trunk".to_owned(), self.trunk.clone()),
            ("Branches".to_owned(), self.branches.clone()),
            ("UserBranches".to_owned(), self.user_branches.clone()),
            ("MapTrunkTo".to_owned(), self.map_trunk_to.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_filter_allows_everything_when_empty() {
        let filter = NameFilter::default();
        assert!(filter.allows("anything"));
    }

    #[test]
    fn name_filter_respects_negation_over_positive() {
        let filter = NameFilter::parse(&["a,b,!b".to_owned()]);
        assert!(filter.allows("a"));
        assert!(!filter.allows("b"));
        assert!(!filter.allows("c"));
    }

    #[test]
    fn verbose_all_implies_every_individual_flag() {
        let flags = VerboseFlags::parse(&["all".to_owned()]);
        assert!(flags.dump && flags.revs && flags.commits && flags.format);
    }
}
