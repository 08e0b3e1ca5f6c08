//! The CLI surface: a `clap` derive struct covering the full flag set, plus
//! the conversion into [`crate::context::RunContext`] that `main` performs
//! once at startup, keeping command-line state out of ambient globals.
//!
//! Parsing individual flag *values* reuses `clap`'s own conventions; the
//! shape of the surface itself is part of this crate so the rest of the
//! engine has something to build a [`RunContext`] from.

use std::path::PathBuf;

use clap::Parser;

use crate::context::{DecorateCommitMessage, NameFilter, RunContext, VerboseFlags};

/// `vss2git <directory> [options]`: converts a VSS dump directory into a Git
/// repository.
#[derive(Debug, Parser)]
#[command(name = "vss2git", version, about = "Converts a Visual SourceSafe dump into a Git repository")]
pub struct Cli {
    /// Root of the VSS dump directory (revisions.jsonl + content/).
    pub directory: PathBuf,

    /// XML configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log file path; defaults to stderr-only logging when unset.
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Stop after this revision number, inclusive.
    #[arg(long = "end-revision")]
    pub end_revision: Option<u64>,

    /// Suppress everything below `warn`.
    #[arg(long)]
    pub quiet: bool,

    /// Emit a periodic progress heartbeat; optional interval in seconds.
    #[arg(long, num_args = 0..=1, default_missing_value = "5")]
    pub progress: Option<u64>,

    /// VSS directory name treated as the trunk (binds `$Trunk`).
    #[arg(long, default_value = "trunk")]
    pub trunk: String,

    /// VSS directory name containing branches (binds `$Branches`).
    #[arg(long, default_value = "branches")]
    pub branches: String,

    /// VSS directory name containing user branches (binds `$UserBranches`).
    #[arg(long = "user-branches", default_value = "users")]
    pub user_branches: String,

    /// Git ref name the trunk maps to (binds `$MapTrunkTo`).
    #[arg(long = "map-trunk-to", default_value = "main")]
    pub map_trunk_to: String,

    /// Skip the hardcoded trunk/branches defaults entirely.
    #[arg(long = "no-default-config")]
    pub no_default_config: bool,

    /// `dump`, `revs`, `commits`, `format`, `format-verbose`, `all`, `dump_all`; repeatable.
    #[arg(long = "verbose", value_delimiter = ',')]
    pub verbose: Vec<String>,

    /// Only convert VSS paths matching this glob; repeatable, comma-separated, `!`-negatable.
    #[arg(long = "path-filter")]
    pub path_filter: Vec<String>,

    /// Only activate named (`ExplicitOnly`) projects; repeatable, comma-separated, `!`-negatable.
    #[arg(long = "project")]
    pub project: Vec<String>,

    /// Target Git repository to write objects and refs into.
    #[arg(long = "target-repository", default_value = ".")]
    pub target_repository: PathBuf,

    /// Default tag-ref root for labels lacking a more specific `LabelRefRoot`.
    #[arg(long = "label-ref-root", default_value = "refs/tags/")]
    pub label_ref_root: String,

    /// Appends `VSS-revision:` or `Change-Id:` taglines to commit messages.
    #[arg(long = "decorate-commit-message")]
    pub decorate_commit_message: Option<String>,

    /// Also emit `refs/revisions/<n>/...` for every commit.
    #[arg(long = "create-revision-refs")]
    pub create_revision_refs: bool,

    /// Only apply tab/space retabbing, skipping the other formatting steps.
    #[arg(long = "retab-only")]
    pub retab_only: bool,

    /// Disable the indent-sensitive parts of formatting entirely.
    #[arg(long = "no-indent-reformat")]
    pub no_indent_reformat: bool,

    /// Stage newly created branch refs under `refs/<ns>/...` for later reparenting.
    #[arg(long = "append-to-refs")]
    pub append_to_refs: Option<String>,

    /// JSON file mapping VSS usernames to `{Name, Email}`.
    #[arg(long = "authors-map")]
    pub authors_map: Option<PathBuf>,

    /// Scan the revision stream and emit a template authors map at this path.
    #[arg(long = "make-authors-map")]
    pub make_authors_map: Option<PathBuf>,

    /// Persisted content-hash cache file.
    #[arg(long = "sha1-map")]
    pub sha1_map: Option<PathBuf>,

    /// Delete refs under these namespaces that this run didn't produce; repeatable.
    #[arg(long = "prune-refs")]
    pub prune_refs: Vec<String>,

    /// Bypass the engine: fetch one file's bytes at one revision and write them to a file.
    /// Takes `<vss-path>,r<rev>` and a destination path.
    #[arg(long = "extract-file", num_args = 2)]
    pub extract_file: Option<Vec<String>>,
}

impl Cli {
    /// Lowers parsed arguments into the immutable [`RunContext`] the config
    /// loader and engine consult.
    pub fn into_run_context(self) -> Result<RunContext, crate::errors::GitError> {
        let extract_file = match self.extract_file {
            Some(parts) => {
                let [spec, dest] = <[String; 2]>::try_from(parts).map_err(|_| {
                    crate::errors::GitError::InvalidArgument(
                        "--extract-file takes exactly <vss-path>,r<rev> <dest>".to_owned(),
                    )
                })?;
                let (path, rev) = spec.rsplit_once(",r").ok_or_else(|| {
                    crate::errors::GitError::InvalidArgument(format!(
                        "--extract-file spec `{spec}` must look like <vss-path>,r<rev>"
                    ))
                })?;
                let rev: u64 = rev.parse().map_err(|_| {
                    crate::errors::GitError::InvalidArgument(format!("--extract-file: bad revision `{rev}`"))
                })?;
                Some((path.to_owned(), rev, PathBuf::from(dest)))
            }
            None => None,
        };

        let decorate_commit_message = match self.decorate_commit_message.as_deref() {
            None => DecorateCommitMessage::None,
            Some("revision-id") => DecorateCommitMessage::RevisionId,
            Some("change-id") => DecorateCommitMessage::ChangeId,
            Some(other) => {
                return Err(crate::errors::GitError::InvalidArgument(format!(
                    "--decorate-commit-message: unknown value `{other}`, expected revision-id or change-id"
                )));
            }
        };

        Ok(RunContext {
            dump_directory: self.directory,
            config_path: self.config,
            log: self.log,
            no_default_config: self.no_default_config,
            end_revision: self.end_revision,
            quiet: self.quiet,
            progress_interval_secs: self.progress,
            verbose: VerboseFlags::parse(&self.verbose),
            trunk: self.trunk,
            branches: self.branches,
            user_branches: self.user_branches,
            map_trunk_to: self.map_trunk_to,
            path_filter: NameFilter::parse(&self.path_filter),
            project_filter: NameFilter::parse(&self.project),
            target_repository: self.target_repository,
            label_ref_root: self.label_ref_root,
            decorate_commit_message,
            create_revision_refs: self.create_revision_refs,
            retab_only: self.retab_only,
            no_indent_reformat: self.no_indent_reformat,
            append_to_refs: self.append_to_refs,
            authors_map: self.authors_map,
            make_authors_map: self.make_authors_map,
            sha1_map: self.sha1_map,
            prune_refs: self.prune_refs,
            extract_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::try_parse_from(["vss2git", "/dumps/repo"]).unwrap();
        assert_eq!(cli.directory, PathBuf::from("/dumps/repo"));
        assert_eq!(cli.trunk, "trunk");
        assert_eq!(cli.map_trunk_to, "main");
    }

    #[test]
    fn extract_file_splits_path_and_revision() {
        let cli = Cli::try_parse_from([
            "vss2git",
            "/dumps/repo",
            "--extract-file",
            "/trunk/a.txt,r5",
            "/tmp/out",
        ])
        .unwrap();
        let ctx = cli.into_run_context().unwrap();
        let (path, rev, dest) = ctx.extract_file.unwrap();
        assert_eq!(path, "/trunk/a.txt");
        assert_eq!(rev, 5);
        assert_eq!(dest, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn decorate_commit_message_rejects_unknown_value() {
        let cli = Cli::try_parse_from([
            "vss2git",
            "/dumps/repo",
            "--decorate-commit-message",
            "bogus",
        ])
        .unwrap();
        assert!(cli.into_run_context().is_err());
    }

    #[test]
    fn verbose_all_values_combine() {
        let cli = Cli::try_parse_from(["vss2git", "/dumps/repo", "--verbose", "dump,commits"]).unwrap();
        let ctx = cli.into_run_context().unwrap();
        assert!(ctx.verbose.dump && ctx.verbose.commits && !ctx.verbose.format);
    }
}
