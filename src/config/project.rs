//! The resolved [`Project`] scope: one `<Default>` or `<Project>` element lowered
//! into compiled patterns and rule lists, with its own variable bindings already
//! expanded.

use std::collections::HashMap;

use crate::config::rules::{
    AddFileRule, ChmodRule, CopyPathRule, DeletePathRule, EditMsgRule, FormattingRule,
    IgnoreFilesRule, InjectFileRule, MapPathRule, MapRefRule, MergePathRule, SkipCommitRule,
    UnmapPathRule,
};
use crate::pattern::Pattern;

/// A resolved `<Project>`/`<Default>` scope. `path_pattern` is `None` for
/// `<Default>` and the hardcoded baseline, which are always in scope.
pub struct Project {
    pub name: String,
    pub path_pattern: Option<Pattern>,
    pub explicit_only: bool,
    pub needs_projects: Vec<String>,
    pub refs_namespace: Option<String>,
    /// Whether this scope inherited `<Default>`'s vars/replace bindings as its
    /// seed (`InheritDefault`); already folded into `vars`/`replace` by the
    /// time this is set, kept around for scopes that need to know.
    pub inherit_default: bool,
    /// Whether `<Default>`'s `MapPath`/`MapRef`/`Chmod`/`IgnoreFiles` rules
    /// chain in after this project's own (`InheritDefaultMappings`).
    pub inherit_default_mappings: bool,

    pub vars: HashMap<String, String>,
    pub replace: Vec<(String, String)>,

    pub map_path: Vec<MapPathRule>,
    pub unmap_path: Vec<UnmapPathRule>,
    pub map_ref: Vec<MapRefRule>,
    pub label_ref_root: Option<String>,
    pub edit_msg: Vec<EditMsgRule>,
    pub skip_commit: Vec<SkipCommitRule>,
    pub inject_file: Vec<InjectFileRule>,
    pub add_file: Vec<AddFileRule>,
    pub delete_path: Vec<DeletePathRule>,
    /// Empty for `<Default>`: `<CopyPath>`/`<MergePath>` there are ignored.
    pub copy_path: Vec<CopyPathRule>,
    pub merge_path: Vec<MergePathRule>,
    pub chmod: Vec<ChmodRule>,
    pub ignore_files: Vec<IgnoreFilesRule>,
    pub formatting: Vec<FormattingRule>,
    pub empty_dir_placeholder: Option<String>,
}

impl Project {
    /// Whether this project's own `Path` glob matches `vss_path` (callers still
    /// need to check `ExplicitOnly`/`NeedsProjects` via [`super::ConfigModel::is_active`]).
    pub fn path_matches(&self, vss_path: &str) -> bool {
        match &self.path_pattern {
            Some(p) => p.is_match(vss_path),
            None => true,
        }
    }
}
