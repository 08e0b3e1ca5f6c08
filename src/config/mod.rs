//! Loads the XML configuration into the resolved [`ConfigModel`] the engine
//! consults: parse → hardcoded defaults → `<Default>` → each `<Project>`
//!.

pub mod project;
pub mod rules;
pub mod xml;

use std::collections::HashMap;

use crate::context::RunContext;
use crate::errors::GitError;
use crate::pattern::Pattern;
use crate::pattern::template;

use project::Project;
use rules::{
    AddFileRule, ChmodRule, CopyPathRule, DeletePathRule, EditMsgRule, FormattingRule,
    IgnoreFilesRule, InjectFileRule, MapPathRule, MapRefRule, MergePathRule, RevSet,
    SkipCommitRule, UnmapPathRule, parse_yes_no,
};

/// The fully resolved configuration: the optional hardcoded baseline (trunk/
/// branches conventions), the optional `<Default>` scope, and every
/// `<Project>` scope in document order.
pub struct ConfigModel {
    pub hardcoded: Option<Project>,
    pub default: Option<Project>,
    pub projects: Vec<Project>,
}

impl ConfigModel {
    /// Loads a configuration from optionally-present XML bytes (when `None`,
    /// only the hardcoded baseline — if not suppressed — applies).
    pub fn load(xml_bytes: Option<&[u8]>, ctx: &RunContext) -> Result<ConfigModel, GitError> {
        let doc = xml_bytes.map(xml::parse).transpose()?;

        let base_vars: HashMap<String, String> = ctx.cli_vars().into_iter().collect();

        let hardcoded = if ctx.no_default_config {
            None
        } else {
            Some(hardcoded_baseline(ctx, &base_vars)?)
        };

        let default = match doc.as_ref().and_then(|d| d.default.as_ref()) {
            Some(scope) => Some(lower_scope(
                "",
                None,
                false,
                Vec::new(),
                None,
                true,
                true,
                &base_vars,
                scope,
            )?),
            None => None,
        };

        let default_vars = default
            .as_ref()
            .map(|d| d.vars.clone())
            .unwrap_or_else(|| base_vars.clone());

        let mut projects = Vec::new();
        if let Some(doc) = &doc {
            for p in &doc.project {
                let inherit_default = parse_yes_no(&p.inherit_default, true);
                let inherit_default_mappings = parse_yes_no(&p.inherit_default_mappings, true);
                let explicit_only = p
                    .explicit_only
                    .as_deref()
                    .map(|v| parse_yes_no(v, false))
                    .unwrap_or(false);
                let needs_projects = p
                    .needs_projects
                    .as_deref()
                    .map(|v| v.split(',').map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()).collect())
                    .unwrap_or_default();

                let seed_vars = if inherit_default {
                    default_vars.clone()
                } else {
                    base_vars.clone()
                };

                let path_pattern = Some(Pattern::compile(&p.path)?);
                let mut project = lower_scope(
                    &p.name,
                    path_pattern,
                    explicit_only,
                    needs_projects,
                    p.refs.clone(),
                    inherit_default,
                    inherit_default_mappings,
                    &seed_vars,
                    &p.scope,
                )?;
                project.name = p.name.clone();
                projects.push(project);
            }
        }

        Ok(ConfigModel {
            hardcoded,
            default,
            projects,
        })
    }

    /// Projects (not counting `<Default>`/hardcoded) active for `vss_path`:
    /// their `Path` glob matches, they're not `ExplicitOnly`-gated out, and
    /// every project named in `NeedsProjects` is active too.
    pub fn active_projects(&self, vss_path: &str, ctx: &RunContext) -> Vec<&Project> {
        self.projects
            .iter()
            .filter(|p| self.is_active(p, vss_path, ctx, &mut Vec::new()))
            .collect()
    }

    fn is_active<'a>(
        &'a self,
        project: &'a Project,
        vss_path: &str,
        ctx: &RunContext,
        visiting: &mut Vec<&'a str>,
    ) -> bool {
        if visiting.iter().any(|n| *n == project.name) {
            return false; // cyclic NeedsProjects; treat as inactive rather than loop forever
        }
        if !project.path_matches(vss_path) {
            return false;
        }
        if project.explicit_only && !ctx.project_filter.allows(&project.name) {
            return false;
        }
        if !ctx.project_filter.is_empty() && !ctx.project_filter.allows(&project.name) {
            return false;
        }
        visiting.push(&project.name);
        let ok = project.needs_projects.iter().all(|needed| {
            self.projects
                .iter()
                .find(|p| &p.name == needed)
                .map(|p| self.is_active(p, vss_path, ctx, visiting))
                .unwrap_or(false)
        });
        visiting.pop();
        ok
    }

    /// Every `MapPath` rule in the document, regardless of whether its owning
    /// project is active for any particular path. Used only to detect the
    /// implicit `BlockParent` rule, which is a structural
    /// property of the rule's own `Path` glob rather than of project scoping.
    pub fn all_map_path_rules(&self) -> impl Iterator<Item = &MapPathRule> {
        self.projects
            .iter()
            .chain(self.default.iter())
            .chain(self.hardcoded.iter())
            .flat_map(|p| p.map_path.iter())
    }

    /// Every `UnmapPath` rule in the document; see [`Self::all_map_path_rules`].
    pub fn all_unmap_path_rules(&self) -> impl Iterator<Item = &UnmapPathRule> {
        self.projects
            .iter()
            .chain(self.default.iter())
            .chain(self.hardcoded.iter())
            .flat_map(|p| p.unmap_path.iter())
    }

    pub fn map_path_rules(&self, vss_path: &str, ctx: &RunContext) -> Vec<&MapPathRule> {
        let actives = self.active_projects(vss_path, ctx);
        let mut chain: Vec<&MapPathRule> = Vec::new();
        for p in &actives {
            chain.extend(p.map_path.iter());
        }
        let include_default =
            actives.is_empty() || actives.iter().any(|p| p.inherit_default_mappings);
        if include_default {
            if let Some(d) = &self.default {
                chain.extend(d.map_path.iter());
            }
        }
        if let Some(h) = &self.hardcoded {
            chain.extend(h.map_path.iter());
        }
        chain
    }

    pub fn unmap_path_rules(&self, vss_path: &str, ctx: &RunContext) -> Vec<&UnmapPathRule> {
        let actives = self.active_projects(vss_path, ctx);
        let mut chain: Vec<&UnmapPathRule> = Vec::new();
        for p in &actives {
            chain.extend(p.unmap_path.iter());
        }
        if let Some(d) = &self.default {
            chain.extend(d.unmap_path.iter());
        }
        chain
    }

    pub fn map_ref_rules(&self, vss_path: &str, ctx: &RunContext) -> Vec<&MapRefRule> {
        self.project_then_default(vss_path, ctx, true, |p| &p.map_ref)
    }

    pub fn chmod_rules(&self, vss_path: &str, ctx: &RunContext) -> Vec<&ChmodRule> {
        self.project_then_default(vss_path, ctx, true, |p| &p.chmod)
    }

    pub fn ignore_files_rules(&self, vss_path: &str, ctx: &RunContext) -> Vec<&IgnoreFilesRule> {
        self.project_then_default(vss_path, ctx, true, |p| &p.ignore_files)
    }

    pub fn formatting_rules(&self, vss_path: &str, ctx: &RunContext) -> Vec<&FormattingRule> {
        self.project_then_default(vss_path, ctx, false, |p| &p.formatting)
    }

    pub fn delete_path_rules(&self, vss_path: &str, ctx: &RunContext) -> Vec<&DeletePathRule> {
        self.project_then_default(vss_path, ctx, false, |p| &p.delete_path)
    }

    pub fn add_file_rules(&self, vss_path: &str, ctx: &RunContext) -> Vec<&AddFileRule> {
        self.project_then_default(vss_path, ctx, false, |p| &p.add_file)
    }

    pub fn inject_file_rules(&self, vss_path: &str, ctx: &RunContext) -> Vec<&InjectFileRule> {
        self.project_then_default(vss_path, ctx, false, |p| &p.inject_file)
    }

    /// `<CopyPath>`/`<MergePath>` in `<Default>` are always ignored, so these
    /// only ever chain project-scope rules.
    pub fn copy_path_rules(&self, vss_path: &str, ctx: &RunContext) -> Vec<&CopyPathRule> {
        self.active_projects(vss_path, ctx)
            .into_iter()
            .flat_map(|p| p.copy_path.iter())
            .collect()
    }

    pub fn merge_path_rules(&self, vss_path: &str, ctx: &RunContext) -> Vec<&MergePathRule> {
        self.active_projects(vss_path, ctx)
            .into_iter()
            .flat_map(|p| p.merge_path.iter())
            .collect()
    }

    /// Every `<CopyPath>` rule in the document regardless of whether its
    /// destination directory has a registered branch yet; used to resolve
    /// explicit fork-point overrides ahead of branch creation.
    pub fn all_copy_path_rules(&self) -> impl Iterator<Item = &CopyPathRule> {
        self.projects.iter().flat_map(|p| p.copy_path.iter())
    }

    /// Every `<MergePath>` rule in the document; see [`Self::all_copy_path_rules`].
    pub fn all_merge_path_rules(&self) -> impl Iterator<Item = &MergePathRule> {
        self.projects.iter().flat_map(|p| p.merge_path.iter())
    }

    pub fn skip_commit_rules(&self, vss_path: &str, ctx: &RunContext) -> Vec<&SkipCommitRule> {
        self.project_then_default(vss_path, ctx, false, |p| &p.skip_commit)
    }

    /// Commit-message edit chain for one project-derived scope: MapPath-scope
    /// rules (passed in, already selected by the mapper) first, then
    /// project-scope, then Default-scope.
    pub fn edit_msg_chain<'a>(
        &'a self,
        map_path_scope: &'a [EditMsgRule],
        vss_path: &str,
        ctx: &RunContext,
    ) -> Vec<&'a EditMsgRule> {
        let mut chain: Vec<&EditMsgRule> = map_path_scope.iter().collect();
        for p in self.active_projects(vss_path, ctx) {
            chain.extend(p.edit_msg.iter());
        }
        if let Some(d) = &self.default {
            chain.extend(d.edit_msg.iter());
        }
        chain
    }

    /// Chains each active project's rules (via `getter`) ahead of `<Default>`'s.
    /// When `mapping_gated` is set, `<Default>`'s rules are only chained in if
    /// there are no active projects or at least one allows `InheritDefaultMappings`;
    /// ungated rule kinds (EditMsg, SkipCommit, DeletePath, AddFile, InjectFile,
    /// Formatting) always chain `<Default>` in regardless of that attribute.
    fn project_then_default<'a, T>(
        &'a self,
        vss_path: &str,
        ctx: &RunContext,
        mapping_gated: bool,
        getter: impl Fn(&'a Project) -> &'a [T],
    ) -> Vec<&'a T> {
        let actives = self.active_projects(vss_path, ctx);
        let mut chain: Vec<&T> = actives.iter().flat_map(|p| getter(p).iter()).collect();
        let include_default = !mapping_gated
            || actives.is_empty()
            || actives.iter().any(|p| p.inherit_default_mappings);
        if include_default {
            if let Some(d) = &self.default {
                chain.extend(getter(d).iter());
            }
        }
        chain
    }
}

fn hardcoded_baseline(
    ctx: &RunContext,
    vars: &HashMap<String, String>,
) -> Result<Project, GitError> {
    let map_path = vec![
        MapPathRule {
            path_pattern: Pattern::compile(&ctx.trunk)?,
            refname_template: Some(format!("refs/heads/{}", ctx.map_trunk_to)),
            block_parent: true,
            label_ref_root: None,
            delete_if_merged: false,
            edit_msg: Vec::new(),
        },
        MapPathRule {
            path_pattern: Pattern::compile(&format!("{}/*", ctx.branches))?,
            refname_template: Some("refs/heads/$1".to_owned()),
            block_parent: true,
            label_ref_root: None,
            delete_if_merged: false,
            edit_msg: Vec::new(),
        },
        MapPathRule {
            path_pattern: Pattern::compile(&format!("{}/*", ctx.user_branches))?,
            refname_template: Some("refs/heads/$1".to_owned()),
            block_parent: true,
            label_ref_root: None,
            delete_if_merged: false,
            edit_msg: Vec::new(),
        },
    ];
    Ok(Project {
        name: String::new(),
        path_pattern: None,
        explicit_only: false,
        needs_projects: Vec::new(),
        refs_namespace: None,
        inherit_default: true,
        inherit_default_mappings: true,
        vars: vars.clone(),
        replace: Vec::new(),
        map_path,
        unmap_path: Vec::new(),
        map_ref: Vec::new(),
        label_ref_root: None,
        edit_msg: Vec::new(),
        skip_commit: Vec::new(),
        inject_file: Vec::new(),
        add_file: Vec::new(),
        delete_path: Vec::new(),
        copy_path: Vec::new(),
        merge_path: Vec::new(),
        chmod: Vec::new(),
        ignore_files: Vec::new(),
        formatting: Vec::new(),
        empty_dir_placeholder: None,
    })
}

#[allow(clippy::too_many_arguments)]
fn lower_scope(
    name: &str,
    path_pattern: Option<Pattern>,
    explicit_only: bool,
    needs_projects: Vec<String>,
    refs_namespace: Option<String>,
    inherit_default: bool,
    inherit_default_mappings: bool,
    seed_vars: &HashMap<String, String>,
    scope: &xml::XmlScope,
) -> Result<Project, GitError> {
    let mut vars = seed_vars.clone();
    for block in &scope.vars {
        for entry in &block.entries {
            let expanded = template::render(&entry.value, &[], &vars)?;
            vars.insert(entry.name.clone(), expanded);
        }
    }

    let mut replace = Vec::new();
    for r in &scope.replace {
        replace.push((r.from.clone(), r.to.clone()));
    }

    let map_path = scope
        .map_path
        .iter()
        .map(|m| {
            Ok(MapPathRule {
                path_pattern: Pattern::compile(&m.path)?,
                refname_template: m.refname.clone(),
                block_parent: parse_yes_no(&m.block_parent, true),
                label_ref_root: m.label_ref_root.clone(),
                delete_if_merged: m
                    .delete_if_merged
                    .as_deref()
                    .map(|v| parse_yes_no(v, false))
                    .unwrap_or(false),
                edit_msg: lower_edit_msg(&m.edit_msg)?,
            })
        })
        .collect::<Result<Vec<_>, GitError>>()?;

    let unmap_path = scope
        .unmap_path
        .iter()
        .map(|u| {
            Ok(UnmapPathRule {
                path_pattern: Pattern::compile(&u.path)?,
                block_parent: parse_yes_no(&u.block_parent, true),
            })
        })
        .collect::<Result<Vec<_>, GitError>>()?;

    let map_ref = scope
        .map_ref
        .iter()
        .map(|m| {
            Ok(MapRefRule {
                old_ref_pattern: Pattern::compile(&m.old_ref)?,
                new_ref_template: m.new_ref.clone(),
            })
        })
        .collect::<Result<Vec<_>, GitError>>()?;

    let skip_commit = scope
        .skip_commit
        .iter()
        .map(|s| {
            Ok(SkipCommitRule {
                revs: s.revs.as_deref().map(RevSet::parse).transpose()?,
                rev_id: s.rev_id.clone(),
            })
        })
        .collect::<Result<Vec<_>, GitError>>()?;

    let inject_file = scope
        .inject_file
        .iter()
        .map(|i| InjectFileRule {
            path: i.path.clone(),
            source: i.source.clone(),
        })
        .collect();

    let add_file = scope
        .add_file
        .iter()
        .map(|a| AddFileRule {
            path: a.path.clone(),
            source: a.source.clone(),
            rev: a.rev,
        })
        .collect();

    let delete_path = scope
        .delete_path
        .iter()
        .map(|d| {
            Ok(DeletePathRule {
                path_pattern: Pattern::compile(&d.path)?,
                rev: d.rev,
            })
        })
        .collect::<Result<Vec<_>, GitError>>()?;

    // <CopyPath>/<MergePath> in <Default> are ignored outright.
    let is_default_scope = path_pattern.is_none() && name.is_empty();
    let copy_path = if is_default_scope {
        Vec::new()
    } else {
        scope
            .copy_path
            .iter()
            .map(|c| CopyPathRule {
                source: c.source.clone(),
                dest: c.dest.clone(),
                rev: c.rev,
            })
            .collect()
    };
    let merge_path = if is_default_scope {
        Vec::new()
    } else {
        scope
            .merge_path
            .iter()
            .map(|m| MergePathRule {
                source: m.source.clone(),
                dest: m.dest.clone(),
                rev: m.rev,
            })
            .collect()
    };

    let chmod = scope
        .chmod
        .iter()
        .map(|c| {
            Ok(ChmodRule {
                path_pattern: Pattern::compile(&c.path)?,
                executable: c.mode.trim() == "755" || c.mode.eq_ignore_ascii_case("executable"),
            })
        })
        .collect::<Result<Vec<_>, GitError>>()?;

    let ignore_files = scope
        .ignore_files
        .iter()
        .map(|i| {
            Ok(IgnoreFilesRule {
                pattern: Pattern::compile(&i.pattern)?,
            })
        })
        .collect::<Result<Vec<_>, GitError>>()?;

    let formatting = scope
        .formatting
        .iter()
        .map(|f| {
            Ok(FormattingRule {
                path_pattern: Pattern::compile(&f.path)?,
                no_reindent: f
                    .no_reindent
                    .as_deref()
                    .map(|v| parse_yes_no(v, false))
                    .unwrap_or(false),
                fix_eol: f
                    .fix_eol
                    .as_deref()
                    .map(|v| parse_yes_no(v, true))
                    .unwrap_or(true),
                fix_last_eol: f
                    .fix_last_eol
                    .as_deref()
                    .map(|v| parse_yes_no(v, true))
                    .unwrap_or(true),
                trim_whitespace: f
                    .trim_whitespace
                    .as_deref()
                    .map(|v| parse_yes_no(v, false))
                    .unwrap_or(false),
                trim_backslash: f
                    .trim_backslash
                    .as_deref()
                    .map(|v| parse_yes_no(v, false))
                    .unwrap_or(false),
                retab: f
                    .retab
                    .as_deref()
                    .map(|v| parse_yes_no(v, false))
                    .unwrap_or(false),
            })
        })
        .collect::<Result<Vec<_>, GitError>>()?;

    let edit_msg = lower_edit_msg(&scope.edit_msg)?;

    Ok(Project {
        name: name.to_owned(),
        path_pattern,
        explicit_only,
        needs_projects,
        refs_namespace,
        inherit_default,
        inherit_default_mappings,
        vars,
        replace,
        map_path,
        unmap_path,
        map_ref,
        label_ref_root: scope.label_ref_root.clone(),
        edit_msg,
        skip_commit,
        inject_file,
        add_file,
        delete_path,
        copy_path,
        merge_path,
        chmod,
        ignore_files,
        formatting,
        empty_dir_placeholder: scope.empty_dir_placeholder.clone(),
    })
}

fn lower_edit_msg(entries: &[xml::XmlEditMsg]) -> Result<Vec<EditMsgRule>, GitError> {
    entries
        .iter()
        .map(|e| {
            EditMsgRule::compile(
                &e.matches,
                &e.replace,
                e.max,
                e.is_final
                    .as_deref()
                    .map(|v| parse_yes_no(v, false))
                    .unwrap_or(false),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ctx() -> RunContext {
        RunContext {
            dump_directory: PathBuf::from("."),
            config_path: None,
            log: None,
            no_default_config: false,
            end_revision: None,
            quiet: true,
            progress_interval_secs: None,
            verbose: crate::context::VerboseFlags::default(),
            trunk: "trunk".to_owned(),
            branches: "branches".to_owned(),
            user_branches: "users".to_owned(),
            map_trunk_to: "main".to_owned(),
            path_filter: crate::context::NameFilter::default(),
            project_filter: crate::context::NameFilter::default(),
            target_repository: PathBuf::from("."),
            label_ref_root: "refs/tags/".to_owned(),
            decorate_commit_message: crate::context::DecorateCommitMessage::None,
            create_revision_refs: false,
            retab_only: false,
            no_indent_reformat: false,
            append_to_refs: None,
            authors_map: None,
            make_authors_map: None,
            sha1_map: None,
            prune_refs: Vec::new(),
            extract_file: None,
        }
    }

    #[test]
    fn hardcoded_baseline_maps_trunk_to_main() {
        let model = ConfigModel::load(None, &ctx()).unwrap();
        let rules = model.map_path_rules("trunk", &ctx());
        assert!(!rules.is_empty());
        assert_eq!(
            rules[0].refname_template.as_deref(),
            Some("refs/heads/main")
        );
    }

    #[test]
    fn project_rules_precede_default_rules() {
        let xml = br#"<Projects>
            <Default>
                <MapPath Path="other" Refname="refs/heads/other"/>
            </Default>
            <Project Name="demo" Path="demo">
                <MapPath Path="demo" Refname="refs/heads/demo"/>
            </Project>
        </Projects>"#;
        let model = ConfigModel::load(Some(xml), &ctx()).unwrap();
        let rules = model.map_path_rules("demo", &ctx());
        assert_eq!(rules[0].refname_template.as_deref(), Some("refs/heads/demo"));
    }

    #[test]
    fn explicit_only_project_requires_project_filter() {
        let xml = br#"<Projects>
            <Project Name="hidden" Path="hidden" ExplicitOnly="Yes">
                <MapPath Path="hidden" Refname="refs/heads/hidden"/>
            </Project>
        </Projects>"#;
        let default_ctx = ctx();
        let model = ConfigModel::load(Some(xml), &default_ctx).unwrap();
        assert!(model.active_projects("hidden", &default_ctx).is_empty());

        let mut filtered_ctx = ctx();
        filtered_ctx.project_filter = crate::context::NameFilter::parse(&["hidden".to_owned()]);
        assert_eq!(model.active_projects("hidden", &filtered_ctx).len(), 1);
    }
}
