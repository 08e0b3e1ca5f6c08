//! The path→ref mapper: walks the active rule chain for a VSS
//! directory and decides whether it becomes its own branch, is blocked, or is
//! unmapped.

use std::collections::HashMap;

use crate::config::ConfigModel;
use crate::context::RunContext;
use crate::errors::GitError;
use crate::pattern::template;

/// The mapper's decision for one VSS directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapOutcome {
    /// Maps to this Git ref (after `MapRef` rewrite and `Replace` substitution).
    Mapped { refname: String },
    /// Explicitly blocked: never a branch, even if a later rule would map it
    /// (`UnmapPath`, or a `MapPath` without `Refname`, or an implicit
    /// `BlockParent`).
    Blocked,
    /// No rule decided; reported as a [`crate::errors::GitError::MappingWarning`].
    Unmapped,
}

/// Claims already made in this run, for ref-name collision disambiguation
/// (`__<N>` suffix rule). Keyed by the final ref name, valued
/// by the first VSS directory that claimed it.
#[derive(Default)]
pub struct RefClaims {
    claimed: HashMap<String, String>,
}

impl RefClaims {
    pub fn new() -> RefClaims {
        RefClaims::default()
    }

    /// Registers `refname` for `vss_path`, returning the name actually
    /// assigned (possibly suffixed) once collisions with a *different* VSS
    /// directory are resolved.
    pub fn claim(&mut self, refname: &str, vss_path: &str) -> String {
        if let Some(existing) = self.claimed.get(refname) {
            if existing == vss_path {
                return refname.to_owned();
            }
        } else {
            self.claimed.insert(refname.to_owned(), vss_path.to_owned());
            return refname.to_owned();
        }
        let mut n = 2u32;
        loop {
            let candidate = format!("{refname}__{n}");
            match self.claimed.get(&candidate) {
                Some(existing) if existing == vss_path => return candidate,
                None => {
                    self.claimed.insert(candidate.clone(), vss_path.to_owned());
                    return candidate;
                }
                Some(_) => n += 1,
            }
        }
    }
}

pub struct Mapper<'a> {
    config: &'a ConfigModel,
    ctx: &'a RunContext,
}

impl<'a> Mapper<'a> {
    pub fn new(config: &'a ConfigModel, ctx: &'a RunContext) -> Mapper<'a> {
        Mapper { config, ctx }
    }

    /// Decides the outcome for `vss_path`, claiming its ref name against
    /// `claims` on success.
    pub fn map(&self, vss_path: &str, claims: &mut RefClaims) -> Result<MapOutcome, GitError> {
        if self.is_blocked_by_parent(vss_path) {
            return Ok(MapOutcome::Blocked);
        }

        for unmap in self.config.unmap_path_rules(vss_path, self.ctx) {
            if unmap.path_pattern.is_match(vss_path) {
                return Ok(MapOutcome::Blocked);
            }
        }

        for map in self.config.map_path_rules(vss_path, self.ctx) {
            let Some(captures) = map.path_pattern.captures(vss_path) else { continue };
            return match &map.refname_template {
                None => Ok(MapOutcome::Blocked),
                Some(template_str) => {
                    let vars = self.project_vars(vss_path);
                    let mut refname = template::render(template_str, &captures.groups, &vars)?;
                    if !refname.starts_with("refs/") {
                        refname = format!("refs/{refname}");
                    }
                    refname = self.rewrite_ref(&refname, vss_path)?;
                    if refname.is_empty() {
                        return Ok(MapOutcome::Blocked);
                    }
                    let claimed = claims.claim(&refname, vss_path);
                    Ok(MapOutcome::Mapped { refname: claimed })
                }
            };
        }

        Ok(MapOutcome::Unmapped)
    }

    /// Whether some `MapPath`/`UnmapPath` whose `Path` is `"<vss_path>/*"`
    /// (and `BlockParent` not `No`) installs an implicit block on `vss_path`
    /// itself — preventing a directory whose children are the real branches
    /// from becoming one itself.
    fn is_blocked_by_parent(&self, vss_path: &str) -> bool {
        let child_glob = format!("{vss_path}/*");
        let blocked_by_map = self
            .config
            .all_map_path_rules()
            .any(|map| map.block_parent && map.path_pattern.source() == child_glob);
        let blocked_by_unmap = self
            .config
            .all_unmap_path_rules()
            .any(|unmap| unmap.block_parent && unmap.path_pattern.source() == child_glob);
        blocked_by_map || blocked_by_unmap
    }

    /// Applies `MapRef` rewrites (project then Default) and `Replace`
    /// substitution (ref name only, after `MapRef`) Returns
    /// an empty string if a `MapRef` without `NewRef` suppresses the ref.
    fn rewrite_ref(&self, refname: &str, vss_path: &str) -> Result<String, GitError> {
        let mut current = refname.to_owned();
        for rule in self.config.map_ref_rules(vss_path, self.ctx) {
            let Some(captures) = rule.old_ref_pattern.captures(&current) else { continue };
            match &rule.new_ref_template {
                None => return Ok(String::new()),
                Some(template_str) => {
                    let vars = self.project_vars(vss_path);
                    current = template::render(template_str, &captures.groups, &vars)?;
                    break;
                }
            }
        }
        Ok(self.apply_replace(&current, vss_path))
    }

    fn apply_replace(&self, refname: &str, vss_path: &str) -> String {
        let mut out = refname.to_owned();
        for project in self.config.active_projects(vss_path, self.ctx) {
            for (from, to) in &project.replace {
                out = out.replace(from.as_str(), to.as_str());
            }
        }
        out
    }

    fn project_vars(&self, vss_path: &str) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = self.ctx.cli_vars().into_iter().collect();
        for project in self.config.active_projects(vss_path, self.ctx) {
            vars.extend(project.vars.clone());
        }
        vars
    }

    /// Whether the `MapPath` rule owning `vss_path` was declared
    /// `DeleteIfMerged="Yes"` (fast-forward case): when that
    /// branch is later fast-forwarded away, its ref is suppressed entirely
    /// rather than written.
    pub fn delete_if_merged(&self, vss_path: &str) -> bool {
        for map in self.config.map_path_rules(vss_path, self.ctx) {
            if map.path_pattern.is_match(vss_path) {
                return map.delete_if_merged;
            }
        }
        false
    }

    /// Resolves the tag-ref root for a label applied at `vss_path`: the
    /// owning `MapPath`'s `LabelRefRoot`, else the `Project`'s, else the CLI
    /// default.
    pub fn label_ref_root(&self, vss_path: &str) -> String {
        for map in self.config.map_path_rules(vss_path, self.ctx) {
            if map.path_pattern.is_match(vss_path) {
                if let Some(root) = &map.label_ref_root {
                    return root.clone();
                }
                break;
            }
        }
        for project in self.config.active_projects(vss_path, self.ctx) {
            if let Some(root) = &project.label_ref_root {
                return root.clone();
            }
        }
        self.ctx.label_ref_root.clone()
    }

    /// Builds the full tag ref for a label applied at `vss_path`: the
    /// resolved `LabelRefRoot` with the label text appended after variable
    /// expansion and `Replace` substitution. `Replace` is applied to the
    /// label component only, not to the root prefix, since the root is
    /// operator-authored ref-namespace configuration rather than
    /// VSS-derived text.
    pub fn format_label_ref(&self, vss_path: &str, label: &str) -> Result<String, GitError> {
        let vars = self.project_vars(vss_path);
        let expanded = template::render(label, &[], &vars)?;
        let replaced = self.apply_replace(&expanded, vss_path);
        Ok(format!("{}{replaced}", self.label_ref_root(vss_path)))
    }
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
    fn hardcoded_trunk_maps_to_main() {
        let ctx = ctx();
        let config = ConfigModel::load(None, &ctx).unwrap();
        let mapper = Mapper::new(&config, &ctx);
        let mut claims = RefClaims::new();
        let outcome = mapper.map("trunk", &mut claims).unwrap();
        assert_eq!(outcome, MapOutcome::Mapped { refname: "refs/heads/main".to_owned() });
    }

    #[test]
    fn hardcoded_branches_star_blocks_parent() {
        let ctx = ctx();
        let config = ConfigModel::load(None, &ctx).unwrap();
        let mapper = Mapper::new(&config, &ctx);
        let mut claims = RefClaims::new();
        assert_eq!(mapper.map("branches", &mut claims).unwrap(), MapOutcome::Blocked);
        assert_eq!(
            mapper.map("branches/feat", &mut claims).unwrap(),
            MapOutcome::Mapped { refname: "refs/heads/feat".to_owned() }
        );
    }

    #[test]
    fn collision_gets_suffixed() {
        let xml = br#"<Projects>
            <Project Name="a" Path="a/*">
                <MapPath Path="a/*" Refname="refs/heads/shared"/>
            </Project>
            <Project Name="b" Path="b/*">
                <MapPath Path="b/*" Refname="refs/heads/shared"/>
            </Project>
        </Projects>"#;
        let ctx = ctx();
        let config = ConfigModel::load(Some(xml), &ctx).unwrap();
        let mapper = Mapper::new(&config, &ctx);
        let mut claims = RefClaims::new();
        let first = mapper.map("a/x", &mut claims).unwrap();
        let second = mapper.map("b/x", &mut claims).unwrap();
        assert_eq!(first, MapOutcome::Mapped { refname: "refs/heads/shared".to_owned() });
        assert_eq!(second, MapOutcome::Mapped { refname: "refs/heads/shared__2".to_owned() });
    }

    #[test]
    fn map_ref_rewrites_refname() {
        let xml = br#"<Projects>
            <Project Name="x" Path="branches/x">
                <MapPath Path="branches/x" Refname="refs/heads/x"/>
                <MapRef OldRef="refs/heads/x" NewRef="refs/heads/features/x"/>
            </Project>
        </Projects>"#;
        let ctx = ctx();
        let config = ConfigModel::load(Some(xml), &ctx).unwrap();
        let mapper = Mapper::new(&config, &ctx);
        let mut claims = RefClaims::new();
        let outcome = mapper.map("branches/x", &mut claims).unwrap();
        assert_eq!(
            outcome,
            MapOutcome::Mapped { refname: "refs/heads/features/x".to_owned() }
        );
    }

    #[test]
    fn map_path_without_refname_is_blocked() {
        let xml = br#"<Projects>
            <Project Name="hidden" Path="hidden">
                <MapPath Path="hidden"/>
            </Project>
        </Projects>"#;
        let ctx = ctx();
        let config = ConfigModel::load(Some(xml), &ctx).unwrap();
        let mapper = Mapper::new(&config, &ctx);
        let mut claims = RefClaims::new();
        assert_eq!(mapper.map("hidden", &mut claims).unwrap(), MapOutcome::Blocked);
    }

    #[test]
    fn unmapped_path_reports_unmapped() {
        let ctx = ctx();
        let config = ConfigModel::load(None, &ctx).unwrap();
        let mapper = Mapper::new(&config, &ctx);
        let mut claims = RefClaims::new();
        assert_eq!(mapper.map("random/dir", &mut claims).unwrap(), MapOutcome::Unmapped);
    }
}
