//! Raw XML schema for the `<Projects>` configuration document,
//! deserialized with `quick-xml`'s serde integration. Values here are still
//! unexpanded text; [`super::project`] lowers them into the resolved model
//! the engine consults.

use serde::Deserialize;

fn default_yes() -> String {
    "Yes".to_owned()
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Projects")]
pub struct XmlProjects {
    #[serde(rename = "Default")]
    pub default: Option<XmlScope>,
    #[serde(rename = "Project", default)]
    pub project: Vec<XmlProject>,
}

#[derive(Debug, Deserialize)]
pub struct XmlProject {
    #[serde(rename = "@Name")]
    pub name: String,
    #[serde(rename = "@Path")]
    pub path: String,
    #[serde(rename = "@InheritDefault", default = "default_yes")]
    pub inherit_default: String,
    #[serde(rename = "@InheritDefaultMappings", default = "default_yes")]
    pub inherit_default_mappings: String,
    #[serde(rename = "@ExplicitOnly", default)]
    pub explicit_only: Option<String>,
    #[serde(rename = "@NeedsProjects", default)]
    pub needs_projects: Option<String>,
    #[serde(rename = "@Refs", default)]
    pub refs: Option<String>,
    #[serde(flatten)]
    pub scope: XmlScope,
}

/// The elements common to both `<Default>` and `<Project>` scopes.
#[derive(Debug, Deserialize, Default)]
pub struct XmlScope {
    #[serde(rename = "Vars", default)]
    pub vars: Vec<XmlVars>,
    #[serde(rename = "Replace", default)]
    pub replace: Vec<XmlReplace>,
    #[serde(rename = "MapPath", default)]
    pub map_path: Vec<XmlMapPath>,
    #[serde(rename = "UnmapPath", default)]
    pub unmap_path: Vec<XmlUnmapPath>,
    #[serde(rename = "MapRef", default)]
    pub map_ref: Vec<XmlMapRef>,
    #[serde(rename = "LabelRefRoot", default)]
    pub label_ref_root: Option<String>,
    #[serde(rename = "EditMsg", default)]
    pub edit_msg: Vec<XmlEditMsg>,
    #[serde(rename = "SkipCommit", default)]
    pub skip_commit: Vec<XmlSkipCommit>,
    #[serde(rename = "InjectFile", default)]
    pub inject_file: Vec<XmlInjectFile>,
    #[serde(rename = "AddFile", default)]
    pub add_file: Vec<XmlAddFile>,
    #[serde(rename = "DeletePath", default)]
    pub delete_path: Vec<XmlDeletePath>,
    #[serde(rename = "CopyPath", default)]
    pub copy_path: Vec<XmlCopyPath>,
    #[serde(rename = "MergePath", default)]
    pub merge_path: Vec<XmlMergePath>,
    #[serde(rename = "Chmod", default)]
    pub chmod: Vec<XmlChmod>,
    #[serde(rename = "IgnoreFiles", default)]
    pub ignore_files: Vec<XmlIgnoreFiles>,
    #[serde(rename = "Formatting", default)]
    pub formatting: Vec<XmlFormatting>,
    #[serde(rename = "EmptyDirPlaceholder", default)]
    pub empty_dir_placeholder: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct XmlVars {
    #[serde(rename = "$value", default)]
    pub entries: Vec<XmlVarEntry>,
}

#[derive(Debug, Deserialize)]
pub struct XmlVarEntry {
    #[serde(rename = "@Name")]
    pub name: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct XmlReplace {
    #[serde(rename = "@From")]
    pub from: String,
    #[serde(rename = "@To", default)]
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct XmlMapPath {
    #[serde(rename = "@Path")]
    pub path: String,
    #[serde(rename = "@Refname", default)]
    pub refname: Option<String>,
    #[serde(rename = "@BlockParent", default = "default_yes")]
    pub block_parent: String,
    #[serde(rename = "EditMsg", default)]
    pub edit_msg: Vec<XmlEditMsg>,
    #[serde(rename = "LabelRefRoot", default)]
    pub label_ref_root: Option<String>,
    #[serde(rename = "@DeleteIfMerged", default)]
    pub delete_if_merged: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct XmlUnmapPath {
    #[serde(rename = "@Path")]
    pub path: String,
    #[serde(rename = "@BlockParent", default = "default_yes")]
    pub block_parent: String,
}

#[derive(Debug, Deserialize)]
pub struct XmlMapRef {
    #[serde(rename = "@OldRef")]
    pub old_ref: String,
    #[serde(rename = "@NewRef", default)]
    pub new_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct XmlEditMsg {
    #[serde(rename = "@Match")]
    pub matches: String,
    #[serde(rename = "@Replace", default)]
    pub replace: String,
    #[serde(rename = "@Max", default)]
    pub max: Option<usize>,
    #[serde(rename = "@Final", default)]
    pub is_final: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct XmlSkipCommit {
    #[serde(rename = "@Revs", default)]
    pub revs: Option<String>,
    #[serde(rename = "@RevId", default)]
    pub rev_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct XmlInjectFile {
    #[serde(rename = "@Path")]
    pub path: String,
    #[serde(rename = "@Source")]
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct XmlAddFile {
    #[serde(rename = "@Path")]
    pub path: String,
    #[serde(rename = "@Source")]
    pub source: String,
    #[serde(rename = "@Rev", default)]
    pub rev: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct XmlDeletePath {
    #[serde(rename = "@Path")]
    pub path: String,
    #[serde(rename = "@Rev", default)]
    pub rev: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct XmlCopyPath {
    #[serde(rename = "@Source")]
    pub source: String,
    #[serde(rename = "@Dest")]
    pub dest: String,
    #[serde(rename = "@Rev", default)]
    pub rev: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct XmlMergePath {
    #[serde(rename = "@Source")]
    pub source: String,
    #[serde(rename = "@Dest")]
    pub dest: String,
    #[serde(rename = "@Rev", default)]
    pub rev: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct XmlChmod {
    #[serde(rename = "@Path")]
    pub path: String,
    #[serde(rename = "@Mode")]
    pub mode: String,
}

#[derive(Debug, Deserialize)]
pub struct XmlIgnoreFiles {
    #[serde(rename = "$text")]
    pub pattern: String,
}

#[derive(Debug, Deserialize)]
pub struct XmlFormatting {
    #[serde(rename = "@Path")]
    pub path: String,
    #[serde(rename = "@NoReindent", default)]
    pub no_reindent: Option<String>,
    #[serde(rename = "@FixEOL", default)]
    pub fix_eol: Option<String>,
    #[serde(rename = "@FixLastEOL", default)]
    pub fix_last_eol: Option<String>,
    #[serde(rename = "@TrimWhitespace", default)]
    pub trim_whitespace: Option<String>,
    #[serde(rename = "@TrimBackslash", default)]
    pub trim_backslash: Option<String>,
    #[serde(rename = "@Retab", default)]
    pub retab: Option<String>,
}

/// Parses raw XML bytes into the unexpanded [`XmlProjects`] document.
pub fn parse(bytes: &[u8]) -> Result<XmlProjects, crate::errors::GitError> {
    quick_xml::de::from_reader(bytes)
        .map_err(|e| crate::errors::GitError::ConfigError(format!("invalid config XML: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let xml = br#"<Projects>
            <Default>
                <MapPath Path="trunk" Refname="refs/heads/main"/>
            </Default>
            <Project Name="demo" Path="demo/*">
                <MapPath Path="demo/*" Refname="refs/heads/$1"/>
            </Project>
        </Projects>"#;
        let doc = parse(xml).unwrap();
        assert!(doc.default.is_some());
        assert_eq!(doc.project.len(), 1);
        assert_eq!(doc.project[0].name, "demo");
    }

    #[test]
    fn rejects_malformed_xml() {
        assert!(parse(b"<Projects><Default>").is_err());
    }
}
