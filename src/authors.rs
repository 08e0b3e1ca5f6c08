//! The authors map: a JSON object mapping a VSS short username
//! to a Git `Name`/`Email` pair. Unknown usernames fall back to
//! `<username>@localhost`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::GitError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
}

/// Resolved username → (name, email) table, plus the fallback rule for
/// usernames it doesn't carry.
#[derive(Debug, Clone, Default)]
pub struct AuthorsMap {
    entries: BTreeMap<String, AuthorEntry>,
}

impl AuthorsMap {
    pub fn load(path: &Path) -> Result<AuthorsMap, GitError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| GitError::ConfigError(format!("cannot read authors map {path:?}: {e}")))?;
        let entries: BTreeMap<String, AuthorEntry> = serde_json::from_str(&text)
            .map_err(|e| GitError::ConfigError(format!("invalid authors map {path:?}: {e}")))?;
        Ok(AuthorsMap { entries })
    }

    /// Resolves `username` to a `(name, email)` pair, falling back to
    /// `<username>@localhost` for names not present in the map.
    pub fn resolve(&self, username: &str) -> (String, String) {
        match self.entries.get(username) {
            Some(entry) => (entry.name.clone(), entry.email.clone()),
            None => (username.to_owned(), format!("{username}@localhost")),
        }
    }

    /// Writes a template authors-map JSON file at `path` with one entry per
    /// distinct author short-name in `usernames`, empty `Name`/`Email`
    /// fields left for the operator to fill in (the `--make-authors-map`
    /// companion workflow).
    pub fn write_template(path: &Path, usernames: &BTreeSet<String>) -> Result<(), GitError> {
        let template: BTreeMap<&str, AuthorEntry> = usernames
            .iter()
            .map(|name| {
                (
                    name.as_str(),
                    AuthorEntry { name: String::new(), email: String::new() },
                )
            })
            .collect();
        let json = serde_json::to_string_pretty(&template)
            .map_err(|e| GitError::ConfigError(format!("cannot serialize authors template: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| GitError::ConfigError(format!("cannot write authors template {path:?}: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolves_known_username() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "alice".to_owned(),
            AuthorEntry { name: "Alice Example".to_owned(), email: "alice@example.com".to_owned() },
        );
        let map = AuthorsMap { entries };
        assert_eq!(
            map.resolve("alice"),
            ("Alice Example".to_owned(), "alice@example.com".to_owned())
        );
    }

    #[test]
    fn unknown_username_falls_back_to_localhost() {
        let map = AuthorsMap::default();
        assert_eq!(map.resolve("bob"), ("bob".to_owned(), "bob@localhost".to_owned()));
    }

    #[test]
    fn loads_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"alice": {{"Name": "Alice", "Email": "alice@x.com"}}}}"#).unwrap();
        let map = AuthorsMap::load(file.path()).unwrap();
        assert_eq!(map.resolve("alice"), ("Alice".to_owned(), "alice@x.com".to_owned()));
    }

    #[test]
    fn write_template_produces_empty_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authors.json");
        let mut usernames = BTreeSet::new();
        usernames.insert("alice".to_owned());
        AuthorsMap::write_template(&path, &usernames).unwrap();
        let map = AuthorsMap::load(&path).unwrap();
        assert_eq!(map.resolve("alice"), (String::new(), String::new()));
    }
}
