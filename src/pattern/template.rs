//! Substitution templates used by `<Refname>`, `<MapRef>`'s `<NewRef>`, `<LabelRefRoot>`,
//! and `<Vars>` bindings: `$N`/`${N}`/`$(N)` reference pattern captures, `$Name`/`${Name}`/
//! `$(Name)` reference the active variable map.

use std::collections::HashMap;

use crate::errors::GitError;

/// Expands `template` against positional `captures` (1-indexed, as produced by
/// [`Pattern::captures`](crate::pattern::Pattern::captures)) and a resolved
/// variable map. Variable values are expanded recursively; a variable that
/// references itself, directly or transitively, is a `ConfigError`.
pub fn render(
    template: &str,
    captures: &[String],
    vars: &HashMap<String, String>,
) -> Result<String, GitError> {
    let mut visiting = Vec::new();
    expand(template, captures, vars, &mut visiting)
}

/// Resolves one variable's value, expanding any references inside it. Used
/// both by [`render`] and by the config loader when materializing `<Vars>`
/// bindings that reference earlier variables.
pub fn resolve_var(
    name: &str,
    vars: &HashMap<String, String>,
) -> Result<String, GitError> {
    let mut visiting = Vec::new();
    expand_var(name, &[], vars, &mut visiting)
}

fn expand(
    template: &str,
    captures: &[String],
    vars: &HashMap<String, String>,
    visiting: &mut Vec<String>,
) -> Result<String, GitError> {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::new();
    let mut i = 0usize;
    while i < chars.len() {
        if chars[i] != '$' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let (token, consumed) = match chars[i + 1] {
            '{' => read_delimited(&chars, i + 2, '}'),
            '(' => read_delimited(&chars, i + 2, ')'),
            _ => read_bare(&chars, i + 1),
        };

        match token {
            Some(tok) if tok.is_empty() => {
                out.push('$');
                i += 1;
            }
            Some(tok) => {
                if let Ok(index) = tok.parse::<usize>() {
                    if index == 0 || index > captures.len() {
                        return Err(GitError::ConfigError(format!(
                            "template `{template}` references capture ${index} but only {} captures are available",
                            captures.len()
                        )));
                    }
                    out.push_str(&captures[index - 1]);
                } else {
                    out.push_str(&expand_var(&tok, captures, vars, visiting)?);
                }
                i += 1 + consumed;
            }
            None => {
                out.push('$');
                i += 1;
            }
        }
    }
    Ok(out)
}

fn expand_var(
    name: &str,
    captures: &[String],
    vars: &HashMap<String, String>,
    visiting: &mut Vec<String>,
) -> Result<String, GitError> {
    if visiting.iter().any(|v| v == name) {
        return Err(GitError::ConfigError(format!(
            "circular variable reference: {} -> {name}",
            visiting.join(" -> ")
        )));
    }
    let value = vars
        .get(name)
        .ok_or_else(|| GitError::ConfigError(format!("undefined variable `${name}`")))?;
    visiting.push(name.to_owned());
    let expanded = expand(value, captures, vars, visiting)?;
    visiting.pop();
    Ok(expanded)
}

/// Reads a `{...}`/`(...)`-delimited token starting at `start` (just past the
/// opening delimiter). Returns the token text and how many template chars
/// (including both delimiters) were consumed.
fn read_delimited(chars: &[char], start: usize, close: char) -> (Option<String>, usize) {
    let mut end = start;
    while end < chars.len() && chars[end] != close {
        end += 1;
    }
    if end >= chars.len() {
        return (None, 0);
    }
    let token: String = chars[start..end].iter().collect();
    // consumed = delimiter-open(1) + token.len() + delimiter-close(1), minus the
    // leading '$' which the caller already accounted for.
    (Some(token), end - start + 2)
}

/// Reads a bare `$Name` or `$N` token: the longest run of alphanumerics/underscore.
fn read_bare(chars: &[char], start: usize) -> (Option<String>, usize) {
    let mut end = start;
    while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    let token: String = chars[start..end].iter().collect();
    (Some(token), end - start)
}
