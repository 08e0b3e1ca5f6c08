//! Wildcard pattern compiler and matcher used by the path→ref mapper, `<Chmod>`,
//! `<Formatting>`, `<IgnoreFiles>`, and `--path-filter`/`--project` CLI filters.
//!
//! A pattern compiles to a `regex::Regex` with one capture group per explicit
//! wildcard, in source order, so callers can feed the captures straight into
//! [`template`](crate::pattern::template) substitution.

pub mod template;

use regex::Regex;

use crate::errors::GitError;

/// One compiled subpattern plus whether it was written with a leading `!`.
struct Subpattern {
    negated: bool,
    regex: Regex,
    capture_count: usize,
}

/// A compiled pattern, possibly a semicolon-separated combination of
/// positive and negated subpatterns.
pub struct Pattern {
    source: String,
    subpatterns: Vec<Subpattern>,
}

/// The result of a successful match: the captured text of every explicit
/// wildcard in the winning subpattern, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures {
    pub groups: Vec<String>,
}

impl Pattern {
    /// Compiles a (possibly combined, possibly negated) pattern string.
    pub fn compile(source: &str) -> Result<Pattern, GitError> {
        let mut subpatterns = Vec::new();
        for raw in split_top_level(source, ';') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (negated, body) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };
            let (regex_src, capture_count) = translate(body)?;
            let regex = Regex::new(&regex_src)
                .map_err(|e| GitError::ConfigError(format!("bad pattern `{source}`: {e}")))?;
            subpatterns.push(Subpattern {
                negated,
                regex,
                capture_count,
            });
        }
        if subpatterns.is_empty() {
            return Err(GitError::ConfigError(format!(
                "pattern `{source}` has no subpatterns"
            )));
        }
        Ok(Pattern {
            source: source.to_owned(),
            subpatterns,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether `path` is matched by the combined pattern, applying its
    /// semicolon-separated subpatterns and `!`-negation rules in order.
    pub fn is_match(&self, path: &str) -> bool {
        let mut negative_hit = false;
        let mut positive_hit = false;
        let all_negative = self.subpatterns.iter().all(|s| s.negated);
        for sub in &self.subpatterns {
            if sub.regex.is_match(path) {
                if sub.negated {
                    negative_hit = true;
                } else {
                    positive_hit = true;
                }
            }
        }
        if negative_hit {
            return false;
        }
        if positive_hit {
            return true;
        }
        // "If all subpatterns are negative and none match, the combined
        // result is match (implicit trailing `**`)."
        all_negative
    }

    /// Captures from the first non-negated subpattern that matches `path`,
    /// if the pattern matches at all via a positive subpattern.
    pub fn captures(&self, path: &str) -> Option<Captures> {
        if !self.is_match(path) {
            return None;
        }
        for sub in &self.subpatterns {
            if sub.negated {
                continue;
            }
            if let Some(caps) = sub.regex.captures(path) {
                let groups = (1..=sub.capture_count)
                    .map(|i| caps.get(i).map(|m| m.as_str().to_owned()).unwrap_or_default())
                    .collect();
                return Some(Captures { groups });
            }
        }
        None
    }
}

/// Splits `s` on occurrences of `sep` that are not nested inside `{...}`.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            c if c == sep && depth <= 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Translates one glob-style subpattern body into an anchored regex source
/// string, returning the regex and the number of explicit-wildcard capture
/// groups it contains.
fn translate(body: &str) -> Result<(String, usize), GitError> {
    let directory_only = body.ends_with('/');
    let trimmed = if directory_only {
        &body[..body.len() - 1]
    } else {
        body
    };
    let has_slash = trimmed.contains('/');

    let mut out = String::from("^");
    let mut captures = 0usize;
    translate_into(trimmed, &mut out, &mut captures)?;
    if directory_only {
        out.push('/');
    }
    out.push('$');

    if !has_slash {
        // Single-component patterns match at any depth (gitignore semantics).
        out = format!("^(?:.*/)?{}", &out[1..]);
    }

    Ok((out, captures))
}

fn translate_into(body: &str, out: &mut String, captures: &mut usize) -> Result<(), GitError> {
    let chars: Vec<char> = body.chars().collect();
    let mut i = 0usize;
    let mut literal_run = String::new();

    macro_rules! flush_literal {
        () => {
            if !literal_run.is_empty() {
                out.push_str(&regex::escape(&literal_run));
                literal_run.clear();
            }
        };
    }

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') && chars.get(i + 2) == Some(&'/') => {
                flush_literal!();
                out.push_str("((?:[^/]+/)*)");
                *captures += 1;
                i += 3;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                flush_literal!();
                out.push_str("(.*)");
                *captures += 1;
                i += 2;
            }
            '*' => {
                flush_literal!();
                out.push_str("([^/]*)");
                *captures += 1;
                i += 1;
            }
            '?' => {
                flush_literal!();
                out.push_str("([^/])");
                *captures += 1;
                i += 1;
            }
            '{' => {
                flush_literal!();
                let close = matching_brace(&chars, i).ok_or_else(|| {
                    GitError::ConfigError(format!("unbalanced `{{` in pattern `{body}`"))
                })?;
                let inner: String = chars[i + 1..close].iter().collect();
                out.push('(');
                *captures += 1;
                let mut first = true;
                for alt in split_top_level(&inner, ',') {
                    if !first {
                        out.push('|');
                    }
                    first = false;
                    translate_into(alt, out, captures)?;
                }
                out.push(')');
                i = close + 1;
            }
            c => {
                literal_run.push(c);
                i += 1;
            }
        }
    }
    flush_literal!();
    Ok(())
}

fn matching_brace(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, &c) in chars.iter().enumerate().skip(open) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_component_matches_any_depth() {
        let p = Pattern::compile("*.o").unwrap();
        assert!(p.is_match("main.o"));
        assert!(p.is_match("src/main.o"));
        assert!(!p.is_match("main.obj"));
    }

    #[test]
    fn double_star_matches_across_slashes() {
        let p = Pattern::compile("src/**/test.rs").unwrap();
        assert!(p.is_match("src/test.rs"));
        assert!(p.is_match("src/a/b/test.rs"));
        assert!(!p.is_match("other/test.rs"));
    }

    #[test]
    fn brace_alternation_matches_any_branch() {
        let p = Pattern::compile("trunk/{a,b,c}.txt").unwrap();
        assert!(p.is_match("trunk/a.txt"));
        assert!(p.is_match("trunk/b.txt"));
        assert!(!p.is_match("trunk/d.txt"));
    }

    #[test]
    fn captures_are_in_source_order() {
        let p = Pattern::compile("branches/*/src/*.cs").unwrap();
        let caps = p.captures("branches/feat/src/Program.cs").unwrap();
        assert_eq!(caps.groups, vec!["feat".to_owned(), "Program".to_owned()]);
    }

    #[test]
    fn negated_subpattern_wins_over_positive() {
        let p = Pattern::compile("**;!**/bin/**").unwrap();
        assert!(p.is_match("src/main.rs"));
        assert!(!p.is_match("target/bin/app"));
    }

    #[test]
    fn all_negative_with_no_match_defaults_to_match() {
        let p = Pattern::compile("!*.tmp").unwrap();
        assert!(p.is_match("main.rs"));
        assert!(!p.is_match("scratch.tmp"));
    }

    #[test]
    fn trailing_slash_restricts_to_directories() {
        let p = Pattern::compile("bin/").unwrap();
        assert!(p.is_match("bin/"));
        assert!(!p.is_match("bin"));
    }

    quickcheck::quickcheck! {
        /// A literal path (no wildcard metacharacters) compiled as a pattern
        /// matches only that exact single-component name, at any depth.
        fn literal_name_matches_itself_at_any_depth(name: String) -> bool {
            let name: String = name.chars().filter(|c| c.is_alphanumeric()).collect();
            if name.is_empty() {
                return true;
            }
            let Ok(p) = Pattern::compile(&name) else { return true };
            p.is_match(&name) && p.is_match(&format!("deep/nested/{name}"))
        }

        /// `Pattern::is_match` is deterministic: the same compiled pattern
        /// gives the same verdict on the same path every time it's asked.
        fn is_match_is_deterministic(name: String) -> bool {
            let name: String = name.chars().filter(|c| c.is_alphanumeric()).collect();
            if name.is_empty() {
                return true;
            }
            let Ok(p) = Pattern::compile(&name) else { return true };
            p.is_match(&name) == p.is_match(&name)
        }
    }
}
