//! Branch specs and branch-name matching.
//!
//! A spec is one of:
//! - a commit id (6 to 40 lowercase hex characters),
//! - a wildcard branch name (`master`, `origin/release-*`, `**`),
//! - a regex prefixed with `:` (`:^(?!origin/master$).*`).
//!
//! Wildcards: `**` matches any sequence, `*` matches any sequence that does
//! not contain `/`. An unqualified name also matches the same branch on any
//! remote, so `master` matches `origin/master` and
//! `refs/remotes/upstream/master`. Regex specs must match the whole branch
//! name as the repository reports it.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::{ChooserError, Result};

/// Prefix marking a spec as a regular expression.
pub const REGEX_SENTINEL: char = ':';

/// Syntactic class of a spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    /// Looks like a commit id; resolved directly before anything else.
    ShaLike,
    /// `:`-prefixed regular expression.
    Regex,
    /// Branch or tag name, possibly with `*` wildcards.
    Literal,
}

#[derive(Debug)]
enum Matcher {
    Regex(fancy_regex::Regex),
    Wildcard(regex::Regex),
}

/// A configured branch spec.
#[derive(Debug, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct BranchSpec {
    name: String,
    matcher: OnceLock<std::result::Result<Matcher, String>>,
}

impl BranchSpec {
    /// Create a spec. Surrounding whitespace is trimmed and an empty spec
    /// matches every branch.
    pub fn new(name: impl AsRef<str>) -> Self {
        let trimmed = name.as_ref().trim();
        let name = if trimmed.is_empty() { "**" } else { trimmed };
        Self {
            name: name.to_string(),
            matcher: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SpecKind {
        if is_sha_like(&self.name) {
            SpecKind::ShaLike
        } else if self.regex_body().is_some() {
            SpecKind::Regex
        } else {
            SpecKind::Literal
        }
    }

    /// Whether the spec could name a tag: no `/`, no `*`, not a commit id
    /// and not a regex.
    pub fn is_plain_name(&self) -> bool {
        self.kind() == SpecKind::Literal && !self.name.contains(['/', '*'])
    }

    /// Check that the spec compiles.
    pub fn validate(&self) -> Result<()> {
        self.matcher().map(|_| ())
    }

    /// Whether `branch` (e.g. `origin/master`) matches this spec.
    pub fn matches(&self, branch: &str) -> Result<bool> {
        Ok(match self.matcher()? {
            Matcher::Wildcard(re) => re.is_match(branch),
            // Running out of backtracking budget counts as no match.
            Matcher::Regex(re) => re.is_match(branch).unwrap_or(false),
        })
    }

    /// Filter `branches` down to those matching this spec, keeping order.
    pub fn filter_matching<'a, T, F>(&self, branches: &'a [T], name: F) -> Result<Vec<&'a T>>
    where
        F: Fn(&T) -> &str,
    {
        let mut matching = Vec::new();
        for branch in branches {
            if self.matches(name(branch))? {
                matching.push(branch);
            }
        }
        Ok(matching)
    }

    fn regex_body(&self) -> Option<&str> {
        self.name
            .strip_prefix(REGEX_SENTINEL)
            .filter(|body| !body.is_empty())
    }

    fn matcher(&self) -> Result<&Matcher> {
        self.matcher
            .get_or_init(|| self.compile())
            .as_ref()
            .map_err(|message| ChooserError::InvalidSpec {
                spec: self.name.clone(),
                message: message.clone(),
            })
    }

    fn compile(&self) -> std::result::Result<Matcher, String> {
        if let Some(body) = self.regex_body() {
            return fancy_regex::Regex::new(&format!("^(?:{body})$"))
                .map(Matcher::Regex)
                .map_err(|e| e.to_string());
        }
        regex::Regex::new(&wildcard_pattern(&self.name))
            .map(Matcher::Wildcard)
            .map_err(|e| e.to_string())
    }
}

impl Clone for BranchSpec {
    fn clone(&self) -> Self {
        Self::new(&self.name)
    }
}

impl PartialEq for BranchSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for BranchSpec {}

impl From<String> for BranchSpec {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for BranchSpec {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<BranchSpec> for String {
    fn from(spec: BranchSpec) -> Self {
        spec.name
    }
}

impl std::fmt::Display for BranchSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// 6 to 40 lowercase hex characters.
pub fn is_sha_like(s: &str) -> bool {
    (6..=40).contains(&s.len()) && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Anchored regex for a wildcard branch spec, including the optional ref
/// prefix.
fn wildcard_pattern(name: &str) -> String {
    let prefix = if !name.contains("**") && !name.contains('/') {
        "(?:refs/heads/|refs/remotes/[^/]+/|remotes/[^/]+/|[^/]+/)?"
    } else {
        "(?:refs/heads/|refs/remotes/|remotes/)?"
    };
    format!("^{prefix}{}$", wildcard_to_regex(name))
}

fn wildcard_to_regex(name: &str) -> String {
    let mut out = String::new();
    let mut rest = name;
    while !rest.is_empty() {
        let stars = rest.len() - rest.trim_start_matches('*').len();
        if stars > 0 {
            out.push_str(&".*".repeat(stars / 2));
            if stars % 2 == 1 {
                out.push_str("[^/]*");
            }
            rest = &rest[stars..];
        } else {
            let literal = rest.find('*').map_or(rest, |end| &rest[..end]);
            out.push_str(&regex::escape(literal));
            rest = &rest[literal.len()..];
        }
    }
    out
}
