//! Commit identifiers, named refs and the revisions built from them.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A full commit object id as reported by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First seven characters, for log output.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl From<&str> for CommitId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CommitId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A name that justified picking a commit: a remote branch, a tag alias or
/// the synthetic `detached` ref for raw commit specs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
    pub commit: CommitId,
}

impl NamedRef {
    /// Name used for candidates found by resolving a commit id directly.
    pub const DETACHED: &'static str = "detached";

    pub fn new(name: impl Into<String>, commit: CommitId) -> Self {
        Self {
            name: name.into(),
            commit,
        }
    }

    pub fn detached(commit: CommitId) -> Self {
        Self::new(Self::DETACHED, commit)
    }

    /// The name with any `refs/heads/`, `refs/remotes/<remote>/`,
    /// `remotes/<remote>/` or `<remote>/` prefix removed.
    pub fn short_name(&self) -> &str {
        let name = self.name.as_str();
        if let Some(rest) = name.strip_prefix("refs/heads/") {
            return rest;
        }
        let remote_qualified = name
            .strip_prefix("refs/remotes/")
            .or_else(|| name.strip_prefix("remotes/"))
            .unwrap_or(name);
        remote_qualified
            .split_once('/')
            .map(|(_, branch)| branch)
            .unwrap_or(remote_qualified)
    }
}

impl std::fmt::Display for NamedRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.commit.short())
    }
}

/// A commit proposed by a single spec, with the refs that point at it.
///
/// A candidate is always created from at least one ref, so `refs` is never
/// empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    commit: CommitId,
    refs: Vec<NamedRef>,
}

impl Candidate {
    pub fn new(named: NamedRef) -> Self {
        Self {
            commit: named.commit.clone(),
            refs: vec![named],
        }
    }

    pub fn commit(&self) -> &CommitId {
        &self.commit
    }

    pub fn refs(&self) -> &[NamedRef] {
        &self.refs
    }

    /// Add another ref pointing at the same commit. Duplicate names are
    /// ignored.
    pub fn add_ref(&mut self, named: NamedRef) {
        debug_assert_eq!(named.commit, self.commit);
        if !self.refs.iter().any(|r| r.name == named.name) {
            self.refs.push(named);
        }
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.refs.iter().map(|r| r.name.as_str()).collect();
        write!(f, "{} ({})", self.commit, names.join(", "))
    }
}

/// The revision selected for a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub commit: CommitId,
    pub refs: Vec<NamedRef>,
}

impl Revision {
    /// Check whether any ref of this revision has the given short name.
    pub fn has_ref(&self, short_name: &str) -> bool {
        self.refs.iter().any(|r| r.short_name() == short_name)
    }
}

impl From<Candidate> for Revision {
    fn from(candidate: Candidate) -> Self {
        Self {
            commit: candidate.commit,
            refs: candidate.refs,
        }
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.refs.iter().map(|r| r.name.as_str()).collect();
        write!(f, "{} ({})", self.commit, names.join(", "))
    }
}
