//! Repository query capabilities supplied by a version-control client.
//!
//! The chooser never fetches or checks out anything itself. It asks a
//! [`GitClient`] for the remote branches, tags and commits it needs and
//! treats a missing ref as an ordinary miss rather than an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{CommitId, Result};

/// A remote-tracking branch as reported by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBranch {
    /// Remote-qualified name, e.g. `origin/master`.
    pub name: String,
    /// Commit the branch points at.
    pub commit: CommitId,
}

impl RemoteBranch {
    pub fn new(name: impl Into<String>, commit: impl Into<CommitId>) -> Self {
        Self {
            name: name.into(),
            commit: commit.into(),
        }
    }
}

/// Read access to a repository.
///
/// Errors returned from these methods mean the repository could not be
/// queried at all. A ref or commit that simply does not exist is reported
/// as `Ok(None)` or an empty collection.
#[async_trait]
pub trait GitClient: Send + Sync {
    /// List all remote-tracking branches.
    async fn remote_branches(&self) -> Result<Vec<RemoteBranch>>;

    /// List tag names matching `filter`.
    async fn tag_names(&self, filter: &str) -> Result<BTreeSet<String>>;

    /// Resolve a revision expression (commit id, tag, branch) to a commit.
    async fn rev_parse(&self, rev: &str) -> Result<Option<CommitId>>;

    /// Open a history traversal context for commit metadata lookups.
    ///
    /// The returned walk holds whatever resources the client needs and
    /// releases them when dropped.
    async fn commit_walk<'a>(&'a self) -> Result<Box<dyn CommitWalk + 'a>>;
}

/// A scoped commit metadata reader.
#[async_trait]
pub trait CommitWalk: Send {
    /// Commit timestamp of `commit`, or `None` if the object is missing or
    /// is not a commit.
    async fn commit_time(&mut self, commit: &CommitId) -> Result<Option<DateTime<Utc>>>;
}
