//! In-memory git client for testing and dry runs.
//!
//! [`InMemoryGit`] serves a fixed set of remote branches, tags and commit
//! timestamps. Every query is recorded so tests can assert which lookups a
//! chooser performed and in what order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::repository::{CommitWalk, GitClient, RemoteBranch};
use crate::{CommitId, Error, Result};

/// A query made against an [`InMemoryGit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    RemoteBranches,
    TagNames(String),
    RevParse(String),
    CommitWalk,
    CommitTime(CommitId),
}

/// An in-memory implementation of [`GitClient`].
#[derive(Debug, Default)]
pub struct InMemoryGit {
    branches: Vec<RemoteBranch>,
    tags: BTreeMap<String, CommitId>,
    commits: BTreeMap<CommitId, DateTime<Utc>>,
    failing: HashSet<String>,
    unavailable: bool,
    calls: Mutex<Vec<GitCall>>,
    open_walks: Arc<AtomicUsize>,
}

impl InMemoryGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a commit with its commit time in seconds since the epoch.
    pub fn with_commit(mut self, commit: &str, timestamp: i64) -> Self {
        let time = DateTime::from_timestamp(timestamp, 0).unwrap_or_default();
        self.commits.insert(CommitId::from(commit), time);
        self
    }

    /// Add a remote branch. The commit does not have to be known, which
    /// models a dangling ref.
    pub fn with_branch(mut self, name: &str, commit: &str) -> Self {
        self.branches.push(RemoteBranch::new(name, commit));
        self
    }

    pub fn with_tag(mut self, name: &str, commit: &str) -> Self {
        self.tags.insert(name.to_string(), CommitId::from(commit));
        self
    }

    /// Make `rev_parse` of this exact string, and commit time lookups of
    /// this commit id, fail with a transport error.
    pub fn with_failing_lookup(mut self, rev: &str) -> Self {
        self.failing.insert(rev.to_string());
        self
    }

    /// Make every query fail as if the repository could not be reached.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// All queries made so far, in order.
    pub fn calls(&self) -> Vec<GitCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of commit walks currently open.
    pub fn open_walks(&self) -> usize {
        self.open_walks.load(Ordering::SeqCst)
    }

    fn record(&self, call: GitCall) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if self.unavailable {
            return Err(Error::Unavailable("in-memory repository offline".to_string()));
        }
        Ok(())
    }

    fn resolve(&self, rev: &str) -> Option<CommitId> {
        let exact = CommitId::from(rev);
        if self.commits.contains_key(&exact) {
            return Some(exact);
        }
        if rev.len() >= 4 {
            let mut matches = self
                .commits
                .keys()
                .filter(|id| id.as_str().starts_with(rev));
            if let (Some(id), None) = (matches.next(), matches.next()) {
                return Some(id.clone());
            }
        }
        if let Some(id) = self.tags.get(rev) {
            return Some(id.clone());
        }
        self.branches
            .iter()
            .find(|b| b.name == rev)
            .map(|b| b.commit.clone())
    }
}

#[async_trait]
impl GitClient for InMemoryGit {
    async fn remote_branches(&self) -> Result<Vec<RemoteBranch>> {
        self.record(GitCall::RemoteBranches)?;
        Ok(self.branches.clone())
    }

    async fn tag_names(&self, filter: &str) -> Result<BTreeSet<String>> {
        self.record(GitCall::TagNames(filter.to_string()))?;
        Ok(self
            .tags
            .keys()
            .filter(|name| name.as_str() == filter)
            .cloned()
            .collect())
    }

    async fn rev_parse(&self, rev: &str) -> Result<Option<CommitId>> {
        self.record(GitCall::RevParse(rev.to_string()))?;
        if self.failing.contains(rev) {
            return Err(Error::CommandFailed(format!("rev-parse {rev}")));
        }
        Ok(self.resolve(rev))
    }

    async fn commit_walk<'a>(&'a self) -> Result<Box<dyn CommitWalk + 'a>> {
        self.record(GitCall::CommitWalk)?;
        self.open_walks.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryWalk {
            git: self,
            open_walks: Arc::clone(&self.open_walks),
        }))
    }
}

struct InMemoryWalk<'a> {
    git: &'a InMemoryGit,
    open_walks: Arc<AtomicUsize>,
}

#[async_trait]
impl<'a> CommitWalk for InMemoryWalk<'a> {
    async fn commit_time(&mut self, commit: &CommitId) -> Result<Option<DateTime<Utc>>> {
        self.git.record(GitCall::CommitTime(commit.clone()))?;
        if self.git.failing.contains(commit.as_str()) {
            return Err(Error::CommandFailed(format!("cat-file {commit}")));
        }
        Ok(self.git.commits.get(commit).copied())
    }
}

impl Drop for InMemoryWalk<'_> {
    fn drop(&mut self) {
        self.open_walks.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> InMemoryGit {
        InMemoryGit::new()
            .with_commit("aaaaaaa111", 100)
            .with_commit("bbbbbbb222", 200)
            .with_branch("origin/master", "aaaaaaa111")
            .with_tag("v1", "bbbbbbb222")
    }

    #[tokio::test]
    async fn test_rev_parse() {
        let git = repo();
        assert_eq!(
            git.rev_parse("aaaaaaa111").await.unwrap(),
            Some(CommitId::from("aaaaaaa111"))
        );
        assert_eq!(
            git.rev_parse("bbbbbb").await.unwrap(),
            Some(CommitId::from("bbbbbbb222"))
        );
        assert_eq!(
            git.rev_parse("v1").await.unwrap(),
            Some(CommitId::from("bbbbbbb222"))
        );
        assert_eq!(git.rev_parse("cafebabe").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_walk_is_released_on_drop() {
        let git = repo();
        {
            let mut walk = git.commit_walk().await.unwrap();
            assert_eq!(git.open_walks(), 1);
            let time = walk.commit_time(&CommitId::from("bbbbbbb222")).await.unwrap();
            assert_eq!(time.map(|t| t.timestamp()), Some(200));
            assert_eq!(walk.commit_time(&CommitId::from("missing")).await.unwrap(), None);
        }
        assert_eq!(git.open_walks(), 0);
    }

    #[tokio::test]
    async fn test_records_calls() {
        let git = repo();
        git.remote_branches().await.unwrap();
        git.tag_names("v1").await.unwrap();
        assert_eq!(
            git.calls(),
            vec![GitCall::RemoteBranches, GitCall::TagNames("v1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unavailable() {
        let git = repo().unavailable();
        assert!(matches!(
            git.remote_branches().await,
            Err(Error::Unavailable(_))
        ));
    }
}
