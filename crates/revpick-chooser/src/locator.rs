//! Turning one spec into candidate revisions.
//!
//! Lookups happen in a fixed order: the spec as a commit id, then as a tag
//! name, then as a branch pattern against the remote branch snapshot.

use revpick_core::{Candidate, GitClient, NamedRef, RemoteBranch};

use crate::spec::{BranchSpec, SpecKind};
use crate::{ChooserError, Result, Verbosity};

/// How many candidates a lookup should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateMode {
    /// Stop at the first lookup that finds anything and keep only its first
    /// result.
    FirstOnly,
    /// Run every lookup and keep every result.
    All,
}

/// Finds candidates for specs against one repository snapshot.
pub struct CandidateLocator<'a> {
    git: &'a dyn GitClient,
    branches: &'a [RemoteBranch],
    verbosity: Verbosity,
}

impl<'a> CandidateLocator<'a> {
    pub fn new(git: &'a dyn GitClient, branches: &'a [RemoteBranch], verbosity: Verbosity) -> Self {
        Self {
            git,
            branches,
            verbosity,
        }
    }

    /// Candidates for `spec`, in lookup order.
    ///
    /// Refs pointing at the same commit are merged into one candidate.
    pub async fn locate(&self, spec: &BranchSpec, mode: LocateMode) -> Result<Vec<Candidate>> {
        let mut found = Vec::new();

        match spec.kind() {
            SpecKind::ShaLike => self.by_commit(spec, &mut found).await?,
            _ if spec.is_plain_name() => self.by_tag(spec, mode, &mut found).await?,
            _ => {}
        }

        if mode == LocateMode::FirstOnly && !found.is_empty() {
            return Ok(found);
        }

        self.by_branch(spec, mode, &mut found)?;
        Ok(found)
    }

    async fn by_commit(&self, spec: &BranchSpec, found: &mut Vec<Candidate>) -> Result<()> {
        let resolved = self
            .git
            .rev_parse(spec.name())
            .await
            .map_err(ChooserError::git(spec.name()))?;

        // Not every hex-looking name is a commit; fall through to branches.
        if let Some(commit) = resolved {
            verbose!(self.verbosity, spec = %spec, commit = %commit, "Found candidate commit");
            add_candidate(found, NamedRef::detached(commit));
        }
        Ok(())
    }

    async fn by_tag(&self, spec: &BranchSpec, mode: LocateMode, found: &mut Vec<Candidate>) -> Result<()> {
        let tags = self
            .git
            .tag_names(spec.name())
            .await
            .map_err(ChooserError::git(spec.name()))?;

        let take = match mode {
            LocateMode::FirstOnly => 1,
            LocateMode::All => usize::MAX,
        };

        for tag in tags.into_iter().take(take) {
            let resolved = self
                .git
                .rev_parse(&tag)
                .await
                .map_err(ChooserError::git(spec.name()))?;

            match resolved {
                Some(commit) => {
                    verbose!(self.verbosity, spec = %spec, tag = %tag, commit = %commit, "Found candidate tag");
                    add_candidate(found, NamedRef::new(spec.name(), commit));
                }
                None => {
                    verbose!(self.verbosity, spec = %spec, tag = %tag, "Tag does not resolve to a commit");
                }
            }
        }
        Ok(())
    }

    fn by_branch(&self, spec: &BranchSpec, mode: LocateMode, found: &mut Vec<Candidate>) -> Result<()> {
        let matching = spec.filter_matching(self.branches, |b| b.name.as_str())?;

        let take = match mode {
            LocateMode::FirstOnly => 1,
            LocateMode::All => usize::MAX,
        };

        for branch in matching.into_iter().take(take) {
            verbose!(self.verbosity, spec = %spec, branch = %branch.name, commit = %branch.commit, "Found candidate branch");
            add_candidate(found, NamedRef::new(&branch.name, branch.commit.clone()));
        }
        Ok(())
    }
}

fn add_candidate(found: &mut Vec<Candidate>, named: NamedRef) {
    match found.iter_mut().find(|c| c.commit() == &named.commit) {
        Some(existing) => existing.add_ref(named),
        None => found.push(Candidate::new(named)),
    }
}
