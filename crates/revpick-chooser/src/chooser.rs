//! The build chooser: from configured specs to a single revision.

use revpick_core::environment::expand;
use revpick_core::{BuildContext, EnvVars, EnvironmentError, GitClient, Revision};
use std::time::Duration;
use tracing::warn;

use crate::locator::CandidateLocator;
use crate::spec::BranchSpec;
use crate::strategy::Strategy;
use crate::{ChooserError, Result};

/// How chatty the chooser is about its decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Decisions are logged at `debug`.
    #[default]
    Quiet,
    /// Decisions are logged at `info`.
    Verbose,
}

impl Verbosity {
    pub fn is_verbose(self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Parameters of one selection.
#[derive(Default)]
pub struct SelectRequest<'a> {
    /// Polling for changes rather than checking out a build. Specs are not
    /// expanded when polling.
    pub polling: bool,
    /// Where to fetch the build environment from.
    pub context: Option<&'a dyn BuildContext>,
    /// Give up on fetching the environment after this long.
    pub env_timeout: Option<Duration>,
    pub verbosity: Verbosity,
}

/// Selects the revision to build from an ordered list of branch specs.
#[derive(Debug, Clone)]
pub struct BuildChooser {
    strategy: Strategy,
    specs: Vec<BranchSpec>,
}

impl BuildChooser {
    pub fn new(strategy: Strategy, specs: Vec<BranchSpec>) -> Self {
        Self { strategy, specs }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn specs(&self) -> &[BranchSpec] {
        &self.specs
    }

    /// Determine which revision to build, if any.
    ///
    /// `Ok(None)` means no spec matched anything; only repository failures
    /// and invalid specs are errors.
    pub async fn candidate_revision(
        &self,
        git: &dyn GitClient,
        request: &SelectRequest<'_>,
    ) -> Result<Option<Revision>> {
        let verbosity = request.verbosity;
        verbose!(verbosity, strategy = %self.strategy, specs = self.specs.len(), polling = request.polling, "Choosing revision");

        let env = self.build_environment(request).await;

        let mut branches = git
            .remote_branches()
            .await
            .map_err(ChooserError::RemoteBranches)?;
        branches.sort_by(|a, b| a.name.cmp(&b.name));

        let locator = CandidateLocator::new(git, &branches, verbosity);
        let mut candidates = Vec::new();

        for configured in &self.specs {
            let spec = BranchSpec::new(expand(configured.name(), env.as_ref()));
            verbose!(verbosity, spec = %spec, "Checking branch spec");

            let found = self.strategy.locate_candidates(&locator, &spec).await?;
            candidates.extend(found);

            if self.strategy.stops_at_first_match() && !candidates.is_empty() {
                break;
            }
        }

        verbose!(verbosity, candidates = candidates.len(), "Selecting from candidates");

        let Some(selected) = self.strategy.select(git, candidates).await? else {
            verbose!(verbosity, "No branch specs matched");
            return Ok(None);
        };

        let revision = Revision::from(selected);
        verbose!(verbosity, revision = %revision, "Selected revision");
        Ok(Some(revision))
    }

    /// The build environment, or `None` when polling or when it cannot be
    /// fetched.
    async fn build_environment(&self, request: &SelectRequest<'_>) -> Option<EnvVars> {
        if request.polling {
            return None;
        }
        let context = request.context?;

        let fetched = match request.env_timeout {
            Some(timeout) => tokio::time::timeout(timeout, context.build_environment())
                .await
                .unwrap_or(Err(EnvironmentError::Interrupted)),
            None => context.build_environment().await,
        };

        match fetched {
            Ok(env) => Some(env),
            Err(EnvironmentError::Interrupted) => {
                verbose!(request.verbosity, "Interrupted getting build variables");
                None
            }
            Err(err) => {
                warn!(error = %err, "Build variables unavailable, specs will not be expanded");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use revpick_core::memory::GitCall;
    use revpick_core::{CommitId, InMemoryGit, StaticBuildContext};

    const C1: &str = "c1c1c1c1c1";
    const C2: &str = "c2c2c2c2c2";
    const C3: &str = "c3c3c3c3c3";

    /// master at t=100, branch-1 at t=200, branch-2 at t=300.
    fn repo() -> InMemoryGit {
        InMemoryGit::new()
            .with_commit(C1, 100)
            .with_commit(C2, 200)
            .with_commit(C3, 300)
            .with_branch("origin/master", C1)
            .with_branch("origin/branch-1", C2)
            .with_branch("origin/branch-2", C3)
    }

    fn chooser(strategy: Strategy, specs: &[&str]) -> BuildChooser {
        BuildChooser::new(strategy, specs.iter().map(|s| BranchSpec::new(s)).collect())
    }

    async fn choose(git: &InMemoryGit, strategy: Strategy, specs: &[&str]) -> Option<Revision> {
        chooser(strategy, specs)
            .candidate_revision(git, &SelectRequest::default())
            .await
            .unwrap()
    }

    const BOTH: [Strategy; 2] = [Strategy::FirstMatch, Strategy::MostRecent];

    #[tokio::test]
    async fn test_nothing_matches() {
        for strategy in BOTH {
            let git = repo();
            assert_eq!(choose(&git, strategy, &["nope", "feature/*"]).await, None);
            assert_eq!(git.open_walks(), 0);
        }
    }

    #[tokio::test]
    async fn test_master_and_non_existing_branch() {
        for strategy in BOTH {
            let git = InMemoryGit::new()
                .with_commit(C1, 100)
                .with_branch("origin/master", C1);
            let revision = choose(&git, strategy, &["branch-doesnotexist", "master"])
                .await
                .unwrap();
            assert_eq!(revision.commit, CommitId::from(C1));
            assert!(revision.has_ref("master"));
        }
    }

    #[tokio::test]
    async fn test_master_and_branch() {
        let git = repo();
        let first = choose(&git, Strategy::FirstMatch, &["master", "branch-1"]).await;
        assert_eq!(first.unwrap().commit, CommitId::from(C1));

        let recent = choose(&git, Strategy::MostRecent, &["master", "branch-1"]).await;
        assert_eq!(recent.unwrap().commit, CommitId::from(C2));
    }

    #[tokio::test]
    async fn test_most_recent_across_all_branches() {
        let git = repo();
        let cases: [&[&str]; 4] = [
            &["**"],
            &["branch-*"],
            &[":^(?!origin/master$).*"],
            &["master", "branch-*"],
        ];
        for specs in cases {
            let revision = choose(&git, Strategy::MostRecent, specs).await.unwrap();
            assert_eq!(revision.commit, CommitId::from(C3), "specs {specs:?}");
        }
    }

    #[tokio::test]
    async fn test_most_recent_ignores_enumeration_order() {
        let git = InMemoryGit::new()
            .with_commit(C1, 150)
            .with_commit(C2, 300)
            .with_commit(C3, 100)
            .with_branch("origin/zeta", C1)
            .with_branch("origin/alpha", C2)
            .with_branch("origin/mid", C3);
        let revision = choose(&git, Strategy::MostRecent, &["**"]).await.unwrap();
        assert_eq!(revision.commit, CommitId::from(C2));
    }

    #[tokio::test]
    async fn test_first_match_uses_sorted_branches() {
        let git = InMemoryGit::new()
            .with_commit(C1, 100)
            .with_commit(C2, 200)
            .with_branch("origin/release-2", C2)
            .with_branch("origin/release-1", C1);
        let revision = choose(&git, Strategy::FirstMatch, &["release-*"]).await.unwrap();
        assert_eq!(revision.refs[0].name, "origin/release-1");
    }

    #[tokio::test]
    async fn test_first_match_never_consults_later_specs() {
        let git = repo();
        let revision = choose(&git, Strategy::FirstMatch, &["missing", "branch-1", "master"])
            .await
            .unwrap();
        assert_eq!(revision.commit, CommitId::from(C2));
        assert_eq!(
            git.calls(),
            vec![
                GitCall::RemoteBranches,
                GitCall::TagNames("missing".to_string()),
                GitCall::TagNames("branch-1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_most_recent_consults_every_spec() {
        let git = repo();
        choose(&git, Strategy::MostRecent, &["master", "branch-1"]).await;
        let calls = git.calls();
        assert!(calls.contains(&GitCall::TagNames("master".to_string())));
        assert!(calls.contains(&GitCall::TagNames("branch-1".to_string())));
        assert_eq!(calls.iter().filter(|c| **c == GitCall::CommitWalk).count(), 1);
        assert_eq!(git.open_walks(), 0);
    }

    #[tokio::test]
    async fn test_tie_goes_to_first_spec() {
        let git = InMemoryGit::new()
            .with_commit(C1, 200)
            .with_commit(C2, 200)
            .with_branch("origin/a", C1)
            .with_branch("origin/b", C2);
        let revision = choose(&git, Strategy::MostRecent, &["b", "a"]).await.unwrap();
        assert_eq!(revision.commit, CommitId::from(C2));
    }

    #[tokio::test]
    async fn test_same_commit_from_two_specs_stays_separate() {
        let git = repo();
        let revision = choose(&git, Strategy::MostRecent, &["branch-2", "origin/branch-2"])
            .await
            .unwrap();
        assert_eq!(revision.commit, CommitId::from(C3));
        assert_eq!(revision.refs.len(), 1);
    }

    #[tokio::test]
    async fn test_sha_spec_before_branches() {
        for strategy in BOTH {
            let git = repo();
            let revision = choose(&git, strategy, &[C2]).await.unwrap();
            assert_eq!(revision.commit, CommitId::from(C2));
            assert!(revision.has_ref("detached"));
        }
    }

    #[tokio::test]
    async fn test_tag_spec() {
        let git = repo().with_tag("v1.0", C1);
        let revision = choose(&git, Strategy::MostRecent, &["v1.0", "branch-1"]).await.unwrap();
        assert_eq!(revision.commit, CommitId::from(C2));

        let revision = choose(&git, Strategy::FirstMatch, &["v1.0", "branch-1"]).await.unwrap();
        assert_eq!(revision.commit, CommitId::from(C1));
        assert!(revision.has_ref("v1.0"));
    }

    #[tokio::test]
    async fn test_dangling_branch_is_dropped() {
        let git = repo().with_branch("origin/ghost", "0000000000");
        let revision = choose(&git, Strategy::MostRecent, &["ghost", "master"]).await.unwrap();
        assert_eq!(revision.commit, CommitId::from(C1));

        let git = InMemoryGit::new().with_branch("origin/ghost", "0000000000");
        assert_eq!(choose(&git, Strategy::MostRecent, &["ghost"]).await, None);
    }

    #[tokio::test]
    async fn test_environment_expansion() {
        let git = repo().with_branch("origin/branch-exist", C3);
        let env: EnvVars = [("VAR_BRANCH", "exist")].into_iter().collect();
        let context = StaticBuildContext::Available(env);
        let chooser = chooser(Strategy::FirstMatch, &["branch-${VAR_BRANCH}"]);

        let request = SelectRequest {
            context: Some(&context),
            ..Default::default()
        };
        let revision = chooser.candidate_revision(&git, &request).await.unwrap();
        assert!(revision.unwrap().has_ref("branch-exist"));

        let polling = SelectRequest {
            polling: true,
            context: Some(&context),
            ..Default::default()
        };
        assert_eq!(chooser.candidate_revision(&git, &polling).await.unwrap(), None);
        assert!(git.calls().contains(&GitCall::TagNames("branch-exist".to_string())));
    }

    #[tokio::test]
    async fn test_interrupted_environment_degrades_to_polling() {
        let git = repo().with_branch("origin/branch-${VAR_BRANCH}", C2);
        let context = StaticBuildContext::Interrupted;
        let request = SelectRequest {
            context: Some(&context),
            verbosity: Verbosity::Verbose,
            ..Default::default()
        };
        let revision = chooser(Strategy::FirstMatch, &["branch-${VAR_BRANCH}"])
            .candidate_revision(&git, &request)
            .await
            .unwrap();
        assert_eq!(revision.unwrap().commit, CommitId::from(C2));
    }

    struct NeverReady;

    #[async_trait]
    impl BuildContext for NeverReady {
        async fn build_environment(&self) -> std::result::Result<EnvVars, EnvironmentError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_environment_timeout_degrades_to_polling() {
        let git = repo();
        let request = SelectRequest {
            context: Some(&NeverReady),
            env_timeout: Some(Duration::from_millis(10)),
            ..Default::default()
        };
        let revision = chooser(Strategy::FirstMatch, &["master"])
            .candidate_revision(&git, &request)
            .await
            .unwrap();
        assert_eq!(revision.unwrap().commit, CommitId::from(C1));
    }

    #[tokio::test]
    async fn test_repository_unavailable_is_an_error() {
        let git = repo().unavailable();
        let result = chooser(Strategy::MostRecent, &["master"])
            .candidate_revision(&git, &SelectRequest::default())
            .await;
        assert!(matches!(result, Err(ChooserError::RemoteBranches(_))));
    }

    #[tokio::test]
    async fn test_lookup_failure_carries_spec() {
        let git = repo().with_failing_lookup(C2);
        let result = chooser(Strategy::FirstMatch, &[C2])
            .candidate_revision(&git, &SelectRequest::default())
            .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains(C2));
    }

    #[tokio::test]
    async fn test_invalid_regex_spec_is_an_error() {
        let git = repo();
        let result = chooser(Strategy::FirstMatch, &[":(oops"])
            .candidate_revision(&git, &SelectRequest::default())
            .await;
        assert!(matches!(result, Err(ChooserError::InvalidSpec { .. })));
    }
}
