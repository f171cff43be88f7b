//! Selection strategies.

use chrono::{DateTime, Utc};
use revpick_core::{Candidate, GitClient};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::locator::{CandidateLocator, LocateMode};
use crate::spec::BranchSpec;
use crate::{ChooserError, Result};

/// How a single revision is picked from the configured specs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Specs are alternatives: the first spec that finds anything wins.
    #[default]
    FirstMatch,
    /// Every spec is evaluated and the most recently committed candidate
    /// wins.
    MostRecent,
}

impl Strategy {
    /// Whether evaluation stops at the first spec yielding a candidate.
    pub fn stops_at_first_match(self) -> bool {
        matches!(self, Strategy::FirstMatch)
    }

    /// Candidates for one spec under this strategy.
    pub async fn locate_candidates(
        self,
        locator: &CandidateLocator<'_>,
        spec: &BranchSpec,
    ) -> Result<Vec<Candidate>> {
        let mode = match self {
            Strategy::FirstMatch => LocateMode::FirstOnly,
            Strategy::MostRecent => LocateMode::All,
        };
        locator.locate(spec, mode).await
    }

    /// Pick one candidate out of everything the specs produced, in
    /// accumulation order.
    pub async fn select(
        self,
        git: &dyn GitClient,
        candidates: Vec<Candidate>,
    ) -> Result<Option<Candidate>> {
        match self {
            Strategy::FirstMatch => Ok(candidates.into_iter().next()),
            Strategy::MostRecent => latest(git, candidates).await,
        }
    }
}

/// The candidate with the newest commit time. Ties keep the earliest
/// candidate; candidates whose commit cannot be loaded are dropped.
async fn latest(git: &dyn GitClient, candidates: Vec<Candidate>) -> Result<Option<Candidate>> {
    if candidates.is_empty() {
        return Ok(None);
    }

    let mut walk = git.commit_walk().await.map_err(ChooserError::OpenWalk)?;
    let mut latest: Option<(Candidate, DateTime<Utc>)> = None;

    for candidate in candidates {
        let time = walk
            .commit_time(candidate.commit())
            .await
            .map_err(|source| ChooserError::CommitWalk {
                commit: candidate.commit().clone(),
                source,
            })?;

        let Some(time) = time else {
            debug!(commit = %candidate.commit(), "Dropping candidate with missing commit");
            continue;
        };

        if latest.as_ref().is_none_or(|(_, best)| time > *best) {
            latest = Some((candidate, time));
        }
    }

    Ok(latest.map(|(candidate, _)| candidate))
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::FirstMatch => write!(f, "first-match"),
            Strategy::MostRecent => write!(f, "most-recent"),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first-match" | "alternative" | "default" => Ok(Strategy::FirstMatch),
            "most-recent" | "most-recent-commit" => Ok(Strategy::MostRecent),
            _ => Err(format!("Unknown chooser strategy: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revpick_core::{CommitId, InMemoryGit, NamedRef};

    fn candidate(name: &str, commit: &str) -> Candidate {
        Candidate::new(NamedRef::new(name, CommitId::from(commit)))
    }

    fn repo() -> InMemoryGit {
        InMemoryGit::new()
            .with_commit("c100", 100)
            .with_commit("c150", 150)
            .with_commit("c300", 300)
            .with_commit("c300b", 300)
    }

    #[tokio::test]
    async fn test_first_match_takes_first() {
        let git = repo();
        let picked = Strategy::FirstMatch
            .select(&git, vec![candidate("a", "c100"), candidate("b", "c300")])
            .await
            .unwrap();
        assert_eq!(picked.unwrap().commit(), &CommitId::from("c100"));
        assert_eq!(git.open_walks(), 0);
    }

    #[tokio::test]
    async fn test_most_recent_takes_newest() {
        let git = repo();
        let picked = Strategy::MostRecent
            .select(
                &git,
                vec![
                    candidate("a", "c150"),
                    candidate("b", "c300"),
                    candidate("c", "c100"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(picked.unwrap().commit(), &CommitId::from("c300"));
        assert_eq!(git.open_walks(), 0);
    }

    #[tokio::test]
    async fn test_most_recent_tie_keeps_earliest() {
        let git = repo();
        let picked = Strategy::MostRecent
            .select(&git, vec![candidate("b", "c300b"), candidate("a", "c300")])
            .await
            .unwrap();
        assert_eq!(picked.unwrap().commit(), &CommitId::from("c300b"));
    }

    #[tokio::test]
    async fn test_most_recent_drops_dangling() {
        let git = repo();
        let picked = Strategy::MostRecent
            .select(&git, vec![candidate("gone", "dangling"), candidate("a", "c100")])
            .await
            .unwrap();
        assert_eq!(picked.unwrap().commit(), &CommitId::from("c100"));

        let picked = Strategy::MostRecent
            .select(&git, vec![candidate("gone", "dangling")])
            .await
            .unwrap();
        assert!(picked.is_none());
    }

    #[tokio::test]
    async fn test_most_recent_empty_opens_no_walk() {
        let git = repo();
        let picked = Strategy::MostRecent.select(&git, Vec::new()).await.unwrap();
        assert!(picked.is_none());
        assert!(git.calls().is_empty());
    }

    #[tokio::test]
    async fn test_walk_released_on_error() {
        let git = repo().with_failing_lookup("c150");
        let result = Strategy::MostRecent
            .select(&git, vec![candidate("a", "c100"), candidate("b", "c150")])
            .await;
        assert!(matches!(result, Err(ChooserError::CommitWalk { .. })));
        assert_eq!(git.open_walks(), 0);
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("first-match".parse::<Strategy>().unwrap(), Strategy::FirstMatch);
        assert_eq!("Alternative".parse::<Strategy>().unwrap(), Strategy::FirstMatch);
        assert_eq!("default".parse::<Strategy>().unwrap(), Strategy::FirstMatch);
        assert_eq!("most-recent".parse::<Strategy>().unwrap(), Strategy::MostRecent);
        assert!("newest".parse::<Strategy>().is_err());
        assert_eq!(Strategy::MostRecent.to_string(), "most-recent");
    }
}
