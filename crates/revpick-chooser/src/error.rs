//! Chooser errors.
//!
//! Only failures to query the repository and specs that do not compile are
//! errors. A spec that matches nothing is not.

use revpick_core::CommitId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChooserError {
    #[error("failed to list remote branches: {0}")]
    RemoteBranches(#[source] revpick_core::Error),

    #[error("git query failed for spec '{spec}': {source}")]
    Git {
        spec: String,
        #[source]
        source: revpick_core::Error,
    },

    #[error("failed to read commit metadata for {commit}: {source}")]
    CommitWalk {
        commit: CommitId,
        #[source]
        source: revpick_core::Error,
    },

    #[error("failed to open commit walk: {0}")]
    OpenWalk(#[source] revpick_core::Error),

    #[error("invalid branch spec '{spec}': {message}")]
    InvalidSpec { spec: String, message: String },
}

impl ChooserError {
    pub(crate) fn git(spec: &str) -> impl FnOnce(revpick_core::Error) -> Self + '_ {
        move |source| ChooserError::Git {
            spec: spec.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChooserError>;
