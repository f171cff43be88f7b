//! Error types for git collaborators.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    #[error("git command failed: {0}")]
    CommandFailed(String),

    #[error("unexpected git output: {0}")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
