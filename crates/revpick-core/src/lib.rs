//! Core domain types and collaborator traits for revpick.
//!
//! This crate contains:
//! - Commit identifiers, named refs, candidates and revisions
//! - The `GitClient` and `CommitWalk` traits the chooser queries
//! - Build environment lookup and `${VAR}` expansion
//! - An in-memory git client for tests and dry runs

pub mod environment;
pub mod error;
pub mod memory;
pub mod repository;
pub mod revision;

pub use environment::{BuildContext, EnvVars, EnvironmentError, StaticBuildContext};
pub use error::{Error, Result};
pub use memory::{GitCall, InMemoryGit};
pub use repository::{CommitWalk, GitClient, RemoteBranch};
pub use revision::{Candidate, CommitId, NamedRef, Revision};
