//! Build environment lookup and variable expansion.
//!
//! Specs may reference build variables like `${BRANCH}` or `$BRANCH`.
//! Expansion is a plain text substitution: variables missing from the
//! environment expand to the empty string.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

// Regex for matching ${NAME} and $NAME references
static VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap()
});

/// Environment variables of a running build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvVars(BTreeMap<String, String>);

impl EnvVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment.
    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge `other` into this environment, overriding existing keys.
    pub fn extend(&mut self, other: EnvVars) {
        self.0.extend(other.0);
    }

    /// Substitute every variable reference in `input`.
    pub fn expand(&self, input: &str) -> String {
        VAR_REGEX
            .replace_all(input, |caps: &regex::Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                self.get(name).unwrap_or_default().to_string()
            })
            .into_owned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Expand `input` against `env`, or return it unchanged when no environment
/// is available (polling).
pub fn expand(input: &str, env: Option<&EnvVars>) -> String {
    match env {
        Some(env) => env.expand(input),
        None => input.to_string(),
    }
}

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("interrupted while fetching build environment")]
    Interrupted,

    #[error("build environment unavailable: {0}")]
    Unavailable(String),
}

/// Source of the environment of the build being checked out.
#[async_trait]
pub trait BuildContext: Send + Sync {
    async fn build_environment(&self) -> Result<EnvVars, EnvironmentError>;
}

/// A build context with a fixed answer.
#[derive(Debug, Clone)]
pub enum StaticBuildContext {
    Available(EnvVars),
    Interrupted,
}

#[async_trait]
impl BuildContext for StaticBuildContext {
    async fn build_environment(&self) -> Result<EnvVars, EnvironmentError> {
        match self {
            StaticBuildContext::Available(env) => Ok(env.clone()),
            StaticBuildContext::Interrupted => Err(EnvironmentError::Interrupted),
        }
    }
}
