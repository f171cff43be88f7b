//! Chooser configuration parsing.
//!
//! ```kdl
//! chooser "most-recent"
//! repository "." remote="origin"
//! branches {
//!     spec "master"
//!     spec "branch-*"
//! }
//! env {
//!     VAR_BRANCH "exist"
//! }
//! ```

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use revpick_chooser::{BranchSpec, BuildChooser, Strategy};
use revpick_core::EnvVars;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything needed to run a chooser against a repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChooserConfig {
    /// Selection strategy.
    pub strategy: Strategy,
    /// Branch specs, in priority order.
    pub specs: Vec<BranchSpec>,
    /// Local repository to query.
    pub repository: Option<RepositoryConfig>,
    /// Build variables used to expand specs outside of polling.
    pub env: EnvVars,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Path to the working copy.
    pub path: String,
    /// Only consider branches of this remote.
    pub remote: Option<String>,
}

impl ChooserConfig {
    /// Build a chooser from this configuration.
    pub fn build_chooser(&self) -> BuildChooser {
        BuildChooser::new(self.strategy, self.specs.clone())
    }
}

/// Read and parse a chooser configuration file.
pub fn load_chooser_config(path: impl AsRef<Path>) -> ConfigResult<ChooserConfig> {
    let text = std::fs::read_to_string(path)?;
    parse_chooser_config(&text)
}

/// Parse a chooser configuration from KDL text.
pub fn parse_chooser_config(kdl: &str) -> ConfigResult<ChooserConfig> {
    let doc: KdlDocument = kdl.parse()?;

    let mut strategy = None;
    let mut specs = Vec::new();
    let mut repository = None;
    let mut env = EnvVars::new();

    for node in doc.nodes() {
        match node.name().value() {
            "chooser" => {
                if strategy.is_some() {
                    return Err(ConfigError::Duplicate("chooser".to_string()));
                }
                strategy = Some(parse_strategy(node)?);
            }
            "repository" => {
                if repository.is_some() {
                    return Err(ConfigError::Duplicate("repository".to_string()));
                }
                repository = Some(parse_repository(node)?);
            }
            "branches" => {
                specs.extend(parse_branches(node)?);
            }
            "env" => {
                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        let key = child.name().value().to_string();
                        if let Some(val) = get_first_string_arg(child) {
                            env.insert(key, val);
                        }
                    }
                }
            }
            _ => {} // Ignore unknown nodes
        }
    }

    if specs.is_empty() {
        specs.push(BranchSpec::new("**"));
    }

    Ok(ChooserConfig {
        strategy: strategy.unwrap_or_default(),
        specs,
        repository,
        env,
    })
}

fn parse_strategy(node: &KdlNode) -> ConfigResult<Strategy> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("chooser strategy".to_string()))?;

    name.parse().map_err(|message| ConfigError::InvalidValue {
        field: "chooser".to_string(),
        message,
    })
}

fn parse_repository(node: &KdlNode) -> ConfigResult<RepositoryConfig> {
    let path = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("repository path".to_string()))?;

    Ok(RepositoryConfig {
        path,
        remote: get_string_prop(node, "remote"),
    })
}

fn parse_branches(node: &KdlNode) -> ConfigResult<Vec<BranchSpec>> {
    // Both `branches "a" "b"` and a block of `spec "a"` children
    let mut names = get_all_string_args(node);
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "spec" => names.extend(get_all_string_args(child)),
                other => {
                    return Err(ConfigError::InvalidValue {
                        field: "branches".to_string(),
                        message: format!("unexpected node '{}'", other),
                    });
                }
            }
        }
    }

    names
        .into_iter()
        .map(|name| {
            let spec = BranchSpec::new(name);
            spec.validate()
                .map(|_| spec)
                .map_err(|e| ConfigError::InvalidValue {
                    field: "branch spec".to_string(),
                    message: e.to_string(),
                })
        })
        .collect()
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}
