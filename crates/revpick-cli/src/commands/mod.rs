//! CLI command implementations.

pub mod select;

use anyhow::{Context, Result};
use revpick_chooser::{BranchSpec, SpecKind};
use std::path::Path;

pub fn match_branches(spec: &str, branches: &[String]) -> Result<()> {
    let spec = BranchSpec::new(spec);
    println!("Spec: {} ({})", spec, describe_kind(&spec));

    for branch in branches {
        let status = if spec.matches(branch)? {
            "✓ matches"
        } else {
            "✗ no match"
        };
        println!("  {} - {}", branch, status);
    }
    Ok(())
}

fn describe_kind(spec: &BranchSpec) -> &'static str {
    match spec.kind() {
        SpecKind::ShaLike => "commit id, then branch pattern",
        SpecKind::Regex => "regular expression",
        SpecKind::Literal if spec.is_plain_name() => "tag name, then branch pattern",
        SpecKind::Literal => "branch pattern",
    }
}

pub fn validate(path: &Path) -> Result<()> {
    let config = revpick_config::load_chooser_config(path)
        .with_context(|| format!("Invalid configuration: {}", path.display()))?;

    println!("Configuration is valid");
    println!("  Strategy: {}", config.strategy);
    println!("  Specs:");
    for spec in &config.specs {
        println!("    {} ({})", spec, describe_kind(spec));
    }
    if let Some(repo) = &config.repository {
        match &repo.remote {
            Some(remote) => println!("  Repository: {} (remote {})", repo.path, remote),
            None => println!("  Repository: {}", repo.path),
        }
    }
    if !config.env.is_empty() {
        println!("  Build variables: {}", config.env.len());
    }
    Ok(())
}
