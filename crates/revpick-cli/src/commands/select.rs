//! Revision selection against a local repository.

use anyhow::{Context, Result};
use clap::Args;
use revpick_chooser::{BranchSpec, SelectRequest, Strategy, Verbosity};
use revpick_config::{ChooserConfig, load_chooser_config};
use revpick_core::{EnvVars, StaticBuildContext};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::git::GitCli;

const DEFAULT_CONFIG: &str = "revpick.kdl";

#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Chooser configuration file
    #[arg(long, env = "REVPICK_CONFIG")]
    config: Option<PathBuf>,

    /// Repository working copy (overrides the config file)
    #[arg(long)]
    repo: Option<PathBuf>,

    /// Only consider branches of this remote
    #[arg(long)]
    remote: Option<String>,

    /// Selection strategy: first-match or most-recent
    #[arg(long)]
    strategy: Option<Strategy>,

    /// Branch spec; repeat to give alternatives (overrides the config file)
    #[arg(long = "spec")]
    specs: Vec<String>,

    /// Polling for changes: do not expand build variables
    #[arg(long)]
    poll: bool,

    /// Build variable, KEY=VALUE
    #[arg(long = "env", value_parser = parse_key_value)]
    env: Vec<(String, String)>,

    /// Also expose the process environment as build variables
    #[arg(long)]
    inherit_env: bool,

    /// Give up fetching build variables after this many milliseconds
    #[arg(long)]
    env_timeout_ms: Option<u64>,

    /// Print the selected revision as JSON
    #[arg(long)]
    json: bool,
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))
}

pub async fn run(args: SelectArgs, verbose: bool) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, args.strategy, &args.specs);

    let chooser = config.build_chooser();
    for spec in chooser.specs() {
        spec.validate()?;
    }

    let repo_config = config.repository.as_ref();
    let repo_path = args
        .repo
        .or_else(|| repo_config.map(|r| PathBuf::from(&r.path)))
        .unwrap_or_else(|| PathBuf::from("."));
    let remote = args.remote.or_else(|| repo_config.and_then(|r| r.remote.clone()));
    let git = GitCli::new(repo_path, remote);

    let mut env = if args.inherit_env {
        EnvVars::from_process()
    } else {
        EnvVars::new()
    };
    env.extend(config.env.clone());
    env.extend(args.env.into_iter().collect());
    let context = StaticBuildContext::Available(env);

    let request = SelectRequest {
        polling: args.poll,
        context: Some(&context),
        env_timeout: args.env_timeout_ms.map(Duration::from_millis),
        verbosity: if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Quiet
        },
    };

    let revision = chooser
        .candidate_revision(&git, &request)
        .await
        .context("Revision selection failed")?;

    match (revision, args.json) {
        (Some(revision), true) => println!("{}", serde_json::to_string_pretty(&revision)?),
        (Some(revision), false) => {
            println!("{}", revision.commit);
            for named in &revision.refs {
                println!("  {}", named.name);
            }
        }
        (None, true) => println!("null"),
        (None, false) => println!("No branch specs matched"),
    }
    Ok(())
}

/// Command-line strategy and specs replace the configured ones.
fn apply_overrides(config: &mut ChooserConfig, strategy: Option<Strategy>, specs: &[String]) {
    if let Some(strategy) = strategy {
        config.strategy = strategy;
    }
    if !specs.is_empty() {
        config.specs = specs.iter().map(BranchSpec::new).collect();
    }
}

fn load_config(path: Option<&Path>) -> Result<ChooserConfig> {
    match path {
        Some(path) => load_chooser_config(path)
            .with_context(|| format!("Failed to load config file: {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).exists() => load_chooser_config(DEFAULT_CONFIG)
            .with_context(|| format!("Failed to load config file: {}", DEFAULT_CONFIG)),
        None => Ok(ChooserConfig {
            specs: vec![BranchSpec::new("**")],
            ..Default::default()
        }),
    }
}
