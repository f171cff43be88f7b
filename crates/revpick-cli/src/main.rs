//! revpick CLI tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod git;

#[derive(Parser)]
#[command(name = "revpick")]
#[command(about = "Pick the revision a CI build should check out", long_about = None)]
struct Cli {
    /// Log chooser decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select the revision to build from a local repository
    Select(commands::select::SelectArgs),
    /// Show which branch names a spec matches
    Match {
        /// Branch spec
        spec: String,
        /// Branch names, e.g. origin/master
        #[arg(required = true)]
        branches: Vec<String>,
    },
    /// Validate a chooser configuration
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "revpick.kdl")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Select(args) => {
            commands::select::run(args, cli.verbose).await?;
        }
        Commands::Match { spec, branches } => {
            commands::match_branches(&spec, &branches)?;
        }
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
    }

    Ok(())
}
