//! TOH CLI - Solve the Tower of Hanoi as a Markov decision process
//!
//! `solve` runs value iteration and prints the greedy path, `learn` trains a
//! tabular Q-learner from simulated episodes, and `config` inspects or writes
//! the configuration file.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::needless_pass_by_value)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::config::ConfigCommands;
use commands::{learn, solve};
use crate::config::Config;

#[derive(Parser)]
#[command(name = "toh")]
#[command(author, version, about = "TOH - Tower of Hanoi MDP solver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (overrides ./toh.toml and ~/.config/toh/toh.toml)
    #[arg(short, long, global = true, env = "TOH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve exactly with value iteration
    Solve(solve::SolveArgs),

    /// Learn a policy with epsilon-greedy Q-learning
    Learn(learn::LearnArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("toh_cli={log_level},toh_rl={log_level},toh_core={log_level}").into()
    });

    // Logs go to stderr so JSON reports on stdout stay parseable
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    let source = cli.config.as_deref();
    match cli.command {
        // Must work even when an existing file does not parse
        Commands::Config(cmd @ ConfigCommands::Init { .. }) => {
            commands::config::run(cmd, &Config::default(), source)
        }
        command => {
            let config = Config::load(source)?;
            match command {
                Commands::Solve(args) => solve::run(args, config),
                Commands::Learn(args) => learn::run(args, config),
                Commands::Config(cmd) => commands::config::run(cmd, &config, source),
            }
        }
    }
}
