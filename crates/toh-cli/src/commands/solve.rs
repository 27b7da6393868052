//! Exact solution by value iteration

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use toh_core::{Mdp, TohMdp};
use toh_rl::rollout;
use tracing::info;

use super::{print_state_values, rollout_rng, state_values, MdpArgs, PathReport, StateValue};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct SolveArgs {
    #[command(flatten)]
    pub mdp: MdpArgs,

    /// Stop once the largest value change is below this
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Upper bound on sweeps
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Seed for sampling the greedy path when moves are noisy
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the value and greedy action of every state
    #[arg(long)]
    pub values: bool,

    /// Emit JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct SolveReport {
    n_disks: u8,
    states: usize,
    iterations: usize,
    converged: bool,
    max_delta: f64,
    start_value: f64,
    path: PathReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<Vec<StateValue>>,
}

/// Fold the command-line flags into `config` and check the result
fn apply_overrides(args: &SolveArgs, config: &mut Config) -> Result<()> {
    args.mdp.apply(&mut config.mdp);
    if let Some(threshold) = args.threshold {
        config.value_iteration.threshold = threshold;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.value_iteration.max_iterations = max_iterations;
    }
    config.validate()
}

pub fn run(args: SolveArgs, mut config: Config) -> Result<()> {
    apply_overrides(&args, &mut config)?;

    let mdp = TohMdp::new(config.mdp.clone()).context("Invalid MDP configuration")?;
    info!(
        n_disks = mdp.n_disks(),
        states = mdp.all_states().len(),
        "Solving by value iteration"
    );

    let report = config.value_iteration.solve(&mdp)?;
    let start = mdp.initial_state();

    let mut rng = rollout_rng(args.seed.or(config.q_learning.seed));
    let path = rollout(
        &mdp,
        &report.policy,
        &start,
        config.output.max_rollout_steps,
        &mut rng,
    )?;

    let output = SolveReport {
        n_disks: mdp.n_disks(),
        states: mdp.all_states().len(),
        iterations: report.iterations,
        converged: report.converged,
        max_delta: report.max_delta,
        start_value: report.v_table.value(&start),
        path: PathReport::from(&path),
        values: args
            .values
            .then(|| state_values(&mdp, &report.v_table, &report.policy)),
    };

    if args.json || config.output.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Value Iteration");
    println!("===============\n");
    println!("Disks:       {}", output.n_disks);
    println!("States:      {}", output.states);
    println!("Iterations:  {}", output.iterations);
    println!(
        "Converged:   {} (max delta {:.3e})",
        output.converged, output.max_delta
    );
    println!("V(start):    {:.4}\n", output.start_value);

    output.path.print();

    if let Some(rows) = &output.values {
        println!();
        print_state_values(rows);
    }

    Ok(())
}
