//! Model-free learning with epsilon-greedy Q-learning

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use toh_core::{Mdp, TohMdp};
use toh_rl::{rollout, QLearningSolver, SolverStats};
use tracing::info;

use super::{print_state_values, rollout_rng, state_values, MdpArgs, PathReport, StateValue};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct LearnArgs {
    #[command(flatten)]
    pub mdp: MdpArgs,

    /// Training episodes, each starting from every disk on peg 0
    #[arg(short, long)]
    pub episodes: Option<usize>,

    /// Step limit per episode
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Also solve exactly and report how far the learned values are
    #[arg(long)]
    pub compare: bool,

    /// Print the value and greedy action of every state
    #[arg(long)]
    pub values: bool,

    /// Emit JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct LearnReport {
    n_disks: u8,
    stats: SolverStats,
    params: serde_json::Value,
    start_value: f64,
    path: PathReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparison: Option<Comparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<Vec<StateValue>>,
}

/// Learned values against the exact solution
#[derive(Debug, Serialize)]
struct Comparison {
    exact_start_value: f64,
    max_value_error: f64,
    /// Non-goal states whose greedy action matches the exact policy
    policy_agreement: f64,
}

/// Fold the command-line flags into `config` and check the result
fn apply_overrides(args: &LearnArgs, config: &mut Config) -> Result<()> {
    args.mdp.apply(&mut config.mdp);
    if let Some(episodes) = args.episodes {
        config.q_learning.episodes = episodes;
    }
    if let Some(max_steps) = args.max_steps {
        config.q_learning.max_steps_per_episode = max_steps;
    }
    if args.seed.is_some() {
        config.q_learning.seed = args.seed;
    }
    config.validate()
}

pub fn run(args: LearnArgs, mut config: Config) -> Result<()> {
    apply_overrides(&args, &mut config)?;

    let mdp = TohMdp::new(config.mdp.clone()).context("Invalid MDP configuration")?;
    let start = mdp.initial_state();
    info!(
        n_disks = mdp.n_disks(),
        episodes = config.q_learning.episodes,
        seed = ?config.q_learning.seed,
        "Training with Q-learning"
    );

    let mut solver = QLearningSolver::new(&mdp, &config.q_learning)?;
    let stats = solver.train(&mdp, &start, config.q_learning.episodes)?;

    let policy = solver.policy(&mdp);
    let v_table = solver.v_table();

    let mut rng = rollout_rng(config.q_learning.seed);
    let path = rollout(
        &mdp,
        &policy,
        &start,
        config.output.max_rollout_steps,
        &mut rng,
    )?;

    let comparison = if args.compare {
        let exact = config.value_iteration.solve(&mdp)?;
        let mut max_value_error: f64 = 0.0;
        let mut agreed = 0usize;
        let mut compared = 0usize;

        for s in mdp.nonterminal_states() {
            let error = (v_table.value(s) - exact.v_table.value(s)).abs();
            max_value_error = max_value_error.max(error);
            if mdp.is_goal(s) {
                continue;
            }
            if let (Some(Some(learned)), Some(Some(best))) = (policy.get(s), exact.policy.get(s)) {
                compared += 1;
                if learned == best {
                    agreed += 1;
                }
            }
        }

        Some(Comparison {
            exact_start_value: exact.v_table.value(&start),
            max_value_error,
            policy_agreement: if compared > 0 {
                agreed as f64 / compared as f64
            } else {
                0.0
            },
        })
    } else {
        None
    };

    let output = LearnReport {
        n_disks: mdp.n_disks(),
        params: solver.params(),
        stats,
        start_value: v_table.value(&start),
        path: PathReport::from(&path),
        comparison,
        values: args
            .values
            .then(|| state_values(&mdp, &v_table, &policy)),
    };

    if args.json || config.output.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Q-Learning");
    println!("==========\n");
    println!("Disks:              {}", output.n_disks);
    println!("Episodes:           {}", output.stats.total_episodes);
    println!("Completed:          {}", output.stats.completed_episodes);
    println!("Steps:              {}", output.stats.total_steps);
    println!("Average reward:     {:.4}", output.stats.average_reward);
    println!("Final epsilon:      {:.4}", output.stats.epsilon);
    println!("Q-table entries:    {}", output.stats.q_table_size);
    println!("V(start):           {:.4}", output.start_value);

    if let Some(cmp) = &output.comparison {
        println!("Exact V(start):     {:.4}", cmp.exact_start_value);
        println!("Max |V - V*|:       {:.4}", cmp.max_value_error);
        println!("Policy agreement:   {:.1}%", cmp.policy_agreement * 100.0);
    }
    println!();

    output.path.print();

    if let Some(rows) = &output.values {
        println!();
        print_state_values(rows);
    }

    Ok(())
}
