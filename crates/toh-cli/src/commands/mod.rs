//! CLI command modules

pub mod config;
pub mod learn;
pub mod solve;

use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use toh_core::{Mdp, TohAction, TohMdp, TohMdpConfig, TohState};
use toh_rl::{Policy, Rollout, VTable};

/// Overrides for the `[mdp]` section
#[derive(Args, Debug, Default)]
pub struct MdpArgs {
    /// Number of disks
    #[arg(short = 'n', long)]
    pub disks: Option<u8>,

    /// Discount factor in [0, 1)
    #[arg(long)]
    pub gamma: Option<f64>,

    /// Probability that a move slips and leaves the pegs unchanged
    #[arg(long)]
    pub noise: Option<f64>,

    /// Reward for every non-goal transition
    #[arg(long, allow_hyphen_values = true)]
    pub living_reward: Option<f64>,
}

impl MdpArgs {
    pub fn apply(&self, config: &mut TohMdpConfig) {
        if let Some(disks) = self.disks {
            config.n_disks = disks;
        }
        if let Some(gamma) = self.gamma {
            config.gamma = gamma;
        }
        if let Some(noise) = self.noise {
            config.noise = noise;
        }
        if let Some(living_reward) = self.living_reward {
            config.living_reward = living_reward;
        }
    }
}

/// Fixed seed when given, entropy otherwise
pub fn rollout_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// A greedy path in printable form
#[derive(Debug, Serialize)]
pub struct PathReport {
    pub moves: Vec<String>,
    pub states: Vec<String>,
    pub total_reward: f64,
    pub reached_terminal: bool,
}

impl From<&Rollout<TohState, TohAction>> for PathReport {
    fn from(path: &Rollout<TohState, TohAction>) -> Self {
        Self {
            moves: path.actions.iter().map(ToString::to_string).collect(),
            states: path.states.iter().map(ToString::to_string).collect(),
            total_reward: path.total_reward,
            reached_terminal: path.reached_terminal,
        }
    }
}

impl PathReport {
    pub fn print(&self) {
        println!("Greedy path ({} moves):", self.moves.len());
        if let Some(first) = self.states.first() {
            println!("  start    {first}");
        }
        for (i, (action, state)) in self.moves.iter().zip(self.states.iter().skip(1)).enumerate() {
            println!("  {:>3}. {action:<4} {state}", i + 1);
        }
        println!("Total reward: {}", self.total_reward);
        if !self.reached_terminal {
            println!("Path stopped before reaching the terminal state");
        }
    }
}

/// One row of the state table
#[derive(Debug, Serialize)]
pub struct StateValue {
    pub state: String,
    pub value: f64,
    pub action: Option<String>,
}

/// Values and greedy actions for every nonterminal state, in enumeration order
pub fn state_values(
    mdp: &TohMdp,
    v_table: &VTable<TohState>,
    policy: &Policy<TohState, TohAction>,
) -> Vec<StateValue> {
    mdp.nonterminal_states()
        .iter()
        .map(|s| StateValue {
            state: s.to_string(),
            value: v_table.value(s),
            action: policy.get(s).copied().flatten().map(|a| a.to_string()),
        })
        .collect()
}

pub fn print_state_values(rows: &[StateValue]) {
    println!("{:<28} {:>12}  {}", "State", "V", "Action");
    for row in rows {
        println!(
            "{:<28} {:>12.4}  {}",
            row.state,
            row.value,
            row.action.as_deref().unwrap_or("-")
        );
    }
}
