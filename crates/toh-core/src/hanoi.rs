//! Tower of Hanoi as a finite MDP
//!
//! Three pegs, `n` disks. A state records which peg each disk sits on
//! (smallest disk first); the stacking order on a peg is implied by disk
//! size. Goal configurations have every disk on one goal peg and exit to the
//! terminal state with that goal's reward.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TohError};
use crate::mdp::Mdp;

/// Number of pegs
pub const N_PEGS: u8 = 3;

/// Peg holding every disk in the initial state
pub const START_PEG: u8 = 0;

/// Upper bound on disks (3^10 states)
pub const MAX_DISKS: u8 = 10;

/// A goal peg and the reward for exiting from it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalConfig {
    pub peg: u8,
    pub reward: f64,
}

/// Tower of Hanoi MDP parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TohMdpConfig {
    pub n_disks: u8,
    pub gamma: f64,
    /// Reward on every non-goal transition
    pub living_reward: f64,
    /// Probability that a legal move slips and leaves the state unchanged
    pub noise: f64,
    pub goals: Vec<GoalConfig>,
}

impl Default for TohMdpConfig {
    fn default() -> Self {
        Self {
            n_disks: 3,
            gamma: 0.9,
            living_reward: 0.0,
            noise: 0.0,
            goals: vec![GoalConfig {
                peg: 2,
                reward: 100.0,
            }],
        }
    }
}

impl TohMdpConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_disks == 0 || self.n_disks > MAX_DISKS {
            return Err(TohError::Config(format!(
                "n_disks must be in 1..={MAX_DISKS}, got {}",
                self.n_disks
            )));
        }
        if !(0.0..1.0).contains(&self.gamma) {
            return Err(TohError::Config(format!(
                "gamma must be in [0, 1), got {}",
                self.gamma
            )));
        }
        if !(0.0..1.0).contains(&self.noise) {
            return Err(TohError::Config(format!(
                "noise must be in [0, 1), got {}",
                self.noise
            )));
        }
        if !self.living_reward.is_finite() {
            return Err(TohError::Config("living_reward must be finite".to_string()));
        }
        if self.goals.is_empty() {
            return Err(TohError::Config("at least one goal peg is required".to_string()));
        }

        let mut seen = HashSet::new();
        for goal in &self.goals {
            if goal.peg >= N_PEGS {
                return Err(TohError::Config(format!(
                    "goal peg {} out of range (0..{N_PEGS})",
                    goal.peg
                )));
            }
            if goal.peg == START_PEG {
                return Err(TohError::Config(format!(
                    "goal peg {} is the starting peg",
                    goal.peg
                )));
            }
            if !goal.reward.is_finite() {
                return Err(TohError::Config(format!(
                    "reward for goal peg {} must be finite",
                    goal.peg
                )));
            }
            if !seen.insert(goal.peg) {
                return Err(TohError::Config(format!("duplicate goal peg {}", goal.peg)));
            }
        }

        Ok(())
    }
}

/// Move the top disk of `from` onto `to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TohAction {
    pub from: u8,
    pub to: u8,
}

impl TohAction {
    pub fn new(from: u8, to: u8) -> Self {
        Self { from, to }
    }

    /// Every move between distinct pegs, in canonical (lexicographic) order
    pub fn all() -> Vec<TohAction> {
        (0..N_PEGS)
            .flat_map(|from| {
                (0..N_PEGS)
                    .filter(move |&to| to != from)
                    .map(move |to| TohAction { from, to })
            })
            .collect()
    }
}

impl fmt::Display for TohAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// Puzzle configuration, or the terminal state
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TohState {
    /// Peg index for each disk, smallest disk first
    Disks(Vec<u8>),
    Terminal,
}

impl TohState {
    /// Every disk stacked on `peg`
    pub fn all_on(peg: u8, n_disks: u8) -> Self {
        TohState::Disks(vec![peg; n_disks as usize])
    }

    /// Index of the smallest disk on `peg`, if any
    pub fn top_disk(&self, peg: u8) -> Option<usize> {
        match self {
            TohState::Disks(pegs) => pegs.iter().position(|&p| p == peg),
            TohState::Terminal => None,
        }
    }

    /// Result of a legal move; `None` when the move is illegal
    pub fn apply(&self, action: &TohAction) -> Option<TohState> {
        let TohState::Disks(pegs) = self else {
            return None;
        };
        if action.from == action.to || action.from >= N_PEGS || action.to >= N_PEGS {
            return None;
        }

        let disk = self.top_disk(action.from)?;
        if let Some(top) = self.top_disk(action.to) {
            if top < disk {
                return None;
            }
        }

        let mut next = pegs.clone();
        next[disk] = action.to;
        Some(TohState::Disks(next))
    }

    /// Disk sizes (1 = smallest) on each peg, bottom to top
    pub fn stacks(&self) -> Option<Vec<Vec<usize>>> {
        let TohState::Disks(pegs) = self else {
            return None;
        };
        let stacks = (0..N_PEGS)
            .map(|peg| {
                (0..pegs.len())
                    .rev()
                    .filter(|&disk| pegs[disk] == peg)
                    .map(|disk| disk + 1)
                    .collect()
            })
            .collect();
        Some(stacks)
    }
}

impl fmt::Display for TohState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(stacks) = self.stacks() else {
            return write!(f, "TERMINAL");
        };
        let rendered: Vec<String> = stacks
            .iter()
            .map(|stack| {
                if stack.is_empty() {
                    "-".to_string()
                } else {
                    stack
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" ")
                }
            })
            .collect();
        write!(f, "[{}]", rendered.join(" | "))
    }
}

/// Tower of Hanoi MDP with enumerated state space
#[derive(Debug, Clone)]
pub struct TohMdp {
    config: TohMdpConfig,
    states: Vec<TohState>,
    actions: Vec<TohAction>,
}

impl TohMdp {
    pub fn new(config: TohMdpConfig) -> Result<Self> {
        config.validate()?;

        let n = config.n_disks as usize;
        let count = (N_PEGS as usize).pow(n as u32);
        let mut states = Vec::with_capacity(count + 1);
        for code in 0..count {
            let mut rest = code;
            let mut pegs = Vec::with_capacity(n);
            for _ in 0..n {
                pegs.push((rest % N_PEGS as usize) as u8);
                rest /= N_PEGS as usize;
            }
            states.push(TohState::Disks(pegs));
        }
        // Terminal goes last so nonterminal states are a prefix
        states.push(TohState::Terminal);

        debug!(
            n_disks = config.n_disks,
            states = states.len(),
            "Built Tower of Hanoi MDP"
        );

        Ok(Self {
            config,
            states,
            actions: TohAction::all(),
        })
    }

    pub fn config(&self) -> &TohMdpConfig {
        &self.config
    }

    pub fn n_disks(&self) -> u8 {
        self.config.n_disks
    }

    /// All disks on the starting peg
    pub fn initial_state(&self) -> TohState {
        TohState::all_on(START_PEG, self.config.n_disks)
    }

    /// Reward for exiting from `state` if it is a goal configuration
    pub fn goal_reward(&self, state: &TohState) -> Option<f64> {
        let TohState::Disks(pegs) = state else {
            return None;
        };
        self.config
            .goals
            .iter()
            .find(|goal| pegs.iter().all(|&p| p == goal.peg))
            .map(|goal| goal.reward)
    }
}

impl Mdp for TohMdp {
    type State = TohState;
    type Action = TohAction;

    fn all_states(&self) -> &[TohState] {
        &self.states
    }

    fn nonterminal_states(&self) -> &[TohState] {
        &self.states[..self.states.len() - 1]
    }

    fn actions(&self) -> &[TohAction] {
        &self.actions
    }

    fn terminal(&self) -> &TohState {
        &self.states[self.states.len() - 1]
    }

    fn is_goal(&self, state: &TohState) -> bool {
        self.goal_reward(state).is_some()
    }

    fn transition(&self, state: &TohState, action: &TohAction, next: &TohState) -> f64 {
        self.successors(state, action)
            .into_iter()
            .filter(|(candidate, _)| candidate == next)
            .map(|(_, p)| p)
            .sum()
    }

    fn reward(&self, state: &TohState, _action: &TohAction, next: &TohState) -> f64 {
        match state {
            TohState::Terminal => 0.0,
            TohState::Disks(_) => match self.goal_reward(state) {
                Some(reward) if *next == TohState::Terminal => reward,
                Some(_) => 0.0,
                None => self.config.living_reward,
            },
        }
    }

    fn gamma(&self) -> f64 {
        self.config.gamma
    }

    fn successors(&self, state: &TohState, action: &TohAction) -> Vec<(TohState, f64)> {
        if *state == TohState::Terminal || self.is_goal(state) {
            return vec![(TohState::Terminal, 1.0)];
        }

        match state.apply(action) {
            Some(next) if self.config.noise > 0.0 => vec![
                (next, 1.0 - self.config.noise),
                (state.clone(), self.config.noise),
            ],
            Some(next) => vec![(next, 1.0)],
            None => vec![(state.clone(), 1.0)],
        }
    }
}
