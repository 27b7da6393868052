//! Table-driven MDP for small hand-built domains

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TohError};
use crate::mdp::Mdp;

const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// One possible result of taking an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome<S> {
    pub next: S,
    pub probability: f64,
    pub reward: f64,
}

/// MDP defined by explicit `(s, a) -> [(s', p, r)]` outcome lists.
///
/// The terminal state self-loops with probability 1 and reward 0 for every
/// action; its outcomes never need to be listed.
#[derive(Debug, Clone)]
pub struct TableMdp<S, A> {
    states: Vec<S>,
    nonterminal: Vec<S>,
    actions: Vec<A>,
    terminal: S,
    goals: Vec<S>,
    outcomes: HashMap<(S, A), Vec<Outcome<S>>>,
    gamma: f64,
}

impl<S, A> TableMdp<S, A>
where
    S: Clone + Eq + Hash + Debug,
    A: Clone + Eq + Hash + Debug,
{
    pub fn builder(terminal: S, gamma: f64) -> TableMdpBuilder<S, A> {
        TableMdpBuilder::new(terminal, gamma)
    }

    /// Listed outcomes for `(state, action)`
    pub fn outcomes(&self, state: &S, action: &A) -> &[Outcome<S>] {
        self.outcomes
            .get(&(state.clone(), action.clone()))
            .map_or(&[][..], Vec::as_slice)
    }
}

impl<S, A> Mdp for TableMdp<S, A>
where
    S: Clone + Eq + Hash + Debug,
    A: Clone + Eq + Hash + Debug,
{
    type State = S;
    type Action = A;

    fn all_states(&self) -> &[S] {
        &self.states
    }

    fn nonterminal_states(&self) -> &[S] {
        &self.nonterminal
    }

    fn actions(&self) -> &[A] {
        &self.actions
    }

    fn terminal(&self) -> &S {
        &self.terminal
    }

    fn is_goal(&self, state: &S) -> bool {
        self.goals.contains(state)
    }

    fn transition(&self, state: &S, action: &A, next: &S) -> f64 {
        if self.is_terminal(state) {
            return if self.is_terminal(next) { 1.0 } else { 0.0 };
        }
        self.outcomes(state, action)
            .iter()
            .filter(|o| &o.next == next)
            .map(|o| o.probability)
            .sum()
    }

    fn reward(&self, state: &S, action: &A, next: &S) -> f64 {
        self.outcomes(state, action)
            .iter()
            .find(|o| &o.next == next)
            .map_or(0.0, |o| o.reward)
    }

    fn gamma(&self) -> f64 {
        self.gamma
    }

    fn successors(&self, state: &S, action: &A) -> Vec<(S, f64)> {
        if self.is_terminal(state) {
            return vec![(self.terminal.clone(), 1.0)];
        }
        self.outcomes(state, action)
            .iter()
            .filter(|o| o.probability > 0.0)
            .map(|o| (o.next.clone(), o.probability))
            .collect()
    }
}

/// Builder for [`TableMdp`]
#[derive(Debug, Clone)]
pub struct TableMdpBuilder<S, A> {
    terminal: S,
    gamma: f64,
    nonterminal: Vec<S>,
    actions: Vec<A>,
    goals: Vec<S>,
    outcomes: HashMap<(S, A), Vec<Outcome<S>>>,
}

impl<S, A> TableMdpBuilder<S, A>
where
    S: Clone + Eq + Hash + Debug,
    A: Clone + Eq + Hash + Debug,
{
    pub fn new(terminal: S, gamma: f64) -> Self {
        Self {
            terminal,
            gamma,
            nonterminal: Vec::new(),
            actions: Vec::new(),
            goals: Vec::new(),
            outcomes: HashMap::new(),
        }
    }

    /// Add a nonterminal state
    pub fn state(mut self, state: S) -> Self {
        if !self.nonterminal.contains(&state) {
            self.nonterminal.push(state);
        }
        self
    }

    /// Add a nonterminal goal state
    pub fn goal(mut self, state: S) -> Self {
        self = self.state(state.clone());
        if !self.goals.contains(&state) {
            self.goals.push(state);
        }
        self
    }

    /// Append an action; insertion order is the canonical order
    pub fn action(mut self, action: A) -> Self {
        if !self.actions.contains(&action) {
            self.actions.push(action);
        }
        self
    }

    /// List `next` as a result of `(state, action)`; each `next` may appear once
    pub fn outcome(mut self, state: S, action: A, next: S, probability: f64, reward: f64) -> Self {
        self.outcomes
            .entry((state, action))
            .or_default()
            .push(Outcome {
                next,
                probability,
                reward,
            });
        self
    }

    pub fn build(self) -> Result<TableMdp<S, A>> {
        if !(0.0..1.0).contains(&self.gamma) {
            return Err(TohError::Config(format!(
                "gamma must be in [0, 1), got {}",
                self.gamma
            )));
        }
        if self.actions.is_empty() {
            return Err(TohError::EmptyActionSet);
        }
        if self.nonterminal.contains(&self.terminal) {
            return Err(TohError::Config(format!(
                "terminal state {:?} listed as nonterminal",
                self.terminal
            )));
        }

        let known = |s: &S| *s == self.terminal || self.nonterminal.contains(s);
        for ((state, action), outcomes) in &self.outcomes {
            if !known(state) {
                return Err(TohError::Config(format!("unknown state {state:?}")));
            }
            if !self.actions.contains(action) {
                return Err(TohError::Config(format!("unknown action {action:?}")));
            }
            for (i, outcome) in outcomes.iter().enumerate() {
                if !known(&outcome.next) {
                    return Err(TohError::Config(format!(
                        "unknown next state {:?}",
                        outcome.next
                    )));
                }
                if outcome.probability < 0.0 {
                    return Err(TohError::Config(format!(
                        "negative probability for ({state:?}, {action:?})"
                    )));
                }
                // At most one outcome per next state
                if outcomes[..i].iter().any(|o| o.next == outcome.next) {
                    return Err(TohError::Config(format!(
                        "duplicate outcome ({state:?}, {action:?}) -> {:?}",
                        outcome.next
                    )));
                }
            }
        }

        for state in &self.nonterminal {
            for action in &self.actions {
                let total: f64 = self
                    .outcomes
                    .get(&(state.clone(), action.clone()))
                    .map_or(0.0, |outcomes| outcomes.iter().map(|o| o.probability).sum());
                if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
                    return Err(TohError::Config(format!(
                        "probabilities for ({state:?}, {action:?}) sum to {total}, expected 1"
                    )));
                }
            }
        }

        let mut states = self.nonterminal.clone();
        states.push(self.terminal.clone());

        Ok(TableMdp {
            states,
            nonterminal: self.nonterminal,
            actions: self.actions,
            terminal: self.terminal,
            goals: self.goals,
            outcomes: self.outcomes,
            gamma: self.gamma,
        })
    }
}
