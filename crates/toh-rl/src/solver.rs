//! Solvers - drive value iteration and Q-learning over an MDP

use std::collections::HashMap;
use std::hash::Hash;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use toh_core::{Mdp, TohError};
use tracing::{debug, info, trace, warn};

use crate::exploration::{choose_next_action, RandomEpsilonGreedy};
use crate::policy::{extract_policy, extract_v_table};
use crate::q_learning::{q_update, Transition};
use crate::schedule::{AlphaSchedule, EpsilonSchedule, Schedule};
use crate::table::{Policy, QTable, VTable};
use crate::value_iteration::value_iteration;

/// Draw `s'` from `T(state, action, ·)`
pub fn sample_next_state<M, R>(
    mdp: &M,
    state: &M::State,
    action: &M::Action,
    rng: &mut R,
) -> toh_core::Result<M::State>
where
    M: Mdp,
    R: Rng + ?Sized,
{
    let successors = mdp.successors(state, action);
    successors
        .choose_weighted(rng, |(_, p)| *p)
        .map(|(next, _)| next.clone())
        .map_err(|e| TohError::NoSuccessor(format!("({state:?}, {action:?}): {e}")))
}

/// Repeats value iteration sweeps until the largest change drops below `threshold`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueIterationSolver {
    pub threshold: f64,
    pub max_iterations: usize,
}

impl Default for ValueIterationSolver {
    fn default() -> Self {
        Self {
            threshold: 1e-6,
            max_iterations: 1000,
        }
    }
}

/// Outcome of [`ValueIterationSolver::solve`]
#[derive(Debug, Clone)]
pub struct ValueIterationReport<S: Eq + Hash, A: Eq + Hash> {
    pub v_table: VTable<S>,
    pub q_table: QTable<S, A>,
    pub policy: Policy<S, A>,
    pub iterations: usize,
    pub max_delta: f64,
    pub converged: bool,
}

impl ValueIterationSolver {
    pub fn new(threshold: f64, max_iterations: usize) -> Self {
        Self {
            threshold,
            max_iterations,
        }
    }

    /// Sweep from an all-zero table. Running out of iterations is reported
    /// through `converged`, not as an error.
    pub fn solve<M: Mdp>(&self, mdp: &M) -> Result<ValueIterationReport<M::State, M::Action>> {
        let mut v_table = VTable::zeros(mdp.all_states());
        let mut q_table = QTable::new();
        let mut max_delta = f64::INFINITY;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            let sweep = value_iteration(mdp, &v_table)
                .with_context(|| format!("value iteration sweep {} failed", iterations + 1))?;
            iterations += 1;
            v_table = sweep.v_table;
            q_table = sweep.q_table;
            max_delta = sweep.max_delta;

            debug!(iteration = iterations, max_delta, "Value iteration sweep");

            if max_delta < self.threshold {
                converged = true;
                break;
            }
        }

        if converged {
            info!(iterations, max_delta, "Value iteration converged");
        } else {
            warn!(
                iterations,
                max_delta,
                threshold = self.threshold,
                "Value iteration stopped before converging"
            );
        }

        let policy = extract_policy(mdp, &q_table);
        Ok(ValueIterationReport {
            v_table,
            q_table,
            policy,
            iterations,
            max_delta,
            converged,
        })
    }
}

/// Q-learning training parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningConfig {
    pub episodes: usize,
    pub max_steps_per_episode: usize,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
    pub epsilon: EpsilonSchedule,
    pub alpha: AlphaSchedule,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            episodes: 5000,
            max_steps_per_episode: 200,
            seed: None,
            epsilon: EpsilonSchedule::default(),
            alpha: AlphaSchedule::default(),
        }
    }
}

/// Results of a single episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpisodeStats {
    pub steps: usize,
    pub reward: f64,
    pub reached_terminal: bool,
}

/// Training statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverStats {
    pub total_steps: u64,
    pub total_episodes: u64,
    pub completed_episodes: u64,
    /// Undiscounted reward summed over finished episodes
    pub total_reward: f64,
    pub average_reward: f64,
    pub q_table_size: usize,
    pub epsilon: f64,
}

/// Online tabular Q-learning.
///
/// Exploration follows the epsilon schedule indexed by the global step
/// count. The learning rate for a pair is the alpha schedule indexed by how
/// often that pair has been updated, so every pair sees its own
/// Robbins-Monro sequence.
#[derive(Debug, Clone)]
pub struct QLearningSolver<S: Eq + Hash, A: Eq + Hash> {
    q_table: QTable<S, A>,
    visits: HashMap<(S, A), u64>,
    epsilon: EpsilonSchedule,
    alpha: AlphaSchedule,
    max_steps_per_episode: usize,
    explorer: RandomEpsilonGreedy<A>,
    rng: StdRng,
    total_steps: u64,
    total_episodes: u64,
    completed_episodes: u64,
    total_reward: f64,
}

impl<S, A> QLearningSolver<S, A>
where
    S: Clone + Eq + Hash + std::fmt::Debug,
    A: Clone + Eq + Hash + std::fmt::Debug,
{
    pub fn new<M>(mdp: &M, config: &QLearningConfig) -> Result<Self>
    where
        M: Mdp<State = S, Action = A>,
    {
        config.alpha.validate().context("invalid alpha schedule")?;
        EpsilonSchedule::new(config.epsilon.decay).context("invalid epsilon schedule")?;

        let actions = mdp.actions().to_vec();
        let (explorer, rng) = match config.seed {
            Some(seed) => (
                RandomEpsilonGreedy::seeded(actions, seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (
                RandomEpsilonGreedy::from_entropy(actions),
                StdRng::from_entropy(),
            ),
        };

        Ok(Self {
            q_table: QTable::new(),
            visits: HashMap::new(),
            epsilon: config.epsilon,
            alpha: config.alpha,
            max_steps_per_episode: config.max_steps_per_episode,
            explorer,
            rng,
            total_steps: 0,
            total_episodes: 0,
            completed_episodes: 0,
            total_reward: 0.0,
        })
    }

    pub fn q_table(&self) -> &QTable<S, A> {
        &self.q_table
    }

    /// Exploration rate for the next step
    pub fn current_epsilon(&self) -> f64 {
        self.epsilon.value(self.total_steps)
    }

    /// Number of updates applied to `(state, action)`
    pub fn visit_count(&self, state: &S, action: &A) -> u64 {
        self.visits
            .get(&(state.clone(), action.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Apply one Q update for an observed transition, creating the entry if needed
    pub fn learn<M>(&mut self, mdp: &M, transition: &Transition<S, A>) -> Result<()>
    where
        M: Mdp<State = S, Action = A>,
    {
        let visits = self
            .visits
            .entry((transition.state.clone(), transition.action.clone()))
            .or_insert(0);
        let alpha = self.alpha.value(*visits);
        *visits += 1;

        self.q_table
            .init(transition.state.clone(), transition.action.clone());
        q_update(mdp, &mut self.q_table, transition, alpha)?;

        self.total_steps += 1;

        trace!(
            state = ?transition.state,
            action = ?transition.action,
            reward = transition.reward,
            alpha,
            "Q update"
        );
        Ok(())
    }

    /// Act once from `state`, observe the outcome, and learn from it.
    ///
    /// Goal states pick a uniformly random action since every action exits.
    pub fn step<M>(&mut self, mdp: &M, state: &S) -> Result<Transition<S, A>>
    where
        M: Mdp<State = S, Action = A>,
    {
        let action = if mdp.is_goal(state) {
            mdp.actions()
                .choose(&mut self.rng)
                .cloned()
                .ok_or(TohError::EmptyActionSet)?
        } else {
            let epsilon = self.current_epsilon();
            choose_next_action(mdp, state, epsilon, &self.q_table, &mut self.explorer)?
        };

        let next_state = sample_next_state(mdp, state, &action, &mut self.rng)?;
        let reward = mdp.reward(state, &action, &next_state);
        let transition = Transition::new(state.clone(), action, reward, next_state);

        self.learn(mdp, &transition)?;
        Ok(transition)
    }

    /// Run from `start` until terminal or the step limit
    pub fn run_episode<M>(&mut self, mdp: &M, start: &S) -> Result<EpisodeStats>
    where
        M: Mdp<State = S, Action = A>,
    {
        let mut state = start.clone();
        let mut steps = 0;
        let mut reward = 0.0;

        while !mdp.is_terminal(&state) && steps < self.max_steps_per_episode {
            let transition = self.step(mdp, &state)?;
            reward += transition.reward;
            steps += 1;
            state = transition.next_state;
        }

        let reached_terminal = mdp.is_terminal(&state);
        self.total_episodes += 1;
        self.total_reward += reward;
        if reached_terminal {
            self.completed_episodes += 1;
        }

        Ok(EpisodeStats {
            steps,
            reward,
            reached_terminal,
        })
    }

    pub fn train<M>(&mut self, mdp: &M, start: &S, episodes: usize) -> Result<SolverStats>
    where
        M: Mdp<State = S, Action = A>,
    {
        let report_every = (episodes / 10).max(1);

        for episode in 1..=episodes {
            let stats = self
                .run_episode(mdp, start)
                .with_context(|| format!("episode {episode} failed"))?;

            debug!(
                episode,
                steps = stats.steps,
                reward = stats.reward,
                reached_terminal = stats.reached_terminal,
                "Episode finished"
            );
            if episode % report_every == 0 {
                info!(
                    episode,
                    total_steps = self.total_steps,
                    epsilon = self.current_epsilon(),
                    q_entries = self.q_table.len(),
                    "Training progress"
                );
            }
        }

        Ok(self.stats())
    }

    pub fn policy<M>(&self, mdp: &M) -> Policy<S, A>
    where
        M: Mdp<State = S, Action = A>,
    {
        extract_policy(mdp, &self.q_table)
    }

    pub fn v_table(&self) -> VTable<S> {
        extract_v_table(&self.q_table)
    }

    pub fn stats(&self) -> SolverStats {
        SolverStats {
            total_steps: self.total_steps,
            total_episodes: self.total_episodes,
            completed_episodes: self.completed_episodes,
            total_reward: self.total_reward,
            average_reward: if self.total_episodes > 0 {
                self.total_reward / self.total_episodes as f64
            } else {
                0.0
            },
            q_table_size: self.q_table.len(),
            epsilon: self.current_epsilon(),
        }
    }

    /// Schedule parameters as JSON
    pub fn params(&self) -> serde_json::Value {
        serde_json::json!({
            "epsilon_decay": self.epsilon.decay,
            "alpha_initial": self.alpha.initial,
            "alpha_exponent": self.alpha.exponent,
            "max_steps_per_episode": self.max_steps_per_episode,
            "q_table_size": self.q_table.len(),
        })
    }

    /// Forget everything learned; schedules restart from step 0
    pub fn reset(&mut self) {
        self.q_table.clear();
        self.visits.clear();
        self.total_steps = 0;
        self.total_episodes = 0;
        self.completed_episodes = 0;
        self.total_reward = 0.0;
    }
}

/// A trajectory produced by following a policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rollout<S, A> {
    pub states: Vec<S>,
    pub actions: Vec<A>,
    /// Undiscounted sum of rewards
    pub total_reward: f64,
    pub reached_terminal: bool,
}

/// Follow `policy` from `start` for at most `max_steps` actions.
///
/// Stops early at the terminal state or at a state with no policy action.
pub fn rollout<M, R>(
    mdp: &M,
    policy: &Policy<M::State, M::Action>,
    start: &M::State,
    max_steps: usize,
    rng: &mut R,
) -> toh_core::Result<Rollout<M::State, M::Action>>
where
    M: Mdp,
    R: Rng + ?Sized,
{
    let mut states = vec![start.clone()];
    let mut actions = Vec::new();
    let mut total_reward = 0.0;
    let mut state = start.clone();

    while !mdp.is_terminal(&state) && actions.len() < max_steps {
        let Some(Some(action)) = policy.get(&state) else {
            break;
        };
        let next = sample_next_state(mdp, &state, action, rng)?;
        total_reward += mdp.reward(&state, action, &next);
        actions.push(action.clone());
        states.push(next.clone());
        state = next;
    }

    Ok(Rollout {
        reached_terminal: mdp.is_terminal(&state),
        states,
        actions,
        total_reward,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use toh_core::TableMdp;

    fn create_chain() -> TableMdp<&'static str, &'static str> {
        TableMdp::builder("T", 0.9)
            .state("S1")
            .state("S2")
            .action("Left")
            .action("Right")
            .outcome("S1", "Left", "S1", 1.0, 0.0)
            .outcome("S1", "Right", "S2", 1.0, 0.0)
            .outcome("S2", "Left", "S1", 1.0, 0.0)
            .outcome("S2", "Right", "T", 1.0, 10.0)
            .build()
            .unwrap()
    }

    fn seeded_config(seed: u64) -> QLearningConfig {
        QLearningConfig {
            seed: Some(seed),
            ..QLearningConfig::default()
        }
    }

    #[test]
    fn test_value_iteration_solver_converges() {
        let mdp = create_chain();
        let report = ValueIterationSolver::default().solve(&mdp).unwrap();

        assert!(report.converged);
        assert!(report.iterations <= 5);
        assert!((report.v_table.value(&"S1") - 9.0).abs() < 1e-9);
        assert!((report.v_table.value(&"S2") - 10.0).abs() < 1e-9);
        assert_eq!(report.policy[&"S1"], Some("Right"));
        assert_eq!(report.policy[&"S2"], Some("Right"));
    }

    #[test]
    fn test_value_iteration_solver_iteration_cap() {
        let mdp = create_chain();
        let report = ValueIterationSolver::new(1e-9, 1).solve(&mdp).unwrap();

        assert!(!report.converged);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.max_delta, 10.0);
    }

    #[test]
    fn test_sample_next_state_deterministic() {
        let mdp = create_chain();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..10 {
            assert_eq!(
                sample_next_state(&mdp, &"S1", &"Right", &mut rng).unwrap(),
                "S2"
            );
        }
    }

    #[test]
    fn test_learn_initializes_and_counts_visits() {
        let mdp = create_chain();
        let mut solver = QLearningSolver::new(&mdp, &seeded_config(1)).unwrap();

        let t = Transition::new("S2", "Right", 10.0, "T");
        solver.learn(&mdp, &t).unwrap();
        // First visit uses alpha = 1
        assert_eq!(solver.q_table().get(&"S2", &"Right"), Some(10.0));
        assert_eq!(solver.visit_count(&"S2", &"Right"), 1);
        assert_eq!(solver.stats().total_steps, 1);
    }

    #[test]
    fn test_run_episode_reaches_terminal() {
        let mdp = create_chain();
        let mut solver = QLearningSolver::new(&mdp, &seeded_config(3)).unwrap();

        let stats = solver.run_episode(&mdp, &"S1").unwrap();
        assert!(stats.reached_terminal);
        assert_eq!(stats.reward, 10.0);
        assert_eq!(solver.stats().completed_episodes, 1);
    }

    #[test]
    fn test_reward_totals_count_whole_episodes() {
        let mdp = create_chain();
        let mut solver = QLearningSolver::new(&mdp, &seeded_config(3)).unwrap();

        // A lone update is not an episode
        solver
            .learn(&mdp, &Transition::new("S2", "Right", 10.0, "T"))
            .unwrap();
        assert_eq!(solver.stats().total_reward, 0.0);
        assert_eq!(solver.stats().average_reward, 0.0);

        let episode = solver.run_episode(&mdp, &"S1").unwrap();
        let stats = solver.stats();
        assert_eq!(stats.total_episodes, 1);
        assert_eq!(stats.total_reward, episode.reward);
        assert_eq!(stats.average_reward, episode.reward);
    }

    #[test]
    fn test_train_learns_chain_policy() {
        let mdp = create_chain();
        let mut solver = QLearningSolver::new(&mdp, &seeded_config(5)).unwrap();

        let stats = solver.train(&mdp, &"S1", 500).unwrap();
        assert_eq!(stats.total_episodes, 500);
        assert!(stats.total_steps >= 1000);

        let policy = solver.policy(&mdp);
        assert_eq!(policy[&"S1"], Some("Right"));
        assert_eq!(policy[&"S2"], Some("Right"));
    }

    #[test]
    fn test_rejects_invalid_schedules() {
        let mdp = create_chain();
        let config = QLearningConfig {
            alpha: AlphaSchedule {
                initial: 1.0,
                exponent: 0.4,
            },
            ..QLearningConfig::default()
        };
        assert!(QLearningSolver::new(&mdp, &config).is_err());
    }

    #[test]
    fn test_reset_clears_learning() {
        let mdp = create_chain();
        let mut solver = QLearningSolver::new(&mdp, &seeded_config(9)).unwrap();
        solver.train(&mdp, &"S1", 10).unwrap();
        assert!(solver.stats().total_steps > 0);

        solver.reset();
        let stats = solver.stats();
        assert_eq!(stats.total_steps, 0);
        assert_eq!(stats.q_table_size, 0);
        assert_eq!(stats.epsilon, 1.0);
    }

    #[test]
    fn test_rollout_follows_policy() {
        let mdp = create_chain();
        let report = ValueIterationSolver::default().solve(&mdp).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let path = rollout(&mdp, &report.policy, &"S1", 10, &mut rng).unwrap();
        assert_eq!(path.states, vec!["S1", "S2", "T"]);
        assert_eq!(path.actions, vec!["Right", "Right"]);
        assert_eq!(path.total_reward, 10.0);
        assert!(path.reached_terminal);
    }

    #[test]
    fn test_rollout_stops_without_action() {
        let mdp = create_chain();
        let mut policy: Policy<&str, &str> = Policy::new();
        policy.insert("S1", Some("Right"));
        policy.insert("S2", None);
        let mut rng = StdRng::seed_from_u64(0);

        let path = rollout(&mdp, &policy, &"S1", 10, &mut rng).unwrap();
        assert_eq!(path.states, vec!["S1", "S2"]);
        assert!(!path.reached_terminal);
    }
}
