//! Epsilon-greedy action selection

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use toh_core::error::ensure_unit_interval;
use toh_core::{Mdp, Result, TohError};

use crate::table::QTable;

/// Picks one action given the greedy candidates and an exploration rate.
///
/// With probability `1 - epsilon` the choice is uniform over `best_actions`,
/// otherwise uniform over the whole action set. Returns `None` only when
/// there is nothing to choose from.
pub trait EpsilonGreedy<A> {
    fn select(&mut self, best_actions: &[A], epsilon: f64) -> Option<A>;
}

impl<A, F> EpsilonGreedy<A> for F
where
    F: FnMut(&[A], f64) -> Option<A>,
{
    fn select(&mut self, best_actions: &[A], epsilon: f64) -> Option<A> {
        self(best_actions, epsilon)
    }
}

/// Randomized [`EpsilonGreedy`] over a fixed action set
#[derive(Debug, Clone)]
pub struct RandomEpsilonGreedy<A, R = StdRng> {
    actions: Vec<A>,
    rng: R,
}

impl<A, R: Rng> RandomEpsilonGreedy<A, R> {
    pub fn new(actions: Vec<A>, rng: R) -> Self {
        Self { actions, rng }
    }

    pub fn actions(&self) -> &[A] {
        &self.actions
    }
}

impl<A> RandomEpsilonGreedy<A, StdRng> {
    /// Reproducible selector
    pub fn seeded(actions: Vec<A>, seed: u64) -> Self {
        Self::new(actions, StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(actions: Vec<A>) -> Self {
        Self::new(actions, StdRng::from_entropy())
    }
}

impl<A: Clone, R: Rng> EpsilonGreedy<A> for RandomEpsilonGreedy<A, R> {
    fn select(&mut self, best_actions: &[A], epsilon: f64) -> Option<A> {
        let explore = epsilon > 0.0 && self.rng.gen::<f64>() < epsilon;
        let pool = if (explore || best_actions.is_empty()) && !self.actions.is_empty() {
            &self.actions[..]
        } else {
            best_actions
        };
        pool.choose(&mut self.rng).cloned()
    }
}

/// Choose the next action for `state` from the current Q estimates.
///
/// Absent Q entries read as 0. The greedy candidates are every action whose
/// value equals the maximum, in canonical order; the final pick is left to
/// `selector`. `state` must be neither terminal nor a goal.
pub fn choose_next_action<M, E>(
    mdp: &M,
    state: &M::State,
    epsilon: f64,
    q_table: &QTable<M::State, M::Action>,
    selector: &mut E,
) -> Result<M::Action>
where
    M: Mdp,
    E: EpsilonGreedy<M::Action> + ?Sized,
{
    ensure_unit_interval("epsilon", epsilon)?;
    if mdp.is_terminal(state) || mdp.is_goal(state) {
        return Err(TohError::Precondition(format!(
            "cannot choose an action from terminal or goal state {state:?}"
        )));
    }
    if mdp.actions().is_empty() {
        return Err(TohError::EmptyActionSet);
    }

    let values: Vec<f64> = mdp
        .actions()
        .iter()
        .map(|a| q_table.value(state, a))
        .collect();
    let max_q = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let best_actions: Vec<M::Action> = mdp
        .actions()
        .iter()
        .zip(&values)
        .filter(|(_, &q)| q == max_q)
        .map(|(a, _)| a.clone())
        .collect();

    selector.select(&best_actions, epsilon).ok_or_else(|| {
        TohError::Precondition(format!("selector returned no action for {state:?}"))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use toh_core::TableMdp;

    fn create_test_mdp() -> TableMdp<&'static str, &'static str> {
        TableMdp::builder("T", 0.9)
            .state("S")
            .goal("G")
            .action("a")
            .action("b")
            .action("c")
            .outcome("S", "a", "G", 1.0, 0.0)
            .outcome("S", "b", "S", 1.0, 0.0)
            .outcome("S", "c", "S", 1.0, 0.0)
            .outcome("G", "a", "T", 1.0, 1.0)
            .outcome("G", "b", "T", 1.0, 1.0)
            .outcome("G", "c", "T", 1.0, 1.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_best_set_in_canonical_order() {
        let mdp = create_test_mdp();
        let mut q = QTable::new();
        q.insert("S", "a", 2.0);
        q.insert("S", "b", 1.0);
        q.insert("S", "c", 2.0);

        let mut seen = Vec::new();
        let mut selector = |best: &[&'static str], _epsilon: f64| {
            seen.push(best.to_vec());
            best.first().copied()
        };
        let action = choose_next_action(&mdp, &"S", 0.0, &q, &mut selector).unwrap();

        assert_eq!(action, "a");
        assert_eq!(seen, vec![vec!["a", "c"]]);
    }

    #[test]
    fn test_absent_entries_read_as_zero() {
        let mdp = create_test_mdp();
        let mut q = QTable::new();
        q.insert("S", "a", -1.0);
        q.insert("S", "b", -0.5);

        let mut seen = Vec::new();
        let mut selector = |best: &[&'static str], _epsilon: f64| {
            seen.push(best.to_vec());
            best.last().copied()
        };
        let action = choose_next_action(&mdp, &"S", 0.3, &q, &mut selector).unwrap();

        assert_eq!(action, "c");
        assert_eq!(seen, vec![vec!["c"]]);
        assert!(!q.contains(&"S", &"c"));
    }

    #[test]
    fn test_epsilon_passed_through() {
        let mdp = create_test_mdp();
        let q = QTable::new();
        let mut received = None;
        let mut selector = |best: &[&'static str], epsilon: f64| {
            received = Some(epsilon);
            best.first().copied()
        };
        choose_next_action(&mdp, &"S", 0.42, &q, &mut selector).unwrap();
        assert_eq!(received, Some(0.42));
    }

    #[test]
    fn test_terminal_and_goal_rejected() {
        let mdp = create_test_mdp();
        let q = QTable::new();
        let mut selector = RandomEpsilonGreedy::seeded(mdp.actions().to_vec(), 7);

        assert!(matches!(
            choose_next_action(&mdp, &"T", 0.1, &q, &mut selector),
            Err(TohError::Precondition(_))
        ));
        assert!(matches!(
            choose_next_action(&mdp, &"G", 0.1, &q, &mut selector),
            Err(TohError::Precondition(_))
        ));
    }

    #[test]
    fn test_invalid_epsilon_rejected() {
        let mdp = create_test_mdp();
        let q = QTable::new();
        let mut selector = RandomEpsilonGreedy::seeded(mdp.actions().to_vec(), 7);

        assert!(matches!(
            choose_next_action(&mdp, &"S", 1.1, &q, &mut selector),
            Err(TohError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_zero_epsilon_always_greedy() {
        let mdp = create_test_mdp();
        let mut q = QTable::new();
        q.insert("S", "b", 5.0);
        let mut selector = RandomEpsilonGreedy::seeded(mdp.actions().to_vec(), 11);

        for _ in 0..1000 {
            let action = choose_next_action(&mdp, &"S", 0.0, &q, &mut selector).unwrap();
            assert_eq!(action, "b");
        }
    }

    #[test]
    fn test_full_epsilon_is_uniform() {
        let mdp = create_test_mdp();
        let mut q = QTable::new();
        q.insert("S", "b", 5.0);
        let mut selector = RandomEpsilonGreedy::seeded(mdp.actions().to_vec(), 13);

        let trials = 6000;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for _ in 0..trials {
            let action = choose_next_action(&mdp, &"S", 1.0, &q, &mut selector).unwrap();
            *counts.entry(action).or_default() += 1;
        }

        for action in mdp.actions() {
            let count = counts.get(action).copied().unwrap_or(0);
            // Expected 2000 each, sd ~37
            assert!(
                (1800..=2200).contains(&count),
                "action {action} chosen {count} times"
            );
        }
    }

    #[test]
    fn test_random_selector_ties_uniform() {
        let mut selector = RandomEpsilonGreedy::seeded(vec![1, 2, 3, 4], 3);
        let mut counts = [0usize; 5];
        for _ in 0..4000 {
            let a = selector.select(&[2, 4], 0.0).unwrap();
            counts[a] += 1;
        }
        assert_eq!(counts[1] + counts[3], 0);
        assert!((1800..=2200).contains(&counts[2]));
        assert!((1800..=2200).contains(&counts[4]));
    }

    #[test]
    fn test_random_selector_empty_inputs() {
        let mut empty: RandomEpsilonGreedy<u8> = RandomEpsilonGreedy::seeded(vec![], 1);
        assert_eq!(empty.select(&[], 0.5), None);
        assert_eq!(empty.select(&[9], 1.0), Some(9));
    }
}
