//! One-step Q-learning update

use serde::{Deserialize, Serialize};
use toh_core::error::ensure_unit_interval;
use toh_core::{Mdp, Result, TohError};

use crate::table::QTable;

/// An observed (s, a, r, s') tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<S, A> {
    pub state: S,
    pub action: A,
    pub reward: f64,
    pub next_state: S,
}

impl<S, A> Transition<S, A> {
    pub fn new(state: S, action: A, reward: f64, next_state: S) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
        }
    }
}

/// Off-policy TD(0) update of `Q(s, a)` in place:
///
/// `Q(s,a) ← (1 − α)·Q(s,a) + α·(r + γ·max_a' Q(s',a'))`
///
/// Absent `(s', a')` entries count as 0 in the maximum and are not created.
/// `Q(s, a)` itself must already exist (see [`QTable::init`]); otherwise
/// `UninitializedEntry` is returned and the table is left unchanged.
pub fn q_update<M: Mdp>(
    mdp: &M,
    q_table: &mut QTable<M::State, M::Action>,
    transition: &Transition<M::State, M::Action>,
    alpha: f64,
) -> Result<()> {
    ensure_unit_interval("alpha", alpha)?;

    let Some(current) = q_table.get(&transition.state, &transition.action) else {
        return Err(TohError::UninitializedEntry(format!(
            "({:?}, {:?})",
            transition.state, transition.action
        )));
    };

    let max_next = q_table.max_over(&transition.next_state, mdp.actions(), 0.0);
    let sample = transition.reward + mdp.gamma() * max_next;

    q_table.insert(
        transition.state.clone(),
        transition.action.clone(),
        (1.0 - alpha) * current + alpha * sample,
    );
    Ok(())
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

    #[test]
    fn test_update_from_zero_table() {
        let mdp = create_chain();
        let mut q = QTable::zeros(mdp.nonterminal_states(), mdp.actions());

        q_update(&mdp, &mut q, &Transition::new("S1", "Right", 10.0, "S2"), 0.5).unwrap();
        assert_eq!(q.get(&"S1", &"Right"), Some(5.0));
        assert_eq!(q.get(&"S1", &"Left"), Some(0.0));
    }

    #[test]
    fn test_update_uses_max_of_next_state() {
        let mdp = create_chain();
        let mut q = QTable::zeros(mdp.nonterminal_states(), mdp.actions());
        q.insert("S2", "Left", 2.0);
        q.insert("S2", "Right", 8.0);
        q.insert("S1", "Right", 1.0);

        q_update(&mdp, &mut q, &Transition::new("S1", "Right", 0.0, "S2"), 0.25).unwrap();
        // 0.75 * 1 + 0.25 * (0 + 0.9 * 8)
        assert!((q.value(&"S1", &"Right") - 2.55).abs() < 1e-12);
    }

    #[test]
    fn test_missing_next_entries_count_as_zero() {
        let mdp = create_chain();
        let mut q = QTable::new();
        q.init("S2", "Right");
        q.insert("S1", "Left", -4.0);

        // Absent (S1, Right) reads as 0 and beats the stored -4
        q_update(&mdp, &mut q, &Transition::new("S2", "Right", 1.0, "S1"), 1.0).unwrap();
        assert_eq!(q.get(&"S2", &"Right"), Some(1.0));
        assert!(!q.contains(&"S1", &"Right"));

        // Terminal next state has no entries and they are not created
        q_update(&mdp, &mut q, &Transition::new("S2", "Right", 10.0, "T"), 1.0).unwrap();
        assert_eq!(q.get(&"S2", &"Right"), Some(10.0));
        assert!(!q.contains(&"T", &"Left"));
        assert!(!q.contains(&"T", &"Right"));
    }

    #[test]
    fn test_uninitialized_entry_rejected() {
        let mdp = create_chain();
        let mut q = QTable::new();

        let err = q_update(&mdp, &mut q, &Transition::new("S1", "Left", 1.0, "S1"), 0.5)
            .unwrap_err();
        assert!(matches!(err, TohError::UninitializedEntry(_)));
        assert!(q.is_empty());
    }

    #[test]
    fn test_alpha_out_of_range_rejected() {
        let mdp = create_chain();
        let mut q = QTable::zeros(mdp.nonterminal_states(), mdp.actions());
        let t = Transition::new("S1", "Left", 1.0, "S1");

        assert!(q_update(&mdp, &mut q, &t, 1.5).is_err());
        assert!(q_update(&mdp, &mut q, &t, -0.1).is_err());
        assert_eq!(q.get(&"S1", &"Left"), Some(0.0));
    }

    #[test]
    fn test_alpha_zero_is_noop_and_one_replaces() {
        let mdp = create_chain();
        let mut q = QTable::zeros(mdp.nonterminal_states(), mdp.actions());
        q.insert("S1", "Left", 3.0);
        let t = Transition::new("S1", "Left", 1.0, "T");

        q_update(&mdp, &mut q, &t, 0.0).unwrap();
        assert_eq!(q.get(&"S1", &"Left"), Some(3.0));

        q_update(&mdp, &mut q, &t, 1.0).unwrap();
        assert_eq!(q.get(&"S1", &"Left"), Some(1.0));
    }
}
