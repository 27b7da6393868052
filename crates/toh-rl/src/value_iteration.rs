//! One synchronous sweep of value iteration

use std::hash::Hash;

use toh_core::{Mdp, Result, TohError};

use crate::table::{QTable, VTable};

/// Tables produced by one value iteration sweep
#[derive(Debug, Clone)]
pub struct ValueSweep<S: Eq + Hash, A: Eq + Hash> {
    pub v_table: VTable<S>,
    pub q_table: QTable<S, A>,
    /// max |V_k(s) - V_k+1(s)| over nonterminal states
    pub max_delta: f64,
}

/// Apply the Bellman optimality operator once.
///
/// For each nonterminal state `s` and action `a`:
/// `Q(s,a) = Σ_s' T(s,a,s') · (R(s,a,s') + γ·V(s'))` and `V'(s) = max_a Q(s,a)`.
/// The sum is accumulated over [`Mdp::successors`]: states with
/// `T(s,a,s') = 0` add nothing, so this equals the sum over every state,
/// terminal included, at `O(|S|·|A|·successors)` per sweep. Every read goes
/// to the previous table; `v_table` itself is left untouched and the terminal
/// entry is copied through unchanged.
pub fn value_iteration<M: Mdp>(
    mdp: &M,
    v_table: &VTable<M::State>,
) -> Result<ValueSweep<M::State, M::Action>> {
    if mdp.actions().is_empty() {
        return Err(TohError::EmptyActionSet);
    }

    let gamma = mdp.gamma();
    let mut new_v_table = v_table.clone();
    let mut q_table = QTable::new();
    let mut max_delta: f64 = 0.0;

    for s in mdp.nonterminal_states() {
        let mut best = f64::NEG_INFINITY;
        for a in mdp.actions() {
            let q: f64 = mdp
                .successors(s, a)
                .iter()
                .map(|(next, p)| p * (mdp.reward(s, a, next) + gamma * v_table.value(next)))
                .sum();
            q_table.insert(s.clone(), a.clone(), q);
            best = best.max(q);
        }

        max_delta = max_delta.max((best - v_table.value(s)).abs());
        new_v_table.insert(s.clone(), best);
    }

    Ok(ValueSweep {
        v_table: new_v_table,
        q_table,
        max_delta,
    })
}
