//! The MDP surface consumed by the solvers

use std::fmt::Debug;
use std::hash::Hash;

/// A finite Markov Decision Process.
///
/// States include one distinguished terminal state. Actions come in a fixed,
/// canonical order that solvers rely on for tie-breaking. `transition` and
/// `reward` are defined for every `(s, a, s')` triple, the terminal state
/// included.
pub trait Mdp {
    type State: Clone + Eq + Hash + Debug;
    type Action: Clone + Eq + Hash + Debug;

    /// Every state, terminal included
    fn all_states(&self) -> &[Self::State];

    /// Every state except the terminal one
    fn nonterminal_states(&self) -> &[Self::State];

    /// All actions in canonical order
    fn actions(&self) -> &[Self::Action];

    /// The terminal state
    fn terminal(&self) -> &Self::State;

    fn is_terminal(&self, state: &Self::State) -> bool {
        state == self.terminal()
    }

    /// Whether `state` is a goal configuration (nonterminal, exits to terminal)
    fn is_goal(&self, state: &Self::State) -> bool;

    /// T(s, a, s')
    fn transition(&self, state: &Self::State, action: &Self::Action, next: &Self::State) -> f64;

    /// R(s, a, s')
    fn reward(&self, state: &Self::State, action: &Self::Action, next: &Self::State) -> f64;

    /// Discount factor in [0, 1)
    fn gamma(&self) -> f64;

    /// States reachable from `(state, action)` with nonzero probability,
    /// each listed once with its full `T(s, a, s')`.
    ///
    /// The default scans `all_states`; domains that know their dynamics
    /// should override it. Value iteration and sampling both go through
    /// this method.
    fn successors(&self, state: &Self::State, action: &Self::Action) -> Vec<(Self::State, f64)> {
        self.all_states()
            .iter()
            .filter_map(|next| {
                let p = self.transition(state, action, next);
                (p > 0.0).then(|| (next.clone(), p))
            })
            .collect()
    }
}
