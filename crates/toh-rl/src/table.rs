//! Value, Q-value, and policy tables

use std::collections::HashMap;
use std::hash::Hash;

/// Greedy policy: `None` marks a state for which no action could be chosen
pub type Policy<S, A> = HashMap<S, Option<A>>;

/// Estimated state values. Absent states read as 0.
#[derive(Debug, Clone, PartialEq)]
pub struct VTable<S: Eq + Hash> {
    values: HashMap<S, f64>,
}

impl<S: Clone + Eq + Hash> VTable<S> {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Every given state at 0
    pub fn zeros(states: &[S]) -> Self {
        Self {
            values: states.iter().cloned().map(|s| (s, 0.0)).collect(),
        }
    }

    pub fn get(&self, state: &S) -> Option<f64> {
        self.values.get(state).copied()
    }

    /// Value of `state`, defaulting to 0
    pub fn value(&self, state: &S) -> f64 {
        self.get(state).unwrap_or(0.0)
    }

    pub fn insert(&mut self, state: S, value: f64) {
        self.values.insert(state, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, f64)> {
        self.values.iter().map(|(s, v)| (s, *v))
    }
}

impl<S: Clone + Eq + Hash> Default for VTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Eq + Hash> FromIterator<(S, f64)> for VTable<S> {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Sparse Q-value table keyed by `(state, action)`.
///
/// Entries are created lazily. Lookups choose their own default for absent
/// pairs through [`QTable::get_or`].
#[derive(Debug, Clone, PartialEq)]
pub struct QTable<S: Eq + Hash, A: Eq + Hash> {
    values: HashMap<(S, A), f64>,
}

impl<S, A> QTable<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Every `(state, action)` pair at 0
    pub fn zeros(states: &[S], actions: &[A]) -> Self {
        let mut table = Self::new();
        for s in states {
            for a in actions {
                table.insert(s.clone(), a.clone(), 0.0);
            }
        }
        table
    }

    pub fn get(&self, state: &S, action: &A) -> Option<f64> {
        // Tuple keys need owned parts for the lookup
        self.values.get(&(state.clone(), action.clone())).copied()
    }

    pub fn get_or(&self, state: &S, action: &A, default: f64) -> f64 {
        self.get(state, action).unwrap_or(default)
    }

    /// Q-value defaulting to 0 for absent pairs
    pub fn value(&self, state: &S, action: &A) -> f64 {
        self.get_or(state, action, 0.0)
    }

    pub fn contains(&self, state: &S, action: &A) -> bool {
        self.get(state, action).is_some()
    }

    pub fn insert(&mut self, state: S, action: A, value: f64) {
        self.values.insert((state, action), value);
    }

    /// Create the entry at 0 if it does not exist yet
    pub fn init(&mut self, state: S, action: A) {
        self.values.entry((state, action)).or_insert(0.0);
    }

    /// Largest value among `actions` for `state`, reading absent pairs as `default`
    pub fn max_over(&self, state: &S, actions: &[A], default: f64) -> f64 {
        actions
            .iter()
            .map(|a| self.get_or(state, a, default))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, &A, f64)> {
        self.values.iter().map(|((s, a), v)| (s, a, *v))
    }
}

impl<S, A> Default for QTable<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
