//! Greedy policy and value extraction from a Q table

use std::hash::Hash;

use toh_core::Mdp;

use crate::table::{Policy, QTable, VTable};

/// Map every nonterminal state to its highest-valued action.
///
/// Actions are scanned in canonical order and the running best is replaced on
/// `>=`, so the last of several tied actions wins. Actions without a Q entry
/// are skipped; a state with no entries at all maps to `None`.
pub fn extract_policy<M: Mdp>(
    mdp: &M,
    q_table: &QTable<M::State, M::Action>,
) -> Policy<M::State, M::Action> {
    mdp.nonterminal_states()
        .iter()
        .map(|s| {
            let mut best_action = None;
            let mut best_value = f64::NEG_INFINITY;
            for a in mdp.actions() {
                if let Some(q) = q_table.get(s, a) {
                    if q >= best_value {
                        best_value = q;
                        best_action = Some(a.clone());
                    }
                }
            }
            (s.clone(), best_action)
        })
        .collect()
}

/// Per-state maximum over the entries present in `q_table`
pub fn extract_v_table<S, A>(q_table: &QTable<S, A>) -> VTable<S>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    let mut v_table = VTable::new();
    for (s, _, q) in q_table.iter() {
        let best = v_table.get(s).map_or(q, |v: f64| v.max(q));
        v_table.insert(s.clone(), best);
    }
    v_table
}

#[cfg(test)]
mod tests {
    use super::*;
    use toh_core::TableMdp;

    fn create_two_action_mdp() -> TableMdp<&'static str, &'static str> {
        TableMdp::builder("T", 0.5)
            .state("A")
            .state("B")
            .action("x")
            .action("y")
            .outcome("A", "x", "T", 1.0, 0.0)
            .outcome("A", "y", "T", 1.0, 0.0)
            .outcome("B", "x", "T", 1.0, 0.0)
            .outcome("B", "y", "T", 1.0, 0.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_extract_unique_maximum() {
        let mdp = create_two_action_mdp();
        let mut q = QTable::new();
        q.insert("A", "x", 1.0);
        q.insert("A", "y", -1.0);
        q.insert("B", "x", 0.5);
        q.insert("B", "y", 2.0);

        let policy = extract_policy(&mdp, &q);
        assert_eq!(policy.len(), 2);
        assert_eq!(policy[&"A"], Some("x"));
        assert_eq!(policy[&"B"], Some("y"));
    }

    #[test]
    fn test_ties_pick_last_action() {
        let mdp = create_two_action_mdp();
        let q = QTable::zeros(mdp.nonterminal_states(), mdp.actions());

        let policy = extract_policy(&mdp, &q);
        assert_eq!(policy[&"A"], Some("y"));
    }

    #[test]
    fn test_missing_entries_yield_sentinel() {
        let mdp = create_two_action_mdp();
        let mut q = QTable::new();
        q.insert("A", "x", 3.0);

        let policy = extract_policy(&mdp, &q);
        assert_eq!(policy[&"A"], Some("x"));
        assert_eq!(policy[&"B"], None);
        assert!(!policy.contains_key(&"T"));
    }

    #[test]
    fn test_negative_values_still_chosen() {
        let mdp = create_two_action_mdp();
        let mut q = QTable::new();
        q.insert("A", "x", -5.0);
        q.insert("A", "y", -7.0);

        let policy = extract_policy(&mdp, &q);
        assert_eq!(policy[&"A"], Some("x"));
    }

    #[test]
    fn test_extract_v_table() {
        let mut q = QTable::new();
        q.insert("A", "x", 1.0);
        q.insert("A", "y", 4.0);
        q.insert("B", "x", -2.0);

        let v = extract_v_table(&q);
        assert_eq!(v.len(), 2);
        assert_eq!(v.get(&"A"), Some(4.0));
        assert_eq!(v.get(&"B"), Some(-2.0));
        assert_eq!(v.get(&"C"), None);
    }
}
