// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::equiv::{states_eq, StatePair};
use crate::families::merge_overlapping;
use crate::nfa::{Nfa, StateId, Symbol};
use crate::rewrite::expand_family;
use crate::solver::select_merges;
use std::collections::BTreeSet;

/// A snapshot of a state set: the states themselves, every incident edge in
/// both directions, and the intersection with the initial and accepting
/// marks. Restoring re-adds the edges and marks, which also resurrects the
/// snapshot states; states created after the capture are the caller's
/// responsibility.
pub struct Backup {
    states: BTreeSet<StateId>,
    edges: Vec<(StateId, Symbol, StateId)>,
    initial: BTreeSet<StateId>,
    accepting: BTreeSet<StateId>,
}

impl Backup {
    pub fn capture(aut: &Nfa, states: &BTreeSet<StateId>) -> Backup {
        let mut edges = Vec::new();
        for state in states {
            if let Some(by_symbol) = aut.backward().get(state) {
                for (sym, sources) in by_symbol {
                    for from in sources {
                        edges.push((from.clone(), sym.clone(), state.clone()));
                    }
                }
            }
            if let Some(by_symbol) = aut.forward().get(state) {
                for (sym, targets) in by_symbol {
                    for to in targets {
                        edges.push((state.clone(), sym.clone(), to.clone()));
                    }
                }
            }
        }
        Backup {
            states: states.clone(),
            edges,
            initial: aut.initial().intersection(states).cloned().collect(),
            accepting: aut.accepting().intersection(states).cloned().collect(),
        }
    }

    pub fn states(&self) -> &BTreeSet<StateId> {
        &self.states
    }

    pub fn restore(&self, aut: &mut Nfa) {
        for (from, sym, to) in &self.edges {
            aut.add_transition(from, sym, to);
        }
        for state in &self.initial {
            aut.mark_initial(state);
        }
        for state in &self.accepting {
            aut.mark_accepting(state);
        }
    }
}

fn restricted_to(pairs: &BTreeSet<StatePair>, cluster: &BTreeSet<StateId>) -> BTreeSet<StatePair> {
    pairs
        .iter()
        .filter(|(r, _)| cluster.contains(r))
        .cloned()
        .collect()
}

/// One round of merging inside a family: probe all pairs, split them into
/// independent clusters, let the solver pick a compatible merge set per
/// cluster, and apply each suggested group atomically. The family is updated
/// in place (merged members out, merge results in).
///
/// Returns false when the family admits no further merge.
pub fn minimize_family(
    aut: &mut Nfa,
    family: &mut BTreeSet<StateId>,
    lookahead: u32,
    solver_timeout_ms: u64,
) -> bool {
    let (backward_eq, forward_eq) = states_eq(aut, family, lookahead);
    if backward_eq.is_empty() && forward_eq.is_empty() {
        return false;
    }

    let before = family.clone();

    // Clusters of states connected by some equivalent pair do not influence
    // each other; solving them separately keeps the instances small.
    let pair_sets: Vec<BTreeSet<StateId>> = backward_eq
        .iter()
        .chain(forward_eq.iter())
        .map(|(r, s)| [r.clone(), s.clone()].into_iter().collect())
        .collect();
    for cluster in merge_overlapping(pair_sets) {
        let groups = select_merges(
            &restricted_to(&backward_eq, &cluster),
            &restricted_to(&forward_eq, &cluster),
            solver_timeout_ms,
        );
        for group in groups {
            let merged = aut.merge_states(&group);
            for state in &group {
                family.remove(state);
            }
            family.insert(merged);
        }
    }

    *family != before
}

/// The top-level minimization loop.
///
/// Detects merge families, rewrites each into pseudo-states, and merges
/// within it until a fixed point. Every family entry captures a backup; when
/// a rewrite ends up with more states than it replaced, the leftovers are
/// pruned and the backup restored, so the automaton never grows. Fully
/// processed families are memoized by their exact state set, which lets the
/// loop pick up a strictly larger family for the same region later.
pub fn solver_minimization(
    aut: &mut Nfa,
    lookahead: u32,
    allow_self_loops: bool,
    solver_timeout_ms: u64,
) {
    let mut closed: BTreeSet<BTreeSet<StateId>> = BTreeSet::new();

    loop {
        let pending: Vec<BTreeSet<StateId>> = aut
            .families(allow_self_loops)
            .into_iter()
            .filter(|family| !closed.contains(family))
            .collect();
        if pending.is_empty() {
            break;
        }

        for family in pending {
            let backup = Backup::capture(aut, &family);
            let mut family = expand_family(aut, &family);

            loop {
                if !minimize_family(aut, &mut family, lookahead, solver_timeout_ms) {
                    if family.len() > backup.states().len() {
                        // The rewrite made things worse; drop what the
                        // attempt left behind, then replay the snapshot.
                        // Anything a leftover prune cascades over comes back
                        // with the snapshot's edges.
                        let leftovers: Vec<StateId> = family
                            .iter()
                            .filter(|state| !backup.states().contains(*state))
                            .cloned()
                            .collect();
                        for state in leftovers {
                            if aut.states().contains(&state) {
                                aut.prune_state(&state);
                            }
                        }
                        backup.restore(aut);
                        family = backup.states().clone();
                    }
                    closed.insert(family);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfa::Symbol;

    fn st(name: &str) -> StateId {
        StateId::named(name)
    }

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    fn word(letters: &[&str]) -> Vec<Symbol> {
        letters.iter().map(|l| sym(l)).collect()
    }

    fn fan_out() -> Nfa {
        let mut nfa = Nfa::new();
        nfa.add_transition(&st("i"), &sym("a"), &st("q1"));
        nfa.add_transition(&st("i"), &sym("a"), &st("q2"));
        nfa.add_transition(&st("q1"), &sym("b"), &st("f"));
        nfa.add_transition(&st("q2"), &sym("b"), &st("f"));
        nfa.mark_initial(&st("i"));
        nfa.mark_accepting(&st("f"));
        nfa
    }

    #[test]
    fn backup_restores_edges_and_marks() {
        let mut nfa = fan_out();
        nfa.mark_accepting(&st("q1"));
        let snapshot: BTreeSet<StateId> = [st("q1")].into_iter().collect();
        let backup = Backup::capture(&nfa, &snapshot);

        nfa.prune_state(&st("q1"));
        assert!(!nfa.states().contains(&st("q1")));

        backup.restore(&mut nfa);
        assert!(nfa.states().contains(&st("q1")));
        assert!(nfa.accepting().contains(&st("q1")));
        assert!(nfa.forward()[&st("i")][&sym("a")].contains(&st("q1")));
        assert!(nfa.forward()[&st("q1")][&sym("b")].contains(&st("f")));
    }

    #[test]
    fn expanded_fan_out_merges_back_to_one_state() {
        let mut nfa = fan_out();
        let family: BTreeSet<StateId> = [st("q1"), st("q2")].into_iter().collect();
        let mut family = expand_family(&mut nfa, &family);
        assert_eq!(family.len(), 2);

        assert!(minimize_family(&mut nfa, &mut family, 1, 60_000));
        assert_eq!(family.len(), 1);
        assert!(!minimize_family(&mut nfa, &mut family, 1, 60_000));

        assert_eq!(nfa.states().len(), 3);
        assert!(nfa.accepts(&word(&["a", "b"])));
        assert!(!nfa.accepts(&word(&["a"])));
    }

    #[test]
    fn minimization_reduces_the_fan_out() {
        let mut nfa = fan_out();
        solver_minimization(&mut nfa, 1, true, 60_000);
        assert_eq!(nfa.states().len(), 3);
        assert!(nfa.accepts(&word(&["a", "b"])));
    }

    #[test]
    fn minimization_merges_fan_outs_with_distinct_suffixes() {
        // q1 and q2 are not forward-equivalent, but they share their
        // predecessor language, so a backward merge folds them anyway.
        let mut nfa = Nfa::new();
        nfa.add_transition(&st("i"), &sym("a"), &st("q1"));
        nfa.add_transition(&st("i"), &sym("a"), &st("q2"));
        nfa.add_transition(&st("q1"), &sym("b"), &st("f"));
        nfa.add_transition(&st("q2"), &sym("c"), &st("g"));
        nfa.mark_initial(&st("i"));
        nfa.mark_accepting(&st("f"));
        nfa.mark_accepting(&st("g"));

        solver_minimization(&mut nfa, 1, true, 60_000);
        assert_eq!(nfa.states().len(), 4);
        assert!(nfa.accepts(&word(&["a", "b"])));
        assert!(nfa.accepts(&word(&["a", "c"])));
        assert!(!nfa.accepts(&word(&["a"])));
    }

    #[test]
    fn deterministic_chain_is_left_alone() {
        let mut nfa = Nfa::new();
        nfa.add_transition(&st("i"), &sym("a"), &st("f"));
        nfa.mark_initial(&st("i"));
        nfa.mark_accepting(&st("f"));
        solver_minimization(&mut nfa, 1, true, 60_000);
        assert_eq!(nfa.states().len(), 2);
        assert!(nfa.accepts(&word(&["a"])));
    }
}
