// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::nfa::{Direction, Nfa, Role, StateId, Symbol};
use std::collections::BTreeSet;

// A missing predecessor or successor still produces one copy, wired on one
// side only.
fn with_sentinel(set: BTreeSet<StateId>) -> Vec<Option<StateId>> {
    if set.is_empty() {
        vec![None]
    } else {
        set.into_iter().map(Some).collect()
    }
}

/// Replaces every member of `family` with one `tmp` state per combination of
/// predecessor, incoming symbol, successor and outgoing symbol, replicating
/// the member's marks and self-loops onto each copy. The union of the copies'
/// languages equals the member's language, but each copy has at most one
/// incoming and one outgoing edge from outside, which makes the equivalence
/// probe far more likely to certify pairs of them.
///
/// Dead members are pruned instead of expanded. Returns the new working set.
pub fn expand_family(aut: &mut Nfa, family: &BTreeSet<StateId>) -> BTreeSet<StateId> {
    let mut fresh = BTreeSet::new();

    for state in family {
        // An earlier member's expansion may already have cascaded over this
        // one.
        if !aut.states().contains(state) {
            continue;
        }
        if aut.is_dead_state(state) {
            aut.prune_state(state);
            continue;
        }

        let predecessors = with_sentinel(aut.non_self_neighbours(Direction::Backward, state));
        let successors = with_sentinel(aut.non_self_neighbours(Direction::Forward, state));
        let loop_symbols: Vec<Symbol> = aut
            .witness_symbols(Direction::Forward, state, state)
            .into_iter()
            .collect();
        let was_initial = aut.initial().contains(state);
        let was_accepting = aut.accepting().contains(state);

        for predecessor in &predecessors {
            let in_symbols: Vec<Option<Symbol>> = match predecessor {
                Some(p) => aut
                    .witness_symbols(Direction::Backward, state, p)
                    .into_iter()
                    .map(Some)
                    .collect(),
                None => vec![None],
            };
            for successor in &successors {
                let out_symbols: Vec<Option<Symbol>> = match successor {
                    Some(q) => aut
                        .witness_symbols(Direction::Forward, state, q)
                        .into_iter()
                        .map(Some)
                        .collect(),
                    None => vec![None],
                };
                for in_sym in &in_symbols {
                    for out_sym in &out_symbols {
                        let copy = aut.create_fresh(Role::Tmp);
                        if was_initial {
                            aut.mark_initial(&copy);
                        }
                        if was_accepting {
                            aut.mark_accepting(&copy);
                        }
                        if let (Some(p), Some(sym)) = (predecessor, in_sym) {
                            aut.add_transition(p, sym, &copy);
                        }
                        if let (Some(q), Some(sym)) = (successor, out_sym) {
                            aut.add_transition(&copy, sym, q);
                        }
                        for loop_sym in &loop_symbols {
                            aut.add_transition(&copy, loop_sym, &copy);
                        }
                        fresh.insert(copy);
                    }
                }
            }
        }

        // The copies carry the whole language of the member now.
        aut.prune_state(state);
    }

    fresh
}
