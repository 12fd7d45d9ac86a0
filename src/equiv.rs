// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::nfa::{Direction, Nfa, StateId, Symbol};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// An unordered pair of states, stored with the smaller identifier first.
pub type StatePair = (StateId, StateId);

pub fn ordered_pair(r: &StateId, s: &StateId) -> StatePair {
    if r <= s {
        (r.clone(), s.clone())
    } else {
        (s.clone(), r.clone())
    }
}

impl Nfa {
    /// Decides whether `r` and `s` accept the same `lookahead`-bounded
    /// forward language: their successor-image trees must agree on symbol
    /// branching and accepting membership, and past the step bound no image
    /// may introduce a state that was never seen before.
    ///
    /// An accepted pair is genuinely language-equivalent (the run closes a
    /// bisimulation over image sets); a rejected pair may merely have
    /// outgrown the bound. Raising the bound therefore only ever certifies
    /// more pairs.
    pub fn is_forward_eq(&self, r: &StateId, s: &StateId, lookahead: u32) -> bool {
        self.bounded_eq(Direction::Forward, r, s, lookahead)
    }

    /// Mirror image of `is_forward_eq`: walks the backward index and tests
    /// boundary membership against the initial states.
    pub fn is_backward_eq(&self, r: &StateId, s: &StateId, lookahead: u32) -> bool {
        self.bounded_eq(Direction::Backward, r, s, lookahead)
    }

    /// The union of the images of `states` under every symbol. Only states
    /// with at least one transition contribute, so the result never holds an
    /// empty target set.
    fn merged_image(
        &self,
        dir: Direction,
        states: &BTreeSet<StateId>,
    ) -> BTreeMap<Symbol, BTreeSet<StateId>> {
        let mut image: BTreeMap<Symbol, BTreeSet<StateId>> = BTreeMap::new();
        for state in states {
            if let Some(by_symbol) = self.index(dir).get(state) {
                for (sym, targets) in by_symbol {
                    image
                        .entry(sym.clone())
                        .or_default()
                        .extend(targets.iter().cloned());
                }
            }
        }
        image
    }

    // Synchronous BFS over pairs of frontier images, one level per step.
    fn bounded_eq(&self, dir: Direction, r: &StateId, s: &StateId, lookahead: u32) -> bool {
        assert!(
            lookahead >= 1,
            "equivalence lookahead must be at least 1, got {}",
            lookahead
        );

        let boundary = self.boundary(dir);
        let mut level: Vec<(BTreeSet<StateId>, BTreeSet<StateId>)> =
            vec![(BTreeSet::from([r.clone()]), BTreeSet::from([s.clone()]))];
        let mut close: HashSet<(BTreeSet<StateId>, BTreeSet<StateId>)> = HashSet::new();
        let mut visited: BTreeSet<StateId> = BTreeSet::new();
        let mut steps = 0;

        while !level.is_empty() {
            close.extend(level.iter().cloned());
            let mut next_level = Vec::new();

            for (r_states, s_states) in &level {
                // Equal images are trivially equivalent from here on.
                if r_states == s_states {
                    continue;
                }

                // Exactly one side touching the boundary set is a
                // distinguishing trace.
                let r_marked = r_states.iter().any(|q| boundary.contains(q));
                let s_marked = s_states.iter().any(|q| boundary.contains(q));
                if r_marked != s_marked {
                    return false;
                }

                let r_image = self.merged_image(dir, r_states);
                let s_image = self.merged_image(dir, s_states);
                // Branching on different symbol sets distinguishes the pair.
                // Inner sets are never empty, so comparing keys is exact.
                if !r_image.keys().eq(s_image.keys()) {
                    return false;
                }

                for (sym, r_next) in &r_image {
                    let s_next = &s_image[sym];
                    // Past the step bound only previously visited states may
                    // appear in an image; anything else is an unexplored
                    // branch we cannot certify.
                    if steps >= lookahead
                        && (!r_next.is_subset(&visited) || !s_next.is_subset(&visited))
                    {
                        return false;
                    }
                    let item = (r_next.clone(), s_next.clone());
                    if !close.contains(&item) {
                        next_level.push(item);
                    }
                    visited.extend(r_next.iter().cloned());
                    visited.extend(s_next.iter().cloned());
                }
            }

            level = next_level;
            steps += 1;
        }

        true
    }
}

/// Computes the backward- and forward-equivalent unordered pairs over a
/// family, in that order. Self-pairs are not included.
pub fn states_eq(
    aut: &Nfa,
    family: &BTreeSet<StateId>,
    lookahead: u32,
) -> (BTreeSet<StatePair>, BTreeSet<StatePair>) {
    let mut backward = BTreeSet::new();
    let mut forward = BTreeSet::new();
    for (r, s) in family.iter().tuple_combinations() {
        if aut.is_forward_eq(r, s, lookahead) {
            forward.insert(ordered_pair(r, s));
        }
        if aut.is_backward_eq(r, s, lookahead) {
            backward.insert(ordered_pair(r, s));
        }
    }
    (backward, forward)
}
