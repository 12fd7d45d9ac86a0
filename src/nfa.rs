// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use log::warn;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The role a generated state was created for. Each role owns a monotonic
/// counter inside the automaton, so generated names are stable per automaton
/// and independent minimization runs never interfere.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Role {
    Merge,
    Tmp,
    Init,
    Final,
}

/// An opaque state identifier.
///
/// States read from a file keep their textual name; states generated by the
/// engine carry a role tag and a counter instead. A generated identifier
/// therefore never collides with a parsed one, and the printable name is
/// only recovered at serialization time.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum StateId {
    Named(String),
    Fresh(Role, u32),
}

impl StateId {
    pub fn named(name: &str) -> StateId {
        StateId::Named(name.to_owned())
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StateId::Named(name) => f.write_str(name),
            StateId::Fresh(Role::Merge, n) => write!(f, "m{}", n),
            StateId::Fresh(Role::Tmp, n) => write!(f, "t{}", n),
            StateId::Fresh(Role::Init, n) => write!(f, "init{}", n),
            StateId::Fresh(Role::Final, n) => write!(f, "Final{}", n),
        }
    }
}

/// An input letter. Letters are opaque to the engine: they are only ever
/// compared for equality and ordering.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(sym: &str) -> Symbol {
        Symbol(sym.to_owned())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Selects one of the two transition indices.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Direction {
    Forward,
    Backward,
}

/// One of the twin transition indices: `state -> symbol -> target set`.
/// The forward and backward indices are exact transposes of each other, and
/// emptied inner maps and sets are pruned eagerly. All mutation goes through
/// `add_transition` and `prune_transition` so the transpose cannot drift.
pub type TransitionIndex = BTreeMap<StateId, BTreeMap<Symbol, BTreeSet<StateId>>>;

/// `Nfa` represents a nondeterministic finite automaton: a state set with
/// initial and accepting marks and redundant forward/backward transition
/// indices. The backward index buys cheap predecessor queries, which the
/// equivalence probe and the family detector lean on heavily.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Nfa {
    states: BTreeSet<StateId>,
    initial: BTreeSet<StateId>,
    accepting: BTreeSet<StateId>,
    forward: TransitionIndex,
    backward: TransitionIndex,
    counters: [u32; 4],
}

impl Nfa {
    pub fn new() -> Nfa {
        Nfa::default()
    }

    pub fn states(&self) -> &BTreeSet<StateId> {
        &self.states
    }

    pub fn initial(&self) -> &BTreeSet<StateId> {
        &self.initial
    }

    pub fn accepting(&self) -> &BTreeSet<StateId> {
        &self.accepting
    }

    pub fn forward(&self) -> &TransitionIndex {
        &self.forward
    }

    pub fn backward(&self) -> &TransitionIndex {
        &self.backward
    }

    pub(crate) fn index(&self, dir: Direction) -> &TransitionIndex {
        match dir {
            Direction::Forward => &self.forward,
            Direction::Backward => &self.backward,
        }
    }

    /// The set a probe run terminates against: accepting states when walking
    /// forward, initial states when walking backward.
    pub(crate) fn boundary(&self, dir: Direction) -> &BTreeSet<StateId> {
        match dir {
            Direction::Forward => &self.accepting,
            Direction::Backward => &self.initial,
        }
    }

    /// Marks `state` as initial, adding it to the automaton if needed.
    pub fn mark_initial(&mut self, state: &StateId) {
        self.states.insert(state.clone());
        self.initial.insert(state.clone());
    }

    /// Marks `state` as accepting, adding it to the automaton if needed.
    pub fn mark_accepting(&mut self, state: &StateId) {
        self.states.insert(state.clone());
        self.accepting.insert(state.clone());
    }

    /// Inserts the transition `(from) --sym--> (to)` into both indices.
    /// Both endpoints are added to the state set. Adding an edge twice has
    /// no effect.
    pub fn add_transition(&mut self, from: &StateId, sym: &Symbol, to: &StateId) {
        self.states.insert(from.clone());
        self.states.insert(to.clone());
        self.forward
            .entry(from.clone())
            .or_default()
            .entry(sym.clone())
            .or_default()
            .insert(to.clone());
        self.backward
            .entry(to.clone())
            .or_default()
            .entry(sym.clone())
            .or_default()
            .insert(from.clone());
    }

    /// Removes the transition `(from) --sym--> (to)` from both indices,
    /// garbage-collecting emptied inner keys. Both endpoints stay in the
    /// automaton. Returns whether the edge was present; pruning an absent
    /// edge only logs a warning.
    pub fn prune_transition(&mut self, from: &StateId, sym: &Symbol, to: &StateId) -> bool {
        let forward = Self::remove_edge(&mut self.forward, from, sym, to);
        let backward = Self::remove_edge(&mut self.backward, to, sym, from);
        if !forward || !backward {
            warn!(
                "prune_transition: ({}) --{}--> ({}) is not present",
                from, sym, to
            );
        }
        forward && backward
    }

    fn remove_edge(index: &mut TransitionIndex, from: &StateId, sym: &Symbol, to: &StateId) -> bool {
        let Some(by_symbol) = index.get_mut(from) else {
            return false;
        };
        let Some(targets) = by_symbol.get_mut(sym) else {
            return false;
        };
        let removed = targets.remove(to);
        if targets.is_empty() {
            by_symbol.remove(sym);
        }
        if by_symbol.is_empty() {
            index.remove(from);
        }
        removed
    }

    /// Tests whether `state` is dead with a purely local check: a state with
    /// no successors apart from self-loops that is not accepting can never
    /// reach an accepting state, and symmetrically on the backward side.
    /// Querying an absent state warns and reports it live.
    pub fn is_dead_state(&self, state: &StateId) -> bool {
        if !self.states.contains(state) {
            warn!("is_dead_state: state ({}) does not exist in the automaton", state);
            return false;
        }

        let live_successor = self
            .forward
            .get(state)
            .map_or(false, |by_symbol| by_symbol.values().flatten().any(|t| t != state));
        if !live_successor && !self.accepting.contains(state) {
            return true;
        }

        let live_predecessor = self
            .backward
            .get(state)
            .map_or(false, |by_symbol| by_symbol.values().flatten().any(|t| t != state));
        if !live_predecessor && !self.initial.contains(state) {
            return true;
        }

        false
    }

    /// Deletes `state` from the state set and both marks. The state is
    /// expected to have no incident transitions left; if it does, a warning
    /// is logged and its own index entries are dropped anyway.
    pub fn remove_state(&mut self, state: &StateId) {
        if !self.states.contains(state) {
            warn!("remove_state: state ({}) does not exist in the automaton", state);
        }
        if self.forward.contains_key(state) || self.backward.contains_key(state) {
            warn!("remove_state: state ({}) still has incident transitions", state);
        }
        self.states.remove(state);
        self.initial.remove(state);
        self.accepting.remove(state);
        self.forward.remove(state);
        self.backward.remove(state);
    }

    fn first_edge(index: &TransitionIndex, state: &StateId) -> Option<(Symbol, StateId)> {
        let by_symbol = index.get(state)?;
        let (sym, targets) = by_symbol.iter().next()?;
        let target = targets.iter().next()?;
        Some((sym.clone(), target.clone()))
    }

    /// Prunes every transition incident to `state` and then the state
    /// itself. Each neighbour that becomes dead in the process is pruned
    /// recursively; the state being pruned is skipped so that a self-loop
    /// cannot restart the cascade.
    pub fn prune_state(&mut self, state: &StateId) {
        if !self.states.contains(state) {
            warn!("prune_state: state ({}) no longer exists", state);
        }

        while let Some((sym, to)) = Self::first_edge(&self.forward, state) {
            self.prune_transition(state, &sym, &to);
            if to != *state && self.states.contains(&to) && self.is_dead_state(&to) {
                self.prune_state(&to);
            }
        }

        while let Some((sym, from)) = Self::first_edge(&self.backward, state) {
            self.prune_transition(&from, &sym, state);
            if from != *state && self.states.contains(&from) && self.is_dead_state(&from) {
                self.prune_state(&from);
            }
        }

        self.remove_state(state);
    }

    /// Creates a fresh state for `role` and adds it to the state set (but to
    /// neither mark; marking is the caller's business).
    pub fn create_fresh(&mut self, role: Role) -> StateId {
        let counter = &mut self.counters[role as usize];
        let state = StateId::Fresh(role, *counter);
        *counter += 1;
        assert!(
            self.states.insert(state.clone()),
            "fresh state ({}) collides with an existing state",
            state
        );
        state
    }

    /// Folds every state of `group` into one fresh merge state.
    ///
    /// All incident edges of the members are replicated onto the new state;
    /// a member's self-loop becomes a self-loop of the merged state. The new
    /// state is marked initial (resp. accepting) if any member was, and the
    /// members are pruned afterwards. The caller is responsible for only
    /// merging language-compatible groups.
    pub fn merge_states(&mut self, group: &BTreeSet<StateId>) -> StateId {
        let merged = self.create_fresh(Role::Merge);

        for state in group {
            let outgoing: Vec<(Symbol, StateId)> = self
                .forward
                .get(state)
                .into_iter()
                .flat_map(|by_symbol| {
                    by_symbol
                        .iter()
                        .flat_map(|(sym, targets)| targets.iter().map(move |to| (sym.clone(), to.clone())))
                })
                .collect();
            for (sym, to) in outgoing {
                if to == *state {
                    self.add_transition(&merged, &sym, &merged);
                } else {
                    self.add_transition(&merged, &sym, &to);
                }
            }

            let incoming: Vec<(StateId, Symbol)> = self
                .backward
                .get(state)
                .into_iter()
                .flat_map(|by_symbol| {
                    by_symbol
                        .iter()
                        .flat_map(|(sym, sources)| sources.iter().map(move |from| (from.clone(), sym.clone())))
                })
                .collect();
            for (from, sym) in incoming {
                if from == *state {
                    self.add_transition(&merged, &sym, &merged);
                } else {
                    self.add_transition(&from, &sym, &merged);
                }
            }
        }

        if group.iter().any(|s| self.accepting.contains(s)) {
            self.accepting.insert(merged.clone());
        }
        if group.iter().any(|s| self.initial.contains(s)) {
            self.initial.insert(merged.clone());
        }

        for state in group {
            if self.states.contains(state) {
                self.prune_state(state);
            }
        }

        merged
    }

    /// The set of symbols occurring in the automaton, computed from the
    /// forward index.
    pub fn alphabet(&self) -> BTreeSet<Symbol> {
        self.forward
            .values()
            .flat_map(|by_symbol| by_symbol.keys())
            .cloned()
            .collect()
    }

    /// The number of transitions, counted on the forward index.
    pub fn transition_count(&self) -> usize {
        self.forward
            .values()
            .flat_map(|by_symbol| by_symbol.values())
            .map(|targets| targets.len())
            .sum()
    }

    /// All neighbours of `state` in the given direction, not counting the
    /// state itself.
    pub fn non_self_neighbours(&self, dir: Direction, state: &StateId) -> BTreeSet<StateId> {
        let mut neighbours = BTreeSet::new();
        if let Some(by_symbol) = self.index(dir).get(state) {
            for targets in by_symbol.values() {
                neighbours.extend(targets.iter().filter(|t| *t != state).cloned());
            }
        }
        neighbours
    }

    /// The symbols witnessing an edge from `from` to `to` in the given
    /// direction, at distance one. `witness_symbols(Forward, s, s)` is the
    /// set of self-loop symbols of `s`.
    pub fn witness_symbols(&self, dir: Direction, from: &StateId, to: &StateId) -> BTreeSet<Symbol> {
        self.index(dir)
            .get(from)
            .map(|by_symbol| {
                by_symbol
                    .iter()
                    .filter(|(_, targets)| targets.contains(to))
                    .map(|(sym, _)| sym.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn closure(&self, dir: Direction, seeds: &BTreeSet<StateId>) -> BTreeSet<StateId> {
        let mut seen = BTreeSet::new();
        let mut open: Vec<StateId> = seeds.iter().cloned().collect();
        while let Some(state) = open.pop() {
            if !seen.insert(state.clone()) {
                continue;
            }
            if let Some(by_symbol) = self.index(dir).get(&state) {
                for targets in by_symbol.values() {
                    open.extend(targets.iter().filter(|t| !seen.contains(*t)).cloned());
                }
            }
        }
        seen
    }

    /// Keeps only states that are reachable from an initial state and can
    /// reach an accepting state; everything else is pruned.
    pub fn clean_dead_states(&mut self) {
        let reachable = self.closure(Direction::Forward, &self.initial);
        let coreachable = self.closure(Direction::Backward, &self.accepting);
        let doomed: Vec<StateId> = self
            .states
            .iter()
            .filter(|s| !reachable.contains(*s) || !coreachable.contains(*s))
            .cloned()
            .collect();
        for state in doomed {
            // A cascade from an earlier prune may already have taken it.
            if self.states.contains(&state) {
                self.prune_state(&state);
            }
        }
    }

    /// Replaces several initial states with one central initial state that
    /// copies their outgoing behaviour. The old initial states lose their
    /// mark and are pruned if that leaves them dead.
    pub fn make_one_initial(&mut self) {
        if self.initial.len() <= 1 {
            return;
        }

        let central = self.create_fresh(Role::Init);
        let outgoing: Vec<(Symbol, StateId)> = self
            .initial
            .iter()
            .filter_map(|init| self.forward.get(init))
            .flat_map(|by_symbol| {
                by_symbol
                    .iter()
                    .flat_map(|(sym, targets)| targets.iter().map(move |to| (sym.clone(), to.clone())))
            })
            .collect();
        for (sym, to) in outgoing {
            self.add_transition(&central, &sym, &to);
        }
        if self.initial.iter().any(|s| self.accepting.contains(s)) {
            self.accepting.insert(central.clone());
        }

        let old = std::mem::take(&mut self.initial);
        self.initial.insert(central);
        for state in old {
            if self.states.contains(&state) && self.is_dead_state(&state) {
                self.prune_state(&state);
            }
        }
    }

    /// Replaces several accepting states with one central accepting state
    /// that copies their incoming behaviour. Accepting states that are also
    /// initial keep their mark; the central state is pruned again when no
    /// behaviour could be copied onto it.
    pub fn make_central_final(&mut self) {
        if self.accepting.len() <= 1 {
            return;
        }

        let central = self.create_fresh(Role::Final);
        let incoming: Vec<(StateId, Symbol)> = self
            .accepting
            .iter()
            .filter(|fin| !self.initial.contains(*fin))
            .filter_map(|fin| self.backward.get(fin))
            .flat_map(|by_symbol| {
                by_symbol
                    .iter()
                    .flat_map(|(sym, sources)| sources.iter().map(move |from| (from.clone(), sym.clone())))
            })
            .collect();
        for (from, sym) in incoming {
            self.add_transition(&from, &sym, &central);
        }

        let old = std::mem::take(&mut self.accepting);
        self.accepting.insert(central.clone());
        let still_accepting: Vec<StateId> = old.intersection(&self.initial).cloned().collect();
        for state in still_accepting {
            self.accepting.insert(state);
        }

        if self.is_dead_state(&central) {
            self.prune_state(&central);
        }
        for state in old {
            if self.states.contains(&state) && self.is_dead_state(&state) {
                self.prune_state(&state);
            }
        }
    }

    /// Runs the automaton on `word` by subset simulation. There are no
    /// epsilon transitions, so the frontier only ever moves on letters.
    pub fn accepts(&self, word: &[Symbol]) -> bool {
        let mut frontier: BTreeSet<StateId> = self.initial.clone();
        for sym in word {
            let mut next = BTreeSet::new();
            for state in &frontier {
                if let Some(targets) = self.forward.get(state).and_then(|by_symbol| by_symbol.get(sym)) {
                    next.extend(targets.iter().cloned());
                }
            }
            if next.is_empty() {
                return false;
            }
            frontier = next;
        }
        frontier.iter().any(|state| self.accepting.contains(state))
    }
}
