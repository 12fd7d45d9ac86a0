// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use nfa_reduce::{solver_minimization, Nfa, StateId, Symbol};
use quickcheck::{Arbitrary, Gen, QuickCheck};
use std::collections::BTreeSet;

fn st(name: &str) -> StateId {
    StateId::named(name)
}

fn sym(s: &str) -> Symbol {
    Symbol::new(s)
}

fn word(letters: &[&str]) -> Vec<Symbol> {
    letters.iter().map(|l| sym(l)).collect()
}

/// The full driver pipeline: sweep, minimize, sweep.
fn reduce(aut: &mut Nfa, lookahead: u32, allow_self_loops: bool, solver_timeout_ms: u64) {
    aut.clean_dead_states();
    solver_minimization(aut, lookahead, allow_self_loops, solver_timeout_ms);
    aut.clean_dead_states();
}

fn check_invariants(aut: &Nfa) {
    assert!(aut.initial().is_subset(aut.states()));
    assert!(aut.accepting().is_subset(aut.states()));
    for (from, by_symbol) in aut.forward() {
        assert!(!by_symbol.is_empty());
        for (s, targets) in by_symbol {
            assert!(!targets.is_empty());
            for to in targets {
                assert!(
                    aut.backward()[to][s].contains(from),
                    "missing transpose of ({})--{}-->({})",
                    from,
                    s,
                    to
                );
            }
        }
    }
    for (to, by_symbol) in aut.backward() {
        assert!(!by_symbol.is_empty());
        for (s, sources) in by_symbol {
            assert!(!sources.is_empty());
            for from in sources {
                assert!(aut.forward()[from][s].contains(to));
            }
        }
    }
}

/// Enumerates every word over `alphabet` up to `max_len` letters.
fn bounded_words(alphabet: &[Symbol], max_len: usize) -> Vec<Vec<Symbol>> {
    let mut words: Vec<Vec<Symbol>> = vec![Vec::new()];
    let mut frontier: Vec<Vec<Symbol>> = vec![Vec::new()];
    for _ in 0..max_len {
        let mut next = Vec::new();
        for w in &frontier {
            for s in alphabet {
                let mut longer = w.clone();
                longer.push(s.clone());
                next.push(longer);
            }
        }
        words.extend(next.iter().cloned());
        frontier = next;
    }
    words
}

fn same_bounded_language(a: &Nfa, b: &Nfa, alphabet: &[Symbol], max_len: usize) -> bool {
    bounded_words(alphabet, max_len)
        .iter()
        .all(|w| a.accepts(w) == b.accepts(w))
}

#[test]
fn deterministic_chain_stays_put() {
    let mut aut = Nfa::new();
    aut.add_transition(&st("i"), &sym("a"), &st("f"));
    aut.mark_initial(&st("i"));
    aut.mark_accepting(&st("f"));

    reduce(&mut aut, 1, true, 60_000);
    assert_eq!(aut.states().len(), 2);
    assert!(aut.accepts(&word(&["a"])));
    check_invariants(&aut);
}

#[test]
fn forward_equivalent_fan_out_folds() {
    let mut aut = Nfa::new();
    aut.add_transition(&st("i"), &sym("a"), &st("q1"));
    aut.add_transition(&st("i"), &sym("a"), &st("q2"));
    aut.add_transition(&st("q1"), &sym("b"), &st("f"));
    aut.add_transition(&st("q2"), &sym("b"), &st("f"));
    aut.mark_initial(&st("i"));
    aut.mark_accepting(&st("f"));
    let original = aut.clone();

    reduce(&mut aut, 1, true, 60_000);
    assert_eq!(aut.states().len(), 3);
    assert!(same_bounded_language(&original, &aut, &word(&["a", "b"]), 4));
    check_invariants(&aut);
}

#[test]
fn backward_equivalent_fan_in_folds() {
    let mut aut = Nfa::new();
    aut.add_transition(&st("p1"), &sym("a"), &st("f"));
    aut.add_transition(&st("p2"), &sym("a"), &st("f"));
    aut.mark_initial(&st("p1"));
    aut.mark_initial(&st("p2"));
    aut.mark_accepting(&st("f"));
    let original = aut.clone();

    reduce(&mut aut, 1, true, 60_000);
    assert_eq!(aut.states().len(), 2);
    assert!(same_bounded_language(&original, &aut, &word(&["a"]), 3));
    check_invariants(&aut);
}

#[test]
fn dead_tail_is_swept() {
    let mut aut = Nfa::new();
    aut.add_transition(&st("i"), &sym("a"), &st("f"));
    aut.mark_initial(&st("i"));
    aut.mark_accepting(&st("f"));
    // q and d have no connection to the live part.
    aut.add_transition(&st("q"), &sym("c"), &st("d"));
    assert_eq!(aut.states().len(), 4);

    aut.clean_dead_states();
    assert_eq!(aut.states().len(), 2);
    assert!(!aut.states().contains(&st("q")));
    assert!(!aut.states().contains(&st("d")));
    check_invariants(&aut);
}

#[test]
fn self_loop_states_can_be_kept_out_of_families() {
    fn looped() -> Nfa {
        let mut aut = Nfa::new();
        aut.add_transition(&st("i"), &sym("x"), &st("s1"));
        aut.add_transition(&st("i"), &sym("x"), &st("s2"));
        aut.add_transition(&st("s1"), &sym("a"), &st("s1"));
        aut.add_transition(&st("s2"), &sym("a"), &st("s2"));
        aut.add_transition(&st("s1"), &sym("b"), &st("f"));
        aut.add_transition(&st("s2"), &sym("b"), &st("f"));
        aut.mark_initial(&st("i"));
        aut.mark_accepting(&st("f"));
        aut
    }

    // With self-loops excluded, the family collapses to a singleton and
    // nothing is merged.
    let mut strict = looped();
    reduce(&mut strict, 1, false, 60_000);
    assert_eq!(strict.states().len(), 4);

    // With self-loops allowed, the looping pair folds and keeps its loop.
    let mut relaxed = looped();
    let original = looped();
    reduce(&mut relaxed, 1, true, 60_000);
    assert_eq!(relaxed.states().len(), 3);
    assert!(same_bounded_language(&original, &relaxed, &word(&["x", "a", "b"]), 4));
    check_invariants(&relaxed);
}

#[test]
fn solver_timeout_leaves_a_valid_automaton() {
    // A fully non-deterministic 50-state family under a 1 ms solver budget.
    let mut aut = Nfa::new();
    for n in 0..50 {
        let middle = st(&format!("q{:02}", n));
        aut.add_transition(&st("i"), &sym("a"), &middle);
        aut.add_transition(&middle, &sym("b"), &st("f"));
    }
    aut.mark_initial(&st("i"));
    aut.mark_accepting(&st("f"));
    let original = aut.clone();

    reduce(&mut aut, 1, true, 1);
    assert!(aut.states().len() <= 52);
    assert!(same_bounded_language(&original, &aut, &word(&["a", "b"]), 3));
    check_invariants(&aut);
}

#[test]
fn minimization_is_idempotent() {
    let mut aut = Nfa::new();
    aut.add_transition(&st("q0"), &sym("a"), &st("q1"));
    aut.add_transition(&st("q0"), &sym("a"), &st("q2"));
    aut.add_transition(&st("q0"), &sym("b"), &st("q1"));
    aut.add_transition(&st("q1"), &sym("a"), &st("q3"));
    aut.add_transition(&st("q2"), &sym("a"), &st("q4"));
    aut.mark_initial(&st("q0"));
    aut.mark_accepting(&st("q3"));
    aut.mark_accepting(&st("q4"));

    reduce(&mut aut, 2, true, 60_000);
    let once = aut.states().len();
    reduce(&mut aut, 2, true, 60_000);
    assert_eq!(aut.states().len(), once);
    check_invariants(&aut);
}

#[derive(Clone, Debug)]
struct TestNfa {
    transitions: Vec<(u8, u8, u8)>,
    initial: Vec<u8>,
    accepting: Vec<u8>,
}

impl TestNfa {
    const STATES: u8 = 5;
    const SYMBOLS: u8 = 2;

    fn build(&self) -> Nfa {
        let state = |n: u8| st(&format!("q{}", n % Self::STATES));
        let letter = |n: u8| sym(["a", "b"][(n % Self::SYMBOLS) as usize]);
        let mut aut = Nfa::new();
        for (from, s, to) in &self.transitions {
            aut.add_transition(&state(*from), &letter(*s), &state(*to));
        }
        for n in &self.initial {
            aut.mark_initial(&state(*n));
        }
        for n in &self.accepting {
            aut.mark_accepting(&state(*n));
        }
        aut
    }
}

impl Arbitrary for TestNfa {
    fn arbitrary(g: &mut Gen) -> TestNfa {
        let len = usize::arbitrary(g) % 10;
        TestNfa {
            transitions: (0..len)
                .map(|_| (u8::arbitrary(g), u8::arbitrary(g), u8::arbitrary(g)))
                .collect(),
            initial: (0..usize::arbitrary(g) % 3).map(|_| u8::arbitrary(g)).collect(),
            accepting: (0..usize::arbitrary(g) % 3).map(|_| u8::arbitrary(g)).collect(),
        }
    }
}

#[test]
fn random_automata_keep_their_bounded_language() {
    fn prop(input: TestNfa) -> bool {
        let original = input.build();
        let mut reduced = original.clone();
        reduce(&mut reduced, 2, true, 60_000);
        check_invariants(&reduced);
        reduced.states().len() <= original.states().len()
            && same_bounded_language(&original, &reduced, &word(&["a", "b"]), 4)
    }
    QuickCheck::new()
        .tests(40)
        .gen(Gen::new(12))
        .quickcheck(prop as fn(TestNfa) -> bool);
}

#[test]
fn random_automata_shrink_monotonically_without_self_loops() {
    fn prop(input: TestNfa) -> bool {
        let original = input.build();
        let mut reduced = original.clone();
        reduce(&mut reduced, 1, false, 60_000);
        check_invariants(&reduced);
        reduced.states().len() <= original.states().len()
            && same_bounded_language(&original, &reduced, &word(&["a", "b"]), 4)
    }
    QuickCheck::new()
        .tests(25)
        .gen(Gen::new(12))
        .quickcheck(prop as fn(TestNfa) -> bool);
}

#[test]
fn merged_states_absorb_whole_clusters() {
    // Three interchangeable middle states collapse into one.
    let mut aut = Nfa::new();
    for q in ["q1", "q2", "q3"] {
        aut.add_transition(&st("i"), &sym("a"), &st(q));
        aut.add_transition(&st(q), &sym("b"), &st("f"));
    }
    aut.mark_initial(&st("i"));
    aut.mark_accepting(&st("f"));
    let original = aut.clone();

    reduce(&mut aut, 1, true, 60_000);
    assert_eq!(aut.states().len(), 3);
    assert!(same_bounded_language(&original, &aut, &word(&["a", "b"]), 4));

    // The merge survivors are engine-generated states.
    let merged: BTreeSet<&StateId> = aut
        .states()
        .iter()
        .filter(|s| !original.states().contains(*s))
        .collect();
    assert_eq!(merged.len(), 1);
}
