// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::equiv::StatePair;
use crate::families::merge_overlapping;
use crate::nfa::{Direction, StateId};
use log::warn;
use std::collections::{BTreeSet, HashMap};
use z3::ast::Bool;
use z3::{Config, Context, Optimize, SatResult};

/// Selects a maximum compatible set of merges from the equivalent pairs of
/// one cluster.
///
/// Every state occurring in a pair gets one Boolean per direction, read as
/// "this state participates in a backward (resp. forward) merge". Each pair
/// contributes one soft conjunction of its two variables with weight one; a
/// hard implication per state forbids participating in both directions at
/// once, because only one of the two language equalities is certified per
/// pair. The optimizer maximizes the number of satisfied soft clauses
/// within a wall-clock budget; a fresh optimizer is used per call and no
/// state is carried between calls.
///
/// The surviving pairs (both variables true in the model) are clustered
/// into connected components, which are the groups to merge. On timeout the
/// partial model is used; unset variables count as false, so at worst no
/// merge is suggested.
pub fn select_merges(
    backward_eq: &BTreeSet<StatePair>,
    forward_eq: &BTreeSet<StatePair>,
    timeout_ms: u64,
) -> Vec<BTreeSet<StateId>> {
    if backward_eq.is_empty() && forward_eq.is_empty() {
        return Vec::new();
    }

    let mut cfg = Config::new();
    cfg.set_timeout_msec(timeout_ms);
    let ctx = Context::new(&cfg);
    let opt = Optimize::new(&ctx);

    let mut vars: HashMap<(StateId, Direction), Bool> = HashMap::new();
    for (r, s) in backward_eq {
        for state in [r, s] {
            vars.entry((state.clone(), Direction::Backward))
                .or_insert_with(|| Bool::new_const(&ctx, format!("{}_B", state)));
        }
    }
    for (r, s) in forward_eq {
        for state in [r, s] {
            vars.entry((state.clone(), Direction::Forward))
                .or_insert_with(|| Bool::new_const(&ctx, format!("{}_F", state)));
        }
    }

    for (r, s) in backward_eq {
        let pair = Bool::and(
            &ctx,
            &[
                &vars[&(r.clone(), Direction::Backward)],
                &vars[&(s.clone(), Direction::Backward)],
            ],
        );
        opt.assert_soft(&pair, 1, None);
    }
    for (r, s) in forward_eq {
        let pair = Bool::and(
            &ctx,
            &[
                &vars[&(r.clone(), Direction::Forward)],
                &vars[&(s.clone(), Direction::Forward)],
            ],
        );
        opt.assert_soft(&pair, 1, None);
    }

    // A state merged on predecessor-language grounds must not also be merged
    // on successor-language grounds.
    let both_directions: Vec<StateId> = vars
        .keys()
        .filter(|(state, dir)| {
            *dir == Direction::Backward
                && vars.contains_key(&(state.clone(), Direction::Forward))
        })
        .map(|(state, _)| state.clone())
        .collect();
    for state in both_directions {
        let b = &vars[&(state.clone(), Direction::Backward)];
        let f = &vars[&(state.clone(), Direction::Forward)];
        opt.assert(&b.implies(&f.not()));
    }

    if let SatResult::Unknown = opt.check(&[]) {
        warn!("select_merges: solver gave up within the time budget; using its partial model");
    }
    let Some(model) = opt.get_model() else {
        return Vec::new();
    };
    let is_true = |state: &StateId, dir: Direction| {
        vars.get(&(state.clone(), dir))
            .and_then(|var| model.eval(var, false))
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    };

    let mut surviving: Vec<BTreeSet<StateId>> = Vec::new();
    for (r, s) in backward_eq {
        if is_true(r, Direction::Backward) && is_true(s, Direction::Backward) {
            surviving.push([r.clone(), s.clone()].into_iter().collect());
        }
    }
    for (r, s) in forward_eq {
        if is_true(r, Direction::Forward) && is_true(s, Direction::Forward) {
            surviving.push([r.clone(), s.clone()].into_iter().collect());
        }
    }

    merge_overlapping(surviving)
}
