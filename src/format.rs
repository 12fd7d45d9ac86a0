// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::Error;
use crate::nfa::{Nfa, StateId, Symbol};
use lazy_static::lazy_static;
use regex::Regex;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;

/// The two textual automaton formats the tool understands.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Format {
    Timbuk,
    Ba,
}

impl Format {
    /// Infers the format from a file extension; only `.ba` is recognized.
    pub fn from_extension(path: &Path) -> Result<Format, Error> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ba") => Ok(Format::Ba),
            _ => Err(Error::UnknownFormat(path.to_owned())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Timbuk => "timbuk",
            Format::Ba => "ba",
        }
    }
}

lazy_static! {
    // "x -> q0" (an initial state; the operation may be written "x()").
    static ref TIMBUK_INITIAL: Regex = Regex::new(r"^\w+(\(\))?[ ]*->[ ]*(\w+)$").unwrap();
    // "a(q0) -> q1"
    static ref TIMBUK_TRANSITION: Regex = Regex::new(r"^(\w+)\((\w+)\)[ ]*->[ ]*(\w+)$").unwrap();
    // "[q0]"
    static ref BA_STATE: Regex = Regex::new(r"^\[(\w+)\]$").unwrap();
    // "a,[q0]->[q1]"
    static ref BA_TRANSITION: Regex =
        Regex::new(r"^(\w+)[ ]*,[ ]*\[(\w+)\][ ]*->[ ]*\[(\w+)\]$").unwrap();
}

/// Parses an automaton in Timbuk format.
///
/// ```text
/// Ops a0:1 a1:1 x:0
/// Automaton A
/// States q0 q1 q2 q3
/// Final States q3
/// Transitions
/// x -> q0
/// a0(q0) -> q1
/// a1(q1) -> q3
/// ```
///
/// State membership is implied by the transition and mark lines; the
/// `States` header and any line that matches nothing are skipped.
pub fn parse_timbuk<R: Read>(input: R) -> Result<Nfa, Error> {
    let mut automaton = Nfa::new();

    for line in BufReader::new(input).lines() {
        let line = line?;
        let line = line.trim_end();

        if let Some(caps) = TIMBUK_INITIAL.captures(line) {
            automaton.mark_initial(&StateId::named(&caps[2]));
        } else if let Some(caps) = TIMBUK_TRANSITION.captures(line) {
            automaton.add_transition(
                &StateId::named(&caps[2]),
                &Symbol::new(&caps[1]),
                &StateId::named(&caps[3]),
            );
        } else {
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.first() == Some(&"Final") {
                for name in words.iter().skip(2) {
                    automaton.mark_accepting(&StateId::named(name));
                }
            }
        }
    }

    Ok(automaton)
}

/// Parses an automaton in Ba format.
///
/// ```text
/// [q0]             (initial states)
/// a,[q0]->[q1]     (transitions)
/// a,[q1]->[q2]
/// [q2]             (accepting states)
/// ```
///
/// Initial and accepting states share one syntax; a bracketed line counts as
/// initial until the first transition has been seen and as accepting
/// afterwards.
pub fn parse_ba<R: Read>(input: R) -> Result<Nfa, Error> {
    let mut automaton = Nfa::new();
    let mut seen_transitions = false;

    for line in BufReader::new(input).lines() {
        let line = line?;
        let line = line.trim_end();

        if let Some(caps) = BA_STATE.captures(line) {
            let state = StateId::named(&caps[1]);
            if seen_transitions {
                automaton.mark_accepting(&state);
            } else {
                automaton.mark_initial(&state);
            }
        } else if let Some(caps) = BA_TRANSITION.captures(line) {
            automaton.add_transition(
                &StateId::named(&caps[2]),
                &Symbol::new(&caps[1]),
                &StateId::named(&caps[3]),
            );
            seen_transitions = true;
        }
    }

    Ok(automaton)
}

/// Writes the automaton in Timbuk format. Every symbol is printed as a unary
/// operation next to the nullary start marker `x`.
pub fn write_timbuk<W: Write>(aut: &Nfa, out: &mut W) -> io::Result<()> {
    write!(out, "Ops")?;
    for sym in aut.alphabet() {
        write!(out, " {}:1", sym)?;
    }
    writeln!(out, " x:0")?;

    writeln!(out, "Automaton A")?;

    write!(out, "States")?;
    for state in aut.states() {
        write!(out, " {}", state)?;
    }
    writeln!(out)?;

    write!(out, "Final States")?;
    for state in aut.accepting() {
        write!(out, " {}", state)?;
    }
    writeln!(out)?;

    writeln!(out, "Transitions")?;
    for state in aut.initial() {
        writeln!(out, "x -> {}", state)?;
    }
    for (from, by_symbol) in aut.forward() {
        for (sym, targets) in by_symbol {
            for to in targets {
                writeln!(out, "{}({}) -> {}", sym, from, to)?;
            }
        }
    }

    Ok(())
}

/// Writes the automaton in Ba format: initial states first, then the
/// transitions, then the accepting states. An automaton without states
/// prints as the conventional `[0]` / `[0]` stub.
pub fn write_ba<W: Write>(aut: &Nfa, out: &mut W) -> io::Result<()> {
    if aut.states().is_empty() {
        writeln!(out, "[0]")?;
        writeln!(out, "[0]")?;
        return Ok(());
    }

    for state in aut.initial() {
        writeln!(out, "[{}]", state)?;
    }
    for (from, by_symbol) in aut.forward() {
        for (sym, targets) in by_symbol {
            for to in targets {
                writeln!(out, "{},[{}]->[{}]", sym, from, to)?;
            }
        }
    }
    for state in aut.accepting() {
        writeln!(out, "[{}]", state)?;
    }

    Ok(())
}
