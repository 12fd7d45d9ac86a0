// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::Context as _;
use clap::Parser;
use nfa_reduce::format::{parse_ba, parse_timbuk, write_ba, write_timbuk, Format};
use nfa_reduce::solver_minimization;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Reduce the state count of a nondeterministic finite automaton while
/// preserving its language.
#[derive(Parser)]
#[command(name = "reduce", version, about)]
struct Args {
    /// Input automaton file.
    input: PathBuf,

    /// Lookahead depth of the equivalence probe.
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    lookahead: u32,

    /// Read and write the Ba format instead of inferring it from the file
    /// extension.
    #[arg(short = 'B', conflicts_with = "timbuk")]
    ba: bool,

    /// Read and write the Timbuk format instead of inferring it from the
    /// file extension.
    #[arg(short = 'T')]
    timbuk: bool,

    /// Keep self-looping states out of merge families.
    #[arg(long = "no-loop")]
    no_loop: bool,

    /// Wall-clock budget of each solver call, in milliseconds.
    #[arg(long = "solver-timeout", default_value_t = 60_000)]
    solver_timeout: u64,
}

fn output_path(input: &Path, lookahead: u32, format: Format) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("automaton");
    input.with_file_name(format!("{}-{}_solver.{}", stem, lookahead, format.extension()))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let format = if args.ba {
        Format::Ba
    } else if args.timbuk {
        Format::Timbuk
    } else {
        Format::from_extension(&args.input)?
    };

    let input = File::open(&args.input)
        .with_context(|| format!("cannot open {}", args.input.display()))?;
    let mut automaton = match format {
        Format::Ba => parse_ba(input)?,
        Format::Timbuk => parse_timbuk(input)?,
    };

    let states_before = automaton.states().len();
    let transitions_before = automaton.transition_count();

    let start = Instant::now();
    automaton.clean_dead_states();
    solver_minimization(
        &mut automaton,
        args.lookahead,
        !args.no_loop,
        args.solver_timeout,
    );
    automaton.clean_dead_states();

    let output = output_path(&args.input, args.lookahead, format);
    let mut out = File::create(&output)
        .with_context(|| format!("cannot create {}", output.display()))?;
    match format {
        Format::Ba => write_ba(&automaton, &mut out)?,
        Format::Timbuk => write_timbuk(&automaton, &mut out)?,
    }
    let elapsed = start.elapsed().as_millis();

    println!("Result automaton was saved as {}", output.display());
    println!("States before: {}", states_before);
    println!("States after: {}", automaton.states().len());
    println!("Transitions before: {}", transitions_before);
    println!("Transitions after: {}", automaton.transition_count());
    println!("Time: {} ms", elapsed);

    Ok(())
}
