// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that the reduction tool reports to its caller.
///
/// Everything else is either a programming error (and panics) or a
/// data-dependent anomaly (and is logged as a warning while the engine
/// carries on with a less reduced automaton).
#[derive(Debug, Error)]
pub enum Error {
    /// The automaton format could not be inferred from the file extension.
    #[error("cannot infer an automaton format from `{}`; pass -B or -T", .0.display())]
    UnknownFormat(PathBuf),

    #[error(transparent)]
    Io(#[from] io::Error),
}
