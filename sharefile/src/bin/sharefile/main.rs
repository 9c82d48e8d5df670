/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

// Treat all Clippy warnings as errors.
#![deny(clippy::all)]

mod global_opts;
mod run;
mod tracing;

use clap::Parser;
use colored::*;
use sharefile::Error;

use self::global_opts::GlobalOpts;
use self::run::RunOpts;

/// Opens a file, forks, and has parent and child write to it through their
/// own copies of the descriptor. The child writes ten `C`s, syncs, closes its
/// copy and exits. The parent writes ten `P`s, waits for the child, and
/// appends a newline through its copy, which the child's close left intact.
///
/// With no arguments this writes `./test` and exits 0, even if writes failed.
#[derive(Debug, Parser)]
#[clap(name = "sharefile", version)]
struct Args {
    #[clap(flatten)]
    global: GlobalOpts,

    #[clap(flatten)]
    run: RunOpts,
}

fn main() {
    let Args { global, run } = Args::parse();

    global.init_tracing();

    if let Err(err) = run.main() {
        display_error(err);
        std::process::exit(1);
    }
}

/// Prints the error and its causes on a single line.
fn display_error(error: Error) {
    eprintln!("{}: {:#}", "Error".red().bold(), error);
}
