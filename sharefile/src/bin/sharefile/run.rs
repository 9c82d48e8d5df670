/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::path::PathBuf;

use clap::Parser;
use sharefile::verify_file;
use sharefile::Demo;
use sharefile::Error;
use sharefile::FailingFork;
use sharefile::WriteErrorPolicy;
use sharefile::OUTPUT_NAME;
use tracing::info;

// Command-line options for a run.
#[derive(Debug, Parser)]
pub struct RunOpts {
    /// The file to create (or truncate) and write to.
    #[clap(long, value_name = "FILE", default_value = OUTPUT_NAME)]
    path: PathBuf,

    /// What to do when a write, fsync or close fails. "silent" ignores the
    /// failure, as the classic program does. "strict" finishes the run and
    /// then reports every failure with a non-zero exit.
    #[clap(long, value_name = "POLICY", default_value = "silent")]
    write_errors: WriteErrorPolicy,

    /// Shorthand for `--write-errors strict`.
    #[clap(long)]
    strict: bool,

    /// Run the child as a thread with a `dup`ed descriptor instead of a
    /// forked process.
    #[clap(long)]
    threads: bool,

    /// After the run, check that the file holds both bursts and a single
    /// trailing newline, and print its composition.
    #[clap(long)]
    verify: bool,

    /// Fail the fork with EAGAIN instead of forking.
    #[clap(long, hide = true)]
    inject_fork_failure: bool,
}

impl RunOpts {
    fn policy(&self) -> WriteErrorPolicy {
        if self.strict {
            WriteErrorPolicy::Strict
        } else {
            self.write_errors
        }
    }

    pub fn main(&self) -> Result<(), Error> {
        let demo = Demo::new(&self.path).with_policy(self.policy());

        let outcome = if self.inject_fork_failure {
            demo.run_with(&FailingFork::default())?
        } else if self.threads {
            demo.run_threaded()?
        } else {
            demo.run()?
        };
        info!(?outcome, policy = %demo.policy(), "run finished");

        if self.verify {
            let composition = verify_file(demo.path(), demo.markers(), demo.burst())?;
            println!("{}: {}", demo.path().display(), composition);
        }

        Ok(())
    }
}
