/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The same demo with a thread in place of the forked child.
//!
//! The thread gets its own descriptor from `dup`, so the two writers still
//! hold separate descriptors on one open file description, and the thread
//! closing its copy leaves the parent's intact. `join` stands in for
//! `waitpid`.

use std::thread;

use anyhow::anyhow;
use tracing::debug;
use tracing::info;

use crate::consts::NEWLINE;
use crate::demo::child_side;
use crate::demo::finalize;
use crate::demo::write_burst;
use crate::demo::Child;
use crate::demo::Demo;
use crate::demo::FailureLog;
use crate::demo::Outcome;
use crate::error::Context;
use crate::error::Error;
use crate::error::Op;

impl Demo {
    /// Runs the demo with a child thread instead of a child process.
    pub fn run_threaded(&self) -> Result<Outcome, Error> {
        let mut file = self.open()?;
        let theirs = file
            .try_clone()
            .context("Failed to duplicate the output descriptor")?;

        let marker = self.markers().child;
        let burst = self.burst();
        let handle = thread::Builder::new()
            .name("sharefile-child".into())
            .spawn(move || child_side(theirs, marker, burst).into_failures())
            .context("Failed to spawn child thread")?;
        info!(path = ?self.path(), "spawned child thread");

        let mut log = FailureLog::new("parent");
        write_burst(&file, self.markers().parent, burst, &mut log);

        let failures = handle
            .join()
            .map_err(|_| anyhow!("child thread panicked"))?;
        debug!(failures = failures.len(), "child thread joined");

        log.note(Op::Write, file.write_marker(NEWLINE));
        finalize(&mut file, &mut log);

        self.settle(Outcome {
            child: Child::Thread { failures },
            child_gone: true,
            failures: log.into_failures(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use nix::errno::Errno;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::Markers;
    use crate::config::WriteErrorPolicy;
    use crate::error::WriteFailure;
    use crate::verify::verify_file;

    #[test]
    fn threaded_run_keeps_every_byte() {
        let dir = tempfile::tempdir().unwrap();
        let demo = Demo::new(dir.path().join("test"));

        let outcome = demo.run_threaded().unwrap();

        assert_eq!(
            outcome,
            Outcome {
                child: Child::Thread {
                    failures: Vec::new()
                },
                child_gone: true,
                failures: Vec::new(),
            }
        );
        let composition = verify_file(demo.path(), Markers::default(), 10).unwrap();
        assert_eq!(composition.len, 21);
    }

    #[test]
    fn threaded_run_with_long_bursts() {
        let dir = tempfile::tempdir().unwrap();
        let demo = Demo::new(dir.path().join("test")).with_burst(500);

        demo.run_threaded().unwrap();

        // Two independently positioned descriptors would lose bytes here.
        assert_eq!(fs::metadata(demo.path()).unwrap().len(), 1001);
        verify_file(demo.path(), demo.markers(), 500).unwrap();
    }

    #[test]
    fn threaded_strict_reports_child_failures_first() {
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }

        let err = Demo::new(full)
            .with_policy(WriteErrorPolicy::Strict)
            .run_threaded()
            .unwrap_err();

        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        assert!(chain[0].starts_with("child thread saw"), "{:?}", chain);
        assert_eq!(
            chain[1],
            WriteFailure {
                op: Op::Write,
                errno: Errno::ENOSPC,
            }
            .to_string()
        );
    }
}
