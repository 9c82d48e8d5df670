/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Fork, write through inherited descriptors, wait, append.

use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::path::PathBuf;

use anyhow::ensure;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::sys::wait::waitpid;
use nix::sys::wait::WaitStatus;
use nix::unistd::fork;
use nix::unistd::ForkResult;
use nix::unistd::Pid;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::Markers;
use crate::config::WriteErrorPolicy;
use crate::consts::BURST_LEN;
use crate::consts::NEWLINE;
use crate::consts::OUTPUT_NAME;
use crate::error::Context;
use crate::error::Error;
use crate::error::Op;
use crate::error::WriteFailure;
use crate::sink::SharedFile;

/// Exit status of a child process that saw a failure under
/// [`WriteErrorPolicy::Strict`].
const CHILD_FAILURE_STATUS: i32 = 1;

/// Splits the calling process in two.
pub trait Duplicate {
    /// # Safety
    ///
    /// Same contract as `fork(2)`: if the caller is multithreaded, the child
    /// may only run code that does not depend on locks or state held by the
    /// other threads at the time of the split, and must leave through
    /// `_exit` without unwinding into the caller.
    unsafe fn duplicate(&self) -> nix::Result<ForkResult>;
}

/// The real thing: `fork(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fork;

impl Duplicate for Fork {
    unsafe fn duplicate(&self) -> nix::Result<ForkResult> {
        // SAFETY: forwarded to our caller.
        unsafe { fork() }
    }
}

/// Fails the way `fork` does when the system is out of processes or memory.
#[derive(Debug, Clone, Copy)]
pub struct FailingFork(pub Errno);

impl Default for FailingFork {
    fn default() -> Self {
        FailingFork(Errno::EAGAIN)
    }
}

impl Duplicate for FailingFork {
    unsafe fn duplicate(&self) -> nix::Result<ForkResult> {
        Err(self.0)
    }
}

/// What the parent learned about the child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    /// A forked process and how it terminated. `status` is `None` when
    /// `waitpid` failed, e.g. with `ECHILD` because `SIGCHLD` is ignored and
    /// the kernel reaped the child itself.
    Process {
        pid: Pid,
        status: Option<WaitStatus>,
    },
    /// A joined thread and the failures it saw.
    Thread { failures: Vec<WriteFailure> },
}

/// The result of a completed run, as seen by the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub child: Child,
    /// The child had fully terminated by the time the newline was written.
    pub child_gone: bool,
    /// Failed operations on the parent's descriptor, in order.
    pub failures: Vec<WriteFailure>,
}

impl Outcome {
    /// Succeeds if neither side saw a failure and a child process exited
    /// with status 0.
    pub fn check(&self) -> Result<(), Error> {
        match &self.child {
            Child::Process { pid, status } => {
                ensure!(
                    *status == Some(WaitStatus::Exited(*pid, 0)),
                    "child {} did not exit cleanly: {:?}",
                    pid,
                    status
                );
            }
            Child::Thread { failures } => {
                if let Some(first) = failures.first() {
                    return Err(Error::from(*first).context(format!(
                        "child thread saw {} failed operation(s)",
                        failures.len()
                    )));
                }
            }
        }

        if let Some(first) = self.failures.first() {
            return Err(Error::from(*first).context(format!(
                "parent saw {} failed operation(s)",
                self.failures.len()
            )));
        }

        Ok(())
    }

    pub fn is_clean(&self) -> bool {
        self.check().is_ok()
    }
}

/// Collects the failures one writer sees on its descriptor.
#[derive(Debug)]
pub(crate) struct FailureLog {
    role: &'static str,
    failures: Vec<WriteFailure>,
}

impl FailureLog {
    pub(crate) fn new(role: &'static str) -> Self {
        Self {
            role,
            failures: Vec::new(),
        }
    }

    pub(crate) fn note(&mut self, op: Op, result: nix::Result<()>) {
        if let Err(errno) = result {
            debug!(role = self.role, %op, %errno, "operation on shared file failed");
            self.failures.push(WriteFailure { op, errno });
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn into_failures(self) -> Vec<WriteFailure> {
        self.failures
    }
}

/// `count` single-byte writes of `marker`.
pub(crate) fn write_burst(file: &SharedFile, marker: u8, count: usize, log: &mut FailureLog) {
    for _ in 0..count {
        log.note(Op::Write, file.write_marker(marker));
    }
}

/// The tail both writers run last. A no-op for a writer that already
/// released its descriptor.
pub(crate) fn finalize(file: &mut SharedFile, log: &mut FailureLog) {
    log.note(Op::Sync, file.finish());
}

/// Everything the child does with its copy of the descriptor.
pub(crate) fn child_side(mut file: SharedFile, marker: u8, count: usize) -> FailureLog {
    let mut log = FailureLog::new("child");
    write_burst(&file, marker, count, &mut log);

    // Closing our copy only drops one reference to the open file
    // description. The parent keeps writing through its own.
    log.note(Op::Sync, file.sync());
    log.note(Op::Close, file.release());

    finalize(&mut file, &mut log);
    log
}

/// Waits for `child` to terminate, retrying on `EINTR`.
///
/// Returns `ECHILD` once the child is gone if `SIGCHLD` is ignored; the
/// kernel still blocks until the child exits in that case.
fn wait_for(child: Pid) -> nix::Result<WaitStatus> {
    loop {
        match waitpid(child, None) {
            Ok(status @ (WaitStatus::Exited(..) | WaitStatus::Signaled(..))) => return Ok(status),
            Ok(status) => debug!(?status, "child changed state without terminating"),
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(errno),
        }
    }
}

/// True if `pid` no longer names any process, zombie or otherwise.
fn has_exited(pid: Pid) -> bool {
    matches!(kill(pid, None), Err(Errno::ESRCH))
}

/// One run of the demo.
///
/// The defaults reproduce the classic program: the file is called `test`,
/// the child writes ten `C`s, the parent ten `P`s and a newline, and write
/// failures go unreported.
#[derive(Debug, Clone)]
pub struct Demo {
    path: PathBuf,
    markers: Markers,
    burst: usize,
    policy: WriteErrorPolicy,
}

impl Default for Demo {
    fn default() -> Self {
        Self::new(OUTPUT_NAME)
    }
}

impl Demo {
    pub fn new<P>(path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            path: path.into(),
            markers: Markers::default(),
            burst: BURST_LEN,
            policy: WriteErrorPolicy::default(),
        }
    }

    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }

    /// Sets how many marker bytes each side writes.
    pub fn with_burst(mut self, burst: usize) -> Self {
        self.burst = burst;
        self
    }

    pub fn with_policy(mut self, policy: WriteErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn markers(&self) -> Markers {
        self.markers
    }

    pub fn burst(&self) -> usize {
        self.burst
    }

    pub fn policy(&self) -> WriteErrorPolicy {
        self.policy
    }

    /// Creates or truncates the output file.
    pub(crate) fn open(&self) -> Result<SharedFile, Error> {
        let file = SharedFile::create(&self.path)
            .with_context(|| format!("Failed to open {:?}", self.path))?;
        debug!(path = ?self.path, fd = file.as_raw_fd(), "opened output file");
        Ok(file)
    }

    /// Runs the demo with a real `fork`.
    ///
    /// Only the parent returns. The child exits with status 0, or 1 if it saw
    /// a failure under [`WriteErrorPolicy::Strict`].
    pub fn run(&self) -> Result<Outcome, Error> {
        self.run_with(&Fork)
    }

    /// Runs the demo, splitting the process with `duplicator`.
    ///
    /// If the split fails, nothing is written and the (already truncated)
    /// file is left empty.
    pub fn run_with<D>(&self, duplicator: &D) -> Result<Outcome, Error>
    where
        D: Duplicate + ?Sized,
    {
        let file = self.open()?;

        // SAFETY: the child touches nothing but its copy of the descriptor.
        // It allocates only to record a failed operation and logs only through
        // the global subscriber, then leaves through `_exit`. Both are fine
        // for the single-threaded binary and, with glibc's fork handlers
        // resetting the allocator, for the test harness.
        match unsafe { duplicator.duplicate() }.context("fork failed")? {
            ForkResult::Child => {
                let log = child_side(file, self.markers.child, self.burst);
                let status = match self.policy {
                    WriteErrorPolicy::Strict if !log.is_empty() => CHILD_FAILURE_STATUS,
                    _ => 0,
                };
                // SAFETY: skips atexit handlers and stdio flushing, which
                // belong to the parent.
                unsafe { libc::_exit(status) }
            }
            ForkResult::Parent { child } => self.parent_side(file, child),
        }
    }

    fn parent_side(&self, mut file: SharedFile, child: Pid) -> Result<Outcome, Error> {
        info!(%child, path = ?self.path, "forked child");

        let mut log = FailureLog::new("parent");
        write_burst(&file, self.markers.parent, self.burst, &mut log);

        let status = match wait_for(child) {
            Ok(status) => Some(status),
            Err(errno) => {
                // The wait still blocked until the child was gone; carry on
                // to the newline like the classic program does.
                log.note(Op::Wait, Err(errno));
                None
            }
        };
        let child_gone = has_exited(child);
        debug!(?status, child_gone, "child reaped");
        if !child_gone {
            warn!(%child, "child still visible after waitpid returned");
        }

        log.note(Op::Write, file.write_marker(NEWLINE));
        finalize(&mut file, &mut log);

        self.settle(Outcome {
            child: Child::Process { pid: child, status },
            child_gone,
            failures: log.into_failures(),
        })
    }

    /// Applies the write error policy to a finished run.
    pub(crate) fn settle(&self, outcome: Outcome) -> Result<Outcome, Error> {
        match self.policy {
            WriteErrorPolicy::Silent => {
                if let Err(err) = outcome.check() {
                    debug!("ignoring failures: {:#}", err);
                }
                Ok(outcome)
            }
            WriteErrorPolicy::Strict => {
                outcome.check()?;
                Ok(outcome)
            }
        }
    }
}
