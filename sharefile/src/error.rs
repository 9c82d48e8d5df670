/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;

use nix::errno::Errno;

pub type Error = anyhow::Error;

pub use anyhow::Context;

/// The operation on the shared file that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Write,
    Sync,
    Close,
    Wait,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Op::Write => write!(f, "write"),
            Op::Sync => write!(f, "fsync"),
            Op::Close => write!(f, "close"),
            Op::Wait => write!(f, "waitpid"),
        }
    }
}

/// A failed operation on the shared file, as seen by one of the writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteFailure {
    pub op: Op,
    pub errno: Errno,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} failed: {}", self.op, self.errno)
    }
}

impl std::error::Error for WriteFailure {}
