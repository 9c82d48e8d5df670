/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Knobs for a demo run.

use std::fmt;
use std::str::FromStr;

use crate::consts::CHILD_MARKER;
use crate::consts::NEWLINE;
use crate::consts::PARENT_MARKER;

/// The bytes each side writes during its burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Markers {
    /// Written by the forked child (or the spawned thread).
    pub child: u8,
    /// Written by the original process.
    pub parent: u8,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            child: CHILD_MARKER,
            parent: PARENT_MARKER,
        }
    }
}

impl Markers {
    /// Returns `None` if the markers would be indistinguishable from each
    /// other or from the trailing newline.
    pub fn new(child: u8, parent: u8) -> Option<Self> {
        if child == parent || child == NEWLINE || parent == NEWLINE {
            None
        } else {
            Some(Self { child, parent })
        }
    }
}

/// What to do when a write, sync or close on the shared file fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteErrorPolicy {
    /// Log the failure at debug level and carry on. The run still exits
    /// successfully. This is what the classic C version of this program does,
    /// since it stores every `write` result in a variable nobody reads.
    #[default]
    Silent,
    /// Finish the protocol (the parent still waits and still appends the
    /// newline), then report every failure. A child that saw a failure exits
    /// with status 1.
    Strict,
}

impl FromStr for WriteErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "legacy" => Ok(WriteErrorPolicy::Silent),
            "strict" => Ok(WriteErrorPolicy::Strict),
            _ => Err(format!("Expected Silent|Strict, could not parse: {:?}", s)),
        }
    }
}

impl fmt::Display for WriteErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WriteErrorPolicy::Silent => write!(f, "silent"),
            WriteErrorPolicy::Strict => write!(f, "strict"),
        }
    }
}
