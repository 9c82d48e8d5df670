/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Checks an output file against what a finished run must leave behind.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::ensure;

use crate::config::Markers;
use crate::consts::NEWLINE;
use crate::error::Context;
use crate::error::Error;

/// Byte counts of an output file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Composition {
    pub len: usize,
    pub child: usize,
    pub parent: usize,
    pub newlines: usize,
    /// Bytes that are neither marker nor newline.
    pub stray: usize,
    pub newline_last: bool,
}

impl Composition {
    pub fn of(bytes: &[u8], markers: Markers) -> Self {
        let mut composition = Self {
            len: bytes.len(),
            newline_last: bytes.last() == Some(&NEWLINE),
            ..Default::default()
        };

        for &byte in bytes {
            if byte == markers.child {
                composition.child += 1;
            } else if byte == markers.parent {
                composition.parent += 1;
            } else if byte == NEWLINE {
                composition.newlines += 1;
            } else {
                composition.stray += 1;
            }
        }

        composition
    }

    /// Length of a complete file: both bursts and the newline. `None` if
    /// that does not fit in a `usize`.
    pub fn expected_len(burst: usize) -> Option<usize> {
        burst.checked_mul(2)?.checked_add(1)
    }

    /// Fails with the first broken expectation. The order of the markers is
    /// not checked; any interleaving is valid.
    pub fn check(&self, burst: usize) -> Result<(), Error> {
        ensure!(
            self.child == burst,
            "expected {} child markers, found {}",
            burst,
            self.child
        );
        ensure!(
            self.parent == burst,
            "expected {} parent markers, found {}",
            burst,
            self.parent
        );
        ensure!(self.stray == 0, "found {} unexpected bytes", self.stray);
        ensure!(
            self.newlines == 1 && self.newline_last,
            "expected exactly one newline, as the last byte"
        );
        let expected = Self::expected_len(burst)
            .with_context(|| format!("a burst of {} does not fit in memory", burst))?;
        ensure!(
            self.len == expected,
            "expected {} bytes, found {}",
            expected,
            self.len
        );
        Ok(())
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} bytes: {} child, {} parent, {} newline",
            self.len, self.child, self.parent, self.newlines
        )?;
        if self.stray > 0 {
            write!(f, ", {} stray", self.stray)?;
        }
        Ok(())
    }
}

/// Reads `path` and checks it holds `burst` of each marker and a final
/// newline.
pub fn verify_file(path: &Path, markers: Markers, burst: usize) -> Result<Composition, Error> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let composition = Composition::of(&bytes, markers);
    composition
        .check(burst)
        .with_context(|| format!("{:?} is malformed ({})", path, composition))?;
    Ok(composition)
}
