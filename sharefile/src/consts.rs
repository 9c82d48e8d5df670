/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

/// Name of the output file, relative to the current working directory.
pub const OUTPUT_NAME: &str = "test";

/// Byte written by the child process.
pub const CHILD_MARKER: u8 = b'C';

/// Byte written by the parent process.
pub const PARENT_MARKER: u8 = b'P';

/// Written once by the parent, after the child has been reaped.
pub const NEWLINE: u8 = b'\n';

/// How many marker bytes each side writes, one `write(2)` per byte.
pub const BURST_LEN: usize = 10;
