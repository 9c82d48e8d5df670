/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! A parent and a forked child writing to one file through separate
//! descriptors that share a single open file description.
//!
//! The parent opens (and truncates) the output file, forks, and both
//! processes write a burst of marker bytes. The child then syncs and closes
//! its descriptor and exits. Closing the child's copy does not close the
//! description, so the parent can still wait for the child and append a final
//! newline through its own copy. Because the description is shared, so is the
//! write offset: neither burst overwrites the other.

// Treat all Clippy warnings as errors.
#![deny(clippy::all)]

mod config;
mod consts;
mod demo;
mod error;
mod sink;
mod threads;
mod verify;

pub use config::Markers;
pub use config::WriteErrorPolicy;
pub use consts::BURST_LEN;
pub use consts::CHILD_MARKER;
pub use consts::NEWLINE;
pub use consts::OUTPUT_NAME;
pub use consts::PARENT_MARKER;
pub use demo::Child;
pub use demo::Demo;
pub use demo::Duplicate;
pub use demo::FailingFork;
pub use demo::Fork;
pub use demo::Outcome;
pub use error::Context;
pub use error::Error;
pub use error::Op;
pub use error::WriteFailure;
pub use sink::SharedFile;
pub use verify::verify_file;
pub use verify::Composition;
