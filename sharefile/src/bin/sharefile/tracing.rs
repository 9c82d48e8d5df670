/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fs::File;
use std::io;
use std::io::stderr;
use std::io::IsTerminal;
use std::sync::Mutex;

use tracing::metadata::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_TRACE_LEVEL: LevelFilter = LevelFilter::WARN;

fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(level.into())
}

/// Returns a subscriber for logging to a file.
///
/// NOTE: Writes to `f` are unbuffered. There is no background writer thread,
/// which would not survive the fork; after the fork parent and child write
/// through inherited copies of the same descriptor.
fn file_subscriber(level: LevelFilter, f: File) -> impl Subscriber {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(Mutex::new(f))
        .with_thread_names(true)
        .with_ansi(false)
        .finish()
}

/// Initializes tracing to the given file `f`.
pub fn init_file_tracing(level: Option<LevelFilter>, f: File) {
    let level = level.unwrap_or(DEFAULT_TRACE_LEVEL);

    file_subscriber(level, f)
        .try_init()
        .expect("global tracing subscriber to install")
}

/// Returns a tracing subscriber that logs to `stderr`.
///
/// NOTE: Writes to stderr are unbuffered, so this may be slow.
pub fn stderr_subscriber(level: Option<LevelFilter>) -> impl Subscriber {
    let level = level.unwrap_or(DEFAULT_TRACE_LEVEL);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(io::stderr)
        .with_thread_names(true)
        .with_ansi(stderr().is_terminal())
        .finish()
}

/// Initializes tracing to `stderr`.
pub fn init_stderr_tracing(level: Option<LevelFilter>) {
    stderr_subscriber(level)
        .try_init()
        .expect("global tracing subscriber to install")
}
