/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use tracing::metadata::LevelFilter;

use super::tracing::init_file_tracing;
use super::tracing::init_stderr_tracing;

// Options that only affect how the run is reported.
#[derive(Debug, Parser, Clone)]
pub struct GlobalOpts {
    /// The verbosity level of log output.
    #[clap(short, long, value_name = "LEVEL", env = "SHAREFILE_LOG")]
    pub log: Option<LevelFilter>,

    /// Log to a file instead of the terminal.
    #[clap(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl GlobalOpts {
    /// Initializes tracing. This must happen before the fork so that both
    /// processes log through the same subscriber.
    pub fn init_tracing(&self) {
        if let Some(path) = &self.log_file {
            let file_writer = File::create(path).expect("Failed to open log file");
            init_file_tracing(self.log, file_writer)
        } else {
            init_stderr_tracing(self.log)
        }
    }
}
