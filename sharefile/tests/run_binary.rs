/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Runs the built binary in a scratch directory, the way a user would.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use sharefile::Composition;
use sharefile::Markers;
use subprocess::ExitStatus;
use subprocess::Popen;
use subprocess::PopenConfig;
use subprocess::Redirection;

struct Finished {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

fn run_in(dir: &Path, args: &[&str]) -> Finished {
    let mut argv = vec![env!("CARGO_BIN_EXE_sharefile")];
    argv.extend_from_slice(args);

    let mut p = Popen::create(
        &argv,
        PopenConfig {
            stdout: Redirection::Pipe,
            stderr: Redirection::Pipe,
            cwd: Some(dir.as_os_str().to_owned()),
            // Keep the caller's log settings out of stderr.
            env: Some(
                std::env::vars_os()
                    .filter(|(name, _)| name != "RUST_LOG" && name != "SHAREFILE_LOG")
                    .collect(),
            ),
            ..Default::default()
        },
    )
    .unwrap();

    let (stdout, stderr) = p.communicate(None).unwrap();
    let status = p.wait().unwrap();

    Finished {
        status,
        stdout: stdout.unwrap_or_default(),
        stderr: stderr.unwrap_or_default(),
    }
}

fn composition(path: &Path) -> Composition {
    Composition::of(&fs::read(path).unwrap(), Markers::default())
}

#[test]
fn no_arguments_writes_test_file() {
    let dir = tempfile::tempdir().unwrap();

    let run = run_in(dir.path(), &[]);

    assert_eq!(run.status, ExitStatus::Exited(0), "{}", run.stderr);
    assert_eq!(run.stdout, "");
    let output = dir.path().join("test");
    assert_eq!(fs::metadata(&output).unwrap().len(), 21);
    composition(&output).check(10).unwrap();
}

#[test]
fn second_run_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("test");

    assert_eq!(run_in(dir.path(), &[]).status, ExitStatus::Exited(0));
    let first = composition(&output);
    assert_eq!(run_in(dir.path(), &[]).status, ExitStatus::Exited(0));
    let second = composition(&output);

    assert_eq!(first.len, 21);
    assert_eq!(first, second);
}

#[test]
fn verify_prints_composition() {
    let dir = tempfile::tempdir().unwrap();

    let run = run_in(dir.path(), &["--verify"]);

    assert_eq!(run.status, ExitStatus::Exited(0), "{}", run.stderr);
    assert_eq!(
        run.stdout,
        "test: 21 bytes: 10 child, 10 parent, 1 newline\n"
    );
}

#[test]
fn threads_mode_writes_the_same_shape() {
    let dir = tempfile::tempdir().unwrap();

    let run = run_in(dir.path(), &["--threads", "--strict", "--verify"]);

    assert_eq!(run.status, ExitStatus::Exited(0), "{}", run.stderr);
    composition(&dir.path().join("test")).check(10).unwrap();
}

#[test]
fn custom_path() {
    let dir = tempfile::tempdir().unwrap();

    let run = run_in(dir.path(), &["--path", "elsewhere"]);

    assert_eq!(run.status, ExitStatus::Exited(0), "{}", run.stderr);
    assert!(!dir.path().join("test").exists());
    composition(&dir.path().join("elsewhere")).check(10).unwrap();
}

#[test]
fn fork_failure_exits_1_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("test");
    fs::write(&output, b"leftover").unwrap();

    let run = run_in(dir.path(), &["--inject-fork-failure"]);

    assert_eq!(run.status, ExitStatus::Exited(1));
    assert!(run.stderr.contains("fork failed: EAGAIN"), "{}", run.stderr);
    assert_eq!(run.stderr.lines().count(), 1, "{}", run.stderr);
    assert_eq!(fs::metadata(&output).unwrap().len(), 0);
}

#[test]
fn silent_by_default_when_writes_fail() {
    if !Path::new("/dev/full").exists() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();

    let run = run_in(dir.path(), &["--path", "/dev/full"]);

    assert_eq!(run.status, ExitStatus::Exited(0), "{}", run.stderr);
    assert_eq!(run.stderr, "");
}

#[test]
fn strict_reports_failed_writes() {
    if !Path::new("/dev/full").exists() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();

    let run = run_in(dir.path(), &["--path", "/dev/full", "--write-errors", "strict"]);

    assert_eq!(run.status, ExitStatus::Exited(1));
    assert!(run.stderr.contains("did not exit cleanly"), "{}", run.stderr);
}

#[test]
fn bad_policy_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();

    let run = run_in(dir.path(), &["--write-errors", "loud"]);

    assert_eq!(run.status, ExitStatus::Exited(2));
    assert!(run.stderr.contains("Expected Silent|Strict"), "{}", run.stderr);
    assert!(!dir.path().join("test").exists());
}

#[test]
fn debug_log_covers_fork_and_wait() {
    let dir = tempfile::tempdir().unwrap();

    let run = run_in(dir.path(), &["--log", "debug"]);

    assert_eq!(run.status, ExitStatus::Exited(0));
    assert!(run.stderr.contains("opened output file"), "{}", run.stderr);
    assert!(run.stderr.contains("forked child"), "{}", run.stderr);
    assert!(run.stderr.contains("child reaped"), "{}", run.stderr);
}
