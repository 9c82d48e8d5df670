/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! A descriptor on the shared output file.

use std::os::unix::io::AsRawFd;
use std::os::unix::io::RawFd;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::open;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nix::unistd::close;
use nix::unistd::dup;
use nix::unistd::fsync;
use nix::unistd::write;

/// One descriptor referring to the output file's open file description.
///
/// Copies made with [`SharedFile::try_clone`], or inherited across `fork`,
/// are separate descriptors on the *same* description: they share the write
/// offset, and closing one of them leaves the others usable.
///
/// Writes go straight to `write(2)`, one call per byte, with no userspace
/// buffering in between.
#[derive(Debug)]
pub struct SharedFile {
    /// `None` once released.
    fd: Option<RawFd>,
}

impl SharedFile {
    /// Opens `path` for writing, creating it with mode `0700` if needed and
    /// truncating it otherwise.
    pub fn create(path: &Path) -> nix::Result<Self> {
        let fd = open(
            path,
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            Mode::S_IRWXU,
        )?;
        Ok(Self { fd: Some(fd) })
    }

    /// Duplicates the descriptor. The copy shares the open file description
    /// (and hence the offset) with `self`.
    pub fn try_clone(&self) -> nix::Result<Self> {
        let fd = dup(self.raw()?)?;
        Ok(Self { fd: Some(fd) })
    }

    fn raw(&self) -> nix::Result<RawFd> {
        self.fd.ok_or(Errno::EBADF)
    }

    /// Returns true once [`release`](Self::release) has closed the descriptor.
    pub fn is_released(&self) -> bool {
        self.fd.is_none()
    }

    /// Writes a single byte at the shared offset.
    pub fn write_marker(&self, byte: u8) -> nix::Result<()> {
        match write(self.raw()?, &[byte])? {
            1 => Ok(()),
            // A zero-length write of a non-empty buffer.
            _ => Err(Errno::EIO),
        }
    }

    /// `fsync(2)`s the underlying file.
    pub fn sync(&self) -> nix::Result<()> {
        fsync(self.raw()?)
    }

    /// Closes this descriptor. Other descriptors on the same description are
    /// unaffected. Releasing twice is a no-op; the descriptor number is never
    /// closed a second time, since by then it may belong to someone else.
    pub fn release(&mut self) -> nix::Result<()> {
        match self.fd.take() {
            Some(fd) => close(fd),
            None => Ok(()),
        }
    }

    /// Syncs and releases. On an already released handle this does nothing.
    ///
    /// The descriptor is closed even if the sync fails; the first error is
    /// returned.
    pub fn finish(&mut self) -> nix::Result<()> {
        if self.is_released() {
            return Ok(());
        }
        let synced = self.sync();
        let released = self.release();
        synced.and(released)
    }
}

impl AsRawFd for SharedFile {
    /// Returns -1 after release.
    fn as_raw_fd(&self) -> RawFd {
        self.fd.unwrap_or(-1)
    }
}

impl Drop for SharedFile {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
