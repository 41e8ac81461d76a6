// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device discovery and per-frame polling.

use core::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use basalt_core::error::InputError;
use basalt_core::input::{InputSource, RawEvent};
use rustix::fd::OwnedFd;
use rustix::fs::{Mode, OFlags};
use rustix::io::Errno;
use tracing::{debug, warn};

use crate::record::{EVENT_RECORD_SIZE, parse_records};

const DEVICE_DIR: &str = "/dev/input";

/// Read granularity; 32 records per syscall.
const READ_CHUNK: usize = EVENT_RECORD_SIZE * 32;

struct Device {
    path: PathBuf,
    fd: OwnedFd,
    // Trailing partial record from the previous read.
    pending: Vec<u8>,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Polls every readable `event*` device under a directory.
#[derive(Debug)]
pub struct EvdevSource {
    devices: Vec<Device>,
}

impl EvdevSource {
    /// Opens every readable device under `/dev/input`.
    ///
    /// Unreadable devices (usually a permissions problem) are skipped with
    /// a warning; an empty device set is not an error, merely an engine
    /// without input.
    pub fn open() -> Result<Self, InputError> {
        Self::open_dir(Path::new(DEVICE_DIR))
    }

    /// Like [`open`](Self::open), for an arbitrary device directory.
    pub fn open_dir(dir: &Path) -> Result<Self, InputError> {
        let device_err = |reason: String| InputError::Device {
            device: dir.display().to_string(),
            reason,
        };
        let entries = fs::read_dir(dir).map_err(|err| device_err(err.to_string()))?;

        let mut devices = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| device_err(err.to_string()))?.path();
            let is_event_node = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("event"));
            if !is_event_node {
                continue;
            }
            match rustix::fs::open(
                &path,
                OFlags::RDONLY | OFlags::NONBLOCK | OFlags::CLOEXEC,
                Mode::empty(),
            ) {
                Ok(fd) => {
                    debug!(device = %path.display(), "input device opened");
                    devices.push(Device {
                        path,
                        fd,
                        pending: Vec::new(),
                    });
                }
                Err(err) => {
                    warn!(device = %path.display(), %err, "skipping unreadable input device");
                }
            }
        }
        if devices.is_empty() {
            warn!(dir = %dir.display(), "no readable input devices found");
        }
        Ok(Self { devices })
    }

    /// Number of open devices.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

impl InputSource for EvdevSource {
    fn poll(&mut self, out: &mut Vec<RawEvent>) -> Result<(), InputError> {
        let mut buf = [0_u8; READ_CHUNK];
        self.devices.retain_mut(|device| {
            let alive = loop {
                match rustix::io::read(&device.fd, &mut buf) {
                    Ok(0) => break true,
                    Ok(n) => device.pending.extend_from_slice(&buf[..n]),
                    Err(Errno::AGAIN) => break true,
                    Err(Errno::INTR) => {}
                    // Unplugged (ENODEV) or otherwise failed; drop it.
                    Err(err) => {
                        warn!(device = %device.path.display(), %err, "input device lost");
                        break false;
                    }
                }
            };
            let consumed = parse_records(&device.pending, out);
            device.pending.drain(..consumed);
            alive
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_directory_yields_a_dry_source() {
        let dir = std::env::temp_dir().join("basalt-evdev-empty");
        fs::create_dir_all(&dir).expect("temp dir is writable");

        let mut source = EvdevSource::open_dir(&dir).expect("empty dir is not an error");
        assert_eq!(source.device_count(), 0);

        let mut out = Vec::new();
        source.poll(&mut out).expect("dry poll succeeds");
        assert!(out.is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = EvdevSource::open_dir(Path::new("/nonexistent/basalt-input"));
        assert!(matches!(err, Err(InputError::Device { .. })));
    }

    #[test]
    fn non_event_nodes_are_ignored() {
        let dir = std::env::temp_dir().join("basalt-evdev-mixed");
        fs::create_dir_all(&dir).expect("temp dir is writable");
        fs::write(dir.join("by-id"), b"").expect("temp file is writable");

        let source = EvdevSource::open_dir(&dir).expect("open succeeds");
        assert_eq!(source.device_count(), 0, "only event* nodes are opened");
    }
}
