// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Evdev input source.
//!
//! On embedded targets there is no display server to deliver input; the
//! kernel's evdev devices are read directly. [`EvdevSource`] opens every
//! `/dev/input/event*` device non-blocking and drains them once per frame
//! from the render thread's input poll. Device failures are transient by
//! contract: an unplugged device is dropped and logged, never fatal.

mod record;
mod source;

pub use record::{EVENT_RECORD_SIZE, parse_records};
pub use source::EvdevSource;
