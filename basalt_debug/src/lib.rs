// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diagnostics for basalt.
//!
//! [`FrameRecorder`] keeps a ring of recent per-frame statistics on the
//! render thread and summarizes them on demand; [`chrome::export`] writes
//! the recorded frames as Chrome Trace Event Format JSON for
//! `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).

pub mod chrome;
mod recorder;

pub use recorder::{FrameRecorder, RunSummary};
