// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless display backend.
//!
//! Runs the whole engine without a display: CI, soak tests, and
//! development on machines without the target hardware. The backend
//! simulates the behaviors that matter to the engine's correctness —
//! asynchronous mode attach, vsync-paced swaps, double-buffered frame
//! retirement — and records everything it does on a shared [`Timeline`]
//! so tests can assert ordering.

mod backend;
mod gpu;
mod timeline;

pub use backend::{HeadlessBackend, HeadlessConfig};
pub use gpu::HeadlessGpu;
pub use timeline::{Timeline, TimelineEvent};
