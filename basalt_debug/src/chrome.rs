// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] writes a [`FrameRecorder`]'s retained frames as
//! [Chrome Trace Event Format][spec] JSON, one complete (`"X"`) event per
//! frame plus counter (`"C"`) events for the drain statistics. Frames carry
//! durations rather than absolute timestamps, so the timeline is
//! reconstructed by accumulating frame durations.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::FrameRecorder;

/// Exports the recorder's retained frames as trace-event JSON.
///
/// The output is a complete JSON array, suitable for loading into
/// `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(recorder: &FrameRecorder, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut ts_us: u64 = 0;

    for stats in recorder.frames() {
        let dur_us = duration_us(stats.frame_duration);
        events.push(json!({
            "ph": "X",
            "name": "frame",
            "cat": "Frame",
            "ts": ts_us,
            "dur": dur_us,
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": stats.frame_index,
                "input_events": stats.input_events,
                "reclaimed": stats.reclaimed,
                "vsync_wait_us": duration_us(stats.vsync_wait),
            }
        }));
        events.push(json!({
            "ph": "C",
            "name": "updates",
            "cat": "Sync",
            "ts": ts_us,
            "pid": 0,
            "tid": 0,
            "args": {
                "applied": stats.drain.applied,
                "superseded": stats.drain.superseded,
                "dropped": stats.drain.total_dropped(),
            }
        }));
        ts_us += dur_us;
    }

    serde_json::to_writer(writer, &events).map_err(io::Error::from)
}

fn duration_us(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
