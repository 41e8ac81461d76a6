// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ring-buffered frame statistics.

use core::fmt;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use basalt_core::runloop::{FrameObserver, FrameStats};
use parking_lot::Mutex;

/// Keeps the most recent frames' statistics.
///
/// Cloneable; install one end as the render loop's frame observer and keep
/// the other on the caller side for summaries. Recording is a push into a
/// bounded ring under a short lock, cheap enough for every frame.
#[derive(Clone)]
pub struct FrameRecorder {
    inner: Arc<Mutex<Ring>>,
}

#[derive(Debug)]
struct Ring {
    frames: VecDeque<FrameStats>,
    capacity: usize,
    recorded: u64,
}

impl FrameRecorder {
    /// Default ring capacity; about ten seconds at 60 Hz.
    pub const DEFAULT_CAPACITY: usize = 600;

    /// Creates a recorder with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a recorder keeping the last `capacity` frames.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Ring {
                frames: VecDeque::with_capacity(capacity),
                capacity: capacity.max(1),
                recorded: 0,
            })),
        }
    }

    /// Records one frame, evicting the oldest if the ring is full.
    pub fn record(&self, stats: &FrameStats) {
        let mut ring = self.inner.lock();
        if ring.frames.len() == ring.capacity {
            ring.frames.pop_front();
        }
        ring.frames.push_back(*stats);
        ring.recorded += 1;
    }

    /// Boxed observer for
    /// [`RenderLoop::set_frame_observer`](basalt_core::runloop::RenderLoop::set_frame_observer).
    #[must_use]
    pub fn observer(&self) -> FrameObserver {
        let recorder = self.clone();
        Box::new(move |stats| recorder.record(stats))
    }

    /// Snapshot of the retained frames, oldest first.
    #[must_use]
    pub fn frames(&self) -> Vec<FrameStats> {
        self.inner.lock().frames.iter().copied().collect()
    }

    /// Number of frames currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().frames.len()
    }

    /// Whether no frames were recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().frames.is_empty()
    }

    /// Aggregates the retained frames.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let ring = self.inner.lock();
        let mut summary = RunSummary {
            frames_recorded: ring.recorded,
            frames_retained: ring.frames.len(),
            ..RunSummary::default()
        };
        for stats in &ring.frames {
            summary.updates_applied += stats.drain.applied as u64;
            summary.updates_superseded += stats.drain.superseded as u64;
            summary.updates_dropped += stats.drain.total_dropped() as u64;
            summary.input_events += stats.input_events as u64;
            summary.resources_reclaimed += stats.reclaimed as u64;
            summary.total_frame_time += stats.frame_duration;
            summary.total_vsync_wait += stats.vsync_wait;
            if stats.frame_duration > summary.worst_frame_time {
                summary.worst_frame_time = stats.frame_duration;
            }
        }
        summary
    }
}

impl Default for FrameRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ring = self.inner.lock();
        f.debug_struct("FrameRecorder")
            .field("retained", &ring.frames.len())
            .field("recorded", &ring.recorded)
            .finish_non_exhaustive()
    }
}

/// Aggregate statistics over the retained frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames recorded over the recorder's lifetime.
    pub frames_recorded: u64,
    /// Frames currently retained in the ring.
    pub frames_retained: usize,
    /// Property updates applied across retained frames.
    pub updates_applied: u64,
    /// Updates collapsed away by last-write-wins.
    pub updates_superseded: u64,
    /// Updates dropped as stale or disconnected.
    pub updates_dropped: u64,
    /// Input events delivered to the caller.
    pub input_events: u64,
    /// GPU resources freed after retirement.
    pub resources_reclaimed: u64,
    /// Sum of retained frame durations.
    pub total_frame_time: Duration,
    /// Sum of time blocked on vsync.
    pub total_vsync_wait: Duration,
    /// Longest retained frame.
    pub worst_frame_time: Duration,
}

impl RunSummary {
    /// Mean frame duration, or zero with nothing retained.
    #[must_use]
    pub fn mean_frame_time(&self) -> Duration {
        match u32::try_from(self.frames_retained) {
            Ok(n) if n > 0 => self.total_frame_time / n,
            _ => Duration::ZERO,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "frames: {} ({} retained)", self.frames_recorded, self.frames_retained)?;
        writeln!(
            f,
            "updates: {} applied, {} superseded, {} dropped",
            self.updates_applied, self.updates_superseded, self.updates_dropped
        )?;
        writeln!(f, "input events: {}", self.input_events)?;
        writeln!(f, "resources reclaimed: {}", self.resources_reclaimed)?;
        write!(
            f,
            "frame time: {:.2?} mean, {:.2?} worst, {:.2?} waiting on vsync",
            self.mean_frame_time(),
            self.worst_frame_time,
            self.total_vsync_wait
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_core::queue::DrainReport;

    fn stats(frame_index: u64, applied: usize, millis: u64) -> FrameStats {
        FrameStats {
            frame_index,
            drain: DrainReport {
                drained: applied,
                applied,
                superseded: 0,
                dropped_stale: 0,
                dropped_disconnected: 0,
            },
            input_events: 2,
            reclaimed: 0,
            vsync_wait: Duration::from_millis(1),
            frame_duration: Duration::from_millis(millis),
        }
    }

    #[test]
    fn ring_evicts_oldest_but_counts_all() {
        let recorder = FrameRecorder::with_capacity(2);
        for i in 0..5 {
            recorder.record(&stats(i, 1, 16));
        }
        assert_eq!(recorder.len(), 2);

        let frames = recorder.frames();
        assert_eq!(frames[0].frame_index, 3, "oldest retained frame");
        assert_eq!(recorder.summary().frames_recorded, 5);
    }

    #[test]
    fn summary_aggregates_retained_frames() {
        let recorder = FrameRecorder::new();
        recorder.record(&stats(0, 3, 10));
        recorder.record(&stats(1, 2, 20));

        let summary = recorder.summary();
        assert_eq!(summary.updates_applied, 5);
        assert_eq!(summary.input_events, 4);
        assert_eq!(summary.worst_frame_time, Duration::from_millis(20));
        assert_eq!(summary.mean_frame_time(), Duration::from_millis(15));
    }

    #[test]
    fn observer_feeds_the_same_ring() {
        let recorder = FrameRecorder::new();
        let mut observer = recorder.observer();
        observer(&stats(0, 1, 16));
        assert_eq!(recorder.len(), 1);
    }
}
