// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The simulated display.

use std::time::{Duration, Instant};

use basalt_core::error::SurfaceError;
use basalt_core::mode::DisplayMode;
use basalt_core::surface::{DisplayBackend, SwapReport};
use tracing::debug;

use crate::timeline::{Timeline, TimelineEvent};

/// Configuration for a [`HeadlessBackend`].
#[derive(Clone, Debug)]
pub struct HeadlessConfig {
    /// Modes the simulated display offers.
    pub modes: Vec<DisplayMode>,
    /// Simulated delay between a mode request and its confirmation.
    pub attach_latency: Duration,
    /// If set, the mode never attaches (exercises the timeout path).
    pub never_attach: bool,
    /// Swap pacing interval. Zero runs unpaced, which is what tests want;
    /// 16 ms approximates a 60 Hz display.
    pub vsync_period: Duration,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            modes: vec![
                DisplayMode::new(1920, 1080, 60),
                DisplayMode::new(1280, 720, 60),
            ],
            attach_latency: Duration::from_millis(1),
            never_attach: false,
            vsync_period: Duration::ZERO,
        }
    }
}

/// A display backend with no display.
///
/// Mode attach completes asynchronously after the configured latency, the
/// way a real display controller confirms a mode switch on its own
/// schedule. Swaps are double-buffered: submitting frame `n` retires frame
/// `n - 1`, and nothing retires on the first swap.
#[derive(Debug)]
pub struct HeadlessBackend {
    config: HeadlessConfig,
    timeline: Timeline,
    attach_ready_at: Option<Instant>,
    attached: bool,
    context_created: bool,
    surface_bound: bool,
    on_scanout: Option<u64>,
    last_swap: Option<Instant>,
}

impl HeadlessBackend {
    /// Creates a backend with the given configuration, recording onto
    /// `timeline`.
    #[must_use]
    pub fn new(config: HeadlessConfig, timeline: Timeline) -> Self {
        Self {
            config,
            timeline,
            attach_ready_at: None,
            attached: false,
            context_created: false,
            surface_bound: false,
            on_scanout: None,
            last_swap: None,
        }
    }

    /// The shared timeline.
    #[must_use]
    pub fn timeline(&self) -> Timeline {
        self.timeline.clone()
    }

    fn backend_err(op: &'static str, reason: &str) -> SurfaceError {
        SurfaceError::Backend {
            op,
            reason: reason.to_owned(),
        }
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(HeadlessConfig::default(), Timeline::new())
    }
}

impl DisplayBackend for HeadlessBackend {
    fn enumerate_modes(&mut self) -> Result<Vec<DisplayMode>, SurfaceError> {
        Ok(self.config.modes.clone())
    }

    fn request_mode(&mut self, mode: DisplayMode) -> Result<(), SurfaceError> {
        if !self.config.modes.contains(&mode) {
            return Err(Self::backend_err("request_mode", "mode not offered"));
        }
        debug!(?mode, "mode requested");
        if !self.config.never_attach {
            self.attach_ready_at = Some(Instant::now() + self.config.attach_latency);
        }
        Ok(())
    }

    fn wait_attach(&mut self, timeout: Duration) -> Result<(), SurfaceError> {
        if self.config.never_attach {
            // Nothing will ever signal; fail the attempt without sleeping.
            return Err(SurfaceError::AttachTimedOut);
        }
        let Some(ready_at) = self.attach_ready_at else {
            return Err(Self::backend_err("wait_attach", "no mode requested"));
        };
        let now = Instant::now();
        if ready_at > now {
            let remaining = ready_at - now;
            if remaining > timeout {
                std::thread::sleep(timeout);
                return Err(SurfaceError::AttachTimedOut);
            }
            std::thread::sleep(remaining);
        }
        self.attached = true;
        self.timeline.record(TimelineEvent::Attached);
        Ok(())
    }

    fn create_context(&mut self, _mode: DisplayMode) -> Result<(), SurfaceError> {
        if !self.attached {
            return Err(Self::backend_err("create_context", "mode not attached"));
        }
        self.context_created = true;
        Ok(())
    }

    fn bind_surface(&mut self, _mode: DisplayMode) -> Result<(), SurfaceError> {
        if !self.context_created {
            return Err(Self::backend_err("bind_surface", "no context"));
        }
        self.surface_bound = true;
        Ok(())
    }

    fn swap(&mut self, frame_index: u64) -> Result<SwapReport, SurfaceError> {
        if !self.surface_bound {
            return Err(Self::backend_err("swap", "surface not bound"));
        }

        let wait_start = Instant::now();
        if !self.config.vsync_period.is_zero() {
            if let Some(last) = self.last_swap {
                let target = last + self.config.vsync_period;
                let now = Instant::now();
                if target > now {
                    std::thread::sleep(target - now);
                }
            }
        }
        self.last_swap = Some(Instant::now());

        // Double buffering: the frame previously on scanout retires now.
        let retired_frame = self.on_scanout.replace(frame_index);
        self.timeline.record(TimelineEvent::Submitted(frame_index));
        if let Some(retired) = retired_frame {
            self.timeline.record(TimelineEvent::Retired(retired));
        }

        Ok(SwapReport {
            frame_index,
            retired_frame,
            vsync_wait: wait_start.elapsed(),
        })
    }

    fn teardown(&mut self) {
        self.attach_ready_at = None;
        self.attached = false;
        self.context_created = false;
        self.surface_bound = false;
        self.on_scanout = None;
        self.last_swap = None;
        self.timeline.record(TimelineEvent::ToreDown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attached_backend() -> HeadlessBackend {
        let mut backend = HeadlessBackend::new(
            HeadlessConfig {
                attach_latency: Duration::ZERO,
                ..HeadlessConfig::default()
            },
            Timeline::new(),
        );
        let mode = DisplayMode::new(1920, 1080, 60);
        backend.request_mode(mode).expect("mode is offered");
        backend
            .wait_attach(Duration::from_millis(10))
            .expect("attach is immediate");
        backend.create_context(mode).expect("attached");
        backend.bind_surface(mode).expect("context exists");
        backend
    }

    #[test]
    fn first_swap_retires_nothing() {
        let mut backend = attached_backend();
        let report = backend.swap(0).expect("swap succeeds");
        assert_eq!(report.retired_frame, None);

        let report = backend.swap(1).expect("swap succeeds");
        assert_eq!(report.retired_frame, Some(0), "double-buffer hand-off");
    }

    #[test]
    fn never_attach_times_out_without_sleeping() {
        let mut backend = HeadlessBackend::new(
            HeadlessConfig {
                never_attach: true,
                ..HeadlessConfig::default()
            },
            Timeline::new(),
        );
        backend
            .request_mode(DisplayMode::new(1920, 1080, 60))
            .expect("request is accepted");

        let start = Instant::now();
        let err = backend.wait_attach(Duration::from_secs(5));
        assert_eq!(err, Err(SurfaceError::AttachTimedOut));
        assert!(
            start.elapsed() < Duration::from_secs(1),
            "timeout is simulated, not slept"
        );
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let mut backend = HeadlessBackend::default();
        let err = backend.request_mode(DisplayMode::new(123, 45, 6));
        assert!(matches!(err, Err(SurfaceError::Backend { .. })));
    }

    #[test]
    fn lifecycle_order_is_enforced() {
        let mut backend = HeadlessBackend::default();
        assert!(
            backend.swap(0).is_err(),
            "swap without a bound surface must fail"
        );
        assert!(
            backend
                .create_context(DisplayMode::new(1920, 1080, 60))
                .is_err(),
            "context before attach must fail"
        );
    }

    #[test]
    fn teardown_resets_scanout() {
        let mut backend = attached_backend();
        let _ = backend.swap(0);
        backend.teardown();
        assert_eq!(
            backend.timeline().events().last(),
            Some(&TimelineEvent::ToreDown)
        );
    }
}
