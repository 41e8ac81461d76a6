// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display surface lifecycle.
//!
//! [`DisplaySurface`] drives a platform [`DisplayBackend`] through a strict
//! state machine:
//!
//! ```text
//! Uninitialized ──negotiate──▶ ModeNegotiated ──context──▶ ContextCreated
//!                                                               │
//!        Destroyed ◀──teardown── Running ◀──bind── SurfaceBound ◀┘
//! ```
//!
//! Mode attach is asynchronous on real hardware (the display controller
//! confirms the mode switch on its own schedule), so negotiation waits on
//! [`DisplayBackend::wait_attach`] with a bounded timeout and a bounded
//! number of retries. Initialization failures are fatal
//! ([`InitError`]) — there is no fallback rendering path.
//!
//! [`swap`](DisplaySurface::swap) is the frame pacing point: it blocks
//! until the platform accepts the frame and reports which previously
//! submitted frame *retired* (left scanout), which is what gates resource
//! reclamation in the [`ledger`](crate::ledger).

use core::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{InitError, SurfaceError};
use crate::mode::{DisplayMode, ModeRequest, select_mode};

/// Bounded retries for mode selection and attach confirmation.
pub const MAX_ATTACH_RETRIES: u32 = 3;

/// Per-attempt attach wait bound in milliseconds.
pub const ATTACH_TIMEOUT_MS: u64 = 500;

/// Per-attempt attach wait bound.
pub const ATTACH_TIMEOUT: Duration = Duration::from_millis(ATTACH_TIMEOUT_MS);

/// Lifecycle state of a [`DisplaySurface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceState {
    /// No mode negotiated yet.
    Uninitialized,
    /// A display mode is attached and confirmed.
    ModeNegotiated,
    /// The native rendering context exists.
    ContextCreated,
    /// The swap-chain surface is bound to the context.
    SurfaceBound,
    /// Frames may be submitted.
    Running,
    /// Torn down; terminal.
    Destroyed,
}

/// Outcome of a successful frame submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapReport {
    /// Index of the frame just submitted.
    pub frame_index: u64,
    /// Frame that left scanout as a result of this swap, if any.
    ///
    /// `None` for the first swap (no prior frame to retire). Resources
    /// referenced only by the retired frame are now safe to free.
    pub retired_frame: Option<u64>,
    /// Time spent blocked waiting for the platform to accept the frame.
    pub vsync_wait: Duration,
}

/// Platform display primitives.
///
/// Implementations wrap whatever the platform offers (KMS/DRM, EGL,
/// a test double). Each method is one step of the lifecycle; the
/// [`DisplaySurface`] sequences them and owns the state machine, so
/// back-ends stay free of ordering concerns.
pub trait DisplayBackend {
    /// Lists the modes the display currently offers.
    fn enumerate_modes(&mut self) -> Result<Vec<DisplayMode>, SurfaceError>;

    /// Asks the display controller to switch to `mode`. The switch is
    /// asynchronous; completion is observed via [`wait_attach`].
    ///
    /// [`wait_attach`]: Self::wait_attach
    fn request_mode(&mut self, mode: DisplayMode) -> Result<(), SurfaceError>;

    /// Blocks until the controller confirms the requested mode, or until
    /// `timeout` elapses ([`SurfaceError::AttachTimedOut`]).
    fn wait_attach(&mut self, timeout: Duration) -> Result<(), SurfaceError>;

    /// Creates the native rendering context for the attached mode.
    fn create_context(&mut self, mode: DisplayMode) -> Result<(), SurfaceError>;

    /// Creates and binds the swap-chain surface to the context.
    fn bind_surface(&mut self, mode: DisplayMode) -> Result<(), SurfaceError>;

    /// Services platform events (hotplug, page-flip completions). Called
    /// once per frame before drawing; the default is a no-op.
    fn pump_events(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }

    /// Submits frame `frame_index` and blocks until the platform accepts
    /// it, reporting which prior frame retired.
    fn swap(&mut self, frame_index: u64) -> Result<SwapReport, SurfaceError>;

    /// Releases every platform object. Must be safe to call at any point
    /// after construction, including after a partial initialization.
    fn teardown(&mut self);
}

/// Owns a backend and sequences its lifecycle.
#[derive(Debug)]
pub struct DisplaySurface<B: DisplayBackend> {
    backend: B,
    state: SurfaceState,
    mode: Option<DisplayMode>,
    frame_index: u64,
}

impl<B: DisplayBackend> DisplaySurface<B> {
    /// Wraps a backend; the surface starts [`Uninitialized`].
    ///
    /// [`Uninitialized`]: SurfaceState::Uninitialized
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: SurfaceState::Uninitialized,
            mode: None,
            frame_index: 0,
        }
    }

    /// Negotiates a mode, creates the context, binds the surface.
    ///
    /// Walks the full state machine to [`Running`] and returns the mode
    /// actually attached (nearest-fit, which may differ from the request).
    /// On failure the state shows how far initialization got, and
    /// [`teardown`] remains safe.
    ///
    /// # Panics
    ///
    /// Panics if the surface is not [`Uninitialized`].
    ///
    /// [`Running`]: SurfaceState::Running
    /// [`teardown`]: Self::teardown
    pub fn initialize(&mut self, request: &ModeRequest) -> Result<DisplayMode, InitError> {
        assert_eq!(
            self.state,
            SurfaceState::Uninitialized,
            "initialize on a surface that was already initialized"
        );

        let mode = self.negotiate(request)?;
        self.state = SurfaceState::ModeNegotiated;
        debug!(?mode, "display mode attached");

        self.backend
            .create_context(mode)
            .map_err(InitError::ContextCreation)?;
        self.state = SurfaceState::ContextCreated;

        self.backend
            .bind_surface(mode)
            .map_err(InitError::ContextCreation)?;
        self.state = SurfaceState::SurfaceBound;

        self.mode = Some(mode);
        self.state = SurfaceState::Running;
        info!(?mode, "display surface running");
        Ok(mode)
    }

    /// Enumerates, selects, requests, and waits for attach, with bounded
    /// retries at each asynchronous step.
    fn negotiate(&mut self, request: &ModeRequest) -> Result<DisplayMode, InitError> {
        let mut attempts = 0;
        let mode = loop {
            attempts += 1;
            let available = self
                .backend
                .enumerate_modes()
                .map_err(InitError::Negotiation)?;
            if let Some(mode) = select_mode(&available, request) {
                break mode;
            }
            warn!(attempts, "no usable display mode enumerated");
            if attempts >= MAX_ATTACH_RETRIES {
                return Err(InitError::NoUsableMode { attempts });
            }
        };

        self.backend
            .request_mode(mode)
            .map_err(InitError::Negotiation)?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.backend.wait_attach(ATTACH_TIMEOUT) {
                Ok(()) => return Ok(mode),
                Err(SurfaceError::AttachTimedOut) => {
                    warn!(attempts, timeout_ms = ATTACH_TIMEOUT_MS, "mode attach timed out");
                    if attempts >= MAX_ATTACH_RETRIES {
                        return Err(InitError::ModeAttachTimeout {
                            attempts,
                            timeout_ms: ATTACH_TIMEOUT_MS,
                        });
                    }
                }
                Err(other) => return Err(InitError::Negotiation(other)),
            }
        }
    }

    /// Services platform events for this frame.
    pub fn pump_events(&mut self) -> Result<(), SurfaceError> {
        self.backend.pump_events()
    }

    /// Submits the current frame and advances the frame index.
    ///
    /// # Panics
    ///
    /// Panics if the surface is not [`Running`](SurfaceState::Running).
    pub fn swap(&mut self) -> Result<SwapReport, SurfaceError> {
        assert_eq!(
            self.state,
            SurfaceState::Running,
            "swap on a surface that is not running"
        );
        let report = self.backend.swap(self.frame_index)?;
        self.frame_index += 1;
        Ok(report)
    }

    /// Releases all platform objects. Idempotent; safe from any state.
    pub fn teardown(&mut self) {
        if self.state == SurfaceState::Destroyed {
            return;
        }
        self.backend.teardown();
        self.mode = None;
        self.state = SurfaceState::Destroyed;
        info!("display surface destroyed");
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// The attached mode, if the surface reached [`Running`].
    ///
    /// [`Running`]: SurfaceState::Running
    #[must_use]
    pub fn mode(&self) -> Option<DisplayMode> {
        self.mode
    }

    /// Index the next [`swap`](Self::swap) will submit.
    #[must_use]
    pub fn next_frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The wrapped backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
