// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render thread's frame loop.
//!
//! [`RenderLoop`] owns everything the render thread touches: the
//! [`DisplaySurface`], the [`ObjectStore`], the [`ResourceLedger`], and the
//! [`InputBridge`]. Each frame runs a fixed sequence:
//!
//! 1. pump platform events,
//! 2. poll input and deliver caller events,
//! 3. drain the update queue into the store,
//! 4. draw,
//! 5. swap (blocks for pacing, reports retirement),
//! 6. reclaim retired resources.
//!
//! The caller side keeps only `Send` handles: [`PropertyBinding`]s, the
//! [`EventChannel`], a [`ResourceDestroyer`], and a [`StopHandle`].
//! [`RenderLoop::spawn`] moves the loop onto its own thread and blocks the
//! caller until initialization either succeeds or fails, so fatal startup
//! errors surface synchronously before any frame is produced.
//!
//! [`PropertyBinding`]: crate::property::PropertyBinding
//! [`ResourceDestroyer`]: crate::ledger::ResourceDestroyer

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info, trace, warn};

use crate::error::{InitError, SurfaceError};
use crate::events::EventChannel;
use crate::input::{InputBridge, InputSource, NullInputSource};
use crate::ledger::{GpuAllocator, ResourceDestroyer, ResourceLedger};
use crate::mode::{DisplayMode, ModeRequest};
use crate::object::ObjectStore;
use crate::queue::{DrainReport, UpdateQueue};
use crate::surface::{DisplayBackend, DisplaySurface, SurfaceState};

/// Cooperative stop flag shared between the caller and the render thread.
///
/// Requesting a stop is sticky; the loop finishes its current frame and
/// then runs an orderly shutdown.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Creates an unsignalled handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the loop to stop after the current frame.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Timing information handed to the draw callback.
#[derive(Clone, Copy, Debug)]
pub struct FrameInfo {
    /// Index of the frame being drawn.
    pub frame_index: u64,
    /// Time since the surface reached `Running`.
    pub elapsed: Duration,
    /// Time since the previous frame started (zero for the first frame).
    pub delta: Duration,
}

/// Per-frame counters, for the stats recorder and log lines.
#[derive(Clone, Copy, Debug)]
pub struct FrameStats {
    /// Index of the frame.
    pub frame_index: u64,
    /// Update-queue drain outcome.
    pub drain: DrainReport,
    /// Input events delivered to the caller this frame.
    pub input_events: usize,
    /// GPU resources freed after retirement this frame.
    pub reclaimed: usize,
    /// Time blocked in `swap`.
    pub vsync_wait: Duration,
    /// Wall time of the whole iteration.
    pub frame_duration: Duration,
}

/// Observer invoked with each frame's stats.
pub type FrameObserver = Box<dyn FnMut(&FrameStats) + Send>;

/// The render thread's state machine: surface, scene objects, resources,
/// and input, driven frame by frame.
pub struct RenderLoop<B: DisplayBackend, A: GpuAllocator> {
    surface: DisplaySurface<B>,
    store: ObjectStore,
    queue: Arc<UpdateQueue>,
    events: EventChannel,
    ledger: ResourceLedger<A>,
    input: InputBridge,
    input_source: Box<dyn InputSource + Send>,
    stop: StopHandle,
    observer: Option<FrameObserver>,
    started: Instant,
    last_frame: Option<Instant>,
}

impl<B: DisplayBackend, A: GpuAllocator> RenderLoop<B, A> {
    /// Assembles a loop over a backend and an allocator.
    ///
    /// The loop starts without an input source; attach one with
    /// [`set_input_source`](Self::set_input_source).
    #[must_use]
    pub fn new(backend: B, allocator: A) -> Self {
        let queue = Arc::new(UpdateQueue::new());
        let events = EventChannel::new();
        let store = ObjectStore::new(Arc::clone(&queue), events.clone());
        Self {
            surface: DisplaySurface::new(backend),
            store,
            queue,
            events,
            ledger: ResourceLedger::new(allocator),
            input: InputBridge::new(1, 1),
            input_source: Box::new(NullInputSource),
            stop: StopHandle::new(),
            observer: None,
            started: Instant::now(),
            last_frame: None,
        }
    }

    /// Replaces the input source (defaults to a dry [`NullInputSource`]).
    pub fn set_input_source(&mut self, source: Box<dyn InputSource + Send>) {
        self.input_source = source;
    }

    /// Installs a per-frame stats observer.
    pub fn set_frame_observer(&mut self, observer: FrameObserver) {
        self.observer = Some(observer);
    }

    /// Initializes the display surface and sizes the input bridge to the
    /// attached mode.
    pub fn initialize(&mut self, request: &ModeRequest) -> Result<DisplayMode, InitError> {
        let mode = self.surface.initialize(request)?;
        self.input = InputBridge::new(mode.width, mode.height);
        self.started = Instant::now();
        self.last_frame = None;
        Ok(mode)
    }

    /// Runs one frame.
    ///
    /// Input failures are transient: logged, counted as zero events, and
    /// the frame proceeds. A swap failure is returned to the caller of
    /// [`run`](Self::run), which shuts the loop down.
    pub fn iterate(
        &mut self,
        draw: &mut (dyn FnMut(&ObjectStore, &FrameInfo) + Send),
    ) -> Result<FrameStats, SurfaceError> {
        let frame_start = Instant::now();

        self.surface.pump_events()?;

        let input_events = match self.input.poll_frame(&mut *self.input_source, &self.events) {
            Ok(count) => count,
            Err(err) => {
                warn!(%err, "input poll failed; skipping input this frame");
                0
            }
        };

        let drain = self.queue.drain_and_apply(&mut self.store);

        let info = FrameInfo {
            frame_index: self.surface.next_frame_index(),
            elapsed: self.started.elapsed(),
            delta: self
                .last_frame
                .map_or(Duration::ZERO, |last| frame_start.duration_since(last)),
        };
        self.last_frame = Some(frame_start);

        draw(&self.store, &info);

        let report = self.surface.swap()?;

        // Free only what a retired frame can no longer reference.
        let reclaimed = if report.retired_frame.is_some() {
            self.ledger.reclaim()
        } else {
            0
        };

        let stats = FrameStats {
            frame_index: info.frame_index,
            drain,
            input_events,
            reclaimed,
            vsync_wait: report.vsync_wait,
            frame_duration: frame_start.elapsed(),
        };
        trace!(
            frame = stats.frame_index,
            applied = stats.drain.applied,
            input = stats.input_events,
            reclaimed = stats.reclaimed,
            "frame complete"
        );
        if let Some(observer) = &mut self.observer {
            observer(&stats);
        }
        Ok(stats)
    }

    /// Runs frames until a stop is requested, then shuts down.
    ///
    /// A swap failure also terminates the loop; shutdown still runs so no
    /// resources are stranded.
    pub fn run(
        &mut self,
        draw: &mut (dyn FnMut(&ObjectStore, &FrameInfo) + Send),
    ) -> Result<(), SurfaceError> {
        info!("render loop started");
        let result = loop {
            if self.stop.is_stopped() {
                break Ok(());
            }
            if let Err(err) = self.iterate(draw) {
                break Err(err);
            }
        };
        self.shutdown();
        info!("render loop stopped");
        result
    }

    /// Orderly teardown: final drain, release of every GPU resource, then
    /// surface teardown.
    ///
    /// Runs after the loop stops, so no frame is in flight and every
    /// pending resource is reclaimable immediately; the resources are
    /// freed while the backend's context still exists. Idempotent.
    pub fn shutdown(&mut self) {
        if self.surface.state() == SurfaceState::Destroyed {
            return;
        }
        // Flush caller writes that raced the stop request.
        let drain = self.queue.drain_and_apply(&mut self.store);
        if drain.applied > 0 {
            trace!(applied = drain.applied, "final drain at shutdown");
        }
        self.ledger.release_all();
        let freed = self.ledger.reclaim();
        debug_assert_eq!(self.ledger.live_count(), 0, "resources leaked past shutdown");
        self.surface.teardown();
        info!(freed, "render loop shut down");
    }

    /// The scene object store (render thread only).
    pub fn store_mut(&mut self) -> &mut ObjectStore {
        &mut self.store
    }

    /// The resource ledger (render thread only).
    pub fn ledger_mut(&mut self) -> &mut ResourceLedger<A> {
        &mut self.ledger
    }

    /// Cross-thread destroyer for the ledger.
    #[must_use]
    pub fn destroyer(&self) -> ResourceDestroyer {
        self.ledger.destroyer()
    }

    /// The caller-facing event channel.
    #[must_use]
    pub fn events(&self) -> EventChannel {
        self.events.clone()
    }

    /// The shared update queue (for constructing caller-side bindings).
    #[must_use]
    pub fn queue(&self) -> Arc<UpdateQueue> {
        Arc::clone(&self.queue)
    }

    /// The stop handle.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// The display surface.
    pub fn surface_mut(&mut self) -> &mut DisplaySurface<B> {
        &mut self.surface
    }
}

impl<B: DisplayBackend, A: GpuAllocator> fmt::Debug for RenderLoop<B, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderLoop")
            .field("surface_state", &self.surface.state())
            .field("objects", &self.store.live_objects())
            .field("stopped", &self.stop.is_stopped())
            .finish_non_exhaustive()
    }
}

impl<B, A> RenderLoop<B, A>
where
    B: DisplayBackend + Send + 'static,
    A: GpuAllocator + Send + 'static,
{
    /// Moves the loop onto its own thread.
    ///
    /// Blocks until initialization completes on the render thread: a fatal
    /// [`InitError`] is returned here, synchronously, and the thread is
    /// already gone. On success the returned [`EngineHandle`] carries the
    /// handles the caller side needs.
    pub fn spawn<F>(mut self, request: ModeRequest, mut draw: F) -> Result<EngineHandle, InitError>
    where
        F: FnMut(&ObjectStore, &FrameInfo) + Send + 'static,
    {
        let stop = self.stop_handle();
        let events = self.events();
        let queue = self.queue();
        let destroyer = self.destroyer();
        let (init_tx, init_rx) = crossbeam_channel::bounded::<Result<DisplayMode, InitError>>(1);

        let thread = thread::Builder::new()
            .name("basalt-render".into())
            .spawn(move || {
                match self.initialize(&request) {
                    Ok(mode) => {
                        // A dropped receiver means the caller gave up; stop.
                        if init_tx.send(Ok(mode)).is_err() {
                            self.shutdown();
                            return Ok(());
                        }
                    }
                    Err(err) => {
                        error!(%err, "render thread initialization failed");
                        let _ = init_tx.send(Err(err));
                        return Ok(());
                    }
                }
                self.run(&mut draw)
            })
            .map_err(|err| {
                InitError::Negotiation(SurfaceError::Backend {
                    op: "spawn",
                    reason: err.to_string(),
                })
            })?;

        match init_rx.recv() {
            Ok(Ok(mode)) => Ok(EngineHandle {
                mode,
                stop,
                events,
                queue,
                destroyer,
                thread,
            }),
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err)
            }
            // The render thread died before reporting; surface it as fatal.
            Err(_) => {
                let _ = thread.join();
                Err(InitError::Negotiation(SurfaceError::Backend {
                    op: "initialize",
                    reason: "render thread exited before reporting".into(),
                }))
            }
        }
    }
}

/// Caller-side handle to a spawned render thread.
#[derive(Debug)]
pub struct EngineHandle {
    mode: DisplayMode,
    stop: StopHandle,
    events: EventChannel,
    queue: Arc<UpdateQueue>,
    destroyer: ResourceDestroyer,
    thread: JoinHandle<Result<(), SurfaceError>>,
}

impl EngineHandle {
    /// The mode the display actually attached.
    #[must_use]
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// The stop handle.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// The caller-facing event channel.
    #[must_use]
    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    /// The shared update queue.
    #[must_use]
    pub fn queue(&self) -> Arc<UpdateQueue> {
        Arc::clone(&self.queue)
    }

    /// Cross-thread resource destroyer.
    #[must_use]
    pub fn destroyer(&self) -> ResourceDestroyer {
        self.destroyer.clone()
    }

    /// Requests a stop and waits for the render thread to finish.
    ///
    /// Returns the loop's final result; a swap failure that terminated the
    /// loop early shows up here.
    pub fn stop_and_join(self) -> Result<(), SurfaceError> {
        self.stop.request_stop();
        match self.thread.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
