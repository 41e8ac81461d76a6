// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for embedded scene rendering with a two-thread bridge.
//!
//! basalt drives a single fixed-size display surface on hardware without a
//! window manager. A *caller thread* owns the object-model surface (scripting
//! bindings, animations); a dedicated *render thread* owns the display and
//! all live scene state. The only shared mutable structure between them is
//! the update queue.
//!
//! # Architecture
//!
//! Property writes flow one way, events flow the other:
//!
//! ```text
//!   caller thread                        render thread
//!   ─────────────                        ─────────────
//!   PropertyBinding::set()
//!        │
//!        ▼
//!   UpdateQueue::enqueue() ──(frame)──► UpdateQueue::drain_and_apply()
//!                                            │
//!                                            ▼
//!                                       ObjectStore (live values)
//!                                            │
//!                                       draw callback
//!                                            │
//!                                       DisplaySurface::swap()
//!                                            │
//!                                       ResourceLedger::reclaim()
//!                                            │
//!   EventChannel::drain() ◄──────────── InputBridge / publish()
//! ```
//!
//! **[`object`]** / **[`property`]** — Generational-handle object store and
//! tagged-variant properties. Live values are mutated only on the render
//! thread; callers hold [`PropertyBinding`](property::PropertyBinding)
//! handles that enqueue deltas.
//!
//! **[`queue`]** — The cross-thread mailbox. Enqueue appends under a short
//! lock; the per-frame drain swaps the buffer out and applies updates with
//! last-write-wins collapsing and liveness checks.
//!
//! **[`events`]** — The reverse bridge: input events and render-thread
//! property writebacks delivered to the caller thread.
//!
//! **[`mode`]** / **[`surface`]** — Display mode negotiation and the
//! surface lifecycle state machine over the
//! [`DisplayBackend`](surface::DisplayBackend) platform contract.
//!
//! **[`ledger`]** — Two-phase GPU resource destruction: mark-for-destroy
//! from any thread, free only after the frame that could reference the
//! resource has retired.
//!
//! **[`input`]** — Raw event normalization and pointer-move coalescing,
//! polled once per frame (no extra synchronization domain).
//!
//! **[`runloop`]** — The frame driver: pump platform events, poll input,
//! drain, draw, swap, reclaim; cooperative stop with a guaranteed final
//! drain and reclaim on shutdown.

pub mod error;
pub mod events;
pub mod input;
pub mod ledger;
pub mod mode;
pub mod object;
pub mod property;
pub mod queue;
pub mod runloop;
pub mod surface;
