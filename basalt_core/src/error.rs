// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy.
//!
//! Four classes, handled at different levels:
//!
//! 1. *Transient* — stale/disconnected updates, dropped input events.
//!    These are counters in reports ([`DrainReport`]), never `Err`.
//! 2. *Resource* — [`ResourceError`]: a GPU allocation failed. Reported to
//!    the resource's logical owner; the render loop continues.
//! 3. *Fatal* — [`InitError`]: no usable display mode, attach timeout, or
//!    context creation failure. Terminates the render thread and is
//!    reported to the caller side synchronously, before any frame.
//! 4. *Protocol* — updates targeting disconnected or unknown properties
//!    are deliberate no-ops, also counters, never errors.
//!
//! [`DrainReport`]: crate::queue::DrainReport

use thiserror::Error;

use crate::ledger::ResourceKind;

/// A failure reported by a [`DisplayBackend`](crate::surface::DisplayBackend)
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// A backend primitive failed.
    #[error("display backend `{op}` failed: {reason}")]
    Backend {
        /// The backend operation that failed.
        op: &'static str,
        /// Platform-specific description.
        reason: String,
    },
    /// The platform did not confirm the mode attach within the wait bound.
    #[error("display mode attach timed out")]
    AttachTimedOut,
}

/// Fatal initialization failure (error class 3).
///
/// There is no fallback rendering path: any of these terminates the render
/// thread before it produces a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    /// Mode negotiation found no usable mode within the retry bound.
    #[error("no usable display mode after {attempts} negotiation attempts")]
    NoUsableMode {
        /// Number of enumerate/select attempts made.
        attempts: u32,
    },
    /// The platform never confirmed the requested mode.
    #[error("display mode was not attached after {attempts} attempts of {timeout_ms} ms each")]
    ModeAttachTimeout {
        /// Number of attach attempts made.
        attempts: u32,
        /// Per-attempt wait bound in milliseconds.
        timeout_ms: u64,
    },
    /// The backend failed while enumerating or requesting modes.
    #[error("mode negotiation failed: {0}")]
    Negotiation(SurfaceError),
    /// Native context or swap-chain surface creation failed.
    #[error("context creation failed: {0}")]
    ContextCreation(SurfaceError),
}

/// GPU resource failure (error class 2); the frame loop continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The allocator could not satisfy the request.
    #[error("allocation of {kind:?} failed: {reason}")]
    AllocationFailed {
        /// Kind of resource requested.
        kind: ResourceKind,
        /// Allocator-specific description.
        reason: String,
    },
    /// The referenced resource was already released or reclaimed.
    #[error("stale resource handle")]
    StaleHandle,
}

/// Input device failure; logged and skipped for the frame (transient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Reading from an input device failed.
    #[error("input device `{device}` failed: {reason}")]
    Device {
        /// Device path or identifier.
        device: String,
        /// OS-level description.
        reason: String,
    },
}
