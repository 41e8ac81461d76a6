// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared action recorder.

use std::sync::Arc;

use basalt_core::ledger::NativeId;
use parking_lot::Mutex;

/// One recorded backend or allocator action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimelineEvent {
    /// The display controller confirmed the requested mode.
    Attached,
    /// A frame was submitted for scanout.
    Submitted(u64),
    /// A previously submitted frame left scanout.
    Retired(u64),
    /// The allocator created a native resource.
    Allocated(NativeId),
    /// The allocator freed a native resource.
    Freed(NativeId),
    /// The backend released its platform objects.
    ToreDown,
}

/// Ordered record of everything the backend and allocator did.
///
/// Cloneable; the same timeline is typically shared between a
/// [`HeadlessBackend`](crate::HeadlessBackend) and a
/// [`HeadlessGpu`](crate::HeadlessGpu) so cross-component ordering (frees
/// strictly after retirement) is observable in one sequence.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    events: Arc<Mutex<Vec<TimelineEvent>>>,
}

impl Timeline {
    /// Creates an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, event: TimelineEvent) {
        self.events.lock().push(event);
    }

    /// Snapshot of all recorded events, in order.
    #[must_use]
    pub fn events(&self) -> Vec<TimelineEvent> {
        self.events.lock().clone()
    }

    /// Index of the first occurrence of `event`, if recorded.
    #[must_use]
    pub fn position(&self, event: TimelineEvent) -> Option<usize> {
        self.events.lock().iter().position(|e| *e == event)
    }

    /// Number of recorded events matching `pred`.
    #[must_use]
    pub fn count(&self, pred: impl Fn(&TimelineEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}
