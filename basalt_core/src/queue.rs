// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The cross-thread update mailbox.
//!
//! [`UpdateQueue`] is the single concurrency bridge in the system: property
//! mutations produced on the caller thread are buffered here and applied to
//! live scene state exactly once per frame, on the render thread. No other
//! shared mutable scene state crosses the thread boundary.
//!
//! # Lock discipline
//!
//! The pending buffer is guarded by one mutex held only for the O(1)
//! append in [`enqueue`](UpdateQueue::enqueue) and for the buffer swap at
//! the start of [`drain_and_apply`](UpdateQueue::drain_and_apply). Updates
//! are applied *outside* the lock, so the caller thread is never blocked by
//! apply hooks, drawing, or GPU submission.
//!
//! # Batch semantics
//!
//! Within one drained batch, only the last update per (object, property)
//! is authoritative — earlier ones are superseded, not replayed
//! (last-write-wins). Survivors are applied in caller-issued sequence
//! order. Updates whose target object was released between enqueue and
//! drain, and updates targeting disconnected or unknown properties, are
//! dropped without error; both cases are counted in the [`DrainReport`].

use std::collections::HashMap;
use std::mem;

use parking_lot::Mutex;

use crate::object::{ApplyOutcome, ObjectId, ObjectStore};
use crate::property::{PropertyId, PropertyValue};

/// An immutable snapshot of one caller-side property write.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingUpdate {
    /// Target object.
    pub object: ObjectId,
    /// Target property within the object.
    pub property: PropertyId,
    /// The new value.
    pub value: PropertyValue,
    /// Enqueue-order sequence number (monotonic per queue).
    pub sequence: u64,
}

/// Counters produced by one [`UpdateQueue::drain_and_apply`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Total updates moved out of the buffer.
    pub drained: usize,
    /// Updates applied to live property slots.
    pub applied: usize,
    /// Updates superseded by a later write to the same property in the
    /// same batch (last-write-wins).
    pub superseded: usize,
    /// Updates dropped because the target object was released.
    pub dropped_stale: usize,
    /// Updates dropped because the target property was disconnected or
    /// unknown (a deliberate no-op, not an error).
    pub dropped_disconnected: usize,
}

impl DrainReport {
    /// Total updates that did not reach a live slot.
    #[must_use]
    pub const fn total_dropped(&self) -> usize {
        self.superseded + self.dropped_stale + self.dropped_disconnected
    }
}

#[derive(Debug, Default)]
struct QueueState {
    buf: Vec<PendingUpdate>,
    next_sequence: u64,
}

/// Unbounded append-only buffer of pending property updates.
///
/// Shared between threads behind an `Arc`; see the module docs for the
/// locking and batch-collapse contract.
#[derive(Debug, Default)]
pub struct UpdateQueue {
    state: Mutex<QueueState>,
}

impl UpdateQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an update, assigning it the next sequence number.
    ///
    /// Callable from any thread; holds the queue lock only for the append.
    /// Returns the assigned sequence number.
    pub fn enqueue(&self, object: ObjectId, property: PropertyId, value: PropertyValue) -> u64 {
        let mut state = self.state.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.buf.push(PendingUpdate {
            object,
            property,
            value,
            sequence,
        });
        sequence
    }

    /// Returns the number of updates currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().buf.len()
    }

    /// Returns whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().buf.is_empty()
    }

    /// Drains the buffer and applies the batch to live scene state.
    ///
    /// Called once per frame, only from the render thread. The buffer is
    /// swapped for an empty one under the lock (enqueue continues
    /// concurrently without blocking on the apply work), then the batch is
    /// collapsed last-write-wins per property and applied in sequence
    /// order. Apply hooks run synchronously here.
    pub fn drain_and_apply(&self, store: &mut ObjectStore) -> DrainReport {
        let batch = {
            let mut state = self.state.lock();
            mem::take(&mut state.buf)
        };

        let mut report = DrainReport {
            drained: batch.len(),
            ..DrainReport::default()
        };
        if batch.is_empty() {
            return report;
        }

        // Collapse: keep only the highest sequence per (object, property).
        let mut winners: HashMap<(ObjectId, PropertyId), u64> = HashMap::new();
        for update in &batch {
            let entry = winners
                .entry((update.object, update.property))
                .or_insert(update.sequence);
            if update.sequence > *entry {
                *entry = update.sequence;
            }
        }
        report.superseded = batch.len() - winners.len();

        // Enqueue assigns sequences under the same lock that orders the
        // buffer, so the batch is already in sequence order.
        for update in batch {
            if winners.get(&(update.object, update.property)) != Some(&update.sequence) {
                continue;
            }
            match store.apply_update(update) {
                ApplyOutcome::Applied => report.applied += 1,
                ApplyOutcome::StaleObject => report.dropped_stale += 1,
                ApplyOutcome::Ignored => report.dropped_disconnected += 1,
            }
        }
        report
    }
}
