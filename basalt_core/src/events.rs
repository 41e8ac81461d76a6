// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The reverse-direction bridge: render thread → caller thread.
//!
//! Input events and render-thread property writebacks are queued here and
//! drained by the caller thread at its leisure. Same pattern as the update
//! queue (short-held lock, swap-out drain), opposite direction.
//!
//! Input events are bounded with a drop-oldest overflow policy so a stalled
//! caller thread cannot grow the queue without limit under an event flood;
//! [`CallerEvent::PropertySynced`] events are authoritative values and are
//! never dropped.

use core::fmt;
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::input::InputEvent;
use crate::object::ObjectId;
use crate::property::{PropertyId, PropertyValue};

/// An event delivered to the caller thread.
#[derive(Clone, Debug, PartialEq)]
pub enum CallerEvent {
    /// A normalized input event (see [`crate::input`]).
    Input(InputEvent),
    /// The render thread wrote an authoritative property value
    /// (e.g. measured text width); the caller-side model should adopt it.
    PropertySynced {
        /// Owning object.
        object: ObjectId,
        /// Property within the object.
        property: PropertyId,
        /// The value the render thread stored.
        value: PropertyValue,
    },
}

#[derive(Debug)]
struct ChannelState {
    events: VecDeque<CallerEvent>,
    queued_inputs: usize,
    input_capacity: usize,
    dropped_inputs: u64,
}

/// Cross-thread event queue, cloneable on both sides.
///
/// The render loop holds one clone and pushes; the caller thread holds
/// another and [`drain`](Self::drain)s once per tick of its own loop.
#[derive(Clone)]
pub struct EventChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl EventChannel {
    /// Default bound on queued input events.
    pub const DEFAULT_INPUT_CAPACITY: usize = 256;

    /// Creates a channel with the default input bound.
    #[must_use]
    pub fn new() -> Self {
        Self::with_input_capacity(Self::DEFAULT_INPUT_CAPACITY)
    }

    /// Creates a channel with an explicit input bound.
    ///
    /// `capacity == 0` is promoted to `1`.
    #[must_use]
    pub fn with_input_capacity(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChannelState {
                events: VecDeque::new(),
                queued_inputs: 0,
                input_capacity: capacity.max(1),
                dropped_inputs: 0,
            })),
        }
    }

    /// Enqueues one event.
    ///
    /// When the input bound is reached, the oldest queued *input* event is
    /// dropped first; property-sync events are never displaced.
    pub fn push(&self, event: CallerEvent) {
        let mut state = self.state.lock();
        if matches!(event, CallerEvent::Input(_)) {
            if state.queued_inputs == state.input_capacity {
                let pos = state
                    .events
                    .iter()
                    .position(|e| matches!(e, CallerEvent::Input(_)));
                if let Some(pos) = pos {
                    state.events.remove(pos);
                    state.queued_inputs -= 1;
                    state.dropped_inputs += 1;
                }
            }
            state.queued_inputs += 1;
        }
        state.events.push_back(event);
    }

    /// Drains all queued events in delivery order.
    #[must_use]
    pub fn drain(&self) -> Vec<CallerEvent> {
        let mut state = self.state.lock();
        state.queued_inputs = 0;
        state.events.drain(..).collect()
    }

    /// Returns the number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Returns whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().events.is_empty()
    }

    /// Number of input events dropped to the overflow policy so far.
    #[must_use]
    pub fn dropped_inputs(&self) -> u64 {
        self.state.lock().dropped_inputs
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EventChannel")
            .field("queued", &state.events.len())
            .field("queued_inputs", &state.queued_inputs)
            .field("dropped_inputs", &state.dropped_inputs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputEvent, KeyState};

    fn key(code: u16) -> CallerEvent {
        CallerEvent::Input(InputEvent::Key {
            code,
            state: KeyState::Pressed,
        })
    }

    #[test]
    fn events_drain_in_delivery_order() {
        let channel = EventChannel::new();
        channel.push(key(1));
        channel.push(key(2));

        let drained = channel.drain();
        assert_eq!(drained, vec![key(1), key(2)]);
        assert!(channel.is_empty());
    }

    #[test]
    fn input_overflow_drops_oldest_input() {
        let channel = EventChannel::with_input_capacity(2);
        channel.push(key(1));
        channel.push(key(2));
        channel.push(key(3));

        assert_eq!(channel.drain(), vec![key(2), key(3)]);
        assert_eq!(channel.dropped_inputs(), 1);
    }

    #[test]
    fn property_sync_is_never_displaced_by_input_flood() {
        let channel = EventChannel::with_input_capacity(1);
        let sync = CallerEvent::PropertySynced {
            object: crate::object::ObjectId {
                idx: 0,
                generation: 0,
            },
            property: crate::property::PropertyId(0),
            value: PropertyValue::Float(1.0),
        };
        channel.push(sync.clone());
        channel.push(key(1));
        channel.push(key(2));
        channel.push(key(3));

        let drained = channel.drain();
        assert!(
            drained.contains(&sync),
            "authoritative sync must survive the flood"
        );
        assert_eq!(drained.len(), 2, "one sync + one surviving input");
        assert_eq!(channel.dropped_inputs(), 2);
    }

    #[test]
    fn zero_capacity_is_promoted_to_one() {
        let channel = EventChannel::with_input_capacity(0);
        channel.push(key(1));
        channel.push(key(2));
        assert_eq!(channel.drain(), vec![key(2)]);
        assert_eq!(channel.dropped_inputs(), 1);
    }
}
