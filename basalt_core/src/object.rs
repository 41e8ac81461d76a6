// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene object storage with generational handles.
//!
//! Objects are addressed by [`ObjectId`] handles. Internally each object
//! occupies a slot in the store; destroyed slots are recycled via a free
//! list, and generation counters make stale handles detectable. That
//! liveness check is what lets the update queue drop updates whose target
//! was released between enqueue and drain without error.
//!
//! The store lives on the render thread. Caller-side access goes through
//! [`PropertyBinding`] handles produced at registration time; the render
//! thread pushes authoritative values back with [`publish`]
//! ([`ObjectStore::publish`]), which writes the live slot directly and
//! notifies the caller thread on the event channel.
//!
//! [`publish`]: ObjectStore::publish

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::events::{CallerEvent, EventChannel};
use crate::property::{ApplyHook, PropertyBinding, PropertyId, PropertySlot, PropertyValue};
use crate::queue::{PendingUpdate, UpdateQueue};

/// A handle to an object in an [`ObjectStore`].
///
/// Contains a slot index and a generation counter so stale handles are
/// detected after a slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl ObjectId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}@gen{})", self.idx, self.generation)
    }
}

/// Outcome of applying a single drained update (crate-internal).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ApplyOutcome {
    /// Value stored (or transformed and stored by the apply hook).
    Applied,
    /// Target object was released between enqueue and drain.
    StaleObject,
    /// Property id unknown for this object, or disconnected mid-flight.
    Ignored,
}

#[derive(Debug, Default)]
struct ObjectSlot {
    name: String,
    props: Vec<PropertySlot>,
    alive: bool,
}

/// Render-thread-owned storage for all scene objects.
///
/// Handles out property bindings at registration time and applies drained
/// updates. Accessors validate handles and panic on stale ids, matching the
/// "handle misuse is a caller bug" contract; the drain path uses
/// non-panicking liveness checks instead, because enqueue/release races are
/// expected and tolerated.
pub struct ObjectStore {
    slots: Vec<ObjectSlot>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
    queue: Arc<UpdateQueue>,
    events: EventChannel,
}

impl ObjectStore {
    /// Creates an empty store wired to the given queue and event channel.
    #[must_use]
    pub fn new(queue: Arc<UpdateQueue>, events: EventChannel) -> Self {
        Self {
            slots: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            queue,
            events,
        }
    }

    // -- Allocation API --

    /// Creates a new named object and returns its handle.
    pub fn create_object(&mut self, name: impl Into<String>) -> ObjectId {
        let name = name.into();
        let idx = if let Some(idx) = self.free_list.pop() {
            self.generation[idx as usize] += 1;
            self.slots[idx as usize] = ObjectSlot {
                name,
                props: Vec::new(),
                alive: true,
            };
            idx
        } else {
            let idx = u32::try_from(self.slots.len()).expect("object slot count exceeds u32");
            self.slots.push(ObjectSlot {
                name,
                props: Vec::new(),
                alive: true,
            });
            self.generation.push(0);
            idx
        };
        ObjectId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Releases an object, freeing its slot for reuse.
    ///
    /// Pending queued updates that still reference the object become stale
    /// and are dropped at the next drain. Property ids of the released
    /// object are never reused: a reused slot starts a new object with a
    /// fresh generation and an empty property table.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy_object(&mut self, id: ObjectId) {
        self.validate(id);
        self.generation[id.idx as usize] += 1;
        let slot = &mut self.slots[id.idx as usize];
        slot.alive = false;
        slot.props.clear();
        self.free_list.push(id.idx);
    }

    /// Returns whether the given handle refers to a live object.
    #[must_use]
    pub fn is_alive(&self, id: ObjectId) -> bool {
        (id.idx as usize) < self.slots.len()
            && self.generation[id.idx as usize] == id.generation
            && self.slots[id.idx as usize].alive
    }

    /// Returns the number of live objects.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.slots.iter().filter(|s| s.alive).count()
    }

    // -- Registration API --

    /// Registers a watched property and returns the caller-side binding.
    ///
    /// The property id is allocated monotonically within the object and the
    /// binding starts connected.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the object already has `u16::MAX`
    /// properties.
    pub fn register_property(
        &mut self,
        id: ObjectId,
        name: impl Into<String>,
        initial: PropertyValue,
    ) -> PropertyBinding {
        self.register_slot(id, name.into(), initial, None)
    }

    /// Like [`register_property`](Self::register_property), with an apply
    /// hook run synchronously at drain time before the value is stored.
    pub fn register_property_with_hook(
        &mut self,
        id: ObjectId,
        name: impl Into<String>,
        initial: PropertyValue,
        hook: ApplyHook,
    ) -> PropertyBinding {
        self.register_slot(id, name.into(), initial, Some(hook))
    }

    fn register_slot(
        &mut self,
        id: ObjectId,
        name: String,
        initial: PropertyValue,
        apply_hook: Option<ApplyHook>,
    ) -> PropertyBinding {
        self.validate(id);
        let slot = &mut self.slots[id.idx as usize];
        let prop_idx = u16::try_from(slot.props.len()).expect("property id space exhausted");
        let connected = Arc::new(AtomicBool::new(true));
        slot.props.push(PropertySlot {
            name,
            value: initial,
            connected: Arc::clone(&connected),
            apply_hook,
        });
        PropertyBinding::new(
            id,
            PropertyId(prop_idx),
            connected,
            Arc::clone(&self.queue),
        )
    }

    // -- Render-thread accessors --

    /// Returns the live value of a property.
    ///
    /// Render-thread only; values observed here reflect the latest drain.
    ///
    /// # Panics
    ///
    /// Panics if the object handle is stale or the property id is unknown.
    #[must_use]
    pub fn value(&self, id: ObjectId, property: PropertyId) -> &PropertyValue {
        self.validate(id);
        let slot = &self.slots[id.idx as usize];
        &slot
            .props
            .get(property.0 as usize)
            .unwrap_or_else(|| panic!("unknown {property:?} on {id:?}"))
            .value
    }

    /// Returns the live float value of a property, if it is a `Float`.
    #[must_use]
    pub fn float(&self, id: ObjectId, property: PropertyId) -> Option<f32> {
        self.value(id, property).as_float()
    }

    /// Returns the object's name.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn name(&self, id: ObjectId) -> &str {
        self.validate(id);
        &self.slots[id.idx as usize].name
    }

    /// Returns the registered property name.
    ///
    /// # Panics
    ///
    /// Panics if the object handle is stale or the property id is unknown.
    #[must_use]
    pub fn property_name(&self, id: ObjectId, property: PropertyId) -> &str {
        self.validate(id);
        let slot = &self.slots[id.idx as usize];
        &slot
            .props
            .get(property.0 as usize)
            .unwrap_or_else(|| panic!("unknown {property:?} on {id:?}"))
            .name
    }

    /// Returns the number of registered properties on an object.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn property_count(&self, id: ObjectId) -> usize {
        self.validate(id);
        self.slots[id.idx as usize].props.len()
    }

    /// Writes an authoritative value from the render thread.
    ///
    /// Bypasses the queue (the render thread owns the live slot), then
    /// notifies the caller thread with
    /// [`CallerEvent::PropertySynced`]. Used to push values the renderer
    /// computed itself, e.g. measured text extents. The property's
    /// connected flag is not consulted: publishing is the render thread's
    /// side of the contract, not a caller write.
    ///
    /// # Panics
    ///
    /// Panics if the object handle is stale or the property id is unknown.
    pub fn publish(&mut self, id: ObjectId, property: PropertyId, value: PropertyValue) {
        self.validate(id);
        let slot = &mut self.slots[id.idx as usize];
        let prop = slot
            .props
            .get_mut(property.0 as usize)
            .unwrap_or_else(|| panic!("unknown {property:?} on {id:?}"));
        prop.value = value.clone();
        self.events.push(CallerEvent::PropertySynced {
            object: id,
            property,
            value,
        });
    }

    // -- Drain support --

    /// Applies one drained update. Non-panicking: stale targets and
    /// disconnected or unknown properties are tolerated by design.
    pub(crate) fn apply_update(&mut self, update: PendingUpdate) -> ApplyOutcome {
        if !self.is_alive(update.object) {
            return ApplyOutcome::StaleObject;
        }
        let slot = &mut self.slots[update.object.idx as usize];
        let Some(prop) = slot.props.get_mut(update.property.0 as usize) else {
            return ApplyOutcome::Ignored;
        };
        if !prop.connected.load(Ordering::Acquire) {
            return ApplyOutcome::Ignored;
        }
        prop.value = match prop.apply_hook.as_mut() {
            Some(hook) => hook(update.value),
            None => update.value,
        };
        ApplyOutcome::Applied
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    fn validate(&self, id: ObjectId) {
        assert!(
            self.is_alive(id),
            "stale ObjectId: {id:?} (current gen: {})",
            if (id.idx as usize) < self.generation.len() {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }
}

impl fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStore")
            .field("slots", &self.slots.len())
            .field("free", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ObjectStore {
        ObjectStore::new(Arc::new(UpdateQueue::new()), EventChannel::new())
    }

    #[test]
    fn create_and_destroy() {
        let mut store = store();
        let id = store.create_object("rect");
        assert!(store.is_alive(id));
        assert_eq!(store.name(id), "rect");
        store.destroy_object(id);
        assert!(!store.is_alive(id));
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut store = store();
        let id1 = store.create_object("a");
        store.destroy_object(id1);
        let id2 = store.create_object("b");
        // id2 reuses the slot but carries a different generation.
        assert_eq!(id1.index(), id2.index());
        assert_ne!(id1.generation(), id2.generation());
        assert!(!store.is_alive(id1));
        assert!(store.is_alive(id2));
    }

    #[test]
    fn property_ids_are_monotonic_per_object() {
        let mut store = store();
        let id = store.create_object("text");
        let a = store.register_property(id, "x", PropertyValue::Float(0.0));
        let b = store.register_property(id, "y", PropertyValue::Float(0.0));
        assert_eq!(a.property().index(), 0);
        assert_eq!(b.property().index(), 1);
        assert_eq!(store.property_count(id), 2);
        assert_eq!(store.property_name(id, a.property()), "x");
    }

    #[test]
    fn reused_slot_starts_fresh_property_table() {
        let mut store = store();
        let id1 = store.create_object("a");
        let _ = store.register_property(id1, "x", PropertyValue::Float(0.0));
        store.destroy_object(id1);

        let id2 = store.create_object("b");
        assert_eq!(
            store.property_count(id2),
            0,
            "recycled slot must not inherit properties"
        );
    }

    #[test]
    fn publish_writes_live_value_and_notifies_caller() {
        let events = EventChannel::new();
        let mut store = ObjectStore::new(Arc::new(UpdateQueue::new()), events.clone());
        let id = store.create_object("text");
        let w = store.register_property(id, "textWidth", PropertyValue::Float(0.0));

        store.publish(id, w.property(), PropertyValue::Float(128.5));

        assert_eq!(store.float(id, w.property()), Some(128.5));
        let drained = events.drain();
        assert_eq!(drained.len(), 1);
        match &drained[0] {
            CallerEvent::PropertySynced {
                object,
                property,
                value,
            } => {
                assert_eq!(*object, id);
                assert_eq!(*property, w.property());
                assert_eq!(*value, PropertyValue::Float(128.5));
            }
            other => panic!("expected PropertySynced, got {other:?}"),
        }
    }

    #[test]
    fn apply_update_to_released_object_is_stale() {
        let mut store = store();
        let id = store.create_object("a");
        let b = store.register_property(id, "x", PropertyValue::Float(0.0));
        store.destroy_object(id);

        let outcome = store.apply_update(PendingUpdate {
            object: id,
            property: b.property(),
            value: PropertyValue::Float(5.0),
            sequence: 0,
        });
        assert_eq!(outcome, ApplyOutcome::StaleObject);
    }

    #[test]
    fn apply_update_runs_hook_synchronously() {
        let mut store = store();
        let id = store.create_object("slider");
        let b = store.register_property_with_hook(
            id,
            "value",
            PropertyValue::Float(0.0),
            Box::new(|incoming| match incoming {
                PropertyValue::Float(v) => PropertyValue::Float(v.clamp(0.0, 1.0)),
                other => other,
            }),
        );

        let outcome = store.apply_update(PendingUpdate {
            object: id,
            property: b.property(),
            value: PropertyValue::Float(7.5),
            sequence: 0,
        });
        assert_eq!(outcome, ApplyOutcome::Applied);
        assert_eq!(store.float(id, b.property()), Some(1.0), "hook clamps");
    }

    #[test]
    fn apply_update_to_disconnected_property_is_ignored() {
        let mut store = store();
        let id = store.create_object("a");
        let b = store.register_property(id, "x", PropertyValue::Float(1.0));
        b.disconnect();

        let outcome = store.apply_update(PendingUpdate {
            object: id,
            property: b.property(),
            value: PropertyValue::Float(2.0),
            sequence: 0,
        });
        assert_eq!(outcome, ApplyOutcome::Ignored);
        assert_eq!(store.float(id, b.property()), Some(1.0), "value untouched");
    }

    #[test]
    #[should_panic(expected = "stale ObjectId")]
    fn stale_handle_panics_on_value() {
        let mut store = store();
        let id = store.create_object("a");
        let b = store.register_property(id, "x", PropertyValue::Float(0.0));
        store.destroy_object(id);
        let _ = store.value(id, b.property());
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut store = store();
        let id = store.create_object("a");
        let b = store.register_property(id, "x", PropertyValue::Float(0.0));
        assert!(b.is_connected());
        b.disconnect();
        b.disconnect();
        assert!(!b.is_connected());
        b.connect();
        assert!(b.is_connected());
    }
}
