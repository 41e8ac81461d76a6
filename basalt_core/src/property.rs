// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property values, slots, and caller-side bindings.
//!
//! A property is a typed value slot owned by exactly one object in the
//! [`ObjectStore`](crate::object::ObjectStore). The live value is read and
//! written only by the render thread; the caller thread interacts with it
//! exclusively through a [`PropertyBinding`], which enqueues deltas on the
//! [`UpdateQueue`](crate::queue::UpdateQueue).
//!
//! The `connected` flag decides whether a binding's writes are queued at
//! all. Disconnecting is how programmatic feedback loops are muted: when
//! the render thread pushes an authoritative value back to the caller side
//! (e.g. measured text width), answering writes must not re-trigger an
//! update cycle. The flag is a shared atomic so connect/disconnect is
//! idempotent and safe from either thread during teardown.

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::object::ObjectId;
use crate::queue::UpdateQueue;

/// A typed property value.
///
/// The variants replace the original per-subclass property types with a
/// tagged enum: `Float` and `Int` for numeric scene attributes, `Bool` for
/// flags, and `Text` as the generic arm (names, font descriptors, sources).
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    /// 32-bit float (positions, opacities, rotations).
    Float(f32),
    /// 32-bit signed integer (indices, counts).
    Int(i32),
    /// Boolean flag (visibility, fullscreen).
    Bool(bool),
    /// Generic string payload.
    Text(String),
}

impl PropertyValue {
    /// Returns the float payload, if this is a `Float`.
    #[must_use]
    pub const fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is an `Int`.
    #[must_use]
    pub const fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text payload, if this is a `Text`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Identifies a property within its owning object.
///
/// Ids are allocated monotonically at registration time and are never
/// reused for the lifetime of the object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(pub(crate) u16);

impl PropertyId {
    /// Returns the raw id (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyId({})", self.0)
    }
}

/// Hook run synchronously at drain time before an incoming value is stored.
///
/// Used for properties with custom apply semantics (clamping, dependent
/// re-layout). Hooks run on the render thread, inside the drain, never
/// asynchronously.
pub type ApplyHook = Box<dyn FnMut(PropertyValue) -> PropertyValue + Send>;

/// Render-thread-owned storage for one property.
pub(crate) struct PropertySlot {
    pub(crate) name: String,
    pub(crate) value: PropertyValue,
    pub(crate) connected: Arc<AtomicBool>,
    pub(crate) apply_hook: Option<ApplyHook>,
}

impl fmt::Debug for PropertySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySlot")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .field("has_hook", &self.apply_hook.is_some())
            .finish()
    }
}

/// Caller-side handle to one registered property.
///
/// Bindings are `Send` and cheap to clone (two ids plus two `Arc` bumps),
/// so they can be handed to the caller thread while the
/// [`ObjectStore`](crate::object::ObjectStore) stays on the render thread.
/// All methods are non-blocking apart from the O(1) queue lock in
/// [`set`](Self::set).
#[derive(Clone)]
pub struct PropertyBinding {
    object: ObjectId,
    property: PropertyId,
    connected: Arc<AtomicBool>,
    queue: Arc<UpdateQueue>,
}

impl PropertyBinding {
    pub(crate) fn new(
        object: ObjectId,
        property: PropertyId,
        connected: Arc<AtomicBool>,
        queue: Arc<UpdateQueue>,
    ) -> Self {
        Self {
            object,
            property,
            connected,
            queue,
        }
    }

    /// Returns the owning object's handle.
    #[must_use]
    pub const fn object(&self) -> ObjectId {
        self.object
    }

    /// Returns the property id within the owning object.
    #[must_use]
    pub const fn property(&self) -> PropertyId {
        self.property
    }

    /// Enqueues a new value for this property.
    ///
    /// Never mutates live scene state and never blocks beyond the queue's
    /// O(1) append lock. Returns `false` if the write was dropped because
    /// the binding is disconnected.
    pub fn set(&self, value: PropertyValue) -> bool {
        if !self.connected.load(Ordering::Acquire) {
            return false;
        }
        self.queue.enqueue(self.object, self.property, value);
        true
    }

    /// Convenience for [`set`](Self::set) with a `Float` value.
    pub fn set_float(&self, value: f32) -> bool {
        self.set(PropertyValue::Float(value))
    }

    /// Subscribes this property to update delivery. Idempotent.
    pub fn connect(&self) {
        self.connected.store(true, Ordering::Release);
    }

    /// Unsubscribes this property from update delivery. Idempotent and safe
    /// to call from either thread during teardown; in-flight updates racing
    /// a disconnect are dropped at drain time.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }

    /// Returns whether writes through this binding are currently queued.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl fmt::Debug for PropertyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBinding")
            .field("object", &self.object)
            .field("property", &self.property)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_accessors_match_variants() {
        assert_eq!(PropertyValue::Float(1.5).as_float(), Some(1.5));
        assert_eq!(PropertyValue::Int(7).as_int(), Some(7));
        assert_eq!(PropertyValue::Bool(true).as_bool(), Some(true));
        assert_eq!(PropertyValue::Text("abc".into()).as_text(), Some("abc"));
        assert_eq!(PropertyValue::Float(1.0).as_int(), None);
    }
}
