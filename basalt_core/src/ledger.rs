// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! GPU resource bookkeeping with deferred destruction.
//!
//! Every GPU-side allocation (texture atlas, glyph cache entry, video-frame
//! texture) is recorded here with explicit create/destroy pairing. Release
//! is a two-phase protocol: [`mark_for_destroy`] transitions a resource to
//! *pending* without freeing, and [`reclaim`] — called exactly once per
//! frame, after `swap()` confirms the prior frame retired — frees
//! everything pending. Retirement guarantees no outstanding GPU command
//! references the resource, which is the system's core safety invariant.
//!
//! Growth follows the same rule: [`grow`] allocates a new backing resource
//! and marks the old one; nothing referenced by an in-flight frame is ever
//! mutated or freed in place.
//!
//! [`mark_for_destroy`]: ResourceLedger::mark_for_destroy
//! [`reclaim`]: ResourceLedger::reclaim
//! [`grow`]: ResourceLedger::grow

use core::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::ResourceError;

/// What a GPU resource backs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A font's rasterized glyph atlas texture.
    TextureAtlas,
    /// A single cached glyph entry.
    GlyphCache,
    /// A decoded video frame texture.
    VideoFrame,
}

/// Size and layout of a requested resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceDescriptor {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Bytes per texel.
    pub bytes_per_pixel: u32,
}

impl ResourceDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub const fn new(width: u32, height: u32, bytes_per_pixel: u32) -> Self {
        Self {
            width,
            height,
            bytes_per_pixel,
        }
    }

    /// Total backing size in bytes.
    #[must_use]
    pub const fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.bytes_per_pixel as u64
    }
}

/// Opaque id of the native GPU object, assigned by the allocator.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeId(pub u64);

impl fmt::Debug for NativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeId({})", self.0)
    }
}

/// Allocates and frees native GPU objects on behalf of the ledger.
///
/// Real back-ends wrap their texture/image allocators; tests use a
/// recording double to assert free ordering against frame retirement.
pub trait GpuAllocator {
    /// Creates a native resource. Failure is a recoverable
    /// [`ResourceError`] reported to the resource's logical owner.
    fn allocate(
        &mut self,
        kind: ResourceKind,
        desc: &ResourceDescriptor,
    ) -> Result<NativeId, ResourceError>;

    /// Frees a native resource. Only ever called from
    /// [`ResourceLedger::reclaim`], i.e. after retirement.
    fn free(&mut self, id: NativeId);
}

/// A handle to a ledger entry.
///
/// Generational: freed slots are reused, and stale handles are ignored by
/// [`ResourceLedger::mark_for_destroy`] (a double release is transient, not
/// an error).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    idx: u32,
    generation: u32,
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceHandle({}@gen{})", self.idx, self.generation)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    Free,
    Live,
    PendingDestroy,
}

#[derive(Debug)]
struct Slot {
    state: SlotState,
    kind: ResourceKind,
    desc: ResourceDescriptor,
    native: NativeId,
}

/// Marks resources for destruction from any thread.
///
/// Cloneable `Send` handle over the ledger's shared mark list — the same
/// short-lock mailbox pattern as the update queue. Marks are folded into
/// ledger state at the start of the next [`ResourceLedger::reclaim`].
#[derive(Clone, Debug)]
pub struct ResourceDestroyer {
    marks: Arc<Mutex<Vec<ResourceHandle>>>,
}

impl ResourceDestroyer {
    /// Marks a resource for deferred destruction. Never frees
    /// synchronously; stale handles are tolerated.
    pub fn mark_for_destroy(&self, handle: ResourceHandle) {
        self.marks.lock().push(handle);
    }
}

/// Tracks every GPU-side allocation and sequences destruction after
/// retirement.
///
/// Owned by the render thread; cross-thread marking goes through
/// [`ResourceDestroyer`].
pub struct ResourceLedger<A: GpuAllocator> {
    allocator: A,
    slots: Vec<Slot>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
    marks: Arc<Mutex<Vec<ResourceHandle>>>,
}

impl<A: GpuAllocator> ResourceLedger<A> {
    /// Creates an empty ledger over the given allocator.
    #[must_use]
    pub fn new(allocator: A) -> Self {
        Self {
            allocator,
            slots: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            marks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Allocates a resource and records it as live.
    pub fn allocate(
        &mut self,
        kind: ResourceKind,
        desc: ResourceDescriptor,
    ) -> Result<ResourceHandle, ResourceError> {
        let native = self.allocator.allocate(kind, &desc)?;
        let slot = Slot {
            state: SlotState::Live,
            kind,
            desc,
            native,
        };
        let idx = if let Some(idx) = self.free_list.pop() {
            self.generation[idx as usize] += 1;
            self.slots[idx as usize] = slot;
            idx
        } else {
            let idx = u32::try_from(self.slots.len()).expect("resource slot count exceeds u32");
            self.slots.push(slot);
            self.generation.push(0);
            idx
        };
        Ok(ResourceHandle {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    /// Returns a cloneable cross-thread destroyer for this ledger.
    #[must_use]
    pub fn destroyer(&self) -> ResourceDestroyer {
        ResourceDestroyer {
            marks: Arc::clone(&self.marks),
        }
    }

    /// Marks a resource for deferred destruction (render-thread shortcut
    /// for [`ResourceDestroyer::mark_for_destroy`]). Stale handles and
    /// repeated marks are ignored.
    pub fn mark_for_destroy(&mut self, handle: ResourceHandle) {
        if self.is_live(handle) {
            self.slots[handle.idx as usize].state = SlotState::PendingDestroy;
        }
    }

    /// Grows a resource: allocates a new backing resource with the given
    /// descriptor and marks the old one for destruction.
    ///
    /// The old resource stays valid until reclaimed, so glyphs already
    /// referenced by an in-flight frame keep sampling the old atlas.
    pub fn grow(
        &mut self,
        handle: ResourceHandle,
        desc: ResourceDescriptor,
    ) -> Result<ResourceHandle, ResourceError> {
        if !self.is_live(handle) {
            return Err(ResourceError::StaleHandle);
        }
        let kind = self.slots[handle.idx as usize].kind;
        // Allocate first: if it fails the old resource stays live.
        let grown = self.allocate(kind, desc)?;
        self.mark_for_destroy(handle);
        debug!(?handle, ?grown, ?kind, "resource grown");
        Ok(grown)
    }

    /// Frees every pending resource.
    ///
    /// Called exactly once per frame, strictly after `swap()` confirmed the
    /// prior frame retired; at that point no in-flight draw call can
    /// reference a pending resource. Returns the number freed.
    pub fn reclaim(&mut self) -> usize {
        // Fold in cross-thread marks first.
        let marks = std::mem::take(&mut *self.marks.lock());
        for handle in marks {
            self.mark_for_destroy(handle);
        }

        let mut freed = 0;
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.state == SlotState::PendingDestroy {
                self.allocator.free(slot.native);
                slot.state = SlotState::Free;
                self.generation[idx] += 1;
                self.free_list
                    .push(u32::try_from(idx).expect("slot index fits u32"));
                freed += 1;
            }
        }
        if freed > 0 {
            debug!(freed, "reclaimed retired resources");
        }
        freed
    }

    /// Marks every live resource for destruction (shutdown path).
    pub fn release_all(&mut self) {
        let mut marked = 0;
        for slot in &mut self.slots {
            if slot.state == SlotState::Live {
                slot.state = SlotState::PendingDestroy;
                marked += 1;
            }
        }
        if marked > 0 {
            warn!(marked, "resources still live at shutdown; releasing");
        }
    }

    /// Returns whether the handle refers to a live (non-pending) resource.
    #[must_use]
    pub fn is_live(&self, handle: ResourceHandle) -> bool {
        (handle.idx as usize) < self.slots.len()
            && self.generation[handle.idx as usize] == handle.generation
            && self.slots[handle.idx as usize].state == SlotState::Live
    }

    /// Returns the native id backing a live or pending resource.
    #[must_use]
    pub fn native_id(&self, handle: ResourceHandle) -> Option<NativeId> {
        let slot = self.slots.get(handle.idx as usize)?;
        if self.generation[handle.idx as usize] == handle.generation
            && slot.state != SlotState::Free
        {
            Some(slot.native)
        } else {
            None
        }
    }

    /// Returns the descriptor of a live or pending resource.
    #[must_use]
    pub fn descriptor(&self, handle: ResourceHandle) -> Option<ResourceDescriptor> {
        let slot = self.slots.get(handle.idx as usize)?;
        if self.generation[handle.idx as usize] == handle.generation
            && slot.state != SlotState::Free
        {
            Some(slot.desc)
        } else {
            None
        }
    }

    /// Number of live resources.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == SlotState::Live)
            .count()
    }

    /// Number of resources awaiting reclamation (excluding cross-thread
    /// marks not yet folded in).
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == SlotState::PendingDestroy)
            .count()
    }

    /// Returns the underlying allocator (tests inspect recorded frees).
    #[must_use]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }
}

impl<A: GpuAllocator> fmt::Debug for ResourceLedger<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLedger")
            .field("live", &self.live_count())
            .field("pending", &self.pending_count())
            .field("slots", &self.slots.len())
            .finish_non_exhaustive()
    }
}
