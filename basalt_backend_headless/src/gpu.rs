// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The simulated GPU allocator.

use basalt_core::error::ResourceError;
use basalt_core::ledger::{GpuAllocator, NativeId, ResourceDescriptor, ResourceKind};
use tracing::debug;

use crate::timeline::{Timeline, TimelineEvent};

/// An allocator that hands out sequential native ids and records every
/// allocation and free on the shared [`Timeline`].
///
/// An optional budget makes allocations fail once the simulated memory is
/// exhausted, for exercising the recoverable-failure path.
#[derive(Debug)]
pub struct HeadlessGpu {
    timeline: Timeline,
    next_id: u64,
    budget_bytes: Option<u64>,
    used_bytes: u64,
    live: Vec<(NativeId, u64)>,
}

impl HeadlessGpu {
    /// Creates an unbudgeted allocator recording onto `timeline`.
    #[must_use]
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            next_id: 0,
            budget_bytes: None,
            used_bytes: 0,
            live: Vec::new(),
        }
    }

    /// Limits total live bytes; further allocations fail recoverably.
    #[must_use]
    pub fn with_budget(mut self, budget_bytes: u64) -> Self {
        self.budget_bytes = Some(budget_bytes);
        self
    }

    /// Bytes currently allocated.
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    /// Number of live native resources.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl GpuAllocator for HeadlessGpu {
    fn allocate(
        &mut self,
        kind: ResourceKind,
        desc: &ResourceDescriptor,
    ) -> Result<NativeId, ResourceError> {
        let bytes = desc.byte_size();
        if let Some(budget) = self.budget_bytes {
            if self.used_bytes + bytes > budget {
                return Err(ResourceError::AllocationFailed {
                    kind,
                    reason: format!(
                        "budget exhausted: {} of {budget} bytes in use",
                        self.used_bytes
                    ),
                });
            }
        }
        let id = NativeId(self.next_id);
        self.next_id += 1;
        self.used_bytes += bytes;
        self.live.push((id, bytes));
        self.timeline.record(TimelineEvent::Allocated(id));
        debug!(?id, ?kind, bytes, "allocated");
        Ok(id)
    }

    fn free(&mut self, id: NativeId) {
        if let Some(pos) = self.live.iter().position(|(live, _)| *live == id) {
            let (_, bytes) = self.live.swap_remove(pos);
            self.used_bytes -= bytes;
        }
        self.timeline.record(TimelineEvent::Freed(id));
        debug!(?id, "freed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESC: ResourceDescriptor = ResourceDescriptor::new(100, 100, 4);

    #[test]
    fn budget_makes_allocation_fail_recoverably() {
        let mut gpu = HeadlessGpu::new(Timeline::new()).with_budget(50_000);
        let first = gpu
            .allocate(ResourceKind::TextureAtlas, &DESC)
            .expect("within budget");

        assert!(matches!(
            gpu.allocate(ResourceKind::TextureAtlas, &DESC),
            Err(ResourceError::AllocationFailed { .. })
        ));

        gpu.free(first);
        assert_eq!(gpu.used_bytes(), 0);
        gpu.allocate(ResourceKind::TextureAtlas, &DESC)
            .expect("budget recovered after free");
    }

    #[test]
    fn timeline_records_alloc_and_free_in_order() {
        let timeline = Timeline::new();
        let mut gpu = HeadlessGpu::new(timeline.clone());
        let id = gpu
            .allocate(ResourceKind::VideoFrame, &DESC)
            .expect("allocation succeeds");
        gpu.free(id);

        assert_eq!(
            timeline.events(),
            vec![TimelineEvent::Allocated(id), TimelineEvent::Freed(id)]
        );
    }
}
