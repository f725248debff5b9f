//! Allocator trait definition

use std::{fmt, ptr::NonNull, sync::Arc};

use super::{
    block::RawBlock,
    stats::{AllocatorInfo, AllocatorStats},
};
use crate::error::Result;

/// Source of raw memory blocks for copy-on-write vectors.
///
/// Every block handed out keeps its allocator alive through an `Arc`, and
/// returns itself through [`BlockAllocator::release`] when dropped.
pub trait BlockAllocator: Send + Sync + fmt::Debug {
    /// Allocator name; appears in diagnostics and need not be unique
    fn name(&self) -> &str;

    /// Provide a block large enough for `count` elements of `element_size` bytes.
    ///
    /// Fixed-size pools always return a full block, which may be larger than
    /// requested. When `zero` is set the whole block is zero-filled.
    fn alloc(self: Arc<Self>, element_size: usize, count: usize, zero: bool) -> Result<RawBlock>;

    /// Take back a block previously returned by [`BlockAllocator::alloc`]
    fn release(&self, ptr: NonNull<u8>, size: usize);

    /// Snapshot of the pool state
    fn info(&self) -> AllocatorInfo;

    /// Lifetime counters
    fn stats(&self) -> AllocatorStats;

    /// Whether every block from this allocator has the same size
    fn is_fixed_size(&self) -> bool {
        self.info().fixed_size
    }
}

/// Compare two allocator handles by identity
pub fn same_allocator(a: &Arc<dyn BlockAllocator>, b: &Arc<dyn BlockAllocator>) -> bool {
    Arc::as_ptr(a) as *const u8 == Arc::as_ptr(b) as *const u8
}
