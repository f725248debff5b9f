//! The shared dynamic allocator

use std::{ptr::NonNull, sync::Arc};

use super::{
    block::{system_alloc, system_free, RawBlock},
    registry::{AllocatorRegistry, RegistrationId},
    stats::{AllocatorInfo, AllocatorStats, AtomicAllocatorStats},
    traits::BlockAllocator,
};
use crate::error::{PvError, Result};

/// Name reported by the shared dynamic allocator
pub const DEFAULT_ALLOCATOR_NAME: &str = "Default Allocator";

lazy_static::lazy_static! {
    static ref SHARED_DEFAULT: Arc<DefaultAllocator> =
        DefaultAllocator::new(Arc::clone(AllocatorRegistry::global()));
}

/// Unbounded allocator serving any size straight from the system.
///
/// It keeps no free list, so its report carries no statistics.
#[derive(Debug)]
pub struct DefaultAllocator {
    stats: AtomicAllocatorStats,
    registry: Arc<AllocatorRegistry>,
    registration: RegistrationId,
}

impl DefaultAllocator {
    /// The process-wide instance, created on first use
    pub fn shared() -> Arc<DefaultAllocator> {
        Arc::clone(&SHARED_DEFAULT)
    }

    /// The process-wide instance as a trait object
    pub fn shared_dyn() -> Arc<dyn BlockAllocator> {
        Self::shared()
    }

    fn new(registry: Arc<AllocatorRegistry>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &std::sync::Weak<Self>| {
            let registration = registry.register(weak.clone());
            Self {
                stats: AtomicAllocatorStats::new(),
                registry,
                registration,
            }
        })
    }
}

impl BlockAllocator for DefaultAllocator {
    fn name(&self) -> &str {
        DEFAULT_ALLOCATOR_NAME
    }

    fn alloc(self: Arc<Self>, element_size: usize, count: usize, zero: bool) -> Result<RawBlock> {
        let size = element_size.checked_mul(count).ok_or_else(|| {
            self.stats.record_failure();
            PvError::allocation_failed(DEFAULT_ALLOCATOR_NAME, usize::MAX, "size overflow")
        })?;

        let ptr = system_alloc(size, zero).ok_or_else(|| {
            self.stats.record_failure();
            PvError::allocation_failed(DEFAULT_ALLOCATOR_NAME, size, "system allocation failed")
        })?;

        self.stats.record_allocation();
        Ok(unsafe { RawBlock::from_raw(ptr, size, self) })
    }

    fn release(&self, ptr: NonNull<u8>, size: usize) {
        self.stats.record_release();
        system_free(ptr, size);
    }

    fn info(&self) -> AllocatorInfo {
        AllocatorInfo {
            name: DEFAULT_ALLOCATOR_NAME.to_string(),
            fixed_size: false,
            has_stats: false,
            ..Default::default()
        }
    }

    fn stats(&self) -> AllocatorStats {
        self.stats.snapshot()
    }
}

impl Drop for DefaultAllocator {
    fn drop(&mut self) {
        self.registry.deregister(self.registration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_is_singleton() {
        let a = DefaultAllocator::shared_dyn();
        let b = DefaultAllocator::shared_dyn();
        assert!(crate::allocators::same_allocator(&a, &b));
        assert!(!a.is_fixed_size());
    }

    #[test]
    fn test_any_size() {
        let allocator = DefaultAllocator::shared_dyn();
        let block = Arc::clone(&allocator).alloc(4, 1024, true).unwrap();
        assert_eq!(block.size(), 4096);
        let bytes = unsafe { std::slice::from_raw_parts(block.as_ptr(), block.size()) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_registered_globally() {
        let _allocator = DefaultAllocator::shared();
        let names: Vec<String> = AllocatorRegistry::global()
            .collect_info()
            .into_iter()
            .map(|info| info.name)
            .collect();
        assert!(names.iter().any(|name| name == DEFAULT_ALLOCATOR_NAME));
    }
}
