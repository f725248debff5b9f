//! Typed allocator handle for vectors

use std::{fmt, marker::PhantomData, mem, sync::Arc};

use super::mutable::SharedVector;
use crate::{
    allocators::{same_allocator, AllocatorInfo, BlockAllocator, DefaultAllocator, PoolBuilder},
    error::Result,
};

/// Allocator producing [`SharedVector`]s of `T`
pub struct VectorAllocator<T> {
    raw: Arc<dyn BlockAllocator>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> VectorAllocator<T> {
    /// Handle on the shared default allocator
    pub fn shared() -> Self {
        Self::from_raw(DefaultAllocator::shared_dyn())
    }

    /// Wrap an untyped allocator
    pub fn from_raw(raw: Arc<dyn BlockAllocator>) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// The untyped allocator
    pub fn raw(&self) -> &Arc<dyn BlockAllocator> {
        &self.raw
    }

    pub fn name(&self) -> &str {
        self.raw.name()
    }

    pub fn info(&self) -> AllocatorInfo {
        self.raw.info()
    }

    /// Empty vector growing from this allocator
    pub fn empty(&self) -> SharedVector<T> {
        SharedVector::new_in(Arc::clone(&self.raw))
    }
}

impl<T: Default> VectorAllocator<T> {
    /// Vector of `len` default-valued elements
    pub fn allocate(&self, len: usize) -> Result<SharedVector<T>> {
        SharedVector::with_len_in(Arc::clone(&self.raw), len, false)
    }

    /// Like [`VectorAllocator::allocate`] over zero-filled memory
    pub fn allocate_zeroed(&self, len: usize) -> Result<SharedVector<T>> {
        SharedVector::with_len_in(Arc::clone(&self.raw), len, true)
    }
}

impl<T> Clone for VectorAllocator<T> {
    fn clone(&self) -> Self {
        Self::from_raw(Arc::clone(&self.raw))
    }
}

impl<T> Default for VectorAllocator<T> {
    fn default() -> Self {
        Self::shared()
    }
}

impl<T> PartialEq for VectorAllocator<T> {
    fn eq(&self, other: &Self) -> bool {
        same_allocator(&self.raw, &other.raw)
    }
}

impl<T> Eq for VectorAllocator<T> {}

impl<T> fmt::Debug for VectorAllocator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorAllocator")
            .field("name", &self.raw.name())
            .field("element_size", &mem::size_of::<T>())
            .finish()
    }
}

impl PoolBuilder {
    /// Build an allocator for vectors of `T`
    pub fn build<T>(self) -> Result<VectorAllocator<T>> {
        let raw = self.build_raw(mem::size_of::<T>())?;
        Ok(VectorAllocator::from_raw(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocators::AllocatorRegistry;

    #[test]
    fn test_default_builder_is_shared() {
        let a = PoolBuilder::new().build::<u32>().unwrap();
        assert_eq!(a, VectorAllocator::<u32>::shared());
        assert_eq!(a.name(), "Default Allocator");
    }

    #[test]
    fn test_allocate_zeroed() {
        let alloc = PoolBuilder::new()
            .name("zeroed")
            .fixed(32)
            .registry(Arc::new(AllocatorRegistry::new()))
            .build::<i64>()
            .unwrap();
        let vector = alloc.allocate_zeroed(32).unwrap();
        assert_eq!(vector.len(), 32);
        assert!(vector.iter().all(|&v| v == 0));
        assert_eq!(alloc.info().num_allocs, 1);
        assert_eq!(alloc.info().alloc_size, 32 * 8);
    }

    #[test]
    fn test_distinct_pools_differ() {
        let registry = Arc::new(AllocatorRegistry::new());
        let a = PoolBuilder::new()
            .fixed(4)
            .registry(Arc::clone(&registry))
            .build::<u8>()
            .unwrap();
        let b = PoolBuilder::new()
            .fixed(4)
            .registry(registry)
            .build::<u8>()
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
