//! Immutable, shareable vector

use std::{fmt, ops::Deref, sync::Arc};

use super::{mutable::SharedVector, storage::Storage};
use crate::{
    allocators::{BlockAllocator, DefaultAllocator},
    error::Result,
};

/// Read-only view over a reference-counted block.
///
/// Cloning shares the block. The only way back to a writable vector is
/// [`FrozenVector::thaw`], which copies the visible elements unless this
/// handle is the block's sole owner.
pub struct FrozenVector<T> {
    storage: Option<Arc<Storage<T>>>,
    offset: usize,
    len: usize,
}

impl<T> FrozenVector<T> {
    /// Empty vector without a block
    pub fn new() -> Self {
        Self {
            storage: None,
            offset: 0,
            len: 0,
        }
    }

    pub(crate) fn from_parts(storage: Option<Arc<Storage<T>>>, offset: usize, len: usize) -> Self {
        Self {
            storage,
            offset,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Elements the block holds from the start of this view
    pub fn capacity(&self) -> usize {
        self.storage
            .as_ref()
            .map_or(0, |storage| storage.capacity() - self.offset)
    }

    pub fn as_slice(&self) -> &[T] {
        match &self.storage {
            Some(storage) => storage.slice(self.offset, self.len),
            None => &[],
        }
    }

    /// Address of the first visible element, for identity checks
    pub fn as_ptr(&self) -> *const T {
        match &self.storage {
            Some(storage) => unsafe { storage.as_ptr().add(self.offset) },
            None => std::ptr::null(),
        }
    }

    /// Allocator owning the block, if any
    pub fn allocator(&self) -> Option<&Arc<dyn BlockAllocator>> {
        self.storage.as_ref().map(|storage| storage.allocator())
    }

    /// Whether no other handle shares the block
    pub fn unique(&self) -> bool {
        self.storage
            .as_ref()
            .map_or(true, |storage| Arc::strong_count(storage) == 1)
    }

    /// Number of handles sharing the block; 0 without a block
    pub fn owner_count(&self) -> usize {
        self.storage.as_ref().map_or(0, Arc::strong_count)
    }

    /// Narrow the view to `count` elements starting at `offset`, clamped
    pub fn slice(&mut self, offset: usize, count: usize) {
        let offset = offset.min(self.len);
        let count = count.min(self.len - offset);
        self.offset += offset;
        self.len = count;
    }

    /// Exchange contents with `other`
    pub fn swap(&mut self, other: &mut FrozenVector<T>) {
        std::mem::swap(self, other);
    }
}

impl<T: Clone> FrozenVector<T> {
    /// Writable vector with the same contents.
    ///
    /// Reuses the block in place when this is its only handle, otherwise
    /// copies the visible elements into a new block from the same allocator.
    pub fn thaw(self) -> Result<SharedVector<T>> {
        self.thaw_in(&DefaultAllocator::shared_dyn())
    }

    /// Like [`FrozenVector::thaw`]; an empty vector without a block grows
    /// from `fallback`
    pub fn thaw_in(self, fallback: &Arc<dyn BlockAllocator>) -> Result<SharedVector<T>> {
        let FrozenVector {
            storage,
            offset,
            len,
        } = self;

        let Some(storage) = storage else {
            return Ok(SharedVector::new_in(Arc::clone(fallback)));
        };

        match Arc::try_unwrap(storage) {
            Ok(storage) => Ok(SharedVector::from_parts(storage, offset, len)),
            Err(shared) => {
                if len == 0 {
                    return Ok(SharedVector::new_in(Arc::clone(shared.allocator())));
                }
                let mut copy = Storage::allocate(shared.allocator(), len, false)?;
                copy.extend(shared.slice(offset, len).iter().cloned());
                Ok(SharedVector::from_parts(copy, 0, len))
            }
        }
    }
}

impl<T> Clone for FrozenVector<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            offset: self.offset,
            len: self.len,
        }
    }
}

impl<T> Default for FrozenVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for FrozenVector<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> From<Vec<T>> for FrozenVector<T> {
    fn from(items: Vec<T>) -> Self {
        SharedVector::from(items).freeze()
    }
}

impl<T> From<SharedVector<T>> for FrozenVector<T> {
    fn from(vector: SharedVector<T>) -> Self {
        vector.freeze()
    }
}

impl<T: PartialEq> PartialEq for FrozenVector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: fmt::Debug> fmt::Debug for FrozenVector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thaw_unique_reuses_block() {
        let frozen = FrozenVector::from(vec![1.5f64, 2.5, 3.5]);
        let before = frozen.as_ptr();
        assert!(frozen.unique());

        let thawed = frozen.thaw().unwrap();
        assert_eq!(thawed.as_ptr(), before);

        let refrozen = thawed.freeze();
        assert_eq!(refrozen.as_ptr(), before);
    }

    #[test]
    fn test_thaw_shared_copies() {
        let frozen = FrozenVector::from(vec![1i32, 2, 3]);
        let other = frozen.clone();
        assert_eq!(frozen.owner_count(), 2);
        assert!(!frozen.unique());

        let mut thawed = frozen.thaw().unwrap();
        assert_ne!(thawed.as_ptr(), other.as_ptr());
        thawed[0] = 42;

        assert_eq!(other.as_slice(), &[1, 2, 3]);
        assert_eq!(thawed.as_slice(), &[42, 2, 3]);
        assert_eq!(other.owner_count(), 1);
    }

    #[test]
    fn test_thaw_shared_slice_copies_view_only() {
        let frozen = FrozenVector::from(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        let mut narrowed = frozen.clone();
        narrowed.slice(1, 1);

        let thawed = narrowed.thaw().unwrap();
        assert_eq!(thawed.as_slice(), &["b".to_string()]);
        assert_eq!(thawed.capacity(), 1);
        assert_eq!(frozen.len(), 3);
    }

    #[test]
    fn test_empty() {
        let frozen = FrozenVector::<u8>::new();
        assert!(frozen.unique());
        assert_eq!(frozen.owner_count(), 0);
        assert_eq!(frozen.capacity(), 0);
        let thawed = frozen.thaw().unwrap();
        assert!(thawed.is_empty());
    }
}
