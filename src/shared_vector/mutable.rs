//! Exclusively owned, writable vector

use std::{
    alloc::{handle_alloc_error, Layout},
    fmt,
    mem,
    ops::{Deref, DerefMut},
    sync::Arc,
};

use log::trace;

use super::{frozen::FrozenVector, storage::Storage};
use crate::{
    allocators::{BlockAllocator, DefaultAllocator},
    error::Result,
};

/// Writable view over a block that no one else references.
///
/// Growth past the capacity takes a new block from the vector's allocator and
/// moves the visible elements over. Shrinking only narrows the view.
pub struct SharedVector<T> {
    storage: Option<Storage<T>>,
    offset: usize,
    len: usize,
    allocator: Arc<dyn BlockAllocator>,
}

impl<T> SharedVector<T> {
    /// Empty vector growing from the shared default allocator
    pub fn new() -> Self {
        Self::new_in(DefaultAllocator::shared_dyn())
    }

    /// Empty vector growing from `allocator`
    pub fn new_in(allocator: Arc<dyn BlockAllocator>) -> Self {
        Self {
            storage: None,
            offset: 0,
            len: 0,
            allocator,
        }
    }

    pub(crate) fn from_parts(storage: Storage<T>, offset: usize, len: usize) -> Self {
        let allocator = Arc::clone(storage.allocator());
        Self {
            storage: Some(storage),
            offset,
            len,
            allocator,
        }
    }

    /// Collect `items` into a vector from the shared default allocator
    pub fn from_vec(items: Vec<T>) -> Result<Self> {
        Self::from_vec_in(items, DefaultAllocator::shared_dyn())
    }

    /// Collect `items` into a vector from `allocator`
    pub fn from_vec_in(items: Vec<T>, allocator: Arc<dyn BlockAllocator>) -> Result<Self> {
        if items.is_empty() {
            return Ok(Self::new_in(allocator));
        }
        let len = items.len();
        let mut storage = Storage::allocate(&allocator, len, false)?;
        storage.extend(items);
        Ok(Self::from_parts(storage, 0, len))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Elements that fit without reallocating
    pub fn capacity(&self) -> usize {
        self.storage
            .as_ref()
            .map_or(0, |storage| storage.capacity() - self.offset)
    }

    /// Allocator used when the vector grows
    pub fn allocator(&self) -> &Arc<dyn BlockAllocator> {
        &self.allocator
    }

    /// Always true: a writable vector has a single owner
    pub fn unique(&self) -> bool {
        true
    }

    pub fn as_slice(&self) -> &[T] {
        match &self.storage {
            Some(storage) => storage.slice(self.offset, self.len),
            None => &[],
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match &mut self.storage {
            Some(storage) => storage.slice_mut(self.offset, self.len),
            None => &mut [],
        }
    }

    /// Address of the first visible element, for identity checks
    pub fn as_ptr(&self) -> *const T {
        match &self.storage {
            Some(storage) => unsafe { storage.as_ptr().add(self.offset) },
            None => std::ptr::null(),
        }
    }

    /// Narrow the view to `count` elements starting at `offset`.
    ///
    /// Requests past the end are clamped to what is available.
    pub fn slice(&mut self, offset: usize, count: usize) {
        let offset = offset.min(self.len);
        let count = count.min(self.len - offset);
        self.offset += offset;
        self.len = count;
    }

    /// Exchange contents with `other`
    pub fn swap(&mut self, other: &mut SharedVector<T>) {
        mem::swap(self, other);
    }

    /// Make the contents shareable without copying
    pub fn freeze(self) -> FrozenVector<T> {
        FrozenVector::from_parts(self.storage.map(Arc::new), self.offset, self.len)
    }

    /// Ensure room for `capacity` elements without changing the length
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        if capacity <= self.capacity() {
            return Ok(());
        }

        let mut next = Storage::allocate(&self.allocator, capacity, false)?;
        trace!(
            "vector grows from {} to {} elements in '{}'",
            self.capacity(),
            next.capacity(),
            self.allocator.name()
        );
        if let Some(storage) = self.storage.take() {
            storage.move_into(self.offset, self.len, &mut next);
        }
        self.storage = Some(next);
        self.offset = 0;
        Ok(())
    }
}

impl<T: Default> SharedVector<T> {
    /// `len` default-valued elements from `allocator`
    pub fn with_len_in(allocator: Arc<dyn BlockAllocator>, len: usize, zero: bool) -> Result<Self> {
        if len == 0 {
            return Ok(Self::new_in(allocator));
        }
        let mut storage = Storage::allocate(&allocator, len, zero)?;
        storage.fill_default(0, len);
        Ok(Self::from_parts(storage, 0, len))
    }

    /// Change the length; new elements are default-valued.
    ///
    /// On allocation failure the vector is unchanged.
    pub fn resize(&mut self, len: usize) -> Result<()> {
        if len <= self.len {
            self.len = len;
            return Ok(());
        }

        self.reserve(len)?;
        if let Some(storage) = self.storage.as_mut() {
            storage.fill_default(self.offset + self.len, self.offset + len);
        }
        self.len = len;
        Ok(())
    }
}

impl<T> Default for SharedVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for SharedVector<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for SharedVector<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T> From<Vec<T>> for SharedVector<T> {
    fn from(items: Vec<T>) -> Self {
        let len = items.len();
        match Self::from_vec(items) {
            Ok(vector) => vector,
            Err(_) => handle_alloc_error(
                Layout::array::<T>(len).unwrap_or_else(|_| Layout::new::<T>()),
            ),
        }
    }
}

impl<T: PartialEq> PartialEq for SharedVector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedVector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
