//! Typed element storage over a raw allocator block

use std::{
    marker::PhantomData,
    mem,
    ptr,
    slice,
    sync::Arc,
};

use crate::{
    allocators::{BlockAllocator, RawBlock, BLOCK_ALIGN},
    error::{PvError, Result},
};

/// A block holding up to `capacity` elements, of which the first `init` are
/// initialized.
///
/// Vectors view a sub-range of the initialized prefix; elements past the
/// view stay alive until the storage is dropped or overwritten.
pub(crate) struct Storage<T> {
    block: RawBlock,
    capacity: usize,
    init: usize,
    _marker: PhantomData<T>,
}

impl<T> Storage<T> {
    /// Take a block for at least `count` elements from `allocator`
    pub(crate) fn allocate(
        allocator: &Arc<dyn BlockAllocator>,
        count: usize,
        zero: bool,
    ) -> Result<Self> {
        if mem::align_of::<T>() > BLOCK_ALIGN {
            return Err(PvError::invalid_parameter(
                "element",
                format!("alignment {} exceeds block alignment", mem::align_of::<T>()),
            ));
        }

        let element_size = mem::size_of::<T>().max(1);
        let block = Arc::clone(allocator).alloc(element_size, count, zero)?;
        let capacity = block.size() / element_size;
        debug_assert!(capacity >= count);

        Ok(Self {
            block,
            capacity,
            init: 0,
            _marker: PhantomData,
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn allocator(&self) -> &Arc<dyn BlockAllocator> {
        self.block.owner()
    }

    pub(crate) fn as_ptr(&self) -> *const T {
        self.block.as_ptr() as *const T
    }

    fn as_mut_ptr(&mut self) -> *mut T {
        self.block.as_ptr() as *mut T
    }

    /// Initialized elements in `offset..offset + len`
    pub(crate) fn slice(&self, offset: usize, len: usize) -> &[T] {
        assert!(offset + len <= self.init);
        unsafe { slice::from_raw_parts(self.as_ptr().add(offset), len) }
    }

    pub(crate) fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [T] {
        assert!(offset + len <= self.init);
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr().add(offset), len) }
    }

    /// Append elements after the initialized prefix
    pub(crate) fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        for item in items {
            assert!(self.init < self.capacity);
            unsafe { ptr::write(self.as_mut_ptr().add(self.init), item) };
            self.init += 1;
        }
    }

    /// Move `offset..offset + len` to the end of `dest`, dropping everything else
    pub(crate) fn move_into(mut self, offset: usize, len: usize, dest: &mut Storage<T>) {
        assert!(offset + len <= self.init);
        assert!(dest.init + len <= dest.capacity);

        let init = mem::replace(&mut self.init, 0);
        unsafe {
            let base = self.as_mut_ptr();
            ptr::copy_nonoverlapping(base.add(offset), dest.as_mut_ptr().add(dest.init), len);
            dest.init += len;
            ptr::drop_in_place(slice::from_raw_parts_mut(base, offset));
            ptr::drop_in_place(slice::from_raw_parts_mut(
                base.add(offset + len),
                init - offset - len,
            ));
        }
    }
}

impl<T: Default> Storage<T> {
    /// Set `start..end` to default values, initializing past the prefix as needed
    pub(crate) fn fill_default(&mut self, start: usize, end: usize) {
        assert!(start <= end && end <= self.capacity);

        let reset_end = end.min(self.init);
        if start < reset_end {
            for slot in self.slice_mut(start, reset_end - start) {
                *slot = T::default();
            }
        }

        // Anything between the prefix and `start` must be initialized too
        while self.init < end {
            unsafe { ptr::write(self.as_mut_ptr().add(self.init), T::default()) };
            self.init += 1;
        }
    }
}

impl<T> Drop for Storage<T> {
    fn drop(&mut self) {
        let init = mem::replace(&mut self.init, 0);
        unsafe {
            ptr::drop_in_place(slice::from_raw_parts_mut(self.as_mut_ptr(), init));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocators::DefaultAllocator;

    #[test]
    fn test_fill_and_extend() {
        let allocator = DefaultAllocator::shared_dyn();
        let mut storage = Storage::<String>::allocate(&allocator, 4, false).unwrap();
        assert_eq!(storage.capacity(), 4);

        storage.extend(["a".to_string(), "b".to_string()]);
        storage.fill_default(1, 4);
        assert_eq!(storage.slice(0, 4), ["a", "", "", ""]);
    }

    #[test]
    fn test_move_into() {
        let allocator = DefaultAllocator::shared_dyn();
        let mut source = Storage::<String>::allocate(&allocator, 3, false).unwrap();
        source.extend(["x", "y", "z"].map(String::from));

        let mut dest = Storage::<String>::allocate(&allocator, 8, false).unwrap();
        source.move_into(1, 2, &mut dest);
        assert_eq!(dest.slice(0, 2), ["y", "z"]);
    }
}
