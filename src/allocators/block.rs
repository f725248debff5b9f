//! Raw memory blocks handed out by allocators

use std::{
    alloc::{self, Layout},
    fmt,
    ptr::NonNull,
    sync::Arc,
};

use super::traits::BlockAllocator;

/// Alignment of every block; covers all element kinds stored in vectors
pub const BLOCK_ALIGN: usize = 16;

/// Byte written over released blocks in debug builds
pub const RELEASE_PATTERN: u8 = 0x1b;

/// An owned block of raw memory.
///
/// Dropping the block hands it back to the allocator that produced it.
pub struct RawBlock {
    ptr: NonNull<u8>,
    size: usize,
    owner: Arc<dyn BlockAllocator>,
}

impl RawBlock {
    /// Wrap a block allocated by `owner`
    ///
    /// # Safety
    /// - `ptr` must be valid for reads and writes of `size` bytes and aligned
    ///   to [`BLOCK_ALIGN`]
    /// - `owner.release(ptr, size)` must be the correct way to give it back
    pub unsafe fn from_raw(ptr: NonNull<u8>, size: usize, owner: Arc<dyn BlockAllocator>) -> Self {
        Self { ptr, size, owner }
    }

    /// Pointer to the start of the block
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Usable size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// The allocator this block returns to
    pub fn owner(&self) -> &Arc<dyn BlockAllocator> {
        &self.owner
    }
}

// The block is plain memory owned exclusively by this handle.
unsafe impl Send for RawBlock {}
unsafe impl Sync for RawBlock {}

impl fmt::Debug for RawBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBlock")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .field("owner", &self.owner.name())
            .finish()
    }
}

impl Drop for RawBlock {
    fn drop(&mut self) {
        self.owner.release(self.ptr, self.size);
    }
}

/// Allocate `size` bytes from the system allocator.
///
/// Zero-sized requests get an aligned dangling pointer that must not be freed
/// through `dealloc`; [`system_free`] handles that case.
pub(crate) fn system_alloc(size: usize, zero: bool) -> Option<NonNull<u8>> {
    if size == 0 {
        return NonNull::new(BLOCK_ALIGN as *mut u8);
    }
    let layout = Layout::from_size_align(size, BLOCK_ALIGN).ok()?;
    let ptr = unsafe {
        if zero {
            alloc::alloc_zeroed(layout)
        } else {
            alloc::alloc(layout)
        }
    };
    NonNull::new(ptr)
}

/// Free memory obtained from [`system_alloc`]
pub(crate) fn system_free(ptr: NonNull<u8>, size: usize) {
    if size == 0 {
        return;
    }
    if let Ok(layout) = Layout::from_size_align(size, BLOCK_ALIGN) {
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_alloc_zeroed() {
        let ptr = system_alloc(64, true).expect("allocation");
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 64) };
        assert!(bytes.iter().all(|&b| b == 0));
        assert_eq!(ptr.as_ptr() as usize % BLOCK_ALIGN, 0);
        system_free(ptr, 64);
    }

    #[test]
    fn test_zero_sized_alloc_is_aligned() {
        let ptr = system_alloc(0, false).expect("dangling pointer");
        assert_eq!(ptr.as_ptr() as usize % BLOCK_ALIGN, 0);
        system_free(ptr, 0);
    }
}
