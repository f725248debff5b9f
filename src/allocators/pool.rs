//! Freelist pool - fixed-size block allocation
//!
//! Requests larger than the block size are refused. Smaller requests are
//! served with a full block. Two retention policies share one implementation:
//!
//! 1. capped: at most `limit` blocks may be outstanding; further requests
//!    fail immediately. Released blocks always fit back in the free list.
//! 2. cached: allocation is unbounded; released blocks are kept only while
//!    the free list holds fewer than `limit`, the rest go back to the system.

use std::{
    ptr::{self, NonNull},
    sync::{Arc, Mutex, MutexGuard},
};

use log::{debug, trace, warn};

use super::{
    block::{system_alloc, system_free, RawBlock, RELEASE_PATTERN},
    registry::{AllocatorRegistry, RegistrationId},
    stats::{AllocatorInfo, AllocatorStats, AtomicAllocatorStats},
    traits::BlockAllocator,
};
use crate::error::{PvError, Result};

#[derive(Debug, Default)]
struct FreelistState {
    free: Vec<NonNull<u8>>,
    outstanding: usize,
}

/// Pool allocator for fixed-size blocks
#[derive(Debug)]
pub struct FreelistAllocator {
    name: String,
    /// Size of one element in bytes
    element_size: usize,
    /// Elements per block
    block_elements: usize,
    /// Size of each block in bytes
    block_bytes: usize,
    /// Outstanding cap (capped) or free-list bound (cached)
    limit: usize,
    capped: bool,
    state: Mutex<FreelistState>,
    stats: AtomicAllocatorStats,
    registry: Arc<AllocatorRegistry>,
    registration: RegistrationId,
}

// Free-list pointers are owned blocks guarded by the state mutex.
unsafe impl Send for FreelistAllocator {}
unsafe impl Sync for FreelistAllocator {}

impl FreelistAllocator {
    /// Create a pool and pre-allocate `initial` blocks into its free list
    pub fn new(
        name: impl Into<String>,
        element_size: usize,
        block_elements: usize,
        limit: usize,
        initial: usize,
        capped: bool,
        registry: Arc<AllocatorRegistry>,
    ) -> Result<Arc<Self>> {
        let name = name.into();

        if element_size == 0 || block_elements == 0 {
            return Err(PvError::invalid_parameter(
                "fixed",
                "fixed() allocation size must be > 0",
            ));
        }

        if initial > limit {
            return Err(PvError::invalid_parameter(
                "initial",
                format!("initial stock {} exceeds pool limit {}", initial, limit),
            ));
        }

        let block_bytes = element_size
            .checked_mul(block_elements)
            .ok_or_else(|| PvError::invalid_parameter("fixed", "block size overflows"))?;

        let mut free = Vec::with_capacity(initial);
        for _ in 0..initial {
            match system_alloc(block_bytes, false) {
                Some(ptr) => free.push(ptr),
                None => {
                    for ptr in free {
                        system_free(ptr, block_bytes);
                    }
                    return Err(PvError::allocation_failed(
                        name,
                        block_bytes,
                        "system allocation failed during initial stock",
                    ));
                }
            }
        }

        debug!(
            "creating {} pool '{}': {} x {} byte blocks, limit {}, initial {}",
            if capped { "capped" } else { "cached" },
            name,
            block_elements,
            element_size,
            limit,
            initial
        );

        Ok(Arc::new_cyclic(|weak: &std::sync::Weak<Self>| {
            let registration = registry.register(weak.clone());
            Self {
                name,
                element_size,
                block_elements,
                block_bytes,
                limit,
                capped,
                state: Mutex::new(FreelistState {
                    free,
                    outstanding: 0,
                }),
                stats: AtomicAllocatorStats::new(),
                registry,
                registration,
            }
        }))
    }

    /// Size of each block in bytes
    pub fn block_bytes(&self) -> usize {
        self.block_bytes
    }

    /// Elements per block
    pub fn block_elements(&self) -> usize {
        self.block_elements
    }

    /// Size of one element in bytes
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Outstanding cap or free-list bound
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether this pool refuses allocations past its limit
    pub fn is_capped(&self) -> bool {
        self.capped
    }

    /// Number of blocks currently handed out
    pub fn outstanding(&self) -> usize {
        self.lock_state().outstanding
    }

    /// Number of blocks waiting in the free list
    pub fn free_count(&self) -> usize {
        self.lock_state().free.len()
    }

    fn lock_state(&self) -> MutexGuard<'_, FreelistState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn refuse(&self, requested: usize, reason: String) -> PvError {
        self.stats.record_failure();
        PvError::allocation_failed(self.name.clone(), requested, reason)
    }
}

impl BlockAllocator for FreelistAllocator {
    fn name(&self) -> &str {
        &self.name
    }

    fn alloc(self: Arc<Self>, element_size: usize, count: usize, zero: bool) -> Result<RawBlock> {
        let requested = element_size.saturating_mul(count);
        let mut state = self.lock_state();

        debug_assert!(!self.capped || state.outstanding + state.free.len() <= self.limit);

        if requested > self.block_bytes {
            drop(state);
            return Err(self.refuse(
                requested,
                format!("exceeds block size of {} bytes", self.block_bytes),
            ));
        }

        if self.capped && state.outstanding == self.limit {
            drop(state);
            warn!("pool '{}' exhausted: {} blocks outstanding", self.name, self.limit);
            return Err(self.refuse(requested, format!("capped at {} blocks", self.limit)));
        }

        let ptr = match state.free.pop() {
            Some(ptr) => {
                state.outstanding += 1;
                drop(state);
                if zero {
                    unsafe { ptr::write_bytes(ptr.as_ptr(), 0, self.block_bytes) };
                }
                ptr
            }
            None => {
                // Reserve the slot, then go to the system without holding the lock
                state.outstanding += 1;
                drop(state);
                match system_alloc(self.block_bytes, zero) {
                    Some(ptr) => ptr,
                    None => {
                        self.lock_state().outstanding -= 1;
                        return Err(self.refuse(self.block_bytes, "system allocation failed".into()));
                    }
                }
            }
        };

        self.stats.record_allocation();
        let size = self.block_bytes;
        Ok(unsafe { RawBlock::from_raw(ptr, size, self) })
    }

    fn release(&self, ptr: NonNull<u8>, size: usize) {
        debug_assert_eq!(size, self.block_bytes);

        if cfg!(debug_assertions) {
            unsafe { ptr::write_bytes(ptr.as_ptr(), RELEASE_PATTERN, self.block_bytes) };
        }

        self.stats.record_release();
        {
            let mut state = self.lock_state();
            debug_assert!(state.outstanding > 0);
            state.outstanding = state.outstanding.saturating_sub(1);
            if state.free.len() < self.limit {
                state.free.push(ptr);
                return;
            }
        }

        trace!("pool '{}' free list full, releasing block", self.name);
        self.stats.record_eviction();
        system_free(ptr, self.block_bytes);
    }

    fn info(&self) -> AllocatorInfo {
        let state = self.lock_state();
        AllocatorInfo {
            name: self.name.clone(),
            fixed_size: true,
            alloc_size: self.block_bytes,
            has_stats: true,
            num_allocs: state.outstanding,
            size_allocs: state.outstanding * self.block_bytes,
            num_free: state.free.len(),
            size_free: state.free.len() * self.block_bytes,
        }
    }

    fn stats(&self) -> AllocatorStats {
        self.stats.snapshot()
    }
}

impl Drop for FreelistAllocator {
    fn drop(&mut self) {
        self.registry.deregister(self.registration);

        let state = self.state.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.outstanding != 0 {
            warn!(
                "pool '{}' dropped with {} blocks outstanding",
                self.name, state.outstanding
            );
        }
        for ptr in state.free.drain(..) {
            system_free(ptr, self.block_bytes);
        }
    }
}
