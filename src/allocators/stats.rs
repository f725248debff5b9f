//! Allocator diagnostics and statistics tracking

use std::{
    fmt,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

use serde::{Deserialize, Serialize};

/// Point-in-time description of one allocator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorInfo {
    /// Allocator name, possibly empty
    pub name: String,
    /// Number of blocks currently handed out
    pub num_allocs: usize,
    /// Bytes currently handed out
    pub size_allocs: usize,
    /// Number of blocks in the free list
    pub num_free: usize,
    /// Bytes held in the free list
    pub size_free: usize,
    /// Block size in bytes, when `fixed_size` is set
    pub alloc_size: usize,
    /// Whether this allocator hands out blocks of one size
    pub fixed_size: bool,
    /// Whether the `num_*`/`size_*` fields are meaningful
    pub has_stats: bool,
}

impl AllocatorInfo {
    /// Whether the allocator has no blocks outstanding
    pub fn is_idle(&self) -> bool {
        self.num_allocs == 0
    }

    /// Total bytes held by the allocator (outstanding plus cached)
    pub fn total_bytes(&self) -> usize {
        self.size_allocs + self.size_free
    }
}

impl fmt::Display for AllocatorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            writeln!(f, "Name: <unnamed>")?;
        } else {
            writeln!(f, "Name: {}", self.name)?;
        }
        if self.fixed_size {
            writeln!(f, " Size: {}", self.alloc_size)?;
        } else {
            writeln!(f, " Size: dynamic")?;
        }
        if self.has_stats {
            writeln!(f, " Alloc: {} {}", self.num_allocs, self.size_allocs)?;
            writeln!(f, " Free : {} {}", self.num_free, self.size_free)?;
        }
        Ok(())
    }
}

/// Lifetime counters for an allocator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorStats {
    /// Successful allocations
    pub total_allocations: u64,
    /// Blocks returned
    pub total_releases: u64,
    /// Refused or failed allocations
    pub allocation_failures: u64,
    /// Blocks handed back to the system because the free list was full
    pub evictions: u64,
    /// Highest number of simultaneously outstanding blocks
    pub peak_outstanding: usize,
}

impl AllocatorStats {
    /// Allocation success rate (0.0 to 1.0)
    pub fn success_rate(&self) -> f64 {
        let attempts = self.total_allocations + self.allocation_failures;
        if attempts == 0 {
            return 1.0;
        }
        self.total_allocations as f64 / attempts as f64
    }

    /// Get a summary string of the statistics
    pub fn summary(&self) -> String {
        format!(
            "AllocatorStats {{ allocations: {}, releases: {}, failures: {}, \
             evictions: {}, peak: {}, success_rate: {:.2}% }}",
            self.total_allocations,
            self.total_releases,
            self.allocation_failures,
            self.evictions,
            self.peak_outstanding,
            self.success_rate() * 100.0
        )
    }
}

/// Thread-safe counters shared by allocator implementations
#[derive(Debug, Default)]
pub struct AtomicAllocatorStats {
    total_allocations: AtomicU64,
    total_releases: AtomicU64,
    allocation_failures: AtomicU64,
    evictions: AtomicU64,
    outstanding: AtomicUsize,
    peak_outstanding: AtomicUsize,
}

impl AtomicAllocatorStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful allocation
    pub fn record_allocation(&self) {
        self.total_allocations.fetch_add(1, Ordering::Relaxed);
        let current = self.outstanding.fetch_add(1, Ordering::Relaxed) + 1;

        let mut peak = self.peak_outstanding.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_outstanding.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => peak = x,
            }
        }
    }

    /// Record a returned block
    pub fn record_release(&self) {
        self.total_releases.fetch_add(1, Ordering::Relaxed);
        self.outstanding.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a refused or failed allocation
    pub fn record_failure(&self) {
        self.allocation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a block freed to the system instead of cached
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> AllocatorStats {
        AllocatorStats {
            total_allocations: self.total_allocations.load(Ordering::Relaxed),
            total_releases: self.total_releases.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            peak_outstanding: self.peak_outstanding.load(Ordering::Relaxed),
        }
    }
}
