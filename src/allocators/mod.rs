//! Pooled memory allocation for copy-on-write vectors
//!
//! Two kinds of allocator hand out [`RawBlock`]s: the shared dynamic
//! [`DefaultAllocator`] and fixed-size [`FreelistAllocator`] pools built with
//! [`PoolBuilder`]. Every live allocator is listed in an
//! [`AllocatorRegistry`] for diagnostics.

pub mod block;
pub mod config;
pub mod default;
pub mod pool;
pub mod registry;
pub mod stats;
pub mod traits;

pub use block::{RawBlock, BLOCK_ALIGN, RELEASE_PATTERN};
pub use config::{PoolBuilder, PoolConfig, PoolPolicy, MAX_POOL_NAME};
pub use default::{DefaultAllocator, DEFAULT_ALLOCATOR_NAME};
pub use pool::FreelistAllocator;
pub use registry::{AllocatorRegistry, RegistrationId};
pub use stats::{AllocatorInfo, AllocatorStats, AtomicAllocatorStats};
pub use traits::{same_allocator, BlockAllocator};

/// Print the report of every live allocator in the global registry
pub fn print_allocator_info(out: &mut impl std::fmt::Write) -> std::fmt::Result {
    AllocatorRegistry::global().write_report(out)
}
