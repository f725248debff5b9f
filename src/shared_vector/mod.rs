//! Copy-on-write vectors
//!
//! A [`SharedVector`] is the writable form and always has a single owner.
//! [`SharedVector::freeze`] turns it into a [`FrozenVector`] for free; frozen
//! vectors clone by sharing the block. [`FrozenVector::thaw`] goes back,
//! copying only when the block is shared.

pub mod allocator;
pub mod frozen;
pub mod mutable;
mod storage;

pub use allocator::VectorAllocator;
pub use frozen::FrozenVector;
pub use mutable::SharedVector;
