//! # pvwire - Copy-on-Write Array Values and Wire Codec
//!
//! pvwire is the value-storage and wire-encoding layer of a structured,
//! self-describing data model. It holds typed arrays in reference-counted,
//! lazily-copied storage and moves them to and from byte streams, including
//! streams that deliver data in arbitrary fragments.
//!
//! ## Features
//!
//! - **Copy-on-write vectors**: frozen views share a block; thawing copies only when shared
//! - **Pooled allocation**: fixed-size freelist pools with capped or cached retention
//! - **Live diagnostics**: every allocator is listed in a registry report
//! - **Array values**: length, capacity and immutability rules with change notification
//! - **Wire codec**: zero-copy direct path plus a chunked fallback for any fragment size
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │        ArrayValue<T> / ScalarArray              │
//! ├─────────────────────────────────────────────────┤
//! │  FrozenVector / SharedVector │  Wire codec      │
//! │  - thaw / freeze             │  - size prefix   │
//! │  - slice / resize            │  - direct path   │
//! └─────────────────────────────────────────────────┘
//!           │                         │
//!           ▼                         ▼
//! ┌─────────────────┐    ┌─────────────────────────┐
//! │  Block pools    │    │  ByteBuffer + controls  │
//! │  (registry)     │    │  (io::Read / io::Write) │
//! └─────────────────┘    └─────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use pvwire::{ArrayValue, ByteBuffer, StreamReader, StreamWriter};
//!
//! let mut source = ArrayValue::<f64>::new("samples");
//! source.put_from(&[1.0, 2.0, 3.0]).unwrap();
//!
//! let mut buffer = ByteBuffer::new(64);
//! let mut writer = StreamWriter::new(Vec::new());
//! source.serialize(&mut buffer, &mut writer).unwrap();
//! let bytes = writer.into_inner();
//!
//! let mut buffer = ByteBuffer::new(64);
//! buffer.flip();
//! let mut reader = StreamReader::new(bytes.as_slice()).with_fragment(3);
//! let mut target = ArrayValue::<f64>::new("samples");
//! target.deserialize(&mut buffer, &mut reader).unwrap();
//! assert_eq!(target.as_slice(), source.as_slice());
//! ```

// Core modules
pub mod error;
pub mod allocators;
pub mod shared_vector;
pub mod serialize;
pub mod array;
pub mod record;

// Main API re-exports
pub use error::{PvError, Result};
pub use allocators::{
    AllocatorInfo, AllocatorRegistry, AllocatorStats, BlockAllocator, DefaultAllocator,
    FreelistAllocator, PoolBuilder, PoolConfig, PoolPolicy,
};
pub use shared_vector::{FrozenVector, SharedVector, VectorAllocator};
pub use serialize::{
    ByteBuffer, ByteOrder, DeserializableControl, SerializableControl, StreamReader, StreamWriter,
};
pub use array::{create_array, ArrayField, ArrayValue, Element, ScalarArray, ScalarType};
pub use record::{ChangeTracker, ImmutabilityToken, PostHandler, Record};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
