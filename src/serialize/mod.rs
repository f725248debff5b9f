//! Byte buffers and stream controls for the wire codec
//!
//! Codecs write into and read from a [`ByteBuffer`]. When the buffer runs
//! full or empty they ask a control ([`SerializableControl`] or
//! [`DeserializableControl`]) to flush or refill it. Controls may also offer
//! a direct path that moves bulk payloads past the buffer.

pub mod byte_buffer;
pub mod control;
pub mod helper;
pub mod primitive;
pub mod stream;

pub use byte_buffer::{ByteBuffer, ByteOrder};
pub use control::{ensure_remaining, BufferOnly, DeserializableControl, SerializableControl};
pub use helper::{
    deserialize_string, read_size, serialize_string, write_null_size, write_size, NULL_SIZE,
    SIZE_ESCAPE,
};
pub use primitive::{as_raw_bytes, as_raw_bytes_mut, Primitive};
pub use stream::{StreamReader, StreamWriter};
