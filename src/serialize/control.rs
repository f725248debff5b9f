//! Flow control between codecs and the stream behind a byte buffer

use super::byte_buffer::ByteBuffer;
use crate::error::{PvError, Result};

/// Drains a byte buffer that a serializer fills.
pub trait SerializableControl {
    /// Hand the written bytes to the stream and reset the buffer for writing
    fn flush_serialize_buffer(&mut self, buffer: &mut ByteBuffer) -> Result<()>;

    /// Make room for at least `size` bytes
    fn ensure_buffer(&mut self, buffer: &mut ByteBuffer, size: usize) -> Result<()> {
        if buffer.remaining() >= size {
            return Ok(());
        }
        self.flush_serialize_buffer(buffer)?;
        if buffer.remaining() < size {
            return Err(PvError::insufficient_space(size, buffer.remaining()));
        }
        Ok(())
    }

    /// Offer `bytes` for transfer bypassing the buffer.
    ///
    /// Returns `Ok(false)` when the control declines; the caller then copies
    /// through the buffer. `element_size` is the width of one element.
    fn direct_serialize(
        &mut self,
        _buffer: &mut ByteBuffer,
        _bytes: &[u8],
        _element_size: usize,
    ) -> Result<bool> {
        Ok(false)
    }
}

/// Refills a byte buffer that a deserializer drains.
pub trait DeserializableControl {
    /// Make at least `size` more bytes readable beyond those remaining
    fn ensure_data(&mut self, buffer: &mut ByteBuffer, size: usize) -> Result<()>;

    /// Offer `dest` to be filled bypassing the buffer.
    ///
    /// Bytes already buffered must be consumed first. Returns `Ok(false)`
    /// when the control declines.
    fn direct_deserialize(
        &mut self,
        _buffer: &mut ByteBuffer,
        _dest: &mut [u8],
        _element_size: usize,
    ) -> Result<bool> {
        Ok(false)
    }
}

/// Control for a buffer that already holds the whole payload
#[derive(Debug, Default, Clone, Copy)]
pub struct BufferOnly;

impl SerializableControl for BufferOnly {
    fn flush_serialize_buffer(&mut self, _buffer: &mut ByteBuffer) -> Result<()> {
        Ok(())
    }
}

impl DeserializableControl for BufferOnly {
    fn ensure_data(&mut self, buffer: &mut ByteBuffer, size: usize) -> Result<()> {
        Err(PvError::insufficient_space(
            buffer.remaining() + size,
            buffer.remaining(),
        ))
    }
}

/// Make `size` bytes readable in total
pub fn ensure_remaining<C>(buffer: &mut ByteBuffer, control: &mut C, size: usize) -> Result<()>
where
    C: DeserializableControl + ?Sized,
{
    let remaining = buffer.remaining();
    if remaining >= size {
        return Ok(());
    }
    control.ensure_data(buffer, size - remaining)?;
    if buffer.remaining() < size {
        return Err(PvError::insufficient_space(size, buffer.remaining()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_only_cannot_grow() {
        let mut buffer = ByteBuffer::for_reading(vec![1, 2], Default::default());
        assert!(ensure_remaining(&mut buffer, &mut BufferOnly, 2).is_ok());
        let err = ensure_remaining(&mut buffer, &mut BufferOnly, 3).unwrap_err();
        assert!(matches!(err, PvError::InsufficientSpace { .. }));
    }

    #[test]
    fn test_default_ensure_buffer() {
        let mut buffer = ByteBuffer::new(2);
        assert!(BufferOnly.ensure_buffer(&mut buffer, 2).is_ok());
        assert!(BufferOnly.ensure_buffer(&mut buffer, 3).is_err());
    }
}
