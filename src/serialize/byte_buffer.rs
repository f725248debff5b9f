//! Fixed-capacity byte buffer with position, limit and byte order

use std::fmt;

use serde::{Deserialize, Serialize};

use super::primitive::Primitive;
use crate::error::{PvError, Result};

/// Byte order of multi-byte values on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    /// Network order
    #[default]
    Big,
    Little,
}

impl ByteOrder {
    /// Order of the running machine
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}

/// Byte buffer in the classic position/limit style.
///
/// Writes fill `position..limit` and advance the position. After
/// [`ByteBuffer::flip`] the written bytes become readable from the start.
/// [`ByteBuffer::compact`] moves unread bytes to the front for refilling.
pub struct ByteBuffer {
    data: Vec<u8>,
    position: usize,
    limit: usize,
    order: ByteOrder,
}

impl ByteBuffer {
    /// Empty buffer ready for writing, in network order
    pub fn new(capacity: usize) -> Self {
        Self::with_order(capacity, ByteOrder::default())
    }

    pub fn with_order(capacity: usize, order: ByteOrder) -> Self {
        Self {
            data: vec![0; capacity],
            position: 0,
            limit: capacity,
            order,
        }
    }

    /// Buffer whose whole content is readable
    pub fn for_reading(data: Vec<u8>, order: ByteOrder) -> Self {
        let limit = data.len();
        Self {
            data,
            position: 0,
            limit,
            order,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    pub fn has_remaining(&self) -> bool {
        self.position < self.limit
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.limit {
            return Err(PvError::invalid_parameter(
                "position",
                format!("{} beyond limit {}", position, self.limit),
            ));
        }
        self.position = position;
        Ok(())
    }

    pub fn set_limit(&mut self, limit: usize) -> Result<()> {
        if limit > self.capacity() {
            return Err(PvError::invalid_parameter(
                "limit",
                format!("{} beyond capacity {}", limit, self.capacity()),
            ));
        }
        self.limit = limit;
        self.position = self.position.min(limit);
        Ok(())
    }

    /// Reset for writing over the whole capacity
    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.capacity();
    }

    /// Make the bytes written so far readable
    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
    }

    /// Move unread bytes to the front and continue writing after them
    pub fn compact(&mut self) {
        let unread = self.remaining();
        self.data.copy_within(self.position..self.limit, 0);
        self.position = unread;
        self.limit = self.capacity();
    }

    /// Whether values of `T` must be byte-swapped relative to memory
    pub fn reverse<T: Primitive>(&self) -> bool {
        T::WIDTH > 1 && self.order != ByteOrder::native()
    }

    /// Bytes between position and limit
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.position..self.limit]
    }

    /// Writable bytes between position and limit
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[self.position..self.limit]
    }

    /// Move the position forward by `count` bytes
    pub fn advance(&mut self, count: usize) -> Result<()> {
        self.check(count)?;
        self.position += count;
        Ok(())
    }

    pub fn put<T: Primitive>(&mut self, value: T) -> Result<()> {
        self.check(T::WIDTH)?;
        value.write_bytes(self.order, &mut self.data[self.position..]);
        self.position += T::WIDTH;
        Ok(())
    }

    pub fn get<T: Primitive>(&mut self) -> Result<T> {
        self.check(T::WIDTH)?;
        let value = T::read_bytes(self.order, &self.data[self.position..]);
        self.position += T::WIDTH;
        Ok(value)
    }

    pub fn put_u8(&mut self, value: u8) -> Result<()> {
        self.put(value)
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        self.get()
    }

    pub fn put_i32(&mut self, value: i32) -> Result<()> {
        self.put(value)
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        self.get()
    }

    pub fn put_f64(&mut self, value: f64) -> Result<()> {
        self.put(value)
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        self.get()
    }

    /// Append all of `values` in buffer byte order
    pub fn put_array<T: Primitive>(&mut self, values: &[T]) -> Result<()> {
        self.check(values.len() * T::WIDTH)?;
        for value in values {
            value.write_bytes(self.order, &mut self.data[self.position..]);
            self.position += T::WIDTH;
        }
        Ok(())
    }

    /// Fill all of `values` from the buffer
    pub fn get_array<T: Primitive>(&mut self, values: &mut [T]) -> Result<()> {
        self.check(values.len() * T::WIDTH)?;
        for value in values {
            *value = T::read_bytes(self.order, &self.data[self.position..]);
            self.position += T::WIDTH;
        }
        Ok(())
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.check(bytes.len())?;
        self.data[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        Ok(())
    }

    pub fn get_bytes(&mut self, bytes: &mut [u8]) -> Result<()> {
        self.check(bytes.len())?;
        bytes.copy_from_slice(&self.data[self.position..self.position + bytes.len()]);
        self.position += bytes.len();
        Ok(())
    }

    fn check(&self, requested: usize) -> Result<()> {
        if requested > self.remaining() {
            return Err(PvError::insufficient_space(requested, self.remaining()));
        }
        Ok(())
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("capacity", &self.capacity())
            .field("position", &self.position)
            .field("limit", &self.limit)
            .field("order", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_and_compact() {
        let mut buffer = ByteBuffer::new(8);
        buffer.put_i32(7).unwrap();
        buffer.put_u8(9).unwrap();
        assert_eq!(buffer.remaining(), 3);

        buffer.flip();
        assert_eq!(buffer.remaining(), 5);
        assert_eq!(buffer.get_i32().unwrap(), 7);

        buffer.compact();
        assert_eq!(buffer.position(), 1);
        assert_eq!(buffer.remaining(), 7);
        buffer.flip();
        assert_eq!(buffer.get_u8().unwrap(), 9);
    }

    #[test]
    fn test_insufficient_space() {
        let mut buffer = ByteBuffer::new(3);
        let err = buffer.put_i32(1).unwrap_err();
        assert!(matches!(
            err,
            PvError::InsufficientSpace {
                requested: 4,
                available: 3
            }
        ));
        assert_eq!(buffer.position(), 0);
    }

    #[test]
    fn test_reverse() {
        let big = ByteBuffer::with_order(0, ByteOrder::Big);
        let little = ByteBuffer::with_order(0, ByteOrder::Little);
        assert!(!big.reverse::<u8>());
        assert_ne!(big.reverse::<u32>(), little.reverse::<u32>());
        assert!(!ByteBuffer::with_order(0, ByteOrder::native()).reverse::<f64>());
    }

    #[test]
    fn test_array_in_order() {
        let mut buffer = ByteBuffer::with_order(4, ByteOrder::Little);
        buffer.put_array(&[0x0102u16, 0x0304]).unwrap();
        buffer.flip();
        assert_eq!(buffer.as_slice(), &[2, 1, 4, 3]);

        let mut out = [0u16; 2];
        buffer.get_array(&mut out).unwrap();
        assert_eq!(out, [0x0102, 0x0304]);
    }
}
