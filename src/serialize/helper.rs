//! Size and string encoding shared by every codec

use super::{
    byte_buffer::ByteBuffer,
    control::{ensure_remaining, DeserializableControl, SerializableControl},
};
use crate::error::{PvError, Result};

/// First byte of a size followed by a 32-bit count
pub const SIZE_ESCAPE: u8 = 0xFE;

/// A null size, decoded as zero
pub const NULL_SIZE: u8 = 0xFF;

/// Write an element count: one byte below 254, else escape plus `i32`
pub fn write_size<C>(size: usize, buffer: &mut ByteBuffer, control: &mut C) -> Result<()>
where
    C: SerializableControl + ?Sized,
{
    if size < SIZE_ESCAPE as usize {
        control.ensure_buffer(buffer, 1)?;
        return buffer.put_u8(size as u8);
    }

    let size = i32::try_from(size).map_err(|_| {
        PvError::invalid_parameter("size", format!("{} does not fit the size encoding", size))
    })?;
    control.ensure_buffer(buffer, 5)?;
    buffer.put_u8(SIZE_ESCAPE)?;
    buffer.put_i32(size)
}

/// Write the null size marker
pub fn write_null_size<C>(buffer: &mut ByteBuffer, control: &mut C) -> Result<()>
where
    C: SerializableControl + ?Sized,
{
    control.ensure_buffer(buffer, 1)?;
    buffer.put_u8(NULL_SIZE)
}

/// Read an element count written by [`write_size`]
pub fn read_size<C>(buffer: &mut ByteBuffer, control: &mut C) -> Result<usize>
where
    C: DeserializableControl + ?Sized,
{
    ensure_remaining(buffer, control, 1)?;
    match buffer.get_u8()? {
        NULL_SIZE => Ok(0),
        SIZE_ESCAPE => {
            ensure_remaining(buffer, control, 4)?;
            let size = buffer.get_i32()?;
            usize::try_from(size)
                .map_err(|_| PvError::serialization(format!("negative size {}", size)))
        }
        size => Ok(size as usize),
    }
}

/// Write `value` as a size followed by its UTF-8 bytes
pub fn serialize_string<C>(value: &str, buffer: &mut ByteBuffer, control: &mut C) -> Result<()>
where
    C: SerializableControl + ?Sized,
{
    write_size(value.len(), buffer, control)?;

    let mut bytes = value.as_bytes();
    while !bytes.is_empty() {
        if !buffer.has_remaining() {
            control.flush_serialize_buffer(buffer)?;
            if !buffer.has_remaining() {
                return Err(PvError::insufficient_space(bytes.len(), 0));
            }
        }
        let chunk = bytes.len().min(buffer.remaining());
        buffer.put_bytes(&bytes[..chunk])?;
        bytes = &bytes[chunk..];
    }
    Ok(())
}

/// Read a string written by [`serialize_string`]
pub fn deserialize_string<C>(buffer: &mut ByteBuffer, control: &mut C) -> Result<String>
where
    C: DeserializableControl + ?Sized,
{
    let size = read_size(buffer, control)?;
    if size == 0 {
        return Ok(String::new());
    }

    // Grows with the bytes actually received
    let mut bytes = Vec::with_capacity(size.min(buffer.capacity()));
    while bytes.len() < size {
        let missing = size - bytes.len();
        if !buffer.has_remaining() {
            control.ensure_data(buffer, missing.min(buffer.capacity()))?;
            if !buffer.has_remaining() {
                return Err(PvError::insufficient_space(missing, 0));
            }
        }
        let filled = bytes.len();
        bytes.resize(filled + missing.min(buffer.remaining()), 0);
        buffer.get_bytes(&mut bytes[filled..])?;
    }

    String::from_utf8(bytes).map_err(|err| PvError::serialization(format!("invalid UTF-8: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{BufferOnly, ByteOrder};

    fn written(buffer: &mut ByteBuffer) -> Vec<u8> {
        buffer.flip();
        buffer.as_slice().to_vec()
    }

    #[test]
    fn test_size_encoding() {
        let mut buffer = ByteBuffer::new(16);
        write_size(253, &mut buffer, &mut BufferOnly).unwrap();
        write_size(254, &mut buffer, &mut BufferOnly).unwrap();
        assert_eq!(written(&mut buffer), vec![253, 0xFE, 0, 0, 0, 254]);
    }

    #[test]
    fn test_size_encoding_little_endian() {
        let mut buffer = ByteBuffer::with_order(16, ByteOrder::Little);
        write_size(1000, &mut buffer, &mut BufferOnly).unwrap();
        assert_eq!(written(&mut buffer), vec![0xFE, 0xE8, 0x03, 0, 0]);

        let mut reader = ByteBuffer::for_reading(vec![0xFE, 0xE8, 0x03, 0, 0], ByteOrder::Little);
        assert_eq!(read_size(&mut reader, &mut BufferOnly).unwrap(), 1000);
    }

    #[test]
    fn test_null_size_reads_as_zero() {
        let mut buffer = ByteBuffer::new(1);
        write_null_size(&mut buffer, &mut BufferOnly).unwrap();
        buffer.flip();
        assert_eq!(read_size(&mut buffer, &mut BufferOnly).unwrap(), 0);
    }

    #[test]
    fn test_oversized_count_rejected_before_writing() {
        let mut buffer = ByteBuffer::new(16);
        let err = write_size(i32::MAX as usize + 1, &mut buffer, &mut BufferOnly).unwrap_err();
        assert!(matches!(err, PvError::InvalidParameter { .. }));
        assert_eq!(buffer.position(), 0);
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buffer = ByteBuffer::for_reading(vec![2, 0xC3, 0x28], ByteOrder::Big);
        let err = deserialize_string(&mut buffer, &mut BufferOnly).unwrap_err();
        assert!(matches!(err, PvError::Serialization { .. }));
    }

    #[test]
    fn test_huge_string_size_fails_cleanly() {
        let mut buffer =
            ByteBuffer::for_reading(vec![0xFE, 0x7F, 0xFF, 0xFF, 0xFF, b'a', b'b'], ByteOrder::Big);
        let err = deserialize_string(&mut buffer, &mut BufferOnly).unwrap_err();
        assert!(matches!(err, PvError::InsufficientSpace { .. }));
    }

    #[test]
    fn test_string_round_trip() {
        let mut buffer = ByteBuffer::new(32);
        serialize_string("grüße", &mut buffer, &mut BufferOnly).unwrap();
        buffer.flip();
        assert_eq!(deserialize_string(&mut buffer, &mut BufferOnly).unwrap(), "grüße");
    }
}
