//! Serialize and deserialize array payloads
//!
//! An array is its element count followed by the elements. Fixed-width
//! kinds move in bulk, either through a control's direct path or in runs of
//! whole elements that fit the buffer. Text goes element by element.

use std::sync::Arc;

use log::trace;

use crate::{
    allocators::BlockAllocator,
    error::{PvError, Result},
    serialize::{
        as_raw_bytes, as_raw_bytes_mut, deserialize_string, read_size, serialize_string,
        write_size, ByteBuffer, DeserializableControl, Primitive, SerializableControl,
    },
    shared_vector::{FrozenVector, SharedVector},
};

/// Bytes of element storage committed ahead of the data that fills them
const DECODE_CHUNK_BYTES: usize = 1 << 20;

/// Grow `next` to `end` elements, doubling its capacity up to `count`.
///
/// Storage follows the data actually read, so a bogus count fails on the
/// stream instead of allocating everything up front.
fn grow_to<T: Default>(next: &mut SharedVector<T>, end: usize, count: usize) -> Result<()> {
    if end > next.capacity() {
        let target = end.max(next.capacity().saturating_mul(2)).min(count);
        next.reserve(target)?;
    }
    next.resize(end)
}

pub(crate) fn serialize_fixed<T, C>(
    values: &[T],
    buffer: &mut ByteBuffer,
    control: &mut C,
) -> Result<()>
where
    T: Primitive,
    C: SerializableControl + ?Sized,
{
    write_size(values.len(), buffer, control)?;

    if !buffer.reverse::<T>()
        && control.direct_serialize(buffer, as_raw_bytes(values), T::WIDTH)?
    {
        trace!("{} elements serialized on the direct path", values.len());
        return Ok(());
    }

    let mut rest = values;
    while !rest.is_empty() {
        let space_for = buffer.remaining() / T::WIDTH;
        if space_for == 0 {
            control.flush_serialize_buffer(buffer)?;
            if buffer.remaining() < T::WIDTH {
                return Err(PvError::insufficient_space(T::WIDTH, buffer.remaining()));
            }
            continue;
        }

        let run = space_for.min(rest.len());
        buffer.put_array(&rest[..run])?;
        rest = &rest[run..];
    }

    control.flush_serialize_buffer(buffer)
}

pub(crate) fn deserialize_fixed<T, C>(
    value: &mut FrozenVector<T>,
    allocator: &Arc<dyn BlockAllocator>,
    buffer: &mut ByteBuffer,
    control: &mut C,
) -> Result<()>
where
    T: Primitive,
    C: DeserializableControl + ?Sized,
{
    let count = read_size(buffer, control)?;

    // The prior contents stay in place until the whole payload has arrived
    let mut next = SharedVector::new_in(Arc::clone(allocator));
    let chunk = (DECODE_CHUNK_BYTES / T::WIDTH).max(1);
    let reverse = buffer.reverse::<T>();

    let mut done = 0;
    while done < count {
        let end = count.min(done + chunk);
        grow_to(&mut next, end, count)?;

        // Booleans have no raw view: each byte must be validated
        let direct = !reverse
            && match as_raw_bytes_mut(&mut next.as_mut_slice()[done..end]) {
                Some(bytes) => control.direct_deserialize(buffer, bytes, T::WIDTH)?,
                None => false,
            };
        if direct {
            trace!("{} elements deserialized on the direct path", end - done);
            done = end;
            continue;
        }

        let dest = next.as_mut_slice();
        while done < end {
            let have = buffer.remaining();
            let available = have / T::WIDTH;

            if available == 0 {
                // Only the tail of the final element is needed
                let want = if count - done == 1 {
                    T::WIDTH - have
                } else {
                    T::WIDTH
                };
                control.ensure_data(buffer, want)?;
                continue;
            }

            let run = available.min(end - done);
            buffer.get_array(&mut dest[done..done + run])?;
            done += run;
        }
    }

    *value = next.freeze();
    Ok(())
}

pub(crate) fn serialize_text<C>(
    values: &[String],
    buffer: &mut ByteBuffer,
    control: &mut C,
) -> Result<()>
where
    C: SerializableControl + ?Sized,
{
    write_size(values.len(), buffer, control)?;
    for value in values {
        serialize_string(value, buffer, control)?;
    }
    Ok(())
}

pub(crate) fn deserialize_text<C>(
    value: &mut FrozenVector<String>,
    allocator: &Arc<dyn BlockAllocator>,
    buffer: &mut ByteBuffer,
    control: &mut C,
) -> Result<()>
where
    C: DeserializableControl + ?Sized,
{
    let count = read_size(buffer, control)?;

    let mut next = SharedVector::new_in(Arc::clone(allocator));
    for index in 0..count {
        let element = deserialize_string(buffer, control)?;
        grow_to(&mut next, index + 1, count)?;
        next[index] = element;
    }

    *value = next.freeze();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        allocators::DefaultAllocator,
        serialize::{BufferOnly, ByteOrder, StreamReader, StreamWriter},
    };

    fn encode_fixed<T: Primitive>(values: &[T], order: ByteOrder) -> Vec<u8> {
        let mut buffer = ByteBuffer::with_order(64, order);
        let mut writer = StreamWriter::new(Vec::new());
        serialize_fixed(values, &mut buffer, &mut writer).unwrap();
        writer.into_inner()
    }

    #[test]
    fn test_fixed_layout() {
        let bytes = encode_fixed(&[1i16, -2], ByteOrder::Big);
        assert_eq!(bytes, vec![2, 0x00, 0x01, 0xFF, 0xFE]);

        let bytes = encode_fixed(&[1i16, -2], ByteOrder::Little);
        assert_eq!(bytes, vec![2, 0x01, 0x00, 0xFE, 0xFF]);
    }

    #[test]
    fn test_fixed_spans_buffer_refills() {
        let values: Vec<u32> = (0..100).collect();
        let mut buffer = ByteBuffer::new(7);
        let mut writer = StreamWriter::new(Vec::new());
        serialize_fixed(&values, &mut buffer, &mut writer).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(bytes.len(), 1 + 400);

        let allocator = DefaultAllocator::shared_dyn();
        let mut decoded: FrozenVector<u32> = FrozenVector::new();
        let mut buffer = ByteBuffer::new(7);
        buffer.flip();
        let mut reader = StreamReader::new(bytes.as_slice()).with_fragment(3);
        deserialize_fixed(&mut decoded, &allocator, &mut buffer, &mut reader).unwrap();
        assert_eq!(decoded.as_slice(), values.as_slice());
    }

    #[test]
    fn test_buffer_too_small_for_one_element() {
        let mut buffer = ByteBuffer::new(4);
        let err = serialize_fixed(&[1.0f64], &mut buffer, &mut BufferOnly).unwrap_err();
        assert!(matches!(err, PvError::InsufficientSpace { .. }));
    }

    #[test]
    fn test_decode_into_shared_leaves_other_holder() {
        let allocator = DefaultAllocator::shared_dyn();
        let mut value = FrozenVector::from(vec![9u8, 9, 9]);
        let other = value.clone();

        let mut buffer = ByteBuffer::for_reading(vec![2, 1, 2], ByteOrder::Big);
        deserialize_fixed(&mut value, &allocator, &mut buffer, &mut BufferOnly).unwrap();
        assert_eq!(value.as_slice(), &[1, 2]);
        assert_eq!(other.as_slice(), &[9, 9, 9]);
    }

    #[test]
    fn test_failed_decode_keeps_prior_value() {
        let allocator = DefaultAllocator::shared_dyn();
        let mut numbers = FrozenVector::from(vec![1u16, 2, 3]);
        let before = numbers.as_ptr();
        let mut buffer = ByteBuffer::for_reading(vec![4, 0, 7, 0], ByteOrder::Big);
        assert!(deserialize_fixed(&mut numbers, &allocator, &mut buffer, &mut BufferOnly).is_err());
        assert_eq!(numbers.as_slice(), &[1, 2, 3]);
        assert_eq!(numbers.as_ptr(), before);

        let mut text = FrozenVector::from(vec!["x".to_string(), "y".to_string()]);
        let mut buffer = ByteBuffer::for_reading(vec![1, 5, b'o', b'k'], ByteOrder::Big);
        assert!(deserialize_text(&mut text, &allocator, &mut buffer, &mut BufferOnly).is_err());
        assert_eq!(text.as_slice(), &["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_text_decode_replaces_contents() {
        let allocator = DefaultAllocator::shared_dyn();
        let mut value = FrozenVector::from(vec!["x".to_string(), "y".to_string(), "z".to_string()]);

        let mut buffer = ByteBuffer::for_reading(vec![1, 2, b'o', b'k'], ByteOrder::Big);
        deserialize_text(&mut value, &allocator, &mut buffer, &mut BufferOnly).unwrap();
        assert_eq!(value.as_slice(), &["ok".to_string()]);
    }

    #[test]
    fn test_huge_count_fails_on_missing_data() {
        let allocator = DefaultAllocator::shared_dyn();
        let header = vec![0xFE, 0x7F, 0xFF, 0xFF, 0xFF, 1, 2, 3];

        let mut doubles = FrozenVector::<f64>::new();
        let mut buffer = ByteBuffer::for_reading(header.clone(), ByteOrder::Big);
        let err = deserialize_fixed(&mut doubles, &allocator, &mut buffer, &mut BufferOnly)
            .unwrap_err();
        assert!(matches!(err, PvError::InsufficientSpace { .. }));
        assert!(doubles.is_empty());

        let mut texts = FrozenVector::<String>::new();
        let mut buffer = ByteBuffer::for_reading(header, ByteOrder::Big);
        assert!(deserialize_text(&mut texts, &allocator, &mut buffer, &mut BufferOnly).is_err());
        assert!(texts.is_empty());
    }
}
