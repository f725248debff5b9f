//! Array value behavior through the public API
//! Copy-on-write identity, record immutability and failure recovery

use std::{io, sync::Arc};

use pvwire::{
    allocators::AllocatorRegistry, serialize::BufferOnly, ArrayField, ArrayValue, ByteBuffer,
    ByteOrder, ChangeTracker, FrozenVector, ImmutabilityToken, PoolBuilder, PvError, Record,
    ScalarArray, ScalarType, StreamReader,
};

fn small_pool<T>(elements: usize) -> pvwire::VectorAllocator<T> {
    PoolBuilder::new()
        .name(format!("small {}", elements))
        .fixed(elements)
        .capped(4)
        .registry(Arc::new(AllocatorRegistry::new()))
        .build::<T>()
        .unwrap()
}

fn reader_over(bytes: &[u8]) -> (ByteBuffer, StreamReader<&[u8]>) {
    let mut buffer = ByteBuffer::new(16);
    buffer.flip();
    (buffer, StreamReader::new(bytes).with_fragment(2))
}

#[cfg(test)]
mod array_value_tests {
    use super::*;

    /// Test: freezing then thawing a sole handle reuses the same block
    #[test]
    fn test_freeze_thaw_identity() {
        let mut value = ArrayValue::<i64>::new("samples");
        value.put_from(&[10, 20, 30]).unwrap();

        let frozen = value.view();
        let ptr = frozen.as_ptr();
        drop(value);
        assert!(frozen.unique());

        let mut thawed = frozen.thaw().unwrap();
        assert_eq!(thawed.as_ptr(), ptr);
        thawed[1] = 21;
        assert_eq!(thawed.freeze().as_slice(), &[10, 21, 30]);
    }

    /// Test: views survive every later mutation
    #[test]
    fn test_views_are_stable() {
        let mut value = ArrayValue::<String>::new("names");
        value.put_from(&["a".to_string(), "b".to_string()]).unwrap();
        let first = value.view();

        value.set_length(5).unwrap();
        let second = value.view();
        value.set_length(1).unwrap();
        value.put_from(&["z".to_string()]).unwrap();

        assert_eq!(first.as_slice(), &["a".to_string(), "b".to_string()]);
        assert_eq!(second.len(), 5);
        assert_eq!(second[4], "");
        assert_eq!(value.as_slice(), &["z".to_string()]);
    }

    /// Test: shrinking keeps the block and growing back reuses it when unique
    #[test]
    fn test_set_length_shrink_then_grow() {
        let mut value = ArrayValue::<u32>::new("counts");
        value.put_from(&[1, 2, 3, 4]).unwrap();
        let ptr = value.view().as_ptr();

        value.set_length(2).unwrap();
        assert_eq!(value.as_slice(), &[1, 2]);
        assert_eq!(value.view().as_ptr(), ptr);

        value.set_length(4).unwrap();
        assert_eq!(value.as_slice(), &[1, 2, 0, 0]);
        assert_eq!(value.view().as_ptr(), ptr);
    }

    /// Test: freezing a record locks all of its fields
    #[test]
    fn test_record_freeze_locks_fields() {
        let mut record = Record::new("sensor");
        let mut readings = record.add_array::<f64>("readings");
        let mut labels = record.add_field(ArrayField::new("labels", ScalarType::String));

        readings.put_from(&[1.5, 2.5]).unwrap();
        labels.set_length(2).unwrap();
        assert!(record.changes().is_changed(1));
        assert!(!record.changes().is_changed(2));

        record.freeze();
        assert!(record.is_immutable());
        assert!(readings.is_immutable());
        assert!(labels.is_immutable());
        assert!(!readings.is_capacity_mutable());

        assert!(readings.set_length(0).unwrap_err().is_immutable());
        assert!(labels.set_length(0).unwrap_err().is_immutable());

        let mut buffer = ByteBuffer::for_reading(vec![1, 0, 0, 0, 0, 0, 0, 0, 0], ByteOrder::Big);
        assert!(readings
            .deserialize(&mut buffer, &mut BufferOnly)
            .unwrap_err()
            .is_immutable());
        assert_eq!(readings.as_slice(), &[1.5, 2.5]);

        // Capacity requests are ignored rather than refused
        readings.set_capacity(100).unwrap();
        assert!(readings.capacity() < 100);
    }

    /// Test: a stream ending early leaves a viewed value untouched
    #[test]
    fn test_eof_keeps_shared_value() {
        let mut record = Record::new("rec");
        let mut value = record.add_array::<u8>("bytes");
        value.put_from(&[1, 2, 3]).unwrap();
        let held = value.view();
        let posts = record.changes().post_count();

        let (mut buffer, mut reader) = reader_over(&[5, 9, 9]);
        let err = value.deserialize(&mut buffer, &mut reader).unwrap_err();
        match err {
            PvError::Io {
                source: Some(source),
                ..
            } => assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error {:?}", other),
        }

        assert_eq!(value.as_slice(), &[1, 2, 3]);
        assert_eq!(held.as_slice(), &[1, 2, 3]);
        assert_eq!(record.changes().post_count(), posts);
    }

    /// Test: a stream ending early leaves a sole owner's contents in place
    #[test]
    fn test_eof_keeps_unique_value() {
        let mut value = ArrayValue::<u8>::new("bytes");
        value.put_from(&[1, 2, 3]).unwrap();
        let ptr = value.view().as_ptr();

        let (mut buffer, mut reader) = reader_over(&[5, 9, 9]);
        assert!(value.deserialize(&mut buffer, &mut reader).is_err());
        assert_eq!(value.as_slice(), &[1, 2, 3]);
        assert_eq!(value.view().as_ptr(), ptr);

        let mut labels = ArrayValue::<String>::new("labels");
        labels.put_from(&["keep".to_string()]).unwrap();
        let (mut buffer, mut reader) = reader_over(&[2, 1, b'a', 4, b'b']);
        assert!(labels.deserialize(&mut buffer, &mut reader).is_err());
        assert_eq!(labels.as_slice(), &["keep".to_string()]);
    }

    /// Test: a frozen record refuses wholesale replacement
    #[test]
    fn test_frozen_record_refuses_put() {
        let mut record = Record::new("rec");
        let mut value = record.add_array::<i32>("v");
        value.put_from(&[1, 2]).unwrap();
        record.freeze();
        let posts = record.changes().post_count();

        assert!(value.put_from(&[9, 9, 9]).unwrap_err().is_immutable());
        assert!(value
            .replace(FrozenVector::from(vec![7]))
            .unwrap_err()
            .is_immutable());
        assert_eq!(value.as_slice(), &[1, 2]);
        assert_eq!(record.changes().post_count(), posts);
    }

    /// Test: moving a frozen field into another record keeps it frozen
    #[test]
    fn test_attach_cannot_unfreeze() {
        let mut value = ArrayValue::<i32>::new("v");
        value.set_immutable();
        value.attach(ImmutabilityToken::new(), Arc::new(ChangeTracker::new()), 1);
        assert!(value.is_immutable());
        assert!(value.set_length(3).unwrap_err().is_immutable());

        let mut frozen = Record::new("frozen");
        let mut field = frozen.add_array::<u8>("field");
        frozen.freeze();

        let mut fresh = Record::new("fresh");
        field.attach(ImmutabilityToken::new().child(), fresh.changes().clone(), 1);
        assert!(!fresh.is_immutable());
        assert!(field.is_immutable());
        assert!(field.put_from(&[1]).unwrap_err().is_immutable());
        // The unrelated record is still writable
        let mut other = fresh.add_array::<u8>("other");
        other.put_from(&[1]).unwrap();
    }

    /// Test: allocation failures leave the prior contents in place
    #[test]
    fn test_allocation_failure_restores_value() {
        let mut value = ArrayValue::<i32>::new("bounded").with_allocator(small_pool::<i32>(4));
        value.put_from(&[1, 2]).unwrap();

        let err = value.set_length(8).unwrap_err();
        assert!(err.is_allocation_failure());
        assert_eq!(value.as_slice(), &[1, 2]);

        let mut buffer = ByteBuffer::for_reading(vec![8; 1 + 8 * 4], ByteOrder::Big);
        let err = value.deserialize(&mut buffer, &mut BufferOnly).unwrap_err();
        assert!(err.is_allocation_failure());
        assert_eq!(value.as_slice(), &[1, 2]);

        // Still usable within the block size
        value.set_length(4).unwrap();
        assert_eq!(value.as_slice(), &[1, 2, 0, 0]);
    }

    /// Test: capacity comes in whole pool blocks
    #[test]
    fn test_capacity_from_pool() {
        let mut value = ArrayValue::<f32>::new("blocks").with_allocator(small_pool::<f32>(16));
        assert_eq!(value.capacity(), 0);

        value.set_capacity(3).unwrap();
        assert_eq!(value.capacity(), 16);
        assert_eq!(value.length(), 0);
        assert_eq!(value.view().allocator().map(|a| a.name().to_string()), Some("small 16".to_string()));
    }

    /// Test: swap exchanges contents with a frozen vector
    #[test]
    fn test_swap_exchanges_contents() {
        let mut value = ArrayValue::<bool>::new("flags");
        value.put_from(&[true, false]).unwrap();
        let mut other = FrozenVector::from(vec![false, false, true]);

        value.swap(&mut other).unwrap();
        assert_eq!(value.as_slice(), &[false, false, true]);
        assert_eq!(other.as_slice(), &[true, false]);
    }

    /// Test: the type-erased wrapper dispatches to the right element kind
    #[test]
    fn test_scalar_array_dispatch() {
        let mut record = Record::new("rec");
        let mut array = record.add_field(ArrayField::new("v", ScalarType::UShort));
        assert_eq!(array.scalar_type(), ScalarType::UShort);
        assert!(array.get::<i16>().is_none());

        array.get_mut::<u16>().unwrap().put_from(&[7, 8]).unwrap();
        assert_eq!(array.length(), 2);
        assert!(matches!(array, ScalarArray::UShort(_)));
        assert_eq!(record.changes().changed_offsets(), vec![1]);
    }
}
