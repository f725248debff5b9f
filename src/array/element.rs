//! Element kinds storable in an array value

use std::{fmt, sync::Arc};

use super::{codec, scalar_array::ScalarArray, scalar_type::ScalarType, value::ArrayValue};
use crate::{
    allocators::BlockAllocator,
    error::Result,
    serialize::{ByteBuffer, DeserializableControl, SerializableControl},
    shared_vector::FrozenVector,
};

mod sealed {
    pub trait Sealed {}
}

/// An element type with a wire codec.
///
/// Implemented for `bool`, the 8 to 64 bit integers, `f32`, `f64` and
/// `String`.
pub trait Element:
    Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static + sealed::Sealed
{
    /// Kind reported by the introspection descriptor
    const SCALAR_TYPE: ScalarType;

    /// Write a count followed by `values`
    fn serialize_elements<C>(
        values: &[Self],
        buffer: &mut ByteBuffer,
        control: &mut C,
    ) -> Result<()>
    where
        C: SerializableControl + ?Sized;

    /// Replace `value` with an array read from the stream
    fn deserialize_array<C>(
        value: &mut FrozenVector<Self>,
        allocator: &Arc<dyn BlockAllocator>,
        buffer: &mut ByteBuffer,
        control: &mut C,
    ) -> Result<()>
    where
        C: DeserializableControl + ?Sized;

    /// Wrap a typed value in the factory union
    fn into_scalar_array(value: ArrayValue<Self>) -> ScalarArray;

    fn from_scalar_array(array: &ScalarArray) -> Option<&ArrayValue<Self>>;

    fn from_scalar_array_mut(array: &mut ScalarArray) -> Option<&mut ArrayValue<Self>>;
}

macro_rules! impl_element {
    ($ty:ty, $kind:ident, $serialize:path, $deserialize:path) => {
        impl sealed::Sealed for $ty {}

        impl Element for $ty {
            const SCALAR_TYPE: ScalarType = ScalarType::$kind;

            fn serialize_elements<C>(
                values: &[Self],
                buffer: &mut ByteBuffer,
                control: &mut C,
            ) -> Result<()>
            where
                C: SerializableControl + ?Sized,
            {
                $serialize(values, buffer, control)
            }

            fn deserialize_array<C>(
                value: &mut FrozenVector<Self>,
                allocator: &Arc<dyn BlockAllocator>,
                buffer: &mut ByteBuffer,
                control: &mut C,
            ) -> Result<()>
            where
                C: DeserializableControl + ?Sized,
            {
                $deserialize(value, allocator, buffer, control)
            }

            fn into_scalar_array(value: ArrayValue<Self>) -> ScalarArray {
                ScalarArray::$kind(value)
            }

            fn from_scalar_array(array: &ScalarArray) -> Option<&ArrayValue<Self>> {
                match array {
                    ScalarArray::$kind(value) => Some(value),
                    _ => None,
                }
            }

            fn from_scalar_array_mut(array: &mut ScalarArray) -> Option<&mut ArrayValue<Self>> {
                match array {
                    ScalarArray::$kind(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
    ($ty:ty, $kind:ident) => {
        impl_element!($ty, $kind, codec::serialize_fixed, codec::deserialize_fixed);
    };
}

impl_element!(bool, Boolean);
impl_element!(i8, Byte);
impl_element!(i16, Short);
impl_element!(i32, Int);
impl_element!(i64, Long);
impl_element!(u8, UByte);
impl_element!(u16, UShort);
impl_element!(u32, UInt);
impl_element!(u64, ULong);
impl_element!(f32, Float);
impl_element!(f64, Double);
impl_element!(String, String, codec::serialize_text, codec::deserialize_text);
