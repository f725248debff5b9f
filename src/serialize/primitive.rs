//! Fixed-width wire primitives

use std::{fmt, mem, slice};

use super::byte_buffer::ByteOrder;

mod sealed {
    pub trait Sealed {}
}

/// A value with a fixed-width wire representation
pub trait Primitive:
    Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static + sealed::Sealed
{
    /// Encoded width in bytes
    const WIDTH: usize;

    /// Whether every bit pattern of `WIDTH` bytes is a valid value
    const ANY_BIT_PATTERN: bool;

    /// Encode into the first `WIDTH` bytes of `out`
    fn write_bytes(self, order: ByteOrder, out: &mut [u8]);

    /// Decode from the first `WIDTH` bytes of `input`
    fn read_bytes(order: ByteOrder, input: &[u8]) -> Self;
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Primitive for $ty {
                const WIDTH: usize = mem::size_of::<$ty>();
                const ANY_BIT_PATTERN: bool = true;

                #[inline]
                fn write_bytes(self, order: ByteOrder, out: &mut [u8]) {
                    let bytes = match order {
                        ByteOrder::Big => self.to_be_bytes(),
                        ByteOrder::Little => self.to_le_bytes(),
                    };
                    out[..Self::WIDTH].copy_from_slice(&bytes);
                }

                #[inline]
                fn read_bytes(order: ByteOrder, input: &[u8]) -> Self {
                    let mut bytes = [0u8; mem::size_of::<$ty>()];
                    bytes.copy_from_slice(&input[..Self::WIDTH]);
                    match order {
                        ByteOrder::Big => <$ty>::from_be_bytes(bytes),
                        ByteOrder::Little => <$ty>::from_le_bytes(bytes),
                    }
                }
            }
        )*
    };
}

impl_primitive!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl sealed::Sealed for bool {}

impl Primitive for bool {
    const WIDTH: usize = 1;
    const ANY_BIT_PATTERN: bool = false;

    #[inline]
    fn write_bytes(self, _order: ByteOrder, out: &mut [u8]) {
        out[0] = self as u8;
    }

    #[inline]
    fn read_bytes(_order: ByteOrder, input: &[u8]) -> Self {
        input[0] != 0
    }
}

/// View elements as their in-memory bytes
pub fn as_raw_bytes<T: Primitive>(values: &[T]) -> &[u8] {
    unsafe { slice::from_raw_parts(values.as_ptr() as *const u8, mem::size_of_val(values)) }
}

/// Writable byte view, or `None` when some byte patterns are invalid for `T`
pub fn as_raw_bytes_mut<T: Primitive>(values: &mut [T]) -> Option<&mut [u8]> {
    if !T::ANY_BIT_PATTERN {
        return None;
    }
    let len = mem::size_of_val(values);
    Some(unsafe { slice::from_raw_parts_mut(values.as_mut_ptr() as *mut u8, len) })
}
