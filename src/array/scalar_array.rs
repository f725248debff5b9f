//! Array values of any element kind

use std::sync::Arc;

use super::{
    element::Element,
    scalar_type::{ArrayField, ScalarType},
    value::ArrayValue,
};
use crate::{
    error::Result,
    record::{ImmutabilityToken, PostHandler},
    serialize::{ByteBuffer, DeserializableControl, SerializableControl},
};

/// An [`ArrayValue`] of whichever kind its descriptor names
#[derive(Debug, PartialEq)]
pub enum ScalarArray {
    Boolean(ArrayValue<bool>),
    Byte(ArrayValue<i8>),
    Short(ArrayValue<i16>),
    Int(ArrayValue<i32>),
    Long(ArrayValue<i64>),
    UByte(ArrayValue<u8>),
    UShort(ArrayValue<u16>),
    UInt(ArrayValue<u32>),
    ULong(ArrayValue<u64>),
    Float(ArrayValue<f32>),
    Double(ArrayValue<f64>),
    String(ArrayValue<String>),
}

macro_rules! dispatch {
    ($array:expr, $value:ident => $body:expr) => {
        match $array {
            ScalarArray::Boolean($value) => $body,
            ScalarArray::Byte($value) => $body,
            ScalarArray::Short($value) => $body,
            ScalarArray::Int($value) => $body,
            ScalarArray::Long($value) => $body,
            ScalarArray::UByte($value) => $body,
            ScalarArray::UShort($value) => $body,
            ScalarArray::UInt($value) => $body,
            ScalarArray::ULong($value) => $body,
            ScalarArray::Float($value) => $body,
            ScalarArray::Double($value) => $body,
            ScalarArray::String($value) => $body,
        }
    };
}

/// Create an empty array value for `field`
pub fn create_array(field: ArrayField) -> ScalarArray {
    match field.element_type() {
        ScalarType::Boolean => ScalarArray::Boolean(ArrayValue::from_field(field)),
        ScalarType::Byte => ScalarArray::Byte(ArrayValue::from_field(field)),
        ScalarType::Short => ScalarArray::Short(ArrayValue::from_field(field)),
        ScalarType::Int => ScalarArray::Int(ArrayValue::from_field(field)),
        ScalarType::Long => ScalarArray::Long(ArrayValue::from_field(field)),
        ScalarType::UByte => ScalarArray::UByte(ArrayValue::from_field(field)),
        ScalarType::UShort => ScalarArray::UShort(ArrayValue::from_field(field)),
        ScalarType::UInt => ScalarArray::UInt(ArrayValue::from_field(field)),
        ScalarType::ULong => ScalarArray::ULong(ArrayValue::from_field(field)),
        ScalarType::Float => ScalarArray::Float(ArrayValue::from_field(field)),
        ScalarType::Double => ScalarArray::Double(ArrayValue::from_field(field)),
        ScalarType::String => ScalarArray::String(ArrayValue::from_field(field)),
    }
}

impl ScalarArray {
    pub fn field(&self) -> &ArrayField {
        dispatch!(self, value => value.field())
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.field().element_type()
    }

    /// The typed value, when it holds `T`
    pub fn get<T: Element>(&self) -> Option<&ArrayValue<T>> {
        T::from_scalar_array(self)
    }

    pub fn get_mut<T: Element>(&mut self) -> Option<&mut ArrayValue<T>> {
        T::from_scalar_array_mut(self)
    }

    pub fn length(&self) -> usize {
        dispatch!(self, value => value.length())
    }

    pub fn capacity(&self) -> usize {
        dispatch!(self, value => value.capacity())
    }

    pub fn set_length(&mut self, length: usize) -> Result<()> {
        dispatch!(self, value => value.set_length(length))
    }

    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        dispatch!(self, value => value.set_capacity(capacity))
    }

    pub fn is_immutable(&self) -> bool {
        dispatch!(self, value => value.is_immutable())
    }

    pub fn set_immutable(&mut self) {
        dispatch!(self, value => value.set_immutable())
    }

    pub fn is_capacity_mutable(&self) -> bool {
        dispatch!(self, value => value.is_capacity_mutable())
    }

    pub fn set_capacity_mutable(&mut self, capacity_mutable: bool) -> Result<()> {
        dispatch!(self, value => value.set_capacity_mutable(capacity_mutable))
    }

    pub fn attach(
        &mut self,
        token: ImmutabilityToken,
        handler: Arc<dyn PostHandler>,
        field_offset: usize,
    ) {
        dispatch!(self, value => value.attach(token, handler, field_offset))
    }

    pub fn serialize<C>(&self, buffer: &mut ByteBuffer, control: &mut C) -> Result<()>
    where
        C: SerializableControl + ?Sized,
    {
        dispatch!(self, value => value.serialize(buffer, control))
    }

    pub fn serialize_range<C>(
        &self,
        buffer: &mut ByteBuffer,
        control: &mut C,
        offset: usize,
        count: usize,
    ) -> Result<()>
    where
        C: SerializableControl + ?Sized,
    {
        dispatch!(self, value => value.serialize_range(buffer, control, offset, count))
    }

    pub fn deserialize<C>(&mut self, buffer: &mut ByteBuffer, control: &mut C) -> Result<()>
    where
        C: DeserializableControl + ?Sized,
    {
        dispatch!(self, value => value.deserialize(buffer, control))
    }
}

impl<T: Element> From<ArrayValue<T>> for ScalarArray {
    fn from(value: ArrayValue<T>) -> Self {
        T::into_scalar_array(value)
    }
}
