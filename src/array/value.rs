//! Typed array values

use std::{fmt, mem, sync::Arc};

use log::debug;

use super::{element::Element, scalar_type::ArrayField};
use crate::{
    error::{PvError, Result},
    record::{ImmutabilityToken, PostHandler},
    serialize::{ByteBuffer, DeserializableControl, SerializableControl},
    shared_vector::{FrozenVector, SharedVector, VectorAllocator},
};

struct Owner {
    handler: Arc<dyn PostHandler>,
    field_offset: usize,
}

/// An array of `T` with copy-on-write storage.
///
/// The stored vector is always frozen, so [`ArrayValue::view`] can be kept
/// indefinitely. Mutations thaw it, copying only when a view is still held
/// elsewhere, and freeze the result back.
pub struct ArrayValue<T: Element> {
    field: Arc<ArrayField>,
    value: FrozenVector<T>,
    allocator: VectorAllocator<T>,
    capacity_mutable: bool,
    token: ImmutabilityToken,
    owner: Option<Owner>,
}

impl<T: Element> ArrayValue<T> {
    /// Empty, mutable, unattached value
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_field(ArrayField::new(name, T::SCALAR_TYPE))
    }

    /// Value for a descriptor; fails when the element kinds differ
    pub fn with_field(field: ArrayField) -> Result<Self> {
        if field.element_type() != T::SCALAR_TYPE {
            return Err(PvError::invalid_parameter(
                "field",
                format!(
                    "{} does not hold {} elements",
                    field.type_id(),
                    T::SCALAR_TYPE
                ),
            ));
        }
        Ok(Self::from_field(field))
    }

    pub(crate) fn from_field(field: ArrayField) -> Self {
        Self {
            field: Arc::new(field),
            value: FrozenVector::new(),
            allocator: VectorAllocator::shared(),
            capacity_mutable: true,
            token: ImmutabilityToken::new(),
            owner: None,
        }
    }

    /// Grow storage from `allocator` instead of the shared default
    pub fn with_allocator(mut self, allocator: VectorAllocator<T>) -> Self {
        self.allocator = allocator;
        self
    }

    /// Join a record: take its token and report changes to `handler`.
    ///
    /// A value that is already immutable stays immutable under the new token.
    pub fn attach(
        &mut self,
        token: ImmutabilityToken,
        handler: Arc<dyn PostHandler>,
        field_offset: usize,
    ) {
        let frozen = self.is_immutable();
        self.token = token;
        if frozen {
            self.token.freeze();
        }
        self.owner = Some(Owner {
            handler,
            field_offset,
        });
    }

    pub fn field(&self) -> &ArrayField {
        &self.field
    }

    pub fn allocator(&self) -> &VectorAllocator<T> {
        &self.allocator
    }

    pub fn length(&self) -> usize {
        self.value.len()
    }

    pub fn capacity(&self) -> usize {
        self.value.capacity()
    }

    /// Current contents; never changes under the caller
    pub fn view(&self) -> FrozenVector<T> {
        self.value.clone()
    }

    pub fn as_slice(&self) -> &[T] {
        self.value.as_slice()
    }

    pub fn is_immutable(&self) -> bool {
        self.token.is_immutable()
    }

    /// Make this value immutable; cannot be undone
    pub fn set_immutable(&mut self) {
        self.capacity_mutable = false;
        self.token.freeze();
    }

    pub fn is_capacity_mutable(&self) -> bool {
        !self.is_immutable() && self.capacity_mutable
    }

    pub fn set_capacity_mutable(&mut self, capacity_mutable: bool) -> Result<()> {
        if capacity_mutable && self.is_immutable() {
            return Err(PvError::immutable(self.field.name()));
        }
        self.capacity_mutable = capacity_mutable;
        Ok(())
    }

    /// Reserve room for `capacity` elements without changing the length.
    ///
    /// Ignored unless the capacity is mutable.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        if !self.is_capacity_mutable() {
            debug!("'{}' capacity is not mutable, ignoring", self.field.name());
            return Ok(());
        }
        if capacity <= self.capacity() {
            return Ok(());
        }
        self.modify(|next| next.reserve(capacity))
    }

    /// Change the length; new elements are default-valued
    pub fn set_length(&mut self, length: usize) -> Result<()> {
        if self.is_immutable() {
            return Err(PvError::immutable(self.field.name()));
        }
        if length == self.length() {
            return Ok(());
        }
        if length < self.length() {
            self.value.slice(0, length);
            return Ok(());
        }
        self.modify(|next| next.resize(length))
    }

    /// Install `next` as the contents and notify the owner
    pub fn replace(&mut self, next: FrozenVector<T>) -> Result<()> {
        if self.is_immutable() {
            return Err(PvError::immutable(self.field.name()));
        }
        self.value = next;
        self.post_put();
        Ok(())
    }

    /// Copy `values` in as the new contents
    pub fn put_from(&mut self, values: &[T]) -> Result<()> {
        if self.is_immutable() {
            return Err(PvError::immutable(self.field.name()));
        }
        let mut next = self.allocator.allocate(values.len())?;
        next.clone_from_slice(values);
        self.replace(next.freeze())
    }

    /// Exchange contents with `other` without notifying
    pub fn swap(&mut self, other: &mut FrozenVector<T>) -> Result<()> {
        if self.is_immutable() {
            return Err(PvError::immutable(self.field.name()));
        }
        mem::swap(&mut self.value, other);
        Ok(())
    }

    /// Write the whole array
    pub fn serialize<C>(&self, buffer: &mut ByteBuffer, control: &mut C) -> Result<()>
    where
        C: SerializableControl + ?Sized,
    {
        T::serialize_elements(self.value.as_slice(), buffer, control)
    }

    /// Write `count` elements from `offset`, clamped to the current length
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
        let mut range = self.value.clone();
        range.slice(offset, count);
        T::serialize_elements(range.as_slice(), buffer, control)
    }

    /// Replace the contents with an array read from the stream.
    ///
    /// On any error the prior contents are kept. The owner is notified once
    /// on success.
    pub fn deserialize<C>(&mut self, buffer: &mut ByteBuffer, control: &mut C) -> Result<()>
    where
        C: DeserializableControl + ?Sized,
    {
        if self.is_immutable() {
            return Err(PvError::immutable(self.field.name()));
        }
        T::deserialize_array(&mut self.value, self.allocator.raw(), buffer, control)?;
        self.post_put();
        Ok(())
    }

    /// Apply `change` to a writable copy and freeze it back.
    ///
    /// A unique block is changed in place. A shared one is copied first and
    /// left alone if the change fails.
    fn modify(&mut self, change: impl FnOnce(&mut SharedVector<T>) -> Result<()>) -> Result<()> {
        let taken = self.value.unique();
        let mut next = if taken {
            mem::take(&mut self.value).thaw_in(self.allocator.raw())?
        } else {
            self.value.clone().thaw_in(self.allocator.raw())?
        };

        match change(&mut next) {
            Ok(()) => {
                self.value = next.freeze();
                Ok(())
            }
            Err(err) => {
                if taken {
                    self.value = next.freeze();
                }
                Err(err)
            }
        }
    }

    fn post_put(&self) {
        if let Some(owner) = &self.owner {
            owner.handler.post_put(owner.field_offset);
        }
    }
}

/// Equal when the descriptors and contents match
impl<T: Element> PartialEq for ArrayValue<T> {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.value == other.value
    }
}

impl<T: Element> fmt::Debug for ArrayValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayValue")
            .field("field", &self.field.to_string())
            .field("value", &self.value)
            .field("immutable", &self.is_immutable())
            .field("allocator", &self.allocator.name())
            .finish()
    }
}
