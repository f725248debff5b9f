//! Record-side interface consumed by array values
//!
//! A record hands each child an [`ImmutabilityToken`] and a [`PostHandler`].
//! The token answers "is this value or any enclosing record immutable"; the
//! handler receives one notification per mutation, keyed by field offset.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use log::debug;

use crate::array::{ArrayField, ArrayValue, Element, ScalarArray};

/// One-way immutability flags of a value and its enclosing records
#[derive(Debug, Clone, Default)]
pub struct ImmutabilityToken {
    /// Own flag first, then one per enclosing record, innermost first
    flags: Vec<Arc<AtomicBool>>,
}

impl ImmutabilityToken {
    /// Token of a value with no enclosing record
    pub fn new() -> Self {
        Self {
            flags: vec![Arc::new(AtomicBool::new(false))],
        }
    }

    /// Token for a value nested inside the holder of `self`
    pub fn child(&self) -> Self {
        let mut flags = Vec::with_capacity(self.flags.len() + 1);
        flags.push(Arc::new(AtomicBool::new(false)));
        flags.extend(self.flags.iter().cloned());
        Self { flags }
    }

    /// Mark this holder immutable; cannot be undone
    pub fn freeze(&self) {
        if let Some(own) = self.flags.first() {
            own.store(true, Ordering::Release);
        }
    }

    pub fn is_immutable(&self) -> bool {
        self.flags.iter().any(|flag| flag.load(Ordering::Acquire))
    }
}

/// Receiver of post-mutation notifications
pub trait PostHandler: Send + Sync {
    /// Called once after the field at `field_offset` changed
    fn post_put(&self, field_offset: usize);
}

/// Records which fields changed, as a bit vector of field offsets
#[derive(Default)]
pub struct ChangeTracker {
    words: Mutex<Vec<u64>>,
    posts: AtomicU64,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_changed(&self, field_offset: usize) -> bool {
        let words = self.lock_words();
        words
            .get(field_offset / 64)
            .map_or(false, |word| word & (1 << (field_offset % 64)) != 0)
    }

    /// Changed offsets in ascending order
    pub fn changed_offsets(&self) -> Vec<usize> {
        let words = self.lock_words();
        let mut offsets = Vec::new();
        for (index, &word) in words.iter().enumerate() {
            let mut bits = word;
            while bits != 0 {
                let bit = bits.trailing_zeros() as usize;
                offsets.push(index * 64 + bit);
                bits &= bits - 1;
            }
        }
        offsets
    }

    /// Total notifications received
    pub fn post_count(&self) -> u64 {
        self.posts.load(Ordering::Relaxed)
    }

    /// Forget recorded changes; the notification count is kept
    pub fn clear(&self) {
        self.lock_words().iter_mut().for_each(|word| *word = 0);
    }

    fn lock_words(&self) -> MutexGuard<'_, Vec<u64>> {
        self.words.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PostHandler for ChangeTracker {
    fn post_put(&self, field_offset: usize) {
        self.posts.fetch_add(1, Ordering::Relaxed);
        let mut words = self.lock_words();
        let index = field_offset / 64;
        if words.len() <= index {
            words.resize(index + 1, 0);
        }
        words[index] |= 1 << (field_offset % 64);
    }
}

impl fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("changed", &self.changed_offsets())
            .field("posts", &self.post_count())
            .finish()
    }
}

/// A flat record of array fields.
///
/// The record itself sits at offset 0; fields get offsets from 1 in the
/// order they are added.
#[derive(Debug)]
pub struct Record {
    name: String,
    token: ImmutabilityToken,
    changes: Arc<ChangeTracker>,
    fields: Vec<ArrayField>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: ImmutabilityToken::new(),
            changes: Arc::new(ChangeTracker::new()),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptors of the fields added so far
    pub fn fields(&self) -> &[ArrayField] {
        &self.fields
    }

    /// Add a typed array field
    pub fn add_array<T: Element>(&mut self, name: impl Into<String>) -> ArrayValue<T> {
        let mut value = ArrayValue::<T>::new(name);
        self.attach_value(&mut value);
        value
    }

    /// Add an array field of the kind `field` describes
    pub fn add_field(&mut self, field: ArrayField) -> ScalarArray {
        let mut array = crate::array::create_array(field);
        let offset = self.next_offset(array.field().clone());
        array.attach(self.token.child(), self.changes.clone(), offset);
        array
    }

    /// Make the record and every attached field immutable
    pub fn freeze(&self) {
        debug!("record '{}' frozen with {} fields", self.name, self.fields.len());
        self.token.freeze();
    }

    pub fn is_immutable(&self) -> bool {
        self.token.is_immutable()
    }

    /// Change notifications from attached fields
    pub fn changes(&self) -> &Arc<ChangeTracker> {
        &self.changes
    }

    fn attach_value<T: Element>(&mut self, value: &mut ArrayValue<T>) {
        let offset = self.next_offset(value.field().clone());
        value.attach(self.token.child(), self.changes.clone(), offset);
    }

    fn next_offset(&mut self, field: ArrayField) -> usize {
        self.fields.push(field);
        self.fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_nesting() {
        let outer = ImmutabilityToken::new();
        let inner = outer.child();
        let leaf = inner.child();
        assert!(!leaf.is_immutable());

        inner.freeze();
        assert!(leaf.is_immutable());
        assert!(!outer.is_immutable());
    }

    #[test]
    fn test_change_tracker_bits() {
        let tracker = ChangeTracker::new();
        tracker.post_put(3);
        tracker.post_put(70);
        tracker.post_put(3);
        assert_eq!(tracker.changed_offsets(), vec![3, 70]);
        assert_eq!(tracker.post_count(), 3);
        assert!(tracker.is_changed(70));

        tracker.clear();
        assert!(tracker.changed_offsets().is_empty());
        assert!(!tracker.is_changed(3));
    }

    #[test]
    fn test_record_freeze_reaches_fields() {
        let mut record = Record::new("sample");
        let mut values = record.add_array::<f64>("values");
        let mut labels = record.add_field(ArrayField::new("labels", crate::array::ScalarType::String));

        values.put_from(&[1.0, 2.0]).unwrap();
        assert_eq!(record.changes().changed_offsets(), vec![1]);

        record.freeze();
        assert!(values.is_immutable());
        assert!(labels.is_immutable());
        assert!(values.set_length(5).unwrap_err().is_immutable());
        assert!(labels.set_length(1).unwrap_err().is_immutable());
        assert_eq!(record.fields().len(), 2);
    }
}
