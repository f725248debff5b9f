//! Registry of live allocators for diagnostic enumeration

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, Weak,
    },
};

use super::{stats::AllocatorInfo, traits::BlockAllocator};

lazy_static::lazy_static! {
    static ref GLOBAL_REGISTRY: Arc<AllocatorRegistry> = Arc::new(AllocatorRegistry::new());
}

/// Identifier handed out at registration
pub type RegistrationId = u64;

#[derive(Debug)]
struct RegistryEntry {
    id: RegistrationId,
    allocator: Weak<dyn BlockAllocator>,
}

/// Weak index of every live allocator.
///
/// Allocators register themselves on construction and deregister on drop.
/// A process normally uses [`AllocatorRegistry::global`], but pools may be
/// pointed at a private registry through the pool builder.
#[derive(Debug)]
pub struct AllocatorRegistry {
    entries: Mutex<Vec<RegistryEntry>>,
    next_id: AtomicU64,
}

impl AllocatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// The process-wide registry
    pub fn global() -> &'static Arc<AllocatorRegistry> {
        &GLOBAL_REGISTRY
    }

    /// Add an allocator; returns the id to pass to [`AllocatorRegistry::deregister`]
    pub fn register(&self, allocator: Weak<dyn BlockAllocator>) -> RegistrationId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock_entries().push(RegistryEntry { id, allocator });
        id
    }

    /// Remove an allocator
    pub fn deregister(&self, id: RegistrationId) {
        self.lock_entries().retain(|entry| entry.id != id);
    }

    /// Number of registered allocators
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Whether no allocator is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot every live allocator, in registration order
    pub fn collect_info(&self) -> Vec<AllocatorInfo> {
        // Upgrade under the lock, query after releasing it: dropping the last
        // strong reference deregisters, which takes the same lock.
        let live: Vec<Arc<dyn BlockAllocator>> = {
            let entries = self.lock_entries();
            entries
                .iter()
                .filter_map(|entry| entry.allocator.upgrade())
                .collect()
        };

        live.iter().map(|allocator| allocator.info()).collect()
    }

    /// Render the allocator report
    pub fn report(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_report(&mut out);
        out
    }

    /// Write the allocator report into `out`
    pub fn write_report(&self, out: &mut impl fmt::Write) -> fmt::Result {
        out.write_str("# Allocator info\n")?;
        for info in self.collect_info() {
            write!(out, "{}", info)?;
        }
        out.write_str("# End Allocator info\n")
    }

    fn lock_entries(&self) -> MutexGuard<'_, Vec<RegistryEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for AllocatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocators::PoolBuilder;

    #[test]
    fn test_register_and_drop() {
        let registry = Arc::new(AllocatorRegistry::new());
        assert!(registry.is_empty());

        let pool = PoolBuilder::new()
            .name("transient")
            .fixed(4)
            .cached(1)
            .registry(Arc::clone(&registry))
            .build_raw(8)
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.collect_info()[0].name, "transient");

        drop(pool);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_empty_report() {
        let registry = AllocatorRegistry::new();
        assert_eq!(registry.report(), "# Allocator info\n# End Allocator info\n");
    }
}
