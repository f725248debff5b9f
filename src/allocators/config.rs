//! Pool configuration and builder

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use super::{
    default::DefaultAllocator, pool::FreelistAllocator, registry::AllocatorRegistry,
    traits::BlockAllocator,
};
use crate::error::{PvError, Result};

/// Longest pool name kept; longer names are truncated
pub const MAX_POOL_NAME: usize = 59;

/// How many blocks a fixed-size pool hands out and keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolPolicy {
    /// No cap on outstanding blocks, every released block is kept
    Unbounded,
    /// At most `n` blocks outstanding; request `n + 1` fails
    Capped(usize),
    /// No cap on outstanding blocks, at most `n` released blocks kept
    Cached(usize),
}

impl PoolPolicy {
    /// Outstanding cap or free-list bound
    pub fn limit(&self) -> usize {
        match self {
            PoolPolicy::Unbounded => usize::MAX,
            PoolPolicy::Capped(n) | PoolPolicy::Cached(n) => *n,
        }
    }

    /// Whether allocations past the limit fail
    pub fn is_capped(&self) -> bool {
        matches!(self, PoolPolicy::Capped(_))
    }
}

/// Configuration for allocation pools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Name of the pool, shown in diagnostics
    pub name: String,
    /// Elements per block; `None` selects the shared dynamic allocator
    pub block_elements: Option<usize>,
    /// Retention policy for fixed-size pools
    pub policy: PoolPolicy,
    /// Blocks allocated up front
    pub initial_count: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            block_elements: None,
            policy: PoolPolicy::Unbounded,
            initial_count: 1,
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with custom name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: truncate_name(name.into()),
            ..Default::default()
        }
    }

    /// Use fixed-size blocks of `elements` elements
    pub fn with_fixed(mut self, elements: usize) -> Self {
        self.block_elements = Some(elements);
        self
    }

    /// Set the retention policy
    pub fn with_policy(mut self, policy: PoolPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set initial block count
    pub fn with_initial_count(mut self, count: usize) -> Self {
        self.initial_count = count;
        self
    }

    /// Whether this configuration describes a fixed-size pool
    pub fn is_fixed(&self) -> bool {
        self.block_elements.is_some()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let Some(elements) = self.block_elements else {
            // Everything else is ignored for the dynamic allocator
            return Ok(());
        };

        if elements == 0 {
            return Err(PvError::invalid_parameter(
                "fixed",
                "fixed() allocation size must be > 0",
            ));
        }

        if self.initial_count > self.policy.limit() {
            return Err(PvError::invalid_parameter(
                "initial",
                format!(
                    "initial count {} exceeds pool limit {}",
                    self.initial_count,
                    self.policy.limit()
                ),
            ));
        }

        Ok(())
    }
}

/// Builder for allocation pools.
///
/// Without [`PoolBuilder::fixed`] the result is always the shared dynamic
/// allocator and the other options are ignored.
///
/// ```
/// use pvwire::allocators::PoolBuilder;
///
/// let alloc = PoolBuilder::new()
///     .name(format!("my pool {}", 1))
///     .fixed(1024)
///     .capped(5)
///     .build::<i32>()
///     .unwrap();
/// let buffer = alloc.allocate(1024).unwrap();
/// assert_eq!(buffer.len(), 1024);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PoolBuilder {
    config: PoolConfig,
    registry: Option<Arc<AllocatorRegistry>>,
}

impl PoolBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: PoolConfig) -> Self {
        Self {
            config,
            registry: None,
        }
    }

    /// Set the pool name; longer than [`MAX_POOL_NAME`] characters is truncated
    pub fn name(mut self, name: impl fmt::Display) -> Self {
        self.config.name = truncate_name(name.to_string());
        self
    }

    /// A pool which only allows allocations of one fixed size, in elements
    pub fn fixed(mut self, elements: usize) -> Self {
        self.config.block_elements = Some(elements);
        self
    }

    /// A pool which allows allocations of any size
    pub fn dynamic(mut self) -> Self {
        self.config.block_elements = None;
        self
    }

    /// Allow `n` outstanding allocations; allocation `n + 1` fails
    pub fn capped(mut self, n: usize) -> Self {
        self.config.policy = PoolPolicy::Capped(n);
        self
    }

    /// No limit on outstanding allocations; cache up to `n` released blocks
    pub fn cached(mut self, n: usize) -> Self {
        self.config.policy = PoolPolicy::Cached(n);
        self
    }

    /// Initial pool stock
    pub fn initial(mut self, count: usize) -> Self {
        self.config.initial_count = count;
        self
    }

    /// Register the pool with `registry` instead of the global one
    pub fn registry(mut self, registry: Arc<AllocatorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The configuration built so far
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Build an untyped allocator for elements of `element_size` bytes
    pub fn build_raw(self, element_size: usize) -> Result<Arc<dyn BlockAllocator>> {
        if element_size == 0 {
            return Err(PvError::invalid_parameter(
                "element_size",
                "element size must be > 0",
            ));
        }

        self.config.validate()?;

        let Some(elements) = self.config.block_elements else {
            return Ok(DefaultAllocator::shared_dyn());
        };

        let registry = self
            .registry
            .unwrap_or_else(|| Arc::clone(AllocatorRegistry::global()));

        let pool = FreelistAllocator::new(
            self.config.name,
            element_size,
            elements,
            self.config.policy.limit(),
            self.config.initial_count,
            self.config.policy.is_capped(),
            registry,
        )?;
        Ok(pool)
    }
}

fn truncate_name(name: String) -> String {
    if name.chars().count() <= MAX_POOL_NAME {
        name
    } else {
        name.chars().take(MAX_POOL_NAME).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocators::same_allocator;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert!(!config.is_fixed());
        assert_eq!(config.initial_count, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = PoolConfig::new("zero").with_fixed(0);
        assert!(config.validate().is_err());

        let config = PoolConfig::new("over")
            .with_fixed(16)
            .with_policy(PoolPolicy::Capped(2))
            .with_initial_count(3);
        assert!(config.validate().is_err());

        let config = PoolConfig::new("ok")
            .with_fixed(16)
            .with_policy(PoolPolicy::Cached(3))
            .with_initial_count(3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dynamic_yields_shared_default() {
        let a = PoolBuilder::new().name("ignored").capped(3).build_raw(4).unwrap();
        let b = PoolBuilder::new().dynamic().build_raw(8).unwrap();
        assert!(same_allocator(&a, &b));
        assert!(same_allocator(&a, &DefaultAllocator::shared_dyn()));
    }

    #[test]
    fn test_name_truncated() {
        let builder = PoolBuilder::new().name("x".repeat(100));
        assert_eq!(builder.config().name.len(), MAX_POOL_NAME);

        let builder = PoolBuilder::new().name(format!("pool {}", 7));
        assert_eq!(builder.config().name, "pool 7");
    }

    #[test]
    fn test_policy_serde() {
        let config = PoolConfig::new("serde")
            .with_fixed(16)
            .with_policy(PoolPolicy::Cached(2));
        let json = serde_json::to_string(&config).unwrap();
        let back: PoolConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
