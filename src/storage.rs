//! Binding registry
//!
//! Uses DashMap for lock-free concurrent reads. Registration normally
//! happens during start-up; later rebinding is still safe since each shard
//! guards its own read-modify-write.

use crate::{Binding, ServiceKey};
use ahash::RandomState;
use dashmap::DashMap;

/// Thread-safe map from service key to binding
pub struct BindingRegistry {
    bindings: DashMap<ServiceKey, Binding, RandomState>,
}

impl BindingRegistry {
    /// Create new empty registry with optimized shard count.
    ///
    /// Default DashMap uses num_cpus * 4 shards which is overkill for
    /// typical containers with <50 services.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create with pre-allocated capacity and optimized shards.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        // Scale shards based on expected capacity and concurrency needs
        let shard_amount = if capacity <= 16 {
            8
        } else if capacity <= 64 {
            16
        } else {
            32
        };
        Self {
            bindings: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
        }
    }

    /// Register or replace the binding for its key.
    ///
    /// Returns the binding it replaced, if any.
    #[inline]
    pub fn bind(&self, binding: Binding) -> Option<Binding> {
        self.bindings.insert(binding.key().clone(), binding)
    }

    /// Binding registered for `key`
    #[inline]
    pub fn lookup(&self, key: &ServiceKey) -> Option<Binding> {
        self.bindings.get(key).map(|binding| binding.value().clone())
    }

    #[inline]
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.bindings.contains_key(key)
    }

    /// Remove a binding
    #[inline]
    pub fn remove(&self, key: &ServiceKey) -> Option<Binding> {
        self.bindings.remove(key).map(|(_, binding)| binding)
    }

    /// Get number of registered bindings
    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Get all registered keys
    pub fn keys(&self) -> Vec<ServiceKey> {
        self.bindings.iter().map(|r| r.key().clone()).collect()
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Lifetime, Strategy};
    use std::sync::Arc;

    struct TestService {
        value: i32,
    }

    fn binding(value: i32, lifetime: Lifetime) -> Binding {
        Binding::new(
            ServiceKey::of::<TestService>(),
            Strategy::explicit(move |_| Ok(Arc::new(TestService { value }))),
            lifetime,
        )
    }

    #[test]
    fn test_bind_and_lookup() {
        let registry = BindingRegistry::new();
        let key = ServiceKey::of::<TestService>();

        assert!(registry.lookup(&key).is_none());
        assert!(registry.bind(binding(1, Lifetime::Singleton)).is_none());

        let found = registry.lookup(&key).unwrap();
        assert_eq!(found.lifetime(), Lifetime::Singleton);
        assert_eq!(found.key(), &key);
    }

    #[test]
    fn test_rebind_replaces() {
        let registry = BindingRegistry::new();
        let key = ServiceKey::of::<TestService>();

        registry.bind(binding(1, Lifetime::Transient));
        let replaced = registry.bind(binding(2, Lifetime::Scoped)).unwrap();

        assert_eq!(replaced.lifetime(), Lifetime::Transient);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(&key).unwrap().lifetime(), Lifetime::Scoped);
    }

    #[test]
    fn test_remove() {
        let registry = BindingRegistry::new();
        let key = ServiceKey::of::<TestService>();

        registry.bind(binding(0, Lifetime::Transient));
        assert!(registry.contains(&key));

        assert!(registry.remove(&key).is_some());
        assert!(!registry.contains(&key));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_keys() {
        let registry = BindingRegistry::with_capacity(32);
        registry.bind(binding(0, Lifetime::Transient));
        assert_eq!(registry.keys(), vec![ServiceKey::of::<TestService>()]);
    }
}
