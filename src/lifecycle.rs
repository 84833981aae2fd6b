//! Instance caches and lifecycle scoping
//!
//! Singleton instances live in one cache shared by every handle of a
//! container. Scoped instances live in a per-scope cache that is discarded
//! when the scope ends.
//!
//! Each cache entry is a `OnceCell`, so concurrent first resolutions of the
//! same service block on the cell and only one of them runs the strategy.

use crate::factory::AnyInstance;
use crate::{Lifetime, Result, Scope, ServiceKey};
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "logging")]
use tracing::debug;

/// Shard count for cache maps (few services, moderate concurrency)
const CACHE_SHARDS: usize = 8;

/// Map from key to a lazily constructed instance
pub(crate) struct InstanceCache {
    cells: DashMap<ServiceKey, Arc<OnceCell<AnyInstance>>, RandomState>,
}

impl InstanceCache {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            cells: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                CACHE_SHARDS,
            ),
        }
    }

    #[inline]
    pub(crate) fn get(&self, key: &ServiceKey) -> Option<AnyInstance> {
        self.cells.get(key).and_then(|cell| cell.value().get().cloned())
    }

    /// Return the cached instance or build it, at most once per key.
    ///
    /// The shard lock is released before `init` runs, since `init` resolves
    /// nested services through this same map.
    pub(crate) fn get_or_try_init<F>(&self, key: &ServiceKey, init: F) -> Result<AnyInstance>
    where
        F: FnOnce() -> Result<AnyInstance>,
    {
        let cell = match self.cells.get(key) {
            Some(cell) => Arc::clone(&cell),
            None => Arc::clone(
                &self
                    .cells
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            ),
        };

        cell.get_or_try_init(init).cloned()
    }

    #[inline]
    pub(crate) fn insert(&self, key: ServiceKey, instance: AnyInstance) {
        self.cells.insert(key, Arc::new(OnceCell::with_value(instance)));
    }

    #[inline]
    pub(crate) fn remove(&self, key: &ServiceKey) -> bool {
        self.cells.remove(key).is_some()
    }

    /// Drop every entry, returning how many held an instance
    pub(crate) fn clear(&self) -> usize {
        let count = self.len();
        self.cells.clear();
        count
    }

    /// Number of constructed instances
    pub(crate) fn len(&self) -> usize {
        self.cells.iter().filter(|cell| cell.value().get().is_some()).count()
    }
}

/// Cache of one lifecycle unit plus its current identity
struct ScopeState {
    id: AtomicU64,
    cache: InstanceCache,
}

impl ScopeState {
    fn new() -> Self {
        Self {
            id: AtomicU64::new(Scope::new().id()),
            cache: InstanceCache::new(),
        }
    }
}

/// Tracks already-created singleton and scoped instances.
///
/// Cloning shares both caches. [`begin_scope`](Self::begin_scope) shares the
/// singleton cache only.
#[derive(Clone)]
pub struct LifecycleManager {
    singletons: Arc<InstanceCache>,
    scope: Arc<ScopeState>,
}

impl LifecycleManager {
    #[inline]
    pub fn new() -> Self {
        Self {
            singletons: Arc::new(InstanceCache::new()),
            scope: Arc::new(ScopeState::new()),
        }
    }

    /// Cached instance for `key` under `lifetime`, if any.
    #[inline]
    pub fn get_cached(&self, key: &ServiceKey, lifetime: Lifetime) -> Option<AnyInstance> {
        match lifetime {
            Lifetime::Transient => None,
            Lifetime::Singleton => self.singletons.get(key),
            Lifetime::Scoped => self.scope.cache.get(key),
        }
    }

    /// Cached instance for `key` in either cache, singletons first.
    #[inline]
    pub(crate) fn get_any(&self, key: &ServiceKey) -> Option<AnyInstance> {
        self.singletons
            .get(key)
            .or_else(|| self.scope.cache.get(key))
    }

    /// Place an instance in the cache matching `lifetime`. No-op for transients.
    pub fn store(&self, key: ServiceKey, lifetime: Lifetime, instance: AnyInstance) {
        match lifetime {
            Lifetime::Transient => {}
            Lifetime::Singleton => self.singletons.insert(key, instance),
            Lifetime::Scoped => self.scope.cache.insert(key, instance),
        }
    }

    /// Build through `create` unless `lifetime` already has an instance cached.
    pub(crate) fn get_or_create<F>(
        &self,
        key: &ServiceKey,
        lifetime: Lifetime,
        create: F,
    ) -> Result<AnyInstance>
    where
        F: FnOnce() -> Result<AnyInstance>,
    {
        if !lifetime.is_cached() {
            return create();
        }
        let cache = if lifetime == Lifetime::Singleton {
            &*self.singletons
        } else {
            &self.scope.cache
        };

        cache.get_or_try_init(key, || {
            let instance = create()?;

            #[cfg(feature = "logging")]
            debug!(
                target: "service_container",
                service = %key,
                lifetime = lifetime.as_str(),
                scope = self.scope.id.load(Ordering::Relaxed),
                "Service instance created and cached"
            );

            Ok(instance)
        })
    }

    /// Start a new lifecycle unit sharing this manager's singletons.
    pub fn begin_scope(&self) -> Self {
        Self {
            singletons: Arc::clone(&self.singletons),
            scope: Arc::new(ScopeState::new()),
        }
    }

    /// Discard every scoped instance and move on to a fresh scope.
    ///
    /// Returns the number of instances released.
    pub fn end_scope(&self) -> usize {
        let released = self.scope.cache.clear();
        let previous = self.scope.id.swap(Scope::new().id(), Ordering::AcqRel);

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            scope = previous,
            released = released,
            "Scope ended"
        );
        #[cfg(not(feature = "logging"))]
        let _ = previous;

        released
    }

    /// Identity of the currently open scope
    #[inline]
    pub fn scope(&self) -> Scope {
        Scope::from_id(self.scope.id.load(Ordering::Acquire))
    }

    /// Forget cached instances of one service in both caches.
    pub fn evict(&self, key: &ServiceKey) -> bool {
        let singleton = self.singletons.remove(key);
        let scoped = self.scope.cache.remove(key);
        singleton || scoped
    }

    /// Release every cached instance, singletons included.
    pub fn teardown(&self) {
        let singletons = self.singletons.clear();
        let scoped = self.end_scope();

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            singletons = singletons,
            scoped = scoped,
            "Lifecycle caches torn down"
        );
        #[cfg(not(feature = "logging"))]
        let _ = (singletons, scoped);
    }

    #[inline]
    pub fn singleton_count(&self) -> usize {
        self.singletons.len()
    }

    #[inline]
    pub fn scoped_count(&self) -> usize {
        self.scope.cache.len()
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("scope", &self.scope())
            .field("singletons", &self.singleton_count())
            .field("scoped", &self.scoped_count())
            .finish()
    }
}
