//! Service container
//!
//! The `Container` ties the binding registry, the resolver and the lifecycle
//! caches together. Handles are cheap to clone and are passed explicitly to
//! whatever needs to resolve services.

use crate::storage::BindingRegistry;
use crate::{
    Binding, DiError, Injectable, Lifetime, LifecycleManager, Resolver, Result, Scope,
    ScopedContainer, Service, ServiceKey, Strategy,
};
use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "logging")]
use tracing::debug;

/// Dependency injection container.
///
/// Maps service keys to bindings and manages the lifetime of what those
/// bindings produce. Cloning a container yields another handle to the same
/// bindings, singletons and scope.
///
/// # Examples
///
/// ```rust
/// use service_container::{Container, Injectable};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// impl Injectable for dyn Clock {}
///
/// struct FixedClock(u64);
///
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 {
///         self.0
///     }
/// }
///
/// let container = Container::new();
/// container.singleton::<dyn Clock, _>(|_| Ok(Arc::new(FixedClock(42))));
///
/// let clock = container.get::<dyn Clock>().unwrap();
/// assert_eq!(clock.now(), 42);
/// ```
#[derive(Clone)]
pub struct Container {
    /// Bindings shared by every handle and scope
    registry: Arc<BindingRegistry>,
    /// Singleton cache plus the scope this handle belongs to
    lifecycle: LifecycleManager,
    /// Lock state - uses AtomicBool for fast lock checking (no contention)
    locked: Arc<AtomicBool>,
}

impl Container {
    /// Create a new container.
    ///
    /// A default scope is open from the start.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a container with pre-allocated capacity.
    ///
    /// Use this when you know approximately how many services will be registered.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        let container = Self {
            registry: Arc::new(BindingRegistry::with_capacity(capacity)),
            lifecycle: LifecycleManager::new(),
            locked: Arc::new(AtomicBool::new(false)),
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            capacity = capacity,
            scope = %container.scope(),
            "Creating new service container"
        );

        container
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register a binding, replacing any binding with the same key.
    ///
    /// Instances already cached for the key are kept; use
    /// [`evict`](Self::evict) to drop them.
    ///
    /// # Panics
    ///
    /// If the container is locked.
    pub fn register(&self, binding: Binding) {
        self.check_not_locked();

        #[cfg(feature = "logging")]
        let key = binding.key().clone();
        #[cfg(feature = "logging")]
        let lifetime = binding.lifetime();

        let replaced = self.registry.bind(binding);

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = %key,
            lifetime = lifetime.as_str(),
            replaced = replaced.is_some(),
            service_count = self.registry.len(),
            "Registering service"
        );
        #[cfg(not(feature = "logging"))]
        let _ = replaced;
    }

    /// Register a factory with the given lifetime.
    ///
    /// The factory receives a [`Resolver`] for its own dependencies.
    #[inline]
    pub fn bind_with<T, F>(&self, lifetime: Lifetime, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        self.register(Binding::new(
            ServiceKey::of::<T>(),
            Strategy::explicit(factory),
            lifetime,
        ));
    }

    /// Register a transient factory: a new instance on every resolve.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_container::Container;
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicU64, Ordering};
    ///
    /// static COUNTER: AtomicU64 = AtomicU64::new(0);
    ///
    /// struct RequestId(u64);
    ///
    /// let container = Container::new();
    /// container.bind(|_| Ok(Arc::new(RequestId(COUNTER.fetch_add(1, Ordering::SeqCst)))));
    ///
    /// let id1 = container.get_bound::<RequestId>().unwrap();
    /// let id2 = container.get_bound::<RequestId>().unwrap();
    /// assert_ne!(id1.0, id2.0); // Different instances
    /// ```
    #[inline]
    pub fn bind<T, F>(&self, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        self.bind_with(Lifetime::Transient, factory);
    }

    /// Register a singleton factory, run once on first resolve.
    #[inline]
    pub fn singleton<T, F>(&self, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        self.bind_with(Lifetime::Singleton, factory);
    }

    /// Register a scoped factory, run once per scope.
    #[inline]
    pub fn scoped<T, F>(&self, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        self.bind_with(Lifetime::Scoped, factory);
    }

    /// Register a pre-built instance as a singleton.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_container::Container;
    ///
    /// struct Database { url: String }
    ///
    /// let container = Container::new();
    /// container.instance(Database { url: "postgres://localhost".into() });
    ///
    /// let db = container.get_bound::<Database>().unwrap();
    /// assert_eq!(db.url, "postgres://localhost");
    /// ```
    #[inline]
    pub fn instance<T: Send + Sync + 'static>(&self, instance: T) {
        self.instance_arc(Arc::new(instance));
    }

    /// Register a pre-built shared instance, possibly a trait object.
    #[inline]
    pub fn instance_arc<T: ?Sized + Send + Sync + 'static>(&self, instance: Arc<T>) {
        self.register(Binding::new(
            ServiceKey::of::<T>(),
            Strategy::instance(instance),
            Lifetime::Singleton,
        ));
    }

    /// Register a factory under a string token, next to the unnamed binding.
    #[inline]
    pub fn bind_named<T, F>(&self, name: impl Into<Cow<'static, str>>, lifetime: Lifetime, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        self.register(Binding::new(
            ServiceKey::named::<T>(name),
            Strategy::explicit(factory),
            lifetime,
        ));
    }

    /// Register a [`Service`] with a lifetime other than its declared one.
    #[inline]
    pub fn provide<T: Service>(&self, lifetime: Lifetime) {
        self.register(Binding::new(
            ServiceKey::of::<T>(),
            Strategy::implicit::<T>(),
            lifetime,
        ));
    }

    /// Remove the unnamed binding of `T`. Cached instances are kept.
    #[inline]
    pub fn remove<T: ?Sized + 'static>(&self) -> Option<Binding> {
        self.unbind(&ServiceKey::of::<T>())
    }

    /// Remove the binding for `key`. Cached instances are kept.
    pub fn unbind(&self, key: &ServiceKey) -> Option<Binding> {
        self.check_not_locked();
        let removed = self.registry.remove(key);

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = %key,
            removed = removed.is_some(),
            "Removing binding"
        );

        removed
    }

    /// Binding registered for `key`, if any. Pure read.
    #[inline]
    pub fn lookup(&self, key: &ServiceKey) -> Option<Binding> {
        self.registry.lookup(key)
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve a service.
    ///
    /// Uses the binding for `T` if there is one; otherwise a [`Service`] is
    /// built from its declared dependencies.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_container::{Container, Service};
    ///
    /// struct Clock;
    ///
    /// impl Service for Clock {
    ///     type Dependencies = ();
    ///     fn create(_: ()) -> Self { Clock }
    /// }
    ///
    /// let container = Container::new();
    /// assert!(container.get::<Clock>().is_ok());
    /// ```
    #[inline]
    pub fn get<T: ?Sized + Injectable>(&self) -> Result<Arc<T>> {
        let result = Resolver::new(self).resolve::<T>();
        self.trace_failure::<T, _>(result)
    }

    /// Alias for `get` - resolve a service.
    #[inline]
    pub fn resolve<T: ?Sized + Injectable>(&self) -> Result<Arc<T>> {
        self.get::<T>()
    }

    /// Try to resolve, returning None on any error.
    #[inline]
    pub fn try_get<T: ?Sized + Injectable>(&self) -> Option<Arc<T>> {
        self.get::<T>().ok()
    }

    /// Resolve a service that must have an explicit binding.
    #[inline]
    pub fn get_bound<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let result = Resolver::new(self).get_bound::<T>();
        self.trace_failure::<T, _>(result)
    }

    /// Resolve the binding of `T` registered under `name`.
    #[inline]
    pub fn resolve_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<Arc<T>> {
        let result = Resolver::new(self).resolve_named::<T>(name);
        self.trace_failure::<T, _>(result)
    }

    /// Resolve a bound plain value and return a copy of it.
    #[inline]
    pub fn value<T: Clone + Send + Sync + 'static>(&self) -> Result<T> {
        let result = Resolver::new(self).value::<T>();
        self.trace_failure::<T, _>(result)
    }

    #[inline]
    fn trace_failure<T: ?Sized, V>(&self, result: Result<V>) -> Result<V> {
        #[cfg(feature = "logging")]
        if let Err(err) = &result {
            debug!(
                target: "service_container",
                service = std::any::type_name::<T>(),
                scope = %self.scope(),
                error = %err,
                "Service resolution failed"
            );
        }

        result
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Check if a binding is registered for `T`.
    ///
    /// Services that would be built without a binding are not counted.
    #[inline]
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.registry.contains(&ServiceKey::of::<T>())
    }

    /// Check if a binding is registered for `key`.
    #[inline]
    pub fn contains_key(&self, key: &ServiceKey) -> bool {
        self.registry.contains(key)
    }

    /// Get the number of registered bindings.
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Check if no bindings are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Get all registered keys.
    pub fn registered_keys(&self) -> Vec<ServiceKey> {
        self.registry.keys()
    }

    /// Declared dependencies of a [`Service`], in resolution order.
    pub fn dependencies_of<T: Service>(&self) -> Vec<ServiceKey> {
        <T::Dependencies as crate::Resolvable>::dependency_keys()
    }

    // =========================================================================
    // Lifecycle Methods
    // =========================================================================

    /// Open a new lifecycle unit (one request, one job).
    ///
    /// The returned handle shares bindings and singletons with this container
    /// and has its own scoped instances.
    pub fn begin_scope(&self) -> ScopedContainer {
        ScopedContainer::new(Self {
            registry: Arc::clone(&self.registry),
            lifecycle: self.lifecycle.begin_scope(),
            locked: Arc::clone(&self.locked),
        })
    }

    /// End the scope this handle belongs to and open a fresh one.
    ///
    /// Returns the number of scoped instances released.
    #[inline]
    pub fn end_scope(&self) -> usize {
        self.lifecycle.end_scope()
    }

    /// The scope this handle currently resolves scoped services in.
    #[inline]
    pub fn scope(&self) -> Scope {
        self.lifecycle.scope()
    }

    /// Identity of the binding registry shared by this handle and its scopes
    #[inline]
    pub(crate) fn registry_id(&self) -> usize {
        Arc::as_ptr(&self.registry) as usize
    }

    /// Instance caches of this handle.
    #[inline]
    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Drop cached instances of one service so the next resolve rebuilds it.
    #[inline]
    pub fn evict(&self, key: &ServiceKey) -> bool {
        self.lifecycle.evict(key)
    }

    /// Release every cached instance, singletons included. Bindings stay.
    #[inline]
    pub fn teardown(&self) {
        self.lifecycle.teardown();
    }

    /// Lock the container to prevent further registrations.
    ///
    /// Useful for ensuring no services are registered after app initialization.
    #[inline]
    pub fn lock(&self) {
        self.locked.store(true, Ordering::Release);

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service_count = self.registry.len(),
            "Container locked - no further registrations allowed"
        );
    }

    /// Check if the container is locked.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Panic if locked (internal helper).
    #[inline]
    fn check_not_locked(&self) {
        if self.locked.load(Ordering::Relaxed) {
            panic!("Cannot register services: {}", DiError::Locked);
        }
    }

    // =========================================================================
    // Batch Registration
    // =========================================================================

    /// Register multiple services in a single batch operation.
    ///
    /// Performs a single lock check at the start.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_container::Container;
    /// use std::sync::Arc;
    ///
    /// struct Database { url: String }
    /// struct Cache { size: usize }
    ///
    /// let container = Container::new();
    /// container.batch(|batch| {
    ///     batch.instance(Database { url: "postgres://localhost".into() });
    ///     batch.singleton(|_| Ok(Arc::new(Cache { size: 1024 })));
    /// });
    ///
    /// assert!(container.contains::<Database>());
    /// assert!(container.contains::<Cache>());
    /// ```
    pub fn batch<F>(&self, f: F)
    where
        F: FnOnce(BatchRegistrar<'_>),
    {
        self.check_not_locked();

        #[cfg(feature = "logging")]
        let start_count = self.registry.len();

        f(BatchRegistrar {
            registry: &self.registry,
        });

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            services_registered = self.registry.len().saturating_sub(start_count),
            "Batch registration completed"
        );
    }
}

/// Batch registrar for closure-based bulk registration.
///
/// The lock check is done once in `Container::batch()`.
#[repr(transparent)]
pub struct BatchRegistrar<'a> {
    registry: &'a BindingRegistry,
}

impl BatchRegistrar<'_> {
    /// Register a factory with the given lifetime
    #[inline]
    pub fn bind_with<T, F>(&self, lifetime: Lifetime, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        self.registry.bind(Binding::new(
            ServiceKey::of::<T>(),
            Strategy::explicit(factory),
            lifetime,
        ));
    }

    /// Register a transient factory
    #[inline]
    pub fn bind<T, F>(&self, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        self.bind_with(Lifetime::Transient, factory);
    }

    /// Register a singleton factory
    #[inline]
    pub fn singleton<T, F>(&self, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        self.bind_with(Lifetime::Singleton, factory);
    }

    /// Register a scoped factory
    #[inline]
    pub fn scoped<T, F>(&self, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        self.bind_with(Lifetime::Scoped, factory);
    }

    /// Register a pre-built singleton instance
    #[inline]
    pub fn instance<T: Send + Sync + 'static>(&self, instance: T) {
        self.registry.bind(Binding::new(
            ServiceKey::of::<T>(),
            Strategy::instance(Arc::new(instance)),
            Lifetime::Singleton,
        ));
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.len())
            .field("lifecycle", &self.lifecycle)
            .field("locked", &self.is_locked())
            .finish()
    }
}
