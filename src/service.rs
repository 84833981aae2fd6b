//! Zero-configuration services
//!
//! A [`Service`] declares the ordered list of its dependencies as a type and
//! knows how to build itself from them. The container can then construct it
//! without any registration: the declaration stands in for constructor
//! introspection.
//!
//! # Example
//!
//! ```rust
//! use service_container::{Container, Service};
//! use std::sync::Arc;
//!
//! struct Config {
//!     debug: bool,
//! }
//!
//! impl Service for Config {
//!     type Dependencies = ();
//!
//!     fn create(_: ()) -> Self {
//!         Config { debug: true }
//!     }
//! }
//!
//! struct Database {
//!     config: Arc<Config>,
//! }
//!
//! impl Service for Database {
//!     type Dependencies = Arc<Config>;
//!
//!     fn create(config: Arc<Config>) -> Self {
//!         Database { config }
//!     }
//! }
//!
//! let container = Container::new();
//! let db = container.get::<Database>().unwrap();
//! assert!(db.config.debug);
//! ```

use crate::{Container, Injectable, Lifetime, Resolver, Result, ServiceKey};
use std::ops::Deref;
use std::sync::Arc;

// =============================================================================
// Service Trait
// =============================================================================

/// A concrete service that declares its dependencies at compile time.
///
/// # Supported Dependency Types
///
/// - `()` - No dependencies
/// - `Arc<T>` - A service, concrete or `dyn Trait`
/// - `Value<T>` - A plain value that must be bound (e.g. a port number)
/// - `Option<D>` - Optional dependency, `None` when nothing is bound
/// - `Container` - The container handle itself
/// - Tuples of the above (up to 12), resolved left to right
pub trait Service: Send + Sync + Sized + 'static {
    /// The dependencies required to create this service.
    type Dependencies: Resolvable;

    /// Lifetime used when the service is constructed without a binding.
    const LIFETIME: Lifetime = Lifetime::Transient;

    /// Create a new instance given the resolved dependencies.
    fn create(deps: Self::Dependencies) -> Self;
}

// =============================================================================
// Resolvable Trait - Dependencies that can be resolved from a container
// =============================================================================

/// A dependency list that can be resolved through a [`Resolver`].
pub trait Resolvable: Sized {
    /// Resolve every dependency, in declaration order.
    fn resolve(resolver: &Resolver<'_>) -> Result<Self>;

    /// Keys of the declared dependencies, in declaration order.
    fn dependency_keys() -> Vec<ServiceKey>;
}

impl Resolvable for () {
    #[inline]
    fn resolve(_resolver: &Resolver<'_>) -> Result<Self> {
        Ok(())
    }

    fn dependency_keys() -> Vec<ServiceKey> {
        Vec::new()
    }
}

impl<T: ?Sized + Injectable> Resolvable for Arc<T> {
    #[inline]
    fn resolve(resolver: &Resolver<'_>) -> Result<Self> {
        resolver.resolve::<T>()
    }

    fn dependency_keys() -> Vec<ServiceKey> {
        vec![ServiceKey::of::<T>()]
    }
}

impl<D: Resolvable> Resolvable for Option<D> {
    #[inline]
    fn resolve(resolver: &Resolver<'_>) -> Result<Self> {
        match D::resolve(resolver) {
            Ok(dep) => Ok(Some(dep)),
            Err(err) if resolver.is_direct_miss(&err, &D::dependency_keys()) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn dependency_keys() -> Vec<ServiceKey> {
        D::dependency_keys()
    }
}

impl Resolvable for Container {
    #[inline]
    fn resolve(resolver: &Resolver<'_>) -> Result<Self> {
        Ok(resolver.container().clone())
    }

    fn dependency_keys() -> Vec<ServiceKey> {
        Vec::new()
    }
}

macro_rules! impl_resolvable_tuple {
    ($($T:ident),+) => {
        impl<$($T: Resolvable),+> Resolvable for ($($T,)+) {
            #[inline]
            fn resolve(resolver: &Resolver<'_>) -> Result<Self> {
                Ok(($($T::resolve(resolver)?,)+))
            }

            fn dependency_keys() -> Vec<ServiceKey> {
                let mut keys = Vec::new();
                $(keys.extend($T::dependency_keys());)+
                keys
            }
        }
    };
}

impl_resolvable_tuple!(A);
impl_resolvable_tuple!(A, B);
impl_resolvable_tuple!(A, B, C);
impl_resolvable_tuple!(A, B, C, D);
impl_resolvable_tuple!(A, B, C, D, E);
impl_resolvable_tuple!(A, B, C, D, E, F);
impl_resolvable_tuple!(A, B, C, D, E, F, G);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J, K);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J, K, L);

// =============================================================================
// Value - plain constructor parameters
// =============================================================================

/// A plain value parameter, such as a timeout or a connection string.
///
/// Values are never constructed implicitly: a binding for `T` must exist
/// (usually via [`Container::instance`]), otherwise resolving the owning
/// service fails with `AmbiguousConstruction`. Wrap in `Option` to give the
/// parameter a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Value<T>(pub T);

impl<T> Value<T> {
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Value<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Clone + Send + Sync + 'static> Resolvable for Value<T> {
    #[inline]
    fn resolve(resolver: &Resolver<'_>) -> Result<Self> {
        resolver.parameter::<T>().map(Value)
    }

    fn dependency_keys() -> Vec<ServiceKey> {
        vec![ServiceKey::of::<T>()]
    }
}

// =============================================================================
// ServiceModule - Group related registrations
// =============================================================================

/// A module that groups related service registrations.
///
/// # Example
///
/// ```rust
/// use service_container::{Container, ServiceModule};
///
/// struct Settings {
///     region: String,
/// }
///
/// struct SettingsModule;
///
/// impl ServiceModule for SettingsModule {
///     fn register(container: &Container) {
///         container.instance(Settings { region: "eu-west".into() });
///     }
/// }
///
/// let container = Container::new();
/// SettingsModule::register(&container);
///
/// assert!(container.contains::<Settings>());
/// ```
pub trait ServiceModule {
    /// Register all services in this module.
    fn register(container: &Container);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiError;
    use std::sync::Mutex;

    struct Config {
        debug: bool,
    }

    impl Service for Config {
        type Dependencies = ();

        fn create(_: ()) -> Self {
            Config { debug: true }
        }
    }

    struct Database {
        url: String,
    }

    impl Service for Database {
        type Dependencies = Arc<Config>;

        fn create(config: Arc<Config>) -> Self {
            Database {
                url: if config.debug {
                    "debug://localhost".into()
                } else {
                    "prod://server".into()
                },
            }
        }
    }

    struct Cache {
        size: usize,
    }

    impl Service for Cache {
        type Dependencies = ();

        fn create(_: ()) -> Self {
            Cache { size: 1024 }
        }
    }

    struct UserRepository {
        db: Arc<Database>,
        cache: Arc<Cache>,
    }

    impl Service for UserRepository {
        type Dependencies = (Arc<Database>, Arc<Cache>);

        fn create((db, cache): (Arc<Database>, Arc<Cache>)) -> Self {
            UserRepository { db, cache }
        }
    }

    #[test]
    fn test_service_without_registration() {
        let container = Container::new();

        let repo = container.get::<UserRepository>().unwrap();
        assert_eq!(repo.db.url, "debug://localhost");
        assert_eq!(repo.cache.size, 1024);
        assert!(container.is_empty());
    }

    #[test]
    fn test_binding_overrides_declared_construction() {
        let container = Container::new();
        container.instance(Config { debug: false });

        let db = container.get::<Database>().unwrap();
        assert_eq!(db.url, "prod://server");
    }

    #[test]
    fn test_dependencies_resolve_left_to_right() {
        static ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

        struct First;
        struct Second;
        struct Both;

        impl Service for First {
            type Dependencies = ();
            fn create(_: ()) -> Self {
                ORDER.lock().unwrap().push("first");
                First
            }
        }

        impl Service for Second {
            type Dependencies = ();
            fn create(_: ()) -> Self {
                ORDER.lock().unwrap().push("second");
                Second
            }
        }

        impl Service for Both {
            type Dependencies = (Arc<First>, Arc<Second>);
            fn create(_: (Arc<First>, Arc<Second>)) -> Self {
                Both
            }
        }

        let container = Container::new();
        container.get::<Both>().unwrap();
        assert_eq!(*ORDER.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_optional_dependency() {
        struct Metrics;

        struct Handler {
            metrics: Option<Arc<Metrics>>,
        }

        impl Service for Handler {
            type Dependencies = Option<Arc<Metrics>>;

            fn create(metrics: Option<Arc<Metrics>>) -> Self {
                Handler { metrics }
            }
        }

        impl crate::Injectable for Metrics {}

        let container = Container::new();
        assert!(container.get::<Handler>().unwrap().metrics.is_none());

        container.instance(Metrics);
        assert!(container.get::<Handler>().unwrap().metrics.is_some());
    }

    #[test]
    fn test_optional_dependency_keeps_deeper_failures() {
        trait Transport: Send + Sync {}

        impl crate::Injectable for dyn Transport {}

        struct Publisher;

        impl Service for Publisher {
            type Dependencies = Arc<dyn Transport>;

            fn create(_: Arc<dyn Transport>) -> Self {
                Publisher
            }
        }

        struct Notifications {
            publisher: Option<Arc<Publisher>>,
        }

        impl Service for Notifications {
            type Dependencies = Option<Arc<Publisher>>;

            fn create(publisher: Option<Arc<Publisher>>) -> Self {
                Notifications { publisher }
            }
        }

        let container = Container::new();
        match container.get::<Notifications>() {
            Err(DiError::UnresolvableDependency { key, chain }) => {
                assert_eq!(key, ServiceKey::of::<dyn Transport>());
                assert_eq!(
                    chain.keys(),
                    &[ServiceKey::of::<Notifications>(), ServiceKey::of::<Publisher>()]
                );
            }
            Err(other) => panic!("expected UnresolvableDependency, got {other:?}"),
            Ok(_) => panic!("a missing transitive dependency must not resolve to None"),
        }

        struct Loopback;
        impl Transport for Loopback {}

        container.singleton::<dyn Transport, _>(|_| Ok(Arc::new(Loopback)));
        assert!(container.get::<Notifications>().unwrap().publisher.is_some());
    }

    #[test]
    fn test_value_parameter() {
        struct Server {
            port: u16,
        }

        impl Service for Server {
            type Dependencies = Value<u16>;

            fn create(port: Value<u16>) -> Self {
                Server { port: *port }
            }
        }

        let container = Container::new();
        container.instance(8080u16);

        assert_eq!(container.get::<Server>().unwrap().port, 8080);
    }

    #[test]
    fn test_unbound_value_is_ambiguous() {
        struct Server;

        impl Service for Server {
            type Dependencies = (Arc<Config>, Value<u16>);

            fn create(_: (Arc<Config>, Value<u16>)) -> Self {
                Server
            }
        }

        let container = Container::new();
        match container.get::<Server>() {
            Err(DiError::AmbiguousConstruction {
                service, parameter, ..
            }) => {
                assert!(service.ends_with("Server"));
                assert_eq!(parameter, "u16");
            }
            other => panic!("expected AmbiguousConstruction, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_defaulted_value_parameter() {
        struct Pool {
            size: usize,
        }

        impl Service for Pool {
            type Dependencies = Option<Value<usize>>;

            fn create(size: Option<Value<usize>>) -> Self {
                Pool {
                    size: size.map_or(4, Value::into_inner),
                }
            }
        }

        let container = Container::new();
        assert_eq!(container.get::<Pool>().unwrap().size, 4);
    }

    #[test]
    fn test_container_dependency() {
        struct Factory {
            container: Container,
        }

        impl Service for Factory {
            type Dependencies = Container;

            fn create(container: Container) -> Self {
                Factory { container }
            }
        }

        let container = Container::new();
        container.instance(Config { debug: false });

        let factory = container.get::<Factory>().unwrap();
        assert!(factory.container.contains::<Config>());
    }

    #[test]
    fn test_dependency_keys() {
        assert!(<() as Resolvable>::dependency_keys().is_empty());
        assert_eq!(
            <<UserRepository as Service>::Dependencies as Resolvable>::dependency_keys(),
            vec![ServiceKey::of::<Database>(), ServiceKey::of::<Cache>()]
        );
        assert_eq!(
            <Option<Value<u16>> as Resolvable>::dependency_keys(),
            vec![ServiceKey::of::<u16>()]
        );
    }

    #[test]
    fn test_service_module() {
        struct TestModule;

        impl ServiceModule for TestModule {
            fn register(container: &Container) {
                container.instance(Config { debug: false });
                container.bind(|_| Ok(Arc::new(Cache { size: 8 })));
            }
        }

        let container = Container::new();
        TestModule::register(&container);

        assert!(container.contains::<Config>());
        assert_eq!(container.get::<Cache>().unwrap().size, 8);
    }
}
