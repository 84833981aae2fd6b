//! Dependency graph resolution
//!
//! A [`Resolver`] lives for one top-level `get` call. Services currently under
//! construction are tracked per thread and per container, so a factory that
//! resolves through a captured or injected container handle still joins the
//! chain of the resolution that called it. That chain is how cycles are
//! caught and how errors report the path that led to them.

use crate::factory::downcast;
use crate::{Binding, Container, DiError, Injectable, ResolutionChain, Result, ServiceKey};
use std::borrow::Cow;
use std::cell::RefCell;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

thread_local! {
    /// Services under construction on this thread, tagged with the registry
    /// they are resolved from
    static IN_PROGRESS: RefCell<Vec<(usize, ServiceKey)>> = const { RefCell::new(Vec::new()) };
}

/// Handle passed to construction strategies so they can resolve their own
/// dependencies.
///
/// # Examples
///
/// ```rust
/// use service_container::Container;
/// use std::sync::Arc;
///
/// struct Pool { size: usize }
/// struct Repository { pool: Arc<Pool> }
///
/// let container = Container::new();
/// container.instance(Pool { size: 4 });
/// container.bind(|r| Ok(Arc::new(Repository { pool: r.get_bound::<Pool>()? })));
///
/// let repo = container.get_bound::<Repository>().unwrap();
/// assert_eq!(repo.pool.size, 4);
/// ```
pub struct Resolver<'c> {
    container: &'c Container,
    graph: usize,
}

impl<'c> Resolver<'c> {
    #[inline]
    pub(crate) fn new(container: &'c Container) -> Self {
        Self {
            container,
            graph: container.registry_id(),
        }
    }

    /// Resolve a service, constructing it from its declared dependencies when
    /// nothing is bound.
    #[inline]
    pub fn resolve<T: ?Sized + Injectable>(&self) -> Result<Arc<T>> {
        self.resolve_key::<T, _>(ServiceKey::of::<T>(), T::implicit_binding)
    }

    /// Alias for `resolve`.
    #[inline]
    pub fn get<T: ?Sized + Injectable>(&self) -> Result<Arc<T>> {
        self.resolve::<T>()
    }

    /// Resolve a service that must have an explicit binding.
    ///
    /// Works for any type, including ones that are not [`Injectable`].
    #[inline]
    pub fn get_bound<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.resolve_key::<T, _>(ServiceKey::of::<T>(), || None)
    }

    /// Resolve the binding of `T` registered under `name`.
    #[inline]
    pub fn resolve_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<Arc<T>> {
        self.resolve_key::<T, _>(ServiceKey::named::<T>(name), || None)
    }

    /// Resolve a bound plain value and return a copy of it.
    #[inline]
    pub fn value<T: Clone + Send + Sync + 'static>(&self) -> Result<T> {
        self.get_bound::<T>().map(|value| T::clone(&value))
    }

    /// Resolve a constructor parameter of the service being built.
    ///
    /// A missing binding is reported as `AmbiguousConstruction` of the
    /// enclosing service rather than as a missing service.
    pub(crate) fn parameter<T: Clone + Send + Sync + 'static>(&self) -> Result<T> {
        self.value::<T>().map_err(|err| match err {
            DiError::UnresolvableDependency { key, chain } if key == ServiceKey::of::<T>() => {
                DiError::AmbiguousConstruction {
                    service: self.current().map_or("<root>", |k| k.type_name()),
                    parameter: std::any::type_name::<T>(),
                    chain,
                }
            }
            other => other,
        })
    }

    /// Whether `err` reports one of `keys` missing for the service being
    /// built right now, rather than something missing further down.
    pub(crate) fn is_direct_miss(&self, err: &DiError, keys: &[ServiceKey]) -> bool {
        if !err.is_missing() {
            return false;
        }
        match err {
            DiError::UnresolvableDependency { key, chain } => {
                keys.contains(key) && *chain == self.chain()
            }
            DiError::AmbiguousConstruction { chain, .. } => *chain == self.chain(),
            _ => false,
        }
    }

    /// The container this resolution runs against.
    #[inline]
    pub fn container(&self) -> &'c Container {
        self.container
    }

    /// Services of this container currently under construction on this
    /// thread, outermost first.
    pub fn chain(&self) -> ResolutionChain {
        IN_PROGRESS.with_borrow(|stack| {
            ResolutionChain::new(
                stack
                    .iter()
                    .filter(|(graph, _)| *graph == self.graph)
                    .map(|(_, key)| key.clone())
                    .collect(),
            )
        })
    }

    /// The service currently under construction, if any.
    pub fn current(&self) -> Option<ServiceKey> {
        IN_PROGRESS.with_borrow(|stack| {
            stack
                .iter()
                .rev()
                .find(|(graph, _)| *graph == self.graph)
                .map(|(_, key)| key.clone())
        })
    }

    fn resolve_key<T, I>(&self, key: ServiceKey, implicit: I) -> Result<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
        I: FnOnce() -> Option<Binding>,
    {
        let in_progress = self.chain();
        if in_progress.contains(&key) {
            let mut keys = in_progress.keys().to_vec();
            keys.push(key);
            let chain = ResolutionChain::new(keys);

            #[cfg(feature = "logging")]
            debug!(
                target: "service_container",
                chain = %chain,
                "Cyclic dependency detected"
            );

            return Err(DiError::cyclic(chain));
        }

        let lifecycle = self.container.lifecycle();

        if let Some(instance) = lifecycle.get_any(&key) {
            #[cfg(feature = "logging")]
            trace!(
                target: "service_container",
                service = %key,
                scope = %lifecycle.scope(),
                "Service resolved from instance cache"
            );

            return downcast(&key, &instance);
        }

        let binding = match self.container.lookup(&key).or_else(implicit) {
            Some(binding) => binding,
            None => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "service_container",
                    service = %key,
                    depth = in_progress.len(),
                    "No binding and no zero-configuration strategy for service"
                );

                return Err(DiError::unresolvable(key, in_progress));
            }
        };

        let instance = lifecycle.get_or_create(&key, binding.lifetime(), || {
            let _frame = self.enter(key.clone());
            binding.strategy().invoke(self)
        })?;

        downcast(&key, &instance)
    }

    #[inline]
    fn enter(&self, key: ServiceKey) -> Frame {
        let depth = IN_PROGRESS.with_borrow_mut(|stack| {
            stack.push((self.graph, key));
            stack.len() - 1
        });
        Frame { depth }
    }
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("chain", &self.chain())
            .finish()
    }
}

/// Unwinds the thread's chain when a construction finishes, including on
/// error or panic.
struct Frame {
    depth: usize,
}

impl Drop for Frame {
    fn drop(&mut self) {
        IN_PROGRESS.with_borrow_mut(|stack| stack.truncate(self.depth));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Service;

    struct A;
    struct B;

    #[test]
    fn test_explicit_cycle() {
        let container = Container::new();
        container.bind(|r| {
            r.get_bound::<B>()?;
            Ok(Arc::new(A))
        });
        container.bind(|r| {
            r.get_bound::<A>()?;
            Ok(Arc::new(B))
        });

        match container.get_bound::<A>() {
            Err(DiError::CyclicDependency { chain }) => {
                assert_eq!(
                    chain.keys(),
                    &[ServiceKey::of::<A>(), ServiceKey::of::<B>(), ServiceKey::of::<A>()]
                );
            }
            other => panic!("expected CyclicDependency, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_self_cycle_on_singleton_does_not_deadlock() {
        let container = Container::new();
        container.singleton(|r| {
            r.get_bound::<A>()?;
            Ok(Arc::new(A))
        });

        let err = container.get_bound::<A>().err().unwrap();
        assert!(matches!(err, DiError::CyclicDependency { .. }));

        // A failed construction leaves nothing cached
        container.singleton(|_| Ok(Arc::new(A)));
        assert!(container.get_bound::<A>().is_ok());
    }

    #[test]
    fn test_declared_cycle() {
        struct Left;
        struct Right;

        impl Service for Left {
            type Dependencies = Arc<Right>;
            fn create(_: Arc<Right>) -> Self {
                Left
            }
        }

        impl Service for Right {
            type Dependencies = Arc<Left>;
            fn create(_: Arc<Left>) -> Self {
                Right
            }
        }

        let container = Container::new();
        let err = container.get::<Left>().err().unwrap();
        match err {
            DiError::CyclicDependency { chain } => assert_eq!(chain.len(), 3),
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_through_injected_container() {
        struct Dispatcher {
            reentry: Option<DiError>,
        }

        struct Listener;

        impl Service for Dispatcher {
            type Dependencies = Container;

            fn create(container: Container) -> Self {
                Dispatcher {
                    reentry: container.get::<Listener>().err(),
                }
            }
        }

        impl Service for Listener {
            type Dependencies = Arc<Dispatcher>;

            fn create(_: Arc<Dispatcher>) -> Self {
                Listener
            }
        }

        let container = Container::new();
        let dispatcher = container.get::<Dispatcher>().unwrap();

        match dispatcher.reentry.as_ref() {
            Some(DiError::CyclicDependency { chain }) => assert_eq!(
                chain.keys(),
                &[
                    ServiceKey::of::<Dispatcher>(),
                    ServiceKey::of::<Listener>(),
                    ServiceKey::of::<Dispatcher>()
                ]
            ),
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_through_captured_handle_on_singleton() {
        let container = Container::new();
        let handle = container.clone();
        container.singleton(move |_| {
            handle.get_bound::<B>()?;
            Ok(Arc::new(A))
        });
        container.bind(|r| {
            r.get_bound::<A>()?;
            Ok(Arc::new(B))
        });

        match container.get_bound::<A>() {
            Err(DiError::CyclicDependency { chain }) => {
                assert_eq!(
                    chain.keys(),
                    &[ServiceKey::of::<A>(), ServiceKey::of::<B>(), ServiceKey::of::<A>()]
                );
            }
            other => panic!("expected CyclicDependency, got {:?}", other.err()),
        }

        // The thread's chain is empty again once the failure unwinds
        assert!(Resolver::new(&container).chain().is_empty());
    }

    #[test]
    fn test_separate_containers_do_not_share_a_chain() {
        let inner = Container::new();
        inner.bind(|_| Ok(Arc::new(A)));

        let outer = Container::new();
        outer.bind(move |_| inner.get_bound::<A>());

        assert!(outer.get_bound::<A>().is_ok());
    }

    #[test]
    fn test_unresolvable_reports_chain() {
        trait Storage: Send + Sync {}

        struct Uploader;

        let container = Container::new();
        container.bind(|r| {
            r.get_bound::<dyn Storage>()?;
            Ok(Arc::new(Uploader))
        });

        match container.get_bound::<Uploader>() {
            Err(DiError::UnresolvableDependency { key, chain }) => {
                assert_eq!(key, ServiceKey::of::<dyn Storage>());
                assert_eq!(chain.keys(), &[ServiceKey::of::<Uploader>()]);
            }
            other => panic!("expected UnresolvableDependency, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_chain_unwinds_after_failure() {
        let container = Container::new();
        container.bind(|_| Err::<Arc<A>, _>(DiError::creation_failed::<A>("disk full")));

        let resolver = Resolver::new(&container);
        assert!(resolver.get_bound::<A>().is_err());
        assert!(resolver.chain().is_empty());
        assert!(resolver.current().is_none());
    }

    #[test]
    fn test_named_bindings() {
        let container = Container::new();
        container.bind_named::<String, _>("primary", crate::Lifetime::Singleton, |_| {
            Ok(Arc::new("db-1".to_string()))
        });
        container.bind_named::<String, _>("replica", crate::Lifetime::Singleton, |_| {
            Ok(Arc::new("db-2".to_string()))
        });

        let resolver = Resolver::new(&container);
        assert_eq!(*resolver.resolve_named::<String>("primary").unwrap(), "db-1");
        assert_eq!(*resolver.resolve_named::<String>("replica").unwrap(), "db-2");
        assert!(resolver.get_bound::<String>().is_err());
    }
}
