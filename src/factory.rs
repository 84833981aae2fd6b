//! Construction strategies and bindings
//!
//! A [`Strategy`] knows how to build one service given a [`Resolver`]; a
//! [`Binding`] pairs a strategy with the key it answers for and the
//! [`Lifetime`] of the instances it produces.
//!
//! Instances are stored type-erased as `Arc<dyn Any>` wrapping the typed
//! `Arc<T>`. The double `Arc` lets `T` be an unsized trait object, which a
//! plain `Arc<dyn Any>` cannot hold.

use crate::{DiError, Lifetime, Resolvable, Resolver, Result, Service, ServiceKey};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Type-erased instance as held by the caches
pub type AnyInstance = Arc<dyn Any + Send + Sync>;

/// Type-erased construction function
type StrategyFn = dyn Fn(&Resolver<'_>) -> Result<AnyInstance> + Send + Sync;

/// Where a strategy came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// User-supplied factory closure
    Explicit,
    /// Derived from a [`Service`] dependency declaration
    Implicit,
}

/// A function capable of producing an instance of one service.
///
/// Cloning is cheap: the function is shared behind an `Arc`.
#[derive(Clone)]
pub struct Strategy {
    kind: StrategyKind,
    build: Arc<StrategyFn>,
}

impl Strategy {
    /// Wrap a factory closure.
    ///
    /// The closure receives the resolver so it can pull its own dependencies.
    #[inline]
    pub fn explicit<T, F>(factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            kind: StrategyKind::Explicit,
            build: Arc::new(move |resolver: &Resolver<'_>| factory(resolver).map(erase)),
        }
    }

    /// Strategy that always hands out the same pre-built instance
    #[inline]
    pub fn instance<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> Self {
        let erased = erase(instance);
        Self {
            kind: StrategyKind::Explicit,
            build: Arc::new(move |_: &Resolver<'_>| Ok(Arc::clone(&erased))),
        }
    }

    /// Zero-configuration strategy: resolve `T::Dependencies`, then `T::create`
    #[inline]
    pub fn implicit<T: Service>() -> Self {
        Self {
            kind: StrategyKind::Implicit,
            build: Arc::new(|resolver: &Resolver<'_>| {
                #[cfg(feature = "logging")]
                trace!(
                    target: "service_container",
                    service = std::any::type_name::<T>(),
                    "Constructing service from declared dependencies"
                );

                let deps = T::Dependencies::resolve(resolver)?;
                Ok(erase(Arc::new(T::create(deps))))
            }),
        }
    }

    #[inline]
    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    /// Run the strategy
    #[inline]
    pub(crate) fn invoke(&self, resolver: &Resolver<'_>) -> Result<AnyInstance> {
        (self.build)(resolver)
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy").field("kind", &self.kind).finish()
    }
}

/// Registered association between a key, a strategy and a lifetime
#[derive(Clone, Debug)]
pub struct Binding {
    key: ServiceKey,
    strategy: Strategy,
    lifetime: Lifetime,
}

impl Binding {
    #[inline]
    pub fn new(key: ServiceKey, strategy: Strategy, lifetime: Lifetime) -> Self {
        Self {
            key,
            strategy,
            lifetime,
        }
    }

    #[inline]
    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    #[inline]
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }
}

#[inline]
fn erase<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> AnyInstance {
    Arc::new(instance)
}

/// Recover the typed handle from an erased instance
#[inline]
pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(
    key: &ServiceKey,
    instance: &AnyInstance,
) -> Result<Arc<T>> {
    (**instance)
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| DiError::TypeMismatch { key: key.clone() })
}
