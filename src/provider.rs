//! Provider traits for dependency injection
//!
//! These traits define what types can be requested from the container and
//! how long the resulting instances live.

use crate::{Binding, Service, ServiceKey, Strategy};

/// A type that can be requested from the container with `get`/`resolve`.
///
/// Every [`Service`] is `Injectable` automatically and can be built without
/// any registration. Abstract service identifiers (trait objects) opt in
/// with an empty impl; they always need an explicit binding:
///
/// ```rust
/// use service_container::Injectable;
///
/// trait Mailer: Send + Sync {
///     fn send(&self, to: &str);
/// }
///
/// impl Injectable for dyn Mailer {}
/// ```
pub trait Injectable: Send + Sync + 'static {
    /// Binding used when nothing is registered for this type.
    ///
    /// `None` means the type cannot be constructed without a binding.
    #[inline]
    fn implicit_binding() -> Option<Binding> {
        None
    }
}

// Zero-configuration: anything with a declared dependency list can be built
impl<T: Service> Injectable for T {
    #[inline]
    fn implicit_binding() -> Option<Binding> {
        Some(Binding::new(
            ServiceKey::of::<T>(),
            Strategy::implicit::<T>(),
            T::LIFETIME,
        ))
    }
}

/// How long a resolved instance is shared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// New instance created on every resolve
    #[default]
    Transient,

    /// Single instance shared for the lifetime of the container
    Singleton,

    /// One instance per scope, discarded when the scope ends
    Scoped,
}

impl Lifetime {
    /// Whether resolutions under this lifetime share one instance
    #[inline]
    pub fn is_cached(self) -> bool {
        !matches!(self, Lifetime::Transient)
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Lifetime::Transient => "transient",
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
        }
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
