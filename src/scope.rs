//! Lifecycle units
//!
//! A [`ScopedContainer`] is one unit of work (a request, a job). It shares
//! bindings and singletons with the container it was opened from but keeps
//! its own cache of scoped instances, released when the unit ends.

use crate::Container;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "logging")]
use tracing::debug;

/// Unique scope identifier.
///
/// Each scope gets a unique ID for tracking and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scope(u64);

impl Scope {
    /// Generate a new unique scope ID.
    #[inline]
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn from_id(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// A container handle bound to its own lifecycle unit.
///
/// Dereferences to [`Container`], so everything a container can do works
/// here; scoped services resolve to one instance per `ScopedContainer`.
/// The scoped cache is released by [`end_scope`](Self::end_scope) or on drop.
///
/// # Examples
///
/// ```rust
/// use service_container::Container;
/// use std::sync::Arc;
///
/// struct RequestContext {
///     id: u64,
/// }
///
/// let root = Container::new();
/// root.scoped(|_| Ok(Arc::new(RequestContext { id: 7 })));
///
/// let request = root.begin_scope();
/// let a = request.get_bound::<RequestContext>().unwrap();
/// let b = request.get_bound::<RequestContext>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(a.id, 7);
///
/// request.end_scope();
/// ```
pub struct ScopedContainer {
    container: Container,
}

impl ScopedContainer {
    #[inline]
    pub(crate) fn new(container: Container) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            scope = %container.scope(),
            "Scope started"
        );

        Self { container }
    }

    /// Get the underlying container.
    #[inline]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// End the unit of work, releasing its scoped instances.
    #[inline]
    pub fn end_scope(self) {
        drop(self);
    }
}

impl std::ops::Deref for ScopedContainer {
    type Target = Container;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.container
    }
}

impl Drop for ScopedContainer {
    fn drop(&mut self) {
        self.container.end_scope();
    }
}

impl std::fmt::Debug for ScopedContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedContainer")
            .field("container", &self.container)
            .finish()
    }
}
