//! # service-container - Dependency injection with zero-config construction
//!
//! A service container that maps service identifiers to construction
//! strategies, builds whole object graphs on demand, and decides whether a
//! resolve returns a fresh, per-scope, or process-wide shared instance.
//!
//! ## Features
//!
//! - **Bindings** - Factories, pre-built instances and named tokens, keyed by `TypeId`
//! - **Zero-config** - Types implementing [`Service`] are built without registration
//! - **Trait objects** - Bind `dyn Trait` to an implementation, inject `Arc<dyn Trait>`
//! - **Lifetimes** - Transient, singleton and scoped instances
//! - **Cycle detection** - Cycles fail with the full resolution chain
//! - **Lock-free reads** - `DashMap` registry, at-most-once singleton construction
//! - **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use service_container::{Container, Injectable, Service};
//! use std::sync::Arc;
//!
//! trait Mailer: Send + Sync {
//!     fn send(&self, to: &str) -> String;
//! }
//!
//! impl Injectable for dyn Mailer {}
//!
//! struct SmtpMailer;
//!
//! impl Mailer for SmtpMailer {
//!     fn send(&self, to: &str) -> String {
//!         format!("smtp:{to}")
//!     }
//! }
//!
//! struct SignupHandler {
//!     mailer: Arc<dyn Mailer>,
//! }
//!
//! impl Service for SignupHandler {
//!     type Dependencies = Arc<dyn Mailer>;
//!
//!     fn create(mailer: Arc<dyn Mailer>) -> Self {
//!         SignupHandler { mailer }
//!     }
//! }
//!
//! let container = Container::new();
//! container.singleton::<dyn Mailer, _>(|_| Ok(Arc::new(SmtpMailer)));
//!
//! // Never registered: built from its declared dependencies
//! let handler = container.get::<SignupHandler>().unwrap();
//! assert_eq!(handler.mailer.send("ada"), "smtp:ada");
//! ```
//!
//! ## Service Lifetimes
//!
//! ```rust
//! use service_container::{Container, Lifetime};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! static COUNTER: AtomicU64 = AtomicU64::new(0);
//!
//! struct Config { debug: bool }
//! struct RequestId(u64);
//! struct Session { user: String }
//!
//! let container = Container::new();
//!
//! // Singleton - one instance, shared everywhere
//! container.instance(Config { debug: true });
//!
//! // Transient - new instance every time
//! container.bind(|_| Ok(Arc::new(RequestId(COUNTER.fetch_add(1, Ordering::SeqCst)))));
//!
//! // Scoped - one instance per lifecycle unit
//! container.bind_with(Lifetime::Scoped, |_| Ok(Arc::new(Session { user: "ada".into() })));
//! ```
//!
//! ## Scopes
//!
//! ```rust
//! use service_container::Container;
//! use std::sync::Arc;
//!
//! struct RequestContext { path: String }
//!
//! let root = Container::new();
//! root.scoped(|_| Ok(Arc::new(RequestContext { path: "/".into() })));
//!
//! let request = root.begin_scope();
//! let a = request.get_bound::<RequestContext>().unwrap();
//! let b = request.get_bound::<RequestContext>().unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! drop(request); // scoped instances released
//!
//! let other = root.begin_scope();
//! let c = other.get_bound::<RequestContext>().unwrap();
//! assert!(!Arc::ptr_eq(&a, &c));
//! ```

mod container;
mod error;
mod factory;
mod key;
mod lifecycle;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod resolver;
mod scope;
mod service;
mod storage;

pub use container::*;
pub use error::*;
pub use factory::{AnyInstance, Binding, Strategy, StrategyKind};
pub use key::*;
pub use lifecycle::LifecycleManager;
pub use provider::*;
pub use resolver::Resolver;
pub use scope::*;
pub use service::*;
pub use storage::BindingRegistry;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BatchRegistrar, Container, DiError, Injectable, Lifetime, Resolvable, Resolver, Result,
        Scope, ScopedContainer, Service, ServiceKey, ServiceModule, Value,
    };
    pub use std::sync::Arc;
}
