//! # ferrous-lifecycle
//!
//! An object-lifecycle container: it builds, wires and tears down a graph of
//! long-lived managed instances from declarative descriptors, including graphs
//! where singletons depend on each other.
//!
//! ## Features
//!
//! - **Named descriptors**: a recipe, a binding table (field to literal or
//!   reference) and typed setters, with no runtime reflection
//! - **Singleton and non-shared scopes**
//! - **Cycle resolution**: singletons in a cycle are wired through early
//!   references held in a three-tier instance cache
//! - **Interceptors**: hooks at every construction stage, for proxying and auditing
//! - **Lifecycle**: `Initialize`/`Dispose` capabilities plus named init and
//!   destroy methods, with best-effort teardown
//! - **Thread-safe**: finished singletons are served without the
//!   creation lock; constructions are serialized
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_lifecycle::{Autowired, Container, Descriptor};
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! #[derive(Default)]
//! struct Database {
//!     url: std::sync::RwLock<String>,
//! }
//!
//! #[derive(Default)]
//! struct UserService {
//!     db: Autowired<Database>,
//!     started: AtomicBool,
//! }
//!
//! let container = Container::new();
//! container.register_descriptor(
//!     Descriptor::builder("db", Database::default)
//!         .with_value("url", "postgres://localhost", |d: &Database, v: String| *d.url.write().unwrap() = v)
//!         .build(),
//! );
//! container.register_descriptor(
//!     Descriptor::builder("users", UserService::default)
//!         .with_reference("db", "db", |s: &UserService, db| s.db.set(db))
//!         .method("start", |s: &UserService| {
//!             s.started.store(true, Ordering::SeqCst);
//!             Ok(())
//!         })
//!         .init_method("start")
//!         .build(),
//! );
//!
//! let users = container.resolve_as::<UserService>("users").unwrap();
//! assert!(users.started.load(Ordering::SeqCst));
//! assert_eq!(*users.db.get_required().url.read().unwrap(), "postgres://localhost");
//! ```
//!
//! ## Circular References
//!
//! ```rust
//! use ferrous_lifecycle::{Autowired, Container, Descriptor};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct A {
//!     b: Autowired<B>,
//! }
//!
//! #[derive(Default)]
//! struct B {
//!     a: Autowired<A>,
//! }
//!
//! let container = Container::new();
//! container.register_descriptor(
//!     Descriptor::builder("a", A::default)
//!         .with_reference("b", "b", |a: &A, b| a.b.set(b))
//!         .build(),
//! );
//! container.register_descriptor(
//!     Descriptor::builder("b", B::default)
//!         .with_reference("a", "a", |b: &B, a| b.a.set(a))
//!         .build(),
//! );
//!
//! let a = container.resolve_as::<A>("a").unwrap();
//! assert!(Arc::ptr_eq(&a.b.get_required().a.get_required(), &a));
//! ```
//!
//! ## Teardown
//!
//! ```rust
//! use ferrous_lifecycle::{BoxError, Container, Descriptor, Dispose};
//!
//! struct Pool;
//!
//! impl Dispose for Pool {
//!     fn dispose(&self) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//! }
//!
//! let container = Container::new();
//! container.register_descriptor(Descriptor::builder("pool", || Pool).disposable().build());
//! container.resolve("pool").unwrap();
//! assert_eq!(container.pending_disposals(), vec!["pool".to_string()]);
//! container.teardown_all().unwrap();
//! assert!(container.pending_disposals().is_empty());
//! ```

// Module declarations
pub mod autowired;
pub mod cache;
pub mod config;
pub mod container;
pub mod convert;
pub mod descriptors;
pub mod error;
pub mod instantiation;
pub mod interceptor;
pub mod observer;
pub mod scope;
pub mod traits;
pub mod value;

// Internal modules
mod internal;
mod registration;

// Re-export core types
pub use autowired::Autowired;
pub use cache::{EarlyFactory, InstanceCache, Tier};
pub use config::ContainerConfig;
pub use container::Container;
pub use convert::{StandardConverter, TypeConverter};
pub use descriptors::{Binding, Descriptor, DescriptorBuilder, FieldSetter, FieldTarget, Injected, PropertyBinding};
pub use error::{BoxError, Cause, DiError, DiResult};
pub use instantiation::{InstantiationStrategy, SimpleInstantiationStrategy};
pub use interceptor::{interceptors, Capabilities, Interceptor, InterceptorChain, Population};
pub use observer::{ContainerObserver, LoggingObserver, MetricsObserver};
pub use registration::AnyArc;
pub use scope::Scope;
pub use traits::{Dispose, Initialize, Resolver, ResolverCore};
pub use value::{FromValue, Value, ValueError, ValueKind};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_singleton_resolution() {
        let container = Container::new();
        container.register_descriptor(Descriptor::builder("answer", || 42usize).build());

        let a = container.resolve_as::<usize>("answer").unwrap();
        let b = container.resolve_as::<usize>("answer").unwrap();

        assert_eq!(*a, 42);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_non_shared_resolution() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let container = Container::new();
        container.register_descriptor(
            Descriptor::builder("id", move || format!("instance-{}", c.fetch_add(1, Ordering::SeqCst) + 1))
                .non_shared()
                .build(),
        );

        let a = container.resolve_as::<String>("id").unwrap();
        let b = container.resolve_as::<String>("id").unwrap();

        assert_eq!(a.as_str(), "instance-1");
        assert_eq!(b.as_str(), "instance-2");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(container.tier_of("id"), None);
    }

    #[test]
    fn test_type_mismatch() {
        let container = Container::new();
        container.register_descriptor(Descriptor::builder("answer", || 42usize).build());
        assert!(matches!(
            container.resolve_as::<String>("answer"),
            Err(DiError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_container_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Container>();
        assert_send_sync::<InstanceCache>();
    }
}
