//! Resolver traits for managed instance lookup.

use std::any::{type_name, TypeId};
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::registration::AnyArc;

/// Core resolver trait for object-safe instance resolution.
///
/// This trait exposes the type-erased lookup the construction pipeline is
/// built on. Most callers use [`Resolver`] instead, which adds typed helpers.
pub trait ResolverCore: Send + Sync {
    /// Resolves the managed instance registered under `name`, constructing it
    /// (and, recursively, its dependencies) on first request.
    ///
    /// # Returns
    ///
    /// * `Ok(AnyArc)` - The instance as `Arc<dyn Any + Send + Sync>`
    /// * `Err(DiError)` - Unknown name, construction failure, unresolvable cycle
    fn resolve(&self, name: &str) -> DiResult<AnyArc>;

    /// Names of every descriptor or pre-built instance whose type is `type_id`,
    /// in registration order.
    fn names_for_type(&self, type_id: TypeId) -> Vec<String>;
}

/// High-level resolver interface with typed helpers.
///
/// Implemented for every [`ResolverCore`], so the container and any wrapper
/// around it share the same API.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{Container, Descriptor, Resolver};
///
/// struct Database {
///     url: String,
/// }
///
/// let container = Container::new();
/// container.register_descriptor(
///     Descriptor::builder("db", || Database { url: "postgres://localhost".into() }).build(),
/// );
///
/// let by_name = container.resolve_as::<Database>("db").unwrap();
/// let by_type = container.resolve_by_type::<Database>().unwrap();
/// assert_eq!(by_name.url, "postgres://localhost");
/// assert!(std::sync::Arc::ptr_eq(&by_name, &by_type));
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves `name` and downcasts it to `T`.
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<T>)` - The resolved instance
    /// * `Err(DiError::TypeMismatch)` - The instance is not a `T`
    fn resolve_as<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        self.resolve(name)?.downcast::<T>().map_err(|_| DiError::TypeMismatch {
            name: name.to_string(),
            expected: type_name::<T>(),
        })
    }

    /// Resolves the single instance whose type is `T`.
    ///
    /// Fails with [`DiError::NoUniqueInstance`] when zero or several
    /// candidates are registered.
    fn resolve_by_type<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let mut candidates = self.names_for_type(TypeId::of::<T>());
        match candidates.len() {
            1 => {
                let name = candidates.remove(0);
                self.resolve_as::<T>(&name)
            }
            _ => Err(DiError::NoUniqueInstance {
                type_name: type_name::<T>(),
                candidates,
            }),
        }
    }

    /// Resolves every instance whose type is `T`, paired with its name, in
    /// registration order.
    fn resolve_all_of_type<T: Send + Sync + 'static>(&self) -> DiResult<Vec<(String, Arc<T>)>> {
        self.names_for_type(TypeId::of::<T>())
            .into_iter()
            .map(|name| {
                let instance = self.resolve_as::<T>(&name)?;
                Ok((name, instance))
            })
            .collect()
    }

    /// Resolves `name` as `T`, panicking if resolution fails.
    ///
    /// # Panics
    ///
    /// Panics with the resolution error's message.
    fn resolve_required<T: Send + Sync + 'static>(&self, name: &str) -> Arc<T> {
        match self.resolve_as::<T>(name) {
            Ok(instance) => instance,
            Err(e) => panic!("Failed to resolve '{}': {}", name, e),
        }
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
