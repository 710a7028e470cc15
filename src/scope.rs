//! Instance scope definitions.

/// Scope controlling whether a descriptor's instance is cached and shared.
///
/// # Scope Characteristics
///
/// - **Singleton**: built once, promoted to the finished tier, shared for the
///   lifetime of the container and eligible for early exposure during cycles
/// - **NonShared**: built fresh on every request, never cached, never exposed early
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{Container, Descriptor, Scope};
/// use std::sync::Arc;
///
/// struct Clock;
/// struct Request;
///
/// let container = Container::new();
/// container.register_descriptor(Descriptor::builder("clock", || Clock).build());
/// container.register_descriptor(
///     Descriptor::builder("request", || Request)
///         .scope(Scope::NonShared)
///         .build(),
/// );
///
/// let a = container.resolve("clock").unwrap();
/// let b = container.resolve("clock").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let r1 = container.resolve("request").unwrap();
/// let r2 = container.resolve("request").unwrap();
/// assert!(!Arc::ptr_eq(&r1, &r2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "kebab-case"))]
pub enum Scope {
    /// Single instance per container, cached in the finished tier
    #[default]
    Singleton,
    /// New instance per resolution, never cached
    NonShared,
}

impl Scope {
    /// Returns `true` for [`Scope::Singleton`].
    pub fn is_singleton(self) -> bool {
        matches!(self, Scope::Singleton)
    }
}
