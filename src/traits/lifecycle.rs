//! Lifecycle capability traits for managed instances.

use crate::error::BoxError;

/// Initialization capability.
///
/// Declared on a descriptor with
/// [`DescriptorBuilder::initializing`](crate::DescriptorBuilder::initializing).
/// The container calls [`initialize`](Initialize::initialize) once all fields
/// have been populated and before any named init method.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{BoxError, Container, Descriptor, Initialize};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Pool {
///     ready: AtomicBool,
/// }
///
/// impl Initialize for Pool {
///     fn initialize(&self) -> Result<(), BoxError> {
///         self.ready.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container.register_descriptor(Descriptor::builder("pool", Pool::default).initializing().build());
///
/// let pool = container.resolve_as::<Pool>("pool").unwrap();
/// assert!(pool.ready.load(Ordering::SeqCst));
/// ```
pub trait Initialize: Send + Sync + 'static {
    /// Completes setup after field population.
    fn initialize(&self) -> Result<(), BoxError>;
}

/// Teardown capability.
///
/// Declared on a descriptor with
/// [`DescriptorBuilder::disposable`](crate::DescriptorBuilder::disposable).
/// Finished singletons that declare it get a disposal entry and are disposed
/// by [`Container::teardown_all`](crate::Container::teardown_all), in
/// registration order.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{BoxError, Container, Descriptor, Dispose};
///
/// struct Cache {
///     name: String,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) -> Result<(), BoxError> {
///         println!("Flushing cache: {}", self.name);
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container.register_descriptor(
///     Descriptor::builder("cache", || Cache { name: "users".into() })
///         .disposable()
///         .build(),
/// );
/// container.resolve("cache").unwrap();
/// container.teardown_all().unwrap();
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Releases the resources held by the instance.
    fn dispose(&self) -> Result<(), BoxError>;
}
