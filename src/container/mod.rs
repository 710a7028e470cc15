//! The lifecycle container.
//!
//! This module contains the [`Container`] type, which owns the descriptor
//! registry, the three-tier instance cache, the interceptor chain and the
//! disposal registry, and resolves managed instances by name.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::cache::{InstanceCache, Tier};
use crate::config::ContainerConfig;
use crate::convert::TypeConverter;
use crate::descriptors::{Binding, Descriptor};
use crate::error::{DiError, DiResult};
use crate::instantiation::{InstantiationStrategy, SimpleInstantiationStrategy};
use crate::interceptor::{Interceptor, InterceptorChain};
use crate::internal::{run_teardown, CreationStack, DependentGraph, DisposalRegistry};
use crate::observer::{ContainerObserver, Observers};
use crate::registration::{AnyArc, Registry};
use crate::traits::{Resolver, ResolverCore};

mod pipeline;

/// Container of managed instances.
///
/// A `Container` resolves instances by name, building them on first request
/// from registered [`Descriptor`]s. Singletons are cached for the lifetime of
/// the container; non-shared instances are built fresh on every request.
/// Singletons that depend on each other are wired through early references,
/// so `a -> b -> a` resolves as long as both ends are singletons.
///
/// # Thread Safety
///
/// `Container` is `Send + Sync` and cheap to clone (it is an `Arc` inside).
/// Finished singletons are served without taking the creation lock;
/// constructions are serialized by a reentrant lock so a dependency chain is
/// always built by one thread.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{Autowired, Container, Descriptor};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Orders {
///     billing: Autowired<Billing>,
/// }
///
/// #[derive(Default)]
/// struct Billing {
///     orders: Autowired<Orders>,
/// }
///
/// let container = Container::new();
/// container.register_descriptor(
///     Descriptor::builder("orders", Orders::default)
///         .with_reference("billing", "billing", |o: &Orders, b| o.billing.set(b))
///         .build(),
/// );
/// container.register_descriptor(
///     Descriptor::builder("billing", Billing::default)
///         .with_reference("orders", "orders", |b: &Billing, o| b.orders.set(o))
///         .build(),
/// );
///
/// let orders = container.resolve_as::<Orders>("orders").unwrap();
/// let billing = orders.billing.get_required();
/// assert!(Arc::ptr_eq(&billing.orders.get_required(), &orders));
/// ```
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    pub(crate) config: ContainerConfig,
    pub(crate) registry: RwLock<Registry>,
    /// Pre-built instances, in registration order
    pub(crate) prebuilt: RwLock<Vec<(String, TypeId)>>,
    pub(crate) cache: InstanceCache,
    pub(crate) interceptors: RwLock<InterceptorChain>,
    pub(crate) strategy: RwLock<Arc<dyn InstantiationStrategy>>,
    pub(crate) converter: RwLock<Option<Arc<dyn TypeConverter>>>,
    pub(crate) disposals: Mutex<DisposalRegistry>,
    pub(crate) dependents: Mutex<DependentGraph>,
    pub(crate) observers: RwLock<Observers>,
    creation_lock: ReentrantMutex<()>,
    stack: CreationStack,
}

impl Container {
    /// Creates an empty container with default settings.
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        tracing::debug!(?config, "Creating container");
        let stack = CreationStack::new(config.max_depth);
        Self {
            inner: Arc::new(ContainerInner {
                config,
                registry: RwLock::new(Registry::new()),
                prebuilt: RwLock::new(Vec::new()),
                cache: InstanceCache::new(),
                interceptors: RwLock::new(InterceptorChain::new()),
                strategy: RwLock::new(Arc::new(SimpleInstantiationStrategy)),
                converter: RwLock::new(None),
                disposals: Mutex::new(DisposalRegistry::new()),
                dependents: Mutex::new(DependentGraph::new()),
                observers: RwLock::new(Observers::new()),
                creation_lock: ReentrantMutex::new(()),
                stack,
            }),
        }
    }

    /// Creates a container configured from `FERROUS_LIFECYCLE_*` variables.
    pub fn from_env() -> DiResult<Self> {
        Ok(Self::with_config(ContainerConfig::from_env()?))
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// Registers a descriptor, replacing any earlier one with the same name.
    ///
    /// Replacing a descriptor does not touch an instance already built from
    /// the old one.
    pub fn register_descriptor(&self, descriptor: Descriptor) {
        let name = descriptor.name().to_string();
        let scope = descriptor.scope();
        if self.inner.registry.write().insert(descriptor).is_some() {
            tracing::debug!(name = %name, "Descriptor replaced");
        } else {
            tracing::debug!(name = %name, ?scope, "Descriptor registered");
        }
    }

    /// Registers an already built singleton under `name`.
    ///
    /// The instance is finished as is: no interceptor, init method or
    /// teardown runs for it.
    ///
    /// # Errors
    ///
    /// [`DiError::DuplicateInstance`] if `name` already has a cached instance.
    pub fn register_instance(&self, name: impl Into<String>, instance: AnyArc) -> DiResult<()> {
        let name = name.into();
        let _creating = self.inner.creation_lock.lock();
        if self.inner.cache.tier_of(&name).is_some() {
            return Err(DiError::DuplicateInstance(name));
        }
        let type_id = Any::type_id(&*instance);
        self.inner.cache.promote(&name, instance);
        let mut prebuilt = self.inner.prebuilt.write();
        prebuilt.retain(|(n, _)| n != &name);
        prebuilt.push((name.clone(), type_id));
        tracing::debug!(name = %name, "Pre-built instance registered");
        Ok(())
    }

    /// Appends an interceptor; it applies to constructions started afterwards.
    pub fn add_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        tracing::debug!(interceptor = interceptor.name(), "Interceptor added");
        self.inner.interceptors.write().push(interceptor);
    }

    pub fn add_observer(&self, observer: Arc<dyn ContainerObserver>) {
        self.inner.observers.write().add(observer);
    }

    /// Sets the converter used to coerce literal bindings.
    pub fn set_type_converter(&self, converter: Arc<dyn TypeConverter>) {
        *self.inner.converter.write() = Some(converter);
    }

    pub fn set_instantiation_strategy(&self, strategy: Arc<dyn InstantiationStrategy>) {
        *self.inner.strategy.write() = strategy;
    }

    /// Resolves the instance registered under `name`, building it on first
    /// request.
    pub fn resolve(&self, name: &str) -> DiResult<AnyArc> {
        self.inner.resolve_named(name)
    }

    /// Resolves `name` and downcasts it to `T`.
    pub fn resolve_as<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        Resolver::resolve_as::<T>(self, name)
    }

    /// Resolves the single instance whose type is `T`.
    pub fn resolve_by_type<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        Resolver::resolve_by_type::<T>(self)
    }

    /// Resolves every instance whose type is `T`, in registration order.
    pub fn resolve_all_of_type<T: Send + Sync + 'static>(&self) -> DiResult<Vec<(String, Arc<T>)>> {
        Resolver::resolve_all_of_type::<T>(self)
    }

    /// Whether `name` has a descriptor or a pre-built instance.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.registry.read().contains(name)
            || self.inner.prebuilt.read().iter().any(|(n, _)| n == name)
    }

    /// Descriptor names in registration order.
    pub fn descriptor_names(&self) -> Vec<String> {
        self.inner.registry.read().names().to_vec()
    }

    pub fn descriptor(&self, name: &str) -> Option<Arc<Descriptor>> {
        self.inner.registry.read().get(name)
    }

    pub fn descriptor_count(&self) -> usize {
        self.inner.registry.read().len()
    }

    /// Which cache tier holds `name`, if any.
    pub fn tier_of(&self, name: &str) -> Option<Tier> {
        self.inner.cache.tier_of(name)
    }

    /// Names of finished singletons, in the order they were finished.
    pub fn singleton_names(&self) -> Vec<String> {
        self.inner.cache.finished_names()
    }

    /// Names with a pending teardown handle, in teardown order.
    pub fn pending_disposals(&self) -> Vec<String> {
        self.inner.disposals.lock().names()
    }

    /// Builds every singleton descriptor that is not built yet, in
    /// registration order. Stops at the first failure.
    pub fn pre_instantiate_singletons(&self) -> DiResult<()> {
        let names: Vec<String> = self
            .inner
            .registry
            .read()
            .iter()
            .filter(|d| d.is_singleton())
            .map(|d| d.name().to_string())
            .collect();
        tracing::info!(count = names.len(), "Pre-instantiating singletons");
        for name in names {
            self.inner.resolve_named(&name)?;
        }
        Ok(())
    }

    /// Checks that every reference binding names a known descriptor or
    /// instance, then builds all singletons if `eager_singletons` is set.
    pub fn refresh(&self) -> DiResult<()> {
        {
            let registry = self.inner.registry.read();
            let prebuilt = self.inner.prebuilt.read();
            let known = |name: &str| registry.contains(name) || prebuilt.iter().any(|(n, _)| n == name);
            for descriptor in registry.iter() {
                for binding in descriptor.bindings() {
                    if let Binding::Reference(target) = &binding.source {
                        if !known(target) {
                            return Err(DiError::construction(
                                descriptor.name(),
                                DiError::DescriptorNotFound(target.clone()),
                            ));
                        }
                    }
                }
            }
        }
        if self.inner.config.eager_singletons {
            self.pre_instantiate_singletons()?;
        }
        Ok(())
    }

    /// Runs every teardown handle once, in registration order, then empties
    /// the instance cache.
    ///
    /// A failing handle does not stop the others; all failures are returned
    /// together as [`DiError::TeardownFailed`].
    pub fn teardown_all(&self) -> DiResult<()> {
        let _creating = self.inner.creation_lock.lock();
        let handles = self.inner.disposals.lock().drain();
        tracing::info!(count = handles.len(), "Tearing down singletons");
        let observers = self.inner.observers.read().clone();
        let result = run_teardown(handles, |name, ok| observers.disposed(name, ok));
        self.inner.cache.clear();
        self.inner.dependents.lock().clear();
        self.inner.prebuilt.write().clear();
        result
    }

    /// Shutdown entry point; same as [`teardown_all`](Self::teardown_all).
    pub fn close(&self) -> DiResult<()> {
        self.teardown_all()
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Container Debug ===\n");
        s.push_str("Descriptors:\n");
        for d in self.inner.registry.read().iter() {
            let tier = self.inner.cache.tier_of(d.name());
            s.push_str(&format!("  {} ({}): {:?} {:?}\n", d.name(), d.type_name(), d.scope(), tier));
        }
        s.push_str("Pre-built:\n");
        for (name, _) in self.inner.prebuilt.read().iter() {
            s.push_str(&format!("  {}\n", name));
        }
        s
    }
}

impl ContainerInner {
    /// Resolves `name`, notifying observers around the lookup.
    pub(crate) fn resolve_named(&self, name: &str) -> DiResult<AnyArc> {
        let observers = {
            let observers = self.observers.read();
            if !observers.has_observers() {
                return self.resolve_uninstrumented(name);
            }
            observers.clone()
        };

        let start = Instant::now();
        observers.resolving(name);
        let result = self.resolve_uninstrumented(name);
        match &result {
            Ok(_) => observers.resolved(name, start.elapsed()),
            Err(e) => observers.construction_failed(name, e),
        }
        result
    }

    fn resolve_uninstrumented(&self, name: &str) -> DiResult<AnyArc> {
        // Finished singletons skip the creation lock
        if let Some(instance) = self.cache.get_finished(name) {
            return Ok(instance);
        }

        let _creating = self.creation_lock.lock();
        if let Some(instance) = self.cache.get(name)? {
            return Ok(instance);
        }

        let descriptor = self
            .registry
            .read()
            .get(name)
            .ok_or_else(|| DiError::DescriptorNotFound(name.to_string()))?;

        let _frame = self.stack.enter(name)?;
        tracing::debug!(name, scope = ?descriptor.scope(), depth = self.stack.depth(), "Creating instance");
        pipeline::construct(self, &descriptor)
    }

    /// Evicts every finished singleton that holds the discarded early
    /// reference of `name`, directly or through another singleton, and runs
    /// their teardown.
    pub(crate) fn roll_back_dependents(&self, name: &str) {
        let dependents = {
            let mut graph = self.dependents.lock();
            let dependents = graph.dependents_of(name);
            graph.forget(name);
            dependents
        };

        let mut handles = Vec::new();
        for dependent in dependents {
            if self.cache.evict(&dependent).is_none() {
                continue;
            }
            tracing::warn!(name, dependent = %dependent, "Rolled back a singleton wired with a failed early reference");
            self.dependents.lock().forget(&dependent);
            if let Some(handle) = self.disposals.lock().take(&dependent) {
                handles.push(handle);
            }
        }
        if handles.is_empty() {
            return;
        }

        let observers = self.observers.read().clone();
        if let Err(e) = run_teardown(handles, |n, ok| observers.disposed(n, ok)) {
            tracing::warn!(name, error = %e, "Teardown of rolled back singletons failed");
        }
    }

    fn names_for_type(&self, type_id: TypeId) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry
            .read()
            .names_for_type(type_id)
            .map(str::to_string)
            .collect();
        for (name, id) in self.prebuilt.read().iter() {
            if *id == type_id && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Container {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        // Last handle going away with singletons still waiting for teardown
        if Arc::strong_count(&self.inner) == 1 {
            if let Some(disposals) = self.inner.disposals.try_lock() {
                if !disposals.is_empty() {
                    tracing::warn!(
                        pending = disposals.len(),
                        "Container dropped with undisposed instances. Call teardown_all() before dropping."
                    );
                }
            }
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("config", &self.inner.config)
            .field("descriptors", &self.descriptor_names())
            .field("cache", &self.inner.cache)
            .field("interceptors", &*self.inner.interceptors.read())
            .finish()
    }
}

impl ResolverCore for Container {
    fn resolve(&self, name: &str) -> DiResult<AnyArc> {
        self.inner.resolve_named(name)
    }

    fn names_for_type(&self, type_id: TypeId) -> Vec<String> {
        self.inner.names_for_type(type_id)
    }
}
