//! Interceptor chain for hooking into every stage of instance construction.
//!
//! Interceptors can substitute an instance before it is built, veto field
//! population, rewrite bindings, wrap the early reference handed out while a
//! cycle is being resolved, and wrap the finished instance. Typical uses are
//! proxying, auditing and configuration overrides.

use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use crate::descriptors::{Descriptor, PropertyBinding};
use crate::error::BoxError;
use crate::registration::AnyArc;

/// The set of hooks an interceptor takes part in.
///
/// The pipeline only calls the hooks an interceptor declares, so an
/// interceptor that only wraps finished instances declares `AFTER_INIT`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Self = Self(0);
    pub const SHORT_CIRCUIT: Self = Self(1 << 0);
    pub const AFTER_INSTANTIATION: Self = Self(1 << 1);
    pub const BEFORE_POPULATION: Self = Self(1 << 2);
    pub const EARLY_REFERENCE: Self = Self(1 << 3);
    pub const BEFORE_INIT: Self = Self(1 << 4);
    pub const AFTER_INIT: Self = Self(1 << 5);
    pub const ALL: Self = Self(0b11_1111);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Capabilities, &str); 6] = [
            (Capabilities::SHORT_CIRCUIT, "SHORT_CIRCUIT"),
            (Capabilities::AFTER_INSTANTIATION, "AFTER_INSTANTIATION"),
            (Capabilities::BEFORE_POPULATION, "BEFORE_POPULATION"),
            (Capabilities::EARLY_REFERENCE, "EARLY_REFERENCE"),
            (Capabilities::BEFORE_INIT, "BEFORE_INIT"),
            (Capabilities::AFTER_INIT, "AFTER_INIT"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(cap, _)| self.contains(*cap))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "Capabilities({})", set.join(" | "))
    }
}

/// Outcome of the after-instantiation hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    /// Populate fields as declared
    Continue,
    /// Skip field population and go straight to initialization
    Skip,
}

/// A hook object taking part in instance construction.
///
/// Every method has a pass-through default; implement the ones you need and
/// declare them in [`capabilities`](Interceptor::capabilities).
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{AnyArc, BoxError, Capabilities, Container, Descriptor, Interceptor};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Audit {
///     seen: AtomicUsize,
/// }
///
/// impl Interceptor for Audit {
///     fn capabilities(&self) -> Capabilities {
///         Capabilities::AFTER_INIT
///     }
///
///     fn after_init(&self, _name: &str, _instance: &AnyArc) -> Result<Option<AnyArc>, BoxError> {
///         self.seen.fetch_add(1, Ordering::SeqCst);
///         Ok(None) // keep the instance as is
///     }
/// }
///
/// struct Repo;
///
/// let audit = Arc::new(Audit::default());
/// let container = Container::new();
/// container.add_interceptor(audit.clone());
/// container.register_descriptor(Descriptor::builder("repo", || Repo).build());
///
/// container.resolve("repo").unwrap();
/// container.resolve("repo").unwrap();
/// assert_eq!(audit.seen.load(Ordering::SeqCst), 1);
/// ```
pub trait Interceptor: Send + Sync {
    /// Hooks this interceptor takes part in.
    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Produces a substitute before real instantiation. A substitute skips
    /// the rest of the pipeline apart from the after-init hooks.
    fn short_circuit(&self, descriptor: &Descriptor) -> Result<Option<AnyArc>, BoxError> {
        let _ = descriptor;
        Ok(None)
    }

    /// Runs right after the raw instance is created.
    fn after_instantiation(&self, name: &str, instance: &AnyArc) -> Result<Population, BoxError> {
        let _ = (name, instance);
        Ok(Population::Continue)
    }

    /// Returns bindings to add, or to override by field name, before population.
    fn before_population(
        &self,
        name: &str,
        instance: &AnyArc,
        bindings: &[PropertyBinding],
    ) -> Result<Option<Vec<PropertyBinding>>, BoxError> {
        let _ = (name, instance, bindings);
        Ok(None)
    }

    /// Wraps the raw instance handed out early to break a cycle.
    fn early_reference(&self, name: &str, instance: AnyArc) -> Result<AnyArc, BoxError> {
        let _ = name;
        Ok(instance)
    }

    /// Runs before initialization; `None` keeps the current instance.
    fn before_init(&self, name: &str, instance: &AnyArc) -> Result<Option<AnyArc>, BoxError> {
        let _ = (name, instance);
        Ok(None)
    }

    /// Runs after initialization; `None` keeps the current instance.
    fn after_init(&self, name: &str, instance: &AnyArc) -> Result<Option<AnyArc>, BoxError> {
        let _ = (name, instance);
        Ok(None)
    }
}

/// Ordered list of interceptors, applied capability by capability.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    hooks: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: Arc<dyn Interceptor>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    fn with(&self, capability: Capabilities) -> impl Iterator<Item = &Arc<dyn Interceptor>> {
        self.hooks
            .iter()
            .filter(move |hook| hook.capabilities().contains(capability))
    }

    /// First substitute produced by any interceptor.
    pub fn short_circuit(&self, descriptor: &Descriptor) -> Result<Option<AnyArc>, BoxError> {
        for hook in self.with(Capabilities::SHORT_CIRCUIT) {
            if let Some(substitute) = hook.short_circuit(descriptor)? {
                tracing::debug!(name = descriptor.name(), interceptor = hook.name(), "Short-circuited instantiation");
                return Ok(Some(substitute));
            }
        }
        Ok(None)
    }

    /// `Skip` as soon as any interceptor asks for it.
    pub fn after_instantiation(&self, name: &str, instance: &AnyArc) -> Result<Population, BoxError> {
        for hook in self.with(Capabilities::AFTER_INSTANTIATION) {
            if hook.after_instantiation(name, instance)? == Population::Skip {
                tracing::debug!(name, interceptor = hook.name(), "Field population skipped");
                return Ok(Population::Skip);
            }
        }
        Ok(Population::Continue)
    }

    /// Merges every interceptor's binding overrides into `bindings`.
    pub fn before_population(
        &self,
        name: &str,
        instance: &AnyArc,
        mut bindings: Vec<PropertyBinding>,
    ) -> Result<Vec<PropertyBinding>, BoxError> {
        for hook in self.with(Capabilities::BEFORE_POPULATION) {
            if let Some(overrides) = hook.before_population(name, instance, &bindings)? {
                for binding in overrides {
                    match bindings.iter_mut().find(|b| b.field == binding.field) {
                        Some(existing) => *existing = binding,
                        None => bindings.push(binding),
                    }
                }
            }
        }
        Ok(bindings)
    }

    pub fn early_reference(&self, name: &str, instance: AnyArc) -> Result<AnyArc, BoxError> {
        let mut exposed = instance;
        for hook in self.with(Capabilities::EARLY_REFERENCE) {
            exposed = hook.early_reference(name, exposed)?;
        }
        Ok(exposed)
    }

    pub fn before_init(&self, name: &str, instance: AnyArc) -> Result<AnyArc, BoxError> {
        let mut current = instance;
        for hook in self.with(Capabilities::BEFORE_INIT) {
            if let Some(next) = hook.before_init(name, &current)? {
                current = next;
            }
        }
        Ok(current)
    }

    pub fn after_init(&self, name: &str, instance: AnyArc) -> Result<AnyArc, BoxError> {
        let mut current = instance;
        for hook in self.with(Capabilities::AFTER_INIT) {
            if let Some(next) = hook.after_init(name, &current)? {
                current = next;
            }
        }
        Ok(current)
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.name()))
            .finish()
    }
}

/// Closure-backed interceptors for the common single-hook cases.
pub mod interceptors {
    use super::*;

    type WrapFn = dyn Fn(&str, &AnyArc) -> Result<Option<AnyArc>, BoxError> + Send + Sync;

    struct AfterInit(Box<WrapFn>);

    impl Interceptor for AfterInit {
        fn capabilities(&self) -> Capabilities {
            Capabilities::AFTER_INIT
        }

        fn name(&self) -> &str {
            "after_init"
        }

        fn after_init(&self, name: &str, instance: &AnyArc) -> Result<Option<AnyArc>, BoxError> {
            (self.0)(name, instance)
        }
    }

    struct BeforeInit(Box<WrapFn>);

    impl Interceptor for BeforeInit {
        fn capabilities(&self) -> Capabilities {
            Capabilities::BEFORE_INIT
        }

        fn name(&self) -> &str {
            "before_init"
        }

        fn before_init(&self, name: &str, instance: &AnyArc) -> Result<Option<AnyArc>, BoxError> {
            (self.0)(name, instance)
        }
    }

    /// Interceptor running `f` after initialization of every instance.
    pub fn after_init<F>(f: F) -> Arc<dyn Interceptor>
    where
        F: Fn(&str, &AnyArc) -> Result<Option<AnyArc>, BoxError> + Send + Sync + 'static,
    {
        Arc::new(AfterInit(Box::new(f)))
    }

    /// Interceptor running `f` before initialization of every instance.
    pub fn before_init<F>(f: F) -> Arc<dyn Interceptor>
    where
        F: Fn(&str, &AnyArc) -> Result<Option<AnyArc>, BoxError> + Send + Sync + 'static,
    {
        Arc::new(BeforeInit(Box::new(f)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    struct Overrides;

    impl Interceptor for Overrides {
        fn capabilities(&self) -> Capabilities {
            Capabilities::BEFORE_POPULATION
        }

        fn before_population(
            &self,
            _name: &str,
            _instance: &AnyArc,
            _bindings: &[PropertyBinding],
        ) -> Result<Option<Vec<PropertyBinding>>, BoxError> {
            Ok(Some(vec![
                PropertyBinding::literal("port", 9090),
                PropertyBinding::literal("host", "example.org"),
            ]))
        }

        // Not declared, so never called.
        fn after_init(&self, _name: &str, _instance: &AnyArc) -> Result<Option<AnyArc>, BoxError> {
            Err("should not run".into())
        }
    }

    #[test]
    fn capabilities_compose() {
        let caps = Capabilities::EARLY_REFERENCE | Capabilities::AFTER_INIT;
        assert!(caps.contains(Capabilities::AFTER_INIT));
        assert!(!caps.contains(Capabilities::BEFORE_INIT));
        assert!(Capabilities::ALL.contains(caps));
        assert_eq!(format!("{:?}", caps), "Capabilities(EARLY_REFERENCE | AFTER_INIT)");
    }

    #[test]
    fn binding_overrides_replace_in_place_and_append() {
        let mut chain = InterceptorChain::new();
        chain.push(Arc::new(Overrides));
        let instance: AnyArc = Arc::new(());

        let merged = chain
            .before_population("server", &instance, vec![PropertyBinding::literal("port", 8080)])
            .unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].field, "port");
        assert_eq!(merged[0].source, crate::descriptors::Binding::Literal(Value::Int(9090)));
        assert_eq!(merged[1].field, "host");

        assert!(chain.after_init("server", instance).is_ok());
    }

    #[test]
    fn empty_after_init_keeps_current_value() {
        let mut chain = InterceptorChain::new();
        chain.push(interceptors::after_init(|_, _| Ok(None)));
        chain.push(interceptors::after_init(|_, _| Ok(Some(Arc::new(7u32) as AnyArc))));
        chain.push(interceptors::after_init(|_, _| Ok(None)));

        let out = chain.after_init("n", Arc::new(1u32)).unwrap();
        assert_eq!(out.downcast_ref::<u32>(), Some(&7));
    }
}
