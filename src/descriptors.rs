//! Declarative descriptors describing how to build one managed instance.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::BoxError;
use crate::registration::AnyArc;
use crate::scope::Scope;
use crate::traits::{Dispose, Initialize};
use crate::value::{FromValue, Value, ValueKind};

pub(crate) type RecipeFn = Arc<dyn Fn() -> Result<AnyArc, BoxError> + Send + Sync>;
pub(crate) type SetterFn = Arc<dyn Fn(&AnyArc, Injected) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type MethodFn = Arc<dyn Fn(&AnyArc) -> Result<(), BoxError> + Send + Sync>;

/// Source of a field's value.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// A literal, coerced to the field's kind if needed
    Literal(Value),
    /// The managed instance registered under this name
    Reference(String),
}

/// One row of a descriptor's binding table: field name to source of value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyBinding {
    pub field: String,
    pub source: Binding,
}

impl PropertyBinding {
    pub fn literal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            source: Binding::Literal(value.into()),
        }
    }

    pub fn reference(field: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            source: Binding::Reference(target.into()),
        }
    }
}

/// Value handed to a field setter once its binding has been resolved.
#[derive(Clone)]
pub enum Injected {
    Literal(Value),
    Instance(AnyArc),
}

impl fmt::Debug for Injected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Injected::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Injected::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

/// What kind of value a field setter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    /// A literal of the given kind
    Literal(ValueKind),
    /// A managed instance of the named type
    Instance(&'static str),
}

/// Typed accessor that writes one field of a managed instance.
#[derive(Clone)]
pub struct FieldSetter {
    pub(crate) target: FieldTarget,
    pub(crate) apply: SetterFn,
}

impl FieldSetter {
    pub fn target(&self) -> FieldTarget {
        self.target
    }

    pub(crate) fn set(&self, instance: &AnyArc, value: Injected) -> Result<(), BoxError> {
        (self.apply)(instance, value)
    }
}

/// Descriptor for one managed instance.
///
/// A descriptor is immutable once built. It carries the construction recipe,
/// the binding table (field name to literal or reference), a typed setter table
/// used to write those fields, a named-method table for init and destroy
/// methods, and the lifecycle capabilities the instance type declares.
///
/// Fields of a managed instance are written through `&T` after the instance is
/// shared, so they use interior mutability (an [`Autowired`](crate::Autowired)
/// slot, an atomic, or a lock).
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{Autowired, Container, Descriptor};
/// use std::sync::atomic::{AtomicU16, Ordering};
///
/// #[derive(Default)]
/// struct Server {
///     port: AtomicU16,
///     repo: Autowired<Repo>,
/// }
///
/// #[derive(Default)]
/// struct Repo;
///
/// let container = Container::new();
/// container.register_descriptor(Descriptor::builder("repo", Repo::default).build());
/// container.register_descriptor(
///     Descriptor::builder("server", Server::default)
///         .with_value("port", 8080u16, |s: &Server, v: u16| s.port.store(v, Ordering::SeqCst))
///         .with_reference("repo", "repo", |s: &Server, r| s.repo.set(r))
///         .build(),
/// );
///
/// let server = container.resolve_as::<Server>("server").unwrap();
/// assert_eq!(server.port.load(Ordering::SeqCst), 8080);
/// assert!(server.repo.is_set());
/// ```
#[derive(Clone)]
pub struct Descriptor {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    scope: Scope,
    recipe: RecipeFn,
    bindings: Vec<PropertyBinding>,
    setters: HashMap<String, FieldSetter>,
    methods: HashMap<String, MethodFn>,
    init_method: Option<String>,
    destroy_method: Option<String>,
    initializer: Option<MethodFn>,
    disposer: Option<MethodFn>,
}

impl Descriptor {
    /// Starts a descriptor for `T` built by an infallible recipe.
    pub fn builder<T, F>(name: impl Into<String>, recipe: F) -> DescriptorBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        DescriptorBuilder::new(
            name.into(),
            Arc::new(move || Ok::<AnyArc, BoxError>(Arc::new(recipe()))),
        )
    }

    /// Starts a descriptor for `T` built by a fallible recipe.
    pub fn try_builder<T, F>(name: impl Into<String>, recipe: F) -> DescriptorBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        DescriptorBuilder::new(
            name.into(),
            Arc::new(move || Ok::<AnyArc, BoxError>(Arc::new(recipe()?))),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_singleton(&self) -> bool {
        self.scope.is_singleton()
    }

    /// Type id of the instance the recipe produces.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The binding table, in declaration order.
    pub fn bindings(&self) -> &[PropertyBinding] {
        &self.bindings
    }

    pub fn setter(&self, field: &str) -> Option<&FieldSetter> {
        self.setters.get(field)
    }

    pub fn init_method_name(&self) -> Option<&str> {
        self.init_method.as_deref()
    }

    pub fn destroy_method_name(&self) -> Option<&str> {
        self.destroy_method.as_deref()
    }

    /// Whether instances declare the [`Initialize`] capability.
    pub fn is_initializing(&self) -> bool {
        self.initializer.is_some()
    }

    /// Whether instances declare the [`Dispose`] capability.
    pub fn is_disposable(&self) -> bool {
        self.disposer.is_some()
    }

    /// Whether a finished singleton needs a disposal entry.
    pub fn needs_teardown(&self) -> bool {
        self.disposer.is_some() || self.destroy_method.is_some()
    }

    pub(crate) fn recipe(&self) -> &RecipeFn {
        &self.recipe
    }

    pub(crate) fn method(&self, name: &str) -> Option<&MethodFn> {
        self.methods.get(name)
    }

    pub(crate) fn initializer(&self) -> Option<&MethodFn> {
        self.initializer.as_ref()
    }

    pub(crate) fn disposer(&self) -> Option<&MethodFn> {
        self.disposer.as_ref()
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("scope", &self.scope)
            .field("bindings", &self.bindings)
            .field("init_method", &self.init_method)
            .field("destroy_method", &self.destroy_method)
            .field("initializing", &self.is_initializing())
            .field("disposable", &self.is_disposable())
            .finish()
    }
}

/// Fluent builder for [`Descriptor`].
pub struct DescriptorBuilder<T> {
    inner: Descriptor,
    _marker: PhantomData<fn() -> T>,
}

fn view<T: 'static>(instance: &AnyArc) -> Result<&T, BoxError> {
    (**instance)
        .downcast_ref::<T>()
        .ok_or_else(|| format!("instance is not a {}", type_name::<T>()).into())
}

impl<T> DescriptorBuilder<T>
where
    T: Send + Sync + 'static,
{
    fn new(name: String, recipe: RecipeFn) -> Self {
        Self {
            inner: Descriptor {
                name,
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                scope: Scope::Singleton,
                recipe,
                bindings: Vec::new(),
                setters: HashMap::new(),
                methods: HashMap::new(),
                init_method: None,
                destroy_method: None,
                initializer: None,
                disposer: None,
            },
            _marker: PhantomData,
        }
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.inner.scope = scope;
        self
    }

    pub fn non_shared(self) -> Self {
        self.scope(Scope::NonShared)
    }

    /// Binds a literal to `field`.
    pub fn property(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inner.bindings.push(PropertyBinding::literal(field, value));
        self
    }

    /// Binds the instance named `target` to `field`.
    pub fn reference(mut self, field: impl Into<String>, target: impl Into<String>) -> Self {
        self.inner.bindings.push(PropertyBinding::reference(field, target));
        self
    }

    /// Declares the setter for a literal field of type `V`.
    pub fn field<V, F>(mut self, field: impl Into<String>, setter: F) -> Self
    where
        V: FromValue,
        F: Fn(&T, V) + Send + Sync + 'static,
    {
        let field = field.into();
        let label = field.clone();
        let apply: SetterFn = Arc::new(move |instance: &AnyArc, injected: Injected| {
            let target = view::<T>(instance)?;
            match injected {
                Injected::Literal(value) => {
                    setter(target, V::from_value(value)?);
                    Ok(())
                }
                Injected::Instance(_) => Err(format!("field '{}' takes a literal, not a reference", label).into()),
            }
        });
        self.inner.setters.insert(
            field,
            FieldSetter {
                target: FieldTarget::Literal(V::KIND),
                apply,
            },
        );
        self
    }

    /// Declares the setter for a field holding a reference to a `D` instance.
    pub fn inject<D, F>(mut self, field: impl Into<String>, setter: F) -> Self
    where
        D: Send + Sync + 'static,
        F: Fn(&T, Arc<D>) + Send + Sync + 'static,
    {
        let field = field.into();
        let label = field.clone();
        let apply: SetterFn = Arc::new(move |instance: &AnyArc, injected: Injected| {
            let target = view::<T>(instance)?;
            match injected {
                Injected::Instance(dependency) => {
                    let dependency = dependency.downcast::<D>().map_err(|_| {
                        format!("field '{}' expects an instance of {}", label, type_name::<D>())
                    })?;
                    setter(target, dependency);
                    Ok(())
                }
                Injected::Literal(value) => {
                    Err(format!("field '{}' takes a reference, not the literal '{}'", label, value).into())
                }
            }
        });
        self.inner.setters.insert(
            field,
            FieldSetter {
                target: FieldTarget::Instance(type_name::<D>()),
                apply,
            },
        );
        self
    }

    /// Binds a literal and declares its setter in one step.
    pub fn with_value<V, F>(self, field: &str, value: impl Into<Value>, setter: F) -> Self
    where
        V: FromValue,
        F: Fn(&T, V) + Send + Sync + 'static,
    {
        self.property(field, value).field(field, setter)
    }

    /// Binds a reference and declares its setter in one step.
    pub fn with_reference<D, F>(self, field: &str, target: impl Into<String>, setter: F) -> Self
    where
        D: Send + Sync + 'static,
        F: Fn(&T, Arc<D>) + Send + Sync + 'static,
    {
        self.reference(field, target).inject(field, setter)
    }

    /// Adds a named method that init/destroy method names can refer to.
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let method: MethodFn = Arc::new(move |instance: &AnyArc| method(view::<T>(instance)?));
        self.inner.methods.insert(name.into(), method);
        self
    }

    pub fn init_method(mut self, name: impl Into<String>) -> Self {
        self.inner.init_method = Some(name.into());
        self
    }

    pub fn destroy_method(mut self, name: impl Into<String>) -> Self {
        self.inner.destroy_method = Some(name.into());
        self
    }

    pub fn build(self) -> Descriptor {
        self.inner
    }
}

impl<T> DescriptorBuilder<T>
where
    T: Initialize,
{
    /// Declares that instances implement [`Initialize`].
    pub fn initializing(mut self) -> Self {
        self.inner.initializer = Some(Arc::new(|instance: &AnyArc| view::<T>(instance)?.initialize()));
        self
    }
}

impl<T> DescriptorBuilder<T>
where
    T: Dispose,
{
    /// Declares that instances implement [`Dispose`].
    pub fn disposable(mut self) -> Self {
        self.inner.disposer = Some(Arc::new(|instance: &AnyArc| view::<T>(instance)?.dispose()));
        self
    }
}
