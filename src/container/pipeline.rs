//! The per-name construction pipeline.
//!
//! Turns a descriptor into a finished instance:
//! short-circuit, instantiate, expose a deferred early reference, populate
//! fields, initialize, wrap, register teardown and promote.

use std::sync::Arc;

use crate::container::ContainerInner;
use crate::convert::TypeConverter;
use crate::descriptors::{Binding, Descriptor, FieldTarget, Injected, PropertyBinding};
use crate::error::{BoxError, DiError, DiResult};
use crate::interceptor::{InterceptorChain, Population};
use crate::internal::DisposalHandle;
use crate::registration::AnyArc;
use crate::value::Value;

/// Builds one instance of `descriptor`.
///
/// On failure the name's unfinished cache entries are discarded and nothing is
/// promoted. If its early reference was already handed out, the finished
/// singletons holding it are rolled back too.
pub(crate) fn construct(container: &ContainerInner, descriptor: &Descriptor) -> DiResult<AnyArc> {
    let name = descriptor.name();
    let chain = container.interceptors.read().clone();

    if let Some(substitute) = chain.short_circuit(descriptor).map_err(wrap(name))? {
        let finished = chain.after_init(name, substitute).map_err(wrap(name))?;
        if descriptor.is_singleton() {
            container.cache.promote(name, finished.clone());
        }
        return Ok(finished);
    }

    let result = build(container, descriptor, &chain);
    if let Err(e) = &result {
        tracing::debug!(name, error = %e, "Construction aborted");
        let exposed = container.cache.get_early(name).is_some();
        container.cache.discard(name);
        if exposed {
            container.roll_back_dependents(name);
        }
    }
    result
}

fn build(container: &ContainerInner, descriptor: &Descriptor, chain: &InterceptorChain) -> DiResult<AnyArc> {
    let name = descriptor.name();
    let singleton = descriptor.is_singleton();

    let strategy = container.strategy.read().clone();
    let raw = strategy.instantiate(descriptor).map_err(wrap(name))?;
    tracing::trace!(name, type_name = descriptor.type_name(), "Raw instance created");

    if singleton && container.config.allow_circular_references {
        let hooks = chain.clone();
        let exposed = raw.clone();
        let key = name.to_string();
        container
            .cache
            .register_deferred(name, Box::new(move || hooks.early_reference(&key, exposed)));
    }

    match chain.after_instantiation(name, &raw).map_err(wrap(name))? {
        Population::Continue => {
            let bindings = chain
                .before_population(name, &raw, descriptor.bindings().to_vec())
                .map_err(wrap(name))?;
            populate(container, descriptor, &raw, &bindings)?;
        }
        Population::Skip => {}
    }

    let current = chain.before_init(name, raw).map_err(wrap(name))?;
    initialize(descriptor, &current)?;
    let finished = chain.after_init(name, current.clone()).map_err(wrap(name))?;

    if !singleton {
        return Ok(finished);
    }

    if let Some(handle) = DisposalHandle::for_descriptor(descriptor, current.clone())? {
        container.disposals.lock().register(handle);
    }

    // An early reference already handed out wins, so every holder sees one identity.
    let exposed = match container.cache.get_early(name) {
        Some(early) => {
            if !Arc::ptr_eq(&finished, &current) {
                tracing::warn!(
                    name,
                    "After-init hooks replaced an instance that was already exposed early; keeping the early reference"
                );
            }
            early
        }
        None => finished,
    };
    container.cache.promote(name, exposed.clone());
    Ok(exposed)
}

fn populate(
    container: &ContainerInner,
    descriptor: &Descriptor,
    instance: &AnyArc,
    bindings: &[PropertyBinding],
) -> DiResult<()> {
    let name = descriptor.name();
    for binding in bindings {
        let setter = descriptor.setter(&binding.field).ok_or_else(|| {
            DiError::construction(name, format!("no setter declared for field '{}'", binding.field))
        })?;

        let injected = match &binding.source {
            Binding::Reference(target) => {
                tracing::trace!(name, field = %binding.field, target = %target, "Resolving reference");
                let instance = container.resolve_named(target)?;
                if descriptor.is_singleton() {
                    container.dependents.lock().record(target, name);
                }
                Injected::Instance(instance)
            }
            Binding::Literal(value) => {
                let converter = container.converter.read().clone();
                let value = coerce(value.clone(), setter.target(), converter.as_deref())
                    .map_err(|e| {
                        DiError::construction(name, format!("field '{}': {}", binding.field, e))
                    })?;
                Injected::Literal(value)
            }
        };

        setter
            .set(instance, injected)
            .map_err(|e| DiError::construction(name, format!("field '{}': {}", binding.field, e)))?;
    }
    Ok(())
}

/// Converts `value` to the setter's kind when they differ and a converter can.
fn coerce(value: Value, target: FieldTarget, converter: Option<&dyn TypeConverter>) -> Result<Value, BoxError> {
    match (target, converter) {
        (FieldTarget::Literal(kind), Some(converter))
            if value.kind() != kind && converter.can_convert(value.kind(), kind) =>
        {
            converter.convert(value, kind)
        }
        _ => Ok(value),
    }
}

/// Runs the `Initialize` capability, then the named init method.
fn initialize(descriptor: &Descriptor, instance: &AnyArc) -> DiResult<()> {
    let name = descriptor.name();
    if let Some(init) = descriptor.initializer() {
        init(instance).map_err(wrap(name))?;
    }
    match descriptor.init_method_name() {
        Some("initialize") if descriptor.is_initializing() => {}
        Some(method) => {
            let f = descriptor
                .method(method)
                .ok_or_else(|| DiError::construction(name, format!("init method '{}' not found", method)))?;
            tracing::trace!(name, method, "Invoking init method");
            f(instance).map_err(wrap(name))?;
        }
        None => {}
    }
    Ok(())
}

fn wrap(name: &str) -> impl Fn(BoxError) -> DiError + '_ {
    move |cause| DiError::construction(name, cause)
}
