//! Registry of teardown handles for finished singletons.

use std::sync::Arc;

use crate::descriptors::{Descriptor, MethodFn};
use crate::error::{BoxError, Cause, DiError, DiResult};
use crate::registration::AnyArc;

/// Teardown handle for one finished singleton.
///
/// Runs the [`Dispose`](crate::Dispose) capability first, then the named
/// destroy method.
pub(crate) struct DisposalHandle {
    name: String,
    instance: AnyArc,
    disposer: Option<MethodFn>,
    destroy_method: Option<(String, MethodFn)>,
}

impl DisposalHandle {
    /// Builds the handle for `instance`, or `None` if the descriptor declares
    /// no teardown.
    ///
    /// Fails if the named destroy method is not in the descriptor's method
    /// table. A destroy method named `dispose` is dropped when the
    /// [`Dispose`](crate::Dispose) capability is present, so it never runs
    /// twice.
    pub(crate) fn for_descriptor(descriptor: &Descriptor, instance: AnyArc) -> DiResult<Option<Self>> {
        let disposer = descriptor.disposer().cloned();
        let destroy_method = match descriptor.destroy_method_name() {
            Some("dispose") if disposer.is_some() => None,
            Some(method) => match descriptor.method(method) {
                Some(f) => Some((method.to_string(), f.clone())),
                None => {
                    return Err(DiError::construction(
                        descriptor.name(),
                        format!("destroy method '{}' not found", method),
                    ))
                }
            },
            None => None,
        };

        if disposer.is_none() && destroy_method.is_none() {
            return Ok(None);
        }
        Ok(Some(Self {
            name: descriptor.name().to_string(),
            instance,
            disposer,
            destroy_method,
        }))
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    fn dispose(self) -> Result<(), BoxError> {
        if let Some(disposer) = &self.disposer {
            disposer(&self.instance)?;
        }
        if let Some((method, f)) = &self.destroy_method {
            tracing::trace!(name = %self.name, method = %method, "Invoking destroy method");
            f(&self.instance)?;
        }
        Ok(())
    }
}

/// Teardown handles in registration order, at most one per name.
#[derive(Default)]
pub(crate) struct DisposalRegistry {
    handles: Vec<DisposalHandle>,
}

impl DisposalRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds `handle` unless its name already has one.
    pub(crate) fn register(&mut self, handle: DisposalHandle) -> bool {
        if self.handles.iter().any(|h| h.name == handle.name) {
            tracing::warn!(name = handle.name(), "Disposal handle already registered, ignoring");
            return false;
        }
        tracing::trace!(name = handle.name(), "Disposal handle registered");
        self.handles.push(handle);
        true
    }

    /// Removes and returns the handle registered for `name`.
    pub(crate) fn take(&mut self, name: &str) -> Option<DisposalHandle> {
        let pos = self.handles.iter().position(|h| h.name == name)?;
        Some(self.handles.remove(pos))
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.handles.iter().map(|h| h.name.clone()).collect()
    }

    /// Removes every handle, for the caller to run outside any lock.
    pub(crate) fn drain(&mut self) -> Vec<DisposalHandle> {
        std::mem::take(&mut self.handles)
    }
}

/// Runs every handle exactly once, in order, and reports all failures together.
///
/// `notify` is called after each handle with its name and outcome.
pub(crate) fn run_teardown<F>(handles: Vec<DisposalHandle>, mut notify: F) -> DiResult<()>
where
    F: FnMut(&str, bool),
{
    let mut failures: Vec<(String, Cause)> = Vec::new();
    for handle in handles {
        let name = handle.name.clone();
        match handle.dispose() {
            Ok(()) => {
                tracing::debug!(name = %name, "Instance disposed");
                notify(&name, true);
            }
            Err(e) => {
                tracing::error!(name = %name, error = %e, "Disposal failed");
                notify(&name, false);
                failures.push((name, Arc::from(e)));
            }
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(DiError::TeardownFailed(failures))
    }
}
