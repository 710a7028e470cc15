//! Descriptor registration storage.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptors::Descriptor;

/// Type-erased Arc for storage
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Descriptor registry keyed by name, remembering registration order.
#[derive(Default)]
pub(crate) struct Registry {
    /// Names in first-registration order
    order: Vec<String>,
    /// Name -> descriptor
    by_name: HashMap<String, Arc<Descriptor>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts a descriptor, replacing any earlier one with the same name.
    ///
    /// Returns the replaced descriptor. A replaced name keeps its original
    /// position in the registration order.
    pub(crate) fn insert(&mut self, descriptor: Descriptor) -> Option<Arc<Descriptor>> {
        let name = descriptor.name().to_string();
        let previous = self.by_name.insert(name.clone(), Arc::new(descriptor));
        if previous.is_none() {
            self.order.push(name);
        }
        previous
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<Descriptor>> {
        self.by_name.get(name).cloned()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub(crate) fn names(&self) -> &[String] {
        &self.order
    }

    /// Iterator over descriptors in registration order
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<Descriptor>> {
        self.order.iter().filter_map(move |name| self.by_name.get(name))
    }

    /// Names of descriptors producing `type_id`, in registration order.
    pub(crate) fn names_for_type(&self, type_id: TypeId) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(move |d| Descriptor::type_id(d) == type_id)
            .map(|d| d.name())
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}
