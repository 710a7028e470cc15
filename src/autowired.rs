//! Write-once slot for reference fields.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

/// A field slot the container fills with a managed instance.
///
/// Managed instances are shared before their fields are populated, so a
/// reference field has to be writable through `&self`. `Autowired<T>` is that
/// slot: empty after instantiation, set once during population.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::Autowired;
/// use std::sync::Arc;
///
/// struct Repo;
///
/// let slot: Autowired<Repo> = Autowired::new();
/// assert!(!slot.is_set());
/// slot.set(Arc::new(Repo));
/// assert!(slot.is_set());
/// assert!(slot.get().is_some());
/// ```
pub struct Autowired<T> {
    cell: OnceCell<Arc<T>>,
}

impl<T> Autowired<T> {
    pub const fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    /// Fills the slot. Later writes are ignored, so the first binding wins.
    pub fn set(&self, value: Arc<T>) {
        if self.cell.set(value).is_err() {
            tracing::trace!(slot = type_name::<T>(), "Autowired slot already set, ignoring write");
        }
    }

    /// Fills the slot, reporting whether this call was the one that set it.
    pub fn try_set(&self, value: Arc<T>) -> bool {
        self.cell.set(value).is_ok()
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    /// Borrowing access without bumping the reference count.
    pub fn get_ref(&self) -> Option<&T> {
        self.cell.get().map(|arc| arc.as_ref())
    }

    /// Returns the injected instance.
    ///
    /// # Panics
    ///
    /// Panics if the slot was never populated.
    pub fn get_required(&self) -> Arc<T> {
        match self.cell.get() {
            Some(value) => value.clone(),
            None => panic!("Autowired<{}> was never populated", type_name::<T>()),
        }
    }

    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for Autowired<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Autowired<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Autowired")
            .field("type", &type_name::<T>())
            .field("set", &self.is_set())
            .finish()
    }
}
