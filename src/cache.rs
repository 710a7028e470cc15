//! Three-tier instance cache.
//!
//! For every name the cache holds at most one of:
//!
//! 1. a finished instance,
//! 2. an early-exposed reference to an instance that is still being built,
//! 3. a deferred factory that produces that early reference on demand.
//!
//! Tier 3 exists so the early-reference hooks only run when a dependency cycle
//! actually asks for the unfinished instance. [`InstanceCache::get`] consumes
//! the factory, so those hooks run at most once per name.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use parking_lot::ReentrantMutex;

use crate::error::{BoxError, DiError, DiResult};
use crate::registration::AnyArc;

/// Deferred producer of an early reference.
pub type EarlyFactory = Box<dyn FnOnce() -> Result<AnyArc, BoxError> + Send>;

/// Which tier currently holds a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Finished,
    Early,
    Deferred,
}

#[derive(Default)]
struct Tiers {
    finished: HashMap<String, AnyArc>,
    early: HashMap<String, AnyArc>,
    deferred: HashMap<String, EarlyFactory>,
    /// Names in promotion order
    order: Vec<String>,
}

/// Name-keyed instance cache shared by every construction in a container.
///
/// All three tiers sit behind one lock per cache. The lock is reentrant so a
/// deferred factory can run while the lock is held, keeping the
/// consume-then-expose step of [`get`](Self::get) atomic.
pub struct InstanceCache {
    tiers: ReentrantMutex<RefCell<Tiers>>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self {
            tiers: ReentrantMutex::new(RefCell::new(Tiers::default())),
        }
    }

    /// Looks `name` up in tier 1, then tier 2, then tier 3.
    ///
    /// A tier 3 hit invokes and removes the factory and stores its result in
    /// tier 2. A failing factory is reported as a construction failure of
    /// `name` and leaves nothing behind.
    pub fn get(&self, name: &str) -> DiResult<Option<AnyArc>> {
        let guard = self.tiers.lock();
        let factory = {
            let mut tiers = guard.borrow_mut();
            if let Some(instance) = tiers.finished.get(name) {
                return Ok(Some(instance.clone()));
            }
            if let Some(instance) = tiers.early.get(name) {
                tracing::trace!(name, "Early reference served from cache");
                return Ok(Some(instance.clone()));
            }
            match tiers.deferred.remove(name) {
                Some(factory) => factory,
                None => return Ok(None),
            }
        };

        tracing::debug!(name, "Consuming deferred factory to expose early reference");
        let early = factory().map_err(|cause| DiError::construction(name, cause))?;

        let mut tiers = guard.borrow_mut();
        if let Some(finished) = tiers.finished.get(name) {
            return Ok(Some(finished.clone()));
        }
        tiers.early.insert(name.to_string(), early.clone());
        Ok(Some(early))
    }

    /// Tier 1 only.
    pub fn get_finished(&self, name: &str) -> Option<AnyArc> {
        self.tiers.lock().borrow().finished.get(name).cloned()
    }

    /// Tier 2 only; never runs a deferred factory.
    pub fn get_early(&self, name: &str) -> Option<AnyArc> {
        self.tiers.lock().borrow().early.get(name).cloned()
    }

    /// Records the deferred factory for an instance under construction.
    ///
    /// Ignored if `name` is already finished.
    pub fn register_deferred(&self, name: &str, factory: EarlyFactory) {
        let guard = self.tiers.lock();
        let mut tiers = guard.borrow_mut();
        if tiers.finished.contains_key(name) {
            tracing::warn!(name, "Ignoring deferred factory for an already finished instance");
            return;
        }
        if tiers.early.remove(name).is_some() {
            tracing::warn!(name, "Dropped an early reference superseded by a new deferred factory");
        }
        if tiers.deferred.insert(name.to_string(), factory).is_some() {
            tracing::warn!(name, "Replaced a pending deferred factory");
        }
        tracing::trace!(name, "Deferred factory registered");
    }

    /// Stores the finished instance and drops any tier 2 or tier 3 entry.
    pub fn promote(&self, name: &str, instance: AnyArc) {
        let guard = self.tiers.lock();
        let mut tiers = guard.borrow_mut();
        tiers.early.remove(name);
        tiers.deferred.remove(name);
        if tiers.finished.insert(name.to_string(), instance).is_none() {
            tiers.order.push(name.to_string());
        }
        tracing::debug!(name, "Instance promoted to finished");
    }

    /// Drops the unfinished entries of a failed construction.
    pub fn discard(&self, name: &str) {
        let guard = self.tiers.lock();
        let mut tiers = guard.borrow_mut();
        let had_early = tiers.early.remove(name).is_some();
        let had_deferred = tiers.deferred.remove(name).is_some();
        if had_early || had_deferred {
            tracing::debug!(name, "Discarded unfinished cache entries");
        }
    }

    /// Removes a finished instance, returning it.
    pub fn evict(&self, name: &str) -> Option<AnyArc> {
        let guard = self.tiers.lock();
        let mut tiers = guard.borrow_mut();
        let evicted = tiers.finished.remove(name)?;
        tiers.order.retain(|n| n != name);
        tracing::debug!(name, "Finished instance evicted");
        Some(evicted)
    }

    pub fn tier_of(&self, name: &str) -> Option<Tier> {
        let guard = self.tiers.lock();
        let tiers = guard.borrow();
        if tiers.finished.contains_key(name) {
            Some(Tier::Finished)
        } else if tiers.early.contains_key(name) {
            Some(Tier::Early)
        } else if tiers.deferred.contains_key(name) {
            Some(Tier::Deferred)
        } else {
            None
        }
    }

    pub fn contains_finished(&self, name: &str) -> bool {
        self.tiers.lock().borrow().finished.contains_key(name)
    }

    /// Names of finished instances, in promotion order.
    pub fn finished_names(&self) -> Vec<String> {
        self.tiers.lock().borrow().order.clone()
    }

    pub fn finished_len(&self) -> usize {
        self.tiers.lock().borrow().finished.len()
    }

    /// Empties every tier.
    pub fn clear(&self) {
        let guard = self.tiers.lock();
        let mut tiers = guard.borrow_mut();
        let count = tiers.finished.len();
        *tiers = Tiers::default();
        tracing::debug!(count, "Instance cache cleared");
    }
}

impl Default for InstanceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InstanceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.tiers.lock();
        let tiers = guard.borrow();
        f.debug_struct("InstanceCache")
            .field("finished", &tiers.order)
            .field("early", &tiers.early.keys().collect::<Vec<_>>())
            .field("deferred", &tiers.deferred.keys().collect::<Vec<_>>())
            .finish()
    }
}
