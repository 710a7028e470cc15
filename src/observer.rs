//! Diagnostic observers for resolution events.
//!
//! Observers see every `resolve` call the container handles, including nested
//! dependency resolutions and cache hits, plus construction failures and
//! disposals. They are called synchronously, so keep implementations cheap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;

/// Observer trait for container events.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{Container, ContainerObserver, Descriptor};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Recorder {
///     names: Mutex<Vec<String>>,
/// }
///
/// impl ContainerObserver for Recorder {
///     fn resolving(&self, name: &str) {
///         self.names.lock().unwrap().push(name.to_string());
///     }
///
///     fn resolved(&self, _name: &str, _duration: Duration) {}
/// }
///
/// struct Clock;
///
/// let recorder = Arc::new(Recorder::default());
/// let container = Container::new();
/// container.add_observer(recorder.clone());
/// container.register_descriptor(Descriptor::builder("clock", || Clock).build());
/// container.resolve("clock").unwrap();
///
/// assert_eq!(*recorder.names.lock().unwrap(), vec!["clock".to_string()]);
/// ```
pub trait ContainerObserver: Send + Sync {
    /// Called when a resolution starts.
    fn resolving(&self, name: &str);

    /// Called when a resolution completes, with the time it took.
    fn resolved(&self, name: &str, duration: Duration);

    /// Called when resolving `name` fails.
    fn construction_failed(&self, name: &str, error: &DiError) {
        let _ = (name, error);
    }

    /// Called after a singleton's teardown handle ran, successfully or not.
    fn disposed(&self, name: &str, ok: bool) {
        let _ = (name, ok);
    }
}

/// Registered observers, notified in registration order.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ContainerObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn ContainerObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, name: &str) {
        for observer in &self.observers {
            observer.resolving(name);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, name: &str, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(name, duration);
        }
    }

    #[inline]
    pub(crate) fn construction_failed(&self, name: &str, error: &DiError) {
        for observer in &self.observers {
            observer.construction_failed(name, error);
        }
    }

    #[inline]
    pub(crate) fn disposed(&self, name: &str, ok: bool) {
        for observer in &self.observers {
            observer.disposed(name, ok);
        }
    }
}

/// Built-in observer that forwards events to `tracing`.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{Container, LoggingObserver};
/// use std::sync::Arc;
///
/// let container = Container::new();
/// container.add_observer(Arc::new(LoggingObserver::with_prefix("app")));
/// ```
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self {
            prefix: "ferrous-lifecycle".to_string(),
        }
    }

    /// Creates a logging observer whose events carry a custom `source` field.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerObserver for LoggingObserver {
    fn resolving(&self, name: &str) {
        tracing::debug!(source = %self.prefix, name, "Resolving");
    }

    fn resolved(&self, name: &str, duration: Duration) {
        tracing::debug!(source = %self.prefix, name, ?duration, "Resolved");
    }

    fn construction_failed(&self, name: &str, error: &DiError) {
        tracing::error!(source = %self.prefix, name, %error, "Resolution failed");
    }

    fn disposed(&self, name: &str, ok: bool) {
        if ok {
            tracing::info!(source = %self.prefix, name, "Disposed");
        } else {
            tracing::warn!(source = %self.prefix, name, "Disposal failed");
        }
    }
}

/// Observer that counts resolutions, failures and disposals.
#[derive(Default)]
pub struct MetricsObserver {
    resolution_count: AtomicU64,
    total_resolution_nanos: AtomicU64,
    failure_count: AtomicU64,
    disposal_count: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolution_count(&self) -> u64 {
        self.resolution_count.load(Ordering::Relaxed)
    }

    /// Average duration of completed resolutions.
    pub fn average_resolution_time(&self) -> Option<Duration> {
        let count = self.resolution_count();
        if count == 0 {
            return None;
        }
        Some(Duration::from_nanos(self.total_resolution_nanos.load(Ordering::Relaxed) / count))
    }

    pub fn total_resolution_time(&self) -> Duration {
        Duration::from_nanos(self.total_resolution_nanos.load(Ordering::Relaxed))
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn disposal_count(&self) -> u64 {
        self.disposal_count.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.resolution_count.store(0, Ordering::Relaxed);
        self.total_resolution_nanos.store(0, Ordering::Relaxed);
        self.failure_count.store(0, Ordering::Relaxed);
        self.disposal_count.store(0, Ordering::Relaxed);
    }
}

impl ContainerObserver for MetricsObserver {
    fn resolving(&self, _name: &str) {}

    fn resolved(&self, _name: &str, duration: Duration) {
        self.resolution_count.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.total_resolution_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    fn construction_failed(&self, _name: &str, _error: &DiError) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    fn disposed(&self, _name: &str, _ok: bool) {
        self.disposal_count.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_observer_counts() {
        let observer = MetricsObserver::new();
        assert_eq!(observer.resolution_count(), 0);
        assert!(observer.average_resolution_time().is_none());

        observer.resolved("a", Duration::from_millis(10));
        observer.resolved("b", Duration::from_millis(20));
        observer.construction_failed("c", &DiError::DescriptorNotFound("c".into()));
        observer.disposed("a", true);

        assert_eq!(observer.resolution_count(), 2);
        assert_eq!(observer.average_resolution_time(), Some(Duration::from_millis(15)));
        assert!(observer.total_resolution_time() >= Duration::from_millis(30));
        assert_eq!(observer.failure_count(), 1);
        assert_eq!(observer.disposal_count(), 1);

        observer.reset();
        assert_eq!(observer.resolution_count(), 0);
        assert_eq!(observer.failure_count(), 0);
    }

    #[test]
    fn observers_fan_out() {
        let metrics = Arc::new(MetricsObserver::new());
        let mut observers = Observers::new();
        assert!(!observers.has_observers());
        observers.add(Arc::new(LoggingObserver::new()));
        observers.add(metrics.clone());

        observers.resolving("a");
        observers.resolved("a", Duration::from_millis(1));
        observers.disposed("a", false);
        assert_eq!(metrics.resolution_count(), 1);
        assert_eq!(metrics.disposal_count(), 1);
    }
}
