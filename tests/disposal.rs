use ferrous_lifecycle::{BoxError, Container, Descriptor, DiError, Dispose, MetricsObserver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared log of teardown events, in the order they happened.
type Log = Arc<Mutex<Vec<String>>>;

struct Resource {
    name: &'static str,
    log: Log,
}

impl Dispose for Resource {
    fn dispose(&self) -> Result<(), BoxError> {
        self.log.lock().unwrap().push(format!("{}:dispose", self.name));
        Ok(())
    }
}

fn disposable(name: &'static str, log: &Log) -> Descriptor {
    let log = log.clone();
    Descriptor::builder(name, move || Resource { name, log: log.clone() })
        .disposable()
        .build()
}

#[test]
fn test_teardown_runs_in_registration_order() {
    let log: Log = Arc::default();
    let container = Container::new();
    for name in ["cache", "db", "http"] {
        container.register_descriptor(disposable(name, &log));
    }

    // Build order decides teardown order
    container.resolve("http").unwrap();
    container.resolve("cache").unwrap();
    container.resolve("db").unwrap();
    assert_eq!(container.pending_disposals(), vec!["http", "cache", "db"]);

    container.teardown_all().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["http:dispose", "cache:dispose", "db:dispose"]);
}

#[test]
fn test_teardown_clears_the_cache() {
    let log: Log = Arc::default();
    let container = Container::new();
    container.register_descriptor(disposable("db", &log));

    let first = container.resolve("db").unwrap();
    container.teardown_all().unwrap();
    assert!(container.singleton_names().is_empty());
    assert!(container.pending_disposals().is_empty());

    // Descriptors survive; a new resolve builds a fresh instance
    let second = container.resolve("db").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_teardown_is_best_effort() {
    let closed = Arc::new(AtomicUsize::new(0));
    let container = Container::new();
    for (name, fails) in [("a", false), ("b", true), ("c", false), ("d", true)] {
        let closed = closed.clone();
        container.register_descriptor(
            Descriptor::builder(name, || ())
                .method("close", move |_: &()| {
                    closed.fetch_add(1, Ordering::SeqCst);
                    if fails {
                        Err("still busy".into())
                    } else {
                        Ok(())
                    }
                })
                .destroy_method("close")
                .build(),
        );
        container.resolve(name).unwrap();
    }

    match container.teardown_all() {
        Err(DiError::TeardownFailed(failures)) => {
            let names: Vec<&str> = failures.iter().map(|(n, _)| n.as_str()).collect();
            assert_eq!(names, vec!["b", "d"]);
            assert_eq!(failures[0].1.to_string(), "still busy");
        }
        other => panic!("expected teardown failure, got {:?}", other),
    }
    assert_eq!(closed.load(Ordering::SeqCst), 4);

    // Every handle ran exactly once; a second teardown has nothing to do
    container.teardown_all().unwrap();
    assert_eq!(closed.load(Ordering::SeqCst), 4);
}

#[test]
fn test_capability_then_destroy_method() {
    let log: Log = Arc::default();
    let method_log = log.clone();
    let container = Container::new();
    let factory_log = log.clone();
    container.register_descriptor(
        Descriptor::builder("db", move || Resource {
            name: "db",
            log: factory_log.clone(),
        })
        .disposable()
        .method("shutdown", move |r: &Resource| {
            method_log.lock().unwrap().push(format!("{}:shutdown", r.name));
            Ok(())
        })
        .destroy_method("shutdown")
        .build(),
    );

    container.resolve("db").unwrap();
    container.close().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["db:dispose", "db:shutdown"]);
}

#[test]
fn test_non_shared_instances_are_not_tracked() {
    let log: Log = Arc::default();
    let container = Container::new();
    let factory_log = log.clone();
    container.register_descriptor(
        Descriptor::builder("session", move || Resource {
            name: "session",
            log: factory_log.clone(),
        })
        .non_shared()
        .disposable()
        .build(),
    );

    container.resolve("session").unwrap();
    container.resolve("session").unwrap();
    assert!(container.pending_disposals().is_empty());
    container.teardown_all().unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_prebuilt_instances_are_not_disposed() {
    let log: Log = Arc::default();
    let container = Container::new();
    container
        .register_instance("external", Arc::new(Resource { name: "external", log: log.clone() }))
        .unwrap();

    container.resolve("external").unwrap();
    container.teardown_all().unwrap();
    assert!(log.lock().unwrap().is_empty());
    // Teardown forgets pre-built instances too
    assert!(matches!(container.resolve("external"), Err(DiError::DescriptorNotFound(_))));
}

#[test]
fn test_unknown_destroy_method_fails_construction() {
    let container = Container::new();
    container.register_descriptor(Descriptor::builder("db", || ()).destroy_method("close").build());

    let err = container.resolve("db").unwrap_err();
    assert_eq!(err.name(), Some("db"));
    assert!(err.to_string().contains("destroy method 'close' not found"), "{}", err);
    assert_eq!(container.tier_of("db"), None);
    assert!(container.pending_disposals().is_empty());
}

#[test]
fn test_observers_see_disposals() {
    let log: Log = Arc::default();
    let metrics = Arc::new(MetricsObserver::new());
    let container = Container::new();
    container.add_observer(metrics.clone());
    container.register_descriptor(disposable("a", &log));
    container.register_descriptor(disposable("b", &log));

    container.resolve("a").unwrap();
    container.resolve("b").unwrap();
    container.teardown_all().unwrap();
    assert_eq!(metrics.disposal_count(), 2);
}

#[test]
fn test_cycle_members_are_disposed_once() {
    use ferrous_lifecycle::Autowired;

    struct Left {
        right: Autowired<Right>,
        log: Log,
    }

    struct Right {
        left: Autowired<Left>,
        log: Log,
    }

    impl Dispose for Left {
        fn dispose(&self) -> Result<(), BoxError> {
            self.log.lock().unwrap().push("left".to_string());
            Ok(())
        }
    }

    impl Dispose for Right {
        fn dispose(&self) -> Result<(), BoxError> {
            self.log.lock().unwrap().push("right".to_string());
            Ok(())
        }
    }

    let log: Log = Arc::default();
    let (l, r) = (log.clone(), log.clone());
    let container = Container::new();
    container.register_descriptor(
        Descriptor::builder("left", move || Left {
            right: Autowired::new(),
            log: l.clone(),
        })
        .with_reference("right", "right", |s: &Left, d| s.right.set(d))
        .disposable()
        .build(),
    );
    container.register_descriptor(
        Descriptor::builder("right", move || Right {
            left: Autowired::new(),
            log: r.clone(),
        })
        .with_reference("left", "left", |s: &Right, d| s.left.set(d))
        .disposable()
        .build(),
    );

    let left = container.resolve_as::<Left>("left").unwrap();
    assert!(left.right.get_required().left.is_set());
    // The inner end of the cycle finishes first
    assert_eq!(container.pending_disposals(), vec!["right", "left"]);

    container.teardown_all().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["right", "left"]);
}
