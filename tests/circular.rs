use ferrous_lifecycle::{
    AnyArc, Autowired, BoxError, Capabilities, Container, ContainerConfig, Descriptor, DiError, Interceptor, Tier,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct SvcA {
    svc_b: Autowired<SvcB>,
}

#[derive(Default)]
struct SvcB {
    svc_a: Autowired<SvcA>,
}

fn register_pair(container: &Container) {
    container.register_descriptor(
        Descriptor::builder("svcA", SvcA::default)
            .with_reference("svcB", "svcB", |a: &SvcA, b| a.svc_b.set(b))
            .build(),
    );
    container.register_descriptor(
        Descriptor::builder("svcB", SvcB::default)
            .with_reference("svcA", "svcA", |b: &SvcB, a| b.svc_a.set(a))
            .build(),
    );
}

/// Counts early-reference invocations and passes the raw instance through.
#[derive(Default)]
struct EarlyCounter {
    calls: AtomicUsize,
}

impl Interceptor for EarlyCounter {
    fn capabilities(&self) -> Capabilities {
        Capabilities::EARLY_REFERENCE
    }

    fn early_reference(&self, _name: &str, instance: AnyArc) -> Result<AnyArc, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(instance)
    }
}

#[test]
fn test_two_singletons_in_a_cycle_share_identity() {
    let container = Container::new();
    register_pair(&container);

    let a = container.resolve_as::<SvcA>("svcA").unwrap();
    let b = a.svc_b.get_required();

    assert!(Arc::ptr_eq(&b.svc_a.get_required(), &a));
    assert!(Arc::ptr_eq(&container.resolve_as::<SvcB>("svcB").unwrap(), &b));
    assert!(Arc::ptr_eq(&container.resolve_as::<SvcA>("svcA").unwrap(), &a));
    assert_eq!(container.tier_of("svcA"), Some(Tier::Finished));
    assert_eq!(container.tier_of("svcB"), Some(Tier::Finished));
}

#[test]
fn test_resolving_the_other_end_first() {
    let container = Container::new();
    register_pair(&container);

    let b = container.resolve_as::<SvcB>("svcB").unwrap();
    let a = container.resolve_as::<SvcA>("svcA").unwrap();
    assert!(Arc::ptr_eq(&b.svc_a.get_required(), &a));
    assert!(Arc::ptr_eq(&a.svc_b.get_required(), &b));
}

#[test]
fn test_early_reference_hook_runs_once_and_only_for_cycles() {
    let counter = Arc::new(EarlyCounter::default());
    let container = Container::new();
    container.add_interceptor(counter.clone());
    register_pair(&container);

    #[derive(Default)]
    struct Loner;
    container.register_descriptor(Descriptor::builder("loner", Loner::default).build());
    container.resolve("loner").unwrap();
    assert_eq!(counter.calls.load(Ordering::SeqCst), 0);

    container.resolve("svcA").unwrap();
    container.resolve("svcB").unwrap();
    container.resolve("svcA").unwrap();
    assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_early_reference_consulted_many_times_runs_hook_once() {
    #[derive(Default)]
    struct Hub {
        left: Autowired<Spoke>,
        right: Autowired<Spoke>,
    }

    #[derive(Default)]
    struct Spoke {
        hub: Autowired<Hub>,
    }

    let counter = Arc::new(EarlyCounter::default());
    let container = Container::new();
    container.add_interceptor(counter.clone());
    container.register_descriptor(
        Descriptor::builder("hub", Hub::default)
            .with_reference("left", "left", |h: &Hub, s| h.left.set(s))
            .with_reference("right", "right", |h: &Hub, s| h.right.set(s))
            .build(),
    );
    for side in ["left", "right"] {
        container.register_descriptor(
            Descriptor::builder(side, Spoke::default)
                .with_reference("hub", "hub", |s: &Spoke, h| s.hub.set(h))
                .build(),
        );
    }

    let hub = container.resolve_as::<Hub>("hub").unwrap();
    assert!(Arc::ptr_eq(&hub.left.get_required().hub.get_required(), &hub));
    assert!(Arc::ptr_eq(&hub.right.get_required().hub.get_required(), &hub));
    assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_early_proxy_identity_is_what_everyone_sees() {
    /// Replaces the early reference of `svcA` with a distinct instance.
    struct ProxyA;

    impl Interceptor for ProxyA {
        fn capabilities(&self) -> Capabilities {
            Capabilities::EARLY_REFERENCE
        }

        fn early_reference(&self, name: &str, instance: AnyArc) -> Result<AnyArc, BoxError> {
            if name == "svcA" {
                Ok(Arc::new(SvcA::default()))
            } else {
                Ok(instance)
            }
        }
    }

    let container = Container::new();
    container.add_interceptor(Arc::new(ProxyA));
    register_pair(&container);

    let a = container.resolve_as::<SvcA>("svcA").unwrap();
    let b = container.resolve_as::<SvcB>("svcB").unwrap();
    // The proxy handed to svcB during the cycle is the promoted svcA.
    assert!(Arc::ptr_eq(&b.svc_a.get_required(), &a));
    assert!(!a.svc_b.is_set());
}

#[test]
fn test_self_reference_singleton() {
    #[derive(Default)]
    struct Node {
        me: Autowired<Node>,
    }

    let container = Container::new();
    container.register_descriptor(
        Descriptor::builder("node", Node::default)
            .with_reference("me", "node", |n: &Node, m| n.me.set(m))
            .build(),
    );

    let node = container.resolve_as::<Node>("node").unwrap();
    assert!(Arc::ptr_eq(&node.me.get_required(), &node));
}

#[test]
fn test_non_shared_cycle_is_unresolvable() {
    #[derive(Default)]
    struct P {
        q: Autowired<Q>,
    }

    #[derive(Default)]
    struct Q {
        p: Autowired<P>,
    }

    let container = Container::new();
    container.register_descriptor(
        Descriptor::builder("p", P::default)
            .non_shared()
            .with_reference("q", "q", |p: &P, q| p.q.set(q))
            .build(),
    );
    container.register_descriptor(
        Descriptor::builder("q", Q::default)
            .non_shared()
            .with_reference("p", "p", |q: &Q, p| q.p.set(p))
            .build(),
    );

    match container.resolve("p") {
        Err(DiError::CycleUnresolvable(path)) => assert_eq!(path, vec!["p", "q", "p"]),
        other => panic!("expected unresolvable cycle, got {:?}", other.err()),
    }
    // The container stays usable afterwards
    assert!(matches!(container.resolve("q"), Err(DiError::CycleUnresolvable(_))));
}

#[test]
fn test_cycle_without_early_exposure_fails_cleanly() {
    let container = Container::with_config(ContainerConfig::default().allow_circular_references(false));
    register_pair(&container);

    match container.resolve("svcA") {
        Err(DiError::CycleUnresolvable(path)) => assert_eq!(path, vec!["svcA", "svcB", "svcA"]),
        other => panic!("expected unresolvable cycle, got {:?}", other.err()),
    }
    assert_eq!(container.tier_of("svcA"), None);
    assert_eq!(container.tier_of("svcB"), None);
    assert!(container.singleton_names().is_empty());
}

#[test]
fn test_depth_limit() {
    #[derive(Default)]
    struct Link {
        next: Autowired<Link>,
    }

    let container = Container::with_config(ContainerConfig::default().max_depth(3));
    for i in 0..5 {
        container.register_descriptor(
            Descriptor::builder(format!("link{}", i), Link::default)
                .with_reference("next", format!("link{}", i + 1), |l: &Link, n| l.next.set(n))
                .build(),
        );
    }
    container.register_descriptor(Descriptor::builder("link5", Link::default).build());

    assert!(matches!(container.resolve("link0"), Err(DiError::DepthExceeded(3))));
    assert!(container.resolve("link3").is_ok());
}

#[test]
fn test_failed_cycle_member_rolls_back_its_finished_peer() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    let seen = attempts.clone();
    let close_count = closed.clone();

    let container = Container::new();
    container.register_descriptor(
        Descriptor::builder("svcA", SvcA::default)
            .with_reference("svcB", "svcB", |a: &SvcA, b| a.svc_b.set(b))
            .method("start", move |_: &SvcA| {
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("not yet".into())
                } else {
                    Ok(())
                }
            })
            .init_method("start")
            .build(),
    );
    container.register_descriptor(
        Descriptor::builder("svcB", SvcB::default)
            .with_reference("svcA", "svcA", |b: &SvcB, a| b.svc_a.set(a))
            .method("close", move |_: &SvcB| {
                close_count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .destroy_method("close")
            .build(),
    );

    assert!(container.resolve("svcA").is_err());
    // svcB was finished holding the discarded svcA, so it goes too
    assert_eq!(container.tier_of("svcA"), None);
    assert_eq!(container.tier_of("svcB"), None);
    assert!(container.singleton_names().is_empty());
    assert!(container.pending_disposals().is_empty());
    assert_eq!(closed.load(Ordering::SeqCst), 1);

    let a = container.resolve_as::<SvcA>("svcA").unwrap();
    let b = container.resolve_as::<SvcB>("svcB").unwrap();
    assert!(Arc::ptr_eq(&b.svc_a.get_required(), &a));
    assert!(Arc::ptr_eq(&a.svc_b.get_required(), &b));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(container.pending_disposals(), vec!["svcB"]);
}

#[test]
fn test_rollback_reaches_singletons_built_on_the_peer() {
    #[derive(Default)]
    struct Front {
        back: Autowired<SvcB>,
    }

    let failed = Arc::new(AtomicUsize::new(0));
    let seen = failed.clone();
    let container = Container::new();
    container.register_descriptor(
        Descriptor::builder("front", Front::default)
            .with_reference("svcB", "svcB", |f: &Front, b| f.back.set(b))
            .build(),
    );
    container.register_descriptor(
        Descriptor::builder("svcA", SvcA::default)
            .with_reference("front", "front", |_: &SvcA, _f: Arc<Front>| {})
            .with_reference("svcB", "svcB", |a: &SvcA, b| a.svc_b.set(b))
            .method("start", move |_: &SvcA| {
                seen.fetch_add(1, Ordering::SeqCst);
                Err("refused".into())
            })
            .init_method("start")
            .build(),
    );
    container.register_descriptor(
        Descriptor::builder("svcB", SvcB::default)
            .with_reference("svcA", "svcA", |b: &SvcB, a| b.svc_a.set(a))
            .build(),
    );

    assert!(container.resolve("svcA").is_err());
    assert_eq!(failed.load(Ordering::SeqCst), 1);
    // svcB held svcA's early reference and front holds svcB
    assert_eq!(container.tier_of("svcB"), None);
    assert_eq!(container.tier_of("front"), None);
    assert!(container.singleton_names().is_empty());
}
