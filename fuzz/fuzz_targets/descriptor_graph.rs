#![no_main]

use ferrous_lifecycle::{Autowired, Container, ContainerConfig, Descriptor, DiError, Scope, Tier};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

const MAX_NODES: usize = 8;

#[derive(Default)]
struct Node {
    left: Autowired<Node>,
    right: Autowired<Node>,
}

// Each byte describes one node: bit 0 picks the scope, bits 1..4 and 4..7
// pick the targets of the two reference fields (values past the node count
// mean "no reference"), bit 7 adds an init method that fails.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let allow_circular = data[0] & 1 == 0;
    let max_depth = usize::from(data[0] >> 1).max(1);
    let nodes = &data[1..data.len().min(MAX_NODES + 1)];
    let count = nodes.len();

    let container = Container::with_config(
        ContainerConfig::default()
            .allow_circular_references(allow_circular)
            .max_depth(max_depth),
    );

    for (i, byte) in nodes.iter().enumerate() {
        let scope = if byte & 1 == 0 { Scope::Singleton } else { Scope::NonShared };
        let mut builder = Descriptor::builder(format!("n{}", i), Node::default).scope(scope);
        let left = usize::from((byte >> 1) & 0b111);
        let right = usize::from((byte >> 4) & 0b111);
        if left < count {
            builder = builder.with_reference("left", format!("n{}", left), |n: &Node, d| n.left.set(d));
        }
        if right < count {
            builder = builder.with_reference("right", format!("n{}", right), |n: &Node, d| n.right.set(d));
        }
        if byte & 0x80 != 0 {
            builder = builder
                .method("fail", |_: &Node| Err("refused".into()))
                .init_method("fail");
        }
        container.register_descriptor(builder.build());
    }

    for i in 0..count {
        let name = format!("n{}", i);
        match container.resolve(&name) {
            Ok(instance) => {
                // A finished singleton is served by identity from then on
                if container.tier_of(&name) == Some(Tier::Finished) {
                    let again = container.resolve(&name).unwrap();
                    assert!(Arc::ptr_eq(&instance, &again));
                }
            }
            Err(DiError::ConstructionFailed { .. })
            | Err(DiError::CycleUnresolvable(_))
            | Err(DiError::DepthExceeded(_)) => {
                assert_ne!(container.tier_of(&name), Some(Tier::Early));
            }
            Err(other) => panic!("unexpected error for {}: {}", name, other),
        }
    }

    // Nothing unfinished survives a resolution round
    for i in 0..count {
        let tier = container.tier_of(&format!("n{}", i));
        assert!(tier.is_none() || tier == Some(Tier::Finished));
    }

    container.teardown_all().unwrap();
    assert!(container.singleton_names().is_empty());
});
