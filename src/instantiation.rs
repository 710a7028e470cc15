//! Pluggable instantiation step of the construction pipeline.

use crate::descriptors::Descriptor;
use crate::error::BoxError;
use crate::registration::AnyArc;

/// Produces the raw instance for a descriptor.
///
/// The container calls the strategy once per construction, after the
/// short-circuit hooks have declined. Replacing the strategy lets callers
/// pool, proxy or trace raw instantiation without touching descriptors.
pub trait InstantiationStrategy: Send + Sync {
    fn instantiate(&self, descriptor: &Descriptor) -> Result<AnyArc, BoxError>;
}

/// Runs the descriptor's own recipe.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleInstantiationStrategy;

impl InstantiationStrategy for SimpleInstantiationStrategy {
    fn instantiate(&self, descriptor: &Descriptor) -> Result<AnyArc, BoxError> {
        (descriptor.recipe())()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget(u32);

    #[test]
    fn simple_strategy_runs_recipe() {
        let d = Descriptor::builder("widget", || Widget(7)).build();
        let out = SimpleInstantiationStrategy.instantiate(&d).unwrap();
        assert_eq!(out.downcast_ref::<Widget>().map(|w| w.0), Some(7));
    }

    #[test]
    fn recipe_failure_is_returned() {
        let d = Descriptor::try_builder("widget", || Err::<Widget, BoxError>("no disk".into())).build();
        let err = SimpleInstantiationStrategy.instantiate(&d).err().unwrap();
        assert_eq!(err.to_string(), "no disk");
    }
}
