//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod dependents;
pub(crate) mod dispose_bag;

pub(crate) use circular::CreationStack;
pub(crate) use dependents::DependentGraph;
pub(crate) use dispose_bag::{run_teardown, DisposalHandle, DisposalRegistry};
