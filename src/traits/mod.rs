//! Core traits for the lifecycle container.

mod lifecycle;
mod resolver;

pub use lifecycle::{Dispose, Initialize};
pub use resolver::{Resolver, ResolverCore};
