//! Chain definitions: canonical tree, shorthand normalization and loading

pub mod loader;
pub mod normalize;
pub mod split;
pub mod types;

#[cfg(test)]
mod tests;

pub use loader::ChainSource;
pub use normalize::{normalize, normalize_node, DEFAULT_COLLECT_COMMAND};
pub use types::{Body, Chain, ChainNode, Mode, DEFAULT_OUT};
