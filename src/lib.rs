pub mod chain;
pub mod cli;
pub mod condition;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod expression;
pub mod store;

// Re-export main types
pub use chain::ChainSource;
pub use config::Config;
pub use dispatch::{Capability, CapabilityOutput, CapabilityRegistry, Export};
pub use engine::{ChainOutput, Engine};
pub use errors::{ChainError, ExpressionError};
