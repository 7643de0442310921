//! Error types shared across the chain runner

use thiserror::Error;

/// Default message used when a chain raises `_error` without a message
pub const DEFAULT_ERROR_MESSAGE: &str = "Chain execution stopped";

/// Errors produced while loading, normalizing or executing a chain
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChainError {
    /// The definition could not be read or decoded
    #[error("Unable to fetch chain: {0}")]
    Load(String),

    /// The definition has the wrong shape
    #[error("Cannot normalize chain: {0}")]
    Normalize(String),

    /// A `[name ...]` command did not resolve to a callable
    #[error("Cannot get executable function from: {0}")]
    CapabilityResolution(String),

    /// A runner reported failure
    #[error("{message}")]
    Step { command: String, message: String },

    /// A step set the global `_error` flag
    #[error("{0}")]
    Raised(String),
}

impl ChainError {
    /// Message handed to the invocation callback
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Errors from the restricted expression language
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExpressionError {
    #[error("Syntax error: {0}")]
    Parse(String),

    #[error("{0}")]
    Eval(String),
}

impl From<pest::error::Error<crate::expression::parser::Rule>> for ExpressionError {
    fn from(err: pest::error::Error<crate::expression::parser::Rule>) -> Self {
        ExpressionError::Parse(err.to_string())
    }
}
