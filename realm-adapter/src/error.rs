//! Error types for the adapter layer.

use thiserror::Error;

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors that can occur in adapter operations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The adapter's own parse step failed.
    #[error("parse failure at line {line}, column {column}: {message}")]
    Parse {
        line: u32,
        column: u32,
        message: String,
    },

    /// The targeted element could not be located in the tree.
    #[error("no element at recorded position for id {0}")]
    UnknownNode(String),

    /// The requested mutation cannot be expressed on the target node.
    #[error("unsupported mutation: {0}")]
    UnsupportedMutation(String),

    /// Source regeneration failed.
    #[error("code generation failed: {0}")]
    Codegen(String),
}

impl AdapterError {
    pub(crate) fn parse(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            column,
            message: message.into(),
        }
    }
}
