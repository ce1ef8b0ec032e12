//! Error types for the transaction engine.

use realm_adapter::AdapterError;
use realm_types::TransactionId;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Lock acquisition exceeded its deadline.
    #[error("could not acquire lock on {path}")]
    LockTimeout { path: String },

    /// Pre-commit policy or re-parse check failed.
    #[error("validation failed: {}", errors.join("; "))]
    ValidationFailed { errors: Vec<String> },

    /// The TTL sweep force-rolled-back the transaction.
    #[error("transaction {0} exceeded its TTL")]
    TransactionTimeout(TransactionId),

    /// No adapter detects the file.
    #[error("no adapter matched {0}")]
    NoAdapterMatched(String),

    /// Adapter parse, mutation, or codegen failure.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// The targeted element is not registered.
    #[error("unknown element: {0}")]
    UnknownElement(String),

    /// The transaction id is not known to the manager.
    #[error("unknown transaction: {0}")]
    UnknownTransaction(TransactionId),

    /// The transaction is not in the state the operation requires.
    #[error("transaction {id} is {found}, expected {expected}")]
    InvalidState {
        id: TransactionId,
        expected: &'static str,
        found: &'static str,
    },

    /// Change log import was given malformed input.
    #[error("change log import failed: {0}")]
    ImportFailure(String),

    /// The path escapes the workspace root.
    #[error("path escapes workspace: {0}")]
    PathEscapesWorkspace(String),

    /// Host file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
