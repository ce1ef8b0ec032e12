//! Error types for the sync layer.

use realm_engine::EngineError;
use realm_types::ClientId;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The transaction engine rejected the request.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The client's channel is closed.
    #[error("client {0} is disconnected")]
    ClientClosed(ClientId),

    /// Wire envelope encode/decode failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] realm_types::Error),
}
