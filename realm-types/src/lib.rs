//! Core type definitions for the REALM protocol.
//!
//! This crate defines the fundamental, framework-agnostic types shared by
//! every other REALM crate:
//! - Structural element identifiers ([`RealmId`]) and supporting ids
//! - Wall-clock timestamps
//! - The closed [`OperationPayload`] sum describing source mutations
//! - The [`RealmEvent`] envelope exchanged between editor and surfaces
//!
//! Framework-specific behavior (how a style becomes a class name, how a
//! tree is parsed) lives in the adapter crates, not here.

mod event;
mod ids;
mod operation;
mod realm_id;
mod timestamp;

pub use event::{EventPayload, EventSource, RealmEvent};
pub use ids::{ChangeId, ClientId, EventId, OperationId, TransactionId};
pub use operation::{Operation, OperationPayload, StructureEdit};
pub use realm_id::{RealmId, SourceLocation, SourceSpan, REALM_HASH_LEN};
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid realm id: {0}")]
    InvalidRealmId(String),
}
