//! Event types for editor/surface synchronization.
//!
//! A [`RealmEvent`] is the unit of cross-process notification: selection,
//! live previews, transaction lifecycle, file changes, and sync control
//! all travel through the same envelope. Events are immutable once
//! constructed and carry a globally unique id that subscribers use for
//! idempotent replay detection.

use crate::ids::EventId;
use crate::{Operation, RealmId, Timestamp, TransactionId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where an event originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventSource {
    /// The structural editor host.
    Editor,
    /// An editor side panel (inspector, tree view).
    Panel,
    /// A browser-rendered surface reporting DOM interaction.
    Dom,
    /// The host's file watcher.
    FileWatcher,
    /// REALM itself (sweeps, conflict reports).
    System,
}

/// The payload of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventPayload {
    /// A surface or panel selected an element.
    ElementSelected { realm_id: RealmId },

    /// A style property changed. Preview events mirror to other surfaces
    /// without persisting; non-preview changes arrive via `CommitRequest`.
    StyleChanged {
        realm_id: RealmId,
        property: String,
        value: Option<String>,
        preview: bool,
    },

    /// Text content changed.
    TextChanged {
        realm_id: RealmId,
        text: String,
        preview: bool,
    },

    /// Classes were added/removed.
    ClassChanged {
        realm_id: RealmId,
        add: Vec<String>,
        remove: Vec<String>,
        preview: bool,
    },

    /// A remote client asks the editor host to commit operations.
    CommitRequest {
        realm_id: RealmId,
        operations: Vec<Operation>,
    },

    /// A client asks to undo a committed transaction.
    RollbackRequest { transaction_id: TransactionId },

    /// A transaction reached `committed`.
    TransactionCommitted {
        transaction_id: TransactionId,
        file_path: String,
    },

    /// A transaction terminated without committing.
    TransactionFailed {
        transaction_id: TransactionId,
        reason: String,
    },

    /// A committed transaction was undone by a corrective write.
    TransactionRolledBack { transaction_id: TransactionId },

    /// A source file changed outside a transaction.
    FileChanged { file_path: String },

    /// An inbound edit carried a stale element version.
    ConflictDetected {
        realm_id: RealmId,
        local_version: u32,
        remote_version: u32,
    },
}

/// An immutable event exchanged between the editor host and surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealmEvent {
    /// Globally unique id, used for idempotent replay detection.
    pub id: EventId,
    /// When the event was created.
    pub timestamp: Timestamp,
    /// Where the event originated.
    pub source: EventSource,
    /// The payload.
    pub payload: EventPayload,
}

impl RealmEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(source: EventSource, payload: EventPayload) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Timestamp::now(),
            source,
            payload,
        }
    }

    /// Creates an element-selected event.
    #[must_use]
    pub fn element_selected(source: EventSource, realm_id: RealmId) -> Self {
        Self::new(source, EventPayload::ElementSelected { realm_id })
    }

    /// Creates a style-changed preview event.
    #[must_use]
    pub fn style_preview(
        source: EventSource,
        realm_id: RealmId,
        property: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        Self::new(
            source,
            EventPayload::StyleChanged {
                realm_id,
                property: property.into(),
                value,
                preview: true,
            },
        )
    }

    /// Creates a text-changed preview event.
    #[must_use]
    pub fn text_preview(source: EventSource, realm_id: RealmId, text: impl Into<String>) -> Self {
        Self::new(
            source,
            EventPayload::TextChanged {
                realm_id,
                text: text.into(),
                preview: true,
            },
        )
    }

    /// Creates a commit-request event.
    #[must_use]
    pub fn commit_request(
        source: EventSource,
        realm_id: RealmId,
        operations: Vec<Operation>,
    ) -> Self {
        Self::new(
            source,
            EventPayload::CommitRequest {
                realm_id,
                operations,
            },
        )
    }

    /// Creates a transaction-committed event.
    #[must_use]
    pub fn committed(transaction_id: TransactionId, file_path: impl Into<String>) -> Self {
        Self::new(
            EventSource::System,
            EventPayload::TransactionCommitted {
                transaction_id,
                file_path: file_path.into(),
            },
        )
    }

    /// Creates a transaction-failed event.
    #[must_use]
    pub fn failed(transaction_id: TransactionId, reason: impl Into<String>) -> Self {
        Self::new(
            EventSource::System,
            EventPayload::TransactionFailed {
                transaction_id,
                reason: reason.into(),
            },
        )
    }

    /// Creates a conflict-detected event.
    #[must_use]
    pub fn conflict(realm_id: RealmId, local_version: u32, remote_version: u32) -> Self {
        Self::new(
            EventSource::System,
            EventPayload::ConflictDetected {
                realm_id,
                local_version,
                remote_version,
            },
        )
    }

    /// Creates a file-changed event.
    #[must_use]
    pub fn file_changed(file_path: impl Into<String>) -> Self {
        Self::new(
            EventSource::FileWatcher,
            EventPayload::FileChanged {
                file_path: file_path.into(),
            },
        )
    }

    /// Returns true for ephemeral preview payloads that must never reach
    /// the transaction pipeline.
    #[must_use]
    pub fn is_preview(&self) -> bool {
        matches!(
            self.payload,
            EventPayload::StyleChanged { preview: true, .. }
                | EventPayload::TextChanged { preview: true, .. }
                | EventPayload::ClassChanged { preview: true, .. }
        )
    }

    /// Serializes to the lossless JSON wire envelope.
    pub fn to_wire(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes from the wire envelope.
    pub fn from_wire(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replaces the id. Used when reconstructing an event with a known
    /// identity, e.g. replay fixtures.
    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = EventId::from_uuid(id);
        self
    }
}
