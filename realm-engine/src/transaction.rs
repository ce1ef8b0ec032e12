//! Transaction state: snapshots, status machine, validation report.

use realm_types::{Operation, Timestamp, TransactionId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex SHA-256 of file content, used for before/after integrity checks.
#[must_use]
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionStatus {
    Pending,
    Validated,
    Committed,
    RolledBack,
    Failed,
}

impl TransactionStatus {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validated => "validated",
            Self::Committed => "committed",
            Self::RolledBack => "rolled-back",
            Self::Failed => "failed",
        }
    }
}

/// Point-in-time copy of a file, taken while its lock is held.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub content: String,
    pub content_hash: String,
    pub taken_at: Timestamp,
}

impl Snapshot {
    #[must_use]
    pub fn capture(content: String) -> Self {
        let content_hash = content_hash(&content);
        Self {
            content,
            content_hash,
            taken_at: Timestamp::now(),
        }
    }
}

/// Outcome of validating staged operations against the workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }
}

/// One in-flight or finished transaction against a single file.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    /// Hash of the element the staged operations target.
    pub target: String,
    pub file_path: String,
    pub operations: Vec<Operation>,
    pub status: TransactionStatus,
    pub before: Snapshot,
    /// Regenerated content, present once validation has run.
    pub after: Option<String>,
    pub created_at: Timestamp,
    pub validated_at: Option<Timestamp>,
    pub committed_at: Option<Timestamp>,
    pub error: Option<String>,
}

impl Transaction {
    #[must_use]
    pub fn new(target: String, file_path: String, before: Snapshot) -> Self {
        Self::with_id(TransactionId::new(), target, file_path, before)
    }

    /// Builds a transaction under a pre-allocated id. The manager
    /// allocates the id first so the file lock can be tagged with it
    /// before any snapshot is taken.
    #[must_use]
    pub fn with_id(id: TransactionId, target: String, file_path: String, before: Snapshot) -> Self {
        Self {
            id,
            target,
            file_path,
            operations: Vec::new(),
            status: TransactionStatus::Pending,
            before,
            after: None,
            created_at: Timestamp::now(),
            validated_at: None,
            committed_at: None,
            error: None,
        }
    }

    /// Whether the transaction is still mutable.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            TransactionStatus::Pending | TransactionStatus::Validated
        )
    }
}
