//! Transaction engine for the REALM core.
//!
//! Builds atomic, lockable, auditable source mutation on top of the
//! adapter layer:
//! - [`FileLockManager`]: per-file mutual exclusion with TTL expiry
//! - [`TransactionManager`]: begin → apply → validate → commit/rollback
//! - [`ChangeLog`]: append-only, indexed, prunable audit trail
//! - [`WorkspaceIo`]: host-supplied file primitives
//!
//! The overriding contract: any transaction that does not end committed
//! leaves the source file byte-identical to its state before `begin`.

mod changelog;
mod error;
mod lock;
mod manager;
mod transaction;
mod workspace;

pub use changelog::{ChangeLog, ChangeLogEntry, ChangeLogStats, ChangeQuery};
pub use error::{EngineError, EngineResult};
pub use lock::{FileLockManager, LockEntry, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_LOCK_TTL};
pub use manager::{TransactionConfig, TransactionManager};
pub use transaction::{content_hash, Snapshot, Transaction, TransactionStatus, ValidationResult};
pub use workspace::{FsWorkspace, WorkspaceIo};
