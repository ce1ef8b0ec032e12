//! Conflict resolution strategy.

use realm_types::RealmId;

/// What to do with an inbound edit whose element version is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    /// Keep the local state and drop the inbound edit.
    KeepLocal,
    /// Let the inbound edit through despite the stale version.
    AcceptRemote,
}

/// Pluggable strategy consulted on every version mismatch. A conflict
/// event is emitted regardless of the decision; the resolver only
/// controls whether the inbound edit proceeds.
pub trait ConflictResolver: Send + Sync {
    fn resolve(
        &self,
        realm_id: &RealmId,
        local_version: u32,
        remote_version: u32,
    ) -> ConflictDecision;
}

/// Default resolver: keep local, just report.
pub struct ReportOnly;

impl ConflictResolver for ReportOnly {
    fn resolve(&self, _realm_id: &RealmId, _local: u32, _remote: u32) -> ConflictDecision {
        ConflictDecision::KeepLocal
    }
}
