//! Sync engine — reconciles remote clients with the local workspace.
//!
//! For each inbound event the engine: drops duplicates via a
//! per-session id set, mirrors previews to the other clients, drives
//! commit requests through the transaction pipeline, and reports stale
//! element versions as conflicts through the configured resolver.
//!
//! Delivery to clients happens here; the produced lifecycle events are
//! also returned so the host can feed them to its own [`crate::EventBus`].

use crate::client::SyncClient;
use crate::error::{SyncError, SyncResult};
use crate::policy::{ConflictDecision, ConflictResolver, ReportOnly};
use realm_engine::{EngineResult, TransactionManager};
use realm_types::{ClientId, EventId, EventPayload, Operation, RealmEvent, RealmId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Host label used in logs.
    pub label: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            label: "realm host".to_string(),
        }
    }
}

/// Connects remote surfaces to the transaction engine.
pub struct SyncEngine {
    config: SyncConfig,
    manager: Arc<TransactionManager>,
    clients: RwLock<HashMap<ClientId, Arc<dyn SyncClient>>>,
    /// Per-session event ids already handled, for idempotent replay.
    seen: RwLock<HashMap<ClientId, HashSet<EventId>>>,
    resolver: Arc<dyn ConflictResolver>,
}

impl SyncEngine {
    /// Creates an engine with the default [`ReportOnly`] resolver.
    #[must_use]
    pub fn new(manager: Arc<TransactionManager>) -> Self {
        Self::with_resolver(manager, SyncConfig::default(), Arc::new(ReportOnly))
    }

    #[must_use]
    pub fn with_resolver(
        manager: Arc<TransactionManager>,
        config: SyncConfig,
        resolver: Arc<dyn ConflictResolver>,
    ) -> Self {
        Self {
            config,
            manager,
            clients: RwLock::new(HashMap::new()),
            seen: RwLock::new(HashMap::new()),
            resolver,
        }
    }

    /// The underlying transaction manager.
    #[must_use]
    pub fn manager(&self) -> Arc<TransactionManager> {
        Arc::clone(&self.manager)
    }

    // ── Client lifecycle ────────────────────────────────────────

    /// Registers a connected client and opens a fresh dedup session.
    pub async fn connect(&self, client: Arc<dyn SyncClient>) {
        let id = client.client_id();
        info!(host = %self.config.label, client = %id, label = client.label(), "client connected");
        self.clients.write().await.insert(id, client);
        self.seen.write().await.insert(id, HashSet::new());
    }

    /// Drops a client and its session state.
    pub async fn disconnect(&self, client_id: ClientId) -> bool {
        self.seen.write().await.remove(&client_id);
        let removed = self.clients.write().await.remove(&client_id).is_some();
        if removed {
            info!(client = %client_id, "client disconnected");
        }
        removed
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    // ── Inbound events ──────────────────────────────────────────

    /// Processes one event received from `from`. Returns the lifecycle
    /// events produced (already delivered to connected clients).
    pub async fn handle_incoming(
        &self,
        from: ClientId,
        event: RealmEvent,
    ) -> SyncResult<Vec<RealmEvent>> {
        if !self.clients.read().await.contains_key(&from) {
            return Err(SyncError::ClientClosed(from));
        }
        {
            let mut seen = self.seen.write().await;
            let session = seen.entry(from).or_default();
            if !session.insert(event.id) {
                debug!(client = %from, event = %event.id, "duplicate event dropped");
                return Ok(Vec::new());
            }
        }

        match &event.payload {
            EventPayload::ElementSelected { .. } => {
                self.broadcast_except(from, &event).await;
                Ok(Vec::new())
            }

            EventPayload::StyleChanged { realm_id, .. }
            | EventPayload::TextChanged { realm_id, .. }
            | EventPayload::ClassChanged { realm_id, .. } => {
                if !event.is_preview() {
                    debug!(client = %from, "non-preview change ignored; changes commit via commit requests");
                    return Ok(Vec::new());
                }
                if let Some((conflict, decision)) = self.check_version(realm_id).await {
                    self.broadcast(&conflict).await;
                    if decision == ConflictDecision::KeepLocal {
                        return Ok(vec![conflict]);
                    }
                    self.broadcast_except(from, &event).await;
                    return Ok(vec![conflict]);
                }
                self.broadcast_except(from, &event).await;
                Ok(Vec::new())
            }

            EventPayload::CommitRequest {
                realm_id,
                operations,
            } => {
                let mut produced_conflict = None;
                if let Some((conflict, decision)) = self.check_version(realm_id).await {
                    self.broadcast(&conflict).await;
                    if decision == ConflictDecision::KeepLocal {
                        return Ok(vec![conflict]);
                    }
                    produced_conflict = Some(conflict);
                }
                let mut events = self.run_commit(realm_id, operations.clone()).await?;
                for produced in &events {
                    self.broadcast(produced).await;
                }
                if let Some(conflict) = produced_conflict {
                    events.insert(0, conflict);
                }
                Ok(events)
            }

            EventPayload::RollbackRequest { transaction_id } => {
                let events = self.manager.rollback_committed(*transaction_id).await?;
                for produced in &events {
                    self.broadcast(produced).await;
                }
                Ok(events)
            }

            EventPayload::FileChanged { file_path } => {
                let rescanned = self.manager.handle_file_changed(file_path).await?;
                debug!(file = %file_path, elements = rescanned.len(), "rescanned after file change");
                self.broadcast_except(from, &event).await;
                Ok(Vec::new())
            }

            EventPayload::TransactionCommitted { .. }
            | EventPayload::TransactionFailed { .. }
            | EventPayload::TransactionRolledBack { .. }
            | EventPayload::ConflictDetected { .. } => {
                debug!(client = %from, "lifecycle event from client ignored");
                Ok(Vec::new())
            }
        }
    }

    // ── Outbound delivery ───────────────────────────────────────

    /// Sends an event to every connected client, dropping clients whose
    /// channel fails.
    pub async fn broadcast(&self, event: &RealmEvent) {
        self.deliver(event, None).await;
    }

    /// Sends an event to every connected client except `skip`.
    pub async fn broadcast_except(&self, skip: ClientId, event: &RealmEvent) {
        self.deliver(event, Some(skip)).await;
    }

    async fn deliver(&self, event: &RealmEvent, skip: Option<ClientId>) {
        let clients: Vec<Arc<dyn SyncClient>> = self
            .clients
            .read()
            .await
            .values()
            .filter(|c| Some(c.client_id()) != skip)
            .cloned()
            .collect();

        let mut dead = Vec::new();
        for client in clients {
            if let Err(err) = client.send(event).await {
                warn!(client = %client.client_id(), error = %err, "send failed, dropping client");
                dead.push(client.client_id());
            }
        }
        for id in dead {
            self.disconnect(id).await;
        }
    }

    // ── Internals ───────────────────────────────────────────────

    /// Compares an inbound id's version against the registry. On
    /// mismatch, returns the conflict event to emit plus the resolver's
    /// decision on whether the inbound edit may still proceed.
    async fn check_version(&self, remote: &RealmId) -> Option<(RealmEvent, ConflictDecision)> {
        let local_version = {
            let registry = self.manager.registry();
            let registry = registry.read().await;
            registry.current_id(&remote.hash)?.version
        };
        if local_version == remote.version {
            return None;
        }
        warn!(
            element = %remote.hash,
            local = local_version,
            remote = remote.version,
            "version conflict"
        );
        let decision = self
            .resolver
            .resolve(remote, local_version, remote.version);
        Some((
            RealmEvent::conflict(remote.clone(), local_version, remote.version),
            decision,
        ))
    }

    /// Drives one commit request through begin → apply → validate →
    /// commit. Failures after `begin` surface as a failure event, never
    /// a partial write.
    async fn run_commit(
        &self,
        realm_id: &RealmId,
        operations: Vec<Operation>,
    ) -> SyncResult<Vec<RealmEvent>> {
        let tx = self.manager.begin(&realm_id.hash).await?;
        let outcome: EngineResult<Vec<RealmEvent>> = async {
            for op in operations {
                self.manager.apply(tx, op).await?;
            }
            let report = self.manager.validate(tx).await?;
            if report.valid {
                self.manager.commit(tx).await
            } else {
                self.manager.rollback(tx).await?;
                Ok(vec![RealmEvent::failed(tx, report.errors.join("; "))])
            }
        }
        .await;

        match outcome {
            Ok(events) => Ok(events),
            Err(err) => {
                // Drop staged state and the lock; the file was never touched.
                let _ = self.manager.rollback(tx).await;
                Ok(vec![RealmEvent::failed(tx, err.to_string())])
            }
        }
    }
}
