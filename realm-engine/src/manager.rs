//! The transaction manager: lock → snapshot → stage → validate → commit.
//!
//! The manager is deliberately pure with respect to notification: every
//! state change returns the [`RealmEvent`]s it produced instead of
//! publishing them, so the caller decides where they go. That keeps the
//! engine testable without a bus and lets the sync layer own delivery
//! ordering.

use realm_adapter::{Adapter, AdapterRegistry, ElementTree};
use realm_registry::ElementRegistry;
use realm_types::{
    ChangeId, EventPayload, EventSource, Operation, OperationPayload, RealmEvent, RealmId,
    Timestamp, TransactionId,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::changelog::{ChangeLog, ChangeLogEntry, ChangeLogStats, ChangeQuery};
use crate::error::{EngineError, EngineResult};
use crate::lock::FileLockManager;
use crate::transaction::{
    content_hash, Snapshot, Transaction, TransactionStatus, ValidationResult,
};
use crate::workspace::WorkspaceIo;

/// How many finished transactions are retained for inspection.
const DEFAULT_COMPLETED_CAP: usize = 100;

/// Tunables for [`TransactionManager`].
#[derive(Debug, Clone)]
pub struct TransactionConfig {
    /// How long `begin` waits for the file lock. Zero means fail fast:
    /// a held lock rejects the transaction immediately.
    pub lock_timeout: Duration,
    /// Lock TTL; an unreleased lock older than this is reclaimable.
    pub lock_ttl: Duration,
    /// How long a transaction may sit pending/validated before the
    /// sweep force-rolls it back. Independent of the lock TTL.
    pub transaction_ttl: Duration,
    /// Retained finished transactions.
    pub completed_capacity: usize,
    /// Change log capacity.
    pub changelog_capacity: usize,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::ZERO,
            lock_ttl: crate::lock::DEFAULT_LOCK_TTL,
            transaction_ttl: Duration::from_secs(300),
            completed_capacity: DEFAULT_COMPLETED_CAP,
            changelog_capacity: 1000,
        }
    }
}

/// Coordinates element mutations across the workspace, the adapter set,
/// and the element registry.
pub struct TransactionManager {
    workspace: Arc<dyn WorkspaceIo>,
    adapters: Arc<AdapterRegistry>,
    registry: Arc<RwLock<ElementRegistry>>,
    locks: FileLockManager,
    changelog: Mutex<ChangeLog>,
    active: Mutex<HashMap<TransactionId, Transaction>>,
    completed: Mutex<VecDeque<Transaction>>,
    config: TransactionConfig,
}

impl TransactionManager {
    #[must_use]
    pub fn new(
        workspace: Arc<dyn WorkspaceIo>,
        adapters: Arc<AdapterRegistry>,
        registry: Arc<RwLock<ElementRegistry>>,
    ) -> Self {
        Self::with_config(workspace, adapters, registry, TransactionConfig::default())
    }

    #[must_use]
    pub fn with_config(
        workspace: Arc<dyn WorkspaceIo>,
        adapters: Arc<AdapterRegistry>,
        registry: Arc<RwLock<ElementRegistry>>,
        config: TransactionConfig,
    ) -> Self {
        Self {
            workspace,
            adapters,
            registry,
            locks: FileLockManager::new(config.lock_ttl),
            changelog: Mutex::new(ChangeLog::new(config.changelog_capacity)),
            active: Mutex::new(HashMap::new()),
            completed: Mutex::new(VecDeque::new()),
            config,
        }
    }

    /// The shared element registry.
    #[must_use]
    pub fn registry(&self) -> Arc<RwLock<ElementRegistry>> {
        Arc::clone(&self.registry)
    }

    /// The file lock table.
    #[must_use]
    pub fn locks(&self) -> &FileLockManager {
        &self.locks
    }

    // ── Scanning ────────────────────────────────────────────────

    /// Parses a file and registers every element found in it, replacing
    /// any prior registrations for the file. Registered elements keep
    /// their previous version numbers. Returns the ids now registered.
    pub async fn scan_file(&self, file_path: &str) -> EngineResult<Vec<RealmId>> {
        let content = self.workspace.read_file(file_path).await?;
        self.refresh_registry(file_path, &content, None).await
    }

    /// Handles an external file change: drops the file's registrations
    /// and rescans. Skipped while a transaction holds the file, since
    /// the commit path refreshes the registry itself.
    pub async fn handle_file_changed(&self, file_path: &str) -> EngineResult<Vec<RealmId>> {
        if self.locks.is_locked(file_path).await {
            debug!(file = file_path, "file changed under an active lock, rescan deferred");
            return Ok(Vec::new());
        }
        if !self.workspace.exists(file_path).await {
            let mut registry = self.registry.write().await;
            let removed = registry.clear_file(file_path);
            info!(file = file_path, removed, "deleted file cleared from registry");
            return Ok(Vec::new());
        }
        self.scan_file(file_path).await
    }

    // ── Transaction lifecycle ───────────────────────────────────

    /// Opens a transaction against the element with the given identity
    /// hash. The file lock is taken before any snapshot: when the file
    /// is already locked, this fails without reading anything.
    pub async fn begin(&self, target_hash: &str) -> EngineResult<TransactionId> {
        let (file_path, target) = {
            let registry = self.registry.read().await;
            let info = registry
                .get(target_hash)
                .ok_or_else(|| EngineError::UnknownElement(target_hash.to_string()))?;
            (info.realm_id.source_file.clone(), info.realm_id.hash.clone())
        };

        let id = TransactionId::new();
        if !self
            .locks
            .acquire(&file_path, &id.to_string(), self.config.lock_timeout)
            .await
        {
            return Err(EngineError::LockTimeout {
                path: file_path.clone(),
            });
        }

        let content = match self.workspace.read_file(&file_path).await {
            Ok(content) => content,
            Err(err) => {
                self.locks.release(&file_path, &id.to_string()).await;
                return Err(err.into());
            }
        };

        let tx = Transaction::with_id(id, target, file_path, Snapshot::capture(content));
        debug!(tx = %id, file = %tx.file_path, "transaction opened");
        self.active.lock().await.insert(id, tx);
        Ok(id)
    }

    /// Stages one operation. Re-opens a validated transaction: staging
    /// after validation discards the validated output.
    pub async fn apply(&self, id: TransactionId, operation: Operation) -> EngineResult<()> {
        let mut active = self.active.lock().await;
        let tx = active
            .get_mut(&id)
            .ok_or(EngineError::UnknownTransaction(id))?;
        if !tx.is_open() {
            return Err(EngineError::InvalidState {
                id,
                expected: "pending or validated",
                found: tx.status.name(),
            });
        }
        tx.status = TransactionStatus::Pending;
        tx.after = None;
        tx.validated_at = None;
        tx.operations.push(operation);
        Ok(())
    }

    /// Runs every staged operation against the snapshot and regenerates
    /// the file. A failing operation records an error instead of
    /// aborting, so one validation pass reports everything wrong.
    pub async fn validate(&self, id: TransactionId) -> EngineResult<ValidationResult> {
        let (file_path, snapshot_content, operations) = {
            let active = self.active.lock().await;
            let tx = active.get(&id).ok_or(EngineError::UnknownTransaction(id))?;
            if !tx.is_open() {
                return Err(EngineError::InvalidState {
                    id,
                    expected: "pending or validated",
                    found: tx.status.name(),
                });
            }
            (
                tx.file_path.clone(),
                tx.before.content.clone(),
                tx.operations.clone(),
            )
        };

        self.workspace.resolve(&file_path)?;
        let adapter = self
            .adapters
            .detect(&file_path, &snapshot_content)
            .ok_or_else(|| EngineError::NoAdapterMatched(file_path.clone()))?;

        let mut result = ValidationResult::ok();
        let mut tree = adapter.parse(&file_path, &snapshot_content)?;
        for op in &operations {
            match Self::apply_operation(adapter.as_ref(), &tree, op) {
                Ok(next) => tree = next,
                Err(err) => result.errors.push(format!(
                    "{} on {}: {err}",
                    op.payload.kind(),
                    op.target.hash
                )),
            }
        }

        let mut after = None;
        if result.errors.is_empty() {
            let generated = adapter.generate_code(&tree, &snapshot_content)?;
            match adapter.parse(&file_path, &generated) {
                Ok(reparsed) => {
                    if reparsed.element_count() != tree.element_count() {
                        result
                            .warnings
                            .push("regenerated file has a different element count".to_string());
                    }
                    after = Some(generated);
                }
                Err(err) => result
                    .errors
                    .push(format!("regenerated file does not parse: {err}")),
            }
        }
        result.valid = result.errors.is_empty();

        let mut active = self.active.lock().await;
        if let Some(tx) = active.get_mut(&id) {
            if result.valid {
                tx.after = after;
                tx.status = TransactionStatus::Validated;
                tx.validated_at = Some(Timestamp::now());
            }
        }
        Ok(result)
    }

    /// Writes the validated content, logs the change, refreshes the
    /// file's registrations (bumping the target's version), and
    /// releases the lock.
    pub async fn commit(&self, id: TransactionId) -> EngineResult<Vec<RealmEvent>> {
        let tx = {
            let mut active = self.active.lock().await;
            let tx = active.get(&id).ok_or(EngineError::UnknownTransaction(id))?;
            if tx.status != TransactionStatus::Validated {
                return Err(EngineError::InvalidState {
                    id,
                    expected: "validated",
                    found: tx.status.name(),
                });
            }
            active.remove(&id).ok_or(EngineError::UnknownTransaction(id))?
        };

        let after = match tx.after.clone() {
            Some(after) => after,
            None => {
                // Unreachable through the public API; validated implies after.
                self.finish(tx, TransactionStatus::Failed, Some("no validated content"))
                    .await;
                return Err(EngineError::InvalidState {
                    id,
                    expected: "validated",
                    found: "validated without output",
                });
            }
        };

        if let Err(err) = self.workspace.write_file(&tx.file_path, &after).await {
            warn!(tx = %id, file = %tx.file_path, error = %err, "commit write failed");
            self.finish(tx, TransactionStatus::Failed, Some(&err.to_string()))
                .await;
            return Err(err.into());
        }

        let entry = ChangeLogEntry {
            id: ChangeId::new(),
            transaction_id: id,
            timestamp: Timestamp::now(),
            file_path: tx.file_path.clone(),
            operations: tx.operations.clone(),
            before_hash: tx.before.content_hash.clone(),
            after_hash: content_hash(&after),
            before_content: tx.before.content.clone(),
            after_content: after.clone(),
            rolled_back: false,
            rolled_back_at: None,
        };
        self.changelog.lock().await.append(entry);

        if let Err(err) = self
            .refresh_registry(&tx.file_path, &after, Some(&tx.target))
            .await
        {
            warn!(tx = %id, error = %err, "registry refresh after commit failed");
        }

        let file_path = tx.file_path.clone();
        info!(tx = %id, file = %file_path, ops = tx.operations.len(), "transaction committed");
        self.finish(tx, TransactionStatus::Committed, None).await;
        Ok(vec![RealmEvent::committed(id, file_path)])
    }

    /// Discards an open transaction. Nothing was written, so this only
    /// drops staged state and releases the lock.
    pub async fn rollback(&self, id: TransactionId) -> EngineResult<Vec<RealmEvent>> {
        let tx = {
            let mut active = self.active.lock().await;
            let tx = active.remove(&id).ok_or(EngineError::UnknownTransaction(id))?;
            if !tx.is_open() {
                let status = tx.status.name();
                active.insert(id, tx);
                return Err(EngineError::InvalidState {
                    id,
                    expected: "pending or validated",
                    found: status,
                });
            }
            tx
        };
        debug!(tx = %id, "transaction rolled back before commit");
        self.finish(tx, TransactionStatus::RolledBack, None).await;
        Ok(vec![RealmEvent::new(
            EventSource::System,
            EventPayload::TransactionRolledBack { transaction_id: id },
        )])
    }

    /// Undoes a committed transaction with a corrective write of the
    /// logged before-content. Refuses when the file has moved on since
    /// the commit.
    pub async fn rollback_committed(&self, id: TransactionId) -> EngineResult<Vec<RealmEvent>> {
        let entry = {
            let changelog = self.changelog.lock().await;
            let entry = changelog
                .by_transaction(id)
                .ok_or(EngineError::UnknownTransaction(id))?;
            if entry.rolled_back {
                return Err(EngineError::InvalidState {
                    id,
                    expected: "committed",
                    found: "rolled-back",
                });
            }
            entry.clone()
        };

        let owner = format!("rollback:{id}");
        if !self
            .locks
            .acquire(&entry.file_path, &owner, crate::lock::DEFAULT_ACQUIRE_TIMEOUT)
            .await
        {
            return Err(EngineError::LockTimeout {
                path: entry.file_path.clone(),
            });
        }

        let outcome = self.corrective_write(&entry).await;
        self.locks.release(&entry.file_path, &owner).await;
        outcome?;

        self.changelog.lock().await.mark_rolled_back(entry.id);
        if let Err(err) = self
            .refresh_registry(&entry.file_path, &entry.before_content, None)
            .await
        {
            warn!(tx = %id, error = %err, "registry refresh after rollback failed");
        }
        info!(tx = %id, file = %entry.file_path, "committed transaction rolled back");
        Ok(vec![RealmEvent::new(
            EventSource::System,
            EventPayload::TransactionRolledBack { transaction_id: id },
        )])
    }

    async fn corrective_write(&self, entry: &ChangeLogEntry) -> EngineResult<()> {
        let current = self.workspace.read_file(&entry.file_path).await?;
        if content_hash(&current) != entry.after_hash {
            return Err(EngineError::ValidationFailed {
                errors: vec![format!(
                    "{} changed since the commit being rolled back",
                    entry.file_path
                )],
            });
        }
        self.workspace
            .write_file(&entry.file_path, &entry.before_content)
            .await?;
        Ok(())
    }

    /// Looks up a transaction, active or retained.
    pub async fn get(&self, id: TransactionId) -> Option<Transaction> {
        if let Some(tx) = self.active.lock().await.get(&id) {
            return Some(tx.clone());
        }
        self.completed
            .lock()
            .await
            .iter()
            .find(|tx| tx.id == id)
            .cloned()
    }

    /// Open transaction count.
    pub async fn active_count(&self) -> usize {
        self.active.lock().await.len()
    }

    // ── TTL sweeping ────────────────────────────────────────────

    /// Reclaims expired locks and force-rolls-back transactions that
    /// outlived their TTL. Returns the failure events produced.
    pub async fn sweep_expired(&self) -> Vec<RealmEvent> {
        let mut events = Vec::new();

        for lock in self.locks.sweep_expired().await {
            let Ok(tx_id) = lock.owner.parse::<TransactionId>() else {
                continue;
            };
            let Some(mut tx) = self.active.lock().await.remove(&tx_id) else {
                continue;
            };
            warn!(tx = %tx_id, file = %lock.path, "transaction expired with its lock");
            tx.status = TransactionStatus::Failed;
            tx.error = Some("lock TTL expired".to_string());
            self.retain_completed(tx).await;
            events.push(RealmEvent::failed(tx_id, "lock TTL expired"));
        }

        let stale: Vec<Transaction> = {
            let mut active = self.active.lock().await;
            let ids: Vec<TransactionId> = active
                .iter()
                .filter(|(_, tx)| tx.created_at.elapsed() > self.config.transaction_ttl)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter().filter_map(|id| active.remove(&id)).collect()
        };
        for tx in stale {
            let id = tx.id;
            warn!(tx = %id, file = %tx.file_path, "transaction outlived its TTL");
            let reason = EngineError::TransactionTimeout(id).to_string();
            self.finish(tx, TransactionStatus::Failed, Some(&reason)).await;
            events.push(RealmEvent::failed(id, reason));
        }
        events
    }

    /// Spawns a background sweeper that forwards failure events to
    /// `sink`. Stops when the manager or the receiver is dropped.
    pub fn spawn_ttl_watchdog(
        self: &Arc<Self>,
        interval: Duration,
        sink: mpsc::UnboundedSender<RealmEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                for event in manager.sweep_expired().await {
                    if sink.send(event).is_err() {
                        return;
                    }
                }
            }
        })
    }

    // ── Change log access ───────────────────────────────────────

    pub async fn query_log(&self, query: &ChangeQuery) -> Vec<ChangeLogEntry> {
        self.changelog
            .lock()
            .await
            .query(query)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn file_history(&self, file_path: &str) -> Vec<ChangeLogEntry> {
        self.changelog
            .lock()
            .await
            .get_file_history(file_path)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn last_valid_change(&self, file_path: &str) -> Option<ChangeLogEntry> {
        self.changelog
            .lock()
            .await
            .get_last_valid_change(file_path)
            .cloned()
    }

    pub async fn log_stats(&self) -> ChangeLogStats {
        self.changelog.lock().await.stats()
    }

    pub async fn export_log(&self) -> EngineResult<String> {
        self.changelog.lock().await.export()
    }

    pub async fn import_log(&self, json: &str) -> EngineResult<usize> {
        self.changelog.lock().await.import(json)
    }

    // ── Internals ───────────────────────────────────────────────

    fn apply_operation(
        adapter: &dyn Adapter,
        tree: &ElementTree,
        op: &Operation,
    ) -> realm_adapter::AdapterResult<ElementTree> {
        match &op.payload {
            OperationPayload::Style {
                property, value, ..
            } => adapter.apply_styles(tree, &op.target, property, value.as_deref()),
            OperationPayload::Text { text, .. } => adapter.apply_text(tree, &op.target, text),
            OperationPayload::Class { add, remove, .. } => {
                adapter.apply_classes(tree, &op.target, add, remove)
            }
            OperationPayload::Attribute { name, value, .. } => {
                adapter.apply_attribute(tree, &op.target, name, value.as_deref())
            }
            OperationPayload::Structure { edit } => {
                adapter.apply_structure(tree, &op.target, edit)
            }
        }
    }

    /// Replaces a file's registrations from freshly parsed content.
    /// Surviving elements keep their version; `bump` gets incremented.
    async fn refresh_registry(
        &self,
        file_path: &str,
        content: &str,
        bump: Option<&str>,
    ) -> EngineResult<Vec<RealmId>> {
        let adapter = self
            .adapters
            .detect(file_path, content)
            .ok_or_else(|| EngineError::NoAdapterMatched(file_path.to_string()))?;
        let tree = adapter.parse(file_path, content)?;
        let parsed = adapter.find_all_elements(&tree);

        let mut registry = self.registry.write().await;
        let old_versions: HashMap<String, u32> = registry
            .find_by_file(file_path)
            .into_iter()
            .map(|e| (e.realm_id.hash.clone(), e.realm_id.version))
            .collect();
        registry.clear_file(file_path);

        let mut ids = Vec::with_capacity(parsed.len());
        for element in parsed {
            let mut info = element.info;
            if let Some(&version) = old_versions.get(&info.realm_id.hash) {
                info.realm_id.version = version;
            }
            if bump == Some(info.realm_id.hash.as_str()) {
                info.realm_id = info.realm_id.bump_version();
            }
            ids.push(info.realm_id.clone());
            registry.register(info);
        }
        debug!(file = file_path, count = ids.len(), "registry refreshed");
        Ok(ids)
    }

    async fn finish(&self, mut tx: Transaction, status: TransactionStatus, error: Option<&str>) {
        self.locks.release(&tx.file_path, &tx.id.to_string()).await;
        tx.status = status;
        tx.error = error.map(str::to_string);
        if status == TransactionStatus::Committed {
            tx.committed_at = Some(Timestamp::now());
        }
        self.retain_completed(tx).await;
    }

    async fn retain_completed(&self, tx: Transaction) {
        let mut completed = self.completed.lock().await;
        completed.push_back(tx);
        while completed.len() > self.config.completed_capacity {
            completed.pop_front();
        }
    }
}
