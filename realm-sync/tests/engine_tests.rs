//! Tests for engine.rs — dedup, mirroring, the commit pipeline, and
//! conflict detection against a real workspace.

use pretty_assertions::assert_eq;
use realm_adapter::{AdapterRegistry, JsxAdapter};
use realm_engine::{FsWorkspace, TransactionManager};
use realm_registry::ElementRegistry;
use realm_sync::mock::MockClient;
use realm_sync::{
    ConflictDecision, ConflictResolver, SyncClient, SyncConfig, SyncEngine, SyncError,
};
use realm_types::{EventPayload, EventSource, Operation, RealmEvent, RealmId};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::RwLock;

const APP: &str = r#"import React from 'react';

function App() {
  return (
    <div className="card" style={{ color: 'red' }}>
      <h1>Title</h1>
      <button className="btn" onClick={() => save()}>
        Save
      </button>
    </div>
  );
}
"#;

struct Harness {
    _dir: TempDir,
    engine: SyncEngine,
    editor: MockClient,
    surface: MockClient,
}

async fn setup() -> Harness {
    setup_with_resolver(None).await
}

async fn setup_with_resolver(resolver: Option<Arc<dyn ConflictResolver>>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("App.tsx"), APP).unwrap();

    let mut adapters = AdapterRegistry::new();
    adapters.register(Arc::new(JsxAdapter::new()));
    let manager = Arc::new(TransactionManager::new(
        Arc::new(FsWorkspace::new(dir.path())),
        Arc::new(adapters),
        Arc::new(RwLock::new(ElementRegistry::new())),
    ));
    manager.scan_file("App.tsx").await.unwrap();

    let engine = match resolver {
        Some(resolver) => SyncEngine::with_resolver(manager, SyncConfig::default(), resolver),
        None => SyncEngine::new(manager),
    };

    let editor = MockClient::new("editor");
    let surface = MockClient::new("surface");
    engine.connect(Arc::new(editor.clone())).await;
    engine.connect(Arc::new(surface.clone())).await;

    Harness {
        _dir: dir,
        engine,
        editor,
        surface,
    }
}

async fn id_at(engine: &SyncEngine, ast_path: &str) -> RealmId {
    let registry = engine.manager().registry();
    let registry = registry.read().await;
    registry
        .find_by_file("App.tsx")
        .into_iter()
        .map(|e| e.realm_id.clone())
        .find(|id| id.ast_path == ast_path)
        .unwrap_or_else(|| panic!("no element at {ast_path}"))
}

fn drain(client: &MockClient) -> Vec<RealmEvent> {
    std::iter::from_fn(|| client.take_delivered()).collect()
}

// ── client lifecycle ────────────────────────────────────────────

#[tokio::test]
async fn connect_and_disconnect() {
    let h = setup().await;
    assert_eq!(h.engine.client_count().await, 2);
    assert!(h.engine.disconnect(h.surface.client_id()).await);
    assert!(!h.engine.disconnect(h.surface.client_id()).await);
    assert_eq!(h.engine.client_count().await, 1);
}

#[tokio::test]
async fn events_from_unknown_clients_are_rejected() {
    let h = setup().await;
    let stranger = MockClient::new("stranger");
    let div = id_at(&h.engine, "App/div[0]").await;
    let event = RealmEvent::style_preview(EventSource::Dom, div, "color", Some("blue".into()));

    let err = h
        .engine
        .handle_incoming(stranger.client_id(), event)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ClientClosed(_)));
}

// ── dedup ───────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_events_are_dropped_per_session() {
    let h = setup().await;
    let div = id_at(&h.engine, "App/div[0]").await;
    let event = RealmEvent::style_preview(EventSource::Dom, div, "color", Some("blue".into()));

    h.engine
        .handle_incoming(h.editor.client_id(), event.clone())
        .await
        .unwrap();
    h.engine
        .handle_incoming(h.editor.client_id(), event.clone())
        .await
        .unwrap();
    assert_eq!(h.surface.delivered_count(), 1);

    // A reconnect opens a fresh session, so the same id goes through.
    h.engine.disconnect(h.editor.client_id()).await;
    h.engine.connect(Arc::new(h.editor.clone())).await;
    h.engine
        .handle_incoming(h.editor.client_id(), event)
        .await
        .unwrap();
    assert_eq!(h.surface.delivered_count(), 2);
}

// ── preview mirroring ───────────────────────────────────────────

#[tokio::test]
async fn previews_mirror_to_other_clients_only() {
    let h = setup().await;
    let div = id_at(&h.engine, "App/div[0]").await;
    let event = RealmEvent::style_preview(EventSource::Dom, div, "color", Some("blue".into()));

    let produced = h
        .engine
        .handle_incoming(h.surface.client_id(), event.clone())
        .await
        .unwrap();
    assert!(produced.is_empty());
    assert_eq!(h.surface.delivered_count(), 0);
    let mirrored = drain(&h.editor);
    assert_eq!(mirrored.len(), 1);
    assert_eq!(mirrored[0].id, event.id);

    // Previews never reach the transaction pipeline.
    assert!(h.engine.manager().file_history("App.tsx").await.is_empty());
}

#[tokio::test]
async fn selection_mirrors_like_a_preview() {
    let h = setup().await;
    let button = id_at(&h.engine, "App/div[0]/button[0]").await;
    let event = RealmEvent::element_selected(EventSource::Editor, button);

    h.engine
        .handle_incoming(h.editor.client_id(), event)
        .await
        .unwrap();
    assert_eq!(h.editor.delivered_count(), 0);
    assert_eq!(h.surface.delivered_count(), 1);
}

// ── commit requests ─────────────────────────────────────────────

#[tokio::test]
async fn commit_request_commits_and_broadcasts() {
    let h = setup().await;
    let div = id_at(&h.engine, "App/div[0]").await;
    let request = RealmEvent::commit_request(
        EventSource::Panel,
        div.clone(),
        vec![Operation::set_style(div.clone(), "background-color", "#ff0000")],
    );

    let produced = h
        .engine
        .handle_incoming(h.surface.client_id(), request)
        .await
        .unwrap();
    assert_eq!(produced.len(), 1);
    assert!(matches!(
        produced[0].payload,
        EventPayload::TransactionCommitted { .. }
    ));

    // Lifecycle events go to every client, the requester included.
    assert_eq!(h.editor.delivered_count(), 1);
    assert_eq!(h.surface.delivered_count(), 1);

    let history = h.engine.manager().file_history("App.tsx").await;
    assert_eq!(history.len(), 1);
    assert!(history[0].after_content.contains("backgroundColor: '#ff0000'"));
}

#[tokio::test]
async fn invalid_commit_request_produces_a_failure_event() {
    let h = setup().await;
    let div = id_at(&h.engine, "App/div[0]").await;
    let mut gone = div.clone();
    gone.span.start.line = 99;
    let request = RealmEvent::commit_request(
        EventSource::Panel,
        div,
        vec![Operation::set_text(gone, "nope")],
    );

    let produced = h
        .engine
        .handle_incoming(h.surface.client_id(), request)
        .await
        .unwrap();
    assert_eq!(produced.len(), 1);
    assert!(matches!(
        produced[0].payload,
        EventPayload::TransactionFailed { .. }
    ));

    // Nothing was written and the lock is free again.
    assert!(h.engine.manager().file_history("App.tsx").await.is_empty());
    assert!(!h.engine.manager().locks().is_locked("App.tsx").await);
}

#[tokio::test]
async fn rollback_request_undoes_a_commit() {
    let h = setup().await;
    let h1 = id_at(&h.engine, "App/div[0]/h1[0]").await;
    let request = RealmEvent::commit_request(
        EventSource::Panel,
        h1.clone(),
        vec![Operation::set_text(h1, "Dashboard")],
    );
    let produced = h
        .engine
        .handle_incoming(h.surface.client_id(), request)
        .await
        .unwrap();
    let EventPayload::TransactionCommitted { transaction_id, .. } = &produced[0].payload else {
        panic!("expected a committed event");
    };
    let transaction_id = *transaction_id;
    drain(&h.editor);
    drain(&h.surface);

    let rollback = RealmEvent::new(
        EventSource::Panel,
        EventPayload::RollbackRequest { transaction_id },
    );
    let produced = h
        .engine
        .handle_incoming(h.surface.client_id(), rollback)
        .await
        .unwrap();
    assert!(matches!(
        produced[0].payload,
        EventPayload::TransactionRolledBack { .. }
    ));
    assert_eq!(h.editor.delivered_count(), 1);

    let history = h.engine.manager().file_history("App.tsx").await;
    assert!(history[0].rolled_back);
}

// ── version conflicts ───────────────────────────────────────────

#[tokio::test]
async fn stale_version_is_reported_and_kept_local() {
    let h = setup().await;
    let h1 = id_at(&h.engine, "App/div[0]/h1[0]").await;

    // Commit once so the local version advances past the remote's copy.
    let request = RealmEvent::commit_request(
        EventSource::Panel,
        h1.clone(),
        vec![Operation::set_text(h1.clone(), "Fresh")],
    );
    h.engine
        .handle_incoming(h.surface.client_id(), request)
        .await
        .unwrap();
    drain(&h.editor);
    drain(&h.surface);

    // The stale id still carries version 1.
    let stale = RealmEvent::text_preview(EventSource::Dom, h1.clone(), "Stale");
    let produced = h
        .engine
        .handle_incoming(h.surface.client_id(), stale)
        .await
        .unwrap();

    assert_eq!(produced.len(), 1);
    let EventPayload::ConflictDetected {
        local_version,
        remote_version,
        ..
    } = &produced[0].payload
    else {
        panic!("expected a conflict event");
    };
    assert_eq!((*local_version, *remote_version), (2, 1));

    // The preview was dropped; only the conflict reached the editor.
    let seen = drain(&h.editor);
    assert_eq!(seen.len(), 1);
    assert!(matches!(
        seen[0].payload,
        EventPayload::ConflictDetected { .. }
    ));
}

struct AcceptEverything;

impl ConflictResolver for AcceptEverything {
    fn resolve(&self, _id: &RealmId, _local: u32, _remote: u32) -> ConflictDecision {
        ConflictDecision::AcceptRemote
    }
}

#[tokio::test]
async fn accepting_resolver_lets_a_stale_commit_proceed() {
    let h = setup_with_resolver(Some(Arc::new(AcceptEverything))).await;
    let h1 = id_at(&h.engine, "App/div[0]/h1[0]").await;

    let first = RealmEvent::commit_request(
        EventSource::Panel,
        h1.clone(),
        vec![Operation::set_text(h1.clone(), "Fresh")],
    );
    h.engine
        .handle_incoming(h.surface.client_id(), first)
        .await
        .unwrap();

    let stale = RealmEvent::commit_request(
        EventSource::Panel,
        h1.clone(),
        vec![Operation::set_text(h1, "Stale but accepted")],
    );
    let produced = h
        .engine
        .handle_incoming(h.surface.client_id(), stale)
        .await
        .unwrap();

    // Conflict reported first, then the commit that went through anyway.
    assert_eq!(produced.len(), 2);
    assert!(matches!(
        produced[0].payload,
        EventPayload::ConflictDetected { .. }
    ));
    assert!(matches!(
        produced[1].payload,
        EventPayload::TransactionCommitted { .. }
    ));

    let history = h.engine.manager().file_history("App.tsx").await;
    assert!(history[0].after_content.contains("Stale but accepted"));
}

// ── file changes and dead clients ───────────────────────────────

#[tokio::test]
async fn file_change_rescans_and_notifies_other_clients() {
    let h = setup().await;
    let edited = APP.replace("Title", "Libel");
    std::fs::write(h._dir.path().join("App.tsx"), edited).unwrap();

    h.engine
        .handle_incoming(h.editor.client_id(), RealmEvent::file_changed("App.tsx"))
        .await
        .unwrap();

    assert_eq!(h.surface.delivered_count(), 1);
    assert_eq!(h.editor.delivered_count(), 0);

    let registry = h.engine.manager().registry();
    let registry = registry.read().await;
    let h1 = registry
        .find_by_file("App.tsx")
        .into_iter()
        .find(|e| e.realm_id.ast_path == "App/div[0]/h1[0]")
        .unwrap();
    assert_eq!(h1.text_content.as_deref(), Some("Libel"));
}

#[tokio::test]
async fn clients_with_closed_channels_are_dropped() {
    let h = setup().await;
    h.surface.close();

    let div = id_at(&h.engine, "App/div[0]").await;
    let event = RealmEvent::style_preview(EventSource::Dom, div, "color", Some("blue".into()));
    h.engine
        .handle_incoming(h.editor.client_id(), event)
        .await
        .unwrap();

    assert_eq!(h.engine.client_count().await, 1);
}
