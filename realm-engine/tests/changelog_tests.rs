//! Tests for changelog.rs — append, query, rollback marks, import/export.

use pretty_assertions::assert_eq;
use realm_engine::{content_hash, ChangeLog, ChangeLogEntry, ChangeQuery};
use realm_types::{
    ChangeId, Operation, RealmId, SourceLocation, SourceSpan, Timestamp, TransactionId,
};

fn span() -> SourceSpan {
    SourceSpan::new(SourceLocation::new(5, 5, 60), SourceLocation::new(11, 10, 200))
}

fn entry(file: &str, before: &str, after: &str) -> ChangeLogEntry {
    let target = RealmId::generate(file, "App", "App/div[0]", span());
    ChangeLogEntry {
        id: ChangeId::new(),
        transaction_id: TransactionId::new(),
        timestamp: Timestamp::now(),
        file_path: file.to_string(),
        operations: vec![Operation::set_style(target, "color", "blue")],
        before_hash: content_hash(before),
        after_hash: content_hash(after),
        before_content: before.to_string(),
        after_content: after.to_string(),
        rolled_back: false,
        rolled_back_at: None,
    }
}

// ── append and lookup ───────────────────────────────────────────

#[test]
fn append_and_get() {
    let mut log = ChangeLog::default();
    let e = entry("src/App.tsx", "a", "b");
    let tx = e.transaction_id;
    let id = log.append(e);

    assert_eq!(log.len(), 1);
    assert_eq!(log.get(id).unwrap().file_path, "src/App.tsx");
    assert_eq!(log.by_transaction(tx).unwrap().id, id);
}

#[test]
fn records_distinct_before_and_after_hashes() {
    let mut log = ChangeLog::default();
    let id = log.append(entry("src/App.tsx", "before", "after"));
    let e = log.get(id).unwrap();
    assert_ne!(e.before_hash, e.after_hash);
    assert_eq!(e.before_hash, content_hash("before"));
    assert_eq!(e.after_hash, content_hash("after"));
}

#[test]
fn capacity_prunes_oldest_first() {
    let mut log = ChangeLog::new(2);
    let first = log.append(entry("src/A.tsx", "1", "2"));
    log.append(entry("src/B.tsx", "1", "2"));
    log.append(entry("src/C.tsx", "1", "2"));

    assert_eq!(log.len(), 2);
    assert!(log.get(first).is_none());
    assert!(log.get_file_history("src/A.tsx").is_empty());
}

// ── queries ─────────────────────────────────────────────────────

#[test]
fn query_returns_newest_first() {
    let mut log = ChangeLog::default();
    log.append(entry("src/App.tsx", "v1", "v2"));
    log.append(entry("src/App.tsx", "v2", "v3"));

    let hits = log.query(&ChangeQuery::default());
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].before_content, "v2");
    assert_eq!(hits[1].before_content, "v1");
}

#[test]
fn query_filters_by_file_and_limit() {
    let mut log = ChangeLog::default();
    log.append(entry("src/A.tsx", "1", "2"));
    log.append(entry("src/B.tsx", "1", "2"));
    log.append(entry("src/A.tsx", "2", "3"));

    let hits = log.query(&ChangeQuery {
        file_path: Some("src/A.tsx".to_string()),
        ..ChangeQuery::default()
    });
    assert_eq!(hits.len(), 2);

    let hits = log.query(&ChangeQuery {
        file_path: Some("src/A.tsx".to_string()),
        limit: Some(1),
        ..ChangeQuery::default()
    });
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].before_content, "2");
}

#[test]
fn query_filters_by_transaction_and_time() {
    let mut log = ChangeLog::default();
    let mut early = entry("src/A.tsx", "1", "2");
    early.timestamp = Timestamp::from_millis(1_000);
    let tx = early.transaction_id;
    log.append(early);
    let mut late = entry("src/A.tsx", "2", "3");
    late.timestamp = Timestamp::from_millis(2_000);
    log.append(late);

    let hits = log.query(&ChangeQuery {
        transaction_id: Some(tx),
        ..ChangeQuery::default()
    });
    assert_eq!(hits.len(), 1);

    let hits = log.query(&ChangeQuery {
        since: Some(Timestamp::from_millis(1_500)),
        ..ChangeQuery::default()
    });
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].before_content, "2");

    let hits = log.query(&ChangeQuery {
        until: Some(Timestamp::from_millis(1_500)),
        ..ChangeQuery::default()
    });
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].before_content, "1");
}

// ── rollback marks ──────────────────────────────────────────────

#[test]
fn last_valid_change_skips_rolled_back_entries() {
    let mut log = ChangeLog::default();
    log.append(entry("src/App.tsx", "v1", "v2"));
    let newest = log.append(entry("src/App.tsx", "v2", "v3"));

    assert_eq!(log.get_file_history("src/App.tsx").len(), 2);
    assert!(log.mark_rolled_back(newest));

    // The newest entry is rolled back, so the older commit is the last
    // valid one.
    let valid = log.get_last_valid_change("src/App.tsx").unwrap();
    assert_eq!(valid.after_content, "v2");
    assert!(!valid.rolled_back);
}

#[test]
fn mark_rolled_back_stamps_the_entry() {
    let mut log = ChangeLog::default();
    let id = log.append(entry("src/App.tsx", "a", "b"));
    assert!(log.mark_rolled_back(id));
    let e = log.get(id).unwrap();
    assert!(e.rolled_back);
    assert!(e.rolled_back_at.is_some());

    assert!(!log.mark_rolled_back(ChangeId::new()));
}

#[test]
fn query_can_exclude_rolled_back() {
    let mut log = ChangeLog::default();
    let id = log.append(entry("src/App.tsx", "a", "b"));
    log.append(entry("src/App.tsx", "b", "c"));
    log.mark_rolled_back(id);

    let hits = log.query(&ChangeQuery {
        exclude_rolled_back: true,
        ..ChangeQuery::default()
    });
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].before_content, "b");
}

// ── import/export ───────────────────────────────────────────────

#[test]
fn export_import_round_trip() {
    let mut log = ChangeLog::default();
    log.append(entry("src/A.tsx", "1", "2"));
    log.append(entry("src/B.tsx", "1", "2"));
    let json = log.export().unwrap();

    let mut restored = ChangeLog::default();
    assert_eq!(restored.import(&json).unwrap(), 2);
    assert_eq!(restored.len(), 2);
    assert_eq!(restored.get_file_history("src/A.tsx").len(), 1);
}

#[test]
fn import_replays_on_top_of_existing_entries() {
    let mut exported = ChangeLog::default();
    exported.append(entry("src/B.tsx", "1", "2"));
    exported.append(entry("src/C.tsx", "1", "2"));
    let json = exported.export().unwrap();

    let mut log = ChangeLog::new(3);
    let kept = log.append(entry("src/A.tsx", "1", "2"));
    assert_eq!(log.import(&json).unwrap(), 2);

    // The pre-existing entry survives, imported entries land after it,
    // and the capacity bound still applies through the replay.
    assert_eq!(log.len(), 3);
    assert!(log.get(kept).is_some());
    let hits = log.query(&ChangeQuery::default());
    assert_eq!(hits[0].file_path, "src/C.tsx");
    assert_eq!(hits[2].file_path, "src/A.tsx");
}

#[test]
fn malformed_import_leaves_log_untouched() {
    let mut log = ChangeLog::default();
    log.append(entry("src/A.tsx", "1", "2"));

    assert!(log.import("{not json").is_err());
    assert!(log.import(r#"[{"bogus": true}]"#).is_err());
    assert_eq!(log.len(), 1);
    assert_eq!(log.get_file_history("src/A.tsx").len(), 1);
}

// ── stats ───────────────────────────────────────────────────────

#[test]
fn stats_summarize_the_log() {
    let mut log = ChangeLog::default();
    assert_eq!(log.stats().total_entries, 0);
    assert!(log.stats().oldest.is_none());

    let mut a = entry("src/A.tsx", "1", "2");
    a.timestamp = Timestamp::from_millis(1_000);
    let rolled = log.append(a);
    let mut b = entry("src/B.tsx", "1", "2");
    b.timestamp = Timestamp::from_millis(2_000);
    log.append(b);
    log.mark_rolled_back(rolled);

    let stats = log.stats();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.rolled_back, 1);
    assert_eq!(stats.files_touched, 2);
    assert_eq!(stats.oldest, Some(Timestamp::from_millis(1_000)));
    assert_eq!(stats.newest, Some(Timestamp::from_millis(2_000)));
}
