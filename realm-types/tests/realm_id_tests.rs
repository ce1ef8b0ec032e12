//! Tests for realm_id.rs — identity derivation and validation.

use pretty_assertions::assert_eq;
use realm_types::{RealmId, SourceLocation, SourceSpan, REALM_HASH_LEN};

fn span(line: u32, column: u32) -> SourceSpan {
    SourceSpan::new(
        SourceLocation::new(line, column, 0),
        SourceLocation::new(line, column + 20, 120),
    )
}

// ── generation ──────────────────────────────────────────────────

#[test]
fn generate_is_deterministic() {
    let a = RealmId::generate("src/App.tsx", "App", "App/div[0]", span(10, 5));
    let b = RealmId::generate("src/App.tsx", "App", "App/div[0]", span(10, 5));
    assert_eq!(a.hash, b.hash);
    assert_eq!(a, b);
}

#[test]
fn hash_has_fixed_width() {
    let id = RealmId::generate("src/App.tsx", "App", "App/div[0]", span(1, 1));
    assert_eq!(id.hash.len(), REALM_HASH_LEN);
    assert!(id.hash.bytes().all(|b| b.is_ascii_hexdigit()));
}

#[test]
fn component_name_changes_hash() {
    let a = RealmId::generate("src/App.tsx", "App", "App/div[0]", span(10, 5));
    let b = RealmId::generate("src/App.tsx", "Header", "App/div[0]", span(10, 5));
    assert_ne!(a.hash, b.hash);
}

#[test]
fn ast_path_changes_hash() {
    let a = RealmId::generate("src/App.tsx", "App", "App/div[0]", span(10, 5));
    let b = RealmId::generate("src/App.tsx", "App", "App/div[1]", span(10, 5));
    assert_ne!(a.hash, b.hash);
}

#[test]
fn start_position_changes_hash() {
    let a = RealmId::generate("src/App.tsx", "App", "App/div[0]", span(10, 5));
    let b = RealmId::generate("src/App.tsx", "App", "App/div[0]", span(11, 5));
    let c = RealmId::generate("src/App.tsx", "App", "App/div[0]", span(10, 6));
    assert_ne!(a.hash, b.hash);
    assert_ne!(a.hash, c.hash);
}

#[test]
fn end_position_does_not_change_hash() {
    // Only the start position feeds the digest: growing an element's body
    // must not change its identity.
    let short = span(10, 5);
    let mut long = span(10, 5);
    long.end = SourceLocation::new(40, 2, 900);
    let a = RealmId::generate("src/App.tsx", "App", "App/div[0]", short);
    let b = RealmId::generate("src/App.tsx", "App", "App/div[0]", long);
    assert_eq!(a.hash, b.hash);
}

// ── version bumping ─────────────────────────────────────────────

#[test]
fn bump_version_keeps_hash() {
    let id = RealmId::generate("src/App.tsx", "App", "App/div[0]", span(10, 5));
    let bumped = id.bump_version();
    assert_eq!(bumped.version, 2);
    assert_eq!(bumped.hash, id.hash);
    assert_eq!(id.version, 1);
}

// ── serialization & validation ──────────────────────────────────

#[test]
fn json_round_trip_is_lossless() {
    let id = RealmId::generate("src/App.tsx", "App", "App/div[0]/span[2]", span(10, 5));
    let json = id.to_json().unwrap();
    let back = RealmId::parse_untrusted(&json).unwrap();
    assert_eq!(back, id);
    // Byte-for-byte through a second round trip.
    assert_eq!(back.to_json().unwrap(), json);
}

#[test]
fn parse_untrusted_rejects_bad_hash_length() {
    let mut id = RealmId::generate("src/App.tsx", "App", "App/div[0]", span(1, 1));
    id.hash.truncate(4);
    let json = serde_json::to_string(&id).unwrap();
    assert!(RealmId::parse_untrusted(&json).is_err());
}

#[test]
fn parse_untrusted_rejects_non_hex_hash() {
    let mut id = RealmId::generate("src/App.tsx", "App", "App/div[0]", span(1, 1));
    id.hash = "zzzzzzzzzzzzzzzz".to_string();
    let json = serde_json::to_string(&id).unwrap();
    assert!(RealmId::parse_untrusted(&json).is_err());
}

#[test]
fn parse_untrusted_rejects_zero_version() {
    let mut id = RealmId::generate("src/App.tsx", "App", "App/div[0]", span(1, 1));
    id.version = 0;
    let json = serde_json::to_string(&id).unwrap();
    assert!(RealmId::parse_untrusted(&json).is_err());
}

#[test]
fn parse_untrusted_rejects_empty_file() {
    let mut id = RealmId::generate("src/App.tsx", "App", "App/div[0]", span(1, 1));
    id.source_file.clear();
    let json = serde_json::to_string(&id).unwrap();
    assert!(RealmId::parse_untrusted(&json).is_err());
}

#[test]
fn parse_untrusted_rejects_malformed_json() {
    assert!(RealmId::parse_untrusted("{not json").is_err());
}

// ── spans ───────────────────────────────────────────────────────

#[test]
fn span_contains_is_inclusive_at_both_ends() {
    let s = SourceSpan::new(
        SourceLocation::new(3, 5, 40),
        SourceLocation::new(5, 10, 90),
    );
    assert!(s.contains(3, 5));
    assert!(s.contains(5, 10));
    assert!(s.contains(4, 1));
    assert!(!s.contains(3, 4));
    assert!(!s.contains(5, 11));
    assert!(!s.contains(2, 99));
    assert!(!s.contains(6, 1));
}
