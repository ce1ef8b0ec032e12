//! Tests for event.rs — the RealmEvent envelope and wire form.

use pretty_assertions::assert_eq;
use realm_types::{
    EventPayload, EventSource, Operation, RealmEvent, RealmId, SourceLocation, SourceSpan,
};

fn sample_id() -> RealmId {
    RealmId::generate(
        "src/App.tsx",
        "App",
        "App/div[0]",
        SourceSpan::new(
            SourceLocation::new(3, 5, 40),
            SourceLocation::new(3, 40, 75),
        ),
    )
}

#[test]
fn events_get_unique_ids() {
    let a = RealmEvent::element_selected(EventSource::Dom, sample_id());
    let b = RealmEvent::element_selected(EventSource::Dom, sample_id());
    assert_ne!(a.id, b.id);
}

#[test]
fn wire_round_trip_is_lossless() {
    let event = RealmEvent::commit_request(
        EventSource::Panel,
        sample_id(),
        vec![
            Operation::set_style(sample_id(), "background-color", "#ff0000"),
            Operation::edit_classes(sample_id(), vec!["active".into()], vec![]),
        ],
    );
    let wire = event.to_wire().unwrap();
    let back = RealmEvent::from_wire(&wire).unwrap();
    assert_eq!(back, event);
}

#[test]
fn preview_flag_is_detected() {
    let preview = RealmEvent::style_preview(
        EventSource::Panel,
        sample_id(),
        "color",
        Some("#333".into()),
    );
    assert!(preview.is_preview());

    let committed = RealmEvent::new(
        EventSource::Panel,
        EventPayload::StyleChanged {
            realm_id: sample_id(),
            property: "color".into(),
            value: Some("#333".into()),
            preview: false,
        },
    );
    assert!(!committed.is_preview());
}

#[test]
fn commit_request_is_not_preview() {
    let event = RealmEvent::commit_request(EventSource::Dom, sample_id(), vec![]);
    assert!(!event.is_preview());
}

#[test]
fn source_serializes_kebab_case() {
    let event = RealmEvent::file_changed("src/App.tsx");
    let wire = event.to_wire().unwrap();
    assert!(wire.contains("\"file-watcher\""));
}

#[test]
fn conflict_event_carries_both_versions() {
    let event = RealmEvent::conflict(sample_id(), 4, 2);
    match event.payload {
        EventPayload::ConflictDetected {
            local_version,
            remote_version,
            ..
        } => {
            assert_eq!(local_version, 4);
            assert_eq!(remote_version, 2);
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}
