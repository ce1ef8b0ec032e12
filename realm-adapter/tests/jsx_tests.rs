//! Tests for jsx.rs — parsing, identity, mutation, and codegen.

use pretty_assertions::assert_eq;
use realm_adapter::{Adapter, JsxAdapter};
use realm_types::{RealmId, StructureEdit};

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

fn parse_app() -> (JsxAdapter, realm_adapter::ElementTree) {
    let adapter = JsxAdapter::new();
    let tree = adapter.parse("src/App.tsx", APP).unwrap();
    (adapter, tree)
}

fn id_for(adapter: &JsxAdapter, tree: &realm_adapter::ElementTree, ast_path: &str) -> RealmId {
    adapter
        .find_all_elements(tree)
        .into_iter()
        .map(|p| p.info.realm_id)
        .find(|id| id.ast_path == ast_path)
        .unwrap_or_else(|| panic!("no element at {ast_path}"))
}

// ── detection ───────────────────────────────────────────────────

#[test]
fn detects_by_extension_and_content() {
    let adapter = JsxAdapter::new();
    assert!(adapter.detect("src/App.tsx", ""));
    assert!(adapter.detect("src/App.jsx", ""));
    assert!(adapter.detect("src/app.js", "return <div />;"));
    assert!(!adapter.detect("src/util.js", "const x = 1 < 2;"));
    assert!(!adapter.detect("style.css", ".card { color: red }"));
}

// ── parsing ─────────────────────────────────────────────────────

#[test]
fn parses_all_elements_with_structural_paths() {
    let (adapter, tree) = parse_app();
    let elements = adapter.find_all_elements(&tree);
    let paths: Vec<&str> = elements
        .iter()
        .map(|p| p.info.realm_id.ast_path.as_str())
        .collect();
    assert_eq!(
        paths,
        vec!["App/div[0]", "App/div[0]/h1[0]", "App/div[0]/button[0]"]
    );
}

#[test]
fn tracks_enclosing_component() {
    let (adapter, tree) = parse_app();
    for parsed in adapter.find_all_elements(&tree) {
        assert_eq!(parsed.info.realm_id.component_name, "App");
    }
}

#[test]
fn records_source_positions() {
    let (adapter, tree) = parse_app();
    let root = id_for(&adapter, &tree, "App/div[0]");
    assert_eq!(root.span.start.line, 5);
    assert_eq!(root.span.start.column, 5);
}

#[test]
fn parses_styles_classes_and_text() {
    let (adapter, tree) = parse_app();
    let elements = adapter.find_all_elements(&tree);

    let div = &elements[0].info;
    assert_eq!(div.styles.get("color"), Some(&"red".to_string()));
    assert_eq!(div.classes(), vec!["card"]);

    let h1 = &elements[1].info;
    assert_eq!(h1.text_content.as_deref(), Some("Title"));

    let button = &elements[2].info;
    assert_eq!(button.text_content.as_deref(), Some("Save"));
    assert!(button.attributes.contains_key("onClick"));
}

#[test]
fn links_parents_and_children() {
    let (adapter, tree) = parse_app();
    let elements = adapter.find_all_elements(&tree);
    let div_hash = elements[0].info.realm_id.hash.clone();

    assert_eq!(elements[0].info.children.len(), 2);
    assert_eq!(elements[1].info.parent_id.as_deref(), Some(div_hash.as_str()));
    assert_eq!(elements[2].info.parent_id.as_deref(), Some(div_hash.as_str()));
}

#[test]
fn parse_element_locates_by_recorded_start() {
    let (adapter, tree) = parse_app();
    let id = id_for(&adapter, &tree, "App/div[0]/button[0]");
    let found = adapter.parse_element(&tree, &id).unwrap();
    assert_eq!(found.info.realm_id.hash, id.hash);

    let mut moved = id.clone();
    moved.span.start.line += 40;
    assert!(adapter.parse_element(&tree, &moved).is_none());
}

#[test]
fn ids_survive_unrelated_edits() {
    let adapter = JsxAdapter::new();
    let tree = adapter.parse("src/App.tsx", APP).unwrap();
    let before = id_for(&adapter, &tree, "App/div[0]/button[0]");

    // Change the h1's text: same length, same structure.
    let edited = APP.replace("Title", "Libel");
    let tree2 = adapter.parse("src/App.tsx", &edited).unwrap();
    let after = id_for(&adapter, &tree2, "App/div[0]/button[0]");

    assert_eq!(before.hash, after.hash);
}

#[test]
fn broken_root_is_skipped_not_fatal() {
    let adapter = JsxAdapter::new();
    // Unclosed element inside an expression context.
    let tree = adapter.parse("src/Broken.tsx", "const X = <div>").unwrap();
    assert_eq!(tree.element_count(), 0);
}

// ── mutation ────────────────────────────────────────────────────

#[test]
fn apply_styles_rewrites_only_the_open_tag() {
    let (adapter, tree) = parse_app();
    let id = id_for(&adapter, &tree, "App/div[0]");
    let mutated = adapter
        .apply_styles(&tree, &id, "background-color", Some("#ff0000"))
        .unwrap();
    let output = adapter.generate_code(&mutated, APP).unwrap();

    assert!(output
        .contains("<div className=\"card\" style={{ backgroundColor: '#ff0000', color: 'red' }}>"));
    // Everything outside the div's opening tag is untouched.
    assert!(output.contains("<h1>Title</h1>"));
    assert!(output.contains("onClick={() => save()}"));
    assert!(output.starts_with("import React from 'react';"));
}

#[test]
fn apply_styles_does_not_mutate_input_tree() {
    let (adapter, tree) = parse_app();
    let id = id_for(&adapter, &tree, "App/div[0]");
    let snapshot = tree.clone();
    let _ = adapter
        .apply_styles(&tree, &id, "color", Some("blue"))
        .unwrap();
    assert_eq!(tree, snapshot);
}

#[test]
fn removing_last_style_drops_the_attribute() {
    let (adapter, tree) = parse_app();
    let id = id_for(&adapter, &tree, "App/div[0]");
    let mutated = adapter.apply_styles(&tree, &id, "color", None).unwrap();
    let output = adapter.generate_code(&mutated, APP).unwrap();
    assert!(output.contains("<div className=\"card\">"));
    assert!(!output.contains("style="));
}

#[test]
fn class_add_is_idempotent() {
    let (adapter, tree) = parse_app();
    let id = id_for(&adapter, &tree, "App/div[0]");
    let mutated = adapter
        .apply_classes(&tree, &id, &["card".to_string()], &[])
        .unwrap();
    let output = adapter.generate_code(&mutated, APP).unwrap();
    // The class set is unchanged, so the regenerated file is identical.
    assert_eq!(output, APP);
}

#[test]
fn classes_add_and_remove() {
    let (adapter, tree) = parse_app();
    let id = id_for(&adapter, &tree, "App/div[0]/button[0]");
    let mutated = adapter
        .apply_classes(
            &tree,
            &id,
            &["primary".to_string()],
            &["btn".to_string()],
        )
        .unwrap();
    let output = adapter.generate_code(&mutated, APP).unwrap();
    assert!(output.contains("<button className=\"primary\" onClick={() => save()}>"));
}

#[test]
fn apply_text_replaces_inner_content() {
    let (adapter, tree) = parse_app();
    let id = id_for(&adapter, &tree, "App/div[0]/h1[0]");
    let mutated = adapter.apply_text(&tree, &id, "Dashboard").unwrap();
    let output = adapter.generate_code(&mutated, APP).unwrap();
    assert!(output.contains("<h1>Dashboard</h1>"));
    assert!(!output.contains("Title"));
}

#[test]
fn apply_attribute_sets_and_clears() {
    let (adapter, tree) = parse_app();
    let id = id_for(&adapter, &tree, "App/div[0]/button[0]");

    let with_attr = adapter
        .apply_attribute(&tree, &id, "disabled", Some("true"))
        .unwrap();
    let output = adapter.generate_code(&with_attr, APP).unwrap();
    assert!(output.contains("disabled=\"true\""));

    let without = adapter
        .apply_attribute(&tree, &id, "onClick", None)
        .unwrap();
    let output = adapter.generate_code(&without, APP).unwrap();
    assert!(!output.contains("onClick"));
}

#[test]
fn structure_remove_child() {
    let (adapter, tree) = parse_app();
    let id = id_for(&adapter, &tree, "App/div[0]");
    let mutated = adapter
        .apply_structure(&tree, &id, &StructureEdit::RemoveChild { index: 0 })
        .unwrap();
    let output = adapter.generate_code(&mutated, APP).unwrap();
    assert!(!output.contains("<h1>"));
    assert!(output.contains("<button"));
}

#[test]
fn mutating_a_missing_element_fails() {
    let (adapter, tree) = parse_app();
    let mut id = id_for(&adapter, &tree, "App/div[0]");
    id.span.start.line = 99;
    assert!(adapter.apply_styles(&tree, &id, "color", Some("red")).is_err());
}

#[test]
fn apply_text_on_self_closing_fails() {
    let adapter = JsxAdapter::new();
    let src = "const X = <input name=\"q\" />;\n";
    let tree = adapter.parse("src/X.tsx", src).unwrap();
    let id = adapter.find_all_elements(&tree)[0].info.realm_id.clone();
    assert!(adapter.apply_text(&tree, &id, "nope").is_err());
}

// ── codegen on nested mutation ──────────────────────────────────

#[test]
fn nested_mutation_preserves_outer_formatting() {
    let (adapter, tree) = parse_app();
    let button = id_for(&adapter, &tree, "App/div[0]/button[0]");
    let mutated = adapter
        .apply_styles(&tree, &button, "color", Some("white"))
        .unwrap();
    let output = adapter.generate_code(&mutated, APP).unwrap();

    assert!(output.contains(
        "<button className=\"btn\" onClick={() => save()} style={{ color: 'white' }}>"
    ));
    // The outer div's opening tag is untouched.
    assert!(output.contains("<div className=\"card\" style={{ color: 'red' }}>"));
}
