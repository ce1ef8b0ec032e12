//! The adapter contract.
//!
//! Any framework-specific collaborator implements [`Adapter`]; the
//! transaction manager consumes it through trait objects resolved by the
//! [`crate::AdapterRegistry`]. All mutating methods are immutable
//! transforms: they take the tree by reference and return a new tree,
//! never touching the input.

use crate::tree::ElementTree;
use crate::AdapterResult;
use realm_registry::ElementInfo;
use realm_types::{RealmId, StructureEdit};

/// An element discovered by an adapter scan, ready for registration.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedElement {
    /// Registry-ready metadata, including the freshly derived [`RealmId`].
    pub info: ElementInfo,
}

impl ParsedElement {
    /// The element's identity.
    #[must_use]
    pub fn realm_id(&self) -> &RealmId {
        &self.info.realm_id
    }
}

/// Framework-specific strategy: detect, parse, mutate, regenerate.
pub trait Adapter: Send + Sync {
    /// Unique adapter name, e.g. `"jsx"`.
    fn name(&self) -> &str;

    /// Detection priority. Higher is tried first.
    fn priority(&self) -> i32;

    /// Pure, side-effect-free heuristic: does this file belong to this
    /// adapter?
    fn detect(&self, file_path: &str, content: &str) -> bool;

    /// Parses a file into an element tree.
    fn parse(&self, file_path: &str, content: &str) -> AdapterResult<ElementTree>;

    /// Locates the element whose position matches the id's recorded
    /// start. `None` when the element has moved or vanished.
    fn parse_element(&self, tree: &ElementTree, id: &RealmId) -> Option<ParsedElement>;

    /// Full scan: every element in the tree with a fresh [`RealmId`],
    /// tracking the nearest enclosing named function as the component
    /// name.
    fn find_all_elements(&self, tree: &ElementTree) -> Vec<ParsedElement>;

    /// Sets (or clears, with `value: None`) one inline style property.
    fn apply_styles(
        &self,
        tree: &ElementTree,
        target: &RealmId,
        property: &str,
        value: Option<&str>,
    ) -> AdapterResult<ElementTree>;

    /// Replaces the element's text content.
    fn apply_text(&self, tree: &ElementTree, target: &RealmId, text: &str)
        -> AdapterResult<ElementTree>;

    /// Adds and removes classes. Adding an already-present class is a
    /// no-op.
    fn apply_classes(
        &self,
        tree: &ElementTree,
        target: &RealmId,
        add: &[String],
        remove: &[String],
    ) -> AdapterResult<ElementTree>;

    /// Sets (or clears) an arbitrary attribute.
    fn apply_attribute(
        &self,
        tree: &ElementTree,
        target: &RealmId,
        name: &str,
        value: Option<&str>,
    ) -> AdapterResult<ElementTree>;

    /// Applies a structural edit to the element's children.
    fn apply_structure(
        &self,
        tree: &ElementTree,
        target: &RealmId,
        edit: &StructureEdit,
    ) -> AdapterResult<ElementTree>;

    /// Re-serializes the tree, using the original text as the formatting
    /// baseline so untouched regions survive byte-for-byte.
    fn generate_code(&self, tree: &ElementTree, original: &str) -> AdapterResult<String>;
}
