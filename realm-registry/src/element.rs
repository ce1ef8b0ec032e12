//! Element metadata stored in the registry.

use realm_types::RealmId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Framework-level facts about an element, supplied by the adapter that
/// discovered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkMeta {
    /// Adapter/framework name, e.g. `"jsx"`.
    pub framework: String,
    /// Style system in use, e.g. `"inline"`, `"tailwind"`.
    pub style_system: String,
    /// Whether the tag refers to a user-defined component rather than an
    /// intrinsic element.
    pub is_component: bool,
}

/// Everything the registry knows about one element.
///
/// Created when an adapter discovers the node; replaced wholesale on
/// every re-registration (file change, committed transaction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub realm_id: RealmId,
    pub tag_name: String,
    /// Attribute name → value. BTreeMap keeps serialized forms stable.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Inline style property → value.
    #[serde(default)]
    pub styles: BTreeMap<String, String>,
    #[serde(default)]
    pub text_content: Option<String>,
    /// Identity hashes of child elements, in document order.
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub framework: FrameworkMeta,
}

impl ElementInfo {
    /// Creates a bare element record with no attributes or relations.
    #[must_use]
    pub fn new(realm_id: RealmId, tag_name: impl Into<String>, framework: FrameworkMeta) -> Self {
        Self {
            realm_id,
            tag_name: tag_name.into(),
            attributes: BTreeMap::new(),
            styles: BTreeMap::new(),
            text_content: None,
            children: Vec::new(),
            parent_id: None,
            framework,
        }
    }

    /// The element's classes, split from its `class`/`className`
    /// attribute.
    #[must_use]
    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("className")
            .or_else(|| self.attributes.get("class"))
            .map(|v| v.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// The element's `id` attribute, if any.
    #[must_use]
    pub fn dom_id(&self) -> Option<&str> {
        self.attributes.get("id").map(String::as_str)
    }
}
