//! Source mutation operations.
//!
//! An [`Operation`] is one edit inside a transaction. The payload is a
//! closed sum so every dispatch site is an exhaustive `match` — adding an
//! operation kind is a compile-time-checked change everywhere it is
//! handled.

use crate::{OperationId, RealmId};
use serde::{Deserialize, Serialize};

/// The payload of an operation, discriminated by kind.
///
/// Each variant carries the before value so a committed operation can be
/// inverted without consulting the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OperationPayload {
    /// Set (or clear) one inline style property.
    Style {
        property: String,
        /// `None` removes the property.
        value: Option<String>,
        #[serde(default)]
        before: Option<String>,
    },

    /// Replace the element's text content.
    Text {
        text: String,
        #[serde(default)]
        before: Option<String>,
    },

    /// Add and/or remove classes. Adding an already-present class is a
    /// no-op — the class set never holds duplicates.
    Class {
        #[serde(default)]
        add: Vec<String>,
        #[serde(default)]
        remove: Vec<String>,
        #[serde(default)]
        before: Vec<String>,
    },

    /// Set (or clear) an arbitrary attribute.
    Attribute {
        name: String,
        /// `None` removes the attribute.
        value: Option<String>,
        #[serde(default)]
        before: Option<String>,
    },

    /// Structural change to the element's children.
    Structure { edit: StructureEdit },
}

impl OperationPayload {
    /// Short kind name, used in logs and change history summaries.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Style { .. } => "style",
            Self::Text { .. } => "text",
            Self::Class { .. } => "class",
            Self::Attribute { .. } => "attribute",
            Self::Structure { .. } => "structure",
        }
    }
}

/// A structural edit to an element's children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StructureEdit {
    /// Remove the child at `index`.
    RemoveChild { index: usize },
    /// Move the child at `from` to `to`.
    MoveChild { from: usize, to: usize },
}

/// One edit targeting a single element inside a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Unique identifier for this operation.
    pub id: OperationId,
    /// The element this operation applies to.
    pub target: RealmId,
    /// What to change.
    pub payload: OperationPayload,
}

impl Operation {
    /// Creates a new operation.
    #[must_use]
    pub fn new(target: RealmId, payload: OperationPayload) -> Self {
        Self {
            id: OperationId::new(),
            target,
            payload,
        }
    }

    /// Creates a style-set operation.
    #[must_use]
    pub fn set_style(
        target: RealmId,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(
            target,
            OperationPayload::Style {
                property: property.into(),
                value: Some(value.into()),
                before: None,
            },
        )
    }

    /// Creates a style-remove operation.
    #[must_use]
    pub fn remove_style(target: RealmId, property: impl Into<String>) -> Self {
        Self::new(
            target,
            OperationPayload::Style {
                property: property.into(),
                value: None,
                before: None,
            },
        )
    }

    /// Creates a text-replace operation.
    #[must_use]
    pub fn set_text(target: RealmId, text: impl Into<String>) -> Self {
        Self::new(
            target,
            OperationPayload::Text {
                text: text.into(),
                before: None,
            },
        )
    }

    /// Creates a class add/remove operation.
    #[must_use]
    pub fn edit_classes(target: RealmId, add: Vec<String>, remove: Vec<String>) -> Self {
        Self::new(
            target,
            OperationPayload::Class {
                add,
                remove,
                before: Vec::new(),
            },
        )
    }

    /// Creates an attribute-set operation.
    #[must_use]
    pub fn set_attribute(
        target: RealmId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(
            target,
            OperationPayload::Attribute {
                name: name.into(),
                value: Some(value.into()),
                before: None,
            },
        )
    }
}
