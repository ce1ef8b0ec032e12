//! Element registry for the REALM core.
//!
//! The registry is the single source of truth mapping identity hashes to
//! element metadata. It maintains secondary indices by file and by
//! component, dispatches change notifications to listeners, and answers
//! the two lookups surfaces need most: "what element is at this source
//! position" and "what element matches this selector".

mod element;
mod registry;
mod selector;

pub use element::{ElementInfo, FrameworkMeta};
pub use registry::{ElementRegistry, RegistryChange, RegistryListener};
pub use selector::Selector;
