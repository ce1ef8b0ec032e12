//! Framework adapter layer for the REALM core.
//!
//! An [`Adapter`] is the pluggable per-framework strategy: it detects its
//! files, parses them into an [`ElementTree`], locates and enumerates
//! elements, applies mutations as immutable transforms, and regenerates
//! source with minimal diff noise. The [`AdapterRegistry`] picks the
//! right adapter for a file, caching detection results.
//!
//! The reference implementation is the [`JsxAdapter`] for JSX/TSX-like
//! markup.

mod adapter;
mod error;
mod jsx;
mod registry;
mod tree;

pub use adapter::{Adapter, ParsedElement};
pub use error::{AdapterError, AdapterResult};
pub use jsx::JsxAdapter;
pub use registry::AdapterRegistry;
pub use tree::{AttrValue, Attribute, ElementNode, ElementTree, Node, TextNode};
