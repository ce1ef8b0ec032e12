//! The element registry proper.

use crate::{ElementInfo, Selector};
use realm_types::RealmId;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// A change notification from the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryChange {
    /// A new element was registered.
    Registered(ElementInfo),
    /// An existing element was re-registered with new metadata.
    Updated(ElementInfo),
    /// An element was removed.
    Unregistered(ElementInfo),
}

/// A registry change listener.
pub type RegistryListener = Arc<dyn Fn(&RegistryChange) + Send + Sync>;

/// Single source of truth mapping identity hashes to element metadata.
///
/// Holds a primary map plus two secondary indices (by file, by
/// component). The index vectors preserve registration order, which makes
/// position lookups deterministic: when spans overlap, the first
/// registered element wins.
#[derive(Default)]
pub struct ElementRegistry {
    elements: HashMap<String, ElementInfo>,
    by_file: HashMap<String, Vec<String>>,
    by_component: HashMap<String, Vec<String>>,
    listeners: Vec<(usize, RegistryListener)>,
    next_listener_id: usize,
}

impl ElementRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── CRUD ────────────────────────────────────────────────────

    /// Registers (or re-registers) an element. Returns true if the
    /// element was new.
    pub fn register(&mut self, info: ElementInfo) -> bool {
        let hash = info.realm_id.hash.clone();
        let file = info.realm_id.source_file.clone();
        let component = info.realm_id.component_name.clone();

        let was_new = !self.elements.contains_key(&hash);
        self.elements.insert(hash.clone(), info.clone());

        let file_index = self.by_file.entry(file).or_default();
        if !file_index.contains(&hash) {
            file_index.push(hash.clone());
        }
        let component_index = self.by_component.entry(component).or_default();
        if !component_index.contains(&hash) {
            component_index.push(hash.clone());
        }

        debug!(hash = %hash, new = was_new, "element registered");
        let change = if was_new {
            RegistryChange::Registered(info)
        } else {
            RegistryChange::Updated(info)
        };
        self.notify(&change);
        was_new
    }

    /// Removes an element. Safe no-op if absent; returns true if removed.
    pub fn unregister(&mut self, hash: &str) -> bool {
        let Some(info) = self.elements.remove(hash) else {
            return false;
        };
        if let Some(index) = self.by_file.get_mut(&info.realm_id.source_file) {
            index.retain(|h| h != hash);
            if index.is_empty() {
                self.by_file.remove(&info.realm_id.source_file);
            }
        }
        if let Some(index) = self.by_component.get_mut(&info.realm_id.component_name) {
            index.retain(|h| h != hash);
            if index.is_empty() {
                self.by_component.remove(&info.realm_id.component_name);
            }
        }
        self.notify(&RegistryChange::Unregistered(info));
        true
    }

    /// Looks up an element by identity hash.
    #[must_use]
    pub fn get(&self, hash: &str) -> Option<&ElementInfo> {
        self.elements.get(hash)
    }

    /// The registry's current [`RealmId`] (and so version) for a hash.
    #[must_use]
    pub fn current_id(&self, hash: &str) -> Option<&RealmId> {
        self.elements.get(hash).map(|e| &e.realm_id)
    }

    /// Number of registered elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    // ── Indexed lookups ─────────────────────────────────────────

    /// All elements in a file, in registration order.
    #[must_use]
    pub fn find_by_file(&self, file: &str) -> Vec<&ElementInfo> {
        self.by_file
            .get(file)
            .map(|hashes| {
                hashes
                    .iter()
                    .filter_map(|h| self.elements.get(h))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All elements inside a named component, in registration order.
    #[must_use]
    pub fn find_by_component(&self, component: &str) -> Vec<&ElementInfo> {
        self.by_component
            .get(component)
            .map(|hashes| {
                hashes
                    .iter()
                    .filter_map(|h| self.elements.get(h))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First registered element in `file` whose span contains the point.
    /// Both span ends are inclusive.
    #[must_use]
    pub fn find_by_position(&self, file: &str, line: u32, column: u32) -> Option<&ElementInfo> {
        self.by_file.get(file).and_then(|hashes| {
            hashes
                .iter()
                .filter_map(|h| self.elements.get(h))
                .find(|e| e.realm_id.span.contains(line, column))
        })
    }

    /// Best-effort selector lookup over tag/id/class, optionally scoped
    /// to one file. See [`Selector::matches`] for the matching rules.
    #[must_use]
    pub fn find_by_selector(&self, selector: &str, file: Option<&str>) -> Vec<&ElementInfo> {
        let selector = Selector::parse(selector);
        match file {
            Some(file) => self
                .find_by_file(file)
                .into_iter()
                .filter(|e| selector.matches(e))
                .collect(),
            None => {
                // Scan files in by_file insertion order is not defined for
                // HashMap; order within a file still follows registration.
                let mut out: Vec<&ElementInfo> = Vec::new();
                for hashes in self.by_file.values() {
                    out.extend(
                        hashes
                            .iter()
                            .filter_map(|h| self.elements.get(h))
                            .filter(|e| selector.matches(e)),
                    );
                }
                out
            }
        }
    }

    /// Removes every element belonging to a file, cleaning all indices.
    /// Returns the number of elements removed.
    pub fn clear_file(&mut self, file: &str) -> usize {
        let hashes = self.by_file.remove(file).unwrap_or_default();
        let mut removed = 0;
        for hash in hashes {
            if let Some(info) = self.elements.remove(&hash) {
                if let Some(index) = self.by_component.get_mut(&info.realm_id.component_name) {
                    index.retain(|h| h != &hash);
                    if index.is_empty() {
                        self.by_component.remove(&info.realm_id.component_name);
                    }
                }
                self.notify(&RegistryChange::Unregistered(info));
                removed += 1;
            }
        }
        debug!(file, removed, "cleared file from registry");
        removed
    }

    // ── Listeners ───────────────────────────────────────────────

    /// Adds a change listener. Returns a token for [`remove_listener`].
    ///
    /// [`remove_listener`]: Self::remove_listener
    pub fn add_listener(&mut self, listener: RegistryListener) -> usize {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Removes a listener by token. No-op for unknown tokens.
    pub fn remove_listener(&mut self, token: usize) {
        self.listeners.retain(|(id, _)| *id != token);
    }

    /// Dispatches a change to every listener. A panicking listener is
    /// logged and skipped; the rest still run.
    fn notify(&self, change: &RegistryChange) {
        for (id, listener) in &self.listeners {
            let listener = Arc::clone(listener);
            if catch_unwind(AssertUnwindSafe(|| listener(change))).is_err() {
                warn!(listener = id, "registry listener panicked");
            }
        }
    }
}
