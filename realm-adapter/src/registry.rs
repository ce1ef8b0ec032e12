//! Adapter registry with cached detection.

use crate::Adapter;
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Default capacity of the per-file detection cache.
const DETECTION_CACHE_CAP: usize = 256;

/// Bounded LRU over file path → adapter name (`None` = no adapter
/// matched). Recency is tracked in a queue; lookups refresh position,
/// inserts evict the least recently used entry past capacity.
struct DetectionCache {
    entries: HashMap<String, Option<String>>,
    recency: VecDeque<String>,
    cap: usize,
}

impl DetectionCache {
    fn new(cap: usize) -> Self {
        Self {
            entries: HashMap::new(),
            recency: VecDeque::new(),
            cap,
        }
    }

    fn get(&mut self, path: &str) -> Option<Option<String>> {
        let hit = self.entries.get(path).cloned()?;
        self.touch(path);
        Some(hit)
    }

    fn insert(&mut self, path: String, value: Option<String>) {
        if self.entries.insert(path.clone(), value).is_none() {
            self.recency.push_back(path);
        } else {
            self.touch(&path);
        }
        while self.entries.len() > self.cap {
            if let Some(oldest) = self.recency.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    fn touch(&mut self, path: &str) {
        if let Some(idx) = self.recency.iter().position(|p| p == path) {
            let key = self.recency.remove(idx).unwrap_or_else(|| path.to_string());
            self.recency.push_back(key);
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}

/// Priority-ordered adapter registry with detection caching.
///
/// Registering or unregistering an adapter invalidates the cache, since
/// either can change which adapter wins a file.
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn Adapter>>,
    cache: Mutex<DetectionCache>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cache_capacity(DETECTION_CACHE_CAP)
    }

    /// Creates a registry with a custom detection cache capacity.
    #[must_use]
    pub fn with_cache_capacity(cap: usize) -> Self {
        Self {
            adapters: Vec::new(),
            cache: Mutex::new(DetectionCache::new(cap)),
        }
    }

    /// Registers an adapter, keeping the list sorted by priority
    /// descending. Replaces any adapter with the same name.
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) {
        self.adapters.retain(|a| a.name() != adapter.name());
        self.adapters.push(adapter);
        self.adapters.sort_by_key(|a| std::cmp::Reverse(a.priority()));
        self.invalidate();
    }

    /// Removes an adapter by name. Returns true if one was removed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.adapters.len();
        self.adapters.retain(|a| a.name() != name);
        let removed = self.adapters.len() != before;
        if removed {
            self.invalidate();
        }
        removed
    }

    /// Looks up an adapter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.iter().find(|a| a.name() == name).cloned()
    }

    /// Registered adapters in priority order.
    #[must_use]
    pub fn adapters(&self) -> &[Arc<dyn Adapter>] {
        &self.adapters
    }

    /// Finds the adapter for a file, trying adapters in priority order.
    ///
    /// `None` is a first-class outcome: no adapter claims the file, and
    /// callers must surface that rather than paper over it. Both hits and
    /// misses are cached per path until the adapter set changes. A
    /// panicking `detect` is logged and skipped.
    #[must_use]
    pub fn detect(&self, file_path: &str, content: &str) -> Option<Arc<dyn Adapter>> {
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(cached) = cache.get(file_path) {
                debug!(file = file_path, "detection cache hit");
                return cached.and_then(|name| self.get(&name));
            }
        }

        let mut winner: Option<Arc<dyn Adapter>> = None;
        for adapter in &self.adapters {
            let claimed = catch_unwind(AssertUnwindSafe(|| adapter.detect(file_path, content)));
            match claimed {
                Ok(true) => {
                    winner = Some(Arc::clone(adapter));
                    break;
                }
                Ok(false) => {}
                Err(_) => {
                    warn!(adapter = adapter.name(), file = file_path, "detect panicked");
                }
            }
        }

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(
                file_path.to_string(),
                winner.as_ref().map(|a| a.name().to_string()),
            );
        }
        winner
    }

    /// Drops all cached detection results.
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}
