//! Per-file mutual exclusion with TTL-based auto-expiry.
//!
//! Locks are cooperative: a holder that crashes simply stops renewing,
//! and its entry is cleared by the next acquirer once the TTL passes.
//! The lock table itself sits behind a real async mutex, so the
//! at-most-one-holder guarantee holds under a multi-threaded runtime,
//! not just cooperative scheduling.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// How long a lock lives without being released.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(60);

/// Default deadline for a blocking acquire.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval while waiting for a held lock.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One held lock.
#[derive(Debug, Clone)]
pub struct LockEntry {
    pub path: String,
    pub owner: String,
    pub acquired_at: Instant,
}

/// Per-file lock manager.
pub struct FileLockManager {
    locks: Mutex<HashMap<String, LockEntry>>,
    ttl: Duration,
    poll: Duration,
}

impl Default for FileLockManager {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TTL)
    }
}

impl FileLockManager {
    /// Creates a lock manager with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            ttl,
            poll: POLL_INTERVAL,
        }
    }

    /// Attempts to acquire the lock for `path`, polling until `timeout`
    /// elapses. Returns false on deadline. Re-entrant for the same
    /// owner. An expired entry is cleared and taken over.
    pub async fn acquire(&self, path: &str, owner: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut locks = self.locks.lock().await;
                match locks.get(path) {
                    Some(entry) if entry.owner == owner => return true,
                    Some(entry) if entry.acquired_at.elapsed() > self.ttl => {
                        warn!(path, stale_owner = %entry.owner, "clearing expired lock");
                        locks.insert(path.to_string(), Self::entry(path, owner));
                        return true;
                    }
                    Some(_) => {}
                    None => {
                        locks.insert(path.to_string(), Self::entry(path, owner));
                        debug!(path, owner, "lock acquired");
                        return true;
                    }
                }
            }
            if Instant::now() >= deadline {
                debug!(path, owner, "lock acquisition timed out");
                return false;
            }
            tokio::time::sleep(self.poll).await;
        }
    }

    /// Releases the lock if `owner` holds it. Returns true on release.
    pub async fn release(&self, path: &str, owner: &str) -> bool {
        let mut locks = self.locks.lock().await;
        match locks.get(path) {
            Some(entry) if entry.owner == owner => {
                locks.remove(path);
                debug!(path, owner, "lock released");
                true
            }
            _ => false,
        }
    }

    /// Removes the lock regardless of owner.
    pub async fn force_release(&self, path: &str) -> bool {
        self.locks.lock().await.remove(path).is_some()
    }

    /// Clears every lock.
    pub async fn release_all(&self) {
        self.locks.lock().await.clear();
    }

    /// Whether a non-expired lock exists for `path`.
    pub async fn is_locked(&self, path: &str) -> bool {
        self.locks
            .lock()
            .await
            .get(path)
            .is_some_and(|e| e.acquired_at.elapsed() <= self.ttl)
    }

    /// The current holder of `path`, if the lock is non-expired.
    pub async fn holder(&self, path: &str) -> Option<String> {
        self.locks
            .lock()
            .await
            .get(path)
            .filter(|e| e.acquired_at.elapsed() <= self.ttl)
            .map(|e| e.owner.clone())
    }

    /// Removes every expired lock and returns the evicted entries.
    pub async fn sweep_expired(&self) -> Vec<LockEntry> {
        let mut locks = self.locks.lock().await;
        let stale: Vec<String> = locks
            .iter()
            .filter(|(_, e)| e.acquired_at.elapsed() > self.ttl)
            .map(|(k, _)| k.clone())
            .collect();
        stale
            .into_iter()
            .filter_map(|k| {
                let entry = locks.remove(&k);
                if let Some(e) = &entry {
                    warn!(path = %e.path, owner = %e.owner, "swept expired lock");
                }
                entry
            })
            .collect()
    }

    fn entry(path: &str, owner: &str) -> LockEntry {
        LockEntry {
            path: path.to_string(),
            owner: owner.to_string(),
            acquired_at: Instant::now(),
        }
    }
}
