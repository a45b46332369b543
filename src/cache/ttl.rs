//! Generic TTL key/value store.
//!
//! Entries carry an optional expiry instant. Reads take the shared lock;
//! writes and the periodic sweep take the exclusive lock. Lock hold times
//! are bounded by a single map operation, never I/O.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tokio::task::JoinHandle;
use tracing::debug;

use super::lock::recover_poisoned;

pub(crate) const METRIC_CACHE_EXPIRED_TOTAL: &str = "statline_cache_expired_total";
pub(crate) const METRIC_CACHE_SWEPT_TOTAL: &str = "statline_cache_swept_total";
pub(crate) const METRIC_CACHE_SWEEP_MS: &str = "statline_cache_sweep_ms";

struct CacheEntry<V> {
    value: V,
    /// `None` means the entry never expires and lives until deleted.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-wide TTL cache keyed by string.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone + Send + Sync + 'static> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a key. An entry whose expiry has passed but which the sweep
    /// has not yet collected reports a miss; its removal is scheduled on a
    /// detached task so the caller is never blocked on the write lock.
    pub fn get(self: &Arc<Self>, key: &str) -> Option<V> {
        let guard = recover_poisoned(self.entries.read(), "ttl.get");
        match guard.get(key) {
            None => None,
            Some(entry) if entry.is_expired(Instant::now()) => {
                drop(guard);
                counter!(METRIC_CACHE_EXPIRED_TOTAL).increment(1);
                self.schedule_removal(key.to_string());
                None
            }
            Some(entry) => Some(entry.value.clone()),
        }
    }

    /// Insert or overwrite a key. `Duration::ZERO` means never expire.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        let mut guard = recover_poisoned(self.entries.write(), "ttl.set");
        guard.insert(key.into(), CacheEntry { value, expires_at });
    }

    pub fn delete(&self, key: &str) -> bool {
        let mut guard = recover_poisoned(self.entries.write(), "ttl.delete");
        guard.remove(key).is_some()
    }

    /// Remove every key that begins with `prefix`. Returns how many entries
    /// were dropped. Used for resource-level invalidation, where one dataset
    /// fans out into many filter-scoped base keys.
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        let mut guard = recover_poisoned(self.entries.write(), "ttl.delete_prefix");
        let before = guard.len();
        guard.retain(|key, _| !key.starts_with(prefix));
        before - guard.len()
    }

    /// Number of live entries, expired-but-unswept included.
    pub fn len(&self) -> usize {
        recover_poisoned(self.entries.read(), "ttl.len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all expired entries under one exclusive lock acquisition.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = recover_poisoned(self.entries.write(), "ttl.sweep");
        let before = guard.len();
        guard.retain(|_, entry| !entry.is_expired(now));
        let removed = before - guard.len();
        if removed > 0 {
            counter!(METRIC_CACHE_SWEPT_TOTAL).increment(removed as u64);
        }
        removed
    }

    /// Spawn the periodic sweep task. Called at most once per cache; the
    /// single task guarantees sweeps never run concurrently with themselves.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // consume the immediate first tick
            loop {
                ticker.tick().await;
                let started_at = Instant::now();
                let removed = cache.sweep_expired();
                histogram!(METRIC_CACHE_SWEEP_MS)
                    .record(started_at.elapsed().as_secs_f64() * 1000.0);
                debug!(removed, "cache sweep completed");
            }
        })
    }

    fn schedule_removal(self: &Arc<Self>, key: String) {
        let cache = Arc::clone(self);
        // Outside a runtime (plain unit tests) the removal happens inline.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    cache.delete(&key);
                });
            }
            Err(_) => {
                cache.delete(&key);
            }
        }
    }
}
