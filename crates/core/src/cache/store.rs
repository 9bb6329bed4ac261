//! In-memory result store with TTL expiry.
//!
//! Entries expire lazily: an expired entry stays in memory until a lookup for
//! its exact key removes it (or capacity pressure forces a purge). There is no
//! timer-driven sweep.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use super::Fingerprint;
use crate::AppConfig;

/// Default time-to-live for cached results.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A cached result together with its creation time.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: Fingerprint,
    pub payload: V,
    /// Monotonic creation time; TTL is measured from here.
    pub created_at: Instant,
    /// Wall-clock creation time, for display.
    pub stored_at: DateTime<Utc>,
    last_access: Instant,
}

impl<V> CacheEntry<V> {
    fn new(key: Fingerprint, payload: V) -> Self {
        let now = Instant::now();
        Self { key, payload, created_at: now, stored_at: Utc::now(), last_access: now }
    }

    /// Time elapsed since the entry was stored.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.created_at)
    }

    /// Valid while `now - created_at <= ttl`.
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) > ttl
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheStats {
    /// Entries physically present, including expired ones not yet looked up.
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because they were past their TTL.
    pub expired_evictions: u64,
    /// Entries dropped to stay under `max_entries`.
    pub capacity_evictions: u64,
    pub ttl_secs: u64,
    pub max_entries: Option<usize>,
}

struct Inner<V> {
    entries: HashMap<Fingerprint, CacheEntry<V>>,
    stats: CacheStats,
}

/// Process-wide result cache keyed by content fingerprint.
///
/// Construct once at startup and share it behind an `Arc`.
pub struct ResultCache<V> {
    ttl: Duration,
    max_entries: Option<usize>,
    inner: RwLock<Inner<V>>,
}

impl<V> std::fmt::Debug for ResultCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

impl<V: Clone> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V: Clone> ResultCache<V> {
    /// Create an unbounded cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            max_entries: None,
            inner: RwLock::new(Inner { entries: HashMap::new(), stats: CacheStats::default() }),
        }
    }

    /// Bound the number of entries; least recently accessed entries go first.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries.max(1));
        self
    }

    /// Build a cache from `cache_ttl_secs` and `cache_max_entries`.
    pub fn from_config(config: &AppConfig) -> Self {
        let cache = Self::new(config.cache_ttl());
        match config.cache_max_entries {
            Some(max) => cache.with_max_entries(max),
            None => cache,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// Look up a live entry.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get(&self, key: &Fingerprint) -> Option<CacheEntry<V>> {
        let now = Instant::now();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let expired = inner.entries.get(key).map(|e| e.is_expired(now, self.ttl));
        match expired {
            Some(true) => {
                debug!(key = %key.short(), "cache entry expired, removing");
                inner.entries.remove(key);
                inner.stats.expired_evictions += 1;
                inner.stats.misses += 1;
                None
            }
            Some(false) => {
                inner.stats.hits += 1;
                let entry = inner.entries.get_mut(key)?;
                entry.last_access = now;
                Some(entry.clone())
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Insert or overwrite the entry for `key` with a fresh creation time.
    pub fn put(&self, key: Fingerprint, payload: V) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(max) = self.max_entries
            && !inner.entries.contains_key(&key)
            && inner.entries.len() >= max
        {
            self.make_room(&mut inner, max);
        }

        debug!(key = %key.short(), "caching result");
        inner.entries.insert(key.clone(), CacheEntry::new(key, payload));
    }

    /// Drop every expired entry still held in memory.
    ///
    /// Returns the number of removed entries.
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        self.drop_expired(&mut inner, Instant::now())
    }

    /// Number of entries physically present, expired or not.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            entries: inner.entries.len(),
            ttl_secs: self.ttl.as_secs(),
            max_entries: self.max_entries,
            ..inner.stats.clone()
        }
    }

    fn drop_expired(&self, inner: &mut Inner<V>, now: Instant) -> usize {
        let before = inner.entries.len();
        inner.entries.retain(|_, e| !e.is_expired(now, self.ttl));
        let removed = before - inner.entries.len();
        inner.stats.expired_evictions += removed as u64;
        removed
    }

    fn make_room(&self, inner: &mut Inner<V>, max: usize) {
        self.drop_expired(inner, Instant::now());

        while inner.entries.len() >= max {
            let Some(lru_key) = inner
                .entries
                .values()
                .min_by_key(|e| e.last_access)
                .map(|e| e.key.clone())
            else {
                break;
            };
            debug!(key = %lru_key.short(), "evicting least recently used entry");
            inner.entries.remove(&lru_key);
            inner.stats.capacity_evictions += 1;
        }
    }
}
