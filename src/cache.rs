/// In-process TTL cache store
///
/// Reads never fail due to expiry: `get` returns whatever is stored and
/// `is_expired` is a separate query, so callers can serve stale data while a
/// background refresh runs. Entries are overwritten, never evicted - the key
/// space is a fixed small set of named caches, so the store carries no size
/// bound and nothing is proactively deleted.
use crate::logger::{log, LogTag};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

/// A single cached value with its freshness window
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Duration) -> Self {
        let fetched_at = Utc::now();
        let expires_at = fetched_at
            + ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::seconds(0));
        Self {
            value,
            fetched_at,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Age of the entry in whole seconds
    pub fn age_seconds(&self) -> i64 {
        (Utc::now() - self.fetched_at).num_seconds().max(0)
    }
}

/// Generic keyed TTL store, safe for concurrent access
#[derive(Debug)]
pub struct TtlCache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Get the cached value and its fetch time, regardless of expiry
    pub fn get(&self, key: &str) -> Option<(T, DateTime<Utc>)> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .map(|entry| (entry.value.clone(), entry.fetched_at))
    }

    /// Get the full entry (value + both timestamps)
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry<T>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    /// Whether the entry is past its TTL. Absent entries count as expired so
    /// callers can treat miss and stale with the same refresh decision.
    pub fn is_expired(&self, key: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).map(|e| e.is_expired()).unwrap_or(true)
    }

    /// Overwrite unconditionally and reset both timestamps. Last writer wins.
    pub fn set(&self, key: &str, value: T, ttl: Duration) {
        let entry = CacheEntry::new(value, ttl);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), entry);
        log(
            LogTag::Cache,
            "DEBUG",
            &format!("set '{}' (ttl {}s)", key, ttl.as_secs()),
        );
    }

    /// Explicit removal, used by sources that need invalidation on demand
    pub fn invalidate(&self, key: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key).is_some()
    }
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
