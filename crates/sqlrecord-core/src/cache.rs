//! Result caching.
//!
//! Queries tagged with a cache key read through a [`Cache`]: on a hit the
//! stored rows are returned without touching the executor; on a miss the
//! executor runs and the raw result is written back. There is no explicit
//! invalidation and no stampede protection.

use crate::row::Row;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Payload stored for a cached query.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    /// All rows of a multi-row fetch.
    Rows(Vec<Row>),
    /// The first row of a single-row fetch (or none).
    Row(Option<Row>),
    /// The result of a count query.
    Count(u64),
}

impl CacheValue {
    pub fn is_rows(&self) -> bool {
        matches!(self, CacheValue::Rows(_))
    }

    pub fn is_count(&self) -> bool {
        matches!(self, CacheValue::Count(_))
    }
}

/// Key/value store used by cached queries.
pub trait Cache: Send + Sync {
    fn contains(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<CacheValue>;

    /// Store a value. A `ttl_seconds` of zero keeps it forever.
    fn set(&self, key: &str, value: CacheValue, ttl_seconds: u64);

    /// Remove a key; returns whether it was present.
    fn delete(&self, key: &str) -> bool;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CacheValue,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-process cache backed by a `HashMap`.
///
/// Expired entries are treated as absent and dropped lazily on access.
#[derive(Debug, Default)]
pub struct ArrayCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ArrayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including any that have expired but not yet been dropped.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    fn live(&self, key: &str) -> Option<CacheValue> {
        let mut entries = self.entries.lock().ok()?;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                tracing::trace!(key, "Dropping expired cache entry");
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

impl Cache for ArrayCache {
    fn contains(&self, key: &str) -> bool {
        self.live(key).is_some()
    }

    fn get(&self, key: &str) -> Option<CacheValue> {
        self.live(key)
    }

    fn set(&self, key: &str, value: CacheValue, ttl_seconds: u64) {
        let expires_at = (ttl_seconds > 0)
            .then(|| Instant::now().checked_add(Duration::from_secs(ttl_seconds)))
            .flatten();
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), CacheEntry { value, expires_at });
        }
    }

    fn delete(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|mut e| e.remove(key).is_some())
            .unwrap_or(false)
    }
}
