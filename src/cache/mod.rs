// Bounded result cache
//
// Size- and age-bounded LRU keyed by trimmed prompt text. Used by the daemon
// to answer repeated prompts without another webhook round trip.

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// A cached value and the moment it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub timestamp: Instant,
}

/// Capacity and expiry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    pub ttl: Duration,
    pub max_entries: usize,
}

/// LRU cache with a hard entry limit and a per-entry time to live
///
/// An entry is live while `now - timestamp < ttl`. Reads move an entry to the
/// most-recently-used position but keep its timestamp; writes reset both.
/// Not synchronized: callers sharing it across tasks wrap it in a mutex.
pub struct BoundedCache<V, C: Clock = SystemClock> {
    entries: LruCache<String, CacheEntry<V>>,
    ttl: Duration,
    clock: C,
}

impl<V: Clone> BoundedCache<V, SystemClock> {
    pub fn new(options: CacheOptions) -> Self {
        Self::with_clock(options, SystemClock)
    }
}

impl<V: Clone, C: Clock> BoundedCache<V, C> {
    /// Create a cache reading time from `clock`
    ///
    /// A `max_entries` of zero is treated as one.
    pub fn with_clock(options: CacheOptions, clock: C) -> Self {
        let capacity = NonZeroUsize::new(options.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl: options.ttl,
            clock,
        }
    }

    /// Look up a live entry, purging it if it has expired
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let expired = match self.entries.peek(key) {
            Some(entry) => now.saturating_duration_since(entry.timestamp) >= self.ttl,
            None => return None,
        };

        if expired {
            self.entries.pop(key);
            return None;
        }

        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert or overwrite, evicting the least recently used entry when full
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            timestamp: self.clock.now(),
        };
        self.entries.put(key.into(), entry);
    }

    /// Same lookup as [`get`](Self::get), so it also refreshes recency
    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.pop(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}
