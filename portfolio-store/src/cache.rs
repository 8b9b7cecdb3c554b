//! TTL and capacity bounded memoization for read-side aggregations.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

/// Default ceiling on live entries before insertion-order eviction.
pub const DEFAULT_MAX_ENTRIES: usize = 256;

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order; mirrors `entries` exactly. Overwriting a
    /// live key keeps its original slot.
    order: VecDeque<String>,
}

impl CacheInner {
    fn sweep_expired(&mut self, now: Instant) {
        self.entries.retain(|_, entry| entry.expires_at > now);
        let entries = &self.entries;
        self.order.retain(|key| entries.contains_key(key));
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

/// Process-local cache for expensive read-side responses.
///
/// Purely an optimization: dropping every entry at any moment must never
/// change an observable result, only latency. Stored and returned values
/// are independent copies, so callers cannot corrupt a cached original.
pub struct ResponseCache {
    max_entries: usize,
    inner: Mutex<CacheInner>,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Return the cached value unless the entry has expired; an expired
    /// entry is dropped on the way out.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        match inner.entries.get(key) {
            None => return None,
            Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
            Some(_) => {}
        }
        inner.remove(key);
        None
    }

    /// Insert `value` with an absolute expiration of now + `ttl`. Expired
    /// entries are swept first; if the cache is still full, the single
    /// oldest-inserted entry is evicted.
    pub fn set(&self, key: &str, value: Value, ttl: Duration) {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        inner.sweep_expired(now);

        if !inner.entries.contains_key(key) {
            if inner.entries.len() >= self.max_entries {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.entries.remove(&oldest);
                }
            }
            inner.order.push_back(key.to_owned());
        }
        inner.entries.insert(
            key.to_owned(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    /// Drop every entry whose key starts with `prefix`. Used after any
    /// write to a collection to invalidate all of its cached views.
    pub fn delete_by_prefix(&self, prefix: &str) {
        let mut guard = self.inner.lock().unwrap();
        let CacheInner { entries, order } = &mut *guard;
        entries.retain(|key, _| !key.starts_with(prefix));
        order.retain(|key| entries.contains_key(key));
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LONG_TTL: Duration = Duration::from_secs(60);

    #[test]
    fn returns_value_until_expiry() {
        let cache = ResponseCache::new(8);
        cache.set("projects:list", json!({"items": [1, 2]}), Duration::from_millis(20));

        assert_eq!(cache.get("projects:list"), Some(json!({"items": [1, 2]})));

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("projects:list"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_single_oldest_entry_at_ceiling() {
        let cache = ResponseCache::new(3);
        cache.set("a", json!(1), LONG_TTL);
        cache.set("b", json!(2), LONG_TTL);
        cache.set("c", json!(3), LONG_TTL);
        cache.set("d", json!(4), LONG_TTL);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(json!(2)));
        assert_eq!(cache.get("d"), Some(json!(4)));
    }

    #[test]
    fn overwriting_a_key_keeps_its_insertion_slot() {
        let cache = ResponseCache::new(2);
        cache.set("a", json!(1), LONG_TTL);
        cache.set("b", json!(2), LONG_TTL);
        cache.set("a", json!(10), LONG_TTL);
        // "a" is still the oldest insertion, so it goes first.
        cache.set("c", json!(3), LONG_TTL);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(json!(2)));
        assert_eq!(cache.get("c"), Some(json!(3)));
    }

    #[test]
    fn expired_entries_are_swept_before_eviction() {
        let cache = ResponseCache::new(2);
        cache.set("stale", json!(0), Duration::from_millis(5));
        cache.set("live", json!(1), LONG_TTL);
        std::thread::sleep(Duration::from_millis(10));

        // The stale slot frees up, so "live" survives the insert.
        cache.set("next", json!(2), LONG_TTL);
        assert_eq!(cache.get("live"), Some(json!(1)));
        assert_eq!(cache.get("next"), Some(json!(2)));
    }

    #[test]
    fn delete_by_prefix_removes_matching_entries_only() {
        let cache = ResponseCache::new(8);
        cache.set("projects:list:1", json!(1), LONG_TTL);
        cache.set("projects:item:x", json!(2), LONG_TTL);
        cache.set("contacts:summary", json!(3), LONG_TTL);

        cache.delete_by_prefix("projects:");

        assert_eq!(cache.get("projects:list:1"), None);
        assert_eq!(cache.get("projects:item:x"), None);
        assert_eq!(cache.get("contacts:summary"), Some(json!(3)));
    }

    #[test]
    fn returned_values_are_independent_copies() {
        let cache = ResponseCache::new(8);
        cache.set("key", json!({"count": 1}), LONG_TTL);

        let mut copy = cache.get("key").unwrap();
        copy["count"] = json!(99);

        assert_eq!(cache.get("key"), Some(json!({"count": 1})));
    }
}
