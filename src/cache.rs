//! Process-local translation cache (L1).
//! LRU over blake3 keys, guarded by a single mutex so inserts and evictions
//! appear atomic to concurrent readers. Entry lifetime is bounded by process
//! uptime or an explicit clear; there is no TTL.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

/// A cached translation, carrying the store version so cache hits can answer
/// version-sensitive callers without a store round-trip.
#[derive(Debug, Clone)]
pub struct CachedTranslation {
    pub translated_text: String,
    pub version: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

struct Inner {
    map: LruCache<[u8; 32], CachedTranslation>,
    hits: u64,
    misses: u64,
}

pub struct TranslationCache {
    inner: Mutex<Inner>,
}

impl TranslationCache {
    pub fn new(capacity: usize) -> Self {
        // A zero capacity would be unconstructible; one entry is the floor.
        Self {
            inner: Mutex::new(Inner {
                map: LruCache::new(
                    NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to at least 1"),
                ),
                hits: 0,
                misses: 0,
            }),
        }
    }

    pub fn get(&self, key: &[u8; 32]) -> Option<CachedTranslation> {
        let mut inner = self.inner.lock();
        match inner.map.get(key).cloned() {
            Some(entry) => {
                inner.hits += 1;
                Some(entry)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    pub fn insert(&self, key: [u8; 32], translated_text: String, version: u32) {
        let mut inner = self.inner.lock();
        inner.map.put(
            key,
            CachedTranslation {
                translated_text,
                version,
            },
        );
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.map.len(),
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> [u8; 32] {
        let mut k = [0u8; 32];
        k[0] = n;
        k
    }

    #[test]
    fn hit_and_miss_counters() {
        let cache = TranslationCache::new(4);
        assert!(cache.get(&key(1)).is_none());
        cache.insert(key(1), "mo ho".into(), 1);
        let hit = cache.get(&key(1)).unwrap();
        assert_eq!(hit.translated_text, "mo ho");
        assert_eq!(hit.version, 1);

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = TranslationCache::new(2);
        cache.insert(key(1), "a".into(), 1);
        cache.insert(key(2), "b".into(), 1);
        // Touch key 1 so key 2 becomes the eviction candidate.
        cache.get(&key(1));
        cache.insert(key(3), "c".into(), 1);

        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(2)).is_none());
        assert!(cache.get(&key(3)).is_some());
        assert_eq!(cache.stats().entries, 2);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one_entry() {
        let cache = TranslationCache::new(0);
        cache.insert(key(1), "a".into(), 1);
        cache.insert(key(2), "b".into(), 1);
        assert_eq!(cache.stats().entries, 1);
        assert!(cache.get(&key(2)).is_some());
    }

    #[test]
    fn clear_resets_everything() {
        let cache = TranslationCache::new(4);
        cache.insert(key(1), "a".into(), 1);
        cache.get(&key(1));
        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }
}
