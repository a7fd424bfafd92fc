//! L1 store: sharded by hash of key, each shard an independent
//! mutual-exclusion domain so reads/writes to different shards never
//! contend.

use crate::eviction::{ArcStore, EvictionPolicy, EvictionStore, LfuStore, LruStore, PredictiveStore};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One cached value plus the bookkeeping the eviction policies and TTL
/// rules need.
#[derive(Clone)]
pub(crate) struct CacheEntry<V> {
    pub(crate) value: V,
    pub(crate) created_at: Instant,
    pub(crate) ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    pub(crate) fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

struct Shard<V> {
    store: Box<dyn EvictionStore<String, CacheEntry<V>>>,
}

fn new_eviction_store<V: Send + 'static>(
    policy: EvictionPolicy,
    capacity: usize,
) -> Box<dyn EvictionStore<String, CacheEntry<V>>> {
    match policy {
        EvictionPolicy::Lru => Box::new(LruStore::new(capacity)),
        EvictionPolicy::Lfu => Box::new(LfuStore::new(capacity)),
        EvictionPolicy::Arc => Box::new(ArcStore::new(capacity)),
        EvictionPolicy::Predictive => Box::new(PredictiveStore::new(capacity)),
    }
}

/// Sharded L1 cache. `capacity_per_shard` is the entry budget of each
/// shard — callers size it from a total budget divided by shard count.
pub(crate) struct ShardedStore<V> {
    shards: Vec<Mutex<Shard<V>>>,
}

impl<V: Clone + Send + 'static> ShardedStore<V> {
    pub(crate) fn new(
        shard_count: usize,
        capacity_per_shard: usize,
        policy: EvictionPolicy,
    ) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| {
                Mutex::new(Shard {
                    store: new_eviction_store(policy, capacity_per_shard),
                })
            })
            .collect();
        Self { shards }
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    /// Returns the value if present and not expired. An expired entry
    /// is removed and reported as a miss.
    pub(crate) fn get(&self, key: &str) -> Option<V> {
        let idx = self.shard_index(key);
        let mut shard = self.shards[idx].lock().unwrap();
        let key_owned = key.to_string();

        if matches!(shard.store.get(&key_owned), Some(e) if e.is_expired()) {
            shard.store.remove(&key_owned);
            return None;
        }

        let entry = shard.store.get(&key_owned)?;
        Some(entry.value.clone())
    }

    /// Inserts `value` with the given `ttl`. Returns the evicted key, if
    /// the shard was full.
    pub(crate) fn insert(&self, key: String, value: V, ttl: Duration) -> Option<String> {
        let idx = self.shard_index(&key);
        let mut shard = self.shards[idx].lock().unwrap();
        shard
            .store
            .insert(key, CacheEntry::new(value, ttl))
            .map(|(k, _)| k)
    }

    pub(crate) fn remove(&self, key: &str) {
        let idx = self.shard_index(key);
        let mut shard = self.shards[idx].lock().unwrap();
        shard.store.remove(&key.to_string());
    }

    pub(crate) fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap().store.len())
            .sum()
    }

    pub(crate) fn clear(&self) {
        for shard in &self.shards {
            shard.lock().unwrap().store.clear();
        }
    }

    /// Every key across every shard. Used for full-shard glob scans.
    pub(crate) fn keys(&self) -> Vec<String> {
        self.shards
            .iter()
            .flat_map(|s| s.lock().unwrap().store.keys())
            .collect()
    }

    /// Removes every expired entry among `candidate_keys`. Used by the
    /// periodic sweeper; returns the removed keys.
    pub(crate) fn sweep_expired(&self, candidate_keys: &[String]) -> Vec<String> {
        let mut removed = Vec::new();
        for key in candidate_keys {
            let idx = self.shard_index(key);
            let mut shard = self.shards[idx].lock().unwrap();
            if matches!(shard.store.get(key), Some(e) if e.is_expired()) {
                shard.store.remove(key);
                removed.push(key.clone());
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let store = ShardedStore::new(4, 16, EvictionPolicy::Lru);
        store.insert("k1".to_string(), "v1".to_string(), Duration::from_secs(60));
        assert_eq!(store.get("k1"), Some("v1".to_string()));
    }

    #[test]
    fn expired_entry_is_treated_as_a_miss() {
        let store = ShardedStore::new(1, 16, EvictionPolicy::Lru);
        store.insert(
            "k1".to_string(),
            "v1".to_string(),
            Duration::from_millis(1),
        );
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(store.get("k1"), None);
    }

    #[test]
    fn removed_key_is_absent() {
        let store = ShardedStore::new(2, 16, EvictionPolicy::Lru);
        store.insert("k1".to_string(), "v1".to_string(), Duration::from_secs(60));
        store.remove("k1");
        assert_eq!(store.get("k1"), None);
    }
}
