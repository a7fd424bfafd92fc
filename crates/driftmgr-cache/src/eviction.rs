//! Cache eviction policies.
//!
//! This module defines different strategies for evicting entries from the cache
//! when it reaches capacity.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Eviction policy for the cache.
///
/// Determines which entry to evict when the cache reaches capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Least Recently Used - evicts the entry that was accessed longest ago.
    ///
    /// Best for general-purpose caching where recent items are more likely
    /// to be accessed again.
    #[default]
    Lru,

    /// Least Frequently Used - evicts the entry with the lowest access count.
    ///
    /// Best for long-lived caches where consistently popular items should
    /// be retained regardless of recency.
    Lfu,

    /// Adaptive Replacement Cache - balances recency and frequency by
    /// tracking ghost entries for both and adjusting the split between
    /// them based on observed access patterns.
    Arc,

    /// Evicts by predicted next-access time: tracks the mean interval
    /// between accesses per key and evicts whichever entry is predicted
    /// furthest in the future.
    Predictive,
}

/// Trait for cache storage implementations with different eviction policies.
pub(crate) trait EvictionStore<K, V>: Send {
    /// Gets a value from the cache.
    fn get(&mut self, key: &K) -> Option<&V>;

    /// Inserts a value into the cache.
    /// Returns the evicted entry if the cache was full.
    fn insert(&mut self, key: K, value: V) -> Option<(K, V)>;

    /// Removes a specific key from the cache.
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Returns the current number of entries.
    fn len(&self) -> usize;

    /// Returns every key currently stored, in no particular order. Used
    /// by full-shard scans (glob invalidation, sweeping).
    fn keys(&self) -> Vec<K>
    where
        K: Clone;

    /// Clears all entries.
    fn clear(&mut self);

    /// Returns true if the cache is empty.
    #[allow(dead_code)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// LRU (Least Recently Used) cache storage.
pub(crate) struct LruStore<K, V> {
    cache: lru::LruCache<K, V>,
}

impl<K: Hash + Eq, V> LruStore<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(100).unwrap());
        Self {
            cache: lru::LruCache::new(cap),
        }
    }
}

impl<K: Hash + Eq + Send, V: Send> EvictionStore<K, V> for LruStore<K, V> {
    fn get(&mut self, key: &K) -> Option<&V> {
        self.cache.get(key)
    }

    fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.cache.push(key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.cache.pop(key)
    }

    fn len(&self) -> usize {
        self.cache.len()
    }

    fn clear(&mut self) {
        self.cache.clear();
    }

    fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.cache.iter().map(|(k, _)| k.clone()).collect()
    }
}

/// LFU (Least Frequently Used) cache storage.
pub(crate) struct LfuStore<K, V> {
    data: HashMap<K, V>,
    frequencies: HashMap<K, usize>,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> LfuStore<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            data: HashMap::with_capacity(capacity),
            frequencies: HashMap::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    fn find_lfu_key(&self) -> Option<K> {
        self.frequencies
            .iter()
            .min_by_key(|(_, &freq)| freq)
            .map(|(k, _)| k.clone())
    }
}

impl<K: Hash + Eq + Clone + Send, V: Send> EvictionStore<K, V> for LfuStore<K, V> {
    fn get(&mut self, key: &K) -> Option<&V> {
        if self.data.contains_key(key) {
            *self.frequencies.entry(key.clone()).or_insert(0) += 1;
            self.data.get(key)
        } else {
            None
        }
    }

    fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        // If key exists, update it
        if self.data.contains_key(&key) {
            let old_value = self.data.insert(key.clone(), value)?;
            *self.frequencies.entry(key.clone()).or_insert(0) += 1;
            return Some((key, old_value));
        }

        // If at capacity, evict LFU item
        let evicted = if self.data.len() >= self.capacity {
            self.find_lfu_key().and_then(|lfu_key| {
                let evicted_value = self.data.remove(&lfu_key)?;
                self.frequencies.remove(&lfu_key);
                Some((lfu_key, evicted_value))
            })
        } else {
            None
        };

        // Insert new item
        self.data.insert(key.clone(), value);
        self.frequencies.insert(key, 1);

        evicted
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.frequencies.remove(key);
        self.data.remove(key)
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn clear(&mut self) {
        self.data.clear();
        self.frequencies.clear();
    }

    fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.data.keys().cloned().collect()
    }
}

/// ARC cache storage: two recency/frequency lists (`t1`/`t2`) backed by
/// ghost lists (`b1`/`b2`) that remember evicted keys so the adaptive
/// target size `p` can grow toward whichever list is seeing more
/// re-accesses.
pub(crate) struct ArcStore<K, V> {
    data: HashMap<K, V>,
    t1: VecDeque<K>,
    t2: VecDeque<K>,
    b1: VecDeque<K>,
    b2: VecDeque<K>,
    p: usize,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> ArcStore<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            data: HashMap::with_capacity(capacity),
            t1: VecDeque::new(),
            t2: VecDeque::new(),
            b1: VecDeque::new(),
            b2: VecDeque::new(),
            p: 0,
            capacity: capacity.max(1),
        }
    }

    fn replace(&mut self, key_in_b2: bool) -> Option<(K, V)> {
        if !self.t1.is_empty() && (self.t1.len() > self.p || (key_in_b2 && self.t1.len() == self.p))
        {
            let old = self.t1.pop_front()?;
            let value = self.data.remove(&old)?;
            self.b1.push_back(old.clone());
            Some((old, value))
        } else {
            let old = self.t2.pop_front()?;
            let value = self.data.remove(&old)?;
            self.b2.push_back(old.clone());
            Some((old, value))
        }
    }
}

impl<K: Hash + Eq + Clone + Send, V: Send> EvictionStore<K, V> for ArcStore<K, V> {
    fn get(&mut self, key: &K) -> Option<&V> {
        if self.data.contains_key(key) {
            if let Some(pos) = self.t1.iter().position(|k| k == key) {
                let k = self.t1.remove(pos).unwrap();
                self.t2.push_back(k);
            } else if let Some(pos) = self.t2.iter().position(|k| k == key) {
                let k = self.t2.remove(pos).unwrap();
                self.t2.push_back(k);
            }
            self.data.get(key)
        } else {
            None
        }
    }

    fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.data.contains_key(&key) {
            let old = self.data.insert(key.clone(), value)?;
            self.get(&key);
            return Some((key, old));
        }

        let in_b1 = self.b1.iter().position(|k| k == &key);
        let in_b2 = self.b2.iter().position(|k| k == &key);

        if let Some(pos) = in_b1 {
            self.p = (self.p + (self.b2.len().max(1).min(self.b1.len().max(1)))).min(self.capacity);
            self.b1.remove(pos);
            let evicted = if self.t1.len() + self.t2.len() >= self.capacity {
                self.replace(false)
            } else {
                None
            };
            self.data.insert(key.clone(), value);
            self.t2.push_back(key);
            return evicted;
        }

        if let Some(pos) = in_b2 {
            self.p = self
                .p
                .saturating_sub(self.b1.len().max(1).min(self.b2.len().max(1)));
            self.b2.remove(pos);
            let evicted = if self.t1.len() + self.t2.len() >= self.capacity {
                self.replace(true)
            } else {
                None
            };
            self.data.insert(key.clone(), value);
            self.t2.push_back(key);
            return evicted;
        }

        let evicted = if self.t1.len() + self.t2.len() >= self.capacity {
            let evicted = self.replace(false);
            if self.b1.len() > self.capacity {
                self.b1.pop_front();
            }
            evicted
        } else {
            None
        };

        self.data.insert(key.clone(), value);
        self.t1.push_back(key);
        evicted
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.t1.retain(|k| k != key);
        self.t2.retain(|k| k != key);
        self.data.remove(key)
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn clear(&mut self) {
        self.data.clear();
        self.t1.clear();
        self.t2.clear();
        self.b1.clear();
        self.b2.clear();
        self.p = 0;
    }

    fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.data.keys().cloned().collect()
    }
}

struct AccessHistory {
    last_access: Instant,
    mean_interval: Duration,
}

/// Evicts whichever entry's predicted next access (`last_access +
/// mean_interval`, the interval tracked as an exponential moving
/// average) is furthest in the future.
pub(crate) struct PredictiveStore<K, V> {
    data: HashMap<K, V>,
    history: HashMap<K, AccessHistory>,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> PredictiveStore<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            data: HashMap::with_capacity(capacity),
            history: HashMap::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    fn touch(&mut self, key: &K) {
        let now = Instant::now();
        self.history
            .entry(key.clone())
            .and_modify(|h| {
                let observed = now.saturating_duration_since(h.last_access);
                h.mean_interval = (h.mean_interval + observed) / 2;
                h.last_access = now;
            })
            .or_insert(AccessHistory {
                last_access: now,
                mean_interval: Duration::from_secs(60),
            });
    }

    fn furthest_predicted(&self) -> Option<K> {
        self.history
            .iter()
            .filter(|(k, _)| self.data.contains_key(k))
            .max_by_key(|(_, h)| h.last_access + h.mean_interval)
            .map(|(k, _)| k.clone())
    }
}

impl<K: Hash + Eq + Clone + Send, V: Send> EvictionStore<K, V> for PredictiveStore<K, V> {
    fn get(&mut self, key: &K) -> Option<&V> {
        if self.data.contains_key(key) {
            self.touch(key);
            self.data.get(key)
        } else {
            None
        }
    }

    fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.data.contains_key(&key) {
            let old = self.data.insert(key.clone(), value)?;
            self.touch(&key);
            return Some((key, old));
        }

        let evicted = if self.data.len() >= self.capacity {
            self.furthest_predicted().and_then(|victim| {
                let value = self.data.remove(&victim)?;
                self.history.remove(&victim);
                Some((victim, value))
            })
        } else {
            None
        };

        self.data.insert(key.clone(), value);
        self.touch(&key);
        evicted
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.history.remove(key);
        self.data.remove(key)
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn clear(&mut self) {
        self.data.clear();
        self.history.clear();
    }

    fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.data.keys().cloned().collect()
    }
}
