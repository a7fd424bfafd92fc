//! Tiered inventory cache: an in-process L1 sharded by key hash, an
//! optional remote L2, granular per-pattern TTL, selectable eviction
//! policy, and glob-pattern invalidation published over a pub/sub
//! channel so peer caches sharing a key prefix can converge.
//!
//! Lookups probe L1 first; on miss, L2; on an L2 hit the remaining TTL
//! backfills L1. Writes go to L1 then L2.
//!
//! ## Feature Flags
//! - `metrics`: enables counters via the `metrics` crate
//! - `tracing`: enables debug-level logging via the `tracing` crate

mod config;
mod error;
mod events;
mod eviction;
mod invalidate;
mod remote;
mod store;
mod ttl;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use error::CacheError;
pub use events::CacheEvent;
pub use eviction::EvictionPolicy;
pub use invalidate::{InvalidationChannel, InvalidationMessage};
pub use remote::RemoteCache;
pub use ttl::{GranularTtl, TtlAdjustment, TtlRule};

use driftmgr_core::{EventListener, EventListeners};
#[cfg(feature = "metrics")]
use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use invalidate::glob_matches;
use store::ShardedStore;
#[cfg(feature = "tracing")]
use tracing::debug;

/// Point-in-time snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub local_hits: u64,
    pub remote_hits: u64,
    pub entries: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    local_hits: AtomicU64,
    remote_hits: AtomicU64,
}

/// A tiered L1/L2 cache keyed by `String` per the stable cache key
/// schema (`discovery:<provider>:<region>[:<typeset-hash>]`,
/// `state:<stateId>`, ...).
pub struct TieredCache<V> {
    config: Arc<CacheConfig>,
    l1: Arc<ShardedStore<V>>,
    l2: Option<Arc<dyn RemoteCache>>,
    invalidation: InvalidationChannel,
    events: std::sync::Mutex<EventListeners<CacheEvent>>,
    counters: Arc<Counters>,
}

impl<V> Clone for TieredCache<V> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            l1: self.l1.clone(),
            l2: self.l2.clone(),
            invalidation: self.invalidation.clone(),
            events: std::sync::Mutex::new(EventListeners::new()),
            counters: self.counters.clone(),
        }
    }
}

impl<V: Clone + Send + Sync + Serialize + DeserializeOwned + 'static> TieredCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_remote(config, None)
    }

    pub fn with_remote(config: CacheConfig, remote: Option<Arc<dyn RemoteCache>>) -> Self {
        let config = Arc::new(config);
        let l1 = Arc::new(ShardedStore::new(
            config.shard_count,
            config.capacity_per_shard,
            config.eviction_policy,
        ));
        Self {
            config,
            l1,
            l2: remote,
            invalidation: InvalidationChannel::default(),
            events: std::sync::Mutex::new(EventListeners::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn add_listener<L>(&self, listener: L)
    where
        L: EventListener<CacheEvent> + 'static,
    {
        self.events.lock().unwrap().add(listener);
    }

    pub fn invalidation_channel(&self) -> &InvalidationChannel {
        &self.invalidation
    }

    /// L1 first, L2 on miss (backfilling L1 with the remaining TTL).
    pub async fn get(&self, key: &str) -> Option<V> {
        if let Some(value) = self.l1.get(key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            self.counters.local_hits.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "metrics")]
            counter!("driftmgr_cache_hits_total").increment(1);
            self.emit(CacheEvent::Hit {
                key: key.to_string(),
                timestamp: Instant::now(),
            });
            return Some(value);
        }

        if let Some(l2) = &self.l2 {
            if let Some(bytes) = l2.get(key).await {
                if let Ok(value) = serde_json::from_slice::<V>(&bytes) {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    self.counters.remote_hits.fetch_add(1, Ordering::Relaxed);
                    #[cfg(feature = "metrics")]
                    counter!("driftmgr_cache_remote_hits_total").increment(1);
                    self.l1.insert(key.to_string(), value.clone(), self.config.default_ttl);
                    self.emit(CacheEvent::Hit {
                        key: key.to_string(),
                        timestamp: Instant::now(),
                    });
                    return Some(value);
                }
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        counter!("driftmgr_cache_misses_total").increment(1);
        self.emit(CacheEvent::Miss {
            key: key.to_string(),
            timestamp: Instant::now(),
        });
        None
    }

    /// Writes `value` with the TTL resolved from `self.config`'s
    /// granular rules and `adjustment`.
    pub async fn set(&self, key: &str, value: V, adjustment: TtlAdjustment) {
        let ttl = self
            .config
            .ttl_rules
            .resolve(key, self.config.default_ttl, adjustment);

        if self
            .l1
            .insert(key.to_string(), value.clone(), ttl)
            .is_some()
        {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "metrics")]
            counter!("driftmgr_cache_evictions_total").increment(1);
            self.emit(CacheEvent::Eviction {
                key: key.to_string(),
                timestamp: Instant::now(),
            });
        }

        if let Some(l2) = &self.l2 {
            match serde_json::to_vec(&value) {
                Ok(bytes) => l2.set(key, bytes, ttl).await,
                #[cfg(feature = "tracing")]
                Err(e) => debug!(key = %key, error = %e, "failed to serialize value for L2"),
                #[cfg(not(feature = "tracing"))]
                Err(_) => {}
            }
        }

        #[cfg(feature = "tracing")]
        debug!(key = %key, ttl = ?ttl, "cache set");
    }

    /// Removes `key` from both tiers.
    pub async fn delete(&self, key: &str) {
        self.l1.remove(key);
        if let Some(l2) = &self.l2 {
            l2.del(key).await;
        }
    }

    /// Removes every key matching `pattern` from L1, and scans L2
    /// (non-blocking, batch size delegated to the `RemoteCache`
    /// implementation) for the same. Publishes an invalidation message
    /// for peer caches regardless of whether any local key matched.
    pub async fn invalidate_pattern(&self, pattern: &str) {
        if pattern == "*" {
            self.l1.clear();
        } else {
            for key in self.l1.keys() {
                if glob_matches(pattern, &key) {
                    self.l1.remove(&key);
                }
            }
        }

        if let Some(l2) = &self.l2 {
            for key in l2.scan(pattern).await {
                l2.del(&key).await;
            }
        }

        self.invalidation.publish(pattern);
        self.emit(CacheEvent::Invalidate {
            pattern: pattern.to_string(),
            timestamp: Instant::now(),
        });
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            local_hits: self.counters.local_hits.load(Ordering::Relaxed),
            remote_hits: self.counters.remote_hits.load(Ordering::Relaxed),
            entries: self.l1.len() as u64,
        }
    }

    pub fn staleness_bound(&self) -> Duration {
        self.config.staleness_bound
    }

    /// Spawns the periodic sweeper that opportunistically cleans expired
    /// L1 entries, defaulting to `config.sweep_interval` (60s).
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()>
    where
        V: 'static,
    {
        let l1 = self.l1.clone();
        let counters = self.counters.clone();
        let interval = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let candidates = l1.keys();
                let removed = l1.sweep_expired(&candidates);
                if !removed.is_empty() {
                    counters
                        .evictions
                        .fetch_add(removed.len() as u64, Ordering::Relaxed);
                }
            }
        })
    }

    fn emit(&self, event: CacheEvent) {
        self.events.lock().unwrap().emit(&event);
    }
}
