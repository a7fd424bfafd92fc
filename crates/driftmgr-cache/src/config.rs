//! Configuration for the tiered cache.

use crate::eviction::EvictionPolicy;
use crate::ttl::{GranularTtl, TtlRule};
use std::time::Duration;

/// Configuration for [`crate::TieredCache`].
#[derive(Clone)]
pub struct CacheConfig {
    pub(crate) shard_count: usize,
    pub(crate) capacity_per_shard: usize,
    pub(crate) default_ttl: Duration,
    pub(crate) eviction_policy: EvictionPolicy,
    pub(crate) ttl_rules: GranularTtl,
    pub(crate) sweep_interval: Duration,
    pub(crate) staleness_bound: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shard_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            capacity_per_shard: 256,
            default_ttl: Duration::from_secs(300),
            eviction_policy: EvictionPolicy::Lru,
            ttl_rules: GranularTtl::default(),
            sweep_interval: Duration::from_secs(60),
            staleness_bound: Duration::from_secs(180),
        }
    }
}

/// Builder for [`CacheConfig`].
#[derive(Clone, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default: CPU parallelism.
    pub fn shard_count(mut self, count: usize) -> Self {
        self.config.shard_count = count;
        self
    }

    /// Default: 256.
    pub fn capacity_per_shard(mut self, capacity: usize) -> Self {
        self.config.capacity_per_shard = capacity;
        self
    }

    /// Default: 5 minutes.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    /// Default: LRU.
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.config.eviction_policy = policy;
        self
    }

    /// Default: empty (every key falls back to `default_ttl`).
    pub fn ttl_rules(mut self, rules: Vec<TtlRule>) -> Self {
        self.config.ttl_rules = GranularTtl::new(rules);
        self
    }

    /// Default: 60 seconds.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Default: 3 minutes, the discovery cache short-circuit bound.
    pub fn staleness_bound(mut self, bound: Duration) -> Self {
        self.config.staleness_bound = bound;
        self
    }

    pub fn build(self) -> CacheConfig {
        self.config
    }
}
