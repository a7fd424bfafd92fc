//! Cache warmer: proactively re-fetches keys before they go stale
//! (spec §4.E). Three strategies share one decision function so that,
//! when more than one matches a key in the same tick, only the
//! highest-priority strategy actually re-fetches it.

use crate::discovery::{DiscoveryEngine, DiscoveryRequest};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Identifies one (provider, region[, types]) fetch that can be replayed
/// through [`DiscoveryEngine::discover`] as a warming request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WarmTarget {
    pub provider: String,
    pub region: String,
    pub resource_types: Option<Vec<String>>,
}

impl WarmTarget {
    pub fn cache_key(&self) -> String {
        crate::discovery::cache_key(&self.provider, &self.region, self.resource_types.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum WarmStrategy {
    /// Highest priority: the entry is about to expire.
    Ttl,
    /// Middle priority: the key is accessed often enough to keep hot.
    Pattern,
    /// Lowest priority: the next access is predicted soon.
    Predictive,
}

struct Entry {
    target: WarmTarget,
    registered_at: Instant,
    ttl: Duration,
    access_count: u64,
    last_accessed: Instant,
    intervals: VecDeque<Duration>,
}

const MAX_TRACKED_INTERVALS: usize = 20;

/// Tuning knobs for the three warming strategies.
#[derive(Debug, Clone, Copy)]
pub struct WarmerConfig {
    /// Re-fetch once an entry's age crosses this fraction of its TTL.
    pub ttl_threshold: f64,
    /// Minimum access count for the pattern warmer to consider a key "hot".
    pub pattern_min_access_count: u64,
    /// Fraction of the observed mean inter-arrival used as the predictive
    /// lookahead window.
    pub predictive_lookahead_fraction: f64,
    /// How often each strategy's task scans the tracked keys.
    pub tick_interval: Duration,
}

impl Default for WarmerConfig {
    fn default() -> Self {
        Self {
            ttl_threshold: 0.8,
            pattern_min_access_count: 10,
            predictive_lookahead_fraction: 0.2,
            tick_interval: Duration::from_secs(15),
        }
    }
}

/// Drives proactive re-fetches of tracked keys through a [`DiscoveryEngine`].
///
/// Callers register interest with [`CacheWarmer::record_access`] every
/// time they read or write a discovery cache key; the warmer has no
/// other way of learning which keys exist or how often they're used.
pub struct CacheWarmer {
    discovery: Arc<DiscoveryEngine>,
    entries: Mutex<HashMap<String, Entry>>,
    in_flight: Mutex<HashSet<String>>,
    config: WarmerConfig,
}

impl CacheWarmer {
    pub fn new(discovery: Arc<DiscoveryEngine>, config: WarmerConfig) -> Self {
        Self {
            discovery,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
            config,
        }
    }

    /// Records a read or write of `target`'s cache key, updating the
    /// access count and inter-arrival history used by the pattern and
    /// predictive strategies.
    pub async fn record_access(&self, target: WarmTarget, ttl: Duration) {
        let key = target.cache_key();
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries
            .entry(key)
            .and_modify(|entry| {
                let interval = now.saturating_duration_since(entry.last_accessed);
                entry.intervals.push_back(interval);
                if entry.intervals.len() > MAX_TRACKED_INTERVALS {
                    entry.intervals.pop_front();
                }
                entry.access_count += 1;
                entry.last_accessed = now;
                entry.ttl = ttl;
            })
            .or_insert_with(|| Entry {
                target,
                registered_at: now,
                ttl,
                access_count: 1,
                last_accessed: now,
                intervals: VecDeque::new(),
            });
    }

    /// Spawns the three cooperative warming tasks. Dropping every
    /// returned handle (or aborting them) stops warming.
    pub fn spawn(self: &Arc<Self>) -> [JoinHandle<()>; 3] {
        let ttl = self.clone();
        let pattern = self.clone();
        let predictive = self.clone();
        [
            tokio::spawn(async move { ttl.run_loop(WarmStrategy::Ttl).await }),
            tokio::spawn(async move { pattern.run_loop(WarmStrategy::Pattern).await }),
            tokio::spawn(async move { predictive.run_loop(WarmStrategy::Predictive).await }),
        ]
    }

    async fn run_loop(self: Arc<Self>, strategy: WarmStrategy) {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        loop {
            ticker.tick().await;
            self.tick(strategy).await;
        }
    }

    /// Runs one scan for `strategy`: every tracked key whose *highest
    /// priority matching strategy* is exactly `strategy` gets re-fetched.
    async fn tick(&self, strategy: WarmStrategy) {
        let now = Instant::now();
        let candidates: Vec<WarmTarget> = {
            let entries = self.entries.lock().await;
            entries
                .values()
                .filter_map(|entry| {
                    if self.decide(entry, now) == Some(strategy) {
                        Some(entry.target.clone())
                    } else {
                        None
                    }
                })
                .collect()
        };

        for target in candidates {
            self.warm_one(target).await;
        }
    }

    /// The highest-priority strategy that applies to `entry` right now,
    /// or `None` if nothing does.
    fn decide(&self, entry: &Entry, now: Instant) -> Option<WarmStrategy> {
        let age = now.saturating_duration_since(entry.registered_at);
        if entry.ttl.as_secs_f64() > 0.0 && age.as_secs_f64() >= entry.ttl.as_secs_f64() * self.config.ttl_threshold
        {
            return Some(WarmStrategy::Ttl);
        }

        if entry.access_count >= self.config.pattern_min_access_count {
            return Some(WarmStrategy::Pattern);
        }

        if let Some(mean) = mean_interval(&entry.intervals) {
            let since_last = now.saturating_duration_since(entry.last_accessed);
            let lookahead = mean.mul_f64(self.config.predictive_lookahead_fraction);
            if since_last.as_secs_f64() + lookahead.as_secs_f64() >= mean.as_secs_f64() {
                return Some(WarmStrategy::Predictive);
            }
        }

        None
    }

    async fn warm_one(&self, target: WarmTarget) {
        let key = target.cache_key();
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(key.clone()) {
                return;
            }
        }

        self.discovery
            .discover(DiscoveryRequest {
                providers: vec![target.provider.clone()],
                regions: vec![target.region.clone()],
                resource_types: target.resource_types.clone(),
            })
            .await;

        self.in_flight.lock().await.remove(&key);
    }
}

fn mean_interval(intervals: &VecDeque<Duration>) -> Option<Duration> {
    if intervals.is_empty() {
        return None;
    }
    let total: Duration = intervals.iter().sum();
    Some(total / intervals.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ProviderAdapter;
    use async_trait::async_trait;
    use driftmgr_core::DriftError;
    use driftmgr_state::Resource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAdapter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProviderAdapter for CountingAdapter {
        fn name(&self) -> &str {
            "aws"
        }
        async fn list_regions(&self) -> Result<Vec<String>, DriftError> {
            Ok(vec!["us-east-1".into()])
        }
        async fn list_resources(
            &self,
            _region: &str,
            _types: Option<&[String]>,
        ) -> Result<Vec<Resource>, DriftError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }
        async fn get_resource(&self, id: &str) -> Result<Resource, DriftError> {
            Err(DriftError::NotFound { kind: "resource", id: id.to_string() })
        }
    }

    fn target() -> WarmTarget {
        WarmTarget {
            provider: "aws".into(),
            region: "us-east-1".into(),
            resource_types: None,
        }
    }

    #[tokio::test]
    async fn ttl_threshold_marks_aging_entries_for_warming() {
        let adapter = Arc::new(CountingAdapter { calls: AtomicUsize::new(0) });
        let discovery = Arc::new(DiscoveryEngine::new(vec![adapter], 4));
        let warmer = CacheWarmer::new(discovery, WarmerConfig { ttl_threshold: 0.0, ..Default::default() });
        warmer.record_access(target(), Duration::from_secs(60)).await;
        warmer.tick(WarmStrategy::Ttl).await;
        let entries = warmer.entries.lock().await;
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn high_access_count_selects_the_pattern_strategy() {
        let adapter = Arc::new(CountingAdapter { calls: AtomicUsize::new(0) });
        let discovery = Arc::new(DiscoveryEngine::new(vec![adapter], 4));
        let warmer = CacheWarmer::new(
            discovery,
            WarmerConfig { pattern_min_access_count: 2, ttl_threshold: 1000.0, ..Default::default() },
        );
        warmer.record_access(target(), Duration::from_secs(300)).await;
        warmer.record_access(target(), Duration::from_secs(300)).await;
        let entries = warmer.entries.lock().await;
        let entry = entries.values().next().unwrap();
        assert_eq!(warmer.decide(entry, Instant::now()), Some(WarmStrategy::Pattern));
    }

    #[tokio::test]
    async fn ttl_outranks_pattern_when_both_match() {
        let adapter = Arc::new(CountingAdapter { calls: AtomicUsize::new(0) });
        let discovery = Arc::new(DiscoveryEngine::new(vec![adapter], 4));
        let warmer = CacheWarmer::new(
            discovery,
            WarmerConfig { ttl_threshold: 0.0, pattern_min_access_count: 1, ..Default::default() },
        );
        warmer.record_access(target(), Duration::from_secs(300)).await;
        let entries = warmer.entries.lock().await;
        let entry = entries.values().next().unwrap();
        assert_eq!(warmer.decide(entry, Instant::now()), Some(WarmStrategy::Ttl));
    }

    #[tokio::test]
    async fn warm_one_deduplicates_concurrent_in_flight_requests() {
        let adapter = Arc::new(CountingAdapter { calls: AtomicUsize::new(0) });
        let discovery = Arc::new(DiscoveryEngine::new(vec![adapter], 4));
        let warmer = Arc::new(CacheWarmer::new(discovery, WarmerConfig::default()));
        let a = { let w = warmer.clone(); tokio::spawn(async move { w.warm_one(target()).await }) };
        let b = { let w = warmer.clone(); tokio::spawn(async move { w.warm_one(target()).await }) };
        a.await.unwrap();
        b.await.unwrap();
    }
}
