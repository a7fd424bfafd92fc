//! Bounded fan-out over (provider, region) with cache-first reads,
//! per-provider resilience, and identity-keyed merge (spec §4.D).

use crate::adapter::ProviderAdapter;
use driftmgr_cache::{CacheConfig, TieredCache, TtlAdjustment};
use driftmgr_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerGroup};
use driftmgr_core::DriftError;
use driftmgr_ratelimiter::{RateLimiter, RateLimiterConfig};
use driftmgr_retry::{RetryConfig, Retrier};
use driftmgr_state::Resource;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

/// Everything needed to run one discovery pass.
pub struct DiscoveryRequest {
    pub providers: Vec<String>,
    pub regions: Vec<String>,
    pub resource_types: Option<Vec<String>>,
}

/// One (provider, region) task's failure, carried alongside any
/// successes gathered elsewhere in the same run.
#[derive(Debug, Clone)]
pub struct RegionFailure {
    pub provider: String,
    pub region: String,
    pub error: DriftError,
}

/// The aggregate outcome of a discovery run: every resource surviving
/// dedup, plus per-region failures. `complete` is false if any region
/// failed or the run was canceled.
#[derive(Debug, Clone)]
pub struct PartialResult {
    pub resources: Vec<Resource>,
    pub failures: Vec<RegionFailure>,
    pub complete: bool,
}

/// A lazily-populated pool of per-key `T`s, built by `factory` on first
/// use — the same shape as [`CircuitBreakerGroup`], generalized to rate
/// limiters and retriers which aren't `Clone`/reused across crates.
struct KeyedPool<T, F> {
    items: Mutex<HashMap<String, Arc<T>>>,
    factory: F,
}

impl<T, F> KeyedPool<T, F>
where
    F: Fn(&str) -> T,
{
    fn new(factory: F) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            factory,
        }
    }

    async fn get(&self, key: &str) -> Arc<T> {
        let mut items = self.items.lock().await;
        items
            .entry(key.to_string())
            .or_insert_with(|| Arc::new((self.factory)(key)))
            .clone()
    }
}

type BreakerFactory = Box<dyn Fn(&str) -> CircuitBreakerConfig + Send + Sync>;
type LimiterFactory = Box<dyn Fn(&str) -> RateLimiter + Send + Sync>;
type RetrierFactory = Box<dyn Fn(&str) -> Retrier<DriftError> + Send + Sync>;

/// Fan-out engine: cache-first, rate-limited, circuit-breaker-guarded,
/// retried reads against registered [`ProviderAdapter`]s.
pub struct DiscoveryEngine {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
    cache: TieredCache<Vec<Resource>>,
    breakers: CircuitBreakerGroup<BreakerFactory>,
    limiters: KeyedPool<RateLimiter, LimiterFactory>,
    retriers: KeyedPool<Retrier<DriftError>, RetrierFactory>,
    max_concurrent_regions: usize,
    adapter_timeout: Duration,
}

fn is_retryable(err: &DriftError) -> bool {
    err.is_retryable()
}

impl DiscoveryEngine {
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>, max_concurrent_regions: usize) -> Self {
        Self::with_cache(adapters, max_concurrent_regions, TieredCache::new(CacheConfig::default()))
    }

    pub fn with_cache(
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        max_concurrent_regions: usize,
        cache: TieredCache<Vec<Resource>>,
    ) -> Self {
        Self {
            adapters: adapters.into_iter().map(|a| (a.name().to_string(), a)).collect(),
            cache,
            breakers: CircuitBreakerGroup::new(Box::new(|key: &str| {
                CircuitBreakerConfig::builder().name(key).build()
            })),
            limiters: KeyedPool::new(Box::new(|key: &str| {
                RateLimiter::new(RateLimiterConfig::builder().name(key).build())
            })),
            retriers: KeyedPool::new(Box::new(|key: &str| {
                Retrier::new(RetryConfig::builder().name(key).retryable_if(is_retryable).build())
            })),
            max_concurrent_regions: max_concurrent_regions.max(1),
            adapter_timeout: Duration::from_secs(30),
        }
    }

    pub fn cache(&self) -> &TieredCache<Vec<Resource>> {
        &self.cache
    }

    /// Runs one discovery pass, expanding `regions: ["all"]` per
    /// provider and fanning out with bounded concurrency.
    pub async fn discover(&self, request: DiscoveryRequest) -> PartialResult {
        self.discover_cancelable(request, &CancellationToken::new()).await
    }

    pub async fn discover_cancelable(
        &self,
        request: DiscoveryRequest,
        cancellation: &CancellationToken,
    ) -> PartialResult {
        let mut tasks = Vec::new();
        for provider in &request.providers {
            let Some(adapter) = self.adapters.get(provider) else {
                tasks.push((
                    provider.clone(),
                    String::new(),
                    Err(DriftError::NotFound {
                        kind: "provider",
                        id: provider.clone(),
                    }),
                ));
                continue;
            };

            let regions = if request.regions.iter().any(|r| r == "all") {
                match adapter.list_regions().await {
                    Ok(regions) => regions,
                    Err(err) => {
                        tasks.push((provider.clone(), String::new(), Err(err)));
                        continue;
                    }
                }
            } else {
                request.regions.clone()
            };

            for region in regions {
                tasks.push((provider.clone(), region, Ok(())));
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_regions));
        let types = request.resource_types.clone();

        let futures = tasks.into_iter().map(|(provider, region, precheck)| {
            let semaphore = semaphore.clone();
            let types = types.clone();
            async move {
                if let Err(err) = precheck {
                    return (provider, region, Err(err));
                }
                if cancellation.is_cancelled() {
                    return (provider, region, Err(DriftError::Canceled));
                }
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            provider,
                            region,
                            Err(DriftError::Internal {
                                message: "discovery semaphore closed".into(),
                            }),
                        )
                    }
                };
                let result = self
                    .fetch_region(&provider, &region, types.as_deref(), cancellation)
                    .await;
                (provider, region, result)
            }
        });

        use futures::stream::StreamExt;
        let results: Vec<_> = futures::stream::iter(futures)
            .buffer_unordered(self.max_concurrent_regions)
            .collect()
            .await;

        let mut merged: HashMap<driftmgr_state::ResourceIdentity, Resource> = HashMap::new();
        let mut failures = Vec::new();
        let mut any_success = false;
        let mut all_non_retryable = true;

        for (provider, region, result) in results {
            match result {
                Ok(resources) => {
                    any_success = true;
                    for resource in resources {
                        merge_one(&mut merged, resource);
                    }
                }
                Err(error) => {
                    if is_retryable(&error) || error.is_canceled() {
                        all_non_retryable = false;
                    }
                    failures.push(RegionFailure { provider, region, error });
                }
            }
        }

        let complete = failures.is_empty() && !cancellation.is_cancelled();
        let whole_run_failed = !any_success && !failures.is_empty() && all_non_retryable;

        PartialResult {
            resources: if whole_run_failed { Vec::new() } else { merged.into_values().collect() },
            failures,
            complete,
        }
    }

    async fn fetch_region(
        &self,
        provider: &str,
        region: &str,
        types: Option<&[String]>,
        cancellation: &CancellationToken,
    ) -> Result<Vec<Resource>, DriftError> {
        let key = cache_key(provider, region, types);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let adapter = self
            .adapters
            .get(provider)
            .ok_or_else(|| DriftError::NotFound {
                kind: "provider",
                id: provider.to_string(),
            })?
            .clone();

        let pool_key = format!("{provider}:{region}");
        let breaker = self.breakers.get(&pool_key).await;
        let limiter = self.limiters.get(&pool_key).await;
        let retrier = self.retriers.get(&pool_key).await;

        let types_owned = types.map(|t| t.to_vec());

        let outcome = retrier
            .call_cancelable(
                || {
                    let adapter = adapter.clone();
                    let breaker = breaker.clone();
                    let limiter = limiter.clone();
                    let region = region.to_string();
                    let types_owned = types_owned.clone();
                    let pool_key = pool_key.clone();
                    async move {
                        limiter.acquire().await.map_err(|_| DriftError::Throttled {
                            provider: adapter.name().to_string(),
                            retry_after: Some(Duration::from_secs(1)),
                        })?;

                        let call_result = tokio::time::timeout(
                            self.adapter_timeout,
                            breaker.call(|| adapter.list_resources(&region, types_owned.as_deref())),
                        )
                        .await;

                        match call_result {
                            Ok(Ok(resources)) => {
                                limiter.record_outcome(true);
                                Ok(resources)
                            }
                            Ok(Err(breaker_err)) => {
                                let err = breaker_err
                                    .into_inner()
                                    .unwrap_or(DriftError::CircuitOpen { breaker: pool_key.clone() });
                                limiter.record_outcome(false);
                                Err(err)
                            }
                            Err(_) => {
                                limiter.record_outcome(false);
                                Err(DriftError::Timeout { layer: "provider_adapter" })
                            }
                        }
                    }
                },
                cancellation,
            )
            .await;

        match outcome {
            Ok(resources) => {
                self.cache.set(&key, resources.clone(), TtlAdjustment::default()).await;
                Ok(resources)
            }
            Err(retry_err) => Err(retry_err.into_inner().unwrap_or(DriftError::Canceled)),
        }
    }
}

fn merge_one(merged: &mut HashMap<driftmgr_state::ResourceIdentity, Resource>, resource: Resource) {
    let identity = resource.identity();
    match merged.get(&identity) {
        Some(existing) if !wins(&resource, existing) => {}
        _ => {
            merged.insert(identity, resource);
        }
    }
}

/// `candidate` wins over `incumbent` if it's newer, or ties break on
/// lexicographically smaller id.
fn wins(candidate: &Resource, incumbent: &Resource) -> bool {
    match candidate.updated.cmp(&incumbent.updated) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate.id <= incumbent.id,
    }
}

pub(crate) fn cache_key(provider: &str, region: &str, types: Option<&[String]>) -> String {
    match types {
        None => format!("discovery:{provider}:{region}"),
        Some(types) => {
            let mut sorted: Vec<&String> = types.iter().collect();
            sorted.sort();
            let mut hasher = DefaultHasher::new();
            sorted.iter().for_each(|t| t.hash(&mut hasher));
            format!("discovery:{provider}:{region}:{:x}", hasher.finish())
        }
    }
}

/// Every (provider, region) pair implied by a request, with `["all"]`
/// left unexpanded — used by callers deriving a request from state
/// resources rather than by `DiscoveryEngine` itself.
pub fn regions_for_resources<'a>(
    resources: impl IntoIterator<Item = &'a Resource>,
) -> HashMap<String, HashSet<String>> {
    let mut by_provider: HashMap<String, HashSet<String>> = HashMap::new();
    for resource in resources {
        by_provider
            .entry(resource.provider.clone())
            .or_default()
            .insert(resource.region.clone());
    }
    by_provider
}
