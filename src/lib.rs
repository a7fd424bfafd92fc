//! Lifecycle coordinator: sequences discovery, analysis, and locking
//! for one state file (spec §4.I).
//!
//! [`Context`] bundles the dependencies a real process wires once per
//! run (a [`LockManager`], a [`DiscoveryEngine`], timeouts); tests
//! construct their own. [`analyze_state`] is the `AnalyzeState`
//! contract: parse, lock, fan out to discovery, analyze, unlock.
//!
//! ## Feature Flags
//! - `metrics`: forwarded to every resilience/cache/lock dependency
//! - `tracing`: forwarded to every resilience/cache/lock dependency

use driftmgr_core::DriftError;
use driftmgr_discovery::{DiscoveryEngine, DiscoveryRequest, RegionFailure};
use driftmgr_lock::{LockError, LockHolder, LockManager};
use driftmgr_state::{BackendKind, Perspective};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Dependencies one process wires together to run `AnalyzeState`.
#[derive(Clone)]
pub struct Context {
    pub locks: LockManager,
    pub discovery: Arc<DiscoveryEngine>,
    /// Lease granted to a lock acquired by `analyze_state`. Default: 10 minutes.
    pub lock_lease: Duration,
}

impl Context {
    pub fn new(locks: LockManager, discovery: Arc<DiscoveryEngine>) -> Self {
        Self {
            locks,
            discovery,
            lock_lease: Duration::from_secs(10 * 60),
        }
    }
}

/// Result of `AnalyzeState`: either the computed perspective (with
/// partial/complete status and any per-region failures), or the lock
/// contention outcome, returned without performing discovery.
#[derive(Debug, Clone)]
pub enum AnalyzeOutcome {
    Completed {
        perspective: Box<Perspective>,
        complete: bool,
        failures: Vec<RegionFailure>,
    },
    LockHeld {
        holder: LockHolder,
    },
}

/// Runs the full `AnalyzeState` sequence for one state document:
/// parse → acquire lock → fan out to discovery → analyze → release.
///
/// Cancellation propagates into discovery; a canceled run still
/// releases the lock and returns whatever partial results were
/// gathered. Any failure after the lock is acquired still releases it
/// (or, if release itself fails, force-breaks it) rather than leaking
/// an unreleased lock.
pub async fn analyze_state(
    ctx: &Context,
    state_id: &str,
    state_bytes: &[u8],
    path: impl Into<String>,
    backend_kind: BackendKind,
    holder: LockHolder,
    cancellation: &CancellationToken,
) -> Result<AnalyzeOutcome, DriftError> {
    let state = driftmgr_state::parse(state_bytes, state_id, path, backend_kind)?;

    let lock = match ctx
        .locks
        .acquire(state_id, holder, ctx.lock_lease, state.serial)
        .await
    {
        Ok(lock) => lock,
        Err(LockError::LockHeld { holder }) => return Ok(AnalyzeOutcome::LockHeld { holder }),
        Err(other) => {
            return Err(DriftError::Internal {
                message: other.to_string(),
            })
        }
    };

    let outcome = fan_out_and_analyze(ctx, &state, cancellation).await;

    if ctx.locks.release(state_id, &lock.id).await.is_err() {
        ctx.locks
            .force_break(state_id, "analyze_state: release failed after lock id mismatch")
            .await;
    }

    outcome
}

async fn fan_out_and_analyze(
    ctx: &Context,
    state: &driftmgr_state::StateFile,
    cancellation: &CancellationToken,
) -> Result<AnalyzeOutcome, DriftError> {
    let by_provider = provider_regions(state);

    let requests = by_provider.into_iter().map(|(provider, regions)| {
        let discovery = ctx.discovery.clone();
        let cancellation = cancellation.clone();
        async move {
            discovery
                .discover_cancelable(
                    DiscoveryRequest {
                        providers: vec![provider],
                        regions: regions.into_iter().collect(),
                        resource_types: None,
                    },
                    &cancellation,
                )
                .await
        }
    });

    let results = futures::future::join_all(requests).await;

    let mut resources = Vec::new();
    let mut failures = Vec::new();
    let mut complete = true;
    for result in results {
        resources.extend(result.resources);
        complete &= result.complete;
        failures.extend(result.failures);
    }

    let perspective = driftmgr_state::analyze(state, &resources);
    Ok(AnalyzeOutcome::Completed {
        perspective: Box::new(perspective),
        complete: complete && !cancellation.is_cancelled(),
        failures,
    })
}

/// Groups the distinct `(provider, region)` pairs implied by a state's
/// declared instances, the same way the analyzer derives resource
/// identity (region comes from the instance's `region` attribute).
fn provider_regions(state: &driftmgr_state::StateFile) -> BTreeMap<String, BTreeSet<String>> {
    let mut by_provider: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for resource in &state.resources {
        for instance in &resource.instances {
            let region = instance
                .attributes
                .get("region")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            by_provider
                .entry(resource.provider.clone())
                .or_default()
                .insert(region);
        }
    }
    by_provider
}
