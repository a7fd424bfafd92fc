//! The seam every cloud provider plugs into (spec §4.C).

use async_trait::async_trait;
use driftmgr_core::DriftError;
use driftmgr_state::Resource;

/// A live inventory source for one cloud provider.
///
/// Implementations return [`DriftError`] directly rather than a bespoke
/// error type: `Upstream`/`Throttled` are retryable, `Unauthorized` and
/// `Validation` are not, `NotFound` means the specific lookup missed.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The provider name this adapter answers for, e.g. `"aws"`.
    fn name(&self) -> &str;

    /// Every region this provider exposes. Used to expand a discovery
    /// request naming `regions: ["all"]`.
    async fn list_regions(&self) -> Result<Vec<String>, DriftError>;

    /// Every resource in `region`, optionally filtered to `types`.
    async fn list_resources(
        &self,
        region: &str,
        types: Option<&[String]>,
    ) -> Result<Vec<Resource>, DriftError>;

    /// A single resource by id, `DriftError::NotFound` if it no longer exists.
    async fn get_resource(&self, id: &str) -> Result<Resource, DriftError>;
}
