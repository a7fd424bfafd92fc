//! `RemoteCache`: the optional L2 seam from spec §6.
//!
//! L1 always exists in-process; a `RemoteCache` is consulted on L1 miss
//! and backfilled with the remaining TTL on hit.

use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait RemoteCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration);
    async fn del(&self, key: &str);
    /// Non-blocking iteration over keys matching `pattern`, batch size 100.
    async fn scan(&self, pattern: &str) -> Vec<String>;
}
