//! Glob-pattern matching for `InvalidatePattern` and TTL rule selection,
//! plus the pub/sub channel peer caches subscribe to for invalidation.

use tokio::sync::broadcast;

/// Matches `*`, `prefix*`, `*suffix`, `*infix*`, and exact patterns —
/// the glob subset `InvalidatePattern` and granular TTL rules support.
pub(crate) fn glob_matches(pattern: &str, key: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let stars = pattern.matches('*').count();
    if stars == 0 {
        return pattern == key;
    }
    if let Some(infix) = pattern.strip_prefix('*').and_then(|s| s.strip_suffix('*')) {
        if stars == 2 {
            return key.contains(infix);
        }
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        if stars == 1 {
            return key.starts_with(prefix);
        }
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        if stars == 1 {
            return key.ends_with(suffix);
        }
    }
    pattern == key
}

/// A message published on `cache.invalidate.<prefix>` when a key or
/// pattern is invalidated, so peer caches sharing the prefix can converge.
#[derive(Debug, Clone)]
pub struct InvalidationMessage {
    pub pattern: String,
}

/// The pub/sub side of invalidation. Cloning shares the same channel.
#[derive(Clone)]
pub struct InvalidationChannel {
    sender: broadcast::Sender<InvalidationMessage>,
}

impl InvalidationChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationMessage> {
        self.sender.subscribe()
    }

    /// Publishes an invalidation message. A publish with no subscribers
    /// is not an error — pub/sub failures degrade to per-process
    /// correctness rather than failing the caller.
    pub fn publish(&self, pattern: impl Into<String>) {
        let _ = self.sender.send(InvalidationMessage {
            pattern: pattern.into(),
        });
    }
}

impl Default for InvalidationChannel {
    fn default() -> Self {
        Self::new(64)
    }
}
