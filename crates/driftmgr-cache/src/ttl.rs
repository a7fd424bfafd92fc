//! Granular TTL selection and dynamic adjustment.

use std::time::Duration;

const MIN_TTL: Duration = Duration::from_secs(30);
const MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// One rule in a prioritized list: the first pattern that matches a key
/// supplies that key's base TTL. The final entry should usually be a
/// catch-all (`*`).
#[derive(Debug, Clone)]
pub struct TtlRule {
    pub pattern: String,
    pub base_ttl: Duration,
}

impl TtlRule {
    pub fn new(pattern: impl Into<String>, base_ttl: Duration) -> Self {
        Self {
            pattern: pattern.into(),
            base_ttl,
        }
    }

    fn matches(&self, key: &str) -> bool {
        crate::invalidate::glob_matches(&self.pattern, key)
    }
}

/// An ordered set of [`TtlRule`]s plus the dynamic adjustment inputs
/// observed for one entry at write time.
#[derive(Debug, Clone, Default)]
pub struct GranularTtl {
    rules: Vec<TtlRule>,
}

/// Signals that adjust a base TTL once it is selected for a key.
#[derive(Debug, Clone, Copy, Default)]
pub struct TtlAdjustment {
    pub confidence: Option<f64>,
    pub access_count: Option<u64>,
    pub processing_time: Option<Duration>,
}

impl GranularTtl {
    pub fn new(rules: Vec<TtlRule>) -> Self {
        Self { rules }
    }

    /// Selects the first matching rule's base TTL, falling back to
    /// `default_ttl` if nothing matches.
    pub fn base_ttl(&self, key: &str, default_ttl: Duration) -> Duration {
        self.rules
            .iter()
            .find(|rule| rule.matches(key))
            .map(|rule| rule.base_ttl)
            .unwrap_or(default_ttl)
    }

    /// Applies the dynamic adjustment multipliers and clamps to `[30s, 24h]`.
    pub fn resolve(&self, key: &str, default_ttl: Duration, adjustment: TtlAdjustment) -> Duration {
        let mut ttl = self.base_ttl(key, default_ttl);

        if let Some(confidence) = adjustment.confidence {
            if confidence < 0.5 {
                ttl /= 2;
            } else if confidence > 0.95 {
                ttl *= 2;
            }
        }

        if let Some(access_count) = adjustment.access_count {
            if access_count > 100 {
                ttl = ttl.mul_f64(1.5);
            } else if access_count < 5 {
                ttl = ttl.mul_f64(2.0 / 3.0);
            }
        }

        if let Some(processing_time) = adjustment.processing_time {
            if processing_time > Duration::from_secs(5) {
                ttl *= 2;
            }
        }

        ttl.clamp(MIN_TTL, MAX_TTL)
    }
}
