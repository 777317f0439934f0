//! Named rate limiters shared by everything that talks to the same resource.
//!
//! The registry is an explicit object: build one per process and hand it to
//! every component that needs pacing. Limiters are keyed by lowercased name;
//! the first caller decides the rate.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota};
use tracing::trace;

/// Paces callers to at most `rate` operations per second, with no burst.
pub struct RateLimiter {
    name: String,
    rate: NonZeroU32,
    inner: DefaultDirectRateLimiter,
}

impl RateLimiter {
    /// Create a standalone limiter (prefer `RateLimiterRegistry::acquire`)
    pub fn new(name: impl Into<String>, rate: NonZeroU32) -> Self {
        // One cell per period: a completed wait never leaves spare capacity
        let period = Duration::from_secs(1) / rate.get();
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(rate))
            .allow_burst(NonZeroU32::MIN);

        Self {
            name: name.into(),
            rate,
            inner: governor::RateLimiter::direct(quota),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operations per second
    pub fn rate(&self) -> u32 {
        self.rate.get()
    }

    /// Wait until it is safe to perform one operation
    pub async fn take(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.name)
            .field("rate", &self.rate)
            .finish()
    }
}

/// Process-wide map of named limiters
#[derive(Debug, Default)]
pub struct RateLimiterRegistry {
    limiters: Mutex<HashMap<String, Arc<RateLimiter>>>,
}

impl RateLimiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the limiter for `name`, creating it at `rate` ops/sec if needed.
    ///
    /// Repeated calls with the same name (case-insensitive) return the same
    /// limiter; a different `rate` on a later call is ignored. A rate of zero
    /// is treated as one.
    pub fn acquire(&self, name: &str, rate: u32) -> Arc<RateLimiter> {
        let key = name.to_lowercase();
        let mut limiters = self
            .limiters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        limiters
            .entry(key)
            .or_insert_with(|| {
                let rate = NonZeroU32::new(rate).unwrap_or(NonZeroU32::MIN);
                trace!(name, limit = rate.get(), "Created new rate limiter");
                Arc::new(RateLimiter::new(name, rate))
            })
            .clone()
    }

    /// Number of distinct limiters created so far
    pub fn len(&self) -> usize {
        self.limiters
            .lock()
            .map(|limiters| limiters.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_returns_same_limiter() {
        let registry = RateLimiterRegistry::new();
        let first = registry.acquire("trakt", 3);
        let second = registry.acquire("Trakt", 10);

        assert!(Arc::ptr_eq(&first, &second));
        // First writer wins on rate
        assert_eq!(second.rate(), 3);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_names_get_distinct_limiters() {
        let registry = RateLimiterRegistry::new();
        let trakt = registry.acquire("trakt", 3);
        let tmdb = registry.acquire("tmdb", 3);

        assert!(!Arc::ptr_eq(&trakt, &tmdb));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_zero_rate_is_clamped() {
        let registry = RateLimiterRegistry::new();
        assert_eq!(registry.acquire("slow", 0).rate(), 1);
    }

    #[tokio::test]
    async fn test_first_take_is_immediate() {
        let limiter = RateLimiter::new("test", NonZeroU32::new(1).unwrap());
        let start = std::time::Instant::now();
        limiter.take().await;
        assert!(start.elapsed() < Duration::from_millis(200));
    }
}
