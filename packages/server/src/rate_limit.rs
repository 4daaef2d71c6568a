use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Buckets are swept of expired windows once the map grows past this size.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

#[derive(Debug)]
struct Bucket {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window request counter keyed by caller identity.
///
/// Process-local and never persisted; bursts at window boundaries are possible.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, key: &str, limit: u32, window: Duration) -> RateDecision {
        self.check_at(key, limit, window, Instant::now())
    }

    /// Count one hit for `key` at `now`.
    pub fn check_at(&self, key: &str, limit: u32, window: Duration, now: Instant) -> RateDecision {
        if self.buckets.len() > SWEEP_THRESHOLD {
            self.buckets.retain(|_, bucket| bucket.reset_at > now);
        }

        let mut bucket = self.buckets.entry(key.to_string()).or_insert(Bucket {
            count: 0,
            reset_at: now + window,
        });

        if bucket.reset_at <= now {
            bucket.count = 0;
            bucket.reset_at = now + window;
        }

        if bucket.count >= limit {
            let remaining = bucket.reset_at.saturating_duration_since(now);
            let retry_after_secs = (remaining.as_millis().div_ceil(1000) as u64).max(1);
            return RateDecision::Limited { retry_after_secs };
        }

        bucket.count += 1;
        RateDecision::Allowed
    }
}
