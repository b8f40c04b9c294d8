//! Sliding-window rate limiting keyed by client address
//!
//! Every key keeps the timestamps of its accepted requests inside the window.
//! Rejected requests are not recorded, so a throttled client regains capacity
//! as soon as its oldest accepted request ages out.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Window length
pub const WINDOW: Duration = Duration::from_secs(60);

/// Accepted requests per key per window
pub const MAX_REQUESTS: usize = 20;

/// Table size above which stale keys are swept
pub const PRUNE_THRESHOLD: usize = 500;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub limited: bool,
}

/// Rate limiter settings
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: usize,
    pub prune_threshold: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: WINDOW,
            max_requests: MAX_REQUESTS,
            prune_threshold: PRUNE_THRESHOLD,
        }
    }
}

/// Per-key sliding-window limiter shared by every relay handler
#[derive(Debug, Default)]
pub struct RateLimiter {
    config: RateLimitConfig,
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request for `key` at the current instant
    pub fn check(&self, key: &str) -> RateLimit {
        self.check_at(key, Instant::now())
    }

    /// Record a request for `key` at `now`
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimit {
        let window = self.config.window;
        let mut requests = self
            .requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let timestamps = requests.entry(key.to_string()).or_default();
        timestamps.retain(|t| now.saturating_duration_since(*t) < window);

        if timestamps.len() >= self.config.max_requests {
            return RateLimit { limited: true };
        }

        timestamps.push(now);

        if requests.len() > self.config.prune_threshold {
            let before = requests.len();
            requests.retain(|_, times| {
                times.retain(|t| now.saturating_duration_since(*t) < window);
                !times.is_empty()
            });
            tracing::debug!(
                swept = before - requests.len(),
                remaining = requests.len(),
                "pruned rate limiter table"
            );
        }

        RateLimit { limited: false }
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.requests
            .lock()
            .map(|r| r.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twenty_first_request_is_limited() {
        let limiter = RateLimiter::default();
        let start = Instant::now();

        for i in 0..20 {
            let at = start + Duration::from_millis(i * 40);
            assert_eq!(limiter.check_at("1.2.3.4", at), RateLimit { limited: false });
        }

        let at = start + Duration::from_millis(999);
        assert_eq!(limiter.check_at("1.2.3.4", at), RateLimit { limited: true });
    }

    #[test]
    fn test_window_elapses() {
        let limiter = RateLimiter::default();
        let start = Instant::now();

        for _ in 0..20 {
            limiter.check_at("ip", start);
        }
        assert!(limiter.check_at("ip", start + Duration::from_secs(30)).limited);
        assert!(!limiter.check_at("ip", start + WINDOW).limited);
    }

    #[test]
    fn test_limited_requests_are_not_recorded() {
        let limiter = RateLimiter::default();
        let start = Instant::now();

        for _ in 0..20 {
            limiter.check_at("ip", start);
        }
        for s in 1..59 {
            assert!(limiter.check_at("ip", start + Duration::from_secs(s)).limited);
        }

        // Only the original twenty were recorded, all of which have now expired
        let later = start + WINDOW + Duration::from_millis(1);
        for _ in 0..20 {
            assert!(!limiter.check_at("ip", later).limited);
        }
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::default();
        let now = Instant::now();

        for _ in 0..20 {
            limiter.check_at("a", now);
        }
        assert!(limiter.check_at("a", now).limited);
        assert!(!limiter.check_at("b", now).limited);
    }

    #[test]
    fn test_stale_keys_pruned_past_threshold() {
        let limiter = RateLimiter::new(RateLimitConfig {
            prune_threshold: 3,
            ..RateLimitConfig::default()
        });
        let start = Instant::now();

        for key in ["a", "b", "c"] {
            limiter.check_at(key, start);
        }
        assert_eq!(limiter.tracked_keys(), 3);

        // Fourth key crosses the threshold after the first three expired
        limiter.check_at("d", start + WINDOW);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_live_clock_check() {
        let limiter = RateLimiter::default();
        assert!(!limiter.check("unknown").limited);
    }
}
