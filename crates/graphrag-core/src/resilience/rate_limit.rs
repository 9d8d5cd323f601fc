//! Per-host token-bucket rate limiter.
//!
//! Grounded on the token-bucket shape used elsewhere in the retrieval
//! example pack: capacity, fractional token count, last-refill timestamp.
//! One bucket per host, process-wide, guarded by a mutex since refills are
//! cheap arithmetic rather than I/O.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::CoreError;

struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, refill_rate: f64) -> Self {
        Self { capacity, tokens: capacity, refill_rate, last_refill: Instant::now() }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    fn try_consume(&mut self) -> bool {
        self.refill(Instant::now());
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_available(&mut self) -> Duration {
        self.refill(Instant::now());
        if self.tokens >= 1.0 {
            return Duration::ZERO;
        }
        let deficit = 1.0 - self.tokens;
        Duration::from_secs_f64(deficit / self.refill_rate)
    }
}

/// Process-wide, per-host rate limiter. Capacity is fixed at 1 per the
/// spec; refill rate is configurable (default 1/s).
pub struct HostRateLimiter {
    refill_rate: f64,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl HostRateLimiter {
    pub fn new(refill_rate: f64) -> Self {
        Self { refill_rate, buckets: Mutex::new(HashMap::new()) }
    }

    /// Blocks (asynchronously) until a token for `host` is available, up to
    /// `max_wait`. Returns [`CoreError::RateLimitExceeded`] if the wait
    /// would exceed `max_wait`.
    pub async fn acquire(&self, host: &str, max_wait: Duration) -> Result<(), CoreError> {
        loop {
            let wait = {
                let mut buckets = self.buckets.lock();
                let bucket = buckets
                    .entry(host.to_string())
                    .or_insert_with(|| TokenBucket::new(1.0, self.refill_rate));
                if bucket.try_consume() {
                    return Ok(());
                }
                bucket.time_until_available()
            };
            if wait > max_wait {
                return Err(CoreError::RateLimitExceeded { host: host.to_string() });
            }
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_request_is_immediate() {
        let limiter = HostRateLimiter::new(1.0);
        let result = limiter.acquire("example.com", Duration::from_millis(10)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn second_immediate_request_exceeds_short_max_wait() {
        let limiter = HostRateLimiter::new(0.1);
        limiter.acquire("example.com", Duration::from_millis(10)).await.unwrap();
        let result = limiter.acquire("example.com", Duration::from_millis(5)).await;
        assert!(matches!(result, Err(CoreError::RateLimitExceeded { .. })));
    }

    #[tokio::test]
    async fn different_hosts_have_independent_buckets() {
        let limiter = HostRateLimiter::new(0.1);
        limiter.acquire("a.com", Duration::from_millis(10)).await.unwrap();
        let result = limiter.acquire("b.com", Duration::from_millis(10)).await;
        assert!(result.is_ok());
    }
}
