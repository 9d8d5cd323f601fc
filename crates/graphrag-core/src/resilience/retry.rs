//! Exponential backoff retry, expressed as a small wrapper around any
//! fallible async operation rather than a decorator/annotation — see the
//! redesign note on decorator-based caching and retry.

use std::time::Duration;

use tracing::warn;

use crate::error::CoreError;

/// Retry policy: retries only on [`CoreError::Transient`]. All other errors
/// propagate on the first attempt. No jitter — single-process deployment,
/// and jitter would make retry timing non-deterministic in tests.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base_delay: Duration::from_secs(1), backoff_factor: 2.0 }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self { max_retries, base_delay, backoff_factor }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_factor.powi(attempt as i32 - 1);
        Duration::from_secs_f64(self.base_delay.as_secs_f64() * multiplier)
    }

    /// Runs `op`, retrying on [`CoreError::Transient`] up to `max_retries`
    /// additional attempts. On exhaustion the last error is converted to
    /// [`CoreError::UpstreamFailure`] per the documented escalation.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(CoreError::Transient(msg)) => {
                    if attempt > self.max_retries {
                        warn!(attempts = attempt, "retry budget exhausted: {msg}");
                        return Err(CoreError::UpstreamFailure(format!(
                            "exhausted {} retries: {msg}",
                            self.max_retries
                        )));
                    }
                    let delay = self.delay_for_attempt(attempt);
                    warn!(attempt, ?delay, "retrying after transient error: {msg}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(other) => return Err(other),
            }
        }
    }
}
