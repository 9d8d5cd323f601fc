//! Resilience primitives shared across every outbound call: retry with
//! exponential backoff, per-host token-bucket rate limiting, and a
//! bounded-concurrency HTTP client.

pub mod http;
pub mod rate_limit;
pub mod retry;

pub use http::BoundedHttpClient;
pub use rate_limit::HostRateLimiter;
pub use retry::RetryPolicy;
