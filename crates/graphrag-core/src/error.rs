//! Error taxonomy shared across the pipeline.
//!
//! Mirrors the storage-error shape the rest of the workspace uses: a single
//! `#[non_exhaustive]` enum with `thiserror`, one variant per failure class.
//! Stage boundaries catch everything except [`CoreError::InvalidInput`] and
//! [`CoreError::Config`] and record the rest in `metadata.errors`.

/// Pipeline error type.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Validation failure (length, shape, enum out of range). Caller-facing,
    /// never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown id, term, or path. Never surfaced as a hard failure — callers
    /// convert this into an empty result or a "no information" answer.
    #[error("not found: {0}")]
    NotFound(String),

    /// A dependency failure eligible for bounded exponential-backoff retry:
    /// network errors, or HTTP 408/425/429/500/502/503/504.
    #[error("transient error: {0}")]
    Transient(String),

    /// A non-retryable dependency failure: other 4xx status, malformed
    /// response, schema mismatch.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    /// Startup-time contract violation (dimension mismatch, missing
    /// required config). Fails fast at boot, never in the hot path.
    #[error("config error: {0}")]
    Config(String),

    /// The local token-bucket rate limiter blocked longer than its
    /// configured maximum wait.
    #[error("rate limit exceeded for host {host}")]
    RateLimitExceeded {
        /// Host the rate limit applies to.
        host: String,
    },

    /// The query's deadline elapsed before the pipeline could finish.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl CoreError {
    /// Whether this error belongs to the transient class per spec: network
    /// errors or HTTP 408/425/429/500/502/503/504.
    pub fn is_transient_status(status: u16) -> bool {
        matches!(status, 408 | 425 | 429 | 500 | 502 | 503 | 504)
    }

    /// Short machine-readable category name, used in `metadata.errors`.
    pub fn category(&self) -> &'static str {
        match self {
            CoreError::InvalidInput(_) => "invalid_input",
            CoreError::NotFound(_) => "not_found",
            CoreError::Transient(_) => "transient",
            CoreError::UpstreamFailure(_) => "upstream_failure",
            CoreError::Config(_) => "config",
            CoreError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            CoreError::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return CoreError::Transient(err.to_string());
        }
        if let Some(status) = err.status() {
            if CoreError::is_transient_status(status.as_u16()) {
                return CoreError::Transient(format!("http {status}"));
            }
            return CoreError::UpstreamFailure(format!("http {status}"));
        }
        CoreError::UpstreamFailure(err.to_string())
    }
}

/// Pipeline result type.
pub type Result<T> = std::result::Result<T, CoreError>;
