//! Bounded-concurrency async HTTP client shared by all outbound calls
//! (vector store, LLM, glossary). A single `reqwest::Client` lives for the
//! process; concurrency is capped by a semaphore rather than by the
//! connection pool, so callers get a predictable upper bound on in-flight
//! requests regardless of per-host pool size.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, SemaphorePermit};

use crate::error::{CoreError, Result};

/// Shared HTTP client with a process-wide concurrency cap.
#[derive(Clone)]
pub struct BoundedHttpClient {
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
}

impl BoundedHttpClient {
    pub fn new(max_concurrent_requests: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| CoreError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self { client, semaphore: Arc::new(Semaphore::new(max_concurrent_requests)) })
    }

    async fn acquire(&self) -> SemaphorePermit<'_> {
        self.semaphore.acquire().await.expect("semaphore is never closed")
    }

    /// Issues `request`, waiting for a concurrency slot first. The caller
    /// sets its own per-call timeout via `reqwest::RequestBuilder::timeout`.
    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        let _permit = self.acquire().await;
        self.client.execute(request).await.map_err(CoreError::from)
    }

    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client.request(method, url)
    }

    /// Sends a pre-built request builder, waiting for a concurrency slot.
    pub async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let _permit = self.acquire().await;
        builder.send().await.map_err(CoreError::from)
    }
}
