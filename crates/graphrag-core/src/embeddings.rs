//! Remote embedding client with request-level caching.
//!
//! The core never runs inference locally — embedding and generation are
//! both external contracts (see [`crate::llm`]). This module batches
//! `embed` calls, enforces the documented batch-size cap, and folds in the
//! two-tier cache so that repeated `(text, model)` pairs are served from
//! cache within TTL.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::TwoTierCache;
use crate::error::{CoreError, Result};
use crate::resilience::{BoundedHttpClient, RetryPolicy};

/// Maximum number of texts accepted in a single `embed` call.
pub const MAX_BATCH_SIZE: usize = 500;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    vectors: Vec<Vec<f32>>,
}

/// Client for the outbound `embed(texts[]) -> vectors[]` contract.
pub struct EmbeddingClient {
    http: BoundedHttpClient,
    retry: RetryPolicy,
    base_url: String,
    model_id: String,
    dimension: usize,
    cache: Arc<TwoTierCache>,
    cache_ttl: Duration,
}

impl EmbeddingClient {
    pub fn new(
        http: BoundedHttpClient,
        retry: RetryPolicy,
        base_url: String,
        model_id: String,
        dimension: usize,
        cache: Arc<TwoTierCache>,
        cache_ttl: Duration,
    ) -> Self {
        Self { http, retry, base_url, model_id, dimension, cache, cache_ttl }
    }

    /// Embeds `texts`, serving any cached `(model_id, text)` pairs from the
    /// two-tier cache and only calling out for the remainder. Rejects
    /// batches over [`MAX_BATCH_SIZE`] as invalid input rather than
    /// silently chunking, since chunking would change the semantics of a
    /// single outbound call.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() > MAX_BATCH_SIZE {
            return Err(CoreError::InvalidInput(format!(
                "embed batch size {} exceeds max {}",
                texts.len(),
                MAX_BATCH_SIZE
            )));
        }

        let mut result = vec![None; texts.len()];
        let mut miss_indices = Vec::new();
        let mut miss_texts = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let key = self.cache_key(text);
            let (hit, _) = self.cache.get(&key).await;
            if let Some(raw) = hit {
                if let Ok(vector) = serde_json::from_str::<Vec<f32>>(&raw) {
                    result[i] = Some(vector);
                    continue;
                }
            }
            miss_indices.push(i);
            miss_texts.push(text.clone());
        }

        if !miss_texts.is_empty() {
            debug!(misses = miss_texts.len(), hits = texts.len() - miss_texts.len(), "embedding cache");
            let fetched = self.embed_remote(&miss_texts).await?;
            if fetched.len() != miss_texts.len() {
                return Err(CoreError::UpstreamFailure(
                    "embedding response length mismatch".into(),
                ));
            }
            for (idx, vector) in miss_indices.into_iter().zip(fetched.into_iter()) {
                if vector.len() != self.dimension {
                    return Err(CoreError::UpstreamFailure(format!(
                        "embedding dimension {} does not match configured {}",
                        vector.len(),
                        self.dimension
                    )));
                }
                let key = self.cache_key(&texts[idx]);
                if let Ok(raw) = serde_json::to_string(&vector) {
                    self.cache.set(&key, &raw, self.cache_ttl).await;
                }
                result[idx] = Some(vector);
            }
        }

        Ok(result.into_iter().map(|v| v.expect("every index filled")).collect())
    }

    fn cache_key(&self, text: &str) -> String {
        format!("embed:{}:{}", self.model_id, text)
    }

    async fn embed_remote(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let texts = texts.to_vec();
        let url = format!("{}/embed", self.base_url);
        self.retry
            .run(|| {
                let url = url.clone();
                let texts = texts.clone();
                async move {
                    let body = EmbedRequest { model: &self.model_id, input: &texts };
                    let builder = self
                        .http
                        .request(reqwest::Method::POST, &url)
                        .json(&body)
                        .timeout(Duration::from_secs(5));
                    let response = self.http.send(builder).await?;
                    let status = response.status();
                    if !status.is_success() {
                        if CoreError::is_transient_status(status.as_u16()) {
                            return Err(CoreError::Transient(format!("embed http {status}")));
                        }
                        return Err(CoreError::UpstreamFailure(format!("embed http {status}")));
                    }
                    let parsed: EmbedResponse = response
                        .json()
                        .await
                        .map_err(|e| CoreError::UpstreamFailure(format!("invalid embed response: {e}")))?;
                    Ok(parsed.vectors)
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NullPrimaryCache;

    fn client() -> EmbeddingClient {
        EmbeddingClient::new(
            BoundedHttpClient::new(4).unwrap(),
            RetryPolicy::default(),
            "http://localhost:1".into(),
            "test-model".into(),
            3,
            Arc::new(TwoTierCache::new(Box::new(NullPrimaryCache), 100)),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn empty_input_returns_empty_without_network() {
        let c = client();
        let result = c.embed(&[]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn oversized_batch_is_invalid_input() {
        let c = client();
        let texts: Vec<String> = (0..MAX_BATCH_SIZE + 1).map(|i| i.to_string()).collect();
        let result = c.embed(&texts).await;
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn cached_entry_is_returned_without_a_remote_call() {
        let c = client();
        let key = c.cache_key("hello");
        c.cache.set(&key, "[0.1,0.2,0.3]", Duration::from_secs(60)).await;
        let result = c.embed(&["hello".to_string()]).await.unwrap();
        assert_eq!(result, vec![vec![0.1, 0.2, 0.3]]);
    }
}
