//! Outbound vector store contract.
//!
//! `find` and `batch_find_by_ids` are both idempotent reads against a
//! remote collection; the core never writes to the vector store. Documents
//! come back with `_id`, `entity_type`, `attributes`, and `$vector` per the
//! documented wire shape.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::resilience::{BoundedHttpClient, RetryPolicy};

/// A document as returned by the vector store.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub entity_type: String,
    pub attributes: HashMap<String, Value>,
    #[serde(rename = "$vector")]
    pub vector: Vec<f32>,
    #[serde(default)]
    pub similarity: f32,
}

/// Metadata filter applied server-side by the vector store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VectorFilter {
    pub entity_types: Vec<String>,
    pub attribute_equals: HashMap<String, Value>,
}

/// Outbound vector store contract used by the retrieval engine.
#[async_trait]
pub trait VectorStoreClient: Send + Sync {
    async fn find(
        &self,
        collection: &str,
        vector: &[f32],
        filter: &VectorFilter,
        limit: usize,
    ) -> Result<Vec<VectorDocument>>;

    async fn batch_find_by_ids(&self, collection: &str, ids: &[String]) -> Result<Vec<VectorDocument>>;
}

#[derive(Serialize)]
struct FindRequest<'a> {
    collection: &'a str,
    #[serde(rename = "$vector")]
    vector: &'a [f32],
    filter: &'a VectorFilter,
    limit: usize,
}

#[derive(Serialize)]
struct BatchFindRequest<'a> {
    collection: &'a str,
    ids: &'a [String],
}

#[derive(Deserialize)]
struct FindResponse {
    documents: Vec<VectorDocument>,
}

/// HTTP-backed vector store client.
pub struct HttpVectorStore {
    http: BoundedHttpClient,
    retry: RetryPolicy,
    base_url: String,
}

impl HttpVectorStore {
    pub fn new(http: BoundedHttpClient, retry: RetryPolicy, base_url: String) -> Self {
        Self { http, retry, base_url }
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<FindResponse> {
        let url = format!("{}/{}", self.base_url, path);
        self.retry
            .run(|| async {
                let builder = self
                    .http
                    .request(reqwest::Method::POST, &url)
                    .json(body)
                    .timeout(Duration::from_secs(5));
                let response = self.http.send(builder).await?;
                let status = response.status();
                if !status.is_success() {
                    if CoreError::is_transient_status(status.as_u16()) {
                        return Err(CoreError::Transient(format!("vector store http {status}")));
                    }
                    return Err(CoreError::UpstreamFailure(format!("vector store http {status}")));
                }
                response
                    .json()
                    .await
                    .map_err(|e| CoreError::UpstreamFailure(format!("invalid vector store response: {e}")))
            })
            .await
    }
}

#[async_trait]
impl VectorStoreClient for HttpVectorStore {
    async fn find(
        &self,
        collection: &str,
        vector: &[f32],
        filter: &VectorFilter,
        limit: usize,
    ) -> Result<Vec<VectorDocument>> {
        let request = FindRequest { collection, vector, filter, limit };
        Ok(self.post("find", &request).await?.documents)
    }

    async fn batch_find_by_ids(&self, collection: &str, ids: &[String]) -> Result<Vec<VectorDocument>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let request = BatchFindRequest { collection, ids };
        Ok(self.post("batch_find_by_ids", &request).await?.documents)
    }
}
