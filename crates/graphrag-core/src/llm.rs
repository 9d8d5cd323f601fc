//! Outbound LLM contract: `generate(prompt, options) -> text`.
//!
//! `embed` lives on [`crate::embeddings::EmbeddingClient`] rather than
//! here, since the embedding model and the generation model are frequently
//! different deployments even though both sit behind the same resilience
//! stack.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::resilience::{BoundedHttpClient, RetryPolicy};

/// Generation options. `temperature = 0` makes output deterministic enough
/// for tests, per the documented contract.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self { temperature: 0.0, max_tokens: 512 }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

/// Canonical response the orchestrator must return when retrieved context
/// is insufficient, rather than letting the LLM fabricate an answer.
pub const INSUFFICIENT_INFORMATION_RESPONSE: &str =
    "I don't have enough information in the knowledge graph to answer that.";

/// Client for the outbound `generate(prompt, options) -> text` contract.
pub struct LlmClient {
    http: BoundedHttpClient,
    retry: RetryPolicy,
    base_url: String,
}

impl LlmClient {
    pub fn new(http: BoundedHttpClient, retry: RetryPolicy, base_url: String) -> Self {
        Self { http, retry, base_url }
    }

    pub async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        let url = format!("{}/generate", self.base_url);
        let prompt = prompt.to_string();
        let options = options.clone();
        self.retry
            .run(|| {
                let url = url.clone();
                let prompt = prompt.clone();
                let options = options.clone();
                async move {
                    let body = GenerateRequest {
                        prompt: &prompt,
                        temperature: options.temperature,
                        max_tokens: options.max_tokens,
                    };
                    let builder = self
                        .http
                        .request(reqwest::Method::POST, &url)
                        .json(&body)
                        .timeout(Duration::from_secs(30));
                    let response = self.http.send(builder).await?;
                    let status = response.status();
                    if !status.is_success() {
                        if CoreError::is_transient_status(status.as_u16()) {
                            return Err(CoreError::Transient(format!("generate http {status}")));
                        }
                        return Err(CoreError::UpstreamFailure(format!("generate http {status}")));
                    }
                    let parsed: GenerateResponse = response
                        .json()
                        .await
                        .map_err(|e| CoreError::UpstreamFailure(format!("invalid generate response: {e}")))?;
                    Ok(parsed.text)
                }
            })
            .await
    }
}
