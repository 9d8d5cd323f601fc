//! JSON-RPC server core.
//!
//! Routes incoming requests to the `answer` operation backed by a shared
//! [`graphrag_core::Orchestrator`]. Unlike a stateful session protocol,
//! there is no initialization handshake: the orchestrator is ready the
//! moment it is constructed, so every request can be served independently.

use std::sync::Arc;

use graphrag_core::{AnswerOptions, Orchestrator};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::protocol::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

#[derive(Debug, Deserialize)]
struct AnswerParams {
    query: String,
    #[serde(default)]
    options: AnswerOptions,
}

/// The JSON-RPC front end's request router.
pub struct AnswerServer {
    orchestrator: Arc<Orchestrator>,
}

impl AnswerServer {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Handle an incoming JSON-RPC request, returning `None` for
    /// notifications (requests with no `id`).
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "handling request");

        let result = match request.method.as_str() {
            "answer" => self.handle_answer(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            method => {
                warn!(method, "unknown method");
                Err(JsonRpcError::method_not_found())
            }
        };

        if request.id.is_none() {
            return None;
        }

        Some(match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(error) => JsonRpcResponse::error(request.id, error),
        })
    }

    async fn handle_answer(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let params: AnswerParams = match params {
            Some(p) => serde_json::from_value(p)
                .map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("missing params.query")),
        };

        let response = self
            .orchestrator
            .answer(&params.query, &params.options)
            .await
            .map_err(|e| JsonRpcError::from_core_error(&e))?;

        serde_json::to_value(response).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }
}
