//! JSON-RPC 2.0 types for the `answer` front end.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version
pub const JSONRPC_VERSION: &str = "2.0";

// ============================================================================
// JSON-RPC REQUEST/RESPONSE
// ============================================================================

/// JSON-RPC Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

// ============================================================================
// JSON-RPC ERROR
// ============================================================================

/// JSON-RPC error codes: the standard block plus an application-specific
/// range (-32000 to -32099) mirroring `graphrag_core::CoreError`.
#[derive(Debug, Clone, Copy)]
pub enum ErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,

    RequestTimeout = -32000,
    NotFound = -32001,
    UpstreamFailure = -32002,
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code as i32
    }
}

/// JSON-RPC Error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: ErrorCode, message: &str) -> Self {
        Self {
            code: code.into(),
            message: message.to_string(),
            data: None,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(ErrorCode::ParseError, "Parse error")
    }

    pub fn method_not_found() -> Self {
        Self::new(ErrorCode::MethodNotFound, "Method not found")
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn request_timeout(message: &str) -> Self {
        Self::new(ErrorCode::RequestTimeout, message)
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn upstream_failure(message: &str) -> Self {
        Self::new(ErrorCode::UpstreamFailure, message)
    }

    /// Maps a core error to the JSON-RPC error it should surface as.
    pub fn from_core_error(err: &graphrag_core::CoreError) -> Self {
        use graphrag_core::CoreError;
        match err {
            CoreError::InvalidInput(msg) => Self::invalid_params(msg),
            CoreError::NotFound(msg) => Self::not_found(msg),
            CoreError::DeadlineExceeded => Self::request_timeout(&err.to_string()),
            CoreError::Transient(msg) | CoreError::UpstreamFailure(msg) => {
                Self::upstream_failure(msg)
            }
            CoreError::RateLimitExceeded { host } => {
                Self::upstream_failure(&format!("rate limit exceeded for host {host}"))
            }
            CoreError::Config(msg) => Self::internal_error(msg),
            other => Self::internal_error(&other.to_string()),
        }
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

// ============================================================================
// TESTS
// ============================================================================
