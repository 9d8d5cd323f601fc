//! Optional HTTP transport for the JSON-RPC front end.
//!
//! A single `POST /rpc` endpoint accepting a JSON-RPC request body and
//! returning a JSON-RPC response. There is no session handshake: every
//! request is independent, since [`AnswerServer`] holds no per-client state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use super::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::server::AnswerServer;

/// Configuration for the HTTP transport.
pub struct HttpTransportConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3100,
        }
    }
}

/// HTTP transport for the JSON-RPC front end.
pub struct HttpTransport {
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Self {
        Self { config }
    }

    /// Run the server over HTTP, serving `POST /rpc`.
    pub async fn run(self, server: Arc<AnswerServer>) -> Result<(), std::io::Error> {
        let app = Router::new()
            .route("/rpc", post(handle_rpc))
            .layer(CorsLayer::permissive())
            .with_state(server);

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        info!("HTTP transport listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP transport shutting down");
        Ok(())
    }
}

/// POST /rpc — handle a single JSON-RPC request.
async fn handle_rpc(State(server): State<Arc<AnswerServer>>, body: String) -> Response {
    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!("failed to parse JSON-RPC request: {}", e);
            let error_resp = JsonRpcResponse::error(None, JsonRpcError::parse_error());
            return (
                StatusCode::BAD_REQUEST,
                [(header::CONTENT_TYPE, "application/json".parse().unwrap())],
                serde_json::to_string(&error_resp).unwrap_or_default(),
            )
                .into_response();
        }
    };

    match server.handle_request(request).await {
        Some(resp) => {
            let json = serde_json::to_string(&resp).unwrap_or_else(|e| {
                error!("failed to serialize response: {}", e);
                r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#
                    .to_string()
            });

            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json".parse().unwrap())],
                json,
            )
                .into_response()
        }
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
