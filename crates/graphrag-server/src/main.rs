//! GraphRAG server: wires `graphrag-core`'s orchestrator to a JSON-RPC front
//! end over stdio (default) and, optionally, HTTP.
//!
//! Exit codes (for a CLI wrapper driving a single request, and for fatal
//! startup failures): 0 success, 2 invalid input / config error, 3 upstream
//! failure, 4 timeout.

mod protocol;
mod server;

use std::io;
use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::Parser;
use graphrag_core::cache::{NullPrimaryCache, TwoTierCache};
use graphrag_core::config::Config;
use graphrag_core::embeddings::EmbeddingClient;
use graphrag_core::graph::load_snapshot_dir;
use graphrag_core::llm::LlmClient;
use graphrag_core::resilience::{BoundedHttpClient, HostRateLimiter, RetryPolicy};
use graphrag_core::search::{HttpVectorStore, RetrievalEngine};
use graphrag_core::tools::glossary::GlossarySubsystem;
use graphrag_core::Orchestrator;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "http")]
use crate::protocol::http::{HttpTransport, HttpTransportConfig};
use crate::protocol::stdio::StdioTransport;
use crate::server::AnswerServer;

#[derive(Parser, Debug)]
#[command(name = "graphrag-server", version, about = "JSON-RPC front end for graphrag-core")]
struct Cli {
    /// Serve over HTTP (POST /rpc) in addition to stdio.
    #[arg(long)]
    http: bool,

    /// Host to bind the HTTP transport to.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind the HTTP transport to.
    #[arg(long, default_value_t = 3100)]
    port: u16,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    info!("graphrag-server v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("configuration error: {}", e);
            std::process::exit(2);
        }
    };

    let snapshot = match load_snapshot_dir(&config.graph_dir, &config.embedding_model_id) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to load graph snapshot: {}", e);
            std::process::exit(2);
        }
    };
    info!(graph_dir = %config.graph_dir.display(), "graph snapshot loaded");

    let orchestrator = Arc::new(build_orchestrator(config, snapshot));

    if cli.http {
        #[cfg(feature = "http")]
        {
            let server = Arc::new(AnswerServer::new(orchestrator));
            let http_config = HttpTransportConfig { host: cli.host, port: cli.port };
            let transport = HttpTransport::new(http_config);
            info!("starting HTTP transport");
            if let Err(e) = transport.run(server).await {
                error!("HTTP transport error: {}", e);
                std::process::exit(1);
            }
        }
        #[cfg(not(feature = "http"))]
        {
            error!("--http was requested but this build was compiled without the `http` feature");
            std::process::exit(2);
        }
    } else {
        let server = AnswerServer::new(orchestrator);
        let transport = StdioTransport::new();
        info!("starting stdio transport");
        if let Err(e) = transport.run(server).await {
            error!("stdio transport error: {}", e);
            std::process::exit(1);
        }
    }

    info!("graphrag-server shutting down");
}

fn build_orchestrator(config: Config, snapshot: graphrag_core::graph::Snapshot) -> Orchestrator {
    let http = BoundedHttpClient::new(config.max_concurrent_requests)
        .unwrap_or_else(|e| {
            error!("failed to build HTTP client: {}", e);
            std::process::exit(2);
        });
    let retry = RetryPolicy::new(config.retry_max_retries, config.retry_base_delay, config.retry_backoff_factor);

    if config.primary_cache_url.is_some() {
        warn!("GRAPHRAG_PRIMARY_CACHE_URL is set but no distributed cache backend is wired; falling back to the in-process cache only");
    }
    let cache = Arc::new(TwoTierCache::new(Box::new(NullPrimaryCache), config.max_memory_cache_size));

    let embeddings = Arc::new(EmbeddingClient::new(
        http.clone(),
        retry,
        config.vector_store_url.clone(),
        config.embedding_model_id.clone(),
        config.embedding_dimension,
        cache.clone(),
        config.glossary_cache_ttl,
    ));

    let llm = Arc::new(LlmClient::new(http.clone(), retry, config.llm_url.clone()));

    let vector_store = Arc::new(HttpVectorStore::new(http.clone(), retry, config.vector_store_url.clone()));
    let retrieval = Arc::new(RetrievalEngine::new(vector_store, config.vector_store_collection.clone()));

    let rate_limiter = Arc::new(HostRateLimiter::new(config.rate_limit_refill_per_sec));
    let glossary = Arc::new(GlossarySubsystem::new(
        http,
        retry,
        rate_limiter,
        cache.clone(),
        config.glossary_sources.clone(),
        config.glossary_user_agent.clone(),
    ));

    let snapshot = Arc::new(ArcSwap::from_pointee(snapshot));

    Orchestrator::new(snapshot, embeddings, llm, retrieval, glossary, cache)
}
