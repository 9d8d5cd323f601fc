//! Graph snapshot builders and an orchestrator wiring helper for the
//! end-to-end tests. Every backend dependency (vector store, LLM, glossary
//! source) is reached over HTTP, so tests point these at `wiremock` servers
//! rather than stubbing the core's traits directly — this exercises the
//! same wire contracts a real deployment does.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use graphrag_core::cache::{NullPrimaryCache, PrimaryCache, TwoTierCache};
use graphrag_core::config::GlossarySourceConfig;
use graphrag_core::embeddings::EmbeddingClient;
use graphrag_core::graph::{Edge, Node, NodeType, Snapshot};
use graphrag_core::llm::LlmClient;
use graphrag_core::resilience::{BoundedHttpClient, HostRateLimiter, RetryPolicy};
use graphrag_core::search::{HttpVectorStore, RetrievalEngine};
use graphrag_core::tools::glossary::GlossarySubsystem;
use graphrag_core::Orchestrator;

/// A primary cache tier that always fails, for exercising the two-tier
/// cache's fallback-to-LRU behavior (mirrors `graphrag_core::cache`'s own
/// private test double, which isn't exported).
pub struct AlwaysFailingPrimary;

#[async_trait::async_trait]
impl PrimaryCache for AlwaysFailingPrimary {
    async fn get(&self, _key: &str) -> Result<Option<String>, String> {
        Err("primary unreachable".to_string())
    }
    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), String> {
        Err("primary unreachable".to_string())
    }
    async fn invalidate(&self, _key: &str) -> Result<(), String> {
        Err("primary unreachable".to_string())
    }
}

pub const WELL_ID: &str = "well-15_9-13";
pub const WELL_NAME: &str = "Sleipner East Appr";
pub const CURVE_COUNT_FOR_WELL: usize = 21;
pub const WELL_DATASET_SIZE: usize = 118;

/// `well-15_9-13` with 21 incoming `describes` edges from distinct curve
/// nodes, matching end-to-end scenario 1.
pub fn well_with_curves_snapshot() -> Snapshot {
    let mut well = Node::new(WELL_ID, NodeType::Document);
    well.set_attr("well_name", serde_json::json!(WELL_NAME));

    let mut nodes = vec![well];
    let mut edges = Vec::new();
    for i in 0..CURVE_COUNT_FOR_WELL {
        let curve_id = format!("curve-{i:02}");
        let mut curve = Node::new(&curve_id, NodeType::Curve);
        curve.set_attr("mnemonic", serde_json::json!(format!("MNEM{i:02}")));
        nodes.push(curve);
        edges.push(Edge {
            source: curve_id,
            target: WELL_ID.to_string(),
            relation: graphrag_core::graph::model::RELATION_DESCRIBES.to_string(),
            weight: None,
        });
    }
    Snapshot::build(nodes, edges)
}

/// `count` distinct well nodes, matching end-to-end scenario 2 (118 wells).
pub fn wells_count_snapshot(count: usize) -> Snapshot {
    let nodes = (0..count)
        .map(|i| Node::new(format!("well-{i:03}"), NodeType::Well))
        .collect();
    Snapshot::build(nodes, Vec::new())
}

/// A single well carrying `well_name`, matching end-to-end scenario 3.
pub fn well_name_snapshot() -> Snapshot {
    let mut well = Node::new(WELL_ID, NodeType::Document);
    well.set_attr("well_name", serde_json::json!(WELL_NAME));
    Snapshot::build(vec![well], Vec::new())
}

pub fn empty_snapshot() -> Snapshot {
    Snapshot::build(Vec::new(), Vec::new())
}

/// Every backend endpoint the orchestrator is wired to, as base URLs.
/// Defaults point at an unroutable localhost port so a test only needs to
/// override the endpoints it actually exercises.
pub struct Backends {
    pub vector_store_url: String,
    pub llm_url: String,
    pub glossary_source_url: String,
    pub embedding_dimension: usize,
    pub primary_cache: Box<dyn PrimaryCache>,
    pub rate_limit_refill_per_sec: f64,
}

impl Default for Backends {
    fn default() -> Self {
        Self {
            vector_store_url: "http://localhost:1".to_string(),
            llm_url: "http://localhost:1".to_string(),
            glossary_source_url: "http://localhost:1".to_string(),
            embedding_dimension: 3,
            primary_cache: Box::new(NullPrimaryCache),
            rate_limit_refill_per_sec: 1000.0,
        }
    }
}

/// Builds a fully-wired orchestrator over `snapshot` and `backends`.
pub fn build_orchestrator(snapshot: Snapshot, backends: Backends) -> Orchestrator {
    let http = BoundedHttpClient::new(16).expect("http client");
    let retry = RetryPolicy::default();
    let cache = Arc::new(TwoTierCache::new(backends.primary_cache, 1000));

    let embeddings = Arc::new(EmbeddingClient::new(
        http.clone(),
        retry,
        backends.vector_store_url.clone(),
        "test-model".to_string(),
        backends.embedding_dimension,
        cache.clone(),
        Duration::from_secs(900),
    ));

    let llm = Arc::new(LlmClient::new(http.clone(), retry, backends.llm_url));

    let vector_store = Arc::new(HttpVectorStore::new(http.clone(), retry, backends.vector_store_url));
    let retrieval = Arc::new(RetrievalEngine::new(vector_store, "well_logs".to_string()));

    let rate_limiter = Arc::new(HostRateLimiter::new(backends.rate_limit_refill_per_sec));
    let sources = vec![GlossarySourceConfig {
        name: "test-source".to_string(),
        url_template: format!("{}/terms/{{term}}", backends.glossary_source_url),
        selectors: vec![".definition".to_string()],
    }];
    let glossary = Arc::new(GlossarySubsystem::new(
        http,
        retry,
        rate_limiter,
        cache.clone(),
        sources,
        "graphrag-e2e-tests/1.0".to_string(),
    ));

    let snapshot = Arc::new(ArcSwap::from_pointee(snapshot));

    Orchestrator::new(snapshot, embeddings, llm, retrieval, glossary, cache)
}

/// Builds a standalone `GlossarySubsystem` against `source_url`, backed by
/// `primary_cache`. Used by tests exercising the cache/scraping layer
/// directly, without routing through the full orchestrator.
pub fn build_glossary(source_url: String, primary_cache: Box<dyn PrimaryCache>) -> GlossarySubsystem {
    let http = BoundedHttpClient::new(16).expect("http client");
    let retry = RetryPolicy::default();
    let cache = Arc::new(TwoTierCache::new(primary_cache, 1000));
    let rate_limiter = Arc::new(HostRateLimiter::new(1000.0));
    let sources = vec![GlossarySourceConfig {
        name: "test-source".to_string(),
        url_template: format!("{source_url}/terms/{{term}}"),
        selectors: vec![".definition".to_string()],
    }];
    GlossarySubsystem::new(http, retry, rate_limiter, cache, sources, "graphrag-e2e-tests/1.0".to_string())
}
