//! Retrieval engine: vector search, rerank, post-filter, and seed-based
//! graph expansion in a single call. This is the component behind routing
//! step 7 (retrieval-augmented generation) and is also reused directly by
//! callers that only need retrieved context without generation.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::confidence::ConfidenceBucket;
use crate::error::Result;
use crate::graph::{Direction, GraphTraverser, Node, Snapshot};
use crate::search::reranker::{rerank, RankedCandidate, RerankWeights};
use crate::search::vector_store::{VectorDocument, VectorFilter, VectorStoreClient};

/// Keyword filter semantics, chosen from confidence per §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    And,
    Or,
}

/// Inputs tuned by query confidence before a retrieval call.
#[derive(Debug, Clone)]
pub struct RetrievalParams {
    pub top_k: usize,
    pub weights: RerankWeights,
    pub filter_mode: FilterMode,
    pub max_hops: u32,
}

impl RetrievalParams {
    pub fn for_confidence(bucket: ConfidenceBucket) -> Self {
        match bucket {
            ConfidenceBucket::High => Self {
                top_k: 30,
                weights: RerankWeights::HIGH_CONFIDENCE,
                filter_mode: FilterMode::Or,
                max_hops: 2,
            },
            ConfidenceBucket::Medium => Self {
                top_k: 15,
                weights: RerankWeights::DEFAULT,
                filter_mode: FilterMode::And,
                max_hops: 1,
            },
            ConfidenceBucket::Low => Self {
                top_k: 10,
                weights: RerankWeights::DEFAULT,
                filter_mode: FilterMode::And,
                max_hops: 0,
            },
        }
    }
}

/// Keyword-based post-filter: a value in `attribute` must match one of
/// `values` (under OR semantics, any attribute/value pair matching is
/// enough; under AND, every attribute listed must match).
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub attribute_values: HashMap<String, Vec<String>>,
}

impl PostFilter {
    pub fn is_empty(&self) -> bool {
        self.attribute_values.is_empty()
    }

    fn matches(&self, doc: &VectorDocument, mode: FilterMode) -> bool {
        if self.attribute_values.is_empty() {
            return true;
        }
        let check = |attr: &str, values: &[String]| -> bool {
            doc.attributes
                .get(attr)
                .and_then(|v| v.as_str())
                .map(|s| values.iter().any(|want| want == s))
                .unwrap_or(false)
        };
        match mode {
            FilterMode::Or => self.attribute_values.iter().any(|(attr, values)| check(attr, values)),
            FilterMode::And => self.attribute_values.iter().all(|(attr, values)| check(attr, values)),
        }
    }
}

/// Outcome of one `retrieve` call, including the diagnostics the
/// orchestrator folds into `metadata`.
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub nodes: Vec<Node>,
    pub filter_fallback: bool,
    pub expansion_ratio: f32,
}

pub struct RetrievalEngine {
    vector_store: Arc<dyn VectorStoreClient>,
    collection: String,
}

impl RetrievalEngine {
    pub fn new(vector_store: Arc<dyn VectorStoreClient>, collection: String) -> Self {
        Self { vector_store, collection }
    }

    /// Runs the full retrieval algorithm documented in §4.2: vector search
    /// with `k_initial = max(top_k * 3, 50)`, rerank to `top_k`, post-filter
    /// with an AND→OR fallback, then optional graph expansion from the
    /// resulting seeds.
    pub async fn retrieve(
        &self,
        query: &str,
        query_vector: &[f32],
        params: &RetrievalParams,
        filter: &PostFilter,
        snapshot: &Snapshot,
    ) -> Result<RetrievalOutcome> {
        let k_initial = (params.top_k * 3).max(50);

        let candidates = self
            .vector_store
            .find(&self.collection, query_vector, &VectorFilter::default(), k_initial)
            .await?;

        let ranked = rerank(query, candidates, params.weights, params.top_k);

        let (filtered, filter_fallback) = self.apply_post_filter(ranked, filter, params.filter_mode);

        let before_count = filtered.len();
        let mut nodes: Vec<Node> = filtered
            .into_iter()
            .filter_map(|c| document_to_node(&c.document, snapshot))
            .collect();

        if params.max_hops > 0 && !nodes.is_empty() {
            let traverser = GraphTraverser::new(snapshot);
            let seeds: Vec<&Node> = nodes.iter().collect();
            let expanded = traverser.expand(&seeds, Direction::Both, None, params.max_hops)?;
            nodes = merge_preserving_order(nodes.clone(), expanded.into_iter().cloned().collect());
        }

        let expansion_ratio = nodes.len() as f32 / before_count.max(1) as f32;

        Ok(RetrievalOutcome { nodes, filter_fallback, expansion_ratio })
    }

    fn apply_post_filter(
        &self,
        ranked: Vec<RankedCandidate>,
        filter: &PostFilter,
        mode: FilterMode,
    ) -> (Vec<RankedCandidate>, bool) {
        if filter.is_empty() {
            return (ranked, false);
        }
        let first_pass: Vec<RankedCandidate> =
            ranked.iter().filter(|c| filter.matches(&c.document, mode)).cloned().collect();

        if first_pass.is_empty() && mode == FilterMode::And {
            let or_pass: Vec<RankedCandidate> =
                ranked.into_iter().filter(|c| filter.matches(&c.document, FilterMode::Or)).collect();
            return (or_pass, true);
        }

        (first_pass, false)
    }
}

fn document_to_node(doc: &VectorDocument, snapshot: &Snapshot) -> Option<Node> {
    if let Some(existing) = snapshot.get_node(&doc.id) {
        return Some(existing.clone());
    }
    let mut node = Node::new(&doc.id, parse_node_type(&doc.entity_type));
    for (k, v) in &doc.attributes {
        node.set_attr(k, v.clone());
    }
    Some(node)
}

fn parse_node_type(entity_type: &str) -> crate::graph::NodeType {
    serde_json::from_value(Value::String(entity_type.to_string())).unwrap_or(crate::graph::NodeType::Other)
}

fn merge_preserving_order(base: Vec<Node>, expanded: Vec<Node>) -> Vec<Node> {
    let mut seen: std::collections::HashSet<String> = base.iter().map(|n| n.id.clone()).collect();
    let mut merged = base;
    for node in expanded {
        if seen.insert(node.id.clone()) {
            merged.push(node);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, NodeType};
    use async_trait::async_trait;

    struct StubVectorStore {
        docs: Vec<VectorDocument>,
    }

    #[async_trait]
    impl VectorStoreClient for StubVectorStore {
        async fn find(
            &self,
            _collection: &str,
            _vector: &[f32],
            _filter: &VectorFilter,
            _limit: usize,
        ) -> Result<Vec<VectorDocument>> {
            Ok(self.docs.clone())
        }
        async fn batch_find_by_ids(&self, _collection: &str, _ids: &[String]) -> Result<Vec<VectorDocument>> {
            Ok(Vec::new())
        }
    }

    fn doc(id: &str, similarity: f32) -> VectorDocument {
        VectorDocument {
            id: id.to_string(),
            entity_type: "curve".to_string(),
            attributes: HashMap::new(),
            vector: vec![],
            similarity,
        }
    }

    #[tokio::test]
    async fn empty_vector_results_yield_empty_nodes() {
        let engine = RetrievalEngine::new(Arc::new(StubVectorStore { docs: vec![] }), "c".into());
        let snapshot = Snapshot::build(vec![], vec![]);
        let params = RetrievalParams::for_confidence(ConfidenceBucket::Low);
        let outcome = engine
            .retrieve("porosity", &[0.1, 0.2], &params, &PostFilter::default(), &snapshot)
            .await
            .unwrap();
        assert!(outcome.nodes.is_empty());
    }

    #[tokio::test]
    async fn zero_max_hops_does_not_expand() {
        let nodes = vec![Node::new("a", NodeType::Curve)];
        let snapshot = Snapshot::build(nodes, Vec::<Edge>::new());
        let engine = RetrievalEngine::new(Arc::new(StubVectorStore { docs: vec![doc("a", 0.9)] }), "c".into());
        let params = RetrievalParams::for_confidence(ConfidenceBucket::Low);
        let outcome = engine
            .retrieve("a", &[0.1], &params, &PostFilter::default(), &snapshot)
            .await
            .unwrap();
        assert_eq!(outcome.nodes.len(), 1);
        assert_eq!(outcome.expansion_ratio, 1.0);
    }

    #[test]
    fn params_scale_monotonically_with_confidence() {
        let high = RetrievalParams::for_confidence(ConfidenceBucket::High);
        let medium = RetrievalParams::for_confidence(ConfidenceBucket::Medium);
        let low = RetrievalParams::for_confidence(ConfidenceBucket::Low);
        assert!(high.top_k >= medium.top_k);
        assert!(medium.top_k >= low.top_k);
        assert!(high.max_hops >= medium.max_hops);
        assert!(medium.max_hops >= low.max_hops);
    }
}
