//! Query pipeline and router: the `Answer(query, options) -> { response,
//! metadata }` entry point. Owns no mutable per-request global state — each
//! call builds its own [`Metadata`] record and threads it through the
//! routing rules in order, recording a decision at every step.

use std::sync::Arc;

use arc_swap::ArcSwap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::aggregation::{try_aggregate, AggregationResult};
use crate::cache::TwoTierCache;
use crate::confidence::{score_query, ConfidenceBucket};
use crate::embeddings::EmbeddingClient;
use crate::error::{CoreError, Result};
use crate::graph::{GraphTraverser, Snapshot};
use crate::llm::{GenerateOptions, LlmClient, INSUFFICIENT_INFORMATION_RESPONSE};
use crate::scope::is_out_of_domain;
use crate::search::{PostFilter, RetrievalEngine, RetrievalParams};
use crate::tools::glossary::GlossarySubsystem;
use crate::tools::ToolCallingAgent;

const MAX_QUERY_LEN: usize = 500;
const CANONICAL_REFUSAL: &str = "That's outside what I can answer from this knowledge graph.";

const GLOSSARY_TRIGGERS: &[&str] = &["define ", "what is ", "what's ", "explain "];
const GLOSSARY_EXCLUSIONS: &[&str] =
    &["how many", "well name for", "curve for", "curves for", "list ", "distinct "];

/// Per-query options recognized by `Answer`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerOptions {
    pub retrieval_limit: Option<usize>,
    pub force_direct_generation: bool,
}

/// Scope-check outcome, folded into `metadata.scope_check`.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeCheck {
    pub in_scope: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Full response metadata, mandatory on every `Answer` call regardless of
/// which routing path was taken.
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub routing_decision: String,
    pub confidence: f32,
    pub confidence_evidence: Vec<String>,
    pub graph_traversal_applied: bool,
    pub num_results: usize,
    pub num_results_after_traversal: usize,
    pub expansion_ratio: f32,
    pub scope_check: ScopeCheck,
    pub structured_extraction: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation_result: Option<AggregationResult>,
    pub tool_invoked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_loop_truncated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_failure: Option<String>,
    pub retrieved_node_ids: Vec<String>,
    pub retrieved_entity_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_applied: Option<bool>,
    pub decision_log: Vec<String>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timed_out: Option<bool>,
}

impl Metadata {
    fn new() -> Self {
        Self {
            routing_decision: String::new(),
            confidence: 0.0,
            confidence_evidence: Vec::new(),
            graph_traversal_applied: false,
            num_results: 0,
            num_results_after_traversal: 0,
            expansion_ratio: 1.0,
            scope_check: ScopeCheck { in_scope: true, reason: None },
            structured_extraction: false,
            aggregation_result: None,
            tool_invoked: false,
            tool_loop_truncated: None,
            tool_failure: None,
            retrieved_node_ids: Vec::new(),
            retrieved_entity_types: Vec::new(),
            filter_applied: None,
            decision_log: Vec::new(),
            errors: Vec::new(),
            fallback_from: None,
            timed_out: None,
        }
    }

    fn log(&mut self, decision: impl Into<String>) {
        self.decision_log.push(decision.into());
    }
}

/// Final answer plus its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub response: String,
    pub metadata: Metadata,
}

/// Owns the hot-swappable graph snapshot and every downstream dependency
/// the routing rules call into.
pub struct Orchestrator {
    snapshot: Arc<ArcSwap<Snapshot>>,
    embeddings: Arc<EmbeddingClient>,
    llm: Arc<LlmClient>,
    retrieval: Arc<RetrievalEngine>,
    glossary: Arc<GlossarySubsystem>,
    #[allow(dead_code)]
    cache: Arc<TwoTierCache>,
}

impl Orchestrator {
    pub fn new(
        snapshot: Arc<ArcSwap<Snapshot>>,
        embeddings: Arc<EmbeddingClient>,
        llm: Arc<LlmClient>,
        retrieval: Arc<RetrievalEngine>,
        glossary: Arc<GlossarySubsystem>,
        cache: Arc<TwoTierCache>,
    ) -> Self {
        Self { snapshot, embeddings, llm, retrieval, glossary, cache }
    }

    /// Runs the full routing pipeline documented in §4.1. The snapshot
    /// referenced by `self.snapshot` is loaded once at the top of the call
    /// and never reloaded mid-query, so the content hash is guaranteed
    /// unchanged across the call even if a concurrent hot-swap occurs.
    pub async fn answer(&self, query: &str, options: &AnswerOptions) -> Result<AnswerResponse> {
        let mut metadata = Metadata::new();

        // 1. Input validation.
        if query.is_empty() {
            return Err(CoreError::InvalidInput("query must not be empty".into()));
        }
        if query.chars().count() > MAX_QUERY_LEN {
            return Err(CoreError::InvalidInput(format!("query exceeds {MAX_QUERY_LEN} characters")));
        }

        let snapshot = self.snapshot.load_full();

        // 2. Scope check.
        if is_out_of_domain(query) {
            metadata.routing_decision = "out_of_domain".to_string();
            metadata.scope_check = ScopeCheck { in_scope: false, reason: Some("out of domain".into()) };
            metadata.log("scope check: out of domain, refusing");
            return Ok(AnswerResponse { response: CANONICAL_REFUSAL.to_string(), metadata });
        }
        metadata.log("scope check: in domain");

        if options.force_direct_generation {
            return self.run_rag(query, options, &snapshot, metadata).await;
        }

        // 3. Aggregation shortcut.
        if let Some(result) = try_aggregate(query, &snapshot) {
            metadata.routing_decision = "aggregation".to_string();
            metadata.aggregation_result = Some(result.clone());
            metadata.log("matched aggregation shortcut");
            let response = render_aggregation(&result);
            return Ok(AnswerResponse { response, metadata });
        }

        // 4. Structured extraction shortcut.
        if let Some(response) = self.try_structured_extraction(query, &snapshot, &mut metadata) {
            metadata.routing_decision = "structured_extraction".to_string();
            metadata.structured_extraction = true;
            return Ok(AnswerResponse { response, metadata });
        }

        // 5. Relationship handling.
        let confidence = score_query(query);
        metadata.confidence = confidence.score;
        metadata.confidence_evidence.push(format!("query scored {:.2}", confidence.score));

        if confidence.bucket >= ConfidenceBucket::Medium {
            if let Some(response) = self.try_relationship(query, &snapshot, &mut metadata) {
                metadata.routing_decision = "relationship".to_string();
                return Ok(AnswerResponse { response, metadata });
            }
        }

        // 6. Tool-calling (glossary) path.
        if is_glossary_trigger(query) {
            metadata.log("matched glossary trigger set");
            let agent = ToolCallingAgent::new(self.llm.clone(), self.glossary.clone());
            let result = agent.run(query).await;
            metadata.tool_invoked = result.tool_invoked;
            if result.truncated {
                metadata.tool_loop_truncated = Some(true);
            }
            if let Some(failure) = result.failure {
                metadata.tool_failure = Some(failure);
                metadata.fallback_from = Some("glossary".to_string());
                warn!("glossary agent failed, falling through to RAG");
            } else if !result.answer.is_empty() {
                metadata.routing_decision = "glossary".to_string();
                return Ok(AnswerResponse { response: result.answer, metadata });
            }
        }

        // 7. Retrieval-augmented generation.
        self.run_rag(query, options, &snapshot, metadata).await
    }

    fn try_structured_extraction(
        &self,
        query: &str,
        snapshot: &Snapshot,
        metadata: &mut Metadata,
    ) -> Option<String> {
        static EXTRACTION_PATTERN: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
            Regex::new(r"(?i)what is the (\w[\w\s]*?) for ([\w/_-]+)\??$").expect("static pattern is valid")
        });

        let caps = EXTRACTION_PATTERN.captures(query.trim())?;
        let attribute = normalize_attribute_name(&caps[1]);
        let entity_id = &caps[2];

        let node = snapshot
            .get_node(entity_id)
            .or_else(|| snapshot.all_nodes().find(|n| n.id.ends_with(entity_id)))?;
        let value = node.attr_str(&attribute)?;
        metadata.log(format!("structured extraction: {attribute} of {entity_id}"));
        Some(value.to_string())
    }

    fn try_relationship(&self, query: &str, snapshot: &Snapshot, metadata: &mut Metadata) -> Option<String> {
        static RELATIONSHIP_PATTERN: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
            Regex::new(r"(?i)(?:which|what) curves (?:does|for) ([\w/_-]+)").expect("static pattern is valid")
        });

        let caps = RELATIONSHIP_PATTERN.captures(query.trim())?;
        let well_id = &caps[1];
        let traverser = GraphTraverser::new(snapshot);
        let curves = traverser.curves_for_well(well_id);
        if curves.is_empty() {
            return None;
        }

        metadata.graph_traversal_applied = true;
        metadata.num_results = curves.len();
        metadata.num_results_after_traversal = curves.len();
        metadata.retrieved_node_ids = curves.iter().map(|n| n.id.clone()).collect();
        metadata.retrieved_entity_types = curves.iter().map(|n| n.node_type.as_str().to_string()).collect();
        metadata.log(format!("relationship: curves for well {well_id}"));

        let names: Vec<String> = curves
            .iter()
            .map(|n| n.attr_str("mnemonic").unwrap_or(n.id.as_str()).to_string())
            .collect();
        Some(names.join(", "))
    }

    async fn run_rag(
        &self,
        query: &str,
        options: &AnswerOptions,
        snapshot: &Snapshot,
        mut metadata: Metadata,
    ) -> Result<AnswerResponse> {
        metadata.routing_decision = "retrieval_augmented_generation".to_string();
        let confidence = score_query(query);
        metadata.confidence = confidence.score;

        let mut params = RetrievalParams::for_confidence(confidence.bucket);
        if let Some(limit) = options.retrieval_limit {
            params.top_k = limit;
        }

        let query_vector = match self.embeddings.embed(&[query.to_string()]).await {
            Ok(mut vectors) => vectors.pop().unwrap_or_default(),
            Err(e) => {
                metadata.errors.push(e.to_string());
                metadata.log("embedding failed, proceeding with empty vector");
                Vec::new()
            }
        };

        let outcome = self
            .retrieval
            .retrieve(query, &query_vector, &params, &PostFilter::default(), snapshot)
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                metadata.errors.push(e.to_string());
                metadata.log("retrieval failed, returning insufficient-information response");
                return Ok(AnswerResponse {
                    response: INSUFFICIENT_INFORMATION_RESPONSE.to_string(),
                    metadata,
                });
            }
        };

        metadata.num_results = outcome.nodes.len();
        metadata.num_results_after_traversal = outcome.nodes.len();
        metadata.expansion_ratio = outcome.expansion_ratio;
        metadata.graph_traversal_applied = params.max_hops > 0;
        metadata.filter_applied = Some(outcome.filter_fallback);
        metadata.retrieved_node_ids = outcome.nodes.iter().map(|n| n.id.clone()).collect();
        metadata.retrieved_entity_types =
            outcome.nodes.iter().map(|n| n.node_type.as_str().to_string()).collect();

        if outcome.nodes.is_empty() {
            metadata.log("no retrieval results, returning insufficient-information response");
            return Ok(AnswerResponse { response: INSUFFICIENT_INFORMATION_RESPONSE.to_string(), metadata });
        }

        let context = render_context(&outcome.nodes);
        let prompt = format!(
            "Answer strictly from the context below. If it is insufficient, reply exactly: \"{}\"\n\nContext:\n{}\n\nQuestion: {}",
            INSUFFICIENT_INFORMATION_RESPONSE, context, query
        );

        match self.llm.generate(&prompt, &GenerateOptions::default()).await {
            Ok(answer) => {
                metadata.log("generated answer from retrieved context");
                Ok(AnswerResponse { response: answer, metadata })
            }
            Err(e) => {
                metadata.errors.push(e.to_string());
                metadata.log("generation failed, returning insufficient-information response");
                Ok(AnswerResponse { response: INSUFFICIENT_INFORMATION_RESPONSE.to_string(), metadata })
            }
        }
    }

}

fn normalize_attribute_name(phrase: &str) -> String {
    phrase.trim().to_lowercase().replace(' ', "_")
}

fn is_glossary_trigger(query: &str) -> bool {
    let lower = query.to_lowercase();
    let triggered = GLOSSARY_TRIGGERS.iter().any(|t| lower.contains(t));
    let excluded = GLOSSARY_EXCLUSIONS.iter().any(|t| lower.contains(t));
    triggered && !excluded
}

fn render_aggregation(result: &AggregationResult) -> String {
    match result {
        AggregationResult::Count { count } => count.to_string(),
        AggregationResult::List { values } | AggregationResult::Distinct { values } => values.join(", "),
    }
}

fn render_context(nodes: &[crate::graph::Node]) -> String {
    nodes
        .iter()
        .map(|n| format!("- {} ({})", n.id, n.node_type.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glossary_trigger_excludes_how_many() {
        assert!(!is_glossary_trigger("how many wells define the field"));
        assert!(is_glossary_trigger("define porosity"));
    }

    #[test]
    fn attribute_name_normalizes_to_snake_case() {
        assert_eq!(normalize_attribute_name("Well Name"), "well_name");
    }
}
