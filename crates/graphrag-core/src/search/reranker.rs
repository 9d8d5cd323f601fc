//! Reranks vector-search candidates by a weighted sum of normalized vector
//! similarity and lexical (keyword) overlap. Ordering is stable: ties are
//! broken by `id` ascending so that repeated calls against the same
//! snapshot and cache state are deterministic.

use crate::search::vector_store::VectorDocument;

/// Reranker weights `(vector, keyword)`, chosen by the caller from query
/// confidence.
#[derive(Debug, Clone, Copy)]
pub struct RerankWeights {
    pub vector: f32,
    pub keyword: f32,
}

impl RerankWeights {
    pub const HIGH_CONFIDENCE: Self = Self { vector: 0.6, keyword: 0.4 };
    pub const DEFAULT: Self = Self { vector: 0.7, keyword: 0.3 };
}

/// A ranked candidate: the original document plus its blended score.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub document: VectorDocument,
    pub score: f32,
}

/// Reranks `candidates` against `query`, keeping at most `top_k`. Vector
/// similarity is assumed already normalized to `[0, 1]` by the vector
/// store (cosine similarity); keyword overlap is computed here as the
/// fraction of query terms present in the candidate's searchable text.
pub fn rerank(
    query: &str,
    candidates: Vec<VectorDocument>,
    weights: RerankWeights,
    top_k: usize,
) -> Vec<RankedCandidate> {
    let query_terms: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();

    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .map(|doc| {
            let keyword_score = keyword_overlap(&query_terms, &doc);
            let score = weights.vector * doc.similarity + weights.keyword * keyword_score;
            RankedCandidate { document: doc, score }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document.id.cmp(&b.document.id))
    });

    ranked.truncate(top_k);
    ranked
}

fn keyword_overlap(query_terms: &[String], doc: &VectorDocument) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let haystack = searchable_text(doc);
    let hits = query_terms.iter().filter(|term| haystack.contains(term.as_str())).count();
    hits as f32 / query_terms.len() as f32
}

fn searchable_text(doc: &VectorDocument) -> String {
    let mut text = doc.entity_type.to_lowercase();
    for value in doc.attributes.values() {
        if let Some(s) = value.as_str() {
            text.push(' ');
            text.push_str(&s.to_lowercase());
        }
    }
    text
}
