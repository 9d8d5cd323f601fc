//! Relationship/confidence detector.
//!
//! Scores how strongly a query reads as a structured relationship question
//! ("which curves does well X have") versus an open-ended one, so the
//! orchestrator can tune retrieval breadth, filter strictness, and traversal
//! depth without re-deriving the score at every call site.

use std::sync::LazyLock;

use regex::Regex;

/// Confidence bucket. Ordering matches severity, not numeric value, so
/// callers can match exhaustively without a wildcard arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfidenceBucket {
    Low,
    Medium,
    High,
}

/// Score plus derived bucket for a single query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Confidence {
    pub score: f32,
    pub bucket: ConfidenceBucket,
}

impl Confidence {
    fn from_score(score: f32) -> Self {
        let score = score.min(1.0);
        let bucket = if score >= 0.85 {
            ConfidenceBucket::High
        } else if score >= 0.60 {
            ConfidenceBucket::Medium
        } else {
            ConfidenceBucket::Low
        };
        Self { score, bucket }
    }
}

static STRUCTURAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)which\s+\w+\s+(does|do)\s+.+\s+have",
        r"(?i)what\s+(curves|wells|sites)\s+.+(describe|measure|belong)",
        r"(?i)curves?\s+for\s+well",
        r"(?i)well\s+for\s+curve",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern is valid"))
    .collect()
});

const RELATIONSHIP_KEYWORDS: &[&str] =
    &["describes", "measures", "belongs to", "part of", "related to", "associated with"];

const ENTITY_KIND_KEYWORDS: &[&str] = &["well", "curve", "site", "document", "metric", "timeseries"];

/// Scores a query against the structural/keyword/entity-kind rules:
/// a structural pattern match contributes 0.6, a relationship keyword 0.2,
/// up to two distinct entity-kind mentions contribute 0.1 each, and a
/// synergy bonus of 0.1 applies when both a structural match and a keyword
/// are present. The total is capped at 1.0.
pub fn score_query(query: &str) -> Confidence {
    let mut score = 0.0f32;

    let structural_hit = STRUCTURAL_PATTERNS.iter().any(|re| re.is_match(query));
    if structural_hit {
        score += 0.6;
    }

    let keyword_hit = RELATIONSHIP_KEYWORDS.iter().any(|kw| query_contains(query, kw));
    if keyword_hit {
        score += 0.2;
    }

    let entity_kinds = ENTITY_KIND_KEYWORDS
        .iter()
        .filter(|kw| query_contains(query, kw))
        .count()
        .min(2);
    score += entity_kinds as f32 * 0.1;

    if structural_hit && keyword_hit {
        score += 0.1;
    }

    Confidence::from_score(score)
}

fn query_contains(query: &str, needle: &str) -> bool {
    query.to_lowercase().contains(&needle.to_lowercase())
}
