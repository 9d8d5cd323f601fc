//! Aggregation shortcut: COUNT / LIST / DISTINCT answered directly from the
//! graph indexes, bypassing the LLM entirely. Matched against a small,
//! explicit pattern set rather than free-form NL understanding — if nothing
//! matches, the caller falls through to the next routing step.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::graph::{NodeType, Snapshot};

/// Result of an aggregation shortcut, serialized verbatim into
/// `metadata.aggregation_result`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum AggregationResult {
    #[serde(rename = "COUNT")]
    Count { count: usize },
    #[serde(rename = "LIST")]
    List { values: Vec<String> },
    #[serde(rename = "DISTINCT")]
    Distinct { values: Vec<String> },
}

static COUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)how many (\w+)").expect("static pattern is valid"));
static LIST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)list (?:all |the )?(\w+)").expect("static pattern is valid"));
static DISTINCT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:distinct|unique) (\w+)").expect("static pattern is valid")
});

/// Attempts to match `query` against the aggregation pattern set and, if it
/// matches and the named entity type is recognized, compute the answer
/// directly from `snapshot`'s node index. Returns `None` if nothing
/// matches, in which case the caller proceeds to the next routing step.
pub fn try_aggregate(query: &str, snapshot: &Snapshot) -> Option<AggregationResult> {
    if let Some(caps) = COUNT_PATTERN.captures(query) {
        let node_type = resolve_node_type(&caps[1])?;
        let count = snapshot.nodes_of_type(node_type).count();
        return Some(AggregationResult::Count { count });
    }

    if let Some(caps) = DISTINCT_PATTERN.captures(query) {
        let node_type = resolve_node_type(&caps[1])?;
        let mut values: Vec<String> = snapshot
            .nodes_of_type(node_type)
            .map(|n| n.id.clone())
            .collect();
        values.sort();
        values.dedup();
        return Some(AggregationResult::Distinct { values });
    }

    if let Some(caps) = LIST_PATTERN.captures(query) {
        let node_type = resolve_node_type(&caps[1])?;
        let mut values: Vec<String> = snapshot
            .nodes_of_type(node_type)
            .map(|n| n.id.clone())
            .collect();
        values.sort();
        return Some(AggregationResult::List { values });
    }

    None
}

fn resolve_node_type(word: &str) -> Option<NodeType> {
    let singular = word.to_lowercase();
    let singular = singular.strip_suffix('s').unwrap_or(&singular);
    match singular {
        "well" => Some(NodeType::Well),
        "curve" => Some(NodeType::Curve),
        "site" => Some(NodeType::Site),
        "document" => Some(NodeType::Document),
        "metric" => Some(NodeType::Metric),
        "timeseries" | "timeserie" => Some(NodeType::Timeseries),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node};

    fn build_snapshot() -> Snapshot {
        let nodes = vec![
            Node::new("well-1", NodeType::Well),
            Node::new("well-2", NodeType::Well),
            Node::new("curve-1", NodeType::Curve),
        ];
        Snapshot::build(nodes, Vec::<Edge>::new())
    }

    #[test]
    fn count_how_many_wells() {
        let snap = build_snapshot();
        let result = try_aggregate("How many wells are in the dataset?", &snap).unwrap();
        assert!(matches!(result, AggregationResult::Count { count: 2 }));
    }

    #[test]
    fn list_curves_returns_sorted_ids() {
        let snap = build_snapshot();
        let result = try_aggregate("list all curves", &snap).unwrap();
        match result {
            AggregationResult::List { values } => assert_eq!(values, vec!["curve-1".to_string()]),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unrecognized_query_returns_none() {
        let snap = build_snapshot();
        assert!(try_aggregate("what is the capital of france", &snap).is_none());
    }

    #[test]
    fn unrecognized_entity_word_returns_none() {
        let snap = build_snapshot();
        assert!(try_aggregate("how many bananas are there", &snap).is_none());
    }
}
