//! In-memory, read-only typed graph traversal over an immutable [`Snapshot`].
//!
//! All operations are safe for unlimited concurrent readers: the snapshot
//! never mutates, and these methods only take `&self`.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{CoreError, Result};
use crate::graph::model::{Direction, Node};
use crate::graph::snapshot::Snapshot;

/// Summary of a node's relation fan-out/fan-in, keyed by relation name.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RelationshipSummary {
    pub outgoing: HashMap<String, usize>,
    pub incoming: HashMap<String, usize>,
}

/// Read-only traverser over a graph snapshot.
pub struct GraphTraverser<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> GraphTraverser<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn get_node(&self, id: &str) -> Option<&'a Node> {
        self.snapshot.get_node(id)
    }

    /// Neighbors of `id` in `direction`, optionally filtered to a single
    /// relation and/or a node predicate. Unknown `id` returns empty.
    pub fn neighbors(
        &self,
        id: &str,
        direction: Direction,
        relation: Option<&str>,
        predicate: Option<&dyn Fn(&Node) -> bool>,
    ) -> Vec<&'a Node> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut push = |edge_relation: &str, other_id: &str| {
            if let Some(r) = relation {
                if edge_relation != r {
                    return;
                }
            }
            if !seen.insert(other_id.to_string()) {
                return;
            }
            if let Some(node) = self.snapshot.get_node(other_id) {
                if predicate.is_none_or(|p| p(node)) {
                    out.push(node);
                }
            }
        };

        if matches!(direction, Direction::Outgoing | Direction::Both) {
            for edge in self.snapshot.edges_from(id) {
                push(&edge.relation, &edge.target);
            }
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            for edge in self.snapshot.edges_into(id) {
                push(&edge.relation, &edge.source);
            }
        }
        out
    }

    /// Curves reachable by one incoming `describes` edge to `well_id`.
    pub fn curves_for_well(&self, well_id: &str) -> Vec<&'a Node> {
        self.snapshot.curves_for_well(well_id)
    }

    /// The most likely parent well of `curve_id` (see [`Snapshot`]'s
    /// documented tie-break rule).
    pub fn well_for_curve(&self, curve_id: &str) -> Option<&'a Node> {
        self.snapshot.well_for_curve(curve_id)
    }

    /// Count of outgoing/incoming edges by relation for `id`.
    pub fn relationship_summary(&self, id: &str) -> RelationshipSummary {
        let mut summary = RelationshipSummary::default();
        for edge in self.snapshot.edges_from(id) {
            *summary.outgoing.entry(edge.relation.clone()).or_insert(0) += 1;
        }
        for edge in self.snapshot.edges_into(id) {
            *summary.incoming.entry(edge.relation.clone()).or_insert(0) += 1;
        }
        summary
    }

    /// Bounded BFS expansion from `seeds` up to `max_hops`, optionally
    /// restricted to a single edge type. Stable: nodes within a level are
    /// ordered by insertion (discovery) order. `max_hops = 0` returns the
    /// seeds unchanged. Negative hop counts are rejected upstream by the
    /// caller via `i64`/`usize` boundary — see [`Result`].
    pub fn expand(
        &self,
        seeds: &[&'a Node],
        direction: Direction,
        edge_type: Option<&str>,
        max_hops: u32,
    ) -> Result<Vec<&'a Node>> {
        if max_hops == 0 {
            return Ok(seeds.to_vec());
        }

        let mut visited: HashSet<String> = seeds.iter().map(|n| n.id.clone()).collect();
        let mut ordered: Vec<&'a Node> = seeds.to_vec();
        let mut frontier: VecDeque<&'a Node> = seeds.iter().copied().collect();

        for _ in 0..max_hops {
            let mut next_frontier = VecDeque::new();
            while let Some(node) = frontier.pop_front() {
                for neighbor in self.neighbors(&node.id, direction, edge_type, None) {
                    if visited.insert(neighbor.id.clone()) {
                        ordered.push(neighbor);
                        next_frontier.push_back(neighbor);
                    }
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }

        Ok(ordered)
    }

    /// Validates `max_hops` per the spec boundary: negative is invalid.
    pub fn validate_max_hops(max_hops: i64) -> Result<u32> {
        u32::try_from(max_hops).map_err(|_| CoreError::InvalidInput("max_hops must be >= 0".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::{Edge, Node, NodeType};

    fn build() -> Snapshot {
        let nodes = vec![
            Node::new("a", NodeType::Document),
            Node::new("b", NodeType::Curve),
            Node::new("c", NodeType::Curve),
            Node::new("d", NodeType::Metric),
        ];
        let edges = vec![
            Edge { source: "b".into(), target: "a".into(), relation: "describes".into(), weight: None },
            Edge { source: "c".into(), target: "a".into(), relation: "describes".into(), weight: None },
            Edge { source: "a".into(), target: "d".into(), relation: "measures".into(), weight: None },
        ];
        Snapshot::build(nodes, edges)
    }

    #[test]
    fn neighbors_outgoing_matches_edge_count() {
        let snap = build();
        let t = GraphTraverser::new(&snap);
        let out = t.neighbors("a", Direction::Outgoing, Some("measures"), None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "d");
    }

    #[test]
    fn expand_zero_hops_returns_seeds_unchanged() {
        let snap = build();
        let t = GraphTraverser::new(&snap);
        let seed = t.get_node("a").unwrap();
        let result = t.expand(&[seed], Direction::Outgoing, None, 0).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "a");
    }

    #[test]
    fn expand_bfs_reaches_two_hops() {
        let snap = build();
        let t = GraphTraverser::new(&snap);
        let seed = t.get_node("b").unwrap();
        let result = t.expand(&[seed], Direction::Outgoing, None, 2).unwrap();
        let ids: Vec<&str> = result.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "d"]);
    }

    #[test]
    fn unknown_relation_returns_empty() {
        let snap = build();
        let t = GraphTraverser::new(&snap);
        let out = t.neighbors("a", Direction::Outgoing, Some("nonexistent"), None);
        assert!(out.is_empty());
    }

    #[test]
    fn unknown_id_returns_empty() {
        let snap = build();
        let t = GraphTraverser::new(&snap);
        assert!(t.neighbors("ghost", Direction::Both, None, None).is_empty());
        assert!(t.get_node("ghost").is_none());
    }

    #[test]
    fn negative_max_hops_is_invalid_input() {
        assert!(GraphTraverser::validate_max_hops(-1).is_err());
        assert!(GraphTraverser::validate_max_hops(0).is_ok());
    }
}
