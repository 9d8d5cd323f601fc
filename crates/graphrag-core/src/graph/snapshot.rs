//! Immutable graph snapshot: the node/edge set plus the indexes derived from
//! it at load time. Built once at startup, never mutated by the query path.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use super::model::{Edge, Node, NodeType, RELATION_DESCRIBES, MAX_ENRICHED_CURVE_MNEMONICS};

/// `(Nodes, Edges)` plus the derived indexes the traverser and retrieval
/// engine read from. Immutable after [`Snapshot::load`] / [`Snapshot::build`]
/// returns.
#[derive(Debug, Clone)]
pub struct Snapshot {
    nodes: HashMap<String, Node>,
    edges: Vec<Edge>,
    edges_by_source: HashMap<String, Vec<usize>>,
    edges_by_target: HashMap<String, Vec<usize>>,
    /// well id -> curve ids reachable by one incoming `describes` edge.
    well_to_curves: HashMap<String, Vec<String>>,
    /// curve id -> well id, resolved by the `WellForCurve` tie-break rule.
    curve_to_well: HashMap<String, String>,
    content_hash: String,
}

impl Snapshot {
    /// Build a snapshot from a raw node/edge set: builds both endpoint
    /// indexes in O(|E|), applies enrichment, builds the well/curve maps,
    /// and computes the content hash used by tests that assert the snapshot
    /// is unchanged across a query.
    pub fn build(mut nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut edges_by_source: HashMap<String, Vec<usize>> = HashMap::new();
        let mut edges_by_target: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, edge) in edges.iter().enumerate() {
            edges_by_source.entry(edge.source.clone()).or_default().push(idx);
            edges_by_target.entry(edge.target.clone()).or_default().push(idx);
        }

        apply_enrichment(&mut nodes, &edges, &edges_by_source, &edges_by_target);

        let (well_to_curves, curve_to_well) = build_well_curve_maps(&nodes, &edges, &edges_by_target);

        let nodes: HashMap<String, Node> = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
        let content_hash = compute_content_hash(&nodes, &edges);

        Self {
            nodes,
            edges,
            edges_by_source,
            edges_by_target,
            well_to_curves,
            curve_to_well,
            content_hash,
        }
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |n| n.node_type == node_type)
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges_from(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.edges_by_source
            .get(id)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.edges[idx])
    }

    pub fn edges_into(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.edges_by_target
            .get(id)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.edges[idx])
    }

    pub fn curves_for_well(&self, well_id: &str) -> Vec<&Node> {
        self.well_to_curves
            .get(well_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    pub fn well_for_curve(&self, curve_id: &str) -> Option<&Node> {
        self.curve_to_well.get(curve_id).and_then(|id| self.nodes.get(id))
    }

    /// SHA-256 of the serialized node/edge set, stable across repeated
    /// builds of logically identical data. Used by tests asserting the
    /// snapshot is byte-for-byte unchanged before and after an `Answer` call.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }
}

fn compute_content_hash(nodes: &HashMap<String, Node>, edges: &[Edge]) -> String {
    let mut node_ids: Vec<&String> = nodes.keys().collect();
    node_ids.sort();
    let mut hasher = Sha256::new();
    for id in node_ids {
        let node = &nodes[id];
        if let Ok(bytes) = serde_json::to_vec(node) {
            hasher.update(&bytes);
        }
    }
    let mut sorted_edges: Vec<&Edge> = edges.iter().collect();
    sorted_edges.sort_by(|a, b| (&a.source, &a.target, &a.relation).cmp(&(&b.source, &b.target, &b.relation)));
    for edge in sorted_edges {
        if let Ok(bytes) = serde_json::to_vec(edge) {
            hasher.update(&bytes);
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Apply the enrichment rules documented in the data model:
///
/// - A `curve` node with an outgoing `describes` edge to a `document` node
///   gets that document's display name copied into `_well_name`.
/// - A `document` node with incoming `describes` edges gets up to
///   [`MAX_ENRICHED_CURVE_MNEMONICS`] connected curves' mnemonics
///   materialized into `_curve_mnemonics`, in insertion order then by id.
///
/// Idempotent: running this twice on the same inputs yields the same attrs.
fn apply_enrichment(
    nodes: &mut [Node],
    edges: &[Edge],
    edges_by_source: &HashMap<String, Vec<usize>>,
    edges_by_target: &HashMap<String, Vec<usize>>,
) {
    let index_of: HashMap<String, usize> = nodes.iter().enumerate().map(|(i, n)| (n.id.clone(), i)).collect();

    // curve -> _well_name
    let mut well_names: Vec<(String, String)> = Vec::new();
    for (curve_id, &curve_idx) in &index_of {
        let curve = &nodes[curve_idx];
        if curve.node_type != NodeType::Curve {
            continue;
        }
        if let Some(&edge_idx) = edges_by_source.get(curve_id).and_then(|v| {
            v.iter().find(|&&idx| edges[idx].relation == RELATION_DESCRIBES)
        }) {
            let target_id = &edges[edge_idx].target;
            if let Some(&target_idx) = index_of.get(target_id) {
                if nodes[target_idx].node_type == NodeType::Document {
                    if let Some(name) = nodes[target_idx].attr_str("well_name").or_else(|| nodes[target_idx].attr_str("name")) {
                        well_names.push((curve_id.clone(), name.to_string()));
                    }
                }
            }
        }
    }
    for (curve_id, name) in well_names {
        let idx = index_of[&curve_id];
        nodes[idx].set_attr("_well_name", serde_json::Value::String(name));
    }

    // document -> _curve_mnemonics (up to MAX, insertion order then id ascending)
    let mut mnemonics_by_doc: Vec<(String, Vec<String>)> = Vec::new();
    for (doc_id, &doc_idx) in &index_of {
        if nodes[doc_idx].node_type != NodeType::Document {
            continue;
        }
        let mut curve_mnemonics: Vec<String> = Vec::new();
        if let Some(incoming) = edges_by_target.get(doc_id) {
            let mut candidates: Vec<&Edge> = incoming
                .iter()
                .map(|&i| &edges[i])
                .filter(|e| e.relation == RELATION_DESCRIBES)
                .collect();
            // insertion order (as encountered) then by source id ascending for
            // ties beyond the cap — stable sort preserves insertion order.
            candidates.sort_by(|a, b| a.source.cmp(&b.source));
            for edge in candidates {
                if curve_mnemonics.len() >= MAX_ENRICHED_CURVE_MNEMONICS {
                    break;
                }
                if let Some(&curve_idx) = index_of.get(&edge.source) {
                    if let Some(mnemonic) = nodes[curve_idx]
                        .attr_str("mnemonic")
                        .or_else(|| nodes[curve_idx].attr_str("name"))
                    {
                        curve_mnemonics.push(mnemonic.to_string());
                    }
                }
            }
        }
        if !curve_mnemonics.is_empty() {
            mnemonics_by_doc.push((doc_id.clone(), curve_mnemonics));
        }
    }
    for (doc_id, mnemonics) in mnemonics_by_doc {
        let idx = index_of[&doc_id];
        nodes[idx].set_attr(
            "_curve_mnemonics",
            serde_json::Value::Array(mnemonics.into_iter().map(serde_json::Value::String).collect()),
        );
    }
}

fn build_well_curve_maps(
    nodes: &[Node],
    edges: &[Edge],
    edges_by_target: &HashMap<String, Vec<usize>>,
) -> (HashMap<String, Vec<String>>, HashMap<String, String>) {
    let mut well_to_curves: HashMap<String, Vec<String>> = HashMap::new();
    let mut curve_to_well: HashMap<String, String> = HashMap::new();

    for node in nodes {
        if node.node_type != NodeType::Document && node.node_type != NodeType::Well {
            continue;
        }
        let mut curves: Vec<String> = edges_by_target
            .get(&node.id)
            .into_iter()
            .flatten()
            .map(|&idx| &edges[idx])
            .filter(|e| e.relation == RELATION_DESCRIBES)
            .map(|e| e.source.clone())
            .collect();
        curves.sort();
        curves.dedup();
        if !curves.is_empty() {
            well_to_curves.insert(node.id.clone(), curves);
        }
    }

    // WellForCurve: single outgoing `describes`; if multiple, highest
    // weight wins; if no weight, lexicographically smallest target id wins.
    let mut by_curve: HashMap<String, Vec<&Edge>> = HashMap::new();
    for edge in edges.iter().filter(|e| e.relation == RELATION_DESCRIBES) {
        by_curve.entry(edge.source.clone()).or_default().push(edge);
    }
    for (curve_id, candidates) in by_curve {
        let chosen = candidates
            .iter()
            .max_by(|a, b| {
                match (a.weight, b.weight) {
                    (Some(wa), Some(wb)) => wa.partial_cmp(&wb).unwrap_or(std::cmp::Ordering::Equal),
                    (Some(_), None) => std::cmp::Ordering::Greater,
                    (None, Some(_)) => std::cmp::Ordering::Less,
                    (None, None) => b.target.cmp(&a.target),
                }
            })
            .map(|e| e.target.clone());
        if let Some(target) = chosen {
            curve_to_well.insert(curve_id, target);
        }
    }

    (well_to_curves, curve_to_well)
}
