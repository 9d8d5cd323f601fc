//! Graph data model: nodes, edges, and the immutable snapshot they live in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Node type enum. Unknown types encountered while loading a snapshot are
/// preserved as [`NodeType::Other`] rather than rejected, matching the
/// "unknown relations are preserved" posture the spec applies to edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Document,
    Curve,
    Well,
    Site,
    Metric,
    Timeseries,
    #[serde(other)]
    Other,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Document => "document",
            NodeType::Curve => "curve",
            NodeType::Well => "well",
            NodeType::Site => "site",
            NodeType::Metric => "metric",
            NodeType::Timeseries => "timeseries",
            NodeType::Other => "other",
        }
    }
}

/// A graph vertex. `attrs` holds domain metadata plus computed enrichment
/// attributes whose keys begin with `_` (e.g. `_well_name`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub attrs: HashMap<String, Value>,
    /// Dense embedding for similarity search, typically 768-dimensional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            node_type,
            attrs: HashMap::new(),
            vector: None,
        }
    }

    /// Fetch an attribute as a string, if present and string-typed.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    /// Set an enrichment attribute. Callers are responsible for using a
    /// `_`-prefixed key; enrichment must be idempotent under re-application.
    pub fn set_attr(&mut self, key: impl Into<String>, value: Value) {
        self.attrs.insert(key.into(), value);
    }
}

/// A directed, typed edge. Multiple edges between the same pair of nodes are
/// allowed (multigraph). `relation` is drawn from a closed, documented
/// vocabulary; unknown relations are ignored by traversal but preserved in
/// storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub relation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
}

/// Traversal direction relative to a starting node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// The relation used by the enrichment rules and `CurvesForWell`/
/// `WellForCurve` lookups.
pub const RELATION_DESCRIBES: &str = "describes";

/// Maximum number of curve mnemonics materialized onto a well/document node
/// during enrichment.
pub const MAX_ENRICHED_CURVE_MNEMONICS: usize = 10;
