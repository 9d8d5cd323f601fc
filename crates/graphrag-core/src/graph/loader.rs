//! Loads a pre-built graph snapshot from disk: `graph/nodes.json`,
//! `graph/edges.json`, and an optional `graph/node_embeddings.json` keyed by
//! node id. Ingestion and graph construction are out of scope for this
//! crate — the core only ever reads an already-enriched snapshot.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CoreError, Result};
use crate::graph::model::{Edge, Node};
use crate::graph::snapshot::Snapshot;

/// On-disk embeddings file: a version stamp plus a map from node id to
/// vector. Consumers must reject embeddings whose stamp does not match the
/// currently configured embedding model id.
#[derive(Debug, Deserialize)]
struct EmbeddingsFile {
    model_id: String,
    vectors: HashMap<String, Vec<f32>>,
}

/// Load nodes, edges, and (optionally) node embeddings from a directory
/// following the `graph/{nodes,edges,node_embeddings}.json` layout, then
/// build the snapshot (indexes + enrichment) from them.
pub fn load_snapshot_dir(dir: &Path, expected_embedding_model_id: &str) -> Result<Snapshot> {
    let nodes_path = dir.join("nodes.json");
    let edges_path = dir.join("edges.json");
    let embeddings_path = dir.join("node_embeddings.json");

    let mut nodes = load_json_file::<Vec<Node>>(&nodes_path)?;
    let edges = load_json_file::<Vec<Edge>>(&edges_path)?;

    if embeddings_path.exists() {
        let embeddings = load_json_file::<EmbeddingsFile>(&embeddings_path)?;
        if embeddings.model_id != expected_embedding_model_id {
            return Err(CoreError::Config(format!(
                "node_embeddings.json was built with model '{}', but the configured model is '{}'",
                embeddings.model_id, expected_embedding_model_id
            )));
        }
        for node in &mut nodes {
            if let Some(vector) = embeddings.vectors.get(&node.id) {
                node.vector = Some(vector.clone());
            }
        }
    }

    Ok(Snapshot::build(nodes, edges))
}

fn load_json_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)
        .map_err(|e| CoreError::Config(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CoreError::Config(format!("failed to parse {}: {e}", path.display())))
}
