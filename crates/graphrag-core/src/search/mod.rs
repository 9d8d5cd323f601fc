//! Retrieval: remote vector search, weighted rerank, post-filtering, and
//! graph-based seed expansion.

pub mod reranker;
pub mod retrieval;
pub mod vector_store;

pub use reranker::{rerank, RankedCandidate, RerankWeights};
pub use retrieval::{FilterMode, PostFilter, RetrievalEngine, RetrievalOutcome, RetrievalParams};
pub use vector_store::{HttpVectorStore, VectorDocument, VectorFilter, VectorStoreClient};
