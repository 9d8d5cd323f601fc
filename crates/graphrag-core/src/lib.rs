//! # GraphRAG Core
//!
//! A hybrid retrieval-and-reasoning engine over a domain knowledge graph
//! (subsurface well logs and related measurements). Accepts a
//! natural-language query, classifies it, plans a small execution graph
//! over vector search, typed graph traversal, structured extraction,
//! aggregation, and an external glossary lookup, and returns a grounded
//! answer whose provenance is traceable to specific nodes and edges.
//!
//! This crate assumes a pre-enriched, immutable graph snapshot and a
//! pre-loaded vector collection — ingestion and graph construction are out
//! of scope. The LLM and embedding providers are consumed only through the
//! contracts in [`llm`] and [`embeddings`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use graphrag_core::config::Config;
//! use graphrag_core::orchestrator::{AnswerOptions, Orchestrator};
//!
//! let config = Config::from_env()?;
//! let snapshot = graphrag_core::graph::load_snapshot_dir(&config.graph_dir, &config.embedding_model_id)?;
//! // ... wire up the orchestrator's dependencies, then:
//! let response = orchestrator.answer("which curves does well 15/9-13 have", &AnswerOptions::default()).await?;
//! ```

pub mod aggregation;
pub mod cache;
pub mod confidence;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod graph;
pub mod llm;
pub mod orchestrator;
pub mod resilience;
pub mod scope;
pub mod search;
pub mod tools;

pub use config::Config;
pub use error::{CoreError, Result};
pub use orchestrator::{AnswerOptions, AnswerResponse, Metadata, Orchestrator};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
