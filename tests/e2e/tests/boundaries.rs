//! Boundary and edge-case properties not already covered by `graphrag-core`'s
//! own unit tests: input-length limits, empty retrieval results, and
//! tool-loop truncation.

use graphrag_core::{AnswerOptions, CoreError};
use graphrag_e2e_support::fixtures::{self, wells_count_snapshot, Backends};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn empty_query_is_rejected_as_invalid_input() {
    let orchestrator = fixtures::build_orchestrator(wells_count_snapshot(1), Backends::default());
    let err = orchestrator.answer("", &AnswerOptions::default()).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)));
}

#[tokio::test]
async fn query_over_500_characters_is_rejected() {
    let orchestrator = fixtures::build_orchestrator(wells_count_snapshot(1), Backends::default());
    let query = "a".repeat(501);
    let err = orchestrator.answer(&query, &AnswerOptions::default()).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)));
}

/// A query at exactly the 500-character limit is accepted. Padded with
/// trailing spaces onto an aggregation query, which is answered without any
/// network access, so the test doesn't need to reason about how padding
/// interacts with the relationship/extraction regexes.
#[tokio::test]
async fn query_at_exactly_500_characters_is_accepted() {
    let orchestrator = fixtures::build_orchestrator(wells_count_snapshot(7), Backends::default());
    let base = "How many wells are in the dataset?";
    let query = format!("{base}{}", " ".repeat(500 - base.chars().count()));
    assert_eq!(query.chars().count(), 500);

    let result = orchestrator.answer(&query, &AnswerOptions::default()).await.unwrap();
    assert_eq!(result.metadata.routing_decision, "aggregation");
    assert!(result.response.contains('7'));
}

/// When the vector store returns zero documents, RAG falls through to the
/// canonical insufficient-information response rather than crashing or
/// calling the LLM.
#[tokio::test]
async fn empty_retrieval_yields_insufficient_information_response() {
    let vector_store = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "vectors": [[0.1, 0.2, 0.3]]
        })))
        .mount(&vector_store)
        .await;

    Mock::given(method("POST"))
        .and(path("/find"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "documents": []
        })))
        .mount(&vector_store)
        .await;

    let backends = Backends { vector_store_url: vector_store.uri(), ..Backends::default() };
    let orchestrator = fixtures::build_orchestrator(fixtures::empty_snapshot(), backends);

    let result = orchestrator
        .answer("tell me about the reservoir depth trends", &AnswerOptions::default())
        .await
        .unwrap();

    assert_eq!(
        result.response,
        "I don't have enough information in the knowledge graph to answer that."
    );
    assert_eq!(result.metadata.routing_decision, "retrieval_augmented_generation");
    assert_eq!(result.metadata.num_results, 0);
}

/// A model that only ever emits tool calls exhausts the iteration cap; the
/// agent still returns its last raw turn rather than hanging or erroring,
/// and the truncation is surfaced in metadata.
#[tokio::test]
async fn tool_loop_truncates_at_max_iterations_and_still_returns_an_answer() {
    let llm_server = MockServer::start().await;
    let source_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "text": "Tool: define_term(\"porosity\")"
        })))
        .mount(&llm_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/terms/porosity"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><div class=\"definition\">Porosity measures pore space fraction in a rock sample.</div></body></html>",
        ))
        .mount(&source_server)
        .await;

    let backends = Backends {
        llm_url: llm_server.uri(),
        glossary_source_url: source_server.uri(),
        ..Backends::default()
    };
    let orchestrator = fixtures::build_orchestrator(fixtures::empty_snapshot(), backends);

    let result = orchestrator.answer("Define porosity", &AnswerOptions::default()).await.unwrap();

    assert_eq!(result.metadata.routing_decision, "glossary");
    assert_eq!(result.metadata.tool_loop_truncated, Some(true));
    assert!(!result.response.is_empty());
}
