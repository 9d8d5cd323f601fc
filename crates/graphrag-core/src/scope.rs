//! Deterministic out-of-domain classifier.
//!
//! Runs before any retrieval work so that queries with nothing to do with
//! the knowledge graph's domain (well logs, curves, sites, documents) are
//! refused cheaply rather than handed to the LLM or burning a vector
//! search. Keyword-list based, not a model call: cheap, deterministic,
//! and auditable.

const OUT_OF_DOMAIN_TOPICS: &[&[&str]] = &[
    &["election", "president", "senator", "congress", "politics", "political party"],
    &["recipe", "restaurant", "cuisine", "cook", "bake", "grocery"],
    &["movie", "actor", "actress", "celebrity", "tv show", "streaming series"],
    &["forecast", "temperature outside", "rain tomorrow", "humidity today"],
    &["football", "basketball", "soccer match", "baseball score", "olympics"],
];

const IN_DOMAIN_KEYWORDS: &[&str] = &[
    "well", "curve", "log", "site", "document", "metric", "timeseries", "reservoir", "borehole",
    "mnemonic", "formation", "depth", "glossary",
];

/// Whether `query` should be refused as out-of-domain. In-domain keywords
/// take precedence: a query mentioning both an out-of-domain topic and an
/// in-domain keyword (e.g. "weather at the well site") is treated as
/// in-domain, since the topic keyword lists are necessarily coarse.
pub fn is_out_of_domain(query: &str) -> bool {
    let lower = query.to_lowercase();

    if IN_DOMAIN_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return false;
    }

    OUT_OF_DOMAIN_TOPICS
        .iter()
        .any(|topic| topic.iter().any(|kw| lower.contains(kw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn politics_query_is_out_of_domain() {
        assert!(is_out_of_domain("who won the last presidential election"));
    }

    #[test]
    fn domain_query_is_in_domain() {
        assert!(!is_out_of_domain("which curves does well 15/9-13 have"));
    }

    #[test]
    fn in_domain_keyword_overrides_topic_match() {
        assert!(!is_out_of_domain("what's the weather station reading at the well site"));
    }

    #[test]
    fn unrelated_neutral_query_is_in_domain_by_default() {
        assert!(!is_out_of_domain("explain the difference between these two values"));
    }
}
