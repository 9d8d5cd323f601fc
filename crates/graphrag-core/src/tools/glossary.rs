//! Glossary subsystem: scrapes a ranked list of external sources for term
//! definitions, with per-host rate limiting, robots.txt compliance, and a
//! cache keyed by `glossary:{source}:{normalized_term}`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::cache::TwoTierCache;
use crate::config::GlossarySourceConfig;
use crate::error::CoreError;
use crate::resilience::{BoundedHttpClient, HostRateLimiter, RetryPolicy};

pub const MAX_DEFINITION_LEN: usize = 2000;
pub const MAX_TERM_LEN: usize = 100;
const MIN_DEFINITION_LEN: usize = 10;
const GLOSSARY_TTL: Duration = Duration::from_secs(15 * 60);

/// Structured definition returned to the tool-calling agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryDefinition {
    pub term: String,
    pub definition: String,
    pub source: String,
    pub source_url: String,
    pub timestamp: String,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
}

/// Terminal failure record; the glossary subsystem never panics or
/// propagates an exception to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct GlossaryError {
    pub error: String,
    pub sources_tried: Vec<String>,
}

/// Robots.txt decision, cached per host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RobotsDecision {
    Allowed,
    Disallowed,
}

pub struct GlossarySubsystem {
    http: BoundedHttpClient,
    retry: RetryPolicy,
    rate_limiter: Arc<HostRateLimiter>,
    cache: Arc<TwoTierCache>,
    sources: Vec<GlossarySourceConfig>,
    user_agent: String,
    robots_cache: Mutex<std::collections::HashMap<String, RobotsDecision>>,
    static_fallback: std::collections::HashMap<String, String>,
}

impl GlossarySubsystem {
    pub fn new(
        http: BoundedHttpClient,
        retry: RetryPolicy,
        rate_limiter: Arc<HostRateLimiter>,
        cache: Arc<TwoTierCache>,
        sources: Vec<GlossarySourceConfig>,
        user_agent: String,
    ) -> Self {
        let mut static_fallback = std::collections::HashMap::new();
        static_fallback.insert(
            "porosity".to_string(),
            "Porosity is the fraction of the volume of a rock occupied by pore spaces.".to_string(),
        );
        Self {
            http,
            retry,
            rate_limiter,
            cache,
            sources,
            user_agent,
            robots_cache: Mutex::new(std::collections::HashMap::new()),
            static_fallback,
        }
    }

    /// Resolves `term`: cache first (all sources in priority order), then
    /// live scrape, falling back to a static entry if every source fails.
    pub async fn define(&self, term: &str) -> Result<GlossaryDefinition, GlossaryError> {
        let normalized = normalize_term(term);
        if normalized.len() > MAX_TERM_LEN {
            return Err(GlossaryError {
                error: format!("term exceeds {MAX_TERM_LEN} characters"),
                sources_tried: vec![],
            });
        }

        for source in &self.sources {
            let key = format!("glossary:{}:{normalized}", source.name);
            let (hit, _) = self.cache.get(&key).await;
            if let Some(raw) = hit {
                if let Ok(mut def) = serde_json::from_str::<GlossaryDefinition>(&raw) {
                    def.cached = true;
                    return Ok(def);
                }
            }
        }

        let mut sources_tried = Vec::new();
        for source in &self.sources {
            sources_tried.push(source.name.clone());
            match self.fetch_from_source(source, &normalized).await {
                Ok(definition) => {
                    let key = format!("glossary:{}:{normalized}", source.name);
                    if let Ok(raw) = serde_json::to_string(&definition) {
                        self.cache.set(&key, &raw, GLOSSARY_TTL).await;
                    }
                    return Ok(definition);
                }
                Err(e) => {
                    debug!(source = %source.name, error = %e, "glossary source failed");
                }
            }
        }

        if let Some(definition) = self.static_fallback.get(normalized.as_str()) {
            return Ok(GlossaryDefinition {
                term: normalized,
                definition: definition.clone(),
                source: "static".to_string(),
                source_url: String::new(),
                timestamp: Utc::now().to_rfc3339(),
                cached: false,
                fallback: Some(true),
            });
        }

        Err(GlossaryError { error: "no source produced a definition".to_string(), sources_tried })
    }

    async fn fetch_from_source(
        &self,
        source: &GlossarySourceConfig,
        term: &str,
    ) -> Result<GlossaryDefinition, CoreError> {
        let url_str = source.url_template.replace("{term}", term);
        let url = Url::parse(&url_str).map_err(|e| CoreError::UpstreamFailure(format!("bad url: {e}")))?;
        let host = url.host_str().unwrap_or_default().to_string();

        if !self.robots_allows(&host, url.path()).await {
            return Err(CoreError::UpstreamFailure(format!("robots.txt disallows {url}")));
        }

        self.rate_limiter.acquire(&host, Duration::from_secs(5)).await?;

        let body = self.retry.run(|| self.fetch_body(&url)).await?;
        let html = Html::parse_document(&body);

        for selector_str in &source.selectors {
            let Ok(selector) = Selector::parse(selector_str) else { continue };
            if let Some(element) = html.select(&selector).next() {
                let text: String = element.text().collect::<Vec<_>>().join(" ");
                let text = text.trim();
                if text.chars().filter(|c| !c.is_whitespace()).count() >= MIN_DEFINITION_LEN {
                    let definition = if text.len() > MAX_DEFINITION_LEN {
                        text[..MAX_DEFINITION_LEN].to_string()
                    } else {
                        text.to_string()
                    };
                    return Ok(GlossaryDefinition {
                        term: term.to_string(),
                        definition,
                        source: source.name.clone(),
                        source_url: url_str,
                        timestamp: Utc::now().to_rfc3339(),
                        cached: false,
                        fallback: None,
                    });
                }
            }
        }

        Err(CoreError::NotFound(format!("no selector matched for {}", source.name)))
    }

    async fn fetch_body(&self, url: &Url) -> Result<String, CoreError> {
        let builder = self
            .http
            .request(reqwest::Method::GET, url.as_str())
            .header("User-Agent", &self.user_agent)
            .timeout(Duration::from_secs(5));
        let response = self.http.send(builder).await?;
        let status = response.status();
        if !status.is_success() {
            if CoreError::is_transient_status(status.as_u16()) {
                return Err(CoreError::Transient(format!("glossary http {status}")));
            }
            return Err(CoreError::UpstreamFailure(format!("glossary http {status}")));
        }
        response.text().await.map_err(CoreError::from)
    }

    async fn robots_allows(&self, host: &str, path: &str) -> bool {
        if let Some(decision) = self.robots_cache.lock().get(host).copied() {
            return decision == RobotsDecision::Allowed;
        }

        let robots_url = format!("https://{host}/robots.txt");
        let allowed = match self
            .http
            .request(reqwest::Method::GET, &robots_url)
            .timeout(Duration::from_secs(3))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                match response.text().await {
                    Ok(body) => !disallows(&body, path),
                    Err(_) => true,
                }
            }
            _ => {
                warn!(host, "failed to fetch robots.txt; defaulting to allowed");
                true
            }
        };

        let decision = if allowed { RobotsDecision::Allowed } else { RobotsDecision::Disallowed };
        self.robots_cache.lock().insert(host.to_string(), decision);
        allowed
    }
}

/// Minimal robots.txt check: any `Disallow:` prefix under a wildcard or
/// unnamed user-agent block that prefixes `path` blocks the fetch. This
/// intentionally does not implement the full robots.txt grammar (crawl
/// delay, sitemaps, `Allow` precedence) — only the disallow-prefix check
/// needed to honor the documented compliance contract.
fn disallows(robots_txt: &str, path: &str) -> bool {
    let mut applies = false;
    for line in robots_txt.lines() {
        let line = line.trim();
        if let Some(agent) = line.strip_prefix("User-agent:").or_else(|| line.strip_prefix("user-agent:")) {
            applies = agent.trim() == "*";
        } else if applies {
            if let Some(rule) = line.strip_prefix("Disallow:").or_else(|| line.strip_prefix("disallow:")) {
                let rule = rule.trim();
                if !rule.is_empty() && path.starts_with(rule) {
                    return true;
                }
            }
        }
    }
    false
}

fn normalize_term(term: &str) -> String {
    term.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize_term("  Porosity?! "), "porosity");
    }

    #[test]
    fn robots_disallow_blocks_matching_path() {
        let robots = "User-agent: *\nDisallow: /private\n";
        assert!(disallows(robots, "/private/term"));
        assert!(!disallows(robots, "/glossary/term"));
    }

    #[test]
    fn robots_block_scoped_to_matching_agent() {
        let robots = "User-agent: othercrawler\nDisallow: /\n";
        assert!(!disallows(robots, "/anything"));
    }
}
