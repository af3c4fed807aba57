//! Keyword extraction with single-substitution provider fallback.
//!
//! The one place in the system where a provider is automatically substituted:
//! sources are tried in priority order, each exactly once, until one returns a
//! well-formed keyword list. If every source fails there is nothing useful to
//! search or parallelise, so the whole run fails fast.

use std::sync::Arc;

use pipeline::{Keywords, KeywordSource, PaperMillError, ServiceName};
use tracing::{info, warn};

use crate::rate_limit::RateLimiter;

/// One keyword source plus the rate-limit bucket its calls count against.
pub struct KeywordProvider {
    /// Bucket charged for this provider's calls.
    pub service: ServiceName,
    /// The provider itself.
    pub source: Arc<dyn KeywordSource>,
}

/// Front-stage of every run: derives the index search query from the research
/// question. Not parallelised.
pub struct KeywordExtractor {
    providers: Vec<KeywordProvider>,
    limiter: Arc<RateLimiter>,
}

impl KeywordExtractor {
    /// Builds an extractor over providers in priority order (primary first).
    pub fn new(providers: Vec<KeywordProvider>, limiter: Arc<RateLimiter>) -> Self {
        Self { providers, limiter }
    }

    /// Extracts keywords, substituting the next provider on any failure.
    pub async fn extract(&self, question: &str) -> Result<Keywords, PaperMillError> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            let name = provider.source.name().clone();
            if let Err(err) = self.limiter.acquire(&provider.service).await {
                warn!(provider = %name, error = %err, "keyword provider rate-limited");
                failures.push(format!("{name}: {err}"));
                continue;
            }
            match provider.source.extract(question).await {
                Ok(keywords) => {
                    info!(provider = %name, keywords = %keywords, "keywords extracted");
                    return Ok(keywords);
                }
                Err(err) => {
                    warn!(provider = %name, error = %err, "keyword provider failed, substituting next");
                    failures.push(format!("{name}: {err}"));
                }
            }
        }
        Err(PaperMillError::KeywordExtraction {
            details: if failures.is_empty() {
                "no keyword providers configured".into()
            } else {
                failures.join("; ")
            },
        })
    }
}
