//! Port traits implemented by infrastructure crates.
//!
//! The orchestration core treats every external call as an opaque asynchronous
//! unit of work behind one of these traits. The `llm` crate supplies
//! [`LanguageModel`], [`KeywordSource`], and [`PaperAnalyst`]; the `index`
//! crate supplies [`PaperIndex`]. Tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::types::{
    AbstractAnalysis, CompletionRequest, ExperimentDesignSet, HypothesisSet, Keywords, Paper,
    PaperAnalysis,
};
use crate::{IndexError, ProviderName, ProviderError};

// ---------------------------------------------------------------------------

/// One LLM endpoint capable of servicing a completion request.
///
/// Implementations own transport, authentication, and response extraction;
/// they return the message content — parsed into a JSON value when the request
/// demanded JSON, or wrapped as a JSON string otherwise.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Stable provider name, used in logs and fallback diagnostics.
    fn name(&self) -> &ProviderName;

    /// Performs one completion call.
    async fn complete(&self, request: CompletionRequest) -> Result<serde_json::Value, ProviderError>;
}

// ---------------------------------------------------------------------------

/// One provider able to turn a research question into search keywords.
///
/// The keyword extractor holds these in priority order and tries each at most
/// once. An empty or unparseable keyword list must be reported as
/// [`ProviderError::MalformedResponse`], never as an empty success.
#[async_trait]
pub trait KeywordSource: Send + Sync {
    /// Stable provider name, used in fallback diagnostics.
    fn name(&self) -> &ProviderName;

    /// Extracts search keywords from the research question.
    async fn extract(&self, question: &str) -> Result<Keywords, ProviderError>;
}

// ---------------------------------------------------------------------------

/// The four per-paper analysis capabilities, one method per stage.
///
/// Prompt text and response parsing are implementation detail; the pipeline
/// only sequences these calls and records their outcomes. Later stages receive
/// earlier payloads as context.
#[async_trait]
pub trait PaperAnalyst: Send + Sync {
    /// Screens the abstract for relevance to the research question.
    async fn analyze_abstract(
        &self,
        paper: &Paper,
        question: &str,
    ) -> Result<AbstractAnalysis, ProviderError>;

    /// Analyses the full paper text against the research question.
    async fn analyze_full_paper(
        &self,
        paper: &Paper,
        full_text: &str,
        question: &str,
    ) -> Result<PaperAnalysis, ProviderError>;

    /// Generates hypotheses from the paper, informed by the full-paper analysis.
    async fn generate_hypotheses(
        &self,
        paper: &Paper,
        full_text: &str,
        question: &str,
        analysis: &PaperAnalysis,
    ) -> Result<HypothesisSet, ProviderError>;

    /// Designs experiments for each generated hypothesis.
    async fn design_experiments(
        &self,
        paper: &Paper,
        full_text: &str,
        hypotheses: &HypothesisSet,
    ) -> Result<ExperimentDesignSet, ProviderError>;
}

// ---------------------------------------------------------------------------

/// The external paper index.
#[async_trait]
pub trait PaperIndex: Send + Sync {
    /// Searches for candidate papers matching the keywords.
    ///
    /// Returns papers in the index's relevance order, at most `max_results`.
    async fn search(
        &self,
        keywords: &Keywords,
        max_results: usize,
    ) -> Result<Vec<Paper>, IndexError>;

    /// Fetches the full text referenced by a paper.
    ///
    /// Returns [`IndexError::NoFullText`] when the paper carries no full-text
    /// reference; callers decide how to degrade (the pipeline falls back to
    /// the abstract).
    async fn fetch_full_text(&self, paper: &Paper) -> Result<String, IndexError>;
}
