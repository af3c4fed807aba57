//! The four analysis stages expressed as prompts over [`LanguageModel`]s.
//!
//! Two models are involved: the screening and full-paper stages run on the
//! `analysis` model, hypothesis generation and experiment design on the
//! `reasoning` model. The split mirrors the default stage-to-service
//! assignment in the run configuration; both handles may point at the same
//! provider.

use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{
    AbstractAnalysis, CompletionRequest, ExperimentDesign, ExperimentDesignSet, HypothesisSet,
    LanguageModel, Paper, PaperAnalysis, PaperAnalyst, ProviderError,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// Minimum screening confidence for a paper to count as relevant.
const RELEVANCE_CONFIDENCE: f64 = 0.7;

const ABSTRACT_PROMPT: &str = "You are an expert research paper analyst. \
    Determine if the given abstract is relevant to the research question. \
    Consider both direct relevance and potential indirect insights. \
    Respond with JSON containing: \
    {\"is_relevant\": boolean, \"confidence\": float, \"reason\": string}";

const FULL_PAPER_PROMPT: &str = "You are a research paper analyzer. Your task is to:\n\
    1. Extract key points that specifically address the research question\n\
    2. Provide a concise summary focused on relevant findings\n\
    3. Highlight any limitations or caveats\n\
    Format your response as JSON with the following structure:\n\
    {\n\
        \"summary\": \"Brief overview of relevant findings\",\n\
        \"relevant_points\": [\"Point 1\", \"Point 2\", ...],\n\
        \"limitations\": [\"Limitation 1\", \"Limitation 2\", ...]\n\
    }";

const HYPOTHESIS_PROMPT: &str = "You are an expert scientific researcher. Based on the paper \
    content and research question:\n\
    1. Generate potential hypotheses that could further the research\n\
    2. Identify gaps in current knowledge\n\
    3. Propose novel research directions\n\
    Respond with JSON in the format:\n\
    {\n\
        \"hypotheses\": [\n\
            {\"hypothesis\": \"statement\", \"rationale\": \"explanation\"}\n\
        ],\n\
        \"knowledge_gaps\": [\"gap1\", \"gap2\"],\n\
        \"research_directions\": [\"direction1\", \"direction2\"]\n\
    }";

const EXPERIMENT_PROMPT: &str = "You are an expert in experimental design. For the given \
    hypothesis:\n\
    1. Design detailed experimental procedures\n\
    2. Specify required methodologies and techniques\n\
    3. Identify potential challenges and controls\n\
    Respond with JSON in the format:\n\
    {\n\
        \"experimental_design\": {\n\
            \"overview\": \"brief description\",\n\
            \"procedures\": [\"step1\", \"step2\"],\n\
            \"methodologies\": [\"method1\", \"method2\"],\n\
            \"controls\": [\"control1\", \"control2\"],\n\
            \"expected_outcomes\": [\"outcome1\", \"outcome2\"]\n\
        }\n\
    }";

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AbstractVerdict {
    is_relevant: bool,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct DesignEnvelope {
    experimental_design: DesignBody,
}

#[derive(Debug, Deserialize)]
struct DesignBody {
    #[serde(default)]
    overview: String,
    #[serde(default)]
    procedures: Vec<String>,
    #[serde(default)]
    methodologies: Vec<String>,
    #[serde(default)]
    controls: Vec<String>,
    #[serde(default)]
    expected_outcomes: Vec<String>,
}

fn parse<T: DeserializeOwned>(value: serde_json::Value, what: &str) -> Result<T, ProviderError> {
    serde_json::from_value(value).map_err(|err| ProviderError::MalformedResponse {
        message: format!("{what}: {err}"),
    })
}

// ---------------------------------------------------------------------------

/// [`PaperAnalyst`] implementation over chat-completion models.
pub struct LlmAnalyst {
    analysis: Arc<dyn LanguageModel>,
    reasoning: Arc<dyn LanguageModel>,
}

impl LlmAnalyst {
    /// Builds an analyst over an analysis model (screening, full-paper) and a
    /// reasoning model (hypotheses, experiment design).
    pub fn new(analysis: Arc<dyn LanguageModel>, reasoning: Arc<dyn LanguageModel>) -> Self {
        Self { analysis, reasoning }
    }

    async fn complete(
        model: &Arc<dyn LanguageModel>,
        system: &str,
        user: String,
    ) -> Result<serde_json::Value, ProviderError> {
        model
            .complete(CompletionRequest {
                system: system.to_string(),
                user,
                json_response: true,
            })
            .await
    }
}

#[async_trait]
impl PaperAnalyst for LlmAnalyst {
    async fn analyze_abstract(
        &self,
        paper: &Paper,
        question: &str,
    ) -> Result<AbstractAnalysis, ProviderError> {
        let user = format!(
            "Research Question: {question}\n\nAbstract: {}",
            paper.abstract_text
        );
        let value = Self::complete(&self.analysis, ABSTRACT_PROMPT, user).await?;
        let verdict: AbstractVerdict = parse(value, "abstract verdict")?;
        debug!(
            paper_id = %paper.id,
            relevant = verdict.is_relevant,
            confidence = verdict.confidence,
            "abstract screened"
        );
        Ok(AbstractAnalysis {
            relevant: verdict.is_relevant && verdict.confidence > RELEVANCE_CONFIDENCE,
            confidence: verdict.confidence,
            reason: verdict.reason,
        })
    }

    async fn analyze_full_paper(
        &self,
        _paper: &Paper,
        full_text: &str,
        question: &str,
    ) -> Result<PaperAnalysis, ProviderError> {
        let user = format!("Research Question: {question}\n\nPaper Content: {full_text}");
        let value = Self::complete(&self.analysis, FULL_PAPER_PROMPT, user).await?;
        parse(value, "paper analysis")
    }

    async fn generate_hypotheses(
        &self,
        _paper: &Paper,
        full_text: &str,
        question: &str,
        _analysis: &PaperAnalysis,
    ) -> Result<HypothesisSet, ProviderError> {
        let user = format!("Research Question: {question}\n\nPaper Content: {full_text}");
        let value = Self::complete(&self.reasoning, HYPOTHESIS_PROMPT, user).await?;
        parse(value, "hypothesis set")
    }

    async fn design_experiments(
        &self,
        _paper: &Paper,
        full_text: &str,
        hypotheses: &HypothesisSet,
    ) -> Result<ExperimentDesignSet, ProviderError> {
        // One design call per hypothesis, with the paper text as shared context.
        let mut designs = Vec::with_capacity(hypotheses.hypotheses.len());
        for hypothesis in &hypotheses.hypotheses {
            let user = format!(
                "Hypothesis: {}\n\nContext: {full_text}",
                hypothesis.hypothesis
            );
            let value = Self::complete(&self.reasoning, EXPERIMENT_PROMPT, user).await?;
            let envelope: DesignEnvelope = parse(value, "experimental design")?;
            designs.push(ExperimentDesign {
                hypothesis: hypothesis.hypothesis.clone(),
                overview: envelope.experimental_design.overview,
                procedures: envelope.experimental_design.procedures,
                methodologies: envelope.experimental_design.methodologies,
                controls: envelope.experimental_design.controls,
                expected_outcomes: envelope.experimental_design.expected_outcomes,
            });
        }
        Ok(ExperimentDesignSet { designs })
    }
}
