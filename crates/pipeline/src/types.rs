//! Shared value types for the PaperMill domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (e.g. a [`ResearchQuery`] is non-empty and
//! bounded in length, [`Keywords`] is a non-empty ordered list) and participate
//! in domain computations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{PaperId, PaperMillError};

/// Maximum accepted length of a research question, in characters.
pub const MAX_QUESTION_CHARS: usize = 1000;

/// Bounds applied to a requested result count before it reaches the index.
pub const MIN_RESULTS: usize = 3;
/// Upper bound on papers requested from the index in one search.
pub const MAX_RESULTS: usize = 49;

// ---------------------------------------------------------------------------
// Run input
// ---------------------------------------------------------------------------

/// The immutable input to a research run: a free-text research question plus
/// an optional cap on how many papers to retrieve.
///
/// Validated at construction; read-only thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuery {
    question: String,
    max_results: Option<usize>,
}

impl ResearchQuery {
    /// Creates a validated [`ResearchQuery`].
    ///
    /// Rejects empty (or whitespace-only) questions and questions longer than
    /// [`MAX_QUESTION_CHARS`].
    pub fn new(
        question: impl Into<String>,
        max_results: Option<usize>,
    ) -> Result<Self, PaperMillError> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(PaperMillError::InvalidQuery {
                reason: "research question must not be empty".into(),
            });
        }
        if question.chars().count() > MAX_QUESTION_CHARS {
            return Err(PaperMillError::InvalidQuery {
                reason: format!("research question exceeds {MAX_QUESTION_CHARS} characters"),
            });
        }
        Ok(Self {
            question,
            max_results,
        })
    }

    /// Returns the research question text.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Returns the result cap to use for the index search, clamped to
    /// `MIN_RESULTS..=MAX_RESULTS`. Falls back to `default` when the query
    /// did not specify one.
    pub fn effective_max_results(&self, default: usize) -> usize {
        self.max_results
            .unwrap_or(default)
            .clamp(MIN_RESULTS, MAX_RESULTS)
    }
}

// ---------------------------------------------------------------------------

/// Ordered, non-empty list of search terms derived from a [`ResearchQuery`].
///
/// Produced once by keyword extraction; consumed by the index search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keywords(Vec<String>);

impl Keywords {
    /// Creates a [`Keywords`] list, returning `None` if no non-empty terms remain
    /// after trimming.
    pub fn new(terms: Vec<String>) -> Option<Self> {
        let terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            None
        } else {
            Some(Self(terms))
        }
    }

    /// Returns the search terms in extraction order.
    pub fn terms(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for Keywords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Papers
// ---------------------------------------------------------------------------

/// One paper record as returned by the index search.
///
/// Immutable once fetched. The full text is *not* carried here — only a
/// reference to it; the pipeline fetches it lazily when the full-paper
/// analysis stage needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Index-assigned identifier.
    pub id: PaperId,
    /// Paper title.
    pub title: String,
    /// Abstract text as returned by the index.
    pub abstract_text: String,
    /// URL of an open-access full-text document, when the index knows one.
    pub full_text_url: Option<String>,
    /// Landing-page URL at the index.
    pub source_url: Option<String>,
    /// Author display names, in the index's order.
    pub authors: Vec<String>,
    /// Publication date, when known.
    pub published: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// The four analysis stages applied, in this order, to every paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Relevance screening of the abstract against the research question.
    AbstractAnalysis,
    /// Analysis of the (lazily fetched) full paper text.
    FullPaperAnalysis,
    /// Hypothesis generation from the paper and research question.
    HypothesisGeneration,
    /// Experiment design for the generated hypotheses.
    ExperimentDesign,
}

impl StageKind {
    /// All stages in execution order.
    pub const ALL: [StageKind; 4] = [
        StageKind::AbstractAnalysis,
        StageKind::FullPaperAnalysis,
        StageKind::HypothesisGeneration,
        StageKind::ExperimentDesign,
    ];

    /// Position of this stage in the execution order.
    pub fn index(self) -> usize {
        match self {
            StageKind::AbstractAnalysis => 0,
            StageKind::FullPaperAnalysis => 1,
            StageKind::HypothesisGeneration => 2,
            StageKind::ExperimentDesign => 3,
        }
    }

    /// Stable snake_case name, used in logs and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::AbstractAnalysis => "abstract_analysis",
            StageKind::FullPaperAnalysis => "full_paper_analysis",
            StageKind::HypothesisGeneration => "hypothesis_generation",
            StageKind::ExperimentDesign => "experiment_design",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stage payloads
// ---------------------------------------------------------------------------

/// Outcome of the abstract-relevance screening stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractAnalysis {
    /// Whether the abstract addresses the research question.
    pub relevant: bool,
    /// Screening confidence in `[0.0, 1.0]`.
    #[serde(default)]
    pub confidence: f64,
    /// Short justification for the verdict.
    #[serde(default)]
    pub reason: String,
}

/// Outcome of the full-paper analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperAnalysis {
    /// Brief overview of findings relevant to the research question.
    #[serde(default)]
    pub summary: String,
    /// Key points that specifically address the research question.
    #[serde(default)]
    pub relevant_points: Vec<String>,
    /// Limitations or caveats noted in the paper.
    #[serde(default)]
    pub limitations: Vec<String>,
}

/// A single generated hypothesis with its rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// The hypothesis statement.
    pub hypothesis: String,
    /// Why the paper supports investigating it.
    #[serde(default)]
    pub rationale: String,
}

/// Outcome of the hypothesis-generation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisSet {
    /// Generated hypotheses, in generation order.
    #[serde(default)]
    pub hypotheses: Vec<Hypothesis>,
    /// Gaps in current knowledge identified while generating.
    #[serde(default)]
    pub knowledge_gaps: Vec<String>,
    /// Proposed novel research directions.
    #[serde(default)]
    pub research_directions: Vec<String>,
}

/// An experimental design proposed for one hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDesign {
    /// The hypothesis this design tests.
    pub hypothesis: String,
    /// Brief description of the experimental approach.
    #[serde(default)]
    pub overview: String,
    /// Ordered experimental procedures.
    #[serde(default)]
    pub procedures: Vec<String>,
    /// Required methodologies and techniques.
    #[serde(default)]
    pub methodologies: Vec<String>,
    /// Experimental controls.
    #[serde(default)]
    pub controls: Vec<String>,
    /// Expected outcomes if the hypothesis holds.
    #[serde(default)]
    pub expected_outcomes: Vec<String>,
}

/// Outcome of the experiment-design stage: one design per hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDesignSet {
    /// Designs in the same order as the hypotheses they test.
    #[serde(default)]
    pub designs: Vec<ExperimentDesign>,
}

// ---------------------------------------------------------------------------

/// Typed payload of a successful stage.
///
/// Each stage produces exactly one variant; the pipeline records the payload
/// into that paper's state and feeds it to later stages as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "stage", content = "payload")]
pub enum StageOutput {
    /// Payload of [`StageKind::AbstractAnalysis`].
    Abstract(AbstractAnalysis),
    /// Payload of [`StageKind::FullPaperAnalysis`].
    FullPaper(PaperAnalysis),
    /// Payload of [`StageKind::HypothesisGeneration`].
    Hypotheses(HypothesisSet),
    /// Payload of [`StageKind::ExperimentDesign`].
    Experiments(ExperimentDesignSet),
}

impl StageOutput {
    /// Returns the abstract-analysis payload, if this is one.
    pub fn as_abstract(&self) -> Option<&AbstractAnalysis> {
        match self {
            StageOutput::Abstract(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the full-paper analysis payload, if this is one.
    pub fn as_full_paper(&self) -> Option<&PaperAnalysis> {
        match self {
            StageOutput::FullPaper(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the hypothesis payload, if this is one.
    pub fn as_hypotheses(&self) -> Option<&HypothesisSet> {
        match self {
            StageOutput::Hypotheses(h) => Some(h),
            _ => None,
        }
    }

    /// Returns the experiment-design payload, if this is one.
    pub fn as_experiments(&self) -> Option<&ExperimentDesignSet> {
        match self {
            StageOutput::Experiments(e) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Provider request
// ---------------------------------------------------------------------------

/// One completion request to a [`crate::ports::LanguageModel`].
///
/// Deliberately minimal: a system instruction, a user message, and whether the
/// response must be a JSON document. Providers translate this into their own
/// wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System instruction (role and output-format contract).
    pub system: String,
    /// User message (the actual content to analyse).
    pub user: String,
    /// When `true`, the provider must return parseable JSON.
    pub json_response: bool,
}
