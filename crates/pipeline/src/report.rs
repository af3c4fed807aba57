//! Terminal run outcome and the consolidated report.
//!
//! [`RunOutcome`] is what the scheduler returns once every admitted paper has
//! reached a terminal state: one [`PipelineRecord`] per input paper, in input
//! order. [`AggregateReport`] is the pure, deterministic consolidation of an
//! outcome — built once, read-only after construction, and free of wall-clock
//! data so that aggregating the same outcome twice yields byte-identical
//! serialisations.

use serde::{Deserialize, Serialize};

use crate::{Paper, PaperId, PipelineState, PipelineStatus, StageKind};
use crate::types::{ExperimentDesign, Hypothesis};

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

/// One paper together with its terminal pipeline state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRecord {
    /// The paper as returned by the index search.
    pub paper: Paper,
    /// The terminal state its pipeline reached.
    pub state: PipelineState,
}

/// The scheduler's return value: every input paper mapped to exactly one
/// terminal [`PipelineState`], preserving input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    entries: Vec<PipelineRecord>,
}

impl RunOutcome {
    /// Builds an outcome from per-paper records (already in input order).
    pub fn new(entries: Vec<PipelineRecord>) -> Self {
        Self { entries }
    }

    /// Records in input paper order.
    pub fn entries(&self) -> &[PipelineRecord] {
        &self.entries
    }

    /// Number of papers in the run.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the run had no papers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up one paper's record by identifier.
    pub fn get(&self, id: &PaperId) -> Option<&PipelineRecord> {
        self.entries.iter().find(|r| r.paper.id == *id)
    }
}

// ---------------------------------------------------------------------------
// Aggregate report
// ---------------------------------------------------------------------------

/// Per-paper summary line in the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperSummary {
    /// Index-assigned paper identifier.
    pub paper_id: PaperId,
    /// Paper title.
    pub title: String,
    /// Terminal pipeline status.
    pub status: PipelineStatus,
}

/// Diagnostic entry for a paper whose pipeline did not fully complete.
///
/// Carries enough detail (which stage, timeout vs error) to diagnose without
/// re-running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompletePaper {
    /// Index-assigned paper identifier.
    pub paper_id: PaperId,
    /// Terminal status (`failed` or `partially_failed`).
    pub status: PipelineStatus,
    /// The first stage that did not succeed, when one was recorded.
    pub failed_stage: Option<StageKind>,
    /// `true` when the failing stage hit its deadline rather than erroring.
    pub timed_out: bool,
    /// Human-readable failure description.
    pub reason: String,
}

/// Final consolidated structure for one research run.
///
/// Ordering of the flat lists follows input paper order, so identical outcomes
/// aggregate to identical reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Papers handed to the scheduler.
    pub total_papers: usize,
    /// Papers whose four stages all succeeded.
    pub completed: usize,
    /// Papers screened out as irrelevant at the abstract stage.
    pub filtered: usize,
    /// Papers with status `failed` or `partially_failed`.
    pub incomplete_count: usize,
    /// One summary line per paper, in input order.
    pub papers: Vec<PaperSummary>,
    /// Every hypothesis from pipelines whose hypothesis stage succeeded.
    pub hypotheses: Vec<Hypothesis>,
    /// Every experiment design from pipelines whose design stage succeeded.
    pub experiment_designs: Vec<ExperimentDesign>,
    /// Deduplicated relevant points from successful full-paper analyses,
    /// first-seen order.
    pub key_findings: Vec<String>,
    /// Deduplicated knowledge gaps from successful hypothesis stages,
    /// first-seen order.
    pub knowledge_gaps: Vec<String>,
    /// Diagnostics for papers that did not fully complete, in input order.
    pub incomplete: Vec<IncompletePaper>,
}
