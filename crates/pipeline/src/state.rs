//! Per-paper stage outcomes and pipeline status tracking.
//!
//! A [`PipelineState`] is created when a paper is admitted to the scheduler
//! and mutated only by the pipeline running that paper (single-writer
//! invariant). Observers receive cloned snapshots, never shared mutable
//! access. The status moves to a terminal value exactly once.

use serde::{Deserialize, Serialize};

use crate::{PaperId, StageError, StageKind, StageOutput};

// ---------------------------------------------------------------------------
// Stage results
// ---------------------------------------------------------------------------

/// Tagged outcome of one stage for one paper. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum StageResult {
    /// The stage produced its payload.
    Success {
        /// The typed stage payload.
        output: StageOutput,
    },
    /// The stage's work raised an error.
    Failed {
        /// Why the stage failed.
        error: StageError,
    },
    /// The stage exceeded its deadline and was cancelled.
    TimedOut,
}

impl StageResult {
    /// Returns the payload if this result is a success.
    pub fn output(&self) -> Option<&StageOutput> {
        match self {
            StageResult::Success { output } => Some(output),
            _ => None,
        }
    }

    /// Returns `true` for [`StageResult::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, StageResult::Success { .. })
    }
}

// ---------------------------------------------------------------------------
// Pipeline status
// ---------------------------------------------------------------------------

/// Overall status of one paper's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Admitted but not yet started.
    Pending,
    /// At least one stage is executing.
    Running,
    /// All four stages succeeded.
    Completed,
    /// Abstract screening judged the paper irrelevant; later stages were
    /// intentionally skipped. Not a failure.
    Filtered,
    /// A stage failed or timed out after at least one stage succeeded.
    PartiallyFailed,
    /// The first stage failed, or the pipeline never ran to completion.
    Failed,
}

impl PipelineStatus {
    /// Returns `true` for statuses from which no further transition occurs.
    pub fn is_terminal(self) -> bool {
        !matches!(self, PipelineStatus::Pending | PipelineStatus::Running)
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineStatus::Pending => "pending",
            PipelineStatus::Running => "running",
            PipelineStatus::Completed => "completed",
            PipelineStatus::Filtered => "filtered",
            PipelineStatus::PartiallyFailed => "partially_failed",
            PipelineStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Pipeline state
// ---------------------------------------------------------------------------

/// Aggregate of one paper's four stage results plus its overall status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// The paper this state belongs to.
    pub paper_id: PaperId,
    /// Current overall status.
    pub status: PipelineStatus,
    /// One slot per stage, in execution order; `None` until the stage has a
    /// recorded result.
    stages: [Option<StageResult>; 4],
}

impl PipelineState {
    /// Creates a fresh state in [`PipelineStatus::Pending`].
    pub fn new(paper_id: PaperId) -> Self {
        Self {
            paper_id,
            status: PipelineStatus::Pending,
            stages: [None, None, None, None],
        }
    }

    /// Marks the pipeline as running. No-op once terminal.
    pub fn mark_running(&mut self) {
        if !self.status.is_terminal() {
            self.status = PipelineStatus::Running;
        }
    }

    /// Records the result of one stage.
    pub fn record_stage(&mut self, kind: StageKind, result: StageResult) {
        self.stages[kind.index()] = Some(result);
    }

    /// Moves the pipeline to a terminal status. Later calls are ignored so the
    /// single-transition invariant holds even under defect.
    pub fn finish(&mut self, status: PipelineStatus) {
        debug_assert!(status.is_terminal());
        if !self.status.is_terminal() {
            self.status = status;
        }
    }

    /// Returns the recorded result for a stage, if any.
    pub fn stage(&self, kind: StageKind) -> Option<&StageResult> {
        self.stages[kind.index()].as_ref()
    }

    /// Returns the successful payload of a stage, if it succeeded.
    pub fn stage_output(&self, kind: StageKind) -> Option<&StageOutput> {
        self.stage(kind).and_then(StageResult::output)
    }

    /// Number of stages that have a recorded [`StageResult::Success`].
    pub fn succeeded_stages(&self) -> usize {
        self.stages
            .iter()
            .flatten()
            .filter(|r| r.is_success())
            .count()
    }

    /// The first stage (in execution order) whose result is not a success,
    /// together with that result.
    pub fn first_failure(&self) -> Option<(StageKind, &StageResult)> {
        StageKind::ALL.iter().find_map(|kind| {
            self.stage(*kind)
                .filter(|r| !r.is_success())
                .map(|r| (*kind, r))
        })
    }

    /// The terminal status implied by a halt after `kind` did not succeed:
    /// [`PipelineStatus::PartiallyFailed`] when an earlier stage succeeded,
    /// [`PipelineStatus::Failed`] otherwise.
    pub fn failure_status(&self) -> PipelineStatus {
        if self.succeeded_stages() > 0 {
            PipelineStatus::PartiallyFailed
        } else {
            PipelineStatus::Failed
        }
    }
}
