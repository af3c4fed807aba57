//! Sequencing of the four analysis stages for one paper.
//!
//! Stages run strictly in order; a stage only starts after the previous one
//! succeeded. Every stage call is wrapped the same way: acquire the rate-limit
//! grant for the stage's target service first, then hand the work to the
//! executor with the stage's deadline. Each result is recorded into the
//! paper's state and published immediately, so observers see fine-grained
//! progress while the pipeline runs.

use std::sync::Arc;

use pipeline::{
    Paper, PaperAnalyst, PaperIndex, PipelineState, PipelineStatus, ProviderError, RunConfig,
    ServiceName, StageError, StageKind, StageOutput, StageResult, StagePolicies,
};
use tokio::sync::watch;
use tracing::{debug_span, info, warn, Instrument};

use crate::executor::StageExecutor;
use crate::rate_limit::RateLimiter;

/// Runs the abstract → full-paper → hypothesis → experiment-design sequence
/// for single papers.
///
/// Holds no per-paper state; one instance is shared by all worker slots.
pub struct PaperPipeline {
    analyst: Arc<dyn PaperAnalyst>,
    index: Arc<dyn PaperIndex>,
    limiter: Arc<RateLimiter>,
    policies: StagePolicies,
    index_service: ServiceName,
    max_full_text_chars: usize,
}

impl PaperPipeline {
    /// Builds a pipeline over the injected collaborators.
    pub fn new(
        analyst: Arc<dyn PaperAnalyst>,
        index: Arc<dyn PaperIndex>,
        limiter: Arc<RateLimiter>,
        config: &RunConfig,
    ) -> Self {
        Self {
            analyst,
            index,
            limiter,
            policies: config.stages.clone(),
            index_service: config.index_service.clone(),
            max_full_text_chars: config.max_full_text_chars,
        }
    }

    /// Runs all stages for one paper, publishing each recorded result through
    /// `progress`, and returns the terminal state.
    pub async fn run_for(
        &self,
        paper: &Paper,
        question: &str,
        progress: &watch::Sender<PipelineState>,
    ) -> PipelineState {
        let mut state = PipelineState::new(paper.id.clone());
        state.mark_running();
        progress.send_replace(state.clone());

        // Stage 1: abstract screening.
        let result = self
            .stage(StageKind::AbstractAnalysis, async {
                let analysis = self.analyst.analyze_abstract(paper, question).await?;
                Ok(StageOutput::Abstract(analysis))
            })
            .await;
        self.record(&mut state, progress, StageKind::AbstractAnalysis, result);
        let Some(screening) = state
            .stage_output(StageKind::AbstractAnalysis)
            .and_then(StageOutput::as_abstract)
            .cloned()
        else {
            return self.halt(state, progress);
        };
        if !screening.relevant {
            info!(paper_id = %paper.id, reason = %screening.reason, "paper screened out as irrelevant");
            state.finish(PipelineStatus::Filtered);
            progress.send_replace(state.clone());
            return state;
        }

        // The remaining stages all work from the same full text; fetch it once,
        // falling back to the abstract when the reference cannot be resolved.
        let full_text = self.full_text(paper).await;

        // Stage 2: full-paper analysis.
        let result = self
            .stage(StageKind::FullPaperAnalysis, async {
                let analysis = self
                    .analyst
                    .analyze_full_paper(paper, &full_text, question)
                    .await?;
                Ok(StageOutput::FullPaper(analysis))
            })
            .await;
        self.record(&mut state, progress, StageKind::FullPaperAnalysis, result);
        let Some(analysis) = state
            .stage_output(StageKind::FullPaperAnalysis)
            .and_then(StageOutput::as_full_paper)
            .cloned()
        else {
            return self.halt(state, progress);
        };

        // Stage 3: hypothesis generation.
        let result = self
            .stage(StageKind::HypothesisGeneration, async {
                let hypotheses = self
                    .analyst
                    .generate_hypotheses(paper, &full_text, question, &analysis)
                    .await?;
                Ok(StageOutput::Hypotheses(hypotheses))
            })
            .await;
        self.record(&mut state, progress, StageKind::HypothesisGeneration, result);
        let Some(hypotheses) = state
            .stage_output(StageKind::HypothesisGeneration)
            .and_then(StageOutput::as_hypotheses)
            .cloned()
        else {
            return self.halt(state, progress);
        };

        // Stage 4: experiment design.
        let result = self
            .stage(StageKind::ExperimentDesign, async {
                let designs = self
                    .analyst
                    .design_experiments(paper, &full_text, &hypotheses)
                    .await?;
                Ok(StageOutput::Experiments(designs))
            })
            .await;
        self.record(&mut state, progress, StageKind::ExperimentDesign, result);
        if state
            .stage(StageKind::ExperimentDesign)
            .is_some_and(StageResult::is_success)
        {
            state.finish(PipelineStatus::Completed);
            progress.send_replace(state.clone());
            state
        } else {
            self.halt(state, progress)
        }
    }

    /// Rate-limit grant first, then deadline-boxed execution.
    async fn stage<F>(&self, kind: StageKind, work: F) -> StageResult
    where
        F: std::future::Future<Output = Result<StageOutput, ProviderError>>,
    {
        let policy = self.policies.for_stage(kind);
        if let Err(error) = self.limiter.acquire(&policy.service).await {
            return StageResult::Failed { error };
        }
        let span = debug_span!("stage", stage = %kind, service = %policy.service);
        StageExecutor::run(policy.deadline(), async move {
            work.await.map_err(StageError::from)
        })
        .instrument(span)
        .await
    }

    fn record(
        &self,
        state: &mut PipelineState,
        progress: &watch::Sender<PipelineState>,
        kind: StageKind,
        result: StageResult,
    ) {
        state.record_stage(kind, result);
        progress.send_replace(state.clone());
    }

    fn halt(
        &self,
        mut state: PipelineState,
        progress: &watch::Sender<PipelineState>,
    ) -> PipelineState {
        let status = state.failure_status();
        if let Some((kind, result)) = state.first_failure() {
            warn!(paper_id = %state.paper_id, stage = %kind, ?result, "pipeline halted");
        }
        state.finish(status);
        progress.send_replace(state.clone());
        state
    }

    /// Fetches the paper's full text under the index rate bucket, truncated to
    /// the configured character budget; degrades to the abstract on any
    /// failure.
    async fn full_text(&self, paper: &Paper) -> String {
        let fetched = match self.limiter.acquire(&self.index_service).await {
            Ok(()) => self.index.fetch_full_text(paper).await,
            Err(err) => {
                warn!(paper_id = %paper.id, error = %err, "index bucket rejected full-text fetch");
                return paper.abstract_text.clone();
            }
        };
        match fetched {
            Ok(text) => truncate_chars(text, self.max_full_text_chars),
            Err(err) => {
                warn!(paper_id = %paper.id, error = %err, "full text unavailable, using abstract");
                paper.abstract_text.clone()
            }
        }
    }
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text
    } else {
        text.chars().take(max_chars).collect()
    }
}
