//! The run driver: one research question in, one aggregate report out.
//!
//! Composes the keyword extractor, the paper index, the scheduler, and the
//! aggregator into a single entry point. The phases before scheduling are
//! strictly sequential and fatal on error: without keywords there is no search,
//! and without search results there is nothing to schedule. Per-paper failures
//! only become non-fatal once the scheduler takes over.

use std::sync::Arc;

use pipeline::{
    AggregateReport, IndexError, PaperAnalyst, PaperIndex, PaperMillError, PipelineState,
    ResearchQuery, RunConfig, RunId, ServiceName,
};
use tokio::sync::watch;
use tracing::{info, info_span, Instrument};

use crate::aggregate::ResultAggregator;
use crate::keywords::{KeywordExtractor, KeywordProvider};
use crate::paper_pipeline::PaperPipeline;
use crate::rate_limit::RateLimiter;
use crate::scheduler::PipelineScheduler;

/// Executes complete research runs over injected providers.
pub struct ResearchRun {
    keywords: KeywordExtractor,
    index: Arc<dyn PaperIndex>,
    scheduler: PipelineScheduler,
    limiter: Arc<RateLimiter>,
    index_service: ServiceName,
    default_max_results: usize,
}

impl ResearchRun {
    /// Wires up a run driver from a validated configuration.
    ///
    /// All rate-limit buckets are shared: the keyword extractor, the index
    /// search, and every pipeline stage draw from the same limiter.
    pub fn new(
        config: &RunConfig,
        analyst: Arc<dyn PaperAnalyst>,
        index: Arc<dyn PaperIndex>,
        keyword_providers: Vec<KeywordProvider>,
    ) -> Result<Self, PaperMillError> {
        config.validate()?;
        let limiter = Arc::new(RateLimiter::new(&config.rate_limits));
        let pipeline = Arc::new(PaperPipeline::new(
            analyst,
            Arc::clone(&index),
            Arc::clone(&limiter),
            config,
        ));
        Ok(Self {
            keywords: KeywordExtractor::new(keyword_providers, Arc::clone(&limiter)),
            index,
            scheduler: PipelineScheduler::new(pipeline, config.max_workers),
            limiter,
            index_service: config.index_service.clone(),
            default_max_results: config.default_max_results,
        })
    }

    /// Attaches a shutdown signal; see [`PipelineScheduler::with_shutdown`].
    pub fn with_shutdown(mut self, signal: watch::Receiver<bool>) -> Self {
        self.scheduler = self.scheduler.with_shutdown(signal);
        self
    }

    /// Clones the latest per-paper progress states of the run in flight.
    pub fn snapshot(&self) -> Vec<PipelineState> {
        self.scheduler.snapshot()
    }

    /// Runs the whole sequence: keyword extraction, index search, scheduled
    /// per-paper pipelines, aggregation.
    pub async fn execute(&self, query: &ResearchQuery) -> Result<AggregateReport, PaperMillError> {
        let run_id = RunId::new_random();
        let span = info_span!("research_run", run_id = %run_id);
        self.execute_inner(query).instrument(span).await
    }

    async fn execute_inner(
        &self,
        query: &ResearchQuery,
    ) -> Result<AggregateReport, PaperMillError> {
        let keywords = self.keywords.extract(query.question()).await?;

        let max_results = query.effective_max_results(self.default_max_results);
        self.limiter
            .acquire(&self.index_service)
            .await
            .map_err(|err| IndexError::Transport {
                message: err.to_string(),
            })?;
        let papers = self.index.search(&keywords, max_results).await?;
        info!(found = papers.len(), max_results, "index search finished");

        let outcome = self.scheduler.run_all(papers, query.question()).await;
        Ok(ResultAggregator::aggregate(&outcome))
    }
}
