//! Bounded-concurrency admission and completion tracking.
//!
//! The scheduler owns no business logic about stage content. It admits at most
//! `max_workers` per-paper pipelines at once, in input order (FIFO — not a
//! priority queue), launches the next paper the moment a slot frees up, and
//! returns only once every input paper has reached a terminal state. A failing
//! (or even panicking) pipeline is isolated to that paper's state; the rest of
//! the run continues.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use pipeline::{
    Paper, PipelineRecord, PipelineState, PipelineStatus, RunOutcome, StageError, StageKind,
    StageResult,
};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::paper_pipeline::PaperPipeline;

/// Admits papers to concurrent [`PaperPipeline`] executions.
pub struct PipelineScheduler {
    pipeline: Arc<PaperPipeline>,
    max_workers: usize,
    shutdown: Option<watch::Receiver<bool>>,
    // Receivers in admission order; observers clone snapshots from here while
    // the run is in flight.
    progress: Arc<RwLock<Vec<watch::Receiver<PipelineState>>>>,
}

impl PipelineScheduler {
    /// Builds a scheduler with the given worker-slot count.
    pub fn new(pipeline: Arc<PaperPipeline>, max_workers: usize) -> Self {
        Self {
            pipeline,
            max_workers: max_workers.max(1),
            shutdown: None,
            progress: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Attaches a shutdown signal. When it turns `true`, the scheduler stops
    /// admitting new papers; in-flight pipelines drain normally and unadmitted
    /// papers terminate as failed-with-cancellation.
    pub fn with_shutdown(mut self, signal: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(signal);
        self
    }

    /// Clones the latest published state of every admitted paper, in admission
    /// order. Safe to call from another task while a run is in flight; never
    /// blocks the pipelines writing the states.
    pub fn snapshot(&self) -> Vec<PipelineState> {
        self.progress
            .read()
            .expect("progress lock poisoned")
            .iter()
            .map(|rx| rx.borrow().clone())
            .collect()
    }

    /// Runs every paper to a terminal state and returns the outcome, in input
    /// order. A synchronous barrier from the caller's perspective: the future
    /// only resolves once nothing is still running.
    pub async fn run_all(&self, papers: Vec<Paper>, question: &str) -> RunOutcome {
        let total = papers.len();
        self.progress
            .write()
            .expect("progress lock poisoned")
            .clear();

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut join_set: JoinSet<(usize, PipelineState)> = JoinSet::new();
        let mut task_order: HashMap<tokio::task::Id, usize> = HashMap::new();
        let mut states: Vec<Option<PipelineState>> = (0..total).map(|_| None).collect();
        let mut shutdown = self.shutdown.clone();
        let mut draining = false;

        info!(papers = total, max_workers = self.max_workers, "scheduling pipelines");

        for (idx, paper) in papers.iter().enumerate() {
            if draining || shutdown_requested(&shutdown) {
                states[idx] = Some(cancelled_state(paper));
                continue;
            }
            let permit = tokio::select! {
                biased;
                () = shutdown_signalled(&mut shutdown) => {
                    draining = true;
                    states[idx] = Some(cancelled_state(paper));
                    continue;
                }
                acquired = Arc::clone(&semaphore).acquire_owned() => match acquired {
                    Ok(permit) => permit,
                    // The semaphore is never closed; treat it like shutdown if
                    // it somehow is.
                    Err(_) => {
                        draining = true;
                        states[idx] = Some(cancelled_state(paper));
                        continue;
                    }
                },
            };

            let (tx, rx) = watch::channel(PipelineState::new(paper.id.clone()));
            self.progress
                .write()
                .expect("progress lock poisoned")
                .push(rx);

            let pipeline = Arc::clone(&self.pipeline);
            let paper = paper.clone();
            let question = question.to_string();
            let handle = join_set.spawn(async move {
                let state = pipeline.run_for(&paper, &question, &tx).await;
                drop(permit);
                (idx, state)
            });
            task_order.insert(handle.id(), idx);
        }

        // Drain: every spawned pipeline reports exactly one terminal state; a
        // panicked task is converted to a failed state rather than lost.
        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((_id, (idx, state))) => {
                    states[idx] = Some(state);
                }
                Err(join_err) => {
                    let idx = task_order.get(&join_err.id()).copied();
                    warn!(error = %join_err, "pipeline task aborted");
                    if let Some(idx) = idx {
                        states[idx] = Some(aborted_state(&papers[idx]));
                    }
                }
            }
        }

        let entries = papers
            .into_iter()
            .zip(states)
            .map(|(paper, state)| {
                let state = state.unwrap_or_else(|| aborted_state(&paper));
                PipelineRecord { paper, state }
            })
            .collect();
        RunOutcome::new(entries)
    }
}

fn cancelled_state(paper: &Paper) -> PipelineState {
    let mut state = PipelineState::new(paper.id.clone());
    state.record_stage(
        StageKind::AbstractAnalysis,
        StageResult::Failed {
            error: StageError::Cancelled,
        },
    );
    state.finish(PipelineStatus::Failed);
    state
}

fn aborted_state(paper: &Paper) -> PipelineState {
    let mut state = PipelineState::new(paper.id.clone());
    state.finish(PipelineStatus::Failed);
    state
}

fn shutdown_requested(signal: &Option<watch::Receiver<bool>>) -> bool {
    signal.as_ref().is_some_and(|rx| *rx.borrow())
}

/// Resolves when the shutdown signal turns `true`; pends forever when no
/// signal is attached or the sender is gone.
async fn shutdown_signalled(signal: &mut Option<watch::Receiver<bool>>) {
    match signal {
        Some(rx) => loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        },
        None => std::future::pending().await,
    }
}
