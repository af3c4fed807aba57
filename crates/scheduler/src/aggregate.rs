//! Consolidation of terminal pipeline states into one report.
//!
//! Pure function, no suspension, no side effects: the same outcome always
//! aggregates to the same report, entry for entry, so callers may re-run it
//! freely (e.g. once for display, once for export).

use std::collections::HashSet;

use pipeline::{
    AggregateReport, IncompletePaper, PaperSummary, PipelineStatus, RunOutcome, StageKind,
    StageOutput, StageResult,
};

/// Builds the final [`AggregateReport`] from a drained run.
pub struct ResultAggregator;

impl ResultAggregator {
    /// Walks all entries in input paper order and consolidates their payloads.
    ///
    /// Hypotheses and designs are taken only from pipelines whose respective
    /// stage succeeded; papers with status `failed` or `partially_failed` are
    /// counted and listed with the failing stage and failure mode.
    pub fn aggregate(outcome: &RunOutcome) -> AggregateReport {
        let mut papers = Vec::with_capacity(outcome.len());
        let mut hypotheses = Vec::new();
        let mut experiment_designs = Vec::new();
        let mut key_findings = Vec::new();
        let mut seen_findings = HashSet::new();
        let mut knowledge_gaps = Vec::new();
        let mut seen_gaps = HashSet::new();
        let mut incomplete = Vec::new();
        let mut completed = 0;
        let mut filtered = 0;

        for record in outcome.entries() {
            let state = &record.state;
            papers.push(PaperSummary {
                paper_id: record.paper.id.clone(),
                title: record.paper.title.clone(),
                status: state.status,
            });
            match state.status {
                PipelineStatus::Completed => completed += 1,
                PipelineStatus::Filtered => filtered += 1,
                PipelineStatus::Failed | PipelineStatus::PartiallyFailed => {
                    incomplete.push(diagnose(record));
                }
                // Non-terminal statuses cannot appear in a drained outcome,
                // but the aggregator stays total rather than panicking.
                PipelineStatus::Pending | PipelineStatus::Running => {
                    incomplete.push(diagnose(record));
                }
            }

            if let Some(StageOutput::FullPaper(analysis)) =
                state.stage_output(StageKind::FullPaperAnalysis)
            {
                for point in &analysis.relevant_points {
                    if seen_findings.insert(point.clone()) {
                        key_findings.push(point.clone());
                    }
                }
            }
            if let Some(StageOutput::Hypotheses(set)) =
                state.stage_output(StageKind::HypothesisGeneration)
            {
                hypotheses.extend(set.hypotheses.iter().cloned());
                for gap in &set.knowledge_gaps {
                    if seen_gaps.insert(gap.clone()) {
                        knowledge_gaps.push(gap.clone());
                    }
                }
            }
            if let Some(StageOutput::Experiments(set)) =
                state.stage_output(StageKind::ExperimentDesign)
            {
                experiment_designs.extend(set.designs.iter().cloned());
            }
        }

        AggregateReport {
            total_papers: outcome.len(),
            completed,
            filtered,
            incomplete_count: incomplete.len(),
            papers,
            hypotheses,
            experiment_designs,
            key_findings,
            knowledge_gaps,
            incomplete,
        }
    }
}

fn diagnose(record: &pipeline::PipelineRecord) -> IncompletePaper {
    let state = &record.state;
    match state.first_failure() {
        Some((kind, StageResult::TimedOut)) => IncompletePaper {
            paper_id: record.paper.id.clone(),
            status: state.status,
            failed_stage: Some(kind),
            timed_out: true,
            reason: format!("{kind} exceeded its deadline"),
        },
        Some((kind, StageResult::Failed { error })) => IncompletePaper {
            paper_id: record.paper.id.clone(),
            status: state.status,
            failed_stage: Some(kind),
            timed_out: false,
            reason: format!("{kind}: {error}"),
        },
        _ => IncompletePaper {
            paper_id: record.paper.id.clone(),
            status: state.status,
            failed_stage: None,
            timed_out: false,
            reason: "pipeline did not run to completion".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::paper;
    use pipeline::{
        AbstractAnalysis, ExperimentDesign, ExperimentDesignSet, Hypothesis, HypothesisSet,
        PaperAnalysis, PipelineRecord, PipelineState, StageError,
    };

    fn success(output: StageOutput) -> StageResult {
        StageResult::Success { output }
    }

    fn abstract_ok() -> StageResult {
        success(StageOutput::Abstract(AbstractAnalysis {
            relevant: true,
            confidence: 0.9,
            reason: "relevant".into(),
        }))
    }

    fn full_paper_ok(id: &str) -> StageResult {
        success(StageOutput::FullPaper(PaperAnalysis {
            summary: format!("summary {id}"),
            relevant_points: vec![format!("finding {id}"), "shared finding".into()],
            limitations: vec![],
        }))
    }

    fn hypotheses_ok(id: &str) -> StageResult {
        success(StageOutput::Hypotheses(HypothesisSet {
            hypotheses: vec![Hypothesis {
                hypothesis: format!("H-{id}"),
                rationale: String::new(),
            }],
            knowledge_gaps: vec!["shared gap".into()],
            research_directions: vec![],
        }))
    }

    fn designs_ok(id: &str) -> StageResult {
        success(StageOutput::Experiments(ExperimentDesignSet {
            designs: vec![ExperimentDesign {
                hypothesis: format!("H-{id}"),
                overview: String::new(),
                procedures: vec![],
                methodologies: vec![],
                controls: vec![],
                expected_outcomes: vec![],
            }],
        }))
    }

    fn completed_record(id: &str) -> PipelineRecord {
        let paper = paper(id);
        let mut state = PipelineState::new(paper.id.clone());
        state.record_stage(StageKind::AbstractAnalysis, abstract_ok());
        state.record_stage(StageKind::FullPaperAnalysis, full_paper_ok(id));
        state.record_stage(StageKind::HypothesisGeneration, hypotheses_ok(id));
        state.record_stage(StageKind::ExperimentDesign, designs_ok(id));
        state.finish(PipelineStatus::Completed);
        PipelineRecord { paper, state }
    }

    fn partial_record(id: &str) -> PipelineRecord {
        // Succeeded through full-paper analysis, then timed out on hypotheses.
        let paper = paper(id);
        let mut state = PipelineState::new(paper.id.clone());
        state.record_stage(StageKind::AbstractAnalysis, abstract_ok());
        state.record_stage(StageKind::FullPaperAnalysis, full_paper_ok(id));
        state.record_stage(StageKind::HypothesisGeneration, StageResult::TimedOut);
        state.finish(PipelineStatus::PartiallyFailed);
        PipelineRecord { paper, state }
    }

    fn failed_record(id: &str) -> PipelineRecord {
        let paper = paper(id);
        let mut state = PipelineState::new(paper.id.clone());
        state.record_stage(
            StageKind::AbstractAnalysis,
            StageResult::Failed {
                error: StageError::Provider {
                    message: "provider down".into(),
                },
            },
        );
        state.finish(PipelineStatus::Failed);
        PipelineRecord { paper, state }
    }

    fn mixed_outcome() -> RunOutcome {
        RunOutcome::new(vec![
            completed_record("p1"),
            partial_record("p2"),
            completed_record("p3"),
            failed_record("p4"),
        ])
    }

    #[test]
    fn hypotheses_come_only_from_succeeded_stages() {
        let report = ResultAggregator::aggregate(&mixed_outcome());
        let statements: Vec<&str> = report
            .hypotheses
            .iter()
            .map(|h| h.hypothesis.as_str())
            .collect();
        assert_eq!(statements, ["H-p1", "H-p3"]);
        assert_eq!(report.incomplete_count, 2);
        assert_eq!(report.completed, 2);
    }

    #[test]
    fn diagnostics_name_stage_and_failure_mode() {
        let report = ResultAggregator::aggregate(&mixed_outcome());
        assert_eq!(report.incomplete.len(), 2);
        let partial = &report.incomplete[0];
        assert_eq!(partial.failed_stage, Some(StageKind::HypothesisGeneration));
        assert!(partial.timed_out);
        let failed = &report.incomplete[1];
        assert_eq!(failed.failed_stage, Some(StageKind::AbstractAnalysis));
        assert!(!failed.timed_out);
        assert!(failed.reason.contains("provider down"));
    }

    #[test]
    fn key_findings_are_deduplicated_in_first_seen_order() {
        let report = ResultAggregator::aggregate(&mixed_outcome());
        // p2's full-paper stage succeeded, so its findings count too.
        assert_eq!(
            report.key_findings,
            [
                "finding p1",
                "shared finding",
                "finding p2",
                "finding p3",
            ]
        );
        assert_eq!(report.knowledge_gaps, ["shared gap"]);
    }

    #[test]
    fn flat_lists_follow_input_paper_order() {
        let forward = ResultAggregator::aggregate(&mixed_outcome());
        let reversed_outcome = RunOutcome::new(vec![
            failed_record("p4"),
            completed_record("p3"),
            partial_record("p2"),
            completed_record("p1"),
        ]);
        let reversed = ResultAggregator::aggregate(&reversed_outcome);
        assert_ne!(forward.hypotheses, reversed.hypotheses);
        assert_eq!(
            reversed
                .hypotheses
                .iter()
                .map(|h| h.hypothesis.as_str())
                .collect::<Vec<_>>(),
            ["H-p3", "H-p1"]
        );
    }

    #[test]
    fn aggregation_is_idempotent() {
        let outcome = mixed_outcome();
        let first = ResultAggregator::aggregate(&outcome);
        let second = ResultAggregator::aggregate(&outcome);
        assert_eq!(first, second);
        let a = serde_json::to_vec(&first).expect("serialises");
        let b = serde_json::to_vec(&second).expect("serialises");
        assert_eq!(a, b);
    }

    #[test]
    fn filtered_papers_are_counted_separately() {
        let paper = paper("p5");
        let mut state = PipelineState::new(paper.id.clone());
        state.record_stage(
            StageKind::AbstractAnalysis,
            success(StageOutput::Abstract(AbstractAnalysis {
                relevant: false,
                confidence: 0.8,
                reason: "off topic".into(),
            })),
        );
        state.finish(PipelineStatus::Filtered);
        let outcome = RunOutcome::new(vec![PipelineRecord { paper, state }]);
        let report = ResultAggregator::aggregate(&outcome);
        assert_eq!(report.filtered, 1);
        assert_eq!(report.incomplete_count, 0);
        assert!(report.hypotheses.is_empty());
    }
}
