//! In-memory port fakes shared by the unit tests in this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pipeline::{
    AbstractAnalysis, ExperimentDesign, ExperimentDesignSet, Hypothesis, HypothesisSet,
    IndexError, Keywords, Paper, PaperAnalysis, PaperAnalyst, PaperId, PaperIndex, ProviderError,
    ProviderName, StageKind,
};

pub fn paper(id: &str) -> Paper {
    Paper {
        id: PaperId::new(id).expect("non-empty"),
        title: format!("Paper {id}"),
        abstract_text: format!("Abstract of paper {id}."),
        full_text_url: None,
        source_url: None,
        authors: vec!["A. Researcher".into()],
        published: None,
    }
}

/// Tracks how many stage calls are in flight at once.
#[derive(Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn enter(self: &Arc<Self>) -> ProbeGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        ProbeGuard(Arc::clone(self))
    }

    pub fn max_observed(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

pub struct ProbeGuard(Arc<ConcurrencyProbe>);

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A [`PaperAnalyst`] whose behaviour per stage is scripted by the test.
pub struct ScriptedAnalyst {
    relevant: bool,
    fail_at: Option<StageKind>,
    stall: Option<(StageKind, Duration)>,
    delay: Duration,
    probe: Option<Arc<ConcurrencyProbe>>,
}

impl ScriptedAnalyst {
    pub fn succeeding() -> Self {
        Self {
            relevant: true,
            fail_at: None,
            stall: None,
            delay: Duration::ZERO,
            probe: None,
        }
    }

    pub fn failing_at(mut self, kind: StageKind) -> Self {
        self.fail_at = Some(kind);
        self
    }

    pub fn stalling_at(mut self, kind: StageKind, delay: Duration) -> Self {
        self.stall = Some((kind, delay));
        self
    }

    pub fn irrelevant(mut self) -> Self {
        self.relevant = false;
        self
    }

    pub fn with_stage_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_probe(mut self, probe: Arc<ConcurrencyProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    async fn step(&self, kind: StageKind) -> Result<(), ProviderError> {
        let _guard = self.probe.as_ref().map(ConcurrencyProbe::enter);
        let delay = match self.stall {
            Some((stalled, d)) if stalled == kind => d,
            _ => self.delay,
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_at == Some(kind) {
            return Err(ProviderError::Api {
                status: 500,
                message: format!("scripted failure at {kind}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaperAnalyst for ScriptedAnalyst {
    async fn analyze_abstract(
        &self,
        _paper: &Paper,
        _question: &str,
    ) -> Result<AbstractAnalysis, ProviderError> {
        self.step(StageKind::AbstractAnalysis).await?;
        Ok(AbstractAnalysis {
            relevant: self.relevant,
            confidence: 0.9,
            reason: if self.relevant {
                "addresses the question".into()
            } else {
                "off topic".into()
            },
        })
    }

    async fn analyze_full_paper(
        &self,
        paper: &Paper,
        _full_text: &str,
        _question: &str,
    ) -> Result<PaperAnalysis, ProviderError> {
        self.step(StageKind::FullPaperAnalysis).await?;
        Ok(PaperAnalysis {
            summary: format!("Summary of {}", paper.id),
            relevant_points: vec![format!("finding from {}", paper.id), "shared finding".into()],
            limitations: vec![],
        })
    }

    async fn generate_hypotheses(
        &self,
        paper: &Paper,
        _full_text: &str,
        _question: &str,
        _analysis: &PaperAnalysis,
    ) -> Result<HypothesisSet, ProviderError> {
        self.step(StageKind::HypothesisGeneration).await?;
        Ok(HypothesisSet {
            hypotheses: vec![Hypothesis {
                hypothesis: format!("H-{}", paper.id),
                rationale: "scripted".into(),
            }],
            knowledge_gaps: vec![format!("gap from {}", paper.id), "shared gap".into()],
            research_directions: vec![],
        })
    }

    async fn design_experiments(
        &self,
        paper: &Paper,
        _full_text: &str,
        hypotheses: &HypothesisSet,
    ) -> Result<ExperimentDesignSet, ProviderError> {
        self.step(StageKind::ExperimentDesign).await?;
        Ok(ExperimentDesignSet {
            designs: hypotheses
                .hypotheses
                .iter()
                .map(|h| ExperimentDesign {
                    hypothesis: h.hypothesis.clone(),
                    overview: format!("design for {}", paper.id),
                    procedures: vec![],
                    methodologies: vec![],
                    controls: vec![],
                    expected_outcomes: vec![],
                })
                .collect(),
        })
    }
}

/// A [`PaperIndex`] serving a fixed paper list and optional full text.
#[derive(Default)]
pub struct StaticIndex {
    pub papers: Vec<Paper>,
    pub full_text: Option<String>,
    pub fail_search: bool,
}

#[async_trait]
impl PaperIndex for StaticIndex {
    async fn search(
        &self,
        _keywords: &Keywords,
        max_results: usize,
    ) -> Result<Vec<Paper>, IndexError> {
        if self.fail_search {
            return Err(IndexError::Api {
                status: 503,
                message: "index unavailable".into(),
            });
        }
        Ok(self.papers.iter().take(max_results).cloned().collect())
    }

    async fn fetch_full_text(&self, _paper: &Paper) -> Result<String, IndexError> {
        self.full_text.clone().ok_or(IndexError::NoFullText)
    }
}

/// A [`pipeline::KeywordSource`] that returns a fixed outcome and counts calls.
pub struct ScriptedKeywordSource {
    name: ProviderName,
    outcome: Result<Keywords, ProviderError>,
    calls: AtomicUsize,
}

impl ScriptedKeywordSource {
    pub fn succeeding(name: &str, terms: &[&str]) -> Self {
        Self {
            name: ProviderName::new(name).expect("non-empty"),
            outcome: Ok(Keywords::new(terms.iter().map(|t| t.to_string()).collect())
                .expect("non-empty terms")),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: ProviderName::new(name).expect("non-empty"),
            outcome: Err(ProviderError::Api {
                status: 500,
                message: "provider down".into(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl pipeline::KeywordSource for ScriptedKeywordSource {
    fn name(&self) -> &ProviderName {
        &self.name
    }

    async fn extract(&self, _question: &str) -> Result<Keywords, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
