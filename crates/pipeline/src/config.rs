//! Rate-limit rules, per-stage policies, and run configuration.
//!
//! Everything a deployment might reasonably tune is a field here rather than a
//! constant in the scheduler: the worker-slot count, the per-stage deadlines,
//! and the per-service rate-limit buckets are all reference defaults, loaded
//! from `papermill.toml` and overridable from the CLI.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ServiceName, StageKind};

/// Default number of concurrently executing per-paper pipelines.
pub const DEFAULT_MAX_WORKERS: usize = 3;

/// Default deadline for the LLM-heavy stages, in seconds (5 minutes).
pub const DEFAULT_STAGE_DEADLINE_SECS: u64 = 300;

/// Default cap on full-paper text passed to a prompt, in characters.
pub const DEFAULT_MAX_FULL_TEXT_CHARS: usize = 14_000;

/// Default number of papers requested from the index when the query does not
/// specify one.
pub const DEFAULT_MAX_RESULTS: usize = 20;

fn service(name: &str) -> ServiceName {
    ServiceName::new(name).expect("built-in service name is non-empty")
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

/// What a bucket does when a caller arrives and the window is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitPolicy {
    /// Wait until the window has room (the default).
    #[default]
    Block,
    /// Fail the call immediately with a rate-limit-exhausted error.
    Reject,
}

/// One named rate-limit bucket: at most `max_calls` admitted in any rolling
/// window of `window_secs` seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    /// Service this bucket gates.
    pub service: ServiceName,
    /// Calls admitted per rolling window.
    pub max_calls: u32,
    /// Rolling window length in seconds.
    pub window_secs: u64,
    /// Behaviour when the window is full.
    #[serde(default)]
    pub policy: LimitPolicy,
}

impl RateLimitRule {
    /// Rolling window length as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

// ---------------------------------------------------------------------------
// Stage policies
// ---------------------------------------------------------------------------

/// Where one stage's calls are rate-limited and how long they may run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePolicy {
    /// Rate-limit bucket this stage's LLM call counts against.
    pub service: ServiceName,
    /// Stage deadline in seconds; `None` means rate-limited only.
    pub deadline_secs: Option<u64>,
}

impl StagePolicy {
    /// Stage deadline as a [`Duration`], when one is set.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

/// Policy for each of the four stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagePolicies {
    /// Policy for abstract screening.
    pub abstract_analysis: StagePolicy,
    /// Policy for full-paper analysis.
    pub full_paper_analysis: StagePolicy,
    /// Policy for hypothesis generation.
    pub hypothesis_generation: StagePolicy,
    /// Policy for experiment design.
    pub experiment_design: StagePolicy,
}

impl StagePolicies {
    /// Returns the policy for one stage.
    pub fn for_stage(&self, kind: StageKind) -> &StagePolicy {
        match kind {
            StageKind::AbstractAnalysis => &self.abstract_analysis,
            StageKind::FullPaperAnalysis => &self.full_paper_analysis,
            StageKind::HypothesisGeneration => &self.hypothesis_generation,
            StageKind::ExperimentDesign => &self.experiment_design,
        }
    }
}

impl Default for StagePolicies {
    /// Reference defaults: the two LLM-heavy stages (full-paper analysis and
    /// hypothesis generation) carry a 5-minute deadline; the others are
    /// rate-limited only.
    fn default() -> Self {
        Self {
            abstract_analysis: StagePolicy {
                service: service("openai"),
                deadline_secs: None,
            },
            full_paper_analysis: StagePolicy {
                service: service("openai"),
                deadline_secs: Some(DEFAULT_STAGE_DEADLINE_SECS),
            },
            hypothesis_generation: StagePolicy {
                service: service("together"),
                deadline_secs: Some(DEFAULT_STAGE_DEADLINE_SECS),
            },
            experiment_design: StagePolicy {
                service: service("together"),
                deadline_secs: None,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Everything the orchestration core needs to run, minus provider credentials
/// (those stay in the composition root).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Concurrently executing per-paper pipelines.
    pub max_workers: usize,
    /// Papers requested from the index when the query does not say.
    pub default_max_results: usize,
    /// Cap on full-paper text passed to a prompt, in characters.
    pub max_full_text_chars: usize,
    /// Bucket the index search counts against.
    pub index_service: ServiceName,
    /// Per-stage service and deadline assignments.
    pub stages: StagePolicies,
    /// All rate-limit buckets, including the index bucket.
    pub rate_limits: Vec<RateLimitRule>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            default_max_results: DEFAULT_MAX_RESULTS,
            max_full_text_chars: DEFAULT_MAX_FULL_TEXT_CHARS,
            index_service: service("index"),
            stages: StagePolicies::default(),
            rate_limits: vec![
                RateLimitRule {
                    service: service("openai"),
                    max_calls: 60,
                    window_secs: 60,
                    policy: LimitPolicy::Block,
                },
                RateLimitRule {
                    service: service("together"),
                    max_calls: 30,
                    window_secs: 60,
                    policy: LimitPolicy::Block,
                },
                RateLimitRule {
                    service: service("index"),
                    max_calls: 20,
                    window_secs: 60,
                    policy: LimitPolicy::Block,
                },
            ],
        }
    }
}

impl RunConfig {
    /// Validates cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), crate::PaperMillError> {
        if self.max_workers == 0 {
            return Err(crate::PaperMillError::Configuration {
                message: "max_workers must be at least 1".into(),
            });
        }
        if let Some(rule) = self
            .rate_limits
            .iter()
            .find(|r| r.max_calls == 0 || r.window_secs == 0)
        {
            return Err(crate::PaperMillError::Configuration {
                message: format!(
                    "rate limit for '{}' must have non-zero max_calls and window",
                    rule.service
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        RunConfig::default().validate().expect("defaults are valid");
    }

    #[test]
    fn zero_workers_is_rejected() {
        let cfg = RunConfig {
            max_workers: 0,
            ..RunConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn heavy_stages_carry_deadlines() {
        let policies = StagePolicies::default();
        assert!(policies.abstract_analysis.deadline().is_none());
        assert_eq!(
            policies.full_paper_analysis.deadline(),
            Some(Duration::from_secs(300))
        );
        assert_eq!(
            policies.hypothesis_generation.deadline(),
            Some(Duration::from_secs(300))
        );
        assert!(policies.experiment_design.deadline().is_none());
    }

    #[test]
    fn stage_policy_lookup_matches_fields() {
        let policies = StagePolicies::default();
        assert_eq!(
            policies.for_stage(StageKind::ExperimentDesign),
            &policies.experiment_design
        );
    }
}
