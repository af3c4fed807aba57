//! Error taxonomy for the PaperMill domain.
//!
//! Three layers, matching where faults are allowed to travel:
//!
//! - [`ProviderError`] / [`IndexError`] — infrastructure-level failures raised
//!   by the LLM and paper-index adapters.
//! - [`StageError`] — a per-stage failure *recorded* into that paper's
//!   [`crate::state::PipelineState`]; it never propagates to sibling pipelines
//!   or aborts the scheduler.
//! - [`PaperMillError`] — run-fatal conditions: both keyword providers failed,
//!   the index search failed, or the input was invalid. Nothing downstream
//!   runs after one of these.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ServiceName;

// ---------------------------------------------------------------------------
// Infrastructure errors
// ---------------------------------------------------------------------------

/// A failure from an LLM provider call: transport, API rejection, or output
/// that could not be parsed into the expected structure.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderError {
    /// The HTTP request itself failed (connect, TLS, body read).
    #[error("provider transport error: {message}")]
    Transport {
        /// Transport-level failure description.
        message: String,
    },

    /// The provider returned a non-success status.
    #[error("provider API error (status {status}): {message}")]
    Api {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Response body or status reason.
        message: String,
    },

    /// The provider responded, but the payload did not match the requested
    /// structure (missing choices, invalid JSON, wrong shape).
    #[error("malformed provider response: {message}")]
    MalformedResponse {
        /// What was expected and what was found.
        message: String,
    },
}

// ---------------------------------------------------------------------------

/// A failure from the paper-index adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexError {
    /// The HTTP request itself failed.
    #[error("index transport error: {message}")]
    Transport {
        /// Transport-level failure description.
        message: String,
    },

    /// The index returned a non-success status.
    #[error("index API error (status {status}): {message}")]
    Api {
        /// HTTP status code returned by the index.
        status: u16,
        /// Response body or status reason.
        message: String,
    },

    /// The index response could not be deserialised.
    #[error("malformed index response: {message}")]
    MalformedResponse {
        /// What was expected and what was found.
        message: String,
    },

    /// The paper carries no full-text reference to fetch.
    #[error("paper has no full-text reference")]
    NoFullText,
}

// ---------------------------------------------------------------------------
// Stage errors
// ---------------------------------------------------------------------------

/// Why one stage of one paper's pipeline failed.
///
/// Stage failures are values, not propagated faults: the pipeline records them
/// into the paper's state and the scheduler keeps running every other paper.
/// Deadline expiry is *not* represented here — it is the separate
/// [`crate::state::StageResult::TimedOut`] tag.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageError {
    /// The LLM call behind the stage failed.
    #[error("provider failure: {message}")]
    Provider {
        /// Underlying provider failure description.
        message: String,
    },

    /// The upstream index failed while the stage needed it.
    #[error("upstream failure: {message}")]
    Upstream {
        /// Underlying index failure description.
        message: String,
    },

    /// A rate-limit bucket configured to reject (rather than block) had no room.
    #[error("rate limit exhausted for service '{service}'")]
    RateLimitExhausted {
        /// The service whose bucket rejected the call.
        service: ServiceName,
    },

    /// The run was cancelled before this stage could start.
    #[error("cancelled before execution")]
    Cancelled,
}

impl From<ProviderError> for StageError {
    fn from(err: ProviderError) -> Self {
        StageError::Provider {
            message: err.to_string(),
        }
    }
}

impl From<IndexError> for StageError {
    fn from(err: IndexError) -> Self {
        StageError::Upstream {
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Run-level errors
// ---------------------------------------------------------------------------

/// Conditions that abort the whole run.
///
/// Per-paper failures never surface here; they live in each paper's
/// [`crate::state::PipelineState`] and the final report.
#[derive(Debug, Error)]
pub enum PaperMillError {
    /// The research query failed validation before anything ran.
    #[error("invalid research query: {reason}")]
    InvalidQuery {
        /// What the validation rejected.
        reason: String,
    },

    /// Every configured keyword provider failed; there is nothing useful to
    /// search or parallelise without keywords.
    #[error("keyword extraction failed on all providers: {details}")]
    KeywordExtraction {
        /// Per-provider failure summary, in fallback order.
        details: String,
    },

    /// The paper-index search failed; no candidate papers exist.
    #[error("index search failed")]
    IndexSearch(#[from] IndexError),

    /// The runtime configuration is invalid.
    ///
    /// Produced at load time; a run never starts with an invalid config.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_converts_to_stage_error() {
        let err = ProviderError::Api {
            status: 429,
            message: "too many requests".into(),
        };
        let stage: StageError = err.into();
        assert!(matches!(stage, StageError::Provider { .. }));
        assert!(stage.to_string().contains("429"));
    }

    #[test]
    fn index_error_converts_to_upstream() {
        let stage: StageError = IndexError::NoFullText.into();
        assert!(matches!(stage, StageError::Upstream { .. }));
    }
}
