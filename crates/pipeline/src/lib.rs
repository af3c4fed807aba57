//! Core orchestration domain for PaperMill.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, stage-outcome type, and cross-cutting error type used throughout the
//! paper-analysis pipeline. Infrastructure crates implement the port traits
//! defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype domain identifiers (`PaperId`, `ServiceName`, etc.) |
//! | [`types`] | Shared value types (`ResearchQuery`, `Paper`, stage payloads) |
//! | [`state`] | Per-paper stage outcomes and pipeline status tracking |
//! | [`report`] | Terminal run outcome and the consolidated report |
//! | [`errors`] | Error taxonomy (`ProviderError`, `StageError`, `PaperMillError`) |
//! | [`ports`] | Async traits implemented by infrastructure crates |
//! | [`config`] | Rate-limit rules, per-stage policies, and run configuration |

pub mod config;
pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod report;
pub mod state;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{LimitPolicy, RateLimitRule, RunConfig, StagePolicies, StagePolicy};
pub use errors::{IndexError, PaperMillError, ProviderError, StageError};
pub use identifiers::{PaperId, ProviderName, RunId, ServiceName};
pub use ports::{KeywordSource, LanguageModel, PaperAnalyst, PaperIndex};
pub use report::{AggregateReport, IncompletePaper, PaperSummary, PipelineRecord, RunOutcome};
pub use state::{PipelineState, PipelineStatus, StageResult};
pub use types::{
    AbstractAnalysis, CompletionRequest, ExperimentDesign, ExperimentDesignSet, Hypothesis,
    HypothesisSet, Keywords, Paper, PaperAnalysis, ResearchQuery, StageKind, StageOutput,
};
