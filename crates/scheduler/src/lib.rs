//! Concurrent orchestration core for PaperMill.
//!
//! This crate turns one research question into one aggregate report by driving
//! many per-paper analysis pipelines in parallel. It depends only on the
//! `pipeline` domain crate and Tokio; all provider and index I/O arrives
//! through the domain port traits.
//!
//! ## Architectural Layer
//!
//! **Orchestration.** No HTTP, no prompts, no provider knowledge. Everything
//! here is about admission, pacing, deadlines, failure isolation, and
//! consolidation.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`rate_limit`] | Shared sliding-window limiter with named per-service buckets |
//! | [`executor`] | Deadline-boxed execution of a single stage |
//! | [`paper_pipeline`] | The four-stage sequence for one paper |
//! | [`scheduler`] | Bounded-concurrency admission across papers |
//! | [`keywords`] | Keyword extraction with provider fallback |
//! | [`aggregate`] | Consolidation of terminal states into one report |
//! | [`runner`] | The end-to-end run driver |

pub mod aggregate;
pub mod executor;
pub mod keywords;
pub mod paper_pipeline;
pub mod rate_limit;
pub mod runner;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::ResultAggregator;
pub use executor::StageExecutor;
pub use keywords::{KeywordExtractor, KeywordProvider};
pub use paper_pipeline::PaperPipeline;
pub use rate_limit::RateLimiter;
pub use runner::ResearchRun;
pub use scheduler::PipelineScheduler;
