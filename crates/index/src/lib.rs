//! PaperMill paper index infrastructure adapter.
//!
//! Implements the [`pipeline::PaperIndex`] trait against the Semantic Scholar
//! Graph API. Other indexes are added as new modules in this crate without
//! any changes to the `pipeline` crate.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, query construction, and response
//! mapping live here. The orchestration core sees only [`pipeline::PaperIndex`].

pub mod semantic_scholar;

pub use semantic_scholar::SemanticScholarIndex;
