//! PaperMill LLM provider infrastructure adapter.
//!
//! Implements the [`pipeline::LanguageModel`], [`pipeline::KeywordSource`],
//! and [`pipeline::PaperAnalyst`] traits over OpenAI-compatible chat
//! completion endpoints. Additional providers that speak the same wire format
//! (Together, local inference servers) are configured, not coded: they differ
//! only in base URL, key, and model name.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport, request formatting, prompt text,
//! and response parsing live here. The orchestration core sees only the port
//! traits.

pub mod analyst;
pub mod keywords;
pub mod provider;

pub use analyst::LlmAnalyst;
pub use keywords::LlmKeywordSource;
pub use provider::ChatCompletionsProvider;
