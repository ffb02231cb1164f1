//! LLM provider infrastructure adapter.
//!
//! Implements the [`dispatch::CompletionTransport`] port over HTTP for
//! OpenAI-compatible chat-completions endpoints (DeepSeek, OpenRouter), and
//! loads the ordered provider candidate list from configuration.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport, request formatting, `Retry-After`
//! parsing, and configuration loading live here. The [`dispatch`] crate sees
//! only [`dispatch::CompletionTransport`] and [`dispatch::ProviderCandidate`].

pub mod config;
pub mod transport;

pub use config::{BackoffConfig, CandidateConfig, ConfigError, ProviderConfig};
pub use transport::{parse_retry_after, HttpTransport};
