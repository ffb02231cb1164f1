//! Article summarization over the completion dispatcher.
//!
//! This crate turns news articles into prompts, paces requests with a
//! process-wide [`RateLimiter`], and hands each prompt to a
//! [`dispatch::Dispatcher`]. A batch keeps going when one article cannot be
//! summarized; the failure is recorded in that article's [`SummaryReport`].
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Sequences calls between the [`dispatch`] domain and
//! whatever transport the composition root injects. No retry or fallback rules
//! live here.

pub mod prompt;
pub mod rate_limiter;
pub mod summarizer;

pub use prompt::{summarization_prompt, Language, UnknownLanguage};
pub use rate_limiter::RateLimiter;
pub use summarizer::{Article, SummarizeError, Summary, SummaryMetadata, SummaryReport, Summarizer};
