//! Resilient multi-provider completion dispatch.
//!
//! Turns one prompt into a completion from *some* configured LLM provider,
//! despite any individual provider being rate-limited, out of credits,
//! unavailable, or transiently failing.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate performs no network I/O.
//! It defines *what* a transport must do ([`CompletionTransport`]); the `llm`
//! crate defines *how* to do it over HTTP.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`CandidateName`, `ModelId`, `DispatchId`, etc.) |
//! | [`types`] | Value types (`ProviderCandidate`, `Prompt`, `AttemptOutcome`, `DispatchResult`, etc.) |
//! | [`errors`] | `ErrorKind` taxonomy and transport error type |
//! | [`classifier`] | Pure mapping from provider responses to `ErrorKind` |
//! | [`backoff`] | Per-attempt retry/abandon decisions |
//! | [`dispatcher`] | The ordered fallback loop |
//!
//! ## Control Flow
//!
//! ```text
//! caller -> Dispatcher -> (each candidate, in order) -> transport
//!        -> classifier -> backoff -> (retry same | next candidate)
//!        -> Summary | Exhausted
//! ```

pub mod backoff;
pub mod classifier;
pub mod dispatcher;
pub mod errors;
pub mod identifiers;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use backoff::{BackoffPolicy, Decision};
pub use classifier::{classify, classify_transport};
pub use dispatcher::{CompletionTransport, Dispatcher, DEFAULT_MAX_ATTEMPTS_PER_CANDIDATE};
pub use errors::{ErrorKind, TransportError};
pub use identifiers::{CandidateName, DispatchId, Endpoint, ModelId};
pub use types::{
    AbandonedCandidate, AttemptOutcome, ChatMessage, Completion, DispatchResult, Prompt,
    ProviderCandidate, RawResponse, Role, Timestamp, TokenCount,
};
