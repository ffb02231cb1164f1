//! Value types for the dispatch domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! the data that flows through a dispatch: the prompt going out, the raw
//! response coming back, the per-attempt outcome, and the terminal result.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classifier::{classify, classify_transport};
use crate::{CandidateName, Endpoint, ErrorKind, ModelId, TransportError};

// ---------------------------------------------------------------------------
// Token accounting
// ---------------------------------------------------------------------------

/// Number of tokens a provider reported for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenCount(u64);

impl TokenCount {
    /// Creates a [`TokenCount`] from a raw integer.
    pub fn new(count: u64) -> Self {
        Self(count)
    }

    /// Returns the underlying integer value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TokenCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat-completions request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The provider-neutral payload of a completion request.
///
/// The transport adds the candidate's `model` field; everything else is sent
/// as-is to every candidate tried during a dispatch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Prompt {
    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Prompt {
    /// Creates a prompt from a single user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(content)],
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// One configured provider endpoint + model pairing.
///
/// Candidates are built once at start-up and never mutated; a dispatch reads
/// them in the order they were configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCandidate {
    pub name: CandidateName,
    pub endpoint: Endpoint,
    pub model: ModelId,
    /// Extra request headers, including the credential.
    pub headers: BTreeMap<String, String>,
}

impl ProviderCandidate {
    pub fn new(name: CandidateName, endpoint: Endpoint, model: ModelId) -> Self {
        Self {
            name,
            endpoint,
            model,
            headers: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds an `Authorization: Bearer <token>` header.
    #[must_use]
    pub fn with_bearer_token(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {token}"))
    }
}

// ---------------------------------------------------------------------------
// Responses and outcomes
// ---------------------------------------------------------------------------

/// What a transport observed for one request that produced a status code.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    /// Server-advised delay from a `Retry-After` header, if present and valid.
    pub retry_after: Option<Duration>,
    /// Parsed JSON body; `None` if the body was empty or not valid JSON.
    pub body: Option<Value>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The extractable result of a successful completion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Trimmed, non-empty completion text.
    pub text: String,
    /// `usage.total_tokens` when the provider reported it.
    pub tokens_used: Option<TokenCount>,
}

impl Completion {
    /// Extracts `choices[0].message.content` from a chat-completions body.
    ///
    /// Returns `None` when the field is missing, not a string, or blank.
    pub fn from_body(body: &Value) -> Option<Self> {
        let text = body
            .get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()?
            .trim();
        if text.is_empty() {
            return None;
        }

        let tokens_used = body
            .get("usage")
            .and_then(|u| u.get("total_tokens"))
            .and_then(Value::as_u64)
            .map(TokenCount::new);

        Some(Self {
            text: text.to_string(),
            tokens_used,
        })
    }
}

/// Result of one attempt against one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(Completion),
    Failure {
        kind: ErrorKind,
        /// Server-advised delay; only ever set for [`ErrorKind::RateLimited`].
        retry_after: Option<Duration>,
    },
}

impl AttemptOutcome {
    /// Interprets a response that carried an HTTP status.
    ///
    /// Success requires a `2xx` status *and* an extractable completion; a
    /// `2xx` with an empty or malformed payload is a failure.
    pub fn from_response(response: &RawResponse) -> Self {
        if response.is_success() {
            if let Some(completion) = response.body.as_ref().and_then(Completion::from_body) {
                return AttemptOutcome::Success(completion);
            }
        }

        let kind = classify(response.status, response.body.as_ref());
        let retry_after = match kind {
            ErrorKind::RateLimited => response.retry_after,
            _ => None,
        };
        AttemptOutcome::Failure { kind, retry_after }
    }

    /// Interprets a request that never produced a status code.
    pub fn from_transport_error(error: &TransportError) -> Self {
        AttemptOutcome::Failure {
            kind: classify_transport(error),
            retry_after: None,
        }
    }

    /// Short label for log events.
    pub fn label(&self) -> String {
        match self {
            AttemptOutcome::Success(_) => "success".to_string(),
            AttemptOutcome::Failure { kind, .. } => kind.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Terminal result
// ---------------------------------------------------------------------------

/// A candidate that was given up on during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonedCandidate {
    pub name: CandidateName,
    /// The last error observed for this candidate.
    pub kind: ErrorKind,
    /// How many requests were sent to this candidate.
    pub attempts: u32,
}

/// The dispatcher's final answer. There is no third state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchResult {
    /// Some candidate produced a completion.
    Summary {
        completion: Completion,
        provider: CandidateName,
        /// Model of the candidate that answered.
        model: ModelId,
    },
    /// Every candidate was abandoned, in the order they were tried.
    Exhausted { attempted: Vec<AbandonedCandidate> },
}

impl DispatchResult {
    pub fn is_summary(&self) -> bool {
        matches!(self, DispatchResult::Summary { .. })
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
