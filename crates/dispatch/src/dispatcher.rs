//! The ordered fallback loop.
//!
//! For each candidate, in configured order, the dispatcher sends up to
//! `max_attempts_per_candidate` requests. The first extractable completion
//! ends the whole dispatch. Failures are classified and handed to the
//! [`BackoffPolicy`], which either asks for a bounded wait and another attempt
//! or abandons the candidate. When every candidate has been abandoned the
//! result is [`DispatchResult::Exhausted`].
//!
//! Attempts are strictly sequential. The only suspension points besides the
//! transport call are the backoff waits, and each has a concrete duration.
//! No state is shared between dispatch calls; concurrent calls are
//! independent.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::{
    AbandonedCandidate, AttemptOutcome, BackoffPolicy, Decision, DispatchId, DispatchResult,
    ErrorKind, Prompt, ProviderCandidate, RawResponse, TransportError,
};

/// Attempts per candidate used when the configuration does not say otherwise.
pub const DEFAULT_MAX_ATTEMPTS_PER_CANDIDATE: u32 = 2;

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// Sends one completion request to one candidate.
///
/// Implementations report whatever status the provider returned; they do not
/// interpret it. Only failures that prevent a status from being observed are
/// returned as [`TransportError`].
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn send(
        &self,
        candidate: &ProviderCandidate,
        prompt: &Prompt,
    ) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T: CompletionTransport + ?Sized> CompletionTransport for Arc<T> {
    async fn send(
        &self,
        candidate: &ProviderCandidate,
        prompt: &Prompt,
    ) -> Result<RawResponse, TransportError> {
        (**self).send(candidate, prompt).await
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Resolves a prompt to a completion from the first candidate that delivers one.
#[derive(Debug, Clone)]
pub struct Dispatcher<T> {
    transport: T,
    policy: BackoffPolicy,
}

impl<T: CompletionTransport> Dispatcher<T> {
    pub fn new(transport: T, policy: BackoffPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Runs one dispatch.
    ///
    /// Never fails: every combination of provider failures ends in
    /// [`DispatchResult::Exhausted`]. An empty candidate list is exhausted
    /// immediately without any request. A `max_attempts_per_candidate` of `0`
    /// is treated as `1`.
    pub async fn dispatch(
        &self,
        prompt: &Prompt,
        max_attempts_per_candidate: u32,
        candidates: &[ProviderCandidate],
    ) -> DispatchResult {
        let dispatch_id = DispatchId::new_random();
        let max_attempts = if max_attempts_per_candidate == 0 {
            warn!(%dispatch_id, "max_attempts_per_candidate is 0; using 1");
            1
        } else {
            max_attempts_per_candidate
        };

        let mut attempted = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            info!(
                %dispatch_id,
                candidate = %candidate.name,
                model = %candidate.model,
                "Trying candidate"
            );

            let mut last_kind = ErrorKind::Unknown;
            let mut attempts = 0;

            for attempt in 1..=max_attempts {
                attempts = attempt;
                let outcome = match self.transport.send(candidate, prompt).await {
                    Ok(response) => AttemptOutcome::from_response(&response),
                    Err(err) => {
                        warn!(%dispatch_id, candidate = %candidate.name, attempt, error = %err, "Transport failure");
                        AttemptOutcome::from_transport_error(&err)
                    }
                };

                info!(
                    %dispatch_id,
                    candidate = %candidate.name,
                    attempt,
                    max_attempts,
                    outcome = %outcome.label(),
                    "Attempt finished"
                );

                let (kind, retry_after) = match outcome {
                    AttemptOutcome::Success(completion) => {
                        info!(%dispatch_id, candidate = %candidate.name, attempt, "Completion received");
                        return DispatchResult::Summary {
                            completion,
                            provider: candidate.name.clone(),
                            model: candidate.model.clone(),
                        };
                    }
                    AttemptOutcome::Failure { kind, retry_after } => (kind, retry_after),
                };
                last_kind = kind;

                match self.policy.decide(kind, attempt, max_attempts, retry_after) {
                    Decision::RetryAfter(delay) => {
                        debug!(
                            %dispatch_id,
                            candidate = %candidate.name,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Waiting before retry"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Decision::AbandonCandidate => {
                        warn!(%dispatch_id, candidate = %candidate.name, attempt, %kind, "Abandoning candidate");
                        break;
                    }
                    Decision::Fatal => {
                        error!(%dispatch_id, candidate = %candidate.name, attempt, max_attempts, "Inconsistent attempt counter; abandoning candidate");
                        break;
                    }
                }
            }

            attempted.push(AbandonedCandidate {
                name: candidate.name.clone(),
                kind: last_kind,
                attempts,
            });
        }

        let summary: Vec<String> = attempted
            .iter()
            .map(|a| format!("{}={}", a.name, a.kind))
            .collect();
        error!(%dispatch_id, candidates = attempted.len(), attempted = ?summary, "All candidates exhausted");

        DispatchResult::Exhausted { attempted }
    }
}
