//! Retry-or-abandon decisions for one failed attempt.
//!
//! The policy only ever sees an [`ErrorKind`]; it never inspects status codes
//! or bodies.
//!
//! | Kind | `attempt < max` | `attempt == max` |
//! |------|-----------------|------------------|
//! | `RateLimited` | escalating delay (5s, 10s, 20s, ...) or the server hint if larger | abandon |
//! | `QuotaExhausted`, `NotFound` | abandon | abandon |
//! | `TransientServer`, `ClientError`, `Unknown` | short fixed delay | abandon |

use std::time::Duration;

use crate::ErrorKind;

/// First rate-limit delay; doubled for every following attempt.
pub const DEFAULT_RATE_LIMIT_BASE: Duration = Duration::from_secs(5);

/// Delay before retrying after any other retryable failure.
pub const DEFAULT_TRANSIENT_DELAY: Duration = Duration::from_secs(2);

/// Upper bound on any single wait, including server hints.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(120);

/// What the dispatcher should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Wait this long, then try the same candidate again.
    RetryAfter(Duration),
    /// Stop trying this candidate and move on to the next one.
    AbandonCandidate,
    /// The attempt counters themselves are inconsistent.
    ///
    /// Never produced for well-formed attempt numbers.
    Fatal,
}

/// Delay constants for [`BackoffPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub rate_limit_base: Duration,
    pub transient_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            rate_limit_base: DEFAULT_RATE_LIMIT_BASE,
            transient_delay: DEFAULT_TRANSIENT_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl BackoffPolicy {
    /// Decides what to do after attempt number `attempt` (1-indexed) of
    /// `max_attempts` failed with `kind`.
    ///
    /// A `retry_after` hint is treated as a lower bound on the rate-limit
    /// delay. Every returned delay is capped at [`BackoffPolicy::max_delay`].
    pub fn decide(
        &self,
        kind: ErrorKind,
        attempt: u32,
        max_attempts: u32,
        retry_after: Option<Duration>,
    ) -> Decision {
        if attempt == 0 || attempt > max_attempts {
            return Decision::Fatal;
        }
        if kind.skips_retry() || attempt == max_attempts {
            return Decision::AbandonCandidate;
        }

        let delay = match kind {
            ErrorKind::RateLimited => {
                let scheduled = self.rate_limit_delay(attempt);
                retry_after.map_or(scheduled, |hint| hint.max(scheduled))
            }
            _ => self.transient_delay,
        };
        Decision::RetryAfter(delay.min(self.max_delay))
    }

    /// `rate_limit_base * 2^(attempt - 1)`, saturating.
    fn rate_limit_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.rate_limit_base.saturating_mul(factor)
    }
}
