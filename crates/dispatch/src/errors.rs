//! Error taxonomy for provider calls.
//!
//! [`ErrorKind`] is the closed set of failure classes the retry loop reasons
//! about. Raw status codes never travel past [`crate::classifier`]; everything
//! downstream of it sees only an [`ErrorKind`].
//!
//! [`TransportError`] covers failures below HTTP status semantics: the request
//! never produced a status code at all.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Failure classes
// ---------------------------------------------------------------------------

/// Why a single attempt against a provider failed.
///
/// Classification is total: every response and every transport failure maps
/// to exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// `429`. The provider asked us to slow down; waiting may help.
    RateLimited,
    /// `402`. No credits left for this provider or key; waiting cannot help.
    QuotaExhausted,
    /// `404`. The model or endpoint does not exist; it will not appear by waiting.
    NotFound,
    /// `5xx`. The provider is having trouble.
    TransientServer,
    /// Any other `4xx`.
    ClientError,
    /// Transport failure, malformed or empty payload, or an unmapped status.
    Unknown,
}

impl ErrorKind {
    /// Every variant, in declaration order.
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::RateLimited,
        ErrorKind::QuotaExhausted,
        ErrorKind::NotFound,
        ErrorKind::TransientServer,
        ErrorKind::ClientError,
        ErrorKind::Unknown,
    ];

    /// Returns `true` if no amount of waiting can make this provider succeed
    /// within the current dispatch.
    pub fn skips_retry(self) -> bool {
        matches!(self, ErrorKind::QuotaExhausted | ErrorKind::NotFound)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::QuotaExhausted => "quota_exhausted",
            ErrorKind::NotFound => "not_found",
            ErrorKind::TransientServer => "transient_server",
            ErrorKind::ClientError => "client_error",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// A request that failed before an HTTP status could be observed.
///
/// Produced by [`crate::CompletionTransport`] implementations. The dispatcher
/// never propagates these; they are classified as [`ErrorKind::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out: {message}")]
    Timeout {
        /// Description from the underlying client.
        message: String,
    },

    /// The connection could not be established (refused, DNS, TLS).
    #[error("connection failed: {message}")]
    Connect {
        /// Description from the underlying client.
        message: String,
    },

    /// Any other failure while building, sending, or reading the request.
    #[error("request failed: {message}")]
    Request {
        /// Description from the underlying client.
        message: String,
    },
}
