//! Maps provider responses to an [`ErrorKind`].
//!
//! The mapping is fixed and total; it is not configurable.
//!
//! | Status | Kind |
//! |--------|------|
//! | `429` | [`ErrorKind::RateLimited`] |
//! | `402` | [`ErrorKind::QuotaExhausted`] |
//! | `404` | [`ErrorKind::NotFound`] |
//! | `500..=599` | [`ErrorKind::TransientServer`] |
//! | other `4xx` | [`ErrorKind::ClientError`] |
//! | anything else, transport failures | [`ErrorKind::Unknown`] |
//!
//! OpenRouter reports some upstream failures as `200 OK` with an
//! `{"error": {"code": ...}}` body. A `2xx` only reaches the classifier when
//! no completion could be extracted, so such an embedded code is classified
//! with the same table.

use serde_json::Value;

use crate::{ErrorKind, TransportError};

/// Classifies a response that carried an HTTP status.
pub fn classify(status: u16, body: Option<&Value>) -> ErrorKind {
    match status {
        200..=299 => body
            .and_then(embedded_error_code)
            .map(classify_status)
            .unwrap_or(ErrorKind::Unknown),
        _ => classify_status(status),
    }
}

/// Classifies a request that never produced a status.
pub fn classify_transport(_error: &TransportError) -> ErrorKind {
    ErrorKind::Unknown
}

fn classify_status(status: u16) -> ErrorKind {
    match status {
        429 => ErrorKind::RateLimited,
        402 => ErrorKind::QuotaExhausted,
        404 => ErrorKind::NotFound,
        500..=599 => ErrorKind::TransientServer,
        400..=499 => ErrorKind::ClientError,
        _ => ErrorKind::Unknown,
    }
}

fn embedded_error_code(body: &Value) -> Option<u16> {
    let code = body.get("error")?.get("code")?;
    let code = code
        .as_u64()
        .or_else(|| code.as_str().and_then(|s| s.parse().ok()))?;
    u16::try_from(code).ok()
}
