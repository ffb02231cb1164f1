//! OpenAI-compatible chat-completions transport.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use dispatch::{CompletionTransport, Prompt, ProviderCandidate, RawResponse, TransportError};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Sends completion requests with a shared [`reqwest::Client`].
///
/// The client is cheap to clone and pools connections, so one transport is
/// shared by every dispatch in the process.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn send(
        &self,
        candidate: &ProviderCandidate,
        prompt: &Prompt,
    ) -> Result<RawResponse, TransportError> {
        let mut request = self
            .client
            .post(candidate.endpoint.as_str())
            .json(&request_body(candidate, prompt));
        for (name, value) in &candidate.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());

        let body = match response.bytes().await {
            Ok(bytes) if bytes.is_empty() => None,
            Ok(bytes) => serde_json::from_slice::<Value>(&bytes).ok(),
            Err(e) => {
                warn!(candidate = %candidate.name, status, error = %e, "Failed to read response body");
                None
            }
        };

        if status >= 400 {
            debug!(
                candidate = %candidate.name,
                status,
                body = %body.as_ref().map(preview).unwrap_or_default(),
                "Provider returned an error status"
            );
        }

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// `{ "model": ..., "messages": [...], "temperature"?, "max_tokens"? }`
fn request_body(candidate: &ProviderCandidate, prompt: &Prompt) -> Value {
    let mut body = json!({
        "model": candidate.model.as_str(),
        "messages": prompt.messages,
    });
    if let Some(temperature) = prompt.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = prompt.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    body
}

fn transport_error(err: reqwest::Error) -> TransportError {
    let message = err.to_string();
    if err.is_timeout() {
        TransportError::Timeout { message }
    } else if err.is_connect() {
        TransportError::Connect { message }
    } else {
        TransportError::Request { message }
    }
}

fn preview(body: &Value) -> String {
    body.to_string().chars().take(100).collect()
}

/// Parses a `Retry-After` header as numeric seconds or an HTTP-date.
///
/// Returns `None` if the header is missing, unparseable, negative, or names a
/// date in the past.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(secs) = value.parse::<f64>() {
        // Rejects negative, NaN, infinite, and out-of-range values.
        return Duration::try_from_secs_f64(secs).ok();
    }

    let date = httpdate::parse_http_date(value).ok()?;
    date.duration_since(SystemTime::now()).ok()
}
