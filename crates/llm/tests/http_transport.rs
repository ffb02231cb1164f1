//! HTTP-level tests: the reqwest transport against wiremock servers, alone and
//! driven by the dispatcher.

use std::time::Duration;

use dispatch::{
    BackoffPolicy, CandidateName, CompletionTransport, DispatchResult, Dispatcher, Endpoint,
    ErrorKind, ModelId, Prompt, ProviderCandidate, TransportError,
};
use llm::HttpTransport;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPLETIONS: &str = "/api/v1/chat/completions";

fn candidate(name: &str, server: &MockServer) -> ProviderCandidate {
    ProviderCandidate::new(
        CandidateName::new(name).unwrap(),
        Endpoint::new(format!("{}{COMPLETIONS}", server.uri())).unwrap(),
        ModelId::new(format!("{}-model", name.to_lowercase())).unwrap(),
    )
    .with_header("X-Title", "Nepali News Summarizer")
    .with_bearer_token("sk-test")
}

fn completion(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
    }))
}

fn transport() -> HttpTransport {
    HttpTransport::new(Duration::from_secs(5)).unwrap()
}

/// Millisecond delays so retry paths stay fast against a real socket.
fn fast_policy() -> BackoffPolicy {
    BackoffPolicy {
        rate_limit_base: Duration::from_millis(10),
        transient_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(100),
    }
}

#[tokio::test]
async fn sends_model_messages_and_candidate_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("x-title", "Nepali News Summarizer"))
        .and(body_partial_json(json!({
            "model": "deepseek-model",
            "messages": [{"role": "user", "content": "summarize this"}],
            "max_tokens": 500
        })))
        .respond_with(completion("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let prompt = Prompt {
        max_tokens: Some(500),
        ..Prompt::user("summarize this")
    };
    let response = transport()
        .send(&candidate("DeepSeek", &server), &prompt)
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body.unwrap()["usage"]["total_tokens"], 150);
}

#[tokio::test]
async fn surfaces_retry_after_on_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
        .mount(&server)
        .await;

    let response = transport()
        .send(&candidate("DeepSeek", &server), &Prompt::user("x"))
        .await
        .unwrap();

    assert_eq!(response.status, 429);
    assert_eq!(response.retry_after, Some(Duration::from_secs(12)));
}

#[tokio::test]
async fn non_json_body_is_reported_as_missing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let response = transport()
        .send(&candidate("DeepSeek", &server), &Prompt::user("x"))
        .await
        .unwrap();

    assert_eq!(response.status, 502);
    assert!(response.body.is_none());
}

#[tokio::test]
async fn slow_provider_is_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("late").set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();
    let err = transport
        .send(&candidate("DeepSeek", &server), &Prompt::user("x"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Timeout { .. }), "{err}");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let unreachable = ProviderCandidate::new(
        CandidateName::new("Nowhere").unwrap(),
        Endpoint::new("http://127.0.0.1:1/v1/chat/completions").unwrap(),
        ModelId::new("none").unwrap(),
    );

    let err = transport()
        .send(&unreachable, &Prompt::user("x"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, TransportError::Connect { .. } | TransportError::Request { .. }),
        "{err}"
    );
}

#[tokio::test]
async fn dispatcher_falls_back_across_real_endpoints() {
    let primary = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&primary)
        .await;

    let missing = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "No endpoints found", "code": 404}
        })))
        .expect(1)
        .mount(&missing)
        .await;

    let backup = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("काठमाडौंमा आज वर्षा भयो।"))
        .expect(1)
        .mount(&backup)
        .await;

    let unused = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("never"))
        .expect(0)
        .mount(&unused)
        .await;

    let candidates = vec![
        candidate("DeepSeek", &primary),
        candidate("Llama", &missing),
        candidate("Gemini", &backup),
        candidate("Qwen", &unused),
    ];
    let result = Dispatcher::new(transport(), fast_policy())
        .dispatch(&Prompt::user("summarize"), 2, &candidates)
        .await;

    match result {
        DispatchResult::Summary {
            completion,
            provider,
            model,
        } => {
            assert_eq!(provider.as_str(), "Gemini");
            assert_eq!(model.as_str(), "gemini-model");
            assert_eq!(completion.text, "काठमाडौंमा आज वर्षा भयो।");
            assert_eq!(completion.tokens_used.map(|t| t.as_u64()), Some(150));
        }
        other => panic!("expected a summary, got {other:?}"),
    }
}

#[tokio::test]
async fn ok_status_with_embedded_error_is_not_a_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": 402, "message": "Insufficient credits"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = Dispatcher::new(transport(), fast_policy())
        .dispatch(&Prompt::user("summarize"), 2, &[candidate("DeepSeek", &server)])
        .await;

    let DispatchResult::Exhausted { attempted } = result else {
        panic!("expected exhaustion");
    };
    assert_eq!(attempted.len(), 1);
    assert_eq!(attempted[0].kind, ErrorKind::QuotaExhausted);
    assert_eq!(attempted[0].attempts, 1);
}

#[tokio::test]
async fn out_of_range_retry_after_is_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1e20"))
        .expect(2)
        .mount(&server)
        .await;

    let candidate = candidate("DeepSeek", &server);
    let response = transport()
        .send(&candidate, &Prompt::user("summarize"))
        .await
        .unwrap();
    assert_eq!(response.status, 429);
    assert_eq!(response.retry_after, None);

    let result = Dispatcher::new(transport(), fast_policy())
        .dispatch(&Prompt::user("summarize"), 1, &[candidate])
        .await;

    let DispatchResult::Exhausted { attempted } = result else {
        panic!("expected exhaustion");
    };
    assert_eq!(attempted[0].kind, ErrorKind::RateLimited);
    assert_eq!(attempted[0].attempts, 1);
}
