//! Single-article and batch summarization.

use dispatch::{
    AbandonedCandidate, CandidateName, CompletionTransport, DispatchResult, Dispatcher, ModelId,
    ProviderCandidate, Timestamp, TokenCount,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{summarization_prompt, Language, RateLimiter};

/// One article to summarize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: Option<String>,
    pub text: String,
}

impl Article {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            title: None,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Why an article could not be summarized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummarizeError {
    #[error("empty text provided")]
    EmptyText,

    #[error("all {} providers failed: {}", .attempted.len(), describe(.attempted))]
    Exhausted { attempted: Vec<AbandonedCandidate> },
}

fn describe(attempted: &[AbandonedCandidate]) -> String {
    if attempted.is_empty() {
        return "no providers configured".to_string();
    }
    attempted
        .iter()
        .map(|a| format!("{} ({})", a.name, a.kind))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A successful summary and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub provider: CandidateName,
    pub model: ModelId,
    pub tokens_used: Option<TokenCount>,
}

/// Context recorded alongside every report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetadata {
    pub language: Language,
    /// Length of the input in characters.
    pub text_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<ModelId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<TokenCount>,
    pub summarized_at: Timestamp,
}

/// Outcome of summarizing one article, ready to be written out as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub summary: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<CandidateName>,
    /// Providers that were given up on, in the order they were tried.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempted: Vec<AbandonedCandidate>,
    pub metadata: SummaryMetadata,
}

impl SummaryReport {
    fn new(article: &Article, language: Language, result: Result<Summary, SummarizeError>) -> Self {
        let mut metadata = SummaryMetadata {
            language,
            text_length: article.text.chars().count(),
            summary_length: None,
            model_used: None,
            tokens_used: None,
            summarized_at: Timestamp::now(),
        };

        match result {
            Ok(summary) => {
                metadata.summary_length = Some(summary.text.chars().count());
                metadata.model_used = Some(summary.model);
                metadata.tokens_used = summary.tokens_used;
                Self {
                    title: article.title.clone(),
                    summary: summary.text,
                    success: true,
                    error: None,
                    provider: Some(summary.provider),
                    attempted: Vec::new(),
                    metadata,
                }
            }
            Err(err) => {
                let attempted = match &err {
                    SummarizeError::Exhausted { attempted } => attempted.clone(),
                    SummarizeError::EmptyText => Vec::new(),
                };
                Self {
                    title: article.title.clone(),
                    summary: String::new(),
                    success: false,
                    error: Some(err.to_string()),
                    provider: None,
                    attempted,
                    metadata,
                }
            }
        }
    }
}

/// Summarizes articles by dispatching one prompt per article across the
/// configured candidates.
pub struct Summarizer<T> {
    dispatcher: Dispatcher<T>,
    candidates: Vec<ProviderCandidate>,
    max_attempts_per_candidate: u32,
    limiter: RateLimiter,
}

impl<T: CompletionTransport> Summarizer<T> {
    pub fn new(
        dispatcher: Dispatcher<T>,
        candidates: Vec<ProviderCandidate>,
        max_attempts_per_candidate: u32,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            dispatcher,
            candidates,
            max_attempts_per_candidate,
            limiter,
        }
    }

    pub fn candidates(&self) -> &[ProviderCandidate] {
        &self.candidates
    }

    /// Summarizes one article.
    ///
    /// Blank text is rejected before any request is made.
    pub async fn try_summarize(
        &self,
        article: &Article,
        language: Language,
    ) -> Result<Summary, SummarizeError> {
        if article.text.trim().is_empty() {
            return Err(SummarizeError::EmptyText);
        }

        self.limiter.acquire().await;

        info!(
            chars = article.text.chars().count(),
            %language,
            "Summarizing article"
        );
        let prompt = summarization_prompt(&article.text, article.title.as_deref(), language);

        match self
            .dispatcher
            .dispatch(&prompt, self.max_attempts_per_candidate, &self.candidates)
            .await
        {
            DispatchResult::Summary {
                completion,
                provider,
                model,
            } => {
                info!(%provider, chars = completion.text.chars().count(), "Summary generated");
                Ok(Summary {
                    text: completion.text,
                    provider,
                    model,
                    tokens_used: completion.tokens_used,
                })
            }
            DispatchResult::Exhausted { attempted } => {
                Err(SummarizeError::Exhausted { attempted })
            }
        }
    }

    /// Summarizes one article, folding any failure into the report.
    pub async fn summarize(&self, article: &Article, language: Language) -> SummaryReport {
        let result = self.try_summarize(article, language).await;
        if let Err(err) = &result {
            warn!(error = %err, "Article could not be summarized");
        }
        SummaryReport::new(article, language, result)
    }

    /// Summarizes every article in order.
    ///
    /// One article's failure never stops the batch; it is recorded in that
    /// article's report.
    pub async fn summarize_batch(&self, articles: &[Article], language: Language) -> Vec<SummaryReport> {
        let total = articles.len();
        let mut reports = Vec::with_capacity(total);
        for (index, article) in articles.iter().enumerate() {
            info!(item = index + 1, total, "Processing article");
            reports.push(self.summarize(article, language).await);
        }

        let succeeded = reports.iter().filter(|r| r.success).count();
        info!(succeeded, failed = total - succeeded, "Batch finished");
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use dispatch::{
        BackoffPolicy, Endpoint, ErrorKind, Prompt, RawResponse, TransportError,
    };
    use serde_json::json;

    /// Answers per candidate with a fixed status; `200` echoes a summary
    /// containing the candidate name.
    struct FixedTransport {
        statuses: HashMap<String, u16>,
        calls: Mutex<Vec<(String, Prompt)>>,
    }

    impl FixedTransport {
        fn new(statuses: &[(&str, u16)]) -> Arc<Self> {
            Arc::new(Self {
                statuses: statuses
                    .iter()
                    .map(|(n, s)| (n.to_string(), *s))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionTransport for FixedTransport {
        async fn send(
            &self,
            candidate: &ProviderCandidate,
            prompt: &Prompt,
        ) -> Result<RawResponse, TransportError> {
            let name = candidate.name.as_str().to_string();
            self.calls.lock().unwrap().push((name.clone(), prompt.clone()));
            let status = self.statuses.get(&name).copied().unwrap_or(500);
            let body = (status == 200).then(|| {
                json!({
                    "choices": [{"message": {"content": format!("summary from {name}")}}],
                    "usage": {"total_tokens": 77}
                })
            });
            Ok(RawResponse {
                status,
                retry_after: None,
                body,
            })
        }
    }

    fn candidates(names: &[&str]) -> Vec<ProviderCandidate> {
        names
            .iter()
            .map(|n| {
                ProviderCandidate::new(
                    CandidateName::new(*n).unwrap(),
                    Endpoint::new(format!("https://example.test/{n}")).unwrap(),
                    ModelId::new(format!("{n}-model")).unwrap(),
                )
            })
            .collect()
    }

    fn summarizer(transport: &Arc<FixedTransport>, names: &[&str]) -> Summarizer<Arc<FixedTransport>> {
        Summarizer::new(
            Dispatcher::new(Arc::clone(transport), BackoffPolicy::default()),
            candidates(names),
            2,
            RateLimiter::per_minute(100),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn successful_report_carries_provider_model_and_usage() {
        let transport = FixedTransport::new(&[("DeepSeek", 200)]);
        let article = Article::new("काठमाडौं । आजको मौसम सफा छ।").with_title("मौसम");

        let report = summarizer(&transport, &["DeepSeek", "Llama"])
            .summarize(&article, Language::Nepali)
            .await;

        assert!(report.success);
        assert_eq!(report.summary, "summary from DeepSeek");
        assert_eq!(report.provider.as_ref().map(|p| p.as_str()), Some("DeepSeek"));
        assert_eq!(report.metadata.model_used.as_ref().map(|m| m.as_str()), Some("DeepSeek-model"));
        assert_eq!(report.metadata.tokens_used, Some(TokenCount::new(77)));
        assert_eq!(report.metadata.text_length, article.text.chars().count());
        assert_eq!(report.title.as_deref(), Some("मौसम"));

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1.messages[1].content.contains("Title: मौसम"));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_text_fails_without_any_request() {
        let transport = FixedTransport::new(&[("DeepSeek", 200)]);
        let report = summarizer(&transport, &["DeepSeek"])
            .summarize(&Article::new("  \n "), Language::English)
            .await;

        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("empty text provided"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_lists_every_provider_and_kind() {
        let transport = FixedTransport::new(&[("DeepSeek", 402), ("Llama", 404)]);
        let err = summarizer(&transport, &["DeepSeek", "Llama"])
            .try_summarize(&Article::new("text"), Language::Nepali)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "all 2 providers failed: DeepSeek (quota_exhausted), Llama (not_found)"
        );
        let SummarizeError::Exhausted { attempted } = err else {
            panic!("expected exhaustion");
        };
        assert_eq!(attempted[0].kind, ErrorKind::QuotaExhausted);
        assert_eq!(attempted[1].kind, ErrorKind::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn no_candidates_is_a_reported_failure() {
        let transport = FixedTransport::new(&[]);
        let report = summarizer(&transport, &[])
            .summarize(&Article::new("text"), Language::Nepali)
            .await;

        assert!(!report.success);
        assert_eq!(
            report.error.as_deref(),
            Some("all 0 providers failed: no providers configured")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn batch_continues_past_failed_items() {
        let transport = FixedTransport::new(&[("Llama", 200)]);
        let articles = vec![
            Article::new("first"),
            Article::new(""),
            Article::new("third").with_title("t"),
        ];

        let reports = summarizer(&transport, &["Llama"])
            .summarize_batch(&articles, Language::Nepali)
            .await;

        let outcomes: Vec<_> = reports.iter().map(|r| r.success).collect();
        assert_eq!(outcomes, vec![true, false, true]);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_survives_total_provider_failure() {
        let transport = FixedTransport::new(&[]);
        let articles = vec![Article::new("a"), Article::new("b")];

        let reports = summarizer(&transport, &["DeepSeek"])
            .summarize_batch(&articles, Language::Nepali)
            .await;

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| !r.success && r.attempted.len() == 1));
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn report_serialises_without_empty_fields() {
        let transport = FixedTransport::new(&[("DeepSeek", 200)]);
        let report = summarizer(&transport, &["DeepSeek"])
            .summarize(&Article::new("text"), Language::English)
            .await;

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["provider"], "DeepSeek");
        assert_eq!(json["metadata"]["language"], "en");
        assert!(json.get("error").is_none());
        assert!(json.get("attempted").is_none());
        assert!(json.get("title").is_none());
    }

    #[test]
    fn article_title_is_optional_in_json() {
        let article: Article = serde_json::from_str(r#"{"text": "समाचार"}"#).unwrap();
        assert_eq!(article, Article::new("समाचार"));
    }
}
