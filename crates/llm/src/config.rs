//! Provider configuration.
//!
//! Loaded once at start-up from TOML (every field optional) and turned into
//! the ordered [`ProviderCandidate`] list the dispatcher reads. The credential
//! is never stored in the file; only the name of the environment variable
//! holding it is.
//!
//! ```toml
//! max_attempts_per_candidate = 2
//! api_key_env = "DEEPSEEK_API_KEY"
//!
//! [backoff]
//! rate_limit_base_secs = 5
//!
//! [[candidates]]
//! name = "DeepSeek (Primary)"
//! endpoint = "https://api.deepseek.com/v1/chat/completions"
//! model = "deepseek-chat"
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use dispatch::{
    BackoffPolicy, CandidateName, Endpoint, ModelId, ProviderCandidate,
    DEFAULT_MAX_ATTEMPTS_PER_CANDIDATE,
};
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::DEFAULT_REQUEST_TIMEOUT;

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEEPSEEK_URL: &str = "https://api.deepseek.com/v1/chat/completions";

/// No configured wait may exceed one day.
const MAX_DELAY_SECS: f64 = 86_400.0;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("candidate #{index} is invalid: {reason}")]
    InvalidCandidate { index: usize, reason: String },

    #[error("API key environment variable '{var}' is not set or is empty")]
    MissingApiKey { var: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// File model
// ---------------------------------------------------------------------------

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub max_attempts_per_candidate: u32,
    pub request_timeout_secs: u64,
    /// Name of the environment variable holding the bearer credential.
    pub api_key_env: String,
    /// Process-wide request budget enforced by the summarizer.
    pub calls_per_minute: u32,
    pub backoff: BackoffConfig,
    /// Tried in this order.
    pub candidates: Vec<CandidateConfig>,
}

/// Delay constants, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackoffConfig {
    pub rate_limit_base_secs: f64,
    pub transient_delay_secs: f64,
    pub max_delay_secs: f64,
}

/// One `[[candidates]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateConfig {
    pub name: String,
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            max_attempts_per_candidate: DEFAULT_MAX_ATTEMPTS_PER_CANDIDATE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
            calls_per_minute: 20,
            backoff: BackoffConfig::default(),
            candidates: default_candidates(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        Self {
            rate_limit_base_secs: policy.rate_limit_base.as_secs_f64(),
            transient_delay_secs: policy.transient_delay.as_secs_f64(),
            max_delay_secs: policy.max_delay.as_secs_f64(),
        }
    }
}

/// DeepSeek first, then the free OpenRouter models.
fn default_candidates() -> Vec<CandidateConfig> {
    let openrouter = |name: &str, model: &str| CandidateConfig {
        name: name.to_string(),
        endpoint: OPENROUTER_URL.to_string(),
        model: model.to_string(),
        headers: BTreeMap::from([
            ("HTTP-Referer".to_string(), "https://github.com".to_string()),
            ("X-Title".to_string(), "Nepali News Summarizer".to_string()),
        ]),
    };

    vec![
        CandidateConfig {
            name: "DeepSeek (Primary)".to_string(),
            endpoint: DEEPSEEK_URL.to_string(),
            model: "deepseek-chat".to_string(),
            headers: BTreeMap::new(),
        },
        openrouter("Llama 3.2 3B (FREE)", "meta-llama/llama-3.2-3b-instruct:free"),
        openrouter("Gemini 2.0 Flash (FREE)", "google/gemini-2.0-flash-exp:free"),
        openrouter("Qwen 2 7B (FREE)", "qwen/qwen-2-7b-instruct:free"),
    ]
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl ProviderConfig {
    /// Reads and validates a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts_per_candidate == 0 {
            return Err(invalid("max_attempts_per_candidate must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs must be at least 1"));
        }
        if self.calls_per_minute == 0 {
            return Err(invalid("calls_per_minute must be at least 1"));
        }
        if self.api_key_env.trim().is_empty() {
            return Err(invalid("api_key_env must name an environment variable"));
        }

        let b = &self.backoff;
        for (field, value) in [
            ("rate_limit_base_secs", b.rate_limit_base_secs),
            ("transient_delay_secs", b.transient_delay_secs),
            ("max_delay_secs", b.max_delay_secs),
        ] {
            if !value.is_finite() || value <= 0.0 || value > MAX_DELAY_SECS {
                return Err(invalid(format!(
                    "backoff.{field} must be between 0 and {MAX_DELAY_SECS} seconds"
                )));
            }
        }
        if b.max_delay_secs < b.rate_limit_base_secs || b.max_delay_secs < b.transient_delay_secs {
            return Err(invalid("backoff.max_delay_secs must not be below the other delays"));
        }

        let mut names = HashSet::new();
        for (index, candidate) in self.candidates.iter().enumerate() {
            candidate.validate().map_err(|reason| ConfigError::InvalidCandidate { index, reason })?;
            if !names.insert(candidate.name.trim()) {
                return Err(ConfigError::InvalidCandidate {
                    index,
                    reason: format!("name '{}' is already used", candidate.name),
                });
            }
        }
        Ok(())
    }

    /// Converts the configured delays. Fails on values that are not a valid
    /// non-negative duration, even when [`ProviderConfig::validate`] was skipped.
    pub fn backoff_policy(&self) -> Result<BackoffPolicy, ConfigError> {
        let b = &self.backoff;
        Ok(BackoffPolicy {
            rate_limit_base: delay("rate_limit_base_secs", b.rate_limit_base_secs)?,
            transient_delay: delay("transient_delay_secs", b.transient_delay_secs)?,
            max_delay: delay("max_delay_secs", b.max_delay_secs)?,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reads the credential from the environment variable named by `api_key_env`.
    pub fn api_key_from_env(&self) -> Result<String, ConfigError> {
        self.api_key_with(|var| std::env::var(var).ok())
    }

    /// Like [`ProviderConfig::api_key_from_env`] with an explicit lookup.
    pub fn api_key_with(
        &self,
        lookup: impl FnOnce(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        lookup(&self.api_key_env)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey {
                var: self.api_key_env.clone(),
            })
    }

    /// Builds the ordered candidate list, applying `api_key` as a bearer
    /// credential to every candidate.
    pub fn candidates(&self, api_key: &str) -> Result<Vec<ProviderCandidate>, ConfigError> {
        self.candidates
            .iter()
            .enumerate()
            .map(|(index, c)| {
                c.to_candidate(api_key)
                    .map_err(|reason| ConfigError::InvalidCandidate { index, reason })
            })
            .collect()
    }
}

impl CandidateConfig {
    fn validate(&self) -> Result<(), String> {
        self.to_candidate("").map(|_| ())
    }

    fn to_candidate(&self, api_key: &str) -> Result<ProviderCandidate, String> {
        let name = CandidateName::new(&self.name).ok_or("name is empty")?;
        let endpoint = Endpoint::new(&self.endpoint).ok_or("endpoint is empty")?;
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(format!("endpoint '{}' is not an http(s) URL", self.endpoint));
        }
        let model = ModelId::new(&self.model).ok_or("model is empty")?;

        let mut candidate = ProviderCandidate::new(name, endpoint, model);
        for (header, value) in &self.headers {
            if header.eq_ignore_ascii_case("authorization") {
                return Err("the authorization header is set from api_key_env".to_string());
            }
            check_header(header, value)?;
            candidate = candidate.with_header(header, value);
        }
        if !api_key.is_empty() {
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|_| "the API key is not a valid header value".to_string())?;
            candidate = candidate.with_bearer_token(api_key);
        }
        Ok(candidate)
    }
}

fn check_header(name: &str, value: &str) -> Result<(), String> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| format!("header name '{name}' is not a valid HTTP header name"))?;
    HeaderValue::from_str(value)
        .map_err(|_| format!("value of header '{name}' is not a valid HTTP header value"))?;
    Ok(())
}

fn delay(field: &str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| invalid(format!("backoff.{field} is not a valid duration: {secs}")))
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
    }
}
