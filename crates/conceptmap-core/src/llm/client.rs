//! HTTP client for OpenAI-compatible chat completions
//!
//! Requests go to the default model first and then down the configured
//! fallback list. Within one model, HTTP 429 is retried with exponential
//! backoff; once retries run out the next model is tried.

use std::iter;
use std::time::Duration;

use rand::Rng;
use reqwest::{Client as HttpClient, StatusCode};
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::types::{ChatRequest, ChatResponse, Completion, Message};

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Attempts per model when rate limited, including the first
const MAX_ATTEMPTS: u32 = 3;

const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Retry-after assumed when a 429 body does not say
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Error text from providers that means "this model, not this request"
const MODEL_UNAVAILABLE_MARKERS: &[&str] = &[
    "model not found",
    "unavailable",
    "not available",
    "no available provider",
    "overloaded",
    "capacity",
];

/// Chat completion client
///
/// Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct LlmClient {
    http: HttpClient,
    config: LlmConfig,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("default_model", &self.config.default_model)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct LlmClientBuilder {
    config: Option<LlmConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
}

impl LlmClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Point at another OpenAI-compatible endpoint (defaults to OpenRouter)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn build(self) -> Result<LlmClient> {
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::LLMError("API key is required".to_string()))?;
        let config = self.config.unwrap_or_default();

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| OPENROUTER_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(LlmClient {
            http,
            config,
            api_key,
            base_url,
        })
    }
}

impl LlmClient {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        LlmClientBuilder::new()
            .config(config)
            .api_key(api_key)
            .build()
    }

    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    /// Default model followed by the fallbacks, without repeats
    pub fn model_chain(&self) -> Vec<&str> {
        let mut chain: Vec<&str> = Vec::new();
        for model in iter::once(&self.config.default_model).chain(&self.config.fallback_models) {
            if !chain.contains(&model.as_str()) {
                chain.push(model);
            }
        }
        chain
    }

    /// Tokens to request: the caller's limit, capped by `llm.max_tokens`
    pub fn token_budget(&self, requested: Option<usize>) -> usize {
        requested.map_or(self.config.max_tokens, |n| n.min(self.config.max_tokens))
    }

    /// Complete against a single model, retrying while rate limited
    pub async fn complete(
        &self,
        model: &str,
        messages: Vec<Message>,
        max_tokens: Option<usize>,
    ) -> Result<Completion> {
        let request = ChatRequest::new(model, messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.token_budget(max_tokens));

        let mut attempt = 1;
        loop {
            match self.send(&request).await {
                Err(Error::RateLimited(retry_after)) if attempt < MAX_ATTEMPTS => {
                    let delay = backoff_delay(attempt, retry_after);
                    warn!(
                        model,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Complete against the model chain, moving on when a model is
    /// unavailable or stays rate limited
    pub async fn complete_with_fallback(
        &self,
        messages: Vec<Message>,
        max_tokens: Option<usize>,
    ) -> Result<Completion> {
        let mut last_error = None;

        for model in self.model_chain() {
            match self.complete(model, messages.clone(), max_tokens).await {
                Ok(completion) => {
                    info!(
                        model = %completion.model,
                        tokens = completion.total_tokens,
                        "Completion received"
                    );
                    return Ok(completion);
                }
                Err(e) if should_fall_back(&e) => {
                    warn!(model, error = %e, "Model failed, trying next in chain");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::NoSuitableModel("no models configured".to_string())))
    }

    async fn send(&self, request: &ChatRequest) -> Result<Completion> {
        debug!(
            model = %request.model,
            max_tokens = ?request.max_tokens,
            "Sending completion request"
        );

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("X-Title", "Conceptmap")
            .json(request)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMError(format!("Malformed completion response: {}", e)))?;

        Completion::from_response(body)
            .ok_or_else(|| Error::LLMError("Completion response had no choices".to_string()))
    }
}

fn status_error(status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            Error::RateLimited(retry_after_secs(body).unwrap_or(DEFAULT_RETRY_AFTER_SECS))
        }
        StatusCode::UNAUTHORIZED => Error::LLMError(
            "API key rejected. Check CONCEPTMAP_API_KEY or OPENROUTER_API_KEY.".to_string(),
        ),
        StatusCode::PAYMENT_REQUIRED => {
            Error::LLMError("Insufficient credits on the provider account".to_string())
        }
        StatusCode::NOT_FOUND => Error::LLMError(format!("Model not found: {}", body)),
        s if s.is_server_error() => {
            Error::LLMError(format!("Provider unavailable ({}): {}", s.as_u16(), body))
        }
        s => Error::LLMError(format!("Request failed ({}): {}", s.as_u16(), body)),
    }
}

/// Whether the next model in the chain might succeed where this one failed
fn should_fall_back(err: &Error) -> bool {
    match err {
        Error::RateLimited(_) => true,
        Error::LLMError(msg) => {
            let msg = msg.to_lowercase();
            MODEL_UNAVAILABLE_MARKERS.iter().any(|m| msg.contains(m))
        }
        _ => false,
    }
}

/// Exponential backoff, never shorter than the provider's retry-after, plus up to 10% jitter
fn backoff_delay(attempt: u32, retry_after_secs: u64) -> Duration {
    let exponential = BACKOFF_BASE * 2u32.pow(attempt.saturating_sub(1));
    let delay = exponential.max(Duration::from_secs(retry_after_secs));
    let jitter_ms = (delay.as_millis() as u64 / 10).max(1);
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
}

fn retry_after_secs(body: &str) -> Option<u64> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json.get("retry_after")
        .or_else(|| json.pointer("/error/retry_after"))
        .and_then(serde_json::Value::as_u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LlmConfig {
        LlmConfig {
            api_key: None,
            default_model: "test/model".to_string(),
            fallback_models: vec!["fallback/model".to_string(), "test/model".to_string()],
            temperature: 0.3,
            max_tokens: 512,
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_builder_trims_base_url() {
        let client = LlmClient::builder()
            .config(test_config())
            .api_key("test-key")
            .base_url("http://localhost:8080/v1/")
            .build()
            .unwrap();

        assert_eq!(client.default_model(), "test/model");
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_builder_rejects_missing_or_blank_key() {
        assert!(matches!(
            LlmClient::builder().config(test_config()).build(),
            Err(Error::LLMError(_))
        ));
        assert!(matches!(
            LlmClient::new(test_config(), "  "),
            Err(Error::LLMError(_))
        ));
    }

    #[test]
    fn test_model_chain_skips_duplicates() {
        let client = LlmClient::new(test_config(), "test-key").unwrap();
        assert_eq!(client.model_chain(), vec!["test/model", "fallback/model"]);
    }

    #[test]
    fn test_token_budget_is_capped_by_config() {
        let client = LlmClient::new(test_config(), "test-key").unwrap();
        assert_eq!(client.token_budget(None), 512);
        assert_eq!(client.token_budget(Some(150)), 150);
        assert_eq!(client.token_budget(Some(2048)), 512);

        let mut config = test_config();
        config.max_tokens = 100;
        let client = LlmClient::new(config, "test-key").unwrap();
        assert_eq!(client.token_budget(Some(150)), 100);
    }

    #[test]
    fn test_debug_hides_key() {
        let client = LlmClient::new(test_config(), "secret-key").unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("test/model"));
        assert!(!debug.contains("secret-key"));
    }

    #[test]
    fn test_client_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LlmClient>();
    }

    #[test]
    fn test_should_fall_back() {
        assert!(should_fall_back(&Error::RateLimited(5)));
        assert!(should_fall_back(&Error::LLMError("Model not found: x".into())));
        assert!(should_fall_back(&Error::LLMError("provider overloaded".into())));
        assert!(!should_fall_back(&Error::LLMError("API key rejected".into())));
        assert!(!should_fall_back(&Error::Other("boom".into())));
    }

    #[test]
    fn test_backoff_delay() {
        let first = backoff_delay(1, 0);
        assert!(first >= Duration::from_millis(1000));
        assert!(first < Duration::from_millis(1100));

        assert!(backoff_delay(2, 0) >= Duration::from_millis(2000));
        assert!(backoff_delay(1, 5) >= Duration::from_secs(5));
    }

    #[test]
    fn test_retry_after_secs() {
        assert_eq!(retry_after_secs(r#"{"retry_after": 30}"#), Some(30));
        assert_eq!(retry_after_secs(r#"{"error": {"retry_after": 60}}"#), Some(60));
        assert_eq!(retry_after_secs(r#"{"message": "slow down"}"#), None);
        assert_eq!(retry_after_secs("not json"), None);
    }

    #[test]
    fn test_status_error() {
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "{}"),
            Error::RateLimited(60)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, r#"{"retry_after": 5}"#),
            Error::RateLimited(5)
        ));

        let not_found = status_error(StatusCode::NOT_FOUND, "gone");
        assert!(should_fall_back(&not_found));
        let outage = status_error(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(should_fall_back(&outage));
        assert!(!should_fall_back(&status_error(StatusCode::UNAUTHORIZED, "")));
    }
}
