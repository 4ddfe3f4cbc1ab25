//! HTTP client plumbing for model-backed relevance scoring
//!
//! This module provides:
//! - `ChatCompletion`, the capability an LLM scorer consumes
//! - `HttpChatClient`, an OpenAI-compatible `/chat/completions` client
//! - `post_json`, the shared JSON-over-HTTP helper (also used by the
//!   `/rerank` provider)
//! - `retry_once`, single-retry logic for flaky or empty model responses
//!
//! Network transports are compiled only with the `rerank` feature; without
//! it every call returns `RerankError::FeatureDisabled`.

use crate::rerank::RerankError;
use fusionrank_core::ModelConfig;
use std::time::Duration;

/// Default rerank temperature, deterministic for consistent scoring.
const DEFAULT_TEMPERATURE: f32 = 0.0;
/// Default max tokens for rerank responses.
const DEFAULT_MAX_TOKENS: u32 = 200;

// ============================================================================
// ChatCompletion capability
// ============================================================================

/// A chat model that turns a message array into response text.
///
/// Object-safe so scorers can hold `Arc<dyn ChatCompletion>`; tests plug in
/// scripted implementations.
pub trait ChatCompletion: Send + Sync {
    /// Send `messages` (a JSON array of `{role, content}`) and return the
    /// assistant's text.
    fn complete(&self, messages: &serde_json::Value) -> Result<String, RerankError>;

    /// Model label, for logs and `name()` reporting.
    fn model(&self) -> &str;
}

// ============================================================================
// HttpChatClient
// ============================================================================

/// Client for an OpenAI-compatible chat completions endpoint.
///
/// Works with Ollama, vLLM, llama.cpp server, OpenAI and other compatible
/// providers.
#[derive(Debug, Clone)]
#[allow(dead_code)] // fields used behind #[cfg(feature = "rerank")]
pub struct HttpChatClient {
    url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
}

impl HttpChatClient {
    /// Create a client.
    ///
    /// `endpoint` is the base URL (e.g. "http://localhost:11434/v1"); the
    /// `/chat/completions` path is appended automatically.
    pub fn new(endpoint: &str, model: &str, api_key: Option<&str>, timeout_ms: u64) -> Self {
        let base = endpoint.trim_end_matches('/');
        HttpChatClient {
            url: format!("{}/chat/completions", base),
            model: model.to_string(),
            api_key: api_key.map(|s| s.to_string()),
            timeout: Duration::from_millis(timeout_ms),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Create a client from a `[rerank.llm]` config section.
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(
            &config.endpoint,
            &config.model,
            config.api_key.as_deref(),
            config.timeout_ms,
        )
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the maximum response tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Full request URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ChatCompletion for HttpChatClient {
    fn complete(&self, messages: &serde_json::Value) -> Result<String, RerankError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        let json = post_json(&self.url, self.api_key.as_deref(), self.timeout, &body)?;
        extract_message_content(&json)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Pull `choices[0].message.content` out of a chat completions response.
pub fn extract_message_content(json: &serde_json::Value) -> Result<String, RerankError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            let text = json.to_string();
            let preview: String = text.chars().take(200).collect();
            RerankError::Parse(format!("unexpected response format: {}", preview))
        })
}

// ============================================================================
// Shared HTTP helper
// ============================================================================

/// POST a JSON body and parse the JSON response.
///
/// Handles agent construction with a global timeout, the optional bearer
/// token, and mapping transport failures onto `Timeout` / `Network`.
#[cfg(feature = "rerank")]
pub fn post_json(
    url: &str,
    api_key: Option<&str>,
    timeout: Duration,
    body: &serde_json::Value,
) -> Result<serde_json::Value, RerankError> {
    let body_bytes = serde_json::to_vec(body)
        .map_err(|e| RerankError::Parse(format!("failed to serialize request: {}", e)))?;

    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    let agent = ureq::Agent::new_with_config(config);

    let mut request = agent.post(url).header("Content-Type", "application/json");
    if let Some(key) = api_key {
        request = request.header("Authorization", &format!("Bearer {}", key));
    }

    let mut response = request.send(&body_bytes[..]).map_err(|e| {
        let msg = e.to_string();
        if msg.contains("timed out") || msg.contains("Timeout") {
            RerankError::Timeout
        } else {
            RerankError::Network(msg)
        }
    })?;

    let response_text = response
        .body_mut()
        .read_to_string()
        .map_err(|e| RerankError::Network(format!("failed to read response: {}", e)))?;

    serde_json::from_str(&response_text)
        .map_err(|e| RerankError::Parse(format!("invalid JSON response: {}", e)))
}

/// Placeholder for when the `rerank` feature is not enabled.
#[cfg(not(feature = "rerank"))]
pub fn post_json(
    _url: &str,
    _api_key: Option<&str>,
    _timeout: Duration,
    _body: &serde_json::Value,
) -> Result<serde_json::Value, RerankError> {
    Err(RerankError::FeatureDisabled("rerank"))
}

// ============================================================================
// Retry Helper
// ============================================================================

/// Execute a model call with a single retry on failure or empty results.
///
/// 1. Calls `call_fn()` to get raw text
/// 2. Calls `parse_fn()` to parse it
/// 3. If parsing succeeds but `is_empty_fn()` returns true, retries once
/// 4. If the call itself fails, retries once
///
/// `FeatureDisabled` and `Unavailable` are not retried: a second attempt
/// cannot succeed. `operation` labels the tracing messages.
pub fn retry_once<T>(
    call_fn: impl Fn() -> Result<String, RerankError>,
    parse_fn: impl Fn(&str) -> T,
    is_empty_fn: impl Fn(&T) -> bool,
    on_empty_err: impl Fn() -> RerankError,
    operation: &str,
) -> Result<T, RerankError> {
    match call_fn() {
        Ok(text) => {
            let result = parse_fn(&text);
            if !is_empty_fn(&result) {
                return Ok(result);
            }
            tracing::warn!(
                target: "fusionrank::llm_client",
                op = operation,
                "First call returned no valid results, retrying"
            );
        }
        Err(e @ (RerankError::FeatureDisabled(_) | RerankError::Unavailable { .. })) => {
            return Err(e);
        }
        Err(e) => {
            tracing::warn!(
                target: "fusionrank::llm_client",
                op = operation,
                error = %e,
                "First call failed, retrying"
            );
        }
    }

    match call_fn() {
        Ok(text) => {
            let result = parse_fn(&text);
            if is_empty_fn(&result) {
                tracing::warn!(
                    target: "fusionrank::llm_client",
                    op = operation,
                    "Retry also returned no valid results, falling back"
                );
                Err(on_empty_err())
            } else {
                Ok(result)
            }
        }
        Err(e) => {
            tracing::warn!(
                target: "fusionrank::llm_client",
                op = operation,
                error = %e,
                "Retry also failed, falling back"
            );
            Err(e)
        }
    }
}
