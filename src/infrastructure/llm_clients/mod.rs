pub mod anthropic;
pub mod chat_completions;
pub mod groq;
pub mod huggingface;
pub mod ollama;
pub mod openai;
pub mod service;
pub(crate) mod stream;
pub mod vllm;

use crate::domain::error::{AppError, Result};
use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;
use std::time::Duration;

pub use anthropic::AnthropicClient;
pub use groq::GroqClient;
pub use huggingface::HuggingFaceClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;
pub use service::{LlmAdapter, LlmService};
pub use vllm::VllmClient;

/// Lazily produced text fragments of one streamed generation.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Timeout for reachability probes and model listings.
pub const PROBE_TIMEOUT_SECS: u64 = 5;

/// Fragment size used when a provider has no native incremental output.
pub const FALLBACK_CHUNK_CHARS: usize = 50;

#[async_trait]
pub trait LLMClient: Send + Sync {
    /// One blocking request/response exchange.
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String>;

    /// Opens an independent request and yields fragments as they arrive.
    async fn generate_stream(&self, prompt: &str, system: Option<&str>) -> Result<TextStream>;

    /// Best-effort reachability check. Never fails.
    async fn is_available(&self) -> bool;

    /// Best-effort model enumeration. Empty on failure.
    async fn get_models(&self) -> Vec<String>;

    fn model_name(&self) -> &str;
}

pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

pub(crate) fn probe_client() -> reqwest::Client {
    http_client(PROBE_TIMEOUT_SECS)
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub(crate) fn require_key(key: &Option<String>, provider: &str, env_var: &str) -> Result<String> {
    match key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(AppError::AuthorizationFailure(format!(
            "Missing API key for {}. Set the {} environment variable.",
            provider, env_var
        ))),
    }
}

pub(crate) fn transport_error(provider: &str, timeout_secs: u64, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::ConnectionFailure(format!(
            "{} request timed out after {}s",
            provider, timeout_secs
        ))
    } else if err.is_connect() {
        AppError::ConnectionFailure(format!("Failed to connect to {}: {}", provider, err))
    } else {
        AppError::ConnectionFailure(format!("{} request failed: {}", provider, err))
    }
}

/// Passes 2xx responses through; maps 401/403 to an authorization failure carrying `auth_hint`.
pub(crate) async fn ensure_success(
    provider: &str,
    auth_hint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = crate::shared::truncate_chars(&body, 200);

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(AppError::AuthorizationFailure(format!(
            "{} rejected the request ({}). {} Details: {}",
            provider,
            status.as_u16(),
            auth_hint,
            detail
        )));
    }

    Err(AppError::ConnectionFailure(format!(
        "{} API error ({}): {}",
        provider,
        status.as_u16(),
        detail
    )))
}

pub(crate) async fn read_json(provider: &str, response: reqwest::Response) -> Result<serde_json::Value> {
    response
        .json()
        .await
        .map_err(|e| AppError::ConnectionFailure(format!("{} returned invalid JSON: {}", provider, e)))
}

pub(crate) fn static_models(models: &[&str]) -> Vec<String> {
    models.iter().map(|m| m.to_string()).collect()
}

/// Slices an already complete response so callers can consume every provider as a stream.
pub(crate) fn chunked(text: String) -> TextStream {
    let chunks = crate::shared::chunk_text(&text, FALLBACK_CHUNK_CHARS);
    Box::pin(futures_util::stream::iter(chunks.into_iter().map(Ok)))
}
