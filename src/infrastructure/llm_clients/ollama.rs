use super::{endpoint, ensure_success, http_client, probe_client, stream, LLMClient, TextStream};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, OllamaSettings};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const PROVIDER: &str = "Ollama";
const AUTH_HINT: &str = "Check the access settings of the Ollama server.";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_ctx: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    #[serde(default)]
    name: String,
}

/// Client for a local Ollama server (`/api/generate`, `/api/tags`).
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
    num_ctx: u32,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(settings: &OllamaSettings, temperature: f32) -> Self {
        Self {
            client: http_client(settings.timeout_secs),
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            timeout_secs: settings.timeout_secs,
            num_ctx: settings.num_ctx,
            temperature,
        }
    }

    pub fn from_config(config: &LLMConfig) -> Self {
        Self::new(&config.ollama, config.temperature)
    }

    /// Same server and settings, bound to another model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn timeout_error(&self) -> AppError {
        AppError::ConnectionFailure(format!(
            "Ollama request timed out after {}s. The model may be slow. Try a smaller/faster model or increase timeout.",
            self.timeout_secs
        ))
    }

    async fn send(&self, prompt: &str, system: Option<&str>, stream: bool) -> Result<reqwest::Response> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream,
            options: GenerateOptions {
                num_ctx: self.num_ctx,
                temperature: self.temperature,
            },
            system: system.filter(|s| !s.is_empty()),
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "api/generate"))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.timeout_error()
                } else {
                    AppError::ConnectionFailure(format!("Failed to connect to Ollama: {}", e))
                }
            })?;

        ensure_success(PROVIDER, AUTH_HINT, response).await
    }

    async fn installed_models(&self) -> Result<Vec<String>> {
        let response = probe_client()
            .get(endpoint(&self.base_url, "api/tags"))
            .send()
            .await
            .map_err(|e| AppError::ConnectionFailure(format!("Failed to connect to Ollama: {}", e)))?;
        let response = ensure_success(PROVIDER, AUTH_HINT, response).await?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| AppError::ConnectionFailure(format!("Invalid Ollama model list: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

/// Installed names carry tags (`qwen2.5:7b`, `mistral:latest`), so only the base name is compared.
pub(crate) fn model_installed(requested: &str, installed: &[String]) -> bool {
    let base = requested.split(':').next().unwrap_or(requested);
    !base.is_empty() && installed.iter().any(|name| name.starts_with(base))
}

fn ndjson_stream(
    response: reqwest::Response,
    timeout_secs: u64,
) -> impl Stream<Item = Result<String>> + Send {
    async_stream::try_stream! {
        let mut lines = Box::pin(stream::lines(response, PROVIDER));
        while let Some(line) = lines.next().await {
            let line = line.map_err(|e| match e {
                AppError::ConnectionFailure(msg) if msg.contains("timed out") => {
                    AppError::ConnectionFailure(format!(
                        "Ollama request timed out after {}s. Try a smaller/faster model.",
                        timeout_secs
                    ))
                }
                other => other,
            })?;
            let chunk: serde_json::Value = serde_json::from_str(&line).map_err(|e| {
                AppError::ConnectionFailure(format!("Invalid Ollama stream chunk: {}", e))
            })?;
            if let Some(text) = chunk["response"].as_str() {
                if !text.is_empty() {
                    yield text.to_string();
                }
            }
            if chunk["done"].as_bool().unwrap_or(false) {
                break;
            }
        }
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending Ollama generate request");
        let response = self.send(prompt, system, false).await?;

        let body: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.timeout_error()
            } else {
                AppError::ConnectionFailure(format!("Invalid Ollama response: {}", e))
            }
        })?;

        Ok(body.response)
    }

    async fn generate_stream(&self, prompt: &str, system: Option<&str>) -> Result<TextStream> {
        let response = self.send(prompt, system, true).await?;
        Ok(Box::pin(ndjson_stream(response, self.timeout_secs)))
    }

    async fn is_available(&self) -> bool {
        match self.installed_models().await {
            Ok(installed) => model_installed(&self.model, &installed),
            Err(e) => {
                warn!(model = %self.model, error = %e, "Ollama availability check failed");
                false
            }
        }
    }

    async fn get_models(&self) -> Vec<String> {
        self.installed_models().await.unwrap_or_else(|e| {
            debug!(error = %e, "Could not list Ollama models");
            Vec::new()
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
