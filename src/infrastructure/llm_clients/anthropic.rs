use super::{
    endpoint, ensure_success, http_client, probe_client, require_key, static_models, stream,
    transport_error, LLMClient, TextStream,
};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{HostedApiSettings, LLMConfig, ANTHROPIC_MODELS};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER: &str = "Anthropic";
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const API_VERSION: &str = "2023-06-01";
const AUTH_HINT: &str = "Check ANTHROPIC_API_KEY at https://console.anthropic.com/settings/keys.";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Messages API. The system instruction travels as a top-level field.
pub struct AnthropicClient {
    client: reqwest::Client,
    settings: HostedApiSettings,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(settings: HostedApiSettings, temperature: f32, max_tokens: u32) -> Self {
        Self {
            client: http_client(settings.timeout_secs),
            settings,
            temperature,
            max_tokens,
        }
    }

    pub fn from_config(config: &LLMConfig) -> Self {
        Self::new(config.anthropic.clone(), config.temperature, config.max_tokens)
    }

    async fn send(&self, prompt: &str, system: Option<&str>, stream: bool) -> Result<reqwest::Response> {
        let api_key = require_key(&self.settings.api_key, PROVIDER, API_KEY_ENV)?;
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            system: system.filter(|s| !s.is_empty()),
            stream,
        };

        let response = self
            .client
            .post(endpoint(&self.settings.base_url, "v1/messages"))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, self.settings.timeout_secs, e))?;

        ensure_success(PROVIDER, AUTH_HINT, response).await
    }
}

fn delta_stream(response: reqwest::Response) -> impl Stream<Item = Result<String>> + Send {
    async_stream::try_stream! {
        let mut events = Box::pin(stream::sse_events(response, PROVIDER));
        while let Some(event) = events.next().await {
            let event = event?;
            match event["type"].as_str() {
                Some("content_block_delta") => {
                    if let Some(text) = event["delta"]["text"].as_str() {
                        if !text.is_empty() {
                            yield text.to_string();
                        }
                    }
                }
                Some("message_stop") => break,
                Some("error") => {
                    let message = event["error"]["message"].as_str().unwrap_or("unknown error");
                    Err::<(), _>(AppError::ConnectionFailure(format!("Anthropic stream error: {}", message)))?;
                }
                _ => {}
            }
        }
    }
}

#[async_trait]
impl LLMClient for AnthropicClient {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let response = self.send(prompt, system, false).await?;
        let body: MessagesResponse = response.json().await.map_err(|e| {
            AppError::ConnectionFailure(format!("Anthropic API error: invalid response: {}", e))
        })?;

        body.content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| {
                AppError::ConnectionFailure("Anthropic API error: response has no text content".to_string())
            })
    }

    async fn generate_stream(&self, prompt: &str, system: Option<&str>) -> Result<TextStream> {
        let response = self.send(prompt, system, true).await?;
        Ok(Box::pin(delta_stream(response)))
    }

    async fn is_available(&self) -> bool {
        let Ok(api_key) = require_key(&self.settings.api_key, PROVIDER, API_KEY_ENV) else {
            return false;
        };

        match probe_client()
            .get(endpoint(&self.settings.base_url, "v1/models"))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Anthropic availability probe failed");
                false
            }
        }
    }

    async fn get_models(&self) -> Vec<String> {
        static_models(ANTHROPIC_MODELS)
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}
