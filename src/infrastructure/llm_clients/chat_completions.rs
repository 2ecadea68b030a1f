//! OpenAI-compatible chat-completions wire shape, shared by OpenAI, Groq and
//! the HuggingFace router's first attempt.

use super::{
    endpoint, ensure_success, http_client, probe_client, require_key, static_models, stream,
    transport_error, TextStream,
};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::HostedApiSettings;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage {
    pub(crate) role: &'static str,
    pub(crate) content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub(crate) model: String,
    pub(crate) messages: Vec<ChatMessage>,
    pub(crate) temperature: f32,
    pub(crate) max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub(crate) stream: bool,
}

impl ChatRequest {
    pub(crate) fn new(
        model: &str,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system.filter(|s| !s.is_empty()) {
            messages.push(ChatMessage {
                role: "system",
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt.to_string(),
        });

        Self {
            model: model.to_string(),
            messages,
            temperature,
            max_tokens,
            stream: false,
        }
    }

    pub(crate) fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    pub(crate) fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
    }
}

/// `choices[0].delta.content` fragments of a streamed chat completion.
pub(crate) fn delta_stream(
    response: reqwest::Response,
    provider: &'static str,
) -> impl Stream<Item = Result<String>> + Send {
    async_stream::try_stream! {
        let mut events = Box::pin(stream::sse_events(response, provider));
        while let Some(event) = events.next().await {
            let event = event?;
            if let Some(text) = event["choices"][0]["delta"]["content"].as_str() {
                if !text.is_empty() {
                    yield text.to_string();
                }
            }
        }
    }
}

/// Static facts about one hosted vendor speaking the chat-completions protocol.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Vendor {
    pub(crate) name: &'static str,
    pub(crate) env_var: &'static str,
    pub(crate) auth_hint: &'static str,
    pub(crate) models: &'static [&'static str],
}

pub(crate) struct ChatCompletionsApi {
    vendor: Vendor,
    settings: HostedApiSettings,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl ChatCompletionsApi {
    pub(crate) fn new(
        vendor: Vendor,
        settings: HostedApiSettings,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        let client = http_client(settings.timeout_secs);
        Self {
            vendor,
            settings,
            temperature,
            max_tokens,
            client,
        }
    }

    pub(crate) fn model(&self) -> &str {
        &self.settings.model
    }

    async fn send(&self, body: &ChatRequest) -> Result<reqwest::Response> {
        let api_key = require_key(&self.settings.api_key, self.vendor.name, self.vendor.env_var)?;
        let url = endpoint(&self.settings.base_url, "chat/completions");
        debug!(provider = self.vendor.name, model = %body.model, stream = body.stream, "Sending chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(self.vendor.name, self.settings.timeout_secs, e))?;

        ensure_success(self.vendor.name, self.vendor.auth_hint, response).await
    }

    fn request(&self, prompt: &str, system: Option<&str>) -> ChatRequest {
        ChatRequest::new(
            &self.settings.model,
            prompt,
            system,
            self.temperature,
            self.max_tokens,
        )
    }

    pub(crate) async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let response = self.send(&self.request(prompt, system)).await?;

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AppError::ConnectionFailure(format!("{} returned invalid JSON: {}", self.vendor.name, e))
        })?;

        parsed.into_content().ok_or_else(|| {
            AppError::ConnectionFailure(format!(
                "{} returned a response without message content",
                self.vendor.name
            ))
        })
    }

    pub(crate) async fn generate_stream(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<TextStream> {
        let response = self.send(&self.request(prompt, system).streaming()).await?;
        Ok(Box::pin(delta_stream(response, self.vendor.name)))
    }

    pub(crate) async fn is_available(&self) -> bool {
        let Ok(api_key) = require_key(&self.settings.api_key, self.vendor.name, self.vendor.env_var)
        else {
            return false;
        };

        match probe_client()
            .get(endpoint(&self.settings.base_url, "models"))
            .bearer_auth(api_key)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(provider = self.vendor.name, error = %e, "Availability probe failed");
                false
            }
        }
    }

    pub(crate) fn models(&self) -> Vec<String> {
        static_models(self.vendor.models)
    }
}
