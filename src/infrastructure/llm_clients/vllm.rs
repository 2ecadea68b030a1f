use super::{
    endpoint, ensure_success, http_client, probe_client, read_json, static_models, stream,
    transport_error, LLMClient, TextStream, PROBE_TIMEOUT_SECS,
};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, VllmSettings, VLLM_MODELS};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tracing::debug;

const PROVIDER: &str = "vLLM";
const AUTH_HINT: &str = "Check the --api-key setting of the vLLM server.";
const TOP_P: f32 = 0.95;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

/// vLLM through its OpenAI-compatible server (`/v1/completions`).
///
/// The in-process engine is a Python runtime; with `use_server = false`
/// generation reports the missing dependency instead.
pub struct VllmClient {
    client: reqwest::Client,
    settings: VllmSettings,
    temperature: f32,
    max_tokens: u32,
}

impl VllmClient {
    pub fn new(settings: VllmSettings, temperature: f32, max_tokens: u32) -> Self {
        Self {
            client: http_client(settings.timeout_secs),
            settings,
            temperature,
            max_tokens,
        }
    }

    pub fn from_config(config: &LLMConfig) -> Self {
        Self::new(config.vllm.clone(), config.temperature, config.max_tokens)
    }

    fn ensure_server_mode(&self) -> Result<()> {
        if self.settings.use_server {
            Ok(())
        } else {
            Err(AppError::DependencyMissing(
                "The in-process vLLM engine is not available in this build. Start a vLLM server (vllm serve <model>) and set vllm.use_server = true.".to_string(),
            ))
        }
    }

    async fn send(&self, prompt: &str, system: Option<&str>, stream: bool) -> Result<reqwest::Response> {
        self.ensure_server_mode()?;

        let prompt = match system.filter(|s| !s.is_empty()) {
            Some(system) => format!("{}\n\n{}", system, prompt),
            None => prompt.to_string(),
        };
        let body = CompletionRequest {
            model: &self.settings.model,
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: TOP_P,
            stream,
        };

        let response = self
            .client
            .post(endpoint(&self.settings.server_url, "v1/completions"))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("vLLM server", self.settings.timeout_secs, e))?;

        ensure_success(PROVIDER, AUTH_HINT, response).await
    }

    async fn served_models(&self) -> Result<Vec<String>> {
        let response = probe_client()
            .get(endpoint(&self.settings.server_url, "v1/models"))
            .send()
            .await
            .map_err(|e| transport_error("vLLM server", PROBE_TIMEOUT_SECS, e))?;
        let response = ensure_success(PROVIDER, AUTH_HINT, response).await?;
        let json = read_json(PROVIDER, response).await?;

        Ok(json["data"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m["id"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn text_stream(response: reqwest::Response) -> impl Stream<Item = Result<String>> + Send {
    async_stream::try_stream! {
        let mut events = Box::pin(stream::sse_events(response, PROVIDER));
        while let Some(event) = events.next().await {
            let event = event?;
            if let Some(text) = event["choices"][0]["text"].as_str() {
                if !text.is_empty() {
                    yield text.to_string();
                }
            }
        }
    }
}

#[async_trait]
impl LLMClient for VllmClient {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let response = self.send(prompt, system, false).await?;
        let json = read_json(PROVIDER, response).await?;
        Ok(json["choices"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn generate_stream(&self, prompt: &str, system: Option<&str>) -> Result<TextStream> {
        let response = self.send(prompt, system, true).await?;
        Ok(Box::pin(text_stream(response)))
    }

    async fn is_available(&self) -> bool {
        if !self.settings.use_server {
            return false;
        }
        match probe_client()
            .get(endpoint(&self.settings.server_url, "v1/models"))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "vLLM server unreachable");
                false
            }
        }
    }

    async fn get_models(&self) -> Vec<String> {
        if !self.settings.use_server {
            return static_models(VLLM_MODELS);
        }
        self.served_models().await.unwrap_or_else(|e| {
            debug!(error = %e, "Could not list vLLM models");
            Vec::new()
        })
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}
