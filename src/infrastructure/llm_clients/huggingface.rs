use super::chat_completions::{ChatRequest, ChatResponse};
use super::{chunked, endpoint, http_client, probe_client, static_models, LLMClient, TextStream};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{HuggingFaceSettings, LLMConfig, HUGGINGFACE_MODELS};
use crate::shared::truncate_chars;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

const TOKEN_SETTINGS_URL: &str = "https://huggingface.co/settings/tokens";

const POSSIBLE_FIXES: &str = "Possible fixes:\n  1. Verify your API token has 'Inference Providers' permission\n  2. Check model is available at: https://huggingface.co/models?inference_provider=all\n  3. Try a known working model: meta-llama/Llama-3.1-8B-Instruct or Qwen/Qwen2.5-7B-Instruct";

#[derive(Serialize)]
struct LegacyRequest {
    inputs: String,
    parameters: LegacyParameters,
}

#[derive(Serialize)]
struct LegacyParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

/// HuggingFace Inference Providers router.
///
/// Tries the OpenAI-compatible chat endpoint first and falls back to the
/// legacy text-generation endpoint. When both fail the error names both causes.
pub struct HuggingFaceClient {
    client: reqwest::Client,
    settings: HuggingFaceSettings,
    temperature: f32,
    max_tokens: u32,
}

/// Appends the router's `:fastest` policy unless a provider/policy suffix is already present.
pub(crate) fn routed_model_id(model_id: &str) -> String {
    if model_id.contains(':') {
        model_id.to_string()
    } else {
        format!("{}:fastest", model_id)
    }
}

fn error_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return truncate_chars(body, 200).to_string();
    };

    match &value["error"] {
        Value::String(message) => message.clone(),
        Value::Object(error) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value["error"].to_string()),
        Value::Null => truncate_chars(body, 200).to_string(),
        other => other.to_string(),
    }
}

impl HuggingFaceClient {
    pub fn new(settings: HuggingFaceSettings, temperature: f32, max_tokens: u32) -> Self {
        Self {
            client: http_client(settings.timeout_secs),
            settings,
            temperature,
            max_tokens,
        }
    }

    pub fn from_config(config: &LLMConfig) -> Self {
        Self::new(
            config.huggingface.clone(),
            config.temperature,
            config.max_tokens,
        )
    }

    fn token(&self) -> Result<&str> {
        match self.settings.api_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(AppError::AuthorizationFailure(format!(
                "HuggingFace API token is required. Get one at: {} (select 'Make calls to Inference Providers' permission) and set HF_API_TOKEN.",
                TOKEN_SETTINGS_URL
            ))),
        }
    }

    fn combined_failure(&self, chat_failure: &str, legacy_failure: &str) -> AppError {
        AppError::ConnectionFailure(format!(
            "HuggingFace API failed for model '{}'.\n  Chat Completions: {}\n  {}\n\n{}",
            self.settings.model_id, chat_failure, legacy_failure, POSSIBLE_FIXES
        ))
    }

    /// First attempt. Failures are returned as a description for the combined diagnostic.
    async fn try_chat(
        &self,
        token: &str,
        prompt: &str,
        system: Option<&str>,
    ) -> std::result::Result<String, String> {
        let body = ChatRequest::new(
            &routed_model_id(&self.settings.model_id),
            prompt,
            system,
            self.temperature,
            self.max_tokens,
        );

        let response = match self
            .client
            .post(endpoint(&self.settings.router_url, "v1/chat/completions"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(format!(
                    "Chat API request timed out ({}s). Try a smaller model.",
                    self.settings.timeout_secs
                ))
            }
            Err(e) if e.is_connect() => {
                return Err(format!("Cannot reach {}: {}", self.settings.router_url, e))
            }
            Err(e) => return Err(format!("Chat API error: {}", e)),
        };

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(format!(
                "Access Denied (403): Check your API token has 'Inference Providers' permission at {}",
                TOKEN_SETTINGS_URL
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Chat API ({}): {}", status.as_u16(), error_detail(&body)));
        }

        match response.json::<ChatResponse>().await {
            Ok(parsed) => match parsed.into_content() {
                Some(content) if !content.is_empty() => Ok(content),
                _ => Err("Chat API returned empty response".to_string()),
            },
            Err(e) => Err(format!("Chat API returned invalid JSON: {}", e)),
        }
    }

    async fn try_legacy(
        &self,
        token: &str,
        prompt: &str,
        system: Option<&str>,
        chat_failure: &str,
    ) -> Result<String> {
        let inputs = match system.filter(|s| !s.is_empty()) {
            Some(system) => format!("{}\n\n{}", system, prompt),
            None => prompt.to_string(),
        };
        let body = LegacyRequest {
            inputs,
            parameters: LegacyParameters {
                max_new_tokens: self.max_tokens,
                temperature: self.temperature,
                return_full_text: false,
            },
        };
        let url = endpoint(
            &self.settings.router_url,
            &format!("hf-inference/models/{}", self.settings.model_id),
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.combined_failure(chat_failure, &format!("Legacy API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(&response.text().await.unwrap_or_default());

            if status == reqwest::StatusCode::FORBIDDEN {
                return Err(AppError::AuthorizationFailure(format!(
                    "Access Denied (403) - HuggingFace API\n\nYour API token doesn't have the required permissions.\n\nFix this:\n  1. Go to: {}\n  2. Click 'New token'\n  3. Enable 'Make calls to Inference Providers'\n  4. Copy the token and set it as HF_API_TOKEN\n\nError details: {}",
                    TOKEN_SETTINGS_URL, detail
                )));
            }

            return Err(self.combined_failure(
                chat_failure,
                &format!("Legacy API ({}): {}", status.as_u16(), detail),
            ));
        }

        let value: Value = response.json().await.map_err(|e| {
            self.combined_failure(chat_failure, &format!("Legacy API returned invalid JSON: {}", e))
        })?;

        Ok(value[0]["generated_text"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl LLMClient for HuggingFaceClient {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        if !self.settings.use_api {
            return Err(AppError::DependencyMissing(
                "Local HuggingFace inference needs the transformers runtime, which is not available in this build. Set huggingface.use_api = true and provide HF_API_TOKEN.".to_string(),
            ));
        }

        let token = self.token()?;
        let chat_failure = match self.try_chat(token, prompt, system).await {
            Ok(content) => return Ok(content),
            Err(cause) => cause,
        };

        warn!(
            model = %self.settings.model_id,
            cause = %chat_failure,
            "HuggingFace chat completions failed, retrying with legacy endpoint"
        );
        self.try_legacy(token, prompt, system, &chat_failure).await
    }

    async fn generate_stream(&self, prompt: &str, system: Option<&str>) -> Result<TextStream> {
        let text = self.generate(prompt, system).await?;
        Ok(chunked(text))
    }

    async fn is_available(&self) -> bool {
        if !self.settings.use_api {
            return false;
        }
        let Ok(token) = self.token() else {
            return false;
        };

        let probe = probe_client();
        let hub_url = endpoint(
            &self.settings.hub_url,
            &format!("api/models/{}", self.settings.model_id),
        );
        match probe.get(&hub_url).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                debug!(status = %response.status(), "HuggingFace model lookup failed");
                return false;
            }
            Err(e) => {
                debug!(error = %e, "HuggingFace hub unreachable");
                return false;
            }
        }

        match probe
            .get(endpoint(&self.settings.router_url, "v1/models"))
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "HuggingFace router unreachable");
                false
            }
        }
    }

    async fn get_models(&self) -> Vec<String> {
        static_models(HUGGINGFACE_MODELS)
    }

    fn model_name(&self) -> &str {
        &self.settings.model_id
    }
}
