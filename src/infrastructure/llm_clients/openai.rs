use super::chat_completions::{ChatCompletionsApi, Vendor};
use super::{LLMClient, TextStream};
use crate::domain::error::Result;
use crate::domain::llm_config::{HostedApiSettings, LLMConfig, OPENAI_MODELS};
use async_trait::async_trait;

const VENDOR: Vendor = Vendor {
    name: "OpenAI",
    env_var: "OPENAI_API_KEY",
    auth_hint: "Check OPENAI_API_KEY at https://platform.openai.com/api-keys.",
    models: OPENAI_MODELS,
};

pub struct OpenAIClient {
    api: ChatCompletionsApi,
}

impl OpenAIClient {
    pub fn new(settings: HostedApiSettings, temperature: f32, max_tokens: u32) -> Self {
        Self {
            api: ChatCompletionsApi::new(VENDOR, settings, temperature, max_tokens),
        }
    }

    pub fn from_config(config: &LLMConfig) -> Self {
        Self::new(config.openai.clone(), config.temperature, config.max_tokens)
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        self.api.generate(prompt, system).await
    }

    async fn generate_stream(&self, prompt: &str, system: Option<&str>) -> Result<TextStream> {
        self.api.generate_stream(prompt, system).await
    }

    async fn is_available(&self) -> bool {
        self.api.is_available().await
    }

    async fn get_models(&self) -> Vec<String> {
        self.api.models()
    }

    fn model_name(&self) -> &str {
        self.api.model()
    }
}
