use super::chat_completions::{ChatCompletionsApi, Vendor};
use super::{LLMClient, TextStream};
use crate::domain::error::Result;
use crate::domain::llm_config::{HostedApiSettings, LLMConfig, GROQ_MODELS};
use async_trait::async_trait;

const VENDOR: Vendor = Vendor {
    name: "Groq",
    env_var: "GROQ_API_KEY",
    auth_hint: "Check GROQ_API_KEY at https://console.groq.com/keys.",
    models: GROQ_MODELS,
};

/// Groq serves the OpenAI chat-completions protocol under `/openai/v1`.
pub struct GroqClient {
    api: ChatCompletionsApi,
}

impl GroqClient {
    pub fn new(settings: HostedApiSettings, temperature: f32, max_tokens: u32) -> Self {
        Self {
            api: ChatCompletionsApi::new(VENDOR, settings, temperature, max_tokens),
        }
    }

    pub fn from_config(config: &LLMConfig) -> Self {
        Self::new(config.groq.clone(), config.temperature, config.max_tokens)
    }
}

#[async_trait]
impl LLMClient for GroqClient {
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
