use super::{
    AnthropicClient, GroqClient, HuggingFaceClient, LLMClient, OllamaClient, OpenAIClient,
    TextStream, VllmClient,
};
use crate::domain::error::Result;
use crate::domain::llm_config::{LLMConfig, LLMProvider};
use async_trait::async_trait;
use tracing::info;

/// One variant per supported backend, chosen from `LLMConfig::provider`.
pub enum LlmAdapter {
    Ollama(OllamaClient),
    HuggingFace(HuggingFaceClient),
    OpenAI(OpenAIClient),
    Groq(GroqClient),
    Anthropic(AnthropicClient),
    Vllm(VllmClient),
}

impl LlmAdapter {
    pub fn from_config(config: &LLMConfig) -> Self {
        match config.provider {
            LLMProvider::Ollama => Self::Ollama(OllamaClient::from_config(config)),
            LLMProvider::HuggingFace => Self::HuggingFace(HuggingFaceClient::from_config(config)),
            LLMProvider::OpenAI => Self::OpenAI(OpenAIClient::from_config(config)),
            LLMProvider::Groq => Self::Groq(GroqClient::from_config(config)),
            LLMProvider::Anthropic => Self::Anthropic(AnthropicClient::from_config(config)),
            LLMProvider::Vllm => Self::Vllm(VllmClient::from_config(config)),
        }
    }

    pub fn provider(&self) -> LLMProvider {
        match self {
            Self::Ollama(_) => LLMProvider::Ollama,
            Self::HuggingFace(_) => LLMProvider::HuggingFace,
            Self::OpenAI(_) => LLMProvider::OpenAI,
            Self::Groq(_) => LLMProvider::Groq,
            Self::Anthropic(_) => LLMProvider::Anthropic,
            Self::Vllm(_) => LLMProvider::Vllm,
        }
    }

    fn client(&self) -> &dyn LLMClient {
        match self {
            Self::Ollama(client) => client,
            Self::HuggingFace(client) => client,
            Self::OpenAI(client) => client,
            Self::Groq(client) => client,
            Self::Anthropic(client) => client,
            Self::Vllm(client) => client,
        }
    }
}

/// Provider-agnostic entry point used by the generation pipeline.
pub struct LlmService {
    config: LLMConfig,
    adapter: LlmAdapter,
}

impl LlmService {
    pub fn new(config: LLMConfig) -> Self {
        let adapter = LlmAdapter::from_config(&config);
        Self { config, adapter }
    }

    /// Service for automation-script stages.
    ///
    /// With Ollama and `use_code_model_for_scripts`, binds to `ollama.code_model`
    /// when that model is installed. Anything else, including a failed probe,
    /// yields the default service.
    pub async fn code_service(config: &LLMConfig) -> Self {
        if config.provider == LLMProvider::Ollama && config.ollama.use_code_model_for_scripts {
            let code_client =
                OllamaClient::from_config(config).with_model(config.ollama.code_model.clone());

            if code_client.is_available().await {
                info!(model = %config.ollama.code_model, "Using code model for script generation");
                return Self {
                    config: config.clone(),
                    adapter: LlmAdapter::Ollama(code_client),
                };
            }

            info!(
                code_model = %config.ollama.code_model,
                fallback = %config.ollama.model,
                "Code model not available, using default model for scripts"
            );
        }

        Self::new(config.clone())
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }

    pub fn provider(&self) -> LLMProvider {
        self.adapter.provider()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider().as_str()
    }

    pub fn adapter(&self) -> &LlmAdapter {
        &self.adapter
    }

    /// Rebuilds the adapter from a freshly loaded configuration.
    pub fn refresh(&mut self, config: LLMConfig) {
        info!(from = %self.config.provider, to = %config.provider, "Refreshing LLM service");
        self.adapter = LlmAdapter::from_config(&config);
        self.config = config;
    }
}

#[async_trait]
impl LLMClient for LlmService {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        self.adapter.client().generate(prompt, system).await
    }

    async fn generate_stream(&self, prompt: &str, system: Option<&str>) -> Result<TextStream> {
        self.adapter.client().generate_stream(prompt, system).await
    }

    async fn is_available(&self) -> bool {
        self.adapter.client().is_available().await
    }

    async fn get_models(&self) -> Vec<String> {
        self.adapter.client().get_models().await
    }

    fn model_name(&self) -> &str {
        self.adapter.client().model_name()
    }
}
