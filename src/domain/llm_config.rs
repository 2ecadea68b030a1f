use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

pub const OPENAI_MODELS: &[&str] = &["gpt-4", "gpt-4-turbo", "gpt-4o", "gpt-4o-mini", "gpt-3.5-turbo"];

pub const GROQ_MODELS: &[&str] = &[
    "llama-3.1-70b-versatile",
    "llama-3.1-8b-instant",
    "llama-3.2-90b-text-preview",
    "mixtral-8x7b-32768",
    "gemma2-9b-it",
];

pub const ANTHROPIC_MODELS: &[&str] = &[
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
    "claude-3-5-sonnet-20241022",
];

pub const HUGGINGFACE_MODELS: &[&str] = &[
    "meta-llama/Llama-3.1-8B-Instruct",
    "meta-llama/Llama-3.3-70B-Instruct",
    "Qwen/Qwen2.5-7B-Instruct",
    "Qwen/Qwen2.5-Coder-32B-Instruct",
    "mistralai/Mistral-7B-Instruct-v0.2",
    "deepseek-ai/DeepSeek-R1-Distill-Qwen-7B",
    "HuggingFaceTB/SmolLM3-3B",
    "meta-llama/Llama-3.2-3B-Instruct",
];

pub const VLLM_MODELS: &[&str] = &[
    "meta-llama/Llama-3.1-8B-Instruct",
    "meta-llama/Llama-3.1-70B-Instruct",
    "meta-llama/Llama-3.3-70B-Instruct",
    "Qwen/Qwen2.5-7B-Instruct",
    "Qwen/Qwen2.5-14B-Instruct",
    "Qwen/Qwen2.5-32B-Instruct",
    "Qwen/Qwen2.5-Coder-7B-Instruct",
    "mistralai/Mistral-7B-Instruct-v0.3",
    "mistralai/Mixtral-8x7B-Instruct-v0.1",
    "deepseek-ai/DeepSeek-R1-Distill-Qwen-7B",
];

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    #[default]
    Ollama,
    HuggingFace,
    OpenAI,
    Groq,
    Anthropic,
    Vllm,
}

impl LLMProvider {
    pub const ALL: [LLMProvider; 6] = [
        LLMProvider::Ollama,
        LLMProvider::HuggingFace,
        LLMProvider::OpenAI,
        LLMProvider::Groq,
        LLMProvider::Anthropic,
        LLMProvider::Vllm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::HuggingFace => "huggingface",
            Self::OpenAI => "openai",
            Self::Groq => "groq",
            Self::Anthropic => "anthropic",
            Self::Vllm => "vllm",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ollama => "Ollama (Local)",
            Self::HuggingFace => "Hugging Face",
            Self::OpenAI => "OpenAI",
            Self::Groq => "Groq",
            Self::Anthropic => "Anthropic",
            Self::Vllm => "vLLM (High-Performance Local)",
        }
    }
}

impl fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "openai" => Ok(Self::OpenAI),
            "groq" => Ok(Self::Groq),
            "anthropic" => Ok(Self::Anthropic),
            "vllm" => Ok(Self::Vllm),
            other => Err(format!("Unknown LLM provider: {}", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(default)]
pub struct OllamaSettings {
    #[validate(url)]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub model: String,
    /// Model used for automation-script stages when `use_code_model_for_scripts` is set.
    #[validate(length(min = 1))]
    pub code_model: String,
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
    pub use_code_model_for_scripts: bool,
    pub num_ctx: u32,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b".to_string(),
            code_model: "codellama:7b".to_string(),
            timeout_secs: 600,
            use_code_model_for_scripts: true,
            num_ctx: 4096,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(default)]
pub struct HuggingFaceSettings {
    #[validate(length(min = 1))]
    pub model_id: String,
    pub use_api: bool,
    #[validate(url)]
    pub router_url: String,
    #[validate(url)]
    pub hub_url: String,
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
    /// Read from `HF_API_TOKEN` only.
    #[serde(skip)]
    pub api_token: Option<String>,
}

impl Default for HuggingFaceSettings {
    fn default() -> Self {
        Self {
            model_id: "meta-llama/Llama-3.1-8B-Instruct".to_string(),
            use_api: true,
            router_url: "https://router.huggingface.co".to_string(),
            hub_url: "https://huggingface.co".to_string(),
            timeout_secs: 180,
            api_token: None,
        }
    }
}

/// Settings shared by the hosted single-vendor APIs (OpenAI, Groq, Anthropic).
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(default)]
pub struct HostedApiSettings {
    #[validate(url)]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub model: String,
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
    /// Read from the vendor's environment variable only.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl HostedApiSettings {
    fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            model: model.to_string(),
            timeout_secs: 180,
            api_key: None,
        }
    }

    pub fn openai() -> Self {
        Self::new("https://api.openai.com/v1", "gpt-4")
    }

    pub fn groq() -> Self {
        Self::new("https://api.groq.com/openai/v1", "llama-3.1-70b-versatile")
    }

    pub fn anthropic() -> Self {
        Self::new("https://api.anthropic.com", "claude-3-sonnet-20240229")
    }
}

impl Default for HostedApiSettings {
    fn default() -> Self {
        Self::openai()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(default)]
pub struct VllmSettings {
    #[validate(length(min = 1))]
    pub model: String,
    /// Talk to an OpenAI-compatible vLLM server instead of an in-process engine.
    pub use_server: bool,
    #[validate(url)]
    pub server_url: String,
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for VllmSettings {
    fn default() -> Self {
        Self {
            model: "meta-llama/Llama-3.1-8B-Instruct".to_string(),
            use_server: false,
            server_url: "http://localhost:8000".to_string(),
            timeout_secs: 600,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(default)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    #[validate(nested)]
    pub ollama: OllamaSettings,
    #[validate(nested)]
    pub huggingface: HuggingFaceSettings,
    #[validate(nested)]
    pub openai: HostedApiSettings,
    #[validate(nested)]
    pub groq: HostedApiSettings,
    #[validate(nested)]
    pub anthropic: HostedApiSettings,
    #[validate(nested)]
    pub vllm: VllmSettings,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Ollama,
            ollama: OllamaSettings::default(),
            huggingface: HuggingFaceSettings::default(),
            openai: HostedApiSettings::openai(),
            groq: HostedApiSettings::groq(),
            anthropic: HostedApiSettings::anthropic(),
            vllm: VllmSettings::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl LLMConfig {
    /// Model identifier of the active provider.
    pub fn active_model(&self) -> &str {
        match self.provider {
            LLMProvider::Ollama => &self.ollama.model,
            LLMProvider::HuggingFace => &self.huggingface.model_id,
            LLMProvider::OpenAI => &self.openai.model,
            LLMProvider::Groq => &self.groq.model,
            LLMProvider::Anthropic => &self.anthropic.model,
            LLMProvider::Vllm => &self.vllm.model,
        }
    }

    pub fn with_provider(mut self, provider: LLMProvider) -> Self {
        self.provider = provider;
        self
    }
}
