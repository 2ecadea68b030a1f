use crate::domain::error::{AppError, Result};
use crate::domain::generation::GenerationOptions;
use crate::domain::llm_config::LLMConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use validator::Validate;

pub const ENV_PREFIX: &str = "SMARTEST_";
pub const DEFAULT_CONFIG_FILE: &str = "smartest.toml";

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const HF_API_TOKEN_ENV: &str = "HF_API_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppSettings {
    #[validate(nested)]
    pub llm: LLMConfig,
    pub generation: GenerationOptions,
}

/// Layered settings: defaults, then a TOML file, then `SMARTEST_*` variables
/// (`__` separates nested keys, e.g. `SMARTEST_LLM__OLLAMA__MODEL`).
///
/// API keys never come from the file; they are read from the vendor variables.
pub struct ConfigService {
    path: Option<PathBuf>,
}

impl ConfigService {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    fn config_file(&self) -> Result<Option<PathBuf>> {
        match &self.path {
            Some(path) if path.is_file() => Ok(Some(path.clone())),
            Some(path) => Err(AppError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            ))),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                Ok(default.is_file().then(|| default.to_path_buf()))
            }
        }
    }

    pub fn load(&self) -> Result<AppSettings> {
        let mut figment = Figment::from(Serialized::defaults(AppSettings::default()));

        if let Some(file) = self.config_file()? {
            debug!(path = %file.display(), "Merging settings file");
            figment = figment.merge(Toml::file(file));
        }

        let mut settings: AppSettings = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        apply_secrets(&mut settings.llm, |name| std::env::var(name).ok());

        settings
            .validate()
            .map_err(|e| AppError::ConfigError(format!("Invalid settings: {}", e)))?;

        info!(
            provider = %settings.llm.provider,
            model = %settings.llm.active_model(),
            "Settings loaded"
        );
        Ok(settings)
    }

    /// Re-reads every source. Callers rebuild their services from the result.
    pub fn reload(&self) -> Result<AppSettings> {
        self.load()
    }
}

/// Fills API keys from the environment. Blank values count as absent.
pub fn apply_secrets(config: &mut LLMConfig, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    config.openai.api_key = read(OPENAI_API_KEY_ENV);
    config.groq.api_key = read(GROQ_API_KEY_ENV);
    config.anthropic.api_key = read(ANTHROPIC_API_KEY_ENV);
    config.huggingface.api_token = read(HF_API_TOKEN_ENV);
}
