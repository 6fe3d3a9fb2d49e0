//! Auditor Configuration
//!
//! TOML configuration with two sections:
//!
//! ```toml
//! [llm]
//! provider = "ollama"          # ollama | openai_compatible | none
//! model = "qwen2.5:14b"
//! base_url = "http://localhost:11434"
//! temperature = 0.7
//! max_tokens = 4000
//! top_p = 0.95
//! timeout_secs = 300
//!
//! [audit]
//! max_rounds = 27
//! min_confidence = 0.87
//! use_rules = true
//! ```

use std::fs;
use std::path::Path;

use contract_auditor_llm::{GenerationOptions, ProviderConfig, ProviderType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::default_config_path;

/// Environment variable that overrides `llm.api_key`.
pub const API_KEY_ENV: &str = "CONTRACT_AUDITOR_API_KEY";

/// Which reasoning backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Ollama,
    OpenAiCompatible,
    /// Heuristic reasoning only
    None,
}

/// `[llm]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub provider: BackendKind,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "qwen2.5:14b".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_top_p() -> f32 {
    0.95
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: BackendKind::default(),
            model: default_model(),
            base_url: None,
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmSettings {
    /// Provider configuration, or `None` when the heuristic reasoner is selected.
    pub fn provider_config(&self) -> Option<ProviderConfig> {
        let provider = match self.provider {
            BackendKind::Ollama => ProviderType::Ollama,
            BackendKind::OpenAiCompatible => ProviderType::OpenAiCompatible,
            BackendKind::None => return None,
        };
        Some(ProviderConfig {
            provider,
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            timeout_secs: self.timeout_secs,
        })
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
        }
    }
}

/// `[audit]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Requested round count; clamped into the supported window by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Merge rule-based findings when a rules file is supplied.
    #[serde(default = "default_use_rules")]
    pub use_rules: bool,
}

fn default_min_confidence() -> f64 {
    0.87
}

fn default_use_rules() -> bool {
    true
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            max_rounds: None,
            min_confidence: default_min_confidence(),
            use_rules: default_use_rules(),
        }
    }
}

/// Complete auditor configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditorConfig {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub audit: AuditSettings,
}

impl AuditorConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist and parse. Without one, the default path
    /// under the user config directory is used when present, otherwise
    /// defaults. The API key environment variable is applied last.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => match default_config_path() {
                Ok(default_path) if default_path.exists() => Self::load_from_file(&default_path)?,
                _ => {
                    debug!("[Config] no config file found, using defaults");
                    Self::default()
                }
            },
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.llm.api_key = Some(key);
            }
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| AppError::config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "[Config] loaded configuration");
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: AuditorConfig =
            toml::from_str(content).map_err(|e| AppError::config(e.to_string()))?;
        config.validate().map_err(AppError::config)?;
        Ok(config)
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.audit.min_confidence) {
            return Err(format!(
                "audit.min_confidence must be within [0, 1], got {}",
                self.audit.min_confidence
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(format!(
                "llm.temperature must be within [0, 2], got {}",
                self.llm.temperature
            ));
        }

        if !(0.0..=1.0).contains(&self.llm.top_p) {
            return Err(format!("llm.top_p must be within [0, 1], got {}", self.llm.top_p));
        }

        if self.llm.timeout_secs == 0 {
            return Err("llm.timeout_secs must be at least 1".to_string());
        }

        if self.llm.provider != BackendKind::None && self.llm.model.trim().is_empty() {
            return Err("llm.model must not be empty".to_string());
        }

        Ok(())
    }
}
