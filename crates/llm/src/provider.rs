//! LLM Provider Trait
//!
//! Defines the common interface for all text-generation backends.

use std::sync::Arc;

use async_trait::async_trait;

use super::ollama::OllamaProvider;
use super::openai::OpenAiCompatibleProvider;
use super::types::{
    GenerationOptions, LlmError, LlmResponse, LlmResult, ProviderConfig, ProviderType,
};

/// Trait that all generation backends must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;

    /// Generate a completion for a single prompt.
    async fn generate(&self, prompt: &str, options: &GenerationOptions)
        -> LlmResult<LlmResponse>;

    /// Check if the provider is reachable.
    ///
    /// Providers without a cheap health check report healthy.
    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}

/// Build the provider selected by `config.provider`.
pub fn create_provider(config: ProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderType::Ollama => Arc::new(OllamaProvider::new(config)?),
        ProviderType::OpenAiCompatible => Arc::new(OpenAiCompatibleProvider::new(config)?),
    };
    Ok(provider)
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        408 | 504 => LlmError::NetworkError {
            message: format!("{}: upstream timeout: {}", provider, body),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}
