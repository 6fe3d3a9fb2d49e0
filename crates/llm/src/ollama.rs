//! Ollama Provider
//!
//! Local model backend built on the `ollama-rs` SDK.

use std::time::Duration;

use async_trait::async_trait;
use ollama_rs::error::OllamaError;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::chat::{ChatMessage, ChatMessageResponse};
use ollama_rs::models::ModelOptions;
use ollama_rs::Ollama;
use tracing::debug;

use super::http_client::build_http_client;
use super::provider::LlmProvider;
use super::types::{
    GenerationOptions, LlmError, LlmResponse, LlmResult, ProviderConfig, StopReason, UsageStats,
};

/// Default Ollama API endpoint
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Ollama provider
pub struct OllamaProvider {
    config: ProviderConfig,
    client: Ollama,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(OLLAMA_DEFAULT_URL);
        let http_client = build_http_client(Duration::from_secs(config.timeout_secs))?;
        let client = Self::create_client(base_url, http_client)?;

        Ok(Self { config, client })
    }

    /// Create an Ollama SDK client from a base URL string.
    ///
    /// `Ollama::new_with_client` takes host and port separately.
    fn create_client(base_url: &str, http_client: reqwest::Client) -> LlmResult<Ollama> {
        let parsed = url::Url::parse(base_url).map_err(|e| LlmError::InvalidRequest {
            message: format!("invalid Ollama base URL '{}': {}", base_url, e),
        })?;
        let host = parsed.host_str().unwrap_or("localhost");
        let port = parsed.port().unwrap_or(11434);
        let host_url = format!("{}://{}", parsed.scheme(), host);

        Ok(Ollama::new_with_client(host_url, port, http_client))
    }

    /// Get the base URL for the Ollama server (used in error messages)
    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(OLLAMA_DEFAULT_URL)
    }

    fn build_request(&self, prompt: &str, options: &GenerationOptions) -> ChatMessageRequest {
        let mut opts = ModelOptions::default()
            .temperature(options.temperature)
            .top_p(options.top_p);
        if options.max_tokens > 0 {
            opts = opts.num_predict(options.max_tokens as i32);
        }

        ChatMessageRequest::new(
            self.config.model.clone(),
            vec![ChatMessage::user(prompt.to_string())],
        )
        .options(opts)
    }

    fn convert_response(response: &ChatMessageResponse) -> LlmResponse {
        let text = response.message.content.clone();
        let content = if text.is_empty() { None } else { Some(text) };

        let usage = if let Some(final_data) = &response.final_data {
            UsageStats {
                input_tokens: final_data.prompt_eval_count as u32,
                output_tokens: final_data.eval_count as u32,
            }
        } else {
            UsageStats::default()
        };

        LlmResponse {
            content,
            stop_reason: StopReason::EndTurn,
            usage,
            model: response.model.clone(),
        }
    }

    fn map_error(&self, err: OllamaError) -> LlmError {
        let msg = err.to_string();
        if msg.contains("connect") || msg.contains("Connection refused") {
            LlmError::ProviderUnavailable {
                message: format!("Cannot connect to Ollama at {}: {}", self.base_url(), msg),
            }
        } else if msg.contains("timed out") || msg.contains("timeout") {
            LlmError::Timeout {
                seconds: self.config.timeout_secs,
            }
        } else if msg.contains("not found") || msg.contains("404") {
            LlmError::ModelNotFound {
                model: self.config.model.clone(),
            }
        } else {
            LlmError::NetworkError { message: msg }
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> LlmResult<LlmResponse> {
        debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "[Ollama] sending generation request"
        );
        let request = self.build_request(prompt, options);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| self.map_error(e))?;

        Ok(Self::convert_response(&response))
    }

    async fn health_check(&self) -> LlmResult<()> {
        self.client
            .list_local_models()
            .await
            .map_err(|e| self.map_error(e))?;

        Ok(())
    }
}
