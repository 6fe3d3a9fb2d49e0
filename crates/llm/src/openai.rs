//! OpenAI-Compatible Provider
//!
//! Talks to any endpoint that speaks the chat-completions protocol (OpenAI,
//! vLLM, LM Studio, a gateway in front of Ollama). Replies in Ollama's native
//! `/api/generate` shape are accepted too, since some gateways pass them
//! through unchanged.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::http_client::build_http_client;
use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{
    GenerationOptions, LlmError, LlmResponse, LlmResult, ProviderConfig, StopReason, UsageStats,
};

/// Default OpenAI API endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible provider
pub struct OpenAiCompatibleProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { config, client })
    }

    /// Get the API endpoint
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    /// The hosted OpenAI endpoint always needs a key; self-hosted ones may not.
    fn api_key(&self) -> LlmResult<Option<&str>> {
        match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(Some(key)),
            _ if self.base_url() == OPENAI_API_URL => {
                Err(missing_api_key_error("openai_compatible"))
            }
            _ => Ok(None),
        }
    }

    fn build_request_body(&self, prompt: &str, options: &GenerationOptions) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
            "top_p": options.top_p,
            "stream": false,
        })
    }

    fn parse_response(&self, body_text: &str) -> LlmResult<LlmResponse> {
        let parsed: CompletionResponse =
            serde_json::from_str(body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;
        let model = parsed
            .model
            .clone()
            .unwrap_or_else(|| self.config.model.clone());

        if let Some(choice) = parsed.choices.as_ref().and_then(|c| c.first()) {
            let usage = parsed
                .usage
                .map(|u| UsageStats {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                })
                .unwrap_or_default();
            let stop_reason = choice
                .finish_reason
                .as_deref()
                .map(StopReason::from)
                .unwrap_or(StopReason::EndTurn);

            return Ok(LlmResponse {
                content: choice.message.content.clone(),
                stop_reason,
                usage,
                model,
            });
        }

        if let Some(text) = parsed.response {
            return Ok(LlmResponse {
                content: Some(text),
                stop_reason: StopReason::EndTurn,
                usage: UsageStats {
                    input_tokens: parsed.prompt_eval_count.unwrap_or_default(),
                    output_tokens: parsed.eval_count.unwrap_or_default(),
                },
                model,
            });
        }

        Err(LlmError::ParseError {
            message: "unknown response format: expected 'choices' or 'response'".to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        "openai_compatible"
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
        let api_key = self.api_key()?;
        let body = self.build_request_body(prompt, options);
        debug!(
            url = %self.base_url(),
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "[OpenAiCompatible] sending generation request"
        );

        let mut request = self
            .client
            .post(self.base_url())
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout {
                    seconds: self.config.timeout_secs,
                }
            } else {
                LlmError::NetworkError {
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, "openai_compatible"));
        }

        self.parse_response(&body_text)
    }
}

/// Chat-completions reply, or Ollama's native generate reply.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    model: Option<String>,
    choices: Option<Vec<Choice>>,
    usage: Option<Usage>,
    response: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
