//! Scripted provider for driving the loop without a live backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use contract_auditor_llm::{
    GenerationOptions, LlmError, LlmProvider, LlmResponse, LlmResult, ProviderConfig, StopReason,
    UsageStats,
};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(LlmError),
    Hang,
}

impl Reply {
    pub fn json(value: serde_json::Value) -> Self {
        Reply::Text(value.to_string())
    }
}

/// Replays `script` in order, then repeats `fallback` forever.
pub struct ScriptedProvider {
    config: ProviderConfig,
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    healthy: bool,
    calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            config: ProviderConfig {
                model: "scripted".to_string(),
                ..Default::default()
            },
            script: Mutex::new(script.into()),
            fallback,
            healthy: true,
            calls: AtomicU32::new(0),
        }
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> LlmResult<LlmResponse> {
        assert!(prompt.contains("Respond with this JSON structure"), "prompt missing output schema");
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Text(text) => Ok(LlmResponse {
                content: Some(text),
                stop_reason: StopReason::EndTurn,
                usage: UsageStats {
                    input_tokens: 10,
                    output_tokens: 5,
                },
                model: self.config.model.clone(),
            }),
            Reply::Fail(e) => Err(e),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(LlmError::Other {
                    message: "unreachable".to_string(),
                })
            }
        }
    }

    async fn health_check(&self) -> LlmResult<()> {
        if self.healthy {
            Ok(())
        } else {
            Err(LlmError::ProviderUnavailable {
                message: "connection refused".to_string(),
            })
        }
    }
}

/// A proposal no threshold will accept.
pub fn quiet_reply() -> Reply {
    Reply::json(serde_json::json!({
        "reasoning": "nothing notable",
        "action": "review naming",
        "category": "naming-issue",
        "confidence": 0.1
    }))
}
