//! Reason Stage
//!
//! A [`Reasoner`] turns the current loop state into a [`Proposal`]: what to
//! suspect, where, and how confident it is. Two implementations exist:
//!
//! - [`BackendReasoner`]: prompts a generation backend and parses its JSON answer
//! - [`HeuristicReasoner`]: deterministic round-robin over the taxonomy
//!
//! The round controller only sees the trait. When the backend variant fails,
//! the controller asks the heuristic variant instead.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use contract_auditor_core::{Category, Exploitability, Severity};
use contract_auditor_llm::{extract_json, GenerationOptions, LlmError, LlmProvider, UsageStats};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::prompt::build_prompt;
use super::state::LoopState;

/// Why a reasoner could not produce a proposal.
#[derive(Debug, Error)]
pub enum ReasonError {
    #[error("backend call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("backend error: {0}")]
    Backend(#[from] LlmError),

    #[error("malformed proposal: {0}")]
    Malformed(String),
}

/// A reasoner's suggestion for the current round.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Proposal {
    pub reasoning: String,
    pub action: String,
    pub target: Option<String>,
    /// Category label exactly as proposed; resolved by the act stage.
    pub category: Option<String>,
    pub severity: Option<Severity>,
    pub exploitability: Option<Exploitability>,
    /// Self-reported confidence in [0, 1].
    pub confidence: f64,
    pub evidence_needed: Option<String>,
    pub proposed_fix: Option<String>,
}

impl Proposal {
    /// Build a proposal from a backend's JSON answer.
    ///
    /// Every field is optional. Confidence may be a number or a numeric
    /// string and is clamped to [0, 1]. Unrecognized severity or
    /// exploitability labels are dropped so taxonomy defaults apply.
    pub fn from_value(value: Value) -> Result<Self, ReasonError> {
        if !value.is_object() {
            return Err(ReasonError::Malformed(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }
        let raw: RawProposal =
            serde_json::from_value(value).map_err(|e| ReasonError::Malformed(e.to_string()))?;

        let confidence = match raw.confidence {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        };
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let evidence_needed = match raw.evidence_needed {
            Some(Value::Array(items)) => {
                let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
                (!parts.is_empty()).then(|| parts.join("; "))
            }
            Some(other) => scalar_text(&other),
            None => None,
        };

        Ok(Self {
            reasoning: raw.reasoning.unwrap_or_default(),
            action: raw.action.unwrap_or_default(),
            target: raw.target,
            category: raw.category,
            severity: raw.severity.as_deref().and_then(Severity::from_label),
            exploitability: raw
                .exploitability
                .as_deref()
                .and_then(Exploitability::from_label),
            confidence,
            evidence_needed,
            proposed_fix: raw.proposed_fix,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProposal {
    #[serde(alias = "thought", deserialize_with = "lenient_text")]
    reasoning: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    action: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    target: Option<String>,
    #[serde(alias = "vulnerability_type", deserialize_with = "lenient_text")]
    category: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    severity: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    exploitability: Option<String>,
    confidence: Option<Value>,
    #[serde(alias = "evidenceNeeded")]
    evidence_needed: Option<Value>,
    #[serde(alias = "proposedFix", deserialize_with = "lenient_text")]
    proposed_fix: Option<String>,
}

/// Scalars become text; blanks, nulls and containers become `None`.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(scalar_text))
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Produces one proposal per round.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Short identifier used in logs and report metadata.
    fn name(&self) -> &'static str;

    async fn propose(&self, state: &LoopState<'_>) -> Result<Proposal, ReasonError>;

    /// Tokens consumed so far.
    fn usage(&self) -> UsageStats {
        UsageStats::default()
    }
}

/// Deterministic reasoner that cycles through the taxonomy.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicReasoner;

impl HeuristicReasoner {
    /// Confidence ramps by 0.01 per round from 0.6, capped at 0.9.
    pub fn confidence_for(round: u32) -> f64 {
        (0.6 + 0.01 * round as f64).min(0.9)
    }

    pub fn proposal_for(round: u32) -> Proposal {
        let category = Category::for_round(round);
        let defaults = category.defaults();
        Proposal {
            reasoning: format!("Round {} fallback reasoning for {}", round, category),
            action: category.heuristic_action().to_string(),
            target: None,
            category: Some(category.as_str().to_string()),
            severity: Some(defaults.severity),
            exploitability: Some(defaults.exploitability),
            confidence: Self::confidence_for(round),
            evidence_needed: Some(
                "Identify concrete source lines supporting the suspicion".to_string(),
            ),
            proposed_fix: Some("Introduce strict role checks or guards where missing.".to_string()),
        }
    }
}

#[async_trait]
impl Reasoner for HeuristicReasoner {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn propose(&self, state: &LoopState<'_>) -> Result<Proposal, ReasonError> {
        Ok(Self::proposal_for(state.round()))
    }
}

/// Reasoner backed by a text-generation provider.
pub struct BackendReasoner {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
    timeout: Duration,
    input_tokens: AtomicU32,
    output_tokens: AtomicU32,
}

impl BackendReasoner {
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions, timeout: Duration) -> Self {
        Self {
            provider,
            options,
            timeout,
            input_tokens: AtomicU32::new(0),
            output_tokens: AtomicU32::new(0),
        }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }
}

#[async_trait]
impl Reasoner for BackendReasoner {
    fn name(&self) -> &'static str {
        self.provider.name()
    }

    async fn propose(&self, state: &LoopState<'_>) -> Result<Proposal, ReasonError> {
        let prompt = build_prompt(state);

        let response = tokio::time::timeout(self.timeout, self.provider.generate(&prompt, &self.options))
            .await
            .map_err(|_| ReasonError::Timeout {
                seconds: self.timeout.as_secs(),
            })??;

        self.input_tokens
            .fetch_add(response.usage.input_tokens, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(response.usage.output_tokens, Ordering::Relaxed);

        let text = response.text()?;
        debug!(
            round = state.round(),
            preview = %text.chars().take(200).collect::<String>(),
            "[Reason] backend response"
        );

        Proposal::from_value(extract_json(text)?)
    }

    fn usage(&self) -> UsageStats {
        UsageStats {
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
        }
    }
}
