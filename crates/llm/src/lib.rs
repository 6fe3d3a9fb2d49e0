//! Contract Auditor LLM
//!
//! Unified interface for the text-generation backends the auditor can reason
//! with:
//! - Ollama (local inference via `ollama-rs`)
//! - Any OpenAI chat-completions compatible endpoint
//!
//! Also includes the HTTP client factory and helpers for pulling JSON out of
//! free-form model output.

pub mod http_client;
pub mod json_extract;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod types;

// Re-export main types
pub use http_client::build_http_client;
pub use json_extract::extract_json;
pub use ollama::OllamaProvider;
pub use openai::OpenAiCompatibleProvider;
pub use provider::{create_provider, LlmProvider};
pub use types::*;
