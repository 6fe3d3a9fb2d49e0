//! HTTP Client Factory
//!
//! Builds the reqwest client shared by the HTTP-based providers.

use std::time::Duration;

use crate::types::{LlmError, LlmResult};

/// Build a `reqwest::Client` with a fixed per-request timeout.
///
/// Environment proxies are ignored so a stray `HTTP_PROXY` cannot reroute
/// traffic meant for a local backend.
pub fn build_http_client(timeout: Duration) -> LlmResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .no_proxy()
        .build()
        .map_err(|e| LlmError::Other {
            message: format!("failed to build HTTP client: {}", e),
        })
}
