//! JSON Extraction
//!
//! Models wrap structured output in prose, markdown fences, or reasoning
//! blocks. These helpers dig the JSON value back out.

use serde_json::Value;

use crate::types::{LlmError, LlmResult};

/// Extract the first JSON value embedded in free-form model output.
///
/// Tried in order: the whole text, the first fenced code block, then the
/// span from the first `{` (or `[` when there is no `{`) to the last matching
/// closer.
pub fn extract_json(text: &str) -> LlmResult<Value> {
    let cleaned = strip_think_blocks(text);
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return Err(LlmError::ParseError {
            message: "model returned empty output".to_string(),
        });
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    if let Some(fenced) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(fenced) {
            return Ok(value);
        }
    }

    if let Some(span) = bracketed_span(trimmed) {
        return serde_json::from_str(span).map_err(|e| LlmError::ParseError {
            message: format!("embedded JSON is malformed: {}", e),
        });
    }

    Err(LlmError::ParseError {
        message: format!(
            "no JSON found in model output (starts with: {:?})",
            trimmed.chars().take(100).collect::<String>()
        ),
    })
}

/// Remove `<think>...</think>` reasoning blocks emitted by r1-style models.
fn strip_think_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Content of the first ``` fence, skipping a language tag such as `json`.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let content = match after_fence.find('\n') {
        Some(nl) if after_fence[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            &after_fence[nl + 1..]
        }
        _ => after_fence,
    };
    let end = content.find("```").unwrap_or(content.len());
    Some(content[..end].trim())
}

fn bracketed_span(text: &str) -> Option<&str> {
    let (start, close) = match text.find('{') {
        Some(idx) => (idx, '}'),
        None => (text.find('[')?, ']'),
    };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}
