//! Source Outline
//!
//! Line-agnostic regex outline of Solidity source: declared contracts, their
//! base contracts, functions and modifiers. Good enough to summarize an
//! artifact for the reasoner; not a parser.

use regex::Regex;

use contract_auditor_core::ContractRecord;

use crate::utils::error::{AppError, AppResult};

pub struct SourceOutliner {
    declaration: Regex,
    function: Regex,
    modifier: Regex,
}

impl SourceOutliner {
    pub fn new() -> AppResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| AppError::validation(format!("bad outline pattern: {}", e)))
        };
        Ok(Self {
            declaration: compile(
                r"\b(?:abstract\s+)?(?:contract|library|interface)\s+([A-Za-z_]\w*)(?:\s+is\s+([^{]+))?\s*\{",
            )?,
            function: compile(r"\b(?:function\s+([A-Za-z_]\w*)|(constructor|fallback|receive))\s*\(")?,
            modifier: compile(r"\bmodifier\s+([A-Za-z_]\w*)")?,
        })
    }

    /// Outline `source`; `name` is used when no contract is declared.
    pub fn outline(&self, name: &str, source: &str) -> ContractRecord {
        let mut declared = None;
        let mut inherits = Vec::new();
        for caps in self.declaration.captures_iter(source) {
            if declared.is_none() {
                declared = caps.get(1).map(|m| m.as_str().to_string());
            }
            if let Some(bases) = caps.get(2) {
                for base in base_names(bases.as_str()) {
                    push_unique(&mut inherits, &base);
                }
            }
        }

        let mut functions = Vec::new();
        for caps in self.function.captures_iter(source) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                push_unique(&mut functions, m.as_str());
            }
        }

        let mut modifiers = Vec::new();
        for caps in self.modifier.captures_iter(source) {
            if let Some(m) = caps.get(1) {
                push_unique(&mut modifiers, m.as_str());
            }
        }

        ContractRecord {
            name: declared.unwrap_or_else(|| name.to_string()),
            source_code: source.to_string(),
            functions,
            modifiers,
            inherits: (!inherits.is_empty()).then_some(inherits),
        }
    }
}

/// Split an `is A, B(x, y)` list at top-level commas, dropping constructor arguments.
fn base_names(list: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in list.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => names.push(std::mem::take(&mut current).trim().to_string()),
            _ if depth == 0 => current.push(c),
            _ => {}
        }
    }
    names.push(current.trim().to_string());
    names
}

fn push_unique(items: &mut Vec<String>, item: &str) {
    if !item.is_empty() && !items.iter().any(|existing| existing == item) {
        items.push(item.to_string());
    }
}
