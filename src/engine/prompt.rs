//! Reasoning Prompt
//!
//! Builds the prompt sent to the generation backend each round. Every
//! context block is bounded so the prompt size stays flat over the loop.

use contract_auditor_core::{Corpus, Finding};

use super::state::{HistoryEntry, LoopState};

/// Artifacts summarized individually before the rest are collapsed.
const SUMMARY_ARTIFACT_LIMIT: usize = 3;

/// Findings echoed back to the reasoner.
const FINDING_SUMMARY_LIMIT: usize = 3;

const EMPTY_CONTRACTS: &str = "no parsed artifact data";
const EMPTY_HISTORY: &str = "no history yet, this is round 1.";
const EMPTY_FINDINGS: &str = "none";

const RESPONSE_SCHEMA: &str = r#"{
  "reasoning": "your analysis of the current evidence",
  "action": "next verification step, e.g. `trace transfer()`",
  "target": "function or variable under suspicion",
  "category": "one of access-control-bypass | reentrancy | precision-loss | admin-misuse | gas-inefficiency | naming-issue",
  "severity": "high | medium | low",
  "exploitability": "high | medium | low",
  "confidence": "number between 0 and 1",
  "evidence_needed": "evidence to confirm in the source",
  "proposed_fix": "suggested remediation"
}"#;

/// Render the full reasoning prompt for the current state.
pub fn build_prompt(state: &LoopState<'_>) -> String {
    let contracts = summarize_contracts(state.contracts());
    let history = format_history(state.history());
    let findings = format_findings(state.findings());

    format!(
        "You are a senior Web3 security auditor with deep knowledge of Solidity, DeFi attack paths \
and smart-contract review.\n\
Task: analyze the contract structure below, identify potential vulnerabilities, and plan the next \
verification step.\n\
Follow a Reason -> Act -> Observe process and make sure that you:\n\
1. Output valid JSON only, with no extra text\n\
2. Name the category explicitly (access-control-bypass / reentrancy / precision-loss / \
admin-misuse / gas-inefficiency / naming-issue)\n\
3. Rate exploitability (high/medium/low) and confidence (a float between 0 and 1)\n\
4. Describe the next action and the evidence it needs\n\
\n\
=== Contract context ===\n\
{contracts}\n\
\n\
=== History (last 5 rounds) ===\n\
{history}\n\
\n\
=== Confirmed / high-confidence findings ===\n\
{findings}\n\
\n\
Respond with this JSON structure:\n\
{schema}",
        contracts = or_placeholder(contracts, EMPTY_CONTRACTS),
        history = or_placeholder(history, EMPTY_HISTORY),
        findings = or_placeholder(findings, EMPTY_FINDINGS),
        schema = RESPONSE_SCHEMA,
    )
}

fn or_placeholder(text: String, placeholder: &str) -> String {
    if text.is_empty() {
        placeholder.to_string()
    } else {
        text
    }
}

/// One line per artifact for the first few, then a single omission marker.
pub fn summarize_contracts(corpus: &Corpus) -> String {
    let mut lines = Vec::new();
    for (idx, (name, artifact)) in corpus.iter().enumerate() {
        if idx >= SUMMARY_ARTIFACT_LIMIT {
            lines.push("- ...remaining artifacts omitted".to_string());
            break;
        }
        let inherits = artifact.inherits();
        let inherits = if inherits.is_empty() {
            "none".to_string()
        } else {
            inherits.join(", ")
        };
        lines.push(format!(
            "- {}: {} functions, {} modifiers, inherits {}",
            name,
            artifact.count("functions"),
            artifact.count("modifiers"),
            inherits
        ));
    }
    lines.join("\n")
}

pub fn format_history<'h>(history: impl Iterator<Item = &'h HistoryEntry>) -> String {
    history
        .map(|entry| {
            format!(
                "Round {}: Reason={} | Action={} | Observe={}",
                entry.round, entry.reasoning, entry.action, entry.observation
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_findings(findings: &[Finding]) -> String {
    let start = findings.len().saturating_sub(FINDING_SUMMARY_LIMIT);
    findings[start..]
        .iter()
        .map(|finding| {
            format!(
                "[{}] conf={:.2} target={}",
                finding.category,
                finding.confidence,
                finding.target.as_deref().unwrap_or("N/A")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
