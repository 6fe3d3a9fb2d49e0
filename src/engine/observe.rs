//! Observe Stage
//!
//! Applies the confidence threshold and folds accepted candidates into the
//! [`FindingStore`], where repeated detections of the same target reinforce
//! each other instead of piling up as duplicates.

use contract_auditor_core::Finding;
use tracing::debug;

use super::state::{ActionResult, LoopState, Observation};

/// Separator between evidence snippets accumulated on one finding.
const EVIDENCE_SEPARATOR: &str = " || ";

/// Pull `current` toward `new` with a small upward bias, capped at 1.
pub fn merge_confidence(current: f64, new: f64) -> f64 {
    (current + (new - current) * 0.6 + 0.05).min(1.0)
}

/// Same category, and targets equal (both absent counts) or one contains
/// the other case-insensitively.
pub fn same_target(existing: &Finding, candidate: &Finding) -> bool {
    if existing.category != candidate.category {
        return false;
    }
    match (existing.target.as_deref(), candidate.target.as_deref()) {
        (None, None) => true,
        (Some(a), Some(b)) if a == b => true,
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => {
            let (a, b) = (a.to_lowercase(), b.to_lowercase());
            a.contains(&b) || b.contains(&a)
        }
        _ => false,
    }
}

/// Result of recording a candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recorded {
    /// Position of the stored finding.
    pub index: usize,
    /// Stored confidence before this candidate was applied.
    pub previous_confidence: Option<f64>,
    /// Stored confidence afterwards.
    pub confidence: f64,
}

/// Findings in insertion order, at most one per (category, fuzzy target).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindingStore {
    findings: Vec<Finding>,
}

impl FindingStore {
    pub fn as_slice(&self) -> &[Finding] {
        &self.findings
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn into_vec(self) -> Vec<Finding> {
        self.findings
    }

    /// Merge the candidate into the first matching finding, or append it.
    pub fn record(&mut self, candidate: Finding) -> Recorded {
        let Some(index) = self.findings.iter().position(|f| same_target(f, &candidate)) else {
            let confidence = candidate.confidence;
            self.findings.push(candidate);
            return Recorded {
                index: self.findings.len() - 1,
                previous_confidence: None,
                confidence,
            };
        };

        let existing = &mut self.findings[index];
        let previous = existing.confidence;
        existing.confidence = merge_confidence(previous, candidate.confidence);
        existing.round_detected = existing.round_detected.min(candidate.round_detected);

        if let Some(new_evidence) = candidate.evidence {
            if let Some(known) = existing.evidence.as_mut() {
                if !known.contains(&new_evidence) {
                    known.push_str(EVIDENCE_SEPARATOR);
                    known.push_str(&new_evidence);
                }
            } else {
                existing.evidence = Some(new_evidence);
            }
        }
        if candidate.recommendation.is_some() {
            existing.recommendation = candidate.recommendation;
        }

        Recorded {
            index,
            previous_confidence: Some(previous),
            confidence: existing.confidence,
        }
    }
}

/// Render a number with up to six decimals and no trailing zeros.
fn format_number(value: f64) -> String {
    let text = format!("{:.6}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Run the observe stage for one round's action result.
pub fn observe(state: &mut LoopState<'_>, action: &ActionResult, min_confidence: f64) -> Observation {
    let confidence = action.calibrated_confidence;

    if confidence < min_confidence {
        debug!(
            round = state.round(),
            confidence,
            min_confidence,
            "[Observe] below threshold"
        );
        return Observation {
            action: action.action.clone(),
            outcome: format!(
                "confidence {} below threshold {}",
                format_number(confidence),
                format_number(min_confidence)
            ),
            evidence: Some(action.evidence.clone()),
            confidence_delta: 0.0,
        };
    }

    let candidate = Finding {
        category: action.category,
        description: action.description.clone(),
        severity: action.severity,
        exploitability: action.exploitability,
        confidence,
        round_detected: state.round(),
        target: action.target.clone(),
        recommendation: action.recommendation.clone(),
        evidence: Some(action.evidence.clone()),
    };
    let recorded = state.findings.record(candidate);
    state.raise_confidence(recorded.confidence);

    let outcome = match recorded.previous_confidence {
        None => format!(
            "recorded {} (conf={:.2})",
            action.category, recorded.confidence
        ),
        Some(_) => format!(
            "reinforced {} (conf={:.2})",
            action.category, recorded.confidence
        ),
    };

    Observation {
        action: action.action.clone(),
        outcome,
        evidence: Some(action.evidence.clone()),
        confidence_delta: recorded
            .previous_confidence
            .map_or(0.0, |previous| recorded.confidence - previous),
    }
}
