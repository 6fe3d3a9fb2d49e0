//! Exploit Scaffold Eligibility
//!
//! Selects merged findings that a proof-of-concept scaffold generator could
//! act on. Only high and medium severities in a scaffoldable category qualify;
//! nothing is generated here.

use contract_auditor_core::{Category, FindingRecord, NormalizedSeverity};
use serde::Serialize;

/// Exploit templates a scaffold generator knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaffoldKind {
    Reentrancy,
    AccessControl,
    PrecisionLoss,
}

impl ScaffoldKind {
    pub fn for_category(category: Category) -> Option<Self> {
        match category {
            Category::Reentrancy => Some(ScaffoldKind::Reentrancy),
            Category::AccessControlBypass => Some(ScaffoldKind::AccessControl),
            Category::PrecisionLoss => Some(ScaffoldKind::PrecisionLoss),
            _ => None,
        }
    }
}

/// What a scaffold generator receives for one finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaffoldCandidate {
    pub kind: ScaffoldKind,
    pub description: String,
    pub contract: String,
    pub function: Option<String>,
    pub severity: NormalizedSeverity,
}

pub fn scaffold_candidates(findings: &[FindingRecord]) -> Vec<ScaffoldCandidate> {
    findings
        .iter()
        .filter_map(|record| {
            let severity = NormalizedSeverity::normalize(record.severity.as_deref());
            if !matches!(severity, NormalizedSeverity::High | NormalizedSeverity::Medium) {
                return None;
            }
            let category = record
                .category
                .as_deref()
                .or(record.kind.as_deref())
                .and_then(Category::from_label)?;
            let kind = ScaffoldKind::for_category(category)?;

            Some(ScaffoldCandidate {
                kind,
                description: record.extra_str("description").unwrap_or_default().to_string(),
                contract: record.contract.clone().unwrap_or_default(),
                function: record.function.clone().filter(|f| !f.is_empty()),
                severity,
            })
        })
        .collect()
}
