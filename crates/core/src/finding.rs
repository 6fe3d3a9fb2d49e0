//! Finding Types
//!
//! - [`Finding`]: a typed, confidence-scored observation produced by the
//!   reasoning loop.
//! - [`FindingRecord`]: the loosely-typed record both detectors are reconciled
//!   through. Known keys are lifted into fields; everything else rides along in
//!   `extra` untouched.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::taxonomy::{Category, Exploitability, Severity};

/// A security finding recorded by the reasoning loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub category: Category,
    pub description: String,
    pub severity: Severity,
    pub exploitability: Exploitability,
    #[serde(serialize_with = "serialize_rounded")]
    pub confidence: f64,
    pub round_detected: u32,
    pub target: Option<String>,
    pub recommendation: Option<String>,
    pub evidence: Option<String>,
}

/// Round to 4 decimal places for display/serialization.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn serialize_rounded<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round4(*value))
}

/// Which detector produced a merged record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSource {
    RuleBased,
    AiReact,
}

/// Severity after normalization across detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizedSeverity {
    High,
    Medium,
    Low,
    Info,
}

impl NormalizedSeverity {
    /// Map any severity label onto the four report levels.
    ///
    /// `CRITICAL`/`HIGH`/`H` → high, `MEDIUM`/`M` → medium, `LOW`/`L` → low,
    /// anything else (including nothing) → info.
    pub fn normalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return NormalizedSeverity::Info;
        };
        match raw.trim().to_uppercase().as_str() {
            "CRITICAL" | "HIGH" | "H" => NormalizedSeverity::High,
            "MEDIUM" | "M" => NormalizedSeverity::Medium,
            "LOW" | "L" => NormalizedSeverity::Low,
            _ => NormalizedSeverity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizedSeverity::High => "high",
            NormalizedSeverity::Medium => "medium",
            NormalizedSeverity::Low => "low",
            NormalizedSeverity::Info => "info",
        }
    }
}

impl From<Severity> for NormalizedSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::High => NormalizedSeverity::High,
            Severity::Medium => NormalizedSeverity::Medium,
            Severity::Low => NormalizedSeverity::Low,
        }
    }
}

/// Loosely-typed finding record exchanged between detectors and the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingRecord {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Some detectors label the category as `type`.
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<FindingSource>,
    /// Every other key (description, confidence, line, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FindingRecord {
    /// Look up an auxiliary string field such as `description`.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Numeric confidence if the record carries one.
    pub fn confidence(&self) -> Option<f64> {
        match self.extra.get("confidence")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<&Finding> for FindingRecord {
    fn from(finding: &Finding) -> Self {
        let mut extra = Map::new();
        extra.insert("description".into(), Value::from(finding.description.clone()));
        extra.insert(
            "exploitability".into(),
            Value::from(finding.exploitability.as_str()),
        );
        extra.insert("confidence".into(), Value::from(round4(finding.confidence)));
        extra.insert("round_detected".into(), Value::from(finding.round_detected));
        if let Some(recommendation) = &finding.recommendation {
            extra.insert("recommendation".into(), Value::from(recommendation.clone()));
        }
        if let Some(evidence) = &finding.evidence {
            extra.insert("evidence".into(), Value::from(evidence.clone()));
        }

        Self {
            contract: None,
            function: None,
            category: Some(finding.category.as_str().to_string()),
            kind: None,
            target: finding.target.clone(),
            severity: Some(finding.severity.as_str().to_string()),
            source: None,
            extra,
        }
    }
}

/// Accept strings, numbers and booleans as text; null as absent.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
