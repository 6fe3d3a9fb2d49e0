//! Vulnerability Taxonomy
//!
//! Fixed category enumeration with its default severity/exploitability and the
//! keyword table used for static evidence scanning. Everything here is a
//! `const` lookup; nothing is mutated at runtime.
//!
//! Labels are accepted in English wire form (`access-control-bypass`) and in the
//! localized form reasoning backends tend to answer with (`权限绕过`).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Finding severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Parse a severity label. Accepts `critical` as high.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "critical" | "high" | "h" | "高" => Some(Severity::High),
            "medium" | "m" | "中" => Some(Severity::Medium),
            "low" | "l" | "低" => Some(Severity::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How easily a finding can be exploited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exploitability {
    #[serde(alias = "高")]
    High,
    #[serde(alias = "中")]
    Medium,
    #[serde(alias = "低")]
    Low,
}

impl Exploitability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exploitability::High => "high",
            Exploitability::Medium => "medium",
            Exploitability::Low => "low",
        }
    }

    /// Parse an exploitability label (English or localized).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "high" | "h" | "高" => Some(Exploitability::High),
            "medium" | "m" | "中" => Some(Exploitability::Medium),
            "low" | "l" | "低" => Some(Exploitability::Low),
            _ => None,
        }
    }

    /// Recalibrate a proposed exploitability against the static evidence score.
    ///
    /// Strong evidence escalates to high; moderate evidence lifts anything that
    /// was not already judged low to medium.
    pub fn calibrate(self, evidence_score: f64) -> Self {
        if evidence_score > 0.75 {
            return Exploitability::High;
        }
        if evidence_score > 0.45 && self != Exploitability::Low {
            return Exploitability::Medium;
        }
        self
    }
}

impl std::fmt::Display for Exploitability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default attributes attached to each category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryDefaults {
    pub severity: Severity,
    pub exploitability: Exploitability,
}

/// Supported vulnerability categories, in taxonomy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "access-control-bypass", alias = "权限绕过")]
    AccessControlBypass,
    #[serde(rename = "reentrancy", alias = "重入攻击")]
    Reentrancy,
    #[serde(rename = "precision-loss", alias = "精度丢失")]
    PrecisionLoss,
    #[serde(rename = "admin-misuse", alias = "Admin 滥用")]
    AdminMisuse,
    #[serde(rename = "gas-inefficiency", alias = "Gas 优化")]
    GasInefficiency,
    #[serde(rename = "naming-issue", alias = "命名问题")]
    NamingIssue,
}

/// Keyword → category lookup used when a proposal names no category.
/// Order matters: the first keyword contained in the action text wins.
const ACTION_KEYWORDS: &[(&str, Category)] = &[
    ("reentrancy", Category::Reentrancy),
    ("permission", Category::AccessControlBypass),
    ("access", Category::AccessControlBypass),
    ("precision", Category::PrecisionLoss),
    ("admin", Category::AdminMisuse),
    ("owner", Category::AdminMisuse),
    ("gas", Category::GasInefficiency),
    ("naming", Category::NamingIssue),
];

impl Category {
    /// Every category in taxonomy order.
    pub const ALL: [Category; 6] = [
        Category::AccessControlBypass,
        Category::Reentrancy,
        Category::PrecisionLoss,
        Category::AdminMisuse,
        Category::GasInefficiency,
        Category::NamingIssue,
    ];

    /// Wire name used in serialized findings and merge keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AccessControlBypass => "access-control-bypass",
            Category::Reentrancy => "reentrancy",
            Category::PrecisionLoss => "precision-loss",
            Category::AdminMisuse => "admin-misuse",
            Category::GasInefficiency => "gas-inefficiency",
            Category::NamingIssue => "naming-issue",
        }
    }

    /// Default severity and exploitability.
    pub fn defaults(&self) -> CategoryDefaults {
        use Exploitability as E;
        use Severity as S;
        let (severity, exploitability) = match self {
            Category::AccessControlBypass => (S::High, E::High),
            Category::Reentrancy => (S::High, E::High),
            Category::PrecisionLoss => (S::Medium, E::Medium),
            Category::AdminMisuse => (S::Medium, E::Medium),
            Category::GasInefficiency => (S::Low, E::Low),
            Category::NamingIssue => (S::Low, E::Low),
        };
        CategoryDefaults {
            severity,
            exploitability,
        }
    }

    /// Literal keywords scanned for in artifact source text, in table order.
    pub fn patterns(&self) -> &'static [&'static str] {
        match self {
            Category::AccessControlBypass => {
                &["onlyOwner", "AccessControl", "require(msg.sender", "role"]
            }
            Category::Reentrancy => &["call.value", "call{value", "send(", "transfer(", "nonReentrant"],
            Category::PrecisionLoss => &["div(", "mul(", "10**", "decimals", "basisPoints"],
            Category::AdminMisuse => &["owner", "admin", "multisig", "timelock"],
            Category::GasInefficiency => &["for (", "while (", "storage", "++i"],
            Category::NamingIssue => &["TODO", "FIXME", "typo", "var "],
        }
    }

    /// Fixed next-step description used by the heuristic reasoner.
    pub fn heuristic_action(&self) -> &'static str {
        match self {
            Category::AccessControlBypass => "trace access control modifiers",
            Category::Reentrancy => "inspect payable functions with external calls",
            Category::PrecisionLoss => "verify arithmetic precision handling",
            Category::AdminMisuse => "check privileged functions and owner-only flows",
            Category::GasInefficiency => "review loops and storage writes",
            Category::NamingIssue => "review event/function naming clarity",
        }
    }

    /// Category for a 1-based round under round-robin selection.
    pub fn for_round(round: u32) -> Self {
        let idx = (round.max(1) - 1) as usize % Self::ALL.len();
        Self::ALL[idx]
    }

    /// Parse a category label in wire, human, or localized form.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace(['_', ' '], "-");
        let category = match normalized.as_str() {
            "access-control-bypass" | "access-control" | "permission-bypass" | "权限绕过" => {
                Category::AccessControlBypass
            }
            "reentrancy" | "reentrancy-attack" | "重入攻击" => Category::Reentrancy,
            "precision-loss" | "precision" | "精度丢失" => Category::PrecisionLoss,
            "admin-misuse" | "admin-abuse" | "privilege-misuse" | "admin-滥用" => {
                Category::AdminMisuse
            }
            "gas-inefficiency" | "gas-optimization" | "gas" | "gas-优化" => {
                Category::GasInefficiency
            }
            "naming-issue" | "naming" | "命名问题" => Category::NamingIssue,
            _ => return None,
        };
        Some(category)
    }

    /// Infer a category from free-form action text, defaulting to access control.
    pub fn infer_from_action(action: &str) -> Self {
        let lowered = action.to_lowercase();
        ACTION_KEYWORDS
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword))
            .map(|(_, category)| *category)
            .unwrap_or(Category::AccessControlBypass)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::from_label(s).ok_or_else(|| CoreError::parse(format!("unknown category: {}", s)))
    }
}
