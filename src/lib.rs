//! Contract Auditor
//!
//! Security auditor for Solidity smart contracts. A bounded
//! Reason → Act → Observe loop proposes candidate vulnerabilities (through a
//! configured model backend, or a deterministic heuristic when none answers),
//! scans the artifacts for keyword evidence, calibrates confidence, and keeps
//! the findings that clear a threshold. Those are merged with rule-based
//! detector output into a ranked report.
//!
//! ## Module Organization
//!
//! - `config` - TOML configuration with environment overrides
//! - `engine` - The reasoning loop and its phases
//! - `merge` - Cross-source merge of rule-based and loop findings
//! - `pipeline` - End-to-end audit: load, analyze, merge, report
//! - `report` - Ranked audit report
//! - `scaffold` - Exploit scaffold eligibility
//! - `source` - Regex outline of Solidity source
//! - `utils` - Error type and paths

pub mod config;
pub mod engine;
pub mod merge;
pub mod pipeline;
pub mod report;
pub mod scaffold;
pub mod source;
pub mod utils;

pub use config::{AuditorConfig, BackendKind};
pub use engine::{AnalysisResult, EngineSettings, ReActEngine};
pub use merge::{merge_findings, merge_records};
pub use pipeline::{AuditRequest, Auditor};
pub use report::AuditReport;
pub use utils::error::{AppError, AppResult};
