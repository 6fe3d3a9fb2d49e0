//! Contract Auditor Core
//!
//! Foundational types for the Contract Auditor workspace: error types, the fixed
//! vulnerability taxonomy, artifact access, and finding records. This crate has
//! no dependency on the reasoning backend or the application crate.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `taxonomy` - Categories, default severity/exploitability, evidence keyword tables
//! - `artifact` - Shape-agnostic artifact accessor and the ordered `Corpus`
//! - `finding` - Loop findings, loosely-typed merge records, severity normalization

pub mod artifact;
pub mod error;
pub mod finding;
pub mod taxonomy;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Taxonomy ───────────────────────────────────────────────────────────
pub use taxonomy::{Category, CategoryDefaults, Exploitability, Severity};

// ── Artifacts ──────────────────────────────────────────────────────────
pub use artifact::{Artifact, ContractRecord, Corpus};

// ── Findings ───────────────────────────────────────────────────────────
pub use finding::{round4, Finding, FindingRecord, FindingSource, NormalizedSeverity};
