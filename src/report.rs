//! Audit Report
//!
//! Final ranked and summarized view over the merged findings.

use contract_auditor_core::{Corpus, Finding, FindingRecord, NormalizedSeverity};
use serde::Serialize;
use tracing::info;

use crate::engine::{AnalysisResult, HistoryEntry};
use crate::scaffold::{scaffold_candidates, ScaffoldCandidate};

/// Run-level facts about how the report was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub contract_paths: Vec<String>,
    /// RFC 3339 timestamp of report creation.
    pub audit_date: String,
    pub engine: String,
    pub duration_seconds: f64,
    pub tokens_used: u32,
}

impl ReportMetadata {
    pub fn new(
        contract_paths: Vec<String>,
        engine: impl Into<String>,
        duration_seconds: f64,
        tokens_used: u32,
    ) -> Self {
        Self {
            contract_paths,
            audit_date: chrono::Local::now().to_rfc3339(),
            engine: engine.into(),
            duration_seconds,
            tokens_used,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub contracts_analyzed: usize,
    pub confidence: f64,
}

/// The reasoning loop's own view of the run, before merging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisMetadata {
    pub rounds: u32,
    pub confidence: f64,
    pub history_length: usize,
    /// Retained round history, oldest first.
    pub history: Vec<HistoryEntry>,
    /// Loop findings as recorded, without rule-based records.
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub metadata: ReportMetadata,
    pub summary: ReportSummary,
    pub contracts: Vec<String>,
    /// Merged findings, most severe first.
    pub vulnerabilities: Vec<FindingRecord>,
    pub analysis: AnalysisMetadata,
    pub scaffold_candidates: Vec<ScaffoldCandidate>,
}

impl AuditReport {
    pub fn new(
        metadata: ReportMetadata,
        contracts: &Corpus,
        mut vulnerabilities: Vec<FindingRecord>,
        analysis: &AnalysisResult,
    ) -> Self {
        let mut summary = ReportSummary {
            total: vulnerabilities.len(),
            contracts_analyzed: contracts.len(),
            confidence: analysis.confidence,
            ..Default::default()
        };

        for record in &mut vulnerabilities {
            let severity = NormalizedSeverity::normalize(record.severity.as_deref());
            record.severity = Some(severity.as_str().to_string());
            match severity {
                NormalizedSeverity::High => summary.high += 1,
                NormalizedSeverity::Medium => summary.medium += 1,
                NormalizedSeverity::Low => summary.low += 1,
                NormalizedSeverity::Info => summary.info += 1,
            }
        }
        // Stable: equal severities keep merge order.
        vulnerabilities.sort_by_key(|record| NormalizedSeverity::normalize(record.severity.as_deref()));

        let scaffold_candidates = scaffold_candidates(&vulnerabilities);

        Self {
            metadata,
            summary,
            contracts: contracts.names().map(str::to_string).collect(),
            vulnerabilities,
            analysis: AnalysisMetadata {
                rounds: analysis.rounds,
                confidence: analysis.confidence,
                history_length: analysis.history.len(),
                history: analysis.history.clone(),
                findings: analysis.vulnerabilities.clone(),
            },
            scaffold_candidates,
        }
    }

    /// Log a one-line-per-finding summary.
    pub fn log_summary(&self) {
        if self.vulnerabilities.is_empty() {
            info!("[Report] no vulnerabilities found");
            return;
        }

        info!(
            total = self.summary.total,
            high = self.summary.high,
            medium = self.summary.medium,
            low = self.summary.low,
            info_count = self.summary.info,
            "[Report] vulnerability summary"
        );
        for record in &self.vulnerabilities {
            let location = [record.contract.as_deref(), record.function.as_deref()]
                .into_iter()
                .flatten()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" / ");
            let location = if location.is_empty() { "N/A".to_string() } else { location };
            let category = record
                .category
                .as_deref()
                .or(record.kind.as_deref())
                .unwrap_or("unknown");
            info!(
                severity = record.severity.as_deref().unwrap_or("info"),
                category,
                location = %location,
                confidence = record.confidence().unwrap_or(0.0),
                "[Report] finding"
            );
        }
    }
}
