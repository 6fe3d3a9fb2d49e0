//! Cross-Source Merge
//!
//! Reconciles rule-based detector output with the reasoning loop's findings
//! into one list keyed by (contract, function, category). Rule-based entries
//! are inserted first, so on a key collision the rule-based record is kept.

use std::collections::HashSet;

use contract_auditor_core::{Corpus, Finding, FindingRecord, FindingSource, NormalizedSeverity};
use tracing::debug;

const UNCATEGORIZED: &str = "uncategorized";

type MergeKey = (String, String, String);

fn merge_key(record: &FindingRecord) -> MergeKey {
    (
        record.contract.clone().unwrap_or_default(),
        record.function.clone().unwrap_or_default(),
        record.category.clone().unwrap_or_default(),
    )
}

fn normalize_severity(record: &mut FindingRecord) {
    let normalized = NormalizedSeverity::normalize(record.severity.as_deref());
    record.severity = Some(normalized.as_str().to_string());
}

/// Trimmed value, or `None` when blank.
fn present(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Attribute an AI finding to a contract and function.
///
/// A `target` of the form `Contract:function` supplies both; otherwise the
/// first corpus artifact owns the finding and the target names the function.
/// Blank location fields count as missing.
fn backfill_location(record: &mut FindingRecord, default_contract: Option<&str>) {
    let target = present(record.target.as_deref());
    record.contract = present(record.contract.as_deref());
    record.function = present(record.function.as_deref());

    if record.contract.is_none() {
        if let Some((contract, function)) = target.as_deref().and_then(|t| t.split_once(':')) {
            record.contract = present(Some(contract));
            if record.function.is_none() {
                record.function = present(Some(function));
            }
        } else {
            record.contract = default_contract.map(str::to_string);
        }
    }

    if record.function.is_none() {
        record.function = target;
    }

    if record.category.is_none() {
        record.category = Some(
            record
                .kind
                .clone()
                .unwrap_or_else(|| UNCATEGORIZED.to_string()),
        );
    }
}

/// Merge rule-based records with loop findings.
pub fn merge_findings(
    rule_based: &[FindingRecord],
    ai_findings: &[Finding],
    contracts: &Corpus,
) -> Vec<FindingRecord> {
    let ai_records: Vec<FindingRecord> = ai_findings.iter().map(FindingRecord::from).collect();
    merge_records(rule_based, &ai_records, contracts)
}

/// Merge two loosely-typed record lists.
pub fn merge_records(
    rule_based: &[FindingRecord],
    ai_records: &[FindingRecord],
    contracts: &Corpus,
) -> Vec<FindingRecord> {
    let mut seen: HashSet<MergeKey> = HashSet::new();
    let mut merged = Vec::with_capacity(rule_based.len() + ai_records.len());

    for record in rule_based {
        let mut record = record.clone();
        normalize_severity(&mut record);
        record.source = Some(FindingSource::RuleBased);
        if seen.insert(merge_key(&record)) {
            merged.push(record);
        }
    }

    let default_contract = contracts.first_name();
    let mut dropped = 0usize;
    for record in ai_records {
        let mut record = record.clone();
        backfill_location(&mut record, default_contract);
        normalize_severity(&mut record);
        record.source = Some(FindingSource::AiReact);
        if seen.insert(merge_key(&record)) {
            merged.push(record);
        } else {
            dropped += 1;
        }
    }

    debug!(
        rule_based = rule_based.len(),
        ai = ai_records.len(),
        merged = merged.len(),
        dropped_ai = dropped,
        "[Merge] combined findings"
    );
    merged
}
