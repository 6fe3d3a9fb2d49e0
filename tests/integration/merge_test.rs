//! Cross-Source Merge Integration Tests

use contract_auditor::merge::merge_findings;
use contract_auditor_core::{Category, Corpus, Finding, FindingRecord, FindingSource};
use serde_json::json;

fn corpus() -> Corpus {
    [
        ("Vault", "contract Vault {}".to_string()),
        ("Token", "contract Token {}".to_string()),
    ]
    .into_iter()
    .collect()
}

fn loop_finding(category: Category, target: Option<&str>, round: u32) -> Finding {
    let defaults = category.defaults();
    Finding {
        category,
        description: format!("Potential {}", category),
        severity: defaults.severity,
        exploitability: defaults.exploitability,
        confidence: 0.91,
        round_detected: round,
        target: target.map(str::to_string),
        recommendation: None,
        evidence: Some("Vault:call{value => call{value: amount}".to_string()),
    }
}

fn rule(value: serde_json::Value) -> FindingRecord {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_rule_based_record_wins_key_collision() {
    let rules = vec![rule(json!({
        "contract": "Vault",
        "function": "withdraw",
        "category": "reentrancy",
        "severity": "CRITICAL",
        "detector": "reentrancy-eth",
        "line": 42
    }))];
    let ai = vec![loop_finding(Category::Reentrancy, Some("withdraw"), 3)];

    let merged = merge_findings(&rules, &ai, &corpus());
    assert_eq!(merged.len(), 1);
    let kept = &merged[0];
    assert_eq!(kept.source, Some(FindingSource::RuleBased));
    assert_eq!(kept.severity.as_deref(), Some("high"));
    assert_eq!(kept.extra_str("detector"), Some("reentrancy-eth"));
    assert_eq!(kept.extra["line"], json!(42));
}

#[test]
fn test_loop_findings_fill_gaps() {
    let rules = vec![rule(json!({
        "contract": "Vault",
        "function": "withdraw",
        "category": "reentrancy",
        "severity": "medium"
    }))];
    let ai = vec![
        loop_finding(Category::AccessControlBypass, Some("Token:mint"), 1),
        loop_finding(Category::PrecisionLoss, None, 3),
        loop_finding(Category::Reentrancy, Some("deposit"), 8),
    ];

    let merged = merge_findings(&rules, &ai, &corpus());
    assert_eq!(merged.len(), 4);
    assert_eq!(merged[0].source, Some(FindingSource::RuleBased));

    let mint = &merged[1];
    assert_eq!(mint.source, Some(FindingSource::AiReact));
    assert_eq!(mint.contract.as_deref(), Some("Token"));
    assert_eq!(mint.function.as_deref(), Some("mint"));
    assert_eq!(mint.category.as_deref(), Some("access-control-bypass"));
    assert_eq!(mint.severity.as_deref(), Some("high"));
    assert_eq!(mint.confidence(), Some(0.91));

    let precision = &merged[2];
    assert_eq!(precision.contract.as_deref(), Some("Vault"));
    assert!(precision.function.is_none());
    assert_eq!(precision.severity.as_deref(), Some("medium"));

    let deposit = &merged[3];
    assert_eq!(deposit.contract.as_deref(), Some("Vault"));
    assert_eq!(deposit.function.as_deref(), Some("deposit"));
}

#[test]
fn test_duplicate_loop_findings_collapse_by_key() {
    // Two loop findings can share a merge key when their targets differ only
    // in the `Contract:` prefix.
    let ai = vec![
        loop_finding(Category::Reentrancy, Some("Vault:withdraw"), 2),
        loop_finding(Category::Reentrancy, Some("withdraw"), 8),
    ];
    let merged = merge_findings(&[], &ai, &corpus());
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].extra["round_detected"], json!(2));
}

#[test]
fn test_merge_without_rules_keeps_loop_order() {
    let ai = vec![
        loop_finding(Category::GasInefficiency, Some("loop"), 5),
        loop_finding(Category::NamingIssue, Some("var"), 6),
    ];
    let merged = merge_findings(&[], &ai, &corpus());
    let categories: Vec<_> = merged.iter().map(|r| r.category.as_deref()).collect();
    assert_eq!(categories, vec![Some("gas-inefficiency"), Some("naming-issue")]);
    assert!(merged
        .iter()
        .all(|r| r.severity.as_deref() == Some("low")));
}
