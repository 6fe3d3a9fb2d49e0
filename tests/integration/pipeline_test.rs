//! Audit Pipeline Integration Tests

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use contract_auditor::config::{AuditorConfig, BackendKind};
use contract_auditor::pipeline::{AuditRequest, Auditor};
use contract_auditor::scaffold::ScaffoldKind;
use contract_auditor::AppError;
use contract_auditor_core::FindingSource;
use contract_auditor_llm::LlmProvider;
use serde_json::json;

use crate::support::{quiet_reply, ScriptedProvider};

const VAULT_SOL: &str = r#"
pragma solidity ^0.8.0;

contract Vault {
    mapping(address => uint256) balances;

    function deposit() external payable {
        balances[msg.sender] += msg.value;
    }

    function withdraw(uint256 amount) external {
        (bool ok, ) = msg.sender.call{value: amount}("");
        require(ok);
        payable(msg.sender).transfer(amount);
        balances[msg.sender] -= amount;
    }
}
"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn offline_config() -> AuditorConfig {
    let mut config = AuditorConfig::default();
    config.llm.provider = BackendKind::None;
    config
}

fn fixture(dir: &Path) -> AuditRequest {
    let contract = write(dir, "Vault.sol", VAULT_SOL);
    let rules = write(
        dir,
        "rules.json",
        &json!({
            "findings": [
                {"contract": "Vault", "function": "deposit", "category": "naming-issue", "severity": "LOW", "description": "unclear name"},
                {"contract": "Vault", "function": "withdraw", "category": "reentrancy", "severity": "HIGH", "description": "state updated after external call", "line": 13}
            ]
        })
        .to_string(),
    );
    AuditRequest {
        contract_paths: vec![contract],
        rules_path: Some(rules),
    }
}

#[tokio::test]
async fn test_offline_audit_merges_rules_and_loop() {
    let dir = tempfile::tempdir().unwrap();
    let request = fixture(dir.path());
    let auditor = Auditor::new(offline_config()).unwrap();

    let report = auditor.audit(&request).await.unwrap();

    assert_eq!(report.metadata.engine, "react:heuristic + rules");
    assert_eq!(report.metadata.tokens_used, 0);
    assert_eq!(report.contracts, vec!["Vault"]);
    assert_eq!(report.analysis.rounds, 27);
    assert_eq!(report.analysis.history_length, 5);
    let rounds: Vec<u32> = report.analysis.history.iter().map(|h| h.round).collect();
    assert_eq!(rounds, vec![23, 24, 25, 26, 27]);
    assert_eq!(report.analysis.findings.len(), 1);
    assert_eq!(report.analysis.findings[0].round_detected, 20);

    // Two rule-based records plus the loop's target-less reentrancy finding.
    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.high, 2);
    assert_eq!(report.summary.low, 1);

    let first = &report.vulnerabilities[0];
    assert_eq!(first.source, Some(FindingSource::RuleBased));
    assert_eq!(first.function.as_deref(), Some("withdraw"));

    let loop_record = &report.vulnerabilities[1];
    assert_eq!(loop_record.source, Some(FindingSource::AiReact));
    assert_eq!(loop_record.contract.as_deref(), Some("Vault"));
    assert_eq!(loop_record.category.as_deref(), Some("reentrancy"));

    assert_eq!(
        report.vulnerabilities[2].severity.as_deref(),
        Some("low")
    );

    assert_eq!(report.scaffold_candidates.len(), 2);
    assert!(report
        .scaffold_candidates
        .iter()
        .all(|c| c.kind == ScaffoldKind::Reentrancy));

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["vulnerabilities"][0]["source"], "rule_based");
    assert_eq!(value["vulnerabilities"][0]["line"], 13);
    assert_eq!(value["summary"]["total"], 3);
    assert_eq!(value["analysis"]["history"].as_array().unwrap().len(), 5);
    assert_eq!(value["analysis"]["findings"][0]["category"], "reentrancy");
}

#[tokio::test]
async fn test_rules_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let request = fixture(dir.path());
    let mut config = offline_config();
    config.audit.use_rules = false;

    let report = Auditor::new(config).unwrap().audit(&request).await.unwrap();
    assert_eq!(report.metadata.engine, "react:heuristic");
    assert_eq!(report.summary.total, 1);
    assert_eq!(
        report.vulnerabilities[0].source,
        Some(FindingSource::AiReact)
    );
}

#[tokio::test]
async fn test_backend_audit_reports_usage() {
    let dir = tempfile::tempdir().unwrap();
    let request = AuditRequest {
        contract_paths: vec![write(dir.path(), "Vault.sol", VAULT_SOL)],
        rules_path: None,
    };
    let provider = Arc::new(ScriptedProvider::new(Vec::new(), quiet_reply()));
    let mut config = AuditorConfig::default();
    config.audit.max_rounds = Some(25);

    let auditor =
        Auditor::with_provider(config, Some(provider.clone() as Arc<dyn LlmProvider>)).unwrap();
    let report = auditor.audit(&request).await.unwrap();

    assert_eq!(report.metadata.engine, "react:scripted");
    assert_eq!(provider.calls(), 25);
    assert_eq!(report.metadata.tokens_used, 25 * 15);
    assert_eq!(report.analysis.rounds, 25);
    assert!(report.vulnerabilities.is_empty());
    assert_eq!(report.summary.confidence, 0.0);
}

#[tokio::test]
async fn test_unreachable_backend_switches_to_heuristic() {
    let dir = tempfile::tempdir().unwrap();
    let request = AuditRequest {
        contract_paths: vec![write(dir.path(), "Vault.sol", VAULT_SOL)],
        rules_path: None,
    };
    let provider = Arc::new(ScriptedProvider::new(Vec::new(), quiet_reply()).unhealthy());

    let auditor = Auditor::with_provider(
        AuditorConfig::default(),
        Some(provider.clone() as Arc<dyn LlmProvider>),
    )
    .unwrap();
    let report = auditor.audit(&request).await.unwrap();

    assert_eq!(report.metadata.engine, "react:heuristic");
    assert_eq!(provider.calls(), 0);
    assert_eq!(report.summary.total, 1);
}

#[tokio::test]
async fn test_progress_reaches_every_round() {
    let dir = tempfile::tempdir().unwrap();
    let request = AuditRequest {
        contract_paths: vec![write(dir.path(), "Vault.sol", VAULT_SOL)],
        rules_path: None,
    };
    let auditor = Auditor::new(offline_config()).unwrap();

    let mut rounds = 0;
    auditor
        .audit_with_progress(&request, |_, _| {
            rounds += 1;
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(rounds, 27);
}

#[tokio::test]
async fn test_input_errors_surface() {
    let dir = tempfile::tempdir().unwrap();
    let auditor = Auditor::new(offline_config()).unwrap();

    let missing = AuditRequest {
        contract_paths: vec![dir.path().join("Missing.sol")],
        rules_path: None,
    };
    assert!(matches!(
        auditor.audit(&missing).await,
        Err(AppError::NotFound(_))
    ));

    let bad_rules = AuditRequest {
        contract_paths: vec![write(dir.path(), "Vault.sol", VAULT_SOL)],
        rules_path: Some(write(dir.path(), "rules.json", "{not json")),
    };
    assert!(matches!(
        auditor.audit(&bad_rules).await,
        Err(AppError::Input(_))
    ));

    assert!(matches!(
        auditor.audit(&AuditRequest::default()).await,
        Err(AppError::Validation(_))
    ));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = offline_config();
    config.audit.min_confidence = 1.5;
    assert!(matches!(Auditor::new(config), Err(AppError::Config(_))));
}
