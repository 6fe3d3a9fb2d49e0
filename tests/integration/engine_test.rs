//! Reasoning Loop Integration Tests

use std::sync::Arc;
use std::time::Duration;

use contract_auditor::engine::{
    observe, ActionResult, EngineSettings, HeuristicReasoner, LoopState, ReActEngine,
};
use contract_auditor_core::{Category, Corpus, Exploitability, Severity};
use contract_auditor_llm::{GenerationOptions, LlmError, LlmProvider};
use serde_json::json;

use crate::support::{quiet_reply, Reply, ScriptedProvider};

fn corpus(name: &str, source: &str) -> Corpus {
    [(name, source.to_string())].into_iter().collect()
}

fn settings(max_rounds: Option<u32>, min_confidence: f64) -> EngineSettings {
    EngineSettings {
        max_rounds,
        min_confidence,
    }
}

fn backend_engine(provider: Arc<ScriptedProvider>, settings: EngineSettings) -> ReActEngine {
    ReActEngine::with_backend(
        provider as Arc<dyn LlmProvider>,
        GenerationOptions::default(),
        Duration::from_millis(50),
        settings,
    )
}

const REENTRANT_VAULT: &str = r#"
contract Vault {
    function withdraw(uint256 amount) external {
        (bool ok, ) = msg.sender.call{value: amount}("");
        payable(msg.sender).transfer(amount);
    }
}
"#;

const OWNED_VAULT: &str = r#"
contract Vault {
    address owner;

    modifier onlyOwner() {
        require(msg.sender == owner);
        _;
    }

    function withdraw(uint256 amount) external {
        payable(msg.sender).transfer(amount);
    }

    function withdrawAll() external {
        payable(msg.sender).transfer(address(this).balance);
    }
}
"#;

// ============================================================================
// Round Control
// ============================================================================

#[tokio::test]
async fn test_round_count_is_clamped() {
    let contracts = corpus("Empty", "contract Empty {}");
    for (requested, expected) in [(None, 27), (Some(3), 25), (Some(26), 26), (Some(99), 27)] {
        let engine = ReActEngine::heuristic(settings(requested, 0.87));
        assert_eq!(engine.rounds(), expected);
        let result = engine.analyze(&contracts).await;
        assert_eq!(result.rounds, expected);
    }
}

#[tokio::test]
async fn test_heuristic_only_run_on_quiet_corpus() {
    let engine = ReActEngine::heuristic(EngineSettings::default());
    let result = engine.analyze(&corpus("Empty", "contract Empty {}")).await;

    assert_eq!(result.rounds, 27);
    assert!(result.vulnerabilities.is_empty());
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.history.len(), 5);
    assert_eq!(result.history[0].round, 23);
    assert_eq!(
        result.history[4].reasoning,
        "Round 27 fallback reasoning for precision-loss"
    );
    assert!(result.history[4].observation.starts_with("confidence "));
}

#[tokio::test]
async fn test_empty_corpus_completes() {
    let engine = ReActEngine::heuristic(settings(Some(25), 0.87));
    let result = engine.analyze(&Corpus::new()).await;
    assert_eq!(result.rounds, 25);
    assert!(result.vulnerabilities.is_empty());
}

#[tokio::test]
async fn test_heuristic_records_late_rounds_with_strong_evidence() {
    // Both reentrancy keywords hit: score saturates, so rounds 20 and 26
    // (reentrancy in the rotation) clear 0.87 and merge as one target-less finding.
    let engine = ReActEngine::heuristic(EngineSettings::default());
    let result = engine.analyze(&corpus("Vault", REENTRANT_VAULT)).await;

    assert_eq!(result.vulnerabilities.len(), 1);
    let finding = &result.vulnerabilities[0];
    assert_eq!(finding.category, Category::Reentrancy);
    assert_eq!(finding.round_detected, 20);
    assert!(finding.target.is_none());
    assert_eq!(finding.exploitability, Exploitability::High);
    assert!(result.confidence >= 0.87);
}

// ============================================================================
// Backend Reasoning and Fallback
// ============================================================================

#[tokio::test]
async fn test_backend_failures_fall_back_to_heuristic() {
    let provider = Arc::new(ScriptedProvider::new(
        vec![
            Reply::Text("I could not find anything worth reporting.".to_string()),
            Reply::json(json!(["not", "an", "object"])),
            Reply::Text("   ".to_string()),
            Reply::Fail(LlmError::RateLimited {
                message: "slow down".to_string(),
                retry_after: Some(1),
            }),
            Reply::Hang,
        ],
        Reply::Fail(LlmError::ServerError {
            message: "boom".to_string(),
            status: Some(500),
        }),
    ));
    let engine = backend_engine(provider.clone(), settings(Some(25), 0.87));
    assert_eq!(engine.reasoner_name(), "scripted");

    let mut reasonings = Vec::new();
    let result = engine
        .analyze_with_progress(&corpus("Empty", "contract Empty {}"), |_, snapshot| {
            reasonings.push(snapshot.proposal.reasoning.clone());
            Ok(())
        })
        .await;

    assert_eq!(result.rounds, 25);
    assert_eq!(provider.calls(), 25);
    assert_eq!(reasonings.len(), 25);
    for (idx, reasoning) in reasonings.iter().enumerate() {
        let round = idx as u32 + 1;
        assert_eq!(
            *reasoning,
            HeuristicReasoner::proposal_for(round).reasoning,
            "round {} should use the heuristic",
            round
        );
    }
    // Replies that arrived but failed to parse still count tokens.
    assert_eq!(engine.usage().total_tokens(), 45);
}

#[tokio::test]
async fn test_fenced_backend_answer_is_used() {
    let answer = "Here is my analysis:\n```json\n{\"thought\": \"external call before state update\", \
\"action\": \"trace withdraw\", \"target\": \"withdraw\", \"vulnerability_type\": \"reentrancy\", \
\"confidence\": \"0.9\", \"proposedFix\": \"apply checks-effects-interactions\"}\n```";
    let provider = Arc::new(ScriptedProvider::new(
        vec![Reply::Text(answer.to_string())],
        quiet_reply(),
    ));
    let engine = backend_engine(provider, settings(Some(25), 0.87));
    let result = engine.analyze(&corpus("Vault", REENTRANT_VAULT)).await;

    assert_eq!(result.vulnerabilities.len(), 1);
    let finding = &result.vulnerabilities[0];
    assert_eq!(finding.description, "external call before state update");
    assert_eq!(finding.target.as_deref(), Some("withdraw"));
    assert_eq!(finding.round_detected, 1);
    assert_eq!(finding.severity, Severity::High);
    assert_eq!(
        finding.recommendation.as_deref(),
        Some("apply checks-effects-interactions")
    );
    assert!(finding
        .evidence
        .as_deref()
        .unwrap_or_default()
        .starts_with("Vault:"));
    assert!((finding.confidence - 0.94).abs() < 1e-9);
    assert_eq!(engine.usage().total_tokens(), 25 * 15);
}

#[tokio::test]
async fn test_unhealthy_provider_still_answers_when_called_directly() {
    // The engine never checks health itself; the pipeline does.
    let provider = Arc::new(ScriptedProvider::new(Vec::new(), quiet_reply()).unhealthy());
    let engine = backend_engine(provider.clone(), settings(Some(25), 0.87));
    let result = engine.analyze(&corpus("Empty", "")).await;
    assert_eq!(result.rounds, 25);
    assert_eq!(provider.calls(), 25);
}

// ============================================================================
// Progress Callback
// ============================================================================

#[tokio::test]
async fn test_callback_errors_do_not_stop_the_loop() {
    let engine = ReActEngine::heuristic(settings(Some(25), 0.87));
    let mut seen = Vec::new();
    let result = engine
        .analyze_with_progress(&corpus("Empty", "contract Empty {}"), |state, snapshot| {
            assert_eq!(state.round(), snapshot.round);
            assert_eq!(snapshot.history_entry.round, snapshot.round);
            seen.push(snapshot.round);
            anyhow::bail!("listener went away")
        })
        .await;

    assert_eq!(result.rounds, 25);
    assert_eq!(seen, (1..=25).collect::<Vec<_>>());
}

// ============================================================================
// Threshold (Scenarios A and B)
// ============================================================================

fn single_hit_scenario(min_confidence: f64) -> (Arc<ScriptedProvider>, ReActEngine, Corpus) {
    let provider = Arc::new(ScriptedProvider::new(
        vec![Reply::json(json!({
            "reasoning": "guard present but external call unchecked",
            "action": "trace withdraw",
            "target": "withdraw",
            "category": "reentrancy",
            "exploitability": "high",
            "confidence": 0.9
        }))],
        quiet_reply(),
    ));
    let engine = backend_engine(provider.clone(), settings(Some(25), min_confidence));
    // One of five reentrancy keywords.
    let contracts = corpus(
        "Vault",
        "contract Vault { function withdraw() external nonReentrant {} }",
    );
    (provider, engine, contracts)
}

#[tokio::test]
async fn test_single_keyword_evidence_stays_below_default_threshold() {
    let (_provider, engine, contracts) = single_hit_scenario(0.87);

    let mut first_round = None;
    let result = engine
        .analyze_with_progress(&contracts, |_, snapshot| {
            if snapshot.round == 1 {
                first_round = Some((
                    snapshot.action.evidence_score,
                    snapshot.action.calibrated_confidence,
                    snapshot.action.exploitability,
                    snapshot.observation.outcome.clone(),
                ));
            }
            Ok(())
        })
        .await;

    let (score, calibrated, exploitability, outcome) = first_round.unwrap();
    assert_eq!(score, 0.5);
    assert!((calibrated - 0.79).abs() < 1e-9);
    assert_eq!(exploitability, Exploitability::Medium);
    assert_eq!(outcome, "confidence 0.79 below threshold 0.87");
    assert!(result.vulnerabilities.is_empty());
}

#[tokio::test]
async fn test_single_keyword_evidence_recorded_at_lower_threshold() {
    let (_provider, engine, contracts) = single_hit_scenario(0.78);
    let result = engine.analyze(&contracts).await;

    assert_eq!(result.vulnerabilities.len(), 1);
    let finding = &result.vulnerabilities[0];
    assert_eq!(finding.category, Category::Reentrancy);
    assert_eq!(finding.exploitability, Exploitability::Medium);
    assert_eq!(result.confidence, 0.79);
}

fn action_with_confidence(calibrated: f64) -> ActionResult {
    ActionResult {
        action: "trace withdraw".to_string(),
        category: Category::Reentrancy,
        severity: Severity::High,
        exploitability: Exploitability::High,
        target: Some("withdraw".to_string()),
        description: "external call before state update".to_string(),
        recommendation: None,
        evidence: "Vault:call{value => call{value: amount}".to_string(),
        evidence_score: 1.0,
        calibrated_confidence: calibrated,
    }
}

#[test]
fn test_just_below_threshold_is_rejected() {
    let contracts = Corpus::new();
    let mut state = LoopState::new(&contracts);
    let observation = observe(&mut state, &action_with_confidence(0.86999), 0.87);

    assert_eq!(observation.outcome, "confidence 0.86999 below threshold 0.87");
    assert_eq!(observation.confidence_delta, 0.0);
    assert!(state.findings().is_empty());
}

#[test]
fn test_threshold_is_inclusive() {
    let contracts = Corpus::new();
    let mut state = LoopState::new(&contracts);
    let observation = observe(&mut state, &action_with_confidence(0.87), 0.87);

    assert_eq!(observation.outcome, "recorded reentrancy (conf=0.87)");
    assert_eq!(state.findings().len(), 1);
    assert_eq!(state.global_confidence(), 0.87);
}

// ============================================================================
// Merge by Similarity (Scenario C)
// ============================================================================

#[tokio::test]
async fn test_related_targets_merge_into_one_finding() {
    let provider = Arc::new(ScriptedProvider::new(
        vec![
            Reply::json(json!({
                "reasoning": "withdraw is missing the onlyOwner guard",
                "action": "trace withdraw",
                "target": "withdraw",
                "category": "access-control-bypass",
                "confidence": 0.8
            })),
            Reply::json(json!({
                "reasoning": "withdrawAll is unguarded as well",
                "action": "trace withdrawAll",
                "target": "withdrawAll",
                "category": "access-control-bypass",
                "confidence": 0.85,
                "proposed_fix": "restrict both withdrawals with onlyOwner"
            })),
        ],
        quiet_reply(),
    ));
    let engine = backend_engine(provider, settings(Some(25), 0.87));

    let mut outcomes = Vec::new();
    let result = engine
        .analyze_with_progress(&corpus("Vault", OWNED_VAULT), |_, snapshot| {
            outcomes.push((snapshot.observation.outcome.clone(), snapshot.observation.confidence_delta));
            Ok(())
        })
        .await;

    assert_eq!(result.vulnerabilities.len(), 1);
    let finding = &result.vulnerabilities[0];
    assert_eq!(finding.category, Category::AccessControlBypass);
    assert_eq!(finding.target.as_deref(), Some("withdraw"));
    assert_eq!(finding.round_detected, 1);
    // 0.88 pulled toward 0.91, plus the merge bias.
    let expected = 0.88 + (0.91 - 0.88) * 0.6 + 0.05;
    assert!((finding.confidence - expected).abs() < 1e-9);
    assert_eq!(
        finding.recommendation.as_deref(),
        Some("restrict both withdrawals with onlyOwner")
    );
    assert_eq!(result.confidence, 0.948);

    assert_eq!(outcomes[0].0, "recorded access-control-bypass (conf=0.88)");
    assert_eq!(outcomes[0].1, 0.0);
    assert_eq!(outcomes[1].0, "reinforced access-control-bypass (conf=0.95)");
    assert!((outcomes[1].1 - (expected - 0.88)).abs() < 1e-9);
}

#[tokio::test]
async fn test_unrelated_targets_stay_separate() {
    let provider = Arc::new(ScriptedProvider::new(
        vec![
            Reply::json(json!({"target": "withdraw", "category": "reentrancy", "confidence": 0.9})),
            Reply::json(json!({"target": "deposit", "category": "reentrancy", "confidence": 0.9})),
        ],
        quiet_reply(),
    ));
    let engine = backend_engine(provider, settings(Some(25), 0.87));
    let result = engine.analyze(&corpus("Vault", REENTRANT_VAULT)).await;

    let targets: Vec<_> = result
        .vulnerabilities
        .iter()
        .map(|f| f.target.as_deref())
        .collect();
    assert_eq!(targets, vec![Some("withdraw"), Some("deposit")]);
    assert_eq!(result.vulnerabilities[0].description, "Potential reentrancy");
}
