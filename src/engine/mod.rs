//! Reasoning Engine
//!
//! Bounded Reason → Act → Observe loop over a contract corpus.
//!
//! ## Module Organization
//!
//! - `state` - Per-call loop state, history entries, observations, result record
//! - `prompt` - Prompt construction for backend reasoning
//! - `reason` - `Reasoner` trait with backend and heuristic implementations
//! - `act` - Keyword evidence scan and confidence calibration
//! - `observe` - Threshold check and the merge-by-similarity finding store

pub mod act;
pub mod observe;
pub mod prompt;
pub mod reason;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use contract_auditor_core::Corpus;
use contract_auditor_llm::{GenerationOptions, LlmProvider, UsageStats};
use tracing::{info, warn};

pub use act::{act, calibrate_confidence, evidence_score, EvidenceScan, EvidenceScanner};
pub use observe::{merge_confidence, observe, same_target, FindingStore};
pub use reason::{BackendReasoner, HeuristicReasoner, Proposal, ReasonError, Reasoner};
pub use state::{
    ActionResult, AnalysisResult, HistoryEntry, LoopState, Observation, RoundSnapshot,
};

/// Round count when none is requested.
pub const DEFAULT_ROUNDS: u32 = 27;
/// Fewest rounds the engine will run.
pub const MIN_ROUNDS: u32 = 25;
/// Most rounds the engine will run.
pub const MAX_ROUNDS: u32 = 27;
/// Calibrated confidence a candidate needs to be recorded.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.87;

/// Per-round progress callback. Errors are logged and otherwise ignored.
pub type ProgressFn<'c> =
    dyn FnMut(&LoopState<'_>, &RoundSnapshot<'_>) -> anyhow::Result<()> + Send + 'c;

/// Clamp a requested round count into `[MIN_ROUNDS, MAX_ROUNDS]`.
pub fn determine_rounds(requested: Option<u32>) -> u32 {
    match requested {
        None => DEFAULT_ROUNDS,
        Some(rounds) if rounds < MIN_ROUNDS => {
            warn!(
                requested = rounds,
                clamped = MIN_ROUNDS,
                "[ReAct] max_rounds below supported range, raising"
            );
            MIN_ROUNDS
        }
        Some(rounds) if rounds > MAX_ROUNDS => {
            warn!(
                requested = rounds,
                clamped = MAX_ROUNDS,
                "[ReAct] max_rounds above supported range, lowering"
            );
            MAX_ROUNDS
        }
        Some(rounds) => rounds,
    }
}

/// Loop tuning fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub max_rounds: Option<u32>,
    pub min_confidence: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_rounds: None,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

/// The round controller.
pub struct ReActEngine {
    reasoner: Box<dyn Reasoner>,
    rounds: u32,
    min_confidence: f64,
}

impl ReActEngine {
    pub fn new(reasoner: Box<dyn Reasoner>, settings: EngineSettings) -> Self {
        Self {
            reasoner,
            rounds: determine_rounds(settings.max_rounds),
            min_confidence: settings.min_confidence,
        }
    }

    /// Engine that reasons heuristically only.
    pub fn heuristic(settings: EngineSettings) -> Self {
        Self::new(Box::new(HeuristicReasoner), settings)
    }

    /// Engine that prompts `provider` each round, with a per-call timeout.
    pub fn with_backend(
        provider: Arc<dyn LlmProvider>,
        options: GenerationOptions,
        timeout: Duration,
        settings: EngineSettings,
    ) -> Self {
        Self::new(
            Box::new(BackendReasoner::new(provider, options, timeout)),
            settings,
        )
    }

    /// Rounds every `analyze` call will execute.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn reasoner_name(&self) -> &'static str {
        self.reasoner.name()
    }

    /// Tokens consumed by the reasoner across all calls.
    pub fn usage(&self) -> UsageStats {
        self.reasoner.usage()
    }

    pub async fn analyze(&self, contracts: &Corpus) -> AnalysisResult {
        self.run(contracts, None).await
    }

    /// Like [`analyze`](Self::analyze), reporting each completed round.
    pub async fn analyze_with_progress<F>(&self, contracts: &Corpus, mut progress: F) -> AnalysisResult
    where
        F: FnMut(&LoopState<'_>, &RoundSnapshot<'_>) -> anyhow::Result<()> + Send,
    {
        self.run(contracts, Some(&mut progress)).await
    }

    async fn run(
        &self,
        contracts: &Corpus,
        mut progress: Option<&mut ProgressFn<'_>>,
    ) -> AnalysisResult {
        let mut state = LoopState::new(contracts);
        info!(
            rounds = self.rounds,
            artifacts = contracts.len(),
            reasoner = self.reasoner.name(),
            "[ReAct] starting analysis"
        );

        for _ in 0..self.rounds {
            let round = state.begin_round();
            info!(round, total = self.rounds, "[ReAct] round");

            let proposal = self.reason(&state).await;
            let action = act(state.contracts(), &proposal);
            let observation = observe(&mut state, &action, self.min_confidence);

            let entry = HistoryEntry {
                round,
                reasoning: proposal.reasoning.clone(),
                action: action.action.clone(),
                observation: observation.outcome.clone(),
            };
            state.push_history(entry.clone());

            if let Some(callback) = progress.as_deref_mut() {
                let snapshot = RoundSnapshot {
                    round,
                    proposal: &proposal,
                    action: &action,
                    observation: &observation,
                    history_entry: &entry,
                };
                if let Err(e) = callback(&state, &snapshot) {
                    warn!(round, error = %e, "[ReAct] progress callback failed");
                }
            }
        }

        let result = state.into_result();
        info!(
            rounds = result.rounds,
            findings = result.vulnerabilities.len(),
            confidence = result.confidence,
            "[ReAct] analysis complete"
        );
        result
    }

    /// Ask the configured reasoner; fall back to the heuristic on any failure.
    async fn reason(&self, state: &LoopState<'_>) -> Proposal {
        match self.reasoner.propose(state).await {
            Ok(proposal) => proposal,
            Err(e) => {
                warn!(
                    round = state.round(),
                    reasoner = self.reasoner.name(),
                    error = %e,
                    "[ReAct] reasoning failed, using heuristic fallback"
                );
                HeuristicReasoner::proposal_for(state.round())
            }
        }
    }
}
