//! Loop State
//!
//! Per-invocation state of the reasoning loop and the records it emits.

use std::collections::VecDeque;

use contract_auditor_core::{
    round4, Category, Corpus, Exploitability, Finding, Severity,
};
use serde::Serialize;

use super::observe::FindingStore;
use super::reason::Proposal;

/// Number of history entries kept in the state and shown to the reasoner.
pub const HISTORY_LIMIT: usize = 5;

/// One line of loop history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub round: u32,
    pub reasoning: String,
    pub action: String,
    /// Outcome text of the round's observation.
    pub observation: String,
}

/// What the observe stage concluded for one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub action: String,
    pub outcome: String,
    pub evidence: Option<String>,
    /// Change in the matched finding's stored confidence caused by this round.
    pub confidence_delta: f64,
}

/// Output of the act stage: the proposal checked against the corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub action: String,
    pub category: Category,
    pub severity: Severity,
    pub exploitability: Exploitability,
    pub target: Option<String>,
    pub description: String,
    pub recommendation: Option<String>,
    pub evidence: String,
    pub evidence_score: f64,
    pub calibrated_confidence: f64,
}

/// Everything that happened in one round, handed to progress callbacks.
#[derive(Debug, Clone, Serialize)]
pub struct RoundSnapshot<'r> {
    pub round: u32,
    pub proposal: &'r Proposal,
    pub action: &'r ActionResult,
    pub observation: &'r Observation,
    pub history_entry: &'r HistoryEntry,
}

/// Mutable state owned by a single `analyze` call.
#[derive(Debug)]
pub struct LoopState<'a> {
    contracts: &'a Corpus,
    round: u32,
    pub(crate) findings: FindingStore,
    global_confidence: f64,
    history: VecDeque<HistoryEntry>,
}

impl<'a> LoopState<'a> {
    pub fn new(contracts: &'a Corpus) -> Self {
        Self {
            contracts,
            round: 0,
            findings: FindingStore::default(),
            global_confidence: 0.0,
            history: VecDeque::with_capacity(HISTORY_LIMIT + 1),
        }
    }

    pub fn contracts(&self) -> &'a Corpus {
        self.contracts
    }

    /// Current 1-based round; 0 before the first round starts.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn findings(&self) -> &[Finding] {
        self.findings.as_slice()
    }

    /// Highest stored finding confidence so far.
    pub fn global_confidence(&self) -> f64 {
        self.global_confidence
    }

    /// Retained history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub(crate) fn begin_round(&mut self) -> u32 {
        self.round += 1;
        self.round
    }

    pub(crate) fn raise_confidence(&mut self, confidence: f64) {
        self.global_confidence = self.global_confidence.max(confidence);
    }

    /// Append an entry, dropping the oldest beyond [`HISTORY_LIMIT`].
    pub(crate) fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push_back(entry);
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    pub(crate) fn into_result(self) -> AnalysisResult {
        AnalysisResult {
            rounds: self.round,
            confidence: round4(self.global_confidence),
            vulnerabilities: self.findings.into_vec(),
            history: self.history.into_iter().collect(),
        }
    }
}

/// Result record returned by the loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub rounds: u32,
    pub confidence: f64,
    pub vulnerabilities: Vec<Finding>,
    pub history: Vec<HistoryEntry>,
}
