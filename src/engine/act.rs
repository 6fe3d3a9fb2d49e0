//! Act Stage
//!
//! Checks a proposal against the corpus with a literal keyword scan and
//! blends the result into a calibrated confidence.

use contract_auditor_core::{Category, Corpus};

use super::reason::Proposal;
use super::state::ActionResult;

/// Characters of context kept on each side of a keyword hit.
const SNIPPET_WINDOW: usize = 80;

pub const NO_EVIDENCE: &str = "no direct evidence found yet";

/// Keyword hits for one category across the corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceScan {
    /// `"{artifact}:{keyword} => {snippet}"`, in artifact then keyword order.
    pub hits: Vec<String>,
    pub score: f64,
}

impl EvidenceScan {
    /// Pick the supporting snippet: the first hit mentioning the target if a
    /// target is named, else the first hit.
    pub fn best_evidence(&self, target: Option<&str>) -> Option<&str> {
        if let Some(target) = target.filter(|t| !t.is_empty()) {
            let needle = target.to_lowercase();
            if let Some(hit) = self
                .hits
                .iter()
                .find(|hit| hit.to_lowercase().contains(&needle))
            {
                return Some(hit);
            }
        }
        self.hits.first().map(String::as_str)
    }
}

/// Scans artifact sources for a category's keywords.
#[derive(Debug, Clone, Copy)]
pub struct EvidenceScanner<'a> {
    corpus: &'a Corpus,
}

impl<'a> EvidenceScanner<'a> {
    pub fn new(corpus: &'a Corpus) -> Self {
        Self { corpus }
    }

    /// First occurrence of each keyword in each artifact, case-insensitively.
    pub fn scan(&self, category: Category) -> EvidenceScan {
        let keywords = category.patterns();
        let mut hits = Vec::new();

        for (name, artifact) in self.corpus.iter() {
            let source = artifact.source_text();
            if source.is_empty() {
                continue;
            }
            // ASCII lowering keeps byte offsets aligned with `source`.
            let lowered = source.to_ascii_lowercase();
            for keyword in keywords {
                if let Some(idx) = lowered.find(&keyword.to_ascii_lowercase()) {
                    hits.push(format!("{}:{} => {}", name, keyword, snippet(&source, idx)));
                }
            }
        }

        let score = evidence_score(hits.len(), keywords.len());
        EvidenceScan { hits, score }
    }
}

/// `min(1, hits / max(1, keywords / 2))`
pub fn evidence_score(hits: usize, keyword_count: usize) -> f64 {
    let saturation = (keyword_count / 2).max(1);
    (hits as f64 / saturation as f64).min(1.0)
}

/// Blend a reasoner's confidence with the evidence score.
pub fn calibrate_confidence(base: f64, evidence_score: f64) -> f64 {
    (base * 0.6 + 0.3 * evidence_score + 0.1).min(1.0)
}

/// Up to [`SNIPPET_WINDOW`] characters either side of `byte_idx`, on one line.
fn snippet(source: &str, byte_idx: usize) -> String {
    let center = source[..byte_idx].chars().count();
    let start = center.saturating_sub(SNIPPET_WINDOW);
    source
        .chars()
        .skip(start)
        .take(center + SNIPPET_WINDOW - start)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Resolve the proposal's category.
///
/// An explicit but unknown label resolves to access-control bypass; with no
/// label the action text decides.
pub fn resolve_category(proposal: &Proposal) -> Category {
    match proposal.category.as_deref() {
        Some(label) => Category::from_label(label).unwrap_or(Category::AccessControlBypass),
        None => Category::infer_from_action(&proposal.action),
    }
}

/// Run the act stage for one proposal.
pub fn act(corpus: &Corpus, proposal: &Proposal) -> ActionResult {
    let category = resolve_category(proposal);
    let defaults = category.defaults();

    let scan = EvidenceScanner::new(corpus).scan(category);
    let evidence = scan
        .best_evidence(proposal.target.as_deref())
        .unwrap_or(NO_EVIDENCE)
        .to_string();

    let exploitability = proposal
        .exploitability
        .unwrap_or(defaults.exploitability)
        .calibrate(scan.score);

    let action = if proposal.action.is_empty() {
        format!("inspect {}", category)
    } else {
        proposal.action.clone()
    };
    let description = if proposal.reasoning.is_empty() {
        format!("Potential {}", category)
    } else {
        proposal.reasoning.clone()
    };

    ActionResult {
        action,
        category,
        severity: proposal.severity.unwrap_or(defaults.severity),
        exploitability,
        target: proposal.target.clone(),
        description,
        recommendation: proposal.proposed_fix.clone(),
        evidence,
        evidence_score: scan.score,
        calibrated_confidence: calibrate_confidence(proposal.confidence, scan.score),
    }
}
