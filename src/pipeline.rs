//! Audit Pipeline
//!
//! Load artifacts → load rule-based findings → run the loop → merge → report.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contract_auditor_core::{Corpus, FindingRecord};
use contract_auditor_llm::{create_provider, LlmProvider};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::AuditorConfig;
use crate::engine::{EngineSettings, LoopState, ReActEngine, RoundSnapshot};
use crate::merge::merge_findings;
use crate::report::{AuditReport, ReportMetadata};
use crate::source::SourceOutliner;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::artifact_name;

/// What to audit.
#[derive(Debug, Clone, Default)]
pub struct AuditRequest {
    /// Solidity sources (one artifact each) or JSON corpus files.
    pub contract_paths: Vec<PathBuf>,
    /// Rule-based detector output to merge with the loop's findings.
    pub rules_path: Option<PathBuf>,
}

pub struct Auditor {
    config: AuditorConfig,
    provider: Option<Arc<dyn LlmProvider>>,
    outliner: SourceOutliner,
}

impl Auditor {
    /// Build an auditor with the backend named in the configuration.
    pub fn new(config: AuditorConfig) -> AppResult<Self> {
        let provider = match config.llm.provider_config() {
            Some(provider_config) => Some(create_provider(provider_config)?),
            None => None,
        };
        Self::with_provider(config, provider)
    }

    /// Build an auditor around an explicit backend (or none).
    pub fn with_provider(
        config: AuditorConfig,
        provider: Option<Arc<dyn LlmProvider>>,
    ) -> AppResult<Self> {
        config.validate().map_err(AppError::config)?;
        Ok(Self {
            config,
            provider,
            outliner: SourceOutliner::new()?,
        })
    }

    pub fn config(&self) -> &AuditorConfig {
        &self.config
    }

    fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_rounds: self.config.audit.max_rounds,
            min_confidence: self.config.audit.min_confidence,
        }
    }

    /// Engine for this run. An unreachable backend is replaced by the heuristic.
    async fn build_engine(&self) -> ReActEngine {
        let settings = self.engine_settings();
        let Some(provider) = &self.provider else {
            warn!("[Audit] no reasoning backend configured, using heuristic reasoning");
            return ReActEngine::heuristic(settings);
        };

        if let Err(e) = provider.health_check().await {
            warn!(
                provider = provider.name(),
                error = %e,
                "[Audit] reasoning backend unavailable, using heuristic reasoning"
            );
            return ReActEngine::heuristic(settings);
        }

        ReActEngine::with_backend(
            Arc::clone(provider),
            self.config.llm.generation_options(),
            Duration::from_secs(self.config.llm.timeout_secs),
            settings,
        )
    }

    /// Read every input into one ordered corpus.
    pub fn load_corpus(&self, paths: &[PathBuf]) -> AppResult<Corpus> {
        if paths.is_empty() {
            return Err(AppError::validation("no contract files given"));
        }

        let mut corpus = Corpus::new();
        for path in paths {
            let content = read_input(path)?;

            if is_json(path) {
                let loaded = Corpus::from_json_str(&content).map_err(|e| {
                    AppError::input(format!("{} is not a valid corpus: {}", path.display(), e))
                })?;
                for (name, artifact) in loaded.iter() {
                    corpus.insert(name, artifact.clone());
                }
            } else {
                let name = artifact_name(path);
                let record = self.outliner.outline(&name, &content);
                corpus.insert(name, record);
            }
        }
        Ok(corpus)
    }

    /// Read rule-based findings: a JSON list, or an object holding one under
    /// `findings` or `vulnerabilities`.
    pub fn load_rule_findings(path: &Path) -> AppResult<Vec<FindingRecord>> {
        let content = read_input(path)?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| AppError::input(format!("{}: {}", path.display(), e)))?;

        let list = match value {
            Value::Array(_) => value,
            Value::Object(mut map) => map
                .remove("findings")
                .or_else(|| map.remove("vulnerabilities"))
                .filter(Value::is_array)
                .ok_or_else(|| {
                    AppError::input(format!(
                        "{}: expected a list of findings or an object with a 'findings' list",
                        path.display()
                    ))
                })?,
            _ => {
                return Err(AppError::input(format!(
                    "{}: expected a list of findings",
                    path.display()
                )))
            }
        };

        serde_json::from_value(list)
            .map_err(|e| AppError::input(format!("{}: malformed finding: {}", path.display(), e)))
    }

    pub async fn audit(&self, request: &AuditRequest) -> AppResult<AuditReport> {
        self.audit_with_progress(request, |_, _| Ok(())).await
    }

    /// Run the full pipeline, reporting each loop round to `progress`.
    ///
    /// Failures are logged with the inputs involved, then returned.
    pub async fn audit_with_progress<F>(
        &self,
        request: &AuditRequest,
        progress: F,
    ) -> AppResult<AuditReport>
    where
        F: FnMut(&LoopState<'_>, &RoundSnapshot<'_>) -> anyhow::Result<()> + Send,
    {
        match self.run(request, progress).await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(
                    contracts = ?request.contract_paths,
                    rules = ?request.rules_path,
                    error = %e,
                    "[Audit] audit failed"
                );
                Err(e)
            }
        }
    }

    async fn run<F>(&self, request: &AuditRequest, progress: F) -> AppResult<AuditReport>
    where
        F: FnMut(&LoopState<'_>, &RoundSnapshot<'_>) -> anyhow::Result<()> + Send,
    {
        let started = Instant::now();
        info!(files = request.contract_paths.len(), "[Audit] starting audit");

        let corpus = self.load_corpus(&request.contract_paths)?;
        info!(artifacts = corpus.len(), "[Audit] artifacts loaded");

        let rule_findings = match (&request.rules_path, self.config.audit.use_rules) {
            (Some(path), true) => {
                let findings = Self::load_rule_findings(path)?;
                info!(count = findings.len(), "[Audit] rule-based findings loaded");
                Some(findings)
            }
            (Some(_), false) => {
                info!("[Audit] rule-based findings disabled, skipping rules file");
                None
            }
            (None, _) => None,
        };

        let engine = self.build_engine().await;
        let analysis = engine.analyze_with_progress(&corpus, progress).await;

        let merged = merge_findings(
            rule_findings.as_deref().unwrap_or_default(),
            &analysis.vulnerabilities,
            &corpus,
        );

        let mut engine_label = format!("react:{}", engine.reasoner_name());
        if rule_findings.is_some() {
            engine_label.push_str(" + rules");
        }
        let metadata = ReportMetadata::new(
            request
                .contract_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            engine_label,
            started.elapsed().as_secs_f64(),
            engine.usage().total_tokens(),
        );

        let report = AuditReport::new(metadata, &corpus, merged, &analysis);
        report.log_summary();
        info!(
            findings = report.summary.total,
            seconds = report.metadata.duration_seconds,
            "[Audit] audit complete"
        );
        Ok(report)
    }
}

fn read_input(path: &Path) -> AppResult<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AppError::not_found(path.display().to_string()),
        _ => AppError::input(format!("cannot read {}: {}", path.display(), e)),
    })
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
