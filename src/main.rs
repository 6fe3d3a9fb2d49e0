//! Contract Auditor command-line entry point.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueHint};
use tracing::{debug, error, info};

use contract_auditor::config::{AuditorConfig, BackendKind};
use contract_auditor::pipeline::{AuditRequest, Auditor};

#[derive(Parser)]
#[command(name = "contract-auditor")]
#[command(about = "Reasoning-loop security auditor for Solidity smart contracts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output mode
    #[arg(long, short, global = true, help_heading = "Global")]
    verbose: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(
        long,
        global = true,
        env = "CONTRACT_AUDITOR_CONFIG",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        help_heading = "Global"
    )]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit contracts and print the JSON report
    Audit {
        /// Solidity sources or JSON artifact corpora
        #[arg(required = true, value_name = "CONTRACT", value_hint = ValueHint::FilePath)]
        contracts: Vec<PathBuf>,

        /// Rule-based detector findings (JSON) to merge into the report
        #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
        rules: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(short, long, value_name = "PATH", value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Loop rounds, clamped to 25..=27
        #[arg(long, value_name = "N")]
        rounds: Option<u32>,

        /// Calibrated confidence a finding needs to be recorded
        #[arg(long, value_name = "F")]
        min_confidence: Option<f64>,

        /// Ignore rule-based findings even when a rules file is given
        #[arg(long)]
        no_rules: bool,

        /// Reason heuristically without contacting a backend
        #[arg(long)]
        offline: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AuditorConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Audit {
            contracts,
            rules,
            output,
            rounds,
            min_confidence,
            no_rules,
            offline,
        } => {
            if rounds.is_some() {
                config.audit.max_rounds = rounds;
            }
            if let Some(min_confidence) = min_confidence {
                config.audit.min_confidence = min_confidence;
            }
            if no_rules {
                config.audit.use_rules = false;
            }
            if offline {
                config.llm.provider = BackendKind::None;
            }

            let auditor = Auditor::new(config)?;
            let request = AuditRequest {
                contract_paths: contracts,
                rules_path: rules,
            };
            let report = auditor
                .audit_with_progress(&request, |state, snapshot| {
                    debug!(
                        round = snapshot.round,
                        outcome = %snapshot.observation.outcome,
                        findings = state.findings().len(),
                        "[Audit] round observed"
                    );
                    Ok(())
                })
                .await?;

            let json = serde_json::to_string_pretty(&report)?;
            match output {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("failed to write report to {}", path.display()))?;
                    info!(path = %path.display(), "[Audit] report written");
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}
