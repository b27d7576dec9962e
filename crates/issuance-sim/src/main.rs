//! `issuance-sim`: replay a JSON scenario against the exchange issuance
//! engine and print a report of outcomes, final balances and events.
//!
//! ```text
//! issuance-sim scenarios/issue_and_redeem.json --log-level debug
//! issuance-sim my.json --policy reference-floor --report out.json --json-logs
//! ```
//!
//! Exits non-zero if any step's outcome differs from its expectation.

mod logging;
mod runner;
mod scenario;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use issuance_types::{Result, SettlementPolicy};

use crate::logging::setup_logging;
use crate::runner::Report;
use crate::scenario::Scenario;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay an exchange issuance scenario")]
struct Cli {
    /// Scenario JSON file.
    scenario: PathBuf,

    /// Log level, or a full filter directive string.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Write the report here instead of stdout.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Override the scenario's settlement policy.
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    MaxObtainable,
    ReferenceFloor,
}

impl From<PolicyArg> for SettlementPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::MaxObtainable => Self::MaxObtainable,
            PolicyArg::ReferenceFloor => Self::ReferenceFloor,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level, cli.json_logs);

    match execute(&cli) {
        Ok(report) if report.all_matched() => {
            tracing::info!(steps = report.steps.len(), "Scenario passed");
            ExitCode::SUCCESS
        }
        Ok(report) => {
            tracing::error!(failed = report.mismatches(), "Scenario expectations not met");
            ExitCode::FAILURE
        }
        Err(err) => {
            tracing::error!(error = %err, "Scenario aborted");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> Result<Report> {
    let mut scenario = Scenario::load(&cli.scenario)?;
    if let Some(policy) = cli.policy {
        scenario.config.settlement_policy = policy.into();
    }
    let report = runner::run(&scenario)?;
    let json = serde_json::to_string_pretty(&report)?;
    match &cli.report {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!(path = %path.display(), "Report written");
        }
        None => println!("{json}"),
    }
    Ok(report)
}
