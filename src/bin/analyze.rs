//! Descriptive, regression and survival analysis of a tabular dataset
//!
//! # Usage
//!
//! ```bash
//! analyze study.csv --outcome y --predictors x1 x2
//! analyze study.csv --outcome time --predictors age dose --event died --outdir out/
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use trueno_stats::analyze::{AnalysisRequest, Analyzer, ModelArtifact, DEFAULT_LOG_FILE, DEFAULT_OUTDIR};
use trueno_stats::logging::LogConfig;

/// Descriptive statistics, correlation matrix and one fitted model
/// (Cox if --event is given, else logistic for a 0/1 outcome, else OLS)
#[derive(Parser, Debug)]
#[command(name = "analyze")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Dataset (CSV with header row, or .parquet)
    dataset: PathBuf,

    /// Outcome column (duration column when --event is given)
    #[arg(long)]
    outcome: String,

    /// Predictor columns
    #[arg(long, required = true, num_args = 1..)]
    predictors: Vec<String>,

    /// Event indicator column; selects the Cox proportional-hazards model
    #[arg(long)]
    event: Option<String>,

    /// Output directory
    #[arg(long, default_value = DEFAULT_OUTDIR)]
    outdir: PathBuf,

    /// Log file (appended to)
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log: PathBuf,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LogConfig::new()
        .with_level(LogConfig::level_from_verbosity(cli.verbose))
        .with_file(&cli.log);
    if let Err(e) = logging.init() {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut request = AnalysisRequest::new(&cli.outcome, cli.predictors.clone());
    if let Some(event) = &cli.event {
        request = request.with_event(event);
    }

    let analyzer = Analyzer::new(&cli.outdir);
    let report = analyzer
        .run_path(&cli.dataset, &request)
        .with_context(|| format!("analysis of {} failed", cli.dataset.display()))?;

    match &report.model_summary {
        ModelArtifact::Written { path } => {
            tracing::info!(model = ?report.model, path = %path.display(), "model summary written");
        }
        ModelArtifact::Skipped { reason } => {
            tracing::warn!(model = ?report.model, reason = %reason, "model summary not written");
        }
    }
    tracing::debug!(report = %serde_json::to_string(&report)?, "analysis report");
    Ok(())
}
