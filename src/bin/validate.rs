//! K-fold cross-validation and diagnostic plots
//!
//! # Usage
//!
//! ```bash
//! validate study.csv --outcome y --predictors x1 x2
//! validate study.csv --outcome passed --predictors hours --model logistic --folds 10
//! ```

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use trueno_stats::logging::LogConfig;
use trueno_stats::validate::{
    EvaluationConfig, Evaluator, ModelKind, DEFAULT_FOLDS, DEFAULT_OUTDIR, DEFAULT_SEED,
};

/// Cross-validated linear or logistic model with diagnostic plots
#[derive(Parser, Debug)]
#[command(name = "validate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Dataset (CSV with header row, or .parquet)
    dataset: PathBuf,

    /// Outcome column
    #[arg(long)]
    outcome: String,

    /// Predictor columns
    #[arg(long, required = true, num_args = 1..)]
    predictors: Vec<String>,

    /// Model family
    #[arg(long, value_enum, default_value_t = ModelArg::Linear)]
    model: ModelArg,

    /// Number of folds
    #[arg(long, default_value_t = DEFAULT_FOLDS)]
    folds: usize,

    /// Shuffle seed
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Output directory
    #[arg(long, default_value = DEFAULT_OUTDIR)]
    outdir: PathBuf,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum ModelArg {
    /// Least squares, scored by RMSE
    Linear,
    /// Logistic regression, scored by accuracy
    Logistic,
}

impl From<ModelArg> for ModelKind {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Linear => Self::Linear,
            ModelArg::Logistic => Self::Logistic,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LogConfig::new().with_level(LogConfig::level_from_verbosity(cli.verbose));
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
    let config = EvaluationConfig::new(&cli.outcome, cli.predictors.clone())
        .model(cli.model.into())
        .folds(cli.folds)
        .seed(cli.seed);

    let report = Evaluator::new(&cli.outdir)
        .run_path(&cli.dataset, &config)
        .with_context(|| format!("validation of {} failed", cli.dataset.display()))?;

    let cv = &report.cross_validation;
    for (i, score) in cv.scores.iter().enumerate() {
        tracing::info!(fold = i + 1, metric = cv.model.metric(), score, "fold score");
    }
    tracing::info!(
        metric = cv.model.metric(),
        mean = cv.mean(),
        results = %report.cv_results.display(),
        "validation complete"
    );
    Ok(())
}
