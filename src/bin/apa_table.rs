//! APA-style descriptive table (N, M, SD) in Markdown and LaTeX
//!
//! # Usage
//!
//! ```bash
//! apa-table study.csv --out table.md --to-tex table.tex
//! ```

use anyhow::Context;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use trueno_stats::dataset::Dataset;
use trueno_stats::logging::LogConfig;
use trueno_stats::report::{ApaTable, DEFAULT_MARKDOWN_FILE};

/// Generate an APA-style descriptive table
#[derive(Parser, Debug)]
#[command(name = "apa-table")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Dataset (CSV with header row, or .parquet)
    dataset: PathBuf,

    /// Markdown output file
    #[arg(long, default_value = DEFAULT_MARKDOWN_FILE)]
    out: PathBuf,

    /// LaTeX output file
    #[arg(long)]
    to_tex: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
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
    let dataset = Dataset::load(&cli.dataset)?;
    let table = ApaTable::from_dataset(&dataset)?;

    fs::write(&cli.out, table.to_markdown())
        .with_context(|| format!("writing {}", cli.out.display()))?;
    tracing::info!(path = %cli.out.display(), rows = table.rows().len(), "APA table saved");

    if let Some(tex) = &cli.to_tex {
        fs::write(tex, table.to_latex()).with_context(|| format!("writing {}", tex.display()))?;
        tracing::info!(path = %tex.display(), "LaTeX table saved");
    }
    Ok(())
}
