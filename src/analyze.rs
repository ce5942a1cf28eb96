//! Descriptive / regression / survival analyzer
//!
//! Pipeline (single pass):
//! 1. `descriptive_stats.csv`: one row per dataset column
//! 2. `correlation_matrix.csv`: Pearson over numeric columns
//! 3. exactly one model summary, chosen by [`select_model`]
//!
//! Steps 1 and 2 depend only on the dataset and always run first; the
//! request's column names are validated afterwards, when the model is
//! fitted. A failed fit therefore never takes the first two artifacts with
//! it.

use crate::dataset::Dataset;
use crate::describe::{correlation_matrix, describe, summaries_to_record_batch};
use crate::models::{select_model, CoxSummary, LogitSummary, ModelChoice, OlsSummary};
use crate::output::{ensure_dir, write_csv, write_text};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use ndarray::{s, Array1, Array2};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Default output directory of the `analyze` binary
pub const DEFAULT_OUTDIR: &str = "analysis_output";

/// Default log file of the `analyze` binary
pub const DEFAULT_LOG_FILE: &str = "analyze_advanced.log";

/// Descriptive statistics artifact
pub const DESCRIPTIVE_STATS_FILE: &str = "descriptive_stats.csv";

/// Correlation matrix artifact
pub const CORRELATION_MATRIX_FILE: &str = "correlation_matrix.csv";

/// Columns the analysis should use
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    outcome: String,
    predictors: Vec<String>,
    event: Option<String>,
}

impl AnalysisRequest {
    /// Outcome (or duration, for survival) and predictor columns
    #[must_use]
    pub fn new(outcome: impl Into<String>, predictors: Vec<String>) -> Self {
        Self {
            outcome: outcome.into(),
            predictors,
            event: None,
        }
    }

    /// Event indicator column; selects the Cox model
    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Outcome column name
    #[must_use]
    pub fn outcome(&self) -> &str {
        &self.outcome
    }

    /// Predictor column names
    #[must_use]
    pub fn predictors(&self) -> &[String] {
        &self.predictors
    }

    /// Event column name, if any
    #[must_use]
    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    /// Check the request against the dataset
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] if no predictors were given
    /// - [`Error::ColumnNotFound`] for the first unknown column
    /// - [`Error::NonNumericColumn`] for the first non-numeric column
    pub fn validate(&self, dataset: &Dataset) -> Result<()> {
        if self.predictors.is_empty() {
            return Err(Error::InvalidInput("at least one predictor is required".to_string()));
        }
        let columns = self.model_columns();
        for name in &columns {
            dataset.column(name)?;
        }
        dataset.require_numeric(&columns)
    }

    /// Outcome, then event (if any), then predictors
    fn model_columns(&self) -> Vec<&str> {
        std::iter::once(self.outcome.as_str())
            .chain(self.event.as_deref())
            .chain(self.predictors.iter().map(String::as_str))
            .collect()
    }
}

/// What happened to the model summary artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelArtifact {
    /// Summary written to `path`
    Written {
        /// Artifact location
        path: PathBuf,
    },
    /// Fit failed recoverably; no summary written
    Skipped {
        /// Logged reason
        reason: String,
    },
}

/// Outcome of one analyzer invocation
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Rows in the loaded dataset
    pub rows: usize,
    /// Columns in the loaded dataset
    pub columns: usize,
    /// Model branch taken
    pub model: ModelChoice,
    /// Descriptive statistics file
    pub descriptive_stats: PathBuf,
    /// Correlation matrix file
    pub correlation_matrix: PathBuf,
    /// Model summary file, or why it is missing
    pub model_summary: ModelArtifact,
    /// Completion time
    pub completed_at: DateTime<Utc>,
}

/// Runs the analysis pipeline into one output directory
#[derive(Debug, Clone)]
pub struct Analyzer {
    outdir: PathBuf,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(DEFAULT_OUTDIR)
    }
}

impl Analyzer {
    /// Analyzer writing into `outdir` (created on first run)
    #[must_use]
    pub fn new(outdir: impl Into<PathBuf>) -> Self {
        Self {
            outdir: outdir.into(),
        }
    }

    /// Output directory
    #[must_use]
    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    /// Load `path` and run the pipeline
    ///
    /// The output directory is only created once the dataset has loaded.
    ///
    /// # Errors
    /// [`Error::DatasetNotFound`] if `path` does not exist; otherwise see
    /// [`Analyzer::run`]
    pub fn run_path(&self, path: &Path, request: &AnalysisRequest) -> Result<AnalysisReport> {
        let dataset = Dataset::load(path)?;
        self.run(&dataset, request)
    }

    /// Run the pipeline on a loaded dataset
    ///
    /// # Errors
    /// Any fatal error after the descriptive artifacts; perfect separation
    /// is logged and reported as [`ModelArtifact::Skipped`] instead
    pub fn run(&self, dataset: &Dataset, request: &AnalysisRequest) -> Result<AnalysisReport> {
        ensure_dir(&self.outdir)?;

        tracing::info!(columns = dataset.num_columns(), "computing descriptive statistics");
        let summaries = describe(dataset)?;
        let descriptive_stats = write_csv(
            &summaries_to_record_batch(&summaries)?,
            &self.outdir.join(DESCRIPTIVE_STATS_FILE),
        )?;

        tracing::info!("computing correlation matrix");
        let correlation = correlation_matrix(dataset)?;
        let correlation_matrix = write_csv(
            &correlation.to_record_batch()?,
            &self.outdir.join(CORRELATION_MATRIX_FILE),
        )?;

        request.validate(dataset)?;
        let outcome = dataset.numeric_values(request.outcome())?;
        let model = select_model(request.event(), &outcome);
        tracing::info!(?model, outcome = request.outcome(), "fitting model");

        let model_summary = match self.fit_model(dataset, request, model) {
            Ok(path) => ModelArtifact::Written { path },
            Err(e) if e.is_recoverable() => {
                tracing::error!(error = %e, "model summary skipped");
                ModelArtifact::Skipped {
                    reason: e.to_string(),
                }
            }
            Err(e) => return Err(e),
        };

        Ok(AnalysisReport {
            rows: dataset.num_rows(),
            columns: dataset.num_columns(),
            model,
            descriptive_stats,
            correlation_matrix,
            model_summary,
            completed_at: Utc::now(),
        })
    }

    fn fit_model(&self, dataset: &Dataset, request: &AnalysisRequest, model: ModelChoice) -> Result<PathBuf> {
        let path = self.outdir.join(model.artifact_name());
        let columns = request.model_columns();
        let data = dataset.complete_cases(&columns)?;
        if data.nrows() == 0 {
            return Err(Error::InvalidInput(
                "no rows without missing values in the requested columns".to_string(),
            ));
        }

        match model {
            ModelChoice::Cox => {
                let durations = data.column(0).to_owned();
                let events: Vec<bool> = data.column(1).iter().map(|&v| v != 0.0).collect();
                let x = data.slice(s![.., 2..]).to_owned();
                let summary = CoxSummary::fit(&x, &durations, &events, request.predictors())?;
                tracing::info!(
                    n_obs = summary.n_obs,
                    n_events = summary.n_events,
                    concordance = summary.concordance,
                    "fitted Cox model"
                );
                write_csv(&summary.to_record_batch()?, &path)
            }
            ModelChoice::Logistic => {
                let (x, y) = split_outcome(&data);
                let summary = LogitSummary::fit(&x, &y, request.outcome(), request.predictors())?;
                tracing::info!(
                    n_obs = summary.n_obs,
                    pseudo_r_squared = summary.pseudo_r_squared,
                    "fitted logistic regression"
                );
                write_text(&summary.to_text(), &path)
            }
            ModelChoice::Linear => {
                let (x, y) = split_outcome(&data);
                let summary = OlsSummary::fit(&x, &y, request.outcome(), request.predictors())?;
                tracing::info!(
                    n_obs = summary.n_obs,
                    r_squared = summary.r_squared,
                    "fitted linear regression"
                );
                write_text(&summary.to_text(), &path)
            }
        }
    }
}

/// First column is the outcome, the rest are predictors
fn split_outcome(data: &Array2<f64>) -> (Array2<f64>, Array1<f64>) {
    let y = data.column(0).to_owned();
    let x = data.slice(s![.., 1..]).to_owned();
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::mixed_batch;

    #[test]
    fn test_request_builder() {
        let request = AnalysisRequest::new("time", vec!["age".into()]).with_event("died");
        assert_eq!(request.outcome(), "time");
        assert_eq!(request.event(), Some("died"));
        assert_eq!(request.model_columns(), vec!["time", "died", "age"]);
    }

    #[test]
    fn test_validate_unknown_column() {
        let dataset = Dataset::new(mixed_batch());
        let request = AnalysisRequest::new("age", vec!["missing".into()]);
        assert!(matches!(request.validate(&dataset), Err(Error::ColumnNotFound(_))));
    }

    #[test]
    fn test_validate_text_predictor() {
        let dataset = Dataset::new(mixed_batch());
        let request = AnalysisRequest::new("age", vec!["group".into()]);
        assert!(matches!(request.validate(&dataset), Err(Error::NonNumericColumn(_))));
    }

    #[test]
    fn test_validate_requires_predictors() {
        let dataset = Dataset::new(mixed_batch());
        let request = AnalysisRequest::new("age", vec![]);
        assert!(matches!(request.validate(&dataset), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_bad_predictor_keeps_descriptive_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = Analyzer::new(dir.path().join("out"));
        let dataset = Dataset::new(mixed_batch());
        let request = AnalysisRequest::new("score", vec!["nope".into()]);

        let err = analyzer.run(&dataset, &request).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(_)));
        assert!(analyzer.outdir().join(DESCRIPTIVE_STATS_FILE).exists());
        assert!(analyzer.outdir().join(CORRELATION_MATRIX_FILE).exists());
        assert!(!analyzer.outdir().join("linear_summary.txt").exists());
    }

    #[test]
    fn test_missing_dataset_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let outdir = dir.path().join("out");
        let analyzer = Analyzer::new(&outdir);
        let request = AnalysisRequest::new("y", vec!["x".into()]);

        let err = analyzer
            .run_path(&dir.path().join("absent.csv"), &request)
            .unwrap_err();
        assert!(matches!(err, Error::DatasetNotFound(_)));
        assert!(!outdir.exists());
    }
}
