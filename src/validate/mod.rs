//! Cross-validated model evaluation
//!
//! ```text
//! dataset ─► FoldPartition (seeded) ─► per fold: fit on k-1, score on 1 ─► cv_results.csv
//!        └─► fit on all rows ─► actual_vs_predicted.png, predicted_dist.png
//! ```
//!
//! Scores: RMSE for linear models, accuracy for logistic models. The linear
//! scorer works in negative mean squared error and reports `sqrt(-score)`,
//! so a reported RMSE is never negative.

mod folds;
pub mod plot;

pub use folds::FoldPartition;

use crate::dataset::Dataset;
use crate::linalg::{take, take_rows};
use crate::models::{classify_outcome, LinearRegression, OutcomeKind, RidgeLogistic};
use crate::output::{ensure_dir, write_csv};
use crate::{Error, Result};
use arrow::array::{ArrayRef, Float64Array, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Default number of folds
pub const DEFAULT_FOLDS: usize = 5;

/// Default shuffle seed
pub const DEFAULT_SEED: u64 = 42;

/// Default output directory of the `validate` binary
pub const DEFAULT_OUTDIR: &str = "validation_output";

/// Per-fold scores artifact
pub const CV_RESULTS_FILE: &str = "cv_results.csv";

/// Scatter plot artifact
pub const SCATTER_FILE: &str = "actual_vs_predicted.png";

/// Histogram artifact
pub const HISTOGRAM_FILE: &str = "predicted_dist.png";

const HISTOGRAM_BINS: usize = 10;

/// Inverse regularisation strength of the logistic evaluator
const LOGISTIC_C: f64 = 1.0;

/// Model family to evaluate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Least-squares linear regression, scored by RMSE
    #[default]
    Linear,
    /// L2-penalised logistic regression, scored by accuracy
    Logistic,
}

impl ModelKind {
    /// Name of the per-fold score
    #[must_use]
    pub const fn metric(self) -> &'static str {
        match self {
            Self::Linear => "rmse",
            Self::Logistic => "accuracy",
        }
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "logistic" => Ok(Self::Logistic),
            other => Err(Error::InvalidInput(format!(
                "unknown model '{other}' (expected linear or logistic)"
            ))),
        }
    }
}

/// Evaluation settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationConfig {
    outcome: String,
    predictors: Vec<String>,
    model: ModelKind,
    folds: usize,
    seed: u64,
}

impl EvaluationConfig {
    /// Linear model, 5 folds, seed 42
    #[must_use]
    pub fn new(outcome: impl Into<String>, predictors: Vec<String>) -> Self {
        Self {
            outcome: outcome.into(),
            predictors,
            model: ModelKind::default(),
            folds: DEFAULT_FOLDS,
            seed: DEFAULT_SEED,
        }
    }

    /// Set the model family
    #[must_use]
    pub const fn model(mut self, model: ModelKind) -> Self {
        self.model = model;
        self
    }

    /// Set the number of folds
    #[must_use]
    pub const fn folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    /// Set the shuffle seed
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Model family
    #[must_use]
    pub const fn model_kind(&self) -> ModelKind {
        self.model
    }

    /// Number of folds
    #[must_use]
    pub const fn fold_count(&self) -> usize {
        self.folds
    }
}

/// A model fitted by the evaluator
enum Fitted {
    Linear(LinearRegression),
    Logistic(RidgeLogistic),
}

impl Fitted {
    fn fit(kind: ModelKind, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        match kind {
            ModelKind::Linear => Ok(Self::Linear(LinearRegression::fit(x, y)?)),
            ModelKind::Logistic => Ok(Self::Logistic(RidgeLogistic::fit(x, y, LOGISTIC_C)?)),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        match self {
            Self::Linear(m) => m.predict(x),
            Self::Logistic(m) => m.predict(x),
        }
    }

    /// Values for the distribution plot: class-1 probability or raw prediction
    fn distribution_values(&self, x: &Array2<f64>) -> Array1<f64> {
        match self {
            Self::Linear(m) => m.predict(x),
            Self::Logistic(m) => m.predict_proba(x),
        }
    }

    /// Score in "greater is better" form: negative MSE or accuracy
    #[allow(clippy::cast_precision_loss)]
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> f64 {
        let predicted = self.predict(x);
        let n = y.len() as f64;
        match self {
            Self::Linear(_) => {
                let residual = y - &predicted;
                -residual.dot(&residual) / n
            }
            Self::Logistic(_) => {
                let correct = predicted.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
                correct as f64 / n
            }
        }
    }
}

/// Convert a raw fold score to the reported metric
///
/// Linear scores arrive as negative MSE and are reported as RMSE.
#[must_use]
pub fn report_score(kind: ModelKind, raw: f64) -> f64 {
    match kind {
        ModelKind::Linear => (-raw).max(0.0).sqrt(),
        ModelKind::Logistic => raw,
    }
}

/// Per-fold scores in fold order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidation {
    /// Model family evaluated
    pub model: ModelKind,
    /// Reported score of fold i at index i - 1
    pub scores: Vec<f64>,
}

impl CrossValidation {
    /// Mean score over folds
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> f64 {
        self.scores.iter().sum::<f64>() / self.scores.len() as f64
    }

    /// One row, one `fold{i}` column per fold
    ///
    /// # Errors
    /// Returns error if the batch cannot be assembled
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let fields: Vec<Field> = (1..=self.scores.len())
            .map(|i| Field::new(format!("fold{i}"), DataType::Float64, false))
            .collect();
        let arrays: Vec<ArrayRef> = self
            .scores
            .iter()
            .map(|&s| Arc::new(Float64Array::from(vec![s])) as ArrayRef)
            .collect();
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }
}

/// Score `kind` on each fold of `partition`
///
/// # Errors
/// Returns error if any fold's fit fails
pub fn cross_validate(
    kind: ModelKind,
    x: &Array2<f64>,
    y: &Array1<f64>,
    partition: &FoldPartition,
) -> Result<CrossValidation> {
    let mut scores = Vec::with_capacity(partition.k());
    for (i, (train, test)) in partition.splits().enumerate() {
        let model = Fitted::fit(kind, &take_rows(x, &train), &take(y, &train))?;
        let raw = model.score(&take_rows(x, test), &take(y, test));
        let score = report_score(kind, raw);
        tracing::debug!(fold = i + 1, train = train.len(), test = test.len(), score, "scored fold");
        scores.push(score);
    }
    Ok(CrossValidation { model: kind, scores })
}

/// Outcome of one evaluator invocation
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    /// Per-fold scores
    pub cross_validation: CrossValidation,
    /// Scores file
    pub cv_results: PathBuf,
    /// Scatter plot file
    pub scatter: PathBuf,
    /// Histogram file
    pub histogram: PathBuf,
}

/// Runs cross-validation and diagnostics into one output directory
#[derive(Debug, Clone)]
pub struct Evaluator {
    outdir: PathBuf,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(DEFAULT_OUTDIR)
    }
}

impl Evaluator {
    /// Evaluator writing into `outdir` (created on first run)
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

    /// Load `path` and evaluate
    ///
    /// # Errors
    /// [`Error::DatasetNotFound`] if `path` does not exist; otherwise see
    /// [`Evaluator::run`]
    pub fn run_path(&self, path: &Path, config: &EvaluationConfig) -> Result<EvaluationReport> {
        let dataset = Dataset::load(path)?;
        self.run(&dataset, config)
    }

    /// Cross-validate, then fit on all rows and plot diagnostics
    ///
    /// # Errors
    /// - [`Error::MissingValues`] / [`Error::NonNumericColumn`] for unusable
    ///   columns (no imputation)
    /// - [`Error::InvalidInput`] for a logistic model on a non-binary outcome
    ///   or an impossible fold count
    /// - any fitting or writing failure
    pub fn run(&self, dataset: &Dataset, config: &EvaluationConfig) -> Result<EvaluationReport> {
        if config.predictors.is_empty() {
            return Err(Error::InvalidInput("at least one predictor is required".to_string()));
        }
        ensure_dir(&self.outdir)?;

        let predictors: Vec<&str> = config.predictors.iter().map(String::as_str).collect();
        let x = dataset.dense(&predictors)?;
        let y = dataset
            .dense(&[config.outcome.as_str()])?
            .column(0)
            .to_owned();

        if config.model == ModelKind::Logistic
            && classify_outcome(y.iter().map(|&v| Some(v))) != OutcomeKind::Binary
        {
            return Err(Error::InvalidInput(format!(
                "logistic evaluation needs a 0/1 outcome, '{}' has other values",
                config.outcome
            )));
        }

        let partition = FoldPartition::new(x.nrows(), config.folds, config.seed)?;
        tracing::info!(
            model = ?config.model,
            folds = partition.k(),
            rows = partition.n_rows(),
            seed = config.seed,
            "cross-validating"
        );

        let cross_validation = cross_validate(config.model, &x, &y, &partition)?;
        tracing::info!(
            metric = config.model.metric(),
            mean = cross_validation.mean(),
            "cross-validation complete"
        );
        let cv_results = write_csv(
            &cross_validation.to_record_batch()?,
            &self.outdir.join(CV_RESULTS_FILE),
        )?;

        let full = Fitted::fit(config.model, &x, &y)?;
        let predicted = full.predict(&x);
        let scatter = self.outdir.join(SCATTER_FILE);
        plot::actual_vs_predicted(&scatter, &y.to_vec(), &predicted.to_vec())?;

        let histogram = self.outdir.join(HISTOGRAM_FILE);
        plot::predicted_distribution(&histogram, &full.distribution_values(&x).to_vec(), HISTOGRAM_BINS)?;

        Ok(EvaluationReport {
            cross_validation,
            cv_results,
            scatter,
            histogram,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_report_score_rmse_from_negative_mse() {
        assert!((report_score(ModelKind::Linear, -4.0) - 2.0).abs() < 1e-12);
        assert_eq!(report_score(ModelKind::Linear, 0.0), 0.0);
        assert!((report_score(ModelKind::Logistic, 0.75) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_model_kind_parse() {
        assert_eq!("linear".parse::<ModelKind>().unwrap(), ModelKind::Linear);
        assert_eq!("Logistic".parse::<ModelKind>().unwrap(), ModelKind::Logistic);
        assert!("tree".parse::<ModelKind>().is_err());
    }

    #[test]
    fn test_config_builder_defaults() {
        let config = EvaluationConfig::new("y", vec!["x".into()]);
        assert_eq!(config.model_kind(), ModelKind::Linear);
        assert_eq!(config.fold_count(), DEFAULT_FOLDS);

        let config = config.model(ModelKind::Logistic).folds(3).seed(1);
        assert_eq!(config.model_kind(), ModelKind::Logistic);
        assert_eq!(config.fold_count(), 3);
    }

    #[test]
    fn test_cross_validate_exact_linear_fit() {
        let x = Array2::from_shape_fn((20, 1), |(i, _)| f64::from(u32::try_from(i).unwrap()));
        let y = x.column(0).mapv(|v| 1.0 + 2.0 * v);
        let partition = FoldPartition::new(20, 4, 42).unwrap();

        let cv = cross_validate(ModelKind::Linear, &x, &y, &partition).unwrap();
        assert_eq!(cv.scores.len(), 4);
        assert!(cv.scores.iter().all(|&s| (0.0..1e-6).contains(&s)));
    }

    #[test]
    fn test_cross_validate_collinear_predictors() {
        // second column duplicates the first up to scale: X'X is singular
        let x = Array2::from_shape_fn((20, 2), |(i, j)| {
            let v = f64::from(u32::try_from(i).unwrap());
            if j == 0 { v } else { 3.0 * v }
        });
        let y = x.column(0).mapv(|v| 0.5 - v);
        let partition = FoldPartition::new(20, 5, 7).unwrap();

        let cv = cross_validate(ModelKind::Linear, &x, &y, &partition).unwrap();
        assert_eq!(cv.scores.len(), 5);
        assert!(cv.scores.iter().all(|&s| s < 1e-6));
    }

    #[test]
    fn test_cross_validate_logistic_accuracy() {
        let x = Array2::from_shape_fn((20, 1), |(i, _)| f64::from(u32::try_from(i).unwrap()));
        let y = x.column(0).mapv(|v| if v >= 10.0 { 1.0 } else { 0.0 });
        let partition = FoldPartition::new(20, 5, 42).unwrap();

        let cv = cross_validate(ModelKind::Logistic, &x, &y, &partition).unwrap();
        assert!(cv.scores.iter().all(|&s| (0.0..=1.0).contains(&s)));
        assert!(cv.mean() > 0.7);
    }

    #[test]
    fn test_cv_batch_columns() {
        let cv = CrossValidation {
            model: ModelKind::Linear,
            scores: vec![1.0, 2.0, 3.0],
        };
        let batch = cv.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 1);
        let names: Vec<String> = batch.schema().fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["fold1", "fold2", "fold3"]);
    }

    #[test]
    fn test_score_accuracy() {
        let model = Fitted::fit(
            ModelKind::Logistic,
            &array![[0.0], [1.0], [2.0], [3.0]],
            &array![0.0, 0.0, 1.0, 1.0],
        )
        .unwrap();
        let acc = model.score(&array![[0.0], [3.0]], &array![0.0, 1.0]);
        assert!((acc - 1.0).abs() < 1e-12);
    }
}
