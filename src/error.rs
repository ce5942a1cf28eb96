//! Error types for Trueno-Stats
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trueno-Stats error types
#[derive(Error, Debug)]
pub enum Error {
    /// Dataset path does not exist
    #[error("Dataset not found: {}", .0.display())]
    DatasetNotFound(PathBuf),

    /// Storage error (CSV/Parquet loading, artifact writing)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Requested column is not part of the dataset
    #[error("Column not found: {0}\nCheck --outcome/--predictors/--event against the dataset header")]
    ColumnNotFound(String),

    /// Column cannot be used as a numeric model input
    #[error("Column '{0}' is not numeric")]
    NonNumericColumn(String),

    /// Column has missing values where complete data is required
    #[error("Column '{column}' has {count} missing value(s); no imputation is performed")]
    MissingValues {
        /// Offending column
        column: String,
        /// Number of missing cells
        count: usize,
    },

    /// Invalid argument or data shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Logistic likelihood is unbounded (recoverable)
    #[error("Perfect separation detected: {0}")]
    PerfectSeparation(String),

    /// `X'X` or information matrix is not numerically positive definite
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    /// Iterative fit did not converge
    #[error("{model} did not converge after {iterations} iterations")]
    ConvergenceFailure {
        /// Model being fitted
        model: &'static str,
        /// Iterations performed
        iterations: usize,
    },

    /// Diagnostic plot rendering failed
    #[error("Plot error: {0}")]
    PlotError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl Error {
    /// Whether the pipeline may continue after logging this error.
    ///
    /// Only numerical degeneracy in logistic fitting is recoverable; every
    /// other failure terminates the invocation.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::PerfectSeparation(_))
    }
}
