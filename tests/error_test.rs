//! Tests for error types

use std::path::PathBuf;
use trueno_stats::Error;

#[test]
fn test_dataset_not_found_error() {
    let error = Error::DatasetNotFound(PathBuf::from("data/study.csv"));
    let error_str = format!("{error}");
    assert!(error_str.contains("Dataset not found"));
    assert!(error_str.contains("data/study.csv"));
}

#[test]
fn test_column_not_found_error() {
    let error = Error::ColumnNotFound("x9".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Column not found: x9"));
    assert!(error_str.contains("--predictors"));
}

#[test]
fn test_non_numeric_column_error() {
    let error = Error::NonNumericColumn("group".to_string());
    assert_eq!(format!("{error}"), "Column 'group' is not numeric");
}

#[test]
fn test_missing_values_error() {
    let error = Error::MissingValues {
        column: "x2".to_string(),
        count: 3,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("'x2'"));
    assert!(error_str.contains("3 missing"));
    assert!(error_str.contains("no imputation"));
}

#[test]
fn test_perfect_separation_error() {
    let error = Error::PerfectSeparation("predictor 0 separates the two classes".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Perfect separation detected"));
    assert!(error_str.contains("predictor 0"));
}

#[test]
fn test_convergence_failure_error() {
    let error = Error::ConvergenceFailure {
        model: "Cox proportional hazards",
        iterations: 50,
    };
    assert_eq!(
        format!("{error}"),
        "Cox proportional hazards did not converge after 50 iterations"
    );
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("k must be at least 2".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid input"));
    assert!(error_str.contains("k must be at least 2"));
}

#[test]
fn test_storage_error() {
    let error = Error::StorageError("bad parquet footer".to_string());
    assert!(format!("{error}").contains("Storage error"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    let error: Error = io_error.into();
    assert!(matches!(error, Error::Io(_)));
    assert!(format!("{error}").contains("read-only"));
}

#[test]
fn test_only_separation_is_recoverable() {
    assert!(Error::PerfectSeparation("x".into()).is_recoverable());
    assert!(!Error::SingularMatrix("x".into()).is_recoverable());
    assert!(!Error::ColumnNotFound("x".into()).is_recoverable());
    assert!(!Error::MissingValues {
        column: "x".into(),
        count: 1
    }
    .is_recoverable());
    assert!(!Error::DatasetNotFound(PathBuf::from("x")).is_recoverable());
}

#[test]
fn test_error_debug() {
    let error = Error::PlotError("backend".to_string());
    assert!(format!("{error:?}").contains("PlotError"));
}
