//! End-to-end tests for cross-validated evaluation

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use trueno_stats::validate::{
    EvaluationConfig, Evaluator, ModelKind, CV_RESULTS_FILE, HISTOGRAM_FILE, SCATTER_FILE,
};
use trueno_stats::Error;

fn write_dataset(dir: &Path, rows: usize, binary: bool) -> PathBuf {
    let mut text = String::from("x1,x2,y\n");
    for i in 0..rows {
        let x1 = i as f64 / 10.0;
        let x2 = ((i * 37) % 17) as f64;
        let y = if binary {
            // noisy threshold so neither class is separable
            f64::from(u8::from((i * 31) % 100 < i))
        } else {
            0.5 * x1 + x2 + ((i * 13) % 7) as f64 * 0.3
        };
        writeln!(text, "{x1},{x2},{y}").unwrap();
    }
    let path = dir.join("data.csv");
    fs::write(&path, text).unwrap();
    path
}

fn config() -> EvaluationConfig {
    EvaluationConfig::new("y", vec!["x1".into(), "x2".into()])
}

fn read_scores(path: &Path) -> (Vec<String>, Vec<f64>) {
    let text = fs::read_to_string(path).unwrap();
    let mut lines = text.lines();
    let header = lines.next().unwrap().split(',').map(String::from).collect();
    let scores = lines
        .next()
        .unwrap()
        .split(',')
        .map(|s| s.parse::<f64>().unwrap())
        .collect();
    (header, scores)
}

#[test]
fn test_linear_five_fold_rmse() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_dataset(dir.path(), 100, false);
    let outdir = dir.path().join("out");

    let report = Evaluator::new(&outdir).run_path(&csv, &config()).unwrap();

    let (header, scores) = read_scores(&outdir.join(CV_RESULTS_FILE));
    assert_eq!(header, vec!["fold1", "fold2", "fold3", "fold4", "fold5"]);
    assert_eq!(scores.len(), 5);
    assert!(scores.iter().all(|s| s.is_finite() && *s >= 0.0));
    assert_eq!(report.cross_validation.scores.len(), 5);
    assert!(outdir.join(SCATTER_FILE).exists());
    assert!(outdir.join(HISTOGRAM_FILE).exists());
}

#[test]
fn test_collinear_predictors_still_cross_validate() {
    let dir = tempfile::tempdir().unwrap();
    let mut text = String::from("x1,x2,y\n");
    for i in 0..40 {
        let x1 = f64::from(i);
        writeln!(text, "{x1},{},{}", 2.0 * x1, 3.0 - x1 + f64::from(i % 4) * 0.25).unwrap();
    }
    let csv = dir.path().join("collinear.csv");
    fs::write(&csv, text).unwrap();
    let outdir = dir.path().join("out");

    let report = Evaluator::new(&outdir).run_path(&csv, &config()).unwrap();

    assert_eq!(report.cross_validation.scores.len(), 5);
    assert!(report.cross_validation.scores.iter().all(|s| s.is_finite() && *s < 1.0));
    assert!(outdir.join(CV_RESULTS_FILE).exists());
}

#[test]
fn test_same_seed_same_scores() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_dataset(dir.path(), 60, false);

    let a = Evaluator::new(dir.path().join("a")).run_path(&csv, &config().seed(7)).unwrap();
    let b = Evaluator::new(dir.path().join("b")).run_path(&csv, &config().seed(7)).unwrap();
    assert_eq!(a.cross_validation, b.cross_validation);
}

#[test]
fn test_logistic_accuracy_in_unit_interval() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_dataset(dir.path(), 100, true);
    let outdir = dir.path().join("out");

    let cfg = config().model(ModelKind::Logistic).folds(4);
    let report = Evaluator::new(&outdir).run_path(&csv, &cfg).unwrap();

    let (header, scores) = read_scores(&outdir.join(CV_RESULTS_FILE));
    assert_eq!(header.len(), 4);
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    assert_eq!(report.cross_validation.model, ModelKind::Logistic);
}

#[test]
fn test_logistic_rejects_continuous_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_dataset(dir.path(), 40, false);
    let outdir = dir.path().join("out");

    let err = Evaluator::new(&outdir)
        .run_path(&csv, &config().model(ModelKind::Logistic))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(!outdir.join(CV_RESULTS_FILE).exists());
}

#[test]
fn test_missing_values_are_not_imputed() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("gaps.csv");
    let mut text = String::from("x1,x2,y\n");
    for i in 0..20 {
        let x2 = if i == 3 { String::new() } else { i.to_string() };
        writeln!(text, "{i},{x2},{}", i * 2).unwrap();
    }
    fs::write(&csv, text).unwrap();

    let err = Evaluator::new(dir.path().join("out")).run_path(&csv, &config()).unwrap_err();
    assert!(matches!(err, Error::MissingValues { ref column, count: 1 } if column == "x2"));
}

#[test]
fn test_too_many_folds() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_dataset(dir.path(), 4, false);

    let err = Evaluator::new(dir.path().join("out"))
        .run_path(&csv, &config().folds(5))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[test]
fn test_unknown_outcome_column() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_dataset(dir.path(), 20, false);

    let cfg = EvaluationConfig::new("target", vec!["x1".into()]);
    let err = Evaluator::new(dir.path().join("out")).run_path(&csv, &cfg).unwrap_err();
    assert!(matches!(err, Error::ColumnNotFound(_)));
}
