//! Analysis Walkthrough: from a RecordBatch to manuscript artifacts
//!
//! This example builds a small clinical-style dataset in memory and runs
//! every pipeline on it:
//! - Analyzer (descriptives, correlations, OLS / logistic / Cox)
//! - Evaluator (5-fold cross-validation + diagnostic plots)
//! - APA descriptive table
//!
//! Run with: cargo run --example analysis_walkthrough

use arrow::array::{Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use std::sync::Arc;
use trueno_stats::analyze::{AnalysisRequest, Analyzer, ModelArtifact};
use trueno_stats::dataset::Dataset;
use trueno_stats::logging::LogConfig;
use trueno_stats::report::ApaTable;
use trueno_stats::validate::{EvaluationConfig, Evaluator, ModelKind};

const ROWS: i64 = 80;

#[allow(clippy::cast_precision_loss)]
fn build_dataset() -> Result<Dataset, Box<dyn std::error::Error>> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("age", DataType::Int64, false),
        Field::new("dose", DataType::Float64, false),
        Field::new("systolic", DataType::Float64, false),
        Field::new("responded", DataType::Int64, false),
        Field::new("months", DataType::Float64, false),
        Field::new("died", DataType::Int64, false),
        Field::new("site", DataType::Utf8, false),
    ]));

    let age: Vec<i64> = (0..ROWS).map(|i| 40 + (i * 17) % 35).collect();
    let dose: Vec<f64> = (0..ROWS).map(|i| ((i * 7) % 10) as f64 * 2.5).collect();
    let systolic: Vec<f64> = (0..ROWS)
        .map(|i| 110.0 + 0.6 * age[i as usize] as f64 - 0.8 * dose[i as usize] + ((i * 13) % 9) as f64)
        .collect();
    let responded: Vec<i64> = (0..ROWS).map(|i| i64::from((i * 29) % 10 < 3 + (i * 7) % 10 / 2)).collect();
    let months: Vec<f64> = (0..ROWS).map(|i| 1.0 + ((i * 11) % 48) as f64).collect();
    let died: Vec<i64> = (0..ROWS).map(|i| i64::from(i % 4 != 0)).collect();
    let site: Vec<String> = (0..ROWS).map(|i| format!("site_{}", i % 3)).collect();

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(age)),
            Arc::new(Float64Array::from(dose)),
            Arc::new(Float64Array::from(systolic)),
            Arc::new(Int64Array::from(responded)),
            Arc::new(Float64Array::from(months)),
            Arc::new(Int64Array::from(died)),
            Arc::new(StringArray::from(site)),
        ],
    )?;
    Ok(Dataset::new(batch))
}

fn describe_artifact(artifact: &ModelArtifact) {
    match artifact {
        ModelArtifact::Written { path } => println!("  Model summary: {}", path.display()),
        ModelArtifact::Skipped { reason } => println!("  Model summary skipped: {reason}"),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    LogConfig::new().with_level(tracing::Level::WARN).init()?;

    println!("=== Trueno-Stats Analysis Walkthrough ===\n");
    let workdir = tempfile::tempdir()?;
    let dataset = build_dataset()?;
    println!("Dataset: {} rows × {} columns", dataset.num_rows(), dataset.num_columns());
    println!("Numeric columns: {:?}\n", dataset.numeric_column_names());

    let predictors = vec!["age".to_string(), "dose".to_string()];
    let analyzer = Analyzer::new(workdir.path().join("analysis"));

    println!("=== Step 1: Continuous outcome (systolic) ===");
    let report = analyzer.run(&dataset, &AnalysisRequest::new("systolic", predictors.clone()))?;
    println!("  Model: {:?}", report.model);
    describe_artifact(&report.model_summary);

    println!("\n=== Step 2: Binary outcome (responded) ===");
    let report = analyzer.run(&dataset, &AnalysisRequest::new("responded", predictors.clone()))?;
    println!("  Model: {:?}", report.model);
    describe_artifact(&report.model_summary);

    println!("\n=== Step 3: Survival (months, died) ===");
    let request = AnalysisRequest::new("months", predictors.clone()).with_event("died");
    let report = analyzer.run(&dataset, &request)?;
    println!("  Model: {:?}", report.model);
    describe_artifact(&report.model_summary);

    println!("\n=== Step 4: 5-fold cross-validation ===");
    let evaluator = Evaluator::new(workdir.path().join("validation"));
    let config = EvaluationConfig::new("systolic", predictors).model(ModelKind::Linear);
    let evaluation = evaluator.run(&dataset, &config)?;
    for (i, score) in evaluation.cross_validation.scores.iter().enumerate() {
        println!("  fold{}: RMSE = {score:.3}", i + 1);
    }
    println!("  mean RMSE = {:.3}", evaluation.cross_validation.mean());
    println!("  Plots: {}, {}", evaluation.scatter.display(), evaluation.histogram.display());

    println!("\n=== Step 5: APA descriptive table ===\n");
    let table = ApaTable::from_dataset(&dataset)?;
    print!("{}", table.to_markdown());

    println!("\nArtifacts were written under {}", workdir.path().display());
    Ok(())
}
