//! # Trueno-Stats: Research Statistics Pipelines
//!
//! **Version**: 0.1.0
//!
//! Trueno-Stats turns a tabular dataset (CSV or Parquet) into the artifacts a
//! quantitative manuscript needs: descriptive statistics, a correlation
//! matrix, one fitted regression or survival model, k-fold validation scores
//! with diagnostic plots, and APA-style tables.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: Bad input stops the line: unknown or non-numeric columns are
//!   errors, never silently imputed
//! - **Poka-Yoke**: Model choice is a pure function of the request and the
//!   outcome column ([`models::select_model`])
//! - **Heijunka**: Every artifact is written independently; a failed model fit
//!   leaves earlier artifacts in place
//! - **Genchi Genbutsu**: Seeded fold shuffling makes every score reproducible
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use trueno_stats::analyze::{AnalysisRequest, Analyzer};
//! use std::path::Path;
//!
//! let request = AnalysisRequest::new("y", vec!["x1".into(), "x2".into()]);
//! let report = Analyzer::new("analysis_output").run_path(Path::new("data/study.csv"), &request)?;
//! println!("fitted {:?}", report.model);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod analyze;
pub mod dataset;
pub mod describe;
pub mod error;
pub mod linalg;
pub mod logging;
pub mod models;
pub mod output;
pub mod report;
pub mod validate;

pub use error::{Error, Result};
