//! Model selection and estimators
//!
//! The analyzer fits exactly one model per invocation. Which one is decided
//! up front, from the request and the shape of the outcome column, by two
//! pure functions:
//!
//! ```rust
//! use trueno_stats::models::{classify_outcome, select_model, ModelChoice, OutcomeKind};
//!
//! let outcome = [Some(0.0), Some(1.0), None, Some(1.0)];
//! assert_eq!(classify_outcome(outcome.iter().copied()), OutcomeKind::Binary);
//! assert_eq!(select_model(None, &outcome), ModelChoice::Logistic);
//! assert_eq!(select_model(Some("died"), &outcome), ModelChoice::Cox);
//! ```

mod cox;
mod linear;
mod logistic;
mod summary;

pub use cox::{CoxModel, CoxSummary};
pub use linear::{LinearRegression, OlsSummary};
pub use logistic::{LogisticRegression, LogitSummary, RidgeLogistic};
pub use summary::CoefficientRow;

use crate::{Error, Result};
use ndarray::Array1;
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

/// Shape of the outcome column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Every non-missing value is 0 or 1
    Binary,
    /// Anything else
    Continuous,
}

/// Model fitted by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelChoice {
    /// Cox proportional hazards (event column supplied)
    Cox,
    /// Logistic regression (binary outcome)
    Logistic,
    /// Ordinary least squares (continuous outcome)
    Linear,
}

impl ModelChoice {
    /// File name of the summary artifact for this model
    #[must_use]
    pub const fn artifact_name(self) -> &'static str {
        match self {
            Self::Cox => "cox_summary.csv",
            Self::Logistic => "logistic_summary.txt",
            Self::Linear => "linear_summary.txt",
        }
    }
}

/// Classify the outcome column
///
/// The test is a subset test: the distinct non-missing values must lie in
/// {0, 1}. A column holding only `0` (or only `1`), or no values at all,
/// is therefore [`OutcomeKind::Binary`].
pub fn classify_outcome<I>(values: I) -> OutcomeKind
where
    I: IntoIterator<Item = Option<f64>>,
{
    let binary = values
        .into_iter()
        .flatten()
        .all(|v| v == 0.0 || v == 1.0);
    if binary {
        OutcomeKind::Binary
    } else {
        OutcomeKind::Continuous
    }
}

/// Pick the model: an event column always wins, then the outcome shape
#[must_use]
pub fn select_model(event: Option<&str>, outcome: &[Option<f64>]) -> ModelChoice {
    if event.is_some() {
        return ModelChoice::Cox;
    }
    match classify_outcome(outcome.iter().copied()) {
        OutcomeKind::Binary => ModelChoice::Logistic,
        OutcomeKind::Continuous => ModelChoice::Linear,
    }
}

// ============================================================================
// Newton line search
// ============================================================================

/// Smallest step-halving factor tried before giving up
const MIN_STEP_SCALE: f64 = 1e-4;

/// Largest absolute entry
pub(crate) fn max_abs(values: &Array1<f64>) -> f64 {
    values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

/// Halve a Newton step until the objective stops decreasing
///
/// `objective` returns the value to maximise plus whatever state the caller
/// wants back for the accepted point. Losses below rounding noise of
/// `current` count as no loss. Returns `None` once the step has been scaled
/// down to `MIN_STEP_SCALE` and still lowers the objective.
pub(crate) fn halve_step<S, F>(
    start: &Array1<f64>,
    step: &Array1<f64>,
    current: f64,
    mut objective: F,
) -> Option<(Array1<f64>, f64, S)>
where
    F: FnMut(&Array1<f64>) -> (f64, S),
{
    let slack = 1e-12 * (1.0 + current.abs());
    let mut scale = 1.0;
    loop {
        let candidate = start + &(step * scale);
        let (value, state) = objective(&candidate);
        if value >= current - slack {
            return Some((candidate, value, state));
        }
        if scale <= MIN_STEP_SCALE {
            return None;
        }
        scale /= 2.0;
    }
}

// ============================================================================
// Sampling distributions
// ============================================================================

fn dist_error(e: impl std::fmt::Display) -> Error {
    Error::InvalidInput(format!("distribution parameters: {e}"))
}

/// Two-sided p-value of a t statistic
pub(crate) fn t_two_sided(t: f64, df: f64) -> Result<f64> {
    let dist = StudentsT::new(0.0, 1.0, df).map_err(dist_error)?;
    Ok(2.0 * dist.sf(t.abs()))
}

/// Upper critical value of Student's t
pub(crate) fn t_critical(alpha: f64, df: f64) -> Result<f64> {
    let dist = StudentsT::new(0.0, 1.0, df).map_err(dist_error)?;
    Ok(dist.inverse_cdf(1.0 - alpha / 2.0))
}

/// Two-sided p-value of a z statistic
pub(crate) fn z_two_sided(z: f64) -> f64 {
    2.0 * standard_normal().sf(z.abs())
}

/// Upper critical value of the standard normal
pub(crate) fn z_critical(alpha: f64) -> f64 {
    standard_normal().inverse_cdf(1.0 - alpha / 2.0)
}

fn standard_normal() -> Normal {
    Normal::standard()
}

/// Upper tail of the F distribution
pub(crate) fn f_upper(f: f64, df1: f64, df2: f64) -> Result<f64> {
    let dist = FisherSnedecor::new(df1, df2).map_err(dist_error)?;
    Ok(dist.sf(f))
}

/// Upper tail of the chi-squared distribution
pub(crate) fn chi2_upper(x: f64, df: f64) -> Result<f64> {
    let dist = ChiSquared::new(df).map_err(dist_error)?;
    Ok(dist.sf(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_binary_outcome_selects_logistic() {
        let outcome = vec![Some(0.0), Some(1.0), Some(1.0), None];
        assert_eq!(classify_outcome(outcome.iter().copied()), OutcomeKind::Binary);
        assert_eq!(select_model(None, &outcome), ModelChoice::Logistic);
    }

    #[test]
    fn test_continuous_outcome_selects_linear() {
        let outcome = vec![Some(0.0), Some(1.0), Some(0.5)];
        assert_eq!(classify_outcome(outcome.iter().copied()), OutcomeKind::Continuous);
        assert_eq!(select_model(None, &outcome), ModelChoice::Linear);
    }

    #[test]
    fn test_event_column_takes_precedence() {
        let binary = vec![Some(0.0), Some(1.0)];
        let continuous = vec![Some(3.2), Some(7.5)];
        assert_eq!(select_model(Some("event"), &binary), ModelChoice::Cox);
        assert_eq!(select_model(Some("event"), &continuous), ModelChoice::Cox);
    }

    #[test]
    fn test_single_value_outcome_is_binary() {
        // subset semantics: {0} ⊆ {0, 1}
        let zeros = vec![Some(0.0); 5];
        let ones = vec![Some(1.0), None, Some(1.0)];
        assert_eq!(classify_outcome(zeros.iter().copied()), OutcomeKind::Binary);
        assert_eq!(classify_outcome(ones.iter().copied()), OutcomeKind::Binary);
    }

    #[test]
    fn test_all_missing_outcome_is_binary() {
        assert_eq!(classify_outcome(vec![None, None]), OutcomeKind::Binary);
    }

    #[test]
    fn test_values_outside_unit_set_are_continuous() {
        assert_eq!(classify_outcome(vec![Some(0.0), Some(2.0)]), OutcomeKind::Continuous);
        assert_eq!(classify_outcome(vec![Some(-1.0), Some(1.0)]), OutcomeKind::Continuous);
    }

    #[test]
    fn test_artifact_names() {
        assert_eq!(ModelChoice::Cox.artifact_name(), "cox_summary.csv");
        assert_eq!(ModelChoice::Logistic.artifact_name(), "logistic_summary.txt");
        assert_eq!(ModelChoice::Linear.artifact_name(), "linear_summary.txt");
    }

    #[test]
    fn test_distribution_tails() {
        assert!((z_two_sided(1.959_963_984_540_054) - 0.05).abs() < 1e-9);
        assert!((z_critical(0.05) - 1.959_963_984_540_054).abs() < 1e-6);
        assert!((t_two_sided(0.0, 10.0).unwrap() - 1.0).abs() < 1e-12);
        assert!(t_critical(0.05, 10.0).unwrap() > z_critical(0.05));
        assert!(f_upper(1e6, 2.0, 50.0).unwrap() < 1e-10);
        assert!((chi2_upper(0.0, 3.0).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_halve_step_shortens_overshoot() {
        // maximum of -(b - 1)^2 at b = 1; a full step of 3 overshoots
        let objective = |b: &Array1<f64>| (-(b[0] - 1.0).powi(2), ());
        let (point, value, ()) = halve_step(&array![0.0], &array![3.0], -1.0, objective).unwrap();
        assert!((point[0] - 1.5).abs() < 1e-12);
        assert!((value + 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_halve_step_accepts_full_step() {
        let objective = |b: &Array1<f64>| (-(b[0] - 1.0).powi(2), b[0]);
        let (point, _, state) = halve_step(&array![0.0], &array![1.0], -1.0, objective).unwrap();
        assert_eq!(point, array![1.0]);
        assert_eq!(state, 1.0);
    }

    #[test]
    fn test_halve_step_gives_up_when_every_step_loses() {
        // every move away from 0 lowers the objective
        let objective = |b: &Array1<f64>| (-b[0].abs(), ());
        assert!(halve_step(&array![0.0], &array![2.0], 0.0, objective).is_none());
    }

    #[test]
    fn test_max_abs() {
        assert_eq!(max_abs(&array![1.0, -3.0, 2.0]), 3.0);
        assert_eq!(max_abs(&Array1::zeros(0)), 0.0);
    }
}
