//! Logistic regression
//!
//! Two estimators:
//! - [`LogisticRegression`]: unpenalised maximum likelihood by
//!   Newton-Raphson, used for the inferential summary
//! - [`RidgeLogistic`]: L2-penalised fit from `smartcore`, used for
//!   prediction in cross-validation
//!
//! The unpenalised likelihood is unbounded when a predictor separates the
//! classes; that is reported as [`Error::PerfectSeparation`] rather than
//! iterating towards infinite coefficients.

use super::summary::{self, CoefficientRow};
use super::{chi2_upper, halve_step, max_abs, z_critical, z_two_sided};
use crate::linalg::{add_intercept, dense_matrix, spd_inverse};
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};
use serde::Serialize;
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{
    LogisticRegression as LbfgsLogistic, LogisticRegressionParameters,
};

/// Fitted probabilities this close to the labels mean the classes are separated
const SEPARATION_TOL: f64 = 1e-8;

/// Newton-Raphson iteration limit
const MAX_ITER: usize = 35;

/// Convergence threshold on the largest coefficient update
const TOL: f64 = 1e-8;

fn check_binary(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    let n = x.nrows();
    if y.len() != n {
        return Err(Error::InvalidInput(format!(
            "design has {n} rows but outcome has {} values",
            y.len()
        )));
    }
    if n == 0 {
        return Err(Error::InvalidInput("no observations to fit".to_string()));
    }
    if y.iter().any(|&v| v != 0.0 && v != 1.0) {
        return Err(Error::InvalidInput(
            "logistic regression needs a 0/1 outcome".to_string(),
        ));
    }
    Ok(())
}

/// Binary logistic regression with an intercept
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    coefficients: Array1<f64>,
    /// Inverse of the observed information at the optimum
    covariance: Array2<f64>,
    log_likelihood: f64,
    iterations: usize,
    converged: bool,
}

impl LogisticRegression {
    /// Fit `logit P(y = 1) ~ 1 + x` by maximum likelihood
    ///
    /// A Newton step that cannot be made to increase the likelihood by
    /// halving ends the iteration; the fit is then reported as not
    /// converged.
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] if `y` is not 0/1 or shapes disagree
    /// - [`Error::PerfectSeparation`] if one class is absent or the fitted
    ///   probabilities reproduce the labels exactly
    /// - [`Error::SingularMatrix`] if the information matrix degenerates
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        check_binary(x, y)?;
        check_separation(x, y)?;

        let design = add_intercept(x);
        let mut beta = Array1::<f64>::zeros(design.ncols());
        let mut current = log_likelihood(&design, y, &beta);
        let mut converged = false;
        let mut iterations = 0;

        while iterations < MAX_ITER {
            iterations += 1;
            let mu = sigmoid(&design.dot(&beta));
            let gradient = design.t().dot(&(y - &mu));
            let step = spd_inverse(&information_matrix(&design, &mu))?.dot(&gradient);

            if max_abs(&step) < TOL {
                beta = &beta + &step;
                current = log_likelihood(&design, y, &beta);
                converged = true;
                break;
            }

            let objective = |candidate: &Array1<f64>| (log_likelihood(&design, y, candidate), ());
            let Some((candidate, value, ())) = halve_step(&beta, &step, current, objective) else {
                tracing::warn!(iterations, "step halving could not improve the likelihood");
                break;
            };

            let max_change = max_abs(&(&candidate - &beta));
            beta = candidate;
            current = value;

            let fitted = sigmoid(&design.dot(&beta));
            if max_abs(&(&fitted - y)) < SEPARATION_TOL {
                return Err(Error::PerfectSeparation(
                    "fitted probabilities reproduce the outcome exactly".to_string(),
                ));
            }

            if max_change < TOL {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::warn!(iterations, "logistic regression did not converge");
        }

        let mu = sigmoid(&design.dot(&beta));
        let covariance = spd_inverse(&information_matrix(&design, &mu))?;

        tracing::debug!(iterations, converged, log_likelihood = current, "fitted logistic regression");

        Ok(Self {
            coefficients: beta,
            covariance,
            log_likelihood: current,
            iterations,
            converged,
        })
    }

    /// Intercept followed by predictor coefficients
    #[must_use]
    pub const fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    /// Log-likelihood at the fitted coefficients
    #[must_use]
    pub const fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Whether the coefficient updates fell below tolerance before the
    /// iteration limit or a failed line search
    #[must_use]
    pub const fn converged(&self) -> bool {
        self.converged
    }

    /// Newton iterations performed
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// P(y = 1) for each row of `x`
    #[must_use]
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        sigmoid(&add_intercept(x).dot(&self.coefficients))
    }

    /// Predicted class (1 when P(y = 1) ≥ 0.5)
    #[must_use]
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        self.predict_proba(x).mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 })
    }
}

type LbfgsModel = LbfgsLogistic<f64, i32, DenseMatrix<f64>, Vec<i32>>;

/// L2-penalised logistic classifier
///
/// Penalty strength follows the inverse-regularisation convention: `c` is
/// `1 / alpha` and the intercept is not penalised. Because the penalised
/// likelihood always has a finite optimum, separated classes fit without
/// error.
#[derive(Debug)]
pub struct RidgeLogistic {
    /// Intercept followed by predictor coefficients
    coefficients: Array1<f64>,
}

impl RidgeLogistic {
    /// Fit on `x` and a 0/1 outcome `y`
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] if `y` is not 0/1, shapes disagree, `c` is
    ///   not positive, or only one class is present
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, c: f64) -> Result<Self> {
        check_binary(x, y)?;
        if !(c.is_finite() && c > 0.0) {
            return Err(Error::InvalidInput(format!(
                "inverse regularisation strength must be positive, got {c}"
            )));
        }

        let labels: Vec<i32> = y.iter().map(|&v| i32::from(v == 1.0)).collect();
        let params = LogisticRegressionParameters::default().with_alpha(1.0 / c);
        let model: LbfgsModel = LbfgsLogistic::fit(&dense_matrix(x)?, &labels, params)
            .map_err(|e| Error::InvalidInput(format!("logistic fit failed: {e}")))?;

        let coefficients: Array1<f64> = model
            .intercept()
            .iterator(0)
            .chain(model.coefficients().iterator(0))
            .copied()
            .collect();
        if coefficients.len() != x.ncols() + 1 {
            return Err(Error::InvalidInput(format!(
                "expected {} coefficients, solver returned {}",
                x.ncols() + 1,
                coefficients.len()
            )));
        }

        Ok(Self { coefficients })
    }

    /// Intercept followed by predictor coefficients
    #[must_use]
    pub const fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    /// P(y = 1) for each row of `x`
    #[must_use]
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        sigmoid(&add_intercept(x).dot(&self.coefficients))
    }

    /// Predicted class (1 when P(y = 1) ≥ 0.5)
    #[must_use]
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        self.predict_proba(x).mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 })
    }
}

fn sigmoid(eta: &Array1<f64>) -> Array1<f64> {
    eta.mapv(|e| 1.0 / (1.0 + (-e).exp()))
}

fn log_likelihood(design: &Array2<f64>, y: &Array1<f64>, beta: &Array1<f64>) -> f64 {
    // y * eta - log(1 + e^eta), computed without overflow
    design
        .dot(beta)
        .iter()
        .zip(y.iter())
        .map(|(&eta, &yi)| yi * eta - softplus(eta))
        .sum()
}

fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

/// `X' W X` with `W = diag(mu (1 - mu))`
fn information_matrix(design: &Array2<f64>, mu: &Array1<f64>) -> Array2<f64> {
    let weights = mu.mapv(|m| m * (1.0 - m));
    let weighted = design * &weights.insert_axis(Axis(1));
    design.t().dot(&weighted)
}

/// Reject inputs whose maximum likelihood estimate does not exist
fn check_separation(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    let positives = y.iter().filter(|&&v| v == 1.0).count();
    if positives == 0 || positives == y.len() {
        return Err(Error::PerfectSeparation(
            "outcome contains a single class".to_string(),
        ));
    }

    for (j, column) in x.columns().into_iter().enumerate() {
        let mut max0 = f64::NEG_INFINITY;
        let mut min0 = f64::INFINITY;
        let mut max1 = f64::NEG_INFINITY;
        let mut min1 = f64::INFINITY;
        for (&v, &label) in column.iter().zip(y.iter()) {
            if label == 1.0 {
                max1 = max1.max(v);
                min1 = min1.min(v);
            } else {
                max0 = max0.max(v);
                min0 = min0.min(v);
            }
        }
        if max0 < min1 || max1 < min0 {
            return Err(Error::PerfectSeparation(format!(
                "predictor {j} separates the two classes"
            )));
        }
    }
    Ok(())
}

/// Inferential summary of an unpenalised logistic fit
#[derive(Debug, Clone, Serialize)]
pub struct LogitSummary {
    /// Outcome name
    pub outcome: String,
    /// Coefficient table (intercept first)
    pub coefficients: Vec<CoefficientRow>,
    /// Observations used
    pub n_obs: usize,
    /// Model degrees of freedom (predictors)
    pub df_model: usize,
    /// Residual degrees of freedom
    pub df_resid: usize,
    /// Log-likelihood of the fitted model
    pub log_likelihood: f64,
    /// Log-likelihood of the intercept-only model
    pub ll_null: f64,
    /// McFadden's pseudo R²
    pub pseudo_r_squared: f64,
    /// Likelihood-ratio test p-value against the null model
    pub llr_p_value: f64,
    /// Newton iterations performed
    pub iterations: usize,
    /// Whether the fit converged
    pub converged: bool,
}

impl LogitSummary {
    /// Fit `logit P(y = 1) ~ 1 + x` and compute Wald inference
    ///
    /// # Errors
    /// See [`LogisticRegression::fit`]; perfect separation surfaces as
    /// [`Error::PerfectSeparation`]
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, outcome: &str, predictors: &[String]) -> Result<Self> {
        let model = LogisticRegression::fit(x, y)?;
        let n = y.len();
        let beta = model.coefficients();
        let df_model = beta.len() - 1;

        let ybar = y.sum() / n as f64;
        let ll_null = n as f64 * (ybar * ybar.ln() + (1.0 - ybar) * (1.0 - ybar).ln());
        let llf = model.log_likelihood();
        let llr = 2.0 * (llf - ll_null);
        let llr_p_value = if df_model > 0 {
            chi2_upper(llr.max(0.0), df_model as f64)?
        } else {
            f64::NAN
        };

        let crit = z_critical(0.05);
        let names = std::iter::once("const".to_string()).chain(predictors.iter().cloned());
        let coefficients = names
            .enumerate()
            .map(|(j, name)| {
                let se = model.covariance[[j, j]].sqrt();
                let z = beta[j] / se;
                CoefficientRow {
                    name,
                    estimate: beta[j],
                    std_error: se,
                    statistic: z,
                    p_value: z_two_sided(z),
                    ci_lower: beta[j] - crit * se,
                    ci_upper: beta[j] + crit * se,
                }
            })
            .collect();

        Ok(Self {
            outcome: outcome.to_string(),
            coefficients,
            n_obs: n,
            df_model,
            df_resid: n.saturating_sub(df_model + 1),
            log_likelihood: llf,
            ll_null,
            pseudo_r_squared: 1.0 - llf / ll_null,
            llr_p_value,
            iterations: model.iterations(),
            converged: model.converged(),
        })
    }

    /// Human-readable regression table
    #[must_use]
    pub fn to_text(&self) -> String {
        let facts = [
            ("Dep. Variable", self.outcome.clone()),
            ("Model", "Logit".to_string()),
            ("Method", "MLE".to_string()),
            ("No. Observations", self.n_obs.to_string()),
            ("Df Residuals", self.df_resid.to_string()),
            ("Df Model", self.df_model.to_string()),
            ("converged", if self.converged { "True" } else { "False" }.to_string()),
            ("Iterations", self.iterations.to_string()),
            ("Pseudo R-squ.", format!("{:.4}", self.pseudo_r_squared)),
            ("Log-Likelihood", format!("{:.3}", self.log_likelihood)),
            ("LL-Null", format!("{:.3}", self.ll_null)),
            ("LLR p-value", format!("{:.3e}", self.llr_p_value)),
        ];
        summary::render("Logit Regression Results", &facts, "z", &self.coefficients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn overlapping() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.5], [1.0], [1.5], [2.0], [2.5], [3.0], [3.5], [4.0], [4.5], [5.0]
        ];
        let y = array![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_fit_overlapping_classes() {
        let (x, y) = overlapping();
        let model = LogisticRegression::fit(&x, &y).unwrap();
        assert!(model.converged());
        // positive association
        assert!(model.coefficients()[1] > 0.0);

        let proba = model.predict_proba(&x);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(proba[9] > proba[0]);
    }

    #[test]
    fn test_score_equations_hold_at_optimum() {
        let (x, y) = overlapping();
        let model = LogisticRegression::fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x);
        // sum(y - mu) = 0 for the intercept
        let residual_sum: f64 = (&y - &proba).sum();
        assert!(residual_sum.abs() < 1e-6);
    }

    #[test]
    fn test_perfect_separation_detected() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let err = LogisticRegression::fit(&x, &y).unwrap_err();
        assert!(matches!(err, Error::PerfectSeparation(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_single_class_is_separation() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 0.0];
        let err = LogisticRegression::fit(&x, &y).unwrap_err();
        assert!(matches!(err, Error::PerfectSeparation(_)));
    }

    #[test]
    fn test_ridge_fit_survives_separation() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let model = RidgeLogistic::fit(&x, &y, 1.0).unwrap();
        assert_eq!(model.predict(&x), y);
        assert!(model.coefficients()[1] > 0.0);
    }

    #[test]
    fn test_rejects_non_binary_outcome() {
        let x = array![[1.0], [2.0]];
        let y = array![0.0, 2.0];
        let err = RidgeLogistic::fit(&x, &y, 1.0).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = LogisticRegression::fit(&x, &y).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_ridge_rejects_single_class() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![1.0, 1.0, 1.0];
        assert!(matches!(RidgeLogistic::fit(&x, &y, 1.0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_ridge_rejects_non_positive_strength() {
        let (x, y) = overlapping();
        assert!(matches!(RidgeLogistic::fit(&x, &y, 0.0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_ridge_shrinks_towards_zero() {
        let (x, y) = overlapping();
        let mle = LogisticRegression::fit(&x, &y).unwrap();
        let ridge = RidgeLogistic::fit(&x, &y, 1.0).unwrap();
        assert!(ridge.coefficients()[1] > 0.0);
        assert!(ridge.coefficients()[1] < mle.coefficients()[1]);
    }

    #[test]
    fn test_collinear_predictors_have_no_mle() {
        let (x1, y) = overlapping();
        let mut x = Array2::<f64>::zeros((x1.nrows(), 2));
        x.column_mut(0).assign(&x1.column(0));
        x.column_mut(1).assign(&x1.column(0).mapv(|v| 2.0 * v));
        assert!(matches!(LogisticRegression::fit(&x, &y), Err(Error::SingularMatrix(_))));
        // the penalised fit is still defined
        let ridge = RidgeLogistic::fit(&x, &y, 1.0).unwrap();
        assert_eq!(ridge.predict(&x).len(), y.len());
    }

    #[test]
    fn test_summary_text() {
        let (x, y) = overlapping();
        let summary = LogitSummary::fit(&x, &y, "y", &["x".to_string()]).unwrap();
        assert_eq!(summary.n_obs, 10);
        assert_eq!(summary.coefficients.len(), 2);
        assert!(summary.log_likelihood > summary.ll_null);
        assert!(summary.pseudo_r_squared > 0.0 && summary.pseudo_r_squared < 1.0);
        assert!(summary.coefficients.iter().all(|c| c.std_error > 0.0));

        let text = summary.to_text();
        assert!(text.contains("Logit Regression Results"));
        assert!(text.contains("Pseudo R-squ."));
        assert!(text.contains("P>|z|"));
    }
}
