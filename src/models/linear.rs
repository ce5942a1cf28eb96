//! Ordinary least squares
//!
//! Coefficients come from `smartcore`'s SVD least-squares solver, which
//! also handles rank-deficient designs. Standard errors need `(X'X)^-1`,
//! taken from a Cholesky factorisation.

use super::summary::{self, CoefficientRow};
use super::{f_upper, t_critical, t_two_sided};
use crate::linalg::{add_intercept, dense_matrix, spd_inverse};
use crate::{Error, Result};
use ndarray::{Array1, Array2};
use serde::Serialize;
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression as LeastSquares, LinearRegressionParameters, LinearRegressionSolverName,
};
use std::f64::consts::PI;

/// Linear regression with an intercept
#[derive(Debug, Clone)]
pub struct LinearRegression {
    /// Intercept first, then one coefficient per predictor
    coefficients: Array1<f64>,
}

impl LinearRegression {
    /// Fit `y ~ 1 + x` by least squares
    ///
    /// Collinear predictors do not fail the fit; the minimum-norm solution
    /// is returned.
    ///
    /// # Errors
    /// Returns error if shapes disagree, there are no rows, or the solver
    /// fails
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        let (n, p) = x.dim();
        if y.len() != n {
            return Err(Error::InvalidInput(format!(
                "design has {n} rows but outcome has {} values",
                y.len()
            )));
        }
        if n == 0 {
            return Err(Error::InvalidInput("no observations to fit".to_string()));
        }

        let parameters = LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::SVD);
        let model: LeastSquares<f64, f64, DenseMatrix<f64>, Vec<f64>> =
            LeastSquares::fit(&dense_matrix(x)?, &y.to_vec(), parameters)
                .map_err(|e| Error::SingularMatrix(format!("least-squares solve failed: {e}")))?;

        let coefficients: Array1<f64> = std::iter::once(*model.intercept())
            .chain(model.coefficients().iterator(0).copied())
            .collect();
        if coefficients.len() != p + 1 {
            return Err(Error::InvalidInput(format!(
                "solver returned {} coefficients for {} terms",
                coefficients.len(),
                p + 1
            )));
        }
        Ok(Self { coefficients })
    }

    /// Intercept followed by predictor coefficients
    #[must_use]
    pub const fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    /// Predicted values for each row of `x`
    #[must_use]
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        add_intercept(x).dot(&self.coefficients)
    }
}

/// Full OLS fit with the usual inference
#[derive(Debug, Clone, Serialize)]
pub struct OlsSummary {
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
    /// Coefficient of determination
    pub r_squared: f64,
    /// Adjusted R²
    pub adj_r_squared: f64,
    /// Overall F statistic
    pub f_statistic: f64,
    /// p-value of the F statistic
    pub f_p_value: f64,
    /// Gaussian log-likelihood
    pub log_likelihood: f64,
    /// Akaike information criterion
    pub aic: f64,
    /// Bayesian information criterion
    pub bic: f64,
}

impl OlsSummary {
    /// Fit `y ~ 1 + x` and compute standard errors, t-tests and fit statistics
    ///
    /// # Errors
    /// Returns error if there are no residual degrees of freedom or `X'X`
    /// is singular
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, outcome: &str, predictors: &[String]) -> Result<Self> {
        let design = add_intercept(x);
        let (n, p) = design.dim();
        if n <= p {
            return Err(Error::InvalidInput(format!(
                "{n} complete observations cannot support {p} terms"
            )));
        }

        let beta = LinearRegression::fit(x, y)?.coefficients;
        let xtx_inv = spd_inverse(&design.t().dot(&design))
            .map_err(|e| Error::SingularMatrix(format!("X'X is not invertible ({p} terms): {e}")))?;
        let fitted = design.dot(&beta);
        let residuals = y - &fitted;

        let df_model = p - 1;
        let df_resid = n - p;
        let ssr = residuals.dot(&residuals);
        let y_mean = y.sum() / n as f64;
        let centered = y.mapv(|v| v - y_mean);
        let tss = centered.dot(&centered);
        let ess = tss - ssr;

        let sigma2 = ssr / df_resid as f64;
        let r_squared = if tss > 0.0 { 1.0 - ssr / tss } else { f64::NAN };
        let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df_resid as f64;
        let (f_statistic, f_p_value) = if df_model > 0 && sigma2 > 0.0 {
            let f = (ess / df_model as f64) / sigma2;
            (f, f_upper(f, df_model as f64, df_resid as f64)?)
        } else {
            (f64::NAN, f64::NAN)
        };

        let nf = n as f64;
        let log_likelihood = -nf / 2.0 * ((2.0 * PI).ln() + (ssr / nf).ln() + 1.0);
        let k = p as f64;
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let bic = -2.0 * log_likelihood + nf.ln() * k;

        let crit = t_critical(0.05, df_resid as f64)?;
        let names = std::iter::once("const".to_string()).chain(predictors.iter().cloned());
        let coefficients = names
            .enumerate()
            .map(|(j, name)| {
                let se = (sigma2 * xtx_inv[[j, j]]).sqrt();
                let t = beta[j] / se;
                Ok(CoefficientRow {
                    name,
                    estimate: beta[j],
                    std_error: se,
                    statistic: t,
                    p_value: t_two_sided(t, df_resid as f64)?,
                    ci_lower: beta[j] - crit * se,
                    ci_upper: beta[j] + crit * se,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(n_obs = n, r_squared, f_statistic, "fitted OLS");

        Ok(Self {
            outcome: outcome.to_string(),
            coefficients,
            n_obs: n,
            df_model,
            df_resid,
            r_squared,
            adj_r_squared,
            f_statistic,
            f_p_value,
            log_likelihood,
            aic,
            bic,
        })
    }

    /// Human-readable regression table
    #[must_use]
    pub fn to_text(&self) -> String {
        let facts = [
            ("Dep. Variable", self.outcome.clone()),
            ("Model", "OLS".to_string()),
            ("Method", "Least Squares".to_string()),
            ("No. Observations", self.n_obs.to_string()),
            ("Df Residuals", self.df_resid.to_string()),
            ("Df Model", self.df_model.to_string()),
            ("R-squared", format!("{:.3}", self.r_squared)),
            ("Adj. R-squared", format!("{:.3}", self.adj_r_squared)),
            ("F-statistic", format!("{:.4}", self.f_statistic)),
            ("Prob (F-statistic)", format!("{:.3e}", self.f_p_value)),
            ("Log-Likelihood", format!("{:.3}", self.log_likelihood)),
            ("AIC", format!("{:.2}", self.aic)),
            ("BIC", format!("{:.2}", self.bic)),
        ];
        summary::render("OLS Regression Results", &facts, "t", &self.coefficients)
    }
}
