//! Cox proportional hazards
//!
//! Partial likelihood with Efron's tie correction, maximised by
//! Newton-Raphson with step halving. Covariates are centred before fitting,
//! which leaves the coefficients unchanged and keeps `exp(x'b)` in range.

use super::{halve_step, max_abs, z_critical, z_two_sided};
use crate::linalg::spd_inverse;
use crate::{Error, Result};
use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use ndarray::{Array1, Array2, Axis};
use serde::Serialize;
use std::sync::Arc;

const MAX_ITER: usize = 50;
const TOL: f64 = 1e-9;

/// Fitted Cox model
#[derive(Debug, Clone)]
pub struct CoxModel {
    coefficients: Array1<f64>,
    covariance: Array2<f64>,
    log_partial_likelihood: f64,
    iterations: usize,
}

impl CoxModel {
    /// Fit the hazard of `events` at `durations` on covariates `x`
    ///
    /// `events[i]` is true when subject `i` experienced the event, false when
    /// censored.
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] on shape mismatch, negative or non-finite
    ///   durations, or no observed events
    /// - [`Error::SingularMatrix`] if the information matrix degenerates
    /// - [`Error::ConvergenceFailure`] if Newton-Raphson does not settle
    pub fn fit(x: &Array2<f64>, durations: &Array1<f64>, events: &[bool]) -> Result<Self> {
        let (n, p) = x.dim();
        if durations.len() != n || events.len() != n {
            return Err(Error::InvalidInput(format!(
                "covariates have {n} rows, durations {}, events {}",
                durations.len(),
                events.len()
            )));
        }
        if durations.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(Error::InvalidInput(
                "durations must be finite and non-negative".to_string(),
            ));
        }
        if !events.iter().any(|&e| e) {
            return Err(Error::InvalidInput("no events observed".to_string()));
        }

        let means = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(p));
        let centered = x - &means;

        // descending time: each risk set is a prefix
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| durations[b].total_cmp(&durations[a]));

        let mut beta = Array1::<f64>::zeros(p);
        let mut state = efron(&centered, durations, events, &order, &beta);
        let mut iterations = 0;

        loop {
            if iterations >= MAX_ITER {
                return Err(Error::ConvergenceFailure {
                    model: "Cox proportional hazards",
                    iterations,
                });
            }
            iterations += 1;

            let information = state.hessian.mapv(|h| -h);
            let step = spd_inverse(&information)?.dot(&state.gradient);

            if max_abs(&step) < TOL {
                beta = &beta + &step;
                state = efron(&centered, durations, events, &order, &beta);
                break;
            }

            let objective = |candidate: &Array1<f64>| {
                let next = efron(&centered, durations, events, &order, candidate);
                (next.log_likelihood, next)
            };
            let Some((candidate, _, next)) = halve_step(&beta, &step, state.log_likelihood, objective)
            else {
                tracing::warn!(iterations, "step halving could not improve the partial likelihood");
                return Err(Error::ConvergenceFailure {
                    model: "Cox proportional hazards",
                    iterations,
                });
            };

            let max_change = max_abs(&(&candidate - &beta));
            let ll_change = (next.log_likelihood - state.log_likelihood).abs();
            beta = candidate;
            state = next;

            if max_change < TOL || ll_change < TOL * 1e-3 {
                break;
            }
        }

        let covariance = spd_inverse(&state.hessian.mapv(|h| -h))?;
        tracing::debug!(
            iterations,
            log_partial_likelihood = state.log_likelihood,
            "fitted Cox model"
        );

        Ok(Self {
            coefficients: beta,
            covariance,
            log_partial_likelihood: state.log_likelihood,
            iterations,
        })
    }

    /// One coefficient per covariate (no intercept)
    #[must_use]
    pub const fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    /// Hazard ratios `exp(coef)`
    #[must_use]
    pub fn hazard_ratios(&self) -> Array1<f64> {
        self.coefficients.mapv(f64::exp)
    }

    /// Log partial likelihood at the optimum
    #[must_use]
    pub const fn log_partial_likelihood(&self) -> f64 {
        self.log_partial_likelihood
    }

    /// Newton iterations performed
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Relative risk score `x'b` for each row
    #[must_use]
    pub fn predict_log_partial_hazard(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.coefficients)
    }
}

struct EfronState {
    log_likelihood: f64,
    gradient: Array1<f64>,
    hessian: Array2<f64>,
}

/// Log partial likelihood, gradient and Hessian with Efron ties
#[allow(clippy::cast_precision_loss)]
fn efron(
    x: &Array2<f64>,
    durations: &Array1<f64>,
    events: &[bool],
    order: &[usize],
    beta: &Array1<f64>,
) -> EfronState {
    let p = x.ncols();
    let risk = x.dot(beta);
    let weights = risk.mapv(f64::exp);

    let mut log_likelihood = 0.0;
    let mut gradient = Array1::<f64>::zeros(p);
    let mut hessian = Array2::<f64>::zeros((p, p));

    // risk-set accumulators
    let mut s0 = 0.0;
    let mut s1 = Array1::<f64>::zeros(p);
    let mut s2 = Array2::<f64>::zeros((p, p));

    let mut start = 0;
    while start < order.len() {
        let time = durations[order[start]];
        let mut end = start;
        while end < order.len() && durations[order[end]] == time {
            end += 1;
        }

        let mut t0 = 0.0;
        let mut t1 = Array1::<f64>::zeros(p);
        let mut t2 = Array2::<f64>::zeros((p, p));
        let mut deaths = 0_usize;

        for &i in &order[start..end] {
            let xi = x.row(i);
            let w = weights[i];
            let outer = outer(&xi.to_owned());
            s0 += w;
            s1.scaled_add(w, &xi);
            s2.scaled_add(w, &outer);

            if events[i] {
                deaths += 1;
                log_likelihood += risk[i];
                gradient += &xi;
                t0 += w;
                t1.scaled_add(w, &xi);
                t2.scaled_add(w, &outer);
            }
        }

        for l in 0..deaths {
            let frac = l as f64 / deaths as f64;
            let phi = s0 - frac * t0;
            let phi1 = &s1 - &(&t1 * frac);
            let phi2 = &s2 - &(&t2 * frac);
            let mean = &phi1 / phi;

            log_likelihood -= phi.ln();
            gradient -= &mean;
            hessian -= &(&phi2 / phi - outer(&mean));
        }

        start = end;
    }

    EfronState {
        log_likelihood,
        gradient,
        hessian,
    }
}

fn outer(v: &Array1<f64>) -> Array2<f64> {
    let column = v.view().insert_axis(Axis(1));
    let row = v.view().insert_axis(Axis(0));
    column.dot(&row)
}

/// Harrell's concordance index of a risk score (higher = earlier event)
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn concordance_index(durations: &Array1<f64>, events: &[bool], risk: &Array1<f64>) -> f64 {
    let mut concordant = 0.0;
    let mut comparable = 0.0;
    for i in 0..durations.len() {
        if !events[i] {
            continue;
        }
        for j in 0..durations.len() {
            if durations[j] > durations[i] {
                comparable += 1.0;
                if risk[i] > risk[j] {
                    concordant += 1.0;
                } else if risk[i] == risk[j] {
                    concordant += 0.5;
                }
            }
        }
    }
    if comparable > 0.0 {
        concordant / comparable
    } else {
        f64::NAN
    }
}

/// Per-covariate table of a Cox fit
#[derive(Debug, Clone, Serialize)]
pub struct CoxSummary {
    /// Covariate names
    pub covariates: Vec<String>,
    /// Coefficients
    pub coef: Vec<f64>,
    /// Standard errors
    pub se: Vec<f64>,
    /// Wald z statistics
    pub z: Vec<f64>,
    /// Two-sided p-values
    pub p: Vec<f64>,
    /// Lower 95% coefficient bounds
    pub lower: Vec<f64>,
    /// Upper 95% coefficient bounds
    pub upper: Vec<f64>,
    /// Observations used
    pub n_obs: usize,
    /// Observed events
    pub n_events: usize,
    /// Log partial likelihood
    pub log_partial_likelihood: f64,
    /// Harrell's C on the training data
    pub concordance: f64,
}

impl CoxSummary {
    /// Fit a Cox model and tabulate Wald inference per covariate
    ///
    /// # Errors
    /// See [`CoxModel::fit`]
    pub fn fit(
        x: &Array2<f64>,
        durations: &Array1<f64>,
        events: &[bool],
        covariates: &[String],
    ) -> Result<Self> {
        let model = CoxModel::fit(x, durations, events)?;
        let crit = z_critical(0.05);

        let coef = model.coefficients().to_vec();
        let se: Vec<f64> = (0..coef.len()).map(|j| model.covariance[[j, j]].sqrt()).collect();
        let z: Vec<f64> = coef.iter().zip(&se).map(|(b, s)| b / s).collect();
        let p = z.iter().map(|&z| z_two_sided(z)).collect();
        let lower = coef.iter().zip(&se).map(|(b, s)| b - crit * s).collect();
        let upper = coef.iter().zip(&se).map(|(b, s)| b + crit * s).collect();

        let risk = model.predict_log_partial_hazard(x);
        let concordance = concordance_index(durations, events, &risk);

        Ok(Self {
            covariates: covariates.to_vec(),
            coef,
            se,
            z,
            p,
            lower,
            upper,
            n_obs: durations.len(),
            n_events: events.iter().filter(|&&e| e).count(),
            log_partial_likelihood: model.log_partial_likelihood(),
            concordance,
        })
    }

    /// Render as the `cox_summary.csv` table
    ///
    /// # Errors
    /// Returns error if the batch cannot be assembled
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let exp = |v: &[f64]| -> ArrayRef { Arc::new(Float64Array::from_iter_values(v.iter().map(|x| x.exp()))) };
        let plain = |v: &[f64]| -> ArrayRef { Arc::new(Float64Array::from(v.to_vec())) };
        let neg_log2_p: Vec<f64> = self.p.iter().map(|p| -p.log2()).collect();

        let columns: Vec<(&str, ArrayRef)> = vec![
            ("covariate", Arc::new(StringArray::from(self.covariates.clone()))),
            ("coef", plain(&self.coef)),
            ("exp(coef)", exp(&self.coef)),
            ("se(coef)", plain(&self.se)),
            ("coef lower 95%", plain(&self.lower)),
            ("coef upper 95%", plain(&self.upper)),
            ("exp(coef) lower 95%", exp(&self.lower)),
            ("exp(coef) upper 95%", exp(&self.upper)),
            ("z", plain(&self.z)),
            ("p", plain(&self.p)),
            ("-log2(p)", plain(&neg_log2_p)),
        ];

        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), false))
            .collect();
        let arrays = columns.into_iter().map(|(_, array)| array).collect();
        debug_assert!(fields.iter().skip(1).all(|f| f.data_type() == &DataType::Float64));

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }
}
