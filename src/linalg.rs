//! Dense linear algebra bridges
//!
//! Model code works on `ndarray`. Factorisations go through `faer`,
//! estimators fitted for prediction go through `smartcore`; the helpers here
//! convert between the three representations.

use crate::{Error, Result};
use faer::solvers::SolverCore;
use faer::{Mat, Side};
use ndarray::{Array1, Array2, Axis};
use smartcore::linalg::basic::matrix::DenseMatrix;

/// Largest tolerated entry of `A * A^-1 - I`
const INVERSE_RESIDUAL_TOL: f64 = 1e-6;

/// Copy into a `faer` matrix
#[must_use]
pub fn to_faer(matrix: &Array2<f64>) -> Mat<f64> {
    Mat::from_fn(matrix.nrows(), matrix.ncols(), |i, j| matrix[[i, j]])
}

/// Copy out of a `faer` matrix
#[must_use]
pub fn from_faer(matrix: &Mat<f64>) -> Array2<f64> {
    Array2::from_shape_fn((matrix.nrows(), matrix.ncols()), |(i, j)| matrix.read(i, j))
}

/// Row-major copy into a `smartcore` matrix
///
/// # Errors
/// Returns [`Error::InvalidInput`] for an empty matrix
pub fn dense_matrix(matrix: &Array2<f64>) -> Result<DenseMatrix<f64>> {
    let rows: Vec<Vec<f64>> = matrix.rows().into_iter().map(|row| row.to_vec()).collect();
    DenseMatrix::from_2d_vec(&rows)
        .map_err(|e| Error::InvalidInput(format!("cannot build design matrix: {e}")))
}

/// Inverse of a symmetric positive-definite matrix (Cholesky)
///
/// Information matrices and `X'X` are SPD whenever the model is
/// identifiable, so failure here means the design is degenerate.
///
/// # Errors
/// Returns [`Error::SingularMatrix`] if the matrix is not square, has
/// non-finite entries, is not positive definite, or is too ill-conditioned
/// for the inverse to reproduce the identity
pub fn spd_inverse(matrix: &Array2<f64>) -> Result<Array2<f64>> {
    let (n, m) = matrix.dim();
    if n != m {
        return Err(Error::SingularMatrix(format!("cannot invert a {n}x{m} matrix")));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(Error::SingularMatrix(format!("{n}x{n} matrix has non-finite entries")));
    }

    let cholesky = to_faer(matrix).cholesky(Side::Lower).map_err(|e| {
        Error::SingularMatrix(format!("{n}x{n} matrix is not positive definite ({e:?})"))
    })?;
    let inverse = from_faer(&cholesky.inverse());

    let residual = (matrix.dot(&inverse) - Array2::<f64>::eye(n))
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if !residual.is_finite() || residual > INVERSE_RESIDUAL_TOL {
        return Err(Error::SingularMatrix(format!(
            "{n}x{n} matrix is numerically singular (inverse residual {residual:e})"
        )));
    }
    Ok(inverse)
}

/// Prepend a column of ones
#[must_use]
pub fn add_intercept(x: &Array2<f64>) -> Array2<f64> {
    let (n, p) = x.dim();
    let mut design = Array2::<f64>::ones((n, p + 1));
    design.slice_mut(ndarray::s![.., 1..]).assign(x);
    design
}

/// Select rows by index
#[must_use]
pub fn take_rows(matrix: &Array2<f64>, rows: &[usize]) -> Array2<f64> {
    matrix.select(Axis(0), rows)
}

/// Select entries by index
#[must_use]
pub fn take(values: &Array1<f64>, rows: &[usize]) -> Array1<f64> {
    values.select(Axis(0), rows)
}
