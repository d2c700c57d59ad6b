use ndarray::Axis;

use crate::error::{Error, Result};
use crate::linalg::{self, DEFAULT_MAX_ITERATIONS};
use crate::{Matrix, Vector};

/// Multi-output ordinary least squares without intercept, solved through the
/// SVD of the design matrix.
///
/// Singular values at or below `rcond * s_max` are treated as zero, so
/// rank-deficient systems get the minimum-norm solution.
#[derive(Clone, Debug)]
pub struct LeastSquares {
    rcond: Option<f64>,
    max_iterations: usize,
}

/// Solution of `a . x ~= b` plus solver diagnostics.
#[derive(Clone, Debug)]
pub struct LeastSquaresFit {
    /// `n_features x n_outputs`.
    pub solution: Matrix,
    /// Residual sum of squares for each output column.
    pub residuals: Vector,
    /// Number of singular values above the cutoff.
    pub rank: usize,
    /// Singular values of the design matrix, descending.
    pub singular_values: Vector,
}

impl LeastSquares {
    pub fn new() -> Self {
        Self {
            rcond: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Relative cutoff for small singular values. Defaults to
    /// `f64::EPSILON * max(n_samples, n_features)`.
    pub fn rcond(mut self, rcond: f64) -> Self {
        self.rcond = Some(rcond);
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn fit(&self, a: &Matrix, b: &Matrix) -> Result<LeastSquaresFit> {
        if a.nrows() != b.nrows() {
            return Err(Error::dimension(format!(
                "design matrix has {} rows but targets have {}",
                a.nrows(),
                b.nrows()
            )));
        }

        if a.nrows() == 0 || a.ncols() == 0 {
            return Err(Error::dimension(
                "design matrix must have at least one sample and one feature",
            ));
        }

        let rcond = match self.rcond {
            Some(r) if r.is_finite() && r >= 0.0 => r,
            Some(r) => {
                return Err(Error::InvalidConfig(format!(
                    "rcond must be a non-negative finite number, got {}",
                    r
                )));
            }
            None => f64::EPSILON * a.nrows().max(a.ncols()) as f64,
        };

        let svd = linalg::thin_svd(a, self.max_iterations)?;
        let s_max = svd.singular_values.iter().next().copied().unwrap_or(0.0);
        let cutoff = rcond * s_max;

        // x = V diag(1/s) U^T b over the retained singular values.
        let mut scaled = svd.u.t().dot(b);
        let mut rank = 0;
        for (mut row, &s) in scaled.axis_iter_mut(Axis(0)).zip(svd.singular_values.iter()) {
            if s > cutoff {
                row /= s;
                rank += 1;
            } else {
                row.fill(0.0);
            }
        }
        let mut fit = LeastSquaresFit {
            solution: svd.vt.t().dot(&scaled),
            residuals: Vector::zeros(b.ncols()),
            rank,
            singular_values: svd.singular_values,
        };
        fit.residuals = (&fit.predict(a)? - b).mapv(|r| r * r).sum_axis(Axis(0));

        Ok(fit)
    }
}

impl Default for LeastSquares {
    fn default() -> Self {
        Self::new()
    }
}

impl LeastSquaresFit {
    pub fn predict(&self, a: &Matrix) -> Result<Matrix> {
        if a.ncols() != self.solution.nrows() {
            return Err(Error::dimension(format!(
                "Number of features in X ({}) doesn't match training data ({})",
                a.ncols(),
                self.solution.nrows()
            )));
        }
        Ok(a.dot(&self.solution))
    }
}
