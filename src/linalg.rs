//! Bridge between the crate's `ndarray` matrices and `nalgebra`'s dense
//! decompositions.

use std::cmp::Ordering;

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::Axis;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::metrics::orthonormality_error;
use crate::{ArrayView2, Matrix, Vector};

/// Iteration cap handed to the SVD solver. Zero means "until convergence".
pub const DEFAULT_MAX_ITERATIONS: usize = 100_000;

/// Convergence thresholds tried in order for nalgebra's bidiagonal SVD.
/// With exactly-zero singular values the tightest one can return vectors
/// that do not recompose the input.
const SVD_EPSILONS: [f64; 2] = [f64::EPSILON, 1e-12];

/// Bound on `max |U S Vt - A|` relative to `max |A|`, and on the
/// orthonormality error of `U` and `Vt`.
const DECOMPOSITION_TOLERANCE: f64 = 1e-9;

/// Thin singular value decomposition `A = U diag(s) Vt`.
///
/// For an `m x n` input with `k = min(m, n)`, `u` is `m x k`, `singular_values`
/// has length `k` and `vt` is `k x n`. Triplets are ordered by descending
/// singular value.
#[derive(Clone, Debug)]
pub struct Svd {
    pub u: Matrix,
    pub singular_values: Vector,
    pub vt: Matrix,
}

pub fn to_dmatrix(a: &ArrayView2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

pub fn from_dmatrix(m: &DMatrix<f64>) -> Matrix {
    Matrix::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Computes the thin SVD of `a` and checks that it recomposes `a`.
///
/// nalgebra's SVD is tried first. If no threshold yields a consistent
/// decomposition, the right singular vectors are taken from the symmetric
/// eigendecomposition of the Gram matrix instead.
pub fn thin_svd(a: &Matrix, max_iterations: usize) -> Result<Svd> {
    if a.nrows() == 0 || a.ncols() == 0 {
        return Err(Error::dimension(format!(
            "cannot decompose an empty {}x{} matrix",
            a.nrows(),
            a.ncols()
        )));
    }
    if a.iter().any(|v| !v.is_finite()) {
        return Err(Error::Numerical("matrix contains non-finite values".to_string()));
    }

    let dm = to_dmatrix(&a.view());
    for eps in SVD_EPSILONS {
        let Some(svd) = bidiagonal_svd(&dm, eps, max_iterations) else {
            debug!(eps, "SVD did not converge");
            continue;
        };
        if is_consistent(a, &svd) {
            debug!(rows = a.nrows(), cols = a.ncols(), eps, "computed thin SVD");
            return Ok(sorted(svd));
        }
        debug!(eps, "SVD does not recompose its input");
    }

    warn!(
        rows = a.nrows(),
        cols = a.ncols(),
        "falling back to Gram eigendecomposition for SVD"
    );
    match gram_svd(a, max_iterations) {
        Some(svd) if is_consistent(a, &svd) => Ok(svd),
        _ => Err(Error::Numerical(format!(
            "SVD of {}x{} matrix did not converge within {} iterations",
            a.nrows(),
            a.ncols(),
            max_iterations
        ))),
    }
}

fn bidiagonal_svd(a: &DMatrix<f64>, eps: f64, max_iterations: usize) -> Option<Svd> {
    let svd = a.clone().try_svd(true, true, eps, max_iterations)?;
    Some(Svd {
        u: from_dmatrix(svd.u.as_ref()?),
        singular_values: svd.singular_values.iter().copied().collect(),
        vt: from_dmatrix(svd.v_t.as_ref()?),
    })
}

fn is_consistent(a: &Matrix, svd: &Svd) -> bool {
    if svd.singular_values.iter().any(|s| !s.is_finite() || *s < 0.0) {
        return false;
    }
    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let rebuilt = (&svd.u * &svd.singular_values).dot(&svd.vt);
    let recompose = (a - &rebuilt).iter().fold(0.0_f64, |m, d| m.max(d.abs()));

    recompose <= DECOMPOSITION_TOLERANCE * scale
        && orthonormality_error(&svd.u.t().to_owned()) <= DECOMPOSITION_TOLERANCE
        && orthonormality_error(&svd.vt) <= DECOMPOSITION_TOLERANCE
}

fn sorted(svd: Svd) -> Svd {
    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&i, &j| {
        svd.singular_values[j]
            .partial_cmp(&svd.singular_values[i])
            .unwrap_or(Ordering::Equal)
    });

    Svd {
        u: svd.u.select(Axis(1), &order),
        singular_values: svd.singular_values.select(Axis(0), &order),
        vt: svd.vt.select(Axis(0), &order),
    }
}

/// SVD from the eigenvectors `V` of `A^T A`. Singular values are measured as
/// `|A v|` rather than square roots of eigenvalues, so null directions stay
/// at zero.
fn gram_svd(a: &Matrix, max_iterations: usize) -> Option<Svd> {
    let (m, n) = a.dim();
    if m < n {
        let t = gram_svd(&a.t().to_owned(), max_iterations)?;
        return Some(Svd {
            u: t.vt.t().to_owned(),
            singular_values: t.singular_values,
            vt: t.u.t().to_owned(),
        });
    }

    let gram = to_dmatrix(&a.t().dot(a).view());
    let eigen = SymmetricEigen::try_new(gram, f64::EPSILON, max_iterations)?;
    let v = from_dmatrix(&eigen.eigenvectors);
    let av = a.dot(&v);

    let norms: Vector = av.columns().into_iter().map(|c| c.dot(&c).sqrt()).collect();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| norms[j].partial_cmp(&norms[i]).unwrap_or(Ordering::Equal));

    let s_max = norms[order[0]];
    let cutoff = f64::EPSILON * m as f64 * s_max;

    let mut u = Matrix::zeros((m, n));
    let mut singular_values = Vector::zeros(n);
    for (col, &j) in order.iter().enumerate() {
        if norms[j] > cutoff {
            singular_values[col] = norms[j];
            u.column_mut(col).assign(&(&av.column(j) / norms[j]));
        }
    }
    orthonormalize_columns(&mut u);

    Some(Svd {
        u,
        singular_values,
        vt: v.select(Axis(1), &order).t().to_owned(),
    })
}

/// Modified Gram-Schmidt over the columns of `u`, left to right. Zero columns
/// are replaced by the standard basis vector with the largest component
/// orthogonal to the columns before them.
fn orthonormalize_columns(u: &mut Matrix) {
    let m = u.nrows();
    for j in 0..u.ncols() {
        let mut col = u.column(j).to_owned();
        if col.iter().all(|&x| x == 0.0) {
            let done: &Matrix = u;
            col = (0..m)
                .map(|i| {
                    let mut e = Vector::zeros(m);
                    e[i] = 1.0;
                    orthogonalize(&mut e, done, j);
                    e
                })
                .max_by(|a, b| a.dot(a).partial_cmp(&b.dot(b)).unwrap_or(Ordering::Equal))
                .unwrap_or_else(|| Vector::zeros(m));
        }
        // Two passes keep the result orthogonal to working precision.
        orthogonalize(&mut col, u, j);
        orthogonalize(&mut col, u, j);
        let norm = col.dot(&col).sqrt();
        if norm > 0.0 {
            col /= norm;
        }
        u.column_mut(j).assign(&col);
    }
}

fn orthogonalize(v: &mut Vector, u: &Matrix, before: usize) {
    for k in 0..before {
        let q = u.column(k);
        let p = q.dot(v);
        v.scaled_add(-p, &q);
    }
}
