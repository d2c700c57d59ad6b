use crate::decomposition::EigenfaceBasis;
use crate::error::{Error, Result};
use crate::{Matrix, Vector};

pub fn mean_squared_error(y_true: &Vector, y_pred: &Vector) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(Error::dimension("y_true and y_pred must have the same length"));
    }

    let diff = y_true - y_pred;
    diff.mapv(|x| x * x)
        .mean()
        .ok_or_else(|| Error::dimension("cannot score empty vectors"))
}

pub fn max_absolute_error(y_true: &Vector, y_pred: &Vector) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(Error::dimension("y_true and y_pred must have the same length"));
    }

    Ok((y_true - y_pred).iter().fold(0.0, |acc: f64, d| acc.max(d.abs())))
}

/// Largest entry of `|R R^T - I|`; zero for perfectly orthonormal rows.
pub fn orthonormality_error(rows: &Matrix) -> f64 {
    let gram = rows.dot(&rows.t());
    let identity = Matrix::eye(rows.nrows());
    (&gram - &identity).iter().fold(0.0, |acc: f64, d| acc.max(d.abs()))
}

/// Largest entry of the difference between the orthogonal projectors onto
/// the row spaces of `a` and `b`. Both must have orthonormal rows.
///
/// Insensitive to row signs and to rotations within the subspace.
pub fn subspace_distance(a: &Matrix, b: &Matrix) -> Result<f64> {
    if a.ncols() != b.ncols() {
        return Err(Error::dimension(format!(
            "subspaces live in different spaces ({} vs {} columns)",
            a.ncols(),
            b.ncols()
        )));
    }

    let pa = a.t().dot(a);
    let pb = b.t().dot(b);
    Ok((&pa - &pb).iter().fold(0.0, |acc: f64, d| acc.max(d.abs())))
}

/// Mean squared error between `faces` and their projection onto `basis`.
pub fn reconstruction_error(basis: &EigenfaceBasis, faces: &Matrix) -> Result<f64> {
    let coords = basis.project_rows(faces)?;
    let rebuilt = coords.dot(basis.components());
    (faces - &rebuilt)
        .mapv(|x| x * x)
        .mean()
        .ok_or_else(|| Error::dimension("cannot score an empty face matrix"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposition::build_basis;
    use ndarray::array;

    #[test]
    fn test_mean_squared_error() {
        let y_true = array![1.0, 2.0, 3.0];
        let y_pred = array![1.0, 2.0, 3.0];

        let mse = mean_squared_error(&y_true, &y_pred).unwrap();
        assert!((mse - 0.0).abs() < 1e-10);

        let mse = mean_squared_error(&y_true, &array![2.0, 2.0, 1.0]).unwrap();
        assert!((mse - 5.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_mean_squared_error_length_mismatch() {
        assert!(mean_squared_error(&array![1.0], &array![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_max_absolute_error() {
        let err = max_absolute_error(&array![1.0, -2.0, 3.0], &array![1.5, 1.0, 3.0]).unwrap();
        assert!((err - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_orthonormality_error() {
        let rows = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        assert!(orthonormality_error(&rows) < 1e-12);

        let skewed = array![[1.0, 0.0], [1.0, 1.0]];
        assert!(orthonormality_error(&skewed) > 0.5);
    }

    #[test]
    fn test_subspace_distance_ignores_sign_and_rotation() {
        let h = std::f64::consts::FRAC_1_SQRT_2;
        let a = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let b = array![[h, h, 0.0], [h, -h, 0.0]];
        let c = array![[-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];

        assert!(subspace_distance(&a, &b).unwrap() < 1e-12);
        assert!(subspace_distance(&a, &c).unwrap() > 0.5);
        assert!(subspace_distance(&a, &array![[1.0, 0.0]]).is_err());
    }

    #[test]
    fn test_reconstruction_error() {
        let faces = array![[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 0.5]];
        let full = build_basis(&faces, 3).unwrap();
        let partial = build_basis(&faces, 2).unwrap();

        assert!(reconstruction_error(&full, &faces).unwrap() < 1e-20);
        // The weakest mode (0.5 on the last axis) is dropped.
        let err = reconstruction_error(&partial, &faces).unwrap();
        assert!((err - 0.25 / 9.0).abs() < 1e-12);
    }
}
