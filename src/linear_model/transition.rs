use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::decomposition::EigenfaceBasis;
use crate::error::{Error, Result};
use crate::linear_model::LeastSquares;
use crate::{Matrix, Vector};

/// Linear map from source-basis coordinates to target-basis coordinates,
/// stored as `e_target x e_source`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    matrix: Matrix,
}

impl TransitionMatrix {
    pub fn new(matrix: Matrix) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn source_dim(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn target_dim(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn apply(&self, coords: &Vector) -> Result<Vector> {
        if coords.len() != self.source_dim() {
            return Err(Error::dimension(format!(
                "transition expects {} source coordinates, got {}",
                self.source_dim(),
                coords.len()
            )));
        }
        Ok(self.matrix.dot(coords))
    }
}

/// Least-squares diagnostics of a fitted transition.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionDiagnostics {
    /// Residual sum of squares per target coordinate.
    pub residuals: Vector,
    pub rank: usize,
    pub singular_values: Vector,
}

impl TransitionDiagnostics {
    pub fn total_residual(&self) -> f64 {
        self.residuals.sum()
    }
}

#[derive(Clone, Debug)]
pub struct TransitionFit {
    pub transition: TransitionMatrix,
    pub diagnostics: TransitionDiagnostics,
}

/// Fits the map between two eigenface bases.
///
/// The training faces must come from the *target* class: their projection
/// onto the target basis is the answer the map has to reproduce from their
/// projection onto the source basis.
#[derive(Clone, Debug, Default)]
pub struct TransitionLearner {
    least_squares: LeastSquares,
}

impl TransitionLearner {
    pub fn new() -> Self {
        Self {
            least_squares: LeastSquares::new(),
        }
    }

    pub fn rcond(mut self, rcond: f64) -> Self {
        self.least_squares = self.least_squares.rcond(rcond);
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.least_squares = self.least_squares.max_iterations(max_iterations);
        self
    }

    pub fn fit(
        &self,
        source_basis: &EigenfaceBasis,
        target_basis: &EigenfaceBasis,
        target_class_vectors: &Matrix,
    ) -> Result<TransitionFit> {
        if source_basis.width() != target_basis.width() {
            return Err(Error::dimension(format!(
                "source basis width {} doesn't match target basis width {}",
                source_basis.width(),
                target_basis.width()
            )));
        }
        if target_class_vectors.ncols() != target_basis.width() {
            return Err(Error::dimension(format!(
                "training vectors have width {} but the bases have width {}",
                target_class_vectors.ncols(),
                target_basis.width()
            )));
        }
        if target_class_vectors.nrows() == 0 {
            return Err(Error::dimension("no training vectors to fit a transition"));
        }

        debug!(
            samples = target_class_vectors.nrows(),
            source_dim = source_basis.n_components(),
            target_dim = target_basis.n_components(),
            "fitting transition"
        );

        let correct_coords = target_basis.project_rows(target_class_vectors)?;
        let starting_coords = source_basis.project_rows(target_class_vectors)?;

        let fit = self.least_squares.fit(&starting_coords, &correct_coords)?;
        let transition = TransitionMatrix::new(fit.solution.t().to_owned());

        info!(
            rows = transition.target_dim(),
            cols = transition.source_dim(),
            rank = fit.rank,
            residual = fit.residuals.sum(),
            "transition fitted"
        );

        Ok(TransitionFit {
            transition,
            diagnostics: TransitionDiagnostics {
                residuals: fit.residuals,
                rank: fit.rank,
                singular_values: fit.singular_values,
            },
        })
    }
}

/// Fits the `e_t x e_s` transition from `source_basis` to `target_basis`
/// using faces of the target class.
pub fn fit_transition(
    source_basis: &EigenfaceBasis,
    target_basis: &EigenfaceBasis,
    target_class_vectors: &Matrix,
) -> Result<TransitionFit> {
    TransitionLearner::new().fit(source_basis, target_basis, target_class_vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposition::build_basis;
    use crate::transform::transform;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2, Axis};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand::rngs::StdRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    fn random_faces(n: usize, w: usize, seed: u64) -> Matrix {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::random_using((n, w), Uniform::new(-1.0, 1.0), &mut rng)
    }

    #[test]
    fn test_transition_shape() {
        let source = build_basis(&random_faces(6, 12, 1), 4).unwrap();
        let target = build_basis(&random_faces(6, 12, 2), 3).unwrap();
        let training = random_faces(8, 12, 3);

        let fit = fit_transition(&source, &target, &training).unwrap();

        assert_eq!(fit.transition.matrix().shape(), &[3, 4]);
        assert_eq!(fit.transition.target_dim(), 3);
        assert_eq!(fit.transition.source_dim(), 4);
        assert_eq!(fit.diagnostics.residuals.len(), 3);
        assert_eq!(fit.diagnostics.rank, 4);
    }

    #[test]
    fn test_in_sample_error_matches_residuals() {
        let source = build_basis(&random_faces(7, 10, 4), 3).unwrap();
        let target = build_basis(&random_faces(7, 10, 5), 3).unwrap();
        let training = random_faces(9, 10, 6);

        let fit = fit_transition(&source, &target, &training).unwrap();

        let mut in_sample = Vector::zeros(target.n_components());
        for face in training.axis_iter(Axis(0)) {
            let face = face.to_owned();
            let predicted = fit.transition.apply(&source.project(&face).unwrap()).unwrap();
            let correct = target.project(&face).unwrap();
            in_sample += &(&predicted - &correct).mapv(|r| r * r);
        }
        for (err, reported) in in_sample.iter().zip(fit.diagnostics.residuals.iter()) {
            assert!(*err <= *reported + 1e-10);
        }
        assert_abs_diff_eq!(in_sample.sum(), fit.diagnostics.total_residual(), epsilon = 1e-10);

        // The same error seen through the full transform, measured in the
        // target basis.
        let mut through_transform = 0.0;
        for face in training.axis_iter(Axis(0)) {
            let face = face.to_owned();
            let swapped = transform(&source, &target, &fit.transition, &face).unwrap();
            let diff = target.project(&swapped).unwrap() - target.project(&face).unwrap();
            through_transform += diff.dot(&diff);
        }
        assert_abs_diff_eq!(through_transform, fit.diagnostics.total_residual(), epsilon = 1e-10);
    }

    #[test]
    fn test_identical_bases_give_identity() {
        let faces = random_faces(6, 8, 8);
        let basis = build_basis(&faces, 4).unwrap();

        let fit = fit_transition(&basis, &basis, &faces).unwrap();

        let identity = Matrix::eye(4);
        for (x, y) in fit.transition.matrix().iter().zip(identity.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_underdetermined_is_accepted() {
        let source = build_basis(&random_faces(6, 10, 9), 5).unwrap();
        let target = build_basis(&random_faces(6, 10, 10), 2).unwrap();
        let training = random_faces(3, 10, 11);

        let fit = fit_transition(&source, &target, &training).unwrap();

        assert_eq!(fit.diagnostics.rank, 3);
        assert_eq!(fit.transition.matrix().shape(), &[2, 5]);
    }

    #[test]
    fn test_width_mismatch() {
        let source = build_basis(&random_faces(4, 6, 12), 2).unwrap();
        let target = build_basis(&random_faces(4, 7, 13), 2).unwrap();
        let training = random_faces(4, 7, 14);

        assert!(matches!(
            fit_transition(&source, &target, &training),
            Err(Error::Dimension(_))
        ));
    }

    #[test]
    fn test_training_width_mismatch() {
        let source = build_basis(&random_faces(4, 6, 15), 2).unwrap();
        let target = build_basis(&random_faces(4, 6, 16), 2).unwrap();
        let training = random_faces(4, 5, 17);

        assert!(matches!(
            fit_transition(&source, &target, &training),
            Err(Error::Dimension(_))
        ));
    }

    #[test]
    fn test_no_training_vectors() {
        let source = build_basis(&random_faces(4, 6, 18), 2).unwrap();
        let training = Matrix::zeros((0, 6));

        assert!(matches!(
            fit_transition(&source, &source, &training),
            Err(Error::Dimension(_))
        ));
    }

    #[test]
    fn test_apply_checks_length() {
        let transition = TransitionMatrix::new(array![[1.0, 0.0, 2.0], [0.0, 1.0, 0.0]]);

        let out = transition.apply(&array![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(out, array![7.0, 2.0]);

        assert!(transition.apply(&array![1.0, 2.0]).is_err());
    }
}
