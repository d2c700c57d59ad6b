use tracing::debug;

use crate::decomposition::EigenfaceBasis;
use crate::error::{Error, Result};
use crate::linear_model::TransitionMatrix;
use crate::model::{FaceSwapModel, Gender};
use crate::normalizer::FaceNormalizer;
use crate::{GrayImage, Matrix, Vector};

/// Projects `source_vector` onto `source_basis`, maps the coordinates through
/// `transition` and deprojects them with `target_basis`.
///
/// The result has the same length as the input. Swapping back with the
/// reverse transition does not recover the input; truncation is lossy.
pub fn transform(
    source_basis: &EigenfaceBasis,
    target_basis: &EigenfaceBasis,
    transition: &TransitionMatrix,
    source_vector: &Vector,
) -> Result<Vector> {
    check_compatible(source_basis, target_basis, transition)?;
    if source_vector.len() != source_basis.width() {
        return Err(Error::dimension(format!(
            "source vector has length {} but the source basis width is {}",
            source_vector.len(),
            source_basis.width()
        )));
    }

    let source_params = source_basis.project(source_vector)?;
    let target_params = transition.apply(&source_params)?;
    target_basis.deproject(&target_params)
}

fn check_compatible(
    source_basis: &EigenfaceBasis,
    target_basis: &EigenfaceBasis,
    transition: &TransitionMatrix,
) -> Result<()> {
    if source_basis.width() != target_basis.width() {
        return Err(Error::dimension(format!(
            "source basis width {} doesn't match target basis width {}",
            source_basis.width(),
            target_basis.width()
        )));
    }
    if transition.source_dim() != source_basis.n_components()
        || transition.target_dim() != target_basis.n_components()
    {
        return Err(Error::dimension(format!(
            "transition is {}x{} but the bases need {}x{}",
            transition.target_dim(),
            transition.source_dim(),
            target_basis.n_components(),
            source_basis.n_components()
        )));
    }
    Ok(())
}

/// Normalized input face and its swapped reconstruction, both reshaped to
/// `(height, width)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlteredFace {
    pub original: Matrix,
    pub altered: Matrix,
}

/// Read-only inference view over a trained model.
#[derive(Debug, Clone, Copy)]
pub struct Transformer<'m> {
    model: &'m FaceSwapModel,
}

impl<'m> Transformer<'m> {
    pub fn new(model: &'m FaceSwapModel) -> Self {
        Self { model }
    }

    /// Maps a normalized face of class `from` into the opposite class.
    pub fn swap(&self, from: Gender, face: &Vector) -> Result<Vector> {
        transform(
            self.model.basis(from),
            self.model.basis(from.opposite()),
            self.model.transition(from),
            face,
        )
    }

    /// Row-wise [`Transformer::swap`] over a face matrix.
    pub fn swap_batch(&self, from: Gender, faces: &Matrix) -> Result<Matrix> {
        let source = self.model.basis(from);
        let target = self.model.basis(from.opposite());
        let transition = self.model.transition(from);
        check_compatible(source, target, transition)?;

        let source_params = source.project_rows(faces)?;
        let target_params = source_params.dot(&transition.matrix().t());
        Ok(target_params.dot(target.components()))
    }

    /// Normalizes `image` and swaps it. `Ok(None)` when no face was found.
    pub fn alter_image<N>(&self, normalizer: &N, image: &GrayImage, from: Gender) -> Result<Option<AlteredFace>>
    where
        N: FaceNormalizer + ?Sized,
    {
        if normalizer.face_shape() != self.model.face_shape() {
            return Err(Error::dimension(format!(
                "normalizer produces {:?} faces but the model expects {:?}",
                normalizer.face_shape(),
                self.model.face_shape()
            )));
        }

        let Some(face) = normalizer.normalize(image) else {
            debug!("No face found, nothing to alter");
            return Ok(None);
        };

        let altered = self.swap(from, &face)?;
        Ok(Some(AlteredFace {
            original: reshape(face, self.model.face_shape())?,
            altered: reshape(altered, self.model.face_shape())?,
        }))
    }
}

fn reshape(face: Vector, (height, width): (usize, usize)) -> Result<Matrix> {
    Matrix::from_shape_vec((height, width), face.to_vec()).map_err(|e| Error::dimension(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ClassFaces;
    use crate::decomposition::build_basis;
    use crate::linear_model::fit_transition;
    use crate::normalizer::{FaceRegion, MaskedFaceNormalizer, NormalizerConfig};
    use crate::training::{Trainer, TrainingConfig};
    use approx::assert_abs_diff_eq;
    use image::Luma;
    use ndarray::{Array2, Axis};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand::rngs::StdRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    fn random_faces(n: usize, w: usize, seed: u64) -> Matrix {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::random_using((n, w), Uniform::new(-1.0, 1.0), &mut rng)
    }

    fn trained_model(shape: (usize, usize), e: usize) -> FaceSwapModel {
        let w = shape.0 * shape.1;
        let male = ClassFaces::from_matrix(Gender::Male, random_faces(8, w, 21), shape).unwrap();
        let female = ClassFaces::from_matrix(Gender::Female, random_faces(8, w, 22), shape).unwrap();
        Trainer::new(TrainingConfig {
            max_eigenfaces: e,
            max_faces: 8,
        })
        .fit(&male, &female)
        .unwrap()
        .model
    }

    #[test]
    fn test_transform_shape_preserved() {
        let model = trained_model((2, 5), 3);
        let face = random_faces(1, 10, 30).row(0).to_owned();

        let altered = Transformer::new(&model).swap(Gender::Male, &face).unwrap();
        assert_eq!(altered.len(), 10);
    }

    #[test]
    fn test_transform_wrong_width() {
        let model = trained_model((2, 5), 3);
        let transformer = Transformer::new(&model);

        for len in [9, 11] {
            let result = transformer.swap(Gender::Female, &Vector::zeros(len));
            assert!(matches!(result, Err(Error::Dimension(_))));
        }
    }

    #[test]
    fn test_transform_is_linear() {
        let model = trained_model((3, 3), 4);
        let transformer = Transformer::new(&model);
        let a = random_faces(1, 9, 31).row(0).to_owned();
        let b = random_faces(1, 9, 32).row(0).to_owned();

        let combined = transformer.swap(Gender::Male, &(&a * 2.0 + &b)).unwrap();
        let separate = transformer.swap(Gender::Male, &a).unwrap() * 2.0
            + transformer.swap(Gender::Male, &b).unwrap();

        for (x, y) in combined.iter().zip(separate.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_swap_batch_matches_single() {
        let model = trained_model((2, 4), 3);
        let transformer = Transformer::new(&model);
        let faces = random_faces(4, 8, 33);

        let batch = transformer.swap_batch(Gender::Female, &faces).unwrap();
        for (row, swapped) in faces.axis_iter(Axis(0)).zip(batch.axis_iter(Axis(0))) {
            let single = transformer.swap(Gender::Female, &row.to_owned()).unwrap();
            for (x, y) in single.iter().zip(swapped.iter()) {
                assert_abs_diff_eq!(*x, *y, epsilon = 1e-10);
            }
        }

        assert!(transformer.swap_batch(Gender::Female, &Matrix::zeros((2, 7))).is_err());
    }

    #[test]
    fn test_transform_rejects_mismatched_transition() {
        let source = build_basis(&random_faces(5, 6, 34), 3).unwrap();
        let target = build_basis(&random_faces(5, 6, 35), 2).unwrap();
        let wrong = TransitionMatrix::new(Matrix::zeros((3, 2)));

        let result = transform(&source, &target, &wrong, &Vector::zeros(6));
        assert!(matches!(result, Err(Error::Dimension(_))));
    }

    #[test]
    fn test_affine_offset_between_classes() {
        // Class A faces are g0 + alpha g1 + beta g2; class B faces add a fixed
        // offset c orthogonal to that subspace. A linear transition can carry
        // the offset because every face has unit weight on g0.
        let w = 16;
        let unit = |indices: &[usize]| {
            let mut v = Vector::zeros(w);
            for &i in indices {
                v[i] = 1.0;
            }
            v
        };
        let g0 = unit(&[0, 1, 2, 3]) * 0.5;
        let g1 = unit(&[4, 5]) - unit(&[6, 7]);
        let g2 = unit(&[8, 9, 10]);
        let c = unit(&[12, 13]) * 0.75 - unit(&[15]) * 0.3;

        let coeffs = [(1.0, 0.5), (-0.5, 1.5), (0.8, -1.0), (0.2, 0.3), (-1.2, -0.7)];
        let mut class_a = Matrix::zeros((coeffs.len(), w));
        let mut class_b = Matrix::zeros((coeffs.len(), w));
        for (i, &(alpha, beta)) in coeffs.iter().enumerate() {
            let a = &g0 + &(&g1 * alpha) + &(&g2 * beta);
            class_b.row_mut(i).assign(&(&a + &c));
            class_a.row_mut(i).assign(&a);
        }

        let basis_a = build_basis(&class_a, 3).unwrap();
        let basis_b = build_basis(&class_b, 3).unwrap();
        // A -> B is fitted on B faces.
        let fit = fit_transition(&basis_a, &basis_b, &class_b).unwrap();

        let novel = &g0 + &(&g1 * 0.4) + &(&g2 * -0.9);
        let expected = &novel + &c;
        let swapped = transform(&basis_a, &basis_b, &fit.transition, &novel).unwrap();

        for (x, y) in swapped.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-8);
        }
        assert!(fit.diagnostics.total_residual() < 1e-12);
    }

    #[test]
    fn test_alter_image() {
        let model = trained_model((4, 4), 3);
        let normalizer = MaskedFaceNormalizer::new(NormalizerConfig {
            width: 4,
            height: 4,
            elliptical_mask: false,
        })
        .unwrap();
        let image = GrayImage::from_fn(12, 12, |x, y| Luma([(x * 20 + y * 3) as u8]));

        let altered = Transformer::new(&model)
            .alter_image(&normalizer, &image, Gender::Male)
            .unwrap()
            .unwrap();

        assert_eq!(altered.original.shape(), &[4, 4]);
        assert_eq!(altered.altered.shape(), &[4, 4]);
    }

    #[test]
    fn test_alter_image_without_face() {
        let model = trained_model((4, 4), 3);
        let normalizer = MaskedFaceNormalizer::with_locator(
            NormalizerConfig {
                width: 4,
                height: 4,
                elliptical_mask: false,
            },
            |_: &GrayImage| -> Option<FaceRegion> { None },
        )
        .unwrap();
        let image = GrayImage::new(12, 12);

        let result = Transformer::new(&model).alter_image(&normalizer, &image, Gender::Female);
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_alter_image_shape_mismatch() {
        let model = trained_model((4, 4), 3);
        let normalizer = MaskedFaceNormalizer::new(NormalizerConfig::default()).unwrap();
        let image = GrayImage::new(12, 12);

        let result = Transformer::new(&model).alter_image(&normalizer, &image, Gender::Male);
        assert!(matches!(result, Err(Error::Dimension(_))));
    }
}
