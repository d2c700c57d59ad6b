use ndarray::s;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::linalg::{self, DEFAULT_MAX_ITERATIONS};
use crate::{Matrix, Vector};

/// Truncated orthonormal basis of one face class.
///
/// `components` is `e x w`: one eigenface per row, ordered by descending
/// singular value. Each row is only defined up to sign.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EigenfaceBasis {
    components: Matrix,
    singular_values: Vector,
    total_energy: f64,
}

impl EigenfaceBasis {
    pub(crate) fn new(components: Matrix, singular_values: Vector, total_energy: f64) -> Self {
        Self {
            components,
            singular_values,
            total_energy,
        }
    }

    pub fn components(&self) -> &Matrix {
        &self.components
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    /// Length of the face vectors this basis spans.
    pub fn width(&self) -> usize {
        self.components.ncols()
    }

    pub fn singular_values(&self) -> &Vector {
        &self.singular_values
    }

    /// Share of the class's total squared singular value mass captured by
    /// each retained eigenface.
    pub fn explained_variance_ratio(&self) -> Vector {
        if self.total_energy > 0.0 {
            self.singular_values.mapv(|s| s * s / self.total_energy)
        } else {
            Vector::zeros(self.singular_values.len())
        }
    }

    /// Coordinates of `face` in this basis (`w -> e`).
    pub fn project(&self, face: &Vector) -> Result<Vector> {
        if face.len() != self.width() {
            return Err(Error::dimension(format!(
                "face vector has length {} but the basis width is {}",
                face.len(),
                self.width()
            )));
        }
        Ok(self.components.dot(face))
    }

    /// Row-wise projection of a face matrix (`s x w -> s x e`).
    pub fn project_rows(&self, faces: &Matrix) -> Result<Matrix> {
        if faces.ncols() != self.width() {
            return Err(Error::dimension(format!(
                "face matrix has {} columns but the basis width is {}",
                faces.ncols(),
                self.width()
            )));
        }
        Ok(faces.dot(&self.components.t()))
    }

    /// Weighted sum of eigenfaces (`e -> w`).
    pub fn deproject(&self, coords: &Vector) -> Result<Vector> {
        if coords.len() != self.n_components() {
            return Err(Error::dimension(format!(
                "got {} coordinates for a basis of {} eigenfaces",
                coords.len(),
                self.n_components()
            )));
        }
        Ok(self.components.t().dot(coords))
    }

    pub fn reconstruct(&self, face: &Vector) -> Result<Vector> {
        let coords = self.project(face)?;
        self.deproject(&coords)
    }
}

/// Learns an [`EigenfaceBasis`] from a matrix of normalized faces (one per row).
#[derive(Clone, Debug)]
pub struct Eigenfaces {
    n_components: usize,
    max_iterations: usize,
}

impl Eigenfaces {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Iteration cap for the SVD; `0` lets it run until convergence.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn fit(&self, faces: &Matrix) -> Result<EigenfaceBasis> {
        if faces.nrows() == 0 || faces.ncols() == 0 {
            return Err(Error::dimension(
                "face matrix must have at least one face and one pixel",
            ));
        }

        let (n_faces, width) = (faces.nrows(), faces.ncols());
        let limit = n_faces.min(width);

        if self.n_components == 0 || self.n_components > limit {
            return Err(Error::dimension(format!(
                "n_components={} must be between 1 and min(n_faces, width)={}",
                self.n_components, limit
            )));
        }

        debug!(n_faces, width, "building eigenfaces");

        // Left singular vectors of the w x n transpose are the eigenvectors
        // of the pixel autocorrelation matrix.
        let svd = linalg::thin_svd(&faces.t().to_owned(), self.max_iterations)?;

        let components = svd.u.slice(s![.., ..self.n_components]).t().to_owned();
        let singular_values = svd.singular_values.slice(s![..self.n_components]).to_owned();
        let total_energy = svd.singular_values.mapv(|s| s * s).sum();

        debug!(
            rows = components.nrows(),
            cols = components.ncols(),
            "eigenface basis ready"
        );

        Ok(EigenfaceBasis::new(components, singular_values, total_energy))
    }
}

/// Builds the `max_faces x w` eigenface basis of `face_matrix`.
pub fn build_basis(face_matrix: &Matrix, max_faces: usize) -> Result<EigenfaceBasis> {
    Eigenfaces::new(max_faces).fit(face_matrix)
}
