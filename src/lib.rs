//! Eigenface models of two face classes and a learned linear transition
//! between them.
//!
//! Each class (male / female) gets its own truncated orthonormal basis built
//! from an SVD of its normalized face vectors. A least-squares transition
//! matrix maps coordinates in one basis to coordinates in the other, which is
//! enough to reconstruct a "swapped" version of a face that was never seen
//! during training.
//!
//! ```rust
//! use eigenswap::{build_basis, Matrix};
//! use ndarray::array;
//!
//! let faces: Matrix = array![
//!     [1.0, 0.0, 0.0, 0.0],
//!     [0.0, 2.0, 0.0, 0.0],
//!     [0.0, 0.0, 3.0, 0.0]
//! ];
//! let basis = build_basis(&faces, 2).unwrap();
//! assert_eq!(basis.components().shape(), &[2, 4]);
//! ```

pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod dataset;
pub mod decomposition;
pub mod error;
pub mod linalg;
pub mod linear_model;
pub mod metrics;
pub mod model;
pub mod normalizer;
pub mod render;
pub mod training;
pub mod transform;

pub use dataset::ClassFaces;
pub use decomposition::{build_basis, EigenfaceBasis, Eigenfaces};
pub use error::{Error, Result};
pub use linear_model::{fit_transition, LeastSquares, LeastSquaresFit, TransitionFit, TransitionLearner, TransitionMatrix};
pub use model::{FaceSwapModel, Gender};
pub use normalizer::{FaceLocator, FaceNormalizer, FaceRegion, MaskedFaceNormalizer, NormalizerConfig, WholeFrameLocator};
pub use training::{train, ClassSummary, TrainedModel, Trainer, TrainingConfig, TrainingSummary};
pub use transform::{transform, AlteredFace, Transformer};

pub type Vector = Array1<f64>;
pub type Matrix = Array2<f64>;

/// Grayscale 8-bit image, as decoded by the `image` crate.
pub type GrayImage = image::GrayImage;
