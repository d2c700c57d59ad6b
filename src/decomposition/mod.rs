//! Eigenface decomposition of a single face class.
//!
//! - `Eigenfaces`: configurable learner (number of eigenfaces, SVD iteration cap)
//! - `EigenfaceBasis`: the learned `e x w` orthonormal basis with projection helpers
//! - `build_basis`: shorthand for `Eigenfaces::new(e).fit(&faces)`
//!
//! The basis rows are the left singular vectors of the transposed face matrix,
//! already ordered by descending singular value. Every row is only determined
//! up to sign, so compare subspaces rather than raw rows.
//!
//! # Examples
//!
//! ```rust
//! use eigenswap::{Eigenfaces, Matrix, Vector};
//! use ndarray::array;
//!
//! let faces: Matrix = array![
//!     [0.5, -0.5, 0.25, -0.25],
//!     [-0.5, 0.5, 0.0, 0.0],
//!     [0.1, 0.2, -0.2, -0.1]
//! ];
//!
//! let basis = Eigenfaces::new(3).fit(&faces).unwrap();
//!
//! // No truncation: training faces come back unchanged.
//! let face: Vector = faces.row(0).to_owned();
//! let rebuilt = basis.reconstruct(&face).unwrap();
//! assert!((&face - &rebuilt).iter().all(|d| d.abs() < 1e-10));
//! ```

mod eigenfaces;

pub use eigenfaces::{build_basis, EigenfaceBasis, Eigenfaces};
