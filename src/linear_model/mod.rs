//! Linear fitting between eigenface bases.
//!
//! - `LeastSquares`: SVD-based multi-output least squares with rank diagnostics
//! - `TransitionLearner` / `fit_transition`: the cross-basis transition matrix
//!
//! # Examples
//!
//! ## Least squares
//! ```rust
//! use eigenswap::LeastSquares;
//! use ndarray::array;
//!
//! let a = array![[1.0], [2.0], [3.0]];
//! let b = array![[2.0], [4.0], [6.0]];
//!
//! let fit = LeastSquares::new().fit(&a, &b).unwrap();
//! assert!((fit.solution[[0, 0]] - 2.0).abs() < 1e-10);
//! assert_eq!(fit.rank, 1);
//! ```
//!
//! ## Transition between two bases
//! ```rust
//! use eigenswap::{build_basis, fit_transition};
//! use ndarray::array;
//!
//! let male = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
//! let female = array![[1.0, 0.0, 0.5], [0.0, 1.0, 0.5]];
//!
//! let male_basis = build_basis(&male, 2).unwrap();
//! let female_basis = build_basis(&female, 2).unwrap();
//!
//! // Male -> female is fitted on female faces.
//! let fit = fit_transition(&male_basis, &female_basis, &female).unwrap();
//! assert_eq!(fit.transition.matrix().shape(), &[2, 2]);
//! ```

mod least_squares;
mod transition;

pub use least_squares::{LeastSquares, LeastSquaresFit};
pub use transition::{fit_transition, TransitionDiagnostics, TransitionFit, TransitionLearner, TransitionMatrix};
