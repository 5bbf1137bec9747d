//! Semidefinite program builder with an in-process interior-point backend
//!
//! This crate provides a small modelling layer for linear matrix inequality
//! problems together with a dense primal log-barrier solver. It is sized for
//! the problems met in filter design: a few hundred scalar unknowns and
//! matrix inequalities of dimension up to about a hundred.
//!
//! # Features
//!
//! - **Variables**: scalars, vectors, symmetric matrices, PSD matrices
//! - **Expressions**: affine scalars and affine matrices with constant
//!   products, transposition and block assembly
//! - **Constraints**: `M ⪰ 0`, `M ⪯ 0`, scalar `<=` and `==`, second-order cones
//! - **Backends**: selected by [`Backend`] through the [`SdpSolver`] trait;
//!   the Clarabel conic solver is available with the `clarabel` feature
//!
//! # Example
//!
//! ```
//! use math_audio_sdp::{Affine, AffineMatrix, Problem, SdpOptions};
//!
//! // Smallest t with t I - A ⪰ 0 is the largest eigenvalue of A.
//! let a = ndarray::array![[2.0, 1.0], [1.0, 2.0]];
//! let mut p = Problem::new();
//! let t = p.scalar("t");
//! let ti = AffineMatrix::from_fn(2, 2, |i, j| if i == j { t.expr() } else { Affine::default() });
//! p.add_psd(&ti.add_constant(&(-&a)).unwrap()).unwrap();
//! p.minimize(t.expr()).unwrap();
//!
//! let sol = p.solve(&SdpOptions::default()).unwrap();
//! assert!((sol.scalar(&t) - 3.0).abs() < 1e-4);
//! ```

#![warn(missing_docs)]

mod barrier;
#[cfg(feature = "clarabel")]
mod conic;
pub mod error;
pub mod expr;
pub mod options;
pub mod problem;
pub mod traits;

pub use barrier::LogBarrier;
#[cfg(feature = "clarabel")]
pub use conic::Clarabel;
pub use error::{Result, SdpError};
pub use expr::{Affine, AffineMatrix};
pub use options::{Backend, SdpOptions};
pub use problem::{Problem, Solution, Status, Variable, VariableKind};
pub use traits::SdpSolver;
