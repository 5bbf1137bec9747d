//! Noise weighting specifications and the quadratic forms they induce.
//!
//! A weighting states how expensive quantisation noise is at every
//! normalised frequency `f ∈ [0, 1/2]`. For an FIR NTF with coefficients
//! `b`, the weighted noise power is `bᵀ Q b` with `Q` the symmetric Toeplitz
//! matrix whose first row is
//!
//! ```text
//! q_k = 2 ∫_0^{1/2} w(f) cos(2π k f) df,    k = 0..=N
//! ```
//!
//! i.e. the inverse DTFT of the Hermitian extension of `w`.

use crate::correlations::raw_acorr;
use crate::error::{DsmError, Result};
use crate::parallel::parallel_map_indexed;
use crate::quadrature::{QuadOptions, quad};
use crate::tf::Tf;
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

/// A non-negative spectral weighting of normalised frequency.
#[derive(Clone)]
pub enum Weighting {
    /// An arbitrary function `f -> w(f)`
    Function(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
    /// The squared magnitude `|G(e^{j 2π f})|²` of a filter
    Filter(Tf),
    /// Pointwise product of weightings
    Product(Vec<Weighting>),
}

impl fmt::Debug for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weighting::Function(_) => f.write_str("Weighting::Function(..)"),
            Weighting::Filter(tf) => f.debug_tuple("Weighting::Filter").field(tf).finish(),
            Weighting::Product(ws) => f.debug_tuple("Weighting::Product").field(ws).finish(),
        }
    }
}

impl Weighting {
    /// Wrap a closure.
    pub fn function<F>(w: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Weighting::Function(Arc::new(w))
    }

    /// The weighting induced by a filter.
    pub fn filter(tf: Tf) -> Self {
        Weighting::Filter(tf)
    }

    /// Value at normalised frequency `f`.
    pub fn eval(&self, f: f64) -> f64 {
        match self {
            Weighting::Function(w) => w(f),
            Weighting::Filter(tf) => tf.magnitude_at(f).powi(2),
            Weighting::Product(ws) => ws.iter().map(|w| w.eval(f)).product(),
        }
    }
}

impl From<Tf> for Weighting {
    fn from(tf: Tf) -> Self {
        Weighting::Filter(tf)
    }
}

/// Pointwise product of several weightings.
pub fn mult_weightings(ws: &[Weighting]) -> Weighting {
    Weighting::Product(ws.to_vec())
}

/// First row of the weighting matrix `Q` for an FIR of order `order`.
pub fn q0_weighting(order: usize, w: &Weighting, quad_opts: &QuadOptions) -> Vec<f64> {
    parallel_map_indexed(order + 1, |k| {
        let kf = k as f64;
        let r = quad(
            |f| w.eval(f) * (2.0 * PI * kf * f).cos(),
            0.0,
            0.5,
            quad_opts,
        );
        2.0 * r.value
    })
}

/// First row of `Q` from the impulse response of a reconstruction filter.
///
/// This is the raw autocorrelation of the response, equal to
/// [`q0_weighting`] for the filter weighting up to truncation of the
/// response.
pub fn q0_from_filter_ir(order: usize, ir: &[f64]) -> Vec<f64> {
    raw_acorr(ir, order)
}

/// Full symmetric Toeplitz matrix from its first row.
pub fn toeplitz(q0: &[f64]) -> Array2<f64> {
    let n = q0.len();
    Array2::from_shape_fn((n, n), |(i, j)| q0[i.abs_diff(j)])
}

/// Scaling applied to `q0` before the SDP.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalize {
    /// Divide by `q0[0]`, making the top-left entry of `Q` equal to one
    #[default]
    Auto,
    /// Multiply by the given factor
    Scale(f64),
    /// Leave `q0` untouched
    None,
}

impl Normalize {
    /// Apply the normalisation.
    pub fn apply(&self, q0: &[f64]) -> Result<Vec<f64>> {
        match *self {
            Normalize::Auto => match q0.first() {
                Some(&q) if q > 0.0 => Ok(q0.iter().map(|v| v / q).collect()),
                _ => Err(DsmError::invalid(
                    "weighting has no energy: q0[0] must be positive",
                )),
            },
            Normalize::Scale(k) => Ok(q0.iter().map(|v| v * k).collect()),
            Normalize::None => Ok(q0.to_vec()),
        }
    }
}

/// Symmetric square root `Qs` with `Qsᵀ Qs = toeplitz(q0)`.
///
/// With `fix_pos` the spectrum is scaled to unit maximum and negative
/// eigenvalues (quadrature noise) are clamped to zero. Without it an
/// eigenvalue below `-1e-9` of the largest is reported as
/// [`DsmError::NumericallySingular`].
pub fn weighting_sqrt(q0: &[f64], fix_pos: bool) -> Result<DMatrix<f64>> {
    let n = q0.len();
    if n == 0 {
        return Err(DsmError::invalid("empty weighting row"));
    }
    let q = DMatrix::from_fn(n, n, |i, j| q0[i.abs_diff(j)]);
    let eig = SymmetricEigen::new(q);
    let dmax = eig.eigenvalues.max();
    let dmin = eig.eigenvalues.min();
    if !(dmax > 0.0) {
        return Err(DsmError::NumericallySingular {
            min_eigenvalue: dmin,
        });
    }
    let d: Vec<f64> = if fix_pos {
        eig.eigenvalues
            .iter()
            .map(|&v| (v / dmax).max(0.0))
            .collect()
    } else {
        if dmin < -1e-9 * dmax {
            return Err(DsmError::NumericallySingular {
                min_eigenvalue: dmin,
            });
        }
        eig.eigenvalues.iter().map(|&v| v.max(0.0)).collect()
    };
    let v = &eig.eigenvectors;
    let scaled = DMatrix::from_fn(n, n, |i, j| v[(i, j)] * d[j].sqrt());
    Ok(&scaled * v.transpose())
}
