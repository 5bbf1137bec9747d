//! State-space realisation of FIR and hybrid NTFs and the bounded-real LMI.
//!
//! An NTF of order `N` with numerator `b = [1, b1, ..., bN]` and
//! denominator `a = [1, a1, ..., aN]` is realised in controllable
//! canonical form: `A` is the shift matrix with `-[aN, ..., a1]` on its
//! last row, `B = e_N`, `D = 1` and `C = [bN - aN, ..., b1 - a1]`.

use crate::error::Result;
use math_audio_sdp::{Affine, AffineMatrix, Problem, Variable};
use ndarray::Array2;

/// `(A, B)` of the canonical realisation for denominator tail `ar`.
pub(crate) fn companion(ar: &[f64]) -> (Array2<f64>, Array2<f64>) {
    let n = ar.len();
    let mut a = Array2::<f64>::zeros((n, n));
    for i in 0..n.saturating_sub(1) {
        a[[i, i + 1]] = 1.0;
    }
    if n > 0 {
        for (j, v) in ar.iter().rev().enumerate() {
            a[[n - 1, j]] = -v;
        }
    }
    let mut b = Array2::<f64>::zeros((n, 1));
    if n > 0 {
        b[[n - 1, 0]] = 1.0;
    }
    (a, b)
}

/// The output row `C` as a `1 x N` affine matrix, from the free numerator
/// coefficients `br = [b1, ..., bN]` and the denominator tail `ar`.
pub(crate) fn output_row(br: &Variable, ar: &[f64]) -> AffineMatrix {
    let n = ar.len();
    AffineMatrix::from_fn(1, n, |_, j| br.entry(n - 1 - j) - ar[n - 1 - j])
}

/// Add the bounded-real lemma constraint `||H||∞ <= h_inf` for the system
/// `(A, B, C, 1)`. Declares and returns the Lyapunov matrix `X ⪰ 0`.
pub(crate) fn add_lee_constraint(
    p: &mut Problem,
    a: &Array2<f64>,
    b: &Array2<f64>,
    c: &AffineMatrix,
    h_inf: f64,
) -> Result<Variable> {
    let n = a.nrows();
    let x = p.psd("X", n);
    let xm = x.matrix();
    let at = a.t().to_owned();

    let atxa = xm.congruence(a)?;
    let atxb = xm.right_mul(b)?.left_mul(&at)?;
    let btxb = xm.congruence(b)?;

    let m = AffineMatrix::bmat(&[
        vec![atxa.try_sub(&xm)?, atxb.clone(), c.t()],
        vec![
            atxb.t(),
            btxb.add_constant(&Array2::from_elem((1, 1), -h_inf * h_inf))?,
            AffineMatrix::scalar(Affine::constant(1.0)),
        ],
        vec![
            c.clone(),
            AffineMatrix::scalar(Affine::constant(1.0)),
            AffineMatrix::scalar(Affine::constant(-1.0)),
        ],
    ])?;
    p.add_nsd(&m)?;
    Ok(x)
}
