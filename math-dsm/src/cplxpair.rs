//! Ordering of complex numbers into conjugate pairs.

use crate::error::{DsmError, Result};
use num_complex::Complex64;

/// Default relative tolerance of [`cplxpair`].
pub const CPLXPAIR_TOL: f64 = 100.0 * f64::EPSILON;

/// Relative tolerance for roots from eigenvalue solvers and iterations.
pub(crate) const ROOT_PAIR_TOL: f64 = 1e-6;

/// Sort `x` into complex conjugate pairs followed by the real elements.
///
/// Pairs come first, ordered by increasing real part, each with its
/// negative-imaginary member first and both members made exact conjugates.
/// Elements with `|im| <= tol |z|` are treated as real and appended in
/// ascending order with their imaginary part cleared. Fails if some
/// complex element has no conjugate partner.
pub fn cplxpair(x: &[Complex64]) -> Result<Vec<Complex64>> {
    cplxpair_tol(x, CPLXPAIR_TOL)
}

/// [`cplxpair`] with an explicit relative tolerance.
pub fn cplxpair_tol(x: &[Complex64], tol: f64) -> Result<Vec<Complex64>> {
    let mut reals: Vec<f64> = Vec::new();
    let mut complex: Vec<Complex64> = Vec::new();
    for &z in x {
        if z.im.abs() <= tol * z.norm() {
            reals.push(z.re);
        } else {
            complex.push(z);
        }
    }
    reals.sort_by(f64::total_cmp);
    complex.sort_by(|a, b| a.re.total_cmp(&b.re));

    let mut out = Vec::with_capacity(x.len());
    while let Some(z) = complex.first().copied() {
        complex.remove(0);
        let partner = complex
            .iter()
            .enumerate()
            .map(|(i, w)| (i, (z - w.conj()).norm()))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        match partner {
            Some((i, dist)) if dist <= 10.0 * tol * z.norm() => {
                let w = complex.remove(i);
                let mean = (z + w.conj()) * 0.5;
                let lower = Complex64::new(mean.re, -mean.im.abs());
                out.push(lower);
                out.push(lower.conj());
            }
            _ => {
                return Err(DsmError::invalid(format!(
                    "complex value {z} has no conjugate partner"
                )));
            }
        }
    }
    out.extend(reals.into_iter().map(|r| Complex64::new(r, 0.0)));
    Ok(out)
}

/// Conjugate pairing of computed roots; the input order is kept if no
/// pairing exists.
pub(crate) fn pair_roots(x: &[Complex64]) -> Vec<Complex64> {
    match cplxpair_tol(x, ROOT_PAIR_TOL) {
        Ok(paired) => paired,
        Err(err) => {
            log::debug!("roots left unpaired: {err}");
            x.to_vec()
        }
    }
}
