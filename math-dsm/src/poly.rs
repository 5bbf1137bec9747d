//! Polynomial helpers in the descending-power convention.
//!
//! A coefficient slice `[c0, c1, ..., cn]` stands for
//! `c0 z^n + c1 z^(n-1) + ... + cn`.

use nalgebra::DMatrix;
use num_complex::Complex64;

/// Coefficients of the monic polynomial with the given roots.
///
/// Roots at infinity are ignored.
pub fn poly(roots: &[Complex64]) -> Vec<Complex64> {
    let mut c = vec![Complex64::new(1.0, 0.0)];
    for r in roots.iter().filter(|r| r.is_finite()) {
        c.push(Complex64::new(0.0, 0.0));
        for i in (1..c.len()).rev() {
            let prev = c[i - 1];
            c[i] -= r * prev;
        }
    }
    c
}

/// Real coefficients of the monic polynomial with the given roots.
///
/// The roots are expected to be closed under conjugation, so the imaginary
/// parts of the coefficients are rounding noise and are dropped.
pub fn poly_real(roots: &[Complex64]) -> Vec<f64> {
    poly(roots).into_iter().map(|c| c.re).collect()
}

/// Evaluate a real polynomial at a complex point (Horner scheme).
pub fn polyval(c: &[f64], z: Complex64) -> Complex64 {
    c.iter()
        .fold(Complex64::new(0.0, 0.0), |acc, &ci| acc * z + ci)
}

/// Evaluate a complex polynomial at a complex point.
pub fn polyval_complex(c: &[Complex64], z: Complex64) -> Complex64 {
    c.iter().fold(Complex64::new(0.0, 0.0), |acc, &ci| acc * z + ci)
}

/// Evaluate `k * prod(z - r_i)`, skipping roots at infinity.
pub fn eval_roots(roots: &[Complex64], z: Complex64, k: f64) -> Complex64 {
    roots
        .iter()
        .filter(|r| r.is_finite())
        .fold(Complex64::new(k, 0.0), |acc, r| acc * (z - r))
}

/// Full discrete convolution of two real sequences.
pub fn conv(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        if ai == 0.0 {
            continue;
        }
        for (j, &bj) in b.iter().enumerate() {
            out[i + j] += ai * bj;
        }
    }
    out
}

/// Leading zero coefficients removed.
pub(crate) fn trim_leading(c: &[f64]) -> &[f64] {
    let start = c.iter().position(|&v| v != 0.0).unwrap_or(c.len());
    &c[start..]
}

/// Roots of a real polynomial.
///
/// Eigenvalues of the companion matrix, each refined by a few Newton steps
/// on the original polynomial. Trailing zero coefficients yield exact zero
/// roots; a constant (or empty) polynomial has no roots.
pub fn roots(c: &[f64]) -> Vec<Complex64> {
    let c = trim_leading(c);
    if c.len() < 2 {
        return Vec::new();
    }
    let trailing = c.iter().rev().take_while(|&&v| v == 0.0).count();
    let core = &c[..c.len() - trailing];
    let n = core.len() - 1;
    let mut out = Vec::with_capacity(n + trailing);

    if n == 1 {
        out.push(Complex64::new(-core[1] / core[0], 0.0));
    } else if n > 1 {
        let mut companion = DMatrix::<f64>::zeros(n, n);
        for j in 0..n {
            companion[(0, j)] = -core[j + 1] / core[0];
        }
        for i in 1..n {
            companion[(i, i - 1)] = 1.0;
        }
        let deriv: Vec<f64> = core[..n]
            .iter()
            .enumerate()
            .map(|(i, &ci)| ci * (n - i) as f64)
            .collect();
        for r in companion.complex_eigenvalues().iter() {
            out.push(polish(core, &deriv, *r));
        }
    }
    out.extend(std::iter::repeat_n(Complex64::new(0.0, 0.0), trailing));
    out
}

fn polish(c: &[f64], deriv: &[f64], mut r: Complex64) -> Complex64 {
    let mut best = polyval(c, r).norm();
    for _ in 0..3 {
        let d = polyval(deriv, r);
        if d.norm() == 0.0 {
            break;
        }
        let candidate = r - polyval(c, r) / d;
        let value = polyval(c, candidate).norm();
        if !(value < best) {
            break;
        }
        r = candidate;
        best = value;
    }
    if r.im != 0.0 && r.im.abs() <= 4.0 * f64::EPSILON * r.norm() {
        r.im = 0.0;
    }
    r
}
