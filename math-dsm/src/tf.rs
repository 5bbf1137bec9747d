//! Rational transfer functions in zero-pole-gain or polynomial form.

use crate::error::{DsmError, Result};
use crate::poly::{eval_roots, poly_real, polyval, roots, trim_leading};
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A discrete-time transfer function `H(z)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tf {
    /// `k * prod(z - z_i) / prod(z - p_i)`
    Zpk {
        /// Zeros (closed under conjugation)
        zeros: Vec<Complex64>,
        /// Poles (closed under conjugation)
        poles: Vec<Complex64>,
        /// Real gain
        gain: f64,
    },
    /// `num(z) / den(z)`, coefficients in descending powers of `z`
    Ba {
        /// Numerator coefficients
        num: Vec<f64>,
        /// Denominator coefficients
        den: Vec<f64>,
    },
}

impl Tf {
    /// Zero-pole-gain form.
    pub fn zpk(zeros: Vec<Complex64>, poles: Vec<Complex64>, gain: f64) -> Self {
        Tf::Zpk { zeros, poles, gain }
    }

    /// Polynomial form. The denominator must have a nonzero coefficient.
    pub fn ba(num: Vec<f64>, den: Vec<f64>) -> Result<Self> {
        if trim_leading(&den).is_empty() {
            return Err(DsmError::invalid("denominator polynomial is identically zero"));
        }
        Ok(Tf::Ba { num, den })
    }

    /// The FIR transfer function `(b0 z^N + ... + bN) / z^N`.
    pub fn fir(b: &[f64]) -> Self {
        let mut den = vec![0.0; b.len().max(1)];
        den[0] = 1.0;
        Tf::Ba {
            num: b.to_vec(),
            den,
        }
    }

    /// Evaluate at one point. Non-finite `z` gives the limit at infinity.
    pub fn eval(&self, z: Complex64) -> Complex64 {
        if !z.is_finite() {
            return self.value_at_infinity();
        }
        match self {
            Tf::Zpk { zeros, poles, gain } => {
                eval_roots(zeros, z, *gain) / eval_roots(poles, z, 1.0)
            }
            Tf::Ba { num, den } => polyval(num, z) / polyval(den, z),
        }
    }

    /// Evaluate at several points.
    pub fn eval_many(&self, z: &[Complex64]) -> Vec<Complex64> {
        z.iter().map(|&zi| self.eval(zi)).collect()
    }

    /// `|H(e^{j 2 pi f})|` at normalised frequency `f`.
    pub fn magnitude_at(&self, f: f64) -> f64 {
        self.eval(Complex64::from_polar(1.0, 2.0 * PI * f)).norm()
    }

    fn value_at_infinity(&self) -> Complex64 {
        let (nz, np, k) = match self {
            Tf::Zpk { zeros, poles, gain } => (
                zeros.iter().filter(|z| z.is_finite()).count(),
                poles.iter().filter(|p| p.is_finite()).count(),
                *gain,
            ),
            Tf::Ba { num, den } => {
                let n = trim_leading(num);
                let d = trim_leading(den);
                let k = match (n.first(), d.first()) {
                    (Some(a), Some(b)) => a / b,
                    _ => 0.0,
                };
                (n.len().saturating_sub(1), d.len().saturating_sub(1), k)
            }
        };
        match nz.cmp(&np) {
            std::cmp::Ordering::Less => Complex64::new(0.0, 0.0),
            std::cmp::Ordering::Equal => Complex64::new(k, 0.0),
            std::cmp::Ordering::Greater => Complex64::new(f64::INFINITY, 0.0),
        }
    }

    /// `(num, den)` polynomials, converting if needed. Zeros and poles must
    /// be closed under conjugation.
    pub fn ba_parts(&self) -> (Vec<f64>, Vec<f64>) {
        match self {
            Tf::Zpk { zeros, poles, gain } => (
                poly_real(zeros).into_iter().map(|c| c * gain).collect(),
                poly_real(poles),
            ),
            Tf::Ba { num, den } => (num.clone(), den.clone()),
        }
    }

    /// Polynomial form.
    pub fn to_ba(&self) -> Tf {
        let (num, den) = self.ba_parts();
        Tf::Ba { num, den }
    }

    /// `(num, den)` with both polynomials padded to the same length, so
    /// that they can be read either in powers of `z` or of `z^-1`.
    pub fn ba_coefficients(&self) -> Result<(Vec<f64>, Vec<f64>)> {
        let (num, den) = self.ba_parts();
        let num = trim_leading(&num).to_vec();
        let den = trim_leading(&den).to_vec();
        if den.is_empty() {
            return Err(DsmError::invalid("denominator polynomial is identically zero"));
        }
        if num.len() > den.len() {
            return Err(DsmError::invalid(format!(
                "improper transfer function: numerator degree {} exceeds denominator degree {}",
                num.len() - 1,
                den.len() - 1
            )));
        }
        let mut padded = vec![0.0; den.len() - num.len()];
        padded.extend(num);
        Ok((padded, den))
    }

    /// `(zeros, poles, gain)`, converting if needed.
    pub fn zpk_parts(&self) -> (Vec<Complex64>, Vec<Complex64>, f64) {
        match self {
            Tf::Zpk { zeros, poles, gain } => (zeros.clone(), poles.clone(), *gain),
            Tf::Ba { num, den } => {
                let n = trim_leading(num);
                let d = trim_leading(den);
                let gain = match (n.first(), d.first()) {
                    (Some(a), Some(b)) => a / b,
                    _ => 0.0,
                };
                (roots(n), roots(d), gain)
            }
        }
    }

    /// Zero-pole-gain form.
    pub fn to_zpk(&self) -> Tf {
        let (zeros, poles, gain) = self.zpk_parts();
        Tf::Zpk { zeros, poles, gain }
    }

    /// Zeros of the transfer function.
    pub fn zeros(&self) -> Vec<Complex64> {
        self.zpk_parts().0
    }

    /// Poles of the transfer function.
    pub fn poles(&self) -> Vec<Complex64> {
        self.zpk_parts().1
    }

    /// `true` when every pole sits at the origin.
    pub fn is_fir(&self) -> bool {
        match self {
            Tf::Zpk { poles, .. } => poles.iter().all(|p| p.norm() == 0.0),
            Tf::Ba { den, .. } => {
                let d = trim_leading(den);
                d.len() <= 1 || d[1..].iter().all(|&v| v == 0.0)
            }
        }
    }

    /// `true` when every pole lies strictly inside the unit circle.
    pub fn is_stable(&self) -> bool {
        self.poles().iter().all(|p| p.norm() < 1.0)
    }

    /// Order (degree of the larger of numerator and denominator).
    pub fn order(&self) -> usize {
        match self {
            Tf::Zpk { zeros, poles, .. } => zeros.len().max(poles.len()),
            Tf::Ba { num, den } => trim_leading(num)
                .len()
                .max(trim_leading(den).len())
                .saturating_sub(1),
        }
    }
}

impl From<(Vec<Complex64>, Vec<Complex64>, f64)> for Tf {
    fn from((zeros, poles, gain): (Vec<Complex64>, Vec<Complex64>, f64)) -> Self {
        Tf::Zpk { zeros, poles, gain }
    }
}

impl From<(Vec<f64>, Vec<f64>)> for Tf {
    fn from((num, den): (Vec<f64>, Vec<f64>)) -> Self {
        Tf::Ba { num, den }
    }
}

/// Evaluate `tf` at every point of `z`.
pub fn eval_tf(tf: &Tf, z: &[Complex64]) -> Vec<Complex64> {
    tf.eval_many(z)
}

/// Frequency response on `n + 1` points `f_k = k / (2n)` of `[0, 1/2]`.
///
/// Returns `(f, H(e^{j 2 pi f}))`.
pub fn freq_response(tf: &Tf, n: usize) -> (Array1<f64>, Array1<Complex64>) {
    let n = n.max(1);
    let f = Array1::from_shape_fn(n + 1, |k| k as f64 / (2.0 * n as f64));
    let h = f.mapv(|fk| tf.eval(Complex64::from_polar(1.0, 2.0 * PI * fk)));
    (f, h)
}
