//! Figures of merit for noise transfer functions.
//!
//! The noise gains follow the two-sided convention: for white quantisation
//! noise of unit power, `quantization_noise_gain(ntf, Some(&w), ..)` is the
//! output noise power seen through the weighting, that is
//! `∫_{-1/2}^{1/2} |NTF|² w df = 2 ∫_0^{1/2} |NTF|² w df`. The convolution
//! path computes the same quantity in the time domain.

use crate::error::{DsmError, Result};
use crate::ir::{IrLength, impulse_response};
use crate::parallel::parallel_map;
use crate::poly::conv;
use crate::quadrature::{QuadOptions, quad};
use crate::tf::Tf;
use crate::weighting::Weighting;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Options for [`quantization_noise_gain`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseGainOptions {
    /// Integration interval in normalised frequency
    pub bounds: (f64, f64),
    /// Return the average over `bounds` instead of the two-sided integral
    pub avg: bool,
    /// Quadrature settings
    pub quad: QuadOptions,
}

impl Default for NoiseGainOptions {
    fn default() -> Self {
        Self {
            bounds: (0.0, 0.5),
            avg: false,
            quad: QuadOptions::default(),
        }
    }
}

/// Noise power gain of `ntf`, optionally shaped by the weighting `w`.
///
/// Computes `c ∫_a^b |NTF(e^{j2πf})|² w(f) df` where `(a, b)` are the
/// bounds of `opts`, `c = 2` by default and `c = 1 / (b - a)` when
/// averaging.
pub fn quantization_noise_gain(
    ntf: &Tf,
    w: Option<&Weighting>,
    opts: &NoiseGainOptions,
) -> Result<f64> {
    let (a, b) = opts.bounds;
    if !(0.0..=0.5).contains(&a) || !(0.0..=0.5).contains(&b) || a >= b {
        return Err(DsmError::invalid(format!(
            "noise gain bounds ({a}, {b}) must be increasing within [0, 1/2]"
        )));
    }
    let integrand = |f: f64| {
        let n2 = ntf.magnitude_at(f).powi(2);
        match w {
            Some(w) => n2 * w.eval(f),
            None => n2,
        }
    };
    let r = quad(integrand, a, b, &opts.quad);
    log::debug!(
        "noise gain integral {:e} (error {:e}, {} evaluations)",
        r.value,
        r.abserr,
        r.evaluations
    );
    let scale = if opts.avg { 1.0 / (b - a) } else { 2.0 };
    Ok(scale * r.value)
}

/// Noise power gain of `ntf` followed by the filter `h`, computed in the
/// time domain.
///
/// Both impulse responses are truncated `db` decibels below their peak,
/// convolved, and the squared samples of the result are summed.
pub fn quantization_noise_gain_by_conv(ntf: &Tf, h: &Tf, db: f64) -> Result<f64> {
    let h_ir = impulse_response(h, &IrLength::Db(db))?;
    let ntf_ir = impulse_response(ntf, &IrLength::Db(db))?;
    Ok(conv(&ntf_ir, &h_ir).iter().map(|v| v * v).sum())
}

/// Root mean square of `x`; with `no_dc` the mean is removed first.
pub fn rms(x: &[f64], no_dc: bool) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let n = x.len() as f64;
    let mean = if no_dc { x.iter().sum::<f64>() / n } else { 0.0 };
    (x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// RMS of `|H(e^{j2πf})|` over `n` points evenly spaced in `[f1, f2]`.
pub fn rms_gain(tf: &Tf, f1: f64, f2: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let step = if n > 1 { (f2 - f1) / (n - 1) as f64 } else { 0.0 };
    let freqs: Vec<f64> = (0..n).map(|i| f1 + step * i as f64).collect();
    let power: f64 = parallel_map(&freqs, |&f| {
        tf.eval(Complex64::from_polar(1.0, 2.0 * PI * f)).norm_sqr()
    })
    .into_iter()
    .sum();
    (power / n as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    #[test]
    fn test_rms() {
        assert_relative_eq!(rms(&[3.0, -3.0, 3.0, -3.0], false), 3.0);
        assert_relative_eq!(rms(&[4.0, 6.0], true), 1.0);
        assert_relative_eq!(rms(&[4.0, 6.0], false), 26f64.sqrt());
        assert_eq!(rms(&[], false), 0.0);
    }

    #[test]
    fn test_rms_gain_of_constant() {
        let tf = Tf::fir(&[2.0]);
        assert_relative_eq!(rms_gain(&tf, 0.0, 0.5, 100), 2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_first_difference_noise_gain() {
        // |1 - z^-1|² = 2 - 2cos(2πf): two-sided integral is 2
        let tf = Tf::zpk(vec![c(1.0)], vec![c(0.0)], 1.0);
        let g = quantization_noise_gain(&tf, None, &NoiseGainOptions::default()).unwrap();
        assert_relative_eq!(g, 2.0, epsilon = 1e-10);

        let avg = NoiseGainOptions {
            avg: true,
            ..NoiseGainOptions::default()
        };
        let g_avg = quantization_noise_gain(&tf, None, &avg).unwrap();
        assert_relative_eq!(g_avg, 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_frequency_and_time_domain_agree() {
        let ntf = Tf::zpk(vec![c(1.0), c(1.0)], vec![c(0.5), c(0.2)], 1.0);
        let h = Tf::zpk(vec![c(-1.0)], vec![c(0.3)], 0.35);
        let by_quad =
            quantization_noise_gain(&ntf, Some(&Weighting::filter(h.clone())), &NoiseGainOptions::default())
                .unwrap();
        let by_conv = quantization_noise_gain_by_conv(&ntf, &h, 120.0).unwrap();
        assert_relative_eq!(by_quad, by_conv, max_relative = 1e-8);
    }

    #[test]
    fn test_bad_bounds() {
        let tf = Tf::fir(&[1.0]);
        let opts = NoiseGainOptions {
            bounds: (0.3, 0.1),
            ..NoiseGainOptions::default()
        };
        assert!(quantization_noise_gain(&tf, None, &opts).unwrap_err().is_argument_error());
        assert_abs_diff_eq!(
            quantization_noise_gain(&tf, None, &NoiseGainOptions::default()).unwrap(),
            1.0,
            epsilon = 1e-12
        );
    }
}
