//! FIR NTFs minimising the worst-case in-band gain.
//!
//! Each signal band contributes a generalised KYP inequality certifying
//! `|NTF(e^{jω})|² <= g_i` for `|ω - ω0_i| <= π / OSR_i`. The largest
//! `g_i` is minimised under the bounded-real constraint on the whole
//! unit circle. For a band centred away from DC the Hermitian inequality
//! is written as its real `2(N+2)` counterpart.
//!
//! Reference: M. Nagahara and Y. Yamamoto, "Frequency-domain min-max
//! optimization of noise-shaping delta-sigma modulators", IEEE Trans.
//! Signal Processing 60(6), 2012.

use crate::error::{DsmError, Result};
use crate::fir_weighting::{check_h_inf, fir_zeros, require_optimal};
use crate::lmi::{add_lee_constraint, companion, output_row};
use crate::tf::Tf;
use math_audio_sdp::{Affine, AffineMatrix, Problem, SdpOptions, Variable};
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A signal band: normalised centre frequency and oversampling ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Centre frequency in `[0, 1/2]`
    pub f0: f64,
    /// Oversampling ratio, at least 1
    pub osr: f64,
}

impl Band {
    /// A band centred at `f0`.
    pub fn new(f0: f64, osr: f64) -> Self {
        Self { f0, osr }
    }

    /// A baseband (lowpass) band.
    pub fn lowpass(osr: f64) -> Self {
        Self { f0: 0.0, osr }
    }

    /// Pair centre frequencies with oversampling ratios.
    ///
    /// A single OSR is shared by every band; otherwise both lists must
    /// have the same length.
    pub fn broadcast(f0s: &[f64], osrs: &[f64]) -> Result<Vec<Band>> {
        match osrs {
            [osr] => Ok(f0s.iter().map(|&f0| Band::new(f0, *osr)).collect()),
            _ if osrs.len() == f0s.len() => Ok(f0s
                .iter()
                .zip(osrs)
                .map(|(&f0, &osr)| Band::new(f0, osr))
                .collect()),
            _ => Err(DsmError::invalid(format!(
                "incorrect multiband specification: {} centre frequencies, {} OSRs",
                f0s.len(),
                osrs.len()
            ))),
        }
    }

    /// Centre angular frequency `2π f0`.
    pub fn omega0(&self) -> f64 {
        2.0 * PI * self.f0
    }

    /// Angular half-width `π / OSR`.
    pub fn half_width(&self) -> f64 {
        PI / self.osr
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=0.5).contains(&self.f0) {
            return Err(DsmError::invalid(format!(
                "band centre {} outside [0, 1/2]",
                self.f0
            )));
        }
        if !(self.osr >= 1.0 && self.osr.is_finite()) {
            return Err(DsmError::invalid(format!(
                "oversampling ratio must be at least 1, got {}",
                self.osr
            )));
        }
        Ok(())
    }
}

impl Default for Band {
    fn default() -> Self {
        Band::lowpass(32.0)
    }
}

/// Options for [`ntf_fir_minmax`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinmaxOptions {
    /// SDP backend options
    pub sdp: SdpOptions,
}

fn scalar(v: f64) -> AffineMatrix {
    AffineMatrix::scalar(Affine::constant(v))
}

/// Add the in-band gain certificate of one band; returns its `g`.
fn add_band_constraint(
    p: &mut Problem,
    band: &Band,
    a: &Array2<f64>,
    b: &Array2<f64>,
    c: &AffineMatrix,
) -> Result<Variable> {
    let n = a.nrows();
    let at = a.t().to_owned();
    let bt = b.t().to_owned();
    let pv = p.symmetric("P", n);
    let qv = p.psd("Q", n);
    let g = p.scalar("g");
    let pm = pv.matrix();
    let qm = qv.matrix();
    let (sw, cw) = band.omega0().sin_cos();
    let cos_width = band.half_width().cos();

    let qa = qm.right_mul(a)?;
    let atq = qm.left_mul(&at)?;
    let qb = qm.right_mul(b)?;

    let m1r = pm
        .congruence(a)?
        .try_add(&qa.try_add(&atq)?.scale(cw))?
        .try_sub(&pm)?
        .try_sub(&qm.scale(2.0 * cos_width))?;
    let m2r = pm.right_mul(b)?.left_mul(&at)?.try_add(&qb.scale(cw))?;
    let m3r = pm
        .congruence(b)?
        .try_sub(&AffineMatrix::scalar(g.expr()))?;
    let mr = AffineMatrix::bmat(&[
        vec![m1r, m2r.clone(), c.t()],
        vec![m2r.t(), m3r, scalar(1.0)],
        vec![c.clone(), scalar(1.0), scalar(-1.0)],
    ])?;

    if band.f0 == 0.0 {
        p.add_nsd(&mr)?;
    } else {
        let m1i = atq.try_sub(&qa)?.scale(sw);
        let m21i = qb.scale(-sw);
        let m22i = qm.left_mul(&bt)?.scale(sw);
        let mi = AffineMatrix::bmat(&[
            vec![m1i, m21i, AffineMatrix::zeros(n, 1)],
            vec![m22i, AffineMatrix::zeros(1, 1), AffineMatrix::zeros(1, 1)],
            vec![
                AffineMatrix::zeros(1, n),
                AffineMatrix::zeros(1, 1),
                AffineMatrix::zeros(1, 1),
            ],
        ])?;
        let m = AffineMatrix::bmat(&[vec![mr.clone(), mi.clone()], vec![mi.scale(-1.0), mr]])?;
        p.add_nsd(&m)?;
    }
    Ok(g)
}

/// Force a zero of the NTF at the band centre.
fn add_zero_constraint(p: &mut Problem, band: &Band, c: &AffineMatrix) -> Result<()> {
    let n = c.ncols();
    let w0 = band.omega0();
    let cos_terms: Vec<f64> = (0..n).map(|k| (w0 * k as f64).cos()).collect();
    let entries: Vec<Affine> = (0..n).map(|k| c.get(0, k).clone()).collect();
    p.add_eq(
        Affine::dot(&cos_terms, &entries)?,
        Affine::constant(-(w0 * n as f64).cos()),
    )?;
    if band.f0 != 0.0 {
        let sin_terms: Vec<f64> = (0..n).map(|k| (w0 * k as f64).sin()).collect();
        p.add_eq(
            Affine::dot(&sin_terms, &entries)?,
            Affine::constant(-(w0 * n as f64).sin()),
        )?;
    }
    Ok(())
}

/// FIR NTF of the given order minimising the largest in-band peak gain.
///
/// With `zf` a zero is pre-assigned at the centre of every band. An
/// infinite `h_inf` drops the bounded-real constraint.
pub fn ntf_fir_minmax(
    order: usize,
    bands: &[Band],
    h_inf: f64,
    zf: bool,
    opts: &MinmaxOptions,
) -> Result<Tf> {
    if order == 0 {
        return Err(DsmError::invalid("NTF order must be at least 1"));
    }
    if bands.is_empty() {
        return Err(DsmError::invalid("at least one signal band is required"));
    }
    for band in bands {
        band.validate()?;
    }
    check_h_inf(h_inf)?;

    let ar = vec![0.0; order];
    let (a, b) = companion(&ar);
    let mut p = Problem::new();
    let br = p.vector("br", order);
    let c = output_row(&br, &ar);
    let gamma = p.scalar("gamma");

    for band in bands {
        let g = add_band_constraint(&mut p, band, &a, &b, &c)?;
        p.add_le(g.expr(), gamma.expr())?;
        if zf {
            add_zero_constraint(&mut p, band, &c)?;
        }
    }
    if h_inf.is_finite() {
        add_lee_constraint(&mut p, &a, &b, &c, h_inf)?;
    }
    p.minimize(gamma.expr())?;

    if opts.sdp.show_progress {
        log::info!(
            "min-max design of order {order} over {} band(s), {} unknowns",
            bands.len(),
            p.num_scalars()
        );
    }
    let sol = require_optimal(p.solve(&opts.sdp)?)?;
    log::debug!(
        "min-max design solved in {} iterations, in-band peak {:.3} dB",
        sol.iterations,
        10.0 * sol.objective.max(f64::MIN_POSITIVE).log10()
    );
    let br = sol.vector(&br).to_vec();
    Ok(Tf::zpk(
        fir_zeros(&br),
        vec![Complex64::new(0.0, 0.0); order],
        1.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn band_peak(tf: &Tf, band: &Band) -> f64 {
        let lo = (band.f0 - 0.5 / band.osr).max(0.0);
        let hi = (band.f0 + 0.5 / band.osr).min(0.5);
        (0..=400)
            .map(|i| tf.magnitude_at(lo + (hi - lo) * i as f64 / 400.0))
            .fold(0.0, f64::max)
    }

    fn assert_peak_gain_within(tf: &Tf, h_inf: f64) {
        let (_, h) = crate::tf::freq_response(tf, 1024);
        let peak = h.iter().map(|v| v.norm()).fold(0.0, f64::max);
        assert!(peak <= h_inf + 1e-5, "peak gain {peak} above {h_inf}");
    }

    #[test]
    fn test_broadcast() {
        let bands = Band::broadcast(&[0.1, 0.2], &[64.0]).unwrap();
        assert_eq!(bands, vec![Band::new(0.1, 64.0), Band::new(0.2, 64.0)]);
        assert!(Band::broadcast(&[0.1, 0.2], &[32.0, 64.0, 8.0]).is_err());
    }

    #[test]
    fn test_invalid_bands() {
        let opts = MinmaxOptions::default();
        assert!(ntf_fir_minmax(4, &[], 1.5, false, &opts).is_err());
        assert!(ntf_fir_minmax(4, &[Band::new(0.7, 32.0)], 1.5, false, &opts).is_err());
        assert!(ntf_fir_minmax(4, &[Band::new(0.1, 0.5)], 1.5, false, &opts).is_err());
    }

    #[test]
    fn test_lowpass_with_zero_at_dc() {
        let band = Band::lowpass(16.0);
        let tf = ntf_fir_minmax(4, &[band], 1.5, true, &MinmaxOptions::default()).unwrap();
        assert_abs_diff_eq!(tf.magnitude_at(0.0), 0.0, epsilon = 1e-6);
        assert!(band_peak(&tf, &band) < 0.3);
        assert_peak_gain_within(&tf, 1.5);
    }

    #[test]
    fn test_bandpass_zero_on_centre() {
        let band = Band::new(0.125, 16.0);
        let tf = ntf_fir_minmax(6, &[band], 1.5, true, &MinmaxOptions::default()).unwrap();
        assert_abs_diff_eq!(tf.magnitude_at(0.125), 0.0, epsilon = 1e-6);
        assert!(band_peak(&tf, &band) < 0.6);
        assert_peak_gain_within(&tf, 1.5);
    }

    #[test]
    fn test_lowpass_and_bandpass_share_the_peak() {
        let bands = [Band::lowpass(32.0), Band::new(0.25, 32.0)];
        let tf = ntf_fir_minmax(6, &bands, 1.5, false, &MinmaxOptions::default()).unwrap();
        let low = band_peak(&tf, &bands[0]);
        let mid = band_peak(&tf, &bands[1]);
        assert!(low < 0.42 && mid < 0.42, "in-band peaks {low} and {mid}");
        assert_abs_diff_eq!(low, mid, epsilon = 0.02);
        assert_peak_gain_within(&tf, 1.5);
    }

    #[cfg(feature = "clarabel")]
    #[test]
    fn test_conic_backend_matches_barrier() {
        let band = Band::lowpass(16.0);
        let conic = MinmaxOptions {
            sdp: SdpOptions {
                backend: math_audio_sdp::Backend::Clarabel,
                ..SdpOptions::default()
            },
        };
        let a = ntf_fir_minmax(4, &[band], 1.5, true, &conic).unwrap();
        let b = ntf_fir_minmax(4, &[band], 1.5, true, &MinmaxOptions::default()).unwrap();
        assert_abs_diff_eq!(band_peak(&a, &band), band_peak(&b, &band), epsilon = 1e-3);
        assert_peak_gain_within(&a, 1.5);
    }

    #[test]
    fn test_unreachable_peak_gain_is_infeasible() {
        // A DC zero forces Σ b_k² >= 1.25 for order 4, above 1.05².
        let err = ntf_fir_minmax(4, &[Band::lowpass(32.0)], 1.05, true, &MinmaxOptions::default())
            .unwrap_err();
        assert!(err.is_infeasible_error(), "unexpected error {err}");
    }
}
