//! Schreier's NTF synthesis by iterative pole placement.
//!
//! The poles of a maximally flat lowpass prototype are scaled by a single
//! real parameter `x` until the out-of-band gain of the NTF, measured at
//! `z = -1` (or `z = 1` for bands above `fs/8`), equals `h_inf`. The
//! parameter is tuned with a secant iteration.

use super::optzeros::{ZeroOpt, ds_optzeros, ds_syn_ntf_obj1, zeros_from_offsets};
use crate::cplxpair::pair_roots;
use crate::error::{DsmError, Result};
use crate::fir_weighting::check_h_inf;
use crate::optimize::{NelderMeadOptions, nelder_mead};
use crate::tf::Tf;
use crate::zeros::maxflat_roots;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const ITERATION_LIMIT: usize = 100;
const POLE_TOL: f64 = 1e-10;
const X_LIMIT: f64 = 1e6;
/// Alternations between zero refinement and pole placement.
const REOPTIMIZE_ROUNDS: usize = 5;

/// Parameters of [`synthesize_ntf`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesizeNtf {
    /// NTF order (even for bandpass designs)
    pub order: usize,
    /// Oversampling ratio
    pub osr: f64,
    /// Zero placement
    pub opt: ZeroOpt,
    /// Maximum out-of-band gain
    pub h_inf: f64,
    /// Band centre, 0 for lowpass
    pub f0: f64,
}

impl Default for SynthesizeNtf {
    fn default() -> Self {
        Self {
            order: 3,
            osr: 64.0,
            opt: ZeroOpt::Dc,
            h_inf: 1.5,
            f0: 0.0,
        }
    }
}

fn zero() -> Complex64 {
    Complex64::new(0.0, 0.0)
}

/// Zeros before any refinement, as unit-circle angles mapped to `z`.
fn initial_zeros(order: usize, osr: f64, opt: &ZeroOpt, f0: f64) -> Result<Vec<Complex64>> {
    let table = match opt {
        ZeroOpt::Explicit(z) => return Ok(z.clone()),
        other => other.table().unwrap_or(0),
    };
    let angles = if f0 == 0.0 {
        let dw = PI / osr;
        ds_optzeros(order, table)?
            .into_iter()
            .map(|v| dw * v)
            .collect::<Vec<_>>()
    } else {
        let dw = PI / (2.0 * osr);
        let w0 = 2.0 * PI * f0;
        ds_optzeros(order / 2, table)?
            .into_iter()
            .flat_map(|v| [w0 + dw * v, -(w0 + dw * v)])
            .collect()
    };
    Ok(angles
        .into_iter()
        .map(|a| Complex64::from_polar(1.0, a))
        .collect())
}

/// Secant iteration on the pole scaling `x`. `pole_set` maps `x` to a
/// candidate pole set; the iteration drives `Re NTF(z_inf) = h_inf`.
fn secant_poles<F>(z: &[Complex64], h_inf: f64, z_inf: f64, x_start: f64, pole_set: F) -> Vec<Complex64>
where
    F: Fn(f64) -> Vec<Complex64>,
{
    let order = pole_set(x_start).len();
    let mut x = x_start;
    let mut fprev = 0.0;
    let mut delta_x = 0.0;
    let mut p = Vec::new();
    for itn in 1..=ITERATION_LIMIT {
        p = pair_roots(&pole_set(x));
        let ntf = Tf::zpk(z.to_vec(), p.clone(), 1.0);
        let f = ntf.eval(Complex64::new(z_inf, 0.0)).re - h_inf;
        delta_x = if itn == 1 {
            -f / 100.0
        } else {
            -f * delta_x / (f - fprev)
        };
        let xplus = x + delta_x;
        x = if xplus > 0.0 { xplus } else { x * 0.1 };
        fprev = f;
        if f.abs() < POLE_TOL || delta_x.abs() < POLE_TOL {
            log::debug!("pole placement converged after {itn} iterations (x = {x:e})");
            return p;
        }
        if x > X_LIMIT {
            log::warn!("unable to achieve the specified h_inf; setting all NTF poles to zero");
            return vec![zero(); order];
        }
    }
    log::warn!("pole placement: iteration limit of {ITERATION_LIMIT} exceeded");
    p
}

/// Poles realising `h_inf` for the given zeros.
fn place_poles(z: &[Complex64], order: usize, h_inf: f64, f0: f64) -> Vec<Complex64> {
    let n = order as f64;
    let reflect = |p: Complex64| if p.norm() > 1.0 { p.inv() } else { p };
    if f0 == 0.0 {
        let limit = 2f64.powi(order as i32);
        if h_inf >= limit {
            log::warn!("h_inf = {h_inf} is at least 2^order = {limit}; setting all NTF poles to zero");
            return vec![zero(); order];
        }
        secant_poles(z, h_inf, -1.0, 0.3f64.powi(order as i32 - 1), |x| maxflat_roots(order, x))
    } else {
        let z_inf = if f0 > 0.25 { 1.0 } else { -1.0 };
        let c2pf0 = (2.0 * PI * f0).cos();
        secant_poles(z, h_inf, z_inf, 0.3f64.powi(order as i32 / 2 - 1), |x| {
            let e2 = 0.5 * x.powf(2.0 / n);
            (0..order)
                .map(|k| {
                    let w = (2 * k + 1) as f64 * PI / n;
                    let mb2 = c2pf0 + e2 * Complex64::from_polar(1.0, w);
                    reflect(mb2 - (mb2 * mb2 - 1.0).sqrt())
                })
                .collect()
        })
    }
}

/// Free zero offsets of a re-optimised design and their bounds.
fn initial_offsets(order: usize, f0: f64, table: u8) -> Result<(Vec<f64>, (f64, f64))> {
    if f0 == 0.0 {
        let x = ds_optzeros(order, table)?
            .into_iter()
            .filter(|&v| v > 0.0)
            .collect();
        Ok((x, (0.0, 1.0)))
    } else {
        let mut x: Vec<f64> = ds_optzeros(order / 2, table)?
            .into_iter()
            .map(|v| v / 2.0)
            .collect();
        if table == 2 {
            if let Some(i) = x.iter().position(|&v| v == 0.0) {
                x.remove(i);
            }
        }
        Ok((x, (-1.0, 1.0)))
    }
}

/// Alternate between minimising the in-band RMS gain over the zeros and
/// re-placing the poles.
fn reoptimize(
    order: usize,
    osr: f64,
    f0: f64,
    h_inf: f64,
    table: u8,
) -> Result<(Vec<Complex64>, Vec<Complex64>)> {
    let (mut x, bounds) = initial_offsets(order, f0, table)?;
    let mut z = zeros_from_offsets(&x, order, osr, f0);
    let mut p = place_poles(&z, order, h_inf, f0);
    if x.is_empty() {
        return Ok((z, p));
    }
    let nm_opts = NelderMeadOptions::default().with_bounds(vec![bounds; x.len()]);
    for round in 1..=REOPTIMIZE_ROUNDS {
        let m = nelder_mead(|xi| ds_syn_ntf_obj1(xi, &p, osr, f0), &x, &nm_opts)?;
        let moved = m
            .x
            .iter()
            .zip(&x)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        x = m.x;
        z = zeros_from_offsets(&x, order, osr, f0);
        p = place_poles(&z, order, h_inf, f0);
        log::debug!(
            "zero refinement round {round}: in-band gain {:.3} dB, offsets moved by {moved:e}",
            m.fun
        );
        if moved < 1e-9 {
            break;
        }
    }
    Ok((z, p))
}

/// Synthesise a noise transfer function.
///
/// The result has unit gain, `order` zeros and `order` poles, both sorted
/// into conjugate pairs. If the requested `h_inf` cannot be
/// reached the poles fall back to the origin with a warning.
pub fn synthesize_ntf(params: &SynthesizeNtf) -> Result<Tf> {
    let SynthesizeNtf {
        order,
        osr,
        ref opt,
        h_inf,
        mut f0,
    } = *params;
    if order == 0 {
        return Err(DsmError::invalid("NTF order must be at least 1"));
    }
    if !(osr >= 1.0 && osr.is_finite()) {
        return Err(DsmError::invalid(format!(
            "oversampling ratio must be at least 1, got {osr}"
        )));
    }
    if !(0.0..=0.5).contains(&f0) {
        return Err(DsmError::invalid(format!("f0 must be in [0, 1/2], got {f0}")));
    }
    check_h_inf(h_inf)?;
    if f0 > 0.0 && f0 < 0.25 / osr {
        log::warn!("f0 = {f0} is inside the lowpass band; designing a lowpass NTF");
        f0 = 0.0;
    }
    if f0 != 0.0 && order % 2 != 0 {
        return Err(DsmError::invalid(format!(
            "order must be even for a bandpass modulator, got {order}"
        )));
    }
    if let ZeroOpt::Explicit(z) = opt {
        if z.len() != order {
            return Err(DsmError::invalid(format!(
                "{} zeros supplied for an NTF of order {order}",
                z.len()
            )));
        }
    }

    let (z, p) = match opt.table() {
        Some(table) if opt.reoptimize() => reoptimize(order, osr, f0, h_inf, table)?,
        _ => {
            let z = initial_zeros(order, osr, opt, f0)?;
            let p = place_poles(&z, order, h_inf, f0);
            (z, p)
        }
    };
    Ok(Tf::zpk(pair_roots(&z), pair_roots(&p), 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tf::freq_response;
    use approx::assert_abs_diff_eq;

    fn peak(tf: &Tf) -> f64 {
        let (_, h) = freq_response(tf, 4096);
        h.iter().fold(0.0_f64, |m, v| m.max(v.norm()))
    }

    #[test]
    fn test_default_design() {
        let tf = synthesize_ntf(&SynthesizeNtf::default()).unwrap();
        let (z, p, k) = tf.zpk_parts();
        assert_eq!(k, 1.0);
        assert!(z.iter().all(|v| *v == Complex64::new(1.0, 0.0)));
        assert_eq!(p.len(), 3);
        assert_abs_diff_eq!(p[0].re, 0.7654, epsilon = 1e-4);
        assert_abs_diff_eq!(p[0].im, -0.2793, epsilon = 1e-4);
        assert_abs_diff_eq!(p[2].re, 0.6694, epsilon = 1e-4);
        assert_abs_diff_eq!(tf.eval(Complex64::new(-1.0, 0.0)).re, 1.5, epsilon = 1e-8);
    }

    #[test]
    fn test_bandpass_gain_at_nyquist() {
        let params = SynthesizeNtf {
            order: 4,
            f0: 0.125,
            osr: 32.0,
            ..SynthesizeNtf::default()
        };
        let tf = synthesize_ntf(&params).unwrap();
        assert_abs_diff_eq!(tf.eval(Complex64::new(-1.0, 0.0)).re, 1.5, epsilon = 1e-8);
        assert!(tf.is_stable());
        assert_abs_diff_eq!(tf.magnitude_at(0.125), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_high_h_inf_gives_fir() {
        let params = SynthesizeNtf {
            order: 2,
            h_inf: 4.5,
            ..SynthesizeNtf::default()
        };
        let tf = synthesize_ntf(&params).unwrap();
        assert!(tf.is_fir());
    }

    #[test]
    fn test_reoptimized_zeros_beat_table_zeros() {
        let base = SynthesizeNtf {
            order: 4,
            osr: 32.0,
            opt: ZeroOpt::Optimized,
            ..SynthesizeNtf::default()
        };
        let table = synthesize_ntf(&base).unwrap();
        let refined = synthesize_ntf(&SynthesizeNtf {
            opt: ZeroOpt::Reoptimized,
            ..base
        })
        .unwrap();
        let band = 0.5 / 32.0;
        let g_table = crate::merit::rms_gain(&table, 0.0, band, 100);
        let g_refined = crate::merit::rms_gain(&refined, 0.0, band, 100);
        assert!(g_refined <= g_table * 1.01);
        assert!(peak(&refined) <= 1.5 + 1e-4);
    }

    #[test]
    fn test_argument_checks() {
        let bad = |p: SynthesizeNtf| synthesize_ntf(&p).unwrap_err().is_argument_error();
        assert!(bad(SynthesizeNtf {
            order: 0,
            ..SynthesizeNtf::default()
        }));
        assert!(bad(SynthesizeNtf {
            f0: 0.6,
            ..SynthesizeNtf::default()
        }));
        assert!(bad(SynthesizeNtf {
            f0: 0.25,
            ..SynthesizeNtf::default()
        }));
        assert!(bad(SynthesizeNtf {
            opt: ZeroOpt::Explicit(vec![Complex64::new(1.0, 0.0)]),
            ..SynthesizeNtf::default()
        }));
    }

    #[test]
    fn test_near_dc_band_is_lowpass() {
        let tf = synthesize_ntf(&SynthesizeNtf {
            f0: 0.001,
            ..SynthesizeNtf::default()
        })
        .unwrap();
        assert!(tf.zeros().iter().all(|v| *v == Complex64::new(1.0, 0.0)));
    }
}
