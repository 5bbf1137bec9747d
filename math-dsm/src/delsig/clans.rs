//! CLANS: closed-loop analysis of noise shapers for multibit quantisers.
//!
//! The poles are parametrised through a bilinear map to the s-plane, where
//! each conjugate pair is a second order section with damping `ζ = x_i²`
//! and natural frequency `ωn = x_{i+1}²`. Any real `x` then gives poles
//! inside the disk of radius `rmax`. The in-band gain at the band edge is
//! minimised while the 1-norm of the impulse response is kept below
//! `nq + 1`, which guarantees that an `nq + 1` level quantiser never
//! overloads.
//!
//! Reference: J. G. Kenney and L. R. Carley, "Design of multibit noise
//! shaping data converters", Analog Integrated Circuits and Signal
//! Processing 3, 1993.

use super::optzeros::ZeroOpt;
use super::synthesize::{SynthesizeNtf, synthesize_ntf};
use crate::cplxpair::pair_roots;
use crate::error::{DsmError, Result};
use crate::ir::{IrLength, impulse_response};
use crate::optimize::{NelderMeadOptions, nelder_mead};
use crate::poly::poly_real;
use crate::tf::Tf;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Weight of the 1-norm constraint violation in the penalised objective.
const PENALTY: f64 = 100.0;
/// Samples of the impulse response entering the 1-norm.
const IR_SAMPLES: usize = 100;

/// Parameters of [`clans`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Clans {
    /// NTF order
    pub order: usize,
    /// Oversampling ratio
    pub osr: f64,
    /// Quantiser levels minus one
    pub nq: usize,
    /// Largest pole radius
    pub rmax: f64,
    /// Zero placement, as for [`synthesize_ntf`]
    pub opt: ZeroOpt,
}

impl Default for Clans {
    fn default() -> Self {
        Self {
            order: 4,
            osr: 64.0,
            nq: 5,
            rmax: 0.95,
            opt: ZeroOpt::Dc,
        }
    }
}

/// The NTF with zeros `hz` and poles described by the CLANS parameters `x`.
pub fn dsclans_ntf(x: &[f64], order: usize, rmax: f64, hz: &[Complex64]) -> Result<Tf> {
    if x.len() != order {
        return Err(DsmError::invalid(format!(
            "{} CLANS parameters for an NTF of order {order}",
            x.len()
        )));
    }
    let to_z = |s: Complex64| rmax * (1.0 + s) / (1.0 - s);
    let mut poles = Vec::with_capacity(order);
    let odd = order % 2;
    if odd == 1 {
        poles.push(to_z(Complex64::new(-x[0] * x[0], 0.0)));
    }
    for section in x[odd..].chunks_exact(2) {
        let zeta = section[0] * section[0];
        let wn = section[1] * section[1];
        // roots of s² + 2ζωn s + ωn²
        let b = zeta * wn;
        let disc = Complex64::new(b * b - wn * wn, 0.0).sqrt();
        poles.push(to_z(-b + disc));
        poles.push(to_z(-b - disc));
    }
    Ok(Tf::zpk(hz.to_vec(), poles, 1.0))
}

/// Project points outside the unit circle onto it.
fn project(z: &mut [Complex64]) {
    if z.iter().any(|v| v.norm() > 1.0) {
        for v in z.iter_mut() {
            let r = v.norm();
            *v /= r;
        }
    }
}

/// CLANS parameters reproducing (approximately) the given poles.
fn initial_parameters(poles: &[Complex64], rmax: f64) -> Vec<f64> {
    let order = poles.len();
    let mut x = vec![0.0; order];
    let odd = order % 2;
    let to_s = |z: Complex64| (z - 1.0) / (z + 1.0);
    if odd == 1 {
        let mut z = [Complex64::new(poles[0].re / rmax, 0.0)];
        project(&mut z);
        x[0] = (-to_s(z[0]).re).max(0.0).sqrt();
    }
    for i in (odd..order).step_by(2) {
        let mut z = [poles[i] / rmax, poles[i + 1] / rmax];
        project(&mut z);
        let c = poly_real(&[to_s(z[0]), to_s(z[1])]);
        let wn = c[2].max(0.0).sqrt();
        let zeta = if wn > 0.0 { c[1] / (2.0 * wn) } else { 0.0 };
        x[i] = zeta.max(0.0).sqrt();
        x[i + 1] = wn.sqrt();
    }
    x
}

/// 1-norm of the first samples of the impulse response.
fn ir_l1(tf: &Tf) -> f64 {
    impulse_response(tf, &IrLength::Samples(IR_SAMPLES))
        .map(|h| h.iter().map(|v| v.abs()).sum())
        .unwrap_or(f64::INFINITY)
}

/// Synthesise a lowpass NTF for a multibit modulator with the CLANS method.
///
/// Zeros are placed by [`synthesize_ntf`] with the same `opt`; its poles
/// (designed for `h_inf = nq + 1`) seed the optimiser.
pub fn clans(params: &Clans) -> Result<Tf> {
    let Clans {
        order,
        osr,
        nq,
        rmax,
        ref opt,
    } = *params;
    if !(rmax > 0.0 && rmax < 1.0) {
        return Err(DsmError::invalid(format!(
            "maximum pole radius must be in (0, 1), got {rmax}"
        )));
    }
    if nq == 0 {
        return Err(DsmError::invalid("at least two quantiser levels are required"));
    }
    let seed = synthesize_ntf(&SynthesizeNtf {
        order,
        osr,
        opt: opt.clone(),
        h_inf: 1.0 + nq as f64,
        f0: 0.0,
    })?;
    let (hz, seed_poles, _) = seed.zpk_parts();
    let mut poles = pair_roots(&seed_poles);
    poles.reverse();
    let x0 = initial_parameters(&poles, rmax);

    let edge = Complex64::from_polar(1.0, PI / osr);
    let bound = 1.0 + nq as f64;
    let objective = |x: &[f64]| match dsclans_ntf(x, order, rmax, &hz) {
        Ok(h) => h.eval(edge).norm() + PENALTY * (ir_l1(&h) - bound).max(0.0),
        Err(_) => f64::INFINITY,
    };
    let m = nelder_mead(objective, &x0, &NelderMeadOptions::default())?;
    let ntf = dsclans_ntf(&m.x, order, rmax, &hz)?;
    let l1 = ir_l1(&ntf);
    log::debug!(
        "CLANS: band-edge gain {:e}, impulse response 1-norm {l1:.6} (bound {bound}), {} evaluations",
        ntf.eval(edge).norm(),
        m.nfev
    );
    if l1 > bound * (1.0 + 1e-3) {
        log::warn!("CLANS: 1-norm constraint violated ({l1:.6} > {bound})");
    }
    let (z, p, k) = ntf.zpk_parts();
    Ok(Tf::zpk(z, pair_roots(&p), k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_parameters_map_inside_rmax() {
        let hz = vec![Complex64::new(1.0, 0.0); 3];
        let tf = dsclans_ntf(&[0.7, -1.3, 2.1], 3, 0.9, &hz).unwrap();
        for p in tf.poles() {
            assert!(p.norm() <= 0.9 + 1e-12);
        }
        assert!(dsclans_ntf(&[0.1], 3, 0.9, &hz).is_err());
    }

    #[test]
    fn test_initial_parameters_round_trip() {
        let poles = vec![
            Complex64::new(0.4, 0.0),
            Complex64::new(0.6, -0.3),
            Complex64::new(0.6, 0.3),
        ];
        let x = initial_parameters(&poles, 0.95);
        let hz = vec![Complex64::new(1.0, 0.0); 3];
        let back = pair_roots(&dsclans_ntf(&x, 3, 0.95, &hz).unwrap().poles());
        let expected = pair_roots(&poles);
        for (a, b) in back.iter().zip(&expected) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-10);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_default_design_meets_constraints() {
        let params = Clans::default();
        let tf = clans(&params).unwrap();
        let (z, p, k) = tf.zpk_parts();
        assert_eq!(k, 1.0);
        assert_eq!(z.len(), 4);
        assert!(p.iter().all(|v| v.norm() <= 0.95 + 1e-12));
        assert!(ir_l1(&tf) <= 6.0 * (1.0 + 1e-2));
    }

    #[test]
    fn test_bad_radius() {
        let params = Clans {
            rmax: 1.2,
            ..Clans::default()
        };
        assert!(clans(&params).unwrap_err().is_argument_error());
    }
}
