//! NTFs from inverse Chebyshev (type II) filters.
//!
//! A type II highpass (lowpass designs) or bandstop (bandpass designs)
//! filter is equiripple in its stopband, which becomes the signal band of
//! the NTF. The stopband attenuation is searched so that the monic
//! version of the filter peaks at `h_inf` out of band.

use super::optzeros::ds_f1f2;
use crate::cplxpair::pair_roots;
use crate::analog::{FilterBand, cheby2_zpk};
use crate::error::{DsmError, Result};
use crate::fir_weighting::check_h_inf;
use crate::tf::Tf;
use serde::{Deserialize, Serialize};

/// Parameters of [`synthesize_chebyshev_ntf`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChebyshevNtf {
    /// NTF order (even for bandpass designs)
    pub order: usize,
    /// Oversampling ratio
    pub osr: f64,
    /// Maximum out-of-band gain
    pub h_inf: f64,
    /// Band centre, 0 for lowpass
    pub f0: f64,
}

impl Default for ChebyshevNtf {
    fn default() -> Self {
        Self {
            order: 3,
            osr: 64.0,
            h_inf: 1.5,
            f0: 0.0,
        }
    }
}

const ATTENUATION_RANGE: (f64, f64) = (0.0, 300.0);
const MAX_STEP: f64 = 10.0;
const INITIAL_ATTENUATION: f64 = 60.0;
const FTOL: f64 = 1e-6;
const XTOL: f64 = 1e-6;
const ITERATION_LIMIT: usize = 10;

/// Synthesise an NTF from a Chebyshev type II filter.
///
/// The attenuation search is a secant iteration safeguarded by the
/// bracket it accumulates; it stops after a few steps, so `h_inf` is met
/// approximately.
pub fn synthesize_chebyshev_ntf(params: &ChebyshevNtf) -> Result<Tf> {
    let ChebyshevNtf {
        order,
        osr,
        h_inf,
        f0,
    } = *params;
    if order == 0 {
        return Err(DsmError::invalid("NTF order must be at least 1"));
    }
    if !(osr >= 1.0 && osr.is_finite()) {
        return Err(DsmError::invalid(format!(
            "oversampling ratio must be at least 1, got {osr}"
        )));
    }
    if !(0.0..0.5).contains(&f0) {
        return Err(DsmError::invalid(format!("f0 must be in [0, 1/2), got {f0}")));
    }
    if f0 != 0.0 && order % 2 != 0 {
        return Err(DsmError::invalid(format!(
            "order must be even for a bandpass modulator, got {order}"
        )));
    }
    check_h_inf(h_inf)?;
    let (f1, f2) = ds_f1f2(osr, f0, false);
    let design = |rs: f64| {
        if f0 == 0.0 {
            cheby2_zpk(order, rs, FilterBand::Highpass(1.0 / osr))
        } else {
            cheby2_zpk(order / 2, rs, FilterBand::Bandstop(2.0 * f1, 2.0 * f2))
        }
    };

    let (mut x_min, mut x_max) = ATTENUATION_RANGE;
    let mut x = INITIAL_ATTENUATION;
    let mut dx = 0.0;
    let mut f_p = 0.0;
    let mut itn = 0;
    let filter = loop {
        let filter = design(x)?;
        let (_, _, k) = filter.zpk_parts();
        let f = 1.0 / k - h_inf;
        if f > 0.0 {
            x_max = x;
        } else {
            x_min = x;
        }
        if itn == 0 {
            dx = -MAX_STEP * f.signum();
        } else {
            let df = f - f_p;
            if df.abs() < FTOL {
                break filter;
            }
            dx = -f * dx / df;
        }
        let x_p = x;
        f_p = f;
        x = (x + dx).min(x_max).max(x_min);
        dx = x - x_p;
        log::debug!("chebyshev NTF: attenuation {x_p:.6} dB, gain error {f:e}");
        itn += 1;
        if dx.abs() < XTOL || itn == ITERATION_LIMIT {
            break filter;
        }
    };
    let (z, p, _) = filter.zpk_parts();
    Ok(Tf::zpk(pair_roots(&z), pair_roots(&p), 1.0))
}
