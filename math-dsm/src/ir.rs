//! Truncated impulse responses of discrete-time filters.

use crate::error::{DsmError, Result};
use crate::tf::Tf;
use serde::{Deserialize, Serialize};

/// Longest response the adaptive search will compute.
const MAX_IR_LENGTH: usize = 1 << 22;
/// Shortest trial length of the adaptive search.
const MIN_TRIAL_LENGTH: usize = 32;

/// How the length of an impulse response is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IrLength {
    /// Double a trial length until the trailing half of the response stays
    /// this many dB below its peak.
    Db(f64),
    /// Exactly this many samples.
    Samples(usize),
}

impl Default for IrLength {
    fn default() -> Self {
        IrLength::Db(100.0)
    }
}

/// Filter `x` through `b(z^-1) / a(z^-1)` (direct form II transposed).
///
/// Coefficients are in ascending powers of `z^-1`; `a[0]` must be nonzero.
pub fn lfilter(b: &[f64], a: &[f64], x: &[f64]) -> Vec<f64> {
    let n = a.len().max(b.len());
    if n == 0 || a.first().is_none_or(|&a0| a0 == 0.0) {
        return vec![0.0; x.len()];
    }
    let a0 = a[0];
    let coef = |c: &[f64], i: usize| c.get(i).copied().unwrap_or(0.0) / a0;
    let bn: Vec<f64> = (0..n).map(|i| coef(b, i)).collect();
    let an: Vec<f64> = (0..n).map(|i| coef(a, i)).collect();

    let mut state = vec![0.0; n.saturating_sub(1)];
    let mut out = Vec::with_capacity(x.len());
    for &xi in x {
        let yi = bn[0] * xi + state.first().copied().unwrap_or(0.0);
        for k in 0..state.len() {
            let next = state.get(k + 1).copied().unwrap_or(0.0);
            state[k] = bn[k + 1] * xi + next - an[k + 1] * yi;
        }
        out.push(yi);
    }
    out
}

/// Rough length estimate from the slowest pole: the number of samples
/// for its transient to decay by `db` decibels, plus the zero count.
///
/// Returns `usize::MAX` when a pole sits on the unit circle.
pub fn guess_ir_length(tf: &Tf, db: f64) -> usize {
    let (zeros, poles, _) = tf.zpk_parts();
    let t_z = zeros.len() + 1;
    if poles.is_empty() {
        return t_z;
    }
    let wmin = poles
        .iter()
        .map(|p| p.norm().ln().abs())
        .fold(f64::INFINITY, f64::min);
    if wmin == 0.0 {
        return usize::MAX;
    }
    let t_p = (db / 20.0 * std::f64::consts::LN_10 / wmin).ceil();
    if t_p.is_finite() {
        (t_p as usize).saturating_add(t_z)
    } else {
        t_z
    }
}

fn unit_impulse(len: usize) -> Vec<f64> {
    let mut x = vec![0.0; len];
    if let Some(first) = x.first_mut() {
        *first = 1.0;
    }
    x
}

/// Impulse response of `tf`, truncated according to `length`.
///
/// With [`IrLength::Db`], FIR filters return their coefficients directly;
/// otherwise the trial length doubles until the second half of the
/// response is below the threshold, and the result is cut after its last
/// sample above the threshold. Unstable filters are rejected.
pub fn impulse_response(tf: &Tf, length: &IrLength) -> Result<Vec<f64>> {
    let (b, a) = tf.ba_coefficients()?;
    match *length {
        IrLength::Samples(m) => Ok(lfilter(&b, &a, &unit_impulse(m))),
        IrLength::Db(db) => {
            if !(db > 0.0) {
                return Err(DsmError::invalid(format!(
                    "impulse response floor must be a positive dB value, got {db}"
                )));
            }
            if tf.is_fir() {
                return Ok(b.iter().map(|v| v / a[0]).collect());
            }
            if let Some(p) = tf.poles().iter().find(|p| p.norm() >= 1.0) {
                return Err(DsmError::Unstable {
                    reason: format!("pole {p} is not inside the unit circle"),
                });
            }
            adaptive(&b, &a, guess_ir_length(tf, db), db)
        }
    }
}

fn adaptive(b: &[f64], a: &[f64], guess: usize, db: f64) -> Result<Vec<f64>> {
    let ratio = 10f64.powf(-db / 20.0);
    let mut len = guess.clamp(MIN_TRIAL_LENGTH, MAX_IR_LENGTH).next_power_of_two();
    loop {
        let mut ir = lfilter(b, a, &unit_impulse(len));
        let peak = ir.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let threshold = ratio * peak;
        let tail = ir[len / 2..].iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if tail <= threshold {
            let keep = ir
                .iter()
                .rposition(|v| v.abs() > threshold)
                .map_or(1, |i| i + 1)
                .max(b.len());
            ir.truncate(keep);
            log::debug!("impulse response truncated to {keep} samples ({db} dB)");
            return Ok(ir);
        }
        if !peak.is_finite() || len >= MAX_IR_LENGTH {
            return Err(DsmError::Unstable {
                reason: format!("impulse response does not decay by {db} dB within {len} samples"),
            });
        }
        len *= 2;
    }
}
