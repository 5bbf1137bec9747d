//! Time-domain simulation of single-quantiser delta-sigma modulators.
//!
//! The loop is realised in state space:
//!
//! ```text
//! y[n]   = C x[n] + D1 u[n]
//! v[n]   = Q(y[n])
//! x[n+1] = A x[n] + Bu u[n] + Bv v[n]
//! ```
//!
//! When the modulator is given by its NTF `N(z)/D(z)` the loop filter is
//! `y = u + (N - D)/N (v - u)`, realised in controllable canonical form.

use crate::error::{DsmError, Result};
use crate::lmi::companion;
use crate::tf::Tf;
use ndarray::{Array1, Array2, s};
use serde::{Deserialize, Serialize};

/// Pre-quantiser magnitude treated as instability by default.
pub const DEFAULT_OVERFLOW_LIMIT: f64 = 1e3;

/// A modulator description.
#[derive(Debug, Clone, PartialEq)]
pub enum Modulator {
    /// Noise transfer function, unit value at infinity
    Ntf(Tf),
    /// `[[A, Bu, Bv], [C, D1, 0]]`, one input and one quantiser
    Abcd(Array2<f64>),
}

/// Options for [`simulate_dsm`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulateOptions {
    /// Number of quantiser levels
    pub nlev: u32,
    /// Initial state, zero if `None`
    pub x0: Option<Vec<f64>>,
    /// Largest accepted `|y|`; `None` only rejects non-finite values
    pub overflow_limit: Option<f64>,
}

impl Default for SimulateOptions {
    fn default() -> Self {
        Self {
            nlev: 2,
            x0: None,
            overflow_limit: Some(DEFAULT_OVERFLOW_LIMIT),
        }
    }
}

/// Outcome of [`simulate_dsm`].
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    /// Quantiser output, odd integers for even `nlev`, even ones otherwise
    pub v: Array1<i32>,
    /// Final state
    pub xn: Array1<f64>,
    /// Largest absolute value reached by each state
    pub xmax: Array1<f64>,
    /// Quantiser input
    pub y: Array1<f64>,
}

/// Quantise one sample to `nlev` levels spaced by 2.
///
/// Even `nlev` gives odd outputs in `[-(nlev-1), nlev-1]` (mid-rise), odd
/// `nlev` even outputs in the same range (mid-tread). Ties go up.
pub fn ds_quantize(y: f64, nlev: u32) -> f64 {
    let v = if nlev % 2 == 0 {
        2.0 * (0.5 * y).floor() + 1.0
    } else {
        2.0 * (0.5 * (y + 1.0)).floor()
    };
    let limit = f64::from(nlev.saturating_sub(1));
    v.clamp(-limit, limit)
}

/// Loop filter in state space, row-major.
#[derive(Debug, Clone)]
struct LoopFilter {
    order: usize,
    a: Vec<f64>,
    bu: Vec<f64>,
    bv: Vec<f64>,
    c: Vec<f64>,
    d1: f64,
}

impl LoopFilter {
    fn from_ntf(ntf: &Tf) -> Result<Self> {
        let (num, den) = ntf.ba_coefficients()?;
        let order = den.len() - 1;
        if order == 0 {
            return Err(DsmError::invalid("the NTF must have order at least 1"));
        }
        if (num[0] / den[0] - 1.0).abs() > 1e-9 {
            return Err(DsmError::invalid(format!(
                "the NTF must be 1 at infinity, got {}",
                num[0] / den[0]
            )));
        }
        let n_tail: Vec<f64> = num[1..].iter().map(|v| v / num[0]).collect();
        let d_tail: Vec<f64> = den[1..].iter().map(|v| v / den[0]).collect();
        let (a, b) = companion(&n_tail);
        let c = (0..order)
            .map(|j| n_tail[order - 1 - j] - d_tail[order - 1 - j])
            .collect();
        let bv: Vec<f64> = b.iter().copied().collect();
        Ok(Self {
            order,
            a: a.iter().copied().collect(),
            bu: bv.iter().map(|v| -v).collect(),
            bv,
            c,
            d1: 1.0,
        })
    }

    fn from_abcd(abcd: &Array2<f64>) -> Result<Self> {
        let (rows, cols) = abcd.dim();
        if rows < 2 || cols != rows + 1 {
            return Err(DsmError::invalid(format!(
                "incorrect modulator specification: ABCD of shape {rows}x{cols} \
                 (expected (n+1)x(n+2) for one input and one quantiser)"
            )));
        }
        let order = rows - 1;
        Ok(Self {
            order,
            a: abcd.slice(s![..order, ..order]).iter().copied().collect(),
            bu: abcd.slice(s![..order, order]).to_vec(),
            bv: abcd.slice(s![..order, order + 1]).to_vec(),
            c: abcd.slice(s![order, ..order]).to_vec(),
            d1: abcd[[order, order]],
        })
    }

    #[inline]
    fn output(&self, x: &[f64], u: f64) -> f64 {
        self.c.iter().zip(x).map(|(c, x)| c * x).sum::<f64>() + self.d1 * u
    }

    /// `next = A x + Bu u + Bv v`
    #[inline]
    fn advance(&self, x: &[f64], u: f64, v: f64, next: &mut [f64]) {
        for (i, out) in next.iter_mut().enumerate() {
            let row = &self.a[i * self.order..(i + 1) * self.order];
            let ax: f64 = row.iter().zip(x).map(|(a, x)| a * x).sum();
            *out = ax + self.bu[i] * u + self.bv[i] * v;
        }
    }
}

/// Simulate the modulator on the input `u`.
pub fn simulate_dsm(u: &[f64], modulator: &Modulator, opts: &SimulateOptions) -> Result<Simulation> {
    if opts.nlev < 2 {
        return Err(DsmError::invalid(format!(
            "the quantiser needs at least 2 levels, got {}",
            opts.nlev
        )));
    }
    let filter = match modulator {
        Modulator::Ntf(ntf) => LoopFilter::from_ntf(ntf)?,
        Modulator::Abcd(abcd) => LoopFilter::from_abcd(abcd)?,
    };
    let order = filter.order;
    let mut x = match &opts.x0 {
        None => vec![0.0; order],
        Some(x0) if x0.len() == order => x0.clone(),
        Some(x0) => {
            return Err(DsmError::invalid(format!(
                "initial state has {} entries for a modulator of order {order}",
                x0.len()
            )));
        }
    };
    let limit = opts.overflow_limit.unwrap_or(f64::INFINITY);

    let mut next = vec![0.0; order];
    let mut xmax: Vec<f64> = x.iter().map(|v| v.abs()).collect();
    let mut v_out = Vec::with_capacity(u.len());
    let mut y_out = Vec::with_capacity(u.len());
    for (n, &un) in u.iter().enumerate() {
        let y = filter.output(&x, un);
        if !(y.abs() <= limit) {
            return Err(DsmError::SimulationOverflow {
                sample: n,
                value: y,
                limit,
            });
        }
        let v = ds_quantize(y, opts.nlev);
        filter.advance(&x, un, v, &mut next);
        std::mem::swap(&mut x, &mut next);
        for (m, xi) in xmax.iter_mut().zip(&x) {
            *m = m.max(xi.abs());
        }
        y_out.push(y);
        v_out.push(v as i32);
    }
    log::debug!("simulated {} samples of an order {order} modulator", u.len());
    Ok(Simulation {
        v: Array1::from(v_out),
        xn: Array1::from(x),
        xmax: Array1::from(xmax),
        y: Array1::from(y_out),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use num_complex::Complex64;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_quantizer_levels() {
        assert_eq!(ds_quantize(0.0, 2), 1.0);
        assert_eq!(ds_quantize(-0.1, 2), -1.0);
        assert_eq!(ds_quantize(5.0, 2), 1.0);
        assert_eq!(ds_quantize(0.9, 3), 0.0);
        assert_eq!(ds_quantize(1.0, 3), 2.0);
        assert_eq!(ds_quantize(-7.0, 3), -2.0);
        assert_eq!(ds_quantize(2.5, 4), 3.0);
        assert_eq!(ds_quantize(1.99, 4), 1.0);
    }

    #[test]
    fn test_first_order_modulator_tracks_dc() {
        // NTF = 1 - z^-1
        let ntf = Tf::zpk(vec![c(1.0, 0.0)], vec![c(0.0, 0.0)], 1.0);
        let u = vec![0.5; 1000];
        let sim = simulate_dsm(&u, &Modulator::Ntf(ntf), &SimulateOptions::default()).unwrap();
        let mean = sim.v.iter().map(|&v| f64::from(v)).sum::<f64>() / 1000.0;
        assert!((mean - 0.5).abs() < 5e-3);
        assert!(sim.v.iter().all(|&v| v == 1 || v == -1));
        assert!(sim.xmax[0] <= 3.0);
    }

    #[test]
    fn test_ntf_and_abcd_agree() {
        // first order loop: x' = x + u - v, y = x + u
        let abcd = array![[1.0, 1.0, -1.0], [1.0, 1.0, 0.0]];
        let ntf = Tf::zpk(vec![c(1.0, 0.0)], vec![c(0.0, 0.0)], 1.0);
        let u: Vec<f64> = (0..256).map(|n| 0.6 * (0.05 * n as f64).sin()).collect();
        let a = simulate_dsm(&u, &Modulator::Abcd(abcd), &SimulateOptions::default()).unwrap();
        let b = simulate_dsm(&u, &Modulator::Ntf(ntf), &SimulateOptions::default()).unwrap();
        assert_eq!(a.v, b.v);
    }

    #[test]
    fn test_overflow_is_reported() {
        // all zeros at 1 with poles at 0: a fifth order loop overloads
        let ntf = Tf::zpk(vec![c(1.0, 0.0); 5], vec![c(0.0, 0.0); 5], 1.0);
        let u = vec![0.9; 2000];
        let err = simulate_dsm(&u, &Modulator::Ntf(ntf), &SimulateOptions::default()).unwrap_err();
        assert!(err.is_overflow_error());
    }

    #[test]
    fn test_bad_arguments() {
        let ntf = Tf::zpk(vec![c(1.0, 0.0)], vec![c(0.0, 0.0)], 2.0);
        let opts = SimulateOptions::default();
        assert!(simulate_dsm(&[0.0], &Modulator::Ntf(ntf.clone()), &opts).is_err());
        let abcd = Array2::zeros((2, 2));
        assert!(simulate_dsm(&[0.0], &Modulator::Abcd(abcd), &opts).is_err());
        let bad_x0 = SimulateOptions {
            x0: Some(vec![0.0, 0.0]),
            ..SimulateOptions::default()
        };
        let ntf = Tf::zpk(vec![c(1.0, 0.0)], vec![c(0.0, 0.0)], 1.0);
        assert!(simulate_dsm(&[0.0], &Modulator::Ntf(ntf), &bad_x0).is_err());
    }
}
