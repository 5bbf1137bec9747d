//! Derivative-free local minimisation (Nelder-Mead simplex).
//!
//! Used wherever the classical designs tune a handful of real parameters:
//! zero positions, CLANS pole parameters, unit-circle zero spreading.
//! Box bounds are honoured by clamping every trial vertex.

use crate::error::{DsmError, Result};
use serde::{Deserialize, Serialize};

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Relative size of the initial simplex.
const INITIAL_STEP: f64 = 0.05;
/// Initial step for components that start at zero.
const ZERO_STEP: f64 = 0.00025;

/// Options for [`nelder_mead`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMeadOptions {
    /// Iteration cap; `None` means `400 * n`
    pub max_iter: Option<usize>,
    /// Stop when every vertex is within this distance of the best one
    pub xatol: f64,
    /// ... and every value within this distance of the best value
    pub fatol: f64,
    /// Optional `(lower, upper)` bound per coordinate
    pub bounds: Option<Vec<(f64, f64)>>,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            max_iter: None,
            xatol: 1e-8,
            fatol: 1e-12,
            bounds: None,
        }
    }
}

impl NelderMeadOptions {
    /// Same options with box bounds.
    pub fn with_bounds(mut self, bounds: Vec<(f64, f64)>) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// Outcome of [`nelder_mead`].
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Best point found
    pub x: Vec<f64>,
    /// Objective value at `x`
    pub fun: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Objective evaluations
    pub nfev: usize,
    /// Whether the tolerances were met before the iteration cap
    pub converged: bool,
}

fn clamp(x: &mut [f64], bounds: Option<&[(f64, f64)]>) {
    if let Some(bounds) = bounds {
        for (xi, &(lo, hi)) in x.iter_mut().zip(bounds) {
            *xi = xi.clamp(lo, hi);
        }
    }
}

/// `c + k (c - w)`
fn affine_step(c: &[f64], w: &[f64], k: f64) -> Vec<f64> {
    c.iter().zip(w).map(|(ci, wi)| ci + k * (ci - wi)).collect()
}

fn nan_last(a: f64, b: f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => a.total_cmp(&b),
    }
}

/// Minimise `f` starting from `x0`.
pub fn nelder_mead<F>(f: F, x0: &[f64], opts: &NelderMeadOptions) -> Result<Minimum>
where
    F: Fn(&[f64]) -> f64,
{
    let n = x0.len();
    if n == 0 {
        return Err(DsmError::invalid("nelder_mead: empty initial guess"));
    }
    let bounds = opts.bounds.as_deref();
    if let Some(b) = bounds {
        if b.len() != n {
            return Err(DsmError::invalid(format!(
                "nelder_mead: {} bounds for {n} coordinates",
                b.len()
            )));
        }
        if let Some((lo, hi)) = b.iter().find(|(lo, hi)| !(lo <= hi)) {
            return Err(DsmError::invalid(format!(
                "nelder_mead: empty bound interval [{lo}, {hi}]"
            )));
        }
    }
    let max_iter = opts.max_iter.unwrap_or(400 * n);

    let mut vertices: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    let mut start = x0.to_vec();
    clamp(&mut start, bounds);
    vertices.push(start.clone());
    for j in 0..n {
        let mut v = start.clone();
        v[j] = if v[j] != 0.0 {
            v[j] * (1.0 + INITIAL_STEP)
        } else {
            ZERO_STEP
        };
        clamp(&mut v, bounds);
        if v[j] == start[j] {
            // clamped back onto the start: step inwards instead
            v[j] = start[j] - if start[j] != 0.0 { INITIAL_STEP * start[j] } else { ZERO_STEP };
            clamp(&mut v, bounds);
        }
        vertices.push(v);
    }
    let mut values: Vec<f64> = vertices.iter().map(|v| f(v)).collect();
    let mut nfev = n + 1;

    let mut order: Vec<usize> = (0..=n).collect();
    for iter in 0..max_iter {
        order.sort_by(|&a, &b| nan_last(values[a], values[b]));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];
        if values[best].is_nan() {
            return Err(DsmError::invalid("nelder_mead: objective is NaN everywhere"));
        }

        let x_spread = vertices
            .iter()
            .flat_map(|v| v.iter().zip(&vertices[best]).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max);
        let f_spread = values
            .iter()
            .map(|v| (v - values[best]).abs())
            .fold(0.0, f64::max);
        if x_spread <= opts.xatol && f_spread <= opts.fatol {
            return Ok(Minimum {
                x: vertices[best].clone(),
                fun: values[best],
                iterations: iter,
                nfev,
                converged: true,
            });
        }

        let mut centroid = vec![0.0; n];
        for &i in &order[..n] {
            for (c, v) in centroid.iter_mut().zip(&vertices[i]) {
                *c += v / n as f64;
            }
        }

        let mut eval = |mut x: Vec<f64>| {
            clamp(&mut x, bounds);
            let fx = f(&x);
            nfev += 1;
            (x, fx)
        };

        let (xr, fr) = eval(affine_step(&centroid, &vertices[worst], REFLECTION));
        if fr < values[best] {
            let (xe, fe) = eval(affine_step(&centroid, &vertices[worst], REFLECTION * EXPANSION));
            if fe < fr {
                vertices[worst] = xe;
                values[worst] = fe;
            } else {
                vertices[worst] = xr;
                values[worst] = fr;
            }
            continue;
        }
        if fr < values[second_worst] {
            vertices[worst] = xr;
            values[worst] = fr;
            continue;
        }

        let (xc, fc) = if fr < values[worst] {
            eval(affine_step(&centroid, &vertices[worst], REFLECTION * CONTRACTION))
        } else {
            eval(affine_step(&centroid, &vertices[worst], -CONTRACTION))
        };
        if fc < values[worst].min(fr) {
            vertices[worst] = xc;
            values[worst] = fc;
            continue;
        }

        let anchor = vertices[best].clone();
        for &i in &order[1..] {
            let shrunk: Vec<f64> = anchor
                .iter()
                .zip(&vertices[i])
                .map(|(a, v)| a + SHRINK * (v - a))
                .collect();
            let (xs, fs) = eval(shrunk);
            vertices[i] = xs;
            values[i] = fs;
        }
    }

    let best = (0..=n)
        .min_by(|&a, &b| nan_last(values[a], values[b]))
        .unwrap_or(0);
    log::warn!("nelder_mead: no convergence after {max_iter} iterations");
    Ok(Minimum {
        x: vertices[best].clone(),
        fun: values[best],
        iterations: max_iter,
        nfev,
        converged: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rosenbrock() {
        let rosen = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let m = nelder_mead(rosen, &[-1.2, 1.0], &NelderMeadOptions::default()).unwrap();
        assert!(m.converged);
        assert_abs_diff_eq!(m.x[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(m.x[1], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_bounds_are_respected() {
        let f = |x: &[f64]| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2);
        let opts = NelderMeadOptions::default().with_bounds(vec![(0.0, 1.0), (-0.5, 0.5)]);
        let m = nelder_mead(f, &[0.5, 0.0], &opts).unwrap();
        assert_abs_diff_eq!(m.x[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(m.x[1], -0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_start_at_zero() {
        let m = nelder_mead(|x| (x[0] - 0.3).powi(2), &[0.0], &NelderMeadOptions::default())
            .unwrap();
        assert_abs_diff_eq!(m.x[0], 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_input() {
        assert!(nelder_mead(|_| 0.0, &[], &NelderMeadOptions::default()).is_err());
        let opts = NelderMeadOptions::default().with_bounds(vec![(1.0, 0.0)]);
        assert!(nelder_mead(|x| x[0], &[0.5], &opts).is_err());
    }
}
