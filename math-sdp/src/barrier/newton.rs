//! Damped Newton centering for the log-barrier function.
//!
//! For `W_k = F_k(y)⁻¹` the barrier derivatives are
//!
//! ```text
//! g_j  = t c_j - Σ_k tr(W_k F_kj)
//! H_jl = Σ_k tr(W_k F_kj W_k F_kl)
//! ```
//!
//! plus the radius term. With sparse `F_kj` the Hessian column `j` is formed
//! from `B_j = W F_j W` (a sum of rank-one updates), after which every entry
//! is a short sum over the triplets of `F_l`.

use super::standard::{Block, StandardForm};
use crate::error::{Result, SdpError};
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

/// Newton decrement threshold `λ²/2` ending a centering.
const NEWTON_TOL: f64 = 1e-9;
/// Newton steps allowed per centering.
pub(super) const MAX_NEWTON: usize = 100;
/// Armijo sufficient-decrease fraction.
const ALPHA: f64 = 0.25;
/// Step reduction factor of the backtracking line search.
const BETA: f64 = 0.5;
/// Backtracking steps before the line search gives up.
const MAX_BACKTRACK: usize = 60;
/// Decrement `λ²/2` accepted as converged when the line search runs out of
/// precision.
const LOOSE_NEWTON_TOL: f64 = 1e-6;

/// Result of one centering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum CenteringOutcome {
    /// Newton decrement fell below tolerance after the given number of steps.
    Converged(usize),
    /// The caller's stop predicate fired.
    Stopped,
    /// No descent step could be found (numerical precision exhausted).
    Stalled,
    /// The Newton step limit was reached with the last decrement `λ²`.
    Exhausted { decrement: f64 },
}

pub(crate) struct Centering<'a> {
    sf: &'a StandardForm,
    radius2: f64,
}

fn factor(m: DMatrix<f64>) -> Option<Cholesky<f64, Dyn>> {
    if m.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Cholesky::new(m)
}

fn log_det(chol: &Cholesky<f64, Dyn>) -> f64 {
    2.0 * chol.l_dirty().diagonal().iter().map(|d| d.ln()).sum::<f64>()
}

impl<'a> Centering<'a> {
    pub fn new(sf: &'a StandardForm, radius: f64) -> Self {
        Self {
            sf,
            radius2: radius * radius,
        }
    }

    /// Barrier terms at `y` without the weighted objective, `None` outside
    /// the domain.
    fn barrier(&self, y: &DVector<f64>) -> Option<f64> {
        let slack = self.radius2 - y.norm_squared();
        if slack <= 0.0 {
            return None;
        }
        let mut v = -slack.ln();
        for block in &self.sf.blocks {
            let chol = factor(block.value(y))?;
            v -= log_det(&chol);
        }
        v.is_finite().then_some(v)
    }

    fn accumulate_block(block: &Block, w: &DMatrix<f64>, g: &mut DVector<f64>, h: &mut DMatrix<f64>) {
        let d = block.dim;
        let mut b = DMatrix::<f64>::zeros(d, d);
        for (a, (j, fj)) in block.terms.iter().enumerate() {
            // g_j -= tr(W F_j)
            g[*j] -= fj.iter().map(|&(r, c, v)| v * w[(c, r)]).sum::<f64>();

            // B = W F_j W
            b.fill(0.0);
            for &(r, c, v) in fj {
                let wr = w.column(r);
                let wc = w.column(c);
                b.ger(v, &wr, &wc, 1.0);
            }
            for (l, fl) in &block.terms[a..] {
                let hjl: f64 = fl.iter().map(|&(r, c, v)| v * b[(c, r)]).sum();
                h[(*j, *l)] += hjl;
                if *l != *j {
                    h[(*l, *j)] += hjl;
                }
            }
        }
    }

    /// Gradient and Hessian of the barrier at `y`.
    fn derivatives(&self, y: &DVector<f64>, t: f64) -> Option<(DVector<f64>, DMatrix<f64>)> {
        let n = self.sf.n;
        let slack = self.radius2 - y.norm_squared();
        if slack <= 0.0 {
            return None;
        }
        let mut g = &self.sf.c * t + y * (2.0 / slack);
        let mut h = DMatrix::<f64>::identity(n, n) * (2.0 / slack);
        h.ger(4.0 / (slack * slack), y, y, 1.0);

        for block in &self.sf.blocks {
            let w = factor(block.value(y))?.inverse();
            Self::accumulate_block(block, &w, &mut g, &mut h);
        }
        Some((g, h))
    }

    /// Solve `H dy = -g`, regularising the diagonal if `H` is not numerically PD.
    fn newton_direction(g: &DVector<f64>, h: &DMatrix<f64>) -> Option<DVector<f64>> {
        if let Some(chol) = factor(h.clone()) {
            return Some(chol.solve(&(-g)));
        }
        let scale = h.diagonal().amax().max(1.0);
        let mut ridge = 1e-12 * scale;
        for _ in 0..6 {
            let mut hr = h.clone();
            for i in 0..hr.nrows() {
                hr[(i, i)] += ridge;
            }
            if let Some(chol) = factor(hr) {
                return Some(chol.solve(&(-g)));
            }
            ridge *= 100.0;
        }
        None
    }

    /// Minimise the barrier for weight `t` starting from (and updating) `y`.
    ///
    /// `stop` is checked after every accepted step. The sufficient-decrease
    /// test compares the change of the barrier terms with the change of the
    /// weighted objective, so it stays exact when `t cᵀy` is large.
    pub fn run<F>(&self, y: &mut DVector<f64>, t: f64, stop: F) -> Result<CenteringOutcome>
    where
        F: Fn(&DVector<f64>) -> bool,
    {
        let Some(mut current) = self.barrier(y) else {
            return Err(SdpError::NumericalFailure {
                reason: "centering started outside the barrier domain".to_string(),
            });
        };

        let mut decrement = f64::INFINITY;
        for step in 0..MAX_NEWTON {
            let Some((g, h)) = self.derivatives(y, t) else {
                return Ok(CenteringOutcome::Stalled);
            };
            let Some(dy) = Self::newton_direction(&g, &h) else {
                return Ok(CenteringOutcome::Stalled);
            };
            let slope = g.dot(&dy);
            if !slope.is_finite() {
                return Err(SdpError::NumericalFailure {
                    reason: "non-finite Newton step".to_string(),
                });
            }
            decrement = -slope;
            if decrement * 0.5 <= NEWTON_TOL {
                return Ok(CenteringOutcome::Converged(step));
            }

            let linear = t * self.sf.c.dot(&dy);
            let mut alpha = 1.0;
            let mut accepted = false;
            for _ in 0..MAX_BACKTRACK {
                let trial = &*y + &dy * alpha;
                if let Some(v) = self.barrier(&trial) {
                    if alpha * linear + (v - current) <= ALPHA * alpha * slope {
                        *y = trial;
                        current = v;
                        accepted = true;
                        break;
                    }
                }
                alpha *= BETA;
            }
            if !accepted {
                if decrement * 0.5 <= LOOSE_NEWTON_TOL {
                    log::debug!("line search exhausted at decrement {decrement:.3e}, t = {t:.3e}");
                    return Ok(CenteringOutcome::Converged(step));
                }
                return Ok(CenteringOutcome::Stalled);
            }
            if stop(y) {
                return Ok(CenteringOutcome::Stopped);
            }
        }
        log::debug!("centering hit the Newton step limit at t = {t:.3e} (decrement {decrement:.3e})");
        Ok(CenteringOutcome::Exhausted { decrement })
    }
}
