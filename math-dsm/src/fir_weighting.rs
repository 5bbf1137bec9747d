//! FIR and hybrid NTFs minimising a weighted noise power.
//!
//! Given the first row `q0` of the weighting matrix `Q`, the numerator
//! `b = [1, b1, ..., bN]` is chosen to minimise `bᵀ Q b` subject to the
//! bounded-real constraint `||NTF||∞ <= h_inf`. The problem is cast as
//!
//! ```text
//! minimise t   s.t.   ||Qs b||₂ <= t,   M(X, b) ⪯ 0,   X ⪰ 0
//! ```
//!
//! with `Qs` the symmetric square root of `Q` and `M` the bounded-real LMI
//! of the canonical realisation.

use crate::cplxpair::pair_roots;
use crate::error::{DsmError, Result};
use crate::lmi::{add_lee_constraint, companion, output_row};
use crate::poly::{poly_real, roots};
use crate::quadrature::QuadOptions;
use crate::tf::Tf;
use crate::weighting::{Normalize, Weighting, mult_weightings, q0_weighting, weighting_sqrt};
use math_audio_sdp::{Affine, Problem, SdpOptions, Solution};
use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Options shared by the weighted FIR and hybrid designs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightingOptions {
    /// Clamp negative eigenvalues of `Q` to zero
    pub fix_pos: bool,
    /// Scaling of `q0` before the SDP
    pub normalize: Normalize,
    /// Quadrature used to compute `q0`
    pub quad: QuadOptions,
    /// SDP backend options
    pub sdp: SdpOptions,
}

impl Default for WeightingOptions {
    fn default() -> Self {
        Self {
            fix_pos: true,
            normalize: Normalize::Auto,
            quad: QuadOptions::default(),
            sdp: SdpOptions::default(),
        }
    }
}

pub(crate) fn check_h_inf(h_inf: f64) -> Result<()> {
    if h_inf > 1.0 {
        Ok(())
    } else {
        Err(DsmError::invalid(format!(
            "h_inf must be greater than 1, got {h_inf}"
        )))
    }
}

/// Map a non-optimal solver status to [`DsmError::Infeasible`].
pub(crate) fn require_optimal(sol: Solution) -> Result<Solution> {
    if sol.is_optimal() {
        Ok(sol)
    } else {
        Err(DsmError::Infeasible {
            status: sol.status.to_string(),
        })
    }
}

/// Zeros of the FIR numerator `[1, br...]`, conjugate-paired when possible.
pub(crate) fn fir_zeros(br: &[f64]) -> Vec<Complex64> {
    let mut b = Vec::with_capacity(br.len() + 1);
    b.push(1.0);
    b.extend_from_slice(br);
    pair_roots(&roots(&b))
}

fn ntf_from_digested(
    qs: &DMatrix<f64>,
    ar: &[f64],
    h_inf: f64,
    opts: &SdpOptions,
) -> Result<Vec<f64>> {
    let order = ar.len();
    let mut p = Problem::new();
    let br = p.vector("br", order);
    let t = p.scalar("t");

    let mut b = Vec::with_capacity(order + 1);
    b.push(Affine::constant(1.0));
    b.extend(br.entries());
    let qsb = (0..=order)
        .map(|i| {
            let row: Vec<f64> = (0..=order).map(|j| qs[(i, j)]).collect();
            Affine::dot(&row, &b)
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    p.add_soc(&qsb, t.expr())?;

    if h_inf.is_finite() {
        let (a, bm) = companion(ar);
        let c = output_row(&br, ar);
        add_lee_constraint(&mut p, &a, &bm, &c, h_inf)?;
    }
    p.minimize(t.expr())?;

    let sol = require_optimal(p.solve(opts)?)?;
    log::debug!(
        "weighted design solved in {} iterations, weighted gain {:e}",
        sol.iterations,
        sol.objective.powi(2)
    );
    Ok(sol.vector(&br).to_vec())
}

fn digest(q0: &[f64], opts: &WeightingOptions) -> Result<DMatrix<f64>> {
    let q0 = opts.normalize.apply(q0)?;
    weighting_sqrt(&q0, opts.fix_pos)
}

/// FIR NTF minimising `bᵀ toeplitz(q0) b` with `||NTF||∞ <= h_inf`.
///
/// The order is `q0.len() - 1`. An infinite `h_inf` drops the
/// bounded-real constraint.
pub fn ntf_fir_from_q0(q0: &[f64], h_inf: f64, opts: &WeightingOptions) -> Result<Tf> {
    check_h_inf(h_inf)?;
    if q0.len() < 2 {
        return Err(DsmError::invalid("q0 must describe an order of at least 1"));
    }
    let order = q0.len() - 1;
    let qs = digest(q0, opts)?;
    let br = ntf_from_digested(&qs, &vec![0.0; order], h_inf, &opts.sdp)?;
    Ok(Tf::zpk(
        fir_zeros(&br),
        vec![Complex64::new(0.0, 0.0); order],
        1.0,
    ))
}

fn padded_poles(order: usize, poles: &[Complex64]) -> Result<Vec<Complex64>> {
    if poles.len() > order {
        return Err(DsmError::invalid(format!(
            "{} poles given for an NTF of order {order}",
            poles.len()
        )));
    }
    if let Some(p) = poles.iter().find(|p| !(p.norm() < 1.0)) {
        return Err(DsmError::invalid(format!(
            "pole {p} is not inside the unit circle"
        )));
    }
    let mut out = poles.to_vec();
    out.resize(order, Complex64::new(0.0, 0.0));
    Ok(out)
}

/// NTF with preassigned poles minimising the weighted noise power.
///
/// `q0` must already include the effect of the poles (see
/// [`ntf_hybrid_weighting`]); the free numerator is optimised as in
/// [`ntf_fir_from_q0`]. Fewer poles than the order are padded with poles
/// at the origin.
pub fn ntf_hybrid_from_q0(
    q0: &[f64],
    h_inf: f64,
    poles: &[Complex64],
    opts: &WeightingOptions,
) -> Result<Tf> {
    check_h_inf(h_inf)?;
    if q0.len() < 2 {
        return Err(DsmError::invalid("q0 must describe an order of at least 1"));
    }
    let order = q0.len() - 1;
    let poles = padded_poles(order, poles)?;
    let ar: Vec<f64> = poly_real(&poles)[1..].to_vec();
    let qs = digest(q0, opts)?;
    let br = ntf_from_digested(&qs, &ar, h_inf, &opts.sdp)?;
    Ok(Tf::zpk(fir_zeros(&br), poles, 1.0))
}

/// FIR NTF of the given order minimising the noise power weighted by `w`.
pub fn ntf_fir_weighting(
    order: usize,
    w: &Weighting,
    h_inf: f64,
    opts: &WeightingOptions,
) -> Result<Tf> {
    if order == 0 {
        return Err(DsmError::invalid("NTF order must be at least 1"));
    }
    check_h_inf(h_inf)?;
    if opts.sdp.show_progress {
        log::info!("computing weighting matrix for order {order}");
    }
    let q0 = q0_weighting(order, w, &opts.quad);
    ntf_fir_from_q0(&q0, h_inf, opts)
}

/// NTF with preassigned `poles` minimising the noise power weighted by `w`.
///
/// The numerator sees the weighting multiplied by `1 / |D(e^{j2πf})|²`,
/// `D` being the monic polynomial with the given poles.
pub fn ntf_hybrid_weighting(
    order: usize,
    w: &Weighting,
    poles: &[Complex64],
    h_inf: f64,
    opts: &WeightingOptions,
) -> Result<Tf> {
    if order == 0 {
        return Err(DsmError::invalid("NTF order must be at least 1"));
    }
    check_h_inf(h_inf)?;
    let padded = padded_poles(order, poles)?;
    let combined = mult_weightings(&[
        w.clone(),
        Weighting::filter(Tf::zpk(Vec::new(), padded.clone(), 1.0)),
    ]);
    if opts.sdp.show_progress {
        log::info!("computing hybrid weighting matrix for order {order}");
    }
    let q0 = q0_weighting(order, &combined, &opts.quad);
    ntf_hybrid_from_q0(&q0, h_inf, &padded, opts)
}
