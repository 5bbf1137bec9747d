//! Primal log-barrier interior-point backend.
//!
//! The problem is first reduced to `min cᵀy` subject to `F_k(y) ⪰ 0` (see
//! [`standard`]). A phase-I problem `min s` subject to `F_k(y) + sI ⪰ 0`
//! locates a strictly feasible starting point or certifies infeasibility.
//! Phase II then follows the central path of
//!
//! ```text
//! t cᵀy - Σ_k log det F_k(y) - log(R² - ‖y‖²)
//! ```
//!
//! with damped Newton steps, multiplying `t` by [`MU`] after each centering.
//! The ball of radius [`RADIUS`] keeps the iterates bounded. The objective is
//! reported unbounded (dual infeasible) only when, at the final weight, the
//! pull of the ball term is comparable to the objective gradient.
//!
//! Phase I first searches a small ball and widens it to [`RADIUS`] only when
//! no feasible point is found there.

mod newton;
pub(crate) mod standard;

use crate::error::Result;
use crate::options::SdpOptions;
use crate::problem::{Problem, Solution, Status};
use crate::traits::SdpSolver;
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use ndarray::Array1;
use newton::{Centering, CenteringOutcome};
use standard::{Block, Reduced, StandardForm};

/// Growth factor of the barrier weight between centerings.
const MU: f64 = 10.0;
/// Radius of the ball bounding the reduced variables.
const RADIUS: f64 = 1e4;
/// Ball radii tried by phase I before [`RADIUS`].
const PHASE1_RADII: [f64; 1] = [1e2];
/// Phase I stops as soon as the slack falls below this value.
const PHASE1_MARGIN: f64 = -1e-4;
/// Consecutive stalled centerings tolerated before giving up.
const MAX_STALLS: usize = 3;
/// An exhausted centering with a larger decrement `λ²` is resumed at the
/// same weight.
const RECENTER_DECREMENT: f64 = 0.5;
/// Ball pull, relative to `‖c‖`, above which the minimiser is held by the
/// ball alone.
const UNBOUNDED_PULL: f64 = 0.5;

/// In-process log-barrier SDP solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBarrier;

impl SdpSolver for LogBarrier {
    fn name(&self) -> &'static str {
        "log-barrier"
    }

    fn solve(&self, problem: &Problem, options: &SdpOptions) -> Result<Solution> {
        let sf = match standard::reduce(problem) {
            Reduced::Feasible(sf) => sf,
            Reduced::Inconsistent { residual } => {
                log::debug!("equality constraints are inconsistent (residual {residual:.3e})");
                return Ok(finish(problem, &empty_reduction(problem), Status::PrimalInfeasible, 0));
            }
        };

        let y0 = match phase_one(&sf, options)? {
            PhaseOne::Feasible(y) => y,
            PhaseOne::Infeasible => {
                let y = DVector::zeros(sf.n);
                return Ok(finish(problem, &(sf, y), Status::PrimalInfeasible, 0));
            }
            PhaseOne::Undecided(y) => {
                return Ok(finish(problem, &(sf, y), Status::Unknown, options.max_iterations));
            }
        };

        let (status, y, iterations) = phase_two(&sf, y0, options)?;
        Ok(finish(problem, &(sf, y), status, iterations))
    }
}

pub(crate) fn empty_reduction(problem: &Problem) -> (StandardForm, DVector<f64>) {
    let n = problem.num_scalars();
    let sf = StandardForm {
        n,
        blocks: Vec::new(),
        c: DVector::zeros(n),
        c0: 0.0,
        reduction: standard::Reduction {
            x0: vec![0.0; n],
            z: (0..n).map(|j| vec![(j, 1.0)]).collect(),
            reduced: n,
        },
    };
    (sf, DVector::zeros(n))
}

pub(crate) fn finish(
    problem: &Problem,
    state: &(StandardForm, DVector<f64>),
    status: Status,
    iterations: usize,
) -> Solution {
    let (sf, y) = state;
    let x = Array1::from(sf.reduction.expand(y));
    let objective = problem.objective().terms().iter().fold(
        problem.objective().constant_term(),
        |acc, &(i, c)| acc + c * x[i],
    );
    Solution {
        status,
        x,
        objective,
        iterations,
    }
}

pub(crate) fn min_eigenvalue(m: &DMatrix<f64>) -> f64 {
    SymmetricEigen::new(m.clone())
        .eigenvalues
        .iter()
        .fold(f64::INFINITY, |a, &b| a.min(b))
}

enum PhaseOne {
    Feasible(DVector<f64>),
    Infeasible,
    Undecided(DVector<f64>),
}

fn needs_recentering(outcome: CenteringOutcome) -> bool {
    matches!(outcome, CenteringOutcome::Exhausted { decrement } if decrement > RECENTER_DECREMENT)
}

/// Find `y` with every `F_k(y) ≻ 0`, widening the search ball on failure.
fn phase_one(sf: &StandardForm, options: &SdpOptions) -> Result<PhaseOne> {
    let origin = DVector::zeros(sf.n);
    let worst = sf
        .blocks
        .iter()
        .map(|b| min_eigenvalue(&b.value(&origin)))
        .fold(f64::INFINITY, f64::min);
    if worst > 0.0 {
        return Ok(PhaseOne::Feasible(origin));
    }

    for radius in PHASE1_RADII.into_iter().filter(|&r| r > 2.0 * (1.0 - worst)) {
        match phase_one_within(sf, worst, radius, options)? {
            PhaseOne::Feasible(y) => return Ok(PhaseOne::Feasible(y)),
            _ => log::debug!("no feasible point within radius {radius:.0e}"),
        }
    }
    phase_one_within(sf, worst, RADIUS, options)
}

/// Phase I restricted to a ball of at least the given radius, widened to
/// contain the starting slack.
fn phase_one_within(
    sf: &StandardForm,
    worst: f64,
    radius: f64,
    options: &SdpOptions,
) -> Result<PhaseOne> {
    // Augment with the slack s (index n): F_k(y) + s I ⪰ 0 and s + 1 ≥ 0.
    let s_index = sf.n;
    let mut blocks: Vec<Block> = sf
        .blocks
        .iter()
        .map(|b| {
            let mut b = b.clone();
            b.terms.push((s_index, (0..b.dim).map(|i| (i, i, 1.0)).collect()));
            b
        })
        .collect();
    blocks.push(Block {
        dim: 1,
        constant: DMatrix::from_element(1, 1, 1.0),
        terms: vec![(s_index, vec![(0, 0, 1.0)])],
    });
    let mut c = DVector::zeros(sf.n + 1);
    c[s_index] = 1.0;
    let aux = StandardForm {
        n: sf.n + 1,
        blocks,
        c,
        c0: 0.0,
        reduction: sf.reduction.clone(),
    };

    let mut y = DVector::zeros(sf.n + 1);
    y[s_index] = 1.0 - worst;
    let radius = radius.max(2.0 * y[s_index]);
    let nu = aux.degree() + 1.0;
    let center = Centering::new(&aux, radius);
    let mut t = 1.0;
    let mut stalls = 0;

    for iter in 1..=options.max_iterations {
        let outcome = center.run(&mut y, t, |y| y[s_index] < PHASE1_MARGIN)?;
        let s = y[s_index];
        let gap = nu / t;
        if options.show_progress {
            log::info!("phase I iteration {iter}: slack = {s:.6e}, gap = {gap:.3e}");
        }
        if s < 0.0 && (matches!(outcome, CenteringOutcome::Stopped) || s < PHASE1_MARGIN) {
            return Ok(PhaseOne::Feasible(y.rows(0, sf.n).into_owned()));
        }
        if needs_recentering(outcome) {
            continue;
        }
        if s - gap > 0.0 {
            log::debug!("phase I lower bound {:.3e} is positive", s - gap);
            return Ok(PhaseOne::Infeasible);
        }
        if gap < options.feastol {
            if s < 0.0 {
                return Ok(PhaseOne::Feasible(y.rows(0, sf.n).into_owned()));
            }
            log::debug!("phase I converged with slack {s:.3e}");
            return Ok(PhaseOne::Infeasible);
        }
        stalls = match outcome {
            CenteringOutcome::Stalled => stalls + 1,
            _ => 0,
        };
        if stalls >= MAX_STALLS {
            break;
        }
        t *= MU;
    }
    log::warn!("phase I did not decide feasibility within radius {radius:.0e}");
    Ok(PhaseOne::Undecided(y.rows(0, sf.n).into_owned()))
}

/// Follow the central path from a strictly feasible point.
fn phase_two(
    sf: &StandardForm,
    mut y: DVector<f64>,
    options: &SdpOptions,
) -> Result<(Status, DVector<f64>, usize)> {
    let nu = sf.degree() + 1.0;
    let radius = RADIUS.max(2.0 * y.norm());
    let center = Centering::new(sf, radius);
    let c_norm = sf.c.norm();
    let mut t = 1.0;
    let mut stalls = 0;
    let mut newton_steps = 0;

    for iter in 1..=options.max_iterations {
        let outcome = center.run(&mut y, t, |_| false)?;
        newton_steps += match outcome {
            CenteringOutcome::Converged(steps) => steps,
            CenteringOutcome::Exhausted { .. } => newton::MAX_NEWTON,
            _ => 0,
        };
        let objective = sf.objective(&y);
        let gap = nu / t;
        let target = options.abstol.max(options.reltol * objective.abs());
        if options.show_progress {
            log::info!(
                "barrier iteration {iter}: objective = {objective:.8e}, gap = {gap:.3e}, newton steps = {newton_steps}"
            );
        }

        if needs_recentering(outcome) {
            continue;
        }
        if gap <= target {
            let norm2 = y.norm_squared();
            let pull = 2.0 * norm2.sqrt() / (t * (radius * radius - norm2));
            if c_norm > 0.0 && pull > UNBOUNDED_PULL * c_norm {
                log::debug!("minimiser held by the ball (pull {pull:.3e}, |c| {c_norm:.3e})");
                return Ok((Status::DualInfeasible, y, iter));
            }
            return Ok((Status::Optimal, y, iter));
        }

        stalls = match outcome {
            CenteringOutcome::Stalled => stalls + 1,
            _ => 0,
        };
        if stalls >= MAX_STALLS {
            log::warn!("barrier stalled at gap {gap:.3e} (target {target:.3e})");
            return Ok((Status::Unknown, y, iter));
        }
        t *= MU;
    }
    log::warn!(
        "barrier reached the iteration limit ({})",
        options.max_iterations
    );
    Ok((Status::Unknown, y, options.max_iterations))
}

#[cfg(test)]
mod tests {
    use crate::expr::{Affine, AffineMatrix};
    use crate::options::SdpOptions;
    use crate::problem::{Problem, Status};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_linear_program() {
        // min x + y  s.t.  x >= 1, y >= 2, x + y <= 10
        let mut p = Problem::new();
        let x = p.scalar("x");
        let y = p.scalar("y");
        p.add_le(Affine::constant(1.0), x.expr()).unwrap();
        p.add_le(Affine::constant(2.0), y.expr()).unwrap();
        p.add_le(x.expr() + y.expr(), Affine::constant(10.0))
            .unwrap();
        p.minimize(x.expr() + y.expr()).unwrap();
        let sol = p.solve(&SdpOptions::default()).unwrap();
        assert_eq!(sol.status, Status::Optimal);
        assert_abs_diff_eq!(sol.objective, 3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(sol.scalar(&x), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_max_eigenvalue_minimisation() {
        // min t  s.t.  t I - A ⪰ 0  =>  t = λmax(A)
        let a = array![[2.0, 1.0], [1.0, 2.0]];
        let mut p = Problem::new();
        let t = p.scalar("t");
        let ti = AffineMatrix::from_fn(2, 2, |i, j| {
            if i == j { t.expr() } else { Affine::default() }
        });
        p.add_psd(&ti.add_constant(&(-&a)).unwrap()).unwrap();
        p.minimize(t.expr()).unwrap();
        let sol = p.solve(&SdpOptions::default()).unwrap();
        assert!(sol.is_optimal());
        assert_abs_diff_eq!(sol.scalar(&t), 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_second_order_cone_with_equality() {
        // min t  s.t. ||(x, y)|| <= t, x + y = 2  =>  t = sqrt(2)
        let mut p = Problem::new();
        let v = p.vector("v", 2);
        let t = p.scalar("t");
        p.add_soc(&v.entries(), t.expr()).unwrap();
        p.add_eq(v.entry(0) + v.entry(1), Affine::constant(2.0))
            .unwrap();
        p.minimize(t.expr()).unwrap();
        let sol = p.solve(&SdpOptions::default()).unwrap();
        assert!(sol.is_optimal());
        assert_abs_diff_eq!(sol.scalar(&t), 2.0_f64.sqrt(), epsilon = 1e-5);
        let xv = sol.vector(&v);
        assert_abs_diff_eq!(xv[0], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(xv[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_psd_matrix_completion() {
        // X ⪰ 0 with X00 = X11 = 1: minimising X01 gives -1.
        let mut p = Problem::new();
        let x = p.psd("X", 2);
        p.add_eq(x.at(0, 0), Affine::constant(1.0)).unwrap();
        p.add_eq(x.at(1, 1), Affine::constant(1.0)).unwrap();
        p.minimize(x.at(0, 1)).unwrap();
        let sol = p.solve(&SdpOptions::default()).unwrap();
        assert!(sol.is_optimal());
        let xv = sol.matrix(&x);
        assert_abs_diff_eq!(xv[[0, 1]], -1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(xv[[1, 0]], -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_infeasible_lmi() {
        // x >= 1 and x <= 0
        let mut p = Problem::new();
        let x = p.scalar("x");
        p.add_le(Affine::constant(1.0), x.expr()).unwrap();
        p.add_le(x.expr(), Affine::constant(0.0)).unwrap();
        p.minimize(x.expr()).unwrap();
        let sol = p.solve(&SdpOptions::default()).unwrap();
        assert_eq!(sol.status, Status::PrimalInfeasible);
    }

    #[test]
    fn test_inconsistent_equalities_are_infeasible() {
        let mut p = Problem::new();
        let x = p.vector("x", 2);
        p.add_eq(x.entry(0) + x.entry(1), Affine::constant(1.0))
            .unwrap();
        p.add_eq(x.entry(0) + x.entry(1), Affine::constant(2.0))
            .unwrap();
        p.minimize(x.entry(0)).unwrap();
        let sol = p.solve(&SdpOptions::default()).unwrap();
        assert_eq!(sol.status, Status::PrimalInfeasible);
    }

    #[test]
    fn test_feasible_set_far_from_origin() {
        // min x  s.t.  x >= 5000: phase I has to widen its search ball.
        let mut p = Problem::new();
        let x = p.scalar("x");
        p.add_le(Affine::constant(5000.0), x.expr()).unwrap();
        p.minimize(x.expr()).unwrap();
        let sol = p.solve(&SdpOptions::default()).unwrap();
        assert_eq!(sol.status, Status::Optimal);
        assert_abs_diff_eq!(sol.scalar(&x), 5000.0, epsilon = 1e-2);
    }

    #[test]
    fn test_iteration_limit_is_not_optimal() {
        let mut p = Problem::new();
        let x = p.scalar("x");
        p.add_le(Affine::constant(1.0), x.expr()).unwrap();
        p.add_le(x.expr(), Affine::constant(10.0)).unwrap();
        p.minimize(x.expr()).unwrap();
        let opts = SdpOptions {
            max_iterations: 2,
            ..Default::default()
        };
        let sol = p.solve(&opts).unwrap();
        assert_eq!(sol.status, Status::Unknown);
        assert!(!sol.is_optimal());
    }

    #[test]
    fn test_unbounded_objective() {
        let mut p = Problem::new();
        let x = p.scalar("x");
        p.add_le(x.expr(), Affine::constant(0.0)).unwrap();
        p.minimize(x.expr()).unwrap();
        let sol = p.solve(&SdpOptions::default()).unwrap();
        assert_eq!(sol.status, Status::DualInfeasible);
    }
}
