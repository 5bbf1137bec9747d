//! Clarabel interior-point conic backend.
//!
//! Equalities are eliminated with the same reduction as the barrier backend,
//! so Clarabel only sees the free coordinates `y` and the cone constraints
//! `s = F0 + Σ y_j F_j ∈ K`. Scalar inequalities go to the nonnegative
//! orthant, the other blocks to the PSD triangle cone, which stores the upper
//! triangle column by column with off-diagonal entries scaled by √2.

use crate::barrier::standard::{self, Block, Reduced, StandardForm};
use crate::barrier::{empty_reduction, finish, min_eigenvalue};
use crate::error::{Result, SdpError};
use crate::options::SdpOptions;
use crate::problem::{Problem, Solution, Status};
use crate::traits::SdpSolver;
use clarabel::algebra::CscMatrix;
use clarabel::solver::{DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};
use nalgebra::DVector;
use std::f64::consts::SQRT_2;

/// SDP solver backed by the Clarabel conic solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clarabel;

/// `Ax + s = b` data in Clarabel's layout.
struct ConicData {
    a_rows: Vec<usize>,
    a_cols: Vec<usize>,
    a_vals: Vec<f64>,
    b: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
}

impl ConicData {
    fn new() -> Self {
        Self {
            a_rows: Vec::new(),
            a_cols: Vec::new(),
            a_vals: Vec::new(),
            b: Vec::new(),
            cones: Vec::new(),
        }
    }

    fn push_scalars(&mut self, blocks: &[&Block]) {
        if blocks.is_empty() {
            return;
        }
        for block in blocks {
            let row = self.b.len();
            self.b.push(block.constant[(0, 0)]);
            for (j, triplets) in &block.terms {
                for &(_, _, v) in triplets {
                    self.push_entry(row, *j, -v);
                }
            }
        }
        self.cones.push(SupportedConeT::NonnegativeConeT(blocks.len()));
    }

    fn push_matrix(&mut self, block: &Block) {
        let base = self.b.len();
        let d = block.dim;
        for c in 0..d {
            for r in 0..=c {
                self.b.push(svec_scale(r, c) * block.constant[(r, c)]);
            }
        }
        for (j, triplets) in &block.terms {
            for &(r, c, v) in triplets.iter().filter(|&&(r, c, _)| r <= c) {
                self.push_entry(base + svec_index(r, c), *j, -svec_scale(r, c) * v);
            }
        }
        self.cones.push(SupportedConeT::PSDTriangleConeT(d));
    }

    fn push_entry(&mut self, row: usize, col: usize, v: f64) {
        if v != 0.0 {
            self.a_rows.push(row);
            self.a_cols.push(col);
            self.a_vals.push(v);
        }
    }
}

fn svec_index(r: usize, c: usize) -> usize {
    c * (c + 1) / 2 + r
}

fn svec_scale(r: usize, c: usize) -> f64 {
    if r == c { 1.0 } else { SQRT_2 }
}

fn conic_data(sf: &StandardForm) -> ConicData {
    let mut data = ConicData::new();
    let scalars: Vec<&Block> = sf.blocks.iter().filter(|b| b.dim == 1).collect();
    data.push_scalars(&scalars);
    for block in sf.blocks.iter().filter(|b| b.dim > 1) {
        data.push_matrix(block);
    }
    data
}

fn map_status(status: SolverStatus) -> Status {
    match status {
        SolverStatus::Solved => Status::Optimal,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            Status::PrimalInfeasible
        }
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
            Status::DualInfeasible
        }
        other => {
            log::warn!("clarabel stopped with status {other:?}");
            Status::Unknown
        }
    }
}

/// Status of a problem whose equalities fix every unknown.
fn fixed_point_status(sf: &StandardForm, options: &SdpOptions) -> Status {
    let y = DVector::zeros(0);
    let feasible = sf
        .blocks
        .iter()
        .all(|b| min_eigenvalue(&b.value(&y)) >= -options.feastol);
    if feasible {
        Status::Optimal
    } else {
        Status::PrimalInfeasible
    }
}

impl SdpSolver for Clarabel {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn solve(&self, problem: &Problem, options: &SdpOptions) -> Result<Solution> {
        let sf = match standard::reduce(problem) {
            Reduced::Feasible(sf) => sf,
            Reduced::Inconsistent { residual } => {
                log::debug!("equality constraints are inconsistent (residual {residual:.3e})");
                return Ok(finish(problem, &empty_reduction(problem), Status::PrimalInfeasible, 0));
            }
        };
        if sf.n == 0 {
            let status = fixed_point_status(&sf, options);
            return Ok(finish(problem, &(sf, DVector::zeros(0)), status, 0));
        }

        let data = conic_data(&sf);
        let m = data.b.len();
        let a = CscMatrix::new_from_triplets(m, sf.n, data.a_rows, data.a_cols, data.a_vals);
        let p = CscMatrix::zeros((sf.n, sf.n));
        let q: Vec<f64> = sf.c.iter().copied().collect();

        let settings = DefaultSettings::<f64> {
            verbose: options.show_progress,
            max_iter: u32::try_from(options.max_iterations).unwrap_or(u32::MAX),
            tol_gap_abs: options.abstol,
            tol_gap_rel: options.reltol,
            tol_feas: options.feastol,
            ..DefaultSettings::default()
        };
        let mut solver = DefaultSolver::new(&p, &q, &a, &data.b, &data.cones, settings)
            .map_err(|e| SdpError::NumericalFailure {
                reason: format!("clarabel setup failed: {e}"),
            })?;
        solver.solve();

        let solution = &solver.solution;
        let status = map_status(solution.status);
        let y = DVector::from_vec(solution.x.clone());
        if status == Status::Optimal && y.iter().any(|v| !v.is_finite()) {
            return Err(SdpError::NumericalFailure {
                reason: "clarabel returned non-finite values".to_string(),
            });
        }
        log::debug!(
            "clarabel finished with {:?} after {} iterations",
            solution.status,
            solution.iterations
        );
        Ok(finish(problem, &(sf, y), status, solution.iterations as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Affine, AffineMatrix};
    use crate::options::Backend;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn clarabel_options() -> SdpOptions {
        SdpOptions {
            backend: Backend::Clarabel,
            ..Default::default()
        }
    }

    #[test]
    fn test_svec_layout() {
        assert_eq!(svec_index(0, 0), 0);
        assert_eq!(svec_index(0, 1), 1);
        assert_eq!(svec_index(1, 1), 2);
        assert_eq!(svec_index(2, 2), 5);
        assert_eq!(svec_scale(0, 2), SQRT_2);
    }

    #[test]
    fn test_max_eigenvalue_minimisation() {
        let a = array![[2.0, 1.0], [1.0, 2.0]];
        let mut p = Problem::new();
        let t = p.scalar("t");
        let ti = AffineMatrix::from_fn(2, 2, |i, j| {
            if i == j { t.expr() } else { Affine::default() }
        });
        p.add_psd(&ti.add_constant(&(-&a)).unwrap()).unwrap();
        p.minimize(t.expr()).unwrap();
        let sol = p.solve(&clarabel_options()).unwrap();
        assert!(sol.is_optimal());
        assert_abs_diff_eq!(sol.scalar(&t), 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_psd_matrix_completion() {
        let mut p = Problem::new();
        let x = p.psd("X", 2);
        p.add_eq(x.at(0, 0), Affine::constant(1.0)).unwrap();
        p.add_eq(x.at(1, 1), Affine::constant(1.0)).unwrap();
        p.minimize(x.at(0, 1)).unwrap();
        let sol = p.solve(&clarabel_options()).unwrap();
        assert!(sol.is_optimal());
        assert_abs_diff_eq!(sol.matrix(&x)[[0, 1]], -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_infeasible_and_unbounded() {
        let mut p = Problem::new();
        let x = p.scalar("x");
        p.add_le(Affine::constant(1.0), x.expr()).unwrap();
        p.add_le(x.expr(), Affine::constant(0.0)).unwrap();
        p.minimize(x.expr()).unwrap();
        let sol = p.solve(&clarabel_options()).unwrap();
        assert_eq!(sol.status, Status::PrimalInfeasible);

        let mut p = Problem::new();
        let x = p.scalar("x");
        p.add_le(x.expr(), Affine::constant(0.0)).unwrap();
        p.minimize(x.expr()).unwrap();
        let sol = p.solve(&clarabel_options()).unwrap();
        assert_eq!(sol.status, Status::DualInfeasible);
    }

    #[test]
    fn test_agrees_with_log_barrier() {
        // min t  s.t. ||(x, y)|| <= t, x + y = 2
        let mut p = Problem::new();
        let v = p.vector("v", 2);
        let t = p.scalar("t");
        p.add_soc(&v.entries(), t.expr()).unwrap();
        p.add_eq(v.entry(0) + v.entry(1), Affine::constant(2.0))
            .unwrap();
        p.minimize(t.expr()).unwrap();
        let conic = p.solve(&clarabel_options()).unwrap();
        let barrier = p.solve(&SdpOptions::default()).unwrap();
        assert!(conic.is_optimal() && barrier.is_optimal());
        assert_abs_diff_eq!(conic.objective, barrier.objective, epsilon = 1e-5);
    }
}
