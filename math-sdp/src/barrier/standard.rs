//! Reduction of a [`Problem`] to the inequality-only form used by the barrier.
//!
//! Equalities are removed by Gauss-Jordan elimination with row-wise complete
//! pivoting, which parameterises the affine solution set as `x = x0 + Z y`.
//! Every matrix inequality is then rewritten as `F(y) = F0 + Σ y_j F_j ⪰ 0`
//! with the `F_j` stored as sparse triplet lists.

use crate::problem::Problem;
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeMap;

/// Nonzero entries `(row, col, value)` of a symmetric matrix, both triangles.
pub(crate) type Triplets = Vec<(usize, usize, f64)>;

/// One matrix inequality `F0 + Σ y_j F_j ⪰ 0`.
#[derive(Debug, Clone)]
pub(crate) struct Block {
    pub dim: usize,
    pub constant: DMatrix<f64>,
    pub terms: Vec<(usize, Triplets)>,
}

impl Block {
    /// `F(y)`.
    pub fn value(&self, y: &DVector<f64>) -> DMatrix<f64> {
        let mut m = self.constant.clone();
        for (j, triplets) in &self.terms {
            let yj = y[*j];
            if yj != 0.0 {
                for &(r, c, v) in triplets {
                    m[(r, c)] += yj * v;
                }
            }
        }
        m
    }
}

/// Affine parameterisation `x = x0 + Z y` of the equality-feasible set.
#[derive(Debug, Clone)]
pub(crate) struct Reduction {
    pub x0: Vec<f64>,
    /// Sparse rows of `Z`, one per original unknown.
    pub z: Vec<Vec<(usize, f64)>>,
    pub reduced: usize,
}

impl Reduction {
    /// Recover the original unknowns from reduced coordinates.
    pub fn expand(&self, y: &DVector<f64>) -> Vec<f64> {
        self.x0
            .iter()
            .zip(&self.z)
            .map(|(&x0, row)| row.iter().fold(x0, |acc, &(j, zij)| acc + zij * y[j]))
            .collect()
    }
}

/// Inequality-only problem `min cᵀy + c0` subject to every block being PSD.
#[derive(Debug, Clone)]
pub(crate) struct StandardForm {
    pub n: usize,
    pub blocks: Vec<Block>,
    pub c: DVector<f64>,
    pub c0: f64,
    pub reduction: Reduction,
}

impl StandardForm {
    /// Barrier parameter `Σ dim` of the matrix inequalities.
    pub fn degree(&self) -> f64 {
        self.blocks.iter().map(|b| b.dim as f64).sum()
    }

    /// Objective value at `y`.
    pub fn objective(&self, y: &DVector<f64>) -> f64 {
        self.c.dot(y) + self.c0
    }
}

/// Outcome of the equality elimination.
pub(crate) enum Reduced {
    Feasible(StandardForm),
    /// The equalities contradict each other.
    Inconsistent { residual: f64 },
}

/// Parameterise the solutions of the problem's equalities.
fn eliminate(problem: &Problem) -> Result<Reduction, f64> {
    let n = problem.num_scalars();
    let eqs = problem.equalities();
    let p = eqs.len();

    // E x = rhs
    let mut e = DMatrix::<f64>::zeros(p, n);
    let mut rhs = DVector::<f64>::zeros(p);
    for (r, eq) in eqs.iter().enumerate() {
        for &(i, c) in eq.terms() {
            e[(r, i)] += c;
        }
        rhs[r] = -eq.constant_term();
    }

    let scale = e.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1.0);
    let pivot_tol = 1e-12 * scale;
    let rhs_tol = 1e-9 * (1.0 + rhs.iter().fold(0.0_f64, |m, v| m.max(v.abs())));

    let mut is_pivot = vec![false; n];
    let mut pivots: Vec<(usize, usize)> = Vec::new();
    for r in 0..p {
        let mut best: Option<(usize, f64)> = None;
        for j in 0..n {
            let v = e[(r, j)].abs();
            if !is_pivot[j] && best.is_none_or(|(_, b)| v > b) {
                best = Some((j, v));
            }
        }
        match best {
            Some((j, v)) if v > pivot_tol => {
                let piv = e[(r, j)];
                for k in 0..n {
                    e[(r, k)] /= piv;
                }
                rhs[r] /= piv;
                for other in 0..p {
                    if other == r {
                        continue;
                    }
                    let f = e[(other, j)];
                    if f != 0.0 {
                        for k in 0..n {
                            let v = e[(r, k)];
                            e[(other, k)] -= f * v;
                        }
                        let v = rhs[r];
                        rhs[other] -= f * v;
                    }
                }
                is_pivot[j] = true;
                pivots.push((r, j));
            }
            _ => {
                if rhs[r].abs() > rhs_tol {
                    return Err(rhs[r].abs());
                }
            }
        }
    }

    let mut reduced_index = vec![usize::MAX; n];
    let mut reduced = 0;
    for j in 0..n {
        if !is_pivot[j] {
            reduced_index[j] = reduced;
            reduced += 1;
        }
    }

    let mut x0 = vec![0.0; n];
    let mut z: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for j in 0..n {
        if !is_pivot[j] {
            z[j].push((reduced_index[j], 1.0));
        }
    }
    for &(r, j) in &pivots {
        x0[j] = rhs[r];
        for k in 0..n {
            let v = e[(r, k)];
            if !is_pivot[k] && v != 0.0 {
                z[j].push((reduced_index[k], -v));
            }
        }
    }

    Ok(Reduction { x0, z, reduced })
}

/// Build the standard form of `problem`.
pub(crate) fn reduce(problem: &Problem) -> Reduced {
    let reduction = match eliminate(problem) {
        Ok(r) => r,
        Err(residual) => return Reduced::Inconsistent { residual },
    };

    let mut blocks = Vec::with_capacity(problem.lmis().len());
    for lmi in problem.lmis() {
        let dim = lmi.nrows();
        let mut constant = DMatrix::<f64>::zeros(dim, dim);
        let mut acc: BTreeMap<usize, BTreeMap<(usize, usize), f64>> = BTreeMap::new();
        for r in 0..dim {
            for c in 0..dim {
                let a = lmi.get(r, c);
                constant[(r, c)] += a.constant_term();
                for &(i, coef) in a.terms() {
                    constant[(r, c)] += coef * reduction.x0[i];
                    for &(j, zij) in &reduction.z[i] {
                        *acc.entry(j).or_default().entry((r, c)).or_insert(0.0) += coef * zij;
                    }
                }
            }
        }
        let terms = acc
            .into_iter()
            .map(|(j, entries)| {
                let triplets: Triplets = entries
                    .into_iter()
                    .filter(|&(_, v)| v != 0.0)
                    .map(|((r, c), v)| (r, c, v))
                    .collect();
                (j, triplets)
            })
            .filter(|(_, t)| !t.is_empty())
            .collect();
        blocks.push(Block {
            dim,
            constant,
            terms,
        });
    }

    let objective = problem.objective();
    let mut c = DVector::<f64>::zeros(reduction.reduced);
    let mut c0 = objective.constant_term();
    for &(i, coef) in objective.terms() {
        c0 += coef * reduction.x0[i];
        for &(j, zij) in &reduction.z[i] {
            c[j] += coef * zij;
        }
    }

    Reduced::Feasible(StandardForm {
        n: reduction.reduced,
        blocks,
        c,
        c0,
        reduction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Affine;
    use approx::assert_relative_eq;

    #[test]
    fn test_elimination_parameterises_solutions() {
        // x0 + x1 + x2 = 1, x0 - x2 = 0.5
        let mut p = Problem::new();
        let x = p.vector("x", 3);
        p.add_eq(Affine::sum(x.entries()), Affine::constant(1.0))
            .unwrap();
        p.add_eq(x.entry(0) - x.entry(2), Affine::constant(0.5))
            .unwrap();
        let Reduced::Feasible(sf) = reduce(&p) else {
            panic!("system is consistent");
        };
        assert_eq!(sf.n, 1);
        for t in [-2.0, 0.0, 3.5] {
            let xs = sf.reduction.expand(&DVector::from_vec(vec![t]));
            assert_relative_eq!(xs[0] + xs[1] + xs[2], 1.0, epsilon = 1e-12);
            assert_relative_eq!(xs[0] - xs[2], 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_inconsistent_equalities() {
        let mut p = Problem::new();
        let x = p.vector("x", 2);
        p.add_eq(x.entry(0) + x.entry(1), Affine::constant(1.0))
            .unwrap();
        p.add_eq(x.entry(0) * 2.0 + x.entry(1) * 2.0, Affine::constant(3.0))
            .unwrap();
        assert!(matches!(reduce(&p), Reduced::Inconsistent { .. }));
    }

    #[test]
    fn test_block_value_matches_expression() {
        let mut p = Problem::new();
        let x = p.symmetric("X", 2);
        p.add_psd(&x.matrix()).unwrap();
        let Reduced::Feasible(sf) = reduce(&p) else {
            panic!("no equalities");
        };
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let m = sf.blocks[0].value(&y);
        assert_relative_eq!(m[(0, 0)], 1.0);
        assert_relative_eq!(m[(0, 1)], 2.0);
        assert_relative_eq!(m[(1, 0)], 2.0);
        assert_relative_eq!(m[(1, 1)], 3.0);
    }
}
