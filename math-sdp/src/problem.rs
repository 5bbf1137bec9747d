//! Problem builder: variable declaration, constraints, objective and results.

use crate::error::{Result, SdpError};
use crate::expr::{Affine, AffineMatrix};
use crate::options::SdpOptions;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape and structure of a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    /// A single real unknown.
    Scalar,
    /// A column vector of independent unknowns.
    Vector,
    /// A real symmetric matrix (one unknown per upper-triangular entry).
    Symmetric,
    /// A symmetric matrix constrained to be positive semidefinite.
    Psd,
}

/// Handle to a variable declared on a [`Problem`].
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    kind: VariableKind,
    rows: usize,
    cols: usize,
    /// Scalar unknown index of every entry, row-major.
    index: Vec<usize>,
}

impl Variable {
    /// The name given at declaration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variable structure.
    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of entries in a vector variable.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// `true` for an empty (zero-length) variable.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry `(i, j)` as an affine expression.
    pub fn at(&self, i: usize, j: usize) -> Affine {
        Affine::variable(self.index[i * self.cols + j])
    }

    /// Entry `i` of a vector variable, or the value of a scalar for `i == 0`.
    pub fn entry(&self, i: usize) -> Affine {
        Affine::variable(self.index[i])
    }

    /// The whole variable as a scalar expression (scalars only).
    pub fn expr(&self) -> Affine {
        self.entry(0)
    }

    /// Entries of a vector variable as expressions.
    pub fn entries(&self) -> Vec<Affine> {
        self.index.iter().map(|&i| Affine::variable(i)).collect()
    }

    /// The variable as a matrix expression.
    pub fn matrix(&self) -> AffineMatrix {
        AffineMatrix::from_fn(self.rows, self.cols, |i, j| self.at(i, j))
    }
}

/// Termination status reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// An optimal point was found within tolerance.
    Optimal,
    /// The constraints admit no (strictly) feasible point.
    PrimalInfeasible,
    /// The objective is unbounded below on the feasible set.
    DualInfeasible,
    /// The backend stopped without a certificate (iteration limit, stalling).
    Unknown,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Optimal => "optimal",
            Status::PrimalInfeasible => "primal infeasible",
            Status::DualInfeasible => "dual infeasible",
            Status::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A semidefinite program under construction.
///
/// All constraints are kept in the form `M ⪰ 0` (for square affine matrices)
/// or `a = 0` (for scalar affine expressions). The objective is always
/// minimised.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    num_scalars: usize,
    variables: Vec<Variable>,
    lmis: Vec<AffineMatrix>,
    equalities: Vec<Affine>,
    objective: Affine,
}

impl Problem {
    /// An empty problem.
    pub fn new() -> Self {
        Self::default()
    }

    fn declare(&mut self, name: &str, kind: VariableKind, rows: usize, cols: usize) -> Variable {
        let mut index = vec![0; rows * cols];
        match kind {
            VariableKind::Symmetric | VariableKind::Psd => {
                for i in 0..rows {
                    for j in i..cols {
                        let id = self.num_scalars;
                        self.num_scalars += 1;
                        index[i * cols + j] = id;
                        index[j * cols + i] = id;
                    }
                }
            }
            VariableKind::Scalar | VariableKind::Vector => {
                for slot in index.iter_mut() {
                    *slot = self.num_scalars;
                    self.num_scalars += 1;
                }
            }
        }
        let var = Variable {
            name: name.to_string(),
            kind,
            rows,
            cols,
            index,
        };
        self.variables.push(var.clone());
        var
    }

    /// Declare a scalar unknown.
    pub fn scalar(&mut self, name: &str) -> Variable {
        self.declare(name, VariableKind::Scalar, 1, 1)
    }

    /// Declare a vector of `n` unknowns.
    pub fn vector(&mut self, name: &str, n: usize) -> Variable {
        self.declare(name, VariableKind::Vector, n, 1)
    }

    /// Declare an `n x n` symmetric matrix.
    pub fn symmetric(&mut self, name: &str, n: usize) -> Variable {
        self.declare(name, VariableKind::Symmetric, n, n)
    }

    /// Declare an `n x n` symmetric matrix together with the constraint `X ⪰ 0`.
    pub fn psd(&mut self, name: &str, n: usize) -> Variable {
        let var = self.declare(name, VariableKind::Psd, n, n);
        if n > 0 {
            self.lmis.push(var.matrix());
        }
        var
    }

    /// Number of scalar unknowns declared so far.
    pub fn num_scalars(&self) -> usize {
        self.num_scalars
    }

    /// Declared variables, in declaration order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    fn check_indices<'a, I: IntoIterator<Item = &'a Affine>>(&self, exprs: I) -> Result<()> {
        for e in exprs {
            if let Some(id) = e.max_index() {
                if id >= self.num_scalars {
                    return Err(SdpError::UnknownVariable { id });
                }
            }
        }
        Ok(())
    }

    /// Add the constraint `m ⪰ 0`. The matrix is symmetrised first.
    pub fn add_psd(&mut self, m: &AffineMatrix) -> Result<()> {
        if m.nrows() == 0 {
            return Err(SdpError::InvalidArgument {
                reason: "empty matrix inequality".to_string(),
            });
        }
        let m = m.symmetrized()?;
        self.check_indices(m.entries())?;
        self.lmis.push(m);
        Ok(())
    }

    /// Add the constraint `m ⪯ 0`.
    pub fn add_nsd(&mut self, m: &AffineMatrix) -> Result<()> {
        self.add_psd(&m.scale(-1.0))
    }

    /// Add the scalar constraint `lhs <= rhs`.
    pub fn add_le(&mut self, lhs: Affine, rhs: Affine) -> Result<()> {
        self.add_psd(&AffineMatrix::scalar((rhs - lhs).simplified()))
    }

    /// Add the scalar constraint `lhs == rhs`.
    pub fn add_eq(&mut self, lhs: Affine, rhs: Affine) -> Result<()> {
        let e = (lhs - rhs).simplified();
        self.check_indices(std::iter::once(&e))?;
        if e.is_constant() {
            if e.constant_term() != 0.0 {
                return Err(SdpError::InvalidArgument {
                    reason: format!(
                        "constant equality {} == 0 can never hold",
                        e.constant_term()
                    ),
                });
            }
            return Ok(());
        }
        self.equalities.push(e);
        Ok(())
    }

    /// Add the second-order cone constraint `||v||₂ <= t`.
    ///
    /// The cone is embedded as the arrow matrix `[[t I, v], [vᵀ, t]] ⪰ 0`.
    pub fn add_soc(&mut self, v: &[Affine], t: Affine) -> Result<()> {
        let n = v.len();
        let arrow = AffineMatrix::from_fn(n + 1, n + 1, |i, j| {
            if i == j {
                t.clone()
            } else if j == n {
                v[i].clone()
            } else if i == n {
                v[j].clone()
            } else {
                Affine::default()
            }
        });
        self.add_psd(&arrow)
    }

    /// Set the (linear) objective to minimise.
    pub fn minimize(&mut self, objective: Affine) -> Result<()> {
        let objective = objective.simplified();
        self.check_indices(std::iter::once(&objective))?;
        self.objective = objective;
        Ok(())
    }

    /// Matrix inequalities, each in the form `M ⪰ 0`.
    pub fn lmis(&self) -> &[AffineMatrix] {
        &self.lmis
    }

    /// Equality constraints, each in the form `a == 0`.
    pub fn equalities(&self) -> &[Affine] {
        &self.equalities
    }

    /// The objective to minimise.
    pub fn objective(&self) -> &Affine {
        &self.objective
    }

    /// Solve with the backend selected in `options`.
    pub fn solve(&self, options: &SdpOptions) -> Result<Solution> {
        options.validate()?;
        let solver = options.backend.solver()?;
        log::debug!(
            "solving SDP with {} unknowns, {} matrix inequalities, {} equalities ({})",
            self.num_scalars,
            self.lmis.len(),
            self.equalities.len(),
            solver.name()
        );
        solver.solve(self, options)
    }
}

/// Result of a solve.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Termination status
    pub status: Status,
    /// Value of every scalar unknown
    pub x: Array1<f64>,
    /// Objective value at `x`
    pub objective: f64,
    /// Number of barrier (outer) iterations performed
    pub iterations: usize,
}

impl Solution {
    /// `true` when the status is [`Status::Optimal`].
    pub fn is_optimal(&self) -> bool {
        self.status == Status::Optimal
    }

    /// Evaluate an expression at the solution.
    pub fn eval(&self, e: &Affine) -> f64 {
        e.terms()
            .iter()
            .fold(e.constant_term(), |acc, &(i, c)| acc + c * self.x[i])
    }

    /// Value of a scalar variable.
    pub fn scalar(&self, v: &Variable) -> f64 {
        self.x[v.index[0]]
    }

    /// Value of a vector variable.
    pub fn vector(&self, v: &Variable) -> Array1<f64> {
        v.index.iter().map(|&i| self.x[i]).collect()
    }

    /// Value of a matrix variable.
    pub fn matrix(&self, v: &Variable) -> Array2<f64> {
        Array2::from_shape_fn((v.rows, v.cols), |(i, j)| self.x[v.index[i * v.cols + j]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_declaration_shares_entries() {
        let mut p = Problem::new();
        let a = p.scalar("a");
        let x = p.symmetric("X", 3);
        assert_eq!(p.num_scalars(), 1 + 6);
        assert_eq!(x.at(0, 2), x.at(2, 0));
        assert_ne!(x.at(0, 1), x.at(1, 1));
        assert_eq!(a.expr().terms(), &[(0, 1.0)]);
    }

    #[test]
    fn test_psd_declaration_adds_constraint() {
        let mut p = Problem::new();
        let _ = p.psd("R", 2);
        assert_eq!(p.lmis().len(), 1);
        assert_eq!(p.lmis()[0].shape(), (2, 2));
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let mut p = Problem::new();
        let _ = p.scalar("a");
        let mut other = Problem::new();
        let _ = other.vector("v", 4);
        let stray = other.variables()[0].entry(3);
        assert!(matches!(
            p.minimize(stray),
            Err(SdpError::UnknownVariable { id: 3 })
        ));
    }

    #[test]
    fn test_contradictory_constant_equality() {
        let mut p = Problem::new();
        let err = p
            .add_eq(Affine::constant(1.0), Affine::constant(2.0))
            .unwrap_err();
        assert!(err.is_argument_error());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::PrimalInfeasible.to_string(), "primal infeasible");
    }
}
