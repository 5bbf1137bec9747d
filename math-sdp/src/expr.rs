//! Affine expressions over the scalar decision variables of a problem.
//!
//! Every declared variable (scalar, vector or matrix) is flattened into
//! scalar unknowns identified by an index. An [`Affine`] is a constant plus a
//! sparse linear combination of those unknowns; an [`AffineMatrix`] is a dense
//! array of such expressions and supports the handful of operations needed to
//! assemble linear matrix inequalities: products with constant matrices,
//! sums, transposition and block assembly.

use crate::error::{Result, SdpError};
use ndarray::Array2;
use std::ops::{Add, Mul, Neg, Sub};

/// A scalar affine expression `c + sum_i a_i x_i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Affine {
    pub(crate) constant: f64,
    pub(crate) terms: Vec<(usize, f64)>,
}

impl Affine {
    /// A constant expression.
    pub fn constant(value: f64) -> Self {
        Self {
            constant: value,
            terms: Vec::new(),
        }
    }

    /// The expression `1.0 * x_id`.
    pub(crate) fn variable(id: usize) -> Self {
        Self {
            constant: 0.0,
            terms: vec![(id, 1.0)],
        }
    }

    /// The constant part of the expression.
    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    /// The linear terms as `(variable index, coefficient)` pairs.
    pub fn terms(&self) -> &[(usize, f64)] {
        &self.terms
    }

    /// `true` when the expression has no variable part.
    pub fn is_constant(&self) -> bool {
        self.terms.iter().all(|&(_, c)| c == 0.0)
    }

    /// Multiply by a constant.
    pub fn scale(&self, k: f64) -> Self {
        if k == 0.0 {
            return Affine::default();
        }
        Self {
            constant: self.constant * k,
            terms: self.terms.iter().map(|&(i, c)| (i, c * k)).collect(),
        }
    }

    /// Evaluate the expression at the point `x`.
    pub fn eval(&self, x: &[f64]) -> f64 {
        self.terms
            .iter()
            .fold(self.constant, |acc, &(i, c)| acc + c * x[i])
    }

    /// Largest variable index referenced, if any.
    pub(crate) fn max_index(&self) -> Option<usize> {
        self.terms.iter().map(|&(i, _)| i).max()
    }

    /// Merge repeated variables and drop zero coefficients.
    pub fn simplified(mut self) -> Self {
        if self.terms.len() > 1 {
            self.terms.sort_by_key(|&(i, _)| i);
            let mut merged: Vec<(usize, f64)> = Vec::with_capacity(self.terms.len());
            for (i, c) in self.terms.drain(..) {
                match merged.last_mut() {
                    Some((j, acc)) if *j == i => *acc += c,
                    _ => merged.push((i, c)),
                }
            }
            self.terms = merged;
        }
        self.terms.retain(|&(_, c)| c != 0.0);
        self
    }

    /// Sum of a sequence of expressions.
    pub fn sum<I: IntoIterator<Item = Affine>>(items: I) -> Self {
        items
            .into_iter()
            .fold(Affine::default(), |acc, a| acc + a)
            .simplified()
    }

    /// Inner product of constant coefficients with a slice of expressions.
    pub fn dot(coefs: &[f64], exprs: &[Affine]) -> Result<Self> {
        if coefs.len() != exprs.len() {
            return Err(SdpError::mismatch((coefs.len(), 1), (exprs.len(), 1)));
        }
        Ok(Affine::sum(
            coefs.iter().zip(exprs).map(|(&k, e)| e.scale(k)),
        ))
    }
}

impl From<f64> for Affine {
    fn from(value: f64) -> Self {
        Affine::constant(value)
    }
}

impl Add for Affine {
    type Output = Affine;

    fn add(mut self, rhs: Affine) -> Affine {
        self.constant += rhs.constant;
        self.terms.extend(rhs.terms);
        self
    }
}

impl Add<&Affine> for &Affine {
    type Output = Affine;

    fn add(self, rhs: &Affine) -> Affine {
        self.clone() + rhs.clone()
    }
}

impl Add<f64> for Affine {
    type Output = Affine;

    fn add(mut self, rhs: f64) -> Affine {
        self.constant += rhs;
        self
    }
}

impl Sub for Affine {
    type Output = Affine;

    fn sub(self, rhs: Affine) -> Affine {
        self + rhs.scale(-1.0)
    }
}

impl Sub<&Affine> for &Affine {
    type Output = Affine;

    fn sub(self, rhs: &Affine) -> Affine {
        self.clone() - rhs.clone()
    }
}

impl Sub<f64> for Affine {
    type Output = Affine;

    fn sub(mut self, rhs: f64) -> Affine {
        self.constant -= rhs;
        self
    }
}

impl Neg for Affine {
    type Output = Affine;

    fn neg(self) -> Affine {
        self.scale(-1.0)
    }
}

impl Mul<f64> for Affine {
    type Output = Affine;

    fn mul(self, rhs: f64) -> Affine {
        self.scale(rhs)
    }
}

impl Mul<f64> for &Affine {
    type Output = Affine;

    fn mul(self, rhs: f64) -> Affine {
        self.scale(rhs)
    }
}

// ============================================================================
// Matrix expressions
// ============================================================================

/// A dense matrix of affine expressions, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Affine>,
}

impl AffineMatrix {
    /// The `rows x cols` zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Affine::default(); rows * cols],
        }
    }

    /// Build a matrix entry by entry.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> Affine,
    {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    /// A constant matrix.
    pub fn from_constant(m: &Array2<f64>) -> Self {
        Self::from_fn(m.nrows(), m.ncols(), |i, j| Affine::constant(m[[i, j]]))
    }

    /// A `1 x 1` matrix holding a single expression.
    pub fn scalar(a: Affine) -> Self {
        Self {
            rows: 1,
            cols: 1,
            data: vec![a],
        }
    }

    /// A column vector.
    pub fn column(entries: Vec<Affine>) -> Self {
        Self {
            rows: entries.len(),
            cols: 1,
            data: entries,
        }
    }

    /// A row vector.
    pub fn row(entries: Vec<Affine>) -> Self {
        Self {
            rows: 1,
            cols: entries.len(),
            data: entries,
        }
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Entry `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> &Affine {
        &self.data[i * self.cols + j]
    }

    /// All entries in row-major order.
    pub fn entries(&self) -> &[Affine] {
        &self.data
    }

    /// Transposed copy.
    pub fn t(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self.get(j, i).clone())
    }

    /// Multiply every entry by `k`.
    pub fn scale(&self, k: f64) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|a| a.scale(k)).collect(),
        }
    }

    /// Entry-wise sum.
    pub fn try_add(&self, other: &AffineMatrix) -> Result<Self> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Entry-wise difference.
    pub fn try_sub(&self, other: &AffineMatrix) -> Result<Self> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Add a constant matrix.
    pub fn add_constant(&self, m: &Array2<f64>) -> Result<Self> {
        self.try_add(&AffineMatrix::from_constant(m))
    }

    fn zip_with<F>(&self, other: &AffineMatrix, f: F) -> Result<Self>
    where
        F: Fn(&Affine, &Affine) -> Affine,
    {
        if self.shape() != other.shape() {
            return Err(SdpError::mismatch(self.shape(), other.shape()));
        }
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| f(a, b).simplified())
                .collect(),
        })
    }

    /// The product `m * self` with a constant matrix on the left.
    pub fn left_mul(&self, m: &Array2<f64>) -> Result<Self> {
        if m.ncols() != self.rows {
            return Err(SdpError::mismatch((m.nrows(), self.rows), m.dim()));
        }
        Ok(Self::from_fn(m.nrows(), self.cols, |i, j| {
            Affine::sum(
                (0..self.rows)
                    .filter(|&k| m[[i, k]] != 0.0)
                    .map(|k| self.get(k, j).scale(m[[i, k]])),
            )
        }))
    }

    /// The product `self * m` with a constant matrix on the right.
    pub fn right_mul(&self, m: &Array2<f64>) -> Result<Self> {
        if m.nrows() != self.cols {
            return Err(SdpError::mismatch((self.cols, m.ncols()), m.dim()));
        }
        Ok(Self::from_fn(self.rows, m.ncols(), |i, j| {
            Affine::sum(
                (0..self.cols)
                    .filter(|&k| m[[k, j]] != 0.0)
                    .map(|k| self.get(i, k).scale(m[[k, j]])),
            )
        }))
    }

    /// The congruence `mᵀ * self * m`.
    pub fn congruence(&self, m: &Array2<f64>) -> Result<Self> {
        self.right_mul(m)?.left_mul(&m.t().to_owned())
    }

    /// Assemble a block matrix. Every block row must share its row count and
    /// every block column its column count.
    pub fn bmat(blocks: &[Vec<AffineMatrix>]) -> Result<Self> {
        let Some(first_row) = blocks.first() else {
            return Err(SdpError::InvalidArgument {
                reason: "bmat needs at least one block row".to_string(),
            });
        };
        let col_widths: Vec<usize> = first_row.iter().map(|b| b.cols).collect();
        let mut row_heights = Vec::with_capacity(blocks.len());
        for row in blocks {
            if row.len() != col_widths.len() {
                return Err(SdpError::mismatch(
                    (blocks.len(), col_widths.len()),
                    (blocks.len(), row.len()),
                ));
            }
            let h = row[0].rows;
            for (b, &w) in row.iter().zip(&col_widths) {
                if b.rows != h || b.cols != w {
                    return Err(SdpError::mismatch((h, w), b.shape()));
                }
            }
            row_heights.push(h);
        }

        let rows: usize = row_heights.iter().sum();
        let cols: usize = col_widths.iter().sum();
        let mut out = AffineMatrix::zeros(rows, cols);
        let mut r0 = 0;
        for (row, &h) in blocks.iter().zip(&row_heights) {
            let mut c0 = 0;
            for (b, &w) in row.iter().zip(&col_widths) {
                for i in 0..h {
                    for j in 0..w {
                        out.data[(r0 + i) * cols + c0 + j] = b.get(i, j).clone();
                    }
                }
                c0 += w;
            }
            r0 += h;
        }
        Ok(out)
    }

    /// Evaluate every entry at the point `x`.
    pub fn eval(&self, x: &[f64]) -> Array2<f64> {
        Array2::from_shape_fn((self.rows, self.cols), |(i, j)| self.get(i, j).eval(x))
    }

    /// `(M + Mᵀ) / 2`, for square matrices.
    pub fn symmetrized(&self) -> Result<Self> {
        if self.rows != self.cols {
            return Err(SdpError::mismatch((self.rows, self.rows), self.shape()));
        }
        Ok(Self::from_fn(self.rows, self.cols, |i, j| {
            if i == j {
                self.get(i, i).clone()
            } else {
                (self.get(i, j) + self.get(j, i)).scale(0.5).simplified()
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_affine_merge_and_eval() {
        let a = Affine::variable(0) * 2.0 + Affine::variable(1) + 3.0;
        let b = Affine::variable(0) * -2.0 + Affine::variable(2) * 0.5;
        let s = (a + b).simplified();
        assert_eq!(s.terms(), &[(1, 1.0), (2, 0.5)]);
        assert_relative_eq!(s.eval(&[10.0, 1.0, 4.0]), 6.0);
    }

    #[test]
    fn test_congruence_matches_dense_product() {
        // X = [[x0, x1], [x1, x2]]
        let x = AffineMatrix::from_fn(2, 2, |i, j| Affine::variable(i + j));
        let a = array![[0.0, 1.0], [-0.5, 0.25]];
        let m = x.congruence(&a).unwrap();

        let point = [1.0, 2.0, 3.0];
        let xv = x.eval(&point);
        let expected = a.t().dot(&xv).dot(&a);
        let got = m.eval(&point);
        for (g, e) in got.iter().zip(expected.iter()) {
            assert_relative_eq!(g, e, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_bmat_layout() {
        let a = AffineMatrix::from_constant(&array![[1.0, 2.0], [3.0, 4.0]]);
        let b = AffineMatrix::column(vec![Affine::variable(0), Affine::constant(5.0)]);
        let c = AffineMatrix::row(vec![Affine::constant(6.0), Affine::constant(7.0)]);
        let d = AffineMatrix::scalar(Affine::constant(-1.0));
        let m = AffineMatrix::bmat(&[vec![a, b], vec![c, d]]).unwrap();
        assert_eq!(m.shape(), (3, 3));
        let v = m.eval(&[9.0]);
        assert_eq!(v, array![[1.0, 2.0, 9.0], [3.0, 4.0, 5.0], [6.0, 7.0, -1.0]]);
    }

    #[test]
    fn test_bmat_rejects_ragged_blocks() {
        let a = AffineMatrix::zeros(2, 2);
        let b = AffineMatrix::zeros(1, 1);
        let err = AffineMatrix::bmat(&[vec![a, b]]).unwrap_err();
        assert!(err.is_argument_error());
    }
}
