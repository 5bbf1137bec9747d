//! Padding of vectors and matrices to a target size.
//!
//! Inputs already at or beyond the target size are returned unchanged.

use ndarray::{Array2, Axis, concatenate};

/// Pad `x` on the left with `val` up to `n` entries.
pub fn padl<T: Clone>(x: &[T], n: usize, val: T) -> Vec<T> {
    let mut out = vec![val; n.saturating_sub(x.len())];
    out.extend_from_slice(x);
    out
}

/// Pad `x` on the right with `val` up to `n` entries.
pub fn padr<T: Clone>(x: &[T], n: usize, val: T) -> Vec<T> {
    let mut out = x.to_vec();
    if out.len() < n {
        out.resize(n, val);
    }
    out
}

/// Pad a matrix on the top with rows of `val` up to `n` rows.
pub fn padt(x: &Array2<f64>, n: usize, val: f64) -> Array2<f64> {
    let extra = n.saturating_sub(x.nrows());
    if extra == 0 {
        return x.clone();
    }
    let fill = Array2::from_elem((extra, x.ncols()), val);
    concatenate(Axis(0), &[fill.view(), x.view()]).unwrap_or_else(|_| x.clone())
}

/// Pad a matrix on the bottom with rows of `val` up to `n` rows.
pub fn padb(x: &Array2<f64>, n: usize, val: f64) -> Array2<f64> {
    let extra = n.saturating_sub(x.nrows());
    if extra == 0 {
        return x.clone();
    }
    let fill = Array2::from_elem((extra, x.ncols()), val);
    concatenate(Axis(0), &[x.view(), fill.view()]).unwrap_or_else(|_| x.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_vector_padding() {
        assert_eq!(padl(&[1, 2], 4, 0), vec![0, 0, 1, 2]);
        assert_eq!(padr(&[1, 2], 4, 9), vec![1, 2, 9, 9]);
        assert_eq!(padr(&[1, 2, 3], 2, 0), vec![1, 2, 3]);
    }

    #[test]
    fn test_matrix_padding() {
        let m = array![[1.0, 2.0]];
        assert_eq!(padt(&m, 3, 0.0), array![[0.0, 0.0], [0.0, 0.0], [1.0, 2.0]]);
        assert_eq!(padb(&m, 2, -1.0), array![[1.0, 2.0], [-1.0, -1.0]]);
    }
}
