//! Unnormalised auto- and cross-correlation.

/// `q[k] = sum_{n=k}^{m-1} x[n] x[n-k]` for `k = 0..=lags`.
///
/// Lags beyond the length of `x` are zero.
pub fn raw_acorr(x: &[f64], lags: usize) -> Vec<f64> {
    raw_xcorr(x, x, lags)
}

/// `q[k] = sum_n x[n] y[n-k]` for `k = 0..=lags`, over the overlap of the
/// two sequences.
pub fn raw_xcorr(x: &[f64], y: &[f64], lags: usize) -> Vec<f64> {
    (0..=lags)
        .map(|k| {
            if k >= x.len() {
                return 0.0;
            }
            x[k..].iter().zip(y).map(|(a, b)| a * b).sum()
        })
        .collect()
}
