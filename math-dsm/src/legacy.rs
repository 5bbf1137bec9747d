//! Former names of the design entry points.
//!
//! Each alias forwards to its replacement and logs a warning when called.

use crate::error::Result;
use crate::fir_weighting::{WeightingOptions, ntf_fir_from_q0, ntf_fir_weighting};
use crate::minmax::{Band, MinmaxOptions, ntf_fir_minmax};
use crate::psychoacoustic::{AudioWeightingOptions, ntf_dunn, ntf_fir_audio_weighting};
use crate::quadrature::QuadOptions;
use crate::tf::Tf;
use crate::weighting::{Weighting, q0_weighting};

fn superseded(old: &str, new: &str) {
    log::warn!("{old} is deprecated, use {new} instead");
}

/// Alias of [`q0_weighting`].
#[deprecated(since = "0.3.0", note = "use `q0_weighting`")]
pub fn q0_from_noise_weighting(order: usize, w: &Weighting, quad: &QuadOptions) -> Vec<f64> {
    superseded("q0_from_noise_weighting", "q0_weighting");
    q0_weighting(order, w, quad)
}

/// Alias of [`ntf_fir_weighting`].
#[deprecated(since = "0.3.0", note = "use `ntf_fir_weighting`")]
pub fn synthesize_ntf_from_noise_weighting(
    order: usize,
    w: &Weighting,
    h_inf: f64,
    opts: &WeightingOptions,
) -> Result<Tf> {
    superseded("synthesize_ntf_from_noise_weighting", "ntf_fir_weighting");
    ntf_fir_weighting(order, w, h_inf, opts)
}

/// Alias of [`ntf_fir_minmax`].
#[deprecated(since = "0.3.0", note = "use `ntf_fir_minmax`")]
pub fn synthesize_ntf_minmax(
    order: usize,
    bands: &[Band],
    h_inf: f64,
    zf: bool,
    opts: &MinmaxOptions,
) -> Result<Tf> {
    superseded("synthesize_ntf_minmax", "ntf_fir_minmax");
    ntf_fir_minmax(order, bands, h_inf, zf, opts)
}

/// Alias of [`ntf_fir_from_q0`].
#[deprecated(since = "0.3.0", note = "use `ntf_fir_from_q0`")]
pub fn synthesize_ntf_from_q0(q0: &[f64], h_inf: f64, opts: &WeightingOptions) -> Result<Tf> {
    superseded("synthesize_ntf_from_q0", "ntf_fir_from_q0");
    ntf_fir_from_q0(q0, h_inf, opts)
}

/// Alias of [`ntf_dunn`].
#[deprecated(since = "0.3.0", note = "use `ntf_dunn`")]
pub fn synthesize_ntf_dunn(order: usize, osr: f64, h_inf: f64) -> Result<Tf> {
    superseded("synthesize_ntf_dunn", "ntf_dunn");
    ntf_dunn(order, osr, h_inf)
}

/// Alias of [`ntf_fir_audio_weighting`].
#[deprecated(since = "0.3.0", note = "use `ntf_fir_audio_weighting`")]
pub fn synthesize_ntf_from_audio_weighting(
    order: usize,
    osr: f64,
    h_inf: f64,
    opts: &AudioWeightingOptions,
) -> Result<Tf> {
    superseded("synthesize_ntf_from_audio_weighting", "ntf_fir_audio_weighting");
    ntf_fir_audio_weighting(order, osr, h_inf, opts)
}

#[cfg(test)]
#[allow(deprecated)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_aliases_forward() {
        let w = Weighting::function(|f| if f < 0.05 { 1.0 } else { 1e-6 });
        let quad = QuadOptions::default().with_points(&[0.05]);
        let old = q0_from_noise_weighting(3, &w, &quad);
        let new = q0_weighting(3, &w, &quad);
        assert_eq!(old, new);

        let opts = WeightingOptions::default();
        let a = synthesize_ntf_from_q0(&new, 1.5, &opts).unwrap();
        let b = ntf_fir_from_q0(&new, 1.5, &opts).unwrap();
        for (x, y) in a.zeros().iter().zip(b.zeros().iter()) {
            assert_abs_diff_eq!(x.re, y.re, epsilon = 1e-12);
            assert_abs_diff_eq!(x.im, y.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_dunn_alias() {
        let a = synthesize_ntf_dunn(3, 64.0, 1.5).unwrap();
        let b = ntf_dunn(3, 64.0, 1.5).unwrap();
        assert_eq!(a, b);
    }
}
