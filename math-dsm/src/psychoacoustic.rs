//! NTF designs driven by the sensitivity of the ear.
//!
//! Dunn's designs place the NTF zeros where the threshold of hearing is
//! lowest; the weighted designs minimise the noise seen through an audio
//! weighting curve.

use crate::audio_weightings::AudioWeighting;
use crate::db::undb_p;
use crate::delsig::{SynthesizeNtf, ZeroOpt, synthesize_ntf};
use crate::error::{DsmError, Result};
use crate::fir_weighting::{WeightingOptions, ntf_fir_weighting};
use crate::tf::Tf;
use crate::weighting::Weighting;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Audio band edge, in Hz, the Dunn zero table is expressed against.
const DUNN_BAND: f64 = 22.05e3;

/// Largest order covered by [`dunn_optzeros`].
pub const MAX_DUNN_ORDER: usize = 8;

/// Zero frequencies, in kHz, of Dunn's psychoacoustic designs.
fn dunn_table(n: usize) -> &'static [f64] {
    match n {
        1 => &[0.0],
        2 => &[4.014, -4.014],
        3 => &[0.0, 6.443, -6.443],
        4 => &[3.590, -3.590, 11.954, -11.954],
        5 => &[0.0, 4.308, -4.308, 12.959, -12.959],
        6 => &[3.325, -3.325, 7.078, -7.078, 13.389, -13.389],
        7 => &[0.0, 4.017, -4.017, 10.471, -10.471, 13.842, -13.842],
        _ => &[2.933, -2.933, 5.167, -5.167, 12.012, -12.012, 14.381, -14.381],
    }
}

/// Zero positions of Dunn's order-`n` design, normalised to a 22.05 kHz
/// band edge.
pub fn dunn_optzeros(n: usize) -> Result<Vec<f64>> {
    if n == 0 || n > MAX_DUNN_ORDER {
        return Err(DsmError::invalid(format!(
            "Dunn zeros are tabulated for orders 1 to {MAX_DUNN_ORDER}, got {n}"
        )));
    }
    Ok(dunn_table(n).iter().map(|khz| khz * 1e3 / DUNN_BAND).collect())
}

/// Dunn's zeros on the unit circle for the given oversampling ratio.
pub fn dunn_optzeros_cplx(order: usize, osr: f64) -> Result<Vec<Complex64>> {
    Ok(dunn_optzeros(order)?
        .into_iter()
        .map(|x| Complex64::from_polar(1.0, x * PI / osr))
        .collect())
}

/// Schreier-style NTF with Dunn's psychoacoustically placed zeros.
pub fn ntf_dunn(order: usize, osr: f64, h_inf: f64) -> Result<Tf> {
    let zeros = dunn_optzeros_cplx(order, osr)?;
    synthesize_ntf(&SynthesizeNtf {
        order,
        osr,
        opt: ZeroOpt::Explicit(zeros),
        h_inf,
        f0: 0.0,
    })
}

/// Options for [`ntf_fir_audio_weighting`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioWeightingOptions {
    /// Weighting curve applied inside the audio band
    pub weighting: AudioWeighting,
    /// Audio band edge in Hz
    pub audio_band: f64,
    /// Floor of the weighting, in dB below unit power
    pub max_attn: f64,
    /// Options of the underlying weighted design
    pub design: WeightingOptions,
}

impl Default for AudioWeightingOptions {
    fn default() -> Self {
        Self {
            weighting: AudioWeighting::F,
            audio_band: DUNN_BAND,
            max_attn: 120.0,
            design: WeightingOptions::default(),
        }
    }
}

/// Noise weighting of normalised frequency for a modulator running at
/// `osr` times the Nyquist rate of the audio band.
///
/// The curve is applied up to the band edge; everywhere it is floored at
/// `-max_attn` dB.
pub fn audio_noise_weighting(osr: f64, opts: &AudioWeightingOptions) -> Weighting {
    let curve = opts.weighting;
    let band = opts.audio_band;
    let floor = undb_p(-opts.max_attn);
    Weighting::function(move |f| {
        let hz = f * band * 2.0 * osr;
        let w = if hz <= band { curve.power(hz, true) } else { 0.0 };
        w.max(floor)
    })
}

/// FIR NTF minimising the quantisation noise seen through an audio
/// weighting curve.
pub fn ntf_fir_audio_weighting(
    order: usize,
    osr: f64,
    h_inf: f64,
    opts: &AudioWeightingOptions,
) -> Result<Tf> {
    if !(osr >= 1.0 && osr.is_finite()) {
        return Err(DsmError::invalid(format!(
            "oversampling ratio must be at least 1, got {osr}"
        )));
    }
    if !(opts.audio_band > 0.0) {
        return Err(DsmError::invalid(format!(
            "audio band must be positive, got {}",
            opts.audio_band
        )));
    }
    let w = audio_noise_weighting(osr, opts);
    let mut design = opts.design.clone();
    let edge = 0.5 / osr;
    if edge < 0.5 && !design.quad.points.contains(&edge) {
        design.quad.points.push(edge);
    }
    log::debug!(
        "audio weighted design: {:?} weighting, band {} Hz, osr {osr}",
        opts.weighting,
        opts.audio_band
    );
    ntf_fir_weighting(order, &w, h_inf, &design)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merit::{NoiseGainOptions, quantization_noise_gain};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_dunn_table() {
        for n in 1..=MAX_DUNN_ORDER {
            let z = dunn_optzeros(n).unwrap();
            assert_eq!(z.len(), n);
            assert!(z.iter().all(|v| v.abs() < 1.0));
        }
        assert_abs_diff_eq!(dunn_optzeros(2).unwrap()[0], 4014.0 / 22050.0, epsilon = 1e-15);
        assert!(dunn_optzeros(0).is_err());
        assert!(dunn_optzeros(9).is_err());
    }

    #[test]
    fn test_dunn_ntf() {
        let tf = ntf_dunn(5, 64.0, 1.5).unwrap();
        assert!(tf.is_stable());
        let expected = dunn_optzeros_cplx(5, 64.0).unwrap();
        for z in tf.zeros() {
            assert_abs_diff_eq!(z.norm(), 1.0, epsilon = 1e-12);
            assert!(expected.iter().any(|e| (e - z).norm() < 1e-9));
        }
        assert_abs_diff_eq!(tf.eval(Complex64::new(-1.0, 0.0)).re, 1.5, epsilon = 1e-6);
    }

    #[test]
    fn test_weighting_floor_and_band() {
        let opts = AudioWeightingOptions::default();
        let w = audio_noise_weighting(4.0, &opts);
        // 1 kHz
        assert_abs_diff_eq!(w.eval(1000.0 / (22050.0 * 8.0)), 1.0, epsilon = 1e-12);
        // outside the audio band
        assert_abs_diff_eq!(w.eval(0.4), 1e-12, epsilon = 1e-18);
        assert_abs_diff_eq!(w.eval(0.0), 1e-12, epsilon = 1e-18);
    }

    #[test]
    fn test_audio_weighted_design_beats_flat_design() {
        let opts = AudioWeightingOptions::default();
        let tf = ntf_fir_audio_weighting(4, 1.0, 1.5, &opts).unwrap();
        assert!(tf.is_fir());
        assert_eq!(tf.zeros().len(), 4);

        let flat = ntf_fir_weighting(4, &Weighting::function(|_| 1.0), 1.5, &opts.design).unwrap();
        let w = audio_noise_weighting(1.0, &opts);
        let gain_opts = NoiseGainOptions::default();
        let g_audio = quantization_noise_gain(&tf, Some(&w), &gain_opts).unwrap();
        let g_flat = quantization_noise_gain(&flat, Some(&w), &gain_opts).unwrap();
        assert!(g_audio <= g_flat * (1.0 + 1e-3));
    }

    #[test]
    fn test_bad_osr() {
        let opts = AudioWeightingOptions::default();
        assert!(ntf_fir_audio_weighting(4, 0.5, 1.5, &opts).unwrap_err().is_argument_error());
    }
}
