//! Analogue prototypes and their digital counterparts.
//!
//! Lowpass prototypes have a cutoff of 1 rad/s. Frequency transformations
//! and the bilinear transform act on zero-pole-gain data. Digital designs
//! take critical frequencies normalised to the Nyquist frequency and
//! prewarp them, so the band edges land exactly where requested.

use crate::error::{DsmError, Result};
use crate::tf::Tf;
use num_complex::Complex64;
use std::f64::consts::PI;

/// Zeros, poles and gain of a continuous-time filter.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalogZpk {
    /// Zeros in the s-plane
    pub zeros: Vec<Complex64>,
    /// Poles in the s-plane
    pub poles: Vec<Complex64>,
    /// Gain
    pub gain: f64,
}

impl AnalogZpk {
    fn degree(&self) -> usize {
        self.poles.len().saturating_sub(self.zeros.len())
    }
}

/// Critical frequencies of a digital design, normalised so that 1 is the
/// Nyquist frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterBand {
    /// Lowpass with the given edge
    Lowpass(f64),
    /// Highpass with the given edge
    Highpass(f64),
    /// Bandpass between two edges
    Bandpass(f64, f64),
    /// Bandstop between two edges
    Bandstop(f64, f64),
}

impl FilterBand {
    fn validate(&self) -> Result<()> {
        let in_range = |w: f64| w > 0.0 && w < 1.0;
        let ok = match *self {
            FilterBand::Lowpass(w) | FilterBand::Highpass(w) => in_range(w),
            FilterBand::Bandpass(lo, hi) | FilterBand::Bandstop(lo, hi) => {
                in_range(lo) && in_range(hi) && lo < hi
            }
        };
        if ok {
            Ok(())
        } else {
            Err(DsmError::invalid(format!(
                "critical frequencies {self:?} must lie in (0, 1) and be increasing"
            )))
        }
    }
}

fn prod(v: &[Complex64]) -> Complex64 {
    v.iter().fold(Complex64::new(1.0, 0.0), |acc, x| acc * x)
}

fn neg_prod(v: &[Complex64]) -> Complex64 {
    v.iter().fold(Complex64::new(1.0, 0.0), |acc, x| acc * -x)
}

/// Butterworth lowpass prototype of order `n`.
pub fn buttap(n: usize) -> AnalogZpk {
    let poles = (0..n)
        .map(|k| {
            let m = 2.0 * k as f64 - n as f64 + 1.0;
            -Complex64::from_polar(1.0, PI * m / (2.0 * n as f64))
        })
        .collect();
    AnalogZpk {
        zeros: Vec::new(),
        poles,
        gain: 1.0,
    }
}

/// Chebyshev type II lowpass prototype of order `n` with `rs` dB of
/// stop-band attenuation. The stop band starts at 1 rad/s.
pub fn cheb2ap(n: usize, rs: f64) -> Result<AnalogZpk> {
    if n == 0 {
        return Err(DsmError::invalid("filter order must be at least 1"));
    }
    if !(rs > 0.0) {
        return Err(DsmError::invalid(format!(
            "stop-band attenuation must be positive, got {rs} dB"
        )));
    }
    let nf = n as f64;
    let de = 1.0 / (10f64.powf(0.1 * rs) - 1.0).sqrt();
    let mu = (1.0 / de).asinh() / nf;

    // odd orders skip the zero at infinity (m = 0)
    let zeros: Vec<Complex64> = (0..n)
        .map(|k| 2.0 * k as f64 - nf + 1.0)
        .filter(|&m| m != 0.0)
        .map(|m| -(Complex64::i() / (m * PI / (2.0 * nf)).sin()).conj())
        .collect();

    let poles: Vec<Complex64> = (0..n)
        .map(|k| {
            let m = 2.0 * k as f64 - nf + 1.0;
            let p = -Complex64::from_polar(1.0, PI * m / (2.0 * nf));
            let warped = Complex64::new(mu.sinh() * p.re, mu.cosh() * p.im);
            1.0 / warped
        })
        .collect();

    let gain = (neg_prod(&poles) / neg_prod(&zeros)).re;
    Ok(AnalogZpk { zeros, poles, gain })
}

/// Lowpass to lowpass with cutoff `wo`.
pub fn lp2lp(proto: &AnalogZpk, wo: f64) -> AnalogZpk {
    AnalogZpk {
        zeros: proto.zeros.iter().map(|z| z * wo).collect(),
        poles: proto.poles.iter().map(|p| p * wo).collect(),
        gain: proto.gain * wo.powi(proto.degree() as i32),
    }
}

/// Lowpass to highpass with cutoff `wo` (`s -> wo / s`).
pub fn lp2hp(proto: &AnalogZpk, wo: f64) -> AnalogZpk {
    let mut zeros: Vec<Complex64> = proto.zeros.iter().map(|z| wo / z).collect();
    zeros.extend(std::iter::repeat_n(Complex64::new(0.0, 0.0), proto.degree()));
    AnalogZpk {
        zeros,
        poles: proto.poles.iter().map(|p| wo / p).collect(),
        gain: proto.gain * (neg_prod(&proto.zeros) / neg_prod(&proto.poles)).re,
    }
}

fn split_pair(x: Complex64, wo: f64) -> [Complex64; 2] {
    let root = (x * x - wo * wo).sqrt();
    [x + root, x - root]
}

/// Lowpass to bandpass centred on `wo` with bandwidth `bw`.
pub fn lp2bp(proto: &AnalogZpk, wo: f64, bw: f64) -> AnalogZpk {
    let half = bw / 2.0;
    let transform = |v: &[Complex64]| -> Vec<Complex64> {
        let scaled: Vec<Complex64> = v.iter().map(|x| x * half).collect();
        let (plus, minus): (Vec<_>, Vec<_>) =
            scaled.iter().map(|&x| split_pair(x, wo)).map(|[a, b]| (a, b)).unzip();
        plus.into_iter().chain(minus).collect()
    };
    let mut zeros = transform(&proto.zeros);
    zeros.extend(std::iter::repeat_n(Complex64::new(0.0, 0.0), proto.degree()));
    AnalogZpk {
        zeros,
        poles: transform(&proto.poles),
        gain: proto.gain * bw.powi(proto.degree() as i32),
    }
}

/// Lowpass to bandstop centred on `wo` with bandwidth `bw`.
pub fn lp2bs(proto: &AnalogZpk, wo: f64, bw: f64) -> AnalogZpk {
    let half = bw / 2.0;
    let transform = |v: &[Complex64]| -> Vec<Complex64> {
        let inverted: Vec<Complex64> = v.iter().map(|x| half / x).collect();
        let (plus, minus): (Vec<_>, Vec<_>) = inverted
            .iter()
            .map(|&x| split_pair(x, wo))
            .map(|[a, b]| (a, b))
            .unzip();
        plus.into_iter().chain(minus).collect()
    };
    let mut zeros = transform(&proto.zeros);
    let degree = proto.degree();
    zeros.extend(std::iter::repeat_n(Complex64::new(0.0, wo), degree));
    zeros.extend(std::iter::repeat_n(Complex64::new(0.0, -wo), degree));
    AnalogZpk {
        zeros,
        poles: transform(&proto.poles),
        gain: proto.gain * (neg_prod(&proto.zeros) / neg_prod(&proto.poles)).re,
    }
}

/// Bilinear transform at sample rate `fs`. Zeros at infinity map to `z = -1`.
pub fn bilinear(analog: &AnalogZpk, fs: f64) -> Tf {
    let fs2 = 2.0 * fs;
    let map = |s: &Complex64| (fs2 + s) / (fs2 - s);
    let mut zeros: Vec<Complex64> = analog.zeros.iter().map(map).collect();
    zeros.extend(std::iter::repeat_n(Complex64::new(-1.0, 0.0), analog.degree()));
    let poles = analog.poles.iter().map(map).collect();
    let num: Vec<Complex64> = analog.zeros.iter().map(|z| fs2 - z).collect();
    let den: Vec<Complex64> = analog.poles.iter().map(|p| fs2 - p).collect();
    let gain = analog.gain * (prod(&num) / prod(&den)).re;
    Tf::zpk(zeros, poles, gain)
}

/// Map a lowpass prototype to a digital filter with prewarped edges.
fn digital_design(proto: &AnalogZpk, band: FilterBand) -> Result<Tf> {
    band.validate()?;
    // with fs = 2 the prewarp is 2 fs tan(π w / fs)
    let fs = 2.0;
    let warp = |w: f64| 2.0 * fs * (PI * w / fs).tan();
    let analog = match band {
        FilterBand::Lowpass(w) => lp2lp(proto, warp(w)),
        FilterBand::Highpass(w) => lp2hp(proto, warp(w)),
        FilterBand::Bandpass(lo, hi) => {
            let (a, b) = (warp(lo), warp(hi));
            lp2bp(proto, (a * b).sqrt(), b - a)
        }
        FilterBand::Bandstop(lo, hi) => {
            let (a, b) = (warp(lo), warp(hi));
            lp2bs(proto, (a * b).sqrt(), b - a)
        }
    };
    Ok(bilinear(&analog, fs))
}

/// Digital Butterworth filter in zero-pole-gain form.
pub fn butter_zpk(order: usize, band: FilterBand) -> Result<Tf> {
    if order == 0 {
        return Err(DsmError::invalid("filter order must be at least 1"));
    }
    digital_design(&buttap(order), band)
}

/// Digital Chebyshev type II filter in zero-pole-gain form.
pub fn cheby2_zpk(order: usize, rs: f64, band: FilterBand) -> Result<Tf> {
    digital_design(&cheb2ap(order, rs)?, band)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_buttap_poles_on_unit_circle() {
        let proto = buttap(3);
        assert_eq!(proto.poles.len(), 3);
        for p in &proto.poles {
            assert_abs_diff_eq!(p.norm(), 1.0, epsilon = 1e-15);
            assert!(p.re < 0.0);
        }
        // the real pole of an odd order prototype sits at -1
        assert_abs_diff_eq!(proto.poles[1].re, -1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_butter_lowpass_half_power_at_edge() {
        let tf = butter_zpk(4, FilterBand::Lowpass(0.2)).unwrap();
        assert_abs_diff_eq!(tf.magnitude_at(0.0), 1.0, epsilon = 1e-12);
        // f = 0.1 is w = 0.2 of Nyquist
        assert_abs_diff_eq!(tf.magnitude_at(0.1), 0.5f64.sqrt(), epsilon = 1e-12);
        assert!(tf.magnitude_at(0.49) < 1e-4);
    }

    #[test]
    fn test_butter_bandpass_unit_gain_at_centre() {
        let tf = butter_zpk(2, FilterBand::Bandpass(0.2, 0.4)).unwrap();
        assert_eq!(tf.poles().len(), 4);
        let (a, b) = ((PI * 0.1).tan(), (PI * 0.2).tan());
        let centre = (a * b).sqrt().atan() / PI;
        assert_abs_diff_eq!(tf.magnitude_at(centre), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(tf.magnitude_at(0.1), 0.5f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(tf.magnitude_at(0.2), 0.5f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_cheby2_highpass_stopband() {
        let tf = cheby2_zpk(5, 40.0, FilterBand::Highpass(0.25)).unwrap();
        assert_abs_diff_eq!(tf.magnitude_at(0.5), 1.0, epsilon = 1e-9);
        // equiripple stop band peaks at -40 dB
        let peak = (0..=1000)
            .map(|i| tf.magnitude_at(0.125 * i as f64 / 1000.0))
            .fold(0.0, f64::max);
        assert_abs_diff_eq!(peak, 0.01, epsilon = 1e-6);
        assert_eq!(tf.zeros().len(), 5);
    }

    #[test]
    fn test_cheb2ap_rejects_bad_attenuation() {
        assert!(cheb2ap(3, 0.0).is_err());
        assert!(butter_zpk(2, FilterBand::Bandpass(0.4, 0.2)).is_err());
    }
}
